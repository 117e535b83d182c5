//! Reservation state machine
//!
//! Exactly three edges exist: Pending -> Approved, Pending -> Rejected,
//! Approved -> Returned. Every status write in the coordinator goes through
//! `transition`, so no call site can invent an edge of its own.

use serde::{Deserialize, Serialize};

use crate::audit::ActionKind;
use crate::error::DomainError;

/// Borrow request status
#[derive(Debug, Serialize, Deserialize, sqlx::Type, Clone, Copy, PartialEq, Eq)]
#[sqlx(type_name = "request_status", rename_all = "lowercase")]
pub enum RequestStatus {
    Pending,
    Approved,
    Rejected,
    Returned,
}

impl RequestStatus {
    /// Compute the successor state for an action, or refuse the transition
    pub fn transition(self, action: ReservationAction) -> Result<RequestStatus, DomainError> {
        match (self, action) {
            (RequestStatus::Pending, ReservationAction::Approve) => Ok(RequestStatus::Approved),
            (RequestStatus::Pending, ReservationAction::Reject) => Ok(RequestStatus::Rejected),
            (RequestStatus::Approved, ReservationAction::Return) => Ok(RequestStatus::Returned),
            (status, action) => Err(DomainError::InvalidState(format!(
                "cannot {} a request in status {}",
                action.as_str(),
                status.as_str()
            ))),
        }
    }

    /// Rejected and Returned admit no further transition
    pub fn is_terminal(self) -> bool {
        matches!(self, RequestStatus::Rejected | RequestStatus::Returned)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RequestStatus::Pending => "Pending",
            RequestStatus::Approved => "Approved",
            RequestStatus::Rejected => "Rejected",
            RequestStatus::Returned => "Returned",
        }
    }
}

/// Actions a processor can take on a request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReservationAction {
    Approve,
    Reject,
    Return,
}

impl ReservationAction {
    /// Inventory delta this action applies to the component, given the
    /// request's fixed quantity. Approval reserves stock, return restores
    /// it, rejection touches nothing.
    pub fn quantity_delta(self, requested: i32) -> i32 {
        match self {
            ReservationAction::Approve => -requested,
            ReservationAction::Reject => 0,
            ReservationAction::Return => requested,
        }
    }

    /// The ledger action kind this transition is recorded as
    pub fn action_kind(self) -> ActionKind {
        match self {
            ReservationAction::Approve => ActionKind::Approve,
            ReservationAction::Reject => ActionKind::Reject,
            ReservationAction::Return => ActionKind::Return,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ReservationAction::Approve => "approve",
            ReservationAction::Reject => "reject",
            ReservationAction::Return => "return",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL_STATUSES: [RequestStatus; 4] = [
        RequestStatus::Pending,
        RequestStatus::Approved,
        RequestStatus::Rejected,
        RequestStatus::Returned,
    ];

    const ALL_ACTIONS: [ReservationAction; 3] = [
        ReservationAction::Approve,
        ReservationAction::Reject,
        ReservationAction::Return,
    ];

    #[test]
    fn test_only_three_edges_exist() {
        for status in ALL_STATUSES {
            for action in ALL_ACTIONS {
                let result = status.transition(action);
                match (status, action) {
                    (RequestStatus::Pending, ReservationAction::Approve) => {
                        assert_eq!(result.unwrap(), RequestStatus::Approved);
                    }
                    (RequestStatus::Pending, ReservationAction::Reject) => {
                        assert_eq!(result.unwrap(), RequestStatus::Rejected);
                    }
                    (RequestStatus::Approved, ReservationAction::Return) => {
                        assert_eq!(result.unwrap(), RequestStatus::Returned);
                    }
                    _ => {
                        let err = result.unwrap_err();
                        assert_eq!(err.error_code(), "INVALID_STATE");
                    }
                }
            }
        }
    }

    #[test]
    fn test_terminal_states() {
        assert!(!RequestStatus::Pending.is_terminal());
        assert!(!RequestStatus::Approved.is_terminal());
        assert!(RequestStatus::Rejected.is_terminal());
        assert!(RequestStatus::Returned.is_terminal());
    }

    #[test]
    fn test_quantity_deltas() {
        assert_eq!(ReservationAction::Approve.quantity_delta(4), -4);
        assert_eq!(ReservationAction::Reject.quantity_delta(4), 0);
        assert_eq!(ReservationAction::Return.quantity_delta(4), 4);
    }

    #[test]
    fn test_approve_then_return_is_neutral() {
        let q = 7;
        assert_eq!(
            ReservationAction::Approve.quantity_delta(q) + ReservationAction::Return.quantity_delta(q),
            0
        );
    }
}
