//! Cross-cutting authorization gates
//!
//! Role checks live here, outside the coordinator: a gate resolves the
//! already-authenticated actor's role and rejects before any service call, so
//! the services themselves carry no notion of roles, sessions, or transport.

use thiserror::Error;
use uuid::Uuid;

use crate::component::{
    Component, ComponentFilter, ComponentService, CreateComponentInput, UpdateComponentInput,
};
use crate::error::DomainError;
use crate::models::UserRole;
use crate::request::{BorrowRequest, CreateRequestInput};
use crate::reservation::ReservationService;

/// An authenticated actor, resolved by the caller before entering this crate
#[derive(Debug, Clone, Copy)]
pub struct Actor {
    pub id: Uuid,
    pub role: UserRole,
}

impl Actor {
    pub fn new(id: Uuid, role: UserRole) -> Self {
        Self { id, role }
    }
}

/// Authorization failure
#[derive(Error, Debug)]
pub enum AccessError {
    #[error("{} role required", .required.as_str())]
    Forbidden { required: UserRole },
}

/// Error surface of gated operations
#[derive(Error, Debug)]
pub enum GateError {
    #[error(transparent)]
    Denied(#[from] AccessError),

    #[error(transparent)]
    Domain(#[from] DomainError),
}

/// Require the actor to hold exactly the given role
pub fn ensure_role(actor: &Actor, required: UserRole) -> Result<(), AccessError> {
    if actor.role == required {
        Ok(())
    } else {
        Err(AccessError::Forbidden { required })
    }
}

/// Role-gated facade over the reservation coordinator
///
/// Students submit requests; faculty process them. Mirrors are deliberate:
/// every coordinator operation appears here exactly once with its role
/// requirement and nothing else.
#[derive(Clone)]
pub struct ReservationGate {
    service: ReservationService,
}

impl ReservationGate {
    pub fn new(service: ReservationService) -> Self {
        Self { service }
    }

    pub async fn create_request(
        &self,
        actor: &Actor,
        input: CreateRequestInput,
    ) -> Result<BorrowRequest, GateError> {
        ensure_role(actor, UserRole::Student)?;
        Ok(self.service.create_request(actor.id, input).await?)
    }

    pub async fn approve_request(
        &self,
        actor: &Actor,
        request_id: Uuid,
    ) -> Result<BorrowRequest, GateError> {
        ensure_role(actor, UserRole::Faculty)?;
        Ok(self.service.approve_request(request_id, actor.id).await?)
    }

    pub async fn reject_request(
        &self,
        actor: &Actor,
        request_id: Uuid,
        reason: Option<String>,
    ) -> Result<BorrowRequest, GateError> {
        ensure_role(actor, UserRole::Faculty)?;
        Ok(self
            .service
            .reject_request(request_id, actor.id, reason)
            .await?)
    }

    pub async fn return_request(
        &self,
        actor: &Actor,
        request_id: Uuid,
    ) -> Result<BorrowRequest, GateError> {
        ensure_role(actor, UserRole::Faculty)?;
        Ok(self.service.return_request(request_id, actor.id).await?)
    }
}

/// Role-gated facade over the component catalogue
///
/// Reads are open to any authenticated actor; writes are faculty-only.
#[derive(Clone)]
pub struct ComponentGate {
    service: ComponentService,
}

impl ComponentGate {
    pub fn new(service: ComponentService) -> Self {
        Self { service }
    }

    pub async fn create_component(
        &self,
        actor: &Actor,
        input: CreateComponentInput,
    ) -> Result<Component, GateError> {
        ensure_role(actor, UserRole::Faculty)?;
        Ok(self.service.create_component(actor.id, input).await?)
    }

    pub async fn update_component(
        &self,
        actor: &Actor,
        id: Uuid,
        input: UpdateComponentInput,
    ) -> Result<Component, GateError> {
        ensure_role(actor, UserRole::Faculty)?;
        Ok(self.service.update_component(actor.id, id, input).await?)
    }

    pub async fn delete_component(&self, actor: &Actor, id: Uuid) -> Result<(), GateError> {
        ensure_role(actor, UserRole::Faculty)?;
        Ok(self.service.delete_component(actor.id, id).await?)
    }

    pub async fn get_component(&self, _actor: &Actor, id: Uuid) -> Result<Component, GateError> {
        Ok(self.service.get_component(id).await?)
    }

    pub async fn list_components(
        &self,
        _actor: &Actor,
        filter: ComponentFilter,
    ) -> Result<Vec<Component>, GateError> {
        Ok(self.service.list_components(filter).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn student() -> Actor {
        Actor::new(Uuid::new_v4(), UserRole::Student)
    }

    fn faculty() -> Actor {
        Actor::new(Uuid::new_v4(), UserRole::Faculty)
    }

    #[test]
    fn test_ensure_role() {
        assert!(ensure_role(&faculty(), UserRole::Faculty).is_ok());
        assert!(ensure_role(&student(), UserRole::Student).is_ok());
        assert!(ensure_role(&student(), UserRole::Faculty).is_err());
        assert!(ensure_role(&faculty(), UserRole::Student).is_err());
    }

    #[tokio::test]
    async fn test_gates_reject_before_touching_storage() {
        // connect_lazy never opens a connection; a denied call must fail on
        // the role check alone.
        let pool = sqlx::postgres::PgPoolOptions::new()
            .connect_lazy("postgresql://localhost/unreachable")
            .unwrap();

        let reservations = ReservationGate::new(ReservationService::new(pool.clone()));
        let components = ComponentGate::new(ComponentService::new(pool));

        let err = reservations
            .approve_request(&student(), Uuid::new_v4())
            .await
            .unwrap_err();
        assert!(matches!(err, GateError::Denied(_)));

        let err = reservations
            .create_request(
                &faculty(),
                CreateRequestInput {
                    component_id: Uuid::new_v4(),
                    quantity: 1,
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, GateError::Denied(_)));

        let err = components
            .delete_component(&student(), Uuid::new_v4())
            .await
            .unwrap_err();
        assert!(matches!(err, GateError::Denied(_)));
    }
}
