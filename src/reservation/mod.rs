//! Reservation coordinator module
//!
//! The transactional boundary that ties a request transition, its inventory
//! delta, and its audit record into one atomic unit.

pub mod service;

pub use service::ReservationService;
