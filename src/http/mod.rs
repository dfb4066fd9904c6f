//! HTTP surface of the source service (axum).
//!
//! Handlers validate at the boundary and run diesel work on the blocking
//! pool through `AppState::with_conn`.

pub mod dto;
pub mod error;
pub mod handlers;
pub mod router;
pub mod state;

pub use router::create_router;
pub use state::AppState;
