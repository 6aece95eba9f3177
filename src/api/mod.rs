//! REST API over the shared ledger

pub mod rest;

pub use rest::{create_router, AppState, RestApi};
