pub mod app;
pub mod cors;
pub mod error;
pub mod observability;
pub mod routes;
pub mod shutdown;
pub mod state;
