//! SpecScope prediction service library.
//!
//! Re-exports the API router and shared state so they can be used by
//! integration tests.

pub mod api;
pub mod state;
