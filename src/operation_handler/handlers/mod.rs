//! Endpoint handlers grouped by operation kind, called from the dispatcher in
//! [`core`](super::core).

pub mod crud;
pub mod general;
pub mod query;
