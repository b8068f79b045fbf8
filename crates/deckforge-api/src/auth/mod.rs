//! API key authentication

pub mod client_ip;
pub mod middleware;

pub use middleware::{auth_middleware, AuthFailureLimiter, AuthState};
