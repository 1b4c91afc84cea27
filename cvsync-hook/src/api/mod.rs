//! HTTP API handlers for cvsync-hook

pub mod auth;
pub mod event;
pub mod health;

pub use auth::auth_middleware;
pub use event::{check_auth, receive_event};
pub use health::health_routes;
