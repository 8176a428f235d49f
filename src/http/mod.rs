//! Axum HTTP server: application state, the security-tier access gate and handlers.

pub mod context;
mod handler_health;
mod handler_index;
mod handler_login;
mod handler_signout;
mod handler_user;
pub mod middleware_gate;
pub mod server;

pub use context::{AppEngine, AppState};
pub use middleware_gate::{AuthenticatedClient, ExtractedAuth};
pub use server::build_router;
