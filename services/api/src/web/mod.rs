pub mod admin;
pub mod assistant;
pub mod auth;
pub mod extract;
pub mod middleware;
pub mod rest;
pub mod routes;
pub mod state;

pub use middleware::{require_admin, require_auth};
pub use routes::{build_router, initialize};
