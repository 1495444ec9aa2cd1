pub mod handlers;
pub mod middleware;
pub mod routes;

pub use middleware::AuthUser;
pub use routes::create_router;
