//! Storefront: resilient relay from a web front end to the products and
//! orders APIs, with a dependency health endpoint.

pub mod config;
pub mod health;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod resilience;
pub mod routing;
pub mod services;
pub mod upstream;

pub use config::schema::StorefrontConfig;
pub use http::HttpServer;
pub use lifecycle::{Application, Shutdown};
