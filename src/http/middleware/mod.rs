//! Application middleware.

pub mod status_pages;
pub mod tracking;

pub use status_pages::status_code_pages;
pub use tracking::track_requests;
