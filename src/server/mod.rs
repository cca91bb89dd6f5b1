//! HTTP server and shared state

mod http;

pub use http::{collect_body, route, run, AppState};
