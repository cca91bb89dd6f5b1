//! HTTP routes for Lectern

pub mod admin_users;
pub mod api_keys;
pub mod auth_routes;
pub mod content;
pub mod health;
pub mod response;
pub mod seo;
pub mod tags;
pub mod views;

pub use admin_users::handle_admin_users_request;
pub use api_keys::handle_api_keys_request;
pub use auth_routes::handle_auth_request;
pub use content::handle_content_request;
pub use health::health_check;
pub use response::{error_response, not_found_response, preflight_response, HttpResponse};
pub use seo::{handle_robots, handle_sitemap};
pub use tags::{handle_list_tags, handle_search};
