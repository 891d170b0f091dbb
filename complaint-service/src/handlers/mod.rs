pub mod admin;
pub mod complaints;
pub mod health;

pub use admin::{change_status, list_pending};
pub use complaints::{fetch_image, get_complaint, greeting, submit_complaint};
pub use health::{health_check, metrics_endpoint};
