pub mod catalog;
pub mod config;
pub mod models;
pub mod secrets;
pub mod truncate;

/// Owner of every record. The API has no accounts, so all rows belong to
/// this fixed user.
pub const GUEST_USER_ID: &str = "guest-user";
