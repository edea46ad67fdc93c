pub mod chats;
pub mod collaboration;
pub mod home;
pub mod models;
