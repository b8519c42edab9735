pub mod chat;
pub mod schema;
