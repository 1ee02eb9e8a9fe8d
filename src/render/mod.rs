pub mod admin;
pub mod chat;
pub mod layout;
pub mod recipes;
pub mod social;
pub mod users;
