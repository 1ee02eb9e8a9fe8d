pub mod admin;
pub mod auth;
pub mod chat;
pub mod health;
pub mod notifications;
pub mod pages;
pub mod posts;
pub mod recipes;
pub mod users;
