pub mod context;
pub mod controller;
