pub mod api;
pub mod config;
pub mod error;
pub mod favorites;
pub mod media;
pub mod models;
pub mod notify;
pub mod pages;
pub mod routes;
pub mod server;
pub mod session;
pub mod store;
