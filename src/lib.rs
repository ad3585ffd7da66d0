pub mod config;
pub mod error;
pub mod identity;
pub mod security;
pub mod server;
pub mod store;
