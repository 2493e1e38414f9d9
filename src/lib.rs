// src/lib.rs
pub mod backends;
pub mod config;
pub mod csrf;
pub mod health;
pub mod metrics;
pub mod server;
