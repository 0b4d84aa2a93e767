// API module - HTTP endpoints

pub mod businesses;
pub mod health;
pub mod incentives;
pub mod middleware;
pub mod verifications;
