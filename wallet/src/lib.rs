pub mod config;
pub mod contract;
pub mod delegation;
pub mod error;
pub mod network_handler;
pub mod provider;
pub mod session;
