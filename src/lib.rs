pub mod cache;
pub mod catalog;
pub mod config;
pub mod dashboard;
pub mod error;
pub mod export;
pub mod fetch;
pub mod filter;
pub mod loader;
pub mod logging;
pub mod model;
pub mod render;
pub mod session;
pub mod store;
