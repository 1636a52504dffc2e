pub mod commands;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod logging;
pub mod model;
pub mod output;
pub mod store;
