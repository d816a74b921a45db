pub mod config;
pub mod dispatch;
pub mod error;
pub mod loader;
pub mod models;
pub mod output;
pub mod pipeline;
pub mod resolver;
pub mod routing;
