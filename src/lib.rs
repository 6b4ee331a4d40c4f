pub mod error;
pub mod handlers;
pub mod logging;
pub mod models;
pub mod relay;
pub mod server;
