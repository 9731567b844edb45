pub mod bot;
pub mod config;
pub mod error;
pub mod format;
pub mod provider;
pub mod quote;
pub mod resolver;
pub mod router;
pub mod transport;
pub mod worker;
