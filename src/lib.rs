pub mod client;
pub mod compiler;
pub mod config;
pub mod error;
pub mod events;
pub mod prog;
