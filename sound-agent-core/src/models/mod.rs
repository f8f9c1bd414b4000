pub mod config;
pub mod device;
pub mod error;
pub mod event;
pub mod log_message;
pub mod state;
