// Mathsafe library exports

pub mod command_processor;
pub mod config;

pub use command_processor::{CommandProcessor, Verdict};
pub use config::PolicySource;
