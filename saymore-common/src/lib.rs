//! # SayMore Common Library
//!
//! Shared code for the SayMore element store and its command line tool:
//! - Error type and result alias
//! - Configuration loading and file-naming settings
//! - Element event types and the EventBus
//! - Media duration parsing and formatting

pub mod config;
pub mod error;
pub mod events;
pub mod human_time;

pub use config::FileSettings;
pub use error::{Error, Result};
pub use events::{ElementEvent, EventBus};
