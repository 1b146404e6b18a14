//! Infrastructure layer
//!
//! This layer contains:
//! - Configuration loading (config)
//! - Extension bootstrap into the host application (ext)
//! - Logging setup for the command-line tool (logging)

pub mod config;
pub mod ext;
pub mod logging;

pub use config::{Language, SubjectsConfig, resolve_default_language};
pub use ext::{HostApp, VocabulariesExtra};
