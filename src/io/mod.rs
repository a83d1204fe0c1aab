//! Configuration, errors, file formats and the command-line surface

/// Command-line arguments and batch processing
pub mod cli;
/// Constants, defaults and the serde configuration
pub mod configuration;
/// Error type and context helpers
pub mod error;
/// JSON motion container
pub mod motion_file;
/// Terminal progress display
pub mod progress;
