//! Logger bootstrap.
//!
//! The library itself only speaks the `log` facade. Binaries and tests call
//! [`init_logging`] once to route records to `env_logger`.

mod init;

pub use init::{init_logging, LoggingConfig};
