#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

//! # Overview
//!
//! `logging` turns the front-end's `-v`/`-q` flags into two outputs: a
//! `tracing` subscriber on stderr for structured events, and a
//! [`DiagnosticSink`] that prints short `streampress: ...` lines for the user.
//!
//! # Design
//!
//! - [`VerbosityConfig`] maps flag counts to a [`Verbosity`] level and an
//!   `EnvFilter` directive string.
//! - With the `tracing` feature, [`init_tracing`] installs the global
//!   subscriber. The `STREAMPRESS_LOG` environment variable overrides the
//!   directive derived from the flags.
//! - [`DiagnosticSink`] renders [`Diagnostic`] values to any writer, one
//!   `streampress: ...` line each.
//!
//! # Examples
//!
//! ```
//! use logging::{Verbosity, VerbosityConfig};
//!
//! let config = VerbosityConfig::from_flags(2, false);
//! assert_eq!(config.level, Verbosity::Debug);
//! assert_eq!(config.directive(), "warn,streampress=debug");
//! assert_eq!(VerbosityConfig::from_flags(2, true).directive(), "error");
//! ```

mod config;
mod sink;
#[cfg(feature = "tracing")]
mod tracing_bridge;

pub use config::{LOG_ENV_VAR, Verbosity, VerbosityConfig};
pub use sink::{Diagnostic, DiagnosticSink, PROGRAM_NAME};
#[cfg(feature = "tracing")]
pub use tracing_bridge::{TracingInitError, build_filter, init_tracing, init_tracing_with_writer};
