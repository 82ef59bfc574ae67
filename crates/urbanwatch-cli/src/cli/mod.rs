//! # CLI Layer
//!
//! This module is **one possible UI client** for urbanwatch. It is the only
//! place that:
//! - Knows about terminal I/O (stdout, stderr)
//! - Installs a tracing subscriber
//! - Handles argument parsing
//! - Formats output for human consumption
//!
//! ## Structure
//!
//! - [`setup`]: clap definitions
//! - [`commands`]: `run()` and one `handle_*` per subcommand
//! - [`render`]: terminal formatting of reports, analytics and locations

pub mod commands;
pub mod render;
pub mod setup;

pub use commands::run;
