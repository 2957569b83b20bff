//! Command-line front end for the OPDS 2 feed stress tester.
//!
//! ## Usage
//!
//! ```bash
//! stress-test-opds2 https://example.org/opds2                 # 10 streams, 3 retries
//! stress-test-opds2 https://example.org/opds2 -c 50 -r 5      # heavier run
//! stress-test-opds2 https://example.org/opds2 --format json   # machine-readable summary
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::cast_precision_loss)]

mod commands;
mod config;
mod error;
pub mod handlers;
mod output;

pub use commands::{Cli, ColorArg, ReportFormat};
pub use config::{CliConfig, ColorChoice, Verbosity};
pub use error::{CliError, CliResult};
pub use output::{ProgressReporter, StressProgress};
