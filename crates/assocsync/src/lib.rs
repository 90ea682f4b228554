//! ## Crate layout
//! - `core`: codec, remote contracts, entity stores, session keeper,
//!   reporter and attachment handler.
//! - `console`: one handle wiring every store to a single injected remote.
//!
//! The `prelude` module mirrors what a presentation layer needs day to day.

pub use assocsync_core as core;

mod console;

pub use console::Console;
pub use assocsync_core::{
    config::{ConfigError, ConsoleConfig},
    error::{Error, ErrorClass},
    remote::{MemoryRemote, Remote},
};

//
// Consts
//

/// Workspace version re-export for downstream tooling/tests.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

///
/// Prelude
///

pub mod prelude {
    pub use crate::{Console, ConsoleConfig};
    pub use assocsync_core::prelude::*;
}
