//! Sandbox and server-under-test lifecycle management.
//!
//! Each test group owns exactly one sandbox directory and one SUT process
//! for the duration of its cases. Ownership never overlaps between groups:
//! the sandbox is destroyed and the process stopped before the next group
//! starts, on every exit path.
//!
//! - [`sandbox`]: ephemeral working directory for the SUT's resource store
//! - [`process`]: spawn, readiness probing, graceful stop, log capture

mod process;
mod sandbox;

pub use process::{HarnessOptions, SutHandle, start_sut};
pub use sandbox::Sandbox;
