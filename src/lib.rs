//! vetter - black-box verification and load harness for HTTP servers.
//!
//! The harness boots a server under test (SUT) as a subprocess, drives it
//! through a catalog of protocol-level test cases over two transports (raw
//! TCP bytes and a conforming HTTP client), validates responses byte-exactly
//! or structurally, and cross-checks CRUD side effects against the SUT's
//! file-backed resource store. A second, independent subsystem generates
//! sustained weighted-random traffic against a URL-shortening service.
//!
//! Module map:
//!
//! - [`catalog`]: declarative test cases and groups
//! - [`harness`]: sandbox and SUT process lifecycle
//! - [`transport`]: RAW and CLIENT request drivers
//! - [`compare`]: byte-exact, header/body split, and unordered JSON matching
//! - [`crud`]: filesystem side-effect validation
//! - [`runner`]: group iteration and verdict aggregation
//! - [`loadgen`]: URL-shortener load traffic generator
//! - [`error`]: harness error taxonomy

pub mod catalog;
pub mod compare;
pub mod crud;
pub mod error;
pub mod harness;
pub mod loadgen;
pub mod runner;
pub mod transport;

pub use error::{Error, Result};
