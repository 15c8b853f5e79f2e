//! Core of the meetdir ecosystem.
//!
//! Meetings flow through three re-runnable stages, each backed by the
//! append-only [`Store`]:
//! - [`discovery`] turns calendar events and transcript documents into
//!   meeting records
//! - [`classify`] decides tag and recurrence, from cached patterns,
//!   keyword heuristics or explicit input
//! - [`materialize`] fetches documents into the meetings directory
//!
//! [`doctor`] checks the directory tree against the log at any time.

pub mod classify;
pub mod config;
pub mod date_range;
pub mod discovery;
pub mod doctor;
pub mod error;
pub mod materialize;
pub mod meetdir;
pub mod query;
pub mod record;
pub mod remote;
pub mod source;
pub mod store;
pub mod tags;
pub mod utils;

pub use error::{ItemFailure, MeetDirError, MeetDirResult};
pub use meetdir::MeetDir;
pub use store::Store;
