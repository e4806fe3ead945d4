//! Benchmark and cross-validation harness for shortest-path query methods.
//!
//! The harness never searches a graph itself. It drives an external
//! preprocessor to build method-specific structures, runs an external query
//! executable repeatedly per method, reduces the noisy measurements into one
//! row per method and checks every accelerated method against the distances
//! produced by a reference method.
//!
//! The pieces compose bottom-up:
//! - [`structure`] builds the on-disk structures once per session.
//! - [`trial`] runs one invocation of the query executable.
//! - [`aggregate`] reduces the trials of one method.
//! - [`validate`] compares a method against the reference distances.
//! - [`results`] collects the ordered comparison table.
//! - [`session`] wires them together from a [`config::HarnessConfig`].

pub mod aggregate;
pub mod config;
pub mod error;
pub mod method;
pub mod process;
pub mod query_set;
pub mod recorder;
pub mod results;
pub mod schema;
pub mod session;
pub mod structure;
pub mod trial;
pub mod validate;

pub use error::{HarnessError, ProcessError, Result};
pub use method::Method;
