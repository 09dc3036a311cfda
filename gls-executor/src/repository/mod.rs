//! Repository layer
//!
//! The remote execution collaborator seen through a small trait. The HTTP
//! implementation delegates to [`gls_client::LifeSciencesClient`]; tests use
//! an in-memory scripted double.

#[cfg(test)]
pub(crate) mod mock;
mod remote;

pub use remote::{LifeSciencesJobClient, RemoteJobClient};
