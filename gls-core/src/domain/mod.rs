//! Core domain types
//!
//! These types are shared between the adapter (which builds them from engine
//! input), the polling monitor (which advances task state) and the HTTP client
//! (which translates them to and from the remote wire format).

pub mod job;
pub mod run;
pub mod storage;
pub mod task;
