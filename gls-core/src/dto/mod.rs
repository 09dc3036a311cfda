//! Data Transfer Objects
//!
//! Wire types exchanged with the remote pipelines API. They mirror the JSON
//! resources of the service and carry no behaviour beyond serde.

pub mod operation;
pub mod pipeline;
