//! GLS Core
//!
//! Core types shared by the Life Sciences executor crates.
//!
//! This crate contains:
//! - Domain types: tasks, run configuration, job descriptions, storage paths
//! - DTOs: wire types for the remote pipelines API

pub mod domain;
pub mod dto;
