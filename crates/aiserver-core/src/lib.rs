//! aiserver-core: Core types for the local AI server provisioner
//!
//! This crate provides the fundamental types used throughout aiserver:
//! - Hardware snapshot and GPU descriptors
//! - Persisted deployment configuration and the configuration root
//! - Capability evaluation and the model catalog
//! - Data-described commands
//! - User-facing status reporting
//! - Error handling

pub mod capability;
pub mod command;
pub mod console;
pub mod config;
pub mod error;
pub mod gpu;
pub mod model;
pub mod paths;

pub use capability::*;
pub use command::*;
pub use console::*;
pub use config::*;
pub use error::*;
pub use gpu::*;
pub use model::*;
pub use paths::*;
