//! # uploadhub-core
//!
//! Core crate for UploadHub. Contains configuration schemas, typed
//! identifiers, the collaborator traits the upload core consumes, and the
//! unified error system.
//!
//! This crate has **no** internal dependencies on other UploadHub crates.

pub mod config;
pub mod error;
pub mod result;
pub mod traits;
pub mod types;

pub use error::AppError;
pub use result::AppResult;
