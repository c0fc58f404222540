//! Core type definitions used across the UploadHub workspace.

pub mod id;

pub use id::*;
