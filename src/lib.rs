//! crb: a personal, profile-driven backup tool.
//!
//! This crate provides the file-selection engine, the archive path codec,
//! the zip archiver and the restore protocol used by the `crb` binary, along
//! with the profile store and settings they rely on.

pub mod archive;
pub mod backup;
pub mod cancel;
pub mod codec;
pub mod config;
pub mod constants;
pub mod error;
pub mod logging;
pub mod path;
pub mod profile;
pub mod prompt;
pub mod restore;
pub mod select;
pub mod stats;
pub mod sysexits;

pub use error::Error;

/// Unified result type for all fallible operations in crb.
pub type Result<T> = std::result::Result<T, Error>;
