//! Validated inputs for loading a module from an archive.
//!
//! Both types can only be built through validation, so a loader holding
//! them never has to re-check blank names, missing files or extensions.

pub mod archive_path;
pub mod payload_name;

pub use archive_path::ArchivePath;
pub use payload_name::PayloadName;
