//! Toolchain packaging: wanted-file selection, verification, staging, and
//! reproducible archive creation.
//!
//! # Sub-modules
//!
//! - [`archive`] - `.tar.xz` creation and archive digests.
//! - [`error`] - Error types for packaging operations.
//! - [`host`] - Host platform description (`HostPlatform`).
//! - [`layout`] - Symbolic-link aliases in the staged tree.
//! - [`packaging`] - The packaging run (`package_toolchain`).
//! - [`rules`] - Wanted-file rules (`WantedFileManifest`).
//! - [`stage`] - Copying and stripping wanted files.
//! - [`state`] - Packaging run stages (`PackagingStage`).
//! - [`verify`] - Build stamp and completeness checks.
//! - [`version`] - Package version newtype (`PackageVersion`).

pub mod archive;
pub mod error;
pub mod host;
pub mod layout;
pub mod packaging;
pub mod rules;
pub mod stage;
pub mod state;
pub mod verify;
pub mod version;

pub use error::PackagingError;
pub use host::HostPlatform;
pub use packaging::{PackageOutput, PackageRequest, package_toolchain};
pub use verify::StampCheck;
pub use version::PackageVersion;
