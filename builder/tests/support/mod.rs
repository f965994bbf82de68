//! Test support utilities for packaging integration tests.
//!
//! Provides a synthetic toolchain tree containing exactly the files the
//! wanted-file manifest requires, stamped with a known package version.

use camino::{Utf8Path, Utf8PathBuf};
use chromium_toolchain_builder::package::host::{HostArch, HostOs};
use chromium_toolchain_builder::package::rules::WantedFileManifest;
use chromium_toolchain_builder::package::verify::STAMP_FILE_NAME;
use chromium_toolchain_builder::package::{HostPlatform, PackageRequest, PackageVersion};
use std::fs;
use tempfile::TempDir;

/// Package version the synthetic tree is stamped with.
pub const VERSION: &str = "llvmorg-19-init-1234-abcdef1234567890-1";

/// Host without symlink aliases, so the archive mirrors the tree exactly.
pub const WINDOWS: HostPlatform = HostPlatform::new(HostOs::Windows, HostArch::X86_64);

/// Linux host, whose manifest requires `bin/lld`.
pub const LINUX: HostPlatform = HostPlatform::new(HostOs::Linux, HostArch::X86_64);

/// Temporary toolchain root and output directory.
pub struct Workspace {
    _temp: TempDir,
    /// Synthetic installation root.
    pub toolchain: Utf8PathBuf,
    /// Directory receiving archives.
    pub output: Utf8PathBuf,
}

impl Workspace {
    /// Create an empty workspace.
    pub fn new() -> Self {
        let temp = TempDir::new().expect("failed to create temp dir");
        let base = Utf8PathBuf::try_from(temp.path().to_path_buf()).expect("temp dir not UTF-8");
        Self {
            _temp: temp,
            toolchain: base.join("toolchain"),
            output: base.join("dist"),
        }
    }

    /// Write every mandatory file for `host`, contents equal to its path.
    pub fn synthesize(&self, host: HostPlatform) -> Vec<String> {
        let manifest = WantedFileManifest::for_host(host, "19").expect("manifest");
        let mut files: Vec<String> = manifest.literals().map(str::to_owned).collect();
        for file in &files {
            write_file(&self.toolchain, file, file);
        }
        write_file(&self.toolchain, STAMP_FILE_NAME, VERSION);
        files.sort();
        files
    }

    /// Packaging request for the synthetic tree with stripping disabled.
    pub fn request(&self, host: HostPlatform) -> PackageRequest {
        let version = PackageVersion::try_from(VERSION).expect("version");
        PackageRequest {
            strip_tool: None,
            compression: 6,
            ..PackageRequest::new(self.toolchain.clone(), self.output.clone(), version, host)
        }
    }
}

/// Write `contents` to `root/relative`, creating parent directories.
pub fn write_file(root: &Utf8Path, relative: &str, contents: &str) {
    let path = root.join(relative);
    fs::create_dir_all(path.parent().expect("parent")).expect("failed to create dirs");
    fs::write(path, contents).expect("failed to write file");
}
