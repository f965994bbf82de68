//! Symbolic-link aliases added to the staged toolchain layout.
//!
//! Alternate tool names resolve to a single canonical executable, and on
//! Linux the vendor-neutral runtime directories are re-exposed under the
//! ChromeOS (`cros`) triples. Links are relative so the archive can be
//! unpacked anywhere.

use super::error::PackagingError;
use super::host::HostPlatform;
use super::state::PackagingStage;
use camino::Utf8Path;
use std::fs;
use std::io;

const STAGE: PackagingStage = PackagingStage::Staged;

/// `(alias, target)` pairs created in `bin/` on non-Windows hosts.
pub const BIN_ALIASES: &[(&str, &str)] = &[
    ("clang++", "clang"),
    ("clang-cl", "clang"),
    ("ld.lld", "lld"),
    ("ld64.lld", "lld"),
    ("lld-link", "lld"),
    ("wasm-ld", "lld"),
    ("llvm-readelf", "llvm-readobj"),
];

/// Additional `bin/` aliases on Linux hosts.
pub const LINUX_BIN_ALIASES: &[(&str, &str)] = &[("llvm-strip", "llvm-objcopy")];

/// `(alias, target)` runtime directory pairs under `lib/clang/<V>/lib`.
pub const TRIPLE_ALIASES: &[(&str, &str)] = &[
    ("armv7a-cros-linux-gnueabihf", "armv7-unknown-linux-gnueabihf"),
    ("aarch64-cros-linux-gnu", "aarch64-unknown-linux-gnu"),
    ("x86_64-cros-linux-gnu", "x86_64-unknown-linux-gnu"),
];

/// Create every alias applicable to `host` inside `staging_dir`.
///
/// An alias is created only when its target exists, and an existing alias
/// is left alone. Returns the relative paths of the links created.
///
/// # Errors
///
/// Returns [`PackagingError::Io`] if a link cannot be created.
pub fn create_aliases(
    staging_dir: &Utf8Path,
    host: HostPlatform,
    release: &str,
) -> Result<Vec<String>, PackagingError> {
    let mut created = Vec::new();
    if host.is_windows() {
        return Ok(created);
    }

    let bin_dir = staging_dir.join("bin");
    let linux_aliases: &[(&str, &str)] = if host.is_linux() { LINUX_BIN_ALIASES } else { &[] };
    for (alias, target) in BIN_ALIASES.iter().chain(linux_aliases) {
        if link_if_absent(&bin_dir, alias, target, LinkKind::File)? {
            created.push(format!("bin/{alias}"));
        }
    }

    if host.is_linux() {
        let runtime_dir = staging_dir.join("lib").join("clang").join(release).join("lib");
        for (alias, target) in TRIPLE_ALIASES {
            if link_if_absent(&runtime_dir, alias, target, LinkKind::Dir)? {
                created.push(format!("lib/clang/{release}/lib/{alias}"));
            }
        }
    }

    Ok(created)
}

#[derive(Debug, Clone, Copy)]
enum LinkKind {
    File,
    Dir,
}

/// Link `dir/alias` to the sibling `target`; return whether a link was made.
fn link_if_absent(
    dir: &Utf8Path,
    alias: &str,
    target: &str,
    kind: LinkKind,
) -> Result<bool, PackagingError> {
    let target_path = dir.join(target);
    let alias_path = dir.join(alias);
    let target_present = match kind {
        LinkKind::File => target_path.is_file(),
        LinkKind::Dir => target_path.is_dir(),
    };
    if !target_present {
        log::debug!("skipping alias {alias_path}: {target} not staged");
        return Ok(false);
    }
    if fs::symlink_metadata(&alias_path).is_ok() {
        log::debug!("skipping alias {alias_path}: already present");
        return Ok(false);
    }
    symlink(target, &alias_path, kind).map_err(PackagingError::io(STAGE))?;
    log::debug!("linked {alias_path} -> {target}");
    Ok(true)
}

#[cfg(unix)]
fn symlink(target: &str, link: &Utf8Path, _kind: LinkKind) -> io::Result<()> {
    std::os::unix::fs::symlink(target, link)
}

#[cfg(windows)]
fn symlink(target: &str, link: &Utf8Path, kind: LinkKind) -> io::Result<()> {
    match kind {
        LinkKind::File => std::os::windows::fs::symlink_file(target, link),
        LinkKind::Dir => std::os::windows::fs::symlink_dir(target, link),
    }
}
