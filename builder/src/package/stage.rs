//! Copying wanted files into the staging tree and stripping them.

use super::error::PackagingError;
use super::host::HostPlatform;
use super::rules::WantedFileManifest;
use super::state::PackagingStage;
use crate::command::{CommandRunner, Invocation};
use camino::{Utf8Path, Utf8PathBuf};
use std::fs;
use std::path::{Component, Path};
use walkdir::WalkDir;

const STAGE: PackagingStage = PackagingStage::Staged;

/// Strips staged binaries in place with an external tool.
///
/// Failures are logged and otherwise ignored: a missing tool or an
/// unstrippable file never fails a packaging run.
pub struct Stripper<'a> {
    runner: &'a dyn CommandRunner,
    tool: String,
}

impl<'a> Stripper<'a> {
    /// Create a stripper that runs `tool` through `runner`.
    #[must_use]
    pub fn new(runner: &'a dyn CommandRunner, tool: impl Into<String>) -> Self {
        Self {
            runner,
            tool: tool.into(),
        }
    }

    /// Remove debug sections only (`strip -g`).
    pub fn strip_debug(&self, path: &Utf8Path) {
        self.run(Invocation::new(&self.tool).arg("-g").arg(path.as_str()));
    }

    /// Remove all removable symbols.
    pub fn strip_all(&self, path: &Utf8Path) {
        self.run(Invocation::new(&self.tool).arg(path.as_str()));
    }

    fn run(&self, invocation: Invocation) {
        match self.runner.output(&invocation) {
            Ok(output) if output.status.success() => {}
            Ok(output) => log::debug!(
                "ignoring strip failure ({}): {}",
                output.status,
                invocation.display()
            ),
            Err(e) => log::debug!("ignoring strip failure ({e}): {}", invocation.display()),
        }
    }
}

/// Inputs for [`stage_wanted_files`].
pub struct StageParams<'a> {
    /// Toolchain installation root being packaged.
    pub toolchain_root: &'a Utf8Path,
    /// Destination staging tree.
    pub staging_dir: &'a Utf8Path,
    /// Rules selecting files to copy.
    pub manifest: &'a WantedFileManifest,
    /// Host the toolchain was built for.
    pub host: HostPlatform,
    /// Stripper to apply, or `None` to keep binaries untouched.
    pub stripper: Option<&'a Stripper<'a>>,
}

/// Copy every wanted file into the staging tree.
///
/// Directories are visited in lexicographic order. Symbolic links to files
/// are copied as regular files; links to directories are not followed.
/// Returns the staged relative paths in visit order.
///
/// # Errors
///
/// Returns [`PackagingError::Walk`] or [`PackagingError::Io`] on
/// traversal or copy failures, and [`PackagingError::NonUtf8Path`] for
/// paths that cannot be represented as UTF-8.
pub fn stage_wanted_files(params: &StageParams<'_>) -> Result<Vec<String>, PackagingError> {
    let mut staged = Vec::new();
    let walker = WalkDir::new(params.toolchain_root)
        .follow_links(false)
        .sort_by_file_name();

    for entry in walker {
        let entry = entry.map_err(|source| PackagingError::Walk {
            stage: STAGE,
            source,
        })?;
        if !is_file_like(&entry) {
            continue;
        }
        let relative = relative_posix(entry.path(), params.toolchain_root)?;
        if !params.manifest.is_wanted(&relative) {
            continue;
        }

        let dest = params.staging_dir.join(&relative);
        copy_file(entry.path(), &dest)?;
        log::debug!("staged {relative}");

        if let Some(stripper) = params.stripper {
            if should_strip_debug(&relative, params.host) {
                stripper.strip_debug(&dest);
            } else if should_strip_all(&relative, params.host) {
                stripper.strip_all(&dest);
            }
        }
        staged.push(relative);
    }

    Ok(staged)
}

/// Return true for shared libraries and static archives stripped of debug
/// information on Linux hosts.
///
/// Android builtins keep their debug sections, which unwinders rely on.
#[must_use]
pub fn should_strip_debug(relative: &str, host: HostPlatform) -> bool {
    if !host.is_linux() {
        return false;
    }
    let is_library = Utf8Path::new(relative)
        .extension()
        .is_some_and(|ext| matches!(ext, "so" | "a"));
    let is_mobile_builtins = relative.contains("libclang_rt.builtins") && relative.contains("android");
    is_library && !is_mobile_builtins
}

/// Return true for executables under `bin/` on non-Windows hosts.
#[must_use]
pub fn should_strip_all(relative: &str, host: HostPlatform) -> bool {
    !host.is_windows()
        && relative
            .strip_prefix("bin/")
            .is_some_and(|name| !name.contains('/'))
}

fn is_file_like(entry: &walkdir::DirEntry) -> bool {
    let file_type = entry.file_type();
    if file_type.is_file() {
        return true;
    }
    // Links to files are treated as the files they point at.
    file_type.is_symlink() && fs::metadata(entry.path()).is_ok_and(|m| m.is_file())
}

fn copy_file(src: &Path, dest: &Utf8Path) -> Result<(), PackagingError> {
    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent).map_err(PackagingError::io(STAGE))?;
    }
    fs::copy(src, dest).map_err(PackagingError::io(STAGE))?;
    Ok(())
}

/// Render `path` relative to `root` with `/` separators.
pub(crate) fn relative_posix(path: &Path, root: &Utf8Path) -> Result<String, PackagingError> {
    let relative = path
        .strip_prefix(root.as_std_path())
        .map_err(|_| PackagingError::NonUtf8Path(path.to_path_buf()))?;
    let mut parts = Vec::new();
    for component in relative.components() {
        match component {
            Component::Normal(part) => parts.push(
                part.to_str()
                    .ok_or_else(|| PackagingError::NonUtf8Path(path.to_path_buf()))?,
            ),
            Component::CurDir => {}
            _ => return Err(PackagingError::NonUtf8Path(path.to_path_buf())),
        }
    }
    Ok(parts.join("/"))
}

/// Join `relative` (POSIX form) onto `root`.
#[must_use]
pub(crate) fn join_posix(root: &Utf8Path, relative: &str) -> Utf8PathBuf {
    relative.split('/').fold(root.to_owned(), |acc, part| acc.join(part))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::MockCommandRunner;
    use crate::command::test_support::output_with;
    use crate::package::host::{HostArch, HostOs};
    use rstest::{fixture, rstest};
    use tempfile::TempDir;

    const LINUX: HostPlatform = HostPlatform::new(HostOs::Linux, HostArch::Aarch64);
    const MAC: HostPlatform = HostPlatform::new(HostOs::MacOs, HostArch::Aarch64);
    const WINDOWS: HostPlatform = HostPlatform::new(HostOs::Windows, HostArch::X86_64);

    #[fixture]
    fn temp_dir() -> TempDir {
        TempDir::new().expect("temp dir creation succeeds")
    }

    fn utf8(path: &Path) -> Utf8PathBuf {
        Utf8PathBuf::try_from(path.to_path_buf()).expect("utf8 temp path")
    }

    fn write(root: &Utf8Path, relative: &str, contents: &[u8]) {
        let path = join_posix(root, relative);
        fs::create_dir_all(path.parent().expect("parent")).expect("mkdir");
        fs::write(path, contents).expect("write");
    }

    #[rstest]
    #[case::shared_lib("lib/libLLVM.so", LINUX, true)]
    #[case::archive("lib/clang/19/lib/x86_64-unknown-linux-gnu/libclang_rt.asan.a", LINUX, true)]
    #[case::android_builtins("lib/clang/19/lib/linux/libclang_rt.builtins-aarch64-android.a", LINUX, false)]
    #[case::object("lib/clang/19/lib/x86_64-unknown-linux-gnu/clang_rt.crtbegin.o", LINUX, false)]
    #[case::mac_archive("lib/clang/19/lib/darwin/libclang_rt.osx.a", MAC, false)]
    fn debug_stripping_policy(#[case] path: &str, #[case] host: HostPlatform, #[case] expected: bool) {
        assert_eq!(should_strip_debug(path, host), expected);
    }

    #[rstest]
    #[case::linux_exe("bin/clang", LINUX, true)]
    #[case::mac_exe("bin/lld", MAC, true)]
    #[case::windows_exe("bin/clang-cl.exe", WINDOWS, false)]
    #[case::nested("bin/sub/tool", LINUX, false)]
    #[case::header("lib/clang/19/include/stddef.h", LINUX, false)]
    fn executable_stripping_policy(#[case] path: &str, #[case] host: HostPlatform, #[case] expected: bool) {
        assert_eq!(should_strip_all(path, host), expected);
    }

    #[rstest]
    fn stages_only_wanted_files_at_identical_paths(temp_dir: TempDir) {
        let root = utf8(temp_dir.path()).join("install");
        let staging = utf8(temp_dir.path()).join("stage");
        write(&root, "bin/clang", b"clang");
        write(&root, "bin/opt", b"opt");
        write(&root, "lib/clang/19/include/stddef.h", b"header");
        write(&root, "lib/clang/19/include/sanitizer/asan_interface.h", b"asan");
        let manifest =
            WantedFileManifest::from_templates(["bin/clang", "lib/clang/$V/include/*"], "19")
                .expect("manifest");

        let staged = stage_wanted_files(&StageParams {
            toolchain_root: &root,
            staging_dir: &staging,
            manifest: &manifest,
            host: LINUX,
            stripper: None,
        })
        .expect("staging succeeds");

        assert_eq!(
            staged,
            [
                "bin/clang",
                "lib/clang/19/include/sanitizer/asan_interface.h",
                "lib/clang/19/include/stddef.h",
            ]
        );
        assert_eq!(fs::read(staging.join("bin/clang")).expect("read"), b"clang");
        assert!(!staging.join("bin/opt").exists());
    }

    #[rstest]
    fn strip_failures_are_tolerated(temp_dir: TempDir) {
        let root = utf8(temp_dir.path()).join("install");
        let staging = utf8(temp_dir.path()).join("stage");
        write(&root, "bin/clang", b"clang");
        write(&root, "lib/libLLVM.so", b"llvm");
        let manifest =
            WantedFileManifest::from_templates(["bin/clang", "lib/*.so"], "19").expect("manifest");

        let mut runner = MockCommandRunner::new();
        runner
            .expect_output()
            .withf(|inv| inv.program == "strip" && inv.args.first().map(String::as_str) == Some("-g"))
            .times(1)
            .returning(|_| Ok(output_with(1, "")));
        runner
            .expect_output()
            .withf(|inv| inv.program == "strip" && inv.args.len() == 1)
            .times(1)
            .returning(|_| Err(std::io::Error::from(std::io::ErrorKind::NotFound)));
        let stripper = Stripper::new(&runner, "strip");

        let staged = stage_wanted_files(&StageParams {
            toolchain_root: &root,
            staging_dir: &staging,
            manifest: &manifest,
            host: LINUX,
            stripper: Some(&stripper),
        })
        .expect("strip failures do not fail staging");
        assert_eq!(staged.len(), 2);
    }

    #[cfg(unix)]
    #[rstest]
    fn file_symlinks_are_copied_as_files(temp_dir: TempDir) {
        let root = utf8(temp_dir.path()).join("install");
        let staging = utf8(temp_dir.path()).join("stage");
        write(&root, "bin/clang-19", b"driver");
        std::os::unix::fs::symlink("clang-19", root.join("bin/clang")).expect("symlink");
        let manifest = WantedFileManifest::from_templates(["bin/clang"], "19").expect("manifest");

        stage_wanted_files(&StageParams {
            toolchain_root: &root,
            staging_dir: &staging,
            manifest: &manifest,
            host: LINUX,
            stripper: None,
        })
        .expect("staging succeeds");

        let staged = staging.join("bin/clang");
        assert!(!fs::symlink_metadata(&staged).expect("meta").file_type().is_symlink());
        assert_eq!(fs::read(staged).expect("read"), b"driver");
    }

    #[test]
    fn relative_posix_uses_forward_slashes() {
        let root = Utf8Path::new("/tc");
        let rel = relative_posix(Path::new("/tc/lib/clang/19/include/stddef.h"), root)
            .expect("relative");
        assert_eq!(rel, "lib/clang/19/include/stddef.h");
    }
}
