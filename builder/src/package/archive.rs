//! Reproducible `.tar.xz` archive creation.
//!
//! Members are added in sorted relative-path order with deterministic
//! headers, so identical staging trees always produce identical bytes.

use super::error::PackagingError;
use super::stage::{join_posix, relative_posix};
use super::state::PackagingStage;
use camino::{Utf8Path, Utf8PathBuf};
use sha2::{Digest, Sha256};
use std::fs;
use std::io::{self, Read};
use walkdir::WalkDir;
use xz2::stream::{Check, Stream};
use xz2::write::XzEncoder;

const STAGE: PackagingStage = PackagingStage::Archived;

/// liblzma's `LZMA_PRESET_EXTREME` flag.
const PRESET_EXTREME: u32 = 0x8000_0000;

/// Strongest xz preset: level 9 with the extreme flag.
pub const MAX_COMPRESSION: u32 = 9 | PRESET_EXTREME;

/// Collect the relative paths of every file and symbolic link in `dir`,
/// sorted lexicographically.
///
/// Directories are not members; links to directories are not followed.
///
/// # Errors
///
/// Returns [`PackagingError::Walk`] on traversal failures and
/// [`PackagingError::NonUtf8Path`] for non-UTF-8 names.
pub fn collect_members(dir: &Utf8Path) -> Result<Vec<String>, PackagingError> {
    let mut members = Vec::new();
    for entry in WalkDir::new(dir).follow_links(false).sort_by_file_name() {
        let entry = entry.map_err(|source| PackagingError::Walk {
            stage: STAGE,
            source,
        })?;
        if entry.file_type().is_dir() {
            continue;
        }
        members.push(relative_posix(entry.path(), dir)?);
    }
    members.sort();
    Ok(members)
}

/// Write `staging_dir` to `archive_path` as a `.tar.xz` archive.
///
/// The archive is written to `<archive_path>.partial` and renamed into
/// place once the encoder has finished, so a failure never leaves a
/// complete-looking archive behind. Returns the archived member paths.
///
/// # Errors
///
/// Returns [`PackagingError::Io`] if any member cannot be read or the
/// archive cannot be written.
pub fn create_archive(
    staging_dir: &Utf8Path,
    archive_path: &Utf8Path,
    preset: u32,
) -> Result<Vec<String>, PackagingError> {
    let members = collect_members(staging_dir)?;
    let partial = partial_path(archive_path);

    let result = write_archive(staging_dir, &partial, &members, preset);
    if let Err(err) = result {
        let _ = fs::remove_file(&partial);
        return Err(err);
    }

    fs::rename(&partial, archive_path).map_err(PackagingError::io(STAGE))?;
    Ok(members)
}

fn write_archive(
    staging_dir: &Utf8Path,
    output: &Utf8Path,
    members: &[String],
    preset: u32,
) -> Result<(), PackagingError> {
    let io_err = PackagingError::io(STAGE);
    let file = fs::File::create(output).map_err(io_err)?;
    let stream = Stream::new_easy_encoder(preset, Check::Crc64)
        .map_err(|e| PackagingError::io(STAGE)(io::Error::other(e)))?;
    let mut builder = tar::Builder::new(XzEncoder::new_stream(file, stream));
    builder.mode(tar::HeaderMode::Deterministic);
    builder.follow_symlinks(false);

    for member in members {
        builder
            .append_path_with_name(join_posix(staging_dir, member), member)
            .map_err(PackagingError::io(STAGE))?;
    }

    let encoder = builder.into_inner().map_err(PackagingError::io(STAGE))?;
    let file = encoder.finish().map_err(PackagingError::io(STAGE))?;
    file.sync_all().map_err(PackagingError::io(STAGE))?;
    Ok(())
}

pub(crate) fn partial_path(archive_path: &Utf8Path) -> Utf8PathBuf {
    let mut name = archive_path.file_name().unwrap_or("archive").to_owned();
    name.push_str(".partial");
    archive_path.with_file_name(name)
}

/// Compute the lowercase hex SHA-256 digest of a file.
///
/// # Errors
///
/// Returns [`PackagingError::Io`] if the file cannot be read.
pub fn compute_sha256(path: &Utf8Path) -> Result<String, PackagingError> {
    let mut file = fs::File::open(path).map_err(PackagingError::io(PackagingStage::Done))?;
    let mut hasher = Sha256::new();
    let mut buffer = [0u8; 8192];
    loop {
        let bytes_read = file
            .read(&mut buffer)
            .map_err(PackagingError::io(PackagingStage::Done))?;
        if bytes_read == 0 {
            break;
        }
        hasher.update(&buffer[..bytes_read]);
    }
    Ok(format!("{:x}", hasher.finalize()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::{fixture, rstest};
    use tempfile::TempDir;
    use xz2::read::XzDecoder;

    /// Moderate preset keeps test memory use low.
    const TEST_PRESET: u32 = 6;

    #[fixture]
    fn temp() -> (TempDir, Utf8PathBuf) {
        let temp = TempDir::new().expect("temp dir");
        let path = Utf8PathBuf::try_from(temp.path().to_path_buf()).expect("utf8");
        (temp, path)
    }

    fn populate(root: &Utf8Path) {
        for (relative, contents) in [
            ("lib/clang/19/include/stddef.h", "header"),
            ("bin/lld", "linker"),
            ("bin/clang", "driver"),
        ] {
            let path = join_posix(root, relative);
            fs::create_dir_all(path.parent().expect("parent")).expect("mkdir");
            fs::write(path, contents).expect("write");
        }
    }

    fn entry_names(archive: &Utf8Path) -> Vec<String> {
        let file = fs::File::open(archive).expect("open");
        let mut archive = tar::Archive::new(XzDecoder::new(file));
        archive
            .entries()
            .expect("entries")
            .map(|e| {
                let entry = e.expect("entry");
                entry.path().expect("path").to_string_lossy().into_owned()
            })
            .collect()
    }

    #[rstest]
    fn members_are_sorted(temp: (TempDir, Utf8PathBuf)) {
        let (_temp, root) = temp;
        let staging = root.join("stage");
        populate(&staging);
        let archive = root.join("out.tar.xz");

        let members = create_archive(&staging, &archive, TEST_PRESET).expect("archive");

        assert_eq!(members, ["bin/clang", "bin/lld", "lib/clang/19/include/stddef.h"]);
        assert_eq!(entry_names(&archive), members);
        assert!(!partial_path(&archive).exists());
    }

    #[rstest]
    fn identical_trees_produce_identical_bytes(temp: (TempDir, Utf8PathBuf)) {
        let (_temp, root) = temp;
        let staging = root.join("stage");
        populate(&staging);
        let first = root.join("first.tar.xz");
        let second = root.join("second.tar.xz");

        create_archive(&staging, &first, TEST_PRESET).expect("first archive");
        create_archive(&staging, &second, TEST_PRESET).expect("second archive");

        assert_eq!(
            fs::read(&first).expect("read first"),
            fs::read(&second).expect("read second")
        );
        assert_eq!(
            compute_sha256(&first).expect("digest"),
            compute_sha256(&second).expect("digest")
        );
    }

    #[cfg(unix)]
    #[rstest]
    fn symlinks_are_archived_as_links(temp: (TempDir, Utf8PathBuf)) {
        let (_temp, root) = temp;
        let staging = root.join("stage");
        populate(&staging);
        std::os::unix::fs::symlink("clang", staging.join("bin/clang++")).expect("symlink");
        let archive = root.join("out.tar.xz");

        create_archive(&staging, &archive, TEST_PRESET).expect("archive");

        let file = fs::File::open(&archive).expect("open");
        let mut tar = tar::Archive::new(XzDecoder::new(file));
        let link = tar
            .entries()
            .expect("entries")
            .map(|e| e.expect("entry"))
            .find(|e| e.path().expect("path").to_string_lossy() == "bin/clang++")
            .expect("alias archived");
        assert_eq!(link.header().entry_type(), tar::EntryType::Symlink);
        assert_eq!(
            link.link_name().expect("link name").expect("present").to_string_lossy(),
            "clang"
        );
    }

    #[rstest]
    fn sha256_of_empty_file(temp: (TempDir, Utf8PathBuf)) {
        let (_temp, root) = temp;
        let path = root.join("empty");
        fs::write(&path, b"").expect("write");
        assert_eq!(
            compute_sha256(&path).expect("digest"),
            concat!(
                "e3b0c44298fc1c149afbf4c8996fb924",
                "27ae41e4649b934ca495991b7852b855"
            )
        );
    }
}
