use crate::cancel::CancelToken;
use crate::error::{MineError, Result};
use crate::types::config::ArchiveFormat;
use flate2::read::GzDecoder;
use std::fs::{self, File};
use std::io::{self, BufReader};
use std::path::{Path, PathBuf};
use tar::Archive;
use tracing::warn;
use zip::ZipArchive;

const STAGING_PREFIX: &str = ".staging-";

/// Unpack `archive` into a scratch directory under `work_root` and move
/// its single top-level directory to `dest`.
///
/// The scratch directory is removed on every path out of this function,
/// so `dest` either receives a complete tree or is left untouched.
pub fn extract_archive(
    archive: &Path,
    format: ArchiveFormat,
    work_root: &Path,
    dest: &Path,
    cancel: &CancelToken,
) -> Result<()> {
    fs::create_dir_all(work_root)?;
    let staging = tempfile::Builder::new()
        .prefix(STAGING_PREFIX)
        .tempdir_in(work_root)?;

    match format {
        ArchiveFormat::TarGz => unpack_tar_gz(archive, staging.path(), cancel)?,
        ArchiveFormat::Zip => unpack_zip(archive, staging.path(), cancel)?,
    }

    cancel.check()?;
    let top = single_top_level_dir(staging.path())?;
    fs::rename(&top, dest)?;
    Ok(())
}

fn unpack_tar_gz(archive: &Path, staging: &Path, cancel: &CancelToken) -> Result<()> {
    let file = File::open(archive)?;
    let mut tar = Archive::new(GzDecoder::new(BufReader::new(file)));
    for entry in tar.entries()? {
        cancel.check()?;
        let mut entry = entry?;
        if entry.header().entry_type().is_pax_global_extensions() {
            continue;
        }
        if !entry.unpack_in(staging)? {
            warn!(
                archive = %archive.display(),
                entry = %entry.path()?.display(),
                "skipping archive entry outside the extraction root"
            );
        }
    }
    Ok(())
}

fn unpack_zip(archive: &Path, staging: &Path, cancel: &CancelToken) -> Result<()> {
    let mut zip = ZipArchive::new(BufReader::new(File::open(archive)?))?;
    for index in 0..zip.len() {
        cancel.check()?;
        let mut member = zip.by_index(index)?;
        let Some(relative) = member.enclosed_name().map(Path::to_path_buf) else {
            warn!(
                archive = %archive.display(),
                entry = member.name(),
                "skipping archive entry outside the extraction root"
            );
            continue;
        };
        let target = staging.join(relative);
        if member.is_dir() {
            fs::create_dir_all(&target)?;
            continue;
        }
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut out = File::create(&target)?;
        io::copy(&mut member, &mut out)?;
    }
    Ok(())
}

fn single_top_level_dir(staging: &Path) -> Result<PathBuf> {
    let entries = fs::read_dir(staging)?.collect::<io::Result<Vec<_>>>()?;
    let [only] = entries.as_slice() else {
        return Err(MineError::Extract(format!(
            "expected one top-level directory, found {} entries",
            entries.len()
        )));
    };
    if !only.file_type()?.is_dir() {
        return Err(MineError::Extract(format!(
            "top-level entry {} is not a directory",
            only.file_name().to_string_lossy()
        )));
    }
    Ok(only.path())
}
