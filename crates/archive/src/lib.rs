//! Archive unpackers for toolhome.
//!
//! Provides [`Unarchiver`] implementations for the formats toolchain bundles
//! ship in:
//! - `.tar.gz` / `.tgz` (gzip-compressed tarballs)
//! - `.tar` (plain tarballs)
//! - `.zip` / `.jar`
//!
//! Entries that would land outside the destination directory are skipped.
//! Unix permission bits are preserved so launchers stay executable.

use flate2::read::GzDecoder;
use std::fs::{self, File};
use std::io::{self, BufReader, Read};
use std::path::Path;
use tar::Archive;
use toolhome_core::extract::has_suffix;
use toolhome_core::{Error, Result, Unarchiver, UnarchiverRegistry};
use tracing::{debug, trace};

/// Unarchivers for every supported format, in lookup order.
#[must_use]
pub fn default_registry() -> UnarchiverRegistry {
    UnarchiverRegistry::new()
        .with(TarGzUnarchiver)
        .with(TarUnarchiver)
        .with(ZipUnarchiver)
}

fn open(archive: &Path) -> Result<BufReader<File>> {
    File::open(archive)
        .map(BufReader::new)
        .map_err(|e| Error::extraction_with_source(archive, "unable to open archive", e))
}

fn unpack_tar<R: Read>(reader: R, archive: &Path, dest: &Path) -> Result<()> {
    let mut tar = Archive::new(reader);
    tar.set_preserve_permissions(true);
    tar.set_overwrite(true);
    tar.unpack(dest)
        .map_err(|e| Error::extraction_with_source(archive, "failed to unpack tar archive", e))
}

/// Gzip-compressed tarballs.
#[derive(Debug, Clone, Copy, Default)]
pub struct TarGzUnarchiver;

impl Unarchiver for TarGzUnarchiver {
    fn name(&self) -> &'static str {
        "tar.gz"
    }

    fn can_handle(&self, archive: &Path) -> bool {
        has_suffix(archive, &[".tar.gz", ".tgz"])
    }

    fn extract(&self, archive: &Path, dest: &Path) -> Result<()> {
        debug!(?archive, ?dest, "Unpacking tar.gz");
        unpack_tar(GzDecoder::new(open(archive)?), archive, dest)
    }
}

/// Uncompressed tarballs.
#[derive(Debug, Clone, Copy, Default)]
pub struct TarUnarchiver;

impl Unarchiver for TarUnarchiver {
    fn name(&self) -> &'static str {
        "tar"
    }

    fn can_handle(&self, archive: &Path) -> bool {
        has_suffix(archive, &[".tar"])
    }

    fn extract(&self, archive: &Path, dest: &Path) -> Result<()> {
        debug!(?archive, ?dest, "Unpacking tar");
        unpack_tar(open(archive)?, archive, dest)
    }
}

/// Zip archives, including jars.
#[derive(Debug, Clone, Copy, Default)]
pub struct ZipUnarchiver;

impl Unarchiver for ZipUnarchiver {
    fn name(&self) -> &'static str {
        "zip"
    }

    fn can_handle(&self, archive: &Path) -> bool {
        has_suffix(archive, &[".zip", ".jar"])
    }

    fn extract(&self, archive: &Path, dest: &Path) -> Result<()> {
        debug!(?archive, ?dest, "Unpacking zip");
        let mut zip = zip::ZipArchive::new(open(archive)?)
            .map_err(|e| Error::extraction_with_source(archive, "failed to open zip archive", e))?;

        for i in 0..zip.len() {
            let mut entry = zip.by_index(i).map_err(|e| {
                Error::extraction_with_source(archive, "failed to read zip entry", e)
            })?;

            let Some(relative) = entry.enclosed_name() else {
                trace!(name = entry.name(), "Skipping zip entry outside destination");
                continue;
            };
            let outpath = dest.join(relative);
            let write_err = |e: io::Error| {
                Error::extraction_with_source(&outpath, "failed to write zip entry", e)
            };

            if entry.is_dir() {
                fs::create_dir_all(&outpath).map_err(write_err)?;
                continue;
            }
            if let Some(parent) = outpath.parent() {
                fs::create_dir_all(parent).map_err(write_err)?;
            }
            let mut out = File::create(&outpath).map_err(write_err)?;
            io::copy(&mut entry, &mut out).map_err(write_err)?;

            #[cfg(unix)]
            if let Some(mode) = entry.unix_mode() {
                use std::os::unix::fs::PermissionsExt;
                fs::set_permissions(&outpath, fs::Permissions::from_mode(mode))
                    .map_err(write_err)?;
            }
        }
        Ok(())
    }
}
