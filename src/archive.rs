// src/archive.rs

//! Archive extraction for compressed assets.
//!
//! Dispatches on magic bytes rather than file extensions, since asset
//! names are logical keys. Zip and tar entries land in the archive's
//! parent directory; a bare gzip file decompresses to the archive path
//! minus its extension. The archive file itself stays in place.

use crate::error::{Error, Result};
use flate2::read::GzDecoder;
use std::fs::{self, File};
use std::io::{Cursor, Read};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Supported archive formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveFormat {
    Zip,
    Gzip,
    Tar,
    Unknown,
}

impl ArchiveFormat {
    /// Detect the format from a file's leading bytes.
    ///
    /// Magic bytes:
    /// - Zip: `50 4b 03 04`
    /// - Gzip: `1f 8b`
    /// - Tar: "ustar" at offset 257
    pub fn from_magic_bytes(data: &[u8]) -> Self {
        if data.len() >= 4 && data[0..4] == [0x50, 0x4b, 0x03, 0x04] {
            Self::Zip
        } else if data.len() >= 2 && data[0] == 0x1f && data[1] == 0x8b {
            Self::Gzip
        } else if data.len() >= 262 && &data[257..262] == b"ustar" {
            Self::Tar
        } else {
            Self::Unknown
        }
    }
}

/// Decompress an archive next to itself
///
/// Gzip content that turns out to wrap a tar stream is unpacked like a
/// tarball; anything else gzip-compressed is written as a single file.
pub fn decompress(path: &Path) -> Result<()> {
    let head = read_head(path)?;
    let format = ArchiveFormat::from_magic_bytes(&head);
    debug!("detected {:?} archive at {}", format, path.display());

    let dest = path.parent().unwrap_or(Path::new(".")).to_path_buf();
    match format {
        ArchiveFormat::Zip => extract_zip(path, &dest),
        ArchiveFormat::Gzip => extract_gzip(path, &dest),
        ArchiveFormat::Tar => extract_tar(path, &dest),
        ArchiveFormat::Unknown => Err(Error::ArchiveError(format!(
            "unsupported archive format at {}",
            path.display()
        ))),
    }
}

fn read_head(path: &Path) -> Result<Vec<u8>> {
    let mut file = File::open(path)
        .map_err(|e| Error::ArchiveError(format!("open {}: {}", path.display(), e)))?;
    let mut head = vec![0u8; 512];
    let mut filled = 0;
    loop {
        let n = file.read(&mut head[filled..])?;
        if n == 0 {
            break;
        }
        filled += n;
        if filled == head.len() {
            break;
        }
    }
    head.truncate(filled);
    Ok(head)
}

fn extract_zip(path: &Path, dest: &Path) -> Result<()> {
    let file = File::open(path)?;
    let mut archive = zip::ZipArchive::new(file)
        .map_err(|e| Error::ArchiveError(format!("read zip {}: {}", path.display(), e)))?;
    archive
        .extract(dest)
        .map_err(|e| Error::ArchiveError(format!("extract {}: {}", path.display(), e)))?;
    Ok(())
}

fn extract_tar(path: &Path, dest: &Path) -> Result<()> {
    let file = File::open(path)?;
    let mut archive = tar::Archive::new(file);
    archive
        .unpack(dest)
        .map_err(|e| Error::ArchiveError(format!("untar {}: {}", path.display(), e)))?;
    Ok(())
}

fn extract_gzip(path: &Path, dest: &Path) -> Result<()> {
    let file = File::open(path)?;
    let mut decoder = GzDecoder::new(file);
    let mut inner = Vec::new();
    decoder
        .read_to_end(&mut inner)
        .map_err(|e| Error::ArchiveError(format!("gunzip {}: {}", path.display(), e)))?;

    if ArchiveFormat::from_magic_bytes(&inner) == ArchiveFormat::Tar {
        let mut archive = tar::Archive::new(Cursor::new(inner));
        archive
            .unpack(dest)
            .map_err(|e| Error::ArchiveError(format!("untar {}: {}", path.display(), e)))?;
        return Ok(());
    }

    let target = strip_archive_extension(path);
    fs::write(&target, inner)?;
    Ok(())
}

fn strip_archive_extension(path: &Path) -> PathBuf {
    if path.extension().is_some() {
        path.with_extension("")
    } else {
        let mut name = path.as_os_str().to_owned();
        name.push(".decompressed");
        PathBuf::from(name)
    }
}
