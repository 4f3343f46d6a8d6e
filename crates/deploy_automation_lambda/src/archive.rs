//! Zip handling for pipeline artifacts.

use std::io::{Cursor, Read, Write};

use thiserror::Error;
use zip::result::ZipError;
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("artifact is not a readable zip archive: {0}")]
    Unreadable(#[source] ZipError),
    #[error("artifact has no entry named '{0}'")]
    MissingEntry(String),
    #[error("failed to read entry '{name}': {source}")]
    ReadEntry {
        name: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to write zip archive: {0}")]
    Write(#[source] ZipError),
}

impl From<std::io::Error> for ArchiveError {
    fn from(error: std::io::Error) -> Self {
        Self::Write(ZipError::Io(error))
    }
}

pub fn extract_entry(archive: &[u8], entry_name: &str) -> Result<Vec<u8>, ArchiveError> {
    let mut archive = ZipArchive::new(Cursor::new(archive)).map_err(ArchiveError::Unreadable)?;
    let mut entry = archive.by_name(entry_name).map_err(|error| match error {
        ZipError::FileNotFound => ArchiveError::MissingEntry(entry_name.to_string()),
        other => ArchiveError::Unreadable(other),
    })?;

    let mut body = Vec::new();
    entry
        .read_to_end(&mut body)
        .map_err(|source| ArchiveError::ReadEntry {
            name: entry_name.to_string(),
            source,
        })?;
    Ok(body)
}

/// Builds a deflated archive holding exactly one entry.
pub fn single_entry_archive(entry_name: &str, body: &[u8]) -> Result<Vec<u8>, ArchiveError> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = FileOptions::default().compression_method(CompressionMethod::Deflated);

    writer
        .start_file(entry_name, options)
        .map_err(ArchiveError::Write)?;
    writer.write_all(body)?;
    let cursor = writer.finish().map_err(ArchiveError::Write)?;
    Ok(cursor.into_inner())
}
