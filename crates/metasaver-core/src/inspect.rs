// File: crates/metasaver-core/src/inspect.rs

//! Read-only metadata listing, used to show what a strip removed.

use crate::MetaSaverError;
use nom_exif::{ExifIter, MediaParser, MediaSource};
use std::io::Cursor;
use std::path::Path;

const PNG_SIGNATURE: [u8; 8] = [137, 80, 78, 71, 13, 10, 26, 10];

/// Represents a single piece of metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetadataEntry {
    pub key: String,
    pub value: String,
    pub category: String, // e.g., "EXIF", "GPS", "tEXt"
}

/// Lists the metadata found in an image file.
pub async fn inspect_file(path: &Path) -> Result<Vec<MetadataEntry>, MetaSaverError> {
    let bytes = tokio::fs::read(path).await?;
    inspect_bytes(&bytes)
}

/// Lists EXIF entries (JPEG, HEIC, TIFF) or PNG text chunks.
pub fn inspect_bytes(bytes: &[u8]) -> Result<Vec<MetadataEntry>, MetaSaverError> {
    if bytes.len() > PNG_SIGNATURE.len() && bytes[..PNG_SIGNATURE.len()] == PNG_SIGNATURE {
        return png_text_entries(bytes);
    }
    exif_entries(bytes)
}

fn exif_entries(bytes: &[u8]) -> Result<Vec<MetadataEntry>, MetaSaverError> {
    let media_source = MediaSource::seekable(Cursor::new(bytes))
        .map_err(|e| MetaSaverError::UnsupportedKind(format!("not an inspectable image: {e:?}")))?;

    if !media_source.has_exif() {
        if media_source.has_track() {
            return Err(MetaSaverError::UnsupportedKind(
                "video containers cannot be inspected".to_string(),
            ));
        }
        return Ok(Vec::new());
    }

    let mut parser = MediaParser::new();
    let exif_iter: ExifIter = parser
        .parse(media_source)
        .map_err(|e| MetaSaverError::ParsingError(format!("Failed to parse EXIF: {e:?}")))?;

    let entries = exif_iter
        .map(|entry| {
            let key = match entry.tag() {
                Some(tag) => format!("{tag:?}"),
                None => "<Unknown Tag>".to_string(),
            };
            let category = match entry.ifd_index() {
                0 => "IFD0".to_string(),
                1 => "IFD1".to_string(),
                2 => "EXIF".to_string(),
                3 => "GPS".to_string(),
                4 => "Interop".to_string(),
                n => format!("IFD_{n}"),
            };
            let value = match entry.get_value() {
                Some(value) => format!("{value:?}"),
                None => "<No Value>".to_string(),
            };
            MetadataEntry {
                key,
                value,
                category,
            }
        })
        .collect();
    Ok(entries)
}

fn png_text_entries(bytes: &[u8]) -> Result<Vec<MetadataEntry>, MetaSaverError> {
    let decoder = png::Decoder::new(Cursor::new(bytes));
    let reader = decoder
        .read_info()
        .map_err(|e| MetaSaverError::ParsingError(e.to_string()))?;
    let info = reader.info();

    let mut entries: Vec<MetadataEntry> = info
        .uncompressed_latin1_text
        .iter()
        .map(|chunk| MetadataEntry {
            key: chunk.keyword.clone(),
            value: chunk.text.clone(),
            category: "tEXt".to_string(),
        })
        .collect();
    entries.extend(info.compressed_latin1_text.iter().map(|chunk| MetadataEntry {
        key: chunk.keyword.clone(),
        value: chunk.get_text().unwrap_or_else(|_| "<Undecodable>".to_string()),
        category: "zTXt".to_string(),
    }));
    entries.extend(info.utf8_text.iter().map(|chunk| MetadataEntry {
        key: chunk.keyword.clone(),
        value: chunk.get_text().unwrap_or_else(|_| "<Undecodable>".to_string()),
        category: "iTXt".to_string(),
    }));

    Ok(entries)
}
