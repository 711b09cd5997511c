use std::fs::{self, File};
use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use sha2::{Digest, Sha256};

/// Source document as read from disk, with the hash of its exact bytes.
#[derive(Debug, Clone)]
pub struct SourceText {
    pub text: String,
    pub sha256: String,
    pub byte_count: usize,
}

pub fn utc_string(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Secs, true)
}

pub fn utc_compact_string(ts: DateTime<Utc>) -> String {
    ts.format("%Y%m%dT%H%M%SZ").to_string()
}

pub fn ensure_directory(path: &Path) -> Result<()> {
    fs::create_dir_all(path)
        .with_context(|| format!("failed to create directory: {}", path.display()))
}

pub fn sha256_hex(data: &[u8]) -> String {
    format!("{:x}", Sha256::digest(data))
}

/// Reads a UTF-8 source file; a leading byte-order mark is dropped.
pub fn read_source_text(path: &Path) -> Result<SourceText> {
    let bytes =
        fs::read(path).with_context(|| format!("failed to read source file: {}", path.display()))?;
    let sha256 = sha256_hex(&bytes);
    let byte_count = bytes.len();

    let text = String::from_utf8(bytes)
        .with_context(|| format!("source file is not valid UTF-8: {}", path.display()))?;
    let text = match text.strip_prefix('\u{feff}') {
        Some(rest) => rest.to_string(),
        None => text,
    };

    Ok(SourceText {
        text,
        sha256,
        byte_count,
    })
}

pub fn write_json_pretty<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        ensure_directory(parent)?;
    }

    let data = serde_json::to_vec_pretty(value)
        .with_context(|| format!("failed to serialize json: {}", path.display()))?;

    let mut file = File::create(path)
        .with_context(|| format!("failed to create json file: {}", path.display()))?;
    file.write_all(&data)
        .with_context(|| format!("failed to write json file: {}", path.display()))?;
    file.write_all(b"\n")
        .with_context(|| format!("failed to finalize json file: {}", path.display()))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn sha256_hex_matches_known_digest() {
        assert_eq!(
            sha256_hex(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn timestamps_use_epub_compatible_formats() {
        let ts = Utc
            .with_ymd_and_hms(2026, 10, 19, 8, 5, 3)
            .single()
            .expect("valid timestamp");
        assert_eq!(utc_string(ts), "2026-10-19T08:05:03Z");
        assert_eq!(utc_compact_string(ts), "20261019T080503Z");
    }
}
