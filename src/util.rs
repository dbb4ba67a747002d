use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::Path;

use anyhow::{Context, Result};
use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use sha2::{Digest, Sha256};

pub fn now_utc_string() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)
}

pub fn ensure_directory(path: &Path) -> Result<()> {
    fs::create_dir_all(path)
        .with_context(|| format!("failed to create directory: {}", path.display()))
}

/// Digest over several files, in order, each prefixed by its length so
/// that moving text between chapters changes the hash.
pub fn sha256_files<P: AsRef<Path>>(paths: &[P]) -> Result<String> {
    let mut hasher = Sha256::new();
    let mut buf = [0_u8; 8192];

    for path in paths {
        let path = path.as_ref();
        let mut file = File::open(path)
            .with_context(|| format!("failed to open file for hashing: {}", path.display()))?;
        let length = file
            .metadata()
            .with_context(|| format!("failed to stat file for hashing: {}", path.display()))?
            .len();
        hasher.update(length.to_le_bytes());

        loop {
            let count = file
                .read(&mut buf)
                .with_context(|| format!("failed to read file for hashing: {}", path.display()))?;
            if count == 0 {
                break;
            }
            hasher.update(&buf[..count]);
        }
    }

    Ok(format!("{:x}", hasher.finalize()))
}

pub fn write_json_pretty<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
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

pub fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let rendered = serde_json::to_string_pretty(value).context("failed to serialize output")?;
    let mut stdout = std::io::stdout().lock();
    writeln!(stdout, "{rendered}").context("failed to write to stdout")?;
    Ok(())
}
