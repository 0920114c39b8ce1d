//! Bundle output collection and atomic writing.
//!
//! Every file is first written next to its target with a `.tmp` suffix and
//! renamed once all writes succeeded. On failure the temporary files are
//! removed and the output directory keeps its previous contents.

use std::fs;
use std::path::{Path, PathBuf};

use path_clean::PathClean;
use rolldown::BundleOutput;
use rolldown_common::Output;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::error::{BuildError, Result};
use crate::scope::ensure_not_cancelled;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputKind {
    Chunk,
    Asset,
}

/// One output file as recorded in `meta.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputFile {
    /// Path relative to the output directory, `/` separated.
    pub file: String,
    pub kind: OutputKind,
    #[serde(default)]
    pub is_entry: bool,
    pub bytes: u64,
}

/// An output file together with its contents.
#[derive(Debug, Clone)]
pub struct EmittedFile {
    pub meta: OutputFile,
    pub contents: Vec<u8>,
}

/// Flatten a bundle into files, chunks and assets alike.
pub fn collect_outputs(output: &BundleOutput) -> Vec<EmittedFile> {
    output
        .assets
        .iter()
        .map(|item| match item {
            Output::Chunk(chunk) => emitted(
                chunk.filename.as_str(),
                OutputKind::Chunk,
                chunk.is_entry,
                chunk.code.as_bytes(),
            ),
            Output::Asset(asset) => emitted(
                asset.filename.as_str(),
                OutputKind::Asset,
                false,
                asset.source.as_bytes(),
            ),
        })
        .collect()
}

fn emitted(file: &str, kind: OutputKind, is_entry: bool, contents: &[u8]) -> EmittedFile {
    EmittedFile {
        meta: OutputFile {
            file: file.replace('\\', "/"),
            kind,
            is_entry,
            bytes: contents.len() as u64,
        },
        contents: contents.to_vec(),
    }
}

/// Write `files` below `dir`, replacing existing files.
///
/// Once `token` is cancelled no further file is written and existing files
/// are left as they were.
pub fn write_output_files(dir: &Path, files: &[EmittedFile], token: &CancellationToken) -> Result<()> {
    let dir = dir.clean();
    fs::create_dir_all(&dir)?;

    let operations = files
        .iter()
        .map(|file| Ok((validate_output_path(&dir, &file.meta.file)?, file.contents.as_slice())))
        .collect::<Result<Vec<_>>>()?;

    write_files_atomic(&operations, token)?;
    tracing::debug!(files = operations.len(), dir = %dir.display(), "Wrote preview output");
    Ok(())
}

/// Resolve `filename` below `base_dir`, rejecting anything that escapes it.
fn validate_output_path(base_dir: &Path, filename: &str) -> Result<PathBuf> {
    if filename.contains('\0') {
        return Err(invalid_path(format!("Output file name contains a null byte: {:?}", filename)));
    }

    let full_path = base_dir.join(Path::new(filename).clean()).clean();
    if !full_path.starts_with(base_dir) {
        return Err(invalid_path(format!(
            "Output file '{}' escapes the output directory '{}'",
            filename,
            base_dir.display()
        )));
    }
    Ok(full_path)
}

fn invalid_path(message: String) -> BuildError {
    BuildError::Io(std::io::Error::new(std::io::ErrorKind::InvalidInput, message))
}

fn temp_path(target: &Path) -> PathBuf {
    let mut name = target.as_os_str().to_os_string();
    name.push(".tmp");
    PathBuf::from(name)
}

fn write_files_atomic(operations: &[(PathBuf, &[u8])], token: &CancellationToken) -> Result<()> {
    let mut written: Vec<(PathBuf, &Path)> = Vec::with_capacity(operations.len());

    for (target, contents) in operations {
        if let Err(e) = ensure_not_cancelled(token) {
            cleanup_temp_files(&written);
            return Err(e);
        }
        let result = target
            .parent()
            .map_or(Ok(()), fs::create_dir_all)
            .and_then(|()| {
                let temp = temp_path(target);
                fs::write(&temp, contents).map(|()| temp)
            });
        match result {
            Ok(temp) => written.push((temp, target.as_path())),
            Err(e) => {
                cleanup_temp_files(&written);
                return Err(e.into());
            }
        }
    }

    for (temp, target) in &written {
        if let Err(e) = fs::rename(temp, target) {
            cleanup_temp_files(&written);
            return Err(e.into());
        }
    }

    Ok(())
}

fn cleanup_temp_files(written: &[(PathBuf, &Path)]) {
    for (temp, _) in written {
        if !temp.exists() {
            continue;
        }
        if let Err(e) = fs::remove_file(temp) {
            tracing::warn!(file = %temp.display(), error = %e, "Failed to remove temporary file");
        }
    }
}
