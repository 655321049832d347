use std::fs;
use std::io::{self, Read};
use std::path::Path;

use anyhow::{Context, Result};
use cipherstudio_explorer::ProjectDetail;
use cipherstudio_workspace::FileRecord;
use serde::Deserialize;

/// A snapshot file: either a bare record array or a project detail payload.
/// 快照檔：可為紀錄陣列，或是專案詳細資料。
#[derive(Deserialize)]
#[serde(untagged)]
enum Snapshot {
    Detail(ProjectDetail),
    Records(Vec<FileRecord>),
}

/// Reads records from `path`; `-` reads standard input.
pub fn load_records(path: &Path) -> Result<Vec<FileRecord>> {
    let text = read_input(path)?;
    let snapshot: Snapshot = serde_json::from_str(&text)
        .with_context(|| format!("failed to parse snapshot {}", path.display()))?;
    Ok(match snapshot {
        Snapshot::Detail(detail) => detail.files,
        Snapshot::Records(records) => records,
    })
}

/// Reads a whole file, or standard input when `path` is `-`.
pub fn read_input(path: &Path) -> Result<String> {
    if path == Path::new("-") {
        let mut text = String::new();
        io::stdin()
            .read_to_string(&mut text)
            .context("failed to read standard input")?;
        return Ok(text);
    }
    fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))
}
