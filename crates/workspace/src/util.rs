use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::Serialize;

/// Writes `data` next to `path` under a hidden temporary name, then renames it into place.
/// 先寫入同目錄下的隱藏暫存檔，再以 rename 取代目標檔案。
pub fn write_atomic(path: &Path, data: &[u8]) -> io::Result<()> {
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let tmp_path = temporary_sibling(path);
    fs::write(&tmp_path, data)?;
    fs::rename(&tmp_path, path).inspect_err(|_| {
        let _ = fs::remove_file(&tmp_path);
    })
}

/// Pretty-prints `value` as JSON and stores it with [`write_atomic`].
/// 以 JSON 格式序列化並透過 [`write_atomic`] 寫入。
pub fn write_json_atomic<T: Serialize>(path: &Path, value: &T) -> io::Result<()> {
    let payload = serde_json::to_vec_pretty(value).map_err(io::Error::other)?;
    write_atomic(path, &payload)
}

fn temporary_sibling(path: &Path) -> PathBuf {
    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "snapshot".to_string());
    path.with_file_name(format!(".{file_name}.tmp"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn creates_parent_directories_and_leaves_no_temp_file() {
        let dir = tempdir().unwrap();
        let target = dir.path().join("nested").join("store.json");
        write_json_atomic(&target, &vec!["a", "b"]).unwrap();
        let stored: Vec<String> = serde_json::from_slice(&fs::read(&target).unwrap()).unwrap();
        assert_eq!(stored, vec!["a", "b"]);
        assert!(!dir.path().join("nested").join(".store.json.tmp").exists());
    }
}
