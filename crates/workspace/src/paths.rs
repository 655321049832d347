use std::collections::{HashMap, HashSet};

use crate::record::{FileRecord, RecordId};

/// Resolves slash-separated paths for records of one snapshot.
/// 針對單一快照解析紀錄的斜線路徑。
///
/// A missing parent ends the walk (the record is treated as its own root);
/// a parent cycle yields `None`.
/// 找不到父節點時停止向上走訪（視為根）；遇到父節點循環則回傳 `None`。
#[derive(Debug)]
pub struct RecordPaths<'a> {
    by_id: HashMap<&'a RecordId, &'a FileRecord>,
}

impl<'a> RecordPaths<'a> {
    pub fn new(records: &'a [FileRecord]) -> Self {
        let mut by_id = HashMap::with_capacity(records.len());
        for record in records {
            by_id.entry(&record.id).or_insert(record);
        }
        Self { by_id }
    }

    /// Names from the outermost ancestor down to the record itself.
    /// 由最外層祖先到紀錄本身的名稱序列。
    pub fn segments(&self, id: &RecordId) -> Option<Vec<&'a str>> {
        let mut current = *self.by_id.get(id)?;
        let mut seen = HashSet::new();
        let mut segments = vec![current.name.as_str()];
        seen.insert(&current.id);
        while let Some(parent_id) = &current.parent_id {
            let Some(&parent) = self.by_id.get(parent_id) else {
                break;
            };
            if !seen.insert(&parent.id) {
                return None;
            }
            segments.push(parent.name.as_str());
            current = parent;
        }
        segments.reverse();
        Some(segments)
    }

    /// Absolute workspace path, e.g. `/demo/src/App.js`.
    /// 工作區絕對路徑，例如 `/demo/src/App.js`。
    pub fn path(&self, id: &RecordId) -> Option<String> {
        self.segments(id)
            .map(|segments| format!("/{}", segments.join("/")))
    }

    /// Path as seen by the preview bundle: the project root folder is stripped and a
    /// file sitting directly inside `src/` is hoisted to the top level.
    /// 預覽使用的路徑：移除專案根資料夾，並將直接位於 `src/` 下的檔案提升至頂層。
    pub fn preview_path(&self, id: &RecordId) -> Option<String> {
        let segments = self.segments(id)?;
        let rest = segments.get(1..).unwrap_or_default();
        match rest {
            [] => Some("/".to_string()),
            ["src", file] => Some(format!("/{file}")),
            parts => Some(format!("/{}", parts.join("/"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn records() -> Vec<FileRecord> {
        vec![
            FileRecord::folder("1", None, "demo"),
            FileRecord::folder("2", Some("1".into()), "src"),
            FileRecord::file("3", Some("2".into()), "App.js", ""),
            FileRecord::folder("4", Some("2".into()), "components"),
            FileRecord::file("5", Some("4".into()), "Button.js", ""),
            FileRecord::file("6", Some("gone".into()), "orphan.js", ""),
            FileRecord::folder("7", Some("8".into()), "loop-a"),
            FileRecord::folder("8", Some("7".into()), "loop-b"),
        ]
    }

    #[test]
    fn resolves_absolute_paths() {
        let records = records();
        let paths = RecordPaths::new(&records);
        assert_eq!(paths.path(&"3".into()).as_deref(), Some("/demo/src/App.js"));
        assert_eq!(
            paths.path(&"5".into()).as_deref(),
            Some("/demo/src/components/Button.js")
        );
        assert_eq!(paths.path(&"6".into()).as_deref(), Some("/orphan.js"));
        assert!(paths.path(&"missing".into()).is_none());
    }

    #[test]
    fn cycles_have_no_path() {
        let records = records();
        let paths = RecordPaths::new(&records);
        assert!(paths.path(&"7".into()).is_none());
    }

    #[test]
    fn preview_paths_hoist_src_files() {
        let records = records();
        let paths = RecordPaths::new(&records);
        assert_eq!(paths.preview_path(&"3".into()).as_deref(), Some("/App.js"));
        assert_eq!(
            paths.preview_path(&"5".into()).as_deref(),
            Some("/src/components/Button.js")
        );
        assert_eq!(paths.preview_path(&"1".into()).as_deref(), Some("/"));
    }
}
