use std::fmt;

use serde::{Deserialize, Serialize};

/// Opaque identifier of a file/folder record, as issued by the persistence layer.
/// 由儲存層核發的檔案/資料夾紀錄識別碼（不透明字串）。
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(String);

impl RecordId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RecordId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for RecordId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Opaque identifier of a project.
/// 專案識別碼。
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProjectId(String);

impl ProjectId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ProjectId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Whether a record is a leaf file or a folder.
/// 紀錄的類型：檔案或資料夾。
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileKind {
    File,
    Folder,
}

impl FileKind {
    pub fn is_folder(self) -> bool {
        matches!(self, FileKind::Folder)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            FileKind::File => "file",
            FileKind::Folder => "folder",
        }
    }
}

/// One flat file/folder record as delivered in a project snapshot.
/// 專案快照中的單筆扁平檔案/資料夾紀錄。
///
/// Records reference their parent by id; `parent_id = None` marks a root.
/// 紀錄以識別碼指向父節點；`parent_id = None` 表示根節點。
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileRecord {
    #[serde(rename = "_id", alias = "id")]
    pub id: RecordId,
    pub name: String,
    #[serde(rename = "type", alias = "kind")]
    pub kind: FileKind,
    #[serde(default)]
    pub parent_id: Option<RecordId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_id: Option<ProjectId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

impl FileRecord {
    /// Builds a file record.
    /// 建立檔案紀錄。
    pub fn file(
        id: impl Into<RecordId>,
        parent_id: Option<RecordId>,
        name: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            kind: FileKind::File,
            parent_id,
            project_id: None,
            content: Some(content.into()),
        }
    }

    /// Builds a folder record.
    /// 建立資料夾紀錄。
    pub fn folder(
        id: impl Into<RecordId>,
        parent_id: Option<RecordId>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            kind: FileKind::Folder,
            parent_id,
            project_id: None,
            content: None,
        }
    }

    pub fn with_project(mut self, project_id: ProjectId) -> Self {
        self.project_id = Some(project_id);
        self
    }

    pub fn is_folder(&self) -> bool {
        self.kind.is_folder()
    }

    /// Content as text; folders and content-less files yield an empty string.
    /// 以字串取得內容；資料夾或無內容檔案回傳空字串。
    pub fn text(&self) -> &str {
        self.content.as_deref().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_persistence_wire_names() {
        let json = r#"[
            {"_id": "a1", "name": "demo", "type": "folder", "parentId": null, "projectId": "p1"},
            {"_id": "a2", "name": "App.js", "type": "file", "parentId": "a1", "content": "x"}
        ]"#;
        let records: Vec<FileRecord> = serde_json::from_str(json).unwrap();
        assert_eq!(records[0].kind, FileKind::Folder);
        assert_eq!(records[0].parent_id, None);
        assert_eq!(records[0].project_id, Some(ProjectId::from("p1")));
        assert_eq!(records[1].parent_id, Some(RecordId::from("a1")));
        assert_eq!(records[1].text(), "x");
    }

    #[test]
    fn accepts_short_aliases_and_missing_optionals() {
        let json = r#"{"id": "7", "name": "src", "kind": "folder"}"#;
        let record: FileRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.id.as_str(), "7");
        assert!(record.is_folder());
        assert!(record.parent_id.is_none());
        assert_eq!(record.text(), "");
    }

    #[test]
    fn serializes_back_to_wire_names() {
        let record = FileRecord::file("3", Some("2".into()), "App.js", "code");
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["_id"], "3");
        assert_eq!(value["type"], "file");
        assert_eq!(value["parentId"], "2");
        assert!(value.get("projectId").is_none());
    }
}
