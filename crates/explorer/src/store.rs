use std::io;
use std::path::PathBuf;

use cipherstudio_workspace::{FileKind, FileRecord, ProjectId, RecordId};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Failures of the persistence collaborator.
/// 儲存層協作者的錯誤。
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("request to {url} failed: {message}")]
    Transport { url: String, message: String },
    #[error("{url} answered {status}: {message}")]
    Status {
        url: String,
        status: u16,
        message: String,
    },
    #[error("failed to decode response from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: io::Error,
    },
    #[error("project {0} not found")]
    ProjectNotFound(ProjectId),
    #[error("file {0} not found")]
    FileNotFound(RecordId),
    #[error("parent {0} is not a folder of this project")]
    InvalidParent(RecordId),
    #[error("invalid name {0:?}")]
    InvalidName(String),
    #[error("failed to read store {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse store {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to write store {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectSummary {
    #[serde(rename = "_id", alias = "id")]
    pub id: ProjectId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
}

/// A project together with all of its records.
/// 專案及其所有紀錄。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectDetail {
    pub project: ProjectSummary,
    #[serde(default)]
    pub files: Vec<FileRecord>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewProject {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
}

/// Request body for creating a record.
/// 建立紀錄的請求內容。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileDraft {
    pub project_id: ProjectId,
    pub parent_id: Option<RecordId>,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: FileKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

impl FileDraft {
    /// An empty file, as created from the explorer.
    pub fn file(project_id: ProjectId, parent_id: Option<RecordId>, name: impl Into<String>) -> Self {
        Self {
            project_id,
            parent_id,
            name: name.into(),
            kind: FileKind::File,
            content: Some(String::new()),
        }
    }

    pub fn folder(
        project_id: ProjectId,
        parent_id: Option<RecordId>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            project_id,
            parent_id,
            name: name.into(),
            kind: FileKind::Folder,
            content: None,
        }
    }
}

/// Partial update of a record; absent fields are left alone.
/// 紀錄的部分更新；未提供的欄位維持不變。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilePatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

impl FilePatch {
    pub fn content(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            ..Self::default()
        }
    }

    pub fn rename(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    pub fn apply(&self, record: &mut FileRecord) {
        if let Some(name) = &self.name {
            record.name = name.clone();
        }
        if let Some(content) = &self.content {
            record.content = Some(content.clone());
        }
    }
}

/// Persistence collaborator: request/response, every call fallible.
/// 儲存層協作者：請求/回應模式，每個呼叫都可能失敗。
pub trait FileStore: Send {
    fn list_projects(&self, user_id: &str) -> Result<Vec<ProjectSummary>, StoreError>;

    /// Creates a project; the backend scaffolds its root folder, `src` and `App.js`.
    /// 建立專案；後端會建立根資料夾、`src` 與 `App.js`。
    fn create_project(&mut self, project: &NewProject) -> Result<ProjectSummary, StoreError>;

    fn delete_project(&mut self, id: &ProjectId) -> Result<(), StoreError>;

    fn project_detail(&self, id: &ProjectId) -> Result<ProjectDetail, StoreError>;

    fn list_files(&self, id: &ProjectId) -> Result<Vec<FileRecord>, StoreError> {
        self.project_detail(id).map(|detail| detail.files)
    }

    fn create_file(&mut self, draft: &FileDraft) -> Result<FileRecord, StoreError>;

    fn update_file(&mut self, id: &RecordId, patch: &FilePatch) -> Result<FileRecord, StoreError>;

    /// Deletes exactly one record; its children are left in place.
    /// 僅刪除單一紀錄，子紀錄保持原狀。
    fn delete_file(&mut self, id: &RecordId) -> Result<(), StoreError>;
}

/// Accepts names that are non-empty, have no path separators and are not `.`/`..`.
/// 名稱須非空、不含路徑分隔符號，且不可為 `.` 或 `..`。
pub fn validate_name(name: &str) -> Result<&str, StoreError> {
    let trimmed = name.trim();
    if trimmed.is_empty()
        || trimmed == "."
        || trimmed == ".."
        || trimmed.contains(['/', '\\'])
    {
        return Err(StoreError::InvalidName(name.to_string()));
    }
    Ok(trimmed)
}
