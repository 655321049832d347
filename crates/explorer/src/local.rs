//! Single-file JSON persistence for offline use.
//! 供離線使用的單一 JSON 檔案儲存。

use std::fs;
use std::path::{Path, PathBuf};

use cipherstudio_workspace::{write_json_atomic, FileKind, FileRecord, ProjectId, RecordId};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::scaffold::scaffold_records;
use crate::store::{
    validate_name, FileDraft, FilePatch, FileStore, NewProject, ProjectDetail, ProjectSummary,
    StoreError,
};

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
struct Document {
    #[serde(default)]
    next_id: u64,
    #[serde(default)]
    projects: Vec<ProjectSummary>,
    #[serde(default)]
    files: Vec<FileRecord>,
}

/// Persistence backed by one JSON document, rewritten atomically on every change.
/// 以單一 JSON 文件儲存，每次變更皆以原子方式重寫。
#[derive(Debug)]
pub struct LocalFileStore {
    path: PathBuf,
    doc: Document,
}

impl LocalFileStore {
    /// Opens `path`, starting empty when the file does not exist yet.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        if !path.exists() {
            debug!(path = %path.display(), "local store missing; starting empty");
            return Ok(Self {
                path,
                doc: Document::default(),
            });
        }
        let contents = fs::read_to_string(&path).map_err(|source| StoreError::Read {
            path: path.clone(),
            source,
        })?;
        let doc = serde_json::from_str(&contents).map_err(|source| StoreError::Parse {
            path: path.clone(),
            source,
        })?;
        Ok(Self { path, doc })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn next_id(&mut self) -> String {
        self.doc.next_id += 1;
        format!("{:024x}", self.doc.next_id)
    }

    fn persist(&self) -> Result<(), StoreError> {
        write_json_atomic(&self.path, &self.doc).map_err(|source| StoreError::Write {
            path: self.path.clone(),
            source,
        })
    }

    /// Applies `op` and persists; in-memory state is rolled back if writing fails.
    fn commit<T>(
        &mut self,
        op: impl FnOnce(&mut Self) -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        let before = self.doc.clone();
        let result = op(self).and_then(|value| self.persist().map(|()| value));
        if result.is_err() {
            self.doc = before;
        }
        result
    }

    fn project(&self, id: &ProjectId) -> Result<&ProjectSummary, StoreError> {
        self.doc
            .projects
            .iter()
            .find(|project| &project.id == id)
            .ok_or_else(|| StoreError::ProjectNotFound(id.clone()))
    }

    fn file_index(&self, id: &RecordId) -> Result<usize, StoreError> {
        self.doc
            .files
            .iter()
            .position(|record| &record.id == id)
            .ok_or_else(|| StoreError::FileNotFound(id.clone()))
    }
}

impl FileStore for LocalFileStore {
    fn list_projects(&self, user_id: &str) -> Result<Vec<ProjectSummary>, StoreError> {
        Ok(self
            .doc
            .projects
            .iter()
            .filter(|project| project.user_id.as_deref() == Some(user_id))
            .cloned()
            .collect())
    }

    fn create_project(&mut self, project: &NewProject) -> Result<ProjectSummary, StoreError> {
        let name = validate_name(&project.name)?.to_string();
        self.commit(|store| {
            let summary = ProjectSummary {
                id: ProjectId::new(store.next_id()),
                name: name.clone(),
                description: project.description.clone(),
                user_id: project.user_id.clone(),
            };
            let records = scaffold_records(&summary.id, &name, || RecordId::new(store.next_id()));
            store.doc.projects.push(summary.clone());
            store.doc.files.extend(records);
            Ok(summary)
        })
    }

    fn delete_project(&mut self, id: &ProjectId) -> Result<(), StoreError> {
        self.project(id)?;
        self.commit(|store| {
            store.doc.projects.retain(|project| &project.id != id);
            store
                .doc
                .files
                .retain(|record| record.project_id.as_ref() != Some(id));
            Ok(())
        })
    }

    fn project_detail(&self, id: &ProjectId) -> Result<ProjectDetail, StoreError> {
        let project = self.project(id)?.clone();
        let files = self
            .doc
            .files
            .iter()
            .filter(|record| record.project_id.as_ref() == Some(id))
            .cloned()
            .collect();
        Ok(ProjectDetail { project, files })
    }

    fn create_file(&mut self, draft: &FileDraft) -> Result<FileRecord, StoreError> {
        self.project(&draft.project_id)?;
        let name = validate_name(&draft.name)?.to_string();
        if let Some(parent_id) = &draft.parent_id {
            let parent = &self.doc.files[self.file_index(parent_id)?];
            if parent.kind != FileKind::Folder || parent.project_id.as_ref() != Some(&draft.project_id)
            {
                return Err(StoreError::InvalidParent(parent_id.clone()));
            }
        }
        self.commit(|store| {
            let id = RecordId::new(store.next_id());
            let record = FileRecord {
                id,
                name,
                kind: draft.kind,
                parent_id: draft.parent_id.clone(),
                project_id: Some(draft.project_id.clone()),
                content: match draft.kind {
                    FileKind::File => Some(draft.content.clone().unwrap_or_default()),
                    FileKind::Folder => None,
                },
            };
            store.doc.files.push(record.clone());
            Ok(record)
        })
    }

    fn update_file(&mut self, id: &RecordId, patch: &FilePatch) -> Result<FileRecord, StoreError> {
        let index = self.file_index(id)?;
        if let Some(name) = &patch.name {
            validate_name(name)?;
        }
        self.commit(|store| {
            let record = &mut store.doc.files[index];
            patch.apply(record);
            Ok(record.clone())
        })
    }

    fn delete_file(&mut self, id: &RecordId) -> Result<(), StoreError> {
        let index = self.file_index(id)?;
        self.commit(|store| {
            store.doc.files.remove(index);
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn new_project(store: &mut LocalFileStore) -> ProjectSummary {
        store
            .create_project(&NewProject {
                name: "demo".into(),
                description: None,
                user_id: Some("u1".into()),
            })
            .unwrap()
    }

    #[test]
    fn create_project_scaffolds_and_persists() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("projects.json");
        let mut store = LocalFileStore::open(&path).unwrap();
        let project = new_project(&mut store);

        let reopened = LocalFileStore::open(&path).unwrap();
        let detail = reopened.project_detail(&project.id).unwrap();
        let names: Vec<_> = detail.files.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["demo", "src", "App.js"]);
        assert_eq!(reopened.list_projects("u1").unwrap().len(), 1);
        assert!(reopened.list_projects("u2").unwrap().is_empty());
    }

    #[test]
    fn file_lifecycle() {
        let dir = tempdir().unwrap();
        let mut store = LocalFileStore::open(dir.path().join("projects.json")).unwrap();
        let project = new_project(&mut store);
        let src = store.project_detail(&project.id).unwrap().files[1].id.clone();

        let created = store
            .create_file(&FileDraft::file(project.id.clone(), Some(src), "Button.js"))
            .unwrap();
        assert_eq!(created.text(), "");

        let updated = store
            .update_file(&created.id, &FilePatch::content("export default 1"))
            .unwrap();
        assert_eq!(updated.text(), "export default 1");
        assert_eq!(updated.name, "Button.js");

        store.delete_file(&created.id).unwrap();
        assert!(matches!(
            store.delete_file(&created.id),
            Err(StoreError::FileNotFound(_))
        ));
        assert_eq!(store.list_files(&project.id).unwrap().len(), 3);
    }

    #[test]
    fn rejects_bad_parents_and_names() {
        let dir = tempdir().unwrap();
        let mut store = LocalFileStore::open(dir.path().join("projects.json")).unwrap();
        let project = new_project(&mut store);
        let app = store.project_detail(&project.id).unwrap().files[2].id.clone();

        let under_file = FileDraft::file(project.id.clone(), Some(app), "x.js");
        assert!(matches!(
            store.create_file(&under_file),
            Err(StoreError::InvalidParent(_))
        ));
        let bad_name = FileDraft::file(project.id.clone(), None, "a/b");
        assert!(matches!(
            store.create_file(&bad_name),
            Err(StoreError::InvalidName(_))
        ));
        let unknown = FileDraft::file("nope".into(), None, "a.js");
        assert!(matches!(
            store.create_file(&unknown),
            Err(StoreError::ProjectNotFound(_))
        ));
    }

    #[test]
    fn delete_project_removes_its_files() {
        let dir = tempdir().unwrap();
        let mut store = LocalFileStore::open(dir.path().join("projects.json")).unwrap();
        let first = new_project(&mut store);
        let second = new_project(&mut store);
        store.delete_project(&first.id).unwrap();
        assert!(store.project_detail(&first.id).is_err());
        assert_eq!(store.list_files(&second.id).unwrap().len(), 3);
    }

    #[test]
    fn failed_write_rolls_back() {
        let dir = tempdir().unwrap();
        // A directory in place of the file makes the rename fail.
        let path = dir.path().join("blocked");
        fs::create_dir(&path).unwrap();
        let mut store = LocalFileStore {
            path,
            doc: Document::default(),
        };
        let result = store.create_project(&NewProject {
            name: "demo".into(),
            description: None,
            user_id: None,
        });
        assert!(matches!(result, Err(StoreError::Write { .. })));
        assert!(store.doc.projects.is_empty());
        assert_eq!(store.doc.next_id, 0);
    }
}
