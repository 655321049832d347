use std::collections::HashSet;

use cipherstudio_workspace::{
    FileKind, FileRecord, Forest, ForestBuilder, OrphanPolicy, ProjectId, RecordId,
};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::notice::NoticeQueue;
use crate::store::{
    validate_name, FileDraft, FilePatch, FileStore, NewProject, ProjectSummary, StoreError,
};

#[derive(Debug, Error)]
pub enum ExplorerError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("no project is open")]
    NoProject,
    #[error("no file is selected")]
    NoSelection,
    #[error("unknown record {0}")]
    UnknownRecord(RecordId),
    #[error("{0} is not a folder")]
    NotAFolder(RecordId),
    #[error("no user id configured")]
    MissingUser,
}

/// Status bar summary.
/// 狀態列摘要。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkspaceStatus {
    pub project_name: Option<String>,
    pub selected_file: Option<String>,
    pub file_count: usize,
    pub unsaved: usize,
    pub user_id: Option<String>,
}

/// Holds the open project, its records and the selection; forwards intents to the store.
/// 保存目前開啟的專案、紀錄與選取狀態，並將操作轉交給儲存層。
///
/// A failed call leaves local state as it was and queues an error notice.
/// 呼叫失敗時維持原本的本地狀態，並加入錯誤通知。
pub struct ExplorerController {
    store: Box<dyn FileStore>,
    user_id: Option<String>,
    policy: OrphanPolicy,
    projects: Vec<ProjectSummary>,
    project: Option<ProjectSummary>,
    records: Vec<FileRecord>,
    selected: Option<RecordId>,
    dirty: HashSet<RecordId>,
    notices: NoticeQueue,
}

impl ExplorerController {
    pub fn new(store: Box<dyn FileStore>) -> Self {
        Self {
            store,
            user_id: None,
            policy: OrphanPolicy::default(),
            projects: Vec::new(),
            project: None,
            records: Vec::new(),
            selected: None,
            dirty: HashSet::new(),
            notices: NoticeQueue::default(),
        }
    }

    pub fn with_user(mut self, user_id: Option<String>) -> Self {
        self.user_id = user_id;
        self
    }

    pub fn with_orphan_policy(mut self, policy: OrphanPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn user_id(&self) -> Option<&str> {
        self.user_id.as_deref()
    }

    pub fn projects(&self) -> &[ProjectSummary] {
        &self.projects
    }

    pub fn current_project(&self) -> Option<&ProjectSummary> {
        self.project.as_ref()
    }

    /// Current record snapshot, including unsaved edits.
    pub fn records(&self) -> &[FileRecord] {
        &self.records
    }

    pub fn forest(&self) -> Forest {
        ForestBuilder::with_policy(self.policy).build(&self.records)
    }

    pub fn notices(&self) -> &NoticeQueue {
        &self.notices
    }

    pub fn notices_mut(&mut self) -> &mut NoticeQueue {
        &mut self.notices
    }

    pub fn load_projects(&mut self) -> Result<&[ProjectSummary], ExplorerError> {
        let result = match self.user_id.as_deref() {
            Some(user) => self.store.list_projects(user).map_err(ExplorerError::from),
            None => Err(ExplorerError::MissingUser),
        };
        self.projects = self.report("Loading projects", result)?;
        Ok(&self.projects)
    }

    /// Creates a project and opens it.
    pub fn create_project(
        &mut self,
        name: &str,
        description: Option<String>,
    ) -> Result<ProjectSummary, ExplorerError> {
        let result = validate_name(name)
            .map(|name| NewProject {
                name: name.to_string(),
                description,
                user_id: self.user_id.clone(),
            })
            .and_then(|request| self.store.create_project(&request))
            .map_err(ExplorerError::from);
        let project = self.report("Creating project", result)?;
        info!(project = %project.id, name = %project.name, "project created");
        self.projects.push(project.clone());
        self.open_project(&project.id)?;
        Ok(project)
    }

    pub fn delete_project(&mut self, id: &ProjectId) -> Result<(), ExplorerError> {
        let result = self.store.delete_project(id).map_err(ExplorerError::from);
        self.report("Deleting project", result)?;
        self.projects.retain(|project| &project.id != id);
        if self.project.as_ref().is_some_and(|project| &project.id == id) {
            self.project = None;
            self.records.clear();
            self.selected = None;
            self.dirty.clear();
        }
        Ok(())
    }

    /// Loads a project's records, replacing the snapshot and clearing the selection.
    pub fn open_project(&mut self, id: &ProjectId) -> Result<(), ExplorerError> {
        let result = self.store.project_detail(id).map_err(ExplorerError::from);
        let detail = self.report("Opening project", result)?;
        debug!(project = %id, records = detail.files.len(), "project opened");
        self.project = Some(detail.project);
        self.records = detail.files;
        self.selected = None;
        self.dirty.clear();
        Ok(())
    }

    /// Refetches the open project. Unsaved edits are discarded; the selection is kept
    /// when the file still exists.
    pub fn reload(&mut self) -> Result<(), ExplorerError> {
        let result = self
            .project
            .as_ref()
            .ok_or(ExplorerError::NoProject)
            .and_then(|project| {
                self.store
                    .project_detail(&project.id)
                    .map_err(ExplorerError::from)
            });
        let detail = self.report("Reloading project", result)?;
        self.project = Some(detail.project);
        self.records = detail.files;
        self.dirty.clear();
        if let Some(selected) = &self.selected {
            if !self.is_file(selected) {
                self.selected = None;
            }
        }
        Ok(())
    }

    /// Selects a file. Folders are ignored and yield `Ok(false)`.
    pub fn select(&mut self, id: &RecordId) -> Result<bool, ExplorerError> {
        let record = self
            .record(id)
            .ok_or_else(|| ExplorerError::UnknownRecord(id.clone()))?;
        if record.kind == FileKind::Folder {
            return Ok(false);
        }
        self.selected = Some(id.clone());
        Ok(true)
    }

    pub fn clear_selection(&mut self) {
        self.selected = None;
    }

    pub fn selected(&self) -> Option<&FileRecord> {
        self.selected.as_ref().and_then(|id| self.record(id))
    }

    pub fn selected_id(&self) -> Option<&RecordId> {
        self.selected.as_ref()
    }

    /// Applies an editor change to the selected file locally.
    pub fn edit_content(&mut self, content: impl Into<String>) -> Result<(), ExplorerError> {
        let id = self.selected.clone().ok_or(ExplorerError::NoSelection)?;
        let record = self
            .records
            .iter_mut()
            .find(|record| record.id == id)
            .ok_or_else(|| ExplorerError::UnknownRecord(id.clone()))?;
        record.content = Some(content.into());
        self.dirty.insert(id);
        Ok(())
    }

    pub fn is_dirty(&self, id: &RecordId) -> bool {
        self.dirty.contains(id)
    }

    pub fn save_selected(&mut self) -> Result<FileRecord, ExplorerError> {
        let result = self
            .selected()
            .map(|record| (record.id.clone(), FilePatch::content(record.text())))
            .ok_or(ExplorerError::NoSelection)
            .and_then(|(id, patch)| {
                self.store
                    .update_file(&id, &patch)
                    .map_err(ExplorerError::from)
            });
        let saved = self.report("Saving file", result)?;
        if let Some(record) = self.records.iter_mut().find(|record| record.id == saved.id) {
            *record = saved.clone();
        }
        self.dirty.remove(&saved.id);
        self.notices.success("File saved");
        Ok(saved)
    }

    pub fn create_file(
        &mut self,
        parent: Option<&RecordId>,
        name: &str,
    ) -> Result<FileRecord, ExplorerError> {
        let result = self
            .draft(parent, name, FileKind::File)
            .and_then(|draft| self.store.create_file(&draft).map_err(ExplorerError::from));
        self.insert_created("Creating file", result)
    }

    pub fn create_folder(
        &mut self,
        parent: Option<&RecordId>,
        name: &str,
    ) -> Result<FileRecord, ExplorerError> {
        let result = self
            .draft(parent, name, FileKind::Folder)
            .and_then(|draft| self.store.create_file(&draft).map_err(ExplorerError::from));
        self.insert_created("Creating folder", result)
    }

    /// Deletes one record. Clears the selection when it pointed at that record.
    pub fn delete_file(&mut self, id: &RecordId) -> Result<(), ExplorerError> {
        let result = if self.record(id).is_some() {
            self.store.delete_file(id).map_err(ExplorerError::from)
        } else {
            Err(ExplorerError::UnknownRecord(id.clone()))
        };
        self.report("Deleting file", result)?;
        self.records.retain(|record| &record.id != id);
        self.dirty.remove(id);
        if self.selected.as_ref() == Some(id) {
            self.selected = None;
        }
        Ok(())
    }

    pub fn status(&self) -> WorkspaceStatus {
        WorkspaceStatus {
            project_name: self.project.as_ref().map(|project| project.name.clone()),
            selected_file: self.selected().map(|record| record.name.clone()),
            file_count: self
                .records
                .iter()
                .filter(|record| record.kind == FileKind::File)
                .count(),
            unsaved: self.dirty.len(),
            user_id: self.user_id.clone(),
        }
    }

    fn record(&self, id: &RecordId) -> Option<&FileRecord> {
        self.records.iter().find(|record| &record.id == id)
    }

    fn is_file(&self, id: &RecordId) -> bool {
        self.record(id)
            .is_some_and(|record| record.kind == FileKind::File)
    }

    fn draft(
        &self,
        parent: Option<&RecordId>,
        name: &str,
        kind: FileKind,
    ) -> Result<FileDraft, ExplorerError> {
        let project = self.project.as_ref().ok_or(ExplorerError::NoProject)?;
        let name = validate_name(name)?;
        if let Some(parent) = parent {
            let record = self
                .record(parent)
                .ok_or_else(|| ExplorerError::UnknownRecord(parent.clone()))?;
            if record.kind != FileKind::Folder {
                return Err(ExplorerError::NotAFolder(parent.clone()));
            }
        }
        let project_id = project.id.clone();
        let parent_id = parent.cloned();
        Ok(match kind {
            FileKind::File => FileDraft::file(project_id, parent_id, name),
            FileKind::Folder => FileDraft::folder(project_id, parent_id, name),
        })
    }

    fn insert_created(
        &mut self,
        action: &str,
        result: Result<FileRecord, ExplorerError>,
    ) -> Result<FileRecord, ExplorerError> {
        let record = self.report(action, result)?;
        debug!(id = %record.id, name = %record.name, "record created");
        self.records.push(record.clone());
        Ok(record)
    }

    fn report<T>(
        &mut self,
        action: &str,
        result: Result<T, ExplorerError>,
    ) -> Result<T, ExplorerError> {
        result.inspect_err(|err| {
            warn!(action, error = %err, "explorer operation failed");
            self.notices.error(format!("{action} failed: {err}"));
        })
    }
}
