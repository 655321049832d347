//! Project explorer: persistence collaborators, selection state and notices.
//! 專案總管：儲存層協作者、選取狀態與通知。

pub mod auth;
pub mod controller;
pub mod local;
pub mod notice;
pub mod rest;
pub mod scaffold;
pub mod store;

pub use auth::BearerToken;
pub use controller::{ExplorerController, ExplorerError, WorkspaceStatus};
pub use local::LocalFileStore;
pub use notice::{Notice, NoticeLevel, NoticeQueue, DEFAULT_NOTICE_TTL};
pub use rest::RestFileStore;
pub use scaffold::{scaffold_records, WELCOME_APP};
pub use store::{
    validate_name, FileDraft, FilePatch, FileStore, NewProject, ProjectDetail, ProjectSummary,
    StoreError,
};

use cipherstudio_settings::{Settings, StorageBackend};

/// Builds the store selected in `settings`.
/// 依設定建立對應的儲存層。
pub fn open_store(
    settings: &Settings,
    token: Option<BearerToken>,
) -> Result<Box<dyn FileStore>, StoreError> {
    match settings.storage.backend {
        StorageBackend::Remote => Ok(Box::new(
            RestFileStore::new(settings.api.base_url.clone(), settings.api.timeout())
                .with_token(token),
        )),
        StorageBackend::Local => Ok(Box::new(LocalFileStore::open(
            settings.storage.local_path.clone(),
        )?)),
    }
}

/// Controller wired to the configured store, user and orphan policy.
/// 依設定的儲存層、使用者與孤兒策略建立控制器。
pub fn controller_from_settings(
    settings: &Settings,
    token: Option<BearerToken>,
) -> Result<ExplorerController, StoreError> {
    Ok(ExplorerController::new(open_store(settings, token)?)
        .with_user(settings.api.user_id.clone())
        .with_orphan_policy(settings.workspace.orphan_policy))
}
