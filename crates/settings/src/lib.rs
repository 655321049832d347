//! IDE configuration and the resizable pane layout.
//! IDE 設定與可調整大小的窗格版面。

pub mod layout;
pub mod preferences;

pub use layout::{
    Divider, DragState, LayoutError, PaneBounds, PaneLayout, PaneRegions, PointerEvent, Span,
};
pub use preferences::{
    settings_path_from_env, ApiSettings, PreviewSettings, Settings, SettingsError, SettingsStore,
    StorageBackend, StorageSettings, WorkspaceSettings, API_URL_ENV, DEFAULT_SETTINGS_FILE,
    SETTINGS_PATH_ENV, TOKEN_ENV,
};
