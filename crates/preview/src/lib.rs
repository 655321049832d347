//! Live preview of a workspace entry file.
//! 工作區進入點檔案的即時預覽。
//!
//! The pipeline resolves the entry, rewrites its default export into a plain
//! declaration and hands the result to an isolated surface. The
//! [`PreviewRenderer`] owns the `Empty → Loading → Rendered | Errored` state machine.
//! 流程：解析進入點、將預設匯出改寫為一般宣告，再交給隔離的執行表面；
//! [`PreviewRenderer`] 負責狀態機。

pub mod document;
pub mod entry;
#[cfg(feature = "v8")]
pub mod isolate;
pub mod renderer;
pub mod surface;
pub mod transform;

pub use document::{
    placeholder_markup, prepare_document, PipelineError, PreviewDocument, DEFAULT_ENTRY_SYMBOL,
};
pub use entry::{resolve_entry, EntryResolver, EntryTieBreak, ResolvedEntry, DEFAULT_ENTRY_FILE};
#[cfg(feature = "v8")]
pub use isolate::{compile_jsx, V8Engine, DEFAULT_RENDER_TIMEOUT};
pub use renderer::{PreviewOutcome, PreviewRenderer, PreviewState, PreviewStatus};
pub use surface::{
    ErrorPhase, KillSwitch, PreviewError, SurfaceContent, SurfaceEngine, SurfaceHandle, SurfaceId,
};
pub use transform::{transform_entry, ExportRewrite, TransformedSource};
