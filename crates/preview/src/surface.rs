//! Isolated execution surfaces.
//! 隔離的執行表面。
//!
//! Every mount runs on its own worker thread through a [`SurfaceEngine`]. The host only
//! ever receives a final [`SurfaceContent`]; dropping the [`SurfaceHandle`] tears the
//! surface down and discards anything it reports afterwards.
//! 每次掛載都在獨立的工作執行緒上透過 [`SurfaceEngine`] 執行；主程式僅接收最終的
//! [`SurfaceContent`]，丟棄 [`SurfaceHandle`] 即拆除表面並忽略之後的回報。

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, TryRecvError};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::document::{escape_html, PreviewDocument};

static NEXT_SURFACE_ID: AtomicU64 = AtomicU64::new(1);

/// Identity of one surface instance; never reused within a process.
/// 單一表面實例的識別碼，程序內不重複使用。
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SurfaceId(u64);

impl SurfaceId {
    pub fn next() -> Self {
        Self(NEXT_SURFACE_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for SurfaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "surface-{}", self.0)
    }
}

/// Phase in which a preview failed.
/// 預覽失敗的階段。
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorPhase {
    /// Compiling or evaluating the entry source.
    /// 編譯或評估進入點原始碼。
    Build,
    /// Probing or mounting the component.
    /// 探測或掛載元件。
    Render,
}

impl ErrorPhase {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorPhase::Build => "build",
            ErrorPhase::Render => "render",
        }
    }

    /// Parses the phase tag reported from inside a surface; unknown tags count as render.
    /// 解析表面回報的階段標籤；未知標籤視為 render。
    pub fn from_tag(tag: &str) -> Self {
        match tag {
            "build" => ErrorPhase::Build,
            _ => ErrorPhase::Render,
        }
    }
}

impl fmt::Display for ErrorPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Structured preview failure, displayed in place of the preview.
/// 結構化的預覽錯誤，顯示於預覽區域。
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreviewError {
    pub phase: ErrorPhase,
    pub message: String,
}

impl PreviewError {
    pub fn new(phase: ErrorPhase, message: impl Into<String>) -> Self {
        Self {
            phase,
            message: message.into(),
        }
    }

    pub fn build(message: impl Into<String>) -> Self {
        Self::new(ErrorPhase::Build, message)
    }

    pub fn render(message: impl Into<String>) -> Self {
        Self::new(ErrorPhase::Render, message)
    }

    /// Error panel shown inside the preview region.
    /// 預覽區域內顯示的錯誤面板。
    pub fn panel_markup(&self) -> String {
        format!(
            "<div class=\"preview-error\" data-phase=\"{}\"><h3>\u{26a0}\u{fe0f} Preview Error</h3><pre>{}</pre><p>Check the browser console for more details.</p></div>",
            self.phase,
            escape_html(&self.message)
        )
    }
}

impl fmt::Display for PreviewError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} error: {}", self.phase, self.message)
    }
}

/// Final content of a surface.
/// 表面的最終內容。
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SurfaceContent {
    /// The component mounted and produced this markup.
    Mounted { markup: String },
    Failed(PreviewError),
}

/// Termination hook shared between a surface handle and its engine.
/// 表面控制代碼與引擎共用的終止掛鉤。
#[derive(Default)]
pub struct KillSwitch {
    killed: AtomicBool,
    terminator: Mutex<Option<Box<dyn Fn() + Send>>>,
}

impl KillSwitch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers how to stop the running surface. Fires at once when already killed.
    /// 註冊停止表面的方式；若已被終止則立即執行。
    pub fn arm(&self, terminate: impl Fn() + Send + 'static) {
        if self.is_killed() {
            terminate();
            return;
        }
        if let Ok(mut slot) = self.terminator.lock() {
            *slot = Some(Box::new(terminate));
        }
        // `kill` may have raced with the registration.
        if self.is_killed() {
            self.fire();
        }
    }

    pub fn kill(&self) {
        self.killed.store(true, Ordering::SeqCst);
        self.fire();
    }

    pub fn is_killed(&self) -> bool {
        self.killed.load(Ordering::SeqCst)
    }

    fn fire(&self) {
        let terminator = self.terminator.lock().ok().and_then(|mut slot| slot.take());
        if let Some(terminate) = terminator {
            terminate();
        }
    }
}

impl fmt::Debug for KillSwitch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KillSwitch")
            .field("killed", &self.is_killed())
            .finish_non_exhaustive()
    }
}

/// Executes a prepared document in isolation from the host.
/// 在與主程式隔離的環境中執行已準備的文件。
///
/// `mount` runs on a dedicated worker thread and must arm `kill` with a way to stop
/// itself.
/// `mount` 於專屬工作執行緒執行，並須以 `kill` 註冊停止方式。
pub trait SurfaceEngine: Send + Sync + 'static {
    fn mount(&self, document: &PreviewDocument, kill: &KillSwitch) -> SurfaceContent;
}

/// Host-side handle to a live surface.
/// 主程式端對執行中表面的控制代碼。
#[derive(Debug)]
pub struct SurfaceHandle {
    id: SurfaceId,
    outcome: Receiver<SurfaceContent>,
    kill: Arc<KillSwitch>,
}

impl SurfaceHandle {
    /// Starts a fresh surface for `document`.
    /// 為 `document` 啟動全新的表面。
    pub fn spawn(engine: Arc<dyn SurfaceEngine>, document: PreviewDocument) -> Self {
        let id = SurfaceId::next();
        let kill = Arc::new(KillSwitch::new());
        let (tx, outcome) = mpsc::channel();

        let worker_kill = Arc::clone(&kill);
        let worker_tx = tx.clone();
        let spawned = thread::Builder::new()
            .name(id.to_string())
            .spawn(move || {
                let content = engine.mount(&document, &worker_kill);
                if worker_kill.is_killed() {
                    debug!(surface = %id, "discarding outcome of torn-down surface");
                    return;
                }
                let _ = worker_tx.send(content);
            });
        if let Err(err) = spawned {
            warn!(surface = %id, error = %err, "failed to start surface thread");
            let _ = tx.send(SurfaceContent::Failed(PreviewError::render(format!(
                "could not start preview surface: {err}"
            ))));
        }
        debug!(surface = %id, "surface spawned");

        Self { id, outcome, kill }
    }

    pub fn id(&self) -> SurfaceId {
        self.id
    }

    /// Non-blocking check for the final content.
    /// 非阻塞地檢查最終內容。
    pub fn try_outcome(&self) -> Option<SurfaceContent> {
        match self.outcome.try_recv() {
            Ok(content) => Some(content),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => Some(Self::crashed()),
        }
    }

    /// Blocks up to `timeout` for the final content.
    /// 最多阻塞 `timeout` 等待最終內容。
    pub fn wait_outcome(&self, timeout: Duration) -> Option<SurfaceContent> {
        match self.outcome.recv_timeout(timeout) {
            Ok(content) => Some(content),
            Err(RecvTimeoutError::Timeout) => None,
            Err(RecvTimeoutError::Disconnected) => Some(Self::crashed()),
        }
    }

    fn crashed() -> SurfaceContent {
        SurfaceContent::Failed(PreviewError::render(
            "preview surface stopped without reporting a result",
        ))
    }
}

impl Drop for SurfaceHandle {
    fn drop(&mut self) {
        self.kill.kill();
        debug!(surface = %self.id, "surface torn down");
    }
}
