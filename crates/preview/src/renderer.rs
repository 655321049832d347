use std::sync::Arc;
use std::time::{Duration, Instant};

use cipherstudio_workspace::FileRecord;
use tracing::{debug, info};

use crate::document::{placeholder_markup, prepare_document, DEFAULT_ENTRY_SYMBOL};
use crate::entry::EntryResolver;
use crate::surface::{PreviewError, SurfaceContent, SurfaceEngine, SurfaceHandle, SurfaceId};

/// Coarse renderer state.
/// 渲染器的概略狀態。
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PreviewStatus {
    Empty,
    Loading,
    Rendered,
    Errored,
}

impl PreviewStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            PreviewStatus::Empty => "empty",
            PreviewStatus::Loading => "loading",
            PreviewStatus::Rendered => "rendered",
            PreviewStatus::Errored => "errored",
        }
    }
}

/// Result of the current render cycle.
/// 目前渲染週期的結果。
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PreviewOutcome {
    /// No entry file; shows the placeholder.
    Empty,
    Loading {
        surface: SurfaceId,
    },
    Rendered {
        surface: SurfaceId,
        markup: String,
    },
    /// `surface` is `None` when the pipeline failed before a surface was created.
    Errored {
        surface: Option<SurfaceId>,
        error: PreviewError,
    },
}

/// Immutable snapshot of the preview; replaced wholesale on every transition.
/// 預覽的不可變快照，每次轉換時整體替換。
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PreviewState {
    /// Render cycle counter; bumps only when a new cycle starts.
    /// 渲染週期計數，僅在新週期開始時遞增。
    pub revision: u64,
    pub entry_source: Option<String>,
    pub outcome: PreviewOutcome,
}

impl PreviewState {
    fn empty(revision: u64) -> Self {
        Self {
            revision,
            entry_source: None,
            outcome: PreviewOutcome::Empty,
        }
    }

    pub fn status(&self) -> PreviewStatus {
        match self.outcome {
            PreviewOutcome::Empty => PreviewStatus::Empty,
            PreviewOutcome::Loading { .. } => PreviewStatus::Loading,
            PreviewOutcome::Rendered { .. } => PreviewStatus::Rendered,
            PreviewOutcome::Errored { .. } => PreviewStatus::Errored,
        }
    }

    pub fn last_error(&self) -> Option<&PreviewError> {
        match &self.outcome {
            PreviewOutcome::Errored { error, .. } => Some(error),
            _ => None,
        }
    }

    pub fn markup(&self) -> Option<&str> {
        match &self.outcome {
            PreviewOutcome::Rendered { markup, .. } => Some(markup),
            _ => None,
        }
    }

    pub fn surface(&self) -> Option<SurfaceId> {
        match &self.outcome {
            PreviewOutcome::Empty => None,
            PreviewOutcome::Loading { surface } | PreviewOutcome::Rendered { surface, .. } => {
                Some(*surface)
            }
            PreviewOutcome::Errored { surface, .. } => *surface,
        }
    }

    /// What the preview region shows for this state.
    /// 此狀態下預覽區域顯示的內容。
    pub fn display_markup(&self, entry_file: &str) -> String {
        match &self.outcome {
            PreviewOutcome::Empty => placeholder_markup(entry_file),
            PreviewOutcome::Loading { .. } => {
                "<div class=\"preview-loading\">Loading preview\u{2026}</div>".to_string()
            }
            PreviewOutcome::Rendered { markup, .. } => markup.clone(),
            PreviewOutcome::Errored { error, .. } => error.panel_markup(),
        }
    }
}

/// Drives the preview state machine: `Empty → Loading → Rendered | Errored`.
/// 驅動預覽狀態機：`Empty → Loading → Rendered | Errored`。
///
/// Every new cycle tears down the previous surface and spawns a fresh one.
/// 每個新週期都會拆除前一個表面並建立新的表面。
pub struct PreviewRenderer {
    engine: Arc<dyn SurfaceEngine>,
    resolver: EntryResolver,
    symbol: String,
    state: Arc<PreviewState>,
    surface: Option<SurfaceHandle>,
}

impl PreviewRenderer {
    pub fn new(engine: Arc<dyn SurfaceEngine>) -> Self {
        Self {
            engine,
            resolver: EntryResolver::default(),
            symbol: DEFAULT_ENTRY_SYMBOL.to_string(),
            state: Arc::new(PreviewState::empty(0)),
            surface: None,
        }
    }

    pub fn with_resolver(mut self, resolver: EntryResolver) -> Self {
        self.resolver = resolver;
        self
    }

    pub fn with_symbol(mut self, symbol: impl Into<String>) -> Self {
        self.symbol = symbol.into();
        self
    }

    pub fn resolver(&self) -> &EntryResolver {
        &self.resolver
    }

    pub fn state(&self) -> Arc<PreviewState> {
        Arc::clone(&self.state)
    }

    pub fn status(&self) -> PreviewStatus {
        self.state.status()
    }

    /// Feeds a new snapshot. Starts a cycle only when the entry content changed.
    /// Returns whether a transition happened.
    /// 提供新的快照；僅在進入點內容改變時開始新週期。回傳是否發生轉換。
    pub fn sync(&mut self, files: &[FileRecord]) -> bool {
        match self.resolver.resolve(files) {
            None => {
                if self.state.status() == PreviewStatus::Empty {
                    return false;
                }
                self.teardown();
                let revision = self.state.revision + 1;
                info!(revision, entry = %self.resolver.file_name(), "entry file gone; preview empty");
                self.state = Arc::new(PreviewState::empty(revision));
                true
            }
            Some(entry) => {
                if self.state.entry_source.as_deref() == Some(entry.source()) {
                    return false;
                }
                self.render(entry.source());
                true
            }
        }
    }

    /// Starts a new cycle for `entry_source`.
    /// 以 `entry_source` 開始新的渲染週期。
    ///
    /// An entry the pipeline rejects never gets a surface: the state moves straight to
    /// `Errored` under the new revision, with no observable `Loading` step.
    pub fn render(&mut self, entry_source: impl Into<String>) {
        let entry_source = entry_source.into();
        self.teardown();
        let revision = self.state.revision + 1;

        let outcome = match prepare_document(&entry_source, &self.symbol) {
            Ok(document) => {
                let handle = SurfaceHandle::spawn(Arc::clone(&self.engine), document);
                let surface = handle.id();
                self.surface = Some(handle);
                debug!(revision, %surface, "preview loading");
                PreviewOutcome::Loading { surface }
            }
            Err(err) => {
                debug!(revision, error = %err, "pipeline rejected entry");
                PreviewOutcome::Errored {
                    surface: None,
                    error: err.into(),
                }
            }
        };

        self.state = Arc::new(PreviewState {
            revision,
            entry_source: Some(entry_source),
            outcome,
        });
    }

    /// Tears down and remounts the current entry. No-op while empty.
    /// 拆除並重新掛載目前的進入點；空狀態時不動作。
    pub fn refresh(&mut self) {
        if let Some(source) = self.state.entry_source.clone() {
            self.render(source);
        }
    }

    /// Applies a finished surface outcome, if any. Returns whether the state changed.
    /// 套用已完成的表面結果；回傳狀態是否改變。
    pub fn poll(&mut self) -> bool {
        let content = match &self.surface {
            Some(handle) if self.state.status() == PreviewStatus::Loading => handle.try_outcome(),
            _ => None,
        };
        match content {
            Some(content) => {
                self.apply(content);
                true
            }
            None => false,
        }
    }

    /// Blocks up to `timeout` for the current cycle to settle.
    /// 最多等待 `timeout` 直到目前週期結束。
    pub fn wait(&mut self, timeout: Duration) -> PreviewStatus {
        let deadline = Instant::now() + timeout;
        while self.state.status() == PreviewStatus::Loading {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                break;
            }
            let content = self
                .surface
                .as_ref()
                .and_then(|handle| handle.wait_outcome(remaining));
            match content {
                Some(content) => self.apply(content),
                None => break,
            }
        }
        self.state.status()
    }

    fn apply(&mut self, content: SurfaceContent) {
        let Some(surface) = self.state.surface() else {
            return;
        };
        let outcome = match content {
            SurfaceContent::Mounted { markup } => {
                info!(revision = self.state.revision, %surface, "preview rendered");
                PreviewOutcome::Rendered { surface, markup }
            }
            SurfaceContent::Failed(error) => {
                info!(
                    revision = self.state.revision,
                    %surface,
                    phase = %error.phase,
                    "preview errored"
                );
                PreviewOutcome::Errored {
                    surface: Some(surface),
                    error,
                }
            }
        };
        self.state = Arc::new(PreviewState {
            revision: self.state.revision,
            entry_source: self.state.entry_source.clone(),
            outcome,
        });
    }

    fn teardown(&mut self) {
        self.surface.take();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::PreviewDocument;
    use crate::surface::{ErrorPhase, KillSwitch};

    /// Renders the component name, or fails when the source contains `throw`.
    struct Scripted;

    impl SurfaceEngine for Scripted {
        fn mount(&self, document: &PreviewDocument, _kill: &KillSwitch) -> SurfaceContent {
            if document.source().contains("throw") {
                SurfaceContent::Failed(PreviewError::render("boom"))
            } else {
                SurfaceContent::Mounted {
                    markup: format!("<{}/>", document.symbol()),
                }
            }
        }
    }

    fn renderer() -> PreviewRenderer {
        PreviewRenderer::new(Arc::new(Scripted))
    }

    fn snapshot(entry: &str, other: &str) -> Vec<FileRecord> {
        vec![
            FileRecord::folder("1", None, "root"),
            FileRecord::folder("2", Some("1".into()), "src"),
            FileRecord::file("3", Some("2".into()), "App.js", entry),
            FileRecord::file("4", Some("2".into()), "util.js", other),
        ]
    }

    const WAIT: Duration = Duration::from_secs(5);

    #[test]
    fn no_entry_stays_empty() {
        let mut renderer = renderer();
        assert!(!renderer.sync(&[FileRecord::file("1", None, "index.js", "x")]));
        assert_eq!(renderer.status(), PreviewStatus::Empty);
        assert_eq!(renderer.wait(WAIT), PreviewStatus::Empty);
    }

    #[test]
    fn entry_goes_loading_then_rendered() {
        let mut renderer = renderer();
        assert!(renderer.sync(&snapshot("export default function App(){return 1}", "a")));
        assert_eq!(renderer.status(), PreviewStatus::Loading);
        assert_eq!(renderer.wait(WAIT), PreviewStatus::Rendered);
        assert_eq!(renderer.state().markup(), Some("<App/>"));
    }

    #[test]
    fn unrelated_change_keeps_revision() {
        let mut renderer = renderer();
        renderer.sync(&snapshot("function App(){}", "a"));
        renderer.wait(WAIT);
        let before = renderer.state();
        assert!(!renderer.sync(&snapshot("function App(){}", "b")));
        assert_eq!(renderer.state().revision, before.revision);
        assert_eq!(renderer.status(), PreviewStatus::Rendered);
    }

    #[test]
    fn entry_change_remounts_through_loading() {
        let mut renderer = renderer();
        renderer.sync(&snapshot("function App(){}", "a"));
        renderer.wait(WAIT);
        let first = renderer.state();

        assert!(renderer.sync(&snapshot("function App(){ throw 1 }", "a")));
        let loading = renderer.state();
        assert_eq!(loading.status(), PreviewStatus::Loading);
        assert_eq!(loading.revision, first.revision + 1);
        assert_ne!(loading.surface(), first.surface());

        assert_eq!(renderer.wait(WAIT), PreviewStatus::Errored);
        assert_eq!(renderer.state().last_error().map(|e| e.message.as_str()), Some("boom"));
    }

    #[test]
    fn missing_symbol_errors_without_surface() {
        let mut renderer = renderer();
        renderer.sync(&snapshot("const Home = () => null;", "a"));
        let state = renderer.state();
        assert_eq!(state.status(), PreviewStatus::Errored);
        assert_eq!(state.surface(), None);
        let error = state.last_error().unwrap();
        assert_eq!(error.phase, ErrorPhase::Render);
        assert!(error.message.contains("App"));
    }

    #[test]
    fn rejected_entry_replaces_rendered_state_in_one_revision() {
        let mut renderer = renderer();
        renderer.sync(&snapshot("function App(){}", "a"));
        assert_eq!(renderer.wait(WAIT), PreviewStatus::Rendered);
        let rendered = renderer.state();

        assert!(renderer.sync(&snapshot("function Home(){}", "a")));
        let rejected = renderer.state();
        assert_eq!(rejected.status(), PreviewStatus::Errored);
        assert_eq!(rejected.revision, rendered.revision + 1);
        assert_eq!(rejected.surface(), None);
        assert!(!renderer.poll());
        assert_eq!(renderer.state().revision, rejected.revision);
    }

    #[test]
    fn refresh_spawns_fresh_surface() {
        let mut renderer = renderer();
        renderer.sync(&snapshot("function App(){}", "a"));
        renderer.wait(WAIT);
        let first = renderer.state();
        renderer.refresh();
        assert_eq!(renderer.status(), PreviewStatus::Loading);
        assert_eq!(renderer.wait(WAIT), PreviewStatus::Rendered);
        let second = renderer.state();
        assert_eq!(second.revision, first.revision + 1);
        assert_ne!(second.surface(), first.surface());
        assert_eq!(second.entry_source, first.entry_source);
    }

    #[test]
    fn refresh_while_empty_is_a_no_op() {
        let mut renderer = renderer();
        renderer.refresh();
        assert_eq!(renderer.state().revision, 0);
        assert_eq!(renderer.status(), PreviewStatus::Empty);
    }

    #[test]
    fn removing_entry_returns_to_empty() {
        let mut renderer = renderer();
        renderer.sync(&snapshot("function App(){}", "a"));
        renderer.wait(WAIT);
        assert!(renderer.sync(&[]));
        let state = renderer.state();
        assert_eq!(state.status(), PreviewStatus::Empty);
        assert!(state.entry_source.is_none());
        assert!(state.display_markup("App.js").contains("No App.js file found"));
    }

    #[test]
    fn poll_picks_up_outcome() {
        let mut renderer = renderer();
        renderer.sync(&snapshot("function App(){}", "a"));
        for _ in 0..500 {
            if renderer.poll() {
                break;
            }
            std::thread::sleep(Duration::from_millis(5));
        }
        assert_eq!(renderer.status(), PreviewStatus::Rendered);
        assert!(!renderer.poll());
    }
}
