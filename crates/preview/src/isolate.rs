//! V8-backed surface engine.
//! 以 V8 為基礎的表面引擎。
//!
//! Each mount compiles the entry with deno_ast, then evaluates it inside a brand-new
//! `JsRuntime` whose only host capabilities are the `paint`/`fail` ops.
//! 每次掛載先以 deno_ast 編譯進入點，再於全新的 `JsRuntime` 中評估；
//! 該執行期唯一的主機能力為 `paint`/`fail` 兩個 op。

use std::cell::RefCell;
use std::fmt::Display;
use std::rc::Rc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use deno_ast::{EmitOptions, MediaType, ModuleSpecifier, ParseParams, TranspileOptions};
use deno_core::v8::IsolateHandle;
use deno_core::{extension, op2, FastString, JsRuntime, OpState, RuntimeOptions};
use tracing::{debug, warn};

use crate::document::PreviewDocument;
use crate::surface::{ErrorPhase, KillSwitch, PreviewError, SurfaceContent, SurfaceEngine};

const RUNTIME_SCRIPT: &str = include_str!("surface_runtime.js");
const ENTRY_SPECIFIER: &str = "file:///preview/entry.jsx";

/// Default time a surface may run before it is terminated.
/// 表面被終止前可執行的預設時間。
pub const DEFAULT_RENDER_TIMEOUT: Duration = Duration::from_millis(2000);

/// What the surface reported through its ops.
#[derive(Default)]
struct SurfaceSink {
    painted: Option<String>,
    failed: Option<PreviewError>,
}

#[op2(fast)]
fn op_surface_paint(state: &mut OpState, #[string] markup: String) {
    if let Some(sink) = state.try_borrow::<Rc<RefCell<SurfaceSink>>>() {
        sink.borrow_mut().painted = Some(markup);
    }
}

#[op2(fast)]
fn op_surface_fail(state: &mut OpState, #[string] phase: String, #[string] message: String) {
    if let Some(sink) = state.try_borrow::<Rc<RefCell<SurfaceSink>>>() {
        let mut sink = sink.borrow_mut();
        if sink.failed.is_none() {
            sink.failed = Some(PreviewError::new(ErrorPhase::from_tag(&phase), message));
        }
    }
}

extension!(preview_surface, ops = [op_surface_paint, op_surface_fail]);

/// Compiles JSX entry source into plain JavaScript.
/// 將 JSX 進入點原始碼編譯為一般 JavaScript。
pub fn compile_jsx(source: &str) -> Result<String, PreviewError> {
    let specifier = ModuleSpecifier::parse(ENTRY_SPECIFIER)
        .map_err(|err| PreviewError::build(format!("invalid entry specifier: {err}")))?;
    let parsed = deno_ast::parse_module(ParseParams {
        specifier,
        text: source.into(),
        media_type: MediaType::Jsx,
        capture_tokens: false,
        scope_analysis: false,
        maybe_syntax: None,
    })
    .map_err(|err| PreviewError::build(format!("Syntax error: {err}")))?;

    let transpiled = parsed
        .transpile(
            &TranspileOptions::default(),
            &Default::default(),
            &EmitOptions::default(),
        )
        .map_err(|err| PreviewError::build(format!("Transpile error: {err}")))?;

    Ok(transpiled.into_source().text.to_string())
}

/// Surface engine running every mount in a fresh V8 isolate.
/// 每次掛載皆於全新 V8 isolate 執行的表面引擎。
#[derive(Clone, Debug)]
pub struct V8Engine {
    timeout: Duration,
}

impl Default for V8Engine {
    fn default() -> Self {
        Self::new(DEFAULT_RENDER_TIMEOUT)
    }
}

impl V8Engine {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

impl SurfaceEngine for V8Engine {
    fn mount(&self, document: &PreviewDocument, kill: &KillSwitch) -> SurfaceContent {
        let compiled = match compile_jsx(document.source()) {
            Ok(compiled) => compiled,
            Err(err) => return SurfaceContent::Failed(err),
        };

        let sink = Rc::new(RefCell::new(SurfaceSink::default()));
        let mut runtime = JsRuntime::new(RuntimeOptions {
            extensions: vec![preview_surface::init_ops()],
            ..Default::default()
        });
        runtime.op_state().borrow_mut().put(Rc::clone(&sink));

        let isolate = runtime.v8_isolate().thread_safe_handle();
        let kill_handle = isolate.clone();
        kill.arm(move || {
            kill_handle.terminate_execution();
        });

        let timed_out = Arc::new(AtomicBool::new(false));
        let watchdog = Watchdog::start(isolate, self.timeout, Arc::clone(&timed_out));
        let result = run_scripts(&mut runtime, compiled, document.mount_script());
        watchdog.finish();

        if timed_out.load(Ordering::SeqCst) {
            debug!(timeout_ms = self.timeout.as_millis() as u64, "surface timed out");
            return SurfaceContent::Failed(PreviewError::render(format!(
                "Preview did not finish within {} ms",
                self.timeout.as_millis()
            )));
        }
        if let Err(err) = result {
            return SurfaceContent::Failed(err);
        }

        let mut sink = sink.borrow_mut();
        if let Some(err) = sink.failed.take() {
            return SurfaceContent::Failed(err);
        }
        match sink.painted.take() {
            Some(markup) => SurfaceContent::Mounted { markup },
            None => SurfaceContent::Failed(PreviewError::render(
                "component finished without producing output",
            )),
        }
    }
}

fn run_scripts(
    runtime: &mut JsRuntime,
    compiled: String,
    mount: String,
) -> Result<(), PreviewError> {
    let bootstrap: FastString = RUNTIME_SCRIPT.to_string().into();
    runtime
        .execute_script("<surface_runtime>", bootstrap)
        .map_err(|err| PreviewError::render(format!("surface bootstrap failed: {err}")))?;

    let entry: FastString = compiled.into();
    runtime
        .execute_script("<entry>", entry)
        .map_err(|err| PreviewError::build(js_message(err)))?;

    let mount: FastString = mount.into();
    runtime
        .execute_script("<mount>", mount)
        .map_err(|err| PreviewError::render(js_message(err)))?;
    Ok(())
}

fn js_message(err: impl Display) -> String {
    let text = err.to_string();
    text.strip_prefix("Uncaught ").unwrap_or(&text).to_string()
}

/// Terminates the isolate when the mount outlives its budget.
struct Watchdog {
    done: Option<mpsc::Sender<()>>,
    thread: Option<JoinHandle<()>>,
}

impl Watchdog {
    fn start(isolate: IsolateHandle, timeout: Duration, timed_out: Arc<AtomicBool>) -> Self {
        let (done, rx) = mpsc::channel::<()>();
        let thread = thread::Builder::new()
            .name("surface-watchdog".into())
            .spawn(move || {
                if let Err(RecvTimeoutError::Timeout) = rx.recv_timeout(timeout) {
                    timed_out.store(true, Ordering::SeqCst);
                    isolate.terminate_execution();
                }
            });
        let thread = match thread {
            Ok(handle) => Some(handle),
            Err(err) => {
                warn!(error = %err, "surface watchdog unavailable; running without timeout");
                None
            }
        };
        Self {
            done: Some(done),
            thread,
        }
    }

    fn finish(mut self) {
        self.done.take();
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}
