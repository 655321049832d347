#![cfg(feature = "v8")]

use std::sync::Arc;
use std::time::Duration;

use cipherstudio_preview::{
    prepare_document, ErrorPhase, KillSwitch, PreviewRenderer, PreviewStatus, SurfaceContent,
    SurfaceEngine, V8Engine,
};
use cipherstudio_workspace::FileRecord;

fn mount(source: &str) -> SurfaceContent {
    mount_with(V8Engine::default(), source)
}

fn mount_with(engine: V8Engine, source: &str) -> SurfaceContent {
    let document = prepare_document(source, "App").expect("document");
    engine.mount(&document, &KillSwitch::new())
}

fn markup(content: SurfaceContent) -> String {
    match content {
        SurfaceContent::Mounted { markup } => markup,
        SurfaceContent::Failed(err) => panic!("expected markup, got {err}"),
    }
}

fn failure(content: SurfaceContent) -> (ErrorPhase, String) {
    match content {
        SurfaceContent::Failed(err) => (err.phase, err.message),
        SurfaceContent::Mounted { markup } => panic!("expected failure, got {markup}"),
    }
}

#[test]
fn renders_plain_default_export() {
    assert_eq!(markup(mount("export default function App(){return 1}")), "1");
}

#[test]
fn renders_jsx_with_react_imports() {
    let source = r#"import React, { useState } from 'react';

export default function App() {
  const [count] = useState(3);
  return (
    <div className="app" style={{ marginTop: 4 }}>
      <h1>Hello &amp; welcome</h1>
      <button onClick={() => {}}>Clicked {count} times</button>
      <br />
    </div>
  );
}
"#;
    assert_eq!(
        markup(mount(source)),
        "<div class=\"app\" style=\"margin-top:4\"><h1>Hello &amp; welcome</h1><button>Clicked 3 times</button><br/></div>"
    );
}

#[test]
fn renders_nested_components_and_fragments() {
    let source = r#"
const Item = ({ label }) => <li>{label}</li>;
export default function App() {
  return <><ul>{["a", "b"].map((l) => <Item key={l} label={l} />)}</ul></>;
}
"#;
    assert_eq!(markup(mount(source)), "<ul><li>a</li><li>b</li></ul>");
}

#[test]
fn syntax_errors_are_build_failures() {
    let (phase, _) = failure(mount("export default function App() { return <div> }"));
    assert_eq!(phase, ErrorPhase::Build);
}

#[test]
fn top_level_throw_is_a_build_failure() {
    let (phase, message) = failure(mount(
        "throw new Error('exploded');\nexport default function App() {}",
    ));
    assert_eq!(phase, ErrorPhase::Build);
    assert!(message.contains("exploded"), "{message}");
}

#[test]
fn throwing_component_is_a_render_failure() {
    let (phase, message) = failure(mount(
        "export default function App() { throw new Error('bad render'); }",
    ));
    assert_eq!(phase, ErrorPhase::Render);
    assert_eq!(message, "bad render");
}

#[test]
fn non_callable_symbol_is_a_render_failure() {
    let (phase, message) = failure(mount("const App = 42;"));
    assert_eq!(phase, ErrorPhase::Render);
    assert!(message.contains("App"), "{message}");
    assert!(message.contains("number"), "{message}");
}

#[test]
fn host_capabilities_are_removed() {
    let source = "export default function App() { return [typeof Deno, typeof fetch, typeof localStorage].join(','); }";
    let text = markup(mount(source));
    assert!(text.starts_with("undefined,"), "{text}");
    assert!(text.ends_with(",undefined"), "{text}");
}

#[test]
fn runaway_code_is_terminated() {
    let engine = V8Engine::new(Duration::from_millis(200));
    let (phase, message) = failure(mount_with(
        engine,
        "export default function App() { while (true) {} }",
    ));
    assert_eq!(phase, ErrorPhase::Render);
    assert!(message.contains("200 ms"), "{message}");
}

#[test]
fn renderer_reaches_rendered_with_v8() {
    let records = vec![
        FileRecord::folder("1", None, "root"),
        FileRecord::folder("2", Some("1".into()), "src"),
        FileRecord::file(
            "3",
            Some("2".into()),
            "App.js",
            "export default function App(){return 1}",
        ),
    ];
    let mut renderer = PreviewRenderer::new(Arc::new(V8Engine::default()));
    assert!(renderer.sync(&records));
    assert_eq!(renderer.wait(Duration::from_secs(30)), PreviewStatus::Rendered);
    assert_eq!(renderer.state().markup(), Some("1"));
}
