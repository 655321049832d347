use std::error::Error;
use std::fs;
use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::tempdir;

const SNAPSHOT: &str = r#"[
  {"_id": "root", "name": "demo", "type": "folder", "parentId": null},
  {"_id": "src", "name": "src", "type": "folder", "parentId": "root"},
  {"_id": "app", "name": "App.js", "type": "file", "parentId": "src",
   "content": "import React from 'react';\nexport default function App() {\n  return <p className=\"x\">Hi {1 + 1}</p>;\n}\n"},
  {"_id": "lost", "name": "lost.js", "type": "file", "parentId": "gone", "content": ""}
]"#;

fn cli(dir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("cipherstudio-cli").expect("binary");
    cmd.env_remove("CIPHERSTUDIO_TOKEN")
        .env_remove("CIPHERSTUDIO_API_URL")
        .env("CIPHERSTUDIO_SETTINGS", dir.join("settings.json"));
    cmd
}

#[test]
fn tree_prints_nested_rows_and_drops_orphans() -> Result<(), Box<dyn Error>> {
    let dir = tempdir()?;
    let snapshot = dir.path().join("snapshot.json");
    fs::write(&snapshot, SNAPSHOT)?;

    cli(dir.path())
        .arg("tree")
        .arg(&snapshot)
        .assert()
        .success()
        .stdout("demo/\n  src/\n    App.js\n")
        .stderr(predicate::str::contains("skipped 1 orphaned"));

    cli(dir.path())
        .args(["tree", "--promote-orphans"])
        .arg(&snapshot)
        .assert()
        .success()
        .stdout(predicate::str::contains("lost.js"));
    Ok(())
}

#[test]
fn tree_paths_prints_absolute_paths() -> Result<(), Box<dyn Error>> {
    let dir = tempdir()?;
    let snapshot = dir.path().join("snapshot.json");
    fs::write(&snapshot, SNAPSHOT)?;

    cli(dir.path())
        .args(["tree", "--paths"])
        .arg(&snapshot)
        .assert()
        .success()
        .stdout("/demo/\n/demo/src/\n/demo/src/App.js\n");

    cli(dir.path())
        .args(["tree", "--paths", "--promote-orphans"])
        .arg(&snapshot)
        .assert()
        .success()
        .stdout(predicate::str::contains("/lost.js\n"));
    Ok(())
}

#[test]
fn entry_prints_source_or_fails() -> Result<(), Box<dyn Error>> {
    let dir = tempdir()?;
    let snapshot = dir.path().join("snapshot.json");
    fs::write(&snapshot, SNAPSHOT)?;
    cli(dir.path())
        .arg("entry")
        .arg(&snapshot)
        .assert()
        .success()
        .stdout(predicate::str::starts_with("import React from 'react';"));

    let empty = dir.path().join("empty.json");
    fs::write(&empty, "[]")?;
    cli(dir.path())
        .arg("entry")
        .arg(&empty)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Error: no App.js file found"));
    Ok(())
}

#[test]
fn preview_renders_markup() -> Result<(), Box<dyn Error>> {
    let dir = tempdir()?;
    let snapshot = dir.path().join("snapshot.json");
    fs::write(&snapshot, SNAPSHOT)?;
    cli(dir.path())
        .arg("preview")
        .arg(&snapshot)
        .assert()
        .success()
        .stdout("<p class=\"x\">Hi 2</p>\n");
    Ok(())
}

#[test]
fn preview_without_entry_prints_placeholder() -> Result<(), Box<dyn Error>> {
    let dir = tempdir()?;
    let snapshot = dir.path().join("empty.json");
    fs::write(&snapshot, "[]")?;
    cli(dir.path())
        .arg("preview")
        .arg(&snapshot)
        .assert()
        .success()
        .stdout(predicate::str::contains("No App.js file found"));
    Ok(())
}

#[test]
fn preview_reports_render_errors() -> Result<(), Box<dyn Error>> {
    let dir = tempdir()?;
    let snapshot = dir.path().join("broken.json");
    fs::write(
        &snapshot,
        r#"[{"_id": "a", "name": "App.js", "type": "file", "parentId": null,
             "content": "export default function App() { throw new Error('boom'); }"}]"#,
    )?;
    cli(dir.path())
        .arg("preview")
        .arg(&snapshot)
        .assert()
        .failure()
        .stderr(predicate::str::contains("render error").and(predicate::str::contains("boom")));
    Ok(())
}

#[test]
fn configured_entry_file_is_honoured() -> Result<(), Box<dyn Error>> {
    let dir = tempdir()?;
    fs::write(
        dir.path().join("settings.json"),
        r#"{ "preview": { "entry_file": "index.js" } }"#,
    )?;
    let snapshot = dir.path().join("snapshot.json");
    fs::write(
        &snapshot,
        r#"[{"_id": "a", "name": "index.js", "type": "file", "content": "const App = 1;"}]"#,
    )?;
    cli(dir.path())
        .arg("entry")
        .arg(&snapshot)
        .assert()
        .success()
        .stdout("const App = 1;");
    Ok(())
}
