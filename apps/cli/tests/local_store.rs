use std::error::Error;
use std::fs;
use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::tempdir;

fn write_settings(dir: &Path) -> Result<(), Box<dyn Error>> {
    let settings = serde_json::json!({
        "api": { "user_id": "u1" },
        "storage": { "backend": "local", "local_path": dir.join("projects.json") },
    });
    fs::write(dir.join("settings.json"), settings.to_string())?;
    Ok(())
}

fn cli(dir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("cipherstudio-cli").expect("binary");
    cmd.env_remove("CIPHERSTUDIO_TOKEN")
        .env_remove("CIPHERSTUDIO_API_URL")
        .arg("--settings")
        .arg(dir.join("settings.json"));
    cmd
}

fn stdout_line(cmd: &mut Command) -> Result<String, Box<dyn Error>> {
    let output = cmd.output()?;
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    Ok(String::from_utf8(output.stdout)?.trim().to_string())
}

fn app_id(dir: &Path, project: &str) -> Result<String, Box<dyn Error>> {
    let json = stdout_line(cli(dir).args(["project", "show", project, "--json"]))?;
    let detail: serde_json::Value = serde_json::from_str(&json)?;
    let id = detail["files"]
        .as_array()
        .and_then(|files| files.iter().find(|file| file["name"] == "App.js"))
        .and_then(|file| file["_id"].as_str())
        .ok_or("App.js missing")?;
    Ok(id.to_string())
}

#[test]
fn project_lifecycle_against_local_store() -> Result<(), Box<dyn Error>> {
    let dir = tempdir()?;
    write_settings(dir.path())?;

    let project = stdout_line(cli(dir.path()).args(["project", "create", "demo"]))?;
    assert_eq!(project.len(), 24);

    cli(dir.path())
        .args(["project", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains(format!("{project}\tdemo")));

    cli(dir.path())
        .args(["project", "show", &project])
        .assert()
        .success()
        .stdout(predicate::str::contains("demo/\n  src/\n    App.js\n"));

    cli(dir.path())
        .args(["project", "delete", &project])
        .assert()
        .success();
    cli(dir.path())
        .args(["project", "list"])
        .assert()
        .success()
        .stdout("No projects for u1.\n");
    Ok(())
}

#[test]
fn file_commands_edit_the_store() -> Result<(), Box<dyn Error>> {
    let dir = tempdir()?;
    write_settings(dir.path())?;
    let project = stdout_line(cli(dir.path()).args(["project", "create", "demo"]))?;
    let app = app_id(dir.path(), &project)?;

    let source = dir.path().join("App.js");
    fs::write(&source, "export default () => <b>edited</b>;")?;
    cli(dir.path())
        .args(["file", "write", &app, "--input"])
        .arg(&source)
        .assert()
        .success()
        .stdout(predicate::str::contains("App.js"));

    cli(dir.path())
        .args(["file", "write", &app])
        .write_stdin("export default () => <i>piped</i>;")
        .assert()
        .success();

    let folder = stdout_line(cli(dir.path()).args(["file", "create", &project, "lib", "--folder"]))?;
    let util = stdout_line(cli(dir.path()).args([
        "file", "create", &project, "util.js", "--parent", &folder,
    ]))?;
    cli(dir.path())
        .args(["file", "rename", &util, "helpers.js"])
        .assert()
        .success()
        .stdout(predicate::str::contains("helpers.js"));

    cli(dir.path())
        .args(["file", "create", &project, "x.js", "--parent", &app])
        .assert()
        .failure()
        .stderr(predicate::str::contains("is not a folder"));

    cli(dir.path())
        .args(["file", "delete", &util])
        .assert()
        .success();
    cli(dir.path())
        .args(["file", "delete", &util])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not found"));

    let json = stdout_line(cli(dir.path()).args(["project", "show", &project, "--json"]))?;
    assert!(json.contains("<i>piped</i>"));
    assert!(!json.contains("helpers.js"));
    Ok(())
}

#[test]
fn listing_requires_a_user() -> Result<(), Box<dyn Error>> {
    let dir = tempdir()?;
    fs::write(
        dir.path().join("settings.json"),
        serde_json::json!({
            "storage": { "backend": "local", "local_path": dir.path().join("p.json") }
        })
        .to_string(),
    )?;
    cli(dir.path())
        .args(["project", "list"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("no user id"));
    cli(dir.path())
        .args(["project", "list", "--user", "someone"])
        .assert()
        .success();
    Ok(())
}
