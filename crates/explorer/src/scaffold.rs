use cipherstudio_workspace::{FileRecord, ProjectId, RecordId};

/// Content of the `App.js` every new project starts with.
/// 新專案預設 `App.js` 的內容。
pub const WELCOME_APP: &str = r#"export default function App() {
  return (
    <div style={{ padding: '40px', fontFamily: 'system-ui' }}>
      <h1 style={{ color: '#1f6feb', marginBottom: '16px' }}>
        🎉 Welcome to CipherStudio!
      </h1>
      <p style={{ fontSize: '18px', color: '#333', marginBottom: '12px' }}>
        Your React project is ready to go.
      </p>
      <p style={{ color: '#666' }}>
        Start editing this file to see changes in real-time!
      </p>
    </div>
  );
}"#;

/// Records for a fresh project: a root folder named after it, `src/`, and `src/App.js`.
/// 新專案的紀錄：以專案命名的根資料夾、`src/` 及 `src/App.js`。
pub fn scaffold_records(
    project: &ProjectId,
    project_name: &str,
    mut next_id: impl FnMut() -> RecordId,
) -> Vec<FileRecord> {
    let root = next_id();
    let src = next_id();
    let app = next_id();
    vec![
        FileRecord::folder(root.clone(), None, project_name).with_project(project.clone()),
        FileRecord::folder(src.clone(), Some(root), "src").with_project(project.clone()),
        FileRecord::file(app, Some(src), "App.js", WELCOME_APP).with_project(project.clone()),
    ]
}
