mod snapshot;
mod tracing_setup;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use cipherstudio_explorer::{
    open_store, BearerToken, FileDraft, FilePatch, FileStore, NewProject, ProjectDetail,
};
use cipherstudio_preview::{EntryResolver, PreviewRenderer, PreviewStatus, V8Engine};
use cipherstudio_settings::{
    settings_path_from_env, Settings, SettingsStore, API_URL_ENV, SETTINGS_PATH_ENV, TOKEN_ENV,
};
use cipherstudio_workspace::{
    FileRecord, Forest, ForestBuilder, OrphanPolicy, ProjectId, RecordId, RecordPaths,
};
use clap::{Args, Parser, Subcommand};
use tracing::debug;

use crate::snapshot::{load_records, read_input};

#[derive(Parser)]
#[command(
    name = "cipherstudio-cli",
    about = "Headless tools for CipherStudio projects",
    author,
    version
)]
struct Cli {
    /// 設定檔路徑。 / Settings file (defaults to ./cipherstudio.json).
    #[arg(long, global = true, value_name = "FILE", env = SETTINGS_PATH_ENV)]
    settings: Option<PathBuf>,
    /// 存取儲存服務的憑證。 / Bearer credential for the persistence service.
    #[arg(long, global = true, env = TOKEN_ENV, hide_env_values = true)]
    token: Option<String>,
    /// 覆寫 API 位址。 / Override the persistence service base URL.
    #[arg(long, global = true, value_name = "URL", env = API_URL_ENV)]
    api_url: Option<String>,
    /// 輸出除錯記錄。 / Emit debug logging on stderr.
    #[arg(long, global = true)]
    debug: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// 顯示快照的檔案樹。 / Print the file tree of a snapshot.
    Tree(TreeArgs),
    /// 顯示快照的進入點原始碼。 / Print the entry file source of a snapshot.
    Entry(SnapshotArgs),
    /// 在沙箱中渲染快照並輸出標記。 / Render a snapshot in the sandbox and print its markup.
    Preview(PreviewArgs),
    /// 管理專案。 / Manage projects.
    #[command(subcommand)]
    Project(ProjectCommand),
    /// 管理檔案與資料夾。 / Manage files and folders.
    #[command(subcommand)]
    File(FileCommand),
}

#[derive(Args)]
struct SnapshotArgs {
    /// 快照 JSON（紀錄陣列或專案詳細資料，`-` 代表標準輸入）。 / Snapshot JSON (record array or project detail; `-` for stdin).
    #[arg(value_name = "SNAPSHOT")]
    snapshot: PathBuf,
}

#[derive(Args)]
struct TreeArgs {
    #[command(flatten)]
    input: SnapshotArgs,
    /// 將孤兒紀錄提升為根節點。 / Promote records with a missing parent to roots.
    #[arg(long)]
    promote_orphans: bool,
    /// 以絕對路徑列出每一列。 / Print each row as its absolute workspace path.
    #[arg(long)]
    paths: bool,
}

#[derive(Args)]
struct PreviewArgs {
    #[command(flatten)]
    input: SnapshotArgs,
    /// 渲染逾時（毫秒）。 / Render timeout in milliseconds.
    #[arg(long, value_name = "MS")]
    timeout_ms: Option<u64>,
}

#[derive(Subcommand)]
enum ProjectCommand {
    /// 列出使用者的專案。 / List a user's projects.
    List {
        /// 使用者識別碼；預設採用設定檔。 / User id (defaults to `api.user_id`).
        #[arg(long)]
        user: Option<String>,
    },
    /// 建立專案（含預設檔案）。 / Create a project with the starter files.
    Create {
        name: String,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        user: Option<String>,
    },
    /// 顯示專案檔案樹。 / Show a project and its file tree.
    Show {
        id: String,
        /// 以 JSON 輸出詳細資料。 / Print the raw detail JSON instead of a tree.
        #[arg(long)]
        json: bool,
    },
    /// 刪除專案。 / Delete a project.
    Delete { id: String },
}

#[derive(Subcommand)]
enum FileCommand {
    /// 建立檔案或資料夾。 / Create a file or folder.
    Create {
        /// 專案識別碼。 / Project id.
        project: String,
        name: String,
        /// 父資料夾識別碼；省略時建立於根層。 / Parent folder id; root level when omitted.
        #[arg(long)]
        parent: Option<String>,
        #[arg(long)]
        folder: bool,
    },
    /// 刪除單一紀錄。 / Delete one record.
    Delete { id: String },
    /// 以檔案內容（或標準輸入）覆寫檔案。 / Replace a file's content from a file or stdin.
    Write {
        id: String,
        #[arg(long, value_name = "FILE", default_value = "-")]
        input: PathBuf,
    },
    /// 重新命名紀錄。 / Rename a record.
    Rename { id: String, name: String },
}

fn main() {
    if let Err(err) = run() {
        eprintln!("Error: {err}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    tracing_setup::init_tracing(cli.debug)?;
    let settings = load_settings(cli.settings.as_deref(), cli.api_url.as_deref())?;
    let token = cli.token.as_deref().and_then(BearerToken::parse);

    match cli.command {
        Commands::Tree(args) => execute_tree(args, &settings),
        Commands::Entry(args) => execute_entry(args, &settings),
        Commands::Preview(args) => execute_preview(args, &settings),
        Commands::Project(command) => {
            let mut store = open_store(&settings, token).context("failed to open store")?;
            execute_project(command, &settings, store.as_mut())
        }
        Commands::File(command) => {
            let mut store = open_store(&settings, token).context("failed to open store")?;
            execute_file(command, store.as_mut())
        }
    }
}

fn load_settings(path: Option<&Path>, api_url: Option<&str>) -> Result<Settings> {
    let path = path.map(PathBuf::from).unwrap_or_else(settings_path_from_env);
    let store = SettingsStore::load(&path)
        .with_context(|| format!("failed to load settings {}", path.display()))?;
    let mut settings = store.settings().clone();
    if let Some(url) = api_url {
        settings.api.override_base_url(url);
    }
    debug!(path = %path.display(), backend = ?settings.storage.backend, "settings loaded");
    Ok(settings)
}

fn execute_tree(args: TreeArgs, settings: &Settings) -> Result<()> {
    let records = load_records(&args.input.snapshot)?;
    let policy = if args.promote_orphans {
        OrphanPolicy::PromoteToRoot
    } else {
        settings.workspace.orphan_policy
    };
    let forest = ForestBuilder::with_policy(policy).build(&records);
    if args.paths {
        print_paths(&forest, &records);
        report_skipped(&forest);
    } else {
        print_forest(&forest);
    }
    Ok(())
}

fn print_forest(forest: &Forest) {
    for row in forest.rows() {
        let marker = if row.node.is_folder() { "/" } else { "" };
        println!("{}{}{marker}", "  ".repeat(row.depth), row.node.name);
    }
    report_skipped(forest);
}

fn print_paths(forest: &Forest, records: &[FileRecord]) {
    let paths = RecordPaths::new(records);
    for row in forest.rows() {
        if let Some(path) = paths.path(&row.node.id) {
            let marker = if row.node.is_folder() { "/" } else { "" };
            println!("{path}{marker}");
        }
    }
}

fn report_skipped(forest: &Forest) {
    let report = &forest.report;
    if !report.is_clean() {
        eprintln!(
            "skipped {} orphaned, {} cyclic, {} duplicate record(s)",
            report.orphaned.len(),
            report.cyclic.len(),
            report.duplicates.len()
        );
    }
}

fn resolver(settings: &Settings) -> EntryResolver {
    EntryResolver::new(settings.preview.entry_file.clone())
        .with_tie_break(settings.preview.tie_break)
}

fn execute_entry(args: SnapshotArgs, settings: &Settings) -> Result<()> {
    let records = load_records(&args.snapshot)?;
    let resolver = resolver(settings);
    match resolver.resolve(&records) {
        Some(entry) => {
            print!("{}", entry.source());
            Ok(())
        }
        None => bail!("no {} file found", resolver.file_name()),
    }
}

fn execute_preview(args: PreviewArgs, settings: &Settings) -> Result<()> {
    let records = load_records(&args.input.snapshot)?;
    let timeout = args
        .timeout_ms
        .map(Duration::from_millis)
        .unwrap_or_else(|| settings.preview.render_timeout());
    let mut renderer = PreviewRenderer::new(Arc::new(V8Engine::new(timeout)))
        .with_resolver(resolver(settings))
        .with_symbol(settings.preview.entry_symbol.clone());
    renderer.sync(&records);

    // The engine enforces `timeout`; the extra second covers isolate startup.
    let status = renderer.wait(timeout + Duration::from_secs(1));
    let state = renderer.state();
    match status {
        PreviewStatus::Rendered | PreviewStatus::Empty => {
            println!("{}", state.display_markup(&settings.preview.entry_file));
            Ok(())
        }
        PreviewStatus::Errored => match state.last_error() {
            Some(error) => bail!("{} error: {}", error.phase.as_str(), error.message),
            None => bail!("preview failed"),
        },
        PreviewStatus::Loading => bail!("preview did not settle within {} ms", timeout.as_millis()),
    }
}

fn execute_project(
    command: ProjectCommand,
    settings: &Settings,
    store: &mut dyn FileStore,
) -> Result<()> {
    match command {
        ProjectCommand::List { user } => {
            let user = require_user(user, settings)?;
            let projects = store.list_projects(&user)?;
            if projects.is_empty() {
                println!("No projects for {user}.");
            }
            for project in projects {
                match project.description.as_deref() {
                    Some(description) => {
                        println!("{}\t{}\t{description}", project.id, project.name)
                    }
                    None => println!("{}\t{}", project.id, project.name),
                }
            }
            Ok(())
        }
        ProjectCommand::Create {
            name,
            description,
            user,
        } => {
            let request = NewProject {
                name,
                description,
                user_id: user.or_else(|| settings.api.user_id.clone()),
            };
            let project = store.create_project(&request)?;
            println!("{}", project.id);
            Ok(())
        }
        ProjectCommand::Show { id, json } => {
            let detail = store.project_detail(&ProjectId::new(id))?;
            if json {
                println!("{}", serde_json::to_string_pretty(&detail)?);
            } else {
                print_detail(&detail, settings);
            }
            Ok(())
        }
        ProjectCommand::Delete { id } => {
            store.delete_project(&ProjectId::new(id))?;
            Ok(())
        }
    }
}

fn print_detail(detail: &ProjectDetail, settings: &Settings) {
    println!("{} ({})", detail.project.name, detail.project.id);
    let forest = ForestBuilder::with_policy(settings.workspace.orphan_policy).build(&detail.files);
    print_forest(&forest);
}

fn require_user(user: Option<String>, settings: &Settings) -> Result<String> {
    match user.or_else(|| settings.api.user_id.clone()) {
        Some(user) => Ok(user),
        None => bail!("no user id: pass --user or set api.user_id in the settings file"),
    }
}

fn execute_file(command: FileCommand, store: &mut dyn FileStore) -> Result<()> {
    match command {
        FileCommand::Create {
            project,
            name,
            parent,
            folder,
        } => {
            let project = ProjectId::new(project);
            let parent = parent.map(RecordId::new);
            let draft = if folder {
                FileDraft::folder(project, parent, name)
            } else {
                FileDraft::file(project, parent, name)
            };
            let record = store.create_file(&draft)?;
            println!("{}", record.id);
            Ok(())
        }
        FileCommand::Delete { id } => {
            store.delete_file(&RecordId::new(id))?;
            Ok(())
        }
        FileCommand::Write { id, input } => {
            let content = read_input(&input)?;
            let record = store.update_file(&RecordId::new(id), &FilePatch::content(content))?;
            report_record(&record);
            Ok(())
        }
        FileCommand::Rename { id, name } => {
            let record = store.update_file(&RecordId::new(id), &FilePatch::rename(name))?;
            report_record(&record);
            Ok(())
        }
    }
}

fn report_record(record: &FileRecord) {
    println!("{}\t{}\t{} bytes", record.id, record.name, record.text().len());
}
