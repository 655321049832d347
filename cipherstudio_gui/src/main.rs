mod editor;
mod pointer;
mod preview_pane;

use std::sync::Arc;
use std::time::{Duration, Instant};

use cipherstudio_explorer::{
    controller_from_settings, BearerToken, ExplorerController, NoticeLevel,
};
use cipherstudio_preview::{EntryResolver, PreviewRenderer, PreviewStatus, V8Engine};
use cipherstudio_settings::{settings_path_from_env, PaneLayout, Settings, SettingsStore};
use cipherstudio_workspace::{FileKind, ProjectId, RecordId, RecordPaths};
use eframe::{egui, App, Frame, NativeOptions};
use egui::{pos2, Align, Color32, Layout, Rect, RichText, Ui};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::editor::EditorBuffer;
use crate::pointer::PointerFrame;

const APP_TITLE: &str = "CipherStudio";
const POLL_INTERVAL: Duration = Duration::from_millis(50);
const INITIAL_WIDTH: f32 = 1280.0;

/// What a click in the explorer asked for; applied after the panel is drawn.
enum ExplorerAction {
    Select(RecordId),
    Target(Option<RecordId>),
    Delete(RecordId),
    CreateFile,
    CreateFolder,
}

enum HeaderAction {
    Open(ProjectId),
    CreateProject,
    Save,
    TogglePreview,
    Refresh,
    Reload,
}

/// A row of the explorer, detached from the forest so the panel can borrow `self` freely.
struct Row {
    depth: usize,
    id: RecordId,
    name: String,
    kind: FileKind,
}

struct CipherStudioApp {
    settings: SettingsStore,
    controller: Option<ExplorerController>,
    startup_error: Option<String>,
    renderer: PreviewRenderer,
    layout: PaneLayout,
    editor: EditorBuffer,
    new_project_name: String,
    new_entry_name: String,
    target_folder: Option<RecordId>,
}

impl CipherStudioApp {
    fn new() -> Self {
        let path = settings_path_from_env();
        let (settings, settings_error) = match SettingsStore::load(&path) {
            Ok(store) => (store, None),
            Err(err) => {
                warn!(error = %err, "settings unreadable; using defaults");
                (SettingsStore::new(path, Settings::default()), Some(err.to_string()))
            }
        };
        let mut config = settings.settings().clone();
        config.apply_env();

        let renderer = build_renderer(&config);
        let mut layout = PaneLayout::new(config.layout, INITIAL_WIDTH);
        layout.set_preview_visible(config.preview.visible);

        let (controller, startup_error) =
            match controller_from_settings(&config, BearerToken::from_env()) {
                Ok(controller) => (Some(controller), settings_error),
                Err(err) => {
                    warn!(error = %err, "persistence unavailable");
                    (None, Some(err.to_string()))
                }
            };

        let mut app = Self {
            settings,
            controller,
            startup_error,
            renderer,
            layout,
            editor: EditorBuffer::default(),
            new_project_name: String::new(),
            new_entry_name: String::new(),
            target_folder: None,
        };
        app.load_initial_project();
        app
    }

    fn load_initial_project(&mut self) {
        let Some(controller) = self.controller.as_mut() else {
            return;
        };
        if controller.user_id().is_none() {
            controller
                .notices_mut()
                .info("Set api.user_id in the settings file to load projects");
            return;
        }
        let first = match controller.load_projects() {
            Ok(projects) => projects.first().map(|project| project.id.clone()),
            Err(_) => None,
        };
        if let Some(id) = first {
            // Failures are already queued as notices.
            let _ = controller.open_project(&id);
        }
        self.after_mutation();
    }

    /// Re-syncs the editor buffer and the preview with the controller's snapshot.
    fn after_mutation(&mut self) {
        let Some(controller) = self.controller.as_ref() else {
            return;
        };
        self.editor.sync(controller);
        if self
            .target_folder
            .as_ref()
            .is_some_and(|id| !controller.records().iter().any(|record| &record.id == id))
        {
            self.target_folder = None;
        }
        self.sync_preview();
    }

    fn sync_preview(&mut self) {
        if let Some(controller) = self.controller.as_ref() {
            preview_pane::sync_if_visible(&mut self.renderer, &self.layout, controller.records());
        }
    }

    fn persist_preview_visibility(&mut self) {
        let visible = self.layout.preview_visible();
        if let Err(err) = self
            .settings
            .update(|settings| settings.preview.visible = visible)
        {
            warn!(error = %err, "failed to persist preview visibility");
        }
    }

    fn handle_pointer(&mut self, ctx: &egui::Context, panes: Rect) {
        let frame = ctx.input(|input| PointerFrame {
            x: pointer::layout_x(input.pointer.hover_pos(), panes),
            pressed: input.pointer.primary_pressed()
                && input
                    .pointer
                    .interact_pos()
                    .is_some_and(|pos| panes.contains(pos)),
            released: input.pointer.primary_released(),
        });
        pointer::apply(&mut self.layout, frame);

        let over_divider = frame
            .x
            .is_some_and(|x| pointer::grab_target(&self.layout, x).is_some());
        if self.layout.drag_state().is_dragging() || over_divider {
            ctx.set_cursor_icon(egui::CursorIcon::ResizeHorizontal);
        }
    }

    fn show_header(&mut self, ctx: &egui::Context) {
        let mut action = None;
        egui::TopBottomPanel::top("header")
            .resizable(false)
            .exact_height(38.0)
            .show(ctx, |ui| {
                ui.with_layout(Layout::left_to_right(Align::Center), |ui| {
                    ui.heading(APP_TITLE);
                    ui.separator();
                    if let Some(controller) = self.controller.as_ref() {
                        let current = controller
                            .current_project()
                            .map(|project| project.name.clone())
                            .unwrap_or_else(|| "Select project".to_string());
                        egui::ComboBox::from_id_source("project_selector")
                            .selected_text(current)
                            .show_ui(ui, |ui| {
                                for project in controller.projects() {
                                    let open = controller
                                        .current_project()
                                        .is_some_and(|current| current.id == project.id);
                                    let label = ui.selectable_label(open, project.name.as_str());
                                    if label.clicked() {
                                        action = Some(HeaderAction::Open(project.id.clone()));
                                    }
                                }
                            });
                        ui.add(
                            egui::TextEdit::singleline(&mut self.new_project_name)
                                .hint_text("New project name")
                                .desired_width(150.0),
                        );
                        let can_create = !self.new_project_name.trim().is_empty();
                        if ui
                            .add_enabled(can_create, egui::Button::new("New project"))
                            .clicked()
                        {
                            action = Some(HeaderAction::CreateProject);
                        }
                        ui.separator();
                        let dirty = controller
                            .selected_id()
                            .is_some_and(|id| controller.is_dirty(id));
                        if ui.add_enabled(dirty, egui::Button::new("Save")).clicked() {
                            action = Some(HeaderAction::Save);
                        }
                        if ui.button("Reload").clicked() {
                            action = Some(HeaderAction::Reload);
                        }
                    }
                    ui.with_layout(Layout::right_to_left(Align::Center), |ui| {
                        let label = if self.layout.preview_visible() {
                            "Hide preview"
                        } else {
                            "Show preview"
                        };
                        if ui.button(label).clicked() {
                            action = Some(HeaderAction::TogglePreview);
                        }
                        if ui.button("Refresh").clicked() {
                            action = Some(HeaderAction::Refresh);
                        }
                    });
                });
            });

        if ctx.input_mut(|input| input.consume_key(egui::Modifiers::COMMAND, egui::Key::S)) {
            action = Some(HeaderAction::Save);
        }
        if let Some(action) = action {
            self.apply_header(action);
        }
    }

    fn apply_header(&mut self, action: HeaderAction) {
        match action {
            HeaderAction::TogglePreview => {
                let visible = self.layout.toggle_preview();
                info!(visible, "preview toggled");
                self.persist_preview_visibility();
                self.sync_preview();
                return;
            }
            HeaderAction::Refresh => {
                if self.layout.preview_visible() {
                    self.renderer.refresh();
                }
                return;
            }
            _ => {}
        }
        let Some(controller) = self.controller.as_mut() else {
            return;
        };
        // Errors are reported through the controller's notices.
        let _ = match action {
            HeaderAction::Open(id) => controller.open_project(&id),
            HeaderAction::CreateProject => {
                let name = std::mem::take(&mut self.new_project_name);
                controller.create_project(&name, None).map(|_| ())
            }
            HeaderAction::Save => controller.save_selected().map(|_| ()),
            HeaderAction::Reload => controller.reload(),
            HeaderAction::TogglePreview | HeaderAction::Refresh => Ok(()),
        };
        self.after_mutation();
    }

    fn show_status_bar(&mut self, ctx: &egui::Context) {
        let now = Instant::now();
        let (status, notice) = match self.controller.as_mut() {
            Some(controller) => {
                let notice = controller
                    .notices_mut()
                    .active(now)
                    .last()
                    .map(|notice| (notice.level, notice.message.clone()));
                (Some(controller.status()), notice)
            }
            None => (None, None),
        };
        let preview = self.renderer.status();

        egui::TopBottomPanel::bottom("status_bar")
            .resizable(false)
            .exact_height(24.0)
            .show(ctx, |ui| {
                ui.with_layout(Layout::left_to_right(Align::Center), |ui| {
                    ui.spacing_mut().item_spacing.x = 10.0;
                    match &status {
                        Some(status) => {
                            ui.label(format!(
                                "Project: {}",
                                status.project_name.as_deref().unwrap_or("None")
                            ));
                            ui.separator();
                            ui.label(format!(
                                "File: {}",
                                status.selected_file.as_deref().unwrap_or("None")
                            ));
                            ui.separator();
                            ui.label(format!("Files: {}", status.file_count));
                            if status.unsaved > 0 {
                                ui.separator();
                                ui.label(format!("Unsaved: {}", status.unsaved));
                            }
                        }
                        None => {
                            let message = self.startup_error.as_deref().unwrap_or("Offline");
                            ui.colored_label(Color32::LIGHT_RED, message);
                        }
                    }
                    ui.separator();
                    ui.label(format!("Preview: {}", preview.as_str()));
                });
                if let Some((level, message)) = &notice {
                    ui.with_layout(Layout::right_to_left(Align::Center), |ui| {
                        ui.colored_label(notice_color(*level), message);
                    });
                }
            });
        if notice.is_some() {
            ctx.request_repaint_after(Duration::from_millis(500));
        }
    }

    fn show_panes(&mut self, ctx: &egui::Context) {
        egui::CentralPanel::default()
            .frame(egui::Frame::none())
            .show(ctx, |ui| {
                let panes = ui.max_rect();
                self.layout.set_viewport_width(panes.width());
                self.handle_pointer(ctx, panes);

                let regions = self.layout.regions();
                let column = |start: f32, width: f32| {
                    Rect::from_min_max(
                        pos2(panes.left() + start, panes.top()),
                        pos2(panes.left() + start + width, panes.bottom()),
                    )
                };
                let divider_color = ui.visuals().widgets.noninteractive.bg_stroke.color;

                let explorer = column(regions.explorer.start, regions.explorer.width);
                self.show_explorer(&mut region(ui, explorer));

                let divider = column(regions.left_divider.start, regions.left_divider.width);
                ui.painter().rect_filled(divider, 0.0, divider_color);

                let editor = column(regions.editor.start, regions.editor.width);
                self.show_editor(&mut region(ui, editor));

                if let (Some(divider), Some(preview)) = (regions.right_divider, regions.preview) {
                    let divider = column(divider.start, divider.width);
                    ui.painter().rect_filled(divider, 0.0, divider_color);
                    let preview = column(preview.start, preview.width);
                    self.show_preview(&mut region(ui, preview));
                }
            });
    }

    fn show_explorer(&mut self, ui: &mut Ui) {
        ui.heading("Explorer");
        let Some(controller) = self.controller.as_ref() else {
            ui.label("No store available.");
            return;
        };
        if controller.current_project().is_none() {
            ui.label("Open or create a project.");
            return;
        }

        let forest = controller.forest();
        let rows: Vec<Row> = forest
            .rows()
            .into_iter()
            .map(|row| Row {
                depth: row.depth,
                id: row.node.id.clone(),
                name: row.node.name.clone(),
                kind: row.node.kind,
            })
            .collect();
        let selected = controller.selected_id().cloned();
        let target_path = self
            .target_folder
            .as_ref()
            .and_then(|id| RecordPaths::new(controller.records()).path(id));

        let mut action = None;
        ui.horizontal(|ui| {
            ui.add(
                egui::TextEdit::singleline(&mut self.new_entry_name)
                    .hint_text("name")
                    .desired_width(110.0),
            );
            let named = !self.new_entry_name.trim().is_empty();
            if ui.add_enabled(named, egui::Button::new("+ File")).clicked() {
                action = Some(ExplorerAction::CreateFile);
            }
            if ui.add_enabled(named, egui::Button::new("+ Folder")).clicked() {
                action = Some(ExplorerAction::CreateFolder);
            }
        });
        ui.horizontal(|ui| {
            ui.small(format!("in: {}", target_path.as_deref().unwrap_or("/")));
            if target_path.is_some() && ui.small_button("root").clicked() {
                action = Some(ExplorerAction::Target(None));
            }
        });
        ui.separator();

        egui::ScrollArea::vertical()
            .id_source("explorer_rows")
            .auto_shrink([false; 2])
            .show(ui, |ui| {
                for row in &rows {
                    ui.horizontal(|ui| {
                        ui.add_space(row.depth as f32 * 14.0);
                        let response = match row.kind {
                            FileKind::Folder => {
                                let targeted = self.target_folder.as_ref() == Some(&row.id);
                                ui.selectable_label(targeted, format!("📁 {}", row.name))
                            }
                            FileKind::File => {
                                let open = selected.as_ref() == Some(&row.id);
                                ui.selectable_label(open, format!("📄 {}", row.name))
                            }
                        };
                        if response.clicked() {
                            action = Some(match row.kind {
                                FileKind::Folder => ExplorerAction::Target(Some(row.id.clone())),
                                FileKind::File => ExplorerAction::Select(row.id.clone()),
                            });
                        }
                        response.context_menu(|ui| {
                            if ui.button("Delete").clicked() {
                                action = Some(ExplorerAction::Delete(row.id.clone()));
                                ui.close_menu();
                            }
                        });
                    });
                }
            });

        if let Some(action) = action {
            self.apply_explorer(action);
        }
    }

    fn apply_explorer(&mut self, action: ExplorerAction) {
        let Some(controller) = self.controller.as_mut() else {
            return;
        };
        // Errors are reported through the controller's notices.
        let _ = match action {
            ExplorerAction::Select(id) => controller.select(&id).map(|_| ()),
            ExplorerAction::Target(id) => {
                self.target_folder = id;
                Ok(())
            }
            ExplorerAction::Delete(id) => controller.delete_file(&id),
            ExplorerAction::CreateFile => {
                let name = std::mem::take(&mut self.new_entry_name);
                controller
                    .create_file(self.target_folder.as_ref(), &name)
                    .and_then(|record| controller.select(&record.id))
                    .map(|_| ())
            }
            ExplorerAction::CreateFolder => {
                let name = std::mem::take(&mut self.new_entry_name);
                controller
                    .create_folder(self.target_folder.as_ref(), &name)
                    .map(|_| ())
            }
        };
        self.after_mutation();
    }

    fn show_editor(&mut self, ui: &mut Ui) {
        let Some(controller) = self.controller.as_mut() else {
            return;
        };
        let Some(name) = controller.selected().map(|record| record.name.clone()) else {
            ui.centered_and_justified(|ui| {
                ui.label("Select a file to start editing");
            });
            return;
        };
        ui.label(RichText::new(name).strong());
        ui.separator();

        let changed = egui::ScrollArea::vertical()
            .id_source("editor")
            .auto_shrink([false; 2])
            .show(ui, |ui| {
                ui.add_sized(
                    ui.available_size(),
                    egui::TextEdit::multiline(&mut self.editor.text)
                        .code_editor()
                        .desired_width(f32::INFINITY),
                )
                .changed()
            })
            .inner;

        if changed {
            // The local record must hold the edit before the preview sees the snapshot.
            if controller.edit_content(self.editor.text.clone()).is_ok() {
                self.sync_preview();
            }
        }
    }

    fn show_preview(&mut self, ui: &mut Ui) {
        ui.horizontal(|ui| {
            ui.heading("Preview");
            ui.label(self.renderer.status().as_str());
        });
        ui.separator();
        let state = self.renderer.state();
        let markup = state.display_markup(&self.settings.settings().preview.entry_file);
        let color = match state.status() {
            PreviewStatus::Errored => Color32::LIGHT_RED,
            _ => ui.visuals().text_color(),
        };
        egui::ScrollArea::both()
            .id_source("preview")
            .auto_shrink([false; 2])
            .show(ui, |ui| {
                ui.label(RichText::new(markup).monospace().color(color));
            });
    }
}

fn build_renderer(settings: &Settings) -> PreviewRenderer {
    let preview = &settings.preview;
    PreviewRenderer::new(Arc::new(V8Engine::new(preview.render_timeout())))
        .with_resolver(
            EntryResolver::new(preview.entry_file.clone()).with_tie_break(preview.tie_break),
        )
        .with_symbol(preview.entry_symbol.clone())
}

fn region(ui: &mut Ui, rect: Rect) -> Ui {
    ui.child_ui(rect.shrink(6.0), Layout::top_down(Align::Min))
}

fn notice_color(level: NoticeLevel) -> Color32 {
    match level {
        NoticeLevel::Info => Color32::LIGHT_BLUE,
        NoticeLevel::Success => Color32::LIGHT_GREEN,
        NoticeLevel::Error => Color32::LIGHT_RED,
    }
}

impl App for CipherStudioApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut Frame) {
        self.renderer.poll();
        if self.renderer.status() == PreviewStatus::Loading {
            ctx.request_repaint_after(POLL_INTERVAL);
        }

        self.show_header(ctx);
        self.show_status_bar(ctx);
        self.show_panes(ctx);
    }
}

fn main() -> eframe::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    // A subscriber may already be installed when embedded; keep going without one.
    let _ = tracing_subscriber::fmt().with_env_filter(filter).compact().try_init();

    let options = NativeOptions {
        viewport: egui::ViewportBuilder::default().with_inner_size([INITIAL_WIDTH, 760.0]),
        ..Default::default()
    };
    eframe::run_native(
        APP_TITLE,
        options,
        Box::new(|_cc| Box::new(CipherStudioApp::new())),
    )
}
