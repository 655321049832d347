//! Keeps the preview renderer fed while its pane is on screen.

use cipherstudio_preview::PreviewRenderer;
use cipherstudio_settings::PaneLayout;
use cipherstudio_workspace::FileRecord;

/// Syncs `renderer` with `records` only while the preview pane is visible, so a hidden
/// preview never mounts a surface. Returns whether a new render cycle started.
pub fn sync_if_visible(
    renderer: &mut PreviewRenderer,
    layout: &PaneLayout,
    records: &[FileRecord],
) -> bool {
    if !layout.preview_visible() {
        return false;
    }
    renderer.sync(records)
}
