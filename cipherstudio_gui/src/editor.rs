//! Text buffer behind the editor pane.
//! 編輯器窗格背後的文字緩衝區。

use cipherstudio_explorer::ExplorerController;
use cipherstudio_workspace::RecordId;

/// Editor text for the selected file. Unsaved keystrokes live in the controller's record
/// as well; once a record is clean again (saved or reloaded) the record wins.
#[derive(Debug, Default)]
pub struct EditorBuffer {
    pub text: String,
    record: Option<RecordId>,
}

impl EditorBuffer {
    /// Re-reads the text from `controller` when the selection changed or the selected
    /// record is no longer dirty. Returns whether the text was replaced.
    pub fn sync(&mut self, controller: &ExplorerController) -> bool {
        let selected = controller.selected_id();
        let clean = selected.is_some_and(|id| !controller.is_dirty(id));
        if selected == self.record.as_ref() && !clean {
            return false;
        }
        let text = controller
            .selected()
            .map(|record| record.text())
            .unwrap_or_default();
        let replaced = self.text != text || selected != self.record.as_ref();
        if self.text != text {
            self.text = text.to_string();
        }
        self.record = selected.cloned();
        replaced
    }
}
