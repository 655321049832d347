use cipherstudio_workspace::{FileKind, FileRecord};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Conventional name of the file whose default export is previewed.
/// 預覽所使用之進入點檔案的慣例名稱。
pub const DEFAULT_ENTRY_FILE: &str = "App.js";

/// Which candidate wins when several files carry the entry name.
/// 當多個檔案同名為進入點時，選擇哪一個。
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryTieBreak {
    /// The last matching record in snapshot order.
    /// 快照順序中最後一個符合者。
    #[default]
    LastInSnapshot,
    /// The first matching record in snapshot order.
    /// 快照順序中第一個符合者。
    FirstInSnapshot,
}

/// The record selected as preview entry.
/// 被選為預覽進入點的紀錄。
#[derive(Clone, Copy, Debug)]
pub struct ResolvedEntry<'a> {
    pub record: &'a FileRecord,
    /// How many records matched before the tie-break was applied.
    /// 套用選擇規則前符合條件的紀錄數。
    pub candidates: usize,
}

impl<'a> ResolvedEntry<'a> {
    pub fn source(&self) -> &'a str {
        self.record.text()
    }
}

/// Locates the entry file inside a snapshot.
/// 在快照中尋找進入點檔案。
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EntryResolver {
    file_name: String,
    tie_break: EntryTieBreak,
}

impl Default for EntryResolver {
    fn default() -> Self {
        Self::new(DEFAULT_ENTRY_FILE)
    }
}

impl EntryResolver {
    pub fn new(file_name: impl Into<String>) -> Self {
        Self {
            file_name: file_name.into(),
            tie_break: EntryTieBreak::default(),
        }
    }

    pub fn with_tie_break(mut self, tie_break: EntryTieBreak) -> Self {
        self.tie_break = tie_break;
        self
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn tie_break(&self) -> EntryTieBreak {
        self.tie_break
    }

    /// Scans `files` for `kind = file` records named like the entry with non-empty
    /// content, then applies the tie-break.
    /// 掃描名稱相符且內容非空的檔案紀錄，再套用選擇規則。
    pub fn resolve<'a>(&self, files: &'a [FileRecord]) -> Option<ResolvedEntry<'a>> {
        let mut candidates = files.iter().filter(|record| {
            record.kind == FileKind::File
                && record.name == self.file_name
                && !record.text().is_empty()
        });
        let (record, count) = match self.tie_break {
            EntryTieBreak::FirstInSnapshot => {
                let first = candidates.next()?;
                (first, 1 + candidates.count())
            }
            EntryTieBreak::LastInSnapshot => {
                candidates.fold(None, |acc: Option<(&FileRecord, usize)>, record| {
                    Some((record, acc.map_or(1, |(_, seen)| seen + 1)))
                })?
            }
        };
        if count > 1 {
            warn!(
                entry = %self.file_name,
                candidates = count,
                chosen = %record.id,
                tie_break = ?self.tie_break,
                "several entry files found; using tie-break"
            );
        }
        Some(ResolvedEntry {
            record,
            candidates: count,
        })
    }
}

/// Returns the content of the `App.js` entry, last match winning.
/// 回傳 `App.js` 進入點內容，以最後一個符合者為準。
pub fn resolve_entry(files: &[FileRecord]) -> Option<String> {
    EntryResolver::default()
        .resolve(files)
        .map(|entry| entry.source().to_string())
}
