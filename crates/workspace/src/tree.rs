use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::record::{FileKind, FileRecord, ProjectId, RecordId};

/// What to do with a record whose parent id does not resolve inside the snapshot.
/// 父節點識別碼在快照中找不到時的處理策略。
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrphanPolicy {
    /// Leave the record (and anything below it) out of the forest.
    /// 將該紀錄（及其子孫）排除於樹狀結構之外。
    #[default]
    Drop,
    /// Show the record as an additional root, in snapshot order.
    /// 依快照順序將該紀錄提升為額外的根節點。
    PromoteToRoot,
}

/// Hierarchical node derived from a [`FileRecord`]; rebuilt on every snapshot.
/// 由 [`FileRecord`] 衍生的階層節點；每次快照都會重建。
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TreeNode {
    pub id: RecordId,
    pub name: String,
    pub kind: FileKind,
    pub parent_id: Option<RecordId>,
    pub project_id: Option<ProjectId>,
    pub content: Option<String>,
    pub children: Vec<TreeNode>,
}

impl TreeNode {
    fn from_record(record: &FileRecord) -> Self {
        Self {
            id: record.id.clone(),
            name: record.name.clone(),
            kind: record.kind,
            parent_id: record.parent_id.clone(),
            project_id: record.project_id.clone(),
            content: record.content.clone(),
            children: Vec::new(),
        }
    }

    pub fn is_folder(&self) -> bool {
        self.kind.is_folder()
    }
}

// Deeply nested chains would otherwise recurse once per level on drop.
impl Drop for TreeNode {
    fn drop(&mut self) {
        let mut pending = std::mem::take(&mut self.children);
        while let Some(mut node) = pending.pop() {
            pending.append(&mut node.children);
        }
    }
}

/// Records left out of (or adjusted in) the forest, for diagnostics.
/// 建樹時被排除或調整的紀錄，用於診斷。
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ForestReport {
    /// Records whose parent id is missing from the snapshot.
    /// 父節點不存在於快照中的紀錄。
    pub orphaned: Vec<RecordId>,
    /// Records that sit on, or below, a parent cycle.
    /// 位於父節點循環之上或之下的紀錄。
    pub cyclic: Vec<RecordId>,
    /// Repeated ids after their first occurrence.
    /// 首次出現之後重複的識別碼。
    pub duplicates: Vec<RecordId>,
}

impl ForestReport {
    pub fn is_clean(&self) -> bool {
        self.orphaned.is_empty() && self.cyclic.is_empty() && self.duplicates.is_empty()
    }
}

/// Rooted forest plus the report of what could not be attached.
/// 根節點集合以及無法掛載之紀錄的報告。
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Forest {
    pub roots: Vec<TreeNode>,
    pub report: ForestReport,
}

/// One line of the explorer: a node and its nesting depth.
/// 檔案總管中的一列：節點與其深度。
#[derive(Clone, Copy, Debug)]
pub struct ForestRow<'a> {
    pub depth: usize,
    pub node: &'a TreeNode,
}

impl Forest {
    /// Total number of nodes in the forest.
    /// 樹中節點總數。
    pub fn len(&self) -> usize {
        self.rows().len()
    }

    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    /// Pre-order flattening, siblings in snapshot order.
    /// 前序展開，兄弟節點維持快照順序。
    pub fn rows(&self) -> Vec<ForestRow<'_>> {
        let mut rows = Vec::new();
        let mut stack: Vec<(usize, &TreeNode)> =
            self.roots.iter().rev().map(|node| (0, node)).collect();
        while let Some((depth, node)) = stack.pop() {
            rows.push(ForestRow { depth, node });
            for child in node.children.iter().rev() {
                stack.push((depth + 1, child));
            }
        }
        rows
    }

    /// Finds a node by identifier.
    /// 依識別碼尋找節點。
    pub fn find(&self, id: &RecordId) -> Option<&TreeNode> {
        let mut stack: Vec<&TreeNode> = self.roots.iter().collect();
        while let Some(node) = stack.pop() {
            if &node.id == id {
                return Some(node);
            }
            stack.extend(node.children.iter());
        }
        None
    }

    pub fn into_roots(mut self) -> Vec<TreeNode> {
        std::mem::take(&mut self.roots)
    }
}

/// Builds forests from flat record snapshots in two linear passes.
/// 以兩次線性掃描將扁平紀錄快照組成樹狀結構。
#[derive(Clone, Copy, Debug, Default)]
pub struct ForestBuilder {
    policy: OrphanPolicy,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Fate {
    Pending,
    Detached,
    Cyclic,
}

impl ForestBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_policy(policy: OrphanPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> OrphanPolicy {
        self.policy
    }

    /// Builds the forest. Never fails: malformed references degrade to report entries.
    /// 建立樹狀結構；不會失敗，異常參照只會記錄於報告中。
    pub fn build(&self, records: &[FileRecord]) -> Forest {
        let count = records.len();
        let mut report = ForestReport::default();

        // Pass one: id -> arena slot. The first occurrence of an id owns it.
        let mut index: HashMap<&RecordId, usize> = HashMap::with_capacity(count);
        let mut live = vec![false; count];
        for (slot, record) in records.iter().enumerate() {
            if index.contains_key(&record.id) {
                report.duplicates.push(record.id.clone());
                continue;
            }
            index.insert(&record.id, slot);
            live[slot] = true;
        }

        // Pass two: attach every live record to its parent's child list.
        let mut children: Vec<Vec<usize>> = vec![Vec::new(); count];
        let mut roots = Vec::new();
        for (slot, record) in records.iter().enumerate() {
            if !live[slot] {
                continue;
            }
            let Some(parent) = &record.parent_id else {
                roots.push(slot);
                continue;
            };
            match index.get(parent) {
                Some(&parent_slot) if parent_slot != slot => children[parent_slot].push(slot),
                // Self-parented records stay unattached and surface as cyclic below.
                Some(_) => {}
                None => {
                    report.orphaned.push(record.id.clone());
                    if self.policy == OrphanPolicy::PromoteToRoot {
                        roots.push(slot);
                    }
                }
            }
        }

        let mut reached = vec![false; count];
        let mut post_order = Vec::with_capacity(count);
        let mut stack: Vec<(usize, bool)> = roots.iter().rev().map(|&slot| (slot, false)).collect();
        while let Some((slot, expanded)) = stack.pop() {
            if expanded {
                post_order.push(slot);
                continue;
            }
            reached[slot] = true;
            stack.push((slot, true));
            for &child in children[slot].iter().rev() {
                stack.push((child, false));
            }
        }

        report.cyclic = classify_unreached(records, &index, &live, &reached);

        let mut built: Vec<Option<TreeNode>> = (0..count).map(|_| None).collect();
        for slot in post_order {
            let mut node = TreeNode::from_record(&records[slot]);
            node.children = children[slot]
                .iter()
                .filter_map(|&child| built[child].take())
                .collect();
            built[slot] = Some(node);
        }
        let roots = roots
            .iter()
            .filter_map(|&slot| built[slot].take())
            .collect();

        if !report.is_clean() {
            debug!(
                orphaned = report.orphaned.len(),
                cyclic = report.cyclic.len(),
                duplicates = report.duplicates.len(),
                policy = ?self.policy,
                "workspace snapshot contains unattached records"
            );
        }

        Forest { roots, report }
    }
}

/// Returns the ids of unreached records that lie on or under a parent cycle,
/// in snapshot order. Records that only hang below a dropped orphan are not cyclic.
fn classify_unreached(
    records: &[FileRecord],
    index: &HashMap<&RecordId, usize>,
    live: &[bool],
    reached: &[bool],
) -> Vec<RecordId> {
    let count = records.len();
    let mut fate = vec![Fate::Pending; count];
    let mut on_path = vec![false; count];
    let mut path = Vec::new();

    for start in 0..count {
        if !live[start] || reached[start] || fate[start] != Fate::Pending {
            continue;
        }
        let mut cursor = start;
        let resolved = loop {
            if fate[cursor] != Fate::Pending {
                break fate[cursor];
            }
            if on_path[cursor] {
                break Fate::Cyclic;
            }
            on_path[cursor] = true;
            path.push(cursor);
            match records[cursor]
                .parent_id
                .as_ref()
                .and_then(|parent| index.get(parent))
            {
                Some(&parent) => cursor = parent,
                None => break Fate::Detached,
            }
        };
        for slot in path.drain(..) {
            on_path[slot] = false;
            fate[slot] = resolved;
        }
    }

    (0..count)
        .filter(|&slot| fate[slot] == Fate::Cyclic)
        .map(|slot| records[slot].id.clone())
        .collect()
}

/// Builds the forest with the default [`OrphanPolicy::Drop`] policy.
/// 以預設的 [`OrphanPolicy::Drop`] 策略建立樹狀結構。
pub fn build_forest(records: &[FileRecord]) -> Vec<TreeNode> {
    ForestBuilder::new().build(records).into_roots()
}
