//! Workspace model for CipherStudio: flat file records and the forest built from them.
//! CipherStudio 的工作區模型：扁平檔案紀錄以及由其建立的樹狀結構。

pub mod paths;
pub mod record;
pub mod tree;
pub mod util;

pub use paths::RecordPaths;
pub use record::{FileKind, FileRecord, ProjectId, RecordId};
pub use tree::{
    build_forest, Forest, ForestBuilder, ForestReport, ForestRow, OrphanPolicy, TreeNode,
};
pub use util::{write_atomic, write_json_atomic};
