use serde::{Deserialize, Serialize};

use crate::file::models::double_option;

/// A folder entry. The tree is implied by `parent_id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FolderRecord {
    pub id: String,
    pub name: String,

    #[serde(default)]
    pub path: String,

    /// `None` for root level folders
    #[serde(default)]
    pub parent_id: Option<String>,

    /// Whether the sidebar shows this folder's children
    #[serde(default)]
    pub expanded: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewFolder {
    pub name: String,

    #[serde(default)]
    pub path: Option<String>,

    #[serde(default)]
    pub parent_id: Option<String>,
}

/// Partial update of a [FolderRecord]. Absent fields are left untouched.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FolderPatch {
    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub path: Option<String>,

    #[serde(default, deserialize_with = "double_option")]
    pub parent_id: Option<Option<String>>,

    #[serde(default)]
    pub expanded: Option<bool>,
}

impl FolderPatch {
    pub fn apply(self, record: &mut FolderRecord) {
        let FolderPatch {
            name,
            path,
            parent_id,
            expanded,
        } = self;

        if let Some(name) = name {
            record.name = name;
        }
        if let Some(path) = path {
            record.path = path;
        }
        if let Some(parent_id) = parent_id {
            record.parent_id = parent_id;
        }
        if let Some(expanded) = expanded {
            record.expanded = expanded;
        }
    }
}

/// Sidebar node, children are only populated for expanded folders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FolderNode {
    #[serde(flatten)]
    pub folder: FolderRecord,

    /// Whether the folder has child folders at all, expanded or not
    pub has_children: bool,

    pub children: Vec<FolderNode>,
}
