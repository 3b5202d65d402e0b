use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// A file entry held by the [FileStore][super::FileStore].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileRecord {
    pub id: String,

    /// Display name, extension included
    pub name: String,

    /// Lowercase extension
    #[serde(rename = "type", default)]
    pub r#type: Option<String>,

    /// Size in bytes
    #[serde(default)]
    pub size: u64,

    pub modified: DateTime<Utc>,

    /// Display location, not checked against the folder tree
    #[serde(default)]
    pub path: String,

    #[serde(default)]
    pub parent_id: Option<String>,

    /// Always false, folders live in their own store
    #[serde(default)]
    pub is_folder: bool,
}

impl FileRecord {
    /// Case insensitive substring match on the name or the type.
    /// `needle` must come from [search_needle].
    pub fn matches(&self, needle: &str) -> bool {
        self.name.to_lowercase().contains(needle)
            || self
                .r#type
                .as_ref()
                .is_some_and(|t| t.to_lowercase().contains(needle))
    }
}

/// Normalised form of a user query: trimmed and lowercased. Empty matches everything.
pub fn search_needle(query: &str) -> String {
    query.trim().to_lowercase()
}

/// Payload for creating an empty file.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewFile {
    pub name: String,

    #[serde(rename = "type", default)]
    pub r#type: Option<String>,

    #[serde(default)]
    pub size: Option<u64>,

    #[serde(default)]
    pub path: Option<String>,

    #[serde(default)]
    pub parent_id: Option<String>,
}

/// Metadata of a file uploaded from the browser.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileUpload {
    /// Name of the source file on the client
    pub file_name: String,

    pub size: u64,

    /// Display name, defaults to `file_name`
    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub path: Option<String>,

    #[serde(default)]
    pub parent_id: Option<String>,
}

/// Partial update of a [FileRecord]. Absent fields are left untouched.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilePatch {
    #[serde(default)]
    pub name: Option<String>,

    #[serde(rename = "type", default, deserialize_with = "double_option")]
    pub r#type: Option<Option<String>>,

    #[serde(default)]
    pub size: Option<u64>,

    #[serde(default)]
    pub path: Option<String>,

    /// `Some(None)` moves the file to the root
    #[serde(default, deserialize_with = "double_option")]
    pub parent_id: Option<Option<String>>,
}

impl FilePatch {
    pub fn apply(self, record: &mut FileRecord) {
        let FilePatch {
            name,
            r#type,
            size,
            path,
            parent_id,
        } = self;

        if let Some(name) = name {
            record.name = name;
        }
        if let Some(r#type) = r#type {
            record.r#type = r#type;
        }
        if let Some(size) = size {
            record.size = size;
        }
        if let Some(path) = path {
            record.path = path;
        }
        if let Some(parent_id) = parent_id {
            record.parent_id = parent_id;
        }
    }
}

/// Distinguishes an explicit `null` from a missing field.
pub(crate) fn double_option<'de, D, T>(de: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(de).map(Some)
}

/// Lowercased text after the last dot of `name`, if there is one.
pub fn extension_of(name: &str) -> Option<String> {
    name.rsplit_once('.')
        .map(|(_, ext)| ext.to_lowercase())
        .filter(|ext| !ext.is_empty())
}
