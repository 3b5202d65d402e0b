use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::debug;

use self::models::{extension_of, search_needle, FilePatch, FileRecord, FileUpload, NewFile};
use crate::{
    clock::{Clock, Latency, OpKind},
    error::FileDeskError,
};

pub mod models;

/// In-memory collection of file records.
///
/// Every read hands out clones, callers never hold a reference into the collection.
/// Each operation sleeps for its simulated latency first and then runs against the
/// collection under a single lock acquisition.
#[derive(Debug)]
pub struct FileStore {
    files: RwLock<Vec<FileRecord>>,
    latency: Latency,
    clock: Arc<Clock>,
}

impl FileStore {
    pub fn new(seed: Vec<FileRecord>, latency: Latency, clock: Arc<Clock>) -> Self {
        if let Some(latest) = seed.iter().map(|f| f.modified).max() {
            clock.observe(latest);
        }

        Self {
            files: RwLock::new(seed),
            latency,
            clock,
        }
    }

    pub async fn list_all(&self) -> Vec<FileRecord> {
        self.latency.pause(OpKind::ListAll).await;
        self.files.read().await.clone()
    }

    /// Files whose parent is `folder_id`. `None` lists files at the root.
    pub async fn list_by_folder(&self, folder_id: Option<&str>) -> Vec<FileRecord> {
        self.latency.pause(OpKind::ListByFolder).await;
        self.files
            .read()
            .await
            .iter()
            .filter(|f| f.parent_id.as_deref() == folder_id)
            .cloned()
            .collect()
    }

    pub async fn get_by_id(&self, id: &str) -> Option<FileRecord> {
        self.latency.pause(OpKind::Get).await;
        self.files.read().await.iter().find(|f| f.id == id).cloned()
    }

    pub async fn create(&self, data: NewFile) -> FileRecord {
        self.latency.pause(OpKind::Mutate).await;

        let NewFile {
            name,
            r#type,
            size,
            path,
            parent_id,
        } = data;

        let file = FileRecord {
            id: uuid::Uuid::new_v4().to_string(),
            r#type: r#type.or_else(|| extension_of(&name)),
            size: size.unwrap_or(0),
            modified: self.clock.now(),
            path: path.unwrap_or_else(|| format!("/{name}")),
            parent_id,
            is_folder: false,
            name,
        };

        debug!("Creating file {} ({})", file.name, file.id);

        self.files.write().await.push(file.clone());
        file
    }

    pub async fn upload(&self, data: FileUpload) -> FileRecord {
        self.latency.pause(OpKind::Mutate).await;

        let FileUpload {
            file_name,
            size,
            name,
            path,
            parent_id,
        } = data;

        let file = FileRecord {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.unwrap_or_else(|| file_name.clone()),
            r#type: extension_of(&file_name),
            size,
            modified: self.clock.now(),
            path: path.unwrap_or_else(|| format!("/{file_name}")),
            parent_id,
            is_folder: false,
        };

        debug!("Uploaded file {} ({} bytes)", file.name, file.size);

        self.files.write().await.push(file.clone());
        file
    }

    pub async fn update(&self, id: &str, patch: FilePatch) -> Result<FileRecord, FileDeskError> {
        self.latency.pause(OpKind::Mutate).await;

        let mut files = self.files.write().await;
        let file = files
            .iter_mut()
            .find(|f| f.id == id)
            .ok_or_else(|| FileDeskError::file_not_found(id))?;

        patch.apply(file);
        file.modified = self.clock.now();

        Ok(file.clone())
    }

    pub async fn delete(&self, id: &str) -> Result<FileRecord, FileDeskError> {
        self.latency.pause(OpKind::Mutate).await;

        let mut files = self.files.write().await;
        let idx = files
            .iter()
            .position(|f| f.id == id)
            .ok_or_else(|| FileDeskError::file_not_found(id))?;

        Ok(files.remove(idx))
    }

    pub async fn move_to(
        &self,
        id: &str,
        parent_id: Option<String>,
    ) -> Result<FileRecord, FileDeskError> {
        self.latency.pause(OpKind::Mutate).await;

        let mut files = self.files.write().await;
        let file = files
            .iter_mut()
            .find(|f| f.id == id)
            .ok_or_else(|| FileDeskError::file_not_found(id))?;

        file.parent_id = parent_id;
        file.modified = self.clock.now();

        Ok(file.clone())
    }

    /// Case insensitive substring search on name and type, optionally scoped to a folder.
    /// A blank query returns the scoped listing, an empty folder id means no scope.
    pub async fn search(&self, query: &str, folder_id: Option<&str>) -> Vec<FileRecord> {
        self.latency.pause(OpKind::Search).await;

        let needle = search_needle(query);
        let folder_id = folder_id.filter(|id| !id.is_empty());

        self.files
            .read()
            .await
            .iter()
            .filter(|f| folder_id.map_or(true, |id| f.parent_id.as_deref() == Some(id)))
            .filter(|f| needle.is_empty() || f.matches(&needle))
            .cloned()
            .collect()
    }
}
