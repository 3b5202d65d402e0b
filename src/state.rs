use std::sync::Arc;

use futures::future::join_all;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{info, warn};

use crate::{
    clock::{Clock, Latency},
    config::FolderDeletePolicy,
    error::FileDeskError,
    file::{
        models::{extension_of, FilePatch, FileRecord, FileUpload, NewFile},
        FileStore,
    },
    folder::{
        build_tree,
        models::{FolderNode, FolderPatch, FolderRecord, NewFolder},
        FolderStore,
    },
    seed::Seed,
    view::{derive_view, format_size, SortSpec},
};

/// Extension given to new files whose name has none
pub const DEFAULT_FILE_TYPE: &str = "txt";

/// Everything the UI talks to. Owns both stores and applies the rules that sit
/// above them: name validation, folder checks and the folder delete policy.
///
/// Successful actions are logged at `info`, failures at `warn`.
///
/// Anything that places a record into a folder holds `layout` for reading
/// from the target check until the write lands. Folder deletes hold it for
/// writing, so a folder cannot gain contents between the check and the delete.
#[derive(Debug, Clone)]
pub struct FileManager {
    pub files: Arc<FileStore>,
    pub folders: Arc<FolderStore>,
    folder_delete: FolderDeletePolicy,
    layout: Arc<RwLock<()>>,
}

/// Outcome of deleting several files at once. Each delete succeeds or fails on its own.
#[derive(Debug, Default, Serialize)]
pub struct BulkDeleteReport {
    pub deleted: Vec<FileRecord>,
    pub failed: Vec<BulkDeleteFailure>,
}

#[derive(Debug, Serialize)]
pub struct BulkDeleteFailure {
    pub id: String,
    pub error: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FilePreview {
    #[serde(flatten)]
    pub file: FileRecord,
    pub size_label: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateFile {
    pub name: String,

    /// Extension appended when `name` has none, `txt` when absent
    #[serde(rename = "type", default)]
    pub r#type: Option<String>,

    #[serde(default)]
    pub parent_id: Option<String>,
}

impl FileManager {
    pub fn new(seed: Seed, latency: Latency, folder_delete: FolderDeletePolicy) -> Self {
        let Seed { files, folders } = seed;
        let clock = Arc::new(Clock::new());

        Self {
            files: Arc::new(FileStore::new(files, latency, clock)),
            folders: Arc::new(FolderStore::new(folders, latency)),
            folder_delete,
            layout: Arc::new(RwLock::new(())),
        }
    }

    /// The file list for a folder, or every file when `folder` is `None`.
    /// A non empty `query` turns the listing into a search.
    pub async fn browse(
        &self,
        folder: Option<&str>,
        query: &str,
        sort: SortSpec,
    ) -> Vec<FileRecord> {
        let query = query.trim();
        let folder = folder.filter(|f| !f.is_empty());

        let files = if !query.is_empty() {
            self.files.search(query, folder).await
        } else if let Some(folder) = folder {
            self.files.list_by_folder(Some(folder)).await
        } else {
            self.files.list_all().await
        };

        derive_view(&files, sort, "")
    }

    pub async fn create_file(&self, data: CreateFile) -> Result<FileRecord, FileDeskError> {
        let CreateFile {
            name,
            r#type,
            parent_id,
        } = data;

        let name = require_name(&name, "file")?;

        let _layout = self.layout.read().await;
        self.require_folder(parent_id.as_deref()).await?;

        let r#type = r#type
            .map(|t| t.trim().trim_start_matches('.').to_lowercase())
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| DEFAULT_FILE_TYPE.to_string());

        // Only an extensionless name gets the chosen type appended
        let (name, r#type) = if name.contains('.') {
            let ext = extension_of(&name);
            (name, ext.or(Some(r#type)))
        } else {
            (format!("{name}.{}", r#type), Some(r#type))
        };

        let file = self
            .files
            .create(NewFile {
                path: Some(format!("/{name}")),
                name,
                r#type,
                size: Some(0),
                parent_id,
            })
            .await;

        info!("Created {}", file.name);
        Ok(file)
    }

    pub async fn upload_file(&self, data: FileUpload) -> Result<FileRecord, FileDeskError> {
        require_name(&data.file_name, "file")?;
        if let Some(name) = data.name.as_deref() {
            require_name(name, "file")?;
        }

        let _layout = self.layout.read().await;
        self.require_folder(data.parent_id.as_deref()).await?;

        let file = self.files.upload(data).await;

        info!("Uploaded {} ({})", file.name, format_size(file.size));
        Ok(file)
    }

    pub async fn update_file(
        &self,
        id: &str,
        mut patch: FilePatch,
    ) -> Result<FileRecord, FileDeskError> {
        if let Some(name) = patch.name.take() {
            patch.name = Some(require_name(&name, "file")?);
        }

        let _layout = self.layout.read().await;
        let result = self.files.update(id, patch).await;
        log_failure("update file", id, result)
    }

    pub async fn delete_file(&self, id: &str) -> Result<FileRecord, FileDeskError> {
        let result = self.files.delete(id).await;
        let file = log_failure("delete file", id, result)?;
        info!("Successfully deleted {}", file.name);
        Ok(file)
    }

    pub async fn move_file(
        &self,
        id: &str,
        folder: Option<String>,
    ) -> Result<FileRecord, FileDeskError> {
        let _layout = self.layout.read().await;
        self.require_folder(folder.as_deref()).await?;
        let result = self.files.move_to(id, folder).await;
        log_failure("move file", id, result)
    }

    /// Delete every id concurrently. Completions interleave in any order and a
    /// failing delete does not affect the others.
    pub async fn bulk_delete(&self, ids: &[String]) -> BulkDeleteReport {
        let results = join_all(ids.iter().map(|id| async move {
            let result = self.files.delete(id).await;
            (id, result)
        }))
        .await;

        let mut report = BulkDeleteReport::default();

        for (id, result) in results {
            match result {
                Ok(file) => report.deleted.push(file),
                Err(e) => {
                    warn!("Failed to delete {id}: {e}");
                    report.failed.push(BulkDeleteFailure {
                        id: id.clone(),
                        error: e.to_string(),
                    })
                }
            }
        }

        info!(
            "Bulk delete: {} deleted, {} failed",
            report.deleted.len(),
            report.failed.len()
        );

        report
    }

    pub async fn preview(&self, id: &str) -> Result<FilePreview, FileDeskError> {
        let file = self
            .files
            .get_by_id(id)
            .await
            .ok_or_else(|| FileDeskError::file_not_found(id))?;

        Ok(FilePreview {
            size_label: format_size(file.size),
            file,
        })
    }

    pub async fn create_folder(&self, data: NewFolder) -> Result<FolderRecord, FileDeskError> {
        let NewFolder {
            name,
            path,
            parent_id,
        } = data;

        let name = require_name(&name, "folder")?;

        let _layout = self.layout.read().await;
        let parent = match parent_id.as_deref() {
            Some(id) => Some(
                self.folders
                    .get_by_id(id)
                    .await
                    .ok_or_else(|| FileDeskError::folder_not_found(id))?,
            ),
            None => None,
        };

        let path = path.or_else(|| {
            parent.map(|p| format!("{}/{name}", p.path.trim_end_matches('/')))
        });

        let folder = self
            .folders
            .create(NewFolder {
                name,
                path,
                parent_id,
            })
            .await;

        info!("Created folder {}", folder.path);
        Ok(folder)
    }

    pub async fn update_folder(
        &self,
        id: &str,
        mut patch: FolderPatch,
    ) -> Result<FolderRecord, FileDeskError> {
        if let Some(name) = patch.name.take() {
            patch.name = Some(require_name(&name, "folder")?);
        }

        let _layout = self.layout.read().await;
        let result = self.folders.update(id, patch).await;
        log_failure("update folder", id, result)
    }

    /// Delete a folder according to the configured [FolderDeletePolicy].
    pub async fn delete_folder(&self, id: &str) -> Result<FolderRecord, FileDeskError> {
        let _layout = self.layout.write().await;

        let result = match self.folder_delete {
            FolderDeletePolicy::Orphan => self.folders.delete(id).await,
            FolderDeletePolicy::Reject => self.delete_empty_folder(id).await,
            FolderDeletePolicy::Reparent => self.delete_and_reparent(id).await,
        };

        let folder = log_failure("delete folder", id, result)?;
        info!("Successfully deleted folder {}", folder.name);
        Ok(folder)
    }

    async fn delete_empty_folder(&self, id: &str) -> Result<FolderRecord, FileDeskError> {
        let folder = self
            .folders
            .get_by_id(id)
            .await
            .ok_or_else(|| FileDeskError::folder_not_found(id))?;

        let subfolders = self.folders.get_children(id).await.len();
        let files = self.files.list_by_folder(Some(id)).await.len();

        if subfolders > 0 || files > 0 {
            return Err(FileDeskError::Validation(format!(
                "Folder {} is not empty ({subfolders} folders, {files} files)",
                folder.name
            )));
        }

        self.folders.delete(id).await
    }

    /// Contents are moved out before the folder goes, so a failure leaves the
    /// folder in place. Records deleted concurrently are skipped.
    async fn delete_and_reparent(&self, id: &str) -> Result<FolderRecord, FileDeskError> {
        let folder = self
            .folders
            .get_by_id(id)
            .await
            .ok_or_else(|| FileDeskError::folder_not_found(id))?;

        let mut moved_folders = 0;
        for child in self.folders.get_children(id).await {
            let patch = FolderPatch {
                parent_id: Some(None),
                ..Default::default()
            };
            if skip_missing(self.folders.update(&child.id, patch).await)?.is_some() {
                moved_folders += 1;
            }
        }

        let mut moved_files = 0;
        for file in self.files.list_by_folder(Some(id)).await {
            if skip_missing(self.files.move_to(&file.id, None).await)?.is_some() {
                moved_files += 1;
            }
        }

        self.folders.delete(id).await?;

        info!(
            "Moved {moved_folders} folders and {moved_files} files from {} to the root",
            folder.name
        );

        Ok(folder)
    }

    pub async fn toggle_folder(&self, id: &str) -> Result<FolderRecord, FileDeskError> {
        let result = self.folders.toggle_expanded(id).await;
        log_failure("toggle folder", id, result)
    }

    pub async fn folder_tree(&self) -> Vec<FolderNode> {
        build_tree(&self.folders.list_all().await)
    }

    /// Folders from the root down to `id`, empty for the root itself.
    pub async fn breadcrumb(&self, id: Option<&str>) -> Result<Vec<FolderRecord>, FileDeskError> {
        match id {
            Some(id) => self.folders.ancestors(id).await,
            None => Ok(vec![]),
        }
    }

    /// Files and folders may only be placed into folders that exist.
    async fn require_folder(&self, id: Option<&str>) -> Result<(), FileDeskError> {
        let Some(id) = id else {
            return Ok(());
        };

        match self.folders.get_by_id(id).await {
            Some(_) => Ok(()),
            None => {
                warn!("Target folder {id} does not exist");
                Err(FileDeskError::folder_not_found(id))
            }
        }
    }
}

fn require_name(name: &str, kind: &str) -> Result<String, FileDeskError> {
    let name = name.trim();
    if name.is_empty() {
        warn!("Rejected {kind} without a name");
        return Err(FileDeskError::Validation(format!(
            "Please enter a {kind} name"
        )));
    }
    Ok(name.to_string())
}

/// A record that vanished while being moved needs no further handling.
fn skip_missing<T>(result: Result<T, FileDeskError>) -> Result<Option<T>, FileDeskError> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(FileDeskError::NotFound(_)) => Ok(None),
        Err(e) => Err(e),
    }
}

fn log_failure<T>(
    action: &str,
    id: &str,
    result: Result<T, FileDeskError>,
) -> Result<T, FileDeskError> {
    if let Err(e) = &result {
        warn!("Failed to {action} {id}: {e}");
    }
    result
}
