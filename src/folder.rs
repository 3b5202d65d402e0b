use std::collections::HashSet;

use tokio::sync::RwLock;
use tracing::debug;

use self::models::{FolderNode, FolderPatch, FolderRecord, NewFolder};
use crate::{
    clock::{Latency, OpKind},
    error::FileDeskError,
};

pub mod models;

/// In-memory collection of folder records.
///
/// Deleting a folder removes only that record. Child folders and files keep
/// pointing at the removed id, deciding what to do with them is up to the caller.
#[derive(Debug)]
pub struct FolderStore {
    folders: RwLock<Vec<FolderRecord>>,
    latency: Latency,
}

impl FolderStore {
    pub fn new(seed: Vec<FolderRecord>, latency: Latency) -> Self {
        Self {
            folders: RwLock::new(seed),
            latency,
        }
    }

    pub async fn list_all(&self) -> Vec<FolderRecord> {
        self.latency.pause(OpKind::ListAll).await;
        self.folders.read().await.clone()
    }

    pub async fn get_by_id(&self, id: &str) -> Option<FolderRecord> {
        self.latency.pause(OpKind::Get).await;
        self.folders.read().await.iter().find(|f| f.id == id).cloned()
    }

    pub async fn get_root_folders(&self) -> Vec<FolderRecord> {
        self.latency.pause(OpKind::Roots).await;
        self.folders
            .read()
            .await
            .iter()
            .filter(|f| f.parent_id.is_none())
            .cloned()
            .collect()
    }

    pub async fn get_children(&self, parent_id: &str) -> Vec<FolderRecord> {
        self.latency.pause(OpKind::Children).await;
        self.folders
            .read()
            .await
            .iter()
            .filter(|f| f.parent_id.as_deref() == Some(parent_id))
            .cloned()
            .collect()
    }

    pub async fn create(&self, data: NewFolder) -> FolderRecord {
        self.latency.pause(OpKind::Mutate).await;

        let NewFolder {
            name,
            path,
            parent_id,
        } = data;

        let folder = FolderRecord {
            id: uuid::Uuid::new_v4().to_string(),
            path: path.unwrap_or_else(|| format!("/{name}")),
            name,
            parent_id,
            expanded: false,
        };

        debug!("Creating folder {} ({})", folder.name, folder.id);

        self.folders.write().await.push(folder.clone());
        folder
    }

    pub async fn update(
        &self,
        id: &str,
        patch: FolderPatch,
    ) -> Result<FolderRecord, FileDeskError> {
        self.latency.pause(OpKind::Mutate).await;

        let mut folders = self.folders.write().await;
        let folder = folders
            .iter_mut()
            .find(|f| f.id == id)
            .ok_or_else(|| FileDeskError::folder_not_found(id))?;

        patch.apply(folder);

        Ok(folder.clone())
    }

    pub async fn delete(&self, id: &str) -> Result<FolderRecord, FileDeskError> {
        self.latency.pause(OpKind::Mutate).await;

        let mut folders = self.folders.write().await;
        let idx = folders
            .iter()
            .position(|f| f.id == id)
            .ok_or_else(|| FileDeskError::folder_not_found(id))?;

        Ok(folders.remove(idx))
    }

    pub async fn toggle_expanded(&self, id: &str) -> Result<FolderRecord, FileDeskError> {
        self.latency.pause(OpKind::Toggle).await;

        let mut folders = self.folders.write().await;
        let folder = folders
            .iter_mut()
            .find(|f| f.id == id)
            .ok_or_else(|| FileDeskError::folder_not_found(id))?;

        folder.expanded = !folder.expanded;

        Ok(folder.clone())
    }

    /// The chain of folders from the root down to and including `id`.
    ///
    /// The walk stops early at a parent that no longer exists or at an id it has
    /// already visited, so orphans and cycles still produce a finite path.
    pub async fn ancestors(&self, id: &str) -> Result<Vec<FolderRecord>, FileDeskError> {
        self.latency.pause(OpKind::Get).await;

        let folders = self.folders.read().await;

        let find = |id: &str| folders.iter().find(|f| f.id == id);

        let mut current = find(id).ok_or_else(|| FileDeskError::folder_not_found(id))?;
        let mut visited = HashSet::new();
        let mut chain = vec![];

        loop {
            visited.insert(current.id.as_str());
            chain.push(current.clone());

            let Some(parent_id) = current.parent_id.as_deref() else {
                break;
            };

            if visited.contains(parent_id) {
                break;
            }

            let Some(parent) = find(parent_id) else {
                break;
            };

            current = parent;
        }

        chain.reverse();
        Ok(chain)
    }
}

/// Build the sidebar tree: root folders sorted by name, children attached only
/// below expanded folders.
pub fn build_tree(folders: &[FolderRecord]) -> Vec<FolderNode> {
    let mut visited = HashSet::new();
    build_level(folders, None, &mut visited)
}

fn build_level<'a>(
    folders: &'a [FolderRecord],
    parent: Option<&str>,
    visited: &mut HashSet<&'a str>,
) -> Vec<FolderNode> {
    let mut level = folders
        .iter()
        .filter(|f| f.parent_id.as_deref() == parent)
        .collect::<Vec<_>>();

    level.sort_by(|a, b| {
        a.name
            .to_lowercase()
            .cmp(&b.name.to_lowercase())
            .then_with(|| a.name.cmp(&b.name))
    });

    let mut nodes = vec![];

    for folder in level {
        // Duplicate ids in a seed would otherwise recurse forever
        if !visited.insert(folder.id.as_str()) {
            continue;
        }

        let has_children = folders
            .iter()
            .any(|f| f.parent_id.as_deref() == Some(folder.id.as_str()));

        let children = if folder.expanded && has_children {
            build_level(folders, Some(folder.id.as_str()), visited)
        } else {
            vec![]
        };

        nodes.push(FolderNode {
            folder: folder.clone(),
            has_children,
            children,
        });
    }

    nodes
}
