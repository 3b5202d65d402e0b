use std::{collections::HashSet, fs, path::Path};

use tracing::{info, warn};

use crate::{error::FileDeskError, file::models::FileRecord, folder::models::FolderRecord};

const BUNDLED_FILES: &str = include_str!("../seed/files.json");
const BUNDLED_FOLDERS: &str = include_str!("../seed/folders.json");

/// Initial contents of both stores. Nothing is ever written back.
#[derive(Debug, Clone, Default)]
pub struct Seed {
    pub files: Vec<FileRecord>,
    pub folders: Vec<FolderRecord>,
}

impl Seed {
    pub fn bundled() -> Result<Self, FileDeskError> {
        Self::parse(BUNDLED_FILES, BUNDLED_FOLDERS)
    }

    /// Read `files.json` and `folders.json` from `dir`.
    pub fn read(dir: impl AsRef<Path>) -> Result<Self, FileDeskError> {
        let dir = dir.as_ref();
        let files = fs::read_to_string(dir.join("files.json"))?;
        let folders = fs::read_to_string(dir.join("folders.json"))?;
        Self::parse(&files, &folders)
    }

    pub fn load(dir: Option<&str>) -> Result<Self, FileDeskError> {
        let seed = match dir {
            Some(dir) => {
                info!("Loading seed from {dir}");
                Self::read(dir)?
            }
            None => {
                info!("Loading bundled seed");
                Self::bundled()?
            }
        };

        seed.check();

        info!(
            "Seeded {} files and {} folders",
            seed.files.len(),
            seed.folders.len()
        );

        Ok(seed)
    }

    fn parse(files: &str, folders: &str) -> Result<Self, FileDeskError> {
        let mut seed = Self {
            files: serde_json::from_str(files)?,
            folders: serde_json::from_str(folders)?,
        };
        seed.normalize();
        Ok(seed)
    }

    /// An empty `parentId` places a record at the root.
    fn normalize(&mut self) {
        let parents = self
            .folders
            .iter_mut()
            .map(|f| &mut f.parent_id)
            .chain(self.files.iter_mut().map(|f| &mut f.parent_id));

        for parent in parents {
            if parent.as_deref().is_some_and(|p| p.trim().is_empty()) {
                *parent = None;
            }
        }
    }

    /// Report records that break the store invariants. The records are kept as they are.
    fn check(&self) {
        let mut folder_ids = HashSet::new();
        for folder in self.folders.iter() {
            if !folder_ids.insert(folder.id.as_str()) {
                warn!("Duplicate folder id in seed: {}", folder.id);
            }
        }

        let mut file_ids = HashSet::new();
        for file in self.files.iter() {
            if !file_ids.insert(file.id.as_str()) {
                warn!("Duplicate file id in seed: {}", file.id);
            }
            if file.is_folder {
                warn!("File {} is marked as a folder", file.id);
            }
        }

        let parents = self
            .folders
            .iter()
            .filter_map(|f| f.parent_id.as_deref())
            .chain(self.files.iter().filter_map(|f| f.parent_id.as_deref()));

        for parent in parents {
            if !folder_ids.contains(parent) {
                warn!("Seed references missing folder {parent}");
            }
        }
    }
}
