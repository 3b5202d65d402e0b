//! Derived, display ready views of the file collection.

use std::{cmp::Ordering, fmt::Display, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::{
    error::FileDeskError,
    file::models::{search_needle, FileRecord},
};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortField {
    #[default]
    Name,
    Size,
    Modified,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl FromStr for SortField {
    type Err = FileDeskError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "name" => Ok(Self::Name),
            "size" => Ok(Self::Size),
            "modified" => Ok(Self::Modified),
            _ => Err(FileDeskError::Validation(format!("unknown sort field: {s}"))),
        }
    }
}

impl FromStr for SortDirection {
    type Err = FileDeskError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "asc" => Ok(Self::Asc),
            "desc" => Ok(Self::Desc),
            _ => Err(FileDeskError::Validation(format!(
                "unknown sort direction: {s}"
            ))),
        }
    }
}

impl Display for SortField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Name => write!(f, "name"),
            Self::Size => write!(f, "size"),
            Self::Modified => write!(f, "modified"),
        }
    }
}

impl Display for SortDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Asc => write!(f, "asc"),
            Self::Desc => write!(f, "desc"),
        }
    }
}

/// Sort settings as the list header selector encodes them, i.e. `size-desc`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SortSpec {
    pub field: SortField,
    pub direction: SortDirection,
}

impl FromStr for SortSpec {
    type Err = FileDeskError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (field, direction) = match s.split_once('-') {
            Some((field, direction)) => (field.parse()?, direction.parse()?),
            None => (s.parse()?, SortDirection::default()),
        };
        Ok(Self { field, direction })
    }
}

impl Display for SortSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{}", self.field, self.direction)
    }
}

fn compare(a: &FileRecord, b: &FileRecord, field: SortField) -> Ordering {
    match field {
        SortField::Name => a.name.to_lowercase().cmp(&b.name.to_lowercase()),
        SortField::Size => a.size.cmp(&b.size),
        SortField::Modified => a.modified.cmp(&b.modified),
    }
}

/// Filter `files` by `query` and order the rest by `sort`.
///
/// The sort is stable. Records with equal keys keep their order from `files`
/// in both directions, descending swaps the comparator operands rather than
/// reversing the ascending result.
pub fn derive_view(files: &[FileRecord], sort: SortSpec, query: &str) -> Vec<FileRecord> {
    let needle = search_needle(query);

    let mut view = files
        .iter()
        .filter(|f| needle.is_empty() || f.matches(&needle))
        .cloned()
        .collect::<Vec<_>>();

    match sort.direction {
        SortDirection::Asc => view.sort_by(|a, b| compare(a, b, sort.field)),
        SortDirection::Desc => view.sort_by(|a, b| compare(b, a, sort.field)),
    }

    view
}

/// Human readable size in base 1024 units, at most two decimals.
pub fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["Bytes", "KB", "MB", "GB"];

    if bytes == 0 {
        return "0 Bytes".to_string();
    }

    let mut value = bytes as f64;
    let mut unit = 0;

    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }

    let rounded = format!("{value:.2}");
    let trimmed = rounded.trim_end_matches('0').trim_end_matches('.');

    format!("{trimmed} {}", UNITS[unit])
}
