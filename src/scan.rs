use crate::{
    config::{COMPONENTS_DIR, METADATA_FILE},
    error::LockerError,
    fs::FileSystem,
};
use log::{debug, info};
use serde::Deserialize;
use std::{
    collections::{HashSet, VecDeque},
    path::Path,
};

#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ResolutionType {
    #[serde(alias = "version")]
    Tag,
    Branch,
    Commit,
}

/// One installed dependency as it is currently checked out.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Dependency {
    /// Directory name on disk; this is how the parent manifest refers to it.
    pub dir_name: String,
    /// Name the dependency reports for itself, possibly different from `dir_name`.
    pub name: Option<String>,
    pub source: String,
    pub kind: ResolutionType,
    pub branch: Option<String>,
    pub release: Option<String>,
    pub commit: Option<String>,
}

impl Dependency {
    /// Branch name when on a branch, otherwise the checked out release.
    pub fn version(&self) -> Option<&str> {
        match self.kind {
            ResolutionType::Branch => self.branch.as_deref(),
            _ => self.release.as_deref(),
        }
    }

    /// `source#version`, or bare `source` when nothing is checked out by name.
    pub fn endpoint(&self) -> String {
        match self.version() {
            Some(version) => format!("{}#{}", self.source, version),
            None => self.source.clone(),
        }
    }
}

#[derive(Deserialize)]
struct InstalledMetadata {
    name: Option<String>,
    #[serde(rename = "_source")]
    source: String,
    #[serde(rename = "_release")]
    release: Option<String>,
    #[serde(rename = "_resolution")]
    resolution: Option<Resolution>,
}

#[derive(Deserialize)]
struct Resolution {
    #[serde(rename = "type")]
    kind: ResolutionType,
    tag: Option<String>,
    branch: Option<String>,
    commit: Option<String>,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|value| !value.is_empty())
}

fn read_dependency<F: FileSystem>(fs: &F, dir: &Path) -> Result<Dependency, LockerError> {
    let dir_name = dir
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();

    let path = dir.join(METADATA_FILE);
    if !fs.is_file(&path) {
        return Err(LockerError::MissingMetadata(path));
    }
    let file = fs.read(&path).map_err(LockerError::io(&path))?;
    let metadata = serde_json::from_slice::<InstalledMetadata>(&file)
        .map_err(|source| LockerError::Metadata { path, source })?;

    let (kind, tag, branch, commit) = match metadata.resolution {
        Some(resolution) => (
            resolution.kind,
            non_empty(resolution.tag),
            non_empty(resolution.branch),
            non_empty(resolution.commit),
        ),
        None => (ResolutionType::Tag, None, None, None),
    };

    Ok(Dependency {
        dir_name,
        name: metadata.name,
        source: metadata.source,
        kind,
        branch,
        release: non_empty(metadata.release).or(tag),
        commit,
    })
}

/// Scans `components_dir` and every nested `bower_components` directory
/// bundled inside a dependency, returning one record per distinct directory
/// name. Nested directories keep bower's default name whatever
/// `components_dir` is called.
///
/// Shallower directories are visited first, so when the same name shows up
/// more than once the top-most copy is kept.
pub fn get_all_dependencies<F: FileSystem>(
    fs: &F,
    components_dir: &Path,
) -> Result<Vec<Dependency>, LockerError> {
    if !fs.is_dir(components_dir) {
        return Err(LockerError::MissingComponents(components_dir.to_path_buf()));
    }
    let mut dependencies = vec![];
    let mut seen = HashSet::new();
    let mut pending = VecDeque::new();
    pending.push_back(components_dir.to_path_buf());

    while let Some(dir) = pending.pop_front() {
        let entries = fs.read_dir(&dir).map_err(LockerError::io(&dir))?;
        for entry in entries.into_iter().filter(|entry| fs.is_dir(entry)) {
            let dependency = read_dependency(fs, &entry)?;

            let nested = entry.join(COMPONENTS_DIR);
            if fs.is_dir(&nested) {
                pending.push_back(nested);
            }

            if seen.insert(dependency.dir_name.clone()) {
                dependencies.push(dependency);
            } else {
                debug!(
                    "Skipping {}, dependency {} is already installed at a higher level.",
                    entry.display(),
                    &dependency.dir_name
                );
            }
        }
    }

    info!(
        "Found {} installed dependencies in {}.",
        dependencies.len(),
        components_dir.display()
    );
    Ok(dependencies)
}
