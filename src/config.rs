use crate::{error::LockerError, fs::FileSystem};
use serde::Deserialize;
use std::path::{Path, PathBuf};

pub const MANIFEST_FILE: &str = "bower.json";
pub const BACKUP_FILE: &str = "bower-locker.bower.json";
pub const COMPONENTS_DIR: &str = "bower_components";
pub const METADATA_FILE: &str = ".bower.json";
const BOWERRC_FILE: &str = ".bowerrc";

/// Where the manifest, its backup and the installed dependencies live.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LockerConfig {
    pub manifest_path: PathBuf,
    pub backup_path: PathBuf,
    pub components_dir: PathBuf,
}

#[derive(Deserialize)]
struct Bowerrc {
    directory: Option<String>,
}

impl LockerConfig {
    pub fn for_project<P: AsRef<Path>>(root: P) -> Self {
        let root = root.as_ref();
        Self {
            manifest_path: root.join(MANIFEST_FILE),
            backup_path: root.join(BACKUP_FILE),
            components_dir: root.join(COMPONENTS_DIR),
        }
    }

    /// Like [`LockerConfig::for_project`], but honours the `directory` key of
    /// a `.bowerrc` in the project root.
    pub fn discover<F: FileSystem, P: AsRef<Path>>(
        fs: &F,
        root: P,
    ) -> Result<Self, LockerError> {
        let root = root.as_ref();
        let mut config = Self::for_project(root);

        let bowerrc_path = root.join(BOWERRC_FILE);
        if !fs.is_file(&bowerrc_path) {
            return Ok(config);
        }

        let file = fs
            .read(&bowerrc_path)
            .map_err(LockerError::io(&bowerrc_path))?;
        let bowerrc = serde_json::from_slice::<Bowerrc>(&file).map_err(|source| {
            LockerError::Manifest {
                path: bowerrc_path,
                source,
            }
        })?;
        if let Some(directory) = bowerrc.directory.filter(|dir| !dir.is_empty()) {
            config.components_dir = root.join(directory);
        }

        Ok(config)
    }
}
