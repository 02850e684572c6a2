use crate::{
    config::LockerConfig,
    error::LockerError,
    fs::FileSystem,
    manifest::{LockMarker, Manifest},
    scan::{get_all_dependencies, Dependency},
};
use chrono::{DateTime, Utc};
use log::warn;
use std::collections::BTreeMap;

/// Rewrites `dependencies` and `resolutions` to pin what is installed, and
/// drops `devDependencies`. Does not touch the lock marker's timestamp.
pub(crate) fn pin_dependencies(manifest: &mut Manifest, dependencies: &[Dependency]) {
    manifest.dependencies = BTreeMap::new();
    manifest.dev_dependencies = None;
    let mut commits = BTreeMap::new();

    for dep in dependencies {
        let name = &dep.dir_name;
        let version = dep.version();
        manifest.dependencies.insert(name.clone(), dep.endpoint());

        match manifest.resolutions.get(name).map(String::as_str) {
            None | Some("") => {
                manifest
                    .resolutions
                    .insert(name.clone(), version.unwrap_or("*").to_string());
            }
            Some("*") => {}
            // an existing pin is replaced even when nothing is detected,
            // which removes it
            Some(_) => match version {
                Some(version) => {
                    manifest
                        .resolutions
                        .insert(name.clone(), version.to_string());
                }
                None => {
                    manifest.resolutions.remove(name);
                }
            },
        }

        if let Some(commit) = &dep.commit {
            commits.insert(name.clone(), commit.clone());
        }
    }

    manifest
        .bower_locker
        .get_or_insert_with(LockMarker::default)
        .commits = commits;
}

pub(crate) fn read_manifest<F: FileSystem>(
    fs: &F,
    config: &LockerConfig,
) -> Result<(Vec<u8>, Manifest), LockerError> {
    let path = &config.manifest_path;
    let file = fs.read(path).map_err(LockerError::io(path))?;
    let manifest = Manifest::parse(&file, path)?;
    Ok((file, manifest))
}

/// Locks the manifest to the dependencies currently installed, keeping the
/// original manifest as a backup. Returns the locked dependencies.
pub fn lock<F: FileSystem>(
    fs: &F,
    config: &LockerConfig,
) -> Result<Vec<Dependency>, LockerError> {
    lock_at(fs, config, Utc::now())
}

pub(crate) fn lock_at<F: FileSystem>(
    fs: &F,
    config: &LockerConfig,
    now: DateTime<Utc>,
) -> Result<Vec<Dependency>, LockerError> {
    let (original, mut manifest) = read_manifest(fs, config)?;
    if manifest.is_locked() {
        return Err(LockerError::AlreadyLocked);
    }

    let dependencies = get_all_dependencies(fs, &config.components_dir)?;

    manifest.bower_locker = Some(LockMarker::stamped(now));
    pin_dependencies(&mut manifest, &dependencies);
    let locked = manifest.to_pretty_json().map_err(|source| LockerError::Manifest {
        path: config.manifest_path.clone(),
        source,
    })?;

    if fs.is_file(&config.backup_path) {
        warn!(
            "Overwriting stale backup {} left over from an earlier lock.",
            config.backup_path.display()
        );
    }
    fs.write(&config.backup_path, &original)
        .map_err(LockerError::io(&config.backup_path))?;
    fs.write(&config.manifest_path, &locked)
        .map_err(LockerError::io(&config.manifest_path))?;

    Ok(dependencies)
}

/// Restores the manifest saved by [`lock`] and deletes the backup.
pub fn unlock<F: FileSystem>(fs: &F, config: &LockerConfig) -> Result<(), LockerError> {
    let (_, manifest) = read_manifest(fs, config)?;
    if !manifest.is_locked() {
        return Err(LockerError::NotLocked);
    }
    if !fs.is_file(&config.backup_path) {
        return Err(LockerError::MissingBackup(config.backup_path.clone()));
    }

    let original = fs
        .read(&config.backup_path)
        .map_err(LockerError::io(&config.backup_path))?;
    fs.write(&config.manifest_path, &original)
        .map_err(LockerError::io(&config.manifest_path))?;
    fs.remove_file(&config.backup_path)
        .map_err(LockerError::io(&config.backup_path))?;

    Ok(())
}
