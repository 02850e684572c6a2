use crate::{
    config::LockerConfig,
    error::{LockerError, Mismatch},
    fs::FileSystem,
    lock::{pin_dependencies, read_manifest},
    manifest::Manifest,
    scan::{get_all_dependencies, Dependency},
};
use log::warn;
use std::collections::{BTreeMap, BTreeSet};

/// Checks that the locked manifest still pins exactly what is installed.
///
/// The expected pins are derived the same way `lock` derives them, starting
/// from the backed up manifest. Every difference is collected into
/// [`LockerError::ValidationMismatch`]. Returns the scanned dependencies.
pub fn validate<F: FileSystem>(
    fs: &F,
    config: &LockerConfig,
) -> Result<Vec<Dependency>, LockerError> {
    let (_, locked) = read_manifest(fs, config)?;
    let recorded_commits = match &locked.bower_locker {
        Some(marker) => marker.commits.clone(),
        None => return Err(LockerError::NotLocked),
    };

    let has_backup = fs.is_file(&config.backup_path);
    let mut expected = if has_backup {
        let file = fs
            .read(&config.backup_path)
            .map_err(LockerError::io(&config.backup_path))?;
        Manifest::parse(&file, &config.backup_path)?
    } else {
        warn!(
            "Backup {} not found, validating against the resolutions in {}.",
            config.backup_path.display(),
            config.manifest_path.display()
        );
        locked.clone()
    };

    let dependencies = get_all_dependencies(fs, &config.components_dir)?;
    pin_dependencies(&mut expected, &dependencies);
    if !has_backup {
        // without the original pins there is no telling whether lock dropped
        // a resolution for a dependency with no detected version
        for dep in dependencies.iter().filter(|dep| dep.version().is_none()) {
            if !locked.resolutions.contains_key(&dep.dir_name) {
                expected.resolutions.remove(&dep.dir_name);
            }
        }
    }

    let mut mismatches = compare_dependencies(&expected.dependencies, &locked.dependencies);
    mismatches.extend(compare_resolutions(
        &expected.resolutions,
        &locked.resolutions,
    ));
    // locks written before commits were recorded have nothing to compare
    if !recorded_commits.is_empty() {
        let installed = expected
            .bower_locker
            .map(|marker| marker.commits)
            .unwrap_or_default();
        mismatches.extend(compare_commits(&installed, &recorded_commits));
    }

    if mismatches.is_empty() {
        Ok(dependencies)
    } else {
        Err(LockerError::ValidationMismatch(mismatches))
    }
}

fn compare_dependencies(
    expected: &BTreeMap<String, String>,
    found: &BTreeMap<String, String>,
) -> Vec<Mismatch> {
    let names = expected.keys().chain(found.keys()).collect::<BTreeSet<_>>();
    names
        .into_iter()
        .filter_map(|name| match (expected.get(name), found.get(name)) {
            (Some(expected), None) => Some(Mismatch::Missing {
                name: name.clone(),
                expected: expected.clone(),
            }),
            (None, Some(found)) => Some(Mismatch::Extra {
                name: name.clone(),
                found: found.clone(),
            }),
            (Some(expected), Some(found)) if expected != found => Some(Mismatch::Version {
                name: name.clone(),
                expected: expected.clone(),
                found: found.clone(),
            }),
            _ => None,
        })
        .collect()
}

fn compare_resolutions(
    expected: &BTreeMap<String, String>,
    found: &BTreeMap<String, String>,
) -> Vec<Mismatch> {
    let names = expected.keys().chain(found.keys()).collect::<BTreeSet<_>>();
    names
        .into_iter()
        .filter(|name| expected.get(*name) != found.get(*name))
        .map(|name| Mismatch::Resolution {
            name: name.clone(),
            expected: expected.get(name).cloned(),
            found: found.get(name).cloned(),
        })
        .collect()
}

fn compare_commits(
    installed: &BTreeMap<String, String>,
    recorded: &BTreeMap<String, String>,
) -> Vec<Mismatch> {
    let names = installed.keys().chain(recorded.keys()).collect::<BTreeSet<_>>();
    names
        .into_iter()
        .filter(|name| installed.get(*name) != recorded.get(*name))
        .map(|name| Mismatch::Commit {
            name: name.clone(),
            expected: installed.get(name).cloned(),
            found: recorded.get(name).cloned(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        fs::MemoryFs,
        lock::{lock, tests::project},
        scan::tests::{branch, tag},
    };

    fn mismatches<F: FileSystem>(fs: &F, config: &LockerConfig) -> Vec<Mismatch> {
        match validate(fs, config) {
            Err(LockerError::ValidationMismatch(mismatches)) => mismatches,
            other => panic!("expected a mismatch, got {:?}", other.map(|deps| deps.len())),
        }
    }

    #[test]
    fn test_validate_right_after_lock() {
        let (fs, config) = project();
        lock(&fs, &config).unwrap();
        assert_eq!(validate(&fs, &config).unwrap().len(), 3);
    }

    #[test]
    fn test_validate_after_lock_with_dropped_resolution() {
        let fs = MemoryFs::new();
        fs.insert("/p/bower.json", r#"{"resolutions": {"a": "1.0.0"}}"#);
        fs.insert(
            "/p/bower_components/a/.bower.json",
            r#"{"_source": "git://a.git", "_resolution": {"type": "commit", "commit": "aaa111"}}"#,
        );
        let config = LockerConfig::for_project("/p");
        lock(&fs, &config).unwrap();
        validate(&fs, &config).unwrap();
    }

    #[test]
    fn test_validate_requires_lock() {
        let (fs, config) = project();
        assert!(matches!(
            validate(&fs, &config),
            Err(LockerError::NotLocked)
        ));
    }

    #[test]
    fn test_validate_detects_new_commit_on_branch() {
        let (fs, config) = project();
        lock(&fs, &config).unwrap();
        fs.insert(
            "/p/bower_components/a/.bower.json",
            branch("git://a.git", "develop", "def456"),
        );

        assert_eq!(
            mismatches(&fs, &config),
            vec![Mismatch::Commit {
                name: "a".to_string(),
                expected: Some("def456".to_string()),
                found: Some("aaa111".to_string()),
            }]
        );
    }

    #[test]
    fn test_validate_reports_every_difference() {
        let (fs, config) = project();
        lock(&fs, &config).unwrap();

        fs.remove_file(std::path::Path::new("/p/bower_components/b/.bower.json"))
            .unwrap();
        fs.insert(
            "/p/bower_components/jquery/.bower.json",
            tag("git://github.com/jquery/jquery.git", "3.2.0", "abc999"),
        );
        fs.insert(
            "/p/bower_components/lodash/.bower.json",
            tag("git://lodash.git", "4.0.0", "fff000"),
        );

        let found = mismatches(&fs, &config);
        assert!(found.contains(&Mismatch::Extra {
            name: "b".to_string(),
            found: "git://b.git#2.0.0".to_string(),
        }));
        assert!(found.contains(&Mismatch::Version {
            name: "jquery".to_string(),
            expected: "git://github.com/jquery/jquery.git#3.2.0".to_string(),
            found: "git://github.com/jquery/jquery.git#3.1.0".to_string(),
        }));
        assert!(found.contains(&Mismatch::Resolution {
            name: "jquery".to_string(),
            expected: Some("3.2.0".to_string()),
            found: Some("3.1.0".to_string()),
        }));
        assert!(found.contains(&Mismatch::Missing {
            name: "lodash".to_string(),
            expected: "git://lodash.git#4.0.0".to_string(),
        }));
        assert!(found.contains(&Mismatch::Commit {
            name: "lodash".to_string(),
            expected: Some("fff000".to_string()),
            found: None,
        }));
        // b keeps its "*" resolution from the original manifest either way
        assert!(!found
            .iter()
            .any(|m| matches!(m, Mismatch::Resolution { name, .. } if name == "b")));
    }

    #[test]
    fn test_validate_without_backup_uses_locked_resolutions() {
        let (fs, config) = project();
        lock(&fs, &config).unwrap();
        fs.remove_file(&config.backup_path).unwrap();
        validate(&fs, &config).unwrap();
    }

    #[test]
    fn test_validate_without_backup_after_dropped_resolution() {
        let fs = MemoryFs::new();
        fs.insert("/p/bower.json", r#"{"resolutions": {"a": "1.0.0"}}"#);
        fs.insert(
            "/p/bower_components/a/.bower.json",
            r#"{"_source": "git://a.git", "_resolution": {"type": "commit", "commit": "aaa111"}}"#,
        );
        let config = LockerConfig::for_project("/p");
        lock(&fs, &config).unwrap();
        fs.remove_file(&config.backup_path).unwrap();
        validate(&fs, &config).unwrap();

        // a newly installed unversioned dependency is still reported
        fs.insert(
            "/p/bower_components/c/.bower.json",
            r#"{"_source": "git://c.git", "_resolution": {"type": "commit", "commit": "ccc333"}}"#,
        );
        assert!(mismatches(&fs, &config).contains(&Mismatch::Missing {
            name: "c".to_string(),
            expected: "git://c.git".to_string(),
        }));
    }

    #[test]
    fn test_validate_legacy_marker_skips_commits() {
        let fs = MemoryFs::new();
        fs.insert(
            "/p/bower.json",
            r#"{
              "dependencies": {"a": "git://a.git#develop"},
              "resolutions": {"a": "develop"},
              "bowerLocker": {"lastUpdated": "2016-08-01T00:00:00.000Z"}
            }"#,
        );
        fs.insert(
            "/p/bower-locker.bower.json",
            r#"{"dependencies": {"a": "develop"}}"#,
        );
        fs.insert(
            "/p/bower_components/a/.bower.json",
            branch("git://a.git", "develop", "def456"),
        );
        validate(&fs, &LockerConfig::for_project("/p")).unwrap();
    }
}
