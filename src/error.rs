use std::{fmt, io, path::PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LockerError {
    #[error(
        "The bower.json is already a bower-locker generated file.\n\
         Please run 'bower-locker unlock' before re-running 'bower-locker lock'"
    )]
    AlreadyLocked,

    #[error("The bower.json is not a bower-locker generated file.")]
    NotLocked,

    #[error("Backup file {} does not exist, the original bower.json cannot be restored.", .0.display())]
    MissingBackup(PathBuf),

    #[error("Dependency directory {} does not exist. Run 'bower install' first.", .0.display())]
    MissingComponents(PathBuf),

    #[error("Dependency metadata {} does not exist.", .0.display())]
    MissingMetadata(PathBuf),

    #[error("Malformed dependency metadata {}: {source}", .path.display())]
    Metadata {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("Malformed manifest {}: {source}", .path.display())]
    Manifest {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("Failed to access {}: {source}", .path.display())]
    Io { path: PathBuf, source: io::Error },

    #[error("{}", describe_mismatches(.0))]
    ValidationMismatch(Vec<Mismatch>),
}

impl LockerError {
    pub(crate) fn io<P: Into<PathBuf>>(path: P) -> impl FnOnce(io::Error) -> Self {
        let path = path.into();
        move |source| LockerError::Io { path, source }
    }
}

fn describe_mismatches(mismatches: &[Mismatch]) -> String {
    let mut message = format!(
        "The bower.json does not match the installed dependencies ({} difference{}):",
        mismatches.len(),
        if mismatches.len() == 1 { "" } else { "s" }
    );
    for mismatch in mismatches {
        message.push_str("\n  ");
        message.push_str(&mismatch.to_string());
    }
    message
}

/// A single difference between the locked manifest and what is installed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Mismatch {
    /// Installed, but not locked in `dependencies`.
    Missing { name: String, expected: String },
    /// Locked in `dependencies`, but not installed.
    Extra { name: String, found: String },
    Version {
        name: String,
        expected: String,
        found: String,
    },
    Resolution {
        name: String,
        expected: Option<String>,
        found: Option<String>,
    },
    Commit {
        name: String,
        expected: Option<String>,
        found: Option<String>,
    },
}

struct OrNone<'a>(&'a Option<String>);

impl fmt::Display for OrNone<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(value) => write!(f, "{}", value),
            None => f.write_str("<none>"),
        }
    }
}

impl fmt::Display for Mismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mismatch::Missing { name, expected } => {
                write!(f, "{}: missing from bower.json (installed {})", name, expected)
            }
            Mismatch::Extra { name, found } => {
                write!(f, "{}: locked as {} but not installed", name, found)
            }
            Mismatch::Version {
                name,
                expected,
                found,
            } => write!(f, "{}: locked as {}, installed {}", name, found, expected),
            Mismatch::Resolution {
                name,
                expected,
                found,
            } => write!(
                f,
                "{}: resolution is {}, expected {}",
                name,
                OrNone(found),
                OrNone(expected)
            ),
            Mismatch::Commit {
                name,
                expected,
                found,
            } => write!(
                f,
                "{}: locked at commit {}, installed commit {}",
                name,
                OrNone(found),
                OrNone(expected)
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_mismatch_lists_every_difference() {
        let err = LockerError::ValidationMismatch(vec![
            Mismatch::Missing {
                name: "jquery".to_string(),
                expected: "git://github.com/jquery/jquery.git#3.1.0".to_string(),
            },
            Mismatch::Commit {
                name: "lodash".to_string(),
                expected: Some("def456".to_string()),
                found: None,
            },
        ]);
        let message = err.to_string();
        assert!(message.contains("(2 differences)"));
        assert!(message.contains(
            "\n  jquery: missing from bower.json (installed git://github.com/jquery/jquery.git#3.1.0)"
        ));
        assert!(message.contains("\n  lodash: locked at commit <none>, installed commit def456"));
    }
}
