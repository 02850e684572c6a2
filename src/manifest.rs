use crate::error::LockerError;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::{collections::BTreeMap, path::Path};

/// A parsed `bower.json`.
///
/// Only the sections this tool rewrites are typed; every other field is kept
/// in `i_dont_care` and written back in its original order.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct Manifest {
    #[serde(flatten)]
    i_dont_care: Map<String, Value>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub dependencies: BTreeMap<String, String>,
    #[serde(
        rename = "devDependencies",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub dev_dependencies: Option<Value>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub resolutions: BTreeMap<String, String>,
    #[serde(
        rename = "bowerLocker",
        default,
        deserialize_with = "truthy_marker",
        skip_serializing_if = "Option::is_none"
    )]
    pub bower_locker: Option<LockMarker>,
}

/// Presence of this section in a manifest means it is locked.
#[derive(Clone, Debug, Default, Serialize, PartialEq)]
pub struct LockMarker {
    #[serde(rename = "lastUpdated", default)]
    pub last_updated: String,
    /// Commit of every locked dependency at lock time.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub commits: BTreeMap<String, String>,
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<BTreeMap<String, String>, D::Error>
where
    D: Deserializer<'de>,
{
    let section = Option::<BTreeMap<String, String>>::deserialize(deserializer)?;
    Ok(section.unwrap_or_default())
}

/// Any truthy `bowerLocker` value marks the manifest as locked; fields that
/// are not in the expected shape are ignored.
fn truthy_marker<'de, D>(deserializer: D) -> Result<Option<LockMarker>, D::Error>
where
    D: Deserializer<'de>,
{
    let marker = match Value::deserialize(deserializer)? {
        Value::Null | Value::Bool(false) => None,
        Value::String(s) if s.is_empty() => None,
        Value::Number(n) if n.as_f64() == Some(0.0) => None,
        Value::Object(fields) => Some(LockMarker {
            last_updated: fields
                .get("lastUpdated")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            commits: fields
                .get("commits")
                .cloned()
                .and_then(|commits| serde_json::from_value(commits).ok())
                .unwrap_or_default(),
        }),
        _ => Some(LockMarker::default()),
    };
    Ok(marker)
}

impl LockMarker {
    pub fn stamped(now: DateTime<Utc>) -> Self {
        Self {
            last_updated: now.to_rfc3339_opts(SecondsFormat::Millis, true),
            commits: BTreeMap::new(),
        }
    }
}

impl Manifest {
    pub fn parse(bytes: &[u8], path: &Path) -> Result<Self, LockerError> {
        serde_json::from_slice(bytes).map_err(|source| LockerError::Manifest {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn to_pretty_json(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec_pretty(self)
    }

    pub fn is_locked(&self) -> bool {
        self.bower_locker.is_some()
    }

    #[cfg(test)]
    pub(crate) fn extra(&self, key: &str) -> Option<&Value> {
        self.i_dont_care.get(key)
    }
}
