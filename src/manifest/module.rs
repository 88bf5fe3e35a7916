//! A single pinned dependency entry.
use crate::error::ManifestError;
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::sync::OnceLock;

/// Branch assumed when a module does not name one.
pub const DEFAULT_BRANCH: &str = "main";

/// Key a module's commit was stored under.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum HashKey {
    #[default]
    Hash,
    /// Legacy spelling; written back unchanged.
    Commit,
}

impl HashKey {
    fn as_str(self) -> &'static str {
        match self {
            HashKey::Hash => "hash",
            HashKey::Commit => "commit",
        }
    }
}

/// One module record. `name` is the key it was stored under and is not part
/// of the serialized body.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Module {
    #[serde(skip)]
    pub name: String,
    #[serde(skip)]
    pub hash_key: HashKey,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repo: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hash: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,
    #[serde(
        default,
        deserialize_with = "null_as_empty",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub patches: Vec<String>,
    /// Fields this crate does not interpret, kept for exact round-trips.
    #[serde(flatten)]
    pub metadata: Map<String, Value>,
}

/// The reference a module resolves to: a commit wins over a version.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolvedRef<'a> {
    Commit(&'a str),
    Version(&'a str),
}

impl<'a> ResolvedRef<'a> {
    pub fn as_str(&self) -> &'a str {
        match *self {
            ResolvedRef::Commit(value) | ResolvedRef::Version(value) => value,
        }
    }
}

impl Module {
    /// Parse a raw JSON module body stored under `name`.
    ///
    /// A string `commit` is read as the hash when `hash` is absent; when both
    /// are present `hash` wins and `commit` stays in `metadata`.
    pub fn from_value(name: &str, value: Value) -> serde_json::Result<Self> {
        let mut hash_key = HashKey::Hash;
        let value = match value {
            Value::Object(body)
                if !body.contains_key("hash")
                    && matches!(body.get("commit"), Some(Value::String(_))) =>
            {
                hash_key = HashKey::Commit;
                Value::Object(rename_key(body, "commit", "hash"))
            }
            other => other,
        };
        let mut module: Module = serde_json::from_value(value)?;
        module.name = name.to_string();
        module.hash_key = hash_key;
        Ok(module)
    }

    /// Serialized body, with the hash under the key it was loaded from.
    pub fn to_value(&self) -> serde_json::Result<Value> {
        let value = serde_json::to_value(self)?;
        match (self.hash_key, value) {
            (HashKey::Commit, Value::Object(body)) => {
                Ok(Value::Object(rename_key(body, "hash", HashKey::Commit.as_str())))
            }
            (_, value) => Ok(value),
        }
    }

    pub fn repo(&self) -> Option<&str> {
        non_empty(self.repo.as_deref())
    }

    pub fn hash(&self) -> Option<&str> {
        non_empty(self.hash.as_deref())
    }

    pub fn version(&self) -> Option<&str> {
        non_empty(self.version.as_deref())
    }

    /// Effective branch, falling back to [`DEFAULT_BRANCH`].
    pub fn branch(&self) -> &str {
        non_empty(self.branch.as_deref()).unwrap_or(DEFAULT_BRANCH)
    }

    /// Hash if present, else version; every exporter and the override
    /// engine resolve references through here.
    pub fn resolved_ref(&self) -> Result<ResolvedRef<'_>, ManifestError> {
        if let Some(hash) = self.hash() {
            return Ok(ResolvedRef::Commit(hash));
        }
        if let Some(version) = self.version() {
            return Ok(ResolvedRef::Version(version));
        }
        Err(ManifestError::MissingRepoOrCommit {
            module: self.name.clone(),
        })
    }

    /// Pin the module to `hash`, optionally moving it to `repo`.
    ///
    /// A pinned hash always clears `version`. Returns whether the record
    /// changed.
    pub fn pin_commit(&mut self, hash: &str, repo: Option<&str>) -> bool {
        let before = (self.repo.clone(), self.hash.clone(), self.version.clone());
        self.hash = Some(hash.to_string());
        self.version = None;
        if let Some(repo) = repo {
            self.repo = Some(repo.to_string());
        }
        before != (self.repo.clone(), self.hash.clone(), self.version.clone())
    }
}

/// Rename `from` to `to` without moving it or any other key.
fn rename_key(body: Map<String, Value>, from: &str, to: &str) -> Map<String, Value> {
    body.into_iter()
        .map(|(key, field)| {
            if key == from {
                (to.to_string(), field)
            } else {
                (key, field)
            }
        })
        .collect()
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<String>>::deserialize(deserializer)?.unwrap_or_default())
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|value| !value.is_empty())
}

/// Whether `value` looks like an abbreviated or full commit SHA.
pub fn is_commit_hash(value: &str) -> bool {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"^[a-fA-F0-9]{7,40}$").expect("regex for commit hashes"))
        .is_match(value)
}

/// Whether `value` is an HTTPS git remote ending in `.git`.
pub fn is_repo_url(value: &str) -> bool {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN
        .get_or_init(|| {
            Regex::new(r"^https://[a-zA-Z0-9.-]+/[a-zA-Z0-9._/-]+\.git$")
                .expect("regex for repo URLs")
        })
        .is_match(value)
}
