//! Domain failures for manifest loading, overrides, and export.
//!
//! Commands propagate these through `anyhow`; callers that need to branch on
//! a specific failure recover it with [`manifest_error`].
use std::fmt;
use std::path::PathBuf;

/// Supported override spec forms, repeated in every format error.
pub const OVERRIDE_FORMS: &str = "module_name@commit_hash | module_name@repo_url@commit_hash";

#[derive(Debug)]
pub enum ManifestError {
    /// The document is not an object with a `modules` object, or an entry
    /// inside it has the wrong shape.
    MalformedManifest { path: PathBuf, detail: String },
    InvalidOverrideFormat { spec: String },
    InvalidCommitHash { spec: String, hash: String },
    InvalidRepoUrl { spec: String, repo: String },
    ModuleNotFound { name: String, available: Vec<String> },
    MissingRepoOrCommit { module: String },
    MissingRepo { module: String },
    NoExportableModules { kind: &'static str },
    NetworkFetchFailure { module: String, detail: String },
}

impl fmt::Display for ManifestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ManifestError::MalformedManifest { path, detail } => write!(
                f,
                "invalid known_good.json at {} (expected object with 'modules' dict): {detail}",
                path.display()
            ),
            ManifestError::InvalidOverrideFormat { spec } => write!(
                f,
                "invalid override format: {spec}; supported formats: {OVERRIDE_FORMS}"
            ),
            ManifestError::InvalidCommitHash { spec, hash } => write!(
                f,
                "invalid commit hash in '{spec}': {hash}; expected 7-40 hex characters"
            ),
            ManifestError::InvalidRepoUrl { spec, repo } => write!(
                f,
                "invalid repo URL in '{spec}': {repo}; expected format: https://github.com/org/repo.git"
            ),
            ManifestError::ModuleNotFound { name, available } => write!(
                f,
                "module '{name}' not found in known_good.json; available modules: {}",
                available.join(", ")
            ),
            ManifestError::MissingRepoOrCommit { module } => {
                write!(f, "module {module} has neither a commit hash nor a version")
            }
            ManifestError::MissingRepo { module } => {
                write!(f, "module {module} has no repo; repo must not be empty")
            }
            ManifestError::NoExportableModules { kind } => {
                write!(f, "no valid modules to generate {kind} entries")
            }
            ManifestError::NetworkFetchFailure { module, detail } => {
                write!(f, "fetching latest commit for {module} failed: {detail}")
            }
        }
    }
}

impl std::error::Error for ManifestError {}

/// Find the first [`ManifestError`] in an error chain.
pub fn manifest_error(err: &anyhow::Error) -> Option<&ManifestError> {
    err.chain()
        .find_map(|cause| cause.downcast_ref::<ManifestError>())
}
