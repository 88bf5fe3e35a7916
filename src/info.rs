//! Single-field module lookups for shell scripts.
use crate::manifest::Module;
use clap::ValueEnum;

pub const NOT_AVAILABLE: &str = "N/A";

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum InfoField {
    Hash,
    Version,
    Repo,
    /// Hash, falling back to version.
    All,
}

/// Requested field of `module`, or `N/A` when the module or field is absent.
pub fn module_field(module: Option<&Module>, field: InfoField) -> String {
    let Some(module) = module else {
        return NOT_AVAILABLE.to_string();
    };
    let value = match field {
        InfoField::Hash => module.hash(),
        InfoField::Version => module.version(),
        InfoField::Repo => module
            .repo()
            .map(|repo| repo.strip_suffix(".git").unwrap_or(repo)),
        InfoField::All => module.resolved_ref().ok().map(|reference| reference.as_str()),
    };
    value.unwrap_or(NOT_AVAILABLE).to_string()
}
