//! Bazel module stanzas (`bazel_dep` plus an override) from manifest modules.
use crate::error::ManifestError;
use crate::manifest::module::{is_commit_hash, is_repo_url};
use crate::manifest::{Module, ResolvedRef};
use anyhow::{anyhow, Result};
use clap::ValueEnum;

/// Which override stanza to pair with each `bazel_dep`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum OverrideType {
    Git,
    #[value(name = "local_path")]
    LocalPath,
}

impl OverrideType {
    pub fn entry_kind(self) -> &'static str {
        match self {
            OverrideType::Git => "git_override",
            OverrideType::LocalPath => "local_path_override",
        }
    }
}

/// Commit pin keyed by remote URL (`https://host/path.git@<sha>`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoCommitOverride {
    pub repo: String,
    pub commit: String,
}

impl RepoCommitOverride {
    pub fn parse(raw: &str) -> Result<Self> {
        let invalid = || {
            anyhow!(
                "invalid --repo-override format: {raw}; expected format: https://github.com/org/repo.git@<commit_sha>"
            )
        };
        let (repo, commit) = raw.split_once('@').ok_or_else(invalid)?;
        if !is_repo_url(repo) || !is_commit_hash(commit) {
            return Err(invalid());
        }
        Ok(Self {
            repo: repo.to_string(),
            commit: commit.to_string(),
        })
    }
}

pub struct BazelOptions<'a> {
    pub override_type: OverrideType,
    pub repo_overrides: &'a [RepoCommitOverride],
    /// Manifest timestamp recorded in the generated header.
    pub timestamp: Option<&'a str>,
    /// Verbatim banner (usually a license comment) placed first.
    pub license_header: Option<&'a str>,
}

#[derive(Debug)]
pub struct BazelExport {
    pub content: String,
    pub entries: usize,
    pub skipped: Vec<String>,
}

/// Render a complete MODULE.bazel fragment.
///
/// Fails when no module yields a stanza; an empty fragment is never a
/// successful export.
pub fn render_bazel(modules: &[&Module], options: &BazelOptions<'_>) -> Result<BazelExport> {
    let mut blocks = Vec::new();
    let mut skipped = Vec::new();
    for module in modules {
        let block = match options.override_type {
            OverrideType::Git => git_block(module, options.repo_overrides),
            OverrideType::LocalPath => Ok(local_path_block(module)),
        };
        match block {
            Ok(block) => blocks.push(block),
            Err(reason) => {
                tracing::warn!("skipping module {}: {reason}", module.name);
                skipped.push(module.name.clone());
            }
        }
    }
    if blocks.is_empty() {
        return Err(ManifestError::NoExportableModules {
            kind: options.override_type.entry_kind(),
        }
        .into());
    }

    let mut content = header(options);
    content.push_str(&blocks.join("\n"));
    Ok(BazelExport {
        content,
        entries: blocks.len(),
        skipped,
    })
}

fn header(options: &BazelOptions<'_>) -> String {
    let mut out = String::new();
    if let Some(banner) = options.license_header.filter(|text| !text.trim().is_empty()) {
        out.push_str(banner.trim_end());
        out.push_str("\n\n");
    }
    if let Some(timestamp) = options.timestamp.filter(|stamp| !stamp.is_empty()) {
        out.push_str(&format!("# Generated from known_good.json at {timestamp}\n"));
        out.push_str("# Do not edit manually - use `known-good bazel`\n\n");
    }
    if options.override_type == OverrideType::LocalPath {
        out.push_str(
            "# Note: This file uses local_path overrides. Ensure that local paths are set up correctly.\n\n",
        );
    }
    out
}

fn git_block(module: &Module, repo_overrides: &[RepoCommitOverride]) -> Result<String, String> {
    let pinned = module.repo().and_then(|repo| {
        repo_overrides
            .iter()
            .rev()
            .find(|entry| entry.repo == repo)
            .map(|entry| entry.commit.as_str())
    });
    let reference = match pinned {
        Some(commit) => ResolvedRef::Commit(commit),
        None => module.resolved_ref().map_err(|err| err.to_string())?,
    };

    let name = &module.name;
    let mut out = format!("bazel_dep(name = \"{name}\")\n");
    match reference {
        ResolvedRef::Version(version) => {
            out.push_str("single_version_override(\n");
            out.push_str(&format!("    module_name = \"{name}\",\n"));
            out.push_str(&format!("    version = \"{version}\",\n"));
        }
        ResolvedRef::Commit(commit) => {
            let Some(repo) = module.repo() else {
                return Err(ManifestError::MissingRepoOrCommit {
                    module: name.clone(),
                }
                .to_string());
            };
            if !is_commit_hash(commit) {
                return Err(format!("invalid commit hash: {commit}"));
            }
            out.push_str("git_override(\n");
            out.push_str(&format!("    module_name = \"{name}\",\n"));
            out.push_str(&format!("    remote = \"{repo}\",\n"));
            out.push_str(&format!("    commit = \"{commit}\",\n"));
        }
    }
    push_patches(&mut out, &module.patches);
    out.push_str(")\n");
    Ok(out)
}

fn local_path_block(module: &Module) -> String {
    let name = &module.name;
    let mut out = format!("bazel_dep(name = \"{name}\")\n");
    out.push_str("local_path_override(\n");
    out.push_str(&format!("    module_name = \"{name}\",\n"));
    out.push_str(&format!("    path = \"{name}\",\n"));
    out.push_str(")\n");
    out
}

fn push_patches(out: &mut String, patches: &[String]) {
    if patches.is_empty() {
        return;
    }
    out.push_str("    patches = [\n");
    for patch in patches {
        out.push_str(&format!("        \"{patch}\",\n"));
    }
    out.push_str("    ],\n    patch_strip = 1,\n");
}
