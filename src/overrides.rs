//! Targeted commit/repo overrides for manifest modules.
//!
//! A batch is parsed and validated in full before anything is applied, so an
//! invalid spec never leaves a half-updated manifest behind.
use crate::error::ManifestError;
use crate::manifest::module::{is_commit_hash, is_repo_url};
use crate::manifest::KnownGood;
use anyhow::Result;

/// A validated `name@hash` or `name@repo@hash` override.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverrideSpec {
    pub raw: String,
    pub module: String,
    pub repo: Option<String>,
    pub hash: String,
}

impl OverrideSpec {
    pub fn parse(raw: &str) -> Result<Self, ManifestError> {
        let parts: Vec<&str> = raw.split('@').collect();
        let (module, repo, hash) = match parts.as_slice() {
            [module, hash] => (*module, None, *hash),
            [module, repo, hash] => (*module, Some(*repo), *hash),
            _ => {
                return Err(ManifestError::InvalidOverrideFormat {
                    spec: raw.to_string(),
                })
            }
        };
        if !is_commit_hash(hash) {
            return Err(ManifestError::InvalidCommitHash {
                spec: raw.to_string(),
                hash: hash.to_string(),
            });
        }
        if let Some(repo) = repo {
            if !is_repo_url(repo) {
                return Err(ManifestError::InvalidRepoUrl {
                    spec: raw.to_string(),
                    repo: repo.to_string(),
                });
            }
        }
        Ok(Self {
            raw: raw.to_string(),
            module: module.to_string(),
            repo: repo.map(str::to_string),
            hash: hash.to_string(),
        })
    }
}

/// Validate every spec; the first invalid one rejects the whole batch.
pub fn parse_overrides<S: AsRef<str>>(raw: &[S]) -> Result<Vec<OverrideSpec>, ManifestError> {
    raw.iter().map(|spec| OverrideSpec::parse(spec.as_ref())).collect()
}

/// Apply validated overrides and return how many changed a module.
///
/// Unknown module names are skipped with a warning.
pub fn apply_overrides(known: &mut KnownGood, specs: &[OverrideSpec]) -> usize {
    let mut applied = 0;
    for spec in specs {
        tracing::info!(spec = %spec.raw, "override registered");
        let available = known.module_names();
        let Some(module) = known.find_module_mut(&spec.module) else {
            let skipped = ManifestError::ModuleNotFound {
                name: spec.module.clone(),
                available,
            };
            tracing::warn!("{skipped}; skipping override");
            continue;
        };
        let old = module
            .resolved_ref()
            .map(|reference| reference.as_str().to_string())
            .unwrap_or_else(|_| "<none>".to_string());
        if module.pin_commit(&spec.hash, spec.repo.as_deref()) {
            tracing::info!(
                module = %spec.module,
                "applied override: {old} -> {}",
                spec.hash
            );
            applied += 1;
        } else {
            tracing::info!(
                module = %spec.module,
                "already at specified commit {}, no change needed",
                spec.hash
            );
        }
    }
    applied
}

/// Parse, validate, and apply a batch of raw override specs.
pub fn override_known_good<S: AsRef<str>>(known: &mut KnownGood, raw: &[S]) -> Result<usize> {
    let specs = parse_overrides(raw)?;
    let applied = apply_overrides(known, &specs);
    if applied == 0 {
        tracing::warn!("no overrides were applied to any modules");
    } else {
        tracing::info!("successfully applied {applied} override(s)");
    }
    Ok(applied)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::path::Path;

    fn manifest() -> KnownGood {
        KnownGood::from_value(
            Path::new("known_good.json"),
            json!({
                "modules": {
                    "foo": {"repo": "https://example.com/foo.git", "hash": "abc1234"},
                    "bar": {"repo": "https://example.com/bar.git", "version": "1.0.0"}
                },
                "timestamp": ""
            }),
        )
        .expect("parse manifest")
    }

    #[test]
    fn parses_both_supported_forms() {
        let short = OverrideSpec::parse("foo@deadbee").unwrap();
        assert_eq!(short.module, "foo");
        assert_eq!(short.repo, None);
        assert_eq!(short.hash, "deadbee");

        let long = OverrideSpec::parse("foo@https://github.com/org/foo.git@deadbee").unwrap();
        assert_eq!(long.repo.as_deref(), Some("https://github.com/org/foo.git"));
    }

    #[test]
    fn rejects_wrong_part_counts() {
        for raw in ["a@b@c@d", "foo", "a@b@c@d@e"] {
            let err = OverrideSpec::parse(raw).unwrap_err();
            assert!(matches!(err, ManifestError::InvalidOverrideFormat { .. }), "{raw}");
            assert!(err.to_string().contains("module_name@repo_url@commit_hash"));
        }
    }

    #[test]
    fn rejects_non_hex_hash() {
        let err = OverrideSpec::parse("bad_name@xyz").unwrap_err();
        assert!(matches!(err, ManifestError::InvalidCommitHash { ref hash, .. } if hash == "xyz"));
    }

    #[test]
    fn rejects_bad_repo_url() {
        let err = OverrideSpec::parse("foo@git@github.com:org/foo.git@deadbee").unwrap_err();
        assert!(matches!(err, ManifestError::InvalidOverrideFormat { .. }));

        let err = OverrideSpec::parse("foo@https://example.com/foo@deadbee").unwrap_err();
        assert!(matches!(err, ManifestError::InvalidRepoUrl { .. }));

        let err = OverrideSpec::parse("foo@http://example.com/foo.git@deadbee").unwrap_err();
        assert!(matches!(err, ManifestError::InvalidRepoUrl { .. }));
    }

    #[test]
    fn override_pins_hash_and_clears_version() {
        let mut known = manifest();
        let applied = override_known_good(&mut known, &["foo@deadbee", "bar@cafef00d"]).unwrap();
        assert_eq!(applied, 2);
        let foo = known.find_module("foo").unwrap();
        assert_eq!(foo.hash(), Some("deadbee"));
        assert_eq!(foo.version, None);
        let bar = known.find_module("bar").unwrap();
        assert_eq!(bar.hash(), Some("cafef00d"));
        assert_eq!(bar.version, None);
    }

    #[test]
    fn repeated_override_is_idempotent() {
        let mut known = manifest();
        assert_eq!(override_known_good(&mut known, &["foo@deadbee"]).unwrap(), 1);
        let after_first = known.find_module("foo").unwrap().clone();
        assert_eq!(override_known_good(&mut known, &["foo@deadbee"]).unwrap(), 0);
        assert_eq!(known.find_module("foo").unwrap(), &after_first);
    }

    #[test]
    fn three_part_override_replaces_repo() {
        let mut known = manifest();
        let applied =
            override_known_good(&mut known, &["foo@https://github.com/fork/foo.git@abc1234"])
                .unwrap();
        assert_eq!(applied, 1);
        let foo = known.find_module("foo").unwrap();
        assert_eq!(foo.repo(), Some("https://github.com/fork/foo.git"));
        assert_eq!(foo.hash(), Some("abc1234"));
    }

    #[test]
    fn unknown_module_is_skipped() {
        let mut known = manifest();
        let before = known.clone();
        let applied = override_known_good(&mut known, &["missing@deadbee"]).unwrap();
        assert_eq!(applied, 0);
        assert_eq!(known, before);
    }

    #[test]
    fn invalid_spec_rejects_whole_batch() {
        let mut known = manifest();
        let before = known.clone();
        let err = override_known_good(&mut known, &["foo@deadbee", "bar@nothex!"]).unwrap_err();
        assert!(matches!(
            crate::error::manifest_error(&err),
            Some(ManifestError::InvalidCommitHash { .. })
        ));
        assert_eq!(known, before);
    }

    #[test]
    fn overrides_reach_grouped_modules() {
        let mut known = KnownGood::from_value(
            Path::new("known_good.json"),
            json!({"modules": {"target_sw": {"foo": {"repo": "https://example.com/foo.git", "hash": "abc1234"}}}}),
        )
        .unwrap();
        assert_eq!(override_known_good(&mut known, &["foo@deadbee"]).unwrap(), 1);
        assert!(known.is_grouped());
        assert_eq!(known.find_module("foo").unwrap().hash(), Some("deadbee"));
    }
}
