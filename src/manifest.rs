//! The known_good.json manifest model and its JSON codec.
//!
//! A manifest stores modules either flat (`modules: {name: {...}}`) or in
//! named groups (`modules: {group: {name: {...}}}`). The shape is detected
//! once at load time and reproduced on save.
use crate::error::ManifestError;
use crate::output::{emit, DryRunBanner};
use anyhow::{Context, Result};
use serde::Serialize;
use serde_json::{Map, Value};
use std::fs;
use std::path::Path;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

pub mod module;

pub use module::{Module, ResolvedRef};

/// Group name used when a flat manifest is viewed as groups.
pub const DEFAULT_GROUP: &str = "default";

#[derive(Debug, Clone, PartialEq)]
pub struct ModuleGroup {
    pub name: String,
    pub modules: Vec<Module>,
}

/// Module storage, tagged with the JSON shape it was loaded from.
#[derive(Debug, Clone, PartialEq)]
pub enum ModuleSet {
    Flat(Vec<Module>),
    Grouped(Vec<ModuleGroup>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct KnownGood {
    pub modules: ModuleSet,
    pub timestamp: String,
    /// Top-level keys other than `modules` and `timestamp`.
    pub extra: Map<String, Value>,
}

impl KnownGood {
    pub fn is_grouped(&self) -> bool {
        matches!(self.modules, ModuleSet::Grouped(_))
    }

    /// All modules in file order, across groups.
    pub fn modules(&self) -> Vec<&Module> {
        match &self.modules {
            ModuleSet::Flat(modules) => modules.iter().collect(),
            ModuleSet::Grouped(groups) => groups
                .iter()
                .flat_map(|group| group.modules.iter())
                .collect(),
        }
    }

    pub fn modules_mut(&mut self) -> Vec<&mut Module> {
        match &mut self.modules {
            ModuleSet::Flat(modules) => modules.iter_mut().collect(),
            ModuleSet::Grouped(groups) => groups
                .iter_mut()
                .flat_map(|group| group.modules.iter_mut())
                .collect(),
        }
    }

    /// Modules of one group, or of all groups when `group` is `None`.
    ///
    /// A flat manifest answers to [`DEFAULT_GROUP`].
    pub fn modules_in(&self, group: Option<&str>) -> Result<Vec<&Module>> {
        let Some(group) = group else {
            return Ok(self.modules());
        };
        match &self.modules {
            ModuleSet::Flat(modules) if group == DEFAULT_GROUP => Ok(modules.iter().collect()),
            ModuleSet::Flat(_) => Err(anyhow::anyhow!(
                "group '{group}' not found; flat manifests only have '{DEFAULT_GROUP}'"
            )),
            ModuleSet::Grouped(groups) => groups
                .iter()
                .find(|candidate| candidate.name == group)
                .map(|found| found.modules.iter().collect())
                .ok_or_else(|| {
                    let names: Vec<&str> = groups.iter().map(|g| g.name.as_str()).collect();
                    anyhow::anyhow!(
                        "group '{group}' not found; available groups: {}",
                        names.join(", ")
                    )
                }),
        }
    }

    pub fn find_module(&self, name: &str) -> Option<&Module> {
        self.modules().into_iter().find(|module| module.name == name)
    }

    pub fn find_module_mut(&mut self, name: &str) -> Option<&mut Module> {
        self.modules_mut()
            .into_iter()
            .find(|module| module.name == name)
    }

    /// Sorted, de-duplicated module names for diagnostics.
    pub fn module_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .modules()
            .iter()
            .map(|module| module.name.clone())
            .collect();
        names.sort();
        names.dedup();
        names
    }

    /// Build a manifest from a parsed JSON document read from `path`.
    pub fn from_value(path: &Path, value: Value) -> Result<Self, ManifestError> {
        let malformed = |detail: String| ManifestError::MalformedManifest {
            path: path.to_path_buf(),
            detail,
        };
        let Value::Object(mut root) = value else {
            return Err(malformed("document is not a JSON object".to_string()));
        };
        let modules = match root.remove("modules") {
            Some(Value::Object(modules)) => modules,
            Some(_) => return Err(malformed("'modules' is not an object".to_string())),
            None => return Err(malformed("missing 'modules' key".to_string())),
        };
        let timestamp = match root.remove("timestamp") {
            Some(Value::String(timestamp)) => timestamp,
            Some(Value::Null) | None => String::new(),
            Some(other) => return Err(malformed(format!("'timestamp' is not a string: {other}"))),
        };

        let set = if looks_grouped(&modules) {
            let mut groups = Vec::with_capacity(modules.len());
            for (group_name, group_value) in modules {
                let Value::Object(entries) = group_value else {
                    return Err(malformed(format!("group '{group_name}' is not an object")));
                };
                groups.push(ModuleGroup {
                    modules: parse_modules(entries).map_err(&malformed)?,
                    name: group_name,
                });
            }
            ModuleSet::Grouped(groups)
        } else {
            ModuleSet::Flat(parse_modules(modules).map_err(&malformed)?)
        };

        Ok(Self {
            modules: set,
            timestamp,
            extra: root,
        })
    }

    /// Render the manifest back to JSON in its original shape.
    pub fn to_value(&self) -> Result<Value> {
        let modules = match &self.modules {
            ModuleSet::Flat(modules) => modules_to_map(modules)?,
            ModuleSet::Grouped(groups) => {
                let mut out = Map::new();
                for group in groups {
                    out.insert(group.name.clone(), Value::Object(modules_to_map(&group.modules)?));
                }
                out
            }
        };
        let mut root = Map::new();
        root.insert("modules".to_string(), Value::Object(modules));
        root.insert("timestamp".to_string(), Value::String(self.timestamp.clone()));
        for (key, value) in &self.extra {
            root.insert(key.clone(), value.clone());
        }
        Ok(Value::Object(root))
    }

    /// Pretty-printed document with four-space indentation and a trailing
    /// newline.
    pub fn render(&self) -> Result<String> {
        let value = self.to_value()?;
        let mut buf = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
        let mut serializer = serde_json::Serializer::with_formatter(&mut buf, formatter);
        value
            .serialize(&mut serializer)
            .context("serialize known_good JSON")?;
        let mut text = String::from_utf8(buf).context("known_good JSON is not UTF-8")?;
        text.push('\n');
        Ok(text)
    }

    /// Refresh the timestamp and write the manifest, or print it on dry-run.
    pub fn save(&mut self, path: &Path, dry_run: bool) -> Result<()> {
        self.timestamp = utc_timestamp()?;
        let text = self.render()?;
        emit(path, &text, dry_run, DryRunBanner::UpdatedJson)?;
        if !dry_run {
            tracing::info!(path = %path.display(), "wrote known_good manifest");
        }
        Ok(())
    }
}

/// Load and parse a manifest from disk.
pub fn load_known_good(path: &Path) -> Result<KnownGood> {
    let malformed = |detail: String| ManifestError::MalformedManifest {
        path: path.to_path_buf(),
        detail,
    };
    let text = fs::read_to_string(path).map_err(|err| malformed(err.to_string()))?;
    let value: Value = serde_json::from_str(&text).map_err(|err| malformed(err.to_string()))?;
    let known = KnownGood::from_value(path, value)?;
    tracing::debug!(
        path = %path.display(),
        modules = known.modules().len(),
        grouped = known.is_grouped(),
        "loaded known_good manifest"
    );
    Ok(known)
}

/// Current UTC time at second precision, e.g. `2025-01-31T12:00:00Z`.
pub fn utc_timestamp() -> Result<String> {
    let now = OffsetDateTime::now_utc()
        .replace_nanosecond(0)
        .context("truncate timestamp")?;
    now.format(&Rfc3339).context("format timestamp")
}

/// The first entry decides the shape: a module body carries `repo` or
/// `version`, anything else object-shaped is a group.
fn looks_grouped(modules: &Map<String, Value>) -> bool {
    match modules.values().next() {
        Some(Value::Object(first)) => !(first.contains_key("repo") || first.contains_key("version")),
        _ => false,
    }
}

fn parse_modules(entries: Map<String, Value>) -> Result<Vec<Module>, String> {
    entries
        .into_iter()
        .map(|(name, value)| {
            if !value.is_object() {
                return Err(format!("module '{name}' is not an object"));
            }
            Module::from_value(&name, value).map_err(|err| format!("module '{name}': {err}"))
        })
        .collect()
}

fn modules_to_map(modules: &[Module]) -> Result<Map<String, Value>> {
    let mut out = Map::new();
    for module in modules {
        let value = module
            .to_value()
            .with_context(|| format!("serialize module {}", module.name))?;
        out.insert(module.name.clone(), value);
    }
    Ok(out)
}
