//! Output publishing for generated files.
//!
//! Real writes go through a temporary file in the destination directory that
//! is renamed into place, so readers never observe a partial file. Dry runs
//! print the content between banner markers and touch nothing.
use anyhow::{Context, Result};
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;

/// Marker pair printed around dry-run content.
#[derive(Clone, Copy, Debug)]
pub enum DryRunBanner {
    UpdatedJson,
    GeneratedContent,
}

impl DryRunBanner {
    fn label(self) -> &'static str {
        match self {
            DryRunBanner::UpdatedJson => "UPDATED JSON",
            DryRunBanner::GeneratedContent => "GENERATED CONTENT",
        }
    }
}

/// Write `text` to `path`, or print it when `dry_run` is set.
pub fn emit(path: &Path, text: &str, dry_run: bool, banner: DryRunBanner) -> Result<()> {
    if dry_run {
        print!("{}", render_dry_run(path, text, banner));
        return Ok(());
    }
    write_atomic(path, text)
}

pub fn render_dry_run(path: &Path, text: &str, banner: DryRunBanner) -> String {
    let label = banner.label();
    let mut out = format!("\nDry run: would write to {}\n\n", path.display());
    out.push_str(&format!("---- BEGIN {label} ----\n"));
    out.push_str(text);
    if !text.ends_with('\n') {
        out.push('\n');
    }
    out.push_str(&format!("---- END {label} ----\n"));
    out
}

pub fn write_atomic(path: &Path, text: &str) -> Result<()> {
    let parent = path
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let mut tmp = NamedTempFile::new_in(parent)
        .with_context(|| format!("create temporary file in {}", parent.display()))?;
    tmp.write_all(text.as_bytes())
        .with_context(|| format!("write {}", path.display()))?;
    tmp.persist(path)
        .map_err(|err| err.error)
        .with_context(|| format!("publish {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn dry_run_output_is_bracketed() {
        let rendered = render_dry_run(Path::new("out.json"), "{}\n", DryRunBanner::UpdatedJson);
        assert_eq!(
            rendered,
            "\nDry run: would write to out.json\n\n---- BEGIN UPDATED JSON ----\n{}\n---- END UPDATED JSON ----\n"
        );
    }

    #[test]
    fn write_atomic_replaces_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("MODULE.bazel");
        fs::write(&path, "old").unwrap();
        write_atomic(&path, "new").unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "new");
        let leftovers = fs::read_dir(dir.path()).unwrap().count();
        assert_eq!(leftovers, 1);
    }

    #[test]
    fn dry_run_does_not_create_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");
        emit(&path, "a,b\r\n", true, DryRunBanner::GeneratedContent).unwrap();
        assert!(!path.exists());
    }
}
