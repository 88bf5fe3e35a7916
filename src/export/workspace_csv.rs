//! CSV workspace descriptor consumed by multi-repo checkout tools.
use crate::error::ManifestError;
use crate::manifest::{Module, ResolvedRef};
use anyhow::Result;

pub const CSV_HEADER: [&str; 6] = ["repo_url", "name", "workspace_path", "version", "hash", "branch"];

/// One row per module: `repo_url,name,workspace_path,,hash_or_branch,branch`.
///
/// Every module must have a repo; the first one without fails the export.
pub fn render_workspace_csv(modules: &[&Module], with_header: bool) -> Result<String> {
    let mut out = String::new();
    if with_header {
        let header: Vec<String> = CSV_HEADER.iter().map(|name| name.to_string()).collect();
        push_row(&mut out, &header);
    }
    for module in modules {
        let row = workspace_row(module)?;
        push_row(&mut out, &row);
    }
    Ok(out)
}

fn workspace_row(module: &Module) -> Result<[String; 6], ManifestError> {
    let repo = module.repo().ok_or_else(|| ManifestError::MissingRepo {
        module: module.name.clone(),
    })?;
    let branch = module.branch();
    let commit = match module.resolved_ref() {
        Ok(ResolvedRef::Commit(hash)) => hash,
        Ok(ResolvedRef::Version(_)) | Err(_) => branch,
    };
    // workspace_path is not part of the manifest; the module name doubles as it
    Ok([
        repo.to_string(),
        module.name.clone(),
        module.name.clone(),
        String::new(),
        commit.to_string(),
        branch.to_string(),
    ])
}

fn push_row(out: &mut String, fields: &[String]) {
    let escaped: Vec<String> = fields.iter().map(|field| escape_field(field)).collect();
    out.push_str(&escaped.join(","));
    out.push_str("\r\n");
}

fn escape_field(field: &str) -> String {
    if field.contains([',', '"', '\r', '\n']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn module(name: &str, body: serde_json::Value) -> Module {
        Module::from_value(name, body).expect("parse module")
    }

    #[test]
    fn commit_column_falls_back_to_default_branch() {
        let foo = module("foo", json!({"repo": "https://example.com/foo.git"}));
        let csv = render_workspace_csv(&[&foo], false).unwrap();
        assert_eq!(csv, "https://example.com/foo.git,foo,foo,,main,main\r\n");
    }

    #[test]
    fn pinned_hash_fills_commit_column() {
        let foo = module(
            "foo",
            json!({"repo": "https://example.com/foo.git", "hash": "abc1234", "branch": "release"}),
        );
        let bar = module(
            "bar",
            json!({"repo": "https://example.com/bar.git", "version": "1.0.0", "branch": "dev"}),
        );
        let csv = render_workspace_csv(&[&foo, &bar], false).unwrap();
        let lines: Vec<&str> = csv.split("\r\n").filter(|line| !line.is_empty()).collect();
        assert_eq!(
            lines,
            [
                "https://example.com/foo.git,foo,foo,,abc1234,release",
                "https://example.com/bar.git,bar,bar,,dev,dev",
            ]
        );
    }

    #[test]
    fn missing_repo_fails_fast() {
        let ok = module("ok", json!({"repo": "https://example.com/ok.git"}));
        let bad = module("bad", json!({"version": "1.0.0"}));
        let err = render_workspace_csv(&[&ok, &bad], false).unwrap_err();
        assert!(matches!(
            crate::error::manifest_error(&err),
            Some(ManifestError::MissingRepo { module }) if module == "bad"
        ));
    }

    #[test]
    fn quotes_fields_with_separators() {
        assert_eq!(escape_field("plain"), "plain");
        assert_eq!(escape_field("a,b"), "\"a,b\"");
        assert_eq!(escape_field("say \"hi\""), "\"say \"\"hi\"\"\"");
    }

    #[test]
    fn optional_header_row_names_columns() {
        let foo = module("foo", json!({"repo": "https://example.com/foo.git"}));
        let csv = render_workspace_csv(&[&foo], true).unwrap();
        assert!(csv.starts_with("repo_url,name,workspace_path,version,hash,branch\r\n"));
        assert_eq!(csv.lines().count(), 2);
    }
}
