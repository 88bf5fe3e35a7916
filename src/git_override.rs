//! In-place commit updates for `git_override(...)` stanzas in MODULE.bazel.
//!
//! Blocks are located line by line: a `git_override(` line opens a block and
//! the next line starting with `)` closes it. Only the `commit` attribute is
//! touched; everything else in the file is preserved.
use crate::manifest::module::is_commit_hash;
use anyhow::{anyhow, Result};
use regex::Regex;
use std::collections::BTreeSet;
use std::sync::OnceLock;

/// A `REMOTE@HASH` request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemotePin {
    pub remote: String,
    pub commit: String,
}

impl RemotePin {
    pub fn parse(raw: &str) -> Result<Self> {
        let (remote, commit) = raw
            .rsplit_once('@')
            .ok_or_else(|| anyhow!("argument must be REMOTE@HASH (got: {raw})"))?;
        if remote.is_empty() || !is_commit_hash(commit) {
            return Err(anyhow!(
                "argument must be REMOTE@HASH with a 7-40 character hex hash (got: {raw})"
            ));
        }
        Ok(Self {
            remote: remote.to_string(),
            commit: commit.to_string(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineEdit {
    /// 1-based line number in the rewritten file.
    pub line: usize,
    pub old: Option<String>,
    pub new: String,
}

#[derive(Debug)]
pub struct Rewrite {
    pub content: String,
    pub updated: BTreeSet<String>,
    pub missing: Vec<String>,
    pub edits: Vec<LineEdit>,
}

impl Rewrite {
    pub fn changed(&self) -> bool {
        !self.edits.is_empty()
    }

    /// Line-level diff of the edits for dry-run output.
    pub fn render_diff(&self, label: &str) -> String {
        let mut out = format!("--- {label}\n+++ {label} (updated)\n");
        for edit in &self.edits {
            out.push_str(&format!("@@ line {} @@\n", edit.line));
            if let Some(old) = &edit.old {
                out.push_str(&format!("-{old}\n"));
            }
            out.push_str(&format!("+{}\n", edit.new));
        }
        out
    }
}

fn block_start() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^\s*git_override\s*\(\s*$").expect("regex for git_override start")
    })
}

fn remote_line() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r#"^\s*remote\s*=\s*"(?P<remote>[^"]+)"\s*,?\s*$"#)
            .expect("regex for git_override remote")
    })
}

fn commit_line() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r#"^(?P<indent>\s*)commit\s*=\s*"[^"]*"\s*,?\s*$"#)
            .expect("regex for git_override commit")
    })
}

/// Point every requested remote's `git_override` block at its new commit.
pub fn rewrite_git_overrides(text: &str, pins: &[RemotePin]) -> Rewrite {
    let mut lines: Vec<String> = text.lines().map(str::to_string).collect();
    let requested: BTreeSet<&str> = pins.iter().map(|pin| pin.remote.as_str()).collect();
    let mut updated = BTreeSet::new();
    let mut edits = Vec::new();

    let mut i = 0;
    while i < lines.len() {
        if !block_start().is_match(&lines[i]) {
            i += 1;
            continue;
        }
        let start = i;
        i += 1;
        while i < lines.len() && !lines[i].trim_start().starts_with(')') {
            i += 1;
        }
        let end = i;

        let mut remote = None;
        let mut remote_idx = None;
        let mut commit_idx = None;
        for (idx, line) in lines.iter().enumerate().take(end).skip(start) {
            if let Some(caps) = remote_line().captures(line) {
                remote = Some(caps["remote"].to_string());
                remote_idx = Some(idx);
            }
            if commit_line().is_match(line) {
                commit_idx = Some(idx);
            }
        }
        let (Some(remote), Some(remote_idx)) = (remote, remote_idx) else {
            i += 1;
            continue;
        };
        let Some(pin) = pins.iter().rev().find(|pin| pin.remote == remote) else {
            i += 1;
            continue;
        };

        match commit_idx {
            Some(idx) => {
                let indent = commit_line()
                    .captures(&lines[idx])
                    .and_then(|caps| caps.name("indent").map(|m| m.as_str().to_string()))
                    .unwrap_or_default();
                let new_line = format!("{indent}commit = \"{}\",", pin.commit);
                if lines[idx] != new_line {
                    let old = std::mem::replace(&mut lines[idx], new_line.clone());
                    edits.push(LineEdit {
                        line: idx + 1,
                        old: Some(old),
                        new: new_line,
                    });
                }
            }
            None => {
                let indent = lines
                    .get(start + 1)
                    .filter(|_| start + 1 < end)
                    .map(|line| leading_whitespace(line).to_string())
                    .unwrap_or_else(|| "    ".to_string());
                let new_line = format!("{indent}commit = \"{}\",", pin.commit);
                lines.insert(remote_idx + 1, new_line.clone());
                edits.push(LineEdit {
                    line: remote_idx + 2,
                    old: None,
                    new: new_line,
                });
                i += 1;
            }
        }
        updated.insert(remote);
        i += 1;
    }

    let missing = requested
        .iter()
        .filter(|remote| !updated.contains(**remote))
        .map(|remote| remote.to_string())
        .collect();
    let mut content = lines.join("\n");
    content.push('\n');
    Rewrite {
        content,
        updated,
        missing,
        edits,
    }
}

fn leading_whitespace(line: &str) -> &str {
    &line[..line.len() - line.trim_start().len()]
}
