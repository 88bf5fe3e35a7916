//! Shared test infrastructure for CLI integration tests.

use std::fs;
use std::io::{BufRead, BufReader, Write};
use std::net::TcpListener;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use std::thread;
use tempfile::TempDir;

/// A scratch directory holding a manifest, with helpers to run the binary
/// against it.
pub struct Workspace {
    dir: TempDir,
}

/// Captured result of one CLI invocation.
#[derive(Debug)]
pub struct RunResult {
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl From<Output> for RunResult {
    fn from(output: Output) -> Self {
        Self {
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        }
    }
}

impl Workspace {
    pub fn empty() -> Self {
        Self {
            dir: TempDir::new().expect("create temp dir"),
        }
    }

    /// Workspace with `known_good.json` set to `manifest`.
    pub fn with_manifest(manifest: &str) -> Self {
        let workspace = Self::empty();
        workspace.write("known_good.json", manifest);
        workspace
    }

    pub fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    pub fn write(&self, name: &str, content: &str) {
        fs::write(self.path(name), content).expect("write fixture file");
    }

    pub fn read(&self, name: &str) -> String {
        fs::read_to_string(self.path(name)).expect("read workspace file")
    }

    pub fn exists(&self, name: &str) -> bool {
        self.path(name).exists()
    }

    /// Run the binary with the workspace as working directory.
    pub fn run(&self, args: &[&str]) -> RunResult {
        self.run_with_env(args, &[])
    }

    /// Like [`Workspace::run`], with extra environment variables.
    pub fn run_with_env(&self, args: &[&str], env: &[(&str, &str)]) -> RunResult {
        run_in(self.dir.path(), args, env)
    }
}

fn run_in(dir: &Path, args: &[&str], env: &[(&str, &str)]) -> RunResult {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_known-good"));
    cmd.args(args)
        .current_dir(dir)
        .env("NO_COLOR", "1")
        .env_remove("RUST_LOG")
        .env_remove("GITHUB_TOKEN")
        .env_remove("GITHUB_API_URL");
    for (key, value) in env {
        cmd.env(key, value);
    }
    cmd.output().expect("run known-good").into()
}

/// Start a local stand-in for the GitHub branches API and return its base
/// URL. `heads` maps request paths such as
/// `/repos/org/repo/branches/main` to the commit SHA to report; every other
/// path answers 404.
pub fn serve_branch_heads(heads: &[(&str, &str)]) -> String {
    let heads: Vec<(String, String)> = heads
        .iter()
        .map(|(path, sha)| (path.to_string(), sha.to_string()))
        .collect();
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind test server");
    let base_url = format!("http://{}", listener.local_addr().expect("server address"));
    thread::spawn(move || {
        for stream in listener.incoming() {
            let Ok(mut stream) = stream else {
                continue;
            };
            let Ok(reader_stream) = stream.try_clone() else {
                continue;
            };
            let mut reader = BufReader::new(reader_stream);
            let mut request_line = String::new();
            if reader.read_line(&mut request_line).is_err() {
                continue;
            }
            loop {
                let mut line = String::new();
                match reader.read_line(&mut line) {
                    Ok(0) | Err(_) => break,
                    Ok(_) if line == "\r\n" => break,
                    Ok(_) => {}
                }
            }
            let path = request_line.split_whitespace().nth(1).unwrap_or_default();
            let response = match heads.iter().find(|(known, _)| known == path) {
                Some((_, sha)) => {
                    let body = format!(r#"{{"commit":{{"sha":"{sha}"}}}}"#);
                    format!(
                        "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                        body.len()
                    )
                }
                None => {
                    let body = r#"{"message":"Branch not found"}"#;
                    format!(
                        "HTTP/1.1 404 Not Found\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                        body.len()
                    )
                }
            };
            let _ = stream.write_all(response.as_bytes());
        }
    });
    base_url
}
