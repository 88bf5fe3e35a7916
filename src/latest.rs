//! Refresh module hashes to the latest commit on their branch.
//!
//! Commits come from a [`CommitSource`]: the `gh` CLI when it is installed,
//! otherwise the GitHub REST API. Modules are fetched one at a time and a
//! failure only stops the batch in fail-fast mode.
use crate::error::ManifestError;
use crate::manifest::module::is_commit_hash;
use crate::manifest::KnownGood;
use anyhow::{anyhow, bail, Context, Result};
use serde::Deserialize;
use std::env;
use std::fmt;
use std::path::PathBuf;
use std::process::{Command, Output, Stdio};
use std::thread;
use std::time::{Duration, Instant};

pub const DEFAULT_API_URL: &str = "https://api.github.com";
const USER_AGENT: &str = concat!("known-good/", env!("CARGO_PKG_VERSION"));
/// Upper bound for a single commit lookup, subprocess or HTTP.
pub const FETCH_TIMEOUT: Duration = Duration::from_secs(30);

/// Anything that can name the head commit of `owner/repo` on a branch.
pub trait CommitSource {
    fn latest_commit(&self, owner_repo: &str, branch: &str) -> Result<String>;
}

/// `gh api repos/{owner_repo}/branches/{branch} --jq .commit.sha`
pub struct GhCli {
    program: PathBuf,
    timeout: Duration,
}

impl CommitSource for GhCli {
    fn latest_commit(&self, owner_repo: &str, branch: &str) -> Result<String> {
        let route = format!("repos/{owner_repo}/branches/{branch}");
        let mut cmd = Command::new(&self.program);
        cmd.args(["api", route.as_str(), "--jq", ".commit.sha"]);
        let output = output_with_timeout(&mut cmd, self.timeout)
            .with_context(|| format!("run {} api {route}", self.program.display()))?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            bail!("gh api failed: {}", stderr.trim());
        }
        let sha = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if sha.is_empty() {
            bail!("empty sha returned by gh");
        }
        Ok(sha)
    }
}

/// Wait for `cmd` to finish, killing it once `timeout` has elapsed.
fn output_with_timeout(cmd: &mut Command, timeout: Duration) -> Result<Output> {
    cmd.stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    let start = Instant::now();
    let mut child = cmd.spawn().context("spawn command")?;
    loop {
        if child.try_wait().context("check command status")?.is_some() {
            break;
        }
        if start.elapsed() > timeout {
            let _ = child.kill();
            let _ = child.wait();
            bail!("timed out after {}s", timeout.as_secs_f32());
        }
        thread::sleep(Duration::from_millis(25));
    }
    child.wait_with_output().context("collect command output")
}

pub struct GithubApi {
    base_url: String,
    token: Option<String>,
    agent: ureq::Agent,
}

#[derive(Deserialize)]
struct BranchResponse {
    commit: BranchCommit,
}

#[derive(Deserialize)]
struct BranchCommit {
    sha: String,
}

impl GithubApi {
    /// Configure from `GITHUB_API_URL` and `GITHUB_TOKEN`.
    pub fn from_env() -> Self {
        Self::new(
            env::var("GITHUB_API_URL").unwrap_or_else(|_| DEFAULT_API_URL.to_string()),
            env::var("GITHUB_TOKEN").ok().filter(|token| !token.is_empty()),
            FETCH_TIMEOUT,
        )
    }

    pub fn new(base_url: String, token: Option<String>, timeout: Duration) -> Self {
        let agent: ureq::Agent = ureq::Agent::config_builder()
            .timeout_global(Some(timeout))
            .build()
            .into();
        Self {
            base_url,
            token,
            agent,
        }
    }
}

impl CommitSource for GithubApi {
    fn latest_commit(&self, owner_repo: &str, branch: &str) -> Result<String> {
        let url = format!(
            "{}/repos/{owner_repo}/branches/{branch}",
            self.base_url.trim_end_matches('/')
        );
        let mut request = self
            .agent
            .get(url.as_str())
            .header("Accept", "application/vnd.github+json")
            .header("User-Agent", USER_AGENT);
        if let Some(token) = &self.token {
            request = request.header("Authorization", &format!("Bearer {token}"));
        }
        let mut response = request
            .call()
            .map_err(|err| anyhow!("GitHub API error for {owner_repo}:{branch} - {err}"))?;
        let body: BranchResponse = response
            .body_mut()
            .read_json()
            .with_context(|| format!("decode branch response for {owner_repo}:{branch}"))?;
        Ok(body.commit.sha)
    }
}

/// Pick the `gh` CLI unless disabled or missing, else the HTTP API.
pub fn select_source(no_gh: bool) -> Box<dyn CommitSource> {
    let gh = which::which("gh").ok();
    match (no_gh, gh) {
        (false, Some(program)) => {
            tracing::debug!(program = %program.display(), "using gh CLI");
            Box::new(GhCli {
                program,
                timeout: FETCH_TIMEOUT,
            })
        }
        (false, None) => {
            tracing::info!("'gh' CLI not found; using direct GitHub API");
            Box::new(GithubApi::from_env())
        }
        (true, Some(_)) => {
            tracing::info!("--no-gh specified; ignoring installed 'gh' CLI");
            Box::new(GithubApi::from_env())
        }
        (true, None) => Box::new(GithubApi::from_env()),
    }
}

/// `owner/repo` from an HTTPS GitHub remote such as
/// `https://github.com/eclipse-score/logging.git`.
pub fn github_owner_repo(repo: &str) -> Result<String> {
    let rest = repo
        .strip_prefix("https://")
        .or_else(|| repo.strip_prefix("http://"))
        .ok_or_else(|| anyhow!("not a GitHub URL: {repo}"))?;
    let (host, path) = rest.split_once('/').unwrap_or((rest, ""));
    if host != "github.com" {
        bail!("not a GitHub URL: {repo}");
    }
    let path = path.trim_start_matches('/');
    let path = path.strip_suffix(".git").unwrap_or(path);
    let mut parts = path.splitn(3, '/');
    match (parts.next(), parts.next()) {
        (Some(owner), Some(name)) if !owner.is_empty() && !name.is_empty() => {
            Ok(format!("{owner}/{name}"))
        }
        _ => bail!("cannot parse owner/repo from: {repo}"),
    }
}

pub struct RefreshOptions {
    /// Branch for modules that do not name their own.
    pub branch: String,
    pub fail_fast: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshedModule {
    pub module: String,
    pub previous: String,
    pub latest: String,
    pub branch: String,
}

impl fmt::Display for RefreshedModule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} -> {} (branch {})",
            self.module,
            short(&self.previous),
            short(&self.latest),
            self.branch
        )
    }
}

#[derive(Debug, Default)]
pub struct RefreshReport {
    pub refreshed: Vec<RefreshedModule>,
    pub failures: Vec<ManifestError>,
    pub skipped: Vec<String>,
}

/// Fetch the latest commit for every module with a repo and pin it.
///
/// Errors only when no module is eligible; per-module failures are
/// collected in the report.
pub fn refresh_latest(
    known: &mut KnownGood,
    source: &dyn CommitSource,
    options: &RefreshOptions,
) -> Result<RefreshReport> {
    let mut report = RefreshReport::default();
    let mut eligible = Vec::new();
    for module in known.modules_mut() {
        if module.repo().is_some() {
            eligible.push(module);
        } else {
            tracing::warn!("skipping module {} with missing repo", module.name);
            report.skipped.push(module.name.clone());
        }
    }
    if eligible.is_empty() {
        bail!("no modules found to update");
    }

    for module in eligible {
        let branch = module
            .branch
            .clone()
            .filter(|branch| !branch.is_empty())
            .unwrap_or_else(|| options.branch.clone());
        let fetched = module
            .repo()
            .map(github_owner_repo)
            .unwrap_or_else(|| Err(anyhow!("missing repo")))
            .and_then(|owner_repo| source.latest_commit(&owner_repo, &branch))
            .and_then(|sha| {
                if is_commit_hash(&sha) {
                    Ok(sha)
                } else {
                    Err(anyhow!("unexpected commit sha: {sha}"))
                }
            });
        match fetched {
            Ok(latest) => {
                let previous = module
                    .resolved_ref()
                    .map(|reference| reference.as_str().to_string())
                    .unwrap_or_default();
                module.pin_commit(&latest, None);
                report.refreshed.push(RefreshedModule {
                    module: module.name.clone(),
                    previous,
                    latest,
                    branch,
                });
            }
            Err(err) => {
                let failure = ManifestError::NetworkFetchFailure {
                    module: module.name.clone(),
                    detail: format!("{err:#}"),
                };
                tracing::error!("{failure}");
                report.failures.push(failure);
                if options.fail_fast {
                    break;
                }
            }
        }
    }
    Ok(report)
}

fn short(sha: &str) -> &str {
    sha.get(..8).unwrap_or(sha)
}
