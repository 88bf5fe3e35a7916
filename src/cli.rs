//! CLI argument parsing for the known_good manifest tools.
//!
//! Each subcommand is a single load → transform → write transaction against
//! the paths given here.
use crate::export::OverrideType;
use crate::info::InfoField;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

pub const DEFAULT_KNOWN_GOOD: &str = "known_good.json";

/// Root CLI entrypoint.
#[derive(Parser, Debug)]
#[command(
    name = "known-good",
    version,
    about = "Read, override, and export known_good.json module manifests",
    after_help = "Examples:\n  known-good override --known known_good.json --module-override score_baselibs@abc123def\n  known-good override --module-override score_baselibs@https://github.com/eclipse-score/baselibs.git@abc123 --dry-run\n  known-good bazel --known known_good.json --output score_modules.MODULE.bazel\n  known-good workspace-csv --known-good known_good.json --output .gita-workspace.csv\n  known-good update-latest --known-good known_good.json --output known_good.json\n  known-good git-override https://github.com/eclipse-score/baselibs.git@deadbeef --file MODULE.bazel",
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct RootArgs {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    Override(OverrideArgs),
    Bazel(BazelArgs),
    WorkspaceCsv(WorkspaceCsvArgs),
    Gitmodules(GitmodulesArgs),
    Info(InfoArgs),
    UpdateLatest(UpdateLatestArgs),
    GitOverride(GitOverrideArgs),
}

#[derive(Parser, Debug)]
#[command(about = "Override module commits in known_good.json")]
pub struct OverrideArgs {
    /// Path to input known_good.json file
    #[arg(long, visible_alias = "known-good", value_name = "PATH", default_value = DEFAULT_KNOWN_GOOD)]
    pub known: PathBuf,

    /// Path to output JSON file
    #[arg(long, value_name = "PATH", default_value = "known_good.updated.json")]
    pub output: PathBuf,

    /// Override commit for a module: module_name@hash | module_name@repo_url@hash
    #[arg(
        long = "module-override",
        visible_alias = "repo-override",
        value_name = "SPEC",
        required = true
    )]
    pub overrides: Vec<String>,

    /// Print the result instead of writing to file
    #[arg(long)]
    pub dry_run: bool,
}

#[derive(Parser, Debug)]
#[command(about = "Generate bazel_dep and override stanzas from known_good.json")]
pub struct BazelArgs {
    /// Path to known_good.json
    #[arg(long, visible_alias = "known-good", value_name = "PATH", default_value = DEFAULT_KNOWN_GOOD)]
    pub known: PathBuf,

    /// Output file path
    #[arg(long, value_name = "PATH", default_value = "score_modules.MODULE.bazel")]
    pub output: PathBuf,

    /// File whose contents are placed verbatim at the top (e.g. a license banner)
    #[arg(long, value_name = "PATH")]
    pub license_header: Option<PathBuf>,

    /// Type of override to emit
    #[arg(long, value_enum, default_value_t = OverrideType::Git)]
    pub override_type: OverrideType,

    /// Apply a module override before exporting: module_name@hash | module_name@repo_url@hash
    #[arg(long = "module-override", value_name = "SPEC")]
    pub module_overrides: Vec<String>,

    /// Override the commit of every module using a repo: <REPO_URL>@<COMMIT_SHA>
    #[arg(long = "repo-override", value_name = "REPO@SHA")]
    pub repo_overrides: Vec<String>,

    /// Only export modules of this group
    #[arg(long, value_name = "GROUP")]
    pub group: Option<String>,

    /// Print generated content instead of writing to file
    #[arg(long)]
    pub dry_run: bool,
}

#[derive(Parser, Debug)]
#[command(about = "Write a CSV workspace descriptor for multi-repo checkout tools")]
pub struct WorkspaceCsvArgs {
    /// Path to known_good.json
    #[arg(long = "known-good", visible_alias = "known", value_name = "PATH", default_value = DEFAULT_KNOWN_GOOD)]
    pub known_good: PathBuf,

    /// File to output workspace metadata
    #[arg(long, visible_alias = "gita-workspace", value_name = "PATH", default_value = ".gita-workspace.csv")]
    pub output: PathBuf,

    /// Emit a header row naming the columns
    #[arg(long)]
    pub header: bool,

    /// Only export modules of this group
    #[arg(long, value_name = "GROUP")]
    pub group: Option<String>,

    /// Print generated content instead of writing to file
    #[arg(long)]
    pub dry_run: bool,
}

#[derive(Parser, Debug)]
#[command(about = "Write .gitmodules content for the manifest modules")]
pub struct GitmodulesArgs {
    /// Path to known_good.json
    #[arg(long = "known-good", visible_alias = "known", value_name = "PATH", default_value = DEFAULT_KNOWN_GOOD)]
    pub known_good: PathBuf,

    /// Output file path
    #[arg(long, value_name = "PATH", default_value = ".gitmodules")]
    pub output: PathBuf,

    /// Only export modules of this group
    #[arg(long, value_name = "GROUP")]
    pub group: Option<String>,

    /// Print generated content instead of writing to file
    #[arg(long)]
    pub dry_run: bool,
}

#[derive(Parser, Debug)]
#[command(about = "Print one field of a module (N/A when absent)")]
pub struct InfoArgs {
    /// Path to known_good.json
    #[arg(long = "known-good", visible_alias = "known", value_name = "PATH", default_value = DEFAULT_KNOWN_GOOD)]
    pub known_good: PathBuf,

    /// Name of the module to look up
    #[arg(value_name = "MODULE")]
    pub module: String,

    /// Field to print
    #[arg(long, value_enum, default_value_t = InfoField::All)]
    pub field: InfoField,
}

#[derive(Parser, Debug)]
#[command(
    about = "Update module hashes to the latest commit on their branch",
    after_help = "Environment:\n  GITHUB_TOKEN    optional token to raise API rate limits\n  GITHUB_API_URL  API base URL (default: https://api.github.com)\n\nExit codes:\n  0 success\n  2 partial failure (at least one repo failed)\n  3 fatal failure (e.g. cannot read JSON)"
)]
pub struct UpdateLatestArgs {
    /// Path to known_good.json
    #[arg(long = "known-good", visible_alias = "known", value_name = "PATH", default_value = DEFAULT_KNOWN_GOOD)]
    pub known_good: PathBuf,

    /// Branch for modules that do not name one
    #[arg(long, default_value = "main")]
    pub branch: String,

    /// Optional output path to write updated JSON
    #[arg(long, value_name = "PATH")]
    pub output: Option<PathBuf>,

    /// Stop on first failure instead of continuing
    #[arg(long)]
    pub fail_fast: bool,

    /// Use the HTTP API even if the gh CLI is installed
    #[arg(long)]
    pub no_gh: bool,

    /// Print the updated JSON instead of writing it
    #[arg(long, requires = "output")]
    pub dry_run: bool,
}

#[derive(Parser, Debug)]
#[command(about = "Update commit hashes of git_override stanzas in a MODULE.bazel file")]
pub struct GitOverrideArgs {
    /// One or more REMOTE@HASH entries
    #[arg(value_name = "REMOTE@HASH", required = true)]
    pub remote_and_hash: Vec<String>,

    /// Path to MODULE.bazel
    #[arg(long, value_name = "PATH", default_value = "MODULE.bazel")]
    pub file: PathBuf,

    /// Show diff without writing
    #[arg(long)]
    pub dry_run: bool,
}
