use anyhow::{Context, Result};
use clap::Parser;
use std::fs;
use std::process::ExitCode;

mod cli;
mod error;
mod export;
mod git_override;
mod info;
mod latest;
mod logging;
mod manifest;
mod output;
mod overrides;

use cli::{
    BazelArgs, Command, GitOverrideArgs, GitmodulesArgs, InfoArgs, OverrideArgs, RootArgs,
    UpdateLatestArgs, WorkspaceCsvArgs,
};
use error::{manifest_error, ManifestError};
use export::{render_bazel, render_gitmodules, render_workspace_csv, BazelOptions, RepoCommitOverride};
use git_override::{rewrite_git_overrides, RemotePin};
use latest::{refresh_latest, RefreshOptions};
use manifest::load_known_good;
use output::{emit, write_atomic, DryRunBanner};
use overrides::override_known_good;

/// `update-latest`: at least one module failed to refresh.
const EXIT_PARTIAL_FAILURE: u8 = 2;
/// `update-latest`: input unreadable or output unwritable.
const EXIT_FATAL: u8 = 3;
/// `git-override`: malformed arguments or missing file.
const EXIT_USAGE: u8 = 2;

fn main() -> ExitCode {
    let args = RootArgs::parse();
    logging::init_logging(args.verbose);

    match run(args.command) {
        Ok(code) => code,
        Err(err) => {
            report_error(&err);
            ExitCode::FAILURE
        }
    }
}

fn run(command: Command) -> Result<ExitCode> {
    match command {
        Command::Override(args) => cmd_override(args).map(|()| ExitCode::SUCCESS),
        Command::Bazel(args) => cmd_bazel(args).map(|()| ExitCode::SUCCESS),
        Command::WorkspaceCsv(args) => cmd_workspace_csv(args).map(|()| ExitCode::SUCCESS),
        Command::Gitmodules(args) => cmd_gitmodules(args).map(|()| ExitCode::SUCCESS),
        Command::Info(args) => cmd_info(args).map(|()| ExitCode::SUCCESS),
        Command::UpdateLatest(args) => cmd_update_latest(args),
        Command::GitOverride(args) => cmd_git_override(args),
    }
}

fn report_error(err: &anyhow::Error) {
    eprintln!("error: {err:#}");
    if let Some(ManifestError::InvalidOverrideFormat { .. }) = manifest_error(err) {
        eprintln!(
            "Supported formats:\n  1. module_name@commit_hash\n  2. module_name@repo_url@commit_hash"
        );
    }
}

fn cmd_override(args: OverrideArgs) -> Result<()> {
    tracing::info!("loading {}", args.known.display());
    let mut known = load_known_good(&args.known)?;
    override_known_good(&mut known, &args.overrides)?;
    known.save(&args.output, args.dry_run)?;
    Ok(())
}

fn cmd_bazel(args: BazelArgs) -> Result<()> {
    let repo_overrides = args
        .repo_overrides
        .iter()
        .map(|raw| RepoCommitOverride::parse(raw))
        .collect::<Result<Vec<_>>>()?;
    let license_header = args
        .license_header
        .as_deref()
        .map(|path| {
            fs::read_to_string(path)
                .with_context(|| format!("read license header {}", path.display()))
        })
        .transpose()?;
    let mut known = load_known_good(&args.known)?;
    if !args.module_overrides.is_empty() {
        override_known_good(&mut known, &args.module_overrides)?;
    }

    let modules = known.modules_in(args.group.as_deref())?;
    let options = BazelOptions {
        override_type: args.override_type,
        repo_overrides: &repo_overrides,
        timestamp: Some(known.timestamp.as_str()),
        license_header: license_header.as_deref(),
    };
    let export = render_bazel(&modules, &options)?;
    if !export.skipped.is_empty() {
        tracing::warn!(
            "skipped {} module(s): {}",
            export.skipped.len(),
            export.skipped.join(", ")
        );
    }
    emit(&args.output, &export.content, args.dry_run, DryRunBanner::GeneratedContent)?;

    let kind = args.override_type.entry_kind();
    if args.dry_run {
        println!("\nGenerated {} {kind} entries", export.entries);
    } else {
        println!(
            "Generated {} with {} {kind} entries",
            args.output.display(),
            export.entries
        );
    }
    Ok(())
}

fn cmd_workspace_csv(args: WorkspaceCsvArgs) -> Result<()> {
    let known = load_known_good(&args.known_good)?;
    let modules = known.modules_in(args.group.as_deref())?;
    let csv = render_workspace_csv(&modules, args.header)?;
    emit(&args.output, &csv, args.dry_run, DryRunBanner::GeneratedContent)?;
    tracing::info!(
        "workspace metadata for {} module(s) -> {}",
        modules.len(),
        args.output.display()
    );
    Ok(())
}

fn cmd_gitmodules(args: GitmodulesArgs) -> Result<()> {
    let known = load_known_good(&args.known_good)?;
    let modules = known.modules_in(args.group.as_deref())?;
    let text = render_gitmodules(&modules)?;
    emit(&args.output, &text, args.dry_run, DryRunBanner::GeneratedContent)?;
    tracing::info!(
        "submodule entries for {} module(s) -> {}",
        modules.len(),
        args.output.display()
    );
    Ok(())
}

fn cmd_info(args: InfoArgs) -> Result<()> {
    let known = load_known_good(&args.known_good)?;
    println!("{}", info::module_field(known.find_module(&args.module), args.field));
    Ok(())
}

fn cmd_update_latest(args: UpdateLatestArgs) -> Result<ExitCode> {
    let mut known = match load_known_good(&args.known_good) {
        Ok(known) => known,
        Err(err) => {
            eprintln!("error: cannot read known_good file: {err:#}");
            return Ok(ExitCode::from(EXIT_FATAL));
        }
    };

    let source = latest::select_source(args.no_gh);
    let options = RefreshOptions {
        branch: args.branch.clone(),
        fail_fast: args.fail_fast,
    };
    let report = match refresh_latest(&mut known, source.as_ref(), &options) {
        Ok(report) => report,
        Err(err) => {
            eprintln!("error: {err:#}");
            return Ok(ExitCode::from(EXIT_FATAL));
        }
    };
    for refreshed in &report.refreshed {
        println!("{refreshed}");
    }
    if !report.skipped.is_empty() {
        tracing::debug!("modules without repo: {}", report.skipped.join(", "));
    }

    if let Some(output) = &args.output {
        if !report.refreshed.is_empty() {
            if let Err(err) = known.save(output, args.dry_run) {
                eprintln!("error: failed writing output file: {err:#}");
                return Ok(ExitCode::from(EXIT_FATAL));
            }
            if !args.dry_run {
                println!("Updated JSON written to {}", output.display());
            }
        }
    }

    if !report.failures.is_empty() {
        eprintln!("Completed with {} failure(s).", report.failures.len());
        return Ok(ExitCode::from(EXIT_PARTIAL_FAILURE));
    }
    Ok(ExitCode::SUCCESS)
}

fn cmd_git_override(args: GitOverrideArgs) -> Result<ExitCode> {
    let pins = match args
        .remote_and_hash
        .iter()
        .map(|raw| RemotePin::parse(raw))
        .collect::<Result<Vec<_>>>()
    {
        Ok(pins) => pins,
        Err(err) => {
            eprintln!("error: {err:#}");
            return Ok(ExitCode::from(EXIT_USAGE));
        }
    };
    if !args.file.is_file() {
        eprintln!("error: file not found: {}", args.file.display());
        return Ok(ExitCode::from(EXIT_USAGE));
    }

    let text = fs::read_to_string(&args.file)
        .with_context(|| format!("read {}", args.file.display()))?;
    let rewrite = rewrite_git_overrides(&text, &pins);

    if !rewrite.missing.is_empty() {
        eprintln!("error: remote(s) not found: {}", rewrite.missing.join(", "));
        if rewrite.updated.is_empty() {
            return Ok(ExitCode::FAILURE);
        }
    }
    let code = if rewrite.missing.is_empty() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    };

    if args.dry_run {
        if rewrite.changed() {
            print!("{}", rewrite.render_diff(&args.file.display().to_string()));
        } else {
            println!("No changes.");
        }
        return Ok(code);
    }

    if rewrite.changed() {
        write_atomic(&args.file, &rewrite.content)?;
    }
    for remote in &rewrite.updated {
        println!("Updated commit for remote {remote}");
    }
    Ok(code)
}
