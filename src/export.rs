//! Read-only transforms from manifest modules to downstream artifacts.
//!
//! Exporters walk modules in manifest order so regenerated files stay
//! diff-stable for unchanged input.
pub mod bazel;
pub mod gitmodules;
pub mod workspace_csv;

pub use bazel::{render_bazel, BazelOptions, OverrideType, RepoCommitOverride};
pub use gitmodules::render_gitmodules;
pub use workspace_csv::render_workspace_csv;
