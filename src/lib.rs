//! repomirror - mirror every repository of a GitHub account locally
//!
//! New repositories are mirror-cloned into the target directory; existing
//! mirrors are refreshed with `git fetch --all --prune`.
//!
//! ## Modules
//!
//! - [`config`]: INI configuration loading and validation
//! - [`github`]: Repository enumeration via the GitHub REST API
//! - [`filter`]: Exact-name and glob exclusion policies
//! - [`git`]: git process invocation
//! - [`sync`]: Clone-or-update planning and execution

pub mod config;
pub mod filter;
pub mod git;
pub mod github;
pub mod sync;

pub use config::{Config, ConfigError};
pub use filter::RepoFilter;
pub use git::{Git, GitCli, GitExit};
pub use github::{GitHubClient, RemoteRepository};
pub use sync::{SyncAction, SyncEngine, SyncSummary};
