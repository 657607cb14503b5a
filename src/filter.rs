//! Repository exclusion policies
//!
//! Two policies are supported, selected by the `[target]` section of the
//! config file:
//!
//! - **Exact**: a repository is skipped when its short name appears verbatim
//!   in the `excluded` list.
//! - **Glob**: a repository is skipped when its full name matches any
//!   `exclude` pattern and no `include` pattern. The include list only ever
//!   rescues repositories, it never narrows the selection.

use glob::Pattern;
use std::collections::HashSet;
use tracing::debug;

use crate::config::ConfigError;
use crate::github::RemoteRepository;

/// Decides which repositories are left out of a mirror run
#[derive(Debug, Clone, Default)]
pub enum RepoFilter {
    /// Nothing is excluded
    #[default]
    None,
    /// Short names that are excluded verbatim
    Exact(HashSet<String>),
    /// Full-name globs; `include` overrides `exclude`
    Glob {
        exclude: Vec<Pattern>,
        include: Vec<Pattern>,
    },
}

impl RepoFilter {
    /// Build an exact-match filter
    pub fn exact<I>(names: I) -> Self
    where
        I: IntoIterator<Item = String>,
    {
        Self::Exact(names.into_iter().collect())
    }

    /// Build a glob filter, rejecting malformed patterns
    pub fn glob(exclude: &[String], include: &[String]) -> Result<Self, ConfigError> {
        Ok(Self::Glob {
            exclude: compile(exclude)?,
            include: compile(include)?,
        })
    }

    /// Check whether a repository is excluded from the run
    pub fn is_excluded(&self, repo: &RemoteRepository) -> bool {
        match self {
            RepoFilter::None => false,
            RepoFilter::Exact(names) => names.contains(&repo.name),
            RepoFilter::Glob { exclude, include } => {
                let matches = |patterns: &[Pattern]| {
                    patterns.iter().any(|pattern| pattern.matches(&repo.full_name))
                };
                matches(exclude) && !matches(include)
            }
        }
    }

    /// Split repositories into (included, excluded), preserving order
    pub fn partition(
        &self,
        repos: Vec<RemoteRepository>,
    ) -> (Vec<RemoteRepository>, Vec<RemoteRepository>) {
        let (excluded, included): (Vec<_>, Vec<_>) =
            repos.into_iter().partition(|repo| self.is_excluded(repo));

        for repo in &excluded {
            debug!("Excluding repository: {}", repo.full_name);
        }

        (included, excluded)
    }
}

fn compile(patterns: &[String]) -> Result<Vec<Pattern>, ConfigError> {
    patterns
        .iter()
        .map(|pattern| {
            Pattern::new(pattern).map_err(|source| ConfigError::InvalidPattern {
                pattern: pattern.clone(),
                source,
            })
        })
        .collect()
}
