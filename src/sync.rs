//! Sync Engine - decides and runs clone-or-update for every repository
//!
//! A run is split into an explicit check step ([`SyncEngine::plan`]) that
//! inspects the target directory, and an act step ([`SyncEngine::execute`])
//! that invokes git. The filesystem is the only state: a directory at
//! `target/<local_name>` means the mirror exists and only needs a fetch.
//! The act step checks the directory again right before running git, so an
//! earlier clone that failed never leaves a later entry fetching nothing.

use anyhow::Result;
use futures::stream::{FuturesUnordered, StreamExt};
use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

use crate::config::{LocalName, TargetConfig};
use crate::filter::RepoFilter;
use crate::git::{Git, GitExit};
use crate::github::RemoteRepository;

/// What to do with a repository that passed the filter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncAction {
    /// No local mirror yet: `git clone --mirror`
    Clone,
    /// Local mirror present: `git fetch --all --prune`
    Fetch,
}

/// A repository paired with its local location and planned action
#[derive(Debug, Clone)]
pub struct PlannedSync {
    pub repo: RemoteRepository,
    pub local_name: String,
    pub local_path: PathBuf,
    pub action: SyncAction,
}

/// Results from a complete sync operation
#[derive(Debug, Clone, Default)]
pub struct SyncSummary {
    /// Repositories a git operation was attempted for
    pub processed: usize,
    pub cloned: usize,
    pub updated: usize,
    /// Repositories skipped by the filter
    pub excluded: usize,
    /// Attempts whose git process exited non-zero (still counted as processed)
    pub failed: usize,
    pub duration: Duration,
}

/// The main sync engine that orchestrates repository mirroring
pub struct SyncEngine<G> {
    target: PathBuf,
    local_name: LocalName,
    git: G,
    jobs: usize,
}

impl<G: Git> SyncEngine<G> {
    /// Create a sequential sync engine for the configured target
    pub fn new(target: &TargetConfig, git: G) -> Self {
        Self {
            target: target.path.clone(),
            local_name: target.local_name,
            git,
            jobs: 1,
        }
    }

    /// Allow up to `jobs` git processes at once
    pub fn with_jobs(mut self, jobs: usize) -> Self {
        self.jobs = jobs.max(1);
        self
    }

    /// Decide clone or fetch for each repository, in order.
    ///
    /// A local name already claimed earlier in the plan is planned as a
    /// fetch, which is what a sequential run would find on disk once the
    /// earlier clone succeeded. [`SyncEngine::execute`] rechecks the disk.
    pub fn plan(&self, repos: &[RemoteRepository]) -> Vec<PlannedSync> {
        let mut claimed = HashSet::new();

        repos
            .iter()
            .map(|repo| {
                let local_name = self.local_name.of(repo).to_string();
                let local_path = self.target.join(&local_name);

                let action = if !claimed.insert(local_name.clone()) {
                    warn!(
                        "Local directory '{}' is shared by several repositories; {} will be fetched into it",
                        local_name, repo.full_name
                    );
                    SyncAction::Fetch
                } else if local_path.is_dir() {
                    SyncAction::Fetch
                } else {
                    SyncAction::Clone
                };

                PlannedSync {
                    repo: repo.clone(),
                    local_name,
                    local_path,
                    action,
                }
            })
            .collect()
    }

    /// Filter, plan and execute a full mirror run
    pub async fn run(
        &self,
        repos: Vec<RemoteRepository>,
        filter: &RepoFilter,
    ) -> Result<SyncSummary> {
        let start_time = Instant::now();

        let (included, excluded) = filter.partition(repos);
        info!(
            "Mirroring {} repositories ({} excluded) into {}",
            included.len(),
            excluded.len(),
            self.target.display()
        );

        let plan = self.plan(&included);
        let mut summary = self.execute(plan).await?;
        summary.excluded = excluded.len();
        summary.duration = start_time.elapsed();

        info!(
            "Sync completed in {:.2}s: {} cloned, {} updated, {} failed, {} excluded",
            summary.duration.as_secs_f64(),
            summary.cloned,
            summary.updated,
            summary.failed,
            summary.excluded
        );

        Ok(summary)
    }

    /// Run git for every planned entry.
    ///
    /// Non-zero git exits are tallied but never abort the run; only a
    /// failure to start git is returned as an error. With several jobs,
    /// entries sharing a local directory still run one after another.
    pub async fn execute(&self, plan: Vec<PlannedSync>) -> Result<SyncSummary> {
        let mut summary = SyncSummary::default();

        if self.jobs == 1 {
            for entry in &plan {
                let (action, exit) = self.sync_one(entry).await?;
                record(&mut summary, action, exit);
            }
            return Ok(summary);
        }

        debug!("Running up to {} git operations in parallel", self.jobs);

        let semaphore = Semaphore::new(self.jobs);
        let mut futures = FuturesUnordered::new();

        for group in group_by_local_name(&plan) {
            let semaphore = &semaphore;
            futures.push(async move {
                let _permit = semaphore.acquire().await?;
                let mut outcomes = Vec::with_capacity(group.len());
                for entry in group {
                    outcomes.push(self.sync_one(entry).await?);
                }
                Ok::<_, anyhow::Error>(outcomes)
            });
        }

        while let Some(result) = futures.next().await {
            for (action, exit) in result? {
                record(&mut summary, action, exit);
            }
        }

        Ok(summary)
    }

    async fn sync_one(&self, entry: &PlannedSync) -> Result<(SyncAction, GitExit)> {
        let action = if entry.local_path.is_dir() {
            SyncAction::Fetch
        } else {
            SyncAction::Clone
        };
        if action != entry.action {
            debug!(
                "{} planned as {:?} but running {:?}: '{}' changed on disk",
                entry.repo.full_name, entry.action, action, entry.local_name
            );
        }

        let exit = match action {
            SyncAction::Clone => {
                println!("→ Cloning {}\n", entry.repo.full_name);
                self.git
                    .mirror_clone(&entry.repo.clone_url, &entry.local_name, &self.target)
                    .await?
            }
            SyncAction::Fetch => {
                println!("→ Updating {}\n", entry.repo.full_name);
                self.git.fetch_prune(&entry.local_path).await?
            }
        };
        println!();

        if let GitExit::Failed(code) = exit {
            warn!(
                "git {:?} for {} exited with status {:?}",
                action, entry.repo.full_name, code
            );
        }

        Ok((action, exit))
    }
}

/// Split a plan into runs of entries that share a local directory,
/// keeping plan order inside each run and between first occurrences
fn group_by_local_name(plan: &[PlannedSync]) -> Vec<Vec<&PlannedSync>> {
    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut groups: Vec<Vec<&PlannedSync>> = Vec::new();

    for entry in plan {
        match index.get(entry.local_name.as_str()) {
            Some(&slot) => groups[slot].push(entry),
            None => {
                index.insert(&entry.local_name, groups.len());
                groups.push(vec![entry]);
            }
        }
    }

    groups
}

fn record(summary: &mut SyncSummary, action: SyncAction, exit: GitExit) {
    summary.processed += 1;
    match action {
        SyncAction::Clone => summary.cloned += 1,
        SyncAction::Fetch => summary.updated += 1,
    }
    if !exit.success() {
        summary.failed += 1;
    }
}
