/// Common test utilities and helpers for repomirror CLI tests
use assert_fs::prelude::*;
use assert_fs::TempDir;
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use std::process::Command;

/// Scratch directory holding a config file, a mirror target and upstream repos
pub struct TestEnvironment {
    pub temp_dir: TempDir,
    pub target: PathBuf,
    pub upstream: PathBuf,
}

impl TestEnvironment {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        temp_dir.child("mirrors").create_dir_all().expect("Failed to create target dir");
        temp_dir.child("upstream").create_dir_all().expect("Failed to create upstream dir");

        let target = temp_dir.path().join("mirrors");
        let upstream = temp_dir.path().join("upstream");

        Self {
            temp_dir,
            target,
            upstream,
        }
    }

    pub fn write_config(&self, content: &str) -> PathBuf {
        let config = self.temp_dir.child("config.ini");
        config.write_str(content).expect("Failed to write test config");
        config.path().to_path_buf()
    }

    /// Config pointing at `api_url` with the given extra `[target]` lines
    pub fn write_full_config(&self, api_url: &str, target_extra: &str) -> PathBuf {
        self.write_config(&format!(
            "[auth]\nusername = octocat\ntoken = secret\n\n[target]\npath = {}\n{}\n[api]\nurl = {}\n",
            self.target.display(),
            target_extra,
            api_url
        ))
    }

    /// Create a bare upstream repository and return its path
    pub fn create_upstream(&self, name: &str) -> PathBuf {
        let path = self.upstream.join(format!("{}.git", name));
        std::fs::create_dir_all(&path).expect("Failed to create upstream repo dir");
        let status = Command::new("git")
            .args(["init", "--bare", "--quiet"])
            .current_dir(&path)
            .status()
            .expect("Failed to run git init");
        assert!(status.success(), "git init failed for {}", name);
        path
    }
}

/// API payload entry for a repository cloned from a local path
pub fn repo_entry(owner: &str, name: &str, clone_url: &Path) -> Value {
    json!({
        "name": name,
        "full_name": format!("{}/{}", owner, name),
        "clone_url": clone_url.to_string_lossy(),
    })
}

pub fn git_available() -> bool {
    Command::new("git")
        .arg("--version")
        .output()
        .map(|output| output.status.success())
        .unwrap_or(false)
}
