use anyhow::{anyhow, Context, Result};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, USER_AGENT};
use serde::Deserialize;
use std::collections::HashSet;
use tracing::{debug, info, warn};

use crate::config::{ApiConfig, AuthConfig};

/// Media type requested from the GitHub REST API
const GITHUB_ACCEPT: &str = "application/vnd.github.v3+json";

/// A repository as reported by `GET /user/repos`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RemoteRepository {
    /// Short repository name (e.g. "hello-world")
    pub name: String,

    /// Owner-qualified name (e.g. "octocat/hello-world")
    pub full_name: String,

    /// HTTPS clone URL
    pub clone_url: String,
}

/// GitHub client wrapper authenticating with basic credentials
pub struct GitHubClient {
    http: reqwest::Client,
    auth: AuthConfig,
    api: ApiConfig,
}

impl GitHubClient {
    /// Create a new GitHub client for the given credentials and API settings
    pub fn new(auth: &AuthConfig, api: &ApiConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static(GITHUB_ACCEPT));
        headers.insert(
            USER_AGENT,
            HeaderValue::from_static(concat!("repomirror/", env!("CARGO_PKG_VERSION"))),
        );

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .build()
            .context("Failed to create GitHub client")?;

        Ok(Self {
            http,
            auth: auth.clone(),
            api: api.clone(),
        })
    }

    /// Get the authenticated username
    pub fn username(&self) -> &str {
        &self.auth.username
    }

    /// List all repositories of the authenticated user.
    ///
    /// In paginated mode pages are requested until one comes back empty;
    /// otherwise a single page is fetched. Entries repeated across pages
    /// are kept once, in first-seen order.
    pub async fn list_user_repositories(&self) -> Result<Vec<RemoteRepository>> {
        debug!("Fetching user repositories for: {}", self.username());

        let mut repositories = Vec::new();

        if self.api.paginate {
            let mut page = self.api.first_page;
            loop {
                let items = self.fetch_page(Some(page)).await?;
                if items.is_empty() {
                    break;
                }

                debug!("Page {} returned {} repositories", page, items.len());
                repositories.extend(items);
                page = page
                    .checked_add(1)
                    .ok_or_else(|| anyhow!("Pagination ran past page {}", page))?;
            }
        } else {
            repositories = self.fetch_page(None).await?;
            if repositories.len() >= usize::from(self.api.per_page) {
                warn!(
                    "Received a full page of {} repositories with pagination disabled; some may be missing",
                    repositories.len()
                );
            }
        }

        let repositories = dedup_by_full_name(repositories);

        info!("Found {} user repositories", repositories.len());
        Ok(repositories)
    }

    async fn fetch_page(&self, page: Option<u32>) -> Result<Vec<RemoteRepository>> {
        let url = format!("{}/user/repos", self.api.url);

        let mut query = vec![("per_page", self.api.per_page.to_string())];
        if let Some(page) = page {
            query.push(("page", page.to_string()));
        }

        let response = self
            .http
            .get(&url)
            .basic_auth(&self.auth.username, Some(&self.auth.token))
            .query(&query)
            .send()
            .await
            .with_context(|| format!("Failed to fetch repositories from {}", url))?
            .error_for_status()
            .with_context(|| match page {
                Some(page) => format!("GitHub API rejected repositories page {}", page),
                None => "GitHub API rejected repository listing".to_string(),
            })?;

        response
            .json::<Vec<RemoteRepository>>()
            .await
            .context("Failed to parse repository list response")
    }
}

fn dedup_by_full_name(repositories: Vec<RemoteRepository>) -> Vec<RemoteRepository> {
    let mut seen = HashSet::new();
    repositories
        .into_iter()
        .filter(|repo| {
            let first = seen.insert(repo.full_name.clone());
            if !first {
                debug!("Dropping duplicate repository entry: {}", repo.full_name);
            }
            first
        })
        .collect()
}
