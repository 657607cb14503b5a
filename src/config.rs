use dirs::config_dir;
use ini::{Ini, ParseOption, Properties};
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::filter::RepoFilter;
use crate::github::RemoteRepository;

/// Default GitHub API endpoint
pub const DEFAULT_API_URL: &str = "https://api.github.com";

/// File name looked up in the working directory before the XDG location
pub const CONFIG_FILE_NAME: &str = "config.ini";

/// Errors raised while loading and validating the configuration file.
///
/// Every variant terminates the run with exit status 1 before any
/// network or git activity takes place.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] ini::ParseError),

    #[error("Missing required setting '{key}' in section [{section}]")]
    MissingField {
        section: &'static str,
        key: &'static str,
    },

    #[error("Path '{}' doesn't exist, aborting", .0.display())]
    TargetNotFound(PathBuf),

    #[error("Invalid value for '{key}': {value}")]
    InvalidValue { key: &'static str, value: String },

    #[error("Invalid glob pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: glob::PatternError,
    },

    #[error("'excluded' cannot be combined with 'exclude'/'include' in section [target]")]
    ConflictingFilters,

    #[error("Could not determine a config file location")]
    NoConfigLocation,
}

/// Main configuration structure, loaded once per run and never mutated
#[derive(Debug, Clone)]
pub struct Config {
    /// GitHub credentials
    pub auth: AuthConfig,

    /// Local mirror directory and repository selection
    pub target: TargetConfig,

    /// Remote API settings
    pub api: ApiConfig,
}

/// Basic-auth credentials for the GitHub API
#[derive(Clone)]
pub struct AuthConfig {
    pub username: String,
    pub token: String,
}

impl fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthConfig")
            .field("username", &self.username)
            .field("token", &"<redacted>")
            .finish()
    }
}

/// Target directory settings
#[derive(Debug, Clone)]
pub struct TargetConfig {
    /// Existing directory that holds the mirrors
    pub path: PathBuf,

    /// Which repository identifier names the local directory
    pub local_name: LocalName,

    /// Repository exclusion policy
    pub filter: RepoFilter,
}

/// Identifier used for the directory of a mirror under the target path
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LocalName {
    /// Short repository name (`target/<name>`)
    #[default]
    Name,
    /// Owner-qualified name (`target/<owner>/<name>`)
    FullName,
}

impl LocalName {
    /// Pick the identifier for `repo` according to this setting
    pub fn of<'a>(&self, repo: &'a RemoteRepository) -> &'a str {
        match self {
            LocalName::Name => &repo.name,
            LocalName::FullName => &repo.full_name,
        }
    }
}

/// Remote API settings
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Base URL of the API, without trailing slash
    pub url: String,

    /// Results requested per call (GitHub caps this at 100)
    pub per_page: u8,

    /// Keep requesting pages until an empty one is returned
    pub paginate: bool,

    /// Number of the first page requested in paginated mode
    pub first_page: u32,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_API_URL.to_string(),
            per_page: 100,
            paginate: true,
            first_page: 0,
        }
    }
}

impl Config {
    /// Load configuration from a specific file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        tracing::debug!("Loaded config file: {:?}", path);
        Self::from_ini_str(&content)
    }

    /// Parse and validate configuration from INI text
    pub fn from_ini_str(content: &str) -> Result<Self, ConfigError> {
        let options = ParseOption {
            enabled_indented_mutiline_value: true,
            ..ParseOption::default()
        };
        let ini = Ini::load_from_str_opt(content, options)?;

        let auth = ini.section(Some("auth"));
        let target = ini.section(Some("target"));
        let api = ini.section(Some("api"));

        let username = required(auth, "auth", "username")?;
        let token = required(auth, "auth", "token")?;
        let raw_path = required(target, "target", "path")?;

        let path = expand_path(&raw_path)?;
        if !path.is_dir() {
            return Err(ConfigError::TargetNotFound(PathBuf::from(raw_path)));
        }

        let local_name = match optional(target, "local_name").as_deref() {
            None | Some("name") => LocalName::Name,
            Some("full_name") => LocalName::FullName,
            Some(other) => {
                return Err(ConfigError::InvalidValue {
                    key: "local_name",
                    value: other.to_string(),
                })
            }
        };

        let filter = parse_filter(target)?;
        let api = parse_api(api)?;

        Ok(Self {
            auth: AuthConfig { username, token },
            target: TargetConfig {
                path,
                local_name,
                filter,
            },
            api,
        })
    }

    /// Resolve the config file to use.
    ///
    /// An explicit path wins; otherwise `config.ini` in the working directory,
    /// falling back to the XDG config location.
    pub fn resolve_path(explicit: Option<PathBuf>) -> Result<PathBuf, ConfigError> {
        if let Some(path) = explicit {
            return Ok(path);
        }

        let local = PathBuf::from(CONFIG_FILE_NAME);
        if local.is_file() {
            return Ok(local);
        }

        Self::default_config_path()
    }

    /// Get the default configuration file path (XDG compliant)
    pub fn default_config_path() -> Result<PathBuf, ConfigError> {
        let config_dir = config_dir().ok_or(ConfigError::NoConfigLocation)?;

        Ok(config_dir.join("repomirror").join(CONFIG_FILE_NAME))
    }
}

fn optional(section: Option<&Properties>, key: &str) -> Option<String> {
    section
        .and_then(|props| props.get(key))
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn required(
    section: Option<&Properties>,
    section_name: &'static str,
    key: &'static str,
) -> Result<String, ConfigError> {
    optional(section, key).ok_or(ConfigError::MissingField {
        section: section_name,
        key,
    })
}

/// Split a newline-delimited list value into its non-blank entries.
///
/// A value written as `key =` followed by indented lines starts with an
/// empty line; that line is blank and therefore dropped like any other.
pub fn parse_list(raw: Option<&str>) -> Vec<String> {
    raw.unwrap_or_default()
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

fn parse_filter(target: Option<&Properties>) -> Result<RepoFilter, ConfigError> {
    let get = |key: &str| target.and_then(|props| props.get(key));

    let has_exact = get("excluded").is_some();
    let has_glob = get("exclude").is_some() || get("include").is_some();

    match (has_exact, has_glob) {
        (true, true) => Err(ConfigError::ConflictingFilters),
        (true, false) => Ok(RepoFilter::exact(parse_list(get("excluded")))),
        (false, true) => RepoFilter::glob(&parse_list(get("exclude")), &parse_list(get("include"))),
        (false, false) => Ok(RepoFilter::None),
    }
}

fn parse_api(api: Option<&Properties>) -> Result<ApiConfig, ConfigError> {
    let defaults = ApiConfig::default();

    let url = optional(api, "url")
        .map(|url| url.trim_end_matches('/').to_string())
        .unwrap_or(defaults.url);

    let per_page = match optional(api, "per_page") {
        Some(raw) => raw
            .parse::<u8>()
            .ok()
            .filter(|n| (1..=100).contains(n))
            .ok_or(ConfigError::InvalidValue {
                key: "per_page",
                value: raw,
            })?,
        None => defaults.per_page,
    };

    let paginate = match optional(api, "paginate") {
        Some(raw) => parse_bool(&raw).ok_or(ConfigError::InvalidValue {
            key: "paginate",
            value: raw,
        })?,
        None => defaults.paginate,
    };

    let first_page = match optional(api, "first_page") {
        Some(raw) => raw.parse::<u32>().map_err(|_| ConfigError::InvalidValue {
            key: "first_page",
            value: raw,
        })?,
        None => defaults.first_page,
    };

    Ok(ApiConfig {
        url,
        per_page,
        paginate,
        first_page,
    })
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "1" | "yes" | "true" | "on" => Some(true),
        "0" | "no" | "false" | "off" => Some(false),
        _ => None,
    }
}

fn expand_path(raw: &str) -> Result<PathBuf, ConfigError> {
    shellexpand::full(raw)
        .map(|expanded| PathBuf::from(expanded.as_ref()))
        .map_err(|e| ConfigError::InvalidValue {
            key: "path",
            value: e.to_string(),
        })
}
