use crate::analyzer::{ReportMode, DEFAULT_DETAIL_LIMIT};
use crate::domain::{CustomerFilter, ReleaseVersion};
use crate::error::{Result, UpmergeError};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Name of the project-local configuration file
pub const CONFIG_FILE_NAME: &str = "upmerge.toml";

/// Complete file configuration for upmerge.
#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub upmerge: UpmergeConfig,

    #[serde(default)]
    pub check: CheckConfig,
}

fn default_remote() -> String {
    "origin".to_string()
}

fn default_true() -> bool {
    true
}

fn default_detail_limit() -> usize {
    DEFAULT_DETAIL_LIMIT
}

/// Defaults for `upmerge merge`
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct UpmergeConfig {
    #[serde(default = "default_remote")]
    pub remote: String,

    #[serde(default = "default_true")]
    pub push: bool,

    #[serde(default)]
    pub show_files: bool,

    #[serde(default)]
    pub show_details: bool,
}

impl Default for UpmergeConfig {
    fn default() -> Self {
        UpmergeConfig {
            remote: default_remote(),
            push: true,
            show_files: false,
            show_details: false,
        }
    }
}

/// Defaults for `upmerge check`
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct CheckConfig {
    #[serde(default = "default_detail_limit")]
    pub detail_limit: usize,

    #[serde(default = "default_true")]
    pub fetch: bool,
}

impl Default for CheckConfig {
    fn default() -> Self {
        CheckConfig {
            detail_limit: DEFAULT_DETAIL_LIMIT,
            fetch: true,
        }
    }
}

/// Loads configuration from file or returns defaults.
///
/// Lookup order:
/// 1. Custom path provided as parameter
/// 2. `upmerge.toml` in the current directory
/// 3. `.upmerge.toml` in the user config directory
/// 4. Built-in defaults
pub fn load_config(config_path: Option<&str>) -> Result<Config> {
    let (source, config_str) = if let Some(path) = config_path {
        (path.to_string(), read(Path::new(path))?)
    } else if Path::new(CONFIG_FILE_NAME).exists() {
        (CONFIG_FILE_NAME.to_string(), read(Path::new(CONFIG_FILE_NAME))?)
    } else if let Some(config_dir) = dirs::config_dir() {
        let path = config_dir.join(format!(".{}", CONFIG_FILE_NAME));
        if !path.exists() {
            return Ok(Config::default());
        }
        (path.display().to_string(), read(&path)?)
    } else {
        return Ok(Config::default());
    };

    tracing::debug!(%source, "loading configuration");
    toml::from_str(&config_str)
        .map_err(|e| UpmergeError::config(format!("Cannot parse {}: {}", source, e)))
}

fn read(path: &Path) -> Result<String> {
    fs::read_to_string(path)
        .map_err(|e| UpmergeError::config(format!("Cannot read {}: {}", path.display(), e)))
}

/// Parse a user-supplied release argument
pub fn parse_release(text: &str) -> Result<ReleaseVersion> {
    text.parse::<ReleaseVersion>()
        .map_err(|e| UpmergeError::precondition(e.to_string()))
}

fn validate_remote(remote: &str) -> Result<()> {
    if remote.is_empty() {
        return Err(UpmergeError::config("Remote name must not be empty"));
    }
    if remote.contains('/') || remote.chars().any(char::is_whitespace) {
        return Err(UpmergeError::config(format!(
            "Invalid remote name '{}'",
            remote
        )));
    }
    Ok(())
}

fn validate_customers(customers: &CustomerFilter) -> Result<()> {
    if let CustomerFilter::Only(name) = customers {
        if name.is_empty() || name.contains('/') || name.chars().any(char::is_whitespace) {
            return Err(UpmergeError::config(format!(
                "Invalid customer name '{}'",
                name
            )));
        }
    }
    Ok(())
}

fn validate_detail_limit(limit: usize) -> Result<()> {
    if limit == 0 {
        return Err(UpmergeError::config("detail_limit must be at least 1"));
    }
    Ok(())
}

/// Options of one upmerge run
#[derive(Debug, Clone, PartialEq)]
pub struct UpmergeOptions {
    /// Starting release; inferred from the checked-out branch when `None`
    pub release: Option<String>,
    pub remote: String,
    /// Push each merge result to its branch on the remote
    pub push: bool,
    pub customers: CustomerFilter,
    /// List files touched by each merge
    pub show_files: bool,
    /// Print the pending commits of each pair before merging it
    pub show_details: bool,
    pub detail_limit: usize,
}

impl UpmergeOptions {
    pub fn from_config(config: &Config) -> Self {
        UpmergeOptions {
            release: None,
            remote: config.upmerge.remote.clone(),
            push: config.upmerge.push,
            customers: CustomerFilter::ReleasesOnly,
            show_files: config.upmerge.show_files,
            show_details: config.upmerge.show_details,
            detail_limit: config.check.detail_limit,
        }
    }

    pub fn validate(&self) -> Result<()> {
        validate_remote(&self.remote)?;
        validate_customers(&self.customers)?;
        validate_detail_limit(self.detail_limit)?;
        self.starting_release()?;
        Ok(())
    }

    /// Explicit starting release, if one was given
    pub fn starting_release(&self) -> Result<Option<ReleaseVersion>> {
        self.release.as_deref().map(parse_release).transpose()
    }
}

impl Default for UpmergeOptions {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

/// Options of one pending-merge check
#[derive(Debug, Clone, PartialEq)]
pub struct CheckOptions {
    /// Lowest release to include; all versions when `None`
    pub release: Option<String>,
    pub remote: String,
    pub customers: CustomerFilter,
    /// Restrict the check to these branches (short or remote-qualified)
    pub branches: Vec<String>,
    pub mode: ReportMode,
    pub detail_limit: usize,
    /// Fetch before analyzing
    pub fetch: bool,
}

impl CheckOptions {
    pub fn from_config(config: &Config) -> Self {
        CheckOptions {
            release: None,
            remote: config.upmerge.remote.clone(),
            customers: CustomerFilter::ReleasesOnly,
            branches: Vec::new(),
            mode: ReportMode::Narrate,
            detail_limit: config.check.detail_limit,
            fetch: config.check.fetch,
        }
    }

    pub fn validate(&self) -> Result<()> {
        validate_remote(&self.remote)?;
        validate_customers(&self.customers)?;
        validate_detail_limit(self.detail_limit)?;
        self.starting_release()?;
        Ok(())
    }

    /// Starting release, or the lowest version when none was given
    pub fn starting_release(&self) -> Result<ReleaseVersion> {
        match self.release.as_deref() {
            Some(text) => parse_release(text),
            None => Ok(ReleaseVersion::lowest()),
        }
    }

    /// Customer filter used for classification. An explicit branch list
    /// needs every customer branch to be classified.
    pub fn effective_customers(&self) -> CustomerFilter {
        if self.branches.is_empty() {
            self.customers.clone()
        } else {
            CustomerFilter::All
        }
    }
}

impl Default for CheckOptions {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}
