//! Project and user configuration for `glt`.
//!
//! Project config lives at `.glt/config.toml` in the working directory, user
//! config at `<config_dir>/glt/config.toml`. Both are optional; every field
//! has a default.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};

use crate::error::LabeltimeError;

/// Environment variable overriding the GitLab project.
pub const PROJECT_ENV: &str = "GLT_PROJECT";
/// Environment variable overriding the GitLab base URL.
pub const URL_ENV: &str = "GITLAB_URL";
/// Environment variable holding the API token.
pub const TOKEN_ENV: &str = "GITLAB_TOKEN";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProjectConfig {
    #[serde(default)]
    pub gitlab: GitlabConfig,
    #[serde(default)]
    pub analysis: AnalysisConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitlabConfig {
    #[serde(default = "default_gitlab_url")]
    pub url: String,
    /// Numeric project id or `group/project` path.
    #[serde(default)]
    pub project: Option<String>,
}

impl Default for GitlabConfig {
    fn default() -> Self {
        Self {
            url: default_gitlab_url(),
            project: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// Only items updated within this many days are analysed.
    #[serde(default = "default_days")]
    pub days: u32,
    /// Workflow lane labels reported by `glt analyze --lanes`.
    #[serde(default = "default_lane_labels")]
    pub lane_labels: Vec<String>,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            days: default_days(),
            lane_labels: default_lane_labels(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct UserConfig {
    #[serde(default)]
    pub output: Option<String>,
    #[serde(default)]
    pub gitlab_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EffectiveConfig {
    pub project: ProjectConfig,
    pub user: UserConfig,
}

impl EffectiveConfig {
    /// GitLab base URL: `GITLAB_URL`, then project config, then user config.
    #[must_use]
    pub fn gitlab_url(&self) -> String {
        resolve_gitlab_url(
            env::var(URL_ENV).ok(),
            &self.project.gitlab,
            self.user.gitlab_url.as_deref(),
        )
    }

    /// GitLab project: explicit flag, then `GLT_PROJECT`, then project config.
    ///
    /// # Errors
    ///
    /// [`LabeltimeError::ProjectNotConfigured`] when no source names one.
    pub fn project(&self, flag: Option<&str>) -> Result<String, LabeltimeError> {
        flag.map(str::to_string)
            .or_else(|| env::var(PROJECT_ENV).ok())
            .or_else(|| self.project.gitlab.project.clone())
            .filter(|project| !project.trim().is_empty())
            .ok_or(LabeltimeError::ProjectNotConfigured)
    }
}

fn resolve_gitlab_url(env_url: Option<String>, project: &GitlabConfig, user: Option<&str>) -> String {
    if let Some(url) = env_url.filter(|url| !url.trim().is_empty()) {
        return url;
    }
    if project.url != default_gitlab_url() {
        return project.url.clone();
    }
    user.map_or_else(|| project.url.clone(), str::to_string)
}

#[must_use]
pub fn project_config_path(project_root: &Path) -> PathBuf {
    project_root.join(".glt/config.toml")
}

#[must_use]
pub fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("glt/config.toml"))
}

pub fn load_project_config(project_root: &Path) -> Result<ProjectConfig> {
    let path = project_config_path(project_root);
    if !path.exists() {
        return Ok(ProjectConfig::default());
    }

    let content = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    toml::from_str::<ProjectConfig>(&content).map_err(|err| {
        LabeltimeError::ConfigParse {
            path,
            reason: err.to_string(),
        }
        .into()
    })
}

pub fn load_user_config() -> Result<UserConfig> {
    let Some(path) = user_config_path() else {
        return Ok(UserConfig::default());
    };
    if !path.exists() {
        return Ok(UserConfig::default());
    }

    let content = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    toml::from_str::<UserConfig>(&content).map_err(|err| {
        LabeltimeError::ConfigParse {
            path,
            reason: err.to_string(),
        }
        .into()
    })
}

pub fn resolve_config(project_root: &Path) -> Result<EffectiveConfig> {
    Ok(EffectiveConfig {
        project: load_project_config(project_root)?,
        user: load_user_config()?,
    })
}

fn default_gitlab_url() -> String {
    "https://gitlab.com/".to_string()
}

const fn default_days() -> u32 {
    14
}

fn default_lane_labels() -> Vec<String> {
    [
        "workflow::selected",
        "workflow::todo",
        "workflow::wip",
        "workflow::review",
        "workflow::testing",
    ]
    .iter()
    .map(ToString::to_string)
    .collect()
}
