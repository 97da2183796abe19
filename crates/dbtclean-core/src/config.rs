//! Configuration: dbtclean.toml, profiles.yml lookup, owner roles and credentials

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

/// Role that materializes dbt models unless told otherwise
pub const DEFAULT_ROLE: &str = "dbt_funcrole";

/// Environment variables holding the Snowflake credentials, in report order
pub const CREDENTIAL_VARS: [&str; 4] = [
    "SNOWFLAKE_ACCOUNT",
    "SNOWFLAKE_USERNAME",
    "SNOWFLAKE_PASSWORD",
    "SNOWFLAKE_ROLE",
];

/// Snowflake session settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WarehouseSettings {
    /// Virtual warehouse used for the metadata query and drops
    #[serde(default = "default_warehouse")]
    pub name: String,
}

fn default_warehouse() -> String {
    "compute_etl".to_string()
}

impl Default for WarehouseSettings {
    fn default() -> Self {
        Self {
            name: default_warehouse(),
        }
    }
}

/// How to reach the dbt project
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DbtSettings {
    /// dbt executable to invoke for `dbt ls`
    #[serde(default = "default_executable")]
    pub executable: String,

    /// Path to profiles.yml
    #[serde(default = "default_profiles")]
    pub profiles: PathBuf,

    /// dbt project directory (defaults to the working directory)
    #[serde(default)]
    pub project_dir: Option<PathBuf>,
}

fn default_executable() -> String {
    "dbt".to_string()
}

fn default_profiles() -> PathBuf {
    PathBuf::from("profiles.yml")
}

impl Default for DbtSettings {
    fn default() -> Self {
        Self {
            executable: default_executable(),
            profiles: default_profiles(),
            project_dir: None,
        }
    }
}

/// Main configuration structure (dbtclean.toml)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Warehouse session settings
    #[serde(default)]
    pub warehouse: WarehouseSettings,

    /// dbt invocation settings
    #[serde(default)]
    pub dbt: DbtSettings,

    /// Extra owner roles, added to the default role
    #[serde(default)]
    pub roles: Vec<String>,
}

impl Config {
    /// Load config from TOML file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::IoError(path.display().to_string(), e.to_string()))?;

        Self::from_toml(&contents)
    }

    /// Load config from TOML string
    pub fn from_toml(toml: &str) -> Result<Self, ConfigError> {
        toml::from_str(toml)
            .map_err(|e| ConfigError::ParseError(e.to_string()))
    }
}

/// Owner roles used to attribute warehouse objects to dbt
///
/// Always contains the default role; supplied roles extend it. Names are
/// lower-cased and deduplicated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleSet(BTreeSet<String>);

impl RoleSet {
    /// The default role set: just `dbt_funcrole`
    pub fn with_default() -> Self {
        let mut roles = BTreeSet::new();
        roles.insert(DEFAULT_ROLE.to_string());
        Self(roles)
    }

    /// Add roles to the set
    pub fn extend<I, S>(mut self, roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.0.extend(
            roles
                .into_iter()
                .map(|r| r.as_ref().trim().to_lowercase())
                .filter(|r| !r.is_empty()),
        );
        self
    }

    pub fn contains(&self, role: &str) -> bool {
        self.0.contains(&role.to_lowercase())
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn to_vec(&self) -> Vec<String> {
        self.0.iter().cloned().collect()
    }
}

impl Default for RoleSet {
    fn default() -> Self {
        Self::with_default()
    }
}

/// dbt profiles.yml
#[derive(Debug, Clone)]
pub struct Profiles {
    root: serde_yaml::Value,
}

impl Profiles {
    /// Load profiles from a YAML file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::IoError(path.display().to_string(), e.to_string()))?;

        Self::from_yaml(&contents)
    }

    /// Parse profiles from a YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        let root = serde_yaml::from_str(yaml)
            .map_err(|e| ConfigError::ParseError(e.to_string()))?;
        Ok(Self { root })
    }

    /// Resolve `<project>.outputs.<target>.database`
    pub fn resolve_database(&self, project: &str, target: &str) -> Result<String, ConfigError> {
        self.root
            .get(project)
            .and_then(|profile| profile.get("outputs"))
            .and_then(|outputs| outputs.get(target))
            .and_then(|output| output.get("database"))
            .and_then(|database| database.as_str())
            .map(str::trim)
            .filter(|database| !database.is_empty())
            .map(str::to_string)
            .ok_or_else(|| ConfigError::DatabaseNotResolved {
                project: project.to_string(),
                target: target.to_string(),
            })
    }
}

/// Snowflake credentials for the dbt user
///
/// Built once at startup and passed to the warehouse adapter.
#[derive(Clone)]
pub struct Credentials {
    pub account: String,
    pub username: String,
    pub password: String,
    pub role: String,
}

impl Credentials {
    /// Read credentials from the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Read credentials through a variable lookup
    ///
    /// Every variable must be set and non-empty; all missing names are
    /// reported together.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let values: Vec<Option<String>> = CREDENTIAL_VARS
            .iter()
            .map(|name| lookup(name).filter(|v| !v.trim().is_empty()))
            .collect();

        let missing: Vec<&'static str> = CREDENTIAL_VARS
            .iter()
            .zip(&values)
            .filter(|(_, value)| value.is_none())
            .map(|(name, _)| *name)
            .collect();

        if !missing.is_empty() {
            return Err(ConfigError::CredentialsMissing { missing });
        }

        let mut values = values.into_iter().flatten();
        Ok(Self {
            account: values.next().unwrap_or_default(),
            username: values.next().unwrap_or_default(),
            password: values.next().unwrap_or_default(),
            role: values.next().unwrap_or_default(),
        })
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("account", &self.account)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("role", &self.role)
            .finish()
    }
}

/// Config error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read {0}: {1}")]
    IoError(String, String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("No database configured for project '{project}', target '{target}' in profiles.yml")]
    DatabaseNotResolved { project: String, target: String },

    #[error("Missing Snowflake credentials: {}", .missing.join(", "))]
    CredentialsMissing { missing: Vec<&'static str> },
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;

    const PROFILES: &str = r#"
adventureworks:
  target: dev
  outputs:
    dev:
      type: snowflake
      database: ADVENTUREWORKS_DEV
      schema: staging
    prod:
      type: snowflake
      schema: marts
config:
  send_anonymous_usage_stats: false
"#;

    #[test]
    fn default_config() {
        let config = Config::default();
        assert_eq!(config.warehouse.name, "compute_etl");
        assert_eq!(config.dbt.executable, "dbt");
        assert_eq!(config.dbt.profiles, PathBuf::from("profiles.yml"));
        assert!(config.roles.is_empty());
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let config = Config::from_toml(
            r#"
roles = ["dbt_devrole"]

[warehouse]
name = "transforming"
"#,
        )
        .unwrap();

        assert_eq!(config.warehouse.name, "transforming");
        assert_eq!(config.dbt.executable, "dbt");
        assert_eq!(config.roles, vec!["dbt_devrole".to_string()]);
    }

    #[test]
    fn config_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dbtclean.toml");
        std::fs::write(&path, "[dbt]\nexecutable = \"/opt/dbt/bin/dbt\"\n").unwrap();

        let config = Config::from_file(&path).unwrap();
        assert_eq!(config.dbt.executable, "/opt/dbt/bin/dbt");
    }

    #[test]
    fn roles_extend_default() {
        let roles = RoleSet::with_default().extend(["DBT_DEVROLE", "dbt_funcrole", " "]);
        assert_eq!(roles.to_vec(), vec!["dbt_devrole".to_string(), "dbt_funcrole".to_string()]);
        assert!(roles.contains("DBT_FUNCROLE"));
    }

    #[test]
    fn resolves_target_database() {
        let profiles = Profiles::from_yaml(PROFILES).unwrap();
        assert_eq!(
            profiles.resolve_database("adventureworks", "dev").unwrap(),
            "ADVENTUREWORKS_DEV"
        );
    }

    #[test]
    fn missing_database_is_an_error() {
        let profiles = Profiles::from_yaml(PROFILES).unwrap();

        for (project, target) in [("adventureworks", "prod"), ("adventureworks", "ci"), ("other", "dev")] {
            let err = profiles.resolve_database(project, target).unwrap_err();
            assert!(matches!(err, ConfigError::DatabaseNotResolved { .. }));
        }
    }

    #[test]
    fn credentials_complete() {
        let env: HashMap<&str, &str> = [
            ("SNOWFLAKE_ACCOUNT", "xy12345"),
            ("SNOWFLAKE_USERNAME", "dbt_user"),
            ("SNOWFLAKE_PASSWORD", "secret"),
            ("SNOWFLAKE_ROLE", "dbt_funcrole"),
        ]
        .into_iter()
        .collect();

        let creds = Credentials::from_lookup(|name| env.get(name).map(|v| v.to_string())).unwrap();
        assert_eq!(creds.account, "xy12345");
        assert_eq!(creds.role, "dbt_funcrole");
        assert!(!format!("{:?}", creds).contains("secret"));
    }

    #[test]
    fn credentials_partially_set() {
        let env: HashMap<&str, &str> = [
            ("SNOWFLAKE_ACCOUNT", "xy12345"),
            ("SNOWFLAKE_PASSWORD", ""),
        ]
        .into_iter()
        .collect();

        match Credentials::from_lookup(|name| env.get(name).map(|v| v.to_string())) {
            Err(ConfigError::CredentialsMissing { missing }) => {
                assert_eq!(
                    missing,
                    vec!["SNOWFLAKE_USERNAME", "SNOWFLAKE_PASSWORD", "SNOWFLAKE_ROLE"]
                );
            }
            other => panic!("expected CredentialsMissing, got {:?}", other),
        }
    }
}
