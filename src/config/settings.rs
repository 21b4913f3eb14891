use directories::ProjectDirs;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::inventory::InstanceFilter;
use crate::{Ec2SshConfigError, Result};

/// Persistent defaults for ec2-ssh-config, overridden by command line flags
#[derive(Debug, Clone, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct Settings {
    pub default_user: Option<String>,
    pub filter: Option<InstanceFilter>,
    pub exclude_filter: Option<InstanceFilter>,
    pub ignore_host_key: bool,
    pub prefix: Option<String>,
    pub suffix: Option<String>,
    pub proxy_host: Option<String>,
    pub ssh_key_dir: Option<String>,
    pub ssh_key_suffix: Option<String>,
    /// Tag keys concatenated into host labels
    pub tags: Vec<String>,
    pub use_public_ip: bool,
    pub blacklisted_regions: Option<Vec<String>>,
    /// Username per image id
    pub ami_users: BTreeMap<String, String>,
    /// Key name stem per image id
    pub ami_keys: BTreeMap<String, String>,
}

impl Settings {
    /// Get the path to the config file
    pub fn config_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", "ec2-ssh-config")
            .map(|dirs| dirs.config_dir().join("config.json"))
    }

    /// Load settings from the default config file, if there is one
    pub fn load() -> Result<Self> {
        let path = Self::config_path()
            .ok_or_else(|| Ec2SshConfigError::Config("Cannot determine config directory".to_string()))?;

        if !path.exists() {
            tracing::debug!(path = %path.display(), "no settings file, using defaults");
            return Ok(Self::default());
        }

        Self::load_from(&path)
    }

    /// Load settings from an explicit path, which must exist
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Ec2SshConfigError::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        let settings: Settings = serde_json::from_str(&content).map_err(|e| {
            Ec2SshConfigError::Config(format!("Failed to parse config file {}: {}", path.display(), e))
        })?;

        for key in &settings.tags {
            Self::validate_tag_key(key)?;
        }
        tracing::debug!(path = %path.display(), "loaded settings");

        Ok(settings)
    }

    /// Validate a tag key used for host labels
    pub fn validate_tag_key(key: &str) -> Result<()> {
        if key.is_empty() {
            return Err(Ec2SshConfigError::Config("Tag key cannot be empty".to_string()));
        }
        if key.len() > 128 {
            return Err(Ec2SshConfigError::Config(
                "Tag key cannot exceed 128 characters".to_string(),
            ));
        }
        if !key.chars().all(|c| c.is_ascii() && (' '..='~').contains(&c)) {
            return Err(Ec2SshConfigError::Config(
                "Tag key must contain only ASCII printable characters".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_settings(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_validate_tag_key_valid() {
        assert!(Settings::validate_tag_key("Name").is_ok());
        assert!(Settings::validate_tag_key("Environment").is_ok());
        assert!(Settings::validate_tag_key("aws:cloudformation:stack-name").is_ok());
    }

    #[test]
    fn test_validate_tag_key_invalid() {
        assert!(Settings::validate_tag_key("").is_err());
        assert!(Settings::validate_tag_key(&"a".repeat(129)).is_err());
        assert!(Settings::validate_tag_key("tag\nkey").is_err());
    }

    #[test]
    fn test_load_from_file() {
        let file = write_settings(
            r#"{
                "default_user": "admin",
                "tags": ["Name", "Environment"],
                "exclude_filter": {"tag:Name": "bastion"},
                "ami_users": {"ami-ada2b6c4": "ubuntu"},
                "ami_keys": {"ami-ada2b6c4": "custom_key"}
            }"#,
        );
        let settings = Settings::load_from(file.path()).unwrap();
        assert_eq!(settings.default_user.as_deref(), Some("admin"));
        assert_eq!(settings.tags, vec!["Name".to_string(), "Environment".to_string()]);
        assert!(settings.exclude_filter.is_some());
        assert_eq!(settings.filter, None);
        assert_eq!(
            settings.ami_users.get("ami-ada2b6c4").map(String::as_str),
            Some("ubuntu")
        );
        assert_eq!(
            settings.ami_keys.get("ami-ada2b6c4").map(String::as_str),
            Some("custom_key")
        );
        assert!(!settings.ignore_host_key);
    }

    #[test]
    fn test_load_from_empty_object() {
        let file = write_settings("{}");
        assert_eq!(Settings::load_from(file.path()).unwrap(), Settings::default());
    }

    #[test]
    fn test_load_from_invalid() {
        let file = write_settings("{ not json");
        assert!(matches!(
            Settings::load_from(file.path()),
            Err(Ec2SshConfigError::Config(_))
        ));

        let file = write_settings(r#"{"tags": [""]}"#);
        assert!(Settings::load_from(file.path()).is_err());
    }

    #[test]
    fn test_load_from_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        assert!(Settings::load_from(&dir.path().join("absent.json")).is_err());
    }
}
