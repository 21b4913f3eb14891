use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use directories::BaseDirs;

use super::settings::Settings;
use crate::inventory::InstanceFilter;
use crate::{Ec2SshConfigError, Result};

/// Regions skipped unless explicitly requested with `--region`
pub const DEFAULT_BLACKLISTED_REGIONS: &[&str] = &["cn-north-1", "us-gov-west-1"];

pub const DEFAULT_SSH_KEY_DIR: &str = "~/.ssh";
pub const DEFAULT_SSH_KEY_SUFFIX: &str = ".pem";

/// Fully resolved generator options
#[derive(Debug, Clone, PartialEq)]
pub struct Options {
    pub default_user: Option<String>,
    pub filter: InstanceFilter,
    pub exclude_filter: Option<InstanceFilter>,
    pub ignore_host_key: bool,
    pub prefix: String,
    pub suffix: String,
    pub profile: Option<String>,
    pub proxy_host: Option<String>,
    pub region: Option<String>,
    pub ssh_key_dir: PathBuf,
    pub ssh_key_name: Option<String>,
    pub ssh_key_suffix: String,
    pub tags: Vec<String>,
    pub use_public_ip: bool,
    pub user: Option<String>,
    pub white_list_region: Vec<String>,
    pub blacklisted_regions: Vec<String>,
    /// Username per image id, checked before image name inference
    pub ami_users: BTreeMap<String, String>,
    /// Key name stem per image id, checked before the instance key pair
    pub ami_keys: BTreeMap<String, String>,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            default_user: None,
            filter: InstanceFilter::running(),
            exclude_filter: None,
            ignore_host_key: false,
            prefix: String::new(),
            suffix: String::new(),
            profile: None,
            proxy_host: None,
            region: None,
            ssh_key_dir: expand_home(DEFAULT_SSH_KEY_DIR),
            ssh_key_name: None,
            ssh_key_suffix: DEFAULT_SSH_KEY_SUFFIX.to_string(),
            tags: Vec::new(),
            use_public_ip: false,
            user: None,
            white_list_region: Vec::new(),
            blacklisted_regions: DEFAULT_BLACKLISTED_REGIONS
                .iter()
                .map(|r| r.to_string())
                .collect(),
            ami_users: BTreeMap::new(),
            ami_keys: BTreeMap::new(),
        }
    }
}

impl Options {
    /// Options seeded from the settings file, before command line overrides
    pub fn from_settings(settings: Settings) -> Self {
        let defaults = Self::default();

        Self {
            default_user: settings.default_user,
            filter: settings.filter.unwrap_or(defaults.filter),
            exclude_filter: settings.exclude_filter.filter(|f| !f.is_empty()),
            ignore_host_key: settings.ignore_host_key,
            prefix: settings.prefix.unwrap_or_default(),
            suffix: settings.suffix.unwrap_or_default(),
            proxy_host: settings.proxy_host,
            ssh_key_dir: settings
                .ssh_key_dir
                .as_deref()
                .map(expand_home)
                .unwrap_or(defaults.ssh_key_dir),
            ssh_key_suffix: settings
                .ssh_key_suffix
                .unwrap_or(defaults.ssh_key_suffix),
            tags: settings.tags,
            use_public_ip: settings.use_public_ip,
            blacklisted_regions: settings
                .blacklisted_regions
                .unwrap_or(defaults.blacklisted_regions),
            ami_users: settings.ami_users,
            ami_keys: settings.ami_keys,
            ..defaults
        }
    }

    /// Regions instances may come from, if restricted
    pub fn allowed_regions(&self) -> Option<Vec<&str>> {
        if let Some(ref region) = self.region {
            return Some(vec![region.as_str()]);
        }
        if self.white_list_region.is_empty() {
            None
        } else {
            Some(self.white_list_region.iter().map(String::as_str).collect())
        }
    }

    /// Validate values that end up verbatim in the rendered config
    pub fn validate(&self) -> Result<()> {
        for key in &self.tags {
            Settings::validate_tag_key(key)?;
        }
        ensure_no_whitespace("prefix", &self.prefix)?;
        ensure_no_whitespace("suffix", &self.suffix)?;
        if let Some(ref proxy) = self.proxy_host {
            if proxy.is_empty() {
                return Err(Ec2SshConfigError::InvalidOption(
                    "proxy host cannot be empty".to_string(),
                ));
            }
            ensure_no_whitespace("proxy host", proxy)?;
        }
        if let Some(ref name) = self.ssh_key_name {
            if name.is_empty() || name.contains('/') {
                return Err(Ec2SshConfigError::InvalidOption(format!(
                    "invalid ssh key name '{}'",
                    name
                )));
            }
        }
        self.filter.validate()?;
        if let Some(ref exclude) = self.exclude_filter {
            exclude.validate()?;
        }
        Ok(())
    }
}

fn ensure_no_whitespace(what: &str, value: &str) -> Result<()> {
    if value.chars().any(char::is_whitespace) {
        return Err(Ec2SshConfigError::InvalidOption(format!(
            "{} cannot contain whitespace: '{}'",
            what, value
        )));
    }
    Ok(())
}

/// Expand a leading `~` to the current user's home directory
pub fn expand_home(path: &str) -> PathBuf {
    let rest = match path.strip_prefix('~') {
        Some(rest) if rest.is_empty() || rest.starts_with('/') => rest.trim_start_matches('/'),
        _ => return PathBuf::from(path),
    };

    match BaseDirs::new() {
        Some(dirs) => join_home(dirs.home_dir(), rest),
        None => PathBuf::from(path),
    }
}

fn join_home(home: &Path, rest: &str) -> PathBuf {
    if rest.is_empty() {
        home.to_path_buf()
    } else {
        home.join(rest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = Options::default();
        assert_eq!(options.filter, InstanceFilter::running());
        assert_eq!(options.ssh_key_suffix, ".pem");
        assert_eq!(
            options.blacklisted_regions,
            vec!["cn-north-1".to_string(), "us-gov-west-1".to_string()]
        );
        assert!(options.validate().is_ok());
    }

    #[test]
    fn test_from_settings() {
        let settings = Settings {
            default_user: Some("admin".to_string()),
            prefix: Some("aws-".to_string()),
            ssh_key_dir: Some("/keys".to_string()),
            ssh_key_suffix: Some("".to_string()),
            tags: vec!["Name".to_string()],
            blacklisted_regions: Some(vec![]),
            ..Settings::default()
        };
        let options = Options::from_settings(settings);
        assert_eq!(options.default_user.as_deref(), Some("admin"));
        assert_eq!(options.prefix, "aws-");
        assert_eq!(options.ssh_key_dir, PathBuf::from("/keys"));
        assert_eq!(options.ssh_key_suffix, "");
        assert_eq!(options.tags, vec!["Name".to_string()]);
        assert!(options.blacklisted_regions.is_empty());
        assert_eq!(options.filter, InstanceFilter::running());
    }

    #[test]
    fn test_allowed_regions() {
        let mut options = Options::default();
        assert_eq!(options.allowed_regions(), None);

        options.white_list_region = vec!["eu-west-1".to_string(), "us-east-1".to_string()];
        assert_eq!(options.allowed_regions(), Some(vec!["eu-west-1", "us-east-1"]));

        options.region = Some("ap-south-1".to_string());
        assert_eq!(options.allowed_regions(), Some(vec!["ap-south-1"]));
    }

    #[test]
    fn test_validate_rejects_whitespace() {
        let options = Options {
            prefix: "my prefix".to_string(),
            ..Options::default()
        };
        assert!(options.validate().is_err());

        let options = Options {
            proxy_host: Some("bastion host".to_string()),
            ..Options::default()
        };
        assert!(options.validate().is_err());

        let options = Options {
            tags: vec!["".to_string()],
            ..Options::default()
        };
        assert!(options.validate().is_err());

        let options = Options {
            ssh_key_name: Some("../escape".to_string()),
            ..Options::default()
        };
        assert!(options.validate().is_err());
    }

    #[test]
    fn test_expand_home() {
        assert_eq!(expand_home("/abs/path"), PathBuf::from("/abs/path"));
        assert_eq!(expand_home("~other/keys"), PathBuf::from("~other/keys"));
        if let Some(dirs) = BaseDirs::new() {
            assert_eq!(expand_home("~/.ssh"), dirs.home_dir().join(".ssh"));
            assert_eq!(expand_home("~"), dirs.home_dir().to_path_buf());
        }
    }
}
