pub mod generate;

use std::path::PathBuf;

use clap::Parser;

use crate::config::{expand_home, Options, Settings};
use crate::inventory::InstanceFilter;
use crate::Result;

#[derive(Parser, Debug)]
#[command(name = "ec2-ssh-config")]
#[command(about = "Generate SSH config entries for EC2 instances")]
#[command(version)]
pub struct Cli {
    /// Default ssh username to use if it can't be detected from the AMI name
    #[arg(long)]
    pub default_user: Option<String>,

    /// JSON object of filters; instances matching any of them are left out,
    /// e.g. '{"tag:Name": "bastion"}'
    #[arg(long)]
    pub exclude_filter: Option<String>,

    /// JSON object of EC2 filters to apply when querying instances
    /// [default: {"instance-state-name": "running"}]
    #[arg(long)]
    pub filter: Option<String>,

    /// Ignore SSH host key checking
    #[arg(long, overrides_with = "no_ignore_host_key")]
    pub ignore_host_key: bool,

    /// Keep SSH host key checking even if the settings file disables it
    #[arg(long, overrides_with = "ignore_host_key")]
    pub no_ignore_host_key: bool,

    /// Prefix prepended to all host names
    #[arg(long)]
    pub prefix: Option<String>,

    /// AWS credential profile to use
    #[arg(long)]
    pub profile: Option<String>,

    /// Proxy host for SSH connections, e.g. a bastion host
    #[arg(long)]
    pub proxy_host: Option<String>,

    /// Query this region only, even if blacklisted
    #[arg(long)]
    pub region: Option<String>,

    /// Location of private keys [default: ~/.ssh]
    #[arg(long)]
    pub ssh_key_dir: Option<String>,

    /// Override the ssh key to use for all hosts
    #[arg(long)]
    pub ssh_key_name: Option<String>,

    /// File extension appended to key names [default: .pem]
    #[arg(long)]
    pub ssh_key_suffix: Option<String>,

    /// Suffix appended to all host names
    #[arg(long)]
    pub suffix: Option<String>,

    /// Comma-separated tag names concatenated into the host name;
    /// instances are named by id if omitted
    #[arg(long, value_delimiter = ',')]
    pub tags: Vec<String>,

    /// Use public IP addresses instead of private ones
    #[arg(long, overrides_with = "no_use_public_ip")]
    pub use_public_ip: bool,

    /// Use private IP addresses even if the settings file says otherwise
    #[arg(long, overrides_with = "use_public_ip")]
    pub no_use_public_ip: bool,

    /// Override the ssh username for all hosts
    #[arg(long)]
    pub user: Option<String>,

    /// Regions to include; all regions are considered if omitted
    #[arg(long, num_args = 1..)]
    pub white_list_region: Vec<String>,

    /// Settings file to use instead of the default location
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Write the config to this file instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Enable debug logging on stderr
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    /// Merge command line flags over settings file values
    pub fn to_options(&self, settings: Settings) -> Result<Options> {
        let mut options = Options::from_settings(settings);

        if let Some(ref json) = self.filter {
            options.filter = InstanceFilter::from_json(json)?;
        }
        if let Some(ref json) = self.exclude_filter {
            let exclude = InstanceFilter::from_json(json)?;
            options.exclude_filter = (!exclude.is_empty()).then_some(exclude);
        }

        override_with(&mut options.default_user, &self.default_user);
        override_with(&mut options.proxy_host, &self.proxy_host);
        override_with(&mut options.profile, &self.profile);
        override_with(&mut options.region, &self.region);
        override_with(&mut options.ssh_key_name, &self.ssh_key_name);
        override_with(&mut options.user, &self.user);

        if let Some(ref prefix) = self.prefix {
            options.prefix = prefix.clone();
        }
        if let Some(ref suffix) = self.suffix {
            options.suffix = suffix.clone();
        }
        if let Some(ref dir) = self.ssh_key_dir {
            options.ssh_key_dir = expand_home(dir);
        }
        if let Some(ref suffix) = self.ssh_key_suffix {
            options.ssh_key_suffix = suffix.clone();
        }

        let tags: Vec<String> = self
            .tags
            .iter()
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .collect();
        if !tags.is_empty() {
            options.tags = tags;
        }
        if !self.white_list_region.is_empty() {
            options.white_list_region = self.white_list_region.clone();
        }

        override_flag(&mut options.ignore_host_key, self.ignore_host_key, self.no_ignore_host_key);
        override_flag(&mut options.use_public_ip, self.use_public_ip, self.no_use_public_ip);

        options.validate()?;
        Ok(options)
    }
}

/// Empty flag values are treated as not given
fn override_with(target: &mut Option<String>, flag: &Option<String>) {
    if let Some(value) = flag.as_deref().filter(|v| !v.is_empty()) {
        *target = Some(value.to_string());
    }
}

/// `--x` and `--no-x` override the settings value, the last one given wins
fn override_flag(target: &mut bool, on: bool, off: bool) {
    if on {
        *target = true;
    } else if off {
        *target = false;
    }
}
