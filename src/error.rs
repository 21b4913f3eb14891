use thiserror::Error;

#[derive(Error, Debug)]
pub enum Ec2SshConfigError {
    // AWS Errors
    #[error("AWS EC2 error: {0}")]
    Ec2(String),

    #[error("Failed to list regions: {0}")]
    RegionDiscovery(String),

    #[error("Failed to list instances in region {region}: {message}")]
    Inventory { region: String, message: String },

    // Option Errors
    #[error("Invalid filter: {0}")]
    InvalidFilter(String),

    #[error("Invalid option: {0}")]
    InvalidOption(String),

    // Config Errors
    #[error("Configuration error: {0}")]
    Config(String),

    // File/IO Errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Ec2SshConfigError {
    pub fn ec2(err: impl std::fmt::Display) -> Self {
        Ec2SshConfigError::Ec2(err.to_string())
    }

    pub fn inventory(region: &str, err: impl std::fmt::Display) -> Self {
        Ec2SshConfigError::Inventory {
            region: region.to_string(),
            message: err.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Ec2SshConfigError>;
