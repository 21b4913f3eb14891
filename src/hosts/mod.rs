mod assemble;
mod connection;
mod naming;
mod render;

pub use assemble::{assemble, Assembly};
pub use render::render;

use std::path::PathBuf;

/// One `Host` block of the generated config
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedHost {
    /// Unique across one generated config
    pub host_label: String,
    pub instance_id: String,
    pub region: String,
    pub address: String,
    pub username: Option<String>,
    pub key_file: Option<PathBuf>,
    pub proxy_host: Option<String>,
    pub ignore_host_key: bool,
}
