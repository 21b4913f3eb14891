use std::collections::BTreeMap;
use std::fmt;
use std::net::IpAddr;

/// Lifecycle state of an instance as reported by EC2
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstanceState {
    Pending,
    Running,
    ShuttingDown,
    Terminated,
    Stopping,
    Stopped,
    Unknown,
}

impl InstanceState {
    /// Parse an EC2 `instance-state-name` value
    pub fn from_name(name: &str) -> Self {
        match name {
            "pending" => InstanceState::Pending,
            "running" => InstanceState::Running,
            "shutting-down" => InstanceState::ShuttingDown,
            "terminated" => InstanceState::Terminated,
            "stopping" => InstanceState::Stopping,
            "stopped" => InstanceState::Stopped,
            _ => InstanceState::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            InstanceState::Pending => "pending",
            InstanceState::Running => "running",
            InstanceState::ShuttingDown => "shutting-down",
            InstanceState::Terminated => "terminated",
            InstanceState::Stopping => "stopping",
            InstanceState::Stopped => "stopped",
            InstanceState::Unknown => "unknown",
        }
    }
}

impl fmt::Display for InstanceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Snapshot of one instance at query time
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstanceRecord {
    pub id: String,
    pub region: String,
    pub state: InstanceState,
    pub tags: BTreeMap<String, String>,
    pub private_ip: Option<IpAddr>,
    pub public_ip: Option<IpAddr>,
    pub image_id: String,
    /// Image name, filled in by the source when the image could be described
    pub image_name: Option<String>,
    /// Key pair the instance was launched with
    pub key_name: Option<String>,
}

impl InstanceRecord {
    /// Look up a tag value by key
    pub fn tag(&self, key: &str) -> Option<&str> {
        self.tags.get(key).map(String::as_str)
    }
}

#[cfg(test)]
impl InstanceRecord {
    pub fn new(id: &str, region: &str) -> Self {
        Self {
            id: id.to_string(),
            region: region.to_string(),
            state: InstanceState::Running,
            tags: BTreeMap::new(),
            private_ip: None,
            public_ip: None,
            image_id: "ami-00000000".to_string(),
            image_name: None,
            key_name: None,
        }
    }

    pub fn with_tag(mut self, key: &str, value: &str) -> Self {
        self.tags.insert(key.to_string(), value.to_string());
        self
    }

    pub fn with_private_ip(mut self, ip: &str) -> Self {
        self.private_ip = Some(ip.parse().expect("valid ip"));
        self
    }

    pub fn with_public_ip(mut self, ip: &str) -> Self {
        self.public_ip = Some(ip.parse().expect("valid ip"));
        self
    }

    pub fn with_state(mut self, state: InstanceState) -> Self {
        self.state = state;
        self
    }

    pub fn with_image(mut self, image_id: &str, image_name: Option<&str>) -> Self {
        self.image_id = image_id.to_string();
        self.image_name = image_name.map(String::from);
        self
    }

    pub fn with_key_name(mut self, key_name: &str) -> Self {
        self.key_name = Some(key_name.to_string());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_names() {
        for state in [
            InstanceState::Pending,
            InstanceState::Running,
            InstanceState::ShuttingDown,
            InstanceState::Terminated,
            InstanceState::Stopping,
            InstanceState::Stopped,
        ] {
            assert_eq!(InstanceState::from_name(state.as_str()), state);
        }
        assert_eq!(InstanceState::from_name("rebooting"), InstanceState::Unknown);
    }

    #[test]
    fn test_tag_lookup() {
        let instance = InstanceRecord::new("i-1", "us-east-1").with_tag("Name", "web1");
        assert_eq!(instance.tag("Name"), Some("web1"));
        assert_eq!(instance.tag("Env"), None);
    }
}
