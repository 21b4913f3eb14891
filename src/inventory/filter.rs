use serde::Deserialize;
use std::collections::BTreeMap;

use super::record::InstanceRecord;
use crate::{Ec2SshConfigError, Result};

/// One or many accepted values for a filter name
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum FilterValues {
    One(String),
    Many(Vec<String>),
}

impl FilterValues {
    pub fn as_slice(&self) -> &[String] {
        match self {
            FilterValues::One(value) => std::slice::from_ref(value),
            FilterValues::Many(values) => values,
        }
    }
}

/// EC2-style instance filter, e.g. `{"instance-state-name": "running", "tag:Env": ["prod", "stage"]}`
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct InstanceFilter {
    entries: BTreeMap<String, FilterValues>,
}

impl InstanceFilter {
    /// Filter selecting running instances only
    pub fn running() -> Self {
        let mut entries = BTreeMap::new();
        entries.insert(
            "instance-state-name".to_string(),
            FilterValues::One("running".to_string()),
        );
        Self { entries }
    }

    /// Parse a filter from its JSON object form
    pub fn from_json(json: &str) -> Result<Self> {
        let filter: InstanceFilter = serde_json::from_str(json)
            .map_err(|e| Ec2SshConfigError::InvalidFilter(format!("{}: {}", json, e)))?;
        filter.validate()?;
        Ok(filter)
    }

    pub fn validate(&self) -> Result<()> {
        for (name, values) in &self.entries {
            if name.is_empty() || name == "tag:" {
                return Err(Ec2SshConfigError::InvalidFilter(
                    "Filter name cannot be empty".to_string(),
                ));
            }
            if values.as_slice().is_empty() {
                return Err(Ec2SshConfigError::InvalidFilter(format!(
                    "Filter '{}' has no values",
                    name
                )));
            }
        }
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Filter names with their values, in name order
    pub fn entries(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.entries
            .iter()
            .map(|(name, values)| (name.as_str(), values.as_slice()))
    }

    /// Inclusion semantics: every name must match one of its values.
    /// Values support `*` and `?` wildcards. Names without a local
    /// attribute were already applied server-side and pass.
    pub fn admits(&self, instance: &InstanceRecord) -> bool {
        self.entries().all(|(name, values)| match attribute(instance, name) {
            Some(actual) => actual
                .iter()
                .any(|a| values.iter().any(|v| wildcard_match(v, a))),
            None => {
                tracing::trace!(filter = name, "filter name not evaluated locally");
                true
            }
        })
    }

    /// Exclusion semantics: any matching name rejects the instance.
    /// `tag:<Key>` matches a case-insensitive substring of the value,
    /// everything else a case-insensitive equality.
    pub fn rejects(&self, instance: &InstanceRecord) -> bool {
        self.entries().any(|(name, values)| {
            let Some(actual) = attribute(instance, name) else {
                return false;
            };
            let substring = name.starts_with("tag:");
            actual.iter().any(|a| {
                let a = a.to_lowercase();
                values.iter().any(|v| {
                    let v = v.to_lowercase();
                    if substring {
                        a.contains(&v)
                    } else {
                        a == v
                    }
                })
            })
        })
    }
}

/// Values of an instance attribute addressed by EC2 filter name.
/// `None` means the name is left to the server; an empty list means the
/// instance lacks the attribute. Address filters match any interface
/// address server-side, but records only carry the primary ones.
fn attribute(instance: &InstanceRecord, name: &str) -> Option<Vec<String>> {
    if let Some(key) = name.strip_prefix("tag:") {
        return Some(instance.tag(key).map(String::from).into_iter().collect());
    }

    let values = match name {
        "instance-id" => vec![instance.id.clone()],
        "instance-state-name" => vec![instance.state.as_str().to_string()],
        "image-id" => vec![instance.image_id.clone()],
        "key-name" => instance.key_name.iter().cloned().collect(),
        "tag-key" => instance.tags.keys().cloned().collect(),
        _ => return None,
    };
    Some(values)
}

/// EC2 filter wildcard match: `*` any run of characters, `?` exactly one
fn wildcard_match(pattern: &str, value: &str) -> bool {
    let pattern: Vec<char> = pattern.chars().collect();
    let value: Vec<char> = value.chars().collect();

    let (mut p, mut v) = (0, 0);
    let mut star: Option<(usize, usize)> = None;

    while v < value.len() {
        if p < pattern.len() && (pattern[p] == '?' || pattern[p] == value[v]) {
            p += 1;
            v += 1;
        } else if p < pattern.len() && pattern[p] == '*' {
            star = Some((p, v));
            p += 1;
        } else if let Some((sp, sv)) = star {
            p = sp + 1;
            v = sv + 1;
            star = Some((sp, sv + 1));
        } else {
            return false;
        }
    }

    pattern[p..].iter().all(|&c| c == '*')
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inventory::InstanceState;

    #[test]
    fn test_parse_single_and_many_values() {
        let filter =
            InstanceFilter::from_json(r#"{"instance-state-name": "running", "tag:Env": ["prod", "stage"]}"#)
                .unwrap();
        let entries: Vec<_> = filter.entries().collect();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].0, "instance-state-name");
        assert_eq!(entries[0].1, ["running".to_string()]);
        assert_eq!(entries[1].1.len(), 2);
    }

    #[test]
    fn test_parse_invalid() {
        assert!(InstanceFilter::from_json("not json").is_err());
        assert!(InstanceFilter::from_json(r#"["running"]"#).is_err());
        assert!(InstanceFilter::from_json(r#"{"tag:Name": []}"#).is_err());
        assert!(InstanceFilter::from_json(r#"{"": "x"}"#).is_err());
    }

    #[test]
    fn test_running_filter() {
        let filter = InstanceFilter::running();
        let running = InstanceRecord::new("i-1", "us-east-1");
        let stopped = InstanceRecord::new("i-2", "us-east-1").with_state(InstanceState::Stopped);
        assert!(filter.admits(&running));
        assert!(!filter.admits(&stopped));
    }

    #[test]
    fn test_admits_requires_every_name() {
        let filter =
            InstanceFilter::from_json(r#"{"instance-state-name": "running", "tag:Env": "prod"}"#)
                .unwrap();
        let prod = InstanceRecord::new("i-1", "us-east-1").with_tag("Env", "prod");
        let dev = InstanceRecord::new("i-2", "us-east-1").with_tag("Env", "dev");
        let untagged = InstanceRecord::new("i-3", "us-east-1");
        assert!(filter.admits(&prod));
        assert!(!filter.admits(&dev));
        assert!(!filter.admits(&untagged));
    }

    #[test]
    fn test_admits_wildcards_and_unknown_names() {
        let filter =
            InstanceFilter::from_json(r#"{"tag:Name": "web-*", "vpc-id": "vpc-123"}"#).unwrap();
        assert!(filter.admits(&InstanceRecord::new("i-1", "r").with_tag("Name", "web-01")));
        assert!(!filter.admits(&InstanceRecord::new("i-2", "r").with_tag("Name", "db-01")));
    }

    #[test]
    fn test_address_filters_left_to_server() {
        let filter = InstanceFilter::from_json(
            r#"{"private-ip-address": "10.0.0.99", "ip-address": "54.0.0.99"}"#,
        )
        .unwrap();
        let secondary = InstanceRecord::new("i-1", "r")
            .with_private_ip("10.0.0.5")
            .with_public_ip("54.0.0.5");
        assert!(filter.admits(&secondary));
        assert!(!filter.rejects(&secondary));
    }

    #[test]
    fn test_rejects_tag_substring_case_insensitive() {
        let filter = InstanceFilter::from_json(r#"{"tag:Name": "bastion"}"#).unwrap();
        assert!(filter.rejects(&InstanceRecord::new("i-1", "r").with_tag("Name", "bastion")));
        assert!(filter.rejects(&InstanceRecord::new("i-2", "r").with_tag("Name", "prod-Bastion-1")));
        assert!(!filter.rejects(&InstanceRecord::new("i-3", "r").with_tag("Name", "web1")));
        assert!(!filter.rejects(&InstanceRecord::new("i-4", "r")));
    }

    #[test]
    fn test_rejects_attribute_equality() {
        let filter = InstanceFilter::from_json(r#"{"instance-id": "I-ABC", "foo": "bar"}"#).unwrap();
        assert!(filter.rejects(&InstanceRecord::new("i-abc", "r")));
        assert!(!filter.rejects(&InstanceRecord::new("i-abcd", "r")));
    }

    #[test]
    fn test_wildcard_match() {
        assert!(wildcard_match("*", ""));
        assert!(wildcard_match("web-*", "web-"));
        assert!(wildcard_match("w?b*-1", "web-prod-1"));
        assert!(wildcard_match("*prod*", "eu-prod-db"));
        assert!(!wildcard_match("web", "web1"));
        assert!(!wildcard_match("w?b", "wb"));
    }
}
