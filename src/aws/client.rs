use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use aws_config::meta::region::RegionProviderChain;
use aws_config::{BehaviorVersion, Region, SdkConfig};
use aws_sdk_ec2::error::DisplayErrorContext;
use aws_sdk_ec2::types::{Filter, Instance};
use aws_sdk_ec2::Client as Ec2Client;
use tracing::{debug, warn};

use crate::inventory::{InstanceFilter, InstanceRecord, InstanceSource, InstanceState};
use crate::{Ec2SshConfigError, Result};

/// Region used for account-level calls when nothing else is configured
pub const FALLBACK_REGION: &str = "us-east-1";

/// EC2 inventory for one credential profile
#[derive(Clone)]
pub struct Ec2Inventory {
    config: SdkConfig,
}

impl Ec2Inventory {
    /// Load AWS configuration, optionally for a named profile and home region
    pub async fn connect(profile: Option<&str>, region: Option<&str>) -> Self {
        let mut loader = aws_config::defaults(BehaviorVersion::latest());

        let region_provider = match region {
            Some(region) => RegionProviderChain::first_try(Region::new(region.to_string())),
            None => RegionProviderChain::default_provider(),
        }
        .or_else(Region::new(FALLBACK_REGION));
        loader = loader.region(region_provider);

        if let Some(profile) = profile {
            loader = loader.profile_name(profile);
        }

        let config = loader.load().await;
        debug!(
            region = ?config.region().map(|r| r.to_string()),
            profile = ?profile,
            "loaded AWS configuration"
        );

        Self { config }
    }

    fn client(&self, region: &str) -> Ec2Client {
        let conf = aws_sdk_ec2::config::Builder::from(&self.config)
            .region(Region::new(region.to_string()))
            .build();
        Ec2Client::from_conf(conf)
    }

    /// Image names by image id. The ids go in as an `image-id` filter, which
    /// leaves out deregistered or unshared images instead of failing the call.
    async fn describe_image_names(
        &self,
        client: &Ec2Client,
        image_ids: Vec<String>,
    ) -> Result<HashMap<String, String>> {
        if image_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let output = client
            .describe_images()
            .filters(Filter::builder().name("image-id").set_values(Some(image_ids)).build())
            .include_deprecated(true)
            .send()
            .await
            .map_err(|e| Ec2SshConfigError::ec2(DisplayErrorContext(e)))?;

        Ok(output
            .images()
            .iter()
            .filter_map(|image| Some((image.image_id()?.to_string(), image.name()?.to_string())))
            .collect())
    }
}

/// Image names only feed username inference, so a failed lookup leaves every
/// instance of the region without one instead of failing the region.
fn image_names_or_empty(
    region: &str,
    lookup: Result<HashMap<String, String>>,
) -> HashMap<String, String> {
    match lookup {
        Ok(names) => names,
        Err(e) => {
            warn!(region = %region, "image name lookup failed: {}", e);
            HashMap::new()
        }
    }
}

#[async_trait]
impl InstanceSource for Ec2Inventory {
    async fn regions(&self) -> Result<Vec<String>> {
        let client = Ec2Client::new(&self.config);
        let output = client
            .describe_regions()
            .send()
            .await
            .map_err(|e| Ec2SshConfigError::RegionDiscovery(DisplayErrorContext(e).to_string()))?;

        Ok(output
            .regions()
            .iter()
            .filter_map(|r| r.region_name())
            .map(String::from)
            .collect())
    }

    async fn instances(&self, region: &str, filter: &InstanceFilter) -> Result<Vec<InstanceRecord>> {
        let client = self.client(region);
        let filters = to_ec2_filters(filter);

        let mut raw = Vec::new();
        let mut next_token: Option<String> = None;
        loop {
            let output = client
                .describe_instances()
                .set_filters(Some(filters.clone()))
                .set_next_token(next_token.take())
                .send()
                .await
                .map_err(|e| Ec2SshConfigError::inventory(region, DisplayErrorContext(e)))?;

            for reservation in output.reservations() {
                raw.extend(reservation.instances().iter().cloned());
            }

            match output.next_token() {
                Some(token) if !token.is_empty() => next_token = Some(token.to_string()),
                _ => break,
            }
        }

        let mut image_ids: Vec<String> = raw
            .iter()
            .filter_map(|i| i.image_id())
            .map(String::from)
            .collect();
        image_ids.sort();
        image_ids.dedup();
        let lookup = self.describe_image_names(&client, image_ids).await;
        let image_names = image_names_or_empty(region, lookup);

        Ok(raw
            .iter()
            .filter_map(|instance| to_record(instance, region, &image_names))
            .collect())
    }
}

fn to_ec2_filters(filter: &InstanceFilter) -> Vec<Filter> {
    filter
        .entries()
        .map(|(name, values)| {
            Filter::builder()
                .name(name)
                .set_values(Some(values.to_vec()))
                .build()
        })
        .collect()
}

fn to_record(
    instance: &Instance,
    region: &str,
    image_names: &HashMap<String, String>,
) -> Option<InstanceRecord> {
    let Some(id) = instance.instance_id() else {
        warn!(region = %region, "instance without an id in DescribeInstances response");
        return None;
    };

    let tags: BTreeMap<String, String> = instance
        .tags()
        .iter()
        .filter_map(|tag| Some((tag.key()?.to_string(), tag.value().unwrap_or_default().to_string())))
        .collect();

    let state = instance
        .state()
        .and_then(|s| s.name())
        .map(|name| InstanceState::from_name(name.as_str()))
        .unwrap_or(InstanceState::Unknown);

    let image_id = instance.image_id().unwrap_or_default().to_string();

    Some(InstanceRecord {
        id: id.to_string(),
        region: region.to_string(),
        state,
        tags,
        private_ip: parse_ip(id, instance.private_ip_address()),
        public_ip: parse_ip(id, instance.public_ip_address()),
        image_name: image_names.get(&image_id).cloned(),
        image_id,
        key_name: instance.key_name().map(String::from),
    })
}

fn parse_ip(instance_id: &str, value: Option<&str>) -> Option<std::net::IpAddr> {
    let value = value.filter(|v| !v.is_empty())?;
    match value.parse() {
        Ok(ip) => Some(ip),
        Err(_) => {
            warn!(instance = %instance_id, address = %value, "ignoring unparseable IP address");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Options;
    use crate::hosts::assemble;
    use aws_sdk_ec2::types::{InstanceStateName, Tag};

    #[test]
    fn test_to_ec2_filters() {
        let filter =
            InstanceFilter::from_json(r#"{"instance-state-name": "running", "tag:Env": ["a", "b"]}"#)
                .unwrap();
        let filters = to_ec2_filters(&filter);
        assert_eq!(filters.len(), 2);
        assert_eq!(filters[0].name(), Some("instance-state-name"));
        assert_eq!(filters[0].values(), ["running".to_string()]);
        assert_eq!(filters[1].name(), Some("tag:Env"));
        assert_eq!(filters[1].values().len(), 2);
    }

    #[test]
    fn test_to_record() {
        let instance = Instance::builder()
            .instance_id("i-0abc")
            .image_id("ami-123")
            .key_name("ops")
            .private_ip_address("10.0.0.5")
            .state(
                aws_sdk_ec2::types::InstanceState::builder()
                    .name(InstanceStateName::Running)
                    .build(),
            )
            .tags(Tag::builder().key("Name").value("web1").build())
            .build();
        let mut images = HashMap::new();
        images.insert("ami-123".to_string(), "ubuntu-jammy".to_string());

        let record = to_record(&instance, "eu-west-1", &images).unwrap();
        assert_eq!(record.id, "i-0abc");
        assert_eq!(record.region, "eu-west-1");
        assert_eq!(record.state, InstanceState::Running);
        assert_eq!(record.tag("Name"), Some("web1"));
        assert_eq!(record.private_ip, Some("10.0.0.5".parse().unwrap()));
        assert_eq!(record.public_ip, None);
        assert_eq!(record.image_name.as_deref(), Some("ubuntu-jammy"));
        assert_eq!(record.key_name.as_deref(), Some("ops"));
    }

    #[test]
    fn test_failed_image_lookup_falls_back_to_default_user() {
        let instance = Instance::builder()
            .instance_id("i-0abc")
            .image_id("ami-123")
            .private_ip_address("10.0.0.5")
            .build();
        let lookup = Err(Ec2SshConfigError::ec2("InvalidAMIID.Malformed"));
        let images = image_names_or_empty("eu-west-1", lookup);
        assert!(images.is_empty());

        let record = to_record(&instance, "eu-west-1", &images).unwrap();
        assert_eq!(record.image_name, None);

        let options = Options {
            default_user: Some("admin".to_string()),
            filter: InstanceFilter::default(),
            ..Options::default()
        };
        let assembly = assemble(&[record], &options);
        assert_eq!(assembly.hosts.len(), 1);
        assert_eq!(assembly.hosts[0].username.as_deref(), Some("admin"));
    }

    #[test]
    fn test_image_lookup_result_kept() {
        let mut names = HashMap::new();
        names.insert("ami-123".to_string(), "ubuntu-jammy".to_string());
        assert_eq!(image_names_or_empty("eu-west-1", Ok(names.clone())), names);
    }

    #[test]
    fn test_to_record_without_id() {
        let instance = Instance::builder().image_id("ami-123").build();
        assert!(to_record(&instance, "eu-west-1", &HashMap::new()).is_none());
    }
}
