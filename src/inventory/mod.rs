mod filter;
mod record;

pub use filter::InstanceFilter;
pub use record::{InstanceRecord, InstanceState};

use async_trait::async_trait;
use tracing::{debug, info};

use crate::config::Options;
use crate::Result;

/// Source of instance inventory, queried one region at a time
#[async_trait]
pub trait InstanceSource: Send + Sync {
    /// All regions enabled for the account
    async fn regions(&self) -> Result<Vec<String>>;

    /// Instances in `region` matching `filter`, in API return order
    async fn instances(&self, region: &str, filter: &InstanceFilter)
        -> Result<Vec<InstanceRecord>>;
}

/// Determine the regions to query, sorted ascending.
///
/// An explicit region is used as-is, even if blacklisted. Otherwise the
/// whitelist, or every region the source knows about, minus the blacklist.
pub async fn select_regions(source: &dyn InstanceSource, options: &Options) -> Result<Vec<String>> {
    if let Some(ref region) = options.region {
        if !options.white_list_region.is_empty() {
            debug!(region = %region, "explicit region overrides the region whitelist");
        }
        return Ok(vec![region.clone()]);
    }

    let candidates = if options.white_list_region.is_empty() {
        source.regions().await?
    } else {
        options.white_list_region.clone()
    };

    let mut regions: Vec<String> = candidates
        .into_iter()
        .filter(|r| {
            let blacklisted = options.blacklisted_regions.contains(r);
            if blacklisted {
                debug!(region = %r, "skipping blacklisted region");
            }
            !blacklisted
        })
        .collect();
    regions.sort();
    regions.dedup();

    Ok(regions)
}

/// Query every region in order and merge the results.
/// Any failing region aborts the whole collection.
pub async fn collect_instances(
    source: &dyn InstanceSource,
    regions: &[String],
    filter: &InstanceFilter,
) -> Result<Vec<InstanceRecord>> {
    let mut all = Vec::new();

    for region in regions {
        let instances = source.instances(region, filter).await?;
        info!(region = %region, count = instances.len(), "listed instances");
        all.extend(instances);
    }

    Ok(all)
}
