use std::collections::HashSet;

use tracing::debug;

use super::connection::{resolve_connection, MissingAddress};
use super::naming::resolve_label;
use super::ResolvedHost;
use crate::config::Options;
use crate::inventory::InstanceRecord;

/// A label changed to keep host labels unique
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Renamed {
    pub instance_id: String,
    pub from: String,
    pub to: String,
}

/// Assembled hosts plus what happened to the instances that did not make it
#[derive(Debug, Clone, Default)]
pub struct Assembly {
    pub hosts: Vec<ResolvedHost>,
    /// Instances removed by the region whitelist or the filters
    pub filtered_out: usize,
    pub skipped: Vec<MissingAddress>,
    pub renamed: Vec<Renamed>,
}

/// Turn raw instances into uniquely labelled hosts, ordered by region and
/// then by discovery order within each region.
pub fn assemble(instances: &[InstanceRecord], options: &Options) -> Assembly {
    let allowed_regions = options.allowed_regions();

    let mut survivors: Vec<&InstanceRecord> = instances
        .iter()
        .filter(|i| match allowed_regions {
            Some(ref regions) => regions.contains(&i.region.as_str()),
            None => true,
        })
        .filter(|i| options.filter.admits(i))
        .filter(|i| match options.exclude_filter {
            Some(ref exclude) if exclude.rejects(i) => {
                debug!(instance = %i.id, "excluded by exclude filter");
                false
            }
            _ => true,
        })
        .collect();
    let filtered_out = instances.len() - survivors.len();

    // stable: keeps discovery order within a region
    survivors.sort_by(|a, b| a.region.cmp(&b.region));

    let mut skipped = Vec::new();
    let mut resolved = Vec::with_capacity(survivors.len());
    for instance in survivors {
        match resolve_connection(instance, options) {
            Ok(connection) => {
                let label = resolve_label(instance, &options.tags, &options.prefix, &options.suffix);
                resolved.push((label, instance, connection));
            }
            Err(missing) => skipped.push(missing),
        }
    }

    let mut labels = LabelAllocator::new(resolved.iter().map(|(label, _, _)| label.as_str()));
    let mut renamed = Vec::new();
    let hosts = resolved
        .into_iter()
        .map(|(base, instance, connection)| {
            let host_label = labels.allocate(&base);
            if host_label != base {
                renamed.push(Renamed {
                    instance_id: instance.id.clone(),
                    from: base,
                    to: host_label.clone(),
                });
            }

            ResolvedHost {
                host_label,
                instance_id: instance.id.clone(),
                region: instance.region.clone(),
                address: connection.address,
                username: connection.username,
                key_file: connection.key_file,
                proxy_host: options.proxy_host.clone(),
                ignore_host_key: options.ignore_host_key,
            }
        })
        .collect();

    Assembly {
        hosts,
        filtered_out,
        skipped,
        renamed,
    }
}

/// Hands out unique labels. The first instance with a label keeps it, later
/// ones get `-2`, `-3`, ... Candidates that another instance uses as its own
/// label are never handed out.
struct LabelAllocator {
    reserved: HashSet<String>,
    taken: HashSet<String>,
}

impl LabelAllocator {
    fn new<'a>(base_labels: impl Iterator<Item = &'a str>) -> Self {
        Self {
            reserved: base_labels.map(String::from).collect(),
            taken: HashSet::new(),
        }
    }

    fn allocate(&mut self, base: &str) -> String {
        if self.taken.insert(base.to_string()) {
            return base.to_string();
        }

        let mut n = 2;
        loop {
            let candidate = format!("{}-{}", base, n);
            if !self.reserved.contains(&candidate) && self.taken.insert(candidate.clone()) {
                return candidate;
            }
            n += 1;
        }
    }
}
