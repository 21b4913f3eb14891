use std::io::Write;
use std::path::Path;

#[cfg(unix)]
use std::os::unix::fs::OpenOptionsExt;

use tracing::{info, warn};

use super::Cli;
use crate::aws::Ec2Inventory;
use crate::config::{Options, Settings};
use crate::hosts::{assemble, render};
use crate::inventory::{collect_instances, select_regions, InstanceSource};
use crate::Result;

pub async fn execute(cli: Cli) -> Result<()> {
    let settings = match cli.config {
        Some(ref path) => Settings::load_from(path)?,
        None => Settings::load()?,
    };
    let options = cli.to_options(settings)?;

    let source = Ec2Inventory::connect(options.profile.as_deref(), options.region.as_deref()).await;
    let text = generate(&source, &options).await?;

    match cli.output {
        Some(ref path) => write_file(path, &text),
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(text.as_bytes())?;
            stdout.flush()?;
            Ok(())
        }
    }
}

/// Query every selected region and render the resulting config text.
/// Nothing is rendered unless every region could be listed.
pub async fn generate(source: &dyn InstanceSource, options: &Options) -> Result<String> {
    let regions = select_regions(source, options).await?;
    info!(regions = ?regions, "querying regions");

    let instances = collect_instances(source, &regions, &options.filter).await?;
    let assembly = assemble(&instances, options);

    for missing in &assembly.skipped {
        warn!("{}, skipped it", missing);
    }
    for renamed in &assembly.renamed {
        info!(
            instance = %renamed.instance_id,
            from = %renamed.from,
            to = %renamed.to,
            "renamed duplicate host label"
        );
    }
    info!(
        instances = instances.len(),
        hosts = assembly.hosts.len(),
        filtered_out = assembly.filtered_out,
        skipped = assembly.skipped.len(),
        renamed = assembly.renamed.len(),
        "assembled host entries"
    );
    if assembly.hosts.is_empty() {
        warn!("no host entries generated");
    }

    Ok(render(&assembly.hosts))
}

/// Write the generated config with owner-only permissions (0600)
fn write_file(path: &Path, content: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    #[cfg(unix)]
    {
        let mut file = std::fs::OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .mode(0o600)
            .open(path)?;
        file.write_all(content.as_bytes())?;
    }

    #[cfg(not(unix))]
    {
        std::fs::write(path, content)?;
    }

    info!(path = %path.display(), "wrote ssh config");
    Ok(())
}
