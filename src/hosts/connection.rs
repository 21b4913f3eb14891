use std::fmt;
use std::path::PathBuf;

use thiserror::Error;
use tracing::debug;

use crate::config::Options;
use crate::inventory::InstanceRecord;

/// Which address family `--use-public-ip` selected
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressKind {
    Public,
    Private,
}

impl fmt::Display for AddressKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AddressKind::Public => write!(f, "public"),
            AddressKind::Private => write!(f, "private"),
        }
    }
}

/// The instance has no address of the selected kind and cannot be listed
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Cannot find {kind} IP address for instance {instance_id}")]
pub struct MissingAddress {
    pub instance_id: String,
    pub kind: AddressKind,
}

/// Connection parameters of one instance
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Connection {
    pub address: String,
    pub username: Option<String>,
    pub key_file: Option<PathBuf>,
}

/// Default login user by image name pattern, evaluated in order.
/// `None` means the family has no ssh login user.
const IMAGE_USER_RULES: &[(&str, Option<&str>)] = &[
    ("windows", None),
    ("amzn", Some("ec2-user")),
    ("al2023", Some("ec2-user")),
    ("ubuntu", Some("ubuntu")),
    ("datastax", Some("ubuntu")),
    ("debian", Some("admin")),
    ("centos", Some("centos")),
    ("rhel", Some("ec2-user")),
    ("suse", Some("ec2-user")),
    ("coreos", Some("core")),
    ("fedora", Some("fedora")),
    ("freebsd", Some("ec2-user")),
];

pub fn resolve_connection(
    instance: &InstanceRecord,
    options: &Options,
) -> Result<Connection, MissingAddress> {
    let (address, kind) = if options.use_public_ip {
        (instance.public_ip, AddressKind::Public)
    } else {
        (instance.private_ip, AddressKind::Private)
    };

    let address = address.ok_or_else(|| MissingAddress {
        instance_id: instance.id.clone(),
        kind,
    })?;

    let username = resolve_username(instance, options);
    if username.is_none() {
        debug!(instance = %instance.id, image = %instance.image_id, "no username resolved");
    }

    let key_file = resolve_key_file(instance, options);
    if key_file.is_none() {
        debug!(instance = %instance.id, "no key file resolved");
    }

    Ok(Connection {
        address: address.to_string(),
        username,
        key_file,
    })
}

fn resolve_username(instance: &InstanceRecord, options: &Options) -> Option<String> {
    if let Some(ref user) = options.user {
        return Some(user.clone());
    }

    if let Some(user) = options.ami_users.get(&instance.image_id) {
        return Some(user.clone());
    }

    if let Some(ref image_name) = instance.image_name {
        let lowered = image_name.to_lowercase();
        if let Some((pattern, user)) = IMAGE_USER_RULES
            .iter()
            .find(|(pattern, _)| lowered.contains(pattern))
        {
            debug!(image = %image_name, pattern = %pattern, "matched image family");
            return user.map(String::from);
        }
    }

    options.default_user.clone()
}

fn resolve_key_file(instance: &InstanceRecord, options: &Options) -> Option<PathBuf> {
    let stem = options
        .ssh_key_name
        .clone()
        .or_else(|| options.ami_keys.get(&instance.image_id).cloned())
        .or_else(|| {
            instance
                .key_name
                .as_deref()
                .filter(|k| !k.trim().is_empty())
                .map(|k| k.replace(' ', "_"))
        })?;

    Some(
        options
            .ssh_key_dir
            .join(format!("{}{}", stem, options.ssh_key_suffix)),
    )
}
