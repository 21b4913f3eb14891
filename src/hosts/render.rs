use std::borrow::Cow;

use super::ResolvedHost;

const INDENT: &str = "    ";

/// Render hosts as ssh_config blocks separated by one blank line
pub fn render(hosts: &[ResolvedHost]) -> String {
    hosts
        .iter()
        .map(render_block)
        .collect::<Vec<_>>()
        .join("\n")
}

fn render_block(host: &ResolvedHost) -> String {
    let mut block = format!("# {} ({})\n", host.instance_id, host.region);
    block.push_str(&format!("Host {}\n", host.host_label));

    push_directive(&mut block, "HostName", &host.address);
    if let Some(ref user) = host.username {
        push_directive(&mut block, "User", user);
    }
    if let Some(ref key_file) = host.key_file {
        push_directive(&mut block, "IdentityFile", &key_file.to_string_lossy());
    }
    if let Some(ref proxy) = host.proxy_host {
        push_directive(&mut block, "ProxyJump", proxy);
    }
    if host.ignore_host_key {
        push_directive(&mut block, "StrictHostKeyChecking", "no");
        push_directive(&mut block, "UserKnownHostsFile", "/dev/null");
    }

    block
}

fn push_directive(block: &mut String, keyword: &str, value: &str) {
    block.push_str(&format!("{}{} {}\n", INDENT, keyword, quote(value)));
}

/// Quote values the ssh_config tokenizer would otherwise split
fn quote(value: &str) -> Cow<'_, str> {
    if value.chars().any(char::is_whitespace) {
        Cow::Owned(format!("\"{}\"", value))
    } else {
        Cow::Borrowed(value)
    }
}
