use crate::inventory::InstanceRecord;

/// Derive the host label of one instance.
///
/// Tag values for `tag_keys` are joined with `-` in the given order, skipping
/// missing or blank tags. The instance id is used when no tag contributes.
/// Uniqueness across instances is handled by the assembler.
pub fn resolve_label(
    instance: &InstanceRecord,
    tag_keys: &[String],
    prefix: &str,
    suffix: &str,
) -> String {
    let joined = tag_keys
        .iter()
        .filter_map(|key| instance.tag(key))
        .map(sanitize)
        .filter(|value| !value.is_empty())
        .collect::<Vec<_>>()
        .join("-");

    let stem = if joined.is_empty() {
        instance.id.as_str()
    } else {
        joined.as_str()
    };

    format!("{}{}{}", prefix, stem, suffix)
}

/// Characters ssh reads as pattern syntax on a `Host` line
const PATTERN_CHARS: &[char] = &['*', '?', '!', ',', '"'];

/// Labels must match exactly one host: whitespace runs and pattern
/// characters become `-`
fn sanitize(value: &str) -> String {
    value
        .replace(PATTERN_CHARS, " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("-")
}
