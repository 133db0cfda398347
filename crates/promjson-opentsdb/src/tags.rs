use std::sync::LazyLock;

use promjson_model::Labels;
use regex::Regex;
use tracing::warn;

use crate::{TagError, TagResult};

static TAG_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z0-9\-./]+$").expect("tag pattern is valid"));

/// Render one `key=value` tag if both parts use the OpenTSDB tag alphabet.
///
/// # Examples
/// ```
/// use promjson_opentsdb::sanitize_tag;
///
/// assert_eq!(sanitize_tag("host", "web-1.example/a").unwrap(), "host=web-1.example/a");
/// assert!(sanitize_tag("path", "a,b").is_err());
/// ```
pub fn sanitize_tag(key: &str, value: &str) -> TagResult<String> {
    if TAG_PATTERN.is_match(key) && TAG_PATTERN.is_match(value) {
        Ok(format!("{key}={value}"))
    } else {
        Err(TagError::Invalid {
            key: key.to_string(),
            value: value.to_string(),
        })
    }
}

/// Sanitize a whole label set, in label name order.
///
/// Invalid pairs are logged and dropped. Fails only when there is nothing to render.
pub fn labels_to_tags(labels: &Labels) -> TagResult<Vec<String>> {
    if labels.is_empty() {
        return Err(TagError::Empty);
    }

    let tags: Vec<String> = labels
        .iter()
        .filter_map(|(key, value)| match sanitize_tag(key, value) {
            Ok(tag) => Some(tag),
            Err(e) => {
                warn!(key, value, "dropping tag: {e}");
                None
            }
        })
        .collect();

    if tags.is_empty() {
        return Err(TagError::AllInvalid);
    }
    Ok(tags)
}
