use serde_json::Value;

/// Helpers for pulling identifiers out of API responses
pub struct ResponseParser;

impl ResponseParser {
    /// Numeric identifier under `field`; numeric strings are accepted too
    pub fn extract_id(response: &Value, field: &str) -> Option<u64> {
        match response.get(field)? {
            Value::Number(n) => n.as_u64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Non-empty string under `field`
    pub fn extract_str<'a>(response: &'a Value, field: &str) -> Option<&'a str> {
        response
            .get(field)
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
    }

    /// Ids of the links embedded in a linkpage record
    pub fn extract_link_ids(linkpage: &Value) -> Vec<u64> {
        linkpage
            .get("links")
            .and_then(Value::as_array)
            .map(|links| {
                links
                    .iter()
                    .filter_map(|link| Self::extract_id(link, "id"))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Top-level keys of an object response, in response order
    pub fn top_level_keys(response: &Value) -> Vec<String> {
        response
            .as_object()
            .map(|map| map.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Human-readable `status` of a media record
    pub fn media_status(media: &Value) -> Option<&str> {
        Self::extract_str(media, "status")
    }
}
