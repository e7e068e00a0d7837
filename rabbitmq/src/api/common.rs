//! Common types and utilities for the RabbitMQ management API

use serde::{Deserialize, Deserializer};

/// Broker argument/definition tables
pub type ArgumentTable = serde_json::Map<String, serde_json::Value>;

/// Percent-encodes one path segment, so `/` becomes `%2F`
pub fn segment(value: &str) -> String {
    urlencoding::encode(value).into_owned()
}

/// Joins `/api/<collection>` with encoded segments
pub fn api_path(collection: &str, segments: &[&str]) -> String {
    let mut path = format!("/api/{}", collection);
    for s in segments {
        path.push('/');
        path.push_str(&segment(s));
    }
    path
}

#[derive(Deserialize)]
#[serde(untagged)]
enum StringOrList {
    List(Vec<String>),
    String(String),
}

/// The broker reports some list-valued fields either as a JSON array or as a
/// single (possibly comma-separated) string depending on version
pub fn deserialize_string_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<StringOrList>::deserialize(deserializer)? {
        Some(StringOrList::List(items)) => items,
        Some(StringOrList::String(s)) => s
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect(),
        None => Vec::new(),
    })
}

/// URI fields come as an array or a single string; a single string is one
/// URI even when it contains commas
pub fn deserialize_uri_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<StringOrList>::deserialize(deserializer)? {
        Some(StringOrList::List(items)) => items,
        Some(StringOrList::String(s)) if s.is_empty() => Vec::new(),
        Some(StringOrList::String(s)) => vec![s],
        None => Vec::new(),
    })
}

/// Deserializes `null` as the default value
pub fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_vhost_is_escaped_in_paths() {
        assert_eq!(api_path("exchanges", &["/", "logs"]), "/api/exchanges/%2F/logs");
        assert_eq!(
            api_path("permissions", &["dev/test", "guest"]),
            "/api/permissions/dev%2Ftest/guest"
        );
        assert_eq!(api_path("vhosts", &[]), "/api/vhosts");
    }

    #[derive(Deserialize)]
    struct Tagged {
        #[serde(deserialize_with = "deserialize_string_list", default)]
        tags: Vec<String>,
    }

    #[test]
    fn string_lists_accept_both_encodings() {
        let list: Tagged = serde_json::from_str(r#"{"tags":["administrator","monitoring"]}"#).unwrap();
        let joined: Tagged = serde_json::from_str(r#"{"tags":"administrator,monitoring"}"#).unwrap();
        let empty: Tagged = serde_json::from_str(r#"{"tags":""}"#).unwrap();

        assert_eq!(list.tags, vec!["administrator", "monitoring"]);
        assert_eq!(joined.tags, list.tags);
        assert!(empty.tags.is_empty());
    }
}
