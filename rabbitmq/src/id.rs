//! Resource identifier codec
//!
//! Most objects live inside a vhost and are identified as `name@vhost`.
//! Bindings have no name, so their identifier joins five segments with `/`:
//! `vhost/source/destination/destination_type/properties_key`. The vhost
//! segment is percent-encoded so a vhost such as `/` survives the split.

use crate::error::{ProviderError, Result};

const RESOURCE_ID_ERROR: &str = "unable to parse resource id";
const BINDING_ID_ERROR: &str = "Unable to determine binding ID";

pub fn encode_resource_id(name: &str, vhost: &str) -> String {
    format!("{}@{}", name, vhost)
}

/// Splits `name@vhost`; anything other than exactly one `@` is malformed
pub fn decode_resource_id(id: &str) -> Result<(String, String)> {
    let parts: Vec<&str> = id.split('@').collect();
    match parts.as_slice() {
        [name, vhost] => Ok((name.to_string(), vhost.to_string())),
        _ => Err(ProviderError::MalformedIdentifier {
            id: id.to_string(),
            reason: RESOURCE_ID_ERROR,
        }),
    }
}

/// `%` first, then `/`, so that decoding in reverse order is exact
pub fn percent_encode_slashes(s: &str) -> String {
    s.replace('%', "%25").replace('/', "%2F")
}

pub fn percent_decode_slashes(s: &str) -> String {
    s.replace("%2F", "/").replace("%25", "%")
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BindingId {
    pub vhost: String,
    pub source: String,
    pub destination: String,
    pub destination_type: String,
    pub properties_key: String,
}

pub fn encode_binding_id(id: &BindingId) -> String {
    format!(
        "{}/{}/{}/{}/{}",
        percent_encode_slashes(&id.vhost),
        id.source,
        id.destination,
        id.destination_type,
        id.properties_key
    )
}

/// Inverse of [`encode_binding_id`]
///
/// Segments past the fifth belong to the properties key, which the broker
/// derives from the routing key and may therefore contain `/`.
pub fn decode_binding_id(id: &str) -> Result<BindingId> {
    let parts: Vec<&str> = id.split('/').collect();
    if parts.len() < 5 {
        return Err(ProviderError::MalformedIdentifier {
            id: id.to_string(),
            reason: BINDING_ID_ERROR,
        });
    }

    Ok(BindingId {
        vhost: percent_decode_slashes(parts[0]),
        source: parts[1].to_string(),
        destination: parts[2].to_string(),
        destination_type: parts[3].to_string(),
        properties_key: parts[4..].join("/"),
    })
}
