//! Helpers shared by the resource adapters
//!
//! Each adapter keeps its own model type and API calls; what lives here is
//! the plumbing between those and the tfplug request/response types.

use crate::api::common::ArgumentTable;
use crate::api::vhosts::Limits;
use crate::api::ApiError;
use crate::error::{Action, ProviderError, Result};
use crate::RabbitMqProviderData;
use serde_json::Value;
use std::any::Any;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tfplug::context::Context;
use tfplug::resource::{
    ImportResourceStateRequest, ImportResourceStateResponse, ImportedResource,
    ReadResourceRequest, Resource,
};
use tfplug::types::{AttributePath, Diagnostic, Dynamic, DynamicValue};

pub(crate) fn not_configured() -> Diagnostic {
    Diagnostic::error(
        "Provider not configured",
        "Provider data was not properly configured",
    )
}

/// Downcasts the provider data handed to `configure`
pub(crate) fn provider_data_from(
    provider_data: Option<Arc<dyn Any + Send + Sync>>,
) -> (Option<RabbitMqProviderData>, Vec<Diagnostic>) {
    match provider_data {
        Some(data) => match data.downcast_ref::<RabbitMqProviderData>() {
            Some(data) => (Some(data.clone()), vec![]),
            None => (
                None,
                vec![Diagnostic::error(
                    "Invalid provider data",
                    "Failed to extract RabbitMqProviderData from provider data",
                )],
            ),
        },
        None => (
            None,
            vec![Diagnostic::error(
                "No provider data",
                "No provider data was provided to the resource",
            )],
        ),
    }
}

fn attribute_error(name: &str, e: tfplug::TfplugError) -> ProviderError {
    ProviderError::invalid_attribute(name, e)
}

pub(crate) fn required_string(state: &DynamicValue, name: &str) -> Result<String> {
    state
        .get_optional_string(&AttributePath::new(name))
        .map_err(|e| attribute_error(name, e))?
        .ok_or_else(|| ProviderError::invalid_attribute(name, "value is required"))
}

pub(crate) fn optional_string(state: &DynamicValue, name: &str) -> Result<Option<String>> {
    state
        .get_optional_string(&AttributePath::new(name))
        .map_err(|e| attribute_error(name, e))
}

pub(crate) fn string_or(state: &DynamicValue, name: &str, default: &str) -> Result<String> {
    Ok(optional_string(state, name)?.unwrap_or_else(|| default.to_string()))
}

pub(crate) fn bool_or(state: &DynamicValue, name: &str, default: bool) -> Result<bool> {
    Ok(state
        .get_optional_bool(&AttributePath::new(name))
        .map_err(|e| attribute_error(name, e))?
        .unwrap_or(default))
}

pub(crate) fn optional_i64(state: &DynamicValue, name: &str) -> Result<Option<i64>> {
    Ok(state
        .get_optional_number(&AttributePath::new(name))
        .map_err(|e| attribute_error(name, e))?
        .map(|n| n as i64))
}

pub(crate) fn string_list(state: &DynamicValue, name: &str) -> Result<Vec<String>> {
    let items = state
        .get_optional_list(&AttributePath::new(name))
        .map_err(|e| attribute_error(name, e))?
        .unwrap_or_default();
    Ok(items
        .iter()
        .filter_map(|v| v.as_str().map(str::to_string))
        .collect())
}

/// A `map(string)` attribute; null entries are dropped
pub(crate) fn string_map(state: &DynamicValue, name: &str) -> Result<BTreeMap<String, String>> {
    let map = state
        .get_optional_map(&AttributePath::new(name))
        .map_err(|e| attribute_error(name, e))?
        .unwrap_or_default();
    Ok(map
        .into_iter()
        .filter_map(|(k, v)| v.as_str().map(|s| (k, s.to_string())))
        .collect())
}

/// Nested block instances as standalone objects
pub(crate) fn blocks(state: &DynamicValue, name: &str) -> Result<Vec<DynamicValue>> {
    Ok(state
        .get_optional_list(&AttributePath::new(name))
        .map_err(|e| attribute_error(name, e))?
        .unwrap_or_default()
        .into_iter()
        .filter(|v| !v.is_null())
        .map(DynamicValue::new)
        .collect())
}

/// The single instance of a `max_items = 1` block, or an empty object
pub(crate) fn single_block(state: &DynamicValue, name: &str) -> Result<DynamicValue> {
    Ok(blocks(state, name)?
        .into_iter()
        .next()
        .unwrap_or_else(DynamicValue::object))
}

pub(crate) fn string_value(s: impl Into<String>) -> Dynamic {
    Dynamic::String(s.into())
}

pub(crate) fn optional_value(s: Option<String>) -> Dynamic {
    s.map(Dynamic::String).unwrap_or(Dynamic::Null)
}

pub(crate) fn string_map_value<'a, I>(entries: I) -> Dynamic
where
    I: IntoIterator<Item = (&'a String, &'a String)>,
{
    Dynamic::Map(
        entries
            .into_iter()
            .map(|(k, v)| (k.clone(), Dynamic::String(v.clone())))
            .collect::<HashMap<_, _>>(),
    )
}

/// Builds an object from attribute name/value pairs
pub(crate) fn object<I>(attributes: I) -> DynamicValue
where
    I: IntoIterator<Item = (&'static str, Dynamic)>,
{
    DynamicValue::new(Dynamic::Map(
        attributes
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect(),
    ))
}

/// Limits are strings in configuration; empty means unlimited
pub(crate) fn parse_limit(attribute: &str, value: Option<&str>) -> Result<Option<i64>> {
    match value {
        None | Some("") => Ok(None),
        Some(v) => v
            .parse::<i64>()
            .map(Some)
            .map_err(|_| ProviderError::invalid_attribute(attribute, format!("{:?} is not an integer", v))),
    }
}

pub(crate) fn render_limit(value: Option<&i64>) -> Dynamic {
    Dynamic::String(value.map(i64::to_string).unwrap_or_default())
}

/// True when the planned value of `name` differs from prior state
pub(crate) fn changed(prior: &DynamicValue, planned: &DynamicValue, name: &str) -> bool {
    let path = AttributePath::new(name);
    let before = prior.get(&path).cloned().unwrap_or(Dynamic::Null);
    let after = planned.get(&path).cloned().unwrap_or(Dynamic::Null);
    !tfplug::plan_modifier::values_equal(&before, &after)
}

/// Unset limits stay null unless they were tracked before, then read as ""
pub(crate) fn limit_state(
    prior: &DynamicValue,
    attribute: &str,
    limits: &Limits,
    limit: &str,
) -> Result<Dynamic> {
    match limits.get(limit) {
        Some(value) => Ok(render_limit(Some(value))),
        None if optional_string(prior, attribute)?.is_some() => Ok(render_limit(None)),
        None => Ok(Dynamic::Null),
    }
}

/// Broker arguments from either `arguments` (all strings) or `arguments_json`
///
/// `json_attribute` names the JSON attribute in error messages.
pub(crate) fn arguments_from(state: &DynamicValue, json_attribute: &str) -> Result<ArgumentTable> {
    match optional_string(state, "arguments_json")?.filter(|s| !s.is_empty()) {
        Some(json) => parse_arguments_json(json_attribute, &json),
        None => Ok(string_map(state, "arguments")?
            .into_iter()
            .map(|(k, v)| (k, Value::String(v)))
            .collect()),
    }
}

pub(crate) fn parse_arguments_json(json_attribute: &str, json: &str) -> Result<ArgumentTable> {
    serde_json::from_str::<ArgumentTable>(json)
        .map_err(|e| ProviderError::invalid_attribute(json_attribute, e))
}

/// Splits broker arguments into `(arguments, arguments_json)` state values
///
/// The JSON form is kept when `prior` used it, and forced when a value is not
/// a string. JSON equal to the prior string keeps the prior formatting.
pub(crate) fn arguments_state(
    arguments: ArgumentTable,
    prior: &DynamicValue,
    json_attribute: &str,
) -> Result<(Dynamic, Dynamic)> {
    let prior_json = optional_string(prior, "arguments_json")?.filter(|s| !s.is_empty());
    let non_string = arguments.values().any(|v| !v.is_string());

    if prior_json.is_some() || non_string {
        let json = match prior_json {
            Some(prior) if parse_arguments_json(json_attribute, &prior).ok().as_ref() == Some(&arguments) => {
                prior
            }
            _ => serde_json::to_string(&arguments)
                .map_err(|e| ProviderError::invalid_attribute(json_attribute, e))?,
        };
        return Ok((Dynamic::Null, Dynamic::String(json)));
    }
    if arguments.is_empty() {
        return Ok((Dynamic::Null, Dynamic::Null));
    }

    let map: HashMap<String, Dynamic> = arguments
        .into_iter()
        .filter_map(|(k, v)| match v {
            Value::String(s) => Some((k, Dynamic::String(s))),
            _ => None,
        })
        .collect();
    Ok((Dynamic::Map(map), Dynamic::Null))
}

/// Both argument forms configured at once
pub(crate) fn conflicting_arguments(config: &DynamicValue, base: AttributePath) -> Option<Diagnostic> {
    let is_set = |name: &str| config.get(&base.clone().attribute(name)).is_some_and(|v| !v.is_null());
    if is_set("arguments") && is_set("arguments_json") {
        Some(
            Diagnostic::error(
                "Conflicting configuration arguments",
                "Only one of `arguments` or `arguments_json` can be set",
            )
            .with_attribute(base.attribute("arguments_json")),
        )
    } else {
        None
    }
}

/// Validates the id, then reads the object it names
///
/// Every adapter imports the same way: the id alone is enough for Read to
/// rebuild the whole state.
pub(crate) async fn import_by_read<R>(
    resource: &R,
    ctx: Context,
    request: ImportResourceStateRequest,
    validate: impl FnOnce(&str) -> Result<()>,
) -> ImportResourceStateResponse
where
    R: Resource + ?Sized,
{
    if let Err(e) = validate(&request.id) {
        return ImportResourceStateResponse {
            imported_resources: vec![],
            diagnostics: vec![e.to_diagnostic("Invalid import ID")],
        };
    }

    let mut state = DynamicValue::object();
    if let Err(e) = state.set_string(&AttributePath::new("id"), request.id.clone()) {
        return ImportResourceStateResponse {
            imported_resources: vec![],
            diagnostics: vec![Diagnostic::error("Failed to set import ID", e.to_string())],
        };
    }

    let read = resource
        .read(
            ctx,
            ReadResourceRequest {
                type_name: request.type_name.clone(),
                current_state: state,
            },
        )
        .await;

    if tfplug::types::has_errors(&read.diagnostics) {
        return ImportResourceStateResponse {
            imported_resources: vec![],
            diagnostics: read.diagnostics,
        };
    }

    match read.new_state {
        Some(state) => ImportResourceStateResponse {
            imported_resources: vec![ImportedResource {
                type_name: request.type_name,
                state,
            }],
            diagnostics: read.diagnostics,
        },
        None => ImportResourceStateResponse {
            imported_resources: vec![],
            diagnostics: vec![Diagnostic::error(
                "Cannot import non-existent remote object",
                format!("No {} found with id '{}'", request.type_name, request.id),
            )],
        },
    }
}

/// The id every adapter stores in state
pub(crate) fn state_id(state: &DynamicValue) -> Result<String> {
    required_string(state, "id")
}

/// Create-time guard: a successful lookup means the object already exists
pub(crate) fn ensure_absent<T>(
    probe: std::result::Result<T, ApiError>,
    kind: &'static str,
    name: &str,
) -> Result<()> {
    match probe {
        Ok(_) => Err(ProviderError::AlreadyExists {
            kind,
            name: name.to_string(),
        }),
        Err(e) if e.is_not_found() => Ok(()),
        Err(e) => Err(ProviderError::api(Action::Reading, kind, e)),
    }
}

/// Turns a read outcome into state; 404 means the object is gone
pub(crate) fn gone_on_not_found<T>(result: Result<T>) -> Result<Option<T>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(e) if e.is_not_found() => Ok(None),
        Err(e) => Err(e),
    }
}

/// Deleting something that is already gone succeeds
pub(crate) fn ignore_not_found(result: Result<()>) -> Result<()> {
    match result {
        Err(e) if e.is_not_found() => {
            tracing::debug!("object already deleted: {}", e);
            Ok(())
        }
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn limits_treat_empty_as_unlimited() {
        assert_eq!(parse_limit("max_queues", None).unwrap(), None);
        assert_eq!(parse_limit("max_queues", Some("")).unwrap(), None);
        assert_eq!(parse_limit("max_queues", Some("50")).unwrap(), Some(50));

        let err = parse_limit("max_queues", Some("many")).unwrap_err();
        assert!(err.to_string().contains("max_queues"));
    }

    #[test]
    fn padded_limit_is_rejected() {
        assert!(parse_limit("max_queues", Some(" 50")).is_err());
        assert!(parse_limit("max_connections", Some("50 ")).is_err());
    }

    #[test]
    fn missing_required_string_is_reported() {
        let state = object([("name", Dynamic::Null)]);
        let err = required_string(&state, "name").unwrap_err();
        assert_eq!(err.to_string(), "invalid value for name: value is required");
    }

    #[test]
    fn wrong_type_is_reported_with_attribute() {
        let state = object([("tracing", string_value("yes"))]);
        let err = bool_or(&state, "tracing", false).unwrap_err();
        assert!(err.to_string().starts_with("invalid value for tracing"));
    }

    #[test]
    fn single_block_defaults_to_empty_object() {
        let state = object([("settings", Dynamic::List(vec![]))]);
        let block = single_block(&state, "settings").unwrap();
        assert!(bool_or(&block, "durable", true).unwrap());
    }

    #[test]
    fn provider_data_of_wrong_type_is_rejected() {
        let (data, diags) = provider_data_from(Some(Arc::new(42u8)));
        assert!(data.is_none());
        assert_eq!(diags[0].summary, "Invalid provider data");

        let (data, diags) = provider_data_from(None);
        assert!(data.is_none());
        assert_eq!(diags[0].summary, "No provider data");
    }
}
