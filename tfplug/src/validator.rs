//! Attribute validators and configuration validation
//!
//! Validators only see known, non-null values. Required-attribute and
//! block-count checks are handled by [`validate_config`].

use crate::schema::{Block, Schema, Validator, ValidatorRequest, ValidatorResponse};
use crate::types::{AttributePath, Diagnostic, Dynamic, DynamicValue};

/// Accepts only strings from a fixed set
pub struct OneOf {
    allowed: Vec<String>,
}

impl OneOf {
    pub fn create(allowed: &[&str]) -> Box<dyn Validator> {
        Box::new(Self {
            allowed: allowed.iter().map(|s| s.to_string()).collect(),
        })
    }
}

impl Validator for OneOf {
    fn description(&self) -> String {
        format!("value must be one of: {}", self.allowed.join(", "))
    }

    fn validate(&self, request: ValidatorRequest) -> ValidatorResponse {
        let mut diagnostics = vec![];
        if let Some(s) = request.config_value.as_str() {
            if !self.allowed.iter().any(|a| a == s) {
                diagnostics.push(
                    Diagnostic::error(
                        format!("Invalid value for {}", request.path),
                        format!("expected one of [{}], got {:?}", self.allowed.join(", "), s),
                    )
                    .with_attribute(request.path),
                );
            }
        }
        ValidatorResponse { diagnostics }
    }
}

/// Accepts strings holding a JSON document
pub struct JsonString;

impl JsonString {
    pub fn create() -> Box<dyn Validator> {
        Box::new(Self)
    }
}

impl Validator for JsonString {
    fn description(&self) -> String {
        "value must be valid JSON".to_string()
    }

    fn validate(&self, request: ValidatorRequest) -> ValidatorResponse {
        let mut diagnostics = vec![];
        if let Some(s) = request.config_value.as_str() {
            if let Err(e) = serde_json::from_str::<serde_json::Value>(s) {
                diagnostics.push(
                    Diagnostic::error(format!("{} must be valid JSON", request.path), e.to_string())
                        .with_attribute(request.path),
                );
            }
        }
        ValidatorResponse { diagnostics }
    }
}

/// Runs required-attribute checks, block item counts and every attribute
/// validator in `schema` against `config`
pub fn validate_config(schema: &Schema, config: &DynamicValue) -> Vec<Diagnostic> {
    let mut diagnostics = vec![];
    validate_block(&schema.block, AttributePath::root(), config, &mut diagnostics);
    diagnostics
}

fn validate_block(
    block: &Block,
    base: AttributePath,
    config: &DynamicValue,
    diagnostics: &mut Vec<Diagnostic>,
) {
    for attr in &block.attributes {
        let path = base.clone().attribute(&attr.name);
        let value = config.get(&path).cloned().unwrap_or(Dynamic::Null);

        if value.is_null() {
            if attr.required {
                diagnostics.push(
                    Diagnostic::error(
                        "Missing required argument",
                        format!("The argument \"{}\" is required, but no definition was found.", path),
                    )
                    .with_attribute(path),
                );
            }
            continue;
        }
        if value.is_unknown() {
            continue;
        }

        for validator in &attr.validators {
            let response = validator.validate(ValidatorRequest {
                config_value: value.clone(),
                path: path.clone(),
            });
            diagnostics.extend(response.diagnostics);
        }
    }

    for nested in &block.block_types {
        let path = base.clone().attribute(&nested.type_name);
        let count = config
            .get(&path)
            .and_then(Dynamic::as_list)
            .map_or(0, <[Dynamic]>::len) as i64;

        if count < nested.min_items {
            diagnostics.push(
                Diagnostic::error(
                    "Insufficient blocks",
                    format!("At least {} \"{}\" blocks are required.", nested.min_items, nested.type_name),
                )
                .with_attribute(path.clone()),
            );
        }
        if nested.max_items > 0 && count > nested.max_items {
            diagnostics.push(
                Diagnostic::error(
                    "Too many blocks",
                    format!("No more than {} \"{}\" blocks are allowed.", nested.max_items, nested.type_name),
                )
                .with_attribute(path.clone()),
            );
        }

        for i in 0..count {
            validate_block(&nested.block, path.clone().index(i), config, diagnostics);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{AttributeBuilder, AttributeType, NestedBlockBuilder, NestingMode, SchemaBuilder};

    fn run(validator: &dyn Validator, value: Dynamic) -> Vec<Diagnostic> {
        validator
            .validate(ValidatorRequest {
                config_value: value,
                path: AttributePath::new("field"),
            })
            .diagnostics
    }

    #[test]
    fn one_of_accepts_listed_values() {
        let validator = OneOf::create(&["direct", "fanout"]);
        assert!(run(validator.as_ref(), "fanout".into()).is_empty());
    }

    #[test]
    fn one_of_rejects_other_values() {
        let validator = OneOf::create(&["direct", "fanout"]);
        let diags = run(validator.as_ref(), "x-random".into());
        assert_eq!(diags.len(), 1);
        assert!(diags[0].detail.contains("direct, fanout"));
    }

    #[test]
    fn json_string_rejects_malformed_documents() {
        let validator = JsonString::create();
        assert!(run(validator.as_ref(), "{\"x-max-length\": 10}".into()).is_empty());
        assert_eq!(run(validator.as_ref(), "{not json".into()).len(), 1);
    }

    #[test]
    fn validate_config_reports_missing_required_and_block_count() {
        let schema = SchemaBuilder::new()
            .attribute(
                AttributeBuilder::new("name", AttributeType::String)
                    .required()
                    .build(),
            )
            .block(
                NestedBlockBuilder::new("settings", NestingMode::List)
                    .min_items(1)
                    .max_items(1)
                    .attribute(
                        AttributeBuilder::new("type", AttributeType::String)
                            .optional()
                            .validator(OneOf::create(&["direct"]))
                            .build(),
                    )
                    .build(),
            )
            .build();

        let diags = validate_config(&schema, &DynamicValue::object());
        assert_eq!(diags.len(), 2);
        assert_eq!(diags[0].summary, "Missing required argument");
        assert_eq!(diags[1].summary, "Insufficient blocks");

        let mut config = DynamicValue::object();
        config
            .set_string(&AttributePath::new("name"), "logs".to_string())
            .unwrap();
        config
            .set_string(
                &AttributePath::new("settings").index(0).attribute("type"),
                "topic".to_string(),
            )
            .unwrap();
        let diags = validate_config(&schema, &config);
        assert_eq!(diags.len(), 1);
        assert_eq!(
            diags[0].attribute,
            Some(AttributePath::new("settings").index(0).attribute("type"))
        );
    }
}
