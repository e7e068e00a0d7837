//! Default value providers for attributes
//!
//! Defaults run during planning when an optional attribute is absent from
//! the configuration. They never replace a value the user set.
//!
//! ```no_run
//! use tfplug::schema::{AttributeBuilder, AttributeType};
//! use tfplug::defaults::StaticDefault;
//!
//! let kind = AttributeBuilder::new("type", AttributeType::String)
//!     .optional()
//!     .default(StaticDefault::string("direct"))
//!     .build();
//! ```

use crate::schema::{Block, Default, DefaultRequest, DefaultResponse, Schema};
use crate::types::{AttributePath, Dynamic, DynamicValue};

/// StaticDefault provides a fixed default value
pub struct StaticDefault {
    value: Dynamic,
}

impl StaticDefault {
    pub fn create(value: Dynamic) -> Box<dyn Default> {
        Box::new(Self { value })
    }

    pub fn string(value: &str) -> Box<dyn Default> {
        Self::create(Dynamic::String(value.to_string()))
    }

    pub fn number(value: f64) -> Box<dyn Default> {
        Self::create(Dynamic::Number(value))
    }

    pub fn bool(value: bool) -> Box<dyn Default> {
        Self::create(Dynamic::Bool(value))
    }
}

impl Default for StaticDefault {
    fn description(&self) -> String {
        format!("defaults to {:?}", self.value)
    }

    fn default_value(&self, _request: DefaultRequest) -> DefaultResponse {
        DefaultResponse {
            value: self.value.clone(),
        }
    }
}

/// Returns `config` with every absent or null defaulted attribute filled in,
/// including attributes of nested block instances that are present
pub fn apply_defaults(schema: &Schema, config: &DynamicValue) -> DynamicValue {
    let mut result = if config.is_null() {
        DynamicValue::object()
    } else {
        config.clone()
    };
    apply_block(&schema.block, AttributePath::root(), &mut result);
    result
}

fn apply_block(block: &Block, base: AttributePath, value: &mut DynamicValue) {
    for attr in &block.attributes {
        let Some(default) = &attr.default else {
            continue;
        };
        let path = base.clone().attribute(&attr.name);
        if matches!(value.get(&path), None | Some(Dynamic::Null)) {
            let response = default.default_value(DefaultRequest { path: path.clone() });
            if let Err(e) = value.set(&path, response.value) {
                tracing::warn!("Could not apply default for {}: {}", path, e);
            }
        }
    }

    for nested in &block.block_types {
        let path = base.clone().attribute(&nested.type_name);
        let count = value
            .get(&path)
            .and_then(Dynamic::as_list)
            .map_or(0, <[Dynamic]>::len);
        for i in 0..count {
            apply_block(&nested.block, path.clone().index(i as i64), value);
        }
    }
}
