//! Declared input shapes for MCP tools.
//!
//! An [`InputSchema`] is an ordered list of [`FieldSpec`]s. The protocol
//! engine validates every `tools/call` argument object against the tool's
//! schema before the handler runs, and renders the same schema as JSON
//! Schema for `tools/list`.
//!
//! Unknown argument keys are ignored; only declared fields are checked.

use std::fmt::{Display, Formatter};
use std::sync::Arc;

use rmcp::model::JsonObject;
use serde::Serialize;
use serde_json::{json, Value};

/// Value constraint for one declared field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// A JSON string.
    String,
    /// A JSON integer greater than or equal to zero.
    NonNegativeInteger,
    /// A JSON array whose items are all strings.
    StringList,
}

impl FieldKind {
    fn json_schema(self) -> Value {
        match self {
            Self::String => json!({ "type": "string" }),
            Self::NonNegativeInteger => json!({ "type": "integer", "minimum": 0 }),
            Self::StringList => json!({ "type": "array", "items": { "type": "string" } }),
        }
    }

    fn check(self, value: &Value) -> Option<String> {
        match self {
            Self::String => (!value.is_string()).then(|| "expected a string".to_owned()),
            Self::NonNegativeInteger => {
                (value.as_u64().is_none()).then(|| "expected a non-negative integer".to_owned())
            }
            Self::StringList => match value.as_array() {
                None => Some("expected an array of strings".to_owned()),
                Some(items) => items
                    .iter()
                    .position(|item| !item.is_string())
                    .map(|index| format!("item {index} is not a string")),
            },
        }
    }
}

/// One declared field of a tool's input object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSpec {
    /// Argument key.
    pub name: &'static str,
    /// Value constraint.
    pub kind: FieldKind,
    /// Whether the key must be present.
    pub required: bool,
    /// Human-readable description surfaced in `tools/list`.
    pub description: &'static str,
}

/// Object-shaped input schema built from [`FieldSpec`]s.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InputSchema {
    fields: Vec<FieldSpec>,
}

impl InputSchema {
    /// Create an empty object schema.
    #[must_use]
    pub fn object() -> Self {
        Self::default()
    }

    /// Add a required field.
    #[must_use]
    pub fn required(self, name: &'static str, kind: FieldKind, description: &'static str) -> Self {
        self.field(name, kind, true, description)
    }

    /// Add an optional field.
    #[must_use]
    pub fn optional(self, name: &'static str, kind: FieldKind, description: &'static str) -> Self {
        self.field(name, kind, false, description)
    }

    fn field(
        mut self,
        name: &'static str,
        kind: FieldKind,
        required: bool,
        description: &'static str,
    ) -> Self {
        self.fields.push(FieldSpec {
            name,
            kind,
            required,
            description,
        });
        self
    }

    /// Declared fields in declaration order.
    #[must_use]
    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    /// Check `arguments` against every declared field.
    ///
    /// `null` is treated as absent, matching how MCP clients serialize
    /// unset optional parameters.
    ///
    /// # Errors
    ///
    /// Returns every field-level violation found, not just the first.
    pub fn validate(&self, arguments: &JsonObject) -> Result<(), ValidationErrors> {
        let mut errors = Vec::new();

        for field in &self.fields {
            match arguments.get(field.name) {
                None | Some(Value::Null) => {
                    if field.required {
                        errors.push(FieldError::new(field.name, "required field is missing"));
                    }
                }
                Some(value) => {
                    if let Some(message) = field.kind.check(value) {
                        errors.push(FieldError::new(field.name, message));
                    }
                }
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ValidationErrors(errors))
        }
    }

    /// Render as a JSON Schema object for `tools/list`.
    #[must_use]
    pub fn to_json_schema(&self) -> Arc<JsonObject> {
        let mut properties = serde_json::Map::new();
        for field in &self.fields {
            let mut property = field.kind.json_schema();
            if !field.description.is_empty() {
                property["description"] = json!(field.description);
            }
            properties.insert(field.name.to_owned(), property);
        }

        let required: Vec<&str> = self
            .fields
            .iter()
            .filter(|field| field.required)
            .map(|field| field.name)
            .collect();

        let mut schema = JsonObject::new();
        schema.insert("type".into(), json!("object"));
        schema.insert("properties".into(), Value::Object(properties));
        if !required.is_empty() {
            schema.insert("required".into(), json!(required));
        }
        Arc::new(schema)
    }
}

/// A single field-level validation failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    /// Offending argument key.
    pub field: String,
    /// What was wrong with it.
    pub message: String,
}

impl FieldError {
    /// Construct a field error.
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Non-empty collection of [`FieldError`]s.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ValidationErrors(pub Vec<FieldError>);

impl ValidationErrors {
    /// Individual field errors.
    #[must_use]
    pub fn errors(&self) -> &[FieldError] {
        &self.0
    }

    /// Whether `field` is among the offending keys.
    #[must_use]
    pub fn has_field(&self, field: &str) -> bool {
        self.0.iter().any(|err| err.field == field)
    }
}

impl Display for ValidationErrors {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let parts: Vec<String> = self
            .0
            .iter()
            .map(|err| format!("{}: {}", err.field, err.message))
            .collect();
        write!(f, "{}", parts.join("; "))
    }
}
