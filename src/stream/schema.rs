//! JSON Schema construction for stream records

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// JSON Schema type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JsonType {
    String,
    Integer,
    Boolean,
    Object,
    Array,
}

impl std::fmt::Display for JsonType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JsonType::String => write!(f, "string"),
            JsonType::Integer => write!(f, "integer"),
            JsonType::Boolean => write!(f, "boolean"),
            JsonType::Object => write!(f, "object"),
            JsonType::Array => write!(f, "array"),
        }
    }
}

/// A single named property
#[derive(Debug, Clone)]
pub struct Property {
    name: String,
    json_type: JsonType,
    format: Option<&'static str>,
    items: Option<Box<Value>>,
    properties: Option<Box<Value>>,
    allowed_values: Vec<String>,
    description: Option<String>,
    required: bool,
}

impl Property {
    fn of(name: impl Into<String>, json_type: JsonType) -> Self {
        Self {
            name: name.into(),
            json_type,
            format: None,
            items: None,
            properties: None,
            allowed_values: Vec::new(),
            description: None,
            required: false,
        }
    }

    /// String property
    pub fn string(name: impl Into<String>) -> Self {
        Self::of(name, JsonType::String)
    }

    /// RFC 3339 date-time string property
    pub fn date_time(name: impl Into<String>) -> Self {
        let mut prop = Self::of(name, JsonType::String);
        prop.format = Some("date-time");
        prop
    }

    /// Email string property
    pub fn email(name: impl Into<String>) -> Self {
        let mut prop = Self::of(name, JsonType::String);
        prop.format = Some("email");
        prop
    }

    /// Integer property
    pub fn integer(name: impl Into<String>) -> Self {
        Self::of(name, JsonType::Integer)
    }

    /// Boolean property
    pub fn boolean(name: impl Into<String>) -> Self {
        Self::of(name, JsonType::Boolean)
    }

    /// Object property with unconstrained members
    pub fn object(name: impl Into<String>) -> Self {
        Self::of(name, JsonType::Object)
    }

    /// Object property with declared members
    pub fn object_of(name: impl Into<String>, members: Schema) -> Self {
        let mut prop = Self::of(name, JsonType::Object);
        prop.properties = Some(Box::new(members.into_value()));
        prop
    }

    /// Array property whose items follow `items`
    pub fn array(name: impl Into<String>, items: Value) -> Self {
        let mut prop = Self::of(name, JsonType::Array);
        prop.items = Some(Box::new(items));
        prop
    }

    /// Mark as required and non-nullable
    #[must_use]
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Restrict to an enumeration
    #[must_use]
    pub fn allowed(mut self, values: &[&str]) -> Self {
        self.allowed_values = values.iter().map(|v| (*v).to_string()).collect();
        self
    }

    /// Attach a description
    #[must_use]
    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    fn to_value(&self) -> Value {
        let mut schema = serde_json::Map::new();
        let type_name = self.json_type.to_string();
        let json_type = if self.required {
            json!(type_name)
        } else {
            json!([type_name, "null"])
        };
        schema.insert("type".to_string(), json_type);

        if let Some(format) = self.format {
            schema.insert("format".to_string(), json!(format));
        }
        if let Some(items) = &self.items {
            schema.insert("items".to_string(), (**items).clone());
        }
        if let Some(properties) = &self.properties {
            if let Some(members) = properties.get("properties") {
                schema.insert("properties".to_string(), members.clone());
            }
            if let Some(required) = properties.get("required") {
                schema.insert("required".to_string(), required.clone());
            }
        }
        if !self.allowed_values.is_empty() {
            let mut values: Vec<Value> = self.allowed_values.iter().map(|v| json!(v)).collect();
            if !self.required {
                values.push(Value::Null);
            }
            schema.insert("enum".to_string(), Value::Array(values));
        }
        if let Some(description) = &self.description {
            schema.insert("description".to_string(), json!(description));
        }

        Value::Object(schema)
    }
}

/// An object schema built from properties
#[derive(Debug, Clone, Default)]
pub struct Schema {
    properties: Vec<Property>,
}

impl Schema {
    /// Empty schema
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a property
    #[must_use]
    pub fn property(mut self, property: Property) -> Self {
        self.properties.push(property);
        self
    }

    /// Property names in declaration order
    pub fn names(&self) -> Vec<&str> {
        self.properties.iter().map(|p| p.name.as_str()).collect()
    }

    /// Render as a JSON Schema object
    pub fn into_value(self) -> Value {
        let mut properties = serde_json::Map::new();
        let mut required = Vec::new();
        for property in &self.properties {
            properties.insert(property.name.clone(), property.to_value());
            if property.required {
                required.push(json!(property.name));
            }
        }

        let mut schema = serde_json::Map::new();
        schema.insert("type".to_string(), json!("object"));
        schema.insert("properties".to_string(), Value::Object(properties));
        if !required.is_empty() {
            schema.insert("required".to_string(), Value::Array(required));
        }
        Value::Object(schema)
    }
}

/// Names of the integer-typed properties of a rendered schema
pub fn integer_properties(schema: &Value) -> Vec<String> {
    schema
        .get("properties")
        .and_then(Value::as_object)
        .map(|props| {
            props
                .iter()
                .filter(|(_, prop)| has_type(prop, JsonType::Integer))
                .map(|(name, _)| name.clone())
                .collect()
        })
        .unwrap_or_default()
}

fn has_type(prop: &Value, json_type: JsonType) -> bool {
    let wanted = json_type.to_string();
    match prop.get("type") {
        Some(Value::String(t)) => *t == wanted,
        Some(Value::Array(types)) => types.iter().any(|t| t.as_str() == Some(wanted.as_str())),
        _ => false,
    }
}
