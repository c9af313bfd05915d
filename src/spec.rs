//! Serde structs for the OpenAPI subset the generator consumes.
//!
//! Only the fields that drive client generation are modeled; everything else
//! in the input document is ignored. Malformed schema shapes are tolerated
//! here and degrade to the open type during resolution.

use serde::Deserialize;
use std::collections::HashMap;

/// Root API description.
#[derive(Debug, Deserialize)]
pub struct OpenApiSpec {
    #[serde(default)]
    pub paths: HashMap<String, PathItem>,
    pub components: Option<Components>,
}

/// Components section containing the named-schema registry.
#[derive(Debug, Deserialize)]
pub struct Components {
    pub schemas: Option<HashMap<String, Schema>>,
}

/// A path item containing operations for different HTTP methods.
#[derive(Debug, Deserialize)]
pub struct PathItem {
    pub get: Option<Operation>,
    pub put: Option<Operation>,
    pub post: Option<Operation>,
    pub delete: Option<Operation>,
    pub patch: Option<Operation>,
    /// Path-level parameters shared by all operations.
    pub parameters: Option<Vec<Parameter>>,
}

/// An API operation (endpoint).
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Operation {
    pub tags: Option<Vec<String>>,
    pub operation_id: Option<String>,
    pub parameters: Option<Vec<Parameter>>,
    pub request_body: Option<RequestBody>,
    #[serde(default)]
    pub responses: HashMap<String, Response>,
}

/// A parameter (path, query, or header).
#[derive(Debug, Deserialize)]
pub struct Parameter {
    pub name: String,
    #[serde(rename = "in")]
    pub location: String,
    #[serde(default)]
    pub required: bool,
    pub schema: Option<Schema>,
}

/// A request body: media type -> schema-bearing payload descriptor.
#[derive(Debug, Deserialize)]
pub struct RequestBody {
    #[serde(default)]
    pub required: bool,
    pub content: Option<HashMap<String, MediaTypeObject>>,
}

/// A response entry keyed by status code or `default`.
#[derive(Debug, Deserialize)]
pub struct Response {
    pub content: Option<HashMap<String, MediaTypeObject>>,
}

/// Media type content (e.g. application/json).
#[derive(Debug, Deserialize)]
pub struct MediaTypeObject {
    pub schema: Option<Schema>,
}

/// JSON Schema definition used in the description.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Schema {
    #[serde(rename = "type")]
    pub schema_type: Option<SchemaType>,

    /// Reference to a named schema.
    #[serde(rename = "$ref")]
    pub ref_path: Option<String>,

    /// Properties for object types.
    pub properties: Option<HashMap<String, Schema>>,

    /// Required property names for object types.
    pub required: Option<Vec<String>>,

    /// Item schema for array types.
    pub items: Option<Box<Schema>>,

    /// Enum values (strings, numbers, booleans, or null).
    #[serde(rename = "enum")]
    pub enum_values: Option<Vec<EnumValue>>,

    /// Union composition (any of these schemas).
    #[serde(rename = "anyOf")]
    pub any_of: Option<Vec<Schema>>,

    /// Union composition (exactly one of these schemas).
    #[serde(rename = "oneOf")]
    pub one_of: Option<Vec<Schema>>,

    /// Intersection composition (all of these schemas combined).
    #[serde(rename = "allOf")]
    pub all_of: Option<Vec<Schema>>,

    /// Additional properties for open object types.
    pub additional_properties: Option<AdditionalProperties>,

    /// Format hint (e.g. binary, date-time).
    pub format: Option<String>,
}

/// Enum value can be string, integer, float, boolean, or null.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum EnumValue {
    String(String),
    Integer(i64),
    Float(f64),
    Bool(bool),
    Null,
}

/// Schema type can be a single type or an array of types.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum SchemaType {
    Single(String),
    Multiple(Vec<String>),
}

/// Additional properties can be a boolean or a schema.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum AdditionalProperties {
    Bool(bool),
    Schema(Box<Schema>),
}

impl OpenApiSpec {
    /// Parse an API description from a JSON string.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}
