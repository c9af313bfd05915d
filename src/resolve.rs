//! Schema data model and recursive type resolution.
//!
//! Parsed schemas are first lowered into [`SchemaNode`], a small tagged
//! model that the resolver recurses over. Resolution is a pure mapping to
//! [`TypeExpr`]; unsupported shapes degrade to the open type instead of
//! failing. The only error is the recursive-schema guard: a named schema
//! whose declaration refers back to a name currently being resolved is
//! rejected so generation cannot loop forever.

use thiserror::Error;

use crate::spec::{AdditionalProperties, EnumValue, Schema, SchemaType};
use crate::tokens::TokenRegistry;
use crate::types::{Literal, Prop, TypeExpr};

/// Composition operator for combined schemas. Exclusivity of "exactly one
/// of" is not encoded; both compositions collapse to `Or`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompositeOp {
    And,
    Or,
}

/// Scalar kinds the resolver distinguishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrimitiveKind {
    String,
    Number,
    Boolean,
}

/// The schema shape consumed by the resolver. Immutable once constructed.
#[derive(Debug, Clone)]
pub enum SchemaNode {
    /// Name-based reference; identity is the name, never the structure.
    Reference(String),
    Composite {
        op: CompositeOp,
        members: Vec<SchemaNode>,
    },
    Object {
        properties: Vec<PropertyNode>,
        additional: Option<Box<SchemaNode>>,
    },
    Primitive {
        kind: PrimitiveKind,
        enum_values: Vec<EnumValue>,
    },
    /// Binary/stream payload (string with a binary format marker).
    Binary,
    Array(Box<SchemaNode>),
    /// Carries no shape information.
    Open,
}

/// One declared object property.
#[derive(Debug, Clone)]
pub struct PropertyNode {
    pub name: String,
    pub schema: SchemaNode,
    pub required: bool,
}

impl SchemaNode {
    /// Lower a parsed schema into the resolver's model. Lowering never
    /// fails; unrecognized shapes become [`SchemaNode::Open`].
    pub fn from_schema(schema: &Schema) -> SchemaNode {
        if let Some(ref_path) = &schema.ref_path {
            let name = ref_path.rsplit('/').next().unwrap_or(ref_path);
            return SchemaNode::Reference(name.to_string());
        }

        if let Some(all_of) = &schema.all_of {
            return SchemaNode::Composite {
                op: CompositeOp::And,
                members: all_of.iter().map(SchemaNode::from_schema).collect(),
            };
        }
        if let Some(members) = schema.any_of.as_ref().or(schema.one_of.as_ref()) {
            return SchemaNode::Composite {
                op: CompositeOp::Or,
                members: members.iter().map(SchemaNode::from_schema).collect(),
            };
        }

        match &schema.schema_type {
            Some(SchemaType::Single(ty)) => match ty.as_str() {
                "string" => {
                    if schema.format.as_deref() == Some("binary") {
                        SchemaNode::Binary
                    } else {
                        SchemaNode::Primitive {
                            kind: PrimitiveKind::String,
                            enum_values: schema.enum_values.clone().unwrap_or_default(),
                        }
                    }
                }
                "number" | "integer" => SchemaNode::Primitive {
                    kind: PrimitiveKind::Number,
                    enum_values: schema.enum_values.clone().unwrap_or_default(),
                },
                "boolean" => SchemaNode::Primitive {
                    kind: PrimitiveKind::Boolean,
                    enum_values: Vec::new(),
                },
                "array" => {
                    let element = schema
                        .items
                        .as_ref()
                        .map(|items| SchemaNode::from_schema(items))
                        .unwrap_or(SchemaNode::Open);
                    SchemaNode::Array(Box::new(element))
                }
                "object" => Self::lower_object(schema),
                _ => SchemaNode::Open,
            },
            // Nullable type arrays and other exotica degrade to open.
            Some(SchemaType::Multiple(_)) => SchemaNode::Open,
            None => {
                if schema.properties.is_some() || schema.additional_properties.is_some() {
                    Self::lower_object(schema)
                } else {
                    SchemaNode::Open
                }
            }
        }
    }

    fn lower_object(schema: &Schema) -> SchemaNode {
        let required: Vec<&String> = schema.required.iter().flatten().collect();

        let mut properties = Vec::new();
        if let Some(props) = &schema.properties {
            // Sorted for deterministic output.
            let mut names: Vec<_> = props.keys().collect();
            names.sort();
            for name in names {
                let Some(prop_schema) = props.get(name) else {
                    continue;
                };
                properties.push(PropertyNode {
                    name: name.clone(),
                    schema: SchemaNode::from_schema(prop_schema),
                    required: required.iter().any(|r| *r == name),
                });
            }
        }

        let additional = match &schema.additional_properties {
            Some(AdditionalProperties::Bool(true)) => Some(Box::new(SchemaNode::Open)),
            Some(AdditionalProperties::Bool(false)) | None => None,
            Some(AdditionalProperties::Schema(s)) => Some(Box::new(SchemaNode::from_schema(s))),
        };

        SchemaNode::Object {
            properties,
            additional,
        }
    }
}

#[derive(Debug, Error)]
pub enum ResolveError {
    /// A named schema's declaration refers back to a name whose resolution
    /// is still in progress.
    #[error("unsupported recursive schema: '{name}'")]
    RecursiveSchema { name: String },
}

/// Recursive schema-to-type resolution using a registry for named
/// references. State exists for one generation run only.
#[derive(Debug)]
pub struct Resolver<'a> {
    tokens: &'a mut TokenRegistry,
    in_progress: Vec<String>,
}

impl<'a> Resolver<'a> {
    pub fn new(tokens: &'a mut TokenRegistry) -> Self {
        Self {
            tokens,
            in_progress: Vec::new(),
        }
    }

    /// Assign a registry token for a non-schema name (tags, operation
    /// identifiers). Shares the registry with named-schema resolution so
    /// every generated identifier stays collision-free.
    pub fn resolve_token(&mut self, raw: &str) -> String {
        self.tokens.resolve(raw)
    }

    /// Resolve the declaration body of a named schema, guarding against
    /// reference cycles through the names currently being declared.
    pub fn resolve_named(&mut self, name: &str, node: &SchemaNode) -> Result<TypeExpr, ResolveError> {
        self.in_progress.push(name.to_string());
        let result = self.resolve_type(node);
        self.in_progress.pop();
        result
    }

    /// Map a schema node to a type expression.
    pub fn resolve_type(&mut self, node: &SchemaNode) -> Result<TypeExpr, ResolveError> {
        match node {
            SchemaNode::Reference(name) => {
                if self.in_progress.iter().any(|n| n == name) {
                    return Err(ResolveError::RecursiveSchema { name: name.clone() });
                }
                Ok(TypeExpr::Named(self.tokens.resolve(name)))
            }
            SchemaNode::Composite { op, members } => {
                let mut resolved = Vec::with_capacity(members.len());
                for member in members {
                    resolved.push(self.resolve_type(member)?);
                }
                match resolved.len() {
                    0 => Ok(TypeExpr::Unknown),
                    1 => Ok(resolved.remove(0)),
                    _ => Ok(match op {
                        CompositeOp::And => TypeExpr::Intersection(resolved),
                        CompositeOp::Or => TypeExpr::Union(resolved),
                    }),
                }
            }
            SchemaNode::Object {
                properties,
                additional,
            } => {
                if properties.is_empty() && additional.is_none() {
                    // No shape information at all.
                    return Ok(TypeExpr::Unknown);
                }
                let mut props = Vec::with_capacity(properties.len());
                for property in properties {
                    props.push(Prop {
                        name: property.name.clone(),
                        ty: self.resolve_type(&property.schema)?,
                        required: property.required,
                    });
                }
                let index = match additional {
                    Some(node) => Some(Box::new(self.resolve_type(node)?)),
                    None => None,
                };
                Ok(TypeExpr::Object { props, index })
            }
            SchemaNode::Primitive { kind, enum_values } => {
                if !enum_values.is_empty() && *kind != PrimitiveKind::Boolean {
                    let literals = enum_values
                        .iter()
                        .map(|v| TypeExpr::Literal(enum_value_to_literal(v)))
                        .collect();
                    return Ok(TypeExpr::Union(literals));
                }
                Ok(match kind {
                    PrimitiveKind::String => TypeExpr::String,
                    PrimitiveKind::Number => TypeExpr::Number,
                    PrimitiveKind::Boolean => TypeExpr::Boolean,
                })
            }
            SchemaNode::Binary => Ok(TypeExpr::Blob),
            SchemaNode::Array(element) => {
                Ok(TypeExpr::Array(Box::new(self.resolve_type(element)?)))
            }
            SchemaNode::Open => Ok(TypeExpr::Unknown),
        }
    }
}

fn enum_value_to_literal(value: &EnumValue) -> Literal {
    match value {
        EnumValue::String(s) => Literal::Str(s.clone()),
        EnumValue::Integer(i) => Literal::Int(*i),
        EnumValue::Float(f) => Literal::Float(*f),
        EnumValue::Bool(b) => Literal::Bool(*b),
        EnumValue::Null => Literal::Null,
    }
}
