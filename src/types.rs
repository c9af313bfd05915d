//! Structured type expressions and their TypeScript text emission.
//!
//! The resolver produces [`TypeExpr`] values; the [`Emit`] trait turns them
//! into source text. Emission is purely mechanical string building.

/// A resolved type expression.
#[derive(Debug, Clone, PartialEq)]
pub enum TypeExpr {
    /// string
    String,
    /// number
    Number,
    /// boolean
    Boolean,
    /// unknown - the open/unconstrained escape hatch
    Unknown,
    /// Blob - binary/stream payloads
    Blob,
    /// Literal type: 'active', 42, true
    Literal(Literal),
    /// Reference to a named declaration by its registry token
    Named(String),
    /// Union: A | B
    Union(Vec<TypeExpr>),
    /// Intersection: A & B
    Intersection(Vec<TypeExpr>),
    /// Homogeneous sequence: Array<T>
    Array(Box<TypeExpr>),
    /// Structural record, optionally with an open index signature
    Object {
        props: Vec<Prop>,
        index: Option<Box<TypeExpr>>,
    },
}

/// Literal values usable in type position.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Str(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    Null,
}

/// One record property.
#[derive(Debug, Clone, PartialEq)]
pub struct Prop {
    pub name: String,
    pub ty: TypeExpr,
    pub required: bool,
}

/// A named top-level type declaration.
#[derive(Debug, Clone)]
pub struct TypeDecl {
    pub name: String,
    pub ty: TypeExpr,
}

/// Convert a node to its TypeScript source text.
pub trait Emit {
    fn emit(&self) -> String;
}

impl Emit for Literal {
    fn emit(&self) -> String {
        match self {
            Literal::Str(s) => {
                let escaped = s.replace('\\', "\\\\").replace('\'', "\\'");
                format!("'{escaped}'")
            }
            Literal::Int(i) => i.to_string(),
            Literal::Float(f) => f.to_string(),
            Literal::Bool(b) => b.to_string(),
            Literal::Null => "null".to_string(),
        }
    }
}

impl Emit for TypeExpr {
    fn emit(&self) -> String {
        match self {
            TypeExpr::String => "string".to_string(),
            TypeExpr::Number => "number".to_string(),
            TypeExpr::Boolean => "boolean".to_string(),
            TypeExpr::Unknown => "unknown".to_string(),
            TypeExpr::Blob => "Blob".to_string(),
            TypeExpr::Literal(lit) => lit.emit(),
            TypeExpr::Named(name) => name.clone(),
            TypeExpr::Union(members) => {
                if members.is_empty() {
                    "unknown".to_string()
                } else {
                    members
                        .iter()
                        .map(Emit::emit)
                        .collect::<Vec<_>>()
                        .join(" | ")
                }
            }
            TypeExpr::Intersection(members) => {
                if members.is_empty() {
                    "unknown".to_string()
                } else {
                    members
                        .iter()
                        .map(|m| {
                            // Unions bind looser than intersections.
                            if matches!(m, TypeExpr::Union(_)) {
                                format!("({})", m.emit())
                            } else {
                                m.emit()
                            }
                        })
                        .collect::<Vec<_>>()
                        .join(" & ")
                }
            }
            TypeExpr::Array(element) => format!("Array<{}>", element.emit()),
            TypeExpr::Object { props, index } => {
                let mut parts: Vec<String> = props.iter().map(Emit::emit).collect();
                if let Some(value) = index {
                    parts.push(format!("[key: string]: {}", value.emit()));
                }
                if parts.is_empty() {
                    "{}".to_string()
                } else {
                    format!("{{ {} }}", parts.join("; "))
                }
            }
        }
    }
}

impl Emit for Prop {
    fn emit(&self) -> String {
        let key = quote_if_needed(&self.name);
        let opt = if self.required { "" } else { "?" };
        format!("{key}{opt}: {}", self.ty.emit())
    }
}

impl Emit for TypeDecl {
    fn emit(&self) -> String {
        format!("export type {} = {};\n", self.name, self.ty.emit())
    }
}

/// Check if a property name needs quoting in type position.
fn needs_quoting(name: &str) -> bool {
    name.is_empty()
        || !name
            .chars()
            .next()
            .map(|c| c.is_ascii_alphabetic() || c == '_' || c == '$')
            .unwrap_or(false)
        || !name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
}

/// Quote a property name if it is not a valid bare identifier.
pub fn quote_if_needed(name: &str) -> String {
    if needs_quoting(name) {
        let escaped = name.replace('\\', "\\\\").replace('"', "\\\"");
        format!("\"{escaped}\"")
    } else {
        name.to_string()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_emit_scalars() {
        assert_eq!(TypeExpr::String.emit(), "string");
        assert_eq!(TypeExpr::Number.emit(), "number");
        assert_eq!(TypeExpr::Boolean.emit(), "boolean");
        assert_eq!(TypeExpr::Unknown.emit(), "unknown");
        assert_eq!(TypeExpr::Blob.emit(), "Blob");
    }

    #[test]
    fn test_emit_literal_union() {
        let ty = TypeExpr::Union(vec![
            TypeExpr::Literal(Literal::Str("A".into())),
            TypeExpr::Literal(Literal::Str("B".into())),
        ]);
        assert_eq!(ty.emit(), "'A' | 'B'");
    }

    #[test]
    fn test_emit_string_literal_escaping() {
        let lit = Literal::Str("it's a \\ test".into());
        assert_eq!(lit.emit(), "'it\\'s a \\\\ test'");
    }

    #[test]
    fn test_emit_intersection_parenthesizes_unions() {
        let ty = TypeExpr::Intersection(vec![
            TypeExpr::Named("Base".into()),
            TypeExpr::Union(vec![TypeExpr::Named("A".into()), TypeExpr::Named("B".into())]),
        ]);
        assert_eq!(ty.emit(), "Base & (A | B)");
    }

    #[test]
    fn test_emit_array() {
        let ty = TypeExpr::Array(Box::new(TypeExpr::Union(vec![
            TypeExpr::String,
            TypeExpr::Number,
        ])));
        assert_eq!(ty.emit(), "Array<string | number>");
    }

    #[test]
    fn test_emit_object() {
        let ty = TypeExpr::Object {
            props: vec![
                Prop {
                    name: "id".into(),
                    ty: TypeExpr::Number,
                    required: true,
                },
                Prop {
                    name: "name".into(),
                    ty: TypeExpr::String,
                    required: false,
                },
            ],
            index: None,
        };
        assert_eq!(ty.emit(), "{ id: number; name?: string }");
    }

    #[test]
    fn test_emit_object_with_index_signature() {
        let ty = TypeExpr::Object {
            props: vec![Prop {
                name: "kind".into(),
                ty: TypeExpr::String,
                required: true,
            }],
            index: Some(Box::new(TypeExpr::Unknown)),
        };
        assert_eq!(ty.emit(), "{ kind: string; [key: string]: unknown }");
    }

    #[test]
    fn test_emit_quoted_property() {
        let prop = Prop {
            name: "content-type".into(),
            ty: TypeExpr::String,
            required: true,
        };
        assert_eq!(prop.emit(), "\"content-type\": string");
    }

    #[test]
    fn test_emit_type_decl() {
        let decl = TypeDecl {
            name: "Id".into(),
            ty: TypeExpr::String,
        };
        assert_eq!(decl.emit(), "export type Id = string;\n");
    }
}
