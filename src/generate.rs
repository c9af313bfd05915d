//! Pipeline entry: parse a JSON API description, resolve named schemas,
//! classify operations, and emit the complete TypeScript module.

use thiserror::Error;
use tracing::{debug, warn};

use crate::classify::classify_operations;
use crate::codegen;
use crate::resolve::{Resolver, SchemaNode};
use crate::spec::OpenApiSpec;
use crate::tokens::TokenRegistry;
use crate::types::TypeDecl;

#[derive(Debug, Error)]
pub enum GenerateError {
    /// The input was not parseable JSON in the expected shape. This is the
    /// only fatal condition; everything past parsing degrades per item.
    #[error("failed to parse API description: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Generate the TypeScript client module for a JSON API description.
///
/// Output is deterministic for a given input: schema declarations, paths,
/// and tag groups are emitted in sorted order.
pub fn generate(description: &str) -> Result<String, GenerateError> {
    let spec = OpenApiSpec::from_json(description)?;
    let mut tokens = TokenRegistry::new();

    let mut decls: Vec<TypeDecl> = Vec::new();
    if let Some(schemas) = spec.components.as_ref().and_then(|c| c.schemas.as_ref()) {
        let mut names: Vec<_> = schemas.keys().collect();
        names.sort();

        let mut resolver = Resolver::new(&mut tokens);
        // Claim every schema token up front so reference order cannot
        // influence naming.
        for name in &names {
            resolver.resolve_token(name);
        }
        for name in names {
            let Some(schema) = schemas.get(name) else {
                continue;
            };
            let node = SchemaNode::from_schema(schema);
            match resolver.resolve_named(name, &node) {
                Ok(ty) => decls.push(TypeDecl {
                    name: resolver.resolve_token(name),
                    ty,
                }),
                Err(err) => {
                    warn!(schema = %name, "Skipping type declaration: {err}");
                }
            }
        }
    }

    let groups = classify_operations(&spec, &mut tokens);
    debug!(
        declarations = decls.len(),
        groups = groups.len(),
        "Generation complete."
    );
    Ok(codegen::emit_module(&decls, &groups))
}
