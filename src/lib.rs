//! OpenAPI to TypeScript API client generator.
//!
//! The generator turns an OpenAPI-style API description into a single
//! self-contained TypeScript module: one client class per API tag, one
//! callable method per (operation, media type) pair, one named type
//! declaration per component schema, plus the embedded client runtime the
//! generated methods call into.
//!
//! The pipeline:
//! 1. Parse: OpenAPI JSON -> `spec` structs
//! 2. Resolve: schemas -> type expressions with collision-free names
//! 3. Classify: operations -> tag groups and media-type variants
//! 4. Codegen: variants -> TypeScript source text
//!
//! The [`runtime`] module is the Rust rendition of the middleware-chain
//! execution contract that the emitted TypeScript prelude mirrors: ordered
//! middleware dispatch, an injected transport capability, and the structured
//! request error surfaced for non-success HTTP outcomes.

mod classify;
mod codegen;
mod generate;
mod resolve;
mod spec;
mod tokens;
mod types;

pub mod runtime;

pub use generate::{GenerateError, generate};
