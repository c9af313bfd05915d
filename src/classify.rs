//! Operation classification: tag grouping, media-type fan-out, and
//! parameter ordering.
//!
//! The classifier turns the parsed description into per-tag groups of
//! method variants. Every variant corresponds to one (operation, media
//! type) pair and carries everything the emitter needs: ordered
//! parameters, the optional request body plan, and the declared response
//! plans for the status dispatch.

use std::collections::{BTreeMap, BTreeSet, HashSet};

use tracing::{debug, warn};

use crate::resolve::{Resolver, SchemaNode};
use crate::spec::{OpenApiSpec, Operation, Parameter, RequestBody, Schema};
use crate::tokens::{TokenRegistry, lower_first, strip_identifier};
use crate::types::TypeExpr;

/// The content type a fan-out falls back to, and the one variant that keeps
/// the unsuffixed method name.
pub const DEFAULT_MEDIA_TYPE: &str = "application/json";

const WILDCARD_MEDIA_TYPE: &str = "*/*";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Put,
    Post,
    Delete,
    Patch,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Put => "PUT",
            HttpMethod::Post => "POST",
            HttpMethod::Delete => "DELETE",
            HttpMethod::Patch => "PATCH",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamLocation {
    Path,
    Query,
    Header,
}

/// One classified parameter, in its final emission order slot.
#[derive(Debug, Clone)]
pub struct ParamPlan {
    /// Original name from the description (placeholder and key lookups).
    pub name: String,
    pub location: ParamLocation,
    pub required: bool,
    pub ty: TypeExpr,
}

/// How the request body value is serialized for the variant's media type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyKind {
    /// JSON family: JSON-encode the value.
    Json,
    /// Pass the value through verbatim.
    Text,
    /// Opaque form payload.
    Multipart,
}

#[derive(Debug, Clone)]
pub struct BodyPlan {
    pub ty: TypeExpr,
    pub required: bool,
    pub kind: BodyKind,
}

/// How a declared success payload is read from the raw response.
#[derive(Debug, Clone)]
pub enum ResponsePayload {
    /// Byte/stream passthrough.
    Binary,
    /// JSON decode plus the shared JSON-response hook.
    Json(TypeExpr),
    /// Raw text.
    Text,
}

/// One explicitly declared status code of the dispatch state machine.
#[derive(Debug, Clone)]
pub struct ResponsePlan {
    pub status: u16,
    pub payload: ResponsePayload,
}

/// One callable client method: an (operation, media type) pair.
#[derive(Debug)]
pub struct MethodVariant {
    pub name: String,
    pub path: String,
    pub method: HttpMethod,
    pub media_type: String,
    /// Required before optional, declaration order within each group.
    pub params: Vec<ParamPlan>,
    pub body: Option<BodyPlan>,
    /// Declared statuses, ascending.
    pub responses: Vec<ResponsePlan>,
    /// Whether a success response participates for this media type.
    pub accept: bool,
    pub return_ty: TypeExpr,
}

/// One emitted API surface (one class per tag).
#[derive(Debug)]
pub struct ApiGroup {
    pub name: String,
    pub methods: Vec<MethodVariant>,
}

/// Group every operation in the description by tag and fan each one out
/// over its participating media types. Never fails; anomalous operations
/// are diagnosed and generation continues.
pub fn classify_operations(spec: &OpenApiSpec, tokens: &mut TokenRegistry) -> Vec<ApiGroup> {
    let mut groups: BTreeMap<String, Vec<MethodVariant>> = BTreeMap::new();
    let mut resolver = Resolver::new(tokens);

    // Sorted paths for deterministic output.
    let mut paths: Vec<_> = spec.paths.iter().collect();
    paths.sort_by_key(|(path, _)| *path);

    for (path, item) in paths {
        let path_params = item.parameters.as_ref();
        let operations = [
            (HttpMethod::Get, item.get.as_ref()),
            (HttpMethod::Put, item.put.as_ref()),
            (HttpMethod::Post, item.post.as_ref()),
            (HttpMethod::Delete, item.delete.as_ref()),
            (HttpMethod::Patch, item.patch.as_ref()),
        ];
        for (method, op) in operations {
            let Some(op) = op else {
                continue;
            };
            let group = group_name(op, path, &mut resolver);
            let variants = classify_operation(path, method, op, path_params, &mut resolver);
            groups.entry(group).or_default().extend(variants);
        }
    }

    groups
        .into_iter()
        .map(|(name, methods)| ApiGroup { name, methods })
        .collect()
}

/// API surface name from the first declared tag. An untagged operation
/// lands in the `Ungrouped` bucket.
fn group_name(op: &Operation, path: &str, resolver: &mut Resolver<'_>) -> String {
    let tag = op
        .tags
        .as_ref()
        .and_then(|tags| tags.first())
        .filter(|tag| !tag.is_empty());
    match tag {
        Some(tag) => resolver.resolve_token(&format!("{tag} api")),
        None => {
            warn!(path, "Operation has no tag; grouping under Ungrouped.");
            resolver.resolve_token("ungrouped api")
        }
    }
}

/// Method base name: registry-resolved operation identifier, lower camel.
/// A missing identifier falls back to a path-derived name.
fn base_name(op: &Operation, path: &str, method: HttpMethod, resolver: &mut Resolver<'_>) -> String {
    let raw = match &op.operation_id {
        Some(id) if !id.is_empty() => id.clone(),
        _ => {
            let segments: Vec<_> = path
                .split('/')
                .filter(|s| !s.is_empty() && !s.starts_with('{'))
                .collect();
            let derived = format!(
                "{} {}",
                method.as_str().to_lowercase(),
                segments.join(" ")
            );
            warn!(path, derived = %derived, "Operation has no identifier; deriving one from the path.");
            derived
        }
    };
    lower_first(&resolver.resolve_token(&raw))
}

/// Fan one operation out over its participating media types.
fn classify_operation(
    path: &str,
    method: HttpMethod,
    op: &Operation,
    path_params: Option<&Vec<Parameter>>,
    resolver: &mut Resolver<'_>,
) -> Vec<MethodVariant> {
    let base = base_name(op, path, method, resolver);
    let media_types = participating_media_types(op);
    let params = classify_params(op, path_params, resolver);

    let mut variants = Vec::with_capacity(media_types.len());
    let mut used_names: HashSet<String> = HashSet::new();
    for media_type in &media_types {
        let name = variant_name(&base, media_type, media_types.len(), &mut used_names);

        let body = body_plan(op.request_body.as_ref(), media_type, resolver);
        let (responses, accept, return_ty) = response_plans(op, media_type, resolver);

        variants.push(MethodVariant {
            name,
            path: path.to_string(),
            method,
            media_type: media_type.clone(),
            params: params.clone(),
            body,
            responses,
            accept,
            return_ty,
        });
    }
    variants
}

/// Variant method name. Non-default media types are suffixed with the
/// PascalCased subtype; when two media types share a subtype (say
/// `application/xml` and `text/xml`) the later one widens to the full
/// media type so every variant keeps a distinct name.
fn variant_name(
    base: &str,
    media_type: &str,
    variant_count: usize,
    used: &mut HashSet<String>,
) -> String {
    let mut name = if variant_count > 1 && media_type != DEFAULT_MEDIA_TYPE {
        format!("{base}{}", media_suffix(media_type))
    } else {
        base.to_string()
    };
    if used.contains(&name) {
        name = format!("{base}{}", strip_identifier(media_type));
    }
    let mut suffix = 1usize;
    while used.contains(&name) {
        name = format!("{base}{}_{suffix}", strip_identifier(media_type));
        suffix += 1;
    }
    used.insert(name.clone());
    name
}

/// PascalCase suffix from a media subtype: `application/octet-stream`
/// becomes `OctetStream`.
fn media_suffix(media_type: &str) -> String {
    let subtype = media_type.split('/').nth(1).unwrap_or(media_type);
    strip_identifier(subtype)
}

/// The set union of request-body and 2xx-response content types, wildcard
/// excluded; falls back to the default content type so every operation
/// yields at least one method.
fn participating_media_types(op: &Operation) -> Vec<String> {
    let mut set = BTreeSet::new();
    if let Some(content) = op.request_body.as_ref().and_then(|b| b.content.as_ref()) {
        for key in content.keys() {
            if key != WILDCARD_MEDIA_TYPE {
                set.insert(key.clone());
            }
        }
    }
    for (status, response) in &op.responses {
        if !is_success_status(status) {
            continue;
        }
        if let Some(content) = &response.content {
            for key in content.keys() {
                if key != WILDCARD_MEDIA_TYPE {
                    set.insert(key.clone());
                }
            }
        }
    }

    // Default content type first, the rest in sorted order.
    let mut media_types = Vec::with_capacity(set.len().max(1));
    if set.remove(DEFAULT_MEDIA_TYPE) {
        media_types.push(DEFAULT_MEDIA_TYPE.to_string());
    }
    media_types.extend(set);
    if media_types.is_empty() {
        media_types.push(DEFAULT_MEDIA_TYPE.to_string());
    }
    media_types
}

fn is_success_status(status: &str) -> bool {
    status.parse::<u16>().is_ok_and(|code| (200..300).contains(&code))
}

/// Merge path-level and operation-level parameters (operation wins on the
/// same name) and apply the required-before-optional stable order.
fn classify_params(
    op: &Operation,
    path_params: Option<&Vec<Parameter>>,
    resolver: &mut Resolver<'_>,
) -> Vec<ParamPlan> {
    let mut merged: Vec<&Parameter> = Vec::new();
    for param in path_params.into_iter().flatten() {
        merged.push(param);
    }
    for param in op.parameters.iter().flatten() {
        merged.retain(|existing| existing.name != param.name);
        merged.push(param);
    }

    let mut plans = Vec::with_capacity(merged.len());
    for param in merged {
        let location = match param.location.as_str() {
            "path" => ParamLocation::Path,
            "header" => ParamLocation::Header,
            "cookie" => {
                debug!(name = %param.name, "Skipping cookie parameter.");
                continue;
            }
            _ => ParamLocation::Query,
        };
        let ty = match &param.schema {
            Some(schema) => resolve_or_open(resolver, schema),
            None => TypeExpr::String,
        };
        plans.push(ParamPlan {
            name: param.name.clone(),
            location,
            required: param.required,
            ty,
        });
    }

    // Stable: declaration order survives within each group.
    plans.sort_by_key(|p| !p.required);
    plans
}

/// Body plan for one media type, if the request body supplies it (the
/// wildcard entry acts as fallback).
fn body_plan(
    body: Option<&RequestBody>,
    media_type: &str,
    resolver: &mut Resolver<'_>,
) -> Option<BodyPlan> {
    let body = body?;
    let content = body.content.as_ref()?;
    let media = content
        .get(media_type)
        .or_else(|| content.get(WILDCARD_MEDIA_TYPE))?;

    let ty = match &media.schema {
        Some(schema) => resolve_or_open(resolver, schema),
        None => TypeExpr::Unknown,
    };
    let kind = if is_json_media_type(media_type) {
        BodyKind::Json
    } else if media_type.starts_with("multipart/") {
        BodyKind::Multipart
    } else {
        BodyKind::Text
    };
    Some(BodyPlan {
        ty,
        required: body.required,
        kind,
    })
}

/// Declared status plans for one media type, plus whether a success
/// response participates and the method's success return type.
fn response_plans(
    op: &Operation,
    media_type: &str,
    resolver: &mut Resolver<'_>,
) -> (Vec<ResponsePlan>, bool, TypeExpr) {
    let mut plans = Vec::new();
    let mut accept = false;

    let mut declared: Vec<_> = op.responses.iter().collect();
    declared.sort_by_key(|(status, _)| status.clone());

    for (status, response) in declared {
        let Ok(code) = status.parse::<u16>() else {
            if status != "default" {
                debug!(status = %status, "Skipping non-numeric response status.");
            }
            // The emitted default branch is always present and covers the
            // declared `default` entry.
            continue;
        };

        if (200..300).contains(&code)
            && response
                .content
                .as_ref()
                .is_some_and(|content| content.contains_key(media_type))
        {
            accept = true;
        }

        let media = response.content.as_ref().and_then(|content| {
            content
                .get(media_type)
                .or_else(|| content.get(WILDCARD_MEDIA_TYPE))
        });
        let payload = match media.and_then(|m| m.schema.as_ref()) {
            Some(schema) => {
                let ty = resolve_or_open(resolver, schema);
                if ty == TypeExpr::Blob {
                    ResponsePayload::Binary
                } else if is_json_media_type(media_type) {
                    ResponsePayload::Json(ty)
                } else {
                    // Only JSON-family variants decode; a schema on a
                    // text/* response still reads as raw text.
                    ResponsePayload::Text
                }
            }
            None => ResponsePayload::Text,
        };
        plans.push(ResponsePlan {
            status: code,
            payload,
        });
    }

    plans.sort_by_key(|plan| plan.status);

    let mut members: Vec<TypeExpr> = Vec::new();
    for plan in &plans {
        if plan.status >= 300 {
            continue;
        }
        let ty = match &plan.payload {
            ResponsePayload::Binary => TypeExpr::Blob,
            ResponsePayload::Json(ty) => ty.clone(),
            ResponsePayload::Text => TypeExpr::String,
        };
        if !members.contains(&ty) {
            members.push(ty);
        }
    }
    let return_ty = match members.len() {
        0 => TypeExpr::Blob,
        1 => members.remove(0),
        _ => TypeExpr::Union(members),
    };

    (plans, accept, return_ty)
}

fn is_json_media_type(media_type: &str) -> bool {
    media_type == DEFAULT_MEDIA_TYPE || media_type.ends_with("+json")
}

fn resolve_or_open(resolver: &mut Resolver<'_>, schema: &Schema) -> TypeExpr {
    let node = SchemaNode::from_schema(schema);
    match resolver.resolve_type(&node) {
        Ok(ty) => ty,
        Err(err) => {
            warn!("Schema degraded to the open type: {err}");
            TypeExpr::Unknown
        }
    }
}
