//! TypeScript source emission: the runtime prelude, named type
//! declarations, and one API class per tag.
//!
//! Everything here is mechanical string building over the classified
//! model. The emitted module is self-contained: it starts with the client
//! runtime source so generated files need no sibling imports.

use std::collections::HashSet;

use tracing::warn;

use crate::classify::{
    ApiGroup, BodyKind, MethodVariant, ParamLocation, ResponsePayload,
};
use crate::tokens::{is_reserved_word, lower_first, strip_identifier, to_snake_case};
use crate::types::{Emit, TypeDecl};

/// The client runtime embedded at the top of every generated module.
///
/// The generated methods depend on this exact contract: `Client.fetch`
/// resolves the URL, runs the middleware chain, and hands the raw response
/// to the per-method handler; `processJson` applies the installed JSON
/// hook; `ResponseError` carries the originating request with any
/// transport credential handle scrubbed.
pub const RUNTIME_PRELUDE: &str = r#"export type ApiRequest = {
  pathname: string;
  method: string;
  searchParams: URLSearchParams;
  headers: Record<string, string>;
  body?: any;
  agent?: any;
};

export type RequestHandler = (response: Response) => Promise<any>;

export interface ClientMiddleware {
  handle(
    request: ApiRequest,
    next: (request: ApiRequest) => Promise<Response>,
  ): Promise<Response>;
}

export class Client {
  constructor(
    private readonly basePath: string,
    private readonly transport: (url: string, request: ApiRequest) => Promise<Response>,
    private readonly middlewares: Array<ClientMiddleware> = [],
    private readonly jsonHook: (value: any) => any = (value) => value,
  ) {}

  processJson(value: any): any {
    return this.jsonHook(value);
  }

  async fetch(request: ApiRequest, handler: RequestHandler): Promise<any> {
    const url = new URL(this.basePath + request.pathname);
    request.searchParams.forEach((value, key) =>
      url.searchParams.append(key, value),
    );

    const dispatch = (current: ApiRequest, index: number): Promise<Response> => {
      const middleware = this.middlewares[index];
      if (!middleware) {
        return this.transport(url.href, current);
      }
      return middleware.handle(current, (next) => dispatch(next, index + 1));
    };

    const response = await dispatch(request, 0);
    return handler(response);
  }
}

export class ResponseError extends Error {
  readonly request: ApiRequest;

  constructor(request: ApiRequest, readonly response: Response) {
    super(`${response.status} ${response.statusText}`);
    this.request = { ...request, agent: undefined };
  }
}
"#;

/// Assemble the complete generated module: prelude, then named type
/// declarations, then one class per API group.
pub fn emit_module(decls: &[TypeDecl], groups: &[ApiGroup]) -> String {
    let mut out = String::new();
    out.push_str(RUNTIME_PRELUDE);
    out.push('\n');

    for decl in decls {
        out.push_str(&decl.emit());
        out.push('\n');
    }

    for group in groups {
        out.push_str(&emit_group(group));
        out.push('\n');
    }

    out
}

fn emit_group(group: &ApiGroup) -> String {
    let mut out = String::new();
    out.push_str(&format!("export class {} {{\n", group.name));
    out.push_str("  constructor(private readonly client: Client) {}\n");
    for method in &group.methods {
        out.push('\n');
        out.push_str(&emit_method(method));
    }
    out.push_str("}\n");
    out
}

/// Emit one callable method for a classified variant: signature, request
/// construction, and the status-dispatch handler passed to the runtime.
fn emit_method(variant: &MethodVariant) -> String {
    let idents = param_idents(variant);
    let mut out = String::new();

    // Signature: a required body leads, an optional body trails.
    let mut args: Vec<String> = Vec::new();
    if let Some(body) = variant.body.as_ref().filter(|b| b.required) {
        args.push(format!("requestBody: {}", body.ty.emit()));
    }
    for (param, ident) in variant.params.iter().zip(&idents) {
        let opt = if param.required { "" } else { "?" };
        args.push(format!("{ident}{opt}: {}", param.ty.emit()));
    }
    if let Some(body) = variant.body.as_ref().filter(|b| !b.required) {
        args.push(format!("requestBody?: {}", body.ty.emit()));
    }
    out.push_str(&format!(
        "  async {}({}): Promise<{}> {{\n",
        variant.name,
        args.join(", "),
        variant.return_ty.emit()
    ));

    out.push_str("    const request: ApiRequest = {\n");
    out.push_str(&format!(
        "      pathname: '{}',\n",
        escape_single(&variant.path)
    ));
    out.push_str(&format!("      method: '{}',\n", variant.method.as_str()));
    out.push_str("      searchParams: new URLSearchParams(),\n");
    out.push_str("      headers: {},\n");
    out.push_str("    };\n");

    // Absent optional parameters leave the request untouched.
    for (param, ident) in variant.params.iter().zip(&idents) {
        let line = match param.location {
            ParamLocation::Path => {
                let placeholder = find_placeholder(&variant.path, &param.name);
                format!(
                    "request.pathname = request.pathname.replace('{{{placeholder}}}', encodeURIComponent(String({ident})));"
                )
            }
            ParamLocation::Query => format!(
                "request.searchParams.append('{}', String({ident}));",
                escape_single(&param.name)
            ),
            ParamLocation::Header => format!(
                "request.headers['{}'] = String({ident});",
                escape_single(&param.name)
            ),
        };
        if param.required {
            out.push_str(&format!("    {line}\n"));
        } else {
            out.push_str(&format!("    if ({ident} !== undefined) {{\n"));
            out.push_str(&format!("      {line}\n"));
            out.push_str("    }\n");
        }
    }

    if let Some(body) = &variant.body {
        let serialize = match body.kind {
            BodyKind::Json => "request.body = JSON.stringify(requestBody);",
            // Verbatim string bodies and opaque form payloads pass through.
            BodyKind::Text | BodyKind::Multipart => "request.body = requestBody;",
        };
        let content_type = format!(
            "request.headers['Content-Type'] = '{}';",
            escape_single(&variant.media_type)
        );
        if body.required {
            out.push_str(&format!("    {content_type}\n"));
            out.push_str(&format!("    {serialize}\n"));
        } else {
            out.push_str("    if (requestBody !== undefined) {\n");
            out.push_str(&format!("      {content_type}\n"));
            out.push_str(&format!("      {serialize}\n"));
            out.push_str("    }\n");
        }
    }

    if variant.accept {
        out.push_str(&format!(
            "    request.headers['Accept'] = '{}';\n",
            escape_single(&variant.media_type)
        ));
    }

    // Status dispatch: declared codes first, then the total default branch.
    out.push_str("    return this.client.fetch(request, async (response) => {\n");
    out.push_str("      switch (response.status) {\n");
    for plan in &variant.responses {
        out.push_str(&format!("        case {}:\n", plan.status));
        if plan.status < 400 {
            let resolve = match &plan.payload {
                ResponsePayload::Binary => "return await response.blob();",
                ResponsePayload::Json(_) => {
                    "return this.client.processJson(await response.json());"
                }
                ResponsePayload::Text => "return await response.text();",
            };
            out.push_str(&format!("          {resolve}\n"));
        } else {
            out.push_str("          throw new ResponseError(request, response);\n");
        }
    }
    out.push_str("        default:\n");
    out.push_str("          if (response.status < 400) {\n");
    out.push_str("            return await response.blob();\n");
    out.push_str("          }\n");
    out.push_str("          throw new ResponseError(request, response);\n");
    out.push_str("      }\n");
    out.push_str("    });\n");
    out.push_str("  }\n");
    out
}

/// Find the path-template placeholder a parameter substitutes, tolerating
/// snake_case/camelCase mismatches between template and declaration.
fn find_placeholder(path: &str, param_name: &str) -> String {
    for segment in placeholders(path) {
        if segment == param_name {
            return segment.to_string();
        }
    }
    let wanted = to_snake_case(param_name);
    for segment in placeholders(path) {
        if to_snake_case(segment) == wanted {
            return segment.to_string();
        }
    }
    warn!(path, param_name, "No matching path placeholder for parameter.");
    param_name.to_string()
}

fn placeholders(path: &str) -> impl Iterator<Item = &str> {
    path.split('{')
        .skip(1)
        .filter_map(|rest| rest.split('}').next())
}

/// Emitted argument identifiers: camelCase forms of the original names,
/// kept clear of keywords, each other, and the fixed locals every method
/// body declares.
fn param_idents(variant: &MethodVariant) -> Vec<String> {
    let mut taken: HashSet<String> = ["requestBody", "request", "response"]
        .iter()
        .map(|s| (*s).to_string())
        .collect();
    variant
        .params
        .iter()
        .map(|param| {
            let base = lower_first(&strip_identifier(&param.name));
            let mut ident = base.clone();
            let mut suffix = 1usize;
            while taken.contains(&ident) || is_reserved_word(&ident) {
                ident = format!("{base}_{suffix}");
                suffix += 1;
            }
            taken.insert(ident.clone());
            ident
        })
        .collect()
}

fn escape_single(s: &str) -> String {
    s.replace('\\', "\\\\").replace('\'', "\\'")
}
