//! Installs the sandbox's global environment: `console`/`print` stdout
//! capture, the injected bindings, and the `worker` bridge object whose
//! methods round-trip through [`rlm_proto::WorkerFacing`] (§4.4).
//!
//! Every bridge method crosses the await boundary as a plain JSON string
//! rather than a live `rquickjs::Value`, sidestepping the lifetime
//! entanglement of holding a `Ctx<'js>` across an `.await` point. A short
//! JS prelude (below) re-parses those strings into real values on the JS
//! side, so sandboxed code still sees ordinary objects/arrays/promises.

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use rlm_proto::{Bindings, DirectQueryRequest, ModelSize, SubcallRequest, ToolRequest, WorkerFacing};
use rquickjs::function::Async;
use rquickjs::{Ctx, Function, Object};

use crate::error::EvalError;
use crate::json_bridge::json_to_js;

const PRELUDE: &str = r#"
globalThis.console = {
    log: function(...args) {
        __print_raw(args.map(a => (typeof a === "string" ? a : JSON.stringify(a))).join(" ") + "\n");
    },
};
globalThis.print = globalThis.console.log;

function __unwrap_tool(raw) {
    const parsed = JSON.parse(raw);
    if (parsed.ok) { return parsed.value; }
    throw new Error(parsed.error);
}

globalThis.worker = {
    lm_query: function(query, opts) {
        opts = opts || {};
        return __lm_query_raw(query, JSON.stringify(opts)).then(JSON.parse);
    },
    parallel_query: function(queries) {
        return __parallel_query_raw(JSON.stringify(queries)).then(JSON.parse);
    },
    direct_query: function(query, schema, opts) {
        opts = opts || {};
        return __direct_query_raw(query, JSON.stringify(schema), JSON.stringify(opts)).then(JSON.parse);
    },
    read_file: function(path) {
        return __tool_raw("read_file", JSON.stringify({ path: path })).then(__unwrap_tool);
    },
    write_file: function(path, content) {
        return __tool_raw("write_file", JSON.stringify({ path: path, content: content })).then(__unwrap_tool);
    },
    edit_file: function(path, old_string, new_string) {
        return __tool_raw("edit_file", JSON.stringify({
            path: path, old_string: old_string, new_string: new_string,
        })).then(__unwrap_tool);
    },
    bash: function(command, opts) {
        opts = opts || {};
        return __tool_raw("bash", JSON.stringify(Object.assign({ command: command }, opts))).then(__unwrap_tool);
    },
    grep: function(pattern, opts) {
        opts = opts || {};
        return __tool_raw("grep", JSON.stringify(Object.assign({ pattern: pattern }, opts))).then(__unwrap_tool);
    },
    glob: function(pattern, opts) {
        opts = opts || {};
        return __tool_raw("glob", JSON.stringify(Object.assign({ pattern: pattern }, opts))).then(__unwrap_tool);
    },
    ls: function(path) {
        return __tool_raw("ls", JSON.stringify({ path: path })).then(__unwrap_tool);
    },
};
"#;

#[derive(serde::Deserialize, Default)]
struct SubcallOpts {
    #[serde(default)]
    model_size: Option<String>,
    #[serde(default)]
    schema: Option<serde_json::Value>,
    #[serde(default)]
    context: Option<String>,
}

fn parse_model_size(s: Option<&str>) -> ModelSize {
    match s {
        Some("small") => ModelSize::Small,
        _ => ModelSize::Large,
    }
}

fn encode_outcome(outcome: Result<serde_json::Value, String>) -> String {
    let arr = match outcome {
        Ok(value) => serde_json::json!([true, value]),
        Err(reason) => serde_json::json!([false, reason]),
    };
    arr.to_string()
}

/// Install `console`/`print`, the `worker` bridge, and every binding, then
/// return the set of top-level global names present at that point (used
/// later to tell "pre-existing globals" apart from "names the snippet
/// just defined").
pub async fn install_globals<'js>(
    ctx: &Ctx<'js>,
    bindings: &Bindings,
    _cwd: &PathBuf,
    worker: Arc<dyn WorkerFacing>,
    stdout: Arc<Mutex<String>>,
) -> Result<HashSet<String>, EvalError> {
    let globals = ctx.globals();

    for (name, value) in bindings.iter() {
        let js_value = json_to_js(ctx, value)?;
        globals.set(name, js_value).map_err(|e| EvalError::Crashed(e.to_string()))?;
    }

    let print_fn = Function::new(ctx.clone(), move |text: String| {
        if let Ok(mut buf) = stdout.lock() {
            buf.push_str(&text);
        }
    })
    .map_err(|e| EvalError::Crashed(e.to_string()))?;
    globals.set("__print_raw", print_fn).map_err(|e| EvalError::Crashed(e.to_string()))?;

    let w = worker.clone();
    let lm_query_fn = Function::new(
        ctx.clone(),
        Async(move |query: String, opts_json: String| {
            let w = w.clone();
            async move {
                let opts: SubcallOpts = serde_json::from_str(&opts_json).unwrap_or_default();
                let req = SubcallRequest {
                    query,
                    model_size: parse_model_size(opts.model_size.as_deref()),
                    schema: opts.schema,
                    context: opts.context,
                };
                encode_outcome(w.lm_query(req).await)
            }
        }),
    )
    .map_err(|e| EvalError::Crashed(e.to_string()))?;
    globals.set("__lm_query_raw", lm_query_fn).map_err(|e| EvalError::Crashed(e.to_string()))?;

    let w = worker.clone();
    let parallel_query_fn = Function::new(
        ctx.clone(),
        Async(move |queries_json: String| {
            let w = w.clone();
            async move {
                let queries: Vec<String> = serde_json::from_str(&queries_json).unwrap_or_default();
                let reqs = queries.into_iter().map(SubcallRequest::simple).collect();
                let outcomes = w.parallel_query(reqs).await;
                let encoded: Vec<serde_json::Value> = outcomes
                    .into_iter()
                    .map(|o| match o {
                        Ok(v) => serde_json::json!([true, v]),
                        Err(e) => serde_json::json!([false, e]),
                    })
                    .collect();
                serde_json::Value::Array(encoded).to_string()
            }
        }),
    )
    .map_err(|e| EvalError::Crashed(e.to_string()))?;
    globals
        .set("__parallel_query_raw", parallel_query_fn)
        .map_err(|e| EvalError::Crashed(e.to_string()))?;

    let w = worker.clone();
    let direct_query_fn = Function::new(
        ctx.clone(),
        Async(move |query: String, schema_json: String, opts_json: String| {
            let w = w.clone();
            async move {
                let schema: serde_json::Value = serde_json::from_str(&schema_json).unwrap_or(serde_json::Value::Null);
                let opts: SubcallOpts = serde_json::from_str(&opts_json).unwrap_or_default();
                let req = DirectQueryRequest {
                    query,
                    schema,
                    model_size: parse_model_size(opts.model_size.as_deref()),
                    context: opts.context,
                };
                encode_outcome(w.direct_query(req).await)
            }
        }),
    )
    .map_err(|e| EvalError::Crashed(e.to_string()))?;
    globals
        .set("__direct_query_raw", direct_query_fn)
        .map_err(|e| EvalError::Crashed(e.to_string()))?;

    let w = worker.clone();
    let tool_fn = Function::new(
        ctx.clone(),
        Async(move |name: String, input_json: String| {
            let w = w.clone();
            async move {
                let input: serde_json::Value = serde_json::from_str(&input_json).unwrap_or(serde_json::Value::Null);
                let outcome = w.tool_call(ToolRequest { name, input }).await;
                let payload = match outcome {
                    Ok(value) => serde_json::json!({ "ok": true, "value": value }),
                    Err(reason) => serde_json::json!({ "ok": false, "error": reason }),
                };
                payload.to_string()
            }
        }),
    )
    .map_err(|e| EvalError::Crashed(e.to_string()))?;
    globals.set("__tool_raw", tool_fn).map_err(|e| EvalError::Crashed(e.to_string()))?;

    ctx.eval::<(), _>(PRELUDE).map_err(|e| EvalError::Crashed(format!("prelude install failed: {e}")))?;

    collect_names(&globals)
}

fn collect_names(globals: &Object<'_>) -> Result<HashSet<String>, EvalError> {
    let mut names = HashSet::new();
    for key in globals.keys::<String>() {
        names.insert(key.map_err(|e| EvalError::Crashed(e.to_string()))?);
    }
    Ok(names)
}
