//! The Evaluator: one `rquickjs` execution context per snippet (§4.1).
//!
//! Each call builds a fresh `AsyncRuntime`/`AsyncContext` pair, seeds it
//! with the caller's bindings and the `worker` bridge (`bridge.rs`), runs
//! the snippet, and tears the context down. Nothing survives from one
//! call to the next — isolation is structural, not a convention the
//! caller has to remember to uphold.
//!
//! Timeouts are enforced twice. An `AtomicBool` flag is threaded into
//! QuickJS's interrupt handler, so a snippet stuck in a tight loop is cut
//! off mid-bytecode rather than only at the next `await` point; a
//! `tokio::time::timeout` around the whole call is the backstop for a
//! snippet that's merely waiting on a `worker` call that never resolves.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use rlm_proto::{Bindings, WorkerFacing};
use rquickjs::{async_with, AsyncContext, AsyncRuntime, CatchResultExt, Ctx, Value};

use crate::bridge::install_globals;
use crate::error::EvalError;
use crate::json_bridge::js_to_json;
use crate::request::{EvalFailure, EvalOutcome, EvalRequest, EvalSuccess};

/// Extra time given to the outer watchdog beyond the snippet's own
/// timeout, so the QuickJS interrupt has a chance to unwind cleanly
/// before the whole call is declared a loss.
const INTERRUPT_GRACE: Duration = Duration::from_millis(1_000);

/// Runs sandboxed snippets against a fresh interpreter per call.
#[derive(Debug, Default, Clone, Copy)]
pub struct Evaluator;

impl Evaluator {
    /// Construct an evaluator. Stateless — every call is independent.
    pub fn new() -> Self {
        Self
    }

    /// Run one snippet to completion, timeout, or crash.
    #[tracing::instrument(skip_all)]
    pub async fn eval(&self, req: EvalRequest) -> EvalOutcome {
        let EvalRequest { code, bindings, timeout, cwd, worker } = req;
        let original = bindings.clone();
        let stdout = Arc::new(Mutex::new(String::new()));
        let interrupted = Arc::new(AtomicBool::new(false));
        let timeout_std = timeout.to_std();

        let task_stdout = stdout.clone();
        let task_interrupted = interrupted.clone();
        let handle = tokio::spawn(run_snippet(code, bindings, cwd, worker, task_stdout, task_interrupted));
        let abort_handle = handle.abort_handle();

        let watchdog_interrupted = interrupted.clone();
        let watchdog = tokio::spawn(async move {
            tokio::time::sleep(timeout_std).await;
            watchdog_interrupted.store(true, Ordering::Relaxed);
        });

        let outcome = match tokio::time::timeout(timeout_std + INTERRUPT_GRACE, handle).await {
            Ok(Ok(Ok(updated))) => Ok(EvalSuccess { stdout: snapshot(&stdout), bindings: updated }),
            Ok(Ok(Err(error))) => Err(EvalFailure { stdout: snapshot(&stdout), error, bindings: original }),
            Ok(Err(join_error)) => Err(EvalFailure {
                stdout: snapshot(&stdout),
                error: EvalError::Crashed(join_error.to_string()),
                bindings: original,
            }),
            Err(_elapsed) => {
                abort_handle.abort();
                Err(EvalFailure {
                    stdout: snapshot(&stdout),
                    error: EvalError::Timeout(timeout_std.as_millis() as u64),
                    bindings: original,
                })
            }
        };

        watchdog.abort();
        outcome
    }
}

fn snapshot(buf: &Mutex<String>) -> String {
    buf.lock().map(|s| s.clone()).unwrap_or_default()
}

async fn run_snippet(
    code: String,
    bindings: Bindings,
    cwd: PathBuf,
    worker: Arc<dyn WorkerFacing>,
    stdout: Arc<Mutex<String>>,
    interrupted: Arc<AtomicBool>,
) -> Result<Bindings, EvalError> {
    let runtime = AsyncRuntime::new().map_err(|e| EvalError::Crashed(e.to_string()))?;

    let flag = interrupted.clone();
    runtime.set_interrupt_handler(Some(Box::new(move || flag.load(Ordering::Relaxed)))).await;

    let ctx = AsyncContext::full(&runtime).await.map_err(|e| EvalError::Crashed(e.to_string()))?;

    let seed = bindings.clone();
    let known_before: std::collections::HashSet<String> = async_with!(ctx => |ctx| {
        install_globals(&ctx, &seed, &cwd, worker, stdout).await
    })
    .await?;

    let run_result: Result<(), EvalError> = async_with!(ctx => |ctx| { run_code(&ctx, &code).await }).await;

    if let Err(err) = run_result {
        if interrupted.load(Ordering::Relaxed) {
            return Err(EvalError::Timeout(0));
        }
        return Err(err);
    }

    async_with!(ctx => |ctx| { collect_bindings(&ctx, bindings, &known_before) }).await
}

/// Evaluate one snippet's top-level code.
///
/// The snippet is wrapped in an async IIFE and its returned promise is
/// awaited to completion before returning, rather than just evaluating
/// it and returning as soon as the top-level statement completes. A
/// snippet that calls `worker.lm_query`/`parallel_query`/`direct_query`
/// (themselves promises backed by a round trip through the Worker's
/// inbox, per §4.4) only finishes mutating its bindings once that
/// promise settles; without this await, `collect_bindings` could run
/// while such a call was still in flight. Bare top-level assignments
/// (`final_answer = ...`, no `var`/`let`/`const`) still land as
/// properties of the global object in non-strict mode from inside the
/// wrapper, so binding collection is unaffected by the wrapping.
async fn run_code(ctx: &Ctx<'_>, code: &str) -> Result<(), EvalError> {
    let wrapped = format!("(async () => {{\n{code}\n}})()");
    let promise = ctx
        .eval::<rquickjs::Promise, _>(wrapped.as_bytes())
        .catch(ctx)
        .map_err(|caught| classify_js_error(&caught))?;
    promise
        .into_future::<Value>()
        .await
        .catch(ctx)
        .map(|_| ())
        .map_err(|caught| classify_js_error(&caught))
}

fn classify_js_error(caught: &rquickjs::CaughtError<'_>) -> EvalError {
    match caught {
        rquickjs::CaughtError::Error(e) => EvalError::Crashed(e.to_string()),
        rquickjs::CaughtError::Exception(exc) => EvalError::Raised(format_exception(exc)),
        rquickjs::CaughtError::Value(value) => {
            EvalError::Raised(js_to_json(value).map(|v| v.to_string()).unwrap_or_else(|_| "unknown error".into()))
        }
    }
}

fn format_exception(exc: &rquickjs::Exception<'_>) -> String {
    let message = exc.message().unwrap_or_default();
    match exc.stack() {
        Some(stack) if !stack.is_empty() => format!("{message}\n{stack}"),
        _ => message,
    }
}

fn collect_bindings(
    ctx: &Ctx<'_>,
    mut bindings: Bindings,
    known_before: &std::collections::HashSet<String>,
) -> Result<Bindings, EvalError> {
    let globals = ctx.globals();

    let original_names: Vec<String> = bindings.iter().map(|(name, _)| name.to_string()).collect();
    for name in &original_names {
        if let Ok(value) = globals.get::<_, Value>(name.as_str()) {
            bindings.set(name.clone(), js_to_json(&value)?);
        }
    }

    for key in globals.keys::<String>() {
        let key = key.map_err(|e| EvalError::Crashed(e.to_string()))?;
        if known_before.contains(&key) || original_names.contains(&key) {
            continue;
        }
        let value: Value = globals.get(key.as_str()).map_err(|e| EvalError::Crashed(e.to_string()))?;
        bindings.set(key, js_to_json(&value)?);
    }

    Ok(bindings)
}
