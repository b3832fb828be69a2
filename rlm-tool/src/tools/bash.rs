//! `bash` — run a shell command with a bounded timeout.

use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use rlm_proto::truncate::truncate_head_tail;
use serde::Deserialize;
use serde_json::json;
use tokio::io::AsyncReadExt;
use tokio::process::Command;

use crate::context::ToolContext;
use crate::error::ToolError;
use crate::traits::SandboxTool;

/// Default `bash` timeout, per §4.5.
pub const DEFAULT_TIMEOUT_MS: u64 = 30_000;
/// Maximum `bash` timeout a caller may request, per §4.5.
pub const MAX_TIMEOUT_MS: u64 = 300_000;
/// Combined stdout+stderr head-truncation limit, per §4.5.
pub const OUTPUT_LIMIT_BYTES: usize = 50_000;

#[derive(Deserialize)]
struct Input {
    command: String,
    #[serde(default)]
    timeout_ms: Option<u64>,
    #[serde(default)]
    cwd: Option<String>,
}

/// Runs a shell command, capturing combined stdout+stderr.
pub struct Bash;

#[async_trait]
impl SandboxTool for Bash {
    fn name(&self) -> &str {
        "bash"
    }

    fn description(&self) -> &str {
        "Run a shell command and capture its combined stdout and stderr."
    }

    fn input_schema(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "command": { "type": "string" },
                "timeout_ms": { "type": "integer" },
                "cwd": { "type": "string" },
            },
            "required": ["command"],
        })
    }

    async fn call(&self, input: serde_json::Value, ctx: &ToolContext) -> Result<String, ToolError> {
        let Input { command, timeout_ms, cwd } = serde_json::from_value(input)
            .map_err(|e| ToolError::InvalidInput(e.to_string()))?;

        let timeout = Duration::from_millis(timeout_ms.unwrap_or(DEFAULT_TIMEOUT_MS).min(MAX_TIMEOUT_MS));
        let work_dir = cwd.map(|c| ctx.resolve(&c)).unwrap_or_else(|| ctx.cwd.clone());

        let mut child = Command::new("sh")
            .arg("-c")
            .arg(&command)
            .current_dir(&work_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()?;

        let mut stdout = child.stdout.take().expect("piped stdout");
        let mut stderr = child.stderr.take().expect("piped stderr");

        let run = async {
            let mut out = Vec::new();
            let mut err = Vec::new();
            let (_, _, status) = tokio::join!(
                stdout.read_to_end(&mut out),
                stderr.read_to_end(&mut err),
                child.wait(),
            );
            (out, err, status)
        };

        let (out, err, status) = match tokio::time::timeout(timeout, run).await {
            Ok((out, err, status)) => (out, err, status?),
            Err(_) => {
                let _ = child.start_kill();
                return Err(ToolError::Timeout(timeout.as_millis() as u64));
            }
        };

        let mut combined = String::from_utf8_lossy(&out).into_owned();
        combined.push_str(&String::from_utf8_lossy(&err));
        let truncated = truncate_head_tail(&combined, OUTPUT_LIMIT_BYTES);

        if status.success() {
            Ok(truncated)
        } else {
            Err(ToolError::NonZeroExit { status: status.code().unwrap_or(-1), output: truncated })
        }
    }
}
