//! Prompt assembly (§4.2's "the loop, per iteration", step 1).
//!
//! Two message shapes: the one-time system message, and the synthesized
//! "environment" message rebuilt every iteration from the current
//! bindings digest, the previous iteration's (possibly truncated) stdout
//! or eval error, and the original query.

use rlm_proto::{Bindings, Message};

/// The one-time system message introducing the sandbox contract.
pub fn system_message(context: &str) -> Message {
    Message::system(format!(
        "You are solving a task by writing JavaScript that runs in a sandbox. \
         Every reply must be a JSON object `{{\"reasoning\": string, \"code\": string}}`. \
         The sandbox exposes a `worker` global with `lm_query`, `parallel_query`, `direct_query`, \
         and the `read_file`/`write_file`/`edit_file`/`bash`/`grep`/`glob`/`ls` tools, all returning \
         Promises. Variables you assign at the top level persist across iterations. Set the variable \
         `final_answer` to finish the task.\n\nContext:\n{context}"
    ))
}

/// The per-iteration "environment" message: bindings digest, previous
/// stdout (or eval error), and the original query — rebuilt fresh every
/// iteration rather than carried forward, per §4.2.
///
/// `binding_preview_bytes` and `stdout_limit_bytes` are the caller's
/// configured [`rlm_proto::RlmConfig::binding_preview_bytes`] and
/// [`rlm_proto::RlmConfig::stdout_limit_bytes`] — truncation width is a
/// per-engine knob, not a fixed constant.
pub fn environment_message(
    bindings: &Bindings,
    stdout: &str,
    eval_error: Option<&str>,
    query: &str,
    binding_preview_bytes: usize,
    stdout_limit_bytes: usize,
) -> Message {
    let digest = bindings.digest(binding_preview_bytes);
    let mut text = String::new();
    text.push_str("Current bindings:\n");
    if digest.is_empty() {
        text.push_str("(none)\n");
    } else {
        for entry in &digest {
            text.push_str(&format!("- {} ({}, {} bytes): {}\n", entry.name, entry.type_name, entry.byte_size, entry.preview));
        }
    }

    match eval_error {
        Some(err) => {
            text.push_str("\nThe previous snippet failed:\n");
            text.push_str(&rlm_proto::truncate::truncate_head_tail(err, stdout_limit_bytes));
            text.push('\n');
        }
        None => {
            text.push_str("\nOutput from the previous snippet:\n");
            if stdout.is_empty() {
                text.push_str("(no output)\n");
            } else {
                text.push_str(&rlm_proto::truncate::truncate_head_tail(stdout, stdout_limit_bytes));
                text.push('\n');
            }
        }
    }

    text.push_str(&format!("\nOriginal query: {query}\n"));
    Message::user(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn environment_message_lists_bindings() {
        let mut bindings = Bindings::new();
        bindings.set("count", serde_json::json!(3));
        let msg = environment_message(&bindings, "done", None, "how many?", 200, 50_000);
        assert!(msg.text.contains("count"));
        assert!(msg.text.contains("how many?"));
    }

    #[test]
    fn environment_message_surfaces_eval_error_instead_of_stdout() {
        let msg = environment_message(&Bindings::new(), "ignored", Some("boom"), "q", 200, 50_000);
        assert!(msg.text.contains("previous snippet failed"));
        assert!(msg.text.contains("boom"));
        assert!(!msg.text.contains("ignored"));
    }

    #[test]
    fn empty_bindings_say_none() {
        let msg = environment_message(&Bindings::new(), "", None, "q", 200, 50_000);
        assert!(msg.text.contains("(none)"));
        assert!(msg.text.contains("(no output)"));
    }
}
