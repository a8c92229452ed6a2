//! Action progress controller: a timed, cancellable progress rendering loop
//! over one asynchronous document-store search.
//!
//! Each action invocation owns one controller task with its own timer and
//! message handle; concurrent invocations never share state.

use crate::channels::{Formatting, Transport};
use crate::upstream::{GatewayResult, UpstreamBackend};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::MissedTickBehavior;

/// Fixed percent increment per tick.
const STEP: u8 = 20;

/// Kind of long-running action, rendered in the progress text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionKind {
    Imagine,
}

impl ActionKind {
    pub fn label(&self) -> &'static str {
        match self {
            ActionKind::Imagine => "imagine",
        }
    }
}

/// One user-triggered action and its prompt. Created by the router, consumed
/// by the controller, discarded after the terminal render.
#[derive(Debug, Clone)]
pub struct ActionRequest {
    pub chat_id: i64,
    pub prompt: String,
    pub kind: ActionKind,
}

/// Progress phase for one invocation. Percent only ever grows, in fixed
/// steps; the first step past 100 lands on `Completed`, and `Completed`
/// never advances again, so the terminal transition fires at most once.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressPhase {
    Started,
    Advancing { percent: u8 },
    Completed,
}

impl ProgressPhase {
    /// Advance by one tick.
    pub fn advance(self) -> ProgressPhase {
        match self {
            ProgressPhase::Started => ProgressPhase::Advancing { percent: STEP },
            ProgressPhase::Advancing { percent } => {
                let next = percent.saturating_add(STEP);
                if next <= 100 {
                    ProgressPhase::Advancing { percent: next }
                } else {
                    ProgressPhase::Completed
                }
            }
            ProgressPhase::Completed => ProgressPhase::Completed,
        }
    }
}

/// Drive one action invocation from the initial 0% render to its terminal
/// render. Returns Err only when the initial progress message cannot be sent;
/// later render failures are swallowed.
pub async fn run_action(
    transport: Arc<dyn Transport>,
    upstream: Arc<dyn UpstreamBackend>,
    request: ActionRequest,
    tick: Duration,
) -> Result<(), String> {
    let handle = transport
        .send_message(request.chat_id, &render_progress(0, &request), Formatting::Plain)
        .await?;

    let mut interval = tokio::time::interval(tick);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The first interval tick completes immediately; consume it so the first
    // visible update lands one full period after the 0% render.
    interval.tick().await;

    let mut phase = ProgressPhase::Started;
    loop {
        interval.tick().await;
        phase = phase.advance();
        let ProgressPhase::Advancing { percent } = phase else {
            break;
        };
        // Intermediate edit failures (e.g. the message was deleted) are
        // dropped by policy; the countdown continues regardless.
        let _ = transport
            .edit_message(
                request.chat_id,
                handle,
                &render_progress(percent, &request),
                Formatting::Plain,
            )
            .await;
    }

    let result = upstream.search(&request.prompt).await;
    let (text, formatting) = render_terminal(&result, &request);
    if let Err(e) = transport
        .edit_message(request.chat_id, handle, &text, formatting)
        .await
    {
        log::warn!("action: terminal render failed: {}", e);
    }
    Ok(())
}

fn render_progress(percent: u8, request: &ActionRequest) -> String {
    format!(
        "working on {}: \"{}\"\nprogress: {}%",
        request.kind.label(),
        request.prompt,
        percent
    )
}

/// Terminal render. An empty hit list and an unreachable search service read
/// the same to the user; the distinction stays in the logs only.
fn render_terminal(result: &GatewayResult, request: &ActionRequest) -> (String, Formatting) {
    match result {
        GatewayResult::Files(files) if !files.is_empty() => {
            let mut lines = vec![format!("found files for \"{}\":", escape_html(&request.prompt))];
            for f in files {
                lines.push(format!(
                    "<a href=\"{}\">{}</a>",
                    escape_html(&f.url),
                    escape_html(&f.name)
                ));
            }
            (lines.join("\n"), Formatting::Html)
        }
        _ => (
            format!("{} completed, no matching files", request.kind.label()),
            Formatting::Plain,
        ),
    }
}

fn escape_html(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phase_sequence_is_fixed_steps_then_completed() {
        let mut phase = ProgressPhase::Started;
        let mut percents = Vec::new();
        loop {
            phase = phase.advance();
            match phase {
                ProgressPhase::Advancing { percent } => percents.push(percent),
                ProgressPhase::Completed => break,
                ProgressPhase::Started => unreachable!("advance never yields Started"),
            }
        }
        assert_eq!(percents, vec![20, 40, 60, 80, 100]);
    }

    #[test]
    fn completed_never_advances_again() {
        let phase = ProgressPhase::Completed;
        assert_eq!(phase.advance(), ProgressPhase::Completed);
    }

    #[test]
    fn terminal_render_links_files() {
        let request = ActionRequest {
            chat_id: 1,
            prompt: "cat".to_string(),
            kind: ActionKind::Imagine,
        };
        let result = GatewayResult::Files(vec![crate::upstream::FileEntry {
            name: "A".to_string(),
            url: "http://x".to_string(),
        }]);
        let (text, formatting) = render_terminal(&result, &request);
        assert!(text.contains("<a href=\"http://x\">A</a>"), "{}", text);
        assert!(text.starts_with("found files for \"cat\":"));
        assert_eq!(formatting, Formatting::Html);
    }

    #[test]
    fn empty_list_and_failure_render_identically() {
        let request = ActionRequest {
            chat_id: 1,
            prompt: "cat".to_string(),
            kind: ActionKind::Imagine,
        };
        let empty = render_terminal(&GatewayResult::Files(vec![]), &request);
        let failed = render_terminal(
            &GatewayResult::Failure(crate::upstream::SEARCH_UNREACHABLE),
            &request,
        );
        assert_eq!(empty, failed);
        assert!(empty.0.contains("no matching files"));
    }

    #[test]
    fn html_metacharacters_are_escaped() {
        let request = ActionRequest {
            chat_id: 1,
            prompt: "a <b> & \"c\"".to_string(),
            kind: ActionKind::Imagine,
        };
        let result = GatewayResult::Files(vec![crate::upstream::FileEntry {
            name: "<script>".to_string(),
            url: "http://x?a=1&b=2".to_string(),
        }]);
        let (text, _) = render_terminal(&result, &request);
        assert!(text.contains("&lt;script&gt;"));
        assert!(text.contains("http://x?a=1&amp;b=2"));
        assert!(!text.contains("<script>"));
    }
}
