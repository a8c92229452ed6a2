//! Message router: dispatches inbound chat events to the relay path or the
//! long-running action path.
//!
//! Messages with no routable text, unknown commands, and events outside the
//! staleness window are silently dropped; they are not errors.

use crate::channels::{Formatting, InboundMessage, Transport};
use crate::progress::{self, ActionKind, ActionRequest};
use crate::pulse;
use crate::upstream::{GatewayResult, UpstreamBackend};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

/// Events older than this (by sender timestamp) are dropped unprocessed.
const STALENESS_WINDOW_SECS: i64 = 60;
/// Minimum gap between processed messages from one sender.
const RATE_LIMIT: Duration = Duration::from_millis(2000);

/// Reply sent when the completion upstream is unreachable. Raw errors never
/// reach the chat.
const RESYNC_PLACEHOLDER: &str = "dimension resyncing, try again in a moment";

const START_GREETING: &str = "pulsebot online.\n\n\
send any text to talk to the dimension engine.\n\
/imagine <prompt> searches the archive with live progress.";

/// Dispatches inbound events. Holds the transport and upstream as explicit
/// instances constructed at process start; no hidden global state.
pub struct Router {
    transport: Arc<dyn Transport>,
    upstream: Arc<dyn UpstreamBackend>,
    /// Period between progress updates for spawned actions.
    tick: Duration,
    last_seen: Mutex<HashMap<i64, Instant>>,
}

impl Router {
    pub fn new(
        transport: Arc<dyn Transport>,
        upstream: Arc<dyn UpstreamBackend>,
        tick: Duration,
    ) -> Self {
        Self {
            transport,
            upstream,
            tick,
            last_seen: Mutex::new(HashMap::new()),
        }
    }

    /// Route one inbound event: drop (empty, stale, unknown command, rate
    /// limited), greet, start an action, or relay.
    pub async fn dispatch(&self, msg: InboundMessage) {
        let text = msg.text.trim();
        if text.is_empty() {
            return;
        }
        let age = chrono::Utc::now().timestamp() - msg.timestamp;
        if age > STALENESS_WINDOW_SECS {
            log::debug!("router: dropping stale message ({}s old)", age);
            return;
        }
        if self.rate_limited(msg.sender_id).await {
            log::debug!("router: rate limited sender {}", msg.sender_id);
            return;
        }
        match text.strip_prefix('/') {
            Some(command) => self.dispatch_command(&msg, command).await,
            None => self.relay(&msg, text).await,
        }
    }

    /// True when the sender already had a message processed inside the rate
    /// window; otherwise records this one.
    async fn rate_limited(&self, sender_id: i64) -> bool {
        let now = Instant::now();
        let mut last_seen = self.last_seen.lock().await;
        match last_seen.get(&sender_id) {
            Some(prev) if now.duration_since(*prev) < RATE_LIMIT => true,
            _ => {
                last_seen.insert(sender_id, now);
                false
            }
        }
    }

    /// Two recognized commands: `/start` (no arguments) and
    /// `/imagine <prompt>`. Everything else starting with `/` is dropped.
    async fn dispatch_command(&self, msg: &InboundMessage, command: &str) {
        let mut parts = command.splitn(2, char::is_whitespace);
        let name = parts.next().unwrap_or("").to_ascii_lowercase();
        let arg = parts.next().map(str::trim).unwrap_or("");
        match name.as_str() {
            "start" if arg.is_empty() => {
                if let Err(e) = self
                    .transport
                    .send_message(msg.chat_id, START_GREETING, Formatting::Plain)
                    .await
                {
                    log::warn!("router: greeting send failed: {}", e);
                }
            }
            "imagine" if !arg.is_empty() => self.start_action(msg.chat_id, arg),
            _ => log::debug!("router: dropping unrecognized command /{}", name),
        }
    }

    /// Spawn a progress controller for this invocation and return
    /// immediately. Each invocation owns its own timer and message handle.
    fn start_action(&self, chat_id: i64, prompt: &str) {
        let request = ActionRequest {
            chat_id,
            prompt: prompt.to_string(),
            kind: ActionKind::Imagine,
        };
        let transport = self.transport.clone();
        let upstream = self.upstream.clone();
        let tick = self.tick;
        tokio::spawn(async move {
            if let Err(e) = progress::run_action(transport, upstream, request, tick).await {
                log::warn!("action: initial progress render failed: {}", e);
            }
        });
    }

    /// Relay path: one completion call, pulse annotation, one reply.
    async fn relay(&self, msg: &InboundMessage, text: &str) {
        let reply = match self.upstream.complete(text, msg.chat_id).await {
            GatewayResult::Text(response) => annotate(response, text),
            _ => RESYNC_PLACEHOLDER.to_string(),
        };
        if let Err(e) = self
            .transport
            .send_message(msg.chat_id, &reply, Formatting::Plain)
            .await
        {
            log::warn!("router: relay send failed: {}", e);
        }
    }
}

/// Append the cosmetic pulse line derived from the message length.
fn annotate(response: String, text: &str) -> String {
    let complexity = (text.chars().count() % 10) as u32;
    match pulse::compute_pulse(complexity) {
        Ok(p) => format!(
            "{}\n\npulse {} Hz, thinking time {} ms",
            response, p.frequency, p.thinking_time_ms
        ),
        Err(e) => {
            log::debug!("router: pulse computation failed: {}", e);
            response
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn annotate_appends_pulse_line() {
        // "hello" has 5 chars, so complexity 5.
        let out = annotate("hi there".to_string(), "hello");
        assert!(out.starts_with("hi there\n\n"));
        assert!(out.contains("pulse 4.3702 Hz"));
        assert!(out.contains("thinking time 228.825 ms"));
    }

    #[test]
    fn annotate_wraps_complexity_at_ten() {
        // 12 chars reduce to complexity 2.
        let out = annotate("ok".to_string(), "abcdefghijkl");
        assert!(out.contains("pulse 3.3282 Hz"), "{}", out);
    }
}
