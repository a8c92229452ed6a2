//! Shared test doubles: a recording transport and a canned upstream backend.

use async_trait::async_trait;
use lib::channels::{Formatting, MessageId, Transport};
use lib::upstream::{GatewayResult, UpstreamBackend};
use std::sync::atomic::{AtomicI64, AtomicUsize, Ordering};
use tokio::sync::Mutex;

/// One recorded outbound render.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Render {
    Send {
        chat_id: i64,
        message_id: MessageId,
        text: String,
        formatting: Formatting,
    },
    Edit {
        chat_id: i64,
        message_id: MessageId,
        text: String,
        formatting: Formatting,
    },
}

impl Render {
    pub fn message_id(&self) -> MessageId {
        match self {
            Render::Send { message_id, .. } | Render::Edit { message_id, .. } => *message_id,
        }
    }

    pub fn text(&self) -> &str {
        match self {
            Render::Send { text, .. } | Render::Edit { text, .. } => text,
        }
    }
}

/// Transport that records every send/edit; sends hand out increasing message
/// ids. Failure modes are opt-in per test.
#[derive(Default)]
pub struct RecordingTransport {
    next_id: AtomicI64,
    events: Mutex<Vec<Render>>,
    fail_sends: bool,
    fail_edits: bool,
}

impl RecordingTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_sends() -> Self {
        Self {
            fail_sends: true,
            ..Self::default()
        }
    }

    pub fn failing_edits() -> Self {
        Self {
            fail_edits: true,
            ..Self::default()
        }
    }

    pub async fn events(&self) -> Vec<Render> {
        self.events.lock().await.clone()
    }
}

#[async_trait]
impl Transport for RecordingTransport {
    fn id(&self) -> &str {
        "mock"
    }

    fn stop(&self) {}

    async fn send_message(
        &self,
        chat_id: i64,
        text: &str,
        formatting: Formatting,
    ) -> Result<MessageId, String> {
        if self.fail_sends {
            return Err("send refused".to_string());
        }
        let message_id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        self.events.lock().await.push(Render::Send {
            chat_id,
            message_id,
            text: text.to_string(),
            formatting,
        });
        Ok(message_id)
    }

    async fn edit_message(
        &self,
        chat_id: i64,
        message_id: MessageId,
        text: &str,
        formatting: Formatting,
    ) -> Result<(), String> {
        if self.fail_edits {
            return Err("edit refused".to_string());
        }
        self.events.lock().await.push(Render::Edit {
            chat_id,
            message_id,
            text: text.to_string(),
            formatting,
        });
        Ok(())
    }
}

/// Upstream backend returning canned results and counting calls.
pub struct CannedUpstream {
    complete_result: GatewayResult,
    search_result: GatewayResult,
    pub complete_calls: AtomicUsize,
    pub search_calls: AtomicUsize,
    pub queries: Mutex<Vec<String>>,
}

impl CannedUpstream {
    pub fn new(complete_result: GatewayResult, search_result: GatewayResult) -> Self {
        Self {
            complete_result,
            search_result,
            complete_calls: AtomicUsize::new(0),
            search_calls: AtomicUsize::new(0),
            queries: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl UpstreamBackend for CannedUpstream {
    async fn complete(&self, _text: &str, _chat_id: i64) -> GatewayResult {
        self.complete_calls.fetch_add(1, Ordering::SeqCst);
        self.complete_result.clone()
    }

    async fn search(&self, query: &str) -> GatewayResult {
        self.search_calls.fetch_add(1, Ordering::SeqCst);
        self.queries.lock().await.push(query.to_string());
        self.search_result.clone()
    }
}
