use serde::Serialize;
use tokio::sync::Mutex;

/// Point-in-time view of both transcript buffers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TranscriptSnapshot {
    /// What the user has said so far this turn.
    pub user: String,
    /// What the assistant has said so far this turn.
    pub assistant: String,
}

#[derive(Default)]
struct Buffers {
    user: String,
    assistant: String,
}

/// Accumulates live transcript fragments for the UI.
///
/// Fragments are partial words/tokens and are concatenated strictly in
/// arrival order. Both buffers live under one lock so a turn boundary clears
/// them atomically: no reader ever sees one cleared and the other not.
pub struct TranscriptAggregator {
    inner: Mutex<Buffers>,
}

impl TranscriptAggregator {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Buffers::default()),
        }
    }

    /// Append one fragment of the user's speech transcription.
    pub async fn append_user(&self, delta: &str) {
        self.inner.lock().await.user.push_str(delta);
    }

    /// Append one fragment of the assistant's speech transcription.
    pub async fn append_assistant(&self, delta: &str) {
        self.inner.lock().await.assistant.push_str(delta);
    }

    /// Clear both buffers atomically (turn boundary or session teardown).
    pub async fn clear(&self) {
        let mut buffers = self.inner.lock().await;
        buffers.user.clear();
        buffers.assistant.clear();
    }

    /// Read-only copy of the current buffers.
    pub async fn snapshot(&self) -> TranscriptSnapshot {
        let buffers = self.inner.lock().await;
        TranscriptSnapshot {
            user: buffers.user.clone(),
            assistant: buffers.assistant.clone(),
        }
    }
}

impl Default for TranscriptAggregator {
    fn default() -> Self {
        Self::new()
    }
}
