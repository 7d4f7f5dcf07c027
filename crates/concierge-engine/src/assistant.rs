//! Conversational assistant seam.
//!
//! The kiosk's chat surface asks a [`ReplyGenerator`] for each response.
//! The real generator lives outside this crate; [`CannedReplies`] is the
//! in-process fallback used when no upstream model is configured or the
//! configured one fails. Replies are plain text and may embed the
//! call-trigger phrase recognized by [`crate::trigger`].

use async_trait::async_trait;
use rand::Rng;

/// Rolling context handed to the generator with each message.
#[derive(Clone, Debug, Default)]
pub struct ConversationContext {
    /// Visitor display name, once known.
    pub visitor_name: Option<String>,
    /// Prior (message, reply) turns, oldest first.
    pub turns: Vec<(String, String)>,
    /// Whether a call session is currently active for this visitor, in
    /// which case the assistant stays out of the way.
    pub in_call: bool,
}

impl ConversationContext {
    /// Record one completed exchange.
    pub fn push_turn(&mut self, message: impl Into<String>, reply: impl Into<String>) {
        self.turns.push((message.into(), reply.into()));
    }
}

/// Failure producing a reply.
#[derive(Debug, thiserror::Error)]
pub enum ReplyError {
    /// The upstream generator is not configured or returned an error.
    #[error("assistant unavailable: {0}")]
    Unavailable(String),

    /// The upstream generator did not answer in time.
    #[error("assistant timed out")]
    Timeout,
}

/// Produces one reply per visitor message.
#[async_trait]
pub trait ReplyGenerator: Send + Sync {
    /// Generate a reply to `message` given the conversation so far.
    async fn generate(
        &self,
        message: &str,
        context: &ConversationContext,
    ) -> Result<String, ReplyError>;
}

/// Reply used when the configured generator fails mid-conversation.
pub const FALLBACK_REPLY: &str =
    "I'm having a little trouble right now. You can still ask me to start a video call with any of our staff.";

/// Fallback generator that cycles through a fixed reply set.
///
/// Keeps the kiosk conversational when no model is configured. Replies are
/// picked at random so repeated small talk does not feel scripted.
pub struct CannedReplies {
    replies: Vec<String>,
}

impl CannedReplies {
    /// Build from a configured reply list. An empty list falls back to a
    /// single built-in reply.
    #[must_use]
    pub fn new(replies: Vec<String>) -> Self {
        if replies.is_empty() {
            Self {
                replies: vec![FALLBACK_REPLY.to_owned()],
            }
        } else {
            Self { replies }
        }
    }
}

#[async_trait]
impl ReplyGenerator for CannedReplies {
    async fn generate(
        &self,
        _message: &str,
        _context: &ConversationContext,
    ) -> Result<String, ReplyError> {
        let idx = rand::rng().random_range(0..self.replies.len());
        Ok(self.replies[idx].clone())
    }
}

/// Ask `generator` for a reply, substituting [`FALLBACK_REPLY`] on failure.
pub async fn reply_or_fallback(
    generator: &dyn ReplyGenerator,
    message: &str,
    context: &ConversationContext,
) -> String {
    match generator.generate(message, context).await {
        Ok(reply) => reply,
        Err(err) => {
            tracing::warn!(error = %err, "reply generation failed, using fallback");
            FALLBACK_REPLY.to_owned()
        }
    }
}
