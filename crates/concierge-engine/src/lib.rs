//! The call-coordination engine.
//!
//! Owns the three shared tables (presence, pending queue, call/request
//! registry) behind a single coordinator, relays signaling between the two
//! parties of a session, and tears sessions down on end or disconnect.
//! External collaborators (the AI assistant, the durable store, analytics
//! delivery) are consumed through narrow traits with in-process fallbacks so
//! the engine keeps working when none of them is configured.

pub mod analytics;
pub mod assistant;
pub mod coordinator;
pub mod outbox;
pub mod presence;
pub mod queue;
pub mod store;
pub mod trigger;

pub use analytics::{AnalyticsEvent, AnalyticsSink, MemorySink, NoopSink, WebhookSink};
pub use assistant::{
    CannedReplies, ConversationContext, FALLBACK_REPLY, ReplyError, ReplyGenerator,
    reply_or_fallback,
};
pub use coordinator::{CallReceipt, Coordinator};
pub use outbox::{MemoryOutbox, Outbox};
pub use presence::PresenceTable;
pub use queue::PendingQueue;
pub use store::{MemoryStore, RecordStore, StoreError};
