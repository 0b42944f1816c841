//! Handler seam between the consumer loop and event processors.

use async_trait::async_trait;

use crate::envelope::EventEnvelope;
use crate::error::HandlerError;

/// Processes one decoded envelope.
///
/// Implementations must be idempotent: the consumer delivers
/// at-least-once and retries on failure, so the same envelope can
/// arrive more than once.
#[async_trait]
pub trait EnvelopeHandler: Send + Sync {
    async fn apply(&self, envelope: EventEnvelope) -> Result<(), HandlerError>;
}
