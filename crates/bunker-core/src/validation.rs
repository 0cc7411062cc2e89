//! Event validation: id recomputation and signature verification.

use crate::canonical::compute_event_id;
use crate::error::ValidationError;
use crate::event::Event;

/// Validate a signed event.
///
/// This performs:
/// - Id check (recomputed from the canonical form)
/// - Signature verification against `pubkey`
pub fn verify_event(event: &Event) -> Result<(), ValidationError> {
    // 1. Recompute id
    let expected = compute_event_id(
        &event.pubkey,
        event.created_at,
        event.kind,
        &event.tags,
        &event.content,
    );
    if expected != event.id {
        return Err(ValidationError::IdMismatch {
            expected,
            got: event.id,
        });
    }

    // 2. Verify signature over the id
    event
        .pubkey
        .verify(event.id.as_bytes(), &event.sig)
        .map_err(|_| ValidationError::SignatureFailed)?;

    Ok(())
}
