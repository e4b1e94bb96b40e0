use crate::model::*;

use super::availability::find_conflict;
use super::EngineError;

pub(crate) fn now_ms() -> Ms {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_millis() as Ms
}

/// Validate a raw wire window and promote it to a `Span`.
/// Inverted or empty windows are the caller's mistake; out-of-range or
/// oversized ones trip a hard cap.
pub(crate) fn validate_window(start: Ms, end: Ms) -> Result<Span, EngineError> {
    use crate::limits::*;
    if start >= end {
        return Err(EngineError::InvalidArgument("window start must be before end"));
    }
    if start < MIN_VALID_TIMESTAMP_MS || end > MAX_VALID_TIMESTAMP_MS {
        return Err(EngineError::LimitExceeded("timestamp out of range"));
    }
    let span = Span::new(start, end);
    if span.duration_ms() > MAX_SPAN_DURATION_MS {
        return Err(EngineError::LimitExceeded("span too wide"));
    }
    Ok(span)
}

/// Approval gate. Fails with the blocking reservation's id when any
/// APPROVED reservation (other than `exclude` itself) overlaps `span`.
/// Must run under the room's write lock so the check and the commit
/// that follows are one atomic step.
pub(crate) fn check_no_conflict(
    room: &RoomState,
    span: &Span,
    exclude: ulid::Ulid,
) -> Result<(), EngineError> {
    match find_conflict(room, span, exclude) {
        Some(winner) => Err(EngineError::Conflict(winner)),
        None => Ok(()),
    }
}
