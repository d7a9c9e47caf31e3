//! Inbound frame validation.

use crate::connection::transport::TransportError;

/// Enforces the inbound read limit.
///
/// An oversized frame is a transport-level failure: the peer is
/// misbehaving and the connection is dropped.
pub fn check_frame_size(size: usize, limit: usize) -> Result<(), TransportError> {
    if size > limit {
        return Err(TransportError::FrameTooLarge { size, limit });
    }
    Ok(())
}
