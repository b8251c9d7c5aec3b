//! Response shaping for the tool-server path.
//!
//! Sequence results are wrapped in an envelope carrying truncation
//! metadata; every serialised response is checked against the byte budget
//! before it leaves the engine. The CLI path bypasses this module and
//! streams formatter output directly.

use serde::Serialize;

use crate::error::{Result, XlqError};
use crate::limits;

#[derive(Debug, Clone, Serialize)]
pub struct Metadata {
    pub rows_returned: usize,
    pub truncated: bool,
    pub limit: usize,
}

/// Envelope for sequence-returning operations.
#[derive(Debug, Clone, Serialize)]
pub struct Envelope<T: Serialize> {
    pub data: T,
    pub metadata: Metadata,
}

impl<T: Serialize> Envelope<T> {
    pub fn new(data: T, rows_returned: usize, truncated: bool, limit: usize) -> Self {
        Envelope {
            data,
            metadata: Metadata {
                rows_returned,
                truncated,
                limit,
            },
        }
    }
}

/// Serialise a response, rejecting it when it exceeds the byte budget.
pub fn to_bounded_json<T: Serialize>(value: &T) -> Result<String> {
    let body = serde_json::to_string(value)
        .map_err(|e| XlqError::parser("serialise response", e))?;
    if body.len() > limits::MAX_RESPONSE_BYTES {
        return Err(XlqError::ResponseTooLarge {
            size: body.len(),
            limit: limits::MAX_RESPONSE_BYTES,
        });
    }
    Ok(body)
}
