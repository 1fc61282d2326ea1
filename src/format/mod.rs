//! Payload formats: the RFC 3551 static table and dynamic PT allocation.

mod payload_manager;
mod table;

pub use payload_manager::{DynamicPayloadManager, PayloadManager, DYNAMIC_PT_RANGE};
pub use table::{codec_by_name, static_payload, static_rtpmap, MediaKind, StaticPayload};
