//! SDP offer/answer negotiation for RTP media.
//!
//! This crate does not parse or serialize SDP text. It works on an already
//! parsed [`SessionMessage`] and produces the attributes and media lines of
//! offers and answers.
//!
//! # Usage
//!
//! Each m-line is handled by a [media handler][handler::MediaHandler]. Formats
//! with a static RFC 3551 assignment are added by name. Other formats get a
//! dynamic payload type from a [payload manager][format::PayloadManager],
//! normally shared by all handlers of a session.
//!
//! ```
//! use sdpagent::handler::MediaHandler;
//! use sdpagent::{MediaType, SdpConfig};
//!
//! let config = SdpConfig::new();
//! let manager = config.build_payload_manager();
//!
//! let mut audio = config.build_avp();
//! audio.use_payload_manager(manager);
//! audio.add_audio_codec("PCMU").unwrap();
//! let opus = audio.add_generic_audio_payload("opus/48000/2").unwrap();
//! audio.add_fmtp(opus, "useinbandfec=1").unwrap();
//!
//! let m = audio.render(&MediaType::Audio).unwrap();
//! assert_eq!(m.formats, vec!["0", "96"]);
//! ```
//!
//! ## Answering
//!
//! To answer, the handler is first [reduced][handler::MediaHandler::reduce]
//! to what the remote side offered. Our order of preference is kept, dynamic
//! payload types are renumbered to the remote's numbers. Attributes that are
//! not about codecs are answered by [`sdp::intersect`], i.e. `a=sendonly`
//! becomes `a=recvonly` and `a=setup:actpass` becomes `a=setup:active`.
//!
//! [`answer_message`][handler::answer_message] does this for a whole message,
//! with one handler per m-line.
//!
//! # Logging
//!
//! The crate logs with [`tracing`]. Dropped formats and reduced feedback are
//! logged on `debug`, malformed attribute values on `warn`.

#![forbid(unsafe_code)]
#![allow(clippy::new_without_default)]
#![allow(clippy::manual_range_contains)]

#[macro_use]
extern crate tracing;

use thiserror::Error;

mod id;
pub use id::{Pt, Ssrc};

pub mod sdp;
pub use sdp::{Attribute, Direction, MediaBlock, MediaType, SessionMessage, SetupRole};

pub mod format;

pub mod handler;

mod config;
pub use config::SdpConfig;

/// Various error types.
pub mod error {
    pub use crate::handler::HandlerError;
    pub use crate::sdp::AttributeError;
}

/// Errors from negotiating an answer.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum NegotiationError {
    /// An offered attribute could not be answered.
    #[error("{0}")]
    Attribute(#[from] error::AttributeError),

    /// A media handler failed.
    #[error("{0}")]
    Handler(#[from] error::HandlerError),

    /// No handler for the m-line at this index.
    #[error("no media handler for m-line {0}")]
    MissingHandler(usize),
}
