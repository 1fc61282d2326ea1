//! Per m-line RTP negotiation.
//!
//! A session creates one handler per media line, feeds it registrations, and
//! then either [renders][MediaHandler::render] it into an offer or
//! [reduces][MediaHandler::reduce] it against a remote offer to make the answer.

use std::fmt;

use thiserror::Error;

use crate::id::Pt;
use crate::sdp::{for_each_media_attribute, for_each_session_attribute, is_direction};
use crate::sdp::{media_direction, Attribute, MediaBlock, MediaType, SessionMessage};
use crate::NegotiationError;

mod avp;
pub use avp::{PayloadEntry, RtpAvpMediaHandler, RTP_AVP_PROTO};

mod avpf;
pub use avpf::{RtpAvpfMediaHandler, RTP_AVPF_PROTO};

/// Errors from registering formats in, or negotiating with, a handler.
///
/// A failed call never changes what was registered before it.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum HandlerError {
    /// The name isn't in the codec table (for this media kind).
    #[error("unsupported codec: {0}")]
    UnsupportedCodec(String),

    /// Generic payloads need a payload manager to get a number.
    #[error("no payload manager")]
    NoPayloadManager,

    /// The dynamic range is used up.
    #[error("no payload type available")]
    NoPayloadTypeAvailable,

    /// Referring to a payload type that was never registered.
    #[error("unknown payload type: {0}")]
    UnknownPayloadType(Pt),

    /// One-byte header extensions go from 1 to 14.
    #[error("invalid extmap id: {0}")]
    InvalidExtmapId(u8),

    /// The id is already mapped to another URI.
    #[error("extmap id {0} already used for {1}")]
    DuplicateExtmapId(u8, String),

    /// Nothing we have is in the remote format list.
    #[error("no common format")]
    NoCommonFormat,

    /// Nothing registered for this kind of media.
    #[error("no formats for media: {0}")]
    NoFormats(MediaType),
}

/// What a session needs from a media handler.
pub trait MediaHandler: fmt::Debug {
    /// Transport protocol token for the m-line.
    fn proto(&self) -> &str;

    /// Produce an offer m-line from the registrations.
    fn render(&self, typ: &MediaType) -> Result<MediaBlock, HandlerError>;

    /// Narrow the registrations down to what the remote offer also has.
    ///
    /// Our preference order is kept. On error nothing is changed.
    fn reduce(&mut self, offer: &MediaBlock) -> Result<(), HandlerError>;

    /// [`reduce`][MediaHandler::reduce] and build the answer m-line.
    fn answer(&mut self, offer: &MediaBlock) -> Result<MediaBlock, NegotiationError> {
        self.reduce(offer)?;
        let rendered = self.render(&offer.typ)?;
        build_answer(offer, rendered)
    }
}

/// Attributes regenerated from handler state rather than answered one by one.
const CODEC_ATTRIBUTES: &[&str] = &["rtpmap", "fmtp", "rtcp-fb", "extmap"];

fn is_codec_attribute(attr: &Attribute) -> bool {
    CODEC_ATTRIBUTES
        .iter()
        .any(|k| k.eq_ignore_ascii_case(&attr.key))
}

fn build_answer(offer: &MediaBlock, rendered: MediaBlock) -> Result<MediaBlock, NegotiationError> {
    let mut attrs = vec![];
    let mut has_direction = false;

    for_each_media_attribute(offer, |a| {
        if is_codec_attribute(&a) {
            return;
        }
        if is_direction(&a).is_some() {
            if has_direction {
                return;
            }
            has_direction = true;
        }
        attrs.push(a);
    })?;

    if !has_direction {
        attrs.push(media_direction(offer).answer().to_attribute());
    }

    attrs.extend(
        rendered
            .attrs
            .into_iter()
            .filter(|a| is_direction(a).is_none()),
    );

    Ok(MediaBlock {
        typ: offer.typ.clone(),
        proto: rendered.proto,
        formats: rendered.formats,
        attrs,
        connection: offer.connection.clone(),
    })
}

/// Answer a whole offer.
///
/// `handlers` line up with the offer's m-lines by index. Session attributes
/// go through the attribute rules, each m-line through its handler. Any
/// failure means there is no answer, the handlers may however already have
/// been reduced.
pub fn answer_message(
    offer: &SessionMessage,
    handlers: &mut [Box<dyn MediaHandler>],
) -> Result<SessionMessage, NegotiationError> {
    let mut answer = SessionMessage::default();

    for_each_session_attribute(offer, |a| answer.attrs.push(a))?;

    for (idx, media) in offer.medias.iter().enumerate() {
        let handler = handlers
            .get_mut(idx)
            .ok_or(NegotiationError::MissingHandler(idx))?;

        debug!("Answer m-line {} {} {}", idx, media.typ, media.proto);
        answer.medias.push(handler.answer(media)?);
    }

    Ok(answer)
}
