use std::collections::HashMap;
use std::sync::Arc;

use crate::format::PayloadManager;
use crate::id::Pt;
use crate::sdp::parser::{parse_rtcp_fb, FbTarget};
use crate::sdp::{Attribute, Direction, MediaBlock, MediaType};

use super::avp::{PayloadEntry, RtpAvpMediaHandler, RTP_AVP_PROTO};
use super::{HandlerError, MediaHandler};

/// Protocol token of RTP with RTCP feedback (RFC 4585).
pub const RTP_AVPF_PROTO: &str = "RTP/AVPF";

/// Media handler for the AVPF profile.
///
/// Works like [`RtpAvpMediaHandler`], with `a=rtcp-fb` lines per payload type
/// and for all of them (`*`).
#[derive(Debug, Clone, Default)]
pub struct RtpAvpfMediaHandler {
    avp: RtpAvpMediaHandler,
    wildcard_fb: Vec<String>,
    rfc4585_proto: bool,
}

impl RtpAvpfMediaHandler {
    pub fn new() -> Self {
        RtpAvpfMediaHandler::default()
    }

    /// The underlying payload and extmap state.
    pub fn avp(&self) -> &RtpAvpMediaHandler {
        &self.avp
    }

    /// Registered formats in preference order.
    pub fn payloads(&self) -> &[PayloadEntry] {
        self.avp.payloads()
    }

    /// Feedback types that go on `a=rtcp-fb:*`.
    pub fn wildcard_feedback(&self) -> &[String] {
        &self.wildcard_fb
    }

    pub fn set_direction(&mut self, direction: Direction) {
        self.avp.set_direction(direction);
    }

    /// Use `RTP/AVPF` as protocol token. Off by default, giving `RTP/AVP`.
    pub fn set_rfc4585_proto(&mut self, enabled: bool) {
        self.rfc4585_proto = enabled;
    }

    pub fn use_payload_manager(&mut self, manager: Arc<dyn PayloadManager>) {
        self.avp.use_payload_manager(manager);
    }

    /// Add a video codec from the RFC 3551 table with its feedback types.
    pub fn add_video_codec(&mut self, name: &str, fb: &[&str]) -> Result<Pt, HandlerError> {
        let pt = self.avp.add_video_codec(name)?;
        self.set_last_feedback(fb);
        Ok(pt)
    }

    /// Add an audio codec from the RFC 3551 table with its feedback types.
    pub fn add_audio_codec(&mut self, name: &str, fb: &[&str]) -> Result<Pt, HandlerError> {
        let pt = self.avp.add_audio_codec(name)?;
        self.set_last_feedback(fb);
        Ok(pt)
    }

    pub fn add_generic_video_payload(
        &mut self,
        format: &str,
        fb: &[&str],
    ) -> Result<Pt, HandlerError> {
        let pt = self.avp.add_generic_video_payload(format)?;
        self.set_last_feedback(fb);
        Ok(pt)
    }

    pub fn add_generic_audio_payload(
        &mut self,
        format: &str,
        fb: &[&str],
    ) -> Result<Pt, HandlerError> {
        let pt = self.avp.add_generic_audio_payload(format)?;
        self.set_last_feedback(fb);
        Ok(pt)
    }

    fn set_last_feedback(&mut self, fb: &[&str]) {
        if let Some(p) = self.avp.payloads_mut().last_mut() {
            for f in fb {
                push_unique(&mut p.fb, f);
            }
        }
    }

    /// Add a feedback type to an already registered payload type.
    pub fn add_feedback(&mut self, pt: Pt, fb: &str) -> Result<(), HandlerError> {
        let mut found = false;
        for p in self.avp.payloads_mut().iter_mut().filter(|p| p.pt == pt) {
            push_unique(&mut p.fb, fb);
            found = true;
        }

        if !found {
            return Err(HandlerError::UnknownPayloadType(pt));
        }
        Ok(())
    }

    /// Add a feedback type for all payload types, `a=rtcp-fb:* <fb>`.
    pub fn add_wildcard_feedback(&mut self, fb: &str) {
        push_unique(&mut self.wildcard_fb, fb);
    }

    pub fn add_fmtp(&mut self, pt: Pt, format: &str) -> Result<(), HandlerError> {
        self.avp.add_fmtp(pt, format)
    }

    pub fn add_extmap(&mut self, id: u8, uri: &str) -> Result<(), HandlerError> {
        self.avp.add_extmap(id, uri)
    }
}

fn merged<'a>(own: impl IntoIterator<Item = &'a String>, wildcard: &'a [String]) -> Vec<String> {
    let mut all = vec![];
    for fb in own.into_iter().chain(wildcard) {
        push_unique(&mut all, fb);
    }
    all
}

fn push_unique(list: &mut Vec<String>, fb: &str) {
    let fb = fb.trim();
    if fb.is_empty() || list.iter().any(|f| f.eq_ignore_ascii_case(fb)) {
        return;
    }
    list.push(fb.to_string());
}

/// Feedback found in a remote m-line.
#[derive(Debug, Default)]
struct RemoteFeedback {
    per_pt: HashMap<Pt, Vec<String>>,
    wildcard: Vec<String>,
}

impl RemoteFeedback {
    fn from_media(media: &MediaBlock) -> Self {
        let mut remote = RemoteFeedback::default();

        for v in media.attribute_vals("rtcp-fb") {
            match parse_rtcp_fb(v) {
                Some((FbTarget::Pt(pt), fb)) => remote.per_pt.entry(pt).or_default().push(fb),
                Some((FbTarget::Wildcard, fb)) => remote.wildcard.push(fb),
                None => warn!("Ignoring bad rtcp-fb: {}", v),
            }
        }

        remote
    }

    /// Feedback for `pt`, its own lines followed by the `*` lines.
    fn for_pt(&self, pt: Pt) -> Vec<String> {
        let own = self.per_pt.get(&pt).into_iter().flatten();
        merged(own, &self.wildcard)
    }
}

impl MediaHandler for RtpAvpfMediaHandler {
    fn proto(&self) -> &str {
        if self.rfc4585_proto {
            RTP_AVPF_PROTO
        } else {
            RTP_AVP_PROTO
        }
    }

    fn render(&self, typ: &MediaType) -> Result<MediaBlock, HandlerError> {
        let per_entry = |p: &PayloadEntry, attrs: &mut Vec<Attribute>| {
            for fb in &p.fb {
                attrs.push(Attribute::new("rtcp-fb", format!("{} {}", p.pt, fb)));
            }
        };

        let wildcard = self
            .wildcard_fb
            .iter()
            .map(|fb| Attribute::new("rtcp-fb", format!("* {}", fb)))
            .collect();

        self.avp.render_with(typ, self.proto(), per_entry, wildcard)
    }

    fn reduce(&mut self, offer: &MediaBlock) -> Result<(), HandlerError> {
        self.avp.reduce(offer)?;

        let remote = RemoteFeedback::from_media(offer);
        let wildcard = std::mem::take(&mut self.wildcard_fb);

        for p in self.avp.payloads_mut() {
            let ours = merged(&p.fb, &wildcard);
            let theirs = remote.for_pt(p.pt);

            let common: Vec<String> = ours
                .iter()
                .filter(|f| theirs.iter().any(|t| t.eq_ignore_ascii_case(f.as_str())))
                .cloned()
                .collect();

            if common.len() != ours.len() {
                debug!("Feedback for PT {} reduced to {:?}", p.pt, common);
            }
            p.fb = common;
        }

        Ok(())
    }
}
