use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use crate::format::{codec_by_name, MediaKind, PayloadManager};
use crate::id::Pt;
use crate::sdp::parser::{parse_extmap, parse_rtp_encoding};
use crate::sdp::{rtpmap, Attribute, Direction, MediaBlock, MediaType, RtpMap};

use super::{HandlerError, MediaHandler};

/// Protocol token of plain RTP.
pub const RTP_AVP_PROTO: &str = "RTP/AVP";

/// Highest extmap id in the one-byte header extension form (RFC 8285).
const MAX_ID_ONE_BYTE_FORM: u8 = 14;

/// One registered format.
///
/// In the SDP an entry turns into these lines:
///
/// ```text
/// a=rtpmap:96 VP8/90000
/// a=rtcp-fb:96 nack
/// a=fmtp:96 max-fr=30
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PayloadEntry {
    pub(crate) pt: Pt,
    pub(crate) kind: MediaKind,
    /// Table rtpmap for named codecs, the format token as given for generic ones.
    pub(crate) format: String,
    pub(crate) rtpmap: Option<RtpMap>,
    /// Whether the number came from a payload manager.
    pub(crate) generic: bool,
    pub(crate) fmtp: Option<String>,
    /// RTCP feedback types. Only AVPF renders these.
    pub(crate) fb: Vec<String>,
}

impl PayloadEntry {
    /// The payload type that groups these parameters.
    pub fn pt(&self) -> Pt {
        self.pt
    }

    pub fn kind(&self) -> MediaKind {
        self.kind
    }

    /// The value after the payload type in `a=rtpmap`.
    pub fn format(&self) -> &str {
        &self.format
    }

    pub fn clock_rate(&self) -> Option<u32> {
        self.rtpmap.as_ref().map(|m| m.clock_rate)
    }

    pub fn channels(&self) -> Option<u8> {
        self.rtpmap.as_ref().and_then(|m| m.channels)
    }

    pub fn fmtp(&self) -> Option<&str> {
        self.fmtp.as_deref()
    }

    /// Feedback types, i.e. `nack`, `nack pli`, `ccm fir`.
    pub fn feedback(&self) -> &[String] {
        &self.fb
    }

    pub fn is_generic(&self) -> bool {
        self.generic
    }

    /// Whether a remote rtpmap value describes the same format.
    fn matches_rtpmap(&self, remote: &str) -> bool {
        match (&self.rtpmap, parse_rtp_encoding(remote)) {
            (Some(ours), Some(theirs)) => ours.matches(&theirs),
            // Format tokens without a clock rate compare on the encoding name.
            (None, Some(theirs)) => self.format.eq_ignore_ascii_case(&theirs.encoding),
            _ => self.format.eq_ignore_ascii_case(remote),
        }
    }
}

/// Media handler for the `RTP/AVP` profile.
///
/// Keeps the registered formats in preference order and the header extensions
/// by id.
#[derive(Debug, Clone, Default)]
pub struct RtpAvpMediaHandler {
    payloads: Vec<PayloadEntry>,
    extmaps: BTreeMap<u8, String>,
    manager: Option<Arc<dyn PayloadManager>>,
    /// Numbers we hold a share of in `manager`.
    claims: HashSet<Pt>,
    direction: Direction,
}

impl RtpAvpMediaHandler {
    pub fn new() -> Self {
        RtpAvpMediaHandler::default()
    }

    /// Registered formats in preference order.
    pub fn payloads(&self) -> &[PayloadEntry] {
        &self.payloads
    }

    pub(crate) fn payloads_mut(&mut self) -> &mut [PayloadEntry] {
        &mut self.payloads
    }

    /// Registered header extensions, `(id, uri)` ordered by id.
    pub fn extmaps(&self) -> impl Iterator<Item = (u8, &str)> + '_ {
        self.extmaps.iter().map(|(id, uri)| (*id, uri.as_str()))
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// Direction rendered into offers.
    pub fn set_direction(&mut self, direction: Direction) {
        self.direction = direction;
    }

    /// Bind the payload manager generic payloads get their numbers from.
    ///
    /// Replaces any earlier manager. Numbers already handed out stay as they
    /// are, their claims move to the new manager.
    pub fn use_payload_manager(&mut self, manager: Arc<dyn PayloadManager>) {
        if let Some(old) = self.manager.take() {
            debug!("Replacing payload manager");
            for pt in self.claims.drain() {
                old.release(pt);
            }
            for p in self.payloads.iter().filter(|p| p.generic) {
                if manager.register(p.pt) {
                    self.claims.insert(p.pt);
                }
            }
        }
        self.manager = Some(manager);
    }

    /// Add a video codec from the RFC 3551 table, i.e. `H263` or `H261/90000`.
    pub fn add_video_codec(&mut self, name: &str) -> Result<Pt, HandlerError> {
        self.add_codec(name, MediaKind::Video)
    }

    /// Add an audio codec from the RFC 3551 table, i.e. `PCMU` or `L16/44100/2`.
    pub fn add_audio_codec(&mut self, name: &str) -> Result<Pt, HandlerError> {
        self.add_codec(name, MediaKind::Audio)
    }

    fn add_codec(&mut self, name: &str, kind: MediaKind) -> Result<Pt, HandlerError> {
        let codec = codec_by_name(name)
            .filter(|c| c.kind == kind)
            .ok_or_else(|| HandlerError::UnsupportedCodec(name.to_string()))?;

        // Repeated registrations are kept, they are preferences.
        self.payloads.push(PayloadEntry {
            pt: codec.pt,
            kind,
            format: codec.rtpmap.to_string(),
            rtpmap: Some(codec.to_rtpmap()),
            generic: false,
            fmtp: None,
            fb: vec![],
        });

        debug!("Added {:?} codec {} as PT {}", kind, codec.rtpmap, codec.pt);
        Ok(codec.pt)
    }

    /// Add an audio format without static assignment, i.e. `opus/48000/2`.
    ///
    /// The number comes from the payload manager.
    pub fn add_generic_audio_payload(&mut self, format: &str) -> Result<Pt, HandlerError> {
        self.add_generic_payload(format, MediaKind::Audio)
    }

    /// Add a video format without static assignment, i.e. `VP8/90000`.
    ///
    /// The number comes from the payload manager.
    pub fn add_generic_video_payload(&mut self, format: &str) -> Result<Pt, HandlerError> {
        self.add_generic_payload(format, MediaKind::Video)
    }

    fn add_generic_payload(&mut self, format: &str, kind: MediaKind) -> Result<Pt, HandlerError> {
        let manager = self.manager.as_ref().ok_or(HandlerError::NoPayloadManager)?;

        let used: HashSet<Pt> = self.payloads.iter().map(|p| p.pt).collect();
        let pt = manager
            .allocate(&used)
            .ok_or(HandlerError::NoPayloadTypeAvailable)?;
        self.claims.insert(pt);

        self.payloads.push(PayloadEntry {
            pt,
            kind,
            format: format.to_string(),
            rtpmap: parse_rtp_encoding(format),
            generic: true,
            fmtp: None,
            fb: vec![],
        });

        debug!("Added generic {:?} payload {} as PT {}", kind, format, pt);
        Ok(pt)
    }

    /// Set the `a=fmtp` parameters of a registered payload type.
    pub fn add_fmtp(&mut self, pt: Pt, format: &str) -> Result<(), HandlerError> {
        let mut found = false;
        for p in self.payloads.iter_mut().filter(|p| p.pt == pt) {
            p.fmtp = Some(format.to_string());
            found = true;
        }

        if !found {
            return Err(HandlerError::UnknownPayloadType(pt));
        }
        Ok(())
    }

    /// Register a header extension.
    ///
    /// Registering the same `(id, uri)` again is fine.
    pub fn add_extmap(&mut self, id: u8, uri: &str) -> Result<(), HandlerError> {
        if id == 0 || id > MAX_ID_ONE_BYTE_FORM {
            return Err(HandlerError::InvalidExtmapId(id));
        }

        match self.extmaps.get(&id) {
            Some(existing) if existing == uri => Ok(()),
            Some(existing) => Err(HandlerError::DuplicateExtmapId(id, existing.clone())),
            None => {
                self.extmaps.insert(id, uri.to_string());
                Ok(())
            }
        }
    }

    /// Render the m-line.
    ///
    /// `per_entry` can add lines right after each `a=rtpmap`. `trailer` goes
    /// after all payload lines and before the extmaps.
    pub(crate) fn render_with(
        &self,
        typ: &MediaType,
        proto: &str,
        mut per_entry: impl FnMut(&PayloadEntry, &mut Vec<Attribute>),
        trailer: Vec<Attribute>,
    ) -> Result<MediaBlock, HandlerError> {
        let mut media = MediaBlock::new(typ.clone(), proto);
        let mut rendered: HashSet<Pt> = HashSet::new();

        for p in self.payloads.iter().filter(|p| p.kind.is_type(typ)) {
            // Only the first of duplicate registrations makes it to the m-line.
            if !rendered.insert(p.pt) {
                continue;
            }

            media.formats.push(p.pt.to_string());
            media
                .attrs
                .push(Attribute::new("rtpmap", format!("{} {}", p.pt, p.format)));

            per_entry(p, &mut media.attrs);

            if let Some(fmtp) = &p.fmtp {
                media
                    .attrs
                    .push(Attribute::new("fmtp", format!("{} {}", p.pt, fmtp)));
            }
        }

        if media.formats.is_empty() {
            return Err(HandlerError::NoFormats(typ.clone()));
        }

        media.attrs.extend(trailer);

        for (id, uri) in &self.extmaps {
            media
                .attrs
                .push(Attribute::new("extmap", format!("{} {}", id, uri)));
        }

        media.attrs.push(self.direction.to_attribute());

        Ok(media)
    }

    fn reduced_payloads(&self, offer: &MediaBlock) -> Vec<PayloadEntry> {
        // Each remote format can only be used once.
        let mut taken: HashSet<&str> = HashSet::new();
        let mut reduced = vec![];

        for p in &self.payloads {
            let matched = if p.generic {
                offer.formats.iter().find(|f| {
                    !taken.contains(f.as_str())
                        && rtpmap(offer, f.as_str()).is_some_and(|m| p.matches_rtpmap(m))
                })
            } else {
                let pt = p.pt.to_string();
                offer
                    .formats
                    .iter()
                    .find(|f| !taken.contains(f.as_str()) && **f == pt)
            };

            let Some(format) = matched else {
                debug!("Drop PT {} {}, not in remote offer", p.pt, p.format);
                continue;
            };
            taken.insert(format.as_str());

            let mut p = p.clone();
            if let Some(pt) = Pt::from_format(format) {
                if pt != p.pt {
                    debug!("Renumber {} PT {} => {}", p.format, p.pt, pt);
                    p.pt = pt;
                }
            }
            reduced.push(p);
        }

        reduced
    }

    fn reduced_extmaps(&self, offer: &MediaBlock) -> BTreeMap<u8, String> {
        let mut reduced = BTreeMap::new();

        for v in offer.attribute_vals("extmap") {
            let Some((id, uri)) = parse_extmap(v) else {
                warn!("Ignoring bad extmap: {}", v);
                continue;
            };

            let Ok(id) = u8::try_from(id) else {
                continue;
            };
            if id == 0 || id > MAX_ID_ONE_BYTE_FORM {
                debug!("Ignoring extmap {} outside one-byte form: {}", id, uri);
                continue;
            }

            if self.extmaps.values().any(|u| *u == uri) && !reduced.contains_key(&id) {
                reduced.insert(id, uri);
            }
        }

        reduced
    }

    /// Hand numbers we no longer use back to the manager, and claim adopted ones.
    ///
    /// Only numbers we hold a share of are released. Returns the new claims.
    fn sync_manager(&self, reduced: &[PayloadEntry]) -> HashSet<Pt> {
        let Some(manager) = &self.manager else {
            return HashSet::new();
        };

        let kept: HashSet<Pt> = reduced.iter().filter(|p| p.generic).map(|p| p.pt).collect();
        let mut claims = HashSet::new();

        for pt in &self.claims {
            if kept.contains(pt) {
                claims.insert(*pt);
            } else {
                trace!("Release PT {}", pt);
                manager.release(*pt);
            }
        }

        for pt in kept {
            if claims.contains(&pt) {
                continue;
            }
            if manager.register(pt) {
                claims.insert(pt);
            } else {
                trace!("PT {} outside payload manager range", pt);
            }
        }

        claims
    }
}

impl MediaHandler for RtpAvpMediaHandler {
    fn proto(&self) -> &str {
        RTP_AVP_PROTO
    }

    fn render(&self, typ: &MediaType) -> Result<MediaBlock, HandlerError> {
        self.render_with(typ, RTP_AVP_PROTO, |_, _| {}, vec![])
    }

    fn reduce(&mut self, offer: &MediaBlock) -> Result<(), HandlerError> {
        let payloads = self.reduced_payloads(offer);

        if payloads.is_empty() {
            warn!("No common format with remote {} {}", offer.typ, offer.proto);
            return Err(HandlerError::NoCommonFormat);
        }

        let extmaps = self.reduced_extmaps(offer);

        self.claims = self.sync_manager(&payloads);

        self.payloads = payloads;
        self.extmaps = extmaps;

        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::format::DynamicPayloadManager;

    fn offer(typ: MediaType, formats: &[&str], attrs: &[(&str, &str)]) -> MediaBlock {
        let mut m = MediaBlock::new(typ, RTP_AVP_PROTO);
        m.formats = formats.iter().map(|f| f.to_string()).collect();
        m.attrs = attrs.iter().map(|(k, v)| Attribute::new(*k, *v)).collect();
        m
    }

    fn with_manager() -> RtpAvpMediaHandler {
        let mut h = RtpAvpMediaHandler::new();
        h.use_payload_manager(Arc::new(DynamicPayloadManager::new()));
        h
    }

    #[test]
    fn named_codecs() {
        let mut h = RtpAvpMediaHandler::new();
        assert_eq!(h.add_audio_codec("PCMU").unwrap(), 0.into());
        assert_eq!(h.add_audio_codec("pcma/8000").unwrap(), 8.into());
        assert_eq!(h.add_video_codec("H263").unwrap(), 34.into());

        let p = &h.payloads()[0];
        assert_eq!(p.format(), "PCMU/8000/1");
        assert_eq!(p.clock_rate(), Some(8000));
        assert_eq!(p.channels(), Some(1));
        assert!(!p.is_generic());
    }

    #[test]
    fn named_codec_unsupported() {
        let mut h = with_manager();
        assert_eq!(
            h.add_audio_codec("opus"),
            Err(HandlerError::UnsupportedCodec("opus".into()))
        );
        // Kind mismatch.
        assert!(h.add_video_codec("PCMU").is_err());
        assert!(h.payloads().is_empty());
    }

    #[test]
    fn duplicate_codecs_kept() {
        let mut h = RtpAvpMediaHandler::new();
        h.add_audio_codec("PCMU").unwrap();
        h.add_audio_codec("PCMU").unwrap();
        assert_eq!(h.payloads().len(), 2);

        let m = h.render(&MediaType::Audio).unwrap();
        assert_eq!(m.formats, vec!["0"]);
    }

    #[test]
    fn generic_needs_manager() {
        let mut h = RtpAvpMediaHandler::new();
        assert_eq!(
            h.add_generic_video_payload("VP8/90000"),
            Err(HandlerError::NoPayloadManager)
        );
    }

    #[test]
    fn generic_exhausts_range() {
        let mut h = with_manager();
        for i in 0..32_u8 {
            let pt = h.add_generic_video_payload("VP8/90000").unwrap();
            assert_eq!(pt, (96 + i).into());
        }
        assert_eq!(
            h.add_generic_video_payload("VP8/90000"),
            Err(HandlerError::NoPayloadTypeAvailable)
        );
        assert_eq!(h.payloads().len(), 32);
    }

    #[test]
    fn generic_skips_pts_in_use() {
        let manager = Arc::new(DynamicPayloadManager::new());
        let mut a = RtpAvpMediaHandler::new();
        let mut b = RtpAvpMediaHandler::new();
        a.use_payload_manager(manager.clone());
        b.use_payload_manager(manager);

        assert_eq!(a.add_generic_audio_payload("opus/48000/2").unwrap(), 96.into());
        assert_eq!(b.add_generic_video_payload("VP8/90000").unwrap(), 97.into());
    }

    #[test]
    fn fmtp_requires_pt() {
        let mut h = with_manager();
        let pt = h.add_generic_audio_payload("opus/48000/2").unwrap();
        h.add_fmtp(pt, "minptime=10;useinbandfec=1").unwrap();
        assert_eq!(h.payloads()[0].fmtp(), Some("minptime=10;useinbandfec=1"));

        assert_eq!(
            h.add_fmtp(100.into(), "foo=1"),
            Err(HandlerError::UnknownPayloadType(100.into()))
        );
        // Earlier registration untouched.
        assert_eq!(h.payloads()[0].fmtp(), Some("minptime=10;useinbandfec=1"));
    }

    #[test]
    fn extmap_ids() {
        let mut h = RtpAvpMediaHandler::new();
        assert_eq!(h.add_extmap(0, "uriA"), Err(HandlerError::InvalidExtmapId(0)));
        assert_eq!(h.add_extmap(15, "uriA"), Err(HandlerError::InvalidExtmapId(15)));
        h.add_extmap(5, "uriA").unwrap();
        h.add_extmap(5, "uriA").unwrap();
        assert_eq!(
            h.add_extmap(5, "uriB"),
            Err(HandlerError::DuplicateExtmapId(5, "uriA".into()))
        );
        assert_eq!(h.extmaps().collect::<Vec<_>>(), vec![(5, "uriA")]);
    }

    #[test]
    fn render_order() {
        let mut h = with_manager();
        h.add_extmap(3, "urn:ietf:params:rtp-hdrext:toffset").unwrap();
        h.add_extmap(1, "urn:ietf:params:rtp-hdrext:ssrc-audio-level").unwrap();
        let pt = h.add_generic_audio_payload("opus/48000/2").unwrap();
        h.add_fmtp(pt, "useinbandfec=1").unwrap();
        h.add_audio_codec("PCMU").unwrap();
        h.add_video_codec("H261").unwrap();

        let m = h.render(&MediaType::Audio).unwrap();
        assert_eq!(m.proto, "RTP/AVP");
        assert_eq!(m.formats, vec!["96", "0"]);

        let lines: Vec<_> = m.attrs.iter().map(|a| a.to_string()).collect();
        assert_eq!(
            lines,
            vec![
                "a=rtpmap:96 opus/48000/2",
                "a=fmtp:96 useinbandfec=1",
                "a=rtpmap:0 PCMU/8000/1",
                "a=extmap:1 urn:ietf:params:rtp-hdrext:ssrc-audio-level",
                "a=extmap:3 urn:ietf:params:rtp-hdrext:toffset",
                "a=sendrecv",
            ]
        );
    }

    #[test]
    fn render_without_formats() {
        let mut h = RtpAvpMediaHandler::new();
        h.add_audio_codec("PCMU").unwrap();
        assert_eq!(
            h.render(&MediaType::Video),
            Err(HandlerError::NoFormats(MediaType::Video))
        );
    }

    #[test]
    fn reduce_keeps_local_order() {
        let mut h = RtpAvpMediaHandler::new();
        h.add_audio_codec("PCMA").unwrap();
        h.add_audio_codec("G722").unwrap();
        h.add_audio_codec("PCMU").unwrap();

        let o = offer(MediaType::Audio, &["0", "8", "18"], &[]);
        h.reduce(&o).unwrap();

        let pts: Vec<_> = h.payloads().iter().map(|p| *p.pt()).collect();
        assert_eq!(pts, vec![8, 0]);
    }

    #[test]
    fn reduce_generic_by_format() {
        let mut h = with_manager();
        h.add_generic_video_payload("VP8/90000").unwrap(); // 96
        h.add_generic_video_payload("H264/90000").unwrap(); // 97

        let o = offer(
            MediaType::Video,
            &["100", "101"],
            &[("rtpmap", "100 h264/90000"), ("rtpmap", "101 VP9/90000")],
        );
        h.reduce(&o).unwrap();

        assert_eq!(h.payloads().len(), 1);
        assert_eq!(h.payloads()[0].pt(), 100.into());
        assert_eq!(h.payloads()[0].format(), "H264/90000");
    }

    #[test]
    fn reduce_generic_ignores_same_pt_other_format() {
        let mut h = with_manager();
        h.add_generic_video_payload("VP8/90000").unwrap(); // 96

        let o = offer(MediaType::Video, &["96"], &[("rtpmap", "96 H264/90000")]);
        assert_eq!(h.reduce(&o), Err(HandlerError::NoCommonFormat));
    }

    #[test]
    fn reduce_no_common_format_leaves_state() {
        let mut h = RtpAvpMediaHandler::new();
        h.add_audio_codec("PCMU").unwrap();
        h.add_extmap(1, "uriA").unwrap();

        let o = offer(MediaType::Audio, &["8"], &[]);
        assert_eq!(h.reduce(&o), Err(HandlerError::NoCommonFormat));
        assert_eq!(h.payloads().len(), 1);
        assert_eq!(h.extmaps().count(), 1);
    }

    #[test]
    fn reduce_extmaps_adopt_remote_id() {
        let mut h = RtpAvpMediaHandler::new();
        h.add_audio_codec("PCMU").unwrap();
        h.add_extmap(1, "uriA").unwrap();
        h.add_extmap(2, "uriB").unwrap();

        let o = offer(
            MediaType::Audio,
            &["0"],
            &[("extmap", "4 uriA"), ("extmap", "5/recvonly uriC"), ("extmap", "15 uriB")],
        );
        h.reduce(&o).unwrap();
        assert_eq!(h.extmaps().collect::<Vec<_>>(), vec![(4, "uriA")]);
    }

    #[test]
    fn reduce_releases_dropped_numbers() {
        let manager = Arc::new(DynamicPayloadManager::new());
        let mut h = RtpAvpMediaHandler::new();
        h.use_payload_manager(manager.clone());
        h.add_generic_video_payload("VP8/90000").unwrap(); // 96
        h.add_generic_video_payload("VP9/90000").unwrap(); // 97

        let o = offer(MediaType::Video, &["97"], &[("rtpmap", "97 VP9/90000")]);
        h.reduce(&o).unwrap();

        // 96 is free again.
        assert_eq!(manager.allocate(&HashSet::new()), Some(96.into()));
    }

    #[test]
    fn shared_manager_keeps_adopted_numbers() {
        let manager = Arc::new(DynamicPayloadManager::new());

        let mut audio = RtpAvpMediaHandler::new();
        audio.use_payload_manager(manager.clone());
        assert_eq!(audio.add_generic_audio_payload("opus/48000/2").unwrap(), 96.into());

        let mut video = RtpAvpMediaHandler::new();
        video.use_payload_manager(manager.clone());
        assert_eq!(video.add_generic_video_payload("VP8/90000").unwrap(), 97.into());

        // Remote numbers video as 96, while audio still holds it.
        let o = offer(MediaType::Video, &["96"], &[("rtpmap", "96 VP8/90000")]);
        video.reduce(&o).unwrap();
        assert_eq!(video.payloads()[0].pt(), 96.into());

        let o = offer(MediaType::Audio, &["111"], &[("rtpmap", "111 opus/48000/2")]);
        audio.reduce(&o).unwrap();
        assert_eq!(audio.payloads()[0].pt(), 111.into());

        // Video still uses 96.
        assert!(manager.is_claimed(96.into()));
        assert!(manager.is_claimed(111.into()));
        assert!(!manager.is_claimed(97.into()));
        assert_eq!(manager.allocate(&HashSet::new()), Some(97.into()));
    }

    #[test]
    fn replacing_manager_moves_claims() {
        let first = Arc::new(DynamicPayloadManager::new());
        let second = Arc::new(DynamicPayloadManager::new());

        let mut h = RtpAvpMediaHandler::new();
        h.use_payload_manager(first.clone());
        h.add_generic_video_payload("VP8/90000").unwrap();
        assert!(first.is_claimed(96.into()));

        h.use_payload_manager(second.clone());
        assert!(!first.is_claimed(96.into()));
        assert!(second.is_claimed(96.into()));
        assert_eq!(h.add_generic_video_payload("VP9/90000").unwrap(), 97.into());
    }
}
