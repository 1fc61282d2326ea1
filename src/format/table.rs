use std::collections::HashMap;

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::id::Pt;
use crate::sdp::parser::parse_rtp_encoding;
use crate::sdp::{MediaType, RtpMap};

/// Audio or video.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MediaKind {
    Audio,
    Video,
}

impl MediaKind {
    /// Whether an m-line of this type carries this kind.
    pub fn is_type(&self, typ: &MediaType) -> bool {
        matches!(
            (self, typ),
            (MediaKind::Audio, MediaType::Audio) | (MediaKind::Video, MediaType::Video)
        )
    }
}

/// One row of the RFC 3551 static payload type table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StaticPayload {
    pub pt: Pt,
    /// As it appears in `a=rtpmap`, i.e. `PCMU/8000/1`.
    pub rtpmap: &'static str,
    pub encoding: &'static str,
    pub clock_rate: u32,
    pub channels: Option<u8>,
    pub kind: MediaKind,
}

impl StaticPayload {
    pub fn to_rtpmap(&self) -> RtpMap {
        RtpMap {
            encoding: self.encoding.to_string(),
            clock_rate: self.clock_rate,
            channels: self.channels,
        }
    }
}

macro_rules! static_pt {
    ($pt:literal, $enc:literal, $clock:literal, $ch:expr, $kind:ident, $map:literal) => {
        Some(StaticPayload {
            pt: Pt::new_with_value($pt),
            rtpmap: $map,
            encoding: $enc,
            clock_rate: $clock,
            channels: $ch,
            kind: MediaKind::$kind,
        })
    };
}

/// RFC 3551 table 4 and 5, indexed by payload type. `None` are reserved or
/// unassigned slots.
static STATIC_PAYLOADS: [Option<StaticPayload>; 35] = [
    static_pt!(0, "PCMU", 8000, Some(1), Audio, "PCMU/8000/1"),
    None,
    None,
    static_pt!(3, "GSM", 8000, Some(1), Audio, "GSM/8000/1"),
    static_pt!(4, "G723", 8000, Some(1), Audio, "G723/8000/1"),
    static_pt!(5, "DVI4", 8000, Some(1), Audio, "DVI4/8000/1"),
    static_pt!(6, "DVI4", 16000, Some(1), Audio, "DVI4/16000/1"),
    static_pt!(7, "LPC", 8000, Some(1), Audio, "LPC/8000/1"),
    static_pt!(8, "PCMA", 8000, Some(1), Audio, "PCMA/8000/1"),
    static_pt!(9, "G722", 8000, Some(1), Audio, "G722/8000/1"),
    static_pt!(10, "L16", 44100, Some(2), Audio, "L16/44100/2"),
    static_pt!(11, "L16", 44100, Some(1), Audio, "L16/44100/1"),
    static_pt!(12, "QCELP", 8000, Some(1), Audio, "QCELP/8000/1"),
    static_pt!(13, "CN", 8000, Some(1), Audio, "CN/8000/1"),
    static_pt!(14, "MPA", 90000, None, Audio, "MPA/90000"),
    static_pt!(15, "G728", 8000, Some(1), Audio, "G728/8000/1"),
    static_pt!(16, "DVI4", 11025, Some(1), Audio, "DVI4/11025/1"),
    static_pt!(17, "DVI4", 22050, Some(1), Audio, "DVI4/22050/1"),
    static_pt!(18, "G729", 8000, Some(1), Audio, "G729/8000/1"),
    None,
    None,
    None,
    None,
    None,
    None,
    static_pt!(25, "CelB", 90000, None, Video, "CelB/90000"),
    static_pt!(26, "JPEG", 90000, None, Video, "JPEG/90000"),
    None,
    static_pt!(28, "nv", 90000, None, Video, "nv/90000"),
    None,
    None,
    static_pt!(31, "H261", 90000, None, Video, "H261/90000"),
    static_pt!(32, "MPV", 90000, None, Video, "MPV/90000"),
    // Audio and video in one, carried on a video m-line in practice.
    static_pt!(33, "MP2T", 90000, None, Video, "MP2T/90000"),
    static_pt!(34, "H263", 90000, None, Video, "H263/90000"),
];

/// Encoding name (lower case) to the static payloads using it, in PT order.
static CODECS_BY_NAME: Lazy<HashMap<String, Vec<&'static StaticPayload>>> = Lazy::new(|| {
    let mut map: HashMap<String, Vec<&'static StaticPayload>> = HashMap::new();
    for p in STATIC_PAYLOADS.iter().flatten() {
        map.entry(p.encoding.to_ascii_lowercase())
            .or_default()
            .push(p);
    }
    map
});

/// The RFC 3551 static entry for a payload type.
pub fn static_payload(pt: usize) -> Option<&'static StaticPayload> {
    STATIC_PAYLOADS.get(pt)?.as_ref()
}

/// `a=rtpmap` value for a static payload type, i.e. `PCMU/8000/1` for 0.
pub fn static_rtpmap(pt: usize) -> Option<&'static str> {
    static_payload(pt).map(|p| p.rtpmap)
}

/// Look up a codec by name.
///
/// Either a bare encoding name (`PCMU`, case insensitive), which picks the
/// first entry for that encoding, or a full rtpmap (`DVI4/16000`,
/// `L16/44100/2`) matched on clock rate and channels too.
pub fn codec_by_name(name: &str) -> Option<&'static StaticPayload> {
    match parse_rtp_encoding(name) {
        Some(wanted) => {
            let candidates = CODECS_BY_NAME.get(&wanted.encoding.to_ascii_lowercase())?;
            candidates
                .iter()
                .find(|p| p.to_rtpmap().matches(&wanted))
                .copied()
        }
        None => CODECS_BY_NAME
            .get(&name.to_ascii_lowercase())?
            .first()
            .copied(),
    }
}
