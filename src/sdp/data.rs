use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::AttributeError;

/// A single `a=<key>[:<value>]` line.
///
/// Property attributes like `a=sendrecv` have an empty value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Attribute {
    pub key: String,
    pub value: String,
}

impl Attribute {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Attribute {
            key: key.into(),
            value: value.into(),
        }
    }

    /// A property attribute without value, i.e. `a=recvonly`.
    pub fn flag(key: impl Into<String>) -> Self {
        Attribute::new(key, "")
    }
}

impl fmt::Display for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.value.is_empty() {
            write!(f, "a={}", self.key)
        } else {
            write!(f, "a={}:{}", self.key, self.value)
        }
    }
}

/// An m-line together with the attributes that follow it.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaBlock {
    pub typ: MediaType,
    /// Transport protocol token, i.e. `RTP/AVP`.
    pub proto: String,
    /// Format identifiers from the m-line. Payload types or `*`.
    pub formats: Vec<String>,
    /// Order is significant.
    pub attrs: Vec<Attribute>,
    /// `c=` and port data. Never inspected, passed through as is.
    pub connection: Option<String>,
}

impl MediaBlock {
    pub fn new(typ: MediaType, proto: impl Into<String>) -> Self {
        MediaBlock {
            typ,
            proto: proto.into(),
            ..Default::default()
        }
    }

    /// First value for `key`, if any.
    pub fn attribute_val(&self, key: &str) -> Option<&str> {
        self.attribute_val_n(key, 0)
    }

    /// The `nth` value (0-based) among attributes sharing `key`.
    pub fn attribute_val_n(&self, key: &str, nth: usize) -> Option<&str> {
        self.attrs
            .iter()
            .filter(|a| a.key == key)
            .nth(nth)
            .map(|a| a.value.as_str())
    }

    /// All values for `key` in stored order.
    pub fn attribute_vals<'a, 'k>(&'a self, key: &'k str) -> impl Iterator<Item = &'a str> + 'k
    where
        'a: 'k,
    {
        self.attrs
            .iter()
            .filter(move |a| a.key == key)
            .map(|a| a.value.as_str())
    }

    pub fn has_format(&self, format: &str) -> bool {
        self.formats.iter().any(|f| f == format)
    }
}

/// A whole session description. Session level attributes and the m-lines.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionMessage {
    pub attrs: Vec<Attribute>,
    pub medias: Vec<MediaBlock>,
}

/// The value of an `a=rtpmap` line after the payload type.
///
/// `PCMU/8000/1`, `VP8/90000`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RtpMap {
    pub encoding: String,
    pub clock_rate: u32,
    pub channels: Option<u8>,
}

impl RtpMap {
    /// Compare two rtpmaps the way RFC 4855 says encoding names compare.
    ///
    /// Encoding names are case insensitive and a missing channel count means 1.
    pub fn matches(&self, other: &RtpMap) -> bool {
        self.encoding.eq_ignore_ascii_case(&other.encoding)
            && self.clock_rate == other.clock_rate
            && self.channels.unwrap_or(1) == other.channels.unwrap_or(1)
    }
}

impl fmt::Display for RtpMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.encoding, self.clock_rate)?;
        if let Some(c) = self.channels {
            write!(f, "/{}", c)?;
        }
        Ok(())
    }
}

/// "audio", "video", "application"
#[derive(Debug, Default, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MediaType {
    #[default]
    Audio,
    Video,
    Application,
    Unknown(String),
}

impl MediaType {
    pub fn is_media(&self) -> bool {
        matches!(self, MediaType::Audio | MediaType::Video)
    }
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MediaType::Audio => write!(f, "audio"),
            MediaType::Video => write!(f, "video"),
            MediaType::Application => write!(f, "application"),
            MediaType::Unknown(v) => write!(f, "{}", v),
        }
    }
}

impl<'a> From<&'a str> for MediaType {
    fn from(v: &'a str) -> Self {
        match v {
            "audio" => MediaType::Audio,
            "video" => MediaType::Video,
            "application" => MediaType::Application,
            _ => MediaType::Unknown(v.into()),
        }
    }
}

/// Media direction. Absence of a direction attribute means `SendRecv`.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    /// Send only direction.
    SendOnly,
    /// Receive only direction.
    RecvOnly,
    /// Bi-directional.
    #[default]
    SendRecv,
    /// Disabled direction.
    Inactive,
}

pub(crate) const DIRECTIONS: [Direction; 4] = [
    Direction::SendOnly,
    Direction::RecvOnly,
    Direction::SendRecv,
    Direction::Inactive,
];

impl Direction {
    /// The direction to answer with for an offered direction (RFC 3264 6.1).
    ///
    /// `SendRecv` and `Inactive` are left unchanged.
    pub fn answer(&self) -> Self {
        match self {
            Direction::SendOnly => Direction::RecvOnly,
            Direction::RecvOnly => Direction::SendOnly,
            _ => *self,
        }
    }

    /// Whether this direction is a sending direction.
    pub fn is_sending(&self) -> bool {
        matches!(self, Direction::SendOnly | Direction::SendRecv)
    }

    /// Whether this direction is a receiving direction.
    pub fn is_receiving(&self) -> bool {
        matches!(self, Direction::RecvOnly | Direction::SendRecv)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::SendOnly => "sendonly",
            Direction::RecvOnly => "recvonly",
            Direction::SendRecv => "sendrecv",
            Direction::Inactive => "inactive",
        }
    }

    /// The attribute rendering of this direction, `a=sendrecv` etc.
    pub fn to_attribute(&self) -> Attribute {
        Attribute::flag(self.as_str())
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Direction {
    type Err = AttributeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DIRECTIONS
            .into_iter()
            .find(|d| d.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| AttributeError::InvalidDirection(s.to_string()))
    }
}

/// Tells which direction an attribute names, if it is a direction attribute.
///
/// Matching is on the key only and case insensitive.
pub fn is_direction(attr: &Attribute) -> Option<Direction> {
    attr.key.parse().ok()
}

/// Connection setup role (RFC 4145).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SetupRole {
    Active,
    Passive,
    ActPass,
    HoldConn,
}

impl SetupRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            SetupRole::Active => "active",
            SetupRole::Passive => "passive",
            SetupRole::ActPass => "actpass",
            SetupRole::HoldConn => "holdconn",
        }
    }

    /// The role to put in an answer for this offered role.
    ///
    /// Unknown offers have already collapsed to `HoldConn` when parsed.
    pub fn answer(&self) -> SetupRole {
        match self {
            SetupRole::Active => SetupRole::Passive,
            SetupRole::Passive => SetupRole::Active,
            SetupRole::ActPass => SetupRole::Active,
            SetupRole::HoldConn => SetupRole::HoldConn,
        }
    }
}

impl fmt::Display for SetupRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for SetupRole {
    type Err = AttributeError;

    // Case sensitive, the tokens are lower case in RFC 4145.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(SetupRole::Active),
            "passive" => Ok(SetupRole::Passive),
            "actpass" => Ok(SetupRole::ActPass),
            "holdconn" => Ok(SetupRole::HoldConn),
            _ => Err(AttributeError::InvalidSetup(s.to_string())),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn direction_answer() {
        use Direction::*;
        assert_eq!(SendOnly.answer(), RecvOnly);
        assert_eq!(RecvOnly.answer(), SendOnly);
        assert_eq!(SendRecv.answer(), SendRecv);
        assert_eq!(Inactive.answer(), Inactive);

        // Only the symmetric ones are fixed points.
        assert_ne!(SendOnly.answer(), SendOnly);
        assert_eq!(SendRecv.answer().answer(), SendRecv);
    }

    #[test]
    fn direction_parse_case_insensitive() {
        assert_eq!("SendOnly".parse::<Direction>().unwrap(), Direction::SendOnly);
        assert_eq!("INACTIVE".parse::<Direction>().unwrap(), Direction::Inactive);
        assert!("sendonlyx".parse::<Direction>().is_err());
    }

    #[test]
    fn is_direction_matches_key() {
        assert_eq!(
            is_direction(&Attribute::flag("RECVONLY")),
            Some(Direction::RecvOnly)
        );
        assert_eq!(is_direction(&Attribute::new("setup", "active")), None);
    }

    #[test]
    fn setup_answer() {
        assert_eq!(SetupRole::Active.answer(), SetupRole::Passive);
        assert_eq!(SetupRole::Passive.answer(), SetupRole::Active);
        assert_eq!(SetupRole::ActPass.answer(), SetupRole::Active);
        assert!("Active".parse::<SetupRole>().is_err());
    }

    #[test]
    fn attribute_display() {
        assert_eq!(Attribute::flag("sendrecv").to_string(), "a=sendrecv");
        assert_eq!(
            Attribute::new("rtpmap", "0 PCMU/8000").to_string(),
            "a=rtpmap:0 PCMU/8000"
        );
    }

    #[test]
    fn attribute_vals_outlive_key() {
        let mut m = MediaBlock::new(MediaType::Video, "RTP/AVP");
        m.attrs.push(Attribute::new("rtcp-fb", "96 nack"));
        m.attrs.push(Attribute::new("fmtp", "96 max-fr=30"));
        m.attrs.push(Attribute::new("rtcp-fb", "96 nack pli"));

        let vals: Vec<&str> = {
            let key = String::from("rtcp-fb");
            let v = m.attribute_vals(&key).collect();
            v
        };
        assert_eq!(vals, vec!["96 nack", "96 nack pli"]);
        assert_eq!(m.attribute_val_n("rtcp-fb", 1), Some("96 nack pli"));
    }

    #[test]
    fn media_block_serde() {
        let mut m = MediaBlock::new(MediaType::Video, "RTP/AVP");
        m.formats.push("96".into());
        m.attrs.push(Attribute::new("rtpmap", "96 VP8/90000"));

        let json = serde_json::to_string(&m).unwrap();
        let back: MediaBlock = serde_json::from_str(&json).unwrap();
        assert_eq!(back, m);
    }
}
