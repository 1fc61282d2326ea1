//! Parsers for the handful of attribute values the negotiation looks into.
//!
//! These never see whole SDP lines, only the value part after `a=<key>:`.

use combine::error::*;
use combine::parser::char::*;
use combine::parser::combinator::*;
use combine::stream::StreamErrorFor;
use combine::*;
use combine::{ParseError, Parser, Stream};

use crate::id::{Pt, MAX_PT};

use super::data::RtpMap;

/// What an `a=rtcp-fb` line applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum FbTarget {
    Pt(Pt),
    Wildcard,
}

/// `96 VP8/90000`
pub(crate) fn parse_rtpmap(value: &str) -> Option<(Pt, RtpMap)> {
    (pt(), token(' '), rtp_encoding())
        .map(|(pt, _, map)| (pt, map))
        .parse(value)
        .ok()
        .map(|(v, _)| v)
}

/// `VP8/90000`, `opus/48000/2`
pub(crate) fn parse_rtp_encoding(value: &str) -> Option<RtpMap> {
    rtp_encoding().parse(value).ok().map(|(v, _)| v)
}

/// `<value>["/"<direction>] <URI> <extensionattributes>`
pub(crate) fn parse_extmap(value: &str) -> Option<(u16, String)> {
    (
        from_str(many1::<String, _, _>(digit())),
        optional((token('/'), not_sp())),
        token(' '),
        not_sp(),
    )
        .map(|(id, _, _, uri)| (id, uri))
        .parse(value)
        .ok()
        .map(|(v, _)| v)
}

/// `96 nack pli`, `* ccm fir`
pub(crate) fn parse_rtcp_fb(value: &str) -> Option<(FbTarget, String)> {
    let target = choice((
        token('*').map(|_| FbTarget::Wildcard),
        pt().map(FbTarget::Pt),
    ));

    (target, skip_many1(token(' ')), any_value())
        .map(|(target, _, fb)| (target, fb.trim().to_string()))
        .parse(value)
        .ok()
        .map(|(v, _)| v)
}

/// The run of decimal digits a value starts with. `1234 cname:foo` gives `1234`.
pub(crate) fn leading_digits(value: &str) -> Option<String> {
    many1::<String, _, _>(digit())
        .parse(value)
        .ok()
        .map(|(v, _)| v)
}

fn pt<Input>() -> impl Parser<Input, Output = Pt>
where
    Input: Stream<Token = char>,
    Input::Error: ParseError<Input::Token, Input::Range, Input::Position>,
{
    many1::<String, _, _>(digit()).and_then(|s| {
        let v = s
            .parse::<u8>()
            .map_err(StreamErrorFor::<Input>::message_format)?;
        if v > MAX_PT {
            return Err(StreamErrorFor::<Input>::message_static_message(
                "payload type out of range",
            ));
        }
        Ok(Pt::from(v))
    })
}

fn rtp_encoding<Input>() -> impl Parser<Input, Output = RtpMap>
where
    Input: Stream<Token = char>,
    Input::Error: ParseError<Input::Token, Input::Range, Input::Position>,
{
    (
        many1::<String, _, _>(satisfy(|c| c != '/' && c != ' ')),
        token('/'),
        from_str(many1::<String, _, _>(digit())),
        optional((token('/'), from_str(many1::<String, _, _>(digit())))),
    )
        .map(|(encoding, _, clock_rate, channels)| RtpMap {
            encoding,
            clock_rate,
            channels: channels.map(|(_, c)| c),
        })
}

fn not_sp<Input>() -> impl Parser<Input, Output = String>
where
    Input: Stream<Token = char>,
    Input::Error: ParseError<Input::Token, Input::Range, Input::Position>,
{
    many1(satisfy(|c| c != ' ' && c != '\r' && c != '\n'))
}

fn any_value<Input>() -> impl Parser<Input, Output = String>
where
    Input: Stream<Token = char>,
    Input::Error: ParseError<Input::Token, Input::Range, Input::Position>,
{
    many1(satisfy(|c| c != '\r' && c != '\n'))
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn rtpmap_with_channels() {
        let (pt, map) = parse_rtpmap("111 opus/48000/2").unwrap();
        assert_eq!(pt, 111.into());
        assert_eq!(map.encoding, "opus");
        assert_eq!(map.clock_rate, 48_000);
        assert_eq!(map.channels, Some(2));
    }

    #[test]
    fn rtpmap_without_channels() {
        let (pt, map) = parse_rtpmap("96 VP8/90000").unwrap();
        assert_eq!(pt, 96.into());
        assert_eq!(map.to_string(), "VP8/90000");
    }

    #[test]
    fn rtpmap_bad() {
        assert!(parse_rtpmap("200 VP8/90000").is_none());
        assert!(parse_rtpmap("96 VP8").is_none());
        assert!(parse_rtpmap("VP8/90000").is_none());
    }

    #[test]
    fn extmap_with_direction() {
        assert_eq!(
            parse_extmap("3/sendonly urn:ietf:params:rtp-hdrext:toffset"),
            Some((3, "urn:ietf:params:rtp-hdrext:toffset".to_string()))
        );
        assert_eq!(
            parse_extmap("1 urn:ietf:params:rtp-hdrext:ssrc-audio-level vad=on"),
            Some((1, "urn:ietf:params:rtp-hdrext:ssrc-audio-level".to_string()))
        );
    }

    #[test]
    fn rtcp_fb_targets() {
        assert_eq!(
            parse_rtcp_fb("100 nack pli"),
            Some((FbTarget::Pt(100.into()), "nack pli".to_string()))
        );
        assert_eq!(
            parse_rtcp_fb("* ccm fir"),
            Some((FbTarget::Wildcard, "ccm fir".to_string()))
        );
        assert_eq!(parse_rtcp_fb("100"), None);
    }

    #[test]
    fn leading_digits_stop_at_non_digit() {
        assert_eq!(leading_digits("1234567 cname:foo"), Some("1234567".into()));
        assert_eq!(leading_digits("cname:foo"), None);
    }
}
