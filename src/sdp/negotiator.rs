use std::ops::ControlFlow;

use crate::format::static_rtpmap;
use crate::id::Ssrc;

use super::data::{is_direction, Attribute, Direction, MediaBlock, SessionMessage, SetupRole};
use super::intersect::intersect;
use super::parser::leading_digits;
use super::AttributeError;

/// Run every session level attribute of `msg` through [`intersect`] and hand
/// the result to `visit`.
///
/// Stops at the first attribute that fails. Attributes already visited are
/// not taken back, so the caller must throw away whatever it was building.
pub fn for_each_session_attribute(
    msg: &SessionMessage,
    visit: impl FnMut(Attribute),
) -> Result<(), AttributeError> {
    intersect_all(&msg.attrs, visit)
}

/// Same as [`for_each_session_attribute`] for the attributes of one m-line.
pub fn for_each_media_attribute(
    media: &MediaBlock,
    visit: impl FnMut(Attribute),
) -> Result<(), AttributeError> {
    intersect_all(&media.attrs, visit)
}

fn intersect_all(
    attrs: &[Attribute],
    mut visit: impl FnMut(Attribute),
) -> Result<(), AttributeError> {
    for attr in attrs {
        let answer = intersect(attr).map_err(|e| {
            warn!("Can not set attribute a={}:{}", attr.key, attr.value);
            e
        })?;
        visit(answer);
    }
    Ok(())
}

/// Visit the m-lines in order until `visit` breaks.
///
/// Returns the break value, which makes this usable for first-match lookups.
pub fn for_each_media<'a, B>(
    msg: &'a SessionMessage,
    mut visit: impl FnMut(&'a MediaBlock) -> ControlFlow<B>,
) -> ControlFlow<B> {
    for media in &msg.medias {
        visit(media)?;
    }
    ControlFlow::Continue(())
}

/// Exact match on both key and value.
pub fn is_attribute_in_media(media: &MediaBlock, attr: &Attribute) -> bool {
    media
        .attrs
        .iter()
        .any(|a| a.key == attr.key && a.value == attr.value)
}

/// Among attributes sharing `key`, the first one whose value starts with the
/// `format` token.
///
/// `attribute_value_for_format(media, "fmtp", "96")` finds `a=fmtp:96 ...`.
pub fn attribute_value_for_format<'a>(
    media: &'a MediaBlock,
    key: &str,
    format: &str,
) -> Option<&'a str> {
    media
        .attribute_vals(key)
        .find(|v| v.split(' ').next() == Some(format))
}

/// The rtpmap for a format, i.e. `PCMU/8000/1` for `0`.
///
/// Explicit `a=rtpmap` lines win over the RFC 3551 static assignments. Formats
/// above 34, or that aren't numeric, have no static fallback.
pub fn rtpmap<'a>(media: &'a MediaBlock, format: &str) -> Option<&'a str> {
    let explicit = media
        .attrs
        .iter()
        .filter(|a| a.key.eq_ignore_ascii_case("rtpmap"))
        .find_map(|a| {
            // Format token followed by a space, so "9" does not pick up "96 ...".
            let rest = a.value.strip_prefix(format)?;
            rest.strip_prefix(' ')
        });

    if explicit.is_some() {
        return explicit;
    }

    if format.is_empty() || !format.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }

    let pt: usize = format.parse().ok()?;
    static_rtpmap(pt)
}

/// Which setup role we end up with for an m-line.
///
/// `is_offerer` tells whether the local side made the offer, in which case
/// `media` is the remote answer. The result is always `Active` or `Passive`.
pub fn answer_setup_role(media: &MediaBlock, is_offerer: bool) -> SetupRole {
    let setup = media.attribute_val("setup");

    match (setup, is_offerer) {
        (Some("active"), true) => {
            debug!("Remote is 'active', so we are 'passive'");
            SetupRole::Passive
        }
        (Some("passive"), true) => {
            debug!("Remote is 'passive', so we are 'active'");
            SetupRole::Active
        }
        (Some("active"), false) => {
            debug!("We are 'active'");
            SetupRole::Active
        }
        (Some("passive"), false) => {
            debug!("We are 'passive'");
            SetupRole::Passive
        }
        _ => {
            debug!(
                "Negotiated setup is '{:?}'. {}",
                setup,
                if is_offerer {
                    "Local offerer, so 'passive'"
                } else {
                    "Remote offerer, so 'active'"
                }
            );
            if is_offerer {
                SetupRole::Passive
            } else {
                SetupRole::Active
            }
        }
    }
}

/// SSRC from the first `a=ssrc` line, 0 if missing or not valid.
pub fn ssrc(media: &MediaBlock) -> Ssrc {
    let Some(value) = media.attribute_val("ssrc") else {
        return 0.into();
    };

    let Some(digits) = leading_digits(value) else {
        return 0.into();
    };

    match digits.parse::<u64>().ok().and_then(|v| u32::try_from(v).ok()) {
        Some(v) => v.into(),
        None => {
            // Not an error for the negotiation, we just don't know the SSRC.
            warn!("SSRC {} not valid", digits);
            0.into()
        }
    }
}

/// Direction from the first direction attribute of the m-line.
///
/// Defaults to `SendRecv` when there is none.
pub fn media_direction(media: &MediaBlock) -> Direction {
    media
        .attrs
        .iter()
        .find_map(is_direction)
        .unwrap_or_default()
}
