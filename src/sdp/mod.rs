//! SDP structures and the attribute level offer/answer rules.

use thiserror::Error;

mod data;
pub use data::{is_direction, Attribute, Direction, MediaBlock, MediaType, RtpMap};
pub use data::{SessionMessage, SetupRole};

mod intersect;
pub use intersect::intersect;

mod negotiator;
pub use negotiator::{answer_setup_role, attribute_value_for_format, for_each_media};
pub use negotiator::{for_each_media_attribute, for_each_session_attribute};
pub use negotiator::{is_attribute_in_media, media_direction, rtpmap, ssrc};

pub(crate) mod parser;

/// Errors from turning an offered attribute into its answer.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum AttributeError {
    /// A direction attribute that can't be understood, i.e. `a=sendonly:foo`.
    #[error("invalid direction attribute: {0}")]
    InvalidDirection(String),

    /// Not one of `active`, `passive`, `actpass` or `holdconn`.
    #[error("invalid setup attribute: {0}")]
    InvalidSetup(String),
}
