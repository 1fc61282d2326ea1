use std::ops::RangeInclusive;
use std::sync::Arc;

use crate::format::{DynamicPayloadManager, DYNAMIC_PT_RANGE};
use crate::handler::{RtpAvpMediaHandler, RtpAvpfMediaHandler};
use crate::sdp::Direction;

/// Customized config for creating media handlers.
///
/// ```
/// use sdpagent::{Direction, SdpConfig};
///
/// let config = SdpConfig::new()
///     .set_dynamic_pt_range(100..=127)
///     .set_direction(Direction::RecvOnly);
///
/// let manager = config.build_payload_manager();
/// let mut avp = config.build_avp();
/// avp.use_payload_manager(manager);
/// ```
///
/// Configs implement [`Clone`] to help create one handler per m-line.
#[derive(Debug, Clone)]
pub struct SdpConfig {
    dynamic_pt_range: RangeInclusive<u8>,
    rfc4585_proto: bool,
    direction: Direction,
}

impl SdpConfig {
    /// Creates a new default config.
    pub fn new() -> Self {
        SdpConfig::default()
    }

    /// Range dynamic payload types are allocated from.
    ///
    /// Defaults to `96..=127`.
    pub fn dynamic_pt_range(&self) -> &RangeInclusive<u8> {
        &self.dynamic_pt_range
    }

    /// Set the range dynamic payload types are allocated from.
    ///
    /// Numbers above 127 can't be carried in RTP and are ignored.
    pub fn set_dynamic_pt_range(mut self, range: RangeInclusive<u8>) -> Self {
        self.dynamic_pt_range = range;
        self
    }

    /// Whether AVPF handlers announce `RTP/AVPF` instead of `RTP/AVP`.
    ///
    /// Defaults to `false`. Existing peers rely on AVPF media lines carrying
    /// the `RTP/AVP` token.
    pub fn rfc4585_proto(&self) -> bool {
        self.rfc4585_proto
    }

    /// Make AVPF handlers use the `RTP/AVPF` token from RFC 4585.
    pub fn set_rfc4585_proto(mut self, enabled: bool) -> Self {
        self.rfc4585_proto = enabled;
        self
    }

    /// Direction handlers put in offers.
    ///
    /// Defaults to `SendRecv`.
    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// Set the direction handlers put in offers.
    pub fn set_direction(mut self, direction: Direction) -> Self {
        self.direction = direction;
        self
    }

    /// Create a payload manager for the configured range.
    ///
    /// The manager is meant to be shared by the handlers of a session.
    pub fn build_payload_manager(&self) -> Arc<DynamicPayloadManager> {
        Arc::new(DynamicPayloadManager::with_range(
            self.dynamic_pt_range.clone(),
        ))
    }

    /// Create an `RTP/AVP` handler.
    pub fn build_avp(&self) -> RtpAvpMediaHandler {
        let mut h = RtpAvpMediaHandler::new();
        h.set_direction(self.direction);
        h
    }

    /// Create an AVPF handler.
    pub fn build_avpf(&self) -> RtpAvpfMediaHandler {
        let mut h = RtpAvpfMediaHandler::new();
        h.set_direction(self.direction);
        h.set_rfc4585_proto(self.rfc4585_proto);
        h
    }
}

impl Default for SdpConfig {
    fn default() -> Self {
        Self {
            dynamic_pt_range: DYNAMIC_PT_RANGE,
            rfc4585_proto: false,
            direction: Direction::SendRecv,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::handler::MediaHandler;

    #[test]
    fn defaults() {
        let c = SdpConfig::new();
        assert_eq!(c.dynamic_pt_range(), &(96..=127));
        assert!(!c.rfc4585_proto());
        assert_eq!(c.direction(), Direction::SendRecv);
    }

    #[test]
    fn avpf_token() {
        let c = SdpConfig::new();
        assert_eq!(c.build_avpf().proto(), "RTP/AVP");

        let c = c.set_rfc4585_proto(true);
        assert_eq!(c.build_avpf().proto(), "RTP/AVPF");
        assert_eq!(c.build_avp().proto(), "RTP/AVP");
    }

    #[test]
    fn manager_uses_range() {
        let c = SdpConfig::new().set_dynamic_pt_range(110..=111);
        let m = c.build_payload_manager();
        assert_eq!(m.range(), &(110..=111));
    }
}
