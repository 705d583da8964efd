//! SIP entry dissector: parses a complete SIP PDU and dispatches its
//! body to the SDP parser when `Content-Type: application/sdp` (§4.1).

use crate::dissect::{DissectResult, DropReason};
use crate::packet::ProtoData;
use crate::packet::{Packet, ProtocolId};
use crate::sdp;
use crate::sip;

pub fn dissect<'p>(packet: &mut Packet, payload: &'p [u8]) -> DissectResult<'p> {
    let meta = match sip::parse_message(payload) {
        Ok(m) => m,
        Err(e) => return DissectResult::Drop(DropReason::Dissect(e.into())),
    };

    let body = &payload[meta.body_offset..];
    let is_sdp = meta
        .content_type()
        .map(|ct| ct.trim().eq_ignore_ascii_case("application/sdp"))
        .unwrap_or(false);

    packet.set(ProtoData::Sip(meta));

    if is_sdp && !body.is_empty() {
        match sdp::parse_sdp(body) {
            Ok(session) => {
                packet.set(ProtoData::Sdp(session));
            }
            Err(e) => return DissectResult::Drop(DropReason::Dissect(e.into())),
        }
    }

    DissectResult::Done
}
