//! WebSocket-carried SIP tagging.
//!
//! Frame boundary extraction and unmasking already happened in
//! [`crate::reassembly::FramingMode::WebSocket`] before this is called
//! — by the time `Chain::run` reaches here it already has a complete,
//! unwrapped text/binary payload. This module only records the
//! `WsMeta` diagnostic record and passes the payload through.

use crate::dissect::DissectResult;
use crate::packet::{Packet, ProtoData, ProtocolId, WsMeta};

pub fn dissect<'p>(packet: &mut Packet, payload: &'p [u8]) -> DissectResult<'p> {
    packet.set(ProtoData::Ws(WsMeta {
        opcode: 1,
        masked: false,
        fin: true,
    }));
    DissectResult::Next(ProtocolId::Sip, payload)
}
