//! RTP/RTCP payload dissection, terminal for the chain (§4.4).

use crate::dissect::{DissectResult, DropReason};
use crate::packet::{Packet, ProtoData};
use crate::rtp::{packet as rtp_packet, rtcp};

pub fn dissect<'p>(packet: &mut Packet, payload: &'p [u8]) -> DissectResult<'p> {
    match rtp_packet::parse(payload) {
        Ok(meta) => {
            packet.set(ProtoData::Rtp(meta));
            DissectResult::Done
        }
        Err(e) => DissectResult::Drop(DropReason::Dissect(e)),
    }
}

pub fn dissect_rtcp<'p>(packet: &mut Packet, payload: &'p [u8]) -> DissectResult<'p> {
    match rtcp::parse(payload) {
        Ok(meta) => {
            packet.set(ProtoData::Rtcp(meta));
            DissectResult::Done
        }
        Err(e) => DissectResult::Drop(DropReason::Dissect(e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packet::PacketFrame;

    #[test]
    fn parses_rtp_and_completes() {
        let mut packet = Packet::new(PacketFrame::new(0, vec![]));
        let rtp = [0x80u8, 0, 0, 1, 0, 0, 0, 0, 0, 0, 0, 1];
        match dissect(&mut packet, &rtp) {
            DissectResult::Done => {}
            _ => panic!("expected Done"),
        }
        assert!(packet.rtp().is_some());
    }
}
