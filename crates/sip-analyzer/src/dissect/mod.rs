//! The dissector chain: a registry of per-protocol dissectors dispatched
//! by each layer's own routing rule (§4.1).

mod hep;
mod ip;
mod rtp;
mod sip;
mod tcp;
mod tls;
mod udp;
mod ws;

use std::collections::HashMap;

use crate::packet::{Packet, ProtocolId};
use crate::reassembly::{FlowKey, FramingMode, ReassemblyTable};

/// Why a dissector dropped a packet, kept for logging and per-protocol
/// drop counters rather than surfaced as a hard error to the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DropReason {
    Dissect(crate::error::DissectError),
    UnsupportedCipherSuite(u16),
    Reassembling,
    HepAuthMismatch,
    Undecryptable,
}

impl From<crate::error::DissectError> for DropReason {
    fn from(e: crate::error::DissectError) -> Self {
        DropReason::Dissect(e)
    }
}

/// Outcome of a single dissector's work on a payload slice.
pub enum DissectResult<'p> {
    /// Hand the given slice to the named subdissector.
    Next(ProtocolId, &'p [u8]),
    /// Dissection of this packet is complete (e.g. SIP with no body).
    Done,
    /// Drop the packet; no further dissectors run.
    Drop(DropReason),
}

/// A single protocol layer's dissection logic.
///
/// Purely functional over `(packet, payload)`: a dissector enriches
/// `packet`'s protocol-data map and returns the remaining payload (or a
/// terminal/drop result) without otherwise touching shared state.
///
/// TLS is the one exception in this module: decrypted application data
/// is necessarily an owned buffer rather than a subslice of its input,
/// so `dissect::tls` exposes a plain function returning owned bytes
/// instead of implementing this trait; [`Chain::run_tcp`] re-enters the
/// dissector loop with that buffer directly.
pub trait Dissector {
    fn id(&self) -> ProtocolId;
    fn dissect<'p>(&self, packet: &mut Packet, payload: &'p [u8]) -> DissectResult<'p>;
}

/// Well-known ports this analyzer uses to pick a TCP flow's framing
/// mode. A production deployment would make these configurable; fixed
/// here since spec.md does not otherwise specify how the choice is made.
const TLS_PORT: u16 = 5061;
const WS_PORT: u16 = 5062;

/// Configuration the dissector chain needs but that isn't carried on
/// the wire: the HEP auth password and an optional TLS decryption key.
#[derive(Debug, Clone, Default)]
pub struct ChainConfig {
    pub hep_auth_password: Option<String>,
    pub tls_private_key_pem: Option<String>,
}

enum TcpFraming {
    Sip,
    Tls,
    Ws,
}

fn tcp_framing_for(sport: u16, dport: u16) -> TcpFraming {
    if sport == TLS_PORT || dport == TLS_PORT {
        TcpFraming::Tls
    } else if sport == WS_PORT || dport == WS_PORT {
        TcpFraming::Ws
    } else {
        TcpFraming::Sip
    }
}

/// Runs the full IP -> ... -> SIP/RTP dissection for one frame, and
/// tracks per-protocol drop counts.
pub struct Chain {
    config: ChainConfig,
    drop_counts: HashMap<ProtocolId, u64>,
    reassembly: ReassemblyTable,
    tls_state: HashMap<FlowKey, tls::TlsFlowState>,
}

impl Chain {
    pub fn new(config: ChainConfig) -> Self {
        Self {
            config,
            drop_counts: HashMap::new(),
            reassembly: ReassemblyTable::new(),
            tls_state: HashMap::new(),
        }
    }

    pub fn drop_count(&self, id: ProtocolId) -> u64 {
        self.drop_counts.get(&id).copied().unwrap_or(0)
    }

    fn record_drop(&mut self, id: ProtocolId) {
        *self.drop_counts.entry(id).or_insert(0) += 1;
    }

    /// Evict reassembly flows idle for more than 60s, per spec.md §4.5.
    pub fn sweep_idle_flows(&mut self, now: i64) {
        self.reassembly.sweep_idle(now);
    }

    /// Run the chain over one captured UDP-or-TCP frame starting at
    /// the IP layer. Returns every complete [`Packet`] the frame
    /// produced (zero for UDP/HEP frames that dropped or are not yet
    /// complete, more than one for a single TCP segment that completed
    /// several buffered PDUs at once).
    pub fn run(&mut self, packet_template: &Packet, frame_bytes: &[u8], now: i64) -> Vec<Packet> {
        let mut packet = packet_template.clone();
        let ip_result = ip::dissect(&mut packet, frame_bytes);
        let (next_id, ip_payload) = match ip_result {
            DissectResult::Next(id, payload) => (id, payload),
            DissectResult::Drop(_) => {
                self.record_drop(ProtocolId::Ip);
                return Vec::new();
            }
            DissectResult::Done => return vec![packet],
        };

        match next_id {
            ProtocolId::Udp => self.run_udp(packet, ip_payload).into_iter().collect(),
            ProtocolId::Tcp => self.run_tcp(packet, ip_payload, now),
            _ => {
                self.record_drop(next_id);
                Vec::new()
            }
        }
    }

    fn run_udp(&mut self, mut packet: Packet, udp_frame: &[u8]) -> Option<Packet> {
        match udp::dissect(&mut packet, udp_frame) {
            DissectResult::Next(ProtocolId::Hep, body) => {
                match hep::dissect(&mut packet, body, &self.config) {
                    DissectResult::Next(ProtocolId::Sip, sip_body) => {
                        self.finish_sip(packet, sip_body)
                    }
                    DissectResult::Drop(_) => {
                        self.record_drop(ProtocolId::Hep);
                        None
                    }
                    _ => {
                        self.record_drop(ProtocolId::Hep);
                        None
                    }
                }
            }
            DissectResult::Next(ProtocolId::Sip, body) => self.finish_sip(packet, body),
            DissectResult::Next(ProtocolId::Rtp, body) => self.finish_rtp(packet, body),
            DissectResult::Next(ProtocolId::Rtcp, body) => self.finish_rtcp(packet, body),
            DissectResult::Drop(_) => {
                self.record_drop(ProtocolId::Udp);
                None
            }
            _ => {
                self.record_drop(ProtocolId::Udp);
                None
            }
        }
    }

    fn run_tcp(&mut self, mut packet: Packet, tcp_frame: &[u8], now: i64) -> Vec<Packet> {
        let (sport, dport, tcp_payload) = match tcp::dissect(&mut packet, tcp_frame) {
            DissectResult::Next(ProtocolId::Tcp, body) => {
                let meta = packet.tcp().expect("tcp::dissect sets TcpMeta");
                (meta.sport, meta.dport, body)
            }
            _ => {
                self.record_drop(ProtocolId::Tcp);
                return Vec::new();
            }
        };

        let Some(src) = packet.src_address() else {
            self.record_drop(ProtocolId::Tcp);
            return Vec::new();
        };
        let Some(dst) = packet.dst_address() else {
            self.record_drop(ProtocolId::Tcp);
            return Vec::new();
        };
        let key = FlowKey { src, dst };

        match tcp_framing_for(sport, dport) {
            TcpFraming::Sip => {
                let pdus = self
                    .reassembly
                    .push(key, tcp_payload, now, FramingMode::SipContentLength);
                pdus.into_iter()
                    .filter_map(|pdu| self.finish_sip(packet.clone(), &pdu))
                    .collect()
            }
            TcpFraming::Ws => {
                let pdus = self.reassembly.push(key, tcp_payload, now, FramingMode::WebSocket);
                pdus.into_iter()
                    .filter(|p| !p.is_empty())
                    .filter_map(|pdu| {
                        let mut p = packet.clone();
                        match ws::dissect(&mut p, &pdu) {
                            DissectResult::Next(ProtocolId::Sip, body) => {
                                let body = body.to_vec();
                                self.finish_sip(p, &body)
                            }
                            _ => None,
                        }
                    })
                    .collect()
            }
            TcpFraming::Tls => {
                let records = self.reassembly.push(key, tcp_payload, now, FramingMode::TlsRecord);
                let mut state = self.tls_state.remove(&key).unwrap_or_default();
                let mut out = Vec::new();
                for record in records {
                    match tls::process(
                        &mut packet,
                        &record,
                        &mut state,
                        self.config.tls_private_key_pem.as_deref(),
                    ) {
                        tls::TlsOutcome::Decrypted(plaintext) => {
                            if let Some(p) = self.finish_sip(packet.clone(), &plaintext) {
                                out.push(p);
                            }
                        }
                        tls::TlsOutcome::NeedMore => {}
                        tls::TlsOutcome::Drop(_reason) => {
                            self.record_drop(ProtocolId::Tls);
                        }
                    }
                }
                self.tls_state.insert(key, state);
                out
            }
        }
    }

    fn finish_sip(&mut self, mut packet: Packet, body: &[u8]) -> Option<Packet> {
        match sip::dissect(&mut packet, body) {
            DissectResult::Done => Some(packet),
            DissectResult::Drop(_) => {
                self.record_drop(ProtocolId::Sip);
                None
            }
            DissectResult::Next(..) => {
                self.record_drop(ProtocolId::Sip);
                None
            }
        }
    }

    fn finish_rtp(&mut self, mut packet: Packet, body: &[u8]) -> Option<Packet> {
        match rtp::dissect(&mut packet, body) {
            DissectResult::Done => Some(packet),
            _ => {
                self.record_drop(ProtocolId::Rtp);
                None
            }
        }
    }

    fn finish_rtcp(&mut self, mut packet: Packet, body: &[u8]) -> Option<Packet> {
        match rtp::dissect_rtcp(&mut packet, body) {
            DissectResult::Done => Some(packet),
            _ => {
                self.record_drop(ProtocolId::Rtcp);
                None
            }
        }
    }
}
