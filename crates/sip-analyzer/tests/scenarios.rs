//! End-to-end scenarios driving raw captured bytes through
//! [`sip_analyzer::dissect::Chain`] into [`sip_analyzer::storage::Storage`],
//! covering spec.md §8's universal invariants and concrete scenarios.

use std::net::Ipv4Addr;

use sip_analyzer::call::CallState;
use sip_analyzer::dissect::{Chain, ChainConfig};
use sip_analyzer::filter::{DisplayFilters, StorageMatchOpts};
use sip_analyzer::packet::{Packet, PacketFrame};
use sip_analyzer::storage::{SortOpts, Storage, StorageCaptureOpts};

fn ipv4_udp_frame(src: Ipv4Addr, sport: u16, dst: Ipv4Addr, dport: u16, payload: &[u8]) -> Vec<u8> {
    let mut frame = Vec::with_capacity(28 + payload.len());
    frame.push(0x45);
    frame.push(0);
    let total_len = (28 + payload.len()) as u16;
    frame.extend_from_slice(&total_len.to_be_bytes());
    frame.extend_from_slice(&[0, 0]);
    frame.extend_from_slice(&[0, 0]);
    frame.push(64);
    frame.push(17);
    frame.extend_from_slice(&[0, 0]);
    frame.extend_from_slice(&src.octets());
    frame.extend_from_slice(&dst.octets());

    frame.extend_from_slice(&sport.to_be_bytes());
    frame.extend_from_slice(&dport.to_be_bytes());
    let udp_len = (8 + payload.len()) as u16;
    frame.extend_from_slice(&udp_len.to_be_bytes());
    frame.extend_from_slice(&[0, 0]);
    frame.extend_from_slice(payload);
    frame
}

fn invite(call_id: &str, from: &str, to: &str, cseq: u32, sdp: Option<&str>) -> String {
    let body = sdp.unwrap_or("");
    let content_type = if sdp.is_some() {
        "Content-Type: application/sdp\r\n"
    } else {
        ""
    };
    format!(
        "INVITE sip:b@x SIP/2.0\r\n\
Via: SIP/2.0/UDP 10.0.0.1;branch=z9hG4bK1\r\n\
From: <sip:{from}@x>;tag=1\r\n\
To: <sip:{to}@x>\r\n\
Call-ID: {call_id}\r\n\
CSeq: {cseq} INVITE\r\n\
{content_type}Content-Length: {len}\r\n\
\r\n{body}",
        len = body.len(),
    )
}

fn response(call_id: &str, code: u16, reason: &str, cseq: u32, cseq_method: &str, sdp: Option<&str>) -> String {
    let body = sdp.unwrap_or("");
    let content_type = if sdp.is_some() {
        "Content-Type: application/sdp\r\n"
    } else {
        ""
    };
    format!(
        "SIP/2.0 {code} {reason}\r\n\
Via: SIP/2.0/UDP 10.0.0.1;branch=z9hG4bK1\r\n\
From: <sip:a@x>;tag=1\r\n\
To: <sip:b@x>;tag=2\r\n\
Call-ID: {call_id}\r\n\
CSeq: {cseq} {cseq_method}\r\n\
{content_type}Content-Length: {len}\r\n\
\r\n{body}",
        len = body.len(),
    )
}

fn bye(call_id: &str, cseq: u32) -> String {
    format!(
        "BYE sip:b@x SIP/2.0\r\n\
Via: SIP/2.0/UDP 10.0.0.1;branch=z9hG4bK2\r\n\
From: <sip:a@x>;tag=1\r\n\
To: <sip:b@x>;tag=2\r\n\
Call-ID: {call_id}\r\n\
CSeq: {cseq} BYE\r\n\
Content-Length: 0\r\n\
\r\n"
    )
}

fn ack(call_id: &str, cseq: u32) -> String {
    format!(
        "ACK sip:b@x SIP/2.0\r\n\
Via: SIP/2.0/UDP 10.0.0.1;branch=z9hG4bK1\r\n\
From: <sip:a@x>;tag=1\r\n\
To: <sip:b@x>;tag=2\r\n\
Call-ID: {call_id}\r\n\
CSeq: {cseq} ACK\r\n\
Content-Length: 0\r\n\
\r\n"
    )
}

fn rtp_packet(seq: u16, ts: u32, ssrc: u32, pt: u8, payload: &[u8]) -> Vec<u8> {
    let mut buf = Vec::with_capacity(12 + payload.len());
    buf.push(0x80); // version 2, no padding/extension/csrc
    buf.push(pt & 0x7f);
    buf.extend_from_slice(&seq.to_be_bytes());
    buf.extend_from_slice(&ts.to_be_bytes());
    buf.extend_from_slice(&ssrc.to_be_bytes());
    buf.extend_from_slice(payload);
    buf
}

fn hep3_chunk(ctype: u16, data: &[u8]) -> Vec<u8> {
    let mut buf = Vec::new();
    buf.extend_from_slice(&0u16.to_be_bytes()); // vendor id
    buf.extend_from_slice(&ctype.to_be_bytes());
    buf.extend_from_slice(&((6 + data.len()) as u16).to_be_bytes());
    buf.extend_from_slice(data);
    buf
}

/// Build a HEP3 frame wrapping a SIP payload, per dissect::hep's wire
/// format. `auth` is the CHUNK_AUTH_KEY value (0x000e), if any.
fn hep3_frame(src: Ipv4Addr, sport: u16, dst: Ipv4Addr, dport: u16, auth: Option<&str>, payload: &[u8]) -> Vec<u8> {
    const CHUNK_IP_FAMILY: u16 = 0x0001;
    const CHUNK_IP_PROTO: u16 = 0x0002;
    const CHUNK_SRC_IP4: u16 = 0x0003;
    const CHUNK_DST_IP4: u16 = 0x0004;
    const CHUNK_SRC_PORT: u16 = 0x0007;
    const CHUNK_DST_PORT: u16 = 0x0008;
    const CHUNK_PROTO_TYPE: u16 = 0x000b;
    const CHUNK_CAPTURE_ID: u16 = 0x000c;
    const CHUNK_AUTH_KEY: u16 = 0x000e;
    const CHUNK_PAYLOAD: u16 = 0x000f;

    let mut chunks = Vec::new();
    chunks.extend(hep3_chunk(CHUNK_IP_FAMILY, &[2]));
    chunks.extend(hep3_chunk(CHUNK_IP_PROTO, &[17]));
    chunks.extend(hep3_chunk(CHUNK_SRC_IP4, &src.octets()));
    chunks.extend(hep3_chunk(CHUNK_DST_IP4, &dst.octets()));
    chunks.extend(hep3_chunk(CHUNK_SRC_PORT, &sport.to_be_bytes()));
    chunks.extend(hep3_chunk(CHUNK_DST_PORT, &dport.to_be_bytes()));
    chunks.extend(hep3_chunk(CHUNK_PROTO_TYPE, &[1]));
    chunks.extend(hep3_chunk(CHUNK_CAPTURE_ID, &1u32.to_be_bytes()));
    if let Some(a) = auth {
        chunks.extend(hep3_chunk(CHUNK_AUTH_KEY, a.as_bytes()));
    }
    chunks.extend(hep3_chunk(CHUNK_PAYLOAD, payload));

    let total_len = (6 + chunks.len()) as u16;
    let mut frame = Vec::new();
    frame.extend_from_slice(b"HEP3");
    frame.extend_from_slice(&total_len.to_be_bytes());
    frame.extend_from_slice(&chunks);
    frame
}

fn new_storage(dialog_cap: usize, invite_only: bool) -> Storage {
    let mut opts = StorageMatchOpts::new(dialog_cap);
    opts.invite_only = invite_only;
    Storage::new(opts, StorageCaptureOpts::default(), SortOpts::default())
}

/// Feed one IP-layer frame through `chain` and into `storage`.
fn feed(chain: &mut Chain, storage: &mut Storage, frame_bytes: &[u8], ts: i64) {
    let template = Packet::new(PacketFrame::new(ts, Vec::new()));
    for packet in chain.run(&template, frame_bytes, ts) {
        storage.ingest(&packet);
    }
}

const UA: Ipv4Addr = Ipv4Addr::new(192, 0, 2, 1);
const UAS: Ipv4Addr = Ipv4Addr::new(192, 0, 2, 2);

/// S1: a plain call flow (INVITE, 100 Trying, 200 OK, ACK, BYE, 200 OK)
/// reaches `Completed` with `cstart_msg`/`cend_msg` bracketing the
/// conversation at the 200 OK responses, not the requests.
#[test]
fn s1_simple_call_flow_completes() {
    let mut chain = Chain::new(ChainConfig::default());
    let mut storage = new_storage(100, false);

    feed(&mut chain, &mut storage, &ipv4_udp_frame(UA, 5060, UAS, 5060, invite("call-1", "a", "b", 1, None).as_bytes()), 0);
    feed(&mut chain, &mut storage, &ipv4_udp_frame(UAS, 5060, UA, 5060, response("call-1", 100, "Trying", 1, "INVITE", None).as_bytes()), 500);
    feed(&mut chain, &mut storage, &ipv4_udp_frame(UAS, 5060, UA, 5060, response("call-1", 200, "OK", 1, "INVITE", None).as_bytes()), 1_000);
    feed(&mut chain, &mut storage, &ipv4_udp_frame(UA, 5060, UAS, 5060, ack("call-1", 1).as_bytes()), 1_100);
    feed(&mut chain, &mut storage, &ipv4_udp_frame(UA, 5060, UAS, 5060, bye("call-1", 2).as_bytes()), 2_000);
    feed(&mut chain, &mut storage, &ipv4_udp_frame(UAS, 5060, UA, 5060, response("call-1", 200, "OK", 2, "BYE", None).as_bytes()), 2_200);

    let call = storage.lookup_by_callid("call-1").expect("call stored");
    assert_eq!(call.messages.len(), 6);
    assert_eq!(call.state, Some(CallState::Completed));
    assert!(call.messages.windows(2).all(|w| w[0].timestamp <= w[1].timestamp));

    let cstart = call.cstart_msg.and_then(|id| call.message(id)).expect("cstart set");
    assert_eq!(cstart.meta.status_code(), Some(200));
    assert_eq!(cstart.meta.cseq.method, "INVITE");

    let cend = call.cend_msg.and_then(|id| call.message(id)).expect("cend set");
    assert_eq!(cend.meta.status_code(), Some(200));
    assert_eq!(cend.meta.cseq.method, "BYE");
}

/// S2: a duplicate INVITE (same method/CSeq/payload) is flagged as a
/// retransmission rather than treated as a new transaction.
#[test]
fn s2_duplicate_invite_is_a_retransmission() {
    let mut chain = Chain::new(ChainConfig::default());
    let mut storage = new_storage(100, false);

    let raw = invite("call-2", "a", "b", 1, None);
    feed(&mut chain, &mut storage, &ipv4_udp_frame(UA, 5060, UAS, 5060, raw.as_bytes()), 0);
    feed(&mut chain, &mut storage, &ipv4_udp_frame(UA, 5060, UAS, 5060, raw.as_bytes()), 500);

    let call = storage.lookup_by_callid("call-2").expect("call stored");
    assert_eq!(call.messages.len(), 2);
    assert!(!call.messages[0].is_retransmission);
    assert!(call.messages[1].is_retransmission);
}

/// S3: a 486 Busy Here response drives the dialog to `Busy`, a sticky
/// final state.
#[test]
fn s3_busy_response_is_sticky() {
    let mut chain = Chain::new(ChainConfig::default());
    let mut storage = new_storage(100, false);

    feed(&mut chain, &mut storage, &ipv4_udp_frame(UA, 5060, UAS, 5060, invite("call-3", "a", "b", 1, None).as_bytes()), 0);
    feed(&mut chain, &mut storage, &ipv4_udp_frame(UAS, 5060, UA, 5060, response("call-3", 486, "Busy Here", 1, "INVITE", None).as_bytes()), 1_000);
    // A late, out-of-order provisional must not move the call out of Busy.
    feed(&mut chain, &mut storage, &ipv4_udp_frame(UAS, 5060, UA, 5060, response("call-3", 180, "Ringing", 1, "INVITE", None).as_bytes()), 1_500);

    let call = storage.lookup_by_callid("call-3").expect("call stored");
    assert_eq!(call.state, Some(CallState::Busy));
}

/// S4: an RTP stream is attributed to the call whose SDP answer
/// advertised the stream's *source* address (source-first lookup
/// precedence, see DESIGN.md).
#[test]
fn s4_rtp_correlates_by_sdp_advertised_source() {
    let mut chain = Chain::new(ChainConfig::default());
    let mut storage = new_storage(100, false);

    let sdp = "v=0\r\nc=IN IP4 192.0.2.1\r\nm=audio 40000 RTP/AVP 0\r\n";
    feed(
        &mut chain,
        &mut storage,
        &ipv4_udp_frame(UA, 5060, UAS, 5060, invite("call-4", "a", "b", 1, Some(sdp)).as_bytes()),
        0,
    );

    let rtp_payload = vec![0u8; 160];
    let rtp_bytes = rtp_packet(1, 8000, 0xdead_beef, 0, &rtp_payload);
    feed(&mut chain, &mut storage, &ipv4_udp_frame(UA, 40000, UAS, 40000, &rtp_bytes), 100);

    let call = storage.lookup_by_callid("call-4").expect("call stored");
    assert_eq!(call.streams.len(), 1);
    assert_eq!(call.streams[0].key.ssrc, 0xdead_beef);

    let stream_msg = call.streams[0].msg.and_then(|id| call.message(id)).expect("stream.msg set");
    assert!(stream_msg.meta.is_request());
    assert_eq!(stream_msg.meta.method(), Some("INVITE"));
}

/// S5: HEP3 frames whose auth-key chunk doesn't match the configured
/// password are dropped; matching frames are accepted.
#[test]
fn s5_hep_auth_mismatch_is_dropped() {
    let config = ChainConfig {
        hep_auth_password: Some("correct-horse".to_string()),
        tls_private_key_pem: None,
    };
    let mut chain = Chain::new(config);
    let mut storage = new_storage(100, false);

    for i in 0..5 {
        let call_id = format!("bad-{i}");
        let payload = invite(&call_id, "a", "b", 1, None);
        let hep = hep3_frame(UA, 5060, UAS, 5060, Some("wrong-password"), payload.as_bytes());
        feed(&mut chain, &mut storage, &ipv4_udp_frame(UA, 9060, UAS, 9060, &hep), i as i64);
    }
    for i in 0..5 {
        let call_id = format!("good-{i}");
        let payload = invite(&call_id, "a", "b", 1, None);
        let hep = hep3_frame(UA, 5060, UAS, 5060, Some("correct-horse"), payload.as_bytes());
        feed(&mut chain, &mut storage, &ipv4_udp_frame(UA, 9060, UAS, 9060, &hep), i as i64);
    }

    assert_eq!(storage.len(), 5);
    for i in 0..5 {
        assert!(storage.lookup_by_callid(&format!("bad-{i}")).is_none());
        assert!(storage.lookup_by_callid(&format!("good-{i}")).is_some());
    }
    assert!(chain.drop_count(sip_analyzer::packet::ProtocolId::Hep) >= 5);
}

/// S6: once the dialog cap is reached, the oldest call is evicted to
/// make room for a new one; total storage size never exceeds the cap.
#[test]
fn s6_dialog_cap_evicts_oldest_first() {
    let mut chain = Chain::new(ChainConfig::default());
    let mut storage = new_storage(3, false);

    for i in 0..5 {
        let call_id = format!("evict-{i}");
        let raw = invite(&call_id, "a", "b", 1, None);
        feed(&mut chain, &mut storage, &ipv4_udp_frame(UA, 5060, UAS, 5060, raw.as_bytes()), i as i64);
        assert!(storage.len() <= 3);
    }

    assert_eq!(storage.len(), 3);
    assert!(storage.lookup_by_callid("evict-0").is_none());
    assert!(storage.lookup_by_callid("evict-1").is_none());
    assert!(storage.lookup_by_callid("evict-4").is_some());
}

/// Universal invariant: ingest is idempotent for an exact byte-for-byte
/// duplicate frame w.r.t. call count (it is recorded as a second,
/// retransmitted message, not a second call).
#[test]
fn duplicate_frames_do_not_create_duplicate_calls() {
    let mut chain = Chain::new(ChainConfig::default());
    let mut storage = new_storage(100, false);

    let raw = invite("idempotent@x", "a", "b", 1, None);
    let frame = ipv4_udp_frame(UA, 5060, UAS, 5060, raw.as_bytes());
    feed(&mut chain, &mut storage, &frame, 0);
    feed(&mut chain, &mut storage, &frame, 0);

    assert_eq!(storage.len(), 1);
}

/// Boundary behavior: a malformed frame (no valid IP header) is
/// dropped rather than panicking the chain.
#[test]
fn malformed_frame_is_dropped_without_panicking() {
    let mut chain = Chain::new(ChainConfig::default());
    let mut storage = new_storage(100, false);

    feed(&mut chain, &mut storage, &[0xff, 0x00, 0x01], 0);

    assert!(storage.is_empty());
    assert!(chain.drop_count(sip_analyzer::packet::ProtocolId::Ip) >= 1);
}

/// Boundary behavior: invite_only rejects a call that never sees an
/// INVITE, even though its BYE alone parses cleanly.
#[test]
fn invite_only_filters_out_bye_only_calls() {
    let mut chain = Chain::new(ChainConfig::default());
    let mut storage = new_storage(100, true);

    feed(&mut chain, &mut storage, &ipv4_udp_frame(UA, 5060, UAS, 5060, bye("stray@x", 1).as_bytes()), 0);

    assert!(storage.is_empty());
}

/// Round-trip property: a call's snapshot reflects exactly the calls
/// currently ingested, and re-snapshotting without further ingest is
/// stable.
#[test]
fn snapshot_is_stable_across_repeated_reads() {
    let mut chain = Chain::new(ChainConfig::default());
    let mut storage = new_storage(100, false);

    feed(&mut chain, &mut storage, &ipv4_udp_frame(UA, 5060, UAS, 5060, invite("snap@x", "a", "b", 1, None).as_bytes()), 0);

    let first = storage.snapshot(&DisplayFilters::default());
    let second = storage.snapshot(&DisplayFilters::default());
    assert_eq!(first.calls().count(), second.calls().count());
    assert_eq!(
        first.calls().next().unwrap().call_id,
        second.calls().next().unwrap().call_id
    );
}
