//! A single-direction RTP/RTCP media flow and its running statistics
//! (§4.4).

use crate::address::Address;
use crate::sip::MessageId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamKind {
    Rtp,
    Rtcp,
}

/// Key identifying a [`Stream`]: one-directional, so the A->B and B->A
/// legs of a call are two separate streams even when they share an SSRC
/// space (RFC 3550 allows but does not require symmetric SSRCs).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StreamKey {
    pub src: Address,
    pub dst: Address,
    pub ssrc: u32,
}

/// RFC 3550 §A.3-style extended sequence-number tracking: enough state
/// to detect loss, out-of-order delivery and sequence wraparound
/// without retaining full packet history.
#[derive(Debug, Clone, Copy, Default)]
struct SequenceTracker {
    initialized: bool,
    base_seq: u16,
    max_seq: u16,
    cycles: u32,
}

impl SequenceTracker {
    /// Returns `true` if `seq` arrived out of order relative to the
    /// highest sequence number seen so far.
    fn observe(&mut self, seq: u16) -> bool {
        if !self.initialized {
            self.initialized = true;
            self.base_seq = seq;
            self.max_seq = seq;
            return false;
        }
        let delta = seq.wrapping_sub(self.max_seq) as i16;
        if delta > 0 {
            if seq < self.max_seq {
                self.cycles += 1;
            }
            self.max_seq = seq;
            false
        } else {
            true
        }
    }

    /// Extended highest sequence number observed (RFC 3550 `extended_max`).
    fn extended_max(&self) -> u64 {
        (self.cycles as u64) * (1 << 16) + self.max_seq as u64
    }

    fn extended_base(&self) -> u64 {
        self.base_seq as u64
    }
}

/// A one-directional media flow, keyed by `(src, dst, ssrc)` (§3).
#[derive(Debug, Clone)]
pub struct Stream {
    pub key: StreamKey,
    pub kind: StreamKind,
    pub format_code: u8,
    pub format_name: String,
    pub packet_count: u64,
    pub first_ts: i64,
    pub last_ts: i64,

    seq: SequenceTracker,
    pub out_of_sequence: u64,
    pub max_delta_ms: f64,
    pub max_jitter_ms: f64,
    mean_jitter_accum: f64,
    jitter_samples: u64,
    last_rtp_timestamp: Option<u32>,
    last_arrival_ts: Option<i64>,
    /// Running RFC 3550 §6.4.1 jitter estimate, in RTP timestamp units.
    jitter: f64,

    pub msg: Option<MessageId>,
    /// RTP payload ring buffer, only populated when the caller opts in
    /// (spec.md's "store RTP payloads" capture option).
    payload_ring: Option<Vec<Vec<u8>>>,
    payload_ring_capacity: usize,
}

impl Stream {
    pub fn new(key: StreamKey, kind: StreamKind, format_code: u8, format_name: String, ts: i64) -> Self {
        Self {
            key,
            kind,
            format_code,
            format_name,
            packet_count: 0,
            first_ts: ts,
            last_ts: ts,
            seq: SequenceTracker::default(),
            out_of_sequence: 0,
            max_delta_ms: 0.0,
            max_jitter_ms: 0.0,
            mean_jitter_accum: 0.0,
            jitter_samples: 0,
            last_rtp_timestamp: None,
            last_arrival_ts: None,
            jitter: 0.0,
            msg: None,
            payload_ring: None,
            payload_ring_capacity: 0,
        }
    }

    pub fn enable_payload_ring(&mut self, capacity: usize) {
        self.payload_ring = Some(Vec::with_capacity(capacity));
        self.payload_ring_capacity = capacity;
    }

    /// Update statistics for a newly observed RTP packet. `arrival_ts`
    /// and `rtp_clock_rate` are in microseconds and Hz respectively,
    /// required to express jitter in the RTP timestamp units RFC 3550
    /// defines it in before converting for `max_jitter_ms`.
    pub fn observe_rtp(
        &mut self,
        sequence: u16,
        rtp_timestamp: u32,
        arrival_ts: i64,
        clock_rate_hz: u32,
        payload: &[u8],
    ) {
        self.packet_count += 1;
        self.last_ts = arrival_ts;

        if self.seq.observe(sequence) {
            self.out_of_sequence += 1;
        }

        if let (Some(prev_rtp_ts), Some(prev_arrival)) =
            (self.last_rtp_timestamp, self.last_arrival_ts)
        {
            let arrival_delta_units =
                ((arrival_ts - prev_arrival) as f64) * (clock_rate_hz as f64) / 1_000_000.0;
            let rtp_delta_units = rtp_timestamp.wrapping_sub(prev_rtp_ts) as i64 as f64;
            let d = arrival_delta_units - rtp_delta_units;
            // RFC 3550 §6.4.1: J(i) = J(i-1) + (|D(i-1,i)| - J(i-1)) / 16
            self.jitter += (d.abs() - self.jitter) / 16.0;

            let jitter_ms = self.jitter / (clock_rate_hz as f64 / 1000.0);
            self.mean_jitter_accum += jitter_ms;
            self.jitter_samples += 1;
            if jitter_ms > self.max_jitter_ms {
                self.max_jitter_ms = jitter_ms;
            }

            let delta_ms = ((arrival_ts - prev_arrival) as f64) / 1000.0;
            if delta_ms.abs() > self.max_delta_ms {
                self.max_delta_ms = delta_ms.abs();
            }
        }

        self.last_rtp_timestamp = Some(rtp_timestamp);
        self.last_arrival_ts = Some(arrival_ts);

        if let Some(ring) = &mut self.payload_ring {
            if ring.len() == self.payload_ring_capacity {
                ring.remove(0);
            }
            ring.push(payload.to_vec());
        }
    }

    pub fn expected(&self) -> u64 {
        if !self.seq.initialized {
            return 0;
        }
        self.seq.extended_max() - self.seq.extended_base() + 1
    }

    pub fn lost(&self) -> u64 {
        self.expected().saturating_sub(self.packet_count)
    }

    pub fn mean_jitter_ms(&self) -> f64 {
        if self.jitter_samples == 0 {
            0.0
        } else {
            self.mean_jitter_accum / self.jitter_samples as f64
        }
    }

    /// A stream is active iff its most recent packet arrived less than
    /// 2 seconds ago (spec.md §4.4).
    pub fn is_active(&self, now: i64) -> bool {
        now - self.last_ts < 2_000_000
    }

    pub fn payloads(&self) -> &[Vec<u8>] {
        self.payload_ring.as_deref().unwrap_or(&[])
    }
}
