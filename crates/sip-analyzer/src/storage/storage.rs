//! The process-wide call registry (§3, §4.8).

use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::Arc;

use crate::call::{Call, CallGroup};
use crate::filter::{DisplayFilters, StorageMatchOpts};
use crate::packet::{Packet, ProtoData, ProtocolId};
use crate::rtp::{Stream, StreamKey, StreamKind};
use crate::sip::MessageId;
use crate::storage::listener::StorageListener;
use crate::storage::snapshot::{SnapshotData, SnapshotView};

/// Fixed per-message accounting overhead (header map + parsed-SDP
/// allocations), approximating the part of a `Message`'s footprint that
/// isn't captured by its packet's `caplen` (Open Question resolution:
/// see DESIGN.md).
pub const MESSAGE_OVERHEAD_BYTES: u64 = 256;

#[derive(Debug, Clone)]
pub struct StorageCaptureOpts {
    pub store_rtp: bool,
    pub memory_limit: u64,
}

impl Default for StorageCaptureOpts {
    fn default() -> Self {
        Self {
            store_rtp: false,
            memory_limit: u64::MAX,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SortOpts {
    pub attribute: String,
    pub ascending: bool,
}

impl Default for SortOpts {
    fn default() -> Self {
        Self {
            attribute: "callindex".to_string(),
            ascending: true,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct StorageStats {
    pub total: usize,
    pub displayed: usize,
    pub memory_bytes: u64,
}

/// Process-wide registry of calls. Created once at startup; the
/// single-writer side of the single-writer/multiple-reader policy in
/// spec.md §5 (callers wrap it in a `RwLock`, not `Storage` itself).
pub struct Storage {
    calls_by_id: HashMap<String, Call>,
    calls_by_index: Vec<String>,
    call_memory: HashMap<String, u64>,
    /// `(ip, port)` -> `(owning call, announcing message)`, populated
    /// from SDP media descriptions so an RTP/RTCP packet can be
    /// attributed to the Call *and* the specific SIP message whose
    /// offer/answer announced that address (§3's `Stream.msg`, §4.4's
    /// stream-to-message correlation).
    stream_reservations: HashMap<(IpAddr, u16), (String, MessageId)>,
    pub match_opts: StorageMatchOpts,
    pub capture_opts: StorageCaptureOpts,
    pub sort_opts: SortOpts,
    next_index: u32,
    memory_bytes: u64,
    version: u64,
    listeners: Vec<Arc<dyn StorageListener>>,
}

impl Storage {
    pub fn new(match_opts: StorageMatchOpts, capture_opts: StorageCaptureOpts, sort_opts: SortOpts) -> Self {
        Self {
            calls_by_id: HashMap::new(),
            calls_by_index: Vec::new(),
            call_memory: HashMap::new(),
            stream_reservations: HashMap::new(),
            match_opts,
            capture_opts,
            sort_opts,
            next_index: 1,
            memory_bytes: 0,
            version: 0,
            listeners: Vec::new(),
        }
    }

    pub fn add_listener(&mut self, listener: Arc<dyn StorageListener>) {
        self.listeners.push(listener);
    }

    pub fn lookup_by_callid(&self, call_id: &str) -> Option<&Call> {
        self.calls_by_id.get(call_id)
    }

    pub fn len(&self) -> usize {
        self.calls_by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.calls_by_id.is_empty()
    }

    /// Route a dissected packet to SIP or RTP/RTCP ingest, by top
    /// protocol.
    pub fn ingest(&mut self, packet: &Packet) {
        if packet.get(ProtocolId::Sip).is_some() {
            self.ingest_sip(packet);
        } else if packet.get(ProtocolId::Rtp).is_some() || packet.get(ProtocolId::Rtcp).is_some() {
            self.ingest_rtp(packet);
        }
    }

    fn raw_bytes(packet: &Packet) -> Vec<u8> {
        packet.frames.iter().flat_map(|f| f.bytes.iter().copied()).collect()
    }

    fn ingest_sip(&mut self, packet: &Packet) {
        let Some(ProtoData::Sip(meta)) = packet.get(ProtocolId::Sip) else { return };

        if !self.match_opts.accepts_payload(&Self::raw_bytes(packet)) {
            return;
        }

        let (Some(src), Some(dst)) = (packet.src_address(), packet.dst_address()) else {
            return;
        };
        let ts = packet.timestamp();
        let call_id = meta.call_id.clone();
        let meta = meta.clone();

        let is_new = !self.calls_by_id.contains_key(&call_id);
        if is_new {
            self.enforce_dialog_cap();
            let index = self.next_index;
            self.next_index += 1;
            self.calls_by_id.insert(call_id.clone(), Call::new(call_id.clone(), index));
            self.calls_by_index.push(call_id.clone());
            self.call_memory.insert(call_id.clone(), 0);
        }

        let call = self.calls_by_id.get_mut(&call_id).expect("just inserted or pre-existing");
        let message_id = call.ingest_message(meta, src, dst, ts);

        if self.match_opts.invite_only && !call.contains_invite() {
            self.remove_call(&call_id);
            return;
        }

        let call = self.calls_by_id.get(&call_id).expect("present after ingest");
        for listener in &self.listeners {
            if is_new {
                listener.on_call_created(call);
            } else {
                listener.on_call_updated(call);
            }
        }

        if let Some(ProtoData::Sdp(sdp)) = packet.get(ProtocolId::Sdp) {
            for media in &sdp.media {
                if let Some((ip, port)) = media.address_port() {
                    self.stream_reservations
                        .insert((ip, port), (call_id.clone(), message_id));
                }
            }
        }

        self.account_memory(&call_id, packet.caplen_total() + MESSAGE_OVERHEAD_BYTES);
        self.enforce_memory_limit();
        self.version += 1;
    }

    fn ingest_rtp(&mut self, packet: &Packet) {
        let (Some(src), Some(dst)) = (packet.src_address(), packet.dst_address()) else {
            return;
        };

        // Stream-to-message correlation (spec.md §4.4, precedence
        // resolved in SPEC_FULL.md §4.6): match the stream's *source*
        // address:port against an SDP reservation first, since that is
        // the address the announcing message told its peer to send
        // media to; fall back to the destination if no source match
        // exists. A stream with neither is orphaned (no reservation,
        // no Call to attach to).
        let reservation = self
            .stream_reservations
            .get(&(src.ip(), src.port()))
            .or_else(|| self.stream_reservations.get(&(dst.ip(), dst.port())))
            .cloned();
        let Some((call_id, announcing_msg)) = reservation else {
            return;
        };

        let Some(call) = self.calls_by_id.get_mut(&call_id) else { return };
        let ts = packet.timestamp();

        if let Some(rtp) = packet.rtp() {
            let key = StreamKey {
                src,
                dst,
                ssrc: rtp.ssrc,
            };
            if !call.streams.iter().any(|s| s.key == key) {
                let codec_name = crate::rtp::codec::static_codec_name(rtp.payload_type)
                    .unwrap_or("unknown")
                    .to_string();
                let mut stream = Stream::new(key, StreamKind::Rtp, rtp.payload_type, codec_name, ts);
                stream.msg = Some(announcing_msg);
                if self.capture_opts.store_rtp {
                    stream.enable_payload_ring(64);
                }
                call.streams.push(stream);
            }
            let stream = call.streams.iter_mut().find(|s| s.key == key).expect("just ensured");
            stream.observe_rtp(rtp.sequence, rtp.timestamp, ts, 8000, &rtp.payload);
        }

        self.account_memory(&call_id, packet.caplen_total());
        self.enforce_memory_limit();
        self.version += 1;
    }

    fn account_memory(&mut self, call_id: &str, bytes: u64) {
        *self.call_memory.entry(call_id.to_string()).or_insert(0) += bytes;
        self.memory_bytes += bytes;
    }

    fn enforce_dialog_cap(&mut self) {
        if self.match_opts.dialog_cap == 0 {
            return;
        }
        while self.calls_by_id.len() >= self.match_opts.dialog_cap {
            let Some(oldest) = self.calls_by_index.first().cloned() else { break };
            self.remove_call(&oldest);
        }
    }

    fn enforce_memory_limit(&mut self) {
        while self.memory_bytes >= self.capture_opts.memory_limit {
            let Some(oldest) = self.calls_by_index.first().cloned() else { break };
            self.remove_call(&oldest);
        }
    }

    fn remove_call(&mut self, call_id: &str) {
        self.calls_by_id.remove(call_id);
        self.calls_by_index.retain(|id| id != call_id);
        if let Some(freed) = self.call_memory.remove(call_id) {
            self.memory_bytes = self.memory_bytes.saturating_sub(freed);
        }
        self.stream_reservations.retain(|_, (id, _)| id != call_id);
        for listener in &self.listeners {
            listener.on_call_removed(call_id);
        }
    }

    /// Discard everything.
    pub fn clear(&mut self) {
        self.calls_by_id.clear();
        self.calls_by_index.clear();
        self.call_memory.clear();
        self.stream_reservations.clear();
        self.memory_bytes = 0;
        self.version += 1;
    }

    /// Discard every call not referenced by `keep_groups`.
    pub fn clear_soft(&mut self, keep_groups: &[&CallGroup]) {
        let keep: std::collections::HashSet<&str> = keep_groups
            .iter()
            .flat_map(|g| g.call_ids())
            .map(|s| s.as_str())
            .collect();
        let to_remove: Vec<String> = self
            .calls_by_index
            .iter()
            .filter(|id| !keep.contains(id.as_str()))
            .cloned()
            .collect();
        for id in to_remove {
            self.remove_call(&id);
        }
        self.version += 1;
    }

    pub fn stats(&self) -> StorageStats {
        StorageStats {
            total: self.calls_by_id.len(),
            displayed: self.calls_by_id.len(),
            memory_bytes: self.memory_bytes,
        }
    }

    /// A cheap, read-only, versioned view of the current call set
    /// filtered by the display filters, safe to hold across ingests.
    pub fn snapshot(&mut self, filters: &DisplayFilters) -> SnapshotView {
        let mut calls: Vec<Call> = self
            .calls_by_index
            .iter()
            .filter_map(|id| self.calls_by_id.get(id))
            .filter(|call| filters.matches(call))
            .cloned()
            .collect();

        for id in &self.calls_by_index {
            if let Some(call) = self.calls_by_id.get_mut(id) {
                call.changed = false;
            }
        }

        calls.sort_by(|a, b| a.index.cmp(&b.index));
        if !self.sort_opts.ascending {
            calls.reverse();
        }

        let displayed = calls.len();
        Arc::new(SnapshotData {
            calls,
            stats: StorageStats {
                total: self.calls_by_id.len(),
                displayed,
                memory_bytes: self.memory_bytes,
            },
            version: self.version,
        })
    }

    pub fn call_changed_since(&self, version: u64) -> bool {
        self.version > version
    }
}
