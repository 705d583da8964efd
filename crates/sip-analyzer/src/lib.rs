//! Protocol dissection, call storage, and filtering core for a VoIP
//! signalling analyzer.
//!
//! The crate is organized leaf-first: [`address`] and [`packet`] are
//! the shared value types everything else builds on; [`dissect`] turns
//! raw frames into [`packet::Packet`]s; [`sip`], [`sdp`], [`rtp`] parse
//! the protocol layers a `Packet` can carry; [`call`] correlates
//! `Packet`s into dialogs; [`storage`] is the process-wide registry of
//! calls; [`filter`] selects and displays what storage holds.

pub mod address;
pub mod call;
pub mod config;
pub mod dissect;
pub mod error;
pub mod filter;
pub mod packet;
pub mod pcap;
pub mod reassembly;
pub mod rtp;
pub mod sdp;
pub mod sip;
pub mod source;
pub mod storage;

pub use error::{Error, Result};
