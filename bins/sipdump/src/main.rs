//! Headless capture front-end: reads pcap/HEP traffic, feeds it through
//! the dissector chain into `Storage`, and prints a one-line summary per
//! completed call. No TUI; spec.md's non-goals exclude rendering.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use sip_analyzer::config::Config;
use sip_analyzer::dissect::{Chain, ChainConfig};
use sip_analyzer::error::ConfigError;
use sip_analyzer::filter::{builtin_attributes, DisplayFilters, StorageMatchOpts};
use sip_analyzer::packet::Packet;
use sip_analyzer::source::{HepUdpSource, LiveDeviceSource, PcapFileSource, Source};
use sip_analyzer::storage::{SortOpts, Storage, StorageCaptureOpts};
use sip_analyzer::Result;

#[derive(Parser)]
#[command(name = "sipdump", version, about = "Headless SIP/RTP/HEP capture analyzer")]
struct Cli {
    /// Read packets from a pcap file instead of capturing live.
    #[arg(short = 'I', long = "input")]
    input: Option<PathBuf>,

    /// Live device name to capture from (not implemented; see DESIGN.md).
    #[arg(short = 'd', long = "device")]
    device: Option<String>,

    /// Listen for HEP3 traffic on this address instead of a device/file.
    #[arg(long = "hep-listen")]
    hep_listen: Option<SocketAddr>,

    /// Configuration file (key/value rc syntax).
    #[arg(short = 'c', long = "config")]
    config: Option<PathBuf>,

    /// Store RTP media payloads.
    #[arg(long)]
    rtp: bool,

    /// Maximum number of concurrent dialogs retained (0 = from config, else unlimited).
    #[arg(long = "dialog-cap", default_value_t = 0)]
    dialog_cap: usize,

    /// Maximum bytes of packet/message memory retained.
    #[arg(long = "memory-limit")]
    memory_limit: Option<u64>,

    /// Only accept SIP payloads matching this regex.
    #[arg(long = "match-expression")]
    match_expression: Option<String>,

    /// Only retain calls that contain an INVITE.
    #[arg(long = "invite-only")]
    invite_only: bool,

    /// Accepted for compatibility; this binary never renders a TUI.
    #[arg(long = "no-interface")]
    no_interface: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::from(0),
        Err(e) => {
            tracing::error!("{e}");
            ExitCode::from(1)
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let _ = cli.no_interface;
    let file_config = match &cli.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };

    let dialog_cap = match (cli.dialog_cap, file_config.capture_limit) {
        (0, 0) => usize::MAX,
        (0, from_file) => from_file,
        (from_cli, _) => from_cli,
    };
    let memory_limit = cli.memory_limit.unwrap_or(file_config.capture_storage);

    let mut match_opts = StorageMatchOpts::new(dialog_cap);
    match_opts.invite_only = cli.invite_only || file_config.storage_filter_methods.as_deref() == Some("invite-only");
    if let Some(pattern) = &cli.match_expression {
        match_opts.mexpr = Some(regex::Regex::new(pattern).map_err(|e| ConfigError::InvalidValue {
            option: "match-expression".to_string(),
            value: e.to_string(),
        })?);
    }

    let capture_opts = StorageCaptureOpts {
        store_rtp: cli.rtp || file_config.capture_rtp,
        memory_limit,
    };

    let mut storage = Storage::new(match_opts, capture_opts, SortOpts::default());
    let chain_config = ChainConfig {
        hep_auth_password: file_config.hep_listen.get("password").cloned(),
        tls_private_key_pem: None,
    };
    let mut chain = Chain::new(chain_config);

    if let Some(path) = &cli.input {
        let mut source = PcapFileSource::open(path)?;
        pump(&mut source, &mut chain, &mut storage).await?;
    } else if let Some(addr) = cli.hep_listen {
        let mut source = HepUdpSource::bind(addr).await?;
        pump(&mut source, &mut chain, &mut storage).await?;
    } else if let Some(device) = &cli.device {
        let mut source = LiveDeviceSource::new(device.clone());
        pump(&mut source, &mut chain, &mut storage).await?;
    } else {
        return Err(ConfigError::MissingRequired("one of --input, --hep-listen, --device").into());
    }

    print_summary(&mut storage);
    Ok(())
}

/// Drain `source` into `storage` through `chain` until clean EOF.
async fn pump(source: &mut impl Source, chain: &mut Chain, storage: &mut Storage) -> Result<()> {
    let link_offset = source.link_type().ip_header_offset();
    loop {
        let Some(frame) = source.next_frame().await? else {
            return Ok(());
        };
        let now = frame.ts_micros;
        chain.sweep_idle_flows(now);

        if frame.bytes.len() <= link_offset {
            continue;
        }
        let ip_bytes = frame.bytes[link_offset..].to_vec();
        let packet_template = Packet::new(frame);
        for packet in chain.run(&packet_template, &ip_bytes, now) {
            storage.ingest(&packet);
        }
    }
}

fn print_summary(storage: &mut Storage) {
    let attributes = builtin_attributes();
    let snapshot = storage.snapshot(&DisplayFilters::default());
    for call in snapshot.calls() {
        let fields: Vec<String> = ["callid", "sipfrom", "sipto", "method", "callstate", "msgcnt"]
            .iter()
            .filter_map(|name| attributes.iter().find(|a| a.name == *name))
            .map(|a| a.value(call, call.messages.first()))
            .collect();
        println!("{}", fields.join(" | "));
    }
    let stats = snapshot.stats;
    tracing::info!(total = stats.total, displayed = stats.displayed, memory_bytes = stats.memory_bytes, "capture finished");
}
