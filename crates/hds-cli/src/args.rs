use std::path::PathBuf;

use clap::Parser;

/// Downloads and demuxes an Adobe HTTP Dynamic Streaming (HDS) manifest,
/// printing one line per delivered packet.
#[derive(Debug, Parser)]
#[command(name = "hds-dump", version, about)]
pub struct Args {
    /// URL of the `manifest.f4m` to open.
    pub manifest_url: String,

    /// Write each packet's raw payload to this file instead of only logging it.
    #[arg(long)]
    pub output: Option<PathBuf>,

    /// Stop after this many packets (useful against live manifests, which
    /// never end on their own).
    #[arg(long)]
    pub max_packets: Option<u64>,

    /// Seek to this timestamp (milliseconds) immediately after opening.
    #[arg(long)]
    pub seek_ms: Option<i64>,

    /// Local address to serve Prometheus-format metrics on, e.g. `127.0.0.1:9090`.
    #[cfg(feature = "metrics-http")]
    #[arg(long)]
    pub metrics_addr: Option<std::net::SocketAddr>,

    /// Log filter, in `tracing-subscriber`'s `EnvFilter` syntax.
    #[arg(long, default_value = "hds_cli=info,hds_demux=info,hds_manifest=info")]
    pub log_filter: String,
}
