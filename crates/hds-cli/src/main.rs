//! Command-line driver for [`hds_demux::Demuxer`]: opens an HDS manifest,
//! reads packets until end-of-stream or a signal, and reports what it saw.

mod args;
#[cfg(feature = "metrics-http")]
mod metrics_http;

use std::io::Write;

use clap::Parser;
use hds_demux::Demuxer;
use scuffle_signal::{SignalHandler, SignalKind};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use crate::args::Args;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(EnvFilter::try_new(&args.log_filter).unwrap_or_else(|_| EnvFilter::new("info")))
        .try_init()
        .ok();

    #[cfg(feature = "metrics-http")]
    if let Some(addr) = args.metrics_addr {
        metrics_http::init(addr)?;
    }

    let client = reqwest::Client::builder().cookie_store(true).build()?;

    tracing::info!(url = %args.manifest_url, "opening manifest");
    let mut demuxer = Demuxer::open(client, &args.manifest_url).await?;
    demuxer.enable_all_streams();
    tracing::info!(duration_ms = demuxer.duration(), programs = demuxer.programs().len(), "manifest opened");

    if let Some(seek_ms) = args.seek_ms {
        demuxer.seek(seek_ms, hds_demux::SeekFlags::empty())?;
    }

    let mut output = match &args.output {
        Some(path) => Some(std::fs::File::create(path)?),
        None => None,
    };

    let mut signals = SignalHandler::new()
        .with_signal(SignalKind::Interrupt)
        .with_signal(SignalKind::Terminate);

    let mut packet_count: u64 = 0;
    let result = loop {
        if let Some(max) = args.max_packets {
            if packet_count >= max {
                break Ok(());
            }
        }

        tokio::select! {
            biased;

            signal = signals.recv() => {
                tracing::info!(?signal, "received shutdown signal, closing demuxer");
                break Ok(());
            }
            packet = demuxer.read_packet() => {
                match packet {
                    Ok(packet) => {
                        packet_count += 1;
                        tracing::debug!(
                            stream_id = packet.stream_id,
                            dts = packet.dts,
                            pts = packet.pts,
                            size = packet.data.len(),
                            keyframe = packet.keyframe,
                            "packet"
                        );
                        if let Some(file) = &mut output {
                            file.write_all(&packet.data)?;
                        }
                    }
                    Err(err) => break Err(err),
                }
            }
        }
    };

    demuxer.close().await;

    match result {
        Ok(()) => {
            tracing::info!(packet_count, "done");
            Ok(())
        }
        Err(hds_demux::DemuxError::EndOfStream) => {
            tracing::info!(packet_count, "reached end of stream");
            Ok(())
        }
        Err(err) => Err(err.into()),
    }
}
