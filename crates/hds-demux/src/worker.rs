//! The background download worker: one per [`crate::media::Media`], driven
//! entirely by its [`DownloadSlot`].
//!
//! Mirrors the teacher's preference for a plain loop over a state machine:
//! wait for a request, snapshot the target under the mutex, fetch with
//! retries, publish, repeat. There is no shared scheduler; every media owns
//! its worker for its whole lifetime.

use std::time::Duration;

use bytes::Bytes;
use reqwest::Client;
use tokio::sync::mpsc;

use crate::slot::DownloadSlot;
use std::sync::Arc;

/// Number of retry attempts before a fragment fetch gives up (§4.6).
const MAX_RETRIES: u32 = 15;
/// Delay between a failed attempt and the next retry, and between retry
/// polls for an abort request.
const RETRY_DELAY: Duration = Duration::from_secs(1);

/// Runs until the slot's `run` flag is cleared via [`DownloadSlot::stop`].
pub(crate) async fn run(client: Client, slot: Arc<DownloadSlot>, mut requests: mpsc::Receiver<()>) {
    while requests.recv().await.is_some() {
        let (run, target, cookies) = slot.snapshot_for_worker().await;
        if !run {
            slot.notify_caller();
            return;
        }
        let Some(url) = target else {
            slot.notify_caller();
            continue;
        };

        let outcome = fetch_with_retries(&client, &url, &cookies, &slot).await;
        slot.publish_result(outcome).await;
        slot.notify_caller();
    }
}

async fn fetch_with_retries(
    client: &Client,
    url: &str,
    cookies: &str,
    slot: &DownloadSlot,
) -> Option<(Bytes, String)> {
    for attempt in 0..MAX_RETRIES {
        if slot.is_aborted().await {
            crate::metrics::hds_demux::download_aborted().incr();
            return None;
        }
        crate::metrics::hds_demux::download_attempt().incr();
        match fetch_once(client, url, cookies).await {
            Ok(result) => {
                crate::metrics::hds_demux::download_success().incr();
                return Some(result);
            }
            Err(err) => {
                crate::metrics::hds_demux::download_attempt_failure().incr();
                tracing::warn!(url, attempt, error = %err, "fragment download attempt failed");
            }
        }
        tokio::time::sleep(RETRY_DELAY).await;
        if slot.is_aborted().await {
            crate::metrics::hds_demux::download_aborted().incr();
            return None;
        }
    }
    tracing::error!(url, "fragment download exhausted all retries");
    None
}

async fn fetch_once(client: &Client, url: &str, cookies: &str) -> Result<(Bytes, String), reqwest::Error> {
    let mut request = client.get(url);
    if !cookies.is_empty() {
        request = request.header(reqwest::header::COOKIE, cookies);
    }
    let response = request.send().await?.error_for_status()?;

    let set_cookies = response
        .headers()
        .get_all(reqwest::header::SET_COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .collect::<Vec<_>>()
        .join("; ");

    let body = response.bytes().await?;
    Ok((body, set_cookies))
}
