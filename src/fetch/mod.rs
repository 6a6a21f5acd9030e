//! Acquisition of weekly turnstile files over HTTP.
//!
//! Files land in a local data directory that the readers in
//! [`parser`](crate::parser) consume. Weeks already on disk are skipped.

mod basic;
mod client;
pub mod weeks;

pub use basic::BasicClient;
pub use client::HttpClient;

use anyhow::{Context, Result, anyhow};
use chrono::NaiveDate;
use std::path::Path;
use tracing::{info, warn};

use crate::parser::{week_file_name, week_path};

pub async fn fetch_bytes<C: HttpClient>(client: &C, url: &str) -> Result<Vec<u8>> {
    let req = reqwest::Request::new(reqwest::Method::GET, url.parse()?);

    let resp = client.execute(req).await?;
    if !resp.status().is_success() {
        return Err(anyhow!("GET {} returned {}", url, resp.status()));
    }
    Ok(resp.bytes().await?.to_vec())
}

/// Outcome of a download pass.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DownloadSummary {
    pub downloaded: usize,
    pub skipped: usize,
    /// Weeks the server did not deliver; no file is written for them.
    pub failed: usize,
}

/// Downloads every week in `saturdays` that is not yet in `data_dir`.
///
/// A week that fails to download is logged and counted, and the pass moves
/// on; the newest week is often not published yet.
#[tracing::instrument(skip(client, saturdays), fields(weeks = saturdays.len()))]
pub async fn download_weeks<C: HttpClient>(
    client: &C,
    base_url: &str,
    data_dir: &Path,
    saturdays: &[NaiveDate],
) -> Result<DownloadSummary> {
    std::fs::create_dir_all(data_dir)
        .with_context(|| format!("creating {}", data_dir.display()))?;

    let mut summary = DownloadSummary::default();

    for saturday in saturdays {
        let path = week_path(data_dir, *saturday);
        if path.exists() {
            summary.skipped += 1;
            continue;
        }

        let name = week_file_name(*saturday);
        let url = format!("{}/{}", base_url.trim_end_matches('/'), name);
        info!(file = %name, "Downloading");

        let fetch_start = std::time::Instant::now();
        let bytes = match fetch_bytes(client, &url).await {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(file = %name, error = %e, "Download failed, skipping week");
                summary.failed += 1;
                continue;
            }
        };
        let elapsed = fetch_start.elapsed();
        if elapsed.as_secs() > 15 {
            warn!(elapsed_secs = elapsed.as_secs(), file = %name, "Download was slow");
        }

        std::fs::write(&path, &bytes).with_context(|| format!("writing {}", path.display()))?;
        summary.downloaded += 1;
    }

    info!(
        downloaded = summary.downloaded,
        skipped = summary.skipped,
        failed = summary.failed,
        "Download pass complete"
    );
    Ok(summary)
}
