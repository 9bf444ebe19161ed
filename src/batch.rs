use crate::error::FetchError;
use crate::network::ReportSource;
use crate::options::Cli;
use crate::progress::Progress;
use crate::report::{Failure, Outcome, PageSpeedResponse, Report, ScoreRecord};
use crate::storage::store_raw_response;
use crate::utils;
use console::style;
use futures::StreamExt;
use futures::stream::FuturesUnordered;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinError;
use tokio::time::Instant;

/// What the dispatcher observes for one scheduled fetch. `Err` means the task
/// itself died; fetch errors are already an [`Outcome::Failure`].
pub type Settlement = Result<Outcome, JoinError>;

/// Keeps the entries that are absolute `http://` or `https://` URLs, in order.
pub fn validate_urls(urls: &[String]) -> Vec<String> {
    urls.iter()
        .filter(|url| url.starts_with("http://") || url.starts_with("https://"))
        .cloned()
        .collect()
}

/// Fetches and normalizes the report for one URL.
///
/// Never fails: errors are logged with the URL and returned as
/// [`Outcome::Failure`]. Progress advances only once a record was extracted.
pub async fn fetch_report<S: ReportSource>(
    source: &S,
    url: &str,
    response_path: &Path,
    progress: &Progress,
) -> Outcome {
    match try_fetch_report(source, url, response_path, progress).await {
        Ok(record) => Outcome::Success(record),
        Err(error) => {
            progress.suspend(|| {
                eprintln!(
                    "{} Error fetching Lighthouse report for {}: {}",
                    style("[ERROR]").red(),
                    url,
                    error
                )
            });
            Outcome::Failure(Failure {
                url: url.to_string(),
                error: error.to_string(),
            })
        }
    }
}

async fn try_fetch_report<S: ReportSource>(
    source: &S,
    url: &str,
    response_path: &Path,
    progress: &Progress,
) -> Result<ScoreRecord, FetchError> {
    let body = source.fetch(url).await?;
    let raw: serde_json::Value = serde_json::from_str(&body)?;
    let response = PageSpeedResponse::deserialize(&raw)?;
    let record = ScoreRecord::from_response(url, &response)?;

    progress.inc();
    store_raw_response(response_path, &raw).await?;
    Ok(record)
}

/// Runs [`fetch_report`] for every URL with at most `limit` fetches in flight.
///
/// Waits for every task, whatever its result, and returns the settlements in
/// the order the tasks finished.
pub async fn dispatch<S: ReportSource + 'static>(
    urls: Vec<String>,
    source: Arc<S>,
    limit: usize,
    response_path: PathBuf,
    progress: Progress,
) -> Vec<Settlement> {
    let semaphore = Arc::new(Semaphore::new(limit.max(1)));
    let response_path = Arc::new(response_path);

    let mut tasks: FuturesUnordered<_> = urls
        .into_iter()
        .map(|url| {
            let semaphore = Arc::clone(&semaphore);
            let source = Arc::clone(&source);
            let response_path = Arc::clone(&response_path);
            let progress = progress.clone();

            tokio::spawn(async move {
                let Ok(_permit) = semaphore.acquire().await else {
                    return Outcome::Failure(Failure {
                        url,
                        error: FetchError::LimiterClosed.to_string(),
                    });
                };
                fetch_report(source.as_ref(), &url, &response_path, &progress).await
            })
        })
        .collect();

    let mut settlements = Vec::with_capacity(tasks.len());
    while let Some(settlement) = tasks.next().await {
        settlements.push(settlement);
    }
    settlements
}

/// Validates `urls`, fetches a report for each valid one and writes the
/// successful records to `options.report_path`.
///
/// The aggregate file write is best effort: a failure is logged and the
/// report is returned regardless.
pub async fn fetch_lighthouse_reports<S: ReportSource + 'static>(
    urls: Vec<String>,
    source: Arc<S>,
    options: &Cli,
) -> Report {
    let start_time = Instant::now();
    let quiet = options.json;

    let valid_urls = validate_urls(&urls);
    let mut report = Report::new(urls.len(), valid_urls.len(), options.concurrency_limit);

    if !quiet {
        println!(
            "{} 🔎 {} of {} URLs are valid, fetching reports...",
            style("[1/2]").dim(),
            valid_urls.len(),
            urls.len()
        );
    }

    let progress = Progress::new(valid_urls.len() as u64, quiet);
    let settlements = dispatch(
        valid_urls,
        source,
        options.concurrency_limit as usize,
        options.response_path.clone(),
        progress.clone(),
    )
    .await;
    progress.finish();

    for settlement in settlements {
        match settlement {
            Ok(outcome) => report.push(outcome),
            Err(e) => {
                eprintln!("{} A fetch task did not complete: {}", style("[ERROR]").red(), e);
                report.rejected += 1;
            }
        }
    }

    report.total_time = start_time.elapsed();

    // With --json, stdout carries only the aggregate; status lines go to stderr.
    let elapsed = format!("Total time taken: {}", utils::ms(report.total_time));
    if quiet {
        eprintln!("{elapsed}");
    } else {
        println!("{elapsed}");
        println!("{} 💾 Write reports...", style("[2/2]").dim());
    }

    if let Err(e) = report.write_json_report(&options.report_path, quiet) {
        eprintln!(
            "{} Error writing to {}: {}",
            style("[ERROR]").red(),
            options.report_path.display(),
            e
        );
    }

    report
}
