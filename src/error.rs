use std::path::PathBuf;

/// Everything that can go wrong while fetching and normalizing a single report.
///
/// These never escape the per-URL fetcher: they are logged together with the
/// URL and turned into an [`Outcome::Failure`](crate::report::Outcome).
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("response is not valid JSON: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Lighthouse report is missing necessary data")]
    MalformedResponse,

    #[error("Lighthouse report has no category `{0}`")]
    MissingCategory(&'static str),

    #[error("failed to write {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("concurrency limiter was closed before the request could start")]
    LimiterClosed,
}
