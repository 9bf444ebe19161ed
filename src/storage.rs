use crate::error::FetchError;
use std::path::Path;

/// Writes a raw report body, pretty-printed, to `path`.
///
/// Every successful fetch writes to the same path without coordination, so
/// the file ends up holding whichever response was written last. Callers that
/// need every response must pass distinct paths.
pub async fn store_raw_response(path: &Path, body: &serde_json::Value) -> Result<(), FetchError> {
    let write_error = |source| FetchError::Write {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent).await.map_err(write_error)?;
        }
    }

    let content = serde_json::to_string_pretty(body)?;
    tokio::fs::write(path, content).await.map_err(write_error)
}
