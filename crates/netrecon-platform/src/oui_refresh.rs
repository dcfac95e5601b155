//! On-disk half of the OUI Resolver (C3): deciding when the local IEEE OUI
//! database file is stale and fetching a fresh copy. The in-memory map and
//! `lookup()` live in `netrecon-scanner`; this module only owns the file.

use std::path::Path;
use std::time::{Duration, SystemTime};

use netrecon_models::error::{CoreError, Result};

/// True if `path` is missing or older than `max_age`.
pub fn needs_refresh(path: &Path, max_age: Duration) -> bool {
    let metadata = match std::fs::metadata(path) {
        Ok(m) => m,
        Err(_) => return true,
    };
    let modified = match metadata.modified() {
        Ok(m) => m,
        Err(_) => return true,
    };
    match SystemTime::now().duration_since(modified) {
        Ok(age) => age > max_age,
        Err(_) => false,
    }
}

/// Fetch the OUI database text from `url` and write it to `path`, via a
/// temp-file-then-rename so a concurrent reader never sees a partial file.
/// Best-effort: callers must not let a failure here block startup, only log
/// it (§4.3).
pub async fn refresh_oui_database(path: &Path, url: &str) -> Result<()> {
    let body = reqwest::get(url)
        .await
        .map_err(|e| CoreError::NetworkIo(e.to_string()))?
        .text()
        .await
        .map_err(|e| CoreError::NetworkIo(e.to_string()))?;

    let tmp_path = path.with_extension("tmp");
    tokio::fs::write(&tmp_path, &body).await?;
    tokio::fs::rename(&tmp_path, path).await?;
    tracing::info!(path = %path.display(), bytes = body.len(), "refreshed OUI database");
    Ok(())
}
