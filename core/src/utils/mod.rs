use std::io;
use std::path::Path;
use std::time::SystemTime;

use percent_encoding::percent_decode_str;
use url::Url;

use crate::ArchiveConfig;

/// Creates the downloads root plus its `reports/` and `attachments/` children.
pub async fn ensure_directories(config: &ArchiveConfig) -> io::Result<()> {
    for dir in [
        config.downloads_dir.clone(),
        config.reports_dir(),
        config.attachments_dir(),
    ] {
        tokio::fs::create_dir_all(&dir).await?;
    }
    Ok(())
}

/// Derives the attachment cache key from the last path segment of `url`.
///
/// Query string and fragment are ignored, so re-signed expiring URLs for the
/// same file share one cache entry. URLs without a usable segment fall back
/// to a name derived from the whole URL.
pub fn cache_filename(url: &str) -> String {
    let segment = match Url::parse(url) {
        Ok(parsed) => parsed
            .path_segments()
            .and_then(|mut segments| segments.next_back().map(str::to_string)),
        Err(_) => url
            .split(['?', '#'])
            .next()
            .and_then(|path| path.rsplit('/').next())
            .map(str::to_string),
    };

    let decoded = segment
        .map(|s| percent_decode_str(&s).decode_utf8_lossy().into_owned())
        .map(|s| sanitize_filename(&s))
        .unwrap_or_default();

    if decoded.is_empty() || decoded == "." || decoded == ".." {
        format!("attachment-{:016x}", fnv1a(url.as_bytes()))
    } else {
        decoded
    }
}

fn sanitize_filename(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            '/' | '\\' | '\0' => '_',
            c => c,
        })
        .collect::<String>()
        .trim()
        .to_string()
}

fn fnv1a(bytes: &[u8]) -> u64 {
    let mut hash: u64 = 0xcbf29ce484222325;
    for b in bytes {
        hash ^= u64::from(*b);
        hash = hash.wrapping_mul(0x100000001b3);
    }
    hash
}

/// Decodes bytes as UTF-8, replacing invalid sequences instead of failing.
pub fn decode_lossy(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}

/// Milliseconds since the Unix epoch, used as a cache-busting query value.
pub fn unix_millis() -> u128 {
    SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis()
}

/// Writes `contents` to `path` through a sibling `.tmp` file and a rename,
/// so readers never observe a partially written file.
pub async fn write_atomic(path: &Path, contents: &str) -> io::Result<()> {
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    tokio::fs::write(&tmp, contents).await?;
    tokio::fs::rename(&tmp, path).await
}
