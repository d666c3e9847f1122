//! The same-content predicate and JSON canonicalization.

use std::path::Path;
use std::time::Duration;

use chrono::{DateTime, Utc};
use md5::{Digest, Md5};
use serde_json::Value;

use crate::error::{io_err, SyncError};

/// Local mtimes this far behind the remote update time still count as current.
pub const MTIME_SLACK: Duration = Duration::from_secs(5 * 60);

pub fn md5_hex(bytes: &[u8]) -> String {
    let mut h = Md5::new();
    h.update(bytes);
    hex::encode(h.finalize())
}

/// Byte length of `bytes` re-encoded as compact JSON with `/` escaped as
/// `\/`, which is how the remote measures JSON assets. `None` if not JSON.
pub fn remote_json_size(bytes: &[u8]) -> Option<u64> {
    let value: Value = serde_json::from_slice(bytes).ok()?;
    let compact = value.to_string();
    let slashes = compact.bytes().filter(|b| *b == b'/').count();
    Some((compact.len() + slashes) as u64)
}

/// Stable pretty-printed form with sorted keys. `None` if not JSON.
pub fn canonical_json(bytes: &[u8]) -> Option<Vec<u8>> {
    let value: Value = serde_json::from_slice(bytes).ok()?;
    let mut out = serde_json::to_vec_pretty(&value).ok()?;
    out.push(b'\n');
    Some(out)
}

/// Whether the file at `path` already reflects a remote asset.
///
/// True when `checksum` equals the local MD5. Otherwise the sizes must agree
/// (JSON files are measured in their remote encoding) and, when the remote
/// reports an update time, the local mtime plus [`MTIME_SLACK`] must not be
/// older than it. A missing file is never the same.
pub fn is_asset_same(
    path: &Path,
    checksum: Option<&str>,
    updated_at: Option<DateTime<Utc>>,
    size: Option<u64>,
) -> Result<bool, SyncError> {
    let bytes = match std::fs::read(path) {
        Ok(bytes) => bytes,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(false),
        Err(err) => return Err(io_err(path, err)),
    };

    if checksum.is_some_and(|sum| sum.eq_ignore_ascii_case(&md5_hex(&bytes))) {
        return Ok(true);
    }

    let local_size = if path.extension().is_some_and(|ext| ext == "json") {
        remote_json_size(&bytes).unwrap_or(bytes.len() as u64)
    } else {
        bytes.len() as u64
    };
    if size != Some(local_size) {
        return Ok(false);
    }

    let Some(updated_at) = updated_at else {
        return Ok(true);
    };
    let modified = std::fs::metadata(path)
        .and_then(|m| m.modified())
        .map_err(|e| io_err(path, e))?;
    let modified: DateTime<Utc> = (modified + MTIME_SLACK).into();
    Ok(modified >= updated_at)
}
