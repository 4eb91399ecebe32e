//! Object naming and the public references derived from it.

use std::fmt;
use std::sync::atomic::{AtomicI64, Ordering};

use crate::media::MediaHandle;

static LAST_STAMP: AtomicI64 = AtomicI64::new(0);

/// Millisecond wall-clock stamp that never repeats or goes backwards within the process.
fn monotonic_millis() -> i64 {
    let now = chrono::Utc::now().timestamp_millis();
    let mut last = LAST_STAMP.load(Ordering::Relaxed);
    loop {
        let next = if now > last { now } else { last + 1 };
        match LAST_STAMP.compare_exchange_weak(last, next, Ordering::AcqRel, Ordering::Relaxed) {
            Ok(_) => return next,
            Err(observed) => last = observed,
        }
    }
}

/// Key of an uploaded asset: `<prefix>_<monotonic-timestamp>.<ext>`.
///
/// A name is generated once per capture and reused by every ladder step and every
/// retry for that capture, so fallbacks overwrite instead of accumulating orphans.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StoredObjectName(String);

impl StoredObjectName {
    pub fn generate(prefix: &str, extension: &str) -> Self {
        Self(format!("{}_{}.{}", prefix, monotonic_millis(), extension))
    }

    /// Name for a fresh capture, taking the extension from the handle.
    pub fn for_handle(handle: &MediaHandle, prefix: &str, default_extension: &str) -> Self {
        let extension = handle
            .extension()
            .unwrap_or_else(|| default_extension.to_string());
        Self::generate(prefix, &extension)
    }

    /// Wraps a name known to exist in the store already.
    pub fn from_existing(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StoredObjectName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Durable public URL of an uploaded object.
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct RemoteImageReference(String);

impl RemoteImageReference {
    pub fn new(url: impl Into<String>) -> Self {
        Self(url.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RemoteImageReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
