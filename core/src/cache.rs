//! The intermediate decode cache interface (§6, "Persisted intermediate
//! cache"). An on-disk format is out of scope; this module defines the
//! trait and ships a no-op implementation.

use crate::error::Result;

/// A versioned, per-replay cache of decoded records, keyed by a hash of
/// the schema/enum/decoder/transformer source so that a code change
/// invalidates stale entries (`CacheValidation`).
pub trait ReplayCache {
    /// Reads a cached blob for `replay_id`/`aspect`, if present and valid
    /// under `source_hash`. A cache miss is `Ok(None)`, never an error;
    /// read failures that should fall back to fresh processing are
    /// reported via [`crate::error::Error::CacheRead`].
    fn read(&self, replay_id: &str, aspect: &str, source_hash: u64) -> Result<Option<Vec<u8>>>;

    /// Writes a cache entry for `replay_id`/`aspect`. Failure is
    /// recoverable: callers log and continue without caching
    /// ([`crate::error::Error::CacheWrite`]).
    fn write(&self, replay_id: &str, aspect: &str, source_hash: u64, bytes: &[u8]) -> Result<()>;
}

/// A cache that never stores anything: every read is a miss, every write
/// is a silent no-op. The default for this crate, since a concrete
/// on-disk format is not part of this implementation's scope.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopReplayCache;

impl ReplayCache for NoopReplayCache {
    fn read(&self, _replay_id: &str, _aspect: &str, _source_hash: u64) -> Result<Option<Vec<u8>>> {
        Ok(None)
    }

    fn write(&self, _replay_id: &str, _aspect: &str, _source_hash: u64, _bytes: &[u8]) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn noop_cache_always_misses() {
        let cache = NoopReplayCache;
        assert!(cache.read("r1", "team_stats", 0).unwrap().is_none());
        assert!(cache.write("r1", "team_stats", 0, b"data").is_ok());
    }
}
