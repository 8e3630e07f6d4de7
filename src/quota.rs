//! Reserved management paths and the `count=N,bytes=M` quota blobs stored under them.
//!
//! A path `P` is a *quota subject* when `/zookeeper/quota/P/zookeeper_limits` exists. The limit
//! node's data holds the configured ceilings; the sibling `zookeeper_stats` node holds the current
//! counters for the subtree rooted at `P`. Both blobs share the [`StatsTrack`] text format, and a
//! field value of `-1` means "unlimited".

use failure::bail;
use std::fmt;
use std::str::FromStr;

/// The znode that acts as the management and status root.
pub const PROC_ZOOKEEPER: &str = "/zookeeper";

/// The znode under which every quota subject is mirrored.
pub const QUOTA_ZOOKEEPER: &str = "/zookeeper/quota";

/// The znode holding the replicated configuration.
pub const CONFIG_ZOOKEEPER: &str = "/zookeeper/config";

/// Child name of the node carrying a quota subject's configured limits.
pub const LIMIT_NODE: &str = "zookeeper_limits";

/// Child name of the node carrying a quota subject's current counters.
pub const STAT_NODE: &str = "zookeeper_stats";

/// The full path of the limit node for the quota subject `path`.
pub fn quota_path(path: &str) -> String {
    format!("{}{}/{}", QUOTA_ZOOKEEPER, path, LIMIT_NODE)
}

/// The full path of the stats node for the quota subject `path`.
pub fn stat_path(path: &str) -> String {
    format!("{}{}/{}", QUOTA_ZOOKEEPER, path, STAT_NODE)
}

/// A parsed `count=N,bytes=M` quota blob.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct StatsTrack {
    /// Number of znodes in the governed subtree, or the configured ceiling.
    pub count: i64,
    /// Total data bytes in the governed subtree, or the configured ceiling.
    pub bytes: i64,
}

impl StatsTrack {
    /// A blob with both fields set to `count` and `bytes`.
    pub fn new(count: i64, bytes: i64) -> StatsTrack {
        StatsTrack { count, bytes }
    }
}

impl FromStr for StatsTrack {
    type Err = failure::Error;

    fn from_str(s: &str) -> Result<StatsTrack, failure::Error> {
        let mut fields = s.split(',');
        let track = match (fields.next(), fields.next(), fields.next()) {
            (Some(count), Some(bytes), None) => StatsTrack {
                count: parse_field(count, "count")?,
                bytes: parse_field(bytes, "bytes")?,
            },
            _ => bail!("invalid quota blob {:?}", s),
        };
        Ok(track)
    }
}

fn parse_field(field: &str, name: &str) -> Result<i64, failure::Error> {
    match field.split('=').nth(1) {
        Some(v) => Ok(v.parse()?),
        None => bail!("missing {} field in quota blob {:?}", name, field),
    }
}

impl fmt::Display for StatsTrack {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "count={},bytes={}", self.count, self.bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_text() {
        let track = StatsTrack::new(2, -1);
        assert_eq!(track.to_string(), "count=2,bytes=-1");
        assert_eq!(track.to_string().parse::<StatsTrack>().unwrap(), track);
    }

    #[test]
    fn rejects_malformed_blobs() {
        assert!("".parse::<StatsTrack>().is_err());
        assert!("count=1".parse::<StatsTrack>().is_err());
        assert!("count=1,bytes=2,extra=3".parse::<StatsTrack>().is_err());
        assert!("count=x,bytes=2".parse::<StatsTrack>().is_err());
    }

    #[test]
    fn mirror_paths() {
        assert_eq!(quota_path("/foo"), "/zookeeper/quota/foo/zookeeper_limits");
        assert_eq!(stat_path("/foo"), "/zookeeper/quota/foo/zookeeper_stats");
    }
}
