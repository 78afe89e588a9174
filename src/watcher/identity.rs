//! File identity and read position tracking.
//!
//! A game log is rewritten wholesale on every launch, so the tailer has to
//! tell "the same file grew" apart from "a different file now lives at this
//! path". Identity combines the device/inode pair (Unix), the creation time
//! when the platform reports one, and a fingerprint of the file's leading
//! bytes.

use std::fs::Metadata;
use std::time::SystemTime;

/// Default number of leading bytes captured as the content fingerprint.
pub const DEFAULT_FINGERPRINT_BYTES: usize = 256;

/// Identity of a file on disk, independent of its size.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileIdentity {
    device: Option<u64>,
    inode: Option<u64>,
    created: Option<SystemTime>,
    prefix: Vec<u8>,
}

impl FileIdentity {
    /// Build an identity from file metadata and the file's leading bytes.
    #[must_use]
    pub fn from_metadata(metadata: &Metadata, prefix: Vec<u8>) -> Self {
        let (device, inode) = node_id(metadata);
        Self {
            device,
            inode,
            created: metadata.created().ok(),
            prefix,
        }
    }

    /// Build an identity from a content fingerprint alone.
    #[must_use]
    pub fn from_prefix(prefix: impl Into<Vec<u8>>) -> Self {
        Self {
            device: None,
            inode: None,
            created: None,
            prefix: prefix.into(),
        }
    }

    /// Attach a device/inode pair.
    #[must_use]
    pub fn with_node(mut self, device: u64, inode: u64) -> Self {
        self.device = Some(device);
        self.inode = Some(inode);
        self
    }

    /// Attach a creation time.
    #[must_use]
    pub fn with_created(mut self, created: SystemTime) -> Self {
        self.created = Some(created);
        self
    }

    /// Leading bytes captured for this file.
    #[must_use]
    pub fn prefix(&self) -> &[u8] {
        &self.prefix
    }

    /// Whether `other` describes the same underlying file.
    ///
    /// Each component is only compared when both sides report it. The
    /// fingerprints are compared over their common length, so a file that
    /// merely grew past the captured prefix still matches.
    #[must_use]
    pub fn matches(&self, other: &Self) -> bool {
        if let (Some(a), Some(b)) = (self.device, other.device) {
            if a != b {
                return false;
            }
        }
        if let (Some(a), Some(b)) = (self.inode, other.inode) {
            if a != b {
                return false;
            }
        }
        if let (Some(a), Some(b)) = (self.created, other.created) {
            if a != b {
                return false;
            }
        }
        let common = self.prefix.len().min(other.prefix.len());
        self.prefix[..common] == other.prefix[..common]
    }
}

#[cfg(unix)]
fn node_id(metadata: &Metadata) -> (Option<u64>, Option<u64>) {
    use std::os::unix::fs::MetadataExt;
    (Some(metadata.dev()), Some(metadata.ino()))
}

#[cfg(not(unix))]
fn node_id(_metadata: &Metadata) -> (Option<u64>, Option<u64>) {
    (None, None)
}

/// Identity of the tailed file plus the byte offset read so far.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogPosition {
    identity: FileIdentity,
    offset: u64,
}

impl LogPosition {
    /// Create a position for `identity` at `offset`.
    #[must_use]
    pub fn new(identity: FileIdentity, offset: u64) -> Self {
        Self { identity, offset }
    }

    #[must_use]
    pub fn identity(&self) -> &FileIdentity {
        &self.identity
    }

    #[must_use]
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Advance the offset by `consumed` bytes.
    pub fn advance(&mut self, consumed: u64) {
        self.offset = self.offset.saturating_add(consumed);
    }

    /// Adopt a new file identity, starting over at offset 0.
    pub fn rebase(&mut self, identity: FileIdentity) {
        self.identity = identity;
        self.offset = 0;
    }

    /// Replace the identity of the same file, keeping the offset.
    ///
    /// Used to extend the fingerprint once the file has grown past the
    /// previously captured prefix.
    pub fn refresh(&mut self, identity: FileIdentity) {
        self.identity = identity;
    }
}
