//! Incremental log file tailer.
//!
//! Reads complete lines appended to a log file since the last poll,
//! surviving truncation and wholesale replacement of the file.

use std::io::SeekFrom;
use std::path::{Path, PathBuf};

use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncSeekExt};

use super::error::WatcherError;
use super::identity::{FileIdentity, LogPosition, DEFAULT_FINGERPRINT_BYTES};

/// Default cap on bytes consumed by a single poll.
pub const DEFAULT_MAX_READ_BYTES: u64 = 8 * 1024 * 1024;

/// How far back `open` looks for the start of an unterminated final line.
const TAIL_SCAN_BYTES: u64 = 64 * 1024;

/// A complete line read from the log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawLine {
    /// Line content without the terminator.
    pub text: String,
    /// Byte offset of the first byte of the line in the current file.
    pub source_offset: u64,
}

impl RawLine {
    #[must_use]
    pub fn new(text: impl Into<String>, source_offset: u64) -> Self {
        Self {
            text: text.into(),
            source_offset,
        }
    }
}

/// Where a freshly opened tailer starts reading.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StartPosition {
    /// Only lines completed after `open` are emitted.
    #[default]
    End,
    /// Replay the whole file from offset 0.
    Beginning,
}

/// Tailer tuning.
#[derive(Debug, Clone)]
pub struct TailOptions {
    pub start: StartPosition,
    /// Leading bytes captured as the identity fingerprint.
    pub fingerprint_bytes: usize,
    /// Maximum bytes consumed per poll; the rest is left for the next one.
    pub max_read_bytes: u64,
}

impl Default for TailOptions {
    fn default() -> Self {
        Self {
            start: StartPosition::End,
            fingerprint_bytes: DEFAULT_FINGERPRINT_BYTES,
            max_read_bytes: DEFAULT_MAX_READ_BYTES,
        }
    }
}

impl TailOptions {
    /// Options that replay the file from the beginning.
    #[must_use]
    pub fn from_beginning() -> Self {
        Self {
            start: StartPosition::Beginning,
            ..Self::default()
        }
    }
}

/// Why the read position was reset to 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResetReason {
    /// A different file now lives at the path.
    Rotated,
    /// The file shrank below the read offset.
    Truncated,
    /// The file came back after being absent.
    Reappeared,
}

impl std::fmt::Display for ResetReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Rotated => write!(f, "rotated"),
            Self::Truncated => write!(f, "truncated"),
            Self::Reappeared => write!(f, "reappeared"),
        }
    }
}

/// Result of a single poll.
#[derive(Debug, Default)]
pub struct PollBatch {
    /// Complete lines, in file order.
    pub lines: Vec<RawLine>,
    /// Set when the read position was reset during this poll.
    pub reset: Option<ResetReason>,
    /// The file does not currently exist.
    pub missing: bool,
    /// Unread bytes remain because of the per-poll read cap.
    pub more_pending: bool,
}

/// Incremental reader over a growing log file.
///
/// The file is opened for the duration of each poll only, so the writer is
/// free to delete or replace it between polls.
#[derive(Debug)]
pub struct LogTailer {
    path: PathBuf,
    /// `None` while the file is absent.
    position: Option<LogPosition>,
    /// Bytes of an unterminated trailing line.
    pending: Vec<u8>,
    /// Drop bytes up to the next terminator before emitting lines.
    discard_fragment: bool,
    /// Reset applied to `position` but not yet handed to the caller, because
    /// the poll that found it failed before returning.
    unreported_reset: Option<ResetReason>,
    options: TailOptions,
}

impl LogTailer {
    /// Open a tailer on `path`.
    ///
    /// With [`StartPosition::End`] existing content is not replayed, except
    /// for an unterminated final line, which is emitted once completed.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` or `PermissionDenied` if the file cannot be opened,
    /// `NotAFile` for directories and other I/O errors as `Io`.
    pub async fn open(path: impl Into<PathBuf>, options: TailOptions) -> Result<Self, WatcherError> {
        let path = path.into();
        let mut file = File::open(&path)
            .await
            .map_err(|e| WatcherError::from_io(&path, e))?;
        let metadata = file
            .metadata()
            .await
            .map_err(|e| WatcherError::from_io(&path, e))?;
        if !metadata.is_file() {
            return Err(WatcherError::NotAFile(path));
        }

        let prefix = read_prefix(&mut file, options.fingerprint_bytes).await?;
        let identity = FileIdentity::from_metadata(&metadata, prefix);
        let (offset, discard_fragment) = match options.start {
            StartPosition::Beginning => (0, false),
            StartPosition::End => resume_point(&mut file, metadata.len()).await?,
        };

        tracing::debug!(
            path = %path.display(),
            offset,
            len = metadata.len(),
            "Opened log tailer"
        );

        Ok(Self {
            path,
            position: Some(LogPosition::new(identity, offset)),
            pending: Vec::new(),
            discard_fragment,
            unreported_reset: None,
            options,
        })
    }

    /// Get the path being tailed.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Current read position, `None` while the file is absent.
    #[must_use]
    pub fn position(&self) -> Option<&LogPosition> {
        self.position.as_ref()
    }

    /// Current byte offset, 0 while the file is absent.
    #[must_use]
    pub fn offset(&self) -> u64 {
        self.position.as_ref().map_or(0, LogPosition::offset)
    }

    /// Number of buffered bytes belonging to an incomplete line.
    #[must_use]
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Read complete lines appended since the last poll.
    ///
    /// A missing file yields an empty batch with `missing` set. A changed
    /// identity or a file shorter than the offset resets the position to 0
    /// and reads the new content from its start.
    ///
    /// # Errors
    ///
    /// Returns an error for transient stat/open/read failures, and the next
    /// poll retries from the same position. A reset found by a failed poll is
    /// reported by the next successful one.
    pub async fn poll(&mut self) -> Result<PollBatch, WatcherError> {
        let mut batch = PollBatch::default();

        let mut file = match File::open(&self.path).await {
            Ok(f) => f,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                if self.position.take().is_some() {
                    tracing::info!(
                        path = %self.path.display(),
                        "Log file disappeared, waiting for it to return"
                    );
                }
                self.pending.clear();
                self.discard_fragment = false;
                batch.missing = true;
                return Ok(batch);
            }
            Err(e) => return Err(WatcherError::from_io(&self.path, e)),
        };

        let metadata = file
            .metadata()
            .await
            .map_err(|e| WatcherError::from_io(&self.path, e))?;
        let len = metadata.len();
        let prefix = read_prefix(&mut file, self.options.fingerprint_bytes).await?;
        let current = FileIdentity::from_metadata(&metadata, prefix);

        let found = match &self.position {
            None => Some(ResetReason::Reappeared),
            Some(pos) if !pos.identity().matches(&current) => Some(ResetReason::Rotated),
            Some(pos) if len < pos.offset() => Some(ResetReason::Truncated),
            Some(_) => None,
        };

        if let Some(reason) = found {
            if reason == ResetReason::Reappeared {
                tracing::info!(
                    path = %self.path.display(),
                    len,
                    "Log file appeared, reading from start"
                );
            } else {
                tracing::warn!(
                    path = %self.path.display(),
                    old_offset = self.offset(),
                    new_len = len,
                    %reason,
                    "Log file reset, resuming from offset 0"
                );
            }
            self.mark_reset(reason, current);
        } else if let Some(pos) = self.position.as_mut() {
            if current.prefix().len() > pos.identity().prefix().len() {
                pos.refresh(current);
            }
        }

        let offset = self.offset();
        if len <= offset {
            batch.reset = self.unreported_reset.take();
            return Ok(batch);
        }

        let available = len - offset;
        let budget = available.min(self.options.max_read_bytes.max(1));
        file.seek(SeekFrom::Start(offset)).await?;
        let mut chunk = Vec::with_capacity(usize::try_from(budget).unwrap_or_default());
        (&mut file).take(budget).read_to_end(&mut chunk).await?;
        drop(file);

        if let Some(position) = self.position.as_mut() {
            position.advance(chunk.len() as u64);
        }
        batch.reset = self.unreported_reset.take();
        batch.more_pending = available > budget;

        let base = offset - self.pending.len() as u64;
        self.split_lines(&chunk, base, &mut batch.lines);

        tracing::trace!(
            path = %self.path.display(),
            bytes = chunk.len(),
            lines = batch.lines.len(),
            "Polled log file"
        );

        Ok(batch)
    }

    /// Restart at offset 0 of the file identified by `current`.
    ///
    /// The reason is held until a poll completes, so a read failure right
    /// after the reset cannot lose it.
    fn mark_reset(&mut self, reason: ResetReason, current: FileIdentity) {
        self.pending.clear();
        self.discard_fragment = false;
        match self.position.as_mut() {
            Some(pos) => pos.rebase(current),
            None => self.position = Some(LogPosition::new(current, 0)),
        }
        self.unreported_reset.get_or_insert(reason);
    }

    /// Append `chunk` to the pending buffer and emit every complete line.
    ///
    /// `base` is the file offset of the first pending byte.
    fn split_lines(&mut self, chunk: &[u8], base: u64, out: &mut Vec<RawLine>) {
        let mut buf = std::mem::take(&mut self.pending);
        buf.extend_from_slice(chunk);

        let mut start = 0;
        if self.discard_fragment {
            match buf.iter().position(|&b| b == b'\n') {
                Some(i) => {
                    start = i + 1;
                    self.discard_fragment = false;
                }
                None => return,
            }
        }

        while let Some(rel) = buf[start..].iter().position(|&b| b == b'\n') {
            let end = start + rel;
            let mut line = &buf[start..end];
            if let Some((b'\r', rest)) = line.split_last() {
                line = rest;
            }
            out.push(RawLine::new(
                String::from_utf8_lossy(line).into_owned(),
                base + start as u64,
            ));
            start = end + 1;
        }

        buf.drain(..start);
        self.pending = buf;
    }
}

/// Read up to `limit` leading bytes of `file`.
async fn read_prefix(file: &mut File, limit: usize) -> Result<Vec<u8>, WatcherError> {
    let mut prefix = Vec::with_capacity(limit);
    file.seek(SeekFrom::Start(0)).await?;
    file.take(limit as u64).read_to_end(&mut prefix).await?;
    Ok(prefix)
}

/// Find where an end-positioned tailer should start.
///
/// Returns the offset plus whether a leading fragment must be discarded
/// because its start lies beyond the scan window.
async fn resume_point(file: &mut File, len: u64) -> Result<(u64, bool), WatcherError> {
    if len == 0 {
        return Ok((0, false));
    }

    let scan = len.min(TAIL_SCAN_BYTES);
    let window_start = len - scan;
    let mut window = Vec::with_capacity(usize::try_from(scan).unwrap_or_default());
    file.seek(SeekFrom::Start(window_start)).await?;
    file.take(scan).read_to_end(&mut window).await?;

    if window.last() == Some(&b'\n') {
        return Ok((window_start + window.len() as u64, false));
    }
    match window.iter().rposition(|&b| b == b'\n') {
        Some(i) => Ok((window_start + i as u64 + 1, false)),
        None if window_start == 0 => Ok((0, false)),
        None => Ok((window_start + window.len() as u64, true)),
    }
}
