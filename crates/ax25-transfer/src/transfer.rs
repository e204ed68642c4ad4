use std::time::Instant;

use crate::compression::CompressionMetrics;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Inbound,
    Outbound,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkState {
    Pending,
    Sent,
    Completed,
    NeedsRetry,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TransferStatus {
    Pending,
    AwaitingAcceptance,
    Sending,
    AwaitingCompletion,
    Paused,
    Completed,
    Failed(String),
    Cancelled,
}

impl TransferStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, TransferStatus::Completed | TransferStatus::Failed(_) | TransferStatus::Cancelled)
    }
}

/// One chunked file transfer, inbound or outbound (spec §3 `BulkTransfer`,
/// §4.7). The engine (`TransferEngine`) owns a table of these keyed by
/// AXDP `sessionId`; this struct holds no reference back to the engine
/// or the session layer, per the arena+handle pattern used across this
/// workspace.
#[derive(Debug, Clone)]
pub struct BulkTransfer {
    pub session_id: u32,
    pub filename: String,
    pub file_size: u64,
    pub destination: String,
    pub chunk_size: u32,
    pub direction: Direction,
    pub chunk_states: Vec<ChunkState>,
    /// Actual byte length of each chunk (the last chunk is usually
    /// shorter than `chunk_size`), used to compute `bytes_sent` and
    /// progress precisely.
    pub(crate) chunk_lengths: Vec<u32>,
    pub bytes_sent: u64,
    pub status: TransferStatus,
    pub started_at: Option<Instant>,
    pub completed_at: Option<Instant>,
    pub sha256: [u8; 32],
    pub compression: Option<CompressionMetrics>,
}

impl BulkTransfer {
    pub(crate) fn new(
        session_id: u32,
        filename: String,
        file_size: u64,
        destination: String,
        chunk_size: u32,
        direction: Direction,
        total_chunks: u32,
        chunk_lengths: Vec<u32>,
        sha256: [u8; 32],
    ) -> Self {
        let status = if file_size == 0 { TransferStatus::Completed } else { TransferStatus::Pending };
        Self {
            session_id,
            filename,
            file_size,
            destination,
            chunk_size,
            direction,
            chunk_states: vec![ChunkState::Pending; total_chunks as usize],
            chunk_lengths,
            bytes_sent: 0,
            status,
            started_at: Some(Instant::now()),
            completed_at: if file_size == 0 { Some(Instant::now()) } else { None },
            sha256,
            compression: None,
        }
    }

    pub fn total_chunks(&self) -> u32 {
        self.chunk_states.len() as u32
    }

    /// `clamp(bytes_sent / file_size, 0, 1)`; zero-size files are always
    /// complete (spec §3, §8).
    pub fn progress(&self) -> f64 {
        if self.file_size == 0 {
            return 1.0;
        }
        (self.bytes_sent as f64 / self.file_size as f64).clamp(0.0, 1.0)
    }

    /// Lowest chunk index currently `Pending` or `NeedsRetry` — the next
    /// one the sender's pump should hand to the session layer (spec
    /// §4.7 step 4: never skip a chunk).
    pub fn next_chunk_to_send(&self) -> Option<u32> {
        self.chunk_states
            .iter()
            .position(|s| matches!(s, ChunkState::Pending | ChunkState::NeedsRetry))
            .map(|i| i as u32)
    }

    /// Mark a chunk handed off to the session layer. Updates
    /// `bytes_sent` immediately so progress moves with transmission, not
    /// only with ACK (spec §4.7 step 4).
    pub(crate) fn mark_sent(&mut self, index: u32) {
        let idx = index as usize;
        if idx >= self.chunk_states.len() {
            return;
        }
        let was_sent_or_completed = matches!(self.chunk_states[idx], ChunkState::Sent | ChunkState::Completed);
        self.chunk_states[idx] = ChunkState::Sent;
        if !was_sent_or_completed {
            self.bytes_sent += self.chunk_lengths.get(idx).copied().unwrap_or(self.chunk_size) as u64;
        }
    }

    pub(crate) fn mark_needs_retry(&mut self, index: u32) {
        let idx = index as usize;
        if idx >= self.chunk_states.len() {
            return;
        }
        if self.chunk_states[idx] == ChunkState::Sent {
            self.bytes_sent = self.bytes_sent.saturating_sub(self.chunk_lengths.get(idx).copied().unwrap_or(self.chunk_size) as u64);
        }
        self.chunk_states[idx] = ChunkState::NeedsRetry;
    }

    /// Inbound-side counterpart of `mark_sent`: record a chunk as
    /// received, crediting its true on-wire length (the last chunk is
    /// usually shorter than `chunk_size`) so `bytes_sent`/`progress()`
    /// reflect what has actually arrived.
    pub(crate) fn mark_received(&mut self, index: u32, actual_len: u32) {
        let idx = index as usize;
        if idx >= self.chunk_states.len() {
            return;
        }
        if self.chunk_states[idx] != ChunkState::Completed {
            self.bytes_sent += actual_len as u64;
        }
        self.chunk_states[idx] = ChunkState::Completed;
    }

    pub(crate) fn all_sent(&self) -> bool {
        self.chunk_states.iter().all(|s| matches!(s, ChunkState::Sent | ChunkState::Completed))
    }

    pub fn pause(&mut self) -> bool {
        if self.status == TransferStatus::Sending {
            self.status = TransferStatus::Paused;
            true
        } else {
            false
        }
    }

    pub fn resume(&mut self) -> bool {
        if self.status == TransferStatus::Paused {
            self.status = TransferStatus::Sending;
            true
        } else {
            false
        }
    }

    pub fn cancel(&mut self) -> bool {
        if self.status.is_terminal() {
            return false;
        }
        self.status = TransferStatus::Cancelled;
        self.completed_at = Some(Instant::now());
        true
    }

    pub fn fail(&mut self, reason: impl Into<String>) -> bool {
        if self.status.is_terminal() {
            return false;
        }
        self.status = TransferStatus::Failed(reason.into());
        self.completed_at = Some(Instant::now());
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(total_chunks: u32, file_size: u64) -> BulkTransfer {
        BulkTransfer::new(
            1,
            "x.bin".into(),
            file_size,
            "N1CALL".into(),
            256,
            Direction::Outbound,
            total_chunks,
            vec![256; total_chunks as usize],
            [0u8; 32],
        )
    }

    #[test]
    fn zero_size_file_completes_immediately() {
        let transfer = sample(0, 0);
        assert_eq!(transfer.status, TransferStatus::Completed);
        assert_eq!(transfer.progress(), 1.0);
    }

    #[test]
    fn progress_tracks_sent_not_just_completed() {
        let mut transfer = sample(4, 1024);
        transfer.mark_sent(0);
        assert!((transfer.progress() - 0.25).abs() < 1e-9);
    }

    #[test]
    fn needs_retry_rolls_back_bytes_sent() {
        let mut transfer = sample(4, 1024);
        transfer.mark_sent(0);
        transfer.mark_needs_retry(0);
        assert_eq!(transfer.bytes_sent, 0);
        assert_eq!(transfer.chunk_states[0], ChunkState::NeedsRetry);
    }

    #[test]
    fn next_chunk_to_send_never_skips() {
        let mut transfer = sample(3, 768);
        transfer.mark_sent(0);
        transfer.mark_needs_retry(0);
        assert_eq!(transfer.next_chunk_to_send(), Some(0));
    }

    #[test]
    fn pause_resume_only_valid_from_matching_states() {
        let mut transfer = sample(1, 1);
        assert!(!transfer.pause());
        transfer.status = TransferStatus::Sending;
        assert!(transfer.pause());
        assert!(!transfer.pause());
        assert!(transfer.resume());
    }

    #[test]
    fn cancel_rejected_once_terminal() {
        let mut transfer = sample(1, 1);
        transfer.status = TransferStatus::Completed;
        assert!(!transfer.cancel());
    }
}
