use std::collections::HashMap;

use axdp::{
    FileMeta, Message, MessageType, SackBitmap, MESSAGE_ID_COMPLETION_ACK_NACK,
    MESSAGE_ID_COMPLETION_REQUEST,
};
use rand::Rng;
use sha2::{Digest, Sha256};

use crate::compression::{self, CompressionAlgorithm, CompressionMetrics};
use crate::transfer::{BulkTransfer, ChunkState, Direction, TransferStatus};

/// Rough AXDP per-chunk framing overhead (magic + every scalar TLV a
/// `fileChunk` message carries besides its payload), subtracted from the
/// session's paclen to pick a chunk size (spec §4.7 step 1).
pub const AXDP_CHUNK_OVERHEAD: u32 = 48;
const MIN_CHUNK_SIZE: u32 = 16;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum TransferError {
    #[error("no transfer with session id {0}")]
    NotFound(u32),
    #[error("transfer {0} is not in a state that allows this operation")]
    InvalidState(u32),
}

/// Outcome of feeding the engine a fact (an inbound message, a pump
/// tick, a user action). Mirrors `ax25_session::Action`: the engine
/// performs no I/O itself, it only says what the coordinator should do.
#[derive(Debug, Clone, PartialEq)]
pub enum TransferEvent {
    SendMessage(Message),
    /// A transfer's snapshot changed; the coordinator re-fetches it via
    /// [`TransferEngine::get`] and fires `on_transfer_update`.
    Updated(u32),
    /// Inbound `fileMeta` arrived; the coordinator surfaces this to the
    /// application via `on_transfer_request` for an accept/reject
    /// decision ([`TransferEngine::accept_incoming`]/`reject_incoming`).
    IncomingRequest(u32),
}

struct OutboundChunks(Vec<Vec<u8>>);

/// Drives every chunked file transfer (spec §4.7, C7). Owns the
/// transfer table and per-transfer chunk buffers; never touches a
/// session, a socket, or a clock beyond `Instant::now()` inside
/// `BulkTransfer`.
#[derive(Default)]
pub struct TransferEngine {
    transfers: HashMap<u32, BulkTransfer>,
    outbound_chunks: HashMap<u32, OutboundChunks>,
    outbound_algorithm: HashMap<u32, CompressionAlgorithm>,
    inbound_chunks: HashMap<u32, HashMap<u32, Vec<u8>>>,
}

impl TransferEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, session_id: u32) -> Option<&BulkTransfer> {
        self.transfers.get(&session_id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &BulkTransfer> {
        self.transfers.values()
    }

    /// Begin an outbound transfer: compute sha256, pick a chunk size
    /// from `paclen`, analyse/compress, and return the `fileMeta`
    /// message to send (spec §4.7 steps 1-2).
    pub fn start_outbound(
        &mut self,
        data: Vec<u8>,
        filename: String,
        destination: String,
        paclen: u32,
        override_algorithm: Option<CompressionAlgorithm>,
    ) -> (u32, Vec<TransferEvent>) {
        let session_id = rand::rng().random::<u32>();
        let sha256: [u8; 32] = Sha256::digest(&data).into();
        let chunk_size = paclen.saturating_sub(AXDP_CHUNK_OVERHEAD).max(MIN_CHUNK_SIZE);
        let algorithm = override_algorithm.unwrap_or_else(|| compression::select_algorithm(&filename, &data));
        let payload = compression::compress(algorithm, &data);

        let chunks: Vec<Vec<u8>> =
            if payload.is_empty() { Vec::new() } else { payload.chunks(chunk_size as usize).map(|c| c.to_vec()).collect() };
        let chunk_lengths: Vec<u32> = chunks.iter().map(|c| c.len() as u32).collect();
        let total_chunks = chunks.len() as u32;

        let mut transfer = BulkTransfer::new(
            session_id,
            filename.clone(),
            data.len() as u64,
            destination,
            chunk_size,
            Direction::Outbound,
            total_chunks,
            chunk_lengths,
            sha256,
        );
        if algorithm != CompressionAlgorithm::None {
            transfer.compression = Some(CompressionMetrics::new(data.len() as u64, payload.len() as u64));
        }

        let mut events = Vec::new();
        if data.is_empty() {
            // BulkTransfer::new already parked this at Completed.
            self.transfers.insert(session_id, transfer);
            events.push(TransferEvent::Updated(session_id));
            return (session_id, events);
        }

        transfer.status = TransferStatus::AwaitingAcceptance;
        let meta = FileMeta {
            filename,
            size: data.len() as u64,
            sha256,
            chunk_size,
            compression: if algorithm == CompressionAlgorithm::Lz4 { 1 } else { 0 },
        };
        let msg = Message { file_meta: Some(meta), total_chunks: Some(total_chunks), ..Message::new(MessageType::FileMeta, session_id, 0) };
        events.push(TransferEvent::SendMessage(msg));
        events.push(TransferEvent::Updated(session_id));

        self.outbound_chunks.insert(session_id, OutboundChunks(chunks));
        self.outbound_algorithm.insert(session_id, algorithm);
        self.transfers.insert(session_id, transfer);
        (session_id, events)
    }

    /// Accept an inbound `fileMeta` request (spec §4.7 step 3).
    pub fn accept_incoming(&mut self, session_id: u32) -> Result<Vec<TransferEvent>, TransferError> {
        let transfer =
            self.transfers.get_mut(&session_id).ok_or(TransferError::NotFound(session_id))?;
        if transfer.status != TransferStatus::AwaitingAcceptance {
            return Err(TransferError::InvalidState(session_id));
        }
        transfer.status = TransferStatus::Sending;
        let ack = Message::new(MessageType::Ack, session_id, 0);
        Ok(vec![TransferEvent::SendMessage(ack), TransferEvent::Updated(session_id)])
    }

    pub fn reject_incoming(&mut self, session_id: u32) -> Result<Vec<TransferEvent>, TransferError> {
        let transfer =
            self.transfers.get_mut(&session_id).ok_or(TransferError::NotFound(session_id))?;
        transfer.fail("rejected");
        let nack = Message::new(MessageType::Nack, session_id, 0);
        Ok(vec![TransferEvent::SendMessage(nack), TransferEvent::Updated(session_id)])
    }

    /// Hand the next ready chunk (or the completion request, once every
    /// chunk has been sent) to the caller. Returns nothing when the
    /// transfer isn't `Sending`/`AwaitingCompletion` or has nothing left
    /// to do this tick — the coordinator calls this once per outbound
    /// pump opportunity the session's window allows (spec §4.7 step 4).
    pub fn pump(&mut self, session_id: u32) -> Vec<TransferEvent> {
        let Some(transfer) = self.transfers.get_mut(&session_id) else { return Vec::new() };
        if transfer.direction != Direction::Outbound {
            return Vec::new();
        }
        match transfer.status {
            TransferStatus::Sending => {
                if let Some(index) = transfer.next_chunk_to_send() {
                    let Some(OutboundChunks(chunks)) = self.outbound_chunks.get(&session_id) else {
                        return Vec::new();
                    };
                    let Some(chunk) = chunks.get(index as usize) else { return Vec::new() };
                    let msg = Message {
                        chunk_index: Some(index),
                        total_chunks: Some(transfer.total_chunks()),
                        ..Message::new(MessageType::FileChunk, session_id, index + 1).with_payload(chunk.clone())
                    };
                    transfer.mark_sent(index);
                    vec![TransferEvent::SendMessage(msg), TransferEvent::Updated(session_id)]
                } else if transfer.all_sent() {
                    transfer.status = TransferStatus::AwaitingCompletion;
                    let request = Message::new(MessageType::Ack, session_id, MESSAGE_ID_COMPLETION_REQUEST);
                    vec![TransferEvent::SendMessage(request), TransferEvent::Updated(session_id)]
                } else {
                    Vec::new()
                }
            }
            _ => Vec::new(),
        }
    }

    pub fn pause(&mut self, session_id: u32) -> Result<(), TransferError> {
        let transfer =
            self.transfers.get_mut(&session_id).ok_or(TransferError::NotFound(session_id))?;
        if transfer.pause() {
            Ok(())
        } else {
            Err(TransferError::InvalidState(session_id))
        }
    }

    pub fn resume(&mut self, session_id: u32) -> Result<(), TransferError> {
        let transfer =
            self.transfers.get_mut(&session_id).ok_or(TransferError::NotFound(session_id))?;
        if transfer.resume() {
            Ok(())
        } else {
            Err(TransferError::InvalidState(session_id))
        }
    }

    pub fn cancel(&mut self, session_id: u32) -> Vec<TransferEvent> {
        let Some(transfer) = self.transfers.get_mut(&session_id) else { return Vec::new() };
        if !transfer.cancel() {
            return Vec::new();
        }
        self.outbound_chunks.remove(&session_id);
        self.inbound_chunks.remove(&session_id);
        let close = Message::new(MessageType::Close, session_id, 0);
        vec![TransferEvent::SendMessage(close), TransferEvent::Updated(session_id)]
    }

    /// Fail every transfer on a link that just dropped (spec §5: "a
    /// session disconnectRequest while transfers are in flight fails
    /// those transfers with reason 'link dropped'").
    pub fn fail_all_for_peer(&mut self, peer: &str) -> Vec<TransferEvent> {
        let mut events = Vec::new();
        for transfer in self.transfers.values_mut() {
            if transfer.destination == peer && transfer.fail("link dropped") {
                events.push(TransferEvent::Updated(transfer.session_id));
            }
        }
        events
    }

    /// Feed one incoming AXDP message related to file transfer. Chat
    /// messages and non-transfer types are the coordinator's concern,
    /// not this engine's — call this only for
    /// `FileMeta`/`FileChunk`/`Ack`/`Nack` types.
    pub fn handle_message(&mut self, from: &str, msg: Message) -> Vec<TransferEvent> {
        match msg.msg_type {
            Some(MessageType::FileMeta) => self.handle_file_meta(from, msg),
            Some(MessageType::FileChunk) => self.handle_file_chunk(msg),
            Some(MessageType::Ack) if msg.message_id == MESSAGE_ID_COMPLETION_REQUEST => {
                self.completion_request_response(msg.session_id)
            }
            Some(MessageType::Ack) if msg.message_id == MESSAGE_ID_COMPLETION_ACK_NACK => {
                self.handle_completion_ack(msg.session_id)
            }
            Some(MessageType::Ack) => self.handle_sender_ack(msg),
            Some(MessageType::Nack) if msg.message_id == MESSAGE_ID_COMPLETION_ACK_NACK => {
                self.handle_completion_nack(msg)
            }
            Some(MessageType::Nack) => self.handle_sender_nack(msg),
            _ => Vec::new(),
        }
    }

    fn handle_file_meta(&mut self, from: &str, msg: Message) -> Vec<TransferEvent> {
        let Some(meta) = msg.file_meta else { return Vec::new() };
        let total_chunks = msg.total_chunks.unwrap_or(0);
        let mut transfer = BulkTransfer::new(
            msg.session_id,
            meta.filename,
            meta.size,
            from.to_string(),
            meta.chunk_size,
            Direction::Inbound,
            total_chunks,
            vec![meta.chunk_size; total_chunks as usize],
            meta.sha256,
        );
        transfer.status = TransferStatus::AwaitingAcceptance;
        self.inbound_chunks.insert(msg.session_id, HashMap::new());
        self.outbound_algorithm.insert(
            msg.session_id,
            if meta.compression == 1 { CompressionAlgorithm::Lz4 } else { CompressionAlgorithm::None },
        );
        self.transfers.insert(msg.session_id, transfer);
        vec![TransferEvent::IncomingRequest(msg.session_id), TransferEvent::Updated(msg.session_id)]
    }

    fn handle_file_chunk(&mut self, msg: Message) -> Vec<TransferEvent> {
        let Some(transfer) = self.transfers.get_mut(&msg.session_id) else { return Vec::new() };
        if transfer.direction != Direction::Inbound || transfer.status.is_terminal() {
            return Vec::new();
        }
        let Some(index) = msg.chunk_index else { return Vec::new() };
        if !msg.payload_crc_ok() {
            log::debug!("transfer {}: chunk {} failed CRC, dropping", msg.session_id, index);
            return Vec::new();
        }
        let Some(payload) = msg.payload else { return Vec::new() };
        transfer.mark_received(index, payload.len() as u32);
        let bucket = self.inbound_chunks.entry(msg.session_id).or_default();
        bucket.insert(index, payload);
        vec![TransferEvent::Updated(msg.session_id)]
    }

    fn handle_sender_ack(&mut self, msg: Message) -> Vec<TransferEvent> {
        let Some(transfer) = self.transfers.get_mut(&msg.session_id) else { return Vec::new() };
        if transfer.direction == Direction::Outbound && transfer.status == TransferStatus::AwaitingAcceptance {
            transfer.status = TransferStatus::Sending;
            return vec![TransferEvent::Updated(msg.session_id)];
        }
        Vec::new()
    }

    fn handle_sender_nack(&mut self, msg: Message) -> Vec<TransferEvent> {
        let Some(transfer) = self.transfers.get_mut(&msg.session_id) else { return Vec::new() };
        if transfer.direction == Direction::Outbound && transfer.status == TransferStatus::AwaitingAcceptance {
            transfer.fail("rejected");
            self.outbound_chunks.remove(&msg.session_id);
            return vec![TransferEvent::Updated(msg.session_id)];
        }
        Vec::new()
    }

    /// Receiver side of the completion handshake (spec §4.7 step 6):
    /// reconstruct, verify completeness and sha256, answer with the
    /// completion ack or a NACK carrying a SACK bitmap of what's missing.
    fn completion_request_response(&mut self, session_id: u32) -> Vec<TransferEvent> {
        let algorithm = self.outbound_algorithm.get(&session_id).copied().unwrap_or(CompressionAlgorithm::None);
        let Some(transfer) = self.transfers.get_mut(&session_id) else { return Vec::new() };
        if transfer.direction != Direction::Inbound {
            return Vec::new();
        }
        let total = transfer.total_chunks();
        let received = self.inbound_chunks.get(&session_id).cloned().unwrap_or_default();
        let missing: Vec<u32> = (0..total).filter(|i| !received.contains_key(i)).collect();

        if missing.is_empty() {
            let mut assembled = Vec::with_capacity(transfer.file_size as usize);
            for i in 0..total {
                assembled.extend_from_slice(&received[&i]);
            }
            let decompressed = compression::decompress(algorithm, &assembled).unwrap_or_default();
            let digest: [u8; 32] = Sha256::digest(&decompressed).into();
            if digest == transfer.sha256 {
                transfer.status = TransferStatus::Completed;
                transfer.completed_at = Some(std::time::Instant::now());
                let ack = Message::new(MessageType::Ack, session_id, MESSAGE_ID_COMPLETION_ACK_NACK);
                return vec![TransferEvent::SendMessage(ack), TransferEvent::Updated(session_id)];
            }
        }

        let sack = SackBitmap::from_received(0, total as u16, received.keys().map(|&i| i as u16));
        let nack = Message {
            sack_bitmap: Some(sack),
            ..Message::new(MessageType::Nack, session_id, MESSAGE_ID_COMPLETION_ACK_NACK)
        };
        vec![TransferEvent::SendMessage(nack)]
    }

    fn handle_completion_ack(&mut self, session_id: u32) -> Vec<TransferEvent> {
        let Some(transfer) = self.transfers.get_mut(&session_id) else { return Vec::new() };
        if transfer.direction != Direction::Outbound || transfer.status.is_terminal() {
            return Vec::new();
        }
        transfer.status = TransferStatus::Completed;
        transfer.completed_at = Some(std::time::Instant::now());
        self.outbound_chunks.remove(&session_id);
        vec![TransferEvent::Updated(session_id)]
    }

    fn handle_completion_nack(&mut self, msg: Message) -> Vec<TransferEvent> {
        let Some(transfer) = self.transfers.get_mut(&msg.session_id) else { return Vec::new() };
        if transfer.direction != Direction::Outbound {
            return Vec::new();
        }
        // A completion NACK with a SACK bitmap is never a terminal
        // failure (spec §4.7 step 6): flip the missing chunks back to
        // `needsRetry` and let the pump resend them.
        if let Some(sack) = msg.sack_bitmap {
            for missing in sack.missing() {
                transfer.mark_needs_retry(missing);
            }
            transfer.status = TransferStatus::AwaitingCompletion;
            vec![TransferEvent::Updated(msg.session_id)]
        } else {
            transfer.fail("completion rejected");
            vec![TransferEvent::Updated(msg.session_id)]
        }
    }

}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_size_outbound_is_immediately_complete() {
        let mut engine = TransferEngine::new();
        let (id, events) = engine.start_outbound(Vec::new(), "empty.txt".into(), "N1CALL".into(), 128, None);
        assert_eq!(engine.get(id).unwrap().status, TransferStatus::Completed);
        assert!(events.iter().any(|e| matches!(e, TransferEvent::Updated(_))));
    }

    #[test]
    fn outbound_accept_then_full_chunk_pump_reaches_awaiting_completion() {
        let mut engine = TransferEngine::new();
        let data = b"x".repeat(300);
        let (id, _) = engine.start_outbound(data, "f.bin".into(), "N1CALL".into(), 128, Some(CompressionAlgorithm::None));
        engine.accept_incoming(id).unwrap();
        let total = engine.get(id).unwrap().total_chunks();
        for _ in 0..total {
            let events = engine.pump(id);
            assert!(events.iter().any(|e| matches!(e, TransferEvent::SendMessage(_))));
        }
        let last = engine.pump(id);
        assert!(last.iter().any(|e| matches!(e, TransferEvent::SendMessage(m) if m.message_id == MESSAGE_ID_COMPLETION_REQUEST)));
        assert_eq!(engine.get(id).unwrap().status, TransferStatus::AwaitingCompletion);
    }

    /// Spec §8 scenario 6.
    #[test]
    fn completion_nack_with_sack_requeues_missing_chunk_not_failure() {
        let mut engine = TransferEngine::new();
        let data = b"y".repeat(4 * 80);
        let (id, _) = engine.start_outbound(data, "f.bin".into(), "N1CALL".into(), 80 + AXDP_CHUNK_OVERHEAD, Some(CompressionAlgorithm::None));
        engine.accept_incoming(id).unwrap();
        for _ in 0..engine.get(id).unwrap().total_chunks() {
            engine.pump(id);
        }
        engine.pump(id); // sends the completion request
        assert_eq!(engine.get(id).unwrap().status, TransferStatus::AwaitingCompletion);

        let sack = SackBitmap::from_received(0, 4, [0, 1, 3]);
        let nack = Message { sack_bitmap: Some(sack), ..Message::new(MessageType::Nack, id, MESSAGE_ID_COMPLETION_ACK_NACK) };
        let events = engine.handle_message("N1CALL", nack);
        assert!(events.iter().any(|e| matches!(e, TransferEvent::Updated(_))));
        assert_eq!(engine.get(id).unwrap().status, TransferStatus::AwaitingCompletion);
        assert_eq!(engine.get(id).unwrap().chunk_states[2], ChunkState::NeedsRetry);

        let resend = engine.pump(id);
        assert!(resend.iter().any(|e| matches!(e, TransferEvent::SendMessage(m) if m.chunk_index == Some(2))));

        let ack = Message::new(MessageType::Ack, id, MESSAGE_ID_COMPLETION_ACK_NACK);
        engine.handle_message("N1CALL", ack);
        assert_eq!(engine.get(id).unwrap().status, TransferStatus::Completed);
    }

    #[test]
    fn completion_ack_is_authoritative_even_without_local_awaiting_completion_observation() {
        let mut engine = TransferEngine::new();
        let (id, _) = engine.start_outbound(b"z".repeat(10), "f.bin".into(), "N1CALL".into(), 128, Some(CompressionAlgorithm::None));
        // Force a status the UI might have been stuck on.
        engine.transfers.get_mut(&id).unwrap().status = TransferStatus::Sending;
        let ack = Message::new(MessageType::Ack, id, MESSAGE_ID_COMPLETION_ACK_NACK);
        engine.handle_message("N1CALL", ack);
        assert_eq!(engine.get(id).unwrap().status, TransferStatus::Completed);
    }

    #[test]
    fn inbound_file_meta_then_full_chunks_and_completion_request_round_trips() {
        let mut sender = TransferEngine::new();
        let data = b"abcdefgh".repeat(20);
        let (sid, events) = sender.start_outbound(data.clone(), "f.bin".into(), "RX-1".into(), 128, Some(CompressionAlgorithm::None));
        let TransferEvent::SendMessage(file_meta_msg) = events.into_iter().find(|e| matches!(e, TransferEvent::SendMessage(_))).unwrap() else { unreachable!() };

        let mut receiver = TransferEngine::new();
        let events = receiver.handle_message("TX-1", file_meta_msg);
        assert!(events.iter().any(|e| matches!(e, TransferEvent::IncomingRequest(_))));
        let accept_events = receiver.accept_incoming(sid).unwrap();
        assert!(accept_events.iter().any(|e| matches!(e, TransferEvent::SendMessage(m) if m.msg_type == Some(MessageType::Ack))));

        sender.accept_incoming(sid).unwrap();
        let total = sender.get(sid).unwrap().total_chunks();
        for _ in 0..total {
            for event in sender.pump(sid) {
                if let TransferEvent::SendMessage(msg) = event {
                    if msg.msg_type == Some(MessageType::FileChunk) {
                        receiver.handle_message("TX-1", msg);
                    }
                }
            }
        }
        let completion = sender.pump(sid);
        let request = completion.into_iter().find_map(|e| match e {
            TransferEvent::SendMessage(m) if m.message_id == MESSAGE_ID_COMPLETION_REQUEST => Some(m),
            _ => None,
        }).unwrap();
        let response = receiver.handle_message("TX-1", request);
        assert!(response.iter().any(|e| matches!(e, TransferEvent::SendMessage(m) if m.msg_type == Some(MessageType::Ack) && m.message_id == MESSAGE_ID_COMPLETION_ACK_NACK)));
        assert_eq!(receiver.get(sid).unwrap().status, TransferStatus::Completed);
    }
}
