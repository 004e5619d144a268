use std::collections::VecDeque;

use super::protocol::PhysicsMessage;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReliabilityMode {
    Unreliable,
    UnreliableExpiring { ttl_ms: u64 },
    Reliable,
}

impl ReliabilityMode {
    pub fn is_reliable(&self) -> bool {
        matches!(self, Self::Reliable)
    }

    pub fn ttl_ms(&self) -> Option<u64> {
        match self {
            Self::UnreliableExpiring { ttl_ms } => Some(*ttl_ms),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct OutboundMessage {
    pub sequence: u32,
    pub timestamp_ms: u64,
    pub reliability: ReliabilityMode,
    pub message: PhysicsMessage,
}

impl OutboundMessage {
    pub fn is_expired(&self, current_time_ms: u64) -> bool {
        match self.reliability.ttl_ms() {
            Some(ttl_ms) => current_time_ms.saturating_sub(self.timestamp_ms) > ttl_ms,
            None => false,
        }
    }
}

/// Messages waiting for the transport, in the order they were produced.
pub struct OutboundQueue {
    pending: VecDeque<OutboundMessage>,
    next_sequence: u32,
    max_pending: usize,
}

impl OutboundQueue {
    pub const DEFAULT_CAPACITY: usize = 256;

    pub fn new(max_pending: usize) -> Self {
        Self {
            pending: VecDeque::with_capacity(max_pending),
            next_sequence: 0,
            max_pending: max_pending.max(1),
        }
    }

    pub fn push(&mut self, timestamp_ms: u64, message: PhysicsMessage) -> u32 {
        let sequence = self.next_sequence;
        self.next_sequence = self.next_sequence.wrapping_add(1);

        // A full snapshot makes any unsent older one redundant.
        if matches!(message, PhysicsMessage::State { .. }) {
            self.pending
                .retain(|m| !matches!(m.message, PhysicsMessage::State { .. }));
        }

        if self.pending.len() >= self.max_pending {
            self.evict_oldest_unreliable();
        }

        self.pending.push_back(OutboundMessage {
            sequence,
            timestamp_ms,
            reliability: message.reliability(),
            message,
        });

        sequence
    }

    pub fn cleanup(&mut self, current_time_ms: u64) {
        self.pending.retain(|m| !m.is_expired(current_time_ms));
    }

    pub fn drain(&mut self) -> Vec<OutboundMessage> {
        self.pending.drain(..).collect()
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn clear(&mut self) {
        self.pending.clear();
    }

    fn evict_oldest_unreliable(&mut self) {
        if let Some(idx) = self
            .pending
            .iter()
            .position(|m| !m.reliability.is_reliable())
        {
            self.pending.remove(idx);
        } else {
            log::warn!(
                "outbound queue full of reliable messages ({}), growing",
                self.pending.len()
            );
        }
    }
}

impl Default for OutboundQueue {
    fn default() -> Self {
        Self::new(Self::DEFAULT_CAPACITY)
    }
}
