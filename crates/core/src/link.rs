//! Serial link pumps between the transport and the pipeline queues.
//!
//! Two independent per-tick state machines:
//!
//! - the receive pump moves a strobed inbound byte into the rx queue; with
//!   no flow control towards the host, a byte arriving while the queue is
//!   full is lost and counted
//! - the transmit pump hands one byte at a time from the tx queue to the
//!   transmitter and waits for its done strobe before taking the next

use crate::queue::FlowQueue;
use crate::transport::Transport;
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TxPhase {
    AwaitData,
    AwaitComplete,
}

/// Link counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LinkStats {
    pub bytes_received: u64,
    pub bytes_dropped: u64,
    pub bytes_sent: u64,
}

/// The rx and tx pumps of one serial link.
#[derive(Debug, Clone)]
pub struct SerialLink {
    tx_phase: TxPhase,
    stats: LinkStats,
}

impl SerialLink {
    pub fn new() -> Self {
        Self {
            tx_phase: TxPhase::AwaitData,
            stats: LinkStats::default(),
        }
    }

    /// Receive pump: move this tick's inbound strobe into `rx`.
    pub fn pump_rx<T: Transport>(&mut self, transport: &mut T, rx: &mut FlowQueue<u8>) {
        let Some(byte) = transport.poll_rx() else {
            return;
        };
        if rx.push(byte).is_ok() {
            self.stats.bytes_received += 1;
        } else {
            self.stats.bytes_dropped += 1;
            warn!(byte, "receive queue full, inbound byte dropped");
        }
    }

    /// Transmit pump: feed the transmitter from `tx`.
    pub fn pump_tx<T: Transport>(&mut self, transport: &mut T, tx: &mut FlowQueue<u8>) {
        match self.tx_phase {
            TxPhase::AwaitData => {
                if !transport.tx_idle() {
                    return;
                }
                if let Ok(byte) = tx.pop() {
                    transport.start_tx(byte);
                    self.tx_phase = TxPhase::AwaitComplete;
                }
            }
            TxPhase::AwaitComplete => {
                if transport.tx_done() {
                    self.stats.bytes_sent += 1;
                    self.tx_phase = TxPhase::AwaitData;
                }
            }
        }
    }

    /// Whether no byte is in flight on the transmitter.
    pub fn is_tx_idle(&self) -> bool {
        self.tx_phase == TxPhase::AwaitData
    }

    pub fn stats(&self) -> LinkStats {
        self.stats
    }
}

impl Default for SerialLink {
    fn default() -> Self {
        Self::new()
    }
}
