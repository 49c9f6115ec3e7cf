//! Byte transport below the serial link.
//!
//! The pipeline talks to the outside world through the [`Transport`] trait:
//! an inbound byte strobe, and a transmitter that accepts one byte at a time
//! and strobes "done" when it has shifted it out.
//!
//! [`SimTransport`] is the deterministic stand-in used by the binary and the
//! tests. Its transmitter stays busy for `baud_divisor` ticks per byte, plus
//! a uniform random extra of up to `jitter` ticks, then raises the done strobe
//! for exactly one tick. Inbound bytes come from a script, at most one per
//! tick.
//!
//! # Determinism
//!
//! All randomness comes from a seeded ChaCha8 RNG. Given the same seed and
//! script, the captured output and its timing are bit-identical.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::collections::VecDeque;

/// Tick-level byte transport.
pub trait Transport {
    /// Inbound byte strobed this tick, if any. Consumes it.
    fn poll_rx(&mut self) -> Option<u8>;

    /// Whether the transmitter can accept a byte this tick.
    fn tx_idle(&self) -> bool;

    /// Hand a byte to the transmitter. Only valid while `tx_idle()`.
    fn start_tx(&mut self, byte: u8);

    /// Whether the transmitter strobes completion of its byte this tick.
    fn tx_done(&self) -> bool;

    /// Advance the transport by one tick.
    fn tick(&mut self);
}

/// Timing configuration for the simulated transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransportConfig {
    /// Ticks the transmitter is busy per byte (at least 1)
    pub baud_divisor: u32,

    /// Maximum random extra busy ticks per byte
    pub jitter: u32,

    /// Random seed for determinism
    pub seed: u64,
}

impl TransportConfig {
    /// A transmitter that finishes every byte in one tick.
    pub fn immediate(seed: u64) -> Self {
        Self {
            baud_divisor: 1,
            jitter: 0,
            seed,
        }
    }
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            baud_divisor: 4,
            jitter: 0,
            seed: 42,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TxState {
    Idle,
    /// Shifting a byte out; ticks left before the done strobe
    Busy { byte: u8, remaining: u32 },
    /// Done strobe raised for this tick
    Done,
}

/// Simulated transport with scripted input and captured output.
#[derive(Debug, Clone)]
pub struct SimTransport {
    config: TransportConfig,
    rng: ChaCha8Rng,
    inbound: VecDeque<u8>,
    strobed: Option<u8>,
    tx: TxState,
    captured: Vec<u8>,
    busy_ticks: u64,
}

impl SimTransport {
    /// Create a transport with an empty inbound script.
    pub fn new(config: TransportConfig) -> Self {
        Self {
            config,
            rng: ChaCha8Rng::seed_from_u64(config.seed),
            inbound: VecDeque::new(),
            strobed: None,
            tx: TxState::Idle,
            captured: Vec::new(),
            busy_ticks: 0,
        }
    }

    /// Append bytes to the inbound script.
    pub fn feed(&mut self, bytes: &[u8]) {
        self.inbound.extend(bytes.iter().copied());
    }

    /// Bytes the transmitter has finished sending, in order.
    pub fn captured(&self) -> &[u8] {
        &self.captured
    }

    /// Inbound bytes not yet strobed.
    pub fn pending_rx(&self) -> usize {
        self.inbound.len() + usize::from(self.strobed.is_some())
    }

    /// Ticks the transmitter has spent busy.
    pub fn busy_ticks(&self) -> u64 {
        self.busy_ticks
    }

    fn byte_time(&mut self) -> u32 {
        let base = self.config.baud_divisor.max(1);
        if self.config.jitter == 0 {
            return base;
        }
        base.saturating_add(self.rng.gen_range(0..=self.config.jitter))
    }
}

impl Transport for SimTransport {
    fn poll_rx(&mut self) -> Option<u8> {
        self.strobed.take()
    }

    fn tx_idle(&self) -> bool {
        self.tx == TxState::Idle
    }

    fn start_tx(&mut self, byte: u8) {
        debug_assert!(self.tx_idle(), "transmitter started while busy");
        let remaining = self.byte_time();
        self.tx = TxState::Busy { byte, remaining };
    }

    fn tx_done(&self) -> bool {
        self.tx == TxState::Done
    }

    fn tick(&mut self) {
        // An unread strobe is gone by the next tick
        self.strobed = self.inbound.pop_front();

        self.tx = match self.tx {
            TxState::Idle => TxState::Idle,
            TxState::Busy { byte, remaining } => {
                self.busy_ticks += 1;
                if remaining <= 1 {
                    self.captured.push(byte);
                    TxState::Done
                } else {
                    TxState::Busy {
                        byte,
                        remaining: remaining - 1,
                    }
                }
            }
            TxState::Done => TxState::Idle,
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Send `byte`, return the number of ticks until the done strobe.
    fn time_one_byte(transport: &mut SimTransport, byte: u8) -> u32 {
        assert!(transport.tx_idle());
        transport.start_tx(byte);
        let mut ticks = 0;
        loop {
            transport.tick();
            ticks += 1;
            if transport.tx_done() {
                return ticks;
            }
            assert!(ticks < 1_000, "transmitter never finished");
        }
    }

    #[test]
    fn test_fixed_byte_time() {
        let mut transport = SimTransport::new(TransportConfig {
            baud_divisor: 4,
            jitter: 0,
            seed: 1,
        });
        assert_eq!(time_one_byte(&mut transport, b'a'), 4);
        assert_eq!(transport.captured(), b"a");
        assert!(!transport.tx_idle());

        // Done strobe lasts one tick
        transport.tick();
        assert!(!transport.tx_done());
        assert!(transport.tx_idle());
    }

    #[test]
    fn test_zero_divisor_treated_as_one() {
        let mut transport = SimTransport::new(TransportConfig {
            baud_divisor: 0,
            jitter: 0,
            seed: 1,
        });
        assert_eq!(time_one_byte(&mut transport, b'z'), 1);
    }

    #[test]
    fn test_jitter_bounds() {
        let mut transport = SimTransport::new(TransportConfig {
            baud_divisor: 2,
            jitter: 3,
            seed: 7,
        });
        for byte in 0..50u8 {
            let ticks = time_one_byte(&mut transport, byte);
            assert!((2..=5).contains(&ticks), "byte time {ticks} out of range");
            transport.tick();
        }
        assert_eq!(transport.captured().len(), 50);
    }

    #[test]
    fn test_extreme_timing_saturates() {
        let mut transport = SimTransport::new(TransportConfig {
            baud_divisor: u32::MAX,
            jitter: 5,
            seed: 1,
        });
        transport.start_tx(b'a');
        for _ in 0..10 {
            transport.tick();
        }
        assert!(!transport.tx_idle());
        assert!(!transport.tx_done());
        assert!(transport.captured().is_empty());
        assert_eq!(transport.busy_ticks(), 10);
    }

    #[test]
    fn test_determinism() {
        let config = TransportConfig {
            baud_divisor: 1,
            jitter: 8,
            seed: 12345,
        };
        let mut a = SimTransport::new(config);
        let mut b = SimTransport::new(config);
        for byte in 0..20u8 {
            assert_eq!(time_one_byte(&mut a, byte), time_one_byte(&mut b, byte));
            a.tick();
            b.tick();
        }
        assert_eq!(a.busy_ticks(), b.busy_ticks());
    }

    #[test]
    fn test_inbound_one_byte_per_tick() {
        let mut transport = SimTransport::new(TransportConfig::immediate(0));
        transport.feed(b"xA");
        assert_eq!(transport.poll_rx(), None);

        transport.tick();
        assert_eq!(transport.poll_rx(), Some(b'x'));
        assert_eq!(transport.poll_rx(), None);

        // Strobe not polled this tick is lost
        transport.tick();
        transport.tick();
        assert_eq!(transport.poll_rx(), None);
        assert_eq!(transport.pending_rx(), 0);
    }
}
