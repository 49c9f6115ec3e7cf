//! Lock-step pipeline: transport, link, search controller and encoder.
//!
//! ```text
//!            rx queue            command queue           tx queue
//! transport ---------> search ---------------> encoder ----------> transport
//!   (rx pump)        controller              (protocol)           (tx pump)
//! ```
//!
//! Every tick runs the stages in a fixed order (transport, receive pump,
//! controller, encoder, transmit pump) and then commits every queue. Since
//! queue status only changes at the commit, the order within a tick does not
//! change what any stage sees.

use crate::encoder::ProtocolEncoder;
use crate::error::{ConfigError, Error, Result};
use crate::link::SerialLink;
use crate::metrics::Metrics;
use crate::queue::FlowQueue;
use crate::search::{SearchController, START_BYTE};
use crate::transport::{SimTransport, Transport, TransportConfig};
use crate::widths::Widths;
use std::time::Instant;
use tracing::{debug, info};

/// Default depth of the encoder's command queue.
pub const DEFAULT_COMMAND_DEPTH: usize = 128;

/// Default depth of each link byte queue.
pub const DEFAULT_LINK_DEPTH: usize = 1024;

/// Configuration for a pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineConfig {
    pub widths: Widths,

    /// Records between the controller and the encoder
    pub command_depth: usize,

    /// Inbound bytes between the receive pump and the controller
    pub rx_depth: usize,

    /// Outbound bytes between the encoder and the transmit pump
    pub tx_depth: usize,

    pub transport: TransportConfig,
}

impl PipelineConfig {
    /// Check queue depths.
    ///
    /// # Errors
    /// `ConfigError::ZeroDepth` naming the first queue configured with no room.
    pub fn validate(&self) -> Result<()> {
        for (name, depth) in [
            ("command", self.command_depth),
            ("rx", self.rx_depth),
            ("tx", self.tx_depth),
        ] {
            if depth == 0 {
                return Err(ConfigError::ZeroDepth { name }.into());
            }
        }
        Ok(())
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            widths: Widths::default(),
            command_depth: DEFAULT_COMMAND_DEPTH,
            rx_depth: DEFAULT_LINK_DEPTH,
            tx_depth: DEFAULT_LINK_DEPTH,
            transport: TransportConfig::default(),
        }
    }
}

/// The complete record search system.
#[derive(Debug)]
pub struct Pipeline<T: Transport = SimTransport> {
    config: PipelineConfig,
    transport: T,
    link: SerialLink,
    rx: FlowQueue<u8>,
    controller: SearchController,
    commands: FlowQueue<u64>,
    encoder: ProtocolEncoder,
    tx: FlowQueue<u8>,
    ticks: u64,
    started_at: Instant,
}

impl Pipeline<SimTransport> {
    /// Build a pipeline on a simulated transport.
    ///
    /// # Errors
    /// Returns an error if `config` does not validate.
    pub fn new(config: PipelineConfig) -> Result<Self> {
        Self::with_transport(config, SimTransport::new(config.transport))
    }

    /// Queue bytes from the host.
    pub fn feed(&mut self, bytes: &[u8]) {
        self.transport.feed(bytes);
    }

    /// Queue the start byte.
    pub fn start(&mut self) {
        self.feed(&[START_BYTE]);
    }

    /// Bytes transmitted so far.
    pub fn output(&self) -> &[u8] {
        self.transport.captured()
    }
}

impl<T: Transport> Pipeline<T> {
    /// Build a pipeline on an arbitrary transport.
    ///
    /// # Errors
    /// Returns an error if `config` does not validate.
    pub fn with_transport(config: PipelineConfig, transport: T) -> Result<Self> {
        config.validate()?;
        debug!(
            value_bits = config.widths.value_bits(),
            step_bits = config.widths.step_bits(),
            command_depth = config.command_depth,
            tx_depth = config.tx_depth,
            "pipeline created"
        );
        Ok(Self {
            config,
            transport,
            link: SerialLink::new(),
            rx: FlowQueue::new(config.rx_depth),
            controller: SearchController::new(config.widths),
            commands: FlowQueue::new(config.command_depth),
            encoder: ProtocolEncoder::new(),
            tx: FlowQueue::new(config.tx_depth),
            ticks: 0,
            started_at: Instant::now(),
        })
    }

    /// Advance every stage by one tick and commit all queues.
    ///
    /// # Errors
    /// Propagates a controller error; none occur with a valid configuration.
    pub fn tick(&mut self) -> Result<()> {
        self.step(true)
    }

    fn step(&mut self, run_controller: bool) -> Result<()> {
        self.transport.tick();
        self.link.pump_rx(&mut self.transport, &mut self.rx);
        if run_controller {
            self.controller.tick(&mut self.rx, &mut self.commands)?;
        }
        self.encoder.tick(&mut self.commands, &mut self.tx);
        self.link.pump_tx(&mut self.transport, &mut self.tx);

        self.rx.commit();
        self.commands.commit();
        self.tx.commit();
        self.ticks += 1;
        Ok(())
    }

    /// Tick until `trials` trials have completed and everything they
    /// reported has left the transmitter.
    ///
    /// Once the target is reached the controller is held so no later trial
    /// starts reporting; the remaining stages drain.
    ///
    /// # Errors
    /// `Error::TickLimit` if `max_ticks` ticks pass first.
    pub fn run_trials(&mut self, trials: u64, max_ticks: u64) -> Result<()> {
        info!(trials, max_ticks, "running search");
        for _ in 0..max_ticks {
            let target_reached = self.controller.stats().trials_completed >= trials
                && !self.controller.is_reporting();
            if target_reached && self.is_drained() {
                info!(ticks = self.ticks, "search target reached");
                return Ok(());
            }
            self.step(!target_reached)?;
        }
        Err(Error::TickLimit {
            limit: max_ticks,
            trials: self.controller.stats().trials_completed,
        })
    }

    /// Whether no command or byte is in flight anywhere past the controller.
    pub fn is_drained(&self) -> bool {
        self.commands.is_empty()
            && self.encoder.is_ready()
            && self.tx.is_empty()
            && self.link.is_tx_idle()
    }

    /// Counter snapshot across all stages.
    pub fn metrics(&self) -> Metrics {
        let search = self.controller.stats();
        let encoder = self.encoder.stats();
        let link = self.link.stats();
        Metrics {
            duration: self.started_at.elapsed(),
            ticks: self.ticks,
            trials_completed: search.trials_completed,
            records: search.records,
            overflows: search.overflows,
            exhaustions: search.exhaustions,
            engine_steps: search.engine_steps,
            controller_stall_ticks: search.stall_ticks,
            commands_verbatim: encoder.verbatim,
            commands_decimal: encoder.decimal,
            commands_hex: encoder.hex,
            commands_hex_spaced: encoder.hex_spaced,
            commands_rejected: encoder.rejected,
            bytes_emitted: encoder.bytes_emitted,
            encoder_stall_ticks: encoder.stall_ticks,
            bytes_received: link.bytes_received,
            bytes_discarded: search.bytes_discarded,
            bytes_dropped: link.bytes_dropped,
            bytes_transmitted: link.bytes_sent,
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn controller(&self) -> &SearchController {
        &self.controller
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fast_config() -> PipelineConfig {
        PipelineConfig {
            transport: TransportConfig::immediate(1),
            ..PipelineConfig::default()
        }
    }

    #[test]
    fn test_zero_depth_rejected() {
        let config = PipelineConfig {
            tx_depth: 0,
            ..PipelineConfig::default()
        };
        assert!(matches!(
            Pipeline::new(config),
            Err(Error::Config(ConfigError::ZeroDepth { name: "tx" }))
        ));
    }

    #[test]
    fn test_idle_without_start_byte() {
        let mut pipeline = Pipeline::new(fast_config()).unwrap();
        for _ in 0..100 {
            pipeline.tick().unwrap();
        }
        assert!(!pipeline.controller().is_started());
        assert!(pipeline.output().is_empty());
        assert_eq!(pipeline.ticks(), 100);
    }

    #[test]
    fn test_first_report() {
        let mut pipeline = Pipeline::new(fast_config()).unwrap();
        pipeline.start();
        pipeline.run_trials(2, 10_000).unwrap();
        assert_eq!(pipeline.output(), b"1 1 2 \r\n\x07");
        assert!(pipeline.is_drained());
    }

    #[test]
    fn test_tick_limit() {
        let mut pipeline = Pipeline::new(fast_config()).unwrap();
        pipeline.start();
        let result = pipeline.run_trials(1_000, 50);
        assert!(matches!(result, Err(Error::TickLimit { limit: 50, .. })));
        assert_eq!(pipeline.ticks(), 50);
    }

    #[test]
    fn test_metrics_agree_with_output() {
        let mut pipeline = Pipeline::new(fast_config()).unwrap();
        pipeline.feed(b"zzA");
        pipeline.run_trials(10, 100_000).unwrap();

        let metrics = pipeline.metrics();
        assert_eq!(metrics.trials_completed, 10);
        assert_eq!(metrics.records, 5);
        assert_eq!(metrics.bytes_discarded, 2);
        assert_eq!(metrics.bytes_transmitted, pipeline.output().len() as u64);
        assert_eq!(metrics.bytes_emitted, metrics.bytes_transmitted);
        assert_eq!(metrics.commands_decimal, 15);
        assert_eq!(metrics.commands_verbatim, 5);
    }
}
