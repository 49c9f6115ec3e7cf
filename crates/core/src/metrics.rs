//! Metrics collection and reporting for the search pipeline.
//!
//! This module provides observable insights into system behavior:
//! - Search progress (trials, records, error trials)
//! - Encoder throughput by command tag
//! - Backpressure (stall ticks on both sides of the command queue)
//! - Link traffic in both directions
//!
//! # Design
//!
//! Each stage keeps its own counters; `Pipeline::metrics()` gathers them into
//! one `Metrics` snapshot. The snapshot is plain data and cheap to copy.

use std::time::Duration;

/// Counter snapshot across every pipeline stage.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Metrics {
    // === Timing ===
    /// Wall-clock time since the pipeline was built
    pub duration: Duration,

    /// Ticks simulated
    pub ticks: u64,

    // === Search ===
    /// Trials whose trajectory finished
    pub trials_completed: u64,

    /// New records reported
    pub records: u64,

    /// Trials that exceeded the value width
    pub overflows: u64,

    /// Trials that ran out of step budget
    pub exhaustions: u64,

    /// Engine advances across all trials
    pub engine_steps: u64,

    /// Ticks a report waited on a full command queue
    pub controller_stall_ticks: u64,

    // === Encoder ===
    pub commands_verbatim: u64,
    pub commands_decimal: u64,
    pub commands_hex: u64,
    pub commands_hex_spaced: u64,

    /// Records dropped for an unknown tag
    pub commands_rejected: u64,

    /// Bytes pushed into the tx queue
    pub bytes_emitted: u64,

    /// Ticks the encoder waited on a full tx queue
    pub encoder_stall_ticks: u64,

    // === Link ===
    /// Inbound bytes accepted into the rx queue
    pub bytes_received: u64,

    /// Inbound bytes read and ignored before the start byte
    pub bytes_discarded: u64,

    /// Inbound bytes lost to a full rx queue
    pub bytes_dropped: u64,

    /// Bytes the transmitter finished sending
    pub bytes_transmitted: u64,
}

impl Metrics {
    /// Commands dispatched, all tags.
    pub fn commands(&self) -> u64 {
        self.commands_verbatim
            + self.commands_decimal
            + self.commands_hex
            + self.commands_hex_spaced
    }

    /// Fraction of ticks the encoder spent stalled.
    pub fn encoder_stall_rate(&self) -> f64 {
        if self.ticks == 0 {
            0.0
        } else {
            self.encoder_stall_ticks as f64 / self.ticks as f64
        }
    }

    /// Average engine advances per completed trial.
    pub fn steps_per_trial(&self) -> f64 {
        if self.trials_completed == 0 {
            0.0
        } else {
            self.engine_steps as f64 / self.trials_completed as f64
        }
    }

    /// Simulated ticks per wall-clock second.
    pub fn ticks_per_sec(&self) -> f64 {
        let secs = self.duration.as_secs_f64();
        if secs == 0.0 {
            0.0
        } else {
            self.ticks as f64 / secs
        }
    }

    /// Print a human-readable summary to stdout.
    pub fn print_summary(&self) {
        println!("\n=== Search Summary ===");
        println!("Duration: {} ms", self.duration.as_millis());
        println!("Ticks: {}", self.ticks);
        println!();

        println!("=== Search ===");
        println!("Trials completed: {}", self.trials_completed);
        println!("Records: {}", self.records);
        println!("Overflow trials: {}", self.overflows);
        println!("Exhausted trials: {}", self.exhaustions);
        println!("Steps per trial: {:.1}", self.steps_per_trial());
        println!("Report stall ticks: {}", self.controller_stall_ticks);
        println!();

        println!("=== Encoder ===");
        println!(
            "Commands: {} (verbatim {}, decimal {}, hex {}, hex spaced {})",
            self.commands(),
            self.commands_verbatim,
            self.commands_decimal,
            self.commands_hex,
            self.commands_hex_spaced
        );
        println!("Rejected records: {}", self.commands_rejected);
        println!("Bytes emitted: {}", self.bytes_emitted);
        println!(
            "Stall ticks: {} ({:.2}%)",
            self.encoder_stall_ticks,
            self.encoder_stall_rate() * 100.0
        );
        println!();

        println!("=== Link ===");
        println!("Bytes received: {}", self.bytes_received);
        println!("Bytes discarded: {}", self.bytes_discarded);
        println!("Bytes dropped: {}", self.bytes_dropped);
        println!("Bytes transmitted: {}", self.bytes_transmitted);
        println!();

        println!("=== Performance ===");
        println!("Throughput: {:.2} Mticks/s", self.ticks_per_sec() / 1_000_000.0);
        println!();
    }

    /// Export metrics as a simple text format (for parsing/testing).
    pub fn export_text(&self) -> String {
        format!(
            "duration_ms={}\n\
             ticks={}\n\
             trials_completed={}\n\
             records={}\n\
             overflows={}\n\
             exhaustions={}\n\
             commands={}\n\
             commands_rejected={}\n\
             bytes_emitted={}\n\
             encoder_stall_ticks={}\n\
             controller_stall_ticks={}\n\
             bytes_dropped={}\n\
             bytes_transmitted={}\n",
            self.duration.as_millis(),
            self.ticks,
            self.trials_completed,
            self.records,
            self.overflows,
            self.exhaustions,
            self.commands(),
            self.commands_rejected,
            self.bytes_emitted,
            self.encoder_stall_ticks,
            self.controller_stall_ticks,
            self.bytes_dropped,
            self.bytes_transmitted,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_rates_are_zero() {
        let metrics = Metrics::default();
        assert_eq!(metrics.encoder_stall_rate(), 0.0);
        assert_eq!(metrics.steps_per_trial(), 0.0);
        assert_eq!(metrics.ticks_per_sec(), 0.0);
    }

    #[test]
    fn test_commands_total() {
        let metrics = Metrics {
            commands_verbatim: 2,
            commands_decimal: 6,
            commands_hex: 1,
            commands_hex_spaced: 1,
            ..Metrics::default()
        };
        assert_eq!(metrics.commands(), 10);
    }

    #[test]
    fn test_stall_rate() {
        let metrics = Metrics {
            ticks: 200,
            encoder_stall_ticks: 50,
            ..Metrics::default()
        };
        assert_eq!(metrics.encoder_stall_rate(), 0.25);
    }

    #[test]
    fn test_export_text() {
        let metrics = Metrics {
            ticks: 1000,
            trials_completed: 27,
            records: 8,
            ..Metrics::default()
        };

        let text = metrics.export_text();
        assert!(text.contains("ticks=1000\n"));
        assert!(text.contains("trials_completed=27\n"));
        assert!(text.contains("records=8\n"));
    }
}
