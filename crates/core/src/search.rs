//! Record search controller.
//!
//! The controller waits for the start byte `'A'` on the inbound queue, then
//! loops forever over trial values 1, 2, 3, ...:
//!
//! ```text
//! AwaitStart --'A'--> Increment -> Load -> Compute --done--+--> Report --> Increment
//!     ^   |                                  ^   |         |
//!     +---+ other bytes discarded            +---+ advance +--> Increment (nothing to say)
//! ```
//!
//! A finished trial is reported when it sets a new record (strictly longer
//! than every earlier converged trial) or when it ended in overflow or
//! exhaustion. Each report is four commands queued for the encoder, one per
//! tick while the command queue has room:
//!
//! ```text
//! record:      Decimal(index)  Decimal(length)  Decimal(trial)  CR LF BEL
//! overflow:    "X "            Decimal(length)  Decimal(trial)  CR LF BEL
//! exhaustion:  "N "            Decimal(length)  Decimal(trial)  CR LF BEL
//! ```
//!
//! The trial counter is W bits wide and additionally capped at the largest
//! ten-digit decimal so every trial can be reported; it wraps back to 1.

use crate::command::Command;
use crate::error::Result;
use crate::queue::FlowQueue;
use crate::trajectory::{Outcome, TrajectoryEngine};
use crate::widths::Widths;
use tracing::{debug, info, trace, warn};

/// Inbound byte that starts the search.
pub const START_BYTE: u8 = b'A';

/// Marker printed ahead of an overflow report.
pub const OVERFLOW_MARKER: &[u8] = b"X ";

/// Marker printed ahead of an exhaustion report.
pub const EXHAUSTED_MARKER: &[u8] = b"N ";

/// Commands in every report.
const REPORT_LEN: usize = 4;

/// Best trajectory seen so far.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RecordState {
    /// Length of the longest converged trajectory
    pub best_length: u32,
    /// Trial that produced it
    pub best_trial: u64,
    /// Records set so far
    pub record_count: u64,
}

/// Per-controller counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SearchStats {
    pub trials_completed: u64,
    pub records: u64,
    pub overflows: u64,
    pub exhaustions: u64,
    pub bytes_discarded: u64,
    pub engine_steps: u64,
    pub stall_ticks: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SearchState {
    AwaitStart,
    Increment,
    Load,
    Compute,
    Report {
        commands: [Command; REPORT_LEN],
        next: usize,
    },
}

/// What the controller did during one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchStep {
    /// Waiting for the start byte
    Waiting,
    /// Moved the search forward
    Busy,
    /// A trial finished with the given outcome
    Finished(Outcome),
    /// A report command waited on a full command queue
    Stalled,
}

/// Top-level search loop driving one trajectory engine.
#[derive(Debug, Clone)]
pub struct SearchController {
    engine: TrajectoryEngine,
    state: SearchState,
    trial: u64,
    trial_limit: u64,
    record: RecordState,
    stats: SearchStats,
}

impl SearchController {
    /// Create a controller waiting for the start byte.
    pub fn new(widths: Widths) -> Self {
        Self {
            engine: TrajectoryEngine::new(widths),
            state: SearchState::AwaitStart,
            trial: 0,
            trial_limit: widths.trial_limit(),
            record: RecordState::default(),
            stats: SearchStats::default(),
        }
    }

    /// Run one tick: read `inbound` while idle, queue report records into
    /// `commands`.
    ///
    /// # Errors
    /// Only if the engine rejects a trial, which the wrapping counter rules
    /// out.
    pub fn tick(
        &mut self,
        inbound: &mut FlowQueue<u8>,
        commands: &mut FlowQueue<u64>,
    ) -> Result<SearchStep> {
        match self.state {
            SearchState::AwaitStart => Ok(self.await_start(inbound)),
            SearchState::Increment => {
                self.trial = self.next_trial();
                self.state = SearchState::Load;
                Ok(SearchStep::Busy)
            }
            SearchState::Load => {
                self.engine.load(self.trial)?;
                self.state = SearchState::Compute;
                Ok(SearchStep::Busy)
            }
            SearchState::Compute => match self.engine.outcome() {
                Some(outcome) => self.finish_trial(outcome),
                None => {
                    self.engine.advance();
                    self.stats.engine_steps += 1;
                    Ok(SearchStep::Busy)
                }
            },
            SearchState::Report { commands: report, next } => {
                if !commands.writable() {
                    self.stats.stall_ticks += 1;
                    trace!(next, "report stalled on full command queue");
                    return Ok(SearchStep::Stalled);
                }
                commands.push(report[next].pack())?;
                self.state = if next + 1 < REPORT_LEN {
                    SearchState::Report {
                        commands: report,
                        next: next + 1,
                    }
                } else {
                    SearchState::Increment
                };
                Ok(SearchStep::Busy)
            }
        }
    }

    fn await_start(&mut self, inbound: &mut FlowQueue<u8>) -> SearchStep {
        let Ok(byte) = inbound.pop() else {
            return SearchStep::Waiting;
        };
        if byte == START_BYTE {
            info!(first_trial = self.next_trial(), "search started");
            self.state = SearchState::Increment;
            SearchStep::Busy
        } else {
            self.stats.bytes_discarded += 1;
            SearchStep::Waiting
        }
    }

    fn finish_trial(&mut self, outcome: Outcome) -> Result<SearchStep> {
        self.stats.trials_completed += 1;
        let trial = self.trial;
        let length = outcome.steps();

        let report = match outcome {
            Outcome::Converged { steps } if steps > self.record.best_length => {
                self.record.best_length = steps;
                self.record.best_trial = trial;
                self.record.record_count += 1;
                self.stats.records += 1;
                debug!(index = self.record.record_count, length, trial, "new record");
                Some([
                    Command::decimal(self.record.record_count)?,
                    Command::decimal(length as u64)?,
                    Command::decimal(trial)?,
                    Command::trailer(),
                ])
            }
            Outcome::Converged { .. } => None,
            Outcome::Overflow { .. } => {
                self.stats.overflows += 1;
                warn!(length, trial, "trial overflowed the value width");
                Some(error_report(OVERFLOW_MARKER, length, trial)?)
            }
            Outcome::Exhausted { .. } => {
                self.stats.exhaustions += 1;
                warn!(length, trial, "trial exhausted the step budget");
                Some(error_report(EXHAUSTED_MARKER, length, trial)?)
            }
        };

        self.state = match report {
            Some(commands) => SearchState::Report { commands, next: 0 },
            None => SearchState::Increment,
        };
        Ok(SearchStep::Finished(outcome))
    }

    fn next_trial(&self) -> u64 {
        if self.trial >= self.trial_limit {
            1
        } else {
            self.trial + 1
        }
    }

    /// Whether the start byte has been seen.
    pub fn is_started(&self) -> bool {
        self.state != SearchState::AwaitStart
    }

    /// Whether a report is partway through being queued.
    pub fn is_reporting(&self) -> bool {
        matches!(self.state, SearchState::Report { .. })
    }

    /// Current (or most recent) trial value.
    pub fn trial(&self) -> u64 {
        self.trial
    }

    /// Best trajectory seen so far.
    pub fn record(&self) -> RecordState {
        self.record
    }

    /// Counters since construction.
    pub fn stats(&self) -> SearchStats {
        self.stats
    }

    /// The engine, for trace inspection.
    pub fn engine(&self) -> &TrajectoryEngine {
        &self.engine
    }
}

fn error_report(marker: &[u8], length: u32, trial: u64) -> Result<[Command; REPORT_LEN]> {
    Ok([
        Command::verbatim(marker)?,
        Command::decimal(length as u64)?,
        Command::decimal(trial)?,
        Command::trailer(),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Harness {
        controller: SearchController,
        inbound: FlowQueue<u8>,
        commands: FlowQueue<u64>,
        drained: Vec<Command>,
    }

    impl Harness {
        fn new(value_bits: u32, step_bits: u32) -> Self {
            Self {
                controller: SearchController::new(Widths::new(value_bits, step_bits).unwrap()),
                inbound: FlowQueue::new(8),
                commands: FlowQueue::new(16),
                drained: Vec::new(),
            }
        }

        fn send(&mut self, byte: u8) {
            self.inbound.push(byte).unwrap();
            self.inbound.commit();
        }

        /// Tick until `trials` trials completed, draining commands as they come.
        fn run_trials(&mut self, trials: u64) {
            for _ in 0..1_000_000 {
                self.controller.tick(&mut self.inbound, &mut self.commands).unwrap();
                if let Ok(record) = self.commands.pop() {
                    self.drained.push(Command::unpack(record).unwrap());
                }
                self.inbound.commit();
                self.commands.commit();
                let done = self.controller.stats().trials_completed >= trials;
                if done && !self.controller.is_reporting() && self.commands.is_empty() {
                    return;
                }
            }
            panic!("search did not complete {trials} trials");
        }
    }

    #[test]
    fn test_waits_for_start_byte() {
        let mut h = Harness::new(34, 12);
        for byte in [b'x', b'a', b'\n'] {
            h.send(byte);
            let step = h.controller.tick(&mut h.inbound, &mut h.commands).unwrap();
            assert_eq!(step, SearchStep::Waiting);
            h.inbound.commit();
        }
        assert!(!h.controller.is_started());
        assert_eq!(h.controller.stats().bytes_discarded, 3);

        h.send(START_BYTE);
        h.controller.tick(&mut h.inbound, &mut h.commands).unwrap();
        assert!(h.controller.is_started());
    }

    #[test]
    fn test_first_records() {
        let mut h = Harness::new(34, 12);
        h.send(START_BYTE);
        h.run_trials(27);

        // Records: 2 (1), 3 (7), 6 (8), 7 (16), 9 (19), 18 (20), 25 (23), 27 (111)
        let expected = [
            (1, 1, 2),
            (2, 7, 3),
            (3, 8, 6),
            (4, 16, 7),
            (5, 19, 9),
            (6, 20, 18),
            (7, 23, 25),
            (8, 111, 27),
        ];
        assert_eq!(h.drained.len(), expected.len() * REPORT_LEN);
        for (report, &(index, length, trial)) in h.drained.chunks(REPORT_LEN).zip(expected.iter()) {
            assert_eq!(
                report,
                &[
                    Command::Decimal(index),
                    Command::Decimal(length),
                    Command::Decimal(trial),
                    Command::trailer(),
                ]
            );
        }

        let record = h.controller.record();
        assert_eq!(record.best_length, 111);
        assert_eq!(record.best_trial, 27);
        assert_eq!(record.record_count, 8);
    }

    #[test]
    fn test_overflow_report() {
        // 27 is the first trial whose trajectory needs 14 bits
        let mut h = Harness::new(13, 12);
        h.send(START_BYTE);
        h.run_trials(27);

        let last = &h.drained[h.drained.len() - REPORT_LEN..];
        assert_eq!(last[0], Command::verbatim(b"X ").unwrap());
        assert_eq!(last[2], Command::Decimal(27));
        assert_eq!(last[3], Command::trailer());
        assert_eq!(h.controller.stats().overflows, 1);
        assert_eq!(h.controller.record().best_trial, 25);
    }

    #[test]
    fn test_exhaustion_report() {
        // Budget 62 steps: 27 (111 steps) is the first trial over it
        let mut h = Harness::new(34, 6);
        h.send(START_BYTE);
        h.run_trials(27);

        let last = &h.drained[h.drained.len() - REPORT_LEN..];
        assert_eq!(last[0], Command::verbatim(b"N ").unwrap());
        let Command::Decimal(length) = last[1] else {
            panic!("length should be decimal, got {:?}", last[1]);
        };
        assert!((62..=63).contains(&length));
        assert_eq!(last[2], Command::Decimal(27));
        assert_eq!(h.controller.stats().exhaustions, 1);
    }

    #[test]
    fn test_stalls_on_full_command_queue() {
        let mut controller = SearchController::new(Widths::default());
        let mut inbound = FlowQueue::new(1);
        let mut commands = FlowQueue::new(1);
        inbound.push(START_BYTE).unwrap();
        inbound.commit();

        // Nobody drains the command queue: the first report fills it
        for _ in 0..100 {
            controller.tick(&mut inbound, &mut commands).unwrap();
            inbound.commit();
            commands.commit();
        }
        assert!(controller.is_reporting());
        assert_eq!(commands.len(), 1);
        assert!(controller.stats().stall_ticks > 0);
        assert_eq!(controller.stats().trials_completed, 2);
    }

    #[test]
    fn test_trial_wraps_to_one() {
        let mut controller = SearchController::new(Widths::new(3, 6).unwrap());
        let mut inbound = FlowQueue::new(1);
        let mut commands = FlowQueue::new(64);
        inbound.push(START_BYTE).unwrap();
        inbound.commit();

        let mut seen = Vec::new();
        for _ in 0..2_000 {
            controller.tick(&mut inbound, &mut commands).unwrap();
            let _ = commands.pop();
            inbound.commit();
            commands.commit();
            if controller.trial() != 0 && seen.last() != Some(&controller.trial()) {
                seen.push(controller.trial());
            }
            if seen.len() >= 10 {
                break;
            }
        }
        assert_eq!(&seen[..10], &[1, 2, 3, 4, 5, 6, 7, 1, 2, 3]);
    }
}
