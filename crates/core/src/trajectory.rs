//! Collatz trajectory engine with fixed-width overflow and step budgets.
//!
//! The engine computes one Collatz step per `advance()`:
//!
//! ```text
//! value      condition                    next value          steps
//! ---------  ---------------------------  ------------------  -------
//! > 1        steps >= 2^C - 2             1 (exhausted)       steps
//! > 1, odd   top two bits clear           (3·value + 1) >> 1  steps+2
//! > 1, odd   either top bit set           1 (overflow)        steps
//! > 1, even                               value >> 1          steps+1
//! == 1                                    1 (done)            steps
//! ```
//!
//! An odd value is always followed by an even one, so the odd branch folds
//! the halving into the same step and counts two. The headroom test is
//! deliberately conservative: some values with a top bit set would still
//! fit after `(3v+1) >> 1`, but they are reported as overflow all the same.
//!
//! Both error outcomes force the value to 1 so the run ends on the next
//! check. They are outcomes of a trial, not failures of the engine.
//!
//! # Trace
//!
//! Every effective step writes the pre-step value into a trace arena of
//! `2^C` slots, addressed by the pre-step counter. Slots are tagged with the
//! run that wrote them, so a fresh `load` invalidates the previous run's
//! entries without clearing the arena.

use crate::error::{EngineError, Result};
use crate::widths::Widths;

/// Lifecycle of one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Nothing loaded since construction
    Idle,
    /// A trial was loaded but not yet advanced; a loaded 1 is not done
    Loaded,
    /// At least one advance has happened and the value is above 1
    Running,
    /// The value reached 1 (naturally or forced by an error)
    Done,
}

/// How a finished run ended, with its trajectory length.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The trajectory reached 1 in `steps` steps
    Converged { steps: u32 },
    /// An odd value lacked headroom after `steps` steps
    Overflow { steps: u32 },
    /// The step budget ran out at `steps` steps
    Exhausted { steps: u32 },
}

impl Outcome {
    /// Trajectory length as counted when the run ended.
    pub fn steps(&self) -> u32 {
        match *self {
            Outcome::Converged { steps }
            | Outcome::Overflow { steps }
            | Outcome::Exhausted { steps } => steps,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct TraceSlot {
    run: u64,
    value: u64,
}

/// Step-indexed record of the values visited by the current run.
#[derive(Debug, Clone)]
pub struct TrajectoryTrace {
    slots: Vec<TraceSlot>,
    /// Identifier of the current run; 0 means no run has started
    run: u64,
}

impl TrajectoryTrace {
    fn new(len: usize) -> Self {
        Self {
            slots: vec![TraceSlot::default(); len],
            run: 0,
        }
    }

    fn begin_run(&mut self) {
        self.run += 1;
    }

    fn record(&mut self, step: u32, value: u64) {
        // The counter never exceeds 2^C - 1, the last slot
        if let Some(slot) = self.slots.get_mut(step as usize) {
            *slot = TraceSlot {
                run: self.run,
                value,
            };
        }
    }

    /// Value recorded at `step` during the current run, if any.
    ///
    /// Odd steps advance the counter by two, so the slot after every odd
    /// value stays empty.
    pub fn get(&self, step: u32) -> Option<u64> {
        self.slots
            .get(step as usize)
            .filter(|slot| self.run != 0 && slot.run == self.run)
            .map(|slot| slot.value)
    }

    /// `(step, value)` pairs written during the current run, in step order.
    pub fn entries(&self) -> impl Iterator<Item = (u32, u64)> + '_ {
        let run = self.run;
        self.slots
            .iter()
            .enumerate()
            .filter(move |(_, slot)| run != 0 && slot.run == run)
            .map(|(step, slot)| (step as u32, slot.value))
    }

    /// Number of slots in the arena, `2^C`.
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }
}

/// Stateful one-step-per-advance Collatz engine.
#[derive(Debug, Clone)]
pub struct TrajectoryEngine {
    widths: Widths,
    value: u64,
    steps: u32,
    overflow: bool,
    exhausted: bool,
    phase: Phase,
    trace: TrajectoryTrace,
}

impl TrajectoryEngine {
    /// Create an idle engine for the given widths.
    pub fn new(widths: Widths) -> Self {
        Self {
            widths,
            value: 0,
            steps: 0,
            overflow: false,
            exhausted: false,
            phase: Phase::Idle,
            trace: TrajectoryTrace::new(widths.trace_len()),
        }
    }

    /// Start a new run from `initial`, clearing the step counter and both
    /// error flags.
    ///
    /// # Errors
    /// - `EngineError::ZeroTrial` for 0, which never reaches 1
    /// - `EngineError::TrialTooWide` if `initial` does not fit in W bits
    pub fn load(&mut self, initial: u64) -> Result<()> {
        if initial == 0 {
            return Err(EngineError::ZeroTrial.into());
        }
        if initial & !self.widths.value_mask() != 0 {
            return Err(EngineError::TrialTooWide {
                value: initial,
                bits: self.widths.value_bits(),
            }
            .into());
        }

        self.value = initial;
        self.steps = 0;
        self.overflow = false;
        self.exhausted = false;
        self.phase = Phase::Loaded;
        self.trace.begin_run();
        Ok(())
    }

    /// Perform one step. A no-op unless a run is loaded or running.
    pub fn advance(&mut self) {
        if !matches!(self.phase, Phase::Loaded | Phase::Running) {
            return;
        }

        if self.value > 1 {
            self.trace.record(self.steps, self.value);

            if self.steps >= self.widths.step_budget() {
                self.exhausted = true;
                self.value = 1;
            } else if self.value & 1 == 1 {
                if self.value & self.widths.headroom_mask() == 0 {
                    // Top two bits clear: 3v+1 < 2^W, no wrap possible
                    self.value = (3 * self.value + 1) >> 1;
                    self.steps += 2;
                } else {
                    self.overflow = true;
                    self.value = 1;
                }
            } else {
                self.value >>= 1;
                self.steps += 1;
            }
        }

        debug_assert!(self.steps <= self.widths.max_steps());
        self.phase = if self.value == 1 {
            Phase::Done
        } else {
            Phase::Running
        };
    }

    /// Load `initial` and advance until done.
    ///
    /// Always terminates: every advance either grows the step counter or
    /// forces the value to 1, and the counter is bounded by `2^C - 2`.
    pub fn run(&mut self, initial: u64) -> Result<Outcome> {
        self.load(initial)?;
        loop {
            self.advance();
            if let Some(outcome) = self.outcome() {
                return Ok(outcome);
            }
        }
    }

    /// Whether the current run has finished.
    pub fn is_done(&self) -> bool {
        self.phase == Phase::Done
    }

    /// How the current run ended, once done.
    pub fn outcome(&self) -> Option<Outcome> {
        if !self.is_done() {
            return None;
        }
        let steps = self.steps;
        Some(if self.overflow {
            Outcome::Overflow { steps }
        } else if self.exhausted {
            Outcome::Exhausted { steps }
        } else {
            Outcome::Converged { steps }
        })
    }

    /// Current element of the trajectory.
    pub fn value(&self) -> u64 {
        self.value
    }

    /// Steps taken so far.
    pub fn steps(&self) -> u32 {
        self.steps
    }

    /// Sticky overflow flag of the current run.
    pub fn overflow(&self) -> bool {
        self.overflow
    }

    /// Sticky exhaustion flag of the current run.
    pub fn exhausted(&self) -> bool {
        self.exhausted
    }

    /// Lifecycle state of the current run.
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Values recorded during the current run.
    pub fn trace(&self) -> &TrajectoryTrace {
        &self.trace
    }

    /// Widths the engine was built for.
    pub fn widths(&self) -> Widths {
        self.widths
    }
}
