//! Action dispatcher and per-packet state machine
//!
//! One `Evaluator` takes one classified packet through one frozen program:
//! it drains an evaluation queue of actions, accumulates the action lists of
//! matched rules for egress, and terminates when both queues are empty. The
//! program is shared read-only; everything mutable (working buffer, decode
//! cursor, key register, queues, decision) is owned by the evaluator, so
//! independent packets can be evaluated on independent threads without
//! locking.

use crate::bits::{self, MAX_REGISTER_WIDTH};
use crate::packet::{Decision, Packet};
use crate::program::{Action, Field, Program, Space, TableId};
use crate::{Error, Result};
use std::collections::VecDeque;
use std::sync::Arc;
use tracing::{debug, trace};

/// Default per-packet step budget for [`Evaluator::run`].
///
/// A goto cycle with no terminating drop or egress would otherwise spin
/// forever; exhausting the budget is a distinct fatal error.
pub const DEFAULT_STEP_BUDGET: u64 = 10_000;

/// Processing phase, for diagnostics and logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Draining a table's preparation actions.
    Preparing,
    /// A match action is being resolved against rule keys.
    Matching,
    /// Draining actions promoted from the pending-egress queue.
    Egress,
    /// Both queues empty; execution has halted.
    Idle,
}

/// Per-packet program evaluator.
#[derive(Debug)]
pub struct Evaluator<'p> {
    program: Arc<Program>,
    packet: &'p Packet,
    /// Byte-exact mutable copy of the packet; all writes land here.
    modified: Vec<u8>,
    /// Byte offset of the current header; moved only by advance actions.
    cursor: usize,
    /// The scalar match register.
    keyreg: u64,
    current: TableId,
    /// Actions not yet executed for the current phase.
    eval: VecDeque<Action>,
    /// Actions contributed by matched rules, awaiting egress promotion.
    pending: Vec<Action>,
    decision: Decision,
    phase: Phase,
    steps: u64,
}

impl<'p> Evaluator<'p> {
    /// Construct an evaluator over a frozen program and a classified packet.
    ///
    /// Loads the first table's preparation actions into the evaluation
    /// queue; the decode cursor starts at the packet's first header.
    pub fn new(program: Arc<Program>, packet: &'p Packet) -> Result<Self> {
        let current = program.first_table().ok_or(Error::EmptyProgram)?;
        let eval: VecDeque<Action> = program.table(current).prep.iter().cloned().collect();

        Ok(Self {
            modified: packet.data().to_vec(),
            cursor: packet.header_offset(),
            keyreg: 0,
            current,
            eval,
            pending: Vec::new(),
            decision: Decision::default(),
            phase: Phase::Preparing,
            steps: 0,
            program,
            packet,
        })
    }

    /// True once both queues are empty; `step` is a no-op from here on.
    pub fn done(&self) -> bool {
        self.eval.is_empty() && self.pending.is_empty()
    }

    /// Execute a single action.
    ///
    /// When the evaluation queue is empty, a non-empty pending-egress queue
    /// is promoted (egress begins); with both queues empty this is an
    /// idempotent no-op returning `Ok(false)`.
    pub fn step(&mut self) -> Result<bool> {
        if self.eval.is_empty() {
            if self.pending.is_empty() {
                self.phase = Phase::Idle;
                return Ok(false);
            }
            debug!(actions = self.pending.len(), "entering egress phase");
            self.eval.extend(self.pending.drain(..));
            self.phase = Phase::Egress;
        }

        let Some(action) = self.eval.pop_front() else {
            return Ok(false);
        };
        self.steps += 1;
        self.dispatch(action)?;
        Ok(true)
    }

    /// Run to completion under the default step budget.
    pub fn run(&mut self) -> Result<()> {
        self.run_bounded(DEFAULT_STEP_BUDGET)
    }

    /// Run to completion, aborting after `budget` executed steps.
    pub fn run_bounded(&mut self, budget: u64) -> Result<()> {
        let mut executed: u64 = 0;
        while self.step()? {
            executed += 1;
            if executed >= budget && !self.done() {
                return Err(Error::StepBudgetExceeded { budget });
            }
        }
        Ok(())
    }

    /// Consume the evaluator, yielding the mutated buffer and the decision.
    pub fn into_output(self) -> (Vec<u8>, Decision) {
        (self.modified, self.decision)
    }

    pub fn decision(&self) -> Decision {
        self.decision
    }

    pub fn modified(&self) -> &[u8] {
        &self.modified
    }

    pub fn key_register(&self) -> u64 {
        self.keyreg
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Actions executed so far.
    pub fn steps(&self) -> u64 {
        self.steps
    }

    pub fn current_table(&self) -> TableId {
        self.current
    }

    fn dispatch(&mut self, action: Action) -> Result<()> {
        trace!(action = ?action, table = %self.program.table(self.current).name, "step");
        match action {
            Action::Advance { amount } => self.eval_advance(amount),
            Action::Copy { src, dst, width } => self.eval_copy(src, dst, width),
            Action::Set {
                field,
                value,
                width,
            } => self.eval_set(field, value, width),
            Action::Write(inner) => {
                self.eval.push_back(*inner);
                Ok(())
            }
            Action::Clear => {
                self.eval.clear();
                Ok(())
            }
            Action::Drop => {
                debug!(cancelled = self.pending.len(), "drop: egress cancelled");
                self.pending.clear();
                Ok(())
            }
            Action::Match => self.eval_match(),
            Action::Goto(target) => self.eval_goto(target),
            Action::Output { port } => {
                debug!(port, "output port recorded");
                self.decision.set_output_port(port);
                Ok(())
            }
        }
    }

    fn eval_advance(&mut self, amount: i64) -> Result<()> {
        let cursor = self.cursor as i64 + amount;
        if cursor < 0 {
            return Err(Error::CursorUnderflow {
                cursor: self.cursor,
                amount,
            });
        }
        self.cursor = cursor as usize;
        trace!(cursor = self.cursor, "advance");
        Ok(())
    }

    /// Copy between spaces.
    ///
    /// The copy width is validated against both declared field widths, which
    /// must agree; the effect then moves the declared width. Key extractions
    /// honor the source position; buffer-to-buffer copies read the source
    /// space from its start at the destination's intra-byte alignment.
    fn eval_copy(&mut self, src: Field, dst: Field, width: u32) -> Result<()> {
        if src.space == Space::Key {
            return Err(Error::CopyFromKey);
        }
        if width > src.width || width > dst.width {
            return Err(Error::CopyOverflow {
                width,
                src: src.width,
                dst: dst.width,
            });
        }
        if src.width != dst.width {
            return Err(Error::CopyWidthMismatch {
                src: src.width,
                dst: dst.width,
            });
        }

        match dst.space {
            Space::Key => {
                if src.width == 0 || src.width > MAX_REGISTER_WIDTH {
                    return Err(Error::ScalarTooWide { width: src.width });
                }
                let base = match src.space {
                    Space::Packet => 0,
                    Space::Header => self.cursor * 8,
                    Space::Meta | Space::Key => {
                        return Err(Error::UnsupportedCopy {
                            src: src.space,
                            dst: dst.space,
                        });
                    }
                };
                let pos = base + src.pos as usize;
                check_bounds(pos, src.width, self.packet.data().len())?;
                self.keyreg = bits::extract(self.packet.data(), pos, src.width as usize);
                trace!(keyreg = format_args!("{:#x}", self.keyreg), "key register loaded");
                Ok(())
            }
            Space::Header => {
                if src.space != Space::Packet {
                    return Err(Error::UnsupportedCopy {
                        src: src.space,
                        dst: dst.space,
                    });
                }
                let pos = self.cursor * 8 + dst.pos as usize;
                check_bounds(pos, dst.width, self.modified.len())?;
                bits::copy_bits(
                    &mut self.modified,
                    self.packet.data(),
                    pos,
                    dst.width as usize,
                );
                Ok(())
            }
            Space::Meta => Ok(()),
            Space::Packet => {
                if src.space != Space::Header {
                    return Err(Error::UnsupportedCopy {
                        src: src.space,
                        dst: dst.space,
                    });
                }
                check_bounds(dst.pos as usize, dst.width, self.modified.len())?;
                // The source read starts at the cursor and spans the copied
                // field at the destination's alignment.
                check_bounds(
                    self.cursor * 8 + dst.pos as usize % 8,
                    dst.width,
                    self.packet.data().len(),
                )?;
                bits::copy_bits(
                    &mut self.modified,
                    &self.packet.data()[self.cursor..],
                    dst.pos as usize,
                    dst.width as usize,
                );
                Ok(())
            }
        }
    }

    fn eval_set(&mut self, field: Field, value: u64, width: u32) -> Result<()> {
        if width == 0 || width > MAX_REGISTER_WIDTH {
            return Err(Error::ScalarTooWide { width });
        }
        let pos = match field.space {
            Space::Packet => field.pos as usize,
            Space::Header => self.cursor * 8 + field.pos as usize,
            Space::Meta => return Ok(()),
            Space::Key => return Err(Error::UnsupportedSet(Space::Key)),
        };
        check_bounds(pos, width, self.modified.len())?;
        bits::deposit(&mut self.modified, value, pos, width as usize);
        Ok(())
    }

    /// Resolve the current table's rules against the key register.
    ///
    /// Every matching rule fires: its whole action list is appended, in
    /// declaration order, to the pending-egress queue.
    fn eval_match(&mut self) -> Result<()> {
        self.phase = Phase::Matching;
        let table = self.program.table(self.current);
        let mut matched = 0usize;
        for rule in &table.rules {
            if rule.key.matches(self.keyreg) {
                matched += 1;
                self.pending.extend(rule.actions.iter().cloned());
            }
        }
        debug!(
            table = %table.name,
            keyreg = format_args!("{:#x}", self.keyreg),
            matched,
            "match resolved"
        );
        Ok(())
    }

    /// Switch tables. Goto terminates its table's phase: the evaluation
    /// queue must already be drained when it executes.
    fn eval_goto(&mut self, target: TableId) -> Result<()> {
        if !self.eval.is_empty() {
            let name = self.program.table(target).name.clone();
            return Err(Error::GotoWithPendingActions(name));
        }
        self.current = target;
        self.phase = Phase::Preparing;
        let table = self.program.table(target);
        debug!(table = %table.name, "goto");
        self.eval.extend(table.prep.iter().cloned());
        Ok(())
    }
}

fn check_bounds(pos: usize, width: u32, len: usize) -> Result<()> {
    if pos + width as usize > len * 8 {
        return Err(Error::FieldOutOfBounds { pos, width, len });
    }
    Ok(())
}
