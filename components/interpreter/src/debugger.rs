//! Debugger hooks and line stepping
//!
//! An attached [`Debugger`] is ticked once before every instruction and may
//! inspect or drive the VM from there. [`StepTracker`] holds the stepping
//! rules so debugger front ends only decide when to start a step.

use bytecode_system::{Bytecode, BytecodeStream};
use core_types::Result;

use crate::frame::Frame;
use crate::vm::Vm;

/// Interactive collaborator of the dispatch loop
pub trait Debugger<F: Frame> {
    /// Called once when attached
    fn on_attach(&mut self) {}

    /// Called once when detached
    fn on_detach(&mut self) {}

    /// Called before each instruction
    fn tick(&mut self, vm: &mut Vm<F>) -> Result<()>;

    /// Receives the disassembly of each instruction when
    /// [`Debugger::trace_enabled`] is set
    fn trace(&mut self, _line: &str) {}

    /// Whether to feed [`Debugger::trace`]
    fn trace_enabled(&self) -> bool {
        false
    }

    /// Request a pause at the next tick
    fn break_execution(&mut self);

    /// Whether the debugger itself is running code (an evaluated
    /// expression); errors then pass straight through
    fn execution_is_inline(&self) -> bool {
        false
    }
}

/// What a step command is waiting for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StepIntent {
    /// Not stepping
    #[default]
    None,
    /// Next statement
    In,
    /// Next statement at the same depth or shallower
    Over,
    /// Next statement in a caller
    Out,
    /// Next statement after the current section is left
    Finish,
    /// Next instruction
    InstructionIn,
    /// Next instruction at the same depth or shallower
    InstructionOver,
    /// Next instruction in a caller
    InstructionOut,
    /// Next instruction after the current section is left
    InstructionFinish,
}

/// Line-step state machine
#[derive(Debug, Clone, Default)]
pub struct StepTracker {
    intent: StepIntent,
    depth: usize,
    section: Option<Bytecode>,
}

impl StepTracker {
    /// Idle tracker
    pub fn new() -> Self {
        Self::default()
    }

    /// Current intent
    pub fn intent(&self) -> StepIntent {
        self.intent
    }

    /// Start a step from program counter `pc` at call depth `depth`
    pub fn begin(&mut self, intent: StepIntent, pc: &BytecodeStream, depth: usize) {
        self.intent = intent;
        self.depth = depth;
        self.section = Some(pc.bytecode().clone());
    }

    /// Abandon the current step
    pub fn cancel(&mut self) {
        self.intent = StepIntent::None;
        self.section = None;
    }

    /// Whether the step is satisfied at `pc` and `depth`.
    ///
    /// A satisfied step resets the intent to [`StepIntent::None`].
    pub fn should_pause(&mut self, pc: &BytecodeStream, depth: usize) -> bool {
        let exact_line = pc
            .bytecode()
            .debug_symbols
            .as_ref()
            .is_some_and(|symbols| symbols.is_statement_start(pc.position()));
        let left_section = depth < self.depth
            || (depth == self.depth
                && !self
                    .section
                    .as_ref()
                    .is_some_and(|section| section.same_section(pc.bytecode())));

        let pause = match self.intent {
            StepIntent::None => false,
            StepIntent::In => exact_line,
            StepIntent::Over => exact_line && depth <= self.depth,
            StepIntent::Out => exact_line && depth < self.depth,
            StepIntent::Finish => exact_line && left_section,
            StepIntent::InstructionIn => true,
            StepIntent::InstructionOver => depth <= self.depth,
            StepIntent::InstructionOut => depth < self.depth,
            StepIntent::InstructionFinish => left_section,
        };
        if pause {
            self.cancel();
        }
        pause
    }
}
