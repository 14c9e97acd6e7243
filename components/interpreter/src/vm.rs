//! Virtual machine: the context object threaded through every call
//!
//! A [`Vm`] owns the executor state, the host frame, the garbage collector,
//! the loaded bytecode and the native table. Natives and debuggers receive
//! `&mut Vm` and may call back into bytecode, which recurses into the
//! dispatch loop.

use bytecode_system::{disassemble_at, Bytecode, BytecodeTable};
use core_types::{Value, VmError};
use memory_manager::{Collector, NodeId};

use crate::config::VmConfig;
use crate::debugger::Debugger;
use crate::dispatch::Flow;
use crate::error::{format_trace, ExecutionError, Failure, TraceEntry};
use crate::executor::Executor;
use crate::frame::Frame;
use crate::native::{NativeFn, NativeTable};

/// Outcome of running bytecode to a stopping point
#[derive(Debug, Clone, PartialEq)]
pub enum Execution {
    /// The call returned these values, first result first
    Finished(Vec<Value>),
    /// A `sus` instruction paused execution; see [`Vm::resume`]
    Suspended,
}

/// Bytecode interpreter bound to a host frame
pub struct Vm<F: Frame> {
    pub(crate) executor: Executor,
    pub(crate) frame: F,
    pub(crate) gc: Option<Collector>,
    pub(crate) bytecode: BytecodeTable,
    pub(crate) natives: NativeTable<F>,
    pub(crate) config: VmConfig,
    debugger: Option<Box<dyn Debugger<F>>>,
    ticking: bool,
    detach_pending: bool,
    pub(crate) run_depth: usize,
    suspended: Option<u8>,
}

impl<F: Frame> Vm<F> {
    /// VM with the default configuration
    ///
    /// # Examples
    ///
    /// ```
    /// use bytecode_system::{Assembler, Opcode};
    /// use core_types::Value;
    /// use interpreter::{BasicFrame, Execution, Vm};
    ///
    /// let mut vm = Vm::new(BasicFrame::new());
    /// let mut asm = Assembler::named("answer");
    /// asm.op_u32(Opcode::All, 0).ldi_s32(40).ldi_s32(2).op(Opcode::Add2).ret(1);
    /// let index = vm.add_bytecode(asm.finish(1, Some(0)).unwrap());
    ///
    /// let result = vm.call_bytecode(index, &[]).unwrap();
    /// assert_eq!(result, Execution::Finished(vec![Value::Int32(42)]));
    /// ```
    pub fn new(frame: F) -> Self {
        Self::with_config(frame, VmConfig::default())
    }

    /// VM with an explicit configuration
    pub fn with_config(frame: F, config: VmConfig) -> Self {
        Self {
            executor: Executor::new(config.initial_stack_capacity, config.copy_on_write),
            frame,
            gc: config.garbage_collection.then(Collector::new),
            bytecode: BytecodeTable::new(),
            natives: NativeTable::new(),
            config,
            debugger: None,
            ticking: false,
            detach_pending: false,
            run_depth: 0,
            suspended: None,
        }
    }

    /// Active configuration
    pub fn config(&self) -> &VmConfig {
        &self.config
    }

    /// Executor state
    pub fn executor(&self) -> &Executor {
        &self.executor
    }

    /// Mutable executor state
    pub fn executor_mut(&mut self) -> &mut Executor {
        &mut self.executor
    }

    /// Host frame
    pub fn frame(&self) -> &F {
        &self.frame
    }

    /// Mutable host frame
    pub fn frame_mut(&mut self) -> &mut F {
        &mut self.frame
    }

    /// Garbage collector, when enabled
    pub fn gc(&self) -> Option<&Collector> {
        self.gc.as_ref()
    }

    /// Mutable garbage collector, when enabled
    pub fn gc_mut(&mut self) -> Option<&mut Collector> {
        self.gc.as_mut()
    }

    /// Host frame and collector borrowed together, e.g. for
    /// [`BasicFrame::cleanup`](crate::BasicFrame::cleanup)
    pub fn frame_and_gc_mut(&mut self) -> (&mut F, Option<&mut Collector>) {
        (&mut self.frame, self.gc.as_mut())
    }

    /// Loaded bytecode sections
    pub fn bytecode(&self) -> &BytecodeTable {
        &self.bytecode
    }

    /// Load a section and return its index
    pub fn add_bytecode(&mut self, bytecode: Bytecode) -> u32 {
        self.bytecode.add(bytecode)
    }

    /// Load a section at a fixed index, replacing any previous one
    pub fn insert_bytecode(&mut self, index: u32, bytecode: Bytecode) {
        self.bytecode.insert(index, bytecode);
    }

    /// Native function table
    pub fn natives(&self) -> &NativeTable<F> {
        &self.natives
    }

    /// Register a native and return its index
    pub fn register_native(&mut self, name: impl AsRef<str>, function: NativeFn<F>) -> u32 {
        self.natives.register(name, function)
    }

    /// Whether a suspended call is waiting for [`Vm::resume`]
    pub fn is_suspended(&self) -> bool {
        self.suspended.is_some()
    }

    /// Run section `index` until it returns or suspends.
    ///
    /// With `args_on_stack` the caller has already pushed the arguments and
    /// their count; otherwise an argument count of zero is pushed. Results
    /// are left on the operand stack.
    ///
    /// # Returns
    ///
    /// `true` when execution suspended.
    ///
    /// # Errors
    ///
    /// Any error raised by the executed code, with its stack trace.
    #[tracing::instrument(level = "debug", skip_all, fields(index = index))]
    pub fn execute_bytecode(&mut self, index: u32, args_on_stack: bool) -> Result<bool, ExecutionError> {
        if !args_on_stack {
            self.executor.push(Value::Int32(0));
        }
        if let Err(err) = self.enter_section(index) {
            return Err(self.traced(err));
        }
        self.run()
    }

    /// Call section `index` with `args` and collect its results.
    ///
    /// # Errors
    ///
    /// An argument count the section does not accept, or any error raised by
    /// the executed code. A failed outermost call discards the operand stack
    /// and any suspension.
    #[tracing::instrument(level = "debug", skip_all, fields(index = index, argc = args.len()))]
    pub fn call_bytecode(&mut self, index: u32, args: &[Value]) -> Result<Execution, ExecutionError> {
        if self.suspended.is_some() && self.run_depth == 0 {
            return Err(VmError::misc("Cannot start a call while execution is suspended").into());
        }
        let retc = {
            let bytecode = self
                .bytecode
                .get(index)
                .map_err(|err| ExecutionError::bare(err.into()))?;
            check_argc(bytecode, args.len())?;
            bytecode.retc
        };
        self.executor.stack.extend(args.iter().cloned());
        self.executor.push(Value::Int32(args.len() as i32));
        let outcome = self.execute_bytecode(index, true);
        self.complete(outcome, retc)
    }

    /// Continue a suspended call.
    ///
    /// # Errors
    ///
    /// `Misc` when nothing is suspended, or any error raised by the resumed
    /// code.
    #[tracing::instrument(level = "debug", skip_all)]
    pub fn resume(&mut self) -> Result<Execution, ExecutionError> {
        let Some(retc) = self.suspended.take() else {
            return Err(VmError::misc("No suspended execution to resume").into());
        };
        let outcome = self.run();
        self.complete(outcome, retc)
    }

    fn complete(
        &mut self,
        outcome: Result<bool, ExecutionError>,
        retc: u8,
    ) -> Result<Execution, ExecutionError> {
        match outcome {
            Ok(true) => {
                self.suspended = Some(retc);
                Ok(Execution::Suspended)
            }
            Ok(false) => {
                let stack = &mut self.executor.stack;
                let start = stack
                    .len()
                    .checked_sub(retc as usize)
                    .ok_or_else(|| VmError::misc("Operand stack underflow"))?;
                Ok(Execution::Finished(stack.split_off(start)))
            }
            Err(err) => {
                if self.run_depth == 0 {
                    self.executor.reset();
                    self.suspended = None;
                }
                Err(err)
            }
        }
    }

    /// Push a return address and jump to the start of section `index`
    pub(crate) fn enter_section(&mut self, index: u32) -> core_types::Result<()> {
        if self.executor.depth() >= self.config.max_call_depth {
            return Err(VmError::misc("Maximum call depth exceeded"));
        }
        let bytecode = self.bytecode.get(index)?.clone();
        tracing::debug!(
            section = bytecode.display_name(),
            depth = self.executor.depth() + 1,
            "enter section"
        );
        let caller = std::mem::replace(
            &mut self.executor.pc,
            bytecode_system::BytecodeStream::new(bytecode),
        );
        self.executor.return_addresses.push(caller);
        Ok(())
    }

    /// Dispatch until the current section returns or suspends
    pub(crate) fn run(&mut self) -> Result<bool, ExecutionError> {
        self.run_depth += 1;
        let result = self.run_loop();
        self.run_depth -= 1;
        result
    }

    fn run_loop(&mut self) -> Result<bool, ExecutionError> {
        loop {
            if self.debugger.is_some() {
                if let Err(err) = self.tick_debugger() {
                    return Err(self.traced(err));
                }
            }
            match self.step() {
                Ok(Flow::Continue) => {}
                Ok(Flow::Return) => return Ok(false),
                Ok(Flow::Suspend) => return Ok(true),
                Err(Failure::Raised(err)) => return Err(self.fail(err)),
                Err(Failure::Propagated(err)) => return Err(err),
            }
        }
    }

    fn tick_debugger(&mut self) -> core_types::Result<()> {
        let Some(mut debugger) = self.debugger.take() else {
            return Ok(());
        };
        if debugger.trace_enabled() {
            let pc = &self.executor.pc;
            let line = disassemble_at(pc.bytecode(), pc.position(), &self.natives)
                .unwrap_or_else(|err| err.to_string());
            debugger.trace(&line);
        }
        self.ticking = true;
        let result = debugger.tick(self);
        self.ticking = false;
        self.restore_debugger(debugger);
        result
    }

    fn restore_debugger(&mut self, mut debugger: Box<dyn Debugger<F>>) {
        if std::mem::take(&mut self.detach_pending) || self.debugger.is_some() {
            debugger.on_detach();
        } else {
            self.debugger = Some(debugger);
        }
    }

    fn traced(&self, error: VmError) -> ExecutionError {
        ExecutionError {
            error,
            trace: self.trace_entries(),
        }
    }

    /// Attach the stack trace, and give an attached debugger the chance to
    /// pause on the error
    fn fail(&mut self, error: VmError) -> ExecutionError {
        let inline = self.ticking
            || self
                .debugger
                .as_ref()
                .is_some_and(|debugger| debugger.execution_is_inline());
        if inline {
            return ExecutionError::bare(error);
        }

        let err = self.traced(error);
        if let Some(mut debugger) = self.debugger.take() {
            tracing::warn!(error = %err.error, "error raised; pausing in debugger");
            debugger.break_execution();
            self.ticking = true;
            if let Err(tick_err) = debugger.tick(self) {
                tracing::warn!(error = %tick_err, "debugger failed while paused on error");
            }
            self.ticking = false;
            self.restore_debugger(debugger);
        }
        err
    }

    fn trace_entries(&self) -> Vec<TraceEntry> {
        let executor = &self.executor;
        if executor.return_addresses.is_empty() {
            return Vec::new();
        }
        // the outermost return address is the idle host position
        executor
            .return_addresses
            .iter()
            .skip(1)
            .chain(std::iter::once(&executor.pc))
            .map(TraceEntry::from_stream)
            .collect()
    }

    /// Current call stack, innermost first
    pub fn stack_trace(&self) -> String {
        format_trace(&self.trace_entries())
    }

    /// Run a collection pass, treating arrays on the operand stack as roots.
    ///
    /// # Returns
    ///
    /// Number of reclaimed nodes; zero when collection is disabled.
    pub fn collect_garbage(&mut self) -> usize {
        let Some(gc) = self.gc.as_mut() else {
            return 0;
        };
        let roots: Vec<NodeId> = self
            .executor
            .stack
            .iter()
            .filter_map(Value::array_node)
            .collect();
        gc.process_with_roots(&roots)
    }

    /// Cross-check collector edges against array contents.
    ///
    /// # Errors
    ///
    /// `Misc` describing the first mismatch.
    pub fn integrity_check(&self) -> core_types::Result<()> {
        match &self.gc {
            Some(gc) => gc
                .integrity_check()
                .map_err(|err| VmError::misc(err.to_string())),
            None => Ok(()),
        }
    }

    /// Attach a debugger, detaching any previous one
    pub fn debugger_attach(&mut self, mut debugger: Box<dyn Debugger<F>>) {
        debugger.on_attach();
        if let Some(mut previous) = self.debugger.replace(debugger) {
            previous.on_detach();
        }
    }

    /// Detach the debugger, if any
    pub fn debugger_detach(&mut self) {
        match self.debugger.take() {
            Some(mut debugger) => debugger.on_detach(),
            None if self.ticking => self.detach_pending = true,
            None => {}
        }
    }

    /// Whether a debugger is attached
    pub fn has_debugger(&self) -> bool {
        self.debugger.is_some() || (self.ticking && !self.detach_pending)
    }
}

impl<F: Frame + std::fmt::Debug> std::fmt::Debug for Vm<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Vm")
            .field("executor", &self.executor)
            .field("frame", &self.frame)
            .field("sections", &self.bytecode.len())
            .field("natives", &self.natives.len())
            .field("gc", &self.gc)
            .field("debugger", &self.debugger.is_some())
            .field("suspended", &self.suspended)
            .finish()
    }
}

/// Check a call's argument count against the section's declaration
pub(crate) fn check_argc(bytecode: &Bytecode, argc: usize) -> core_types::Result<()> {
    match bytecode.argc {
        Some(expected) if expected as usize != argc => Err(VmError::misc(format!(
            "{} takes {} arguments but was called with {}",
            bytecode.display_name(),
            expected,
            argc
        ))),
        _ => Ok(()),
    }
}
