//! # Stack-Based Bytecode Virtual Machine
//!
//! This module implements the fetch/decode/dispatch loop for the `es`
//! bytecode: a flat byte stream, one instruction pointer, an operand
//! stack, global/local variable tables, a fixed-slot array heap, and a
//! call-frame stack for nested subroutine calls.
//!
//! ## High-level model
//! - **Operand stack (`stack`)**: values consumed/produced by every op.
//! - **Globals (`globals`)**: one per-`Vm` table, indexed directly by the
//!   decoded operand.
//! - **Root locals (`root_locals`)**: the local table used when no call
//!   frame is active.
//! - **Frames (`frames`)**: call-frame stack; the active local table is
//!   the top frame's, or `root_locals` if the frame stack is empty.
//! - **Array heap (`heap`)**: fixed pool of array rows, addressed by
//!   handle.
//! - **Data segment (`ds`)**: the loaded program bytes; `ip` indexes into
//!   it directly (there is no separate "code" vs "data" split — inline
//!   string literals and jump targets both live in this one byte view).
//! - **`pending_data`/`pending_array_index`**: transient prefix-opcode
//!   state consumed and unconditionally cleared by the next scope
//!   store/load.
//!
//! The machine fails fast: any opcode returning an `Err` halts the loop
//! immediately, reports the fault through [`Host::fail`], and puts the VM
//! into [`VmStatus::Error`]. There is no unwinding and nothing is
//! recoverable by bytecode.

use crate::decoder::{self, Instr};
use crate::error::Fault;
use crate::frame::FrameStack;
use crate::heap::ArrayHeap;
use crate::host::Host;
use crate::data_segment::DataSegment;
use crate::stack::OperandStack;
use crate::value::Value;
use crate::vars::{GlobalTable, LocalTable};

mod builtins;
mod ops_arith;
mod ops_control;
mod ops_scope;

/// VM execution status, mirroring the specification's state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VmStatus {
    Ready,
    Running,
    Ok,
    Error,
}

/// A stack-based bytecode interpreter for one loaded program.
pub struct Vm {
    pub(crate) ip: usize,
    pub(crate) stack: OperandStack,
    pub(crate) globals: GlobalTable,
    pub(crate) root_locals: LocalTable,
    pub(crate) frames: FrameStack,
    pub(crate) heap: ArrayHeap,
    pub(crate) ds: DataSegment,
    /// Set by `Data`; consumed and cleared by the next scope store.
    pub(crate) pending_data: u32,
    /// Set by `PushA`/`PushAS`; `-1` means unset. Consumed and cleared by
    /// the next scope store/load.
    pub(crate) pending_array_index: i64,
    pub status: VmStatus,
}

impl Vm {
    /// Construct a VM with all tables zeroed, `ip` at 0, no frames, and no
    /// live arrays, loading `program` into the data segment.
    pub fn new(program: &[u8]) -> Result<Self, Fault> {
        builtins::register_defaults();
        Ok(Vm {
            ip: 0,
            stack: OperandStack::new(),
            globals: GlobalTable::new(),
            root_locals: LocalTable::new(),
            frames: FrameStack::new(),
            heap: ArrayHeap::new(),
            ds: DataSegment::load(program)?,
            pending_data: 0,
            pending_array_index: -1,
            status: VmStatus::Ready,
        })
    }

    /// The local table currently in scope: the top frame's if any frame is
    /// active, else the root table.
    pub(crate) fn active_locals(&self) -> &LocalTable {
        if self.frames.is_empty() {
            &self.root_locals
        } else {
            &self.frames.current().expect("checked non-empty").locals
        }
    }

    pub(crate) fn active_locals_mut(&mut self) -> &mut LocalTable {
        if self.frames.is_empty() {
            &mut self.root_locals
        } else {
            &mut self.frames.current_mut().expect("checked non-empty").locals
        }
    }

    /// Public stack API for host callbacks building built-ins: the only
    /// legal way for host code to exchange values with the VM.
    pub fn push(&mut self, v: Value) -> Result<(), Fault> {
        self.stack.push(v)
    }

    /// Public stack API for host callbacks building built-ins.
    pub fn pop(&mut self) -> Result<Value, Fault> {
        self.stack.pop()
    }

    /// Run the fetch/decode/dispatch loop to completion, a fatal fault, or
    /// a host lock-check signal.
    pub fn run<H: Host>(&mut self, host: &mut H) -> Result<(), Fault> {
        loop {
            if host.lock_check() {
                self.status = VmStatus::Ok;
                return Ok(());
            }

            if self.ip >= self.ds.len() {
                self.status = VmStatus::Ok;
                return Ok(());
            }

            let bytes = self.ds.as_slice();
            let (instr, next_ip) = match decoder::decode(bytes, self.ip) {
                Ok(v) => v,
                Err(e) => {
                    self.status = VmStatus::Error;
                    host.fail(&e.to_string());
                    return Err(e);
                }
            };
            if self.status == VmStatus::Ready {
                self.status = VmStatus::Running;
            }
            self.ip = next_ip;

            if let Err(e) = self.dispatch(instr, host) {
                self.status = VmStatus::Error;
                host.fail(&e.to_string());
                return Err(e);
            }
        }
    }

    fn dispatch<H: Host>(&mut self, instr: Instr, host: &mut H) -> Result<(), Fault> {
        match instr {
            Instr::Nop => Ok(()),

            Instr::PushG(i) => ops_scope::handle_push_global(self, i),
            Instr::PopG(i) => ops_scope::handle_pop_global(self, i),
            Instr::PushL(i) => ops_scope::handle_push_local(self, i),
            Instr::PopL(i) => ops_scope::handle_pop_local(self, i),
            Instr::Push(n) => self.stack.push(Value::Number(n)),
            Instr::PushS(s) => self.stack.push(Value::Str(s)),
            Instr::Data(n) => {
                self.pending_data = n;
                Ok(())
            }
            Instr::PushA(k) => {
                self.pending_array_index = k as i64;
                Ok(())
            }
            Instr::PushAS => ops_scope::handle_push_array_index_from_stack(self),

            Instr::Eq => ops_arith::handle_compare(self, |a, b| a == b),
            Instr::Lt => ops_arith::handle_compare(self, |a, b| a < b),
            Instr::Gt => ops_arith::handle_compare(self, |a, b| a > b),
            Instr::LtEq => ops_arith::handle_compare(self, |a, b| a <= b),
            Instr::GtEq => ops_arith::handle_compare(self, |a, b| a >= b),
            Instr::NotEq => ops_arith::handle_compare(self, |a, b| a != b),

            Instr::Add => ops_arith::handle_binary(self, |a, b| a + b),
            Instr::Neg => ops_arith::handle_neg(self),
            Instr::Sub => ops_arith::handle_binary(self, |a, b| a - b),
            Instr::Mul => ops_arith::handle_binary(self, |a, b| a * b),
            Instr::Div => ops_arith::handle_binary(self, |a, b| a / b),
            Instr::And => ops_arith::handle_and(self),
            Instr::Or => ops_arith::handle_or(self),
            Instr::Not => ops_arith::handle_not(self),
            Instr::Concat => ops_arith::handle_concat(self),
            Instr::Mod => ops_arith::handle_mod(self),

            Instr::Jz(addr) => ops_control::handle_jz(self, addr),
            Instr::Jmp(addr) => ops_control::handle_jmp(self, addr),
            Instr::RetFromFrame => ops_control::handle_ret_from_frame(self),
            Instr::CallFun(addr) => ops_control::handle_call_fun(self, addr),
            Instr::HostCall(argc) => ops_control::handle_host_call(self, argc),

            Instr::Print => builtins::handle_print(self, host),
            Instr::ArgType => builtins::handle_argtype(self),
            Instr::Len => builtins::handle_len(self),
            Instr::ArrayCtor => builtins::handle_array_ctor(self),
        }
    }
}

#[cfg(test)]
mod tests;
