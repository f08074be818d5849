//! # Error Taxonomy for the es VM
//!
//! This module defines [`Fault`], the complete set of fatal conditions the
//! VM can encounter. Unlike a hosted interpreter, nothing here is
//! recoverable by bytecode: any fault halts the fetch/decode/dispatch loop
//! and puts the VM into [`crate::vm::VmStatus::Error`]. A fault's
//! [`Display`](fmt::Display) rendering is exactly the one line the VM would
//! otherwise have handed to the host's `fail` callback.

use std::fmt;

/// A fatal condition raised by the dispatch core or decoder.
///
/// Every variant corresponds 1:1 to a row of the error taxonomy table in
/// the specification. There is no "warning" tier: all faults are terminal.
#[derive(Debug, Clone, PartialEq)]
pub enum Fault {
    /// Opcode single/nine-byte classification mismatch, or IP advanced by
    /// neither 1 nor 9 bytes after a decode.
    Decode(String),
    /// Pop from an empty operand stack, or a global/local index out of range.
    StackUnderflow,
    /// Push onto a full operand stack.
    StackOverflow,
    /// Read or write of an index outside an array's logical length, or
    /// beyond `ARRAY_MAX`.
    ArrayBounds,
    /// No free row in the array heap.
    ArrayAlloc,
    /// Call frame stack full on `CallFun`.
    FrameOverflow,
    /// `RetFromFrame` with no active frame.
    FrameUnderflow,
    /// Concatenation result would exceed `MAX_STR`.
    StringLength,
    /// `HostCall` named a subroutine not present in the registration table.
    UnknownHostRoutine,
    /// A host callback returned the error status (`0`).
    HostRoutineError,
    /// Opcode byte not in the defined set.
    InvalidOpcode(u8),
    /// Modulo by zero (`Div` is intentionally IEEE and never faults).
    ZeroDivision,
}

impl fmt::Display for Fault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Fault::Decode(msg) => write!(f, "DecodeFault: {}", msg),
            Fault::StackUnderflow => {
                write!(f, "StackUnderflowFault: pop from empty stack or out-of-range index")
            }
            Fault::StackOverflow => write!(f, "StackOverflowFault: push onto full stack"),
            Fault::ArrayBounds => write!(f, "ArrayBoundsFault: index outside array bounds"),
            Fault::ArrayAlloc => write!(f, "ArrayAllocFault: no free row in array heap"),
            Fault::FrameOverflow => write!(f, "FrameOverflowFault: call frame stack full"),
            Fault::FrameUnderflow => write!(f, "FrameUnderflowFault: return with no active frame"),
            Fault::StringLength => write!(f, "StringLengthFault: concatenation result exceeds MAX_STR"),
            Fault::UnknownHostRoutine => {
                write!(f, "UnknownHostRoutine: no subroutine registered under that name")
            }
            Fault::HostRoutineError => write!(f, "HostRoutineError: host callback returned error status"),
            Fault::InvalidOpcode(op) => {
                write!(f, "InvalidOpcodeFault: byte 0x{:02X} is not a defined opcode", op)
            }
            Fault::ZeroDivision => write!(f, "ZeroDivisionFault: modulo by zero"),
        }
    }
}

impl std::error::Error for Fault {}
