//! Compile-time capacity constants for the VM's fixed-size storage.
//!
//! Every table the VM touches — the operand stack, the global and local
//! variable tables, the array heap, the call-frame stack, the data segment,
//! and the host-subroutine registration table — is sized at compile time.
//! There is no dynamic allocation after a [`crate::vm::Vm`] is constructed:
//! these constants are the only "configuration" this crate has.
//!
//! Defaults mirror the reference limits in the specification this crate
//! implements (and, before that, the C `#define`s in the original `es_vm`
//! source).

/// Instruction encoding width for opcodes with two 32-bit operands.
pub const INSTR_BYTES: usize = 9;
/// Instruction encoding width for opcodes with no operand.
pub const INSTR_SINGLE_BYTES: usize = 1;

/// Operand stack capacity.
pub const STACK: usize = 128;
/// Global variable table capacity.
pub const GLOBALS: usize = 32;
/// Per-frame local variable table capacity.
pub const LOCALS: usize = 16;
/// Data segment capacity in bytes.
pub const DS: usize = 2500;

/// Maximum inline string length (bytes).
pub const MAX_STR: usize = 128;
/// Number of rows in the array heap.
pub const ARRAY_SLOTS: usize = 8;
/// Maximum elements per array.
pub const ARRAY_MAX: usize = 512;
/// Maximum depth of nested subroutine calls.
pub const FRAMES: usize = 32;

/// Maximum number of registered host subroutines.
pub const EXT_MAX: usize = 32;
/// Maximum length of a registered host subroutine name.
pub const EXT_NAME_MAX: usize = 64;
