//! An embeddable stack-based bytecode virtual machine for the `es`
//! scripting language: fixed-capacity storage throughout, no allocation
//! after initialization, and a narrow host-callback boundary so it can run
//! in sandboxed or resource-constrained environments.
//!
//! The public surface is small: load a program into a [`Vm`], implement
//! [`Host`] for the embedding environment, and call [`Vm::run`]. Host
//! subroutines register through [`register`] and exchange values with the
//! VM only through [`Vm::push`]/[`Vm::pop`] — there is no other channel.

mod data_segment;
mod decoder;
mod error;
mod frame;
mod heap;
mod host;
pub mod limits;
mod stack;
mod value;
mod vars;
mod vm;

pub use error::Fault;
pub use host::{register, Host, HostFn};
pub use value::{ArrayHandle, EsString, Tag, Value};
pub use vm::{Vm, VmStatus};
