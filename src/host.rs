//! Host callback surface and the external-subroutine registration table.
//!
//! `Host` is this crate's entire escape hatch to the embedding
//! environment — the spec's narrow host-callback boundary realized as a
//! trait so embedders implement only what their environment supports.
//! Required methods mirror the source's mandatory callbacks (`print`,
//! `fail`); `lock_check`/`read_byte` default to no-op, standing in for the
//! source's "omit if unused" comment on the optional ones.
//!
//! The registration table is process-wide and `once_cell`-backed, the
//! same pattern the teacher crate uses for its own process-wide
//! `FILE_HANDLES` table in `vm/builtins.rs`. It is grounded on
//! `e_api_register_sub`/`e_api_call_sub` in
//! `examples/original_source/vm.c`: a fixed-capacity array of
//! (name, function pointer) pairs, linear-scan lookup by name.

use std::sync::Mutex;

use once_cell::sync::Lazy;

use crate::error::Fault;
use crate::limits::{EXT_MAX, EXT_NAME_MAX};
use crate::vm::Vm;

/// Callbacks an embedding host must (or may) supply.
///
/// `print`/`fail` are the VM's only channels for observable output; there
/// is deliberately no internal logging crate alongside this trait.
pub trait Host {
    /// Write a UTF-8/ASCII string to the host's console/log.
    fn print(&mut self, msg: &str);

    /// Report a fatal message. Must not unwind.
    fn fail(&mut self, msg: &str);

    /// Obtain a byte of the data segment, for hosts that externalize it.
    /// Default: unused, since this VM keeps the data segment in-process.
    fn read_byte(&mut self, _addr: usize) -> u8 {
        0
    }

    /// Cooperative pause signal, consulted before each fetch. Default:
    /// never locked.
    fn lock_check(&mut self) -> bool {
        false
    }
}

/// A host subroutine, matching the C ABI `uint32_t (*fptr)(e_vm *, uint32_t)`
/// field-for-field: it reads arguments and pushes results purely through
/// [`Vm::push`]/[`Vm::pop`], and returns `0` for error or `1 + K` for `K`
/// pushed return values.
pub type HostFn = fn(&mut Vm, u32) -> u32;

#[derive(Clone, Copy)]
struct Entry {
    name: [u8; EXT_NAME_MAX],
    name_len: usize,
    f: HostFn,
}

/// Fixed-capacity table of registered host subroutines.
pub struct HostTable {
    entries: [Option<Entry>; EXT_MAX],
    count: usize,
}

impl HostTable {
    const fn new() -> Self {
        HostTable {
            entries: [None; EXT_MAX],
            count: 0,
        }
    }

    /// Register a subroutine under `name`. Registration beyond capacity or
    /// with an oversize name returns `Err(Fault)` to the caller; this
    /// happens at host-side initialization, before any `Vm` runs, so there
    /// is no `Host` to route a `fail` message through yet — the caller
    /// decides what to do with the error (log it, abort startup, etc.).
    fn register(&mut self, name: &str, f: HostFn) -> Result<(), Fault> {
        if name.len() > EXT_NAME_MAX {
            return Err(Fault::Decode(format!(
                "host subroutine name '{}' exceeds {} bytes",
                name, EXT_NAME_MAX
            )));
        }
        if self.count >= EXT_MAX {
            return Err(Fault::Decode("host subroutine table full".to_string()));
        }
        let mut buf = [0u8; EXT_NAME_MAX];
        buf[..name.len()].copy_from_slice(name.as_bytes());
        for slot in self.entries.iter_mut() {
            if slot.is_none() {
                *slot = Some(Entry {
                    name: buf,
                    name_len: name.len(),
                    f,
                });
                self.count += 1;
                return Ok(());
            }
        }
        unreachable!("count invariant guarantees a free slot exists")
    }

    fn lookup(&self, name: &str) -> Option<HostFn> {
        for slot in self.entries.iter().flatten() {
            if slot.name_len == name.len() && &slot.name[..slot.name_len] == name.as_bytes() {
                return Some(slot.f);
            }
        }
        None
    }
}

/// Process-wide host subroutine registration table, shared across every
/// [`Vm`] instance. Written only during initialization, read during
/// execution — the one piece of state this crate does not isolate
/// per-VM, matching the specification's stated resource-sharing policy.
static HOST_TABLE: Lazy<Mutex<HostTable>> = Lazy::new(|| Mutex::new(HostTable::new()));

/// Register a host subroutine under `name`, callable from bytecode via
/// `HostCall`.
pub fn register(name: &str, f: HostFn) -> Result<(), Fault> {
    HOST_TABLE.lock().unwrap().register(name, f)
}

/// Look up a registered host subroutine by name.
pub fn lookup(name: &str) -> Option<HostFn> {
    HOST_TABLE.lock().unwrap().lookup(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noop_sub(_vm: &mut Vm, _argc: u32) -> u32 {
        1
    }

    #[test]
    fn register_then_lookup_round_trips() {
        register("host_rs_test_register_then_lookup", noop_sub).unwrap();
        assert!(lookup("host_rs_test_register_then_lookup").is_some());
    }

    #[test]
    fn unknown_name_is_absent() {
        assert!(lookup("definitely_not_registered_xyz").is_none());
    }

    #[test]
    fn oversize_name_rejected() {
        let long = "x".repeat(EXT_NAME_MAX + 1);
        assert!(register(&long, noop_sub).is_err());
    }
}
