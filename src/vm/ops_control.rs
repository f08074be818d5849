//! Jumps, subroutine calls, frame returns, and the host-call ABI.
//!
//! Grounded on `E_OP_JZ`/`E_OP_JMP`/`E_OP_JMPFUN`/`E_OP_JFS`/`E_OP_CALL` in
//! `examples/original_source/vm.c`. Jump operands are raw instruction-
//! pointer byte offsets into the data segment (the spec's own fix for an
//! ambiguity in the source, which indexed a separate function table).
//!
//! The host-call reconciliation in [`reconcile`] is grounded on the same
//! file's `E_OP_CALL` arm: a callback declares `argc` consumed and returns
//! `0` for error or `1 + K` for `K` values left on the stack. Anything the
//! callback pushed beyond its declared arithmetic (`args_before - argc`
//! remaining, plus its `K` return values) is surplus and is discarded from
//! beneath the return values, preserving their order.

use crate::error::Fault;
use crate::frame::CallFrame;
use crate::vm::Vm;

pub(super) fn handle_jz(vm: &mut Vm, addr: u32) -> Result<(), Fault> {
    let v = vm.stack.pop()?;
    if !v.truthy() {
        vm.ip = addr as usize;
    }
    Ok(())
}

pub(super) fn handle_jmp(vm: &mut Vm, addr: u32) -> Result<(), Fault> {
    vm.ip = addr as usize;
    Ok(())
}

pub(super) fn handle_ret_from_frame(vm: &mut Vm) -> Result<(), Fault> {
    let frame = vm.frames.pop()?;
    vm.ip = frame.return_addr;
    for slot in frame.owned_arrays.iter().take(frame.owned_count).flatten() {
        vm.heap.release(*slot)?;
    }
    Ok(())
}

pub(super) fn handle_call_fun(vm: &mut Vm, addr: u32) -> Result<(), Fault> {
    let return_addr = match vm.stack.pop()? {
        crate::value::Value::Number(n) => n as i64 as usize,
        _ => 0,
    };
    let locals = *vm.active_locals();
    vm.frames.push(CallFrame::new(return_addr, locals))?;
    vm.ip = addr as usize;
    Ok(())
}

/// Discard surplus values a host callback left beneath its declared return
/// values, without disturbing their order.
///
/// `args_before` is the stack depth right after the subroutine name was
/// popped (i.e. before the callback ran); `argc` is the opcode's declared
/// argument count; `returned` is `v - 1` from the callback's status.
pub(super) fn reconcile(vm: &mut Vm, args_before: usize, argc: usize, returned: usize) -> Result<(), Fault> {
    let allowed_remaining = args_before.saturating_sub(argc);
    let current_depth = vm.stack.len();
    let actual_surplus_base = current_depth.saturating_sub(returned);
    if actual_surplus_base > allowed_remaining {
        let surplus = actual_surplus_base - allowed_remaining;
        for _ in 0..surplus {
            vm.stack.remove_at_depth(returned)?;
        }
    }
    Ok(())
}

pub(super) fn handle_host_call(vm: &mut Vm, argc: u32) -> Result<(), Fault> {
    let name = match vm.stack.pop()? {
        crate::value::Value::Str(s) => s,
        _ => return Err(Fault::UnknownHostRoutine),
    };
    let args_before = vm.stack.len();
    let rendered = name.as_str();
    let f = crate::host::lookup(&rendered).ok_or(Fault::UnknownHostRoutine)?;

    let status = f(vm, argc);
    if status == 0 {
        return Err(Fault::HostRoutineError);
    }
    let returned = (status - 1) as usize;
    reconcile(vm, args_before, argc as usize, returned)?;
    if returned > 1 {
        vm.pending_data = returned as u32;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;

    #[test]
    fn jz_jumps_when_falsy() {
        let mut vm = Vm::new(&[]).unwrap();
        vm.stack.push(Value::Number(0.0)).unwrap();
        handle_jz(&mut vm, 42).unwrap();
        assert_eq!(vm.ip, 42);
    }

    #[test]
    fn jz_does_not_jump_when_truthy() {
        let mut vm = Vm::new(&[]).unwrap();
        vm.ip = 3;
        vm.stack.push(Value::Number(1.0)).unwrap();
        handle_jz(&mut vm, 42).unwrap();
        assert_eq!(vm.ip, 3);
    }

    #[test]
    fn call_then_return_restores_ip_and_releases_owned_arrays() {
        let mut vm = Vm::new(&[]).unwrap();
        vm.stack.push(Value::Number(55.0)).unwrap();
        handle_call_fun(&mut vm, 100).unwrap();
        assert_eq!(vm.ip, 100);
        assert!(!vm.frames.is_empty());

        let slot = vm.heap.alloc().unwrap();
        vm.frames.current_mut().unwrap().own(slot);

        handle_ret_from_frame(&mut vm).unwrap();
        assert_eq!(vm.ip, 55);
        assert!(vm.frames.is_empty());
        assert_eq!(vm.heap.alloc().unwrap(), slot);
    }

    #[test]
    fn call_snapshots_locals_by_copy() {
        let mut vm = Vm::new(&[]).unwrap();
        vm.root_locals.set(0, Value::Number(7.0)).unwrap();
        vm.stack.push(Value::Number(0.0)).unwrap();
        handle_call_fun(&mut vm, 0).unwrap();
        vm.active_locals_mut().set(0, Value::Number(99.0)).unwrap();
        assert!(matches!(vm.root_locals.get(0).unwrap(), Value::Number(n) if n == 7.0));
    }

    fn inc_host_fn(vm: &mut Vm, argc: u32) -> u32 {
        if argc != 1 {
            return 0;
        }
        let x = match vm.pop() {
            Ok(Value::Number(n)) => n,
            _ => return 0,
        };
        let _ = vm.push(Value::Number(111.0));
        let _ = vm.push(Value::Number(222.0));
        let _ = vm.push(Value::Number(x * 2.0));
        2
    }

    #[test]
    fn reconcile_drops_surplus_from_beneath_single_return_value() {
        crate::host::register("ops_control_test_inc", inc_host_fn).unwrap();
        let mut vm = Vm::new(&[]).unwrap();
        vm.stack.push(Value::Number(5.0)).unwrap();
        vm.stack
            .push(Value::Str(crate::value::EsString::from_str("ops_control_test_inc").unwrap()))
            .unwrap();
        handle_host_call(&mut vm, 1).unwrap();
        assert_eq!(vm.stack.len(), 1);
        assert!(matches!(vm.pop().unwrap(), Value::Number(n) if n == 10.0));
    }

    fn unknown_status_fn(_vm: &mut Vm, _argc: u32) -> u32 {
        0
    }

    #[test]
    fn host_call_error_status_faults() {
        crate::host::register("ops_control_test_fail", unknown_status_fn).unwrap();
        let mut vm = Vm::new(&[]).unwrap();
        vm.stack
            .push(Value::Str(crate::value::EsString::from_str("ops_control_test_fail").unwrap()))
            .unwrap();
        assert_eq!(handle_host_call(&mut vm, 0).unwrap_err(), Fault::HostRoutineError);
    }

    #[test]
    fn host_call_unknown_name_faults() {
        let mut vm = Vm::new(&[]).unwrap();
        vm.stack
            .push(Value::Str(crate::value::EsString::from_str("definitely_not_registered_abc").unwrap()))
            .unwrap();
        assert_eq!(handle_host_call(&mut vm, 0).unwrap_err(), Fault::UnknownHostRoutine);
    }
}
