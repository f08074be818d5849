//! Global/local scoped store and load, and indexed array access.
//!
//! Grounded on the `E_OP_PUSHG`/`E_OP_POPG`/`E_OP_PUSHL`/`E_OP_POPL` bodies
//! in `examples/original_source/vm.c`. "Push" loads a variable's value onto
//! the operand stack; "pop" stores the top of the operand stack into a
//! variable. Two pieces of transient state modulate both directions:
//!
//! - `pending_data`, set by `Data`, tells the next *store* to pop that many
//!   values and materialize them as a new array instead of doing a plain
//!   scalar write.
//! - `pending_array_index`, set by `PushA`/`PushAS`, tells the next store
//!   *or* load to address one element of an existing array rather than the
//!   whole variable.
//!
//! Both fields are read and unconditionally cleared at the top of every
//! handler that can consume them, regardless of which branch ends up firing.

use crate::error::Fault;
use crate::limits::ARRAY_MAX;
use crate::value::{ArrayHandle, Value};
use crate::vm::Vm;

fn take_pending_data(vm: &mut Vm) -> Option<u32> {
    let n = vm.pending_data;
    vm.pending_data = 0;
    if n > 0 {
        Some(n)
    } else {
        None
    }
}

fn take_pending_array_index(vm: &mut Vm) -> Option<usize> {
    let idx = vm.pending_array_index;
    vm.pending_array_index = -1;
    if idx >= 0 {
        Some(idx as usize)
    } else {
        None
    }
}

/// Pop `n` values off the operand stack (in push order) and materialize
/// them as a new array-heap row.
fn construct_array(vm: &mut Vm, n: u32) -> Result<ArrayHandle, Fault> {
    let n = n as usize;
    let mut buf = [Value::zero(); ARRAY_MAX];
    if n > buf.len() {
        return Err(Fault::ArrayBounds);
    }
    for i in (0..n).rev() {
        buf[i] = vm.stack.pop()?;
    }
    let slot = vm.heap.alloc()?;
    for v in buf.iter().take(n) {
        vm.heap.append(slot, *v)?;
    }
    Ok(ArrayHandle { slot, len: n })
}

fn push_scoped_value(vm: &mut Vm, v: Value, idx: Option<usize>) -> Result<(), Fault> {
    match idx {
        Some(i) => {
            let h = match v {
                Value::Array(h) => h,
                _ => return Err(Fault::ArrayBounds),
            };
            let elem = vm.heap.get(h.slot, i)?;
            vm.stack.push(elem)
        }
        None => vm.stack.push(v),
    }
}

pub(super) fn handle_push_global(vm: &mut Vm, i: u32) -> Result<(), Fault> {
    let idx = take_pending_array_index(vm);
    let v = vm.globals.get(i as usize)?;
    push_scoped_value(vm, v, idx)
}

pub(super) fn handle_pop_global(vm: &mut Vm, i: u32) -> Result<(), Fault> {
    let data = take_pending_data(vm);
    let idx = take_pending_array_index(vm);
    if let Some(n) = data {
        let handle = construct_array(vm, n)?;
        vm.globals.set(i as usize, Value::Array(handle))
    } else if let Some(index) = idx {
        let current = vm.globals.get(i as usize)?;
        let h = match current {
            Value::Array(h) => h,
            _ => return Err(Fault::ArrayBounds),
        };
        let v = vm.stack.pop()?;
        vm.heap.set(h.slot, index, v)
    } else {
        let v = vm.stack.pop()?;
        vm.globals.set(i as usize, v)
    }
}

pub(super) fn handle_push_local(vm: &mut Vm, i: u32) -> Result<(), Fault> {
    let idx = take_pending_array_index(vm);
    let v = vm.active_locals().get(i as usize)?;
    push_scoped_value(vm, v, idx)
}

pub(super) fn handle_pop_local(vm: &mut Vm, i: u32) -> Result<(), Fault> {
    let data = take_pending_data(vm);
    let idx = take_pending_array_index(vm);
    if let Some(n) = data {
        let handle = construct_array(vm, n)?;
        if !vm.frames.is_empty() {
            vm.frames.current_mut()?.own(handle.slot);
        }
        vm.active_locals_mut().set(i as usize, Value::Array(handle))
    } else if let Some(index) = idx {
        let current = vm.active_locals().get(i as usize)?;
        let h = match current {
            Value::Array(h) => h,
            _ => return Err(Fault::ArrayBounds),
        };
        let v = vm.stack.pop()?;
        vm.heap.set(h.slot, index, v)
    } else {
        let v = vm.stack.pop()?;
        vm.active_locals_mut().set(i as usize, v)
    }
}

/// `PushAS`: pop a number off the stack and use it as the next indexed
/// access, the same truncation the decoder applies to `PushA`'s immediate.
pub(super) fn handle_push_array_index_from_stack(vm: &mut Vm) -> Result<(), Fault> {
    let v = vm.stack.pop()?;
    let n = match v {
        Value::Number(n) => n,
        _ => 0.0,
    };
    vm.pending_array_index = n as i64 as i32 as i64;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_store_and_load_round_trip() {
        let mut vm = Vm::new(&[]).unwrap();
        vm.stack.push(Value::Number(7.0)).unwrap();
        handle_pop_global(&mut vm, 0).unwrap();
        handle_push_global(&mut vm, 0).unwrap();
        assert!(matches!(vm.stack.pop().unwrap(), Value::Number(n) if n == 7.0));
    }

    #[test]
    fn pending_data_constructs_array_on_store() {
        let mut vm = Vm::new(&[]).unwrap();
        vm.stack.push(Value::Number(10.0)).unwrap();
        vm.stack.push(Value::Number(20.0)).unwrap();
        vm.stack.push(Value::Number(30.0)).unwrap();
        vm.pending_data = 3;
        handle_pop_global(&mut vm, 0).unwrap();
        let v = vm.globals.get(0).unwrap();
        let h = match v {
            Value::Array(h) => h,
            _ => panic!("expected array"),
        };
        assert_eq!(h.len, 3);
        assert!(matches!(vm.heap.get(h.slot, 0).unwrap(), Value::Number(n) if n == 10.0));
        assert!(matches!(vm.heap.get(h.slot, 1).unwrap(), Value::Number(n) if n == 20.0));
        assert!(matches!(vm.heap.get(h.slot, 2).unwrap(), Value::Number(n) if n == 30.0));
    }

    #[test]
    fn indexed_store_and_load_address_one_element() {
        let mut vm = Vm::new(&[]).unwrap();
        vm.stack.push(Value::Number(1.0)).unwrap();
        vm.stack.push(Value::Number(2.0)).unwrap();
        vm.pending_data = 2;
        handle_pop_global(&mut vm, 0).unwrap();

        vm.stack.push(Value::Number(99.0)).unwrap();
        vm.pending_array_index = 1;
        handle_pop_global(&mut vm, 0).unwrap();

        vm.pending_array_index = 1;
        handle_push_global(&mut vm, 0).unwrap();
        assert!(matches!(vm.stack.pop().unwrap(), Value::Number(n) if n == 99.0));
    }

    #[test]
    fn pending_fields_do_not_leak_to_next_store() {
        let mut vm = Vm::new(&[]).unwrap();
        vm.stack.push(Value::Number(1.0)).unwrap();
        vm.stack.push(Value::Number(2.0)).unwrap();
        vm.pending_data = 2;
        handle_pop_global(&mut vm, 0).unwrap();
        assert_eq!(vm.pending_data, 0);

        vm.stack.push(Value::Number(5.0)).unwrap();
        handle_pop_global(&mut vm, 1).unwrap();
        assert!(matches!(vm.globals.get(1).unwrap(), Value::Number(n) if n == 5.0));
    }

    #[test]
    fn array_constructed_into_local_is_owned_by_active_frame() {
        use crate::frame::CallFrame;
        use crate::vars::LocalTable;

        let mut vm = Vm::new(&[]).unwrap();
        vm.frames.push(CallFrame::new(0, LocalTable::new())).unwrap();
        vm.stack.push(Value::Number(1.0)).unwrap();
        vm.pending_data = 1;
        handle_pop_local(&mut vm, 0).unwrap();
        let frame = vm.frames.current().unwrap();
        assert_eq!(frame.owned_count, 1);
    }
}
