//! Arithmetic, comparison, boolean, and concatenation operators.
//!
//! Grounded on the corresponding `E_OP_*` arms in
//! `examples/original_source/vm.c`: pop the right-hand operand first, then
//! the left, compute, push one result. `Div` is intentionally IEEE (no
//! fault on division by zero, per spec's Open Question resolution); `Mod`
//! truncates both operands through `u32`, narrows the result to a byte,
//! and faults on a zero divisor.

use crate::error::Fault;
use crate::value::{EsString, Value};
use crate::vm::Vm;

fn pop_numeric(vm: &mut Vm) -> Result<f64, Fault> {
    match vm.stack.pop()? {
        Value::Number(n) => Ok(n),
        _ => Ok(0.0),
    }
}

pub(super) fn handle_compare(vm: &mut Vm, f: impl Fn(f64, f64) -> bool) -> Result<(), Fault> {
    let b = pop_numeric(vm)?;
    let a = pop_numeric(vm)?;
    vm.stack.push(Value::Number(if f(a, b) { 1.0 } else { 0.0 }))
}

pub(super) fn handle_binary(vm: &mut Vm, f: impl Fn(f64, f64) -> f64) -> Result<(), Fault> {
    let b = pop_numeric(vm)?;
    let a = pop_numeric(vm)?;
    vm.stack.push(Value::Number(f(a, b)))
}

pub(super) fn handle_neg(vm: &mut Vm) -> Result<(), Fault> {
    let a = pop_numeric(vm)?;
    vm.stack.push(Value::Number(-a))
}

pub(super) fn handle_and(vm: &mut Vm) -> Result<(), Fault> {
    let b = vm.stack.pop()?;
    let a = vm.stack.pop()?;
    vm.stack.push(Value::Number(if a.truthy() && b.truthy() { 1.0 } else { 0.0 }))
}

pub(super) fn handle_or(vm: &mut Vm) -> Result<(), Fault> {
    let b = vm.stack.pop()?;
    let a = vm.stack.pop()?;
    vm.stack.push(Value::Number(if a.truthy() || b.truthy() { 1.0 } else { 0.0 }))
}

pub(super) fn handle_not(vm: &mut Vm) -> Result<(), Fault> {
    let a = vm.stack.pop()?;
    vm.stack.push(Value::Number(if a.truthy() { 0.0 } else { 1.0 }))
}

/// Modulo by zero faults; the source's raw truncation, here `u32 % u32`,
/// narrowed to a byte.
pub(super) fn handle_mod(vm: &mut Vm) -> Result<(), Fault> {
    let b = pop_numeric(vm)?;
    let a = pop_numeric(vm)?;
    let bu = b as i64 as u32;
    if bu == 0 {
        return Err(Fault::ZeroDivision);
    }
    let au = a as i64 as u32;
    let result = (au % bu) as u8;
    vm.stack.push(Value::Number(result as f64))
}

/// `Concat`: pop the right operand then the left. Two strings splice
/// directly; a string and a non-string render the other side through
/// [`Value::display_for_concat`]; two non-strings render both sides.
pub(super) fn handle_concat(vm: &mut Vm) -> Result<(), Fault> {
    let b = vm.stack.pop()?;
    let a = vm.stack.pop()?;
    let result = match (a, b) {
        (Value::Str(sa), Value::Str(sb)) => sa.concat(&sb).ok_or(Fault::StringLength)?,
        (Value::Str(sa), other) => {
            let rendered = EsString::from_str(&other.display_for_concat()).ok_or(Fault::StringLength)?;
            sa.concat(&rendered).ok_or(Fault::StringLength)?
        }
        (other, Value::Str(sb)) => {
            let rendered = EsString::from_str(&other.display_for_concat()).ok_or(Fault::StringLength)?;
            rendered.concat(&sb).ok_or(Fault::StringLength)?
        }
        (a, b) => {
            let sa = EsString::from_str(&a.display_for_concat()).ok_or(Fault::StringLength)?;
            let sb = EsString::from_str(&b.display_for_concat()).ok_or(Fault::StringLength)?;
            sa.concat(&sb).ok_or(Fault::StringLength)?
        }
    };
    vm.stack.push(Value::Str(result))
}
