//! Fixed-size global and local variable tables.
//!
//! Grounded on `e_vm.globals`/`e_vm.locals` in
//! `examples/original_source/vm.h`: flat arrays indexed directly by the
//! decoded operand, no name resolution at runtime (names are resolved at
//! compile time, upstream of this VM).

use crate::error::Fault;
use crate::limits::{GLOBALS, LOCALS};
use crate::value::Value;

/// Per-`Vm` global variable table.
pub struct GlobalTable {
    cells: [Value; GLOBALS],
}

impl GlobalTable {
    pub fn new() -> Self {
        GlobalTable {
            cells: [Value::zero(); GLOBALS],
        }
    }

    pub fn get(&self, index: usize) -> Result<Value, Fault> {
        self.cells.get(index).copied().ok_or(Fault::StackUnderflow)
    }

    pub fn set(&mut self, index: usize, v: Value) -> Result<(), Fault> {
        let cell = self.cells.get_mut(index).ok_or(Fault::StackUnderflow)?;
        *cell = v;
        Ok(())
    }
}

impl Default for GlobalTable {
    fn default() -> Self {
        Self::new()
    }
}

/// Per-call-frame local variable table.
#[derive(Clone, Copy)]
pub struct LocalTable {
    cells: [Value; LOCALS],
}

impl LocalTable {
    pub fn new() -> Self {
        LocalTable {
            cells: [Value::zero(); LOCALS],
        }
    }

    pub fn get(&self, index: usize) -> Result<Value, Fault> {
        self.cells.get(index).copied().ok_or(Fault::StackUnderflow)
    }

    pub fn set(&mut self, index: usize, v: Value) -> Result<(), Fault> {
        let cell = self.cells.get_mut(index).ok_or(Fault::StackUnderflow)?;
        *cell = v;
        Ok(())
    }
}

impl Default for LocalTable {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn global_get_set_round_trips() {
        let mut g = GlobalTable::new();
        g.set(3, Value::Number(9.0)).unwrap();
        assert!(matches!(g.get(3).unwrap(), Value::Number(n) if n == 9.0));
    }

    #[test]
    fn out_of_range_index_faults() {
        let g = GlobalTable::new();
        assert_eq!(g.get(GLOBALS).unwrap_err(), Fault::StackUnderflow);
    }

    #[test]
    fn locals_are_copy_and_independent_per_frame() {
        let mut a = LocalTable::new();
        a.set(0, Value::Number(1.0)).unwrap();
        let b = a;
        a.set(0, Value::Number(2.0)).unwrap();
        assert!(matches!(b.get(0).unwrap(), Value::Number(n) if n == 1.0));
    }
}
