//! Call-frame stack.
//!
//! Grounded on `e_callframe` and the `E_OP_JMPFUN`/`E_OP_JFS` handling in
//! `examples/original_source/vm.c`: a call snapshots the return address
//! and a fresh copy of the local table; a return discards the frame and
//! restores the caller's locals and instruction pointer.

use crate::error::Fault;
use crate::limits::FRAMES;
use crate::vars::LocalTable;

/// One activation record: where to resume the caller, and the locals that
/// were live at the point of call.
#[derive(Clone, Copy)]
pub struct CallFrame {
    pub return_addr: usize,
    pub locals: LocalTable,
    /// Array heap slots allocated while this frame was on top, released on
    /// return. Bounded the same as the array heap itself.
    pub owned_arrays: [Option<usize>; crate::limits::ARRAY_SLOTS],
    pub owned_count: usize,
}

impl CallFrame {
    pub fn new(return_addr: usize, locals: LocalTable) -> Self {
        CallFrame {
            return_addr,
            locals,
            owned_arrays: [None; crate::limits::ARRAY_SLOTS],
            owned_count: 0,
        }
    }

    /// Record an array slot as owned by this frame, so it is released on
    /// `RetFromFrame`.
    pub fn own(&mut self, slot: usize) {
        if self.owned_count < self.owned_arrays.len() {
            self.owned_arrays[self.owned_count] = Some(slot);
            self.owned_count += 1;
        }
    }
}

/// Fixed-depth call-frame stack.
pub struct FrameStack {
    frames: [Option<CallFrame>; FRAMES],
    top: usize,
}

impl FrameStack {
    pub fn new() -> Self {
        FrameStack {
            frames: [None; FRAMES],
            top: 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.top == 0
    }

    pub fn push(&mut self, frame: CallFrame) -> Result<(), Fault> {
        if self.top >= FRAMES {
            return Err(Fault::FrameOverflow);
        }
        self.frames[self.top] = Some(frame);
        self.top += 1;
        Ok(())
    }

    pub fn pop(&mut self) -> Result<CallFrame, Fault> {
        if self.top == 0 {
            return Err(Fault::FrameUnderflow);
        }
        self.top -= 1;
        self.frames[self.top].take().ok_or(Fault::FrameUnderflow)
    }

    pub fn current_mut(&mut self) -> Result<&mut CallFrame, Fault> {
        if self.top == 0 {
            return Err(Fault::FrameUnderflow);
        }
        self.frames[self.top - 1].as_mut().ok_or(Fault::FrameUnderflow)
    }

    pub fn current(&self) -> Result<&CallFrame, Fault> {
        if self.top == 0 {
            return Err(Fault::FrameUnderflow);
        }
        self.frames[self.top - 1].as_ref().ok_or(Fault::FrameUnderflow)
    }
}

impl Default for FrameStack {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_pop_round_trips() {
        let mut fs = FrameStack::new();
        fs.push(CallFrame::new(42, LocalTable::new())).unwrap();
        let f = fs.pop().unwrap();
        assert_eq!(f.return_addr, 42);
        assert!(fs.is_empty());
    }

    #[test]
    fn pop_on_empty_underflows() {
        let mut fs = FrameStack::new();
        assert_eq!(fs.pop().unwrap_err(), Fault::FrameUnderflow);
    }

    #[test]
    fn push_past_capacity_overflows() {
        let mut fs = FrameStack::new();
        for _ in 0..FRAMES {
            fs.push(CallFrame::new(0, LocalTable::new())).unwrap();
        }
        assert_eq!(
            fs.push(CallFrame::new(0, LocalTable::new())).unwrap_err(),
            Fault::FrameOverflow
        );
    }

    #[test]
    fn owned_arrays_tracked_for_release() {
        let mut frame = CallFrame::new(0, LocalTable::new());
        frame.own(3);
        frame.own(5);
        assert_eq!(frame.owned_count, 2);
        assert_eq!(frame.owned_arrays[0], Some(3));
        assert_eq!(frame.owned_arrays[1], Some(5));
    }
}
