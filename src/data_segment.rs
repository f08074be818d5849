//! Read-only data segment for inline string literals.
//!
//! Grounded on the data-segment copy in `e_vm_parse_bytes`
//! (`examples/original_source/vm.c`): bytecode carries a fixed-size blob
//! appended after the instruction stream, and string-literal opcodes
//! address into it by byte offset.

use crate::error::Fault;
use crate::limits::DS;
use crate::value::EsString;

/// Fixed-capacity byte segment loaded once from a bytecode image.
pub struct DataSegment {
    bytes: [u8; DS],
    len: usize,
}

impl DataSegment {
    pub fn empty() -> Self {
        DataSegment {
            bytes: [0u8; DS],
            len: 0,
        }
    }

    /// Load the segment from a byte slice, rejecting anything over `DS`.
    pub fn load(src: &[u8]) -> Result<Self, Fault> {
        if src.len() > DS {
            return Err(Fault::Decode(format!(
                "data segment of {} bytes exceeds capacity {}",
                src.len(),
                DS
            )));
        }
        let mut bytes = [0u8; DS];
        bytes[..src.len()].copy_from_slice(src);
        Ok(DataSegment {
            bytes,
            len: src.len(),
        })
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Borrow the loaded portion of the segment as a plain byte slice, for
    /// the decoder to walk directly.
    pub fn as_slice(&self) -> &[u8] {
        &self.bytes[..self.len]
    }

    pub fn byte(&self, offset: usize) -> Result<u8, Fault> {
        if offset >= self.len {
            return Err(Fault::Decode(format!(
                "data segment offset {} out of range",
                offset
            )));
        }
        Ok(self.bytes[offset])
    }

    /// Read a length-prefixed string literal at `offset`: one byte giving
    /// the length, followed by that many bytes of content.
    pub fn read_string(&self, offset: usize) -> Result<EsString, Fault> {
        let n = self.byte(offset)? as usize;
        let start = offset + 1;
        let end = start + n;
        if end > self.len {
            return Err(Fault::Decode(format!(
                "string literal at offset {} runs past data segment end",
                offset
            )));
        }
        EsString::from_bytes(&self.bytes[start..end])
            .ok_or(Fault::StringLength)
    }
}

impl Default for DataSegment {
    fn default() -> Self {
        Self::empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_and_read_byte() {
        let ds = DataSegment::load(&[1, 2, 3]).unwrap();
        assert_eq!(ds.byte(1).unwrap(), 2);
    }

    #[test]
    fn oversized_source_rejected() {
        let big = vec![0u8; DS + 1];
        assert!(DataSegment::load(&big).is_err());
    }

    #[test]
    fn read_length_prefixed_string() {
        let mut src = vec![3u8];
        src.extend_from_slice(b"abc");
        let ds = DataSegment::load(&src).unwrap();
        let s = ds.read_string(0).unwrap();
        assert_eq!(s.as_str(), "abc");
    }

    #[test]
    fn out_of_range_offset_faults() {
        let ds = DataSegment::load(&[1, 2]).unwrap();
        assert!(ds.byte(10).is_err());
    }
}
