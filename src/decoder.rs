//! Instruction decoder.
//!
//! Grounded on the opcode classification (`sb_ops`) and operand layout in
//! `examples/original_source/vm.h`/`vm.c`, and on the teacher crate's
//! `bytecode.rs` for decoder shape (a flat byte buffer, an instruction
//! pointer, one decode function producing a decoded instruction plus the
//! new IP) — though the byte layout itself is this VM's own, not the
//! teacher's little-endian "OMGB" container format.
//!
//! Every opcode is either single-byte (opcode only) or nine-byte (opcode
//! plus two big-endian `u32` halves that together form a 64-bit payload,
//! reinterpreted as an `f64` called `d_op`). `PushS` additionally consumes
//! `len` raw literal bytes immediately after its nine-byte header.

use crate::error::Fault;
use crate::value::EsString;

/// A fully decoded instruction, ready for dispatch.
#[derive(Debug, Clone, Copy)]
pub enum Instr {
    Nop,
    PushG(u32),
    PopG(u32),
    PushL(u32),
    PopL(u32),
    Push(f64),
    PushS(EsString),
    Data(u32),
    PushA(i32),
    PushAS,
    Eq,
    Lt,
    Gt,
    LtEq,
    GtEq,
    NotEq,
    Add,
    Neg,
    Sub,
    Mul,
    Div,
    And,
    Or,
    Not,
    Concat,
    Mod,
    Jz(u32),
    Jmp(u32),
    RetFromFrame,
    CallFun(u32),
    HostCall(u32),
    Print,
    ArgType,
    Len,
    ArrayCtor,
}

/// Opcode bytes, named exactly as the table in the specification.
mod op {
    pub const NOP: u8 = 0x00;
    pub const PUSHG: u8 = 0x10;
    pub const POPG: u8 = 0x11;
    pub const PUSHL: u8 = 0x12;
    pub const POPL: u8 = 0x13;
    pub const PUSH: u8 = 0x14;
    pub const PUSHS: u8 = 0x15;
    pub const DATA: u8 = 0x16;
    pub const PUSHA: u8 = 0x17;
    pub const PUSHAS: u8 = 0x18;
    pub const EQ: u8 = 0x20;
    pub const LT: u8 = 0x21;
    pub const GT: u8 = 0x22;
    pub const LTEQ: u8 = 0x23;
    pub const GTEQ: u8 = 0x24;
    pub const NOTEQ: u8 = 0x25;
    pub const ADD: u8 = 0x30;
    pub const NEG: u8 = 0x31;
    pub const SUB: u8 = 0x32;
    pub const MUL: u8 = 0x33;
    pub const DIV: u8 = 0x34;
    pub const AND: u8 = 0x35;
    pub const OR: u8 = 0x36;
    pub const NOT: u8 = 0x37;
    pub const CONCAT: u8 = 0x38;
    pub const MOD: u8 = 0x39;
    pub const JZ: u8 = 0x40;
    pub const JMP: u8 = 0x41;
    pub const RET_FROM_FRAME: u8 = 0x42;
    pub const CALLFUN: u8 = 0x43;
    pub const HOSTCALL: u8 = 0x44;
    pub const PRINT: u8 = 0x50;
    pub const ARGTYPE: u8 = 0x51;
    pub const LEN: u8 = 0x52;
    pub const ARRAYCTOR: u8 = 0x53;
}

/// True if `opcode` is encoded as a single byte with no operand field.
fn is_single_byte(opcode: u8) -> bool {
    matches!(
        opcode,
        op::NOP
            | op::PUSHAS
            | op::EQ
            | op::LT
            | op::GT
            | op::LTEQ
            | op::GTEQ
            | op::NOTEQ
            | op::ADD
            | op::NEG
            | op::SUB
            | op::MUL
            | op::DIV
            | op::AND
            | op::OR
            | op::NOT
            | op::CONCAT
            | op::MOD
            | op::RET_FROM_FRAME
            | op::PRINT
            | op::ARGTYPE
            | op::LEN
            | op::ARRAYCTOR
    )
}

/// Reassemble the two big-endian `u32` operand halves into the `d_op`
/// double the way the source's raw-union operand field does.
fn decode_operand(op1: [u8; 4], op2: [u8; 4]) -> f64 {
    let hi = u32::from_be_bytes(op1) as u64;
    let lo = u32::from_be_bytes(op2) as u64;
    f64::from_bits((hi << 32) | lo)
}

/// Truncate a decoded operand into an unsigned index/address/count, the
/// way the source implicitly narrows a `double` into a `uint32_t` field
/// (variable indices, jump/call addresses, host-call argument counts).
fn truncate_index(d: f64) -> u32 {
    d as i64 as u32
}

/// Truncate a decoded operand into a signed `int32_t` the way the source's
/// `E_OP_PUSHA` assigns a raw `double` into the `int32_t pupo_arr_index`
/// field — sign-preserving, unlike [`truncate_index`]'s zero-extension,
/// so a negative immediate stays negative instead of becoming a huge
/// unsigned index.
fn truncate_signed_index(d: f64) -> i32 {
    d as i64 as i32
}

/// Decode one instruction starting at `ip`. Returns the instruction and the
/// new instruction pointer.
pub fn decode(bytes: &[u8], ip: usize) -> Result<(Instr, usize), Fault> {
    let opcode = *bytes
        .get(ip)
        .ok_or_else(|| Fault::Decode(format!("instruction pointer {} past end of program", ip)))?;

    if is_single_byte(opcode) {
        let instr = match opcode {
            op::NOP => Instr::Nop,
            op::PUSHAS => Instr::PushAS,
            op::EQ => Instr::Eq,
            op::LT => Instr::Lt,
            op::GT => Instr::Gt,
            op::LTEQ => Instr::LtEq,
            op::GTEQ => Instr::GtEq,
            op::NOTEQ => Instr::NotEq,
            op::ADD => Instr::Add,
            op::NEG => Instr::Neg,
            op::SUB => Instr::Sub,
            op::MUL => Instr::Mul,
            op::DIV => Instr::Div,
            op::AND => Instr::And,
            op::OR => Instr::Or,
            op::NOT => Instr::Not,
            op::CONCAT => Instr::Concat,
            op::MOD => Instr::Mod,
            op::RET_FROM_FRAME => Instr::RetFromFrame,
            op::PRINT => Instr::Print,
            op::ARGTYPE => Instr::ArgType,
            op::LEN => Instr::Len,
            op::ARRAYCTOR => Instr::ArrayCtor,
            _ => unreachable!("is_single_byte only admits classified opcodes"),
        };
        return Ok((instr, ip + 1));
    }

    if !matches!(
        opcode,
        op::PUSHG
            | op::POPG
            | op::PUSHL
            | op::POPL
            | op::PUSH
            | op::PUSHS
            | op::DATA
            | op::PUSHA
            | op::JZ
            | op::JMP
            | op::CALLFUN
            | op::HOSTCALL
    ) {
        return Err(Fault::InvalidOpcode(opcode));
    }

    let op1_start = ip + 1;
    let op2_start = ip + 5;
    let end = ip + 9;
    if end > bytes.len() {
        return Err(Fault::Decode(format!(
            "nine-byte instruction at {} runs past end of program",
            ip
        )));
    }
    let mut op1 = [0u8; 4];
    let mut op2 = [0u8; 4];
    op1.copy_from_slice(&bytes[op1_start..op1_start + 4]);
    op2.copy_from_slice(&bytes[op2_start..op2_start + 4]);
    let d_op = decode_operand(op1, op2);

    match opcode {
        op::PUSHG => Ok((Instr::PushG(truncate_index(d_op)), end)),
        op::POPG => Ok((Instr::PopG(truncate_index(d_op)), end)),
        op::PUSHL => Ok((Instr::PushL(truncate_index(d_op)), end)),
        op::POPL => Ok((Instr::PopL(truncate_index(d_op)), end)),
        op::PUSH => Ok((Instr::Push(d_op), end)),
        op::DATA => Ok((Instr::Data(truncate_index(d_op)), end)),
        op::PUSHA => Ok((Instr::PushA(truncate_signed_index(d_op)), end)),
        op::JZ => Ok((Instr::Jz(truncate_index(d_op)), end)),
        op::JMP => Ok((Instr::Jmp(truncate_index(d_op)), end)),
        op::CALLFUN => Ok((Instr::CallFun(truncate_index(d_op)), end)),
        op::HOSTCALL => Ok((Instr::HostCall(truncate_index(d_op)), end)),
        op::PUSHS => {
            let len = truncate_index(d_op) as usize;
            let lit_start = end;
            let lit_end = lit_start + len;
            if lit_end > bytes.len() {
                return Err(Fault::Decode(format!(
                    "PushS literal at {} runs past end of program",
                    ip
                )));
            }
            let s = EsString::from_bytes(&bytes[lit_start..lit_end]).ok_or(Fault::StringLength)?;
            Ok((Instr::PushS(s), lit_end))
        }
        _ => Err(Fault::InvalidOpcode(opcode)),
    }
}
