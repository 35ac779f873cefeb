//! Opcode decoding.
//!
//! Each of the 256 base opcodes maps to an [`Instruction`] descriptor that
//! tells the CPU what to fetch and what to do with it. Decoding is total:
//! bytes with no hardware meaning decode to [`InsKind::Invalid`].

use crate::registers::Reg;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsKind {
    /// Opcode with no defined behavior.
    Invalid,
    Nop,
    Ld,
    Ldh,
    Inc,
    Dec,
    Add,
    Adc,
    Sub,
    Sbc,
    And,
    Xor,
    Or,
    Cp,
    Rlca,
    Rrca,
    Rla,
    Rra,
    Daa,
    Cpl,
    Scf,
    Ccf,
    Jr,
    Jp,
    Call,
    Ret,
    Reti,
    Rst,
    Push,
    Pop,
    Halt,
    Stop,
    Di,
    Ei,
    Cb,
}

/// Where an instruction's operand comes from and where its result goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddrMode {
    /// No operand.
    Imp,
    /// Register, 16-bit immediate.
    RD16,
    /// Register, register.
    RR,
    /// Memory at register, register.
    MrR,
    /// Single register.
    R,
    /// Register, 8-bit immediate.
    RD8,
    /// Register, memory at register.
    RMr,
    /// Register, memory at HL then HL+1.
    RHli,
    /// Register, memory at HL then HL-1.
    RHld,
    /// Memory at HL then HL+1, register.
    HliR,
    /// Memory at HL then HL-1, register.
    HldR,
    /// Register, high page address from an 8-bit immediate.
    RA8,
    /// High page address from an 8-bit immediate, register.
    A8R,
    /// HL, SP plus signed 8-bit immediate.
    HlSpr,
    /// 16-bit immediate.
    D16,
    /// 8-bit immediate.
    D8,
    /// Memory at register, 8-bit immediate.
    MrD8,
    /// Memory at register.
    Mr,
    /// Absolute 16-bit address, register.
    A16R,
    /// Register, absolute 16-bit address.
    RA16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cond {
    None,
    Nz,
    Z,
    Nc,
    C,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Instruction {
    pub kind: InsKind,
    pub mode: AddrMode,
    pub reg1: Option<Reg>,
    pub reg2: Option<Reg>,
    pub cond: Cond,
    /// Fixed vector for RST.
    pub param: u8,
}

impl Instruction {
    const fn new(kind: InsKind, mode: AddrMode) -> Self {
        Self {
            kind,
            mode,
            reg1: None,
            reg2: None,
            cond: Cond::None,
            param: 0,
        }
    }

    const fn r(kind: InsKind, mode: AddrMode, reg1: Reg) -> Self {
        Self {
            reg1: Some(reg1),
            ..Self::new(kind, mode)
        }
    }

    const fn rr(kind: InsKind, mode: AddrMode, reg1: Reg, reg2: Reg) -> Self {
        Self {
            reg1: Some(reg1),
            reg2: Some(reg2),
            ..Self::new(kind, mode)
        }
    }

    const fn cond(kind: InsKind, mode: AddrMode, cond: Cond) -> Self {
        Self {
            cond,
            ..Self::new(kind, mode)
        }
    }

    const fn rst(vector: u8) -> Self {
        Self {
            param: vector,
            ..Self::new(InsKind::Rst, AddrMode::Imp)
        }
    }

    pub const fn invalid() -> Self {
        Self::new(InsKind::Invalid, AddrMode::Imp)
    }
}

/// Operand order shared by the `r` field of most opcodes and all CB opcodes.
/// `None` stands for the byte at (HL).
pub const R8_ORDER: [Option<Reg>; 8] = [
    Some(Reg::B),
    Some(Reg::C),
    Some(Reg::D),
    Some(Reg::E),
    Some(Reg::H),
    Some(Reg::L),
    None,
    Some(Reg::A),
];

const fn alu_kind(index: u8) -> InsKind {
    match index & 0x07 {
        0 => InsKind::Add,
        1 => InsKind::Adc,
        2 => InsKind::Sub,
        3 => InsKind::Sbc,
        4 => InsKind::And,
        5 => InsKind::Xor,
        6 => InsKind::Or,
        _ => InsKind::Cp,
    }
}

/// Decode a base (non-CB) opcode.
pub fn decode(opcode: u8) -> Instruction {
    use AddrMode::*;
    use InsKind::*;

    match opcode {
        // LD r, r' block; 0x76 is HALT where LD (HL),(HL) would be
        0x76 => Instruction::new(Halt, Imp),
        0x40..=0x7F => {
            let dst = R8_ORDER[((opcode >> 3) & 0x07) as usize];
            let src = R8_ORDER[(opcode & 0x07) as usize];
            match (dst, src) {
                (Some(d), Some(s)) => Instruction::rr(Ld, RR, d, s),
                (None, Some(s)) => Instruction::rr(Ld, MrR, Reg::HL, s),
                (Some(d), None) => Instruction::rr(Ld, RMr, d, Reg::HL),
                (None, None) => Instruction::invalid(),
            }
        }
        // 8-bit ALU on A
        0x80..=0xBF => {
            let kind = alu_kind(opcode >> 3);
            match R8_ORDER[(opcode & 0x07) as usize] {
                Some(src) => Instruction::rr(kind, RR, Reg::A, src),
                None => Instruction::rr(kind, RMr, Reg::A, Reg::HL),
            }
        }

        0x00 => Instruction::new(Nop, Imp),
        0x01 => Instruction::r(Ld, RD16, Reg::BC),
        0x02 => Instruction::rr(Ld, MrR, Reg::BC, Reg::A),
        0x03 => Instruction::r(Inc, R, Reg::BC),
        0x04 => Instruction::r(Inc, R, Reg::B),
        0x05 => Instruction::r(Dec, R, Reg::B),
        0x06 => Instruction::r(Ld, RD8, Reg::B),
        0x07 => Instruction::new(Rlca, Imp),
        0x08 => Instruction::rr(Ld, A16R, Reg::PC, Reg::SP),
        0x09 => Instruction::rr(Add, RR, Reg::HL, Reg::BC),
        0x0A => Instruction::rr(Ld, RMr, Reg::A, Reg::BC),
        0x0B => Instruction::r(Dec, R, Reg::BC),
        0x0C => Instruction::r(Inc, R, Reg::C),
        0x0D => Instruction::r(Dec, R, Reg::C),
        0x0E => Instruction::r(Ld, RD8, Reg::C),
        0x0F => Instruction::new(Rrca, Imp),

        0x10 => Instruction::new(Stop, D8),
        0x11 => Instruction::r(Ld, RD16, Reg::DE),
        0x12 => Instruction::rr(Ld, MrR, Reg::DE, Reg::A),
        0x13 => Instruction::r(Inc, R, Reg::DE),
        0x14 => Instruction::r(Inc, R, Reg::D),
        0x15 => Instruction::r(Dec, R, Reg::D),
        0x16 => Instruction::r(Ld, RD8, Reg::D),
        0x17 => Instruction::new(Rla, Imp),
        0x18 => Instruction::new(Jr, D8),
        0x19 => Instruction::rr(Add, RR, Reg::HL, Reg::DE),
        0x1A => Instruction::rr(Ld, RMr, Reg::A, Reg::DE),
        0x1B => Instruction::r(Dec, R, Reg::DE),
        0x1C => Instruction::r(Inc, R, Reg::E),
        0x1D => Instruction::r(Dec, R, Reg::E),
        0x1E => Instruction::r(Ld, RD8, Reg::E),
        0x1F => Instruction::new(Rra, Imp),

        0x20 => Instruction::cond(Jr, D8, Cond::Nz),
        0x21 => Instruction::r(Ld, RD16, Reg::HL),
        0x22 => Instruction::rr(Ld, HliR, Reg::HL, Reg::A),
        0x23 => Instruction::r(Inc, R, Reg::HL),
        0x24 => Instruction::r(Inc, R, Reg::H),
        0x25 => Instruction::r(Dec, R, Reg::H),
        0x26 => Instruction::r(Ld, RD8, Reg::H),
        0x27 => Instruction::new(Daa, Imp),
        0x28 => Instruction::cond(Jr, D8, Cond::Z),
        0x29 => Instruction::rr(Add, RR, Reg::HL, Reg::HL),
        0x2A => Instruction::rr(Ld, RHli, Reg::A, Reg::HL),
        0x2B => Instruction::r(Dec, R, Reg::HL),
        0x2C => Instruction::r(Inc, R, Reg::L),
        0x2D => Instruction::r(Dec, R, Reg::L),
        0x2E => Instruction::r(Ld, RD8, Reg::L),
        0x2F => Instruction::new(Cpl, Imp),

        0x30 => Instruction::cond(Jr, D8, Cond::Nc),
        0x31 => Instruction::r(Ld, RD16, Reg::SP),
        0x32 => Instruction::rr(Ld, HldR, Reg::HL, Reg::A),
        0x33 => Instruction::r(Inc, R, Reg::SP),
        0x34 => Instruction::r(Inc, Mr, Reg::HL),
        0x35 => Instruction::r(Dec, Mr, Reg::HL),
        0x36 => Instruction::r(Ld, MrD8, Reg::HL),
        0x37 => Instruction::new(Scf, Imp),
        0x38 => Instruction::cond(Jr, D8, Cond::C),
        0x39 => Instruction::rr(Add, RR, Reg::HL, Reg::SP),
        0x3A => Instruction::rr(Ld, RHld, Reg::A, Reg::HL),
        0x3B => Instruction::r(Dec, R, Reg::SP),
        0x3C => Instruction::r(Inc, R, Reg::A),
        0x3D => Instruction::r(Dec, R, Reg::A),
        0x3E => Instruction::r(Ld, RD8, Reg::A),
        0x3F => Instruction::new(Ccf, Imp),

        0xC0 => Instruction::cond(Ret, Imp, Cond::Nz),
        0xC1 => Instruction::r(Pop, R, Reg::BC),
        0xC2 => Instruction::cond(Jp, D16, Cond::Nz),
        0xC3 => Instruction::new(Jp, D16),
        0xC4 => Instruction::cond(Call, D16, Cond::Nz),
        0xC5 => Instruction::r(Push, R, Reg::BC),
        0xC6 => Instruction::r(Add, RD8, Reg::A),
        0xC7 => Instruction::rst(0x00),
        0xC8 => Instruction::cond(Ret, Imp, Cond::Z),
        0xC9 => Instruction::new(Ret, Imp),
        0xCA => Instruction::cond(Jp, D16, Cond::Z),
        0xCB => Instruction::new(Cb, D8),
        0xCC => Instruction::cond(Call, D16, Cond::Z),
        0xCD => Instruction::new(Call, D16),
        0xCE => Instruction::r(Adc, RD8, Reg::A),
        0xCF => Instruction::rst(0x08),

        0xD0 => Instruction::cond(Ret, Imp, Cond::Nc),
        0xD1 => Instruction::r(Pop, R, Reg::DE),
        0xD2 => Instruction::cond(Jp, D16, Cond::Nc),
        0xD4 => Instruction::cond(Call, D16, Cond::Nc),
        0xD5 => Instruction::r(Push, R, Reg::DE),
        0xD6 => Instruction::r(Sub, RD8, Reg::A),
        0xD7 => Instruction::rst(0x10),
        0xD8 => Instruction::cond(Ret, Imp, Cond::C),
        0xD9 => Instruction::new(Reti, Imp),
        0xDA => Instruction::cond(Jp, D16, Cond::C),
        0xDC => Instruction::cond(Call, D16, Cond::C),
        0xDE => Instruction::r(Sbc, RD8, Reg::A),
        0xDF => Instruction::rst(0x18),

        0xE0 => Instruction::rr(Ldh, A8R, Reg::PC, Reg::A),
        0xE1 => Instruction::r(Pop, R, Reg::HL),
        0xE2 => Instruction::rr(Ld, MrR, Reg::C, Reg::A),
        0xE5 => Instruction::r(Push, R, Reg::HL),
        0xE6 => Instruction::r(And, RD8, Reg::A),
        0xE7 => Instruction::rst(0x20),
        0xE8 => Instruction::r(Add, RD8, Reg::SP),
        0xE9 => Instruction::r(Jp, R, Reg::HL),
        0xEA => Instruction::rr(Ld, A16R, Reg::PC, Reg::A),
        0xEE => Instruction::r(Xor, RD8, Reg::A),
        0xEF => Instruction::rst(0x28),

        0xF0 => Instruction::r(Ldh, RA8, Reg::A),
        0xF1 => Instruction::r(Pop, R, Reg::AF),
        0xF2 => Instruction::rr(Ld, RMr, Reg::A, Reg::C),
        0xF3 => Instruction::new(Di, Imp),
        0xF5 => Instruction::r(Push, R, Reg::AF),
        0xF6 => Instruction::r(Or, RD8, Reg::A),
        0xF7 => Instruction::rst(0x30),
        0xF8 => Instruction::rr(Ld, HlSpr, Reg::HL, Reg::SP),
        0xF9 => Instruction::rr(Ld, RR, Reg::SP, Reg::HL),
        0xFA => Instruction::r(Ld, RA16, Reg::A),
        0xFB => Instruction::new(Ei, Imp),
        0xFE => Instruction::r(Cp, RD8, Reg::A),
        0xFF => Instruction::rst(0x38),

        // D3 DB DD E3 E4 EB EC ED F4 FC FD
        _ => Instruction::invalid(),
    }
}

/// Operation class of a CB-prefixed opcode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CbOp {
    Rlc,
    Rrc,
    Rl,
    Rr,
    Sla,
    Sra,
    Swap,
    Srl,
    Bit(u8),
    Res(u8),
    Set(u8),
}

/// A decoded CB-prefixed opcode: an operation and its 8-bit target, where
/// `None` is the byte at (HL).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CbInstruction {
    pub op: CbOp,
    pub target: Option<Reg>,
}

pub fn decode_cb(opcode: u8) -> CbInstruction {
    let target = R8_ORDER[(opcode & 0x07) as usize];
    let y = (opcode >> 3) & 0x07;
    let op = match opcode >> 6 {
        0 => match y {
            0 => CbOp::Rlc,
            1 => CbOp::Rrc,
            2 => CbOp::Rl,
            3 => CbOp::Rr,
            4 => CbOp::Sla,
            5 => CbOp::Sra,
            6 => CbOp::Swap,
            _ => CbOp::Srl,
        },
        1 => CbOp::Bit(y),
        2 => CbOp::Res(y),
        _ => CbOp::Set(y),
    };
    CbInstruction { op, target }
}
