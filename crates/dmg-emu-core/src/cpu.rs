use crate::bits::{U8, U16};
use crate::error::EmulationError;
use crate::instruction::{self, AddrMode, CbOp, Cond, InsKind, Instruction};
use crate::mmu::Mmu;
use crate::registers::{Flag, FlagUpdate::Keep, Reg, Registers};

// Clock ratio per machine cycle
const CYCLES_PER_M_CYCLE: u16 = 4;

/// Operand produced by the addressing-mode fetch stage.
#[derive(Debug, Clone, Copy, Default)]
struct Operand {
    value: u16,
    /// Memory destination for modes that store to memory.
    dest: Option<u16>,
}

pub struct Cpu {
    pub regs: Registers,
    /// Ticks elapsed since power on.
    pub cycles: u64,
    pub ime: bool,
    pub halted: bool,
    ime_enable_delay: u8,
}

impl Cpu {
    /// CPU in the post-boot state.
    pub fn new() -> Self {
        Self::with_registers(Registers::new())
    }

    pub fn with_registers(regs: Registers) -> Self {
        Self {
            regs,
            cycles: 0,
            ime: false,
            halted: false,
            ime_enable_delay: 0,
        }
    }

    /// An EI has executed and IME turns on after the next instruction.
    pub fn ime_pending(&self) -> bool {
        self.ime_enable_delay > 0
    }

    /// Advance every peripheral by `m_cycles` machine cycles. Timer and PPU
    /// see four ticks per machine cycle, DMA moves one byte.
    #[inline]
    fn tick(&mut self, mmu: &mut Mmu, m_cycles: u8) {
        for _ in 0..m_cycles {
            self.cycles += CYCLES_PER_M_CYCLE as u64;
            mmu.timer.step(CYCLES_PER_M_CYCLE, &mut mmu.ints);
            if mmu.ppu.step(CYCLES_PER_M_CYCLE, &mut mmu.ints) {
                mmu.vblank_started();
            }
            mmu.dma_step();
        }
    }

    #[inline(always)]
    fn fetch8(&mut self, mmu: &mut Mmu) -> u8 {
        let pc = self.regs.advance_pc();
        let val = mmu.read_byte(pc);
        self.tick(mmu, 1);
        val
    }

    #[inline(always)]
    fn fetch16(&mut self, mmu: &mut Mmu) -> u16 {
        let lo = self.fetch8(mmu) as u16;
        let hi = self.fetch8(mmu) as u16;
        (hi << 8) | lo
    }

    #[inline(always)]
    fn read8(&mut self, mmu: &mut Mmu, addr: u16) -> u8 {
        let val = mmu.read_byte(addr);
        self.tick(mmu, 1);
        val
    }

    #[inline(always)]
    fn write8(&mut self, mmu: &mut Mmu, addr: u16, val: u8) {
        mmu.write_byte(addr, val);
        self.tick(mmu, 1);
    }

    #[inline(always)]
    fn write16(&mut self, mmu: &mut Mmu, addr: u16, val: u16) {
        self.write8(mmu, addr, val as u8);
        self.write8(mmu, addr.wrapping_add(1), (val >> 8) as u8);
    }

    /// Formatted CPU state string for debugging.
    pub fn debug_state(&self) -> String {
        format!(
            "AF:{:04X} BC:{:04X} DE:{:04X} HL:{:04X} PC:{:04X} SP:{:04X} CY:{}",
            self.regs.get(Reg::AF),
            self.regs.get(Reg::BC),
            self.regs.get(Reg::DE),
            self.regs.get(Reg::HL),
            self.regs.pc(),
            self.regs.sp(),
            self.cycles
        )
    }

    fn push_stack(&mut self, mmu: &mut Mmu, val: u16) {
        self.regs.decrement(Reg::SP);
        self.write8(mmu, self.regs.sp(), (val >> 8) as u8);
        self.regs.decrement(Reg::SP);
        self.write8(mmu, self.regs.sp(), val as u8);
    }

    fn pop_stack(&mut self, mmu: &mut Mmu) -> u16 {
        let lo = self.read8(mmu, self.regs.sp()) as u16;
        self.regs.increment(Reg::SP);
        let hi = self.read8(mmu, self.regs.sp()) as u16;
        self.regs.increment(Reg::SP);
        (hi << 8) | lo
    }

    /// (C) and (a8) forms address the high page.
    #[inline]
    fn indirect_addr(&self, reg: Reg) -> u16 {
        let addr = self.regs.get(reg);
        if reg == Reg::C { 0xFF00 | addr } else { addr }
    }

    fn reg1(ins: &Instruction) -> Reg {
        ins.reg1.unwrap_or(Reg::A)
    }

    fn reg2(ins: &Instruction) -> Reg {
        ins.reg2.unwrap_or(Reg::A)
    }

    /// Read the operand an addressing mode names, consuming one machine
    /// cycle per memory access.
    fn fetch_data(&mut self, mmu: &mut Mmu, ins: &Instruction) -> Operand {
        match ins.mode {
            AddrMode::Imp => Operand::default(),
            AddrMode::R => Operand {
                value: self.regs.get(Self::reg1(ins)),
                dest: None,
            },
            AddrMode::RR => Operand {
                value: self.regs.get(Self::reg2(ins)),
                dest: None,
            },
            AddrMode::RD8 | AddrMode::D8 | AddrMode::HlSpr => Operand {
                value: self.fetch8(mmu) as u16,
                dest: None,
            },
            AddrMode::RD16 | AddrMode::D16 => Operand {
                value: self.fetch16(mmu),
                dest: None,
            },
            AddrMode::MrR => Operand {
                value: self.regs.get(Self::reg2(ins)),
                dest: Some(self.indirect_addr(Self::reg1(ins))),
            },
            AddrMode::RMr => {
                let addr = self.indirect_addr(Self::reg2(ins));
                Operand {
                    value: self.read8(mmu, addr) as u16,
                    dest: None,
                }
            }
            AddrMode::RHli | AddrMode::RHld => {
                let addr = self.regs.get(Reg::HL);
                let value = self.read8(mmu, addr) as u16;
                if ins.mode == AddrMode::RHli {
                    self.regs.increment(Reg::HL);
                } else {
                    self.regs.decrement(Reg::HL);
                }
                Operand { value, dest: None }
            }
            AddrMode::HliR | AddrMode::HldR => {
                let dest = self.regs.get(Reg::HL);
                if ins.mode == AddrMode::HliR {
                    self.regs.increment(Reg::HL);
                } else {
                    self.regs.decrement(Reg::HL);
                }
                Operand {
                    value: self.regs.get(Self::reg2(ins)),
                    dest: Some(dest),
                }
            }
            AddrMode::RA8 => {
                let addr = 0xFF00 | self.fetch8(mmu) as u16;
                Operand {
                    value: self.read8(mmu, addr) as u16,
                    dest: None,
                }
            }
            AddrMode::A8R => {
                let dest = 0xFF00 | self.fetch8(mmu) as u16;
                Operand {
                    value: self.regs.get(Self::reg2(ins)),
                    dest: Some(dest),
                }
            }
            AddrMode::MrD8 => {
                let value = self.fetch8(mmu) as u16;
                Operand {
                    value,
                    dest: Some(self.regs.get(Self::reg1(ins))),
                }
            }
            AddrMode::Mr => {
                let addr = self.regs.get(Self::reg1(ins));
                Operand {
                    value: self.read8(mmu, addr) as u16,
                    dest: Some(addr),
                }
            }
            AddrMode::A16R => {
                let dest = self.fetch16(mmu);
                Operand {
                    value: self.regs.get(Self::reg2(ins)),
                    dest: Some(dest),
                }
            }
            AddrMode::RA16 => {
                let addr = self.fetch16(mmu);
                Operand {
                    value: self.read8(mmu, addr) as u16,
                    dest: None,
                }
            }
        }
    }

    fn condition_met(&self, cond: Cond) -> bool {
        match cond {
            Cond::None => true,
            Cond::Nz => !self.regs.flag(Flag::Z),
            Cond::Z => self.regs.flag(Flag::Z),
            Cond::Nc => !self.regs.flag(Flag::C),
            Cond::C => self.regs.flag(Flag::C),
        }
    }

    fn carry_in(&self) -> u8 {
        self.regs.flag(Flag::C) as u8
    }

    /// SP plus a signed byte, with H and C from the unsigned low-byte add.
    fn sp_plus_offset(&mut self, offset: u8) -> u16 {
        let sp = self.regs.sp();
        let e = offset as u16;
        self.regs.set_flags(
            false,
            false,
            (sp & 0x0F) + (e & 0x0F) > 0x0F,
            (sp & 0xFF) + (e & 0xFF) > 0xFF,
        );
        let mut sum = U16::new(sp);
        sum.add_signed(offset);
        sum.get()
    }

    /// Execute one instruction, or one idle machine cycle while halted, and
    /// then service interrupts.
    pub fn step(&mut self, mmu: &mut Mmu) -> Result<(), EmulationError> {
        if self.halted {
            self.tick(mmu, 1);
            // HALT ends on any enabled request, whatever IME says
            if mmu.ints.pending() != 0 {
                self.halted = false;
            }
            self.handle_interrupts(mmu);
            return Ok(());
        }

        #[cfg(feature = "cpu-trace")]
        log::trace!("{}", self.debug_state());

        let enable_after = self.ime_enable_delay == 1;
        let pc = self.regs.pc();
        let opcode = self.fetch8(mmu);
        let ins = instruction::decode(opcode);
        let operand = self.fetch_data(mmu, &ins);
        self.execute(mmu, opcode, pc, &ins, operand)?;

        if enable_after && self.ime_enable_delay > 0 {
            self.ime = true;
        }
        if self.ime_enable_delay > 0 {
            self.ime_enable_delay -= 1;
        }
        self.handle_interrupts(mmu);
        Ok(())
    }

    fn handle_interrupts(&mut self, mmu: &mut Mmu) {
        if !self.ime {
            return;
        }
        let Some(source) = mmu.ints.highest_pending() else {
            return;
        };

        self.ime = false;
        self.halted = false;
        mmu.ints.acknowledge(source);
        let return_pc = self.regs.pc();
        self.push_stack(mmu, return_pc);
        self.regs.set_pc(source.vector());
        self.tick(mmu, 3);
    }

    fn execute(
        &mut self,
        mmu: &mut Mmu,
        opcode: u8,
        pc: u16,
        ins: &Instruction,
        op: Operand,
    ) -> Result<(), EmulationError> {
        match ins.kind {
            InsKind::Invalid => return Err(EmulationError::InvalidOpcode { opcode, pc }),
            InsKind::Stop => return Err(EmulationError::Stopped { pc }),
            InsKind::Nop => {}
            InsKind::Halt => self.halted = true,
            InsKind::Di => {
                self.ime = false;
                self.ime_enable_delay = 0;
            }
            InsKind::Ei => self.ime_enable_delay = 2,

            InsKind::Ld => self.exec_ld(mmu, ins, op),
            InsKind::Ldh => match op.dest {
                Some(dest) => self.write8(mmu, dest, op.value as u8),
                None => self.regs.set8(Reg::A, op.value as u8),
            },

            InsKind::Inc | InsKind::Dec => self.exec_inc_dec(mmu, opcode, ins, op),

            InsKind::Add => self.exec_add(mmu, ins, op),
            InsKind::Adc => {
                let a = self.regs.get8(Reg::A);
                let n = op.value as u8;
                let c = self.carry_in();
                let res = a.wrapping_add(n).wrapping_add(c);
                self.regs.set_flags(
                    res == 0,
                    false,
                    (a & 0x0F) + (n & 0x0F) + c > 0x0F,
                    a as u16 + n as u16 + c as u16 > 0xFF,
                );
                self.regs.set8(Reg::A, res);
            }
            InsKind::Sub | InsKind::Cp => {
                let a = self.regs.get8(Reg::A);
                let n = op.value as u8;
                let res = a.wrapping_sub(n);
                self.regs
                    .set_flags(res == 0, true, (a & 0x0F) < (n & 0x0F), a < n);
                if ins.kind == InsKind::Sub {
                    self.regs.set8(Reg::A, res);
                }
            }
            InsKind::Sbc => {
                let a = self.regs.get8(Reg::A);
                let n = op.value as u8;
                let c = self.carry_in();
                let res = a.wrapping_sub(n).wrapping_sub(c);
                self.regs.set_flags(
                    res == 0,
                    true,
                    (a & 0x0F) < (n & 0x0F) + c,
                    (a as u16) < n as u16 + c as u16,
                );
                self.regs.set8(Reg::A, res);
            }
            InsKind::And => {
                let res = self.regs.get8(Reg::A) & op.value as u8;
                self.regs.set8(Reg::A, res);
                self.regs.set_flags(res == 0, false, true, false);
            }
            InsKind::Xor => {
                let res = self.regs.get8(Reg::A) ^ op.value as u8;
                self.regs.set8(Reg::A, res);
                self.regs.set_flags(res == 0, false, false, false);
            }
            InsKind::Or => {
                let res = self.regs.get8(Reg::A) | op.value as u8;
                self.regs.set8(Reg::A, res);
                self.regs.set_flags(res == 0, false, false, false);
            }

            InsKind::Rlca => {
                let a = self.regs.get8(Reg::A);
                self.regs.set8(Reg::A, a.rotate_left(1));
                self.regs.set_flags(false, false, false, a & 0x80 != 0);
            }
            InsKind::Rrca => {
                let a = self.regs.get8(Reg::A);
                self.regs.set8(Reg::A, a.rotate_right(1));
                self.regs.set_flags(false, false, false, a & 0x01 != 0);
            }
            InsKind::Rla => {
                let a = self.regs.get8(Reg::A);
                self.regs.set8(Reg::A, (a << 1) | self.carry_in());
                self.regs.set_flags(false, false, false, a & 0x80 != 0);
            }
            InsKind::Rra => {
                let a = self.regs.get8(Reg::A);
                self.regs.set8(Reg::A, (a >> 1) | (self.carry_in() << 7));
                self.regs.set_flags(false, false, false, a & 0x01 != 0);
            }
            InsKind::Daa => self.exec_daa(),
            InsKind::Cpl => {
                let a = self.regs.get8(Reg::A);
                self.regs.set8(Reg::A, !a);
                self.regs.set_flags(Keep, true, true, Keep);
            }
            InsKind::Scf => self.regs.set_flags(Keep, false, false, true),
            InsKind::Ccf => {
                let c = self.regs.flag(Flag::C);
                self.regs.set_flags(Keep, false, false, !c);
            }

            InsKind::Jr => {
                if self.condition_met(ins.cond) {
                    self.regs.jump_relative(op.value as u8);
                    self.tick(mmu, 1);
                }
            }
            InsKind::Jp => {
                if ins.mode == AddrMode::R {
                    // JP HL
                    self.regs.set_pc(op.value);
                } else if self.condition_met(ins.cond) {
                    self.regs.set_pc(op.value);
                    self.tick(mmu, 1);
                }
            }
            InsKind::Call => {
                if self.condition_met(ins.cond) {
                    self.tick(mmu, 1);
                    let ret = self.regs.pc();
                    self.push_stack(mmu, ret);
                    self.regs.set_pc(op.value);
                }
            }
            InsKind::Ret => {
                if ins.cond != Cond::None {
                    self.tick(mmu, 1);
                }
                if self.condition_met(ins.cond) {
                    self.ret(mmu);
                }
            }
            InsKind::Reti => {
                self.ime = true;
                self.ime_enable_delay = 0;
                self.ret(mmu);
            }
            InsKind::Rst => {
                self.tick(mmu, 1);
                let ret = self.regs.pc();
                self.push_stack(mmu, ret);
                self.regs.set_pc(ins.param as u16);
            }
            InsKind::Push => {
                self.tick(mmu, 1);
                self.push_stack(mmu, op.value);
            }
            InsKind::Pop => {
                let val = self.pop_stack(mmu);
                // AF keeps the low nibble of F clear
                self.regs.set(Self::reg1(ins), val);
            }

            InsKind::Cb => self.exec_cb(mmu, op.value as u8),
        }
        Ok(())
    }

    fn ret(&mut self, mmu: &mut Mmu) {
        let addr = self.pop_stack(mmu);
        self.regs.set_pc(addr);
        self.tick(mmu, 1);
    }

    fn exec_ld(&mut self, mmu: &mut Mmu, ins: &Instruction, op: Operand) {
        if let Some(dest) = op.dest {
            if ins.reg2 == Some(Reg::SP) {
                // LD (a16),SP
                self.write16(mmu, dest, op.value);
            } else {
                self.write8(mmu, dest, op.value as u8);
            }
            return;
        }

        match ins.mode {
            AddrMode::HlSpr => {
                let res = self.sp_plus_offset(op.value as u8);
                self.regs.set(Reg::HL, res);
                self.tick(mmu, 1);
            }
            AddrMode::RR if Self::reg1(ins) == Reg::SP => {
                self.regs.set_sp(op.value);
                self.tick(mmu, 1);
            }
            _ => self.regs.set(Self::reg1(ins), op.value),
        }
    }

    fn exec_inc_dec(&mut self, mmu: &mut Mmu, opcode: u8, ins: &Instruction, op: Operand) {
        let inc = ins.kind == InsKind::Inc;

        // INC rr / DEC rr (x3, xB) touch no flags and spend an extra cycle
        if opcode & 0x07 == 0x03 {
            let reg = Self::reg1(ins);
            if inc {
                self.regs.increment(reg);
            } else {
                self.regs.decrement(reg);
            }
            self.tick(mmu, 1);
            return;
        }

        let val = op.value as u8;
        let res = if inc {
            val.wrapping_add(1)
        } else {
            val.wrapping_sub(1)
        };
        let half = if inc {
            val & 0x0F == 0x0F
        } else {
            val & 0x0F == 0x00
        };
        self.regs.set_flags(res == 0, !inc, half, Keep);

        match op.dest {
            Some(addr) => self.write8(mmu, addr, res),
            None => self.regs.set8(Self::reg1(ins), res),
        }
    }

    fn exec_add(&mut self, mmu: &mut Mmu, ins: &Instruction, op: Operand) {
        match Self::reg1(ins) {
            Reg::HL => {
                let hl = self.regs.get(Reg::HL);
                let val = op.value;
                self.regs.set_flags(
                    Keep,
                    false,
                    (hl & 0x0FFF) + (val & 0x0FFF) > 0x0FFF,
                    hl as u32 + val as u32 > 0xFFFF,
                );
                self.regs.set(Reg::HL, hl.wrapping_add(val));
                self.tick(mmu, 1);
            }
            Reg::SP => {
                let res = self.sp_plus_offset(op.value as u8);
                self.regs.set_sp(res);
                self.tick(mmu, 2);
            }
            _ => {
                let a = self.regs.get8(Reg::A);
                let n = op.value as u8;
                let res = a.wrapping_add(n);
                self.regs.set_flags(
                    res == 0,
                    false,
                    (a & 0x0F) + (n & 0x0F) > 0x0F,
                    a as u16 + n as u16 > 0xFF,
                );
                self.regs.set8(Reg::A, res);
            }
        }
    }

    fn exec_daa(&mut self) {
        let mut a = U8::new(self.regs.get8(Reg::A));
        let n = self.regs.flag(Flag::N);
        let h = self.regs.flag(Flag::H);
        let mut carry = self.regs.flag(Flag::C);

        let mut adjust = 0u8;
        if h || (!n && a.get() & 0x0F > 0x09) {
            adjust |= 0x06;
        }
        if carry || (!n && a.get() > 0x99) {
            adjust |= 0x60;
            carry = true;
        }
        if n {
            a.sub(adjust);
        } else {
            a.add(adjust);
        }

        self.regs.set8(Reg::A, a.get());
        self.regs.set_flags(a.get() == 0, Keep, false, carry);
    }

    fn exec_cb(&mut self, mmu: &mut Mmu, opcode: u8) {
        let cb = instruction::decode_cb(opcode);
        let val = match cb.target {
            Some(reg) => self.regs.get8(reg),
            None => self.read8(mmu, self.regs.get(Reg::HL)),
        };

        let res = match cb.op {
            CbOp::Bit(bit) => {
                self.regs
                    .set_flags(val & (1 << bit) == 0, false, true, Keep);
                return;
            }
            CbOp::Res(bit) => val & !(1 << bit),
            CbOp::Set(bit) => val | (1 << bit),
            shift => {
                let (res, carry) = match shift {
                    CbOp::Rlc => (val.rotate_left(1), val & 0x80 != 0),
                    CbOp::Rrc => (val.rotate_right(1), val & 0x01 != 0),
                    CbOp::Rl => ((val << 1) | self.carry_in(), val & 0x80 != 0),
                    CbOp::Rr => ((val >> 1) | (self.carry_in() << 7), val & 0x01 != 0),
                    CbOp::Sla => (val << 1, val & 0x80 != 0),
                    CbOp::Sra => ((val >> 1) | (val & 0x80), val & 0x01 != 0),
                    CbOp::Swap => (val.rotate_left(4), false),
                    _ => (val >> 1, val & 0x01 != 0),
                };
                self.regs.set_flags(res == 0, false, false, carry);
                res
            }
        };

        match cb.target {
            Some(reg) => self.regs.set8(reg, res),
            None => self.write8(mmu, self.regs.get(Reg::HL), res),
        }
    }
}

impl Default for Cpu {
    fn default() -> Self {
        Self::new()
    }
}
