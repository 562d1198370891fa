/// A raw MIPS I instruction word, little-endian program view.
pub struct Instruction(pub u32);

impl Instruction {
    #[inline(always)]
    pub fn op(&self) -> u32 {
        self.0 >> 26
    }
    #[inline(always)]
    pub fn rs(&self) -> usize {
        ((self.0 >> 21) & 0x1F) as usize
    }
    #[inline(always)]
    pub fn rt(&self) -> usize {
        ((self.0 >> 16) & 0x1F) as usize
    }
    #[inline(always)]
    pub fn rd(&self) -> usize {
        ((self.0 >> 11) & 0x1F) as usize
    }
    #[inline(always)]
    pub fn shift_amount(&self) -> u32 {
        (self.0 >> 6) & 0x1F
    }
    #[inline(always)]
    pub fn function(&self) -> u32 {
        self.0 & 0x3F
    }
    #[inline(always)]
    pub fn signed_immediate16(&self) -> u32 {
        let offset = (self.0 & 0xFFFF) as i16;
        offset as u32
    }
    #[inline(always)]
    pub fn unsigned_immediate16(&self) -> u32 {
        self.0 & 0xFFFF
    }
    #[inline(always)]
    pub fn imm20(&self) -> u32 {
        (self.0 >> 6) & 0xF_FFFF
    }
    #[inline(always)]
    pub fn imm26(&self) -> u32 {
        self.0 & 0x3FF_FFFF
    }
    #[inline(always)]
    pub fn imm25(&self) -> u32 {
        self.0 & 0x1FF_FFFF
    }
}

#[derive(Debug, PartialEq)]
pub enum Opcode {
    // SPECIAL
    NOP,
    SLL,
    SRL,
    SRA,
    SLLV,
    SRLV,
    SRAV,
    JR,
    JALR,
    SYSCALL,
    BREAK,
    MFHI,
    MTHI,
    MFLO,
    MTLO,
    MULT,
    MULTU,
    DIV,
    DIVU,
    ADD,
    ADDU,
    SUB,
    SUBU,
    AND,
    OR,
    XOR,
    NOR,
    SLT,
    SLTU,
    // BCOND
    BLTZ,
    BGEZ,
    BLTZAL,
    BGEZAL,
    // NORMAL
    J,
    JAL,
    BEQ,
    BNE,
    BLEZ,
    BGTZ,
    ADDI,
    ADDIU,
    SLTI,
    SLTIU,
    ANDI,
    ORI,
    XORI,
    LUI,
    // COP0 (16) / COP2 (18)
    MFCn,
    CFCn,
    MTCn,
    CTCn,
    COPn,
    // Loads & stores
    LB,
    LH,
    LWL,
    LW,
    LBU,
    LHU,
    LWR,
    SB,
    SH,
    SWL,
    SW,
    SWR,
    LWC2,
    SWC2,
    // Coprocessors the console does not populate (17, 19, 48, 49, 51, 56, 57, 59)
    MISSING_COP,
    UNKNOWN,
}

impl Opcode {
    pub fn from_instruction(instruction: &Instruction) -> Opcode {
        let op = instruction.op();
        match op {
            0x00 => Self::from_special(instruction),
            0x01 => match instruction.rt() {
                0x00 => Opcode::BLTZ,
                0x01 => Opcode::BGEZ,
                0x10 => Opcode::BLTZAL,
                0x11 => Opcode::BGEZAL,
                rt => {
                    // undocumented BCOND aliases decode by bit 0 of rt
                    if (rt & 1) == 0 {
                        Opcode::BLTZ
                    } else {
                        Opcode::BGEZ
                    }
                }
            },
            0x02 => Opcode::J,
            0x03 => Opcode::JAL,
            0x04 => Opcode::BEQ,
            0x05 => Opcode::BNE,
            0x06 => Opcode::BLEZ,
            0x07 => Opcode::BGTZ,
            0x08 => Opcode::ADDI,
            0x09 => Opcode::ADDIU,
            0x0A => Opcode::SLTI,
            0x0B => Opcode::SLTIU,
            0x0C => Opcode::ANDI,
            0x0D => Opcode::ORI,
            0x0E => Opcode::XORI,
            0x0F => Opcode::LUI,
            0x10 | 0x12 => match instruction.rs() {
                0x00 => Opcode::MFCn,
                0x02 => Opcode::CFCn,
                0x04 => Opcode::MTCn,
                0x06 => Opcode::CTCn,
                _ => Opcode::COPn,
            },
            0x11 | 0x13 => Opcode::MISSING_COP,
            0x20 => Opcode::LB,
            0x21 => Opcode::LH,
            0x22 => Opcode::LWL,
            0x23 => Opcode::LW,
            0x24 => Opcode::LBU,
            0x25 => Opcode::LHU,
            0x26 => Opcode::LWR,
            0x28 => Opcode::SB,
            0x29 => Opcode::SH,
            0x2A => Opcode::SWL,
            0x2B => Opcode::SW,
            0x2E => Opcode::SWR,
            0x30 | 0x31 | 0x33 => Opcode::MISSING_COP,
            0x32 => Opcode::LWC2,
            0x38 | 0x39 | 0x3B => Opcode::MISSING_COP,
            0x3A => Opcode::SWC2,
            _ => Opcode::UNKNOWN,
        }
    }

    fn from_special(instruction: &Instruction) -> Opcode {
        match instruction.function() {
            0x00 => {
                if instruction.rd() == 0 && instruction.rt() == 0 && instruction.shift_amount() == 0 {
                    Opcode::NOP
                } else {
                    Opcode::SLL
                }
            }
            0x02 => Opcode::SRL,
            0x03 => Opcode::SRA,
            0x04 => Opcode::SLLV,
            0x06 => Opcode::SRLV,
            0x07 => Opcode::SRAV,
            0x08 => Opcode::JR,
            0x09 => Opcode::JALR,
            0x0C => Opcode::SYSCALL,
            0x0D => Opcode::BREAK,
            0x10 => Opcode::MFHI,
            0x11 => Opcode::MTHI,
            0x12 => Opcode::MFLO,
            0x13 => Opcode::MTLO,
            0x18 => Opcode::MULT,
            0x19 => Opcode::MULTU,
            0x1A => Opcode::DIV,
            0x1B => Opcode::DIVU,
            0x20 => Opcode::ADD,
            0x21 => Opcode::ADDU,
            0x22 => Opcode::SUB,
            0x23 => Opcode::SUBU,
            0x24 => Opcode::AND,
            0x25 => Opcode::OR,
            0x26 => Opcode::XOR,
            0x27 => Opcode::NOR,
            0x2A => Opcode::SLT,
            0x2B => Opcode::SLTU,
            _ => Opcode::UNKNOWN,
        }
    }
}
