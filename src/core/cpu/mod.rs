use crate::core::cpu::cop0::{Cop0, GENERAL_EXCEPTION_VECTOR, RESET_EXCEPTION_VECTOR};
use crate::core::cpu::cop2::Gte;
use crate::core::cpu::icache::InstructionCache;
use crate::core::cpu::instruction::{Instruction, Opcode};
use crate::core::interlink::{BusHolder, Interlink};
use crate::core::{swap_endianness, swap_halfword};
use std::cmp;
use tracing::{debug, info, warn};

pub mod cop0;
pub mod cop2;
pub mod icache;
pub mod instruction;

const ICACHE_REFILL_CYCLES: usize = 8;
const SCRATCHPAD_BASE: u32 = 0x1F80_0000;
const SCRATCHPAD_END: u32 = 0x1F80_0400;

/*
Exception codes, as they end up in CAUSE.Excode:
  00h INT     Interrupt
  04h AdEL    Address error on load or instruction fetch
  05h AdES    Address error on store
  06h IBE     Bus error on instruction fetch
  07h DBE     Bus error on data load/store
  08h Syscall
  09h BP      Break instruction
  0Ah RI      Reserved instruction
  0Bh CpU     Coprocessor unusable
  0Ch Ov      Arithmetic overflow
 */
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ExceptionReason {
    Interrupt,
    AddressErrorLoad,
    AddressErrorStore,
    InstructionBusError,
    SysCall,
    BreakPoint,
    ReservedInstruction,
    CoprocessorUnusable,
    ArithmeticOverflow,
    Reset,
}

impl ExceptionReason {
    pub fn code(&self) -> u32 {
        use ExceptionReason::*;
        match self {
            Interrupt => 0,
            AddressErrorLoad => 4,
            AddressErrorStore => 5,
            InstructionBusError => 6,
            SysCall => 8,
            BreakPoint => 9,
            ReservedInstruction => 10,
            CoprocessorUnusable => 11,
            ArithmeticOverflow => 12,
            Reset => 0,
        }
    }
}

/// A fault detected while executing one instruction. Converted into the
/// pending `MipsException` record at the single drain point.
#[derive(Debug)]
enum Fault {
    AddressErrorLoad(u32),
    AddressErrorStore(u32),
    SysCall,
    BreakPoint,
    ReservedInstruction,
    CoprocessorUnusable(usize),
    ArithmeticOverflow,
    // BIU is owned by another master; not an architectural exception
    BusWait,
}

type OpResult = Result<(), Fault>;

/// The pending exception record. `pc_origin` already points at the branch
/// when the fault hit a delay slot.
#[derive(Debug, Clone, Copy)]
pub struct MipsException {
    pub reason: ExceptionReason,
    pub pc_origin: u32,
    pub bad_addr: u32,
    pub cop_num: usize,
    pub in_branch_delay: bool,
}

const OP_TABLE_LEN: usize = Opcode::UNKNOWN as usize + 1;

pub struct Cpu {
    op_functions: [fn(&mut Cpu, &mut Interlink, &Instruction) -> OpResult; OP_TABLE_LEN],
    cop0: Cop0,
    gte: Gte,
    i_cache: InstructionCache,
    regs: [u32; 32],
    pc: u32,
    hi: u32,
    lo: u32,
    jump_address: u32,
    jump_pending: bool,
    prev_was_branch: bool,
    is_branch: bool,
    cycles: usize,
    op_cycles: usize,
    gte_cycles: usize,
    exception: Option<MipsException>,
    bios_tty_capture_enabled: bool,
    bios_tty_buffer: String,
}

impl Cpu {
    pub fn new() -> Self {
        let mut cpu = Cpu {
            op_functions: [Cpu::op_unknown; OP_TABLE_LEN],
            cop0: Cop0::new(),
            gte: Gte::new(),
            i_cache: InstructionCache::new(),
            regs: [0; 32],
            pc: RESET_EXCEPTION_VECTOR,
            hi: 0,
            lo: 0,
            jump_address: 0,
            jump_pending: false,
            prev_was_branch: false,
            is_branch: false,
            cycles: 0,
            op_cycles: 0,
            gte_cycles: 0,
            exception: None,
            bios_tty_capture_enabled: false,
            bios_tty_buffer: String::new(),
        };
        cpu.init_op_functions();
        cpu
    }

    fn init_op_functions(&mut self) {
        use Opcode::*;
        self.op_functions[NOP as usize] = Cpu::op_nop;
        self.op_functions[LUI as usize] = Cpu::op_lui;
        // shift immediate
        self.op_functions[SLL as usize] = Cpu::op_shift::<true, false, true>;
        self.op_functions[SRL as usize] = Cpu::op_shift::<false, false, true>;
        self.op_functions[SRA as usize] = Cpu::op_shift::<false, true, true>;
        // shift by register
        self.op_functions[SLLV as usize] = Cpu::op_shift::<true, false, false>;
        self.op_functions[SRLV as usize] = Cpu::op_shift::<false, false, false>;
        self.op_functions[SRAV as usize] = Cpu::op_shift::<false, true, false>;
        // jumps
        self.op_functions[JR as usize] = Cpu::op_jr;
        self.op_functions[JALR as usize] = Cpu::op_jalr;
        self.op_functions[J as usize] = Cpu::op_j::<false>;
        self.op_functions[JAL as usize] = Cpu::op_j::<true>;
        // syscall / break
        self.op_functions[SYSCALL as usize] = Cpu::op_syscall;
        self.op_functions[BREAK as usize] = Cpu::op_break;
        // hi/lo moves
        self.op_functions[MFHI as usize] = Cpu::op_mf_lohi::<false>;
        self.op_functions[MFLO as usize] = Cpu::op_mf_lohi::<true>;
        self.op_functions[MTHI as usize] = Cpu::op_mt_lohi::<false>;
        self.op_functions[MTLO as usize] = Cpu::op_mt_lohi::<true>;
        // mult / div
        self.op_functions[MULT as usize] = Cpu::op_mult::<true>;
        self.op_functions[MULTU as usize] = Cpu::op_mult::<false>;
        self.op_functions[DIV as usize] = Cpu::op_div::<true>;
        self.op_functions[DIVU as usize] = Cpu::op_div::<false>;
        // add / sub
        self.op_functions[ADD as usize] = Cpu::op_arithmetic::<true, true, false>;
        self.op_functions[ADDU as usize] = Cpu::op_arithmetic::<true, false, false>;
        self.op_functions[SUB as usize] = Cpu::op_arithmetic::<false, true, false>;
        self.op_functions[SUBU as usize] = Cpu::op_arithmetic::<false, false, false>;
        self.op_functions[ADDI as usize] = Cpu::op_arithmetic::<true, true, true>;
        self.op_functions[ADDIU as usize] = Cpu::op_arithmetic::<true, false, true>;
        // logical
        self.op_functions[AND as usize] = Cpu::op_and;
        self.op_functions[OR as usize] = Cpu::op_or;
        self.op_functions[XOR as usize] = Cpu::op_xor;
        self.op_functions[NOR as usize] = Cpu::op_nor;
        self.op_functions[ANDI as usize] = Cpu::op_andi;
        self.op_functions[ORI as usize] = Cpu::op_ori;
        self.op_functions[XORI as usize] = Cpu::op_xori;
        // compare
        self.op_functions[SLT as usize] = Cpu::op_compare::<true, false>;
        self.op_functions[SLTU as usize] = Cpu::op_compare::<false, false>;
        self.op_functions[SLTI as usize] = Cpu::op_compare::<true, true>;
        self.op_functions[SLTIU as usize] = Cpu::op_compare::<false, true>;
        // branches
        self.op_functions[BLTZ as usize] = Cpu::op_bltz;
        self.op_functions[BGEZ as usize] = Cpu::op_bgez;
        self.op_functions[BLTZAL as usize] = Cpu::op_bltzal;
        self.op_functions[BGEZAL as usize] = Cpu::op_bgezal;
        self.op_functions[BEQ as usize] = Cpu::op_beq;
        self.op_functions[BNE as usize] = Cpu::op_bne;
        self.op_functions[BLEZ as usize] = Cpu::op_blez;
        self.op_functions[BGTZ as usize] = Cpu::op_bgtz;
        // coprocessor moves & commands
        self.op_functions[MFCn as usize] = Cpu::op_mfc::<false>;
        self.op_functions[CFCn as usize] = Cpu::op_mfc::<true>;
        self.op_functions[MTCn as usize] = Cpu::op_mtc::<false>;
        self.op_functions[CTCn as usize] = Cpu::op_mtc::<true>;
        self.op_functions[COPn as usize] = Cpu::op_copn;
        self.op_functions[MISSING_COP as usize] = Cpu::op_missing_cop;
        // loads & stores
        self.op_functions[LB as usize] = Cpu::op_lb::<true>;
        self.op_functions[LBU as usize] = Cpu::op_lb::<false>;
        self.op_functions[LH as usize] = Cpu::op_lh::<true>;
        self.op_functions[LHU as usize] = Cpu::op_lh::<false>;
        self.op_functions[LW as usize] = Cpu::op_lw;
        self.op_functions[LWL as usize] = Cpu::op_lwl;
        self.op_functions[LWR as usize] = Cpu::op_lwr;
        self.op_functions[SB as usize] = Cpu::op_sb;
        self.op_functions[SH as usize] = Cpu::op_sh;
        self.op_functions[SW as usize] = Cpu::op_sw;
        self.op_functions[SWL as usize] = Cpu::op_swl;
        self.op_functions[SWR as usize] = Cpu::op_swr;
        self.op_functions[LWC2 as usize] = Cpu::op_lwc2;
        self.op_functions[SWC2 as usize] = Cpu::op_swc2;
    }

    pub fn reset(&mut self) {
        self.pc = RESET_EXCEPTION_VECTOR;
        self.regs = [0; 32];
        self.hi = 0;
        self.lo = 0;
        self.jump_address = 0;
        self.jump_pending = false;
        self.prev_was_branch = false;
        self.is_branch = false;
        self.exception = None;
        self.i_cache.reset();
        self.cop0.reset();
    }

    pub fn pc(&self) -> u32 {
        self.pc
    }

    pub fn set_pc(&mut self, pc: u32) {
        self.pc = pc;
    }

    pub fn registers(&self) -> &[u32; 32] {
        &self.regs
    }

    pub fn registers_mut(&mut self) -> &mut [u32; 32] {
        &mut self.regs
    }

    pub fn cop0(&self) -> &Cop0 {
        &self.cop0
    }

    pub fn cop0_mut(&mut self) -> &mut Cop0 {
        &mut self.cop0
    }

    pub fn set_bios_tty_capture_enabled(&mut self, enabled: bool) {
        info!("R3051 BIOS tty capture enabled: {enabled}");
        self.bios_tty_capture_enabled = enabled;
    }

    /// External reset request, routed through the exception machinery so
    /// the status stack and vectors behave like any other entry.
    pub fn raise_reset(&mut self) {
        self.exception = Some(MipsException {
            reason: ExceptionReason::Reset,
            pc_origin: self.pc,
            bad_addr: 0,
            cop_num: 0,
            in_branch_delay: false,
        });
        self.handle_exception();
    }

    /// Runs one instruction block: fetch-swap-dispatch-charge until a
    /// branch retires (its delay slot opens the next block). Returns the
    /// cycles the block consumed; they have already been pushed to the
    /// interlink instruction by instruction.
    pub fn execute_block(&mut self, interlink: &mut Interlink) -> usize {
        self.cycles = 0;
        loop {
            self.op_cycles = 0;
            self.gte_cycles = 0;
            let temp_branch_address = self.pc.wrapping_sub(4);

            let Some(fetched) = self.read_instruction_word(interlink, self.pc, temp_branch_address)
            else {
                // bus held by another master, or the fetch itself faulted
                self.charge(interlink, 1);
                if self.handle_exception() {
                    continue;
                }
                break;
            };

            let word = swap_endianness(fetched);

            if self.bios_tty_capture_enabled {
                self.capture_bios_tty();
            }

            if self.execute_opcode(interlink, word, temp_branch_address) {
                // another master owns the BIU; one cycle, same instruction
                self.charge(interlink, 1);
                break;
            }

            if self.handle_exception() {
                self.charge(interlink, self.op_cycles + 1);
                continue;
            }

            if self.is_branch && self.handle_interrupts(interlink) {
                self.charge(interlink, 1);
                continue;
            }

            if self.jump_pending && self.prev_was_branch {
                self.pc = self.jump_address;
                self.jump_pending = false;
            } else {
                self.pc = self.pc.wrapping_add(4);
            }

            self.op_cycles += cmp::max(1, self.gte_cycles);
            self.charge(interlink, self.op_cycles);

            let retired_branch = self.is_branch;
            self.prev_was_branch = self.is_branch;
            self.is_branch = false;
            if retired_branch {
                break;
            }
        }
        self.cycles
    }

    #[inline]
    fn charge(&mut self, interlink: &mut Interlink, cycles: usize) {
        self.cycles += cycles;
        interlink.append_sync_cycles(cycles);
    }

    fn read_instruction_word(
        &mut self,
        interlink: &mut Interlink,
        pc: u32,
        temp_branch_address: u32,
    ) -> Option<u32> {
        if (pc & 3) != 0 || !self.cop0.is_address_allowed(pc) {
            self.pend(Fault::AddressErrorLoad(pc), pc, temp_branch_address);
            return None;
        }
        if self.cop0.is_cache_isolated() {
            // no instruction stream while the cache is the data target
            self.pend_reason(ExceptionReason::InstructionBusError, pc, temp_branch_address);
            return None;
        }
        let phys = self.cop0.virtual_to_physical(pc);
        if self.cop0.is_cacheable(pc) && interlink.is_instruction_cache_enabled() {
            if !self.i_cache.check_for_hit(phys) {
                if interlink.bus_holder() != BusHolder::Cpu {
                    return None;
                }
                self.i_cache.refill_line(phys, interlink, false);
                self.op_cycles += ICACHE_REFILL_CYCLES;
            }
            Some(self.i_cache.read_word(phys))
        } else {
            if interlink.bus_holder() != BusHolder::Cpu {
                return None;
            }
            self.op_cycles += interlink.how_many_stall_cycles(phys);
            Some(interlink.read_word(phys))
        }
    }

    /// Decodes and runs one instruction; true means the memory transaction
    /// stalled on a busy bus and the instruction must be retried.
    fn execute_opcode(&mut self, interlink: &mut Interlink, word: u32, temp_branch_address: u32) -> bool {
        let instruction = Instruction(word);
        let opcode = Opcode::from_instruction(&instruction);
        if opcode == Opcode::UNKNOWN {
            warn!("R3051 reserved instruction {:08X} at {:08X}", word, self.pc);
            self.pend(Fault::ReservedInstruction, self.pc, temp_branch_address);
            return false;
        }
        if let Err(fault) = self.op_functions[opcode as usize](self, interlink, &instruction) {
            if matches!(fault, Fault::BusWait) {
                self.regs[0] = 0;
                return true;
            }
            self.pend(fault, self.pc, temp_branch_address);
        }
        // r0 is hard-wired to zero at every instruction boundary
        self.regs[0] = 0;
        false
    }

    fn pend_reason(&mut self, reason: ExceptionReason, pc: u32, temp_branch_address: u32) {
        let in_branch_delay = self.prev_was_branch;
        self.exception = Some(MipsException {
            reason,
            pc_origin: if in_branch_delay { temp_branch_address } else { pc },
            bad_addr: 0,
            cop_num: 0,
            in_branch_delay,
        });
    }

    fn pend(&mut self, fault: Fault, pc: u32, temp_branch_address: u32) {
        let (reason, bad_addr, cop_num) = match fault {
            Fault::AddressErrorLoad(addr) => (ExceptionReason::AddressErrorLoad, addr, 0),
            Fault::AddressErrorStore(addr) => (ExceptionReason::AddressErrorStore, addr, 0),
            Fault::SysCall => (ExceptionReason::SysCall, 0, 0),
            Fault::BreakPoint => (ExceptionReason::BreakPoint, 0, 0),
            Fault::ReservedInstruction => (ExceptionReason::ReservedInstruction, 0, 0),
            Fault::CoprocessorUnusable(cop) => (ExceptionReason::CoprocessorUnusable, 0, cop),
            Fault::ArithmeticOverflow => (ExceptionReason::ArithmeticOverflow, 0, 0),
            // handled at the dispatch site, never an architectural fault
            Fault::BusWait => return,
        };
        let in_branch_delay = self.prev_was_branch;
        self.exception = Some(MipsException {
            reason,
            pc_origin: if in_branch_delay { temp_branch_address } else { pc },
            bad_addr,
            cop_num,
            in_branch_delay,
        });
    }

    /// The single drain point for the pending exception record. Transfers
    /// control to the exception vector and returns true when one fired.
    fn handle_exception(&mut self) -> bool {
        let Some(exception) = self.exception.take() else {
            return false;
        };
        debug!(
            "R3051 exception {:?} epc={:08X} delay_slot={}",
            exception.reason, exception.pc_origin, exception.in_branch_delay
        );

        self.jump_pending = false;
        self.prev_was_branch = false;
        self.is_branch = false;

        let mut cause = self.cop0.cause();
        cause = (cause & !0x7C) | (exception.reason.code() << 2);
        if exception.in_branch_delay {
            cause |= 1 << 31;
        } else {
            cause &= !(1 << 31);
        }
        if exception.reason == ExceptionReason::CoprocessorUnusable {
            cause = (cause & !(3 << 28)) | ((exception.cop_num as u32 & 3) << 28);
        }

        self.cop0.set_epc(exception.pc_origin);
        if matches!(
            exception.reason,
            ExceptionReason::AddressErrorLoad | ExceptionReason::AddressErrorStore
        ) {
            self.cop0.set_bad_vaddr(exception.bad_addr);
        }

        self.cop0.push_status_stack();
        self.pc = GENERAL_EXCEPTION_VECTOR;

        if exception.reason == ExceptionReason::Reset {
            self.reset();
            return true;
        }

        self.cop0.set_cause(cause);
        true
    }

    /// Branch-boundary interrupt sampling: resync the timed subsystems,
    /// dispatch matured delayed IRQs, then test the COP0 gate.
    fn handle_interrupts(&mut self, interlink: &mut Interlink) -> bool {
        interlink.resync();
        interlink.increment_interrupt_counters();

        let status = swap_endianness(interlink.irq_status_raw()) & 0x7FF;
        let mask = swap_endianness(interlink.irq_mask_raw()) & 0x7FF;
        if (status & mask) != 0 {
            self.cop0.set_hw_interrupt();
        } else {
            self.cop0.clear_hw_interrupt();
        }

        let sr = self.cop0.status();
        let cause = self.cop0.cause();
        if (sr & 1) == 1 && ((sr >> 8) & (cause >> 8) & 0xFF) != 0 {
            let in_branch_delay = self.prev_was_branch;
            self.exception = Some(MipsException {
                reason: ExceptionReason::Interrupt,
                pc_origin: self.pc,
                bad_addr: 0,
                cop_num: 0,
                in_branch_delay,
            });
            self.handle_exception();
            return true;
        }
        false
    }

    /// A0h/B0h kernel putchar interception, mirrors what the console
    /// prints on the serial port.
    fn capture_bios_tty(&mut self) {
        let pc = self.pc & 0x1FFF_FFFF;
        if (pc == 0xA0 && self.regs[9] == 0x3C) || (pc == 0xB0 && self.regs[9] == 0x3D) {
            if self.regs[4] == 10 {
                info!("[TTY] {}", self.bios_tty_buffer);
                self.bios_tty_buffer.clear();
            } else if let Some(ch) = char::from_u32(self.regs[4]) {
                self.bios_tty_buffer.push(ch);
            }
        }
    }

    // ===================== register helpers =====================

    #[inline(always)]
    fn write_reg(&mut self, register: usize, value: u32) {
        self.regs[register] = value;
        self.regs[0] = 0;
    }

    // ===================== data memory =====================

    #[inline(always)]
    fn is_scratchpad(phys: u32) -> bool {
        (SCRATCHPAD_BASE..SCRATCHPAD_END).contains(&phys)
    }

    /// Program-visible little-endian read of SIZE bits. The interlink is
    /// big-endian at the register level, so words and halfwords are
    /// swapped on the way in.
    fn data_read<const SIZE: usize>(&mut self, interlink: &mut Interlink, address: u32) -> Result<u32, Fault> {
        const { assert!(SIZE == 8 || SIZE == 16 || SIZE == 32) }
        if !self.cop0.is_address_allowed(address) {
            return Err(Fault::AddressErrorLoad(address));
        }
        let phys = self.cop0.virtual_to_physical(address);

        if self.cop0.is_cache_isolated() {
            return Ok(match SIZE {
                8 => self.i_cache.read_byte(phys) as u32,
                16 => swap_halfword(
                    ((self.i_cache.read_byte(phys) as u32) << 8)
                        | self.i_cache.read_byte(phys.wrapping_add(1)) as u32,
                ),
                32 => swap_endianness(self.i_cache.read_word(phys)),
                _ => unreachable!(),
            });
        }

        let scratchpad = Self::is_scratchpad(phys) && interlink.is_scratchpad_enabled();
        if !scratchpad {
            if interlink.bus_holder() != BusHolder::Cpu {
                return Err(Fault::BusWait);
            }
            self.op_cycles += interlink.how_many_stall_cycles(phys);
        }

        Ok(match SIZE {
            8 => interlink.read_byte(phys) as u32,
            16 => swap_halfword(
                ((interlink.read_byte(phys) as u32) << 8)
                    | interlink.read_byte(phys.wrapping_add(1)) as u32,
            ),
            32 => swap_endianness(interlink.read_word(phys)),
            _ => unreachable!(),
        })
    }

    fn data_write<const SIZE: usize>(
        &mut self,
        interlink: &mut Interlink,
        address: u32,
        value: u32,
    ) -> OpResult {
        const { assert!(SIZE == 8 || SIZE == 16 || SIZE == 32) }
        if !self.cop0.is_address_allowed(address) {
            return Err(Fault::AddressErrorStore(address));
        }
        let phys = self.cop0.virtual_to_physical(address);

        if self.cop0.is_cache_isolated() {
            // stores land in the instruction cache byte array, used by the
            // kernel cache test
            match SIZE {
                8 => self.i_cache.write_byte(phys, value as u8, true),
                16 => {
                    let halfword = swap_halfword(value & 0xFFFF);
                    self.i_cache.write_byte(phys, (halfword >> 8) as u8, true);
                    self.i_cache.write_byte(phys.wrapping_add(1), halfword as u8, true);
                }
                32 => self.i_cache.write_word(phys, swap_endianness(value), true),
                _ => unreachable!(),
            }
            return Ok(());
        }

        let scratchpad = Self::is_scratchpad(phys) && interlink.is_scratchpad_enabled();
        if !scratchpad {
            if interlink.bus_holder() != BusHolder::Cpu {
                return Err(Fault::BusWait);
            }
            self.op_cycles += interlink.how_many_stall_cycles(phys);
        }

        match SIZE {
            8 => interlink.write_byte(phys, value as u8),
            16 => {
                let halfword = swap_halfword(value & 0xFFFF);
                interlink.write_byte(phys, (halfword >> 8) as u8);
                interlink.write_byte(phys.wrapping_add(1), halfword as u8);
            }
            32 => interlink.write_word(phys, swap_endianness(value)),
            _ => unreachable!(),
        }
        Ok(())
    }

    #[inline(always)]
    fn effective_address(&self, instruction: &Instruction) -> u32 {
        self.regs[instruction.rs()].wrapping_add(instruction.signed_immediate16())
    }

    // ===================== opcodes =====================

    fn op_unknown(&mut self, _interlink: &mut Interlink, _instruction: &Instruction) -> OpResult {
        Err(Fault::ReservedInstruction)
    }

    fn op_nop(&mut self, _interlink: &mut Interlink, _instruction: &Instruction) -> OpResult {
        Ok(())
    }

    fn op_lui(&mut self, _interlink: &mut Interlink, instruction: &Instruction) -> OpResult {
        self.write_reg(instruction.rt(), instruction.unsigned_immediate16() << 16);
        Ok(())
    }

    #[inline(always)]
    fn op_logical<F, const IMMEDIATE: bool>(&mut self, instruction: &Instruction, logic: F)
    where
        F: Fn(u32, u32) -> u32,
    {
        let rs = self.regs[instruction.rs()];
        if IMMEDIATE {
            let rt = instruction.unsigned_immediate16();
            self.write_reg(instruction.rt(), logic(rs, rt));
        } else {
            let rt = self.regs[instruction.rt()];
            self.write_reg(instruction.rd(), logic(rs, rt));
        }
    }

    fn op_and(&mut self, _interlink: &mut Interlink, instruction: &Instruction) -> OpResult {
        self.op_logical::<_, false>(instruction, |a, b| a & b);
        Ok(())
    }
    fn op_or(&mut self, _interlink: &mut Interlink, instruction: &Instruction) -> OpResult {
        self.op_logical::<_, false>(instruction, |a, b| a | b);
        Ok(())
    }
    fn op_xor(&mut self, _interlink: &mut Interlink, instruction: &Instruction) -> OpResult {
        self.op_logical::<_, false>(instruction, |a, b| a ^ b);
        Ok(())
    }
    fn op_nor(&mut self, _interlink: &mut Interlink, instruction: &Instruction) -> OpResult {
        self.op_logical::<_, false>(instruction, |a, b| !(a | b));
        Ok(())
    }
    fn op_andi(&mut self, _interlink: &mut Interlink, instruction: &Instruction) -> OpResult {
        self.op_logical::<_, true>(instruction, |a, b| a & b);
        Ok(())
    }
    fn op_ori(&mut self, _interlink: &mut Interlink, instruction: &Instruction) -> OpResult {
        self.op_logical::<_, true>(instruction, |a, b| a | b);
        Ok(())
    }
    fn op_xori(&mut self, _interlink: &mut Interlink, instruction: &Instruction) -> OpResult {
        self.op_logical::<_, true>(instruction, |a, b| a ^ b);
        Ok(())
    }

    /// SRL/SRLV stay logical even though the registers are u32 backed;
    /// SRA/SRAV go through i32.
    fn op_shift<const LEFT: bool, const ARITHMETIC: bool, const IMMEDIATE: bool>(
        &mut self,
        _interlink: &mut Interlink,
        instruction: &Instruction,
    ) -> OpResult {
        let amount = if IMMEDIATE {
            instruction.shift_amount()
        } else {
            self.regs[instruction.rs()] & 0x1F
        };
        let rt = self.regs[instruction.rt()];
        let result = if LEFT {
            rt << amount
        } else if ARITHMETIC {
            ((rt as i32) >> amount) as u32
        } else {
            rt >> amount
        };
        self.write_reg(instruction.rd(), result);
        Ok(())
    }

    fn op_compare<const SIGNED: bool, const IMMEDIATE: bool>(
        &mut self,
        _interlink: &mut Interlink,
        instruction: &Instruction,
    ) -> OpResult {
        let rs = self.regs[instruction.rs()];
        let rt = if IMMEDIATE {
            instruction.signed_immediate16()
        } else {
            self.regs[instruction.rt()]
        };
        let result = if SIGNED {
            ((rs as i32) < (rt as i32)) as u32
        } else {
            (rs < rt) as u32
        };
        if IMMEDIATE {
            self.write_reg(instruction.rt(), result);
        } else {
            self.write_reg(instruction.rd(), result);
        }
        Ok(())
    }

    /// ADD/ADDI/SUB trap on signed overflow and leave the destination
    /// untouched; the unsigned variants wrap.
    fn op_arithmetic<const ADD: bool, const TRAP: bool, const IMMEDIATE: bool>(
        &mut self,
        _interlink: &mut Interlink,
        instruction: &Instruction,
    ) -> OpResult {
        let rs = self.regs[instruction.rs()];
        let rt = if IMMEDIATE {
            instruction.signed_immediate16()
        } else {
            self.regs[instruction.rt()]
        };
        let result = if TRAP {
            let checked = if ADD {
                (rs as i32).checked_add(rt as i32)
            } else {
                (rs as i32).checked_sub(rt as i32)
            };
            match checked {
                Some(value) => value as u32,
                None => return Err(Fault::ArithmeticOverflow),
            }
        } else if ADD {
            rs.wrapping_add(rt)
        } else {
            rs.wrapping_sub(rt)
        };
        if IMMEDIATE {
            self.write_reg(instruction.rt(), result);
        } else {
            self.write_reg(instruction.rd(), result);
        }
        Ok(())
    }

    fn op_mult<const SIGNED: bool>(&mut self, _interlink: &mut Interlink, instruction: &Instruction) -> OpResult {
        let product = if SIGNED {
            (self.regs[instruction.rs()] as i32 as i64 * self.regs[instruction.rt()] as i32 as i64) as u64
        } else {
            self.regs[instruction.rs()] as u64 * self.regs[instruction.rt()] as u64
        };
        self.lo = product as u32;
        self.hi = (product >> 32) as u32;
        Ok(())
    }

    fn op_div<const SIGNED: bool>(&mut self, _interlink: &mut Interlink, instruction: &Instruction) -> OpResult {
        let rs = self.regs[instruction.rs()];
        let rt = self.regs[instruction.rt()];
        if rt == 0 {
            // divide by zero: LO saturates, HI keeps the dividend
            self.lo = 0xFFFF_FFFF;
            self.hi = rs;
        } else if SIGNED {
            self.lo = (rs as i32).wrapping_div(rt as i32) as u32;
            self.hi = (rs as i32).wrapping_rem(rt as i32) as u32;
        } else {
            self.lo = rs / rt;
            self.hi = rs % rt;
        }
        Ok(())
    }

    fn op_mf_lohi<const LO: bool>(&mut self, _interlink: &mut Interlink, instruction: &Instruction) -> OpResult {
        let value = if LO { self.lo } else { self.hi };
        self.write_reg(instruction.rd(), value);
        Ok(())
    }

    fn op_mt_lohi<const LO: bool>(&mut self, _interlink: &mut Interlink, instruction: &Instruction) -> OpResult {
        if LO {
            self.lo = self.regs[instruction.rs()];
        } else {
            self.hi = self.regs[instruction.rs()];
        }
        Ok(())
    }

    // ===================== branches =====================

    #[inline(always)]
    fn op_branch<F, const LINK: bool>(&mut self, instruction: &Instruction, condition: F)
    where
        F: Fn(u32, u32) -> bool,
    {
        let rs = self.regs[instruction.rs()];
        let rt = self.regs[instruction.rt()];
        let target = self
            .pc
            .wrapping_add(4)
            .wrapping_add(instruction.signed_immediate16() << 2);
        self.jump_address = target;
        self.jump_pending = condition(rs, rt);
        self.is_branch = true;
        if LINK {
            self.write_reg(31, self.pc.wrapping_add(8));
        }
    }

    fn op_beq(&mut self, _interlink: &mut Interlink, instruction: &Instruction) -> OpResult {
        self.op_branch::<_, false>(instruction, |a, b| a == b);
        Ok(())
    }
    fn op_bne(&mut self, _interlink: &mut Interlink, instruction: &Instruction) -> OpResult {
        self.op_branch::<_, false>(instruction, |a, b| a != b);
        Ok(())
    }
    fn op_blez(&mut self, _interlink: &mut Interlink, instruction: &Instruction) -> OpResult {
        self.op_branch::<_, false>(instruction, |a, _| (a as i32) <= 0);
        Ok(())
    }
    fn op_bgtz(&mut self, _interlink: &mut Interlink, instruction: &Instruction) -> OpResult {
        self.op_branch::<_, false>(instruction, |a, _| (a as i32) > 0);
        Ok(())
    }
    fn op_bltz(&mut self, _interlink: &mut Interlink, instruction: &Instruction) -> OpResult {
        self.op_branch::<_, false>(instruction, |a, _| (a as i32) < 0);
        Ok(())
    }
    fn op_bgez(&mut self, _interlink: &mut Interlink, instruction: &Instruction) -> OpResult {
        self.op_branch::<_, false>(instruction, |a, _| (a as i32) >= 0);
        Ok(())
    }
    fn op_bltzal(&mut self, _interlink: &mut Interlink, instruction: &Instruction) -> OpResult {
        self.op_branch::<_, true>(instruction, |a, _| (a as i32) < 0);
        Ok(())
    }
    fn op_bgezal(&mut self, _interlink: &mut Interlink, instruction: &Instruction) -> OpResult {
        self.op_branch::<_, true>(instruction, |a, _| (a as i32) >= 0);
        Ok(())
    }

    fn op_j<const LINK: bool>(&mut self, _interlink: &mut Interlink, instruction: &Instruction) -> OpResult {
        self.jump_address = (self.pc & 0xF000_0000) | (instruction.imm26() << 2);
        self.jump_pending = true;
        self.is_branch = true;
        if LINK {
            self.write_reg(31, self.pc.wrapping_add(8));
        }
        Ok(())
    }

    fn op_jr(&mut self, _interlink: &mut Interlink, instruction: &Instruction) -> OpResult {
        self.jump_address = self.regs[instruction.rs()];
        self.jump_pending = true;
        self.is_branch = true;
        Ok(())
    }

    fn op_jalr(&mut self, _interlink: &mut Interlink, instruction: &Instruction) -> OpResult {
        self.jump_address = self.regs[instruction.rs()];
        self.jump_pending = true;
        self.is_branch = true;
        self.write_reg(instruction.rd(), self.pc.wrapping_add(8));
        Ok(())
    }

    fn op_syscall(&mut self, _interlink: &mut Interlink, _instruction: &Instruction) -> OpResult {
        Err(Fault::SysCall)
    }

    fn op_break(&mut self, _interlink: &mut Interlink, _instruction: &Instruction) -> OpResult {
        Err(Fault::BreakPoint)
    }

    // ===================== coprocessor dispatch =====================

    fn op_missing_cop(&mut self, _interlink: &mut Interlink, instruction: &Instruction) -> OpResult {
        Err(Fault::CoprocessorUnusable((instruction.op() & 3) as usize))
    }

    fn op_mfc<const CONTROL: bool>(&mut self, _interlink: &mut Interlink, instruction: &Instruction) -> OpResult {
        match instruction.op() & 0xF {
            0 => {
                if !self.cop0.is_cop_usable(0) {
                    return Err(Fault::CoprocessorUnusable(0));
                }
                let value = if CONTROL {
                    warn!("CFC0 has no control registers");
                    0
                } else {
                    self.cop0.read_reg(instruction.rd())
                };
                self.write_reg(instruction.rt(), value);
            }
            2 => {
                if !self.cop0.is_cop_usable(2) {
                    return Err(Fault::CoprocessorUnusable(2));
                }
                let value = if CONTROL {
                    self.gte.read_control_register(instruction.rd())
                } else {
                    self.gte.read_data_register(instruction.rd())
                };
                self.write_reg(instruction.rt(), value);
            }
            n => return Err(Fault::CoprocessorUnusable(n as usize)),
        }
        Ok(())
    }

    fn op_mtc<const CONTROL: bool>(&mut self, _interlink: &mut Interlink, instruction: &Instruction) -> OpResult {
        let value = self.regs[instruction.rt()];
        match instruction.op() & 0xF {
            0 => {
                if !self.cop0.is_cop_usable(0) {
                    return Err(Fault::CoprocessorUnusable(0));
                }
                if CONTROL {
                    warn!("CTC0 has no control registers");
                } else {
                    self.cop0.write_reg(instruction.rd(), value);
                }
            }
            2 => {
                if !self.cop0.is_cop_usable(2) {
                    return Err(Fault::CoprocessorUnusable(2));
                }
                if CONTROL {
                    self.gte.write_control_register(instruction.rd(), value);
                } else {
                    self.gte.write_data_register(instruction.rd(), value);
                }
            }
            n => return Err(Fault::CoprocessorUnusable(n as usize)),
        }
        Ok(())
    }

    fn op_copn(&mut self, _interlink: &mut Interlink, instruction: &Instruction) -> OpResult {
        match instruction.op() & 0xF {
            0 => {
                if !self.cop0.is_cop_usable(0) {
                    return Err(Fault::CoprocessorUnusable(0));
                }
                if instruction.rs() == 0x10 && instruction.function() == 0x10 {
                    self.cop0.rfe();
                } else {
                    warn!("COP0 ignoring command {:08X}", instruction.0);
                }
            }
            2 => {
                if !self.cop0.is_cop_usable(2) {
                    return Err(Fault::CoprocessorUnusable(2));
                }
                self.gte_cycles = self.gte.execute_command(instruction.imm25());
            }
            n => return Err(Fault::CoprocessorUnusable(n as usize)),
        }
        Ok(())
    }

    fn op_lwc2(&mut self, interlink: &mut Interlink, instruction: &Instruction) -> OpResult {
        if !self.cop0.is_cop_usable(2) {
            return Err(Fault::CoprocessorUnusable(2));
        }
        let address = self.effective_address(instruction);
        if (address & 3) != 0 {
            return Err(Fault::AddressErrorLoad(address));
        }
        let value = self.data_read::<32>(interlink, address)?;
        self.gte.write_data_register(instruction.rt(), value);
        Ok(())
    }

    fn op_swc2(&mut self, interlink: &mut Interlink, instruction: &Instruction) -> OpResult {
        if !self.cop0.is_cop_usable(2) {
            return Err(Fault::CoprocessorUnusable(2));
        }
        let address = self.effective_address(instruction);
        if (address & 3) != 0 {
            return Err(Fault::AddressErrorStore(address));
        }
        let value = self.gte.read_data_register(instruction.rt());
        self.data_write::<32>(interlink, address, value)
    }

    // ===================== loads & stores =====================

    fn op_lb<const SIGNED: bool>(&mut self, interlink: &mut Interlink, instruction: &Instruction) -> OpResult {
        let address = self.effective_address(instruction);
        let byte = self.data_read::<8>(interlink, address)?;
        let value = if SIGNED { byte as i8 as i32 as u32 } else { byte };
        self.write_reg(instruction.rt(), value);
        Ok(())
    }

    fn op_lh<const SIGNED: bool>(&mut self, interlink: &mut Interlink, instruction: &Instruction) -> OpResult {
        let address = self.effective_address(instruction);
        if (address & 1) != 0 {
            return Err(Fault::AddressErrorLoad(address));
        }
        let halfword = self.data_read::<16>(interlink, address)?;
        let value = if SIGNED {
            halfword as i16 as i32 as u32
        } else {
            halfword
        };
        self.write_reg(instruction.rt(), value);
        Ok(())
    }

    fn op_lw(&mut self, interlink: &mut Interlink, instruction: &Instruction) -> OpResult {
        let address = self.effective_address(instruction);
        if (address & 3) != 0 {
            return Err(Fault::AddressErrorLoad(address));
        }
        let value = self.data_read::<32>(interlink, address)?;
        self.write_reg(instruction.rt(), value);
        Ok(())
    }

    /// Classic unaligned-word merges. The aligned memory word arrives in
    /// program-visible little-endian form, so the masks below are the
    /// little-endian ones.
    fn op_lwl(&mut self, interlink: &mut Interlink, instruction: &Instruction) -> OpResult {
        let address = self.effective_address(instruction);
        let current = self.regs[instruction.rt()];
        let aligned = self.data_read::<32>(interlink, address & !3)?;
        let value = match address & 3 {
            0 => (current & 0x00FF_FFFF) | (aligned << 24),
            1 => (current & 0x0000_FFFF) | (aligned << 16),
            2 => (current & 0x0000_00FF) | (aligned << 8),
            3 => aligned,
            _ => unreachable!(),
        };
        self.write_reg(instruction.rt(), value);
        Ok(())
    }

    fn op_lwr(&mut self, interlink: &mut Interlink, instruction: &Instruction) -> OpResult {
        let address = self.effective_address(instruction);
        let current = self.regs[instruction.rt()];
        let aligned = self.data_read::<32>(interlink, address & !3)?;
        let value = match address & 3 {
            0 => aligned,
            1 => (current & 0xFF00_0000) | (aligned >> 8),
            2 => (current & 0xFFFF_0000) | (aligned >> 16),
            3 => (current & 0xFFFF_FF00) | (aligned >> 24),
            _ => unreachable!(),
        };
        self.write_reg(instruction.rt(), value);
        Ok(())
    }

    fn op_sb(&mut self, interlink: &mut Interlink, instruction: &Instruction) -> OpResult {
        let address = self.effective_address(instruction);
        self.data_write::<8>(interlink, address, self.regs[instruction.rt()] & 0xFF)
    }

    fn op_sh(&mut self, interlink: &mut Interlink, instruction: &Instruction) -> OpResult {
        let address = self.effective_address(instruction);
        if (address & 1) != 0 {
            return Err(Fault::AddressErrorStore(address));
        }
        self.data_write::<16>(interlink, address, self.regs[instruction.rt()] & 0xFFFF)
    }

    fn op_sw(&mut self, interlink: &mut Interlink, instruction: &Instruction) -> OpResult {
        let address = self.effective_address(instruction);
        if (address & 3) != 0 {
            return Err(Fault::AddressErrorStore(address));
        }
        self.data_write::<32>(interlink, address, self.regs[instruction.rt()])
    }

    fn op_swl(&mut self, interlink: &mut Interlink, instruction: &Instruction) -> OpResult {
        let address = self.effective_address(instruction);
        let value = self.regs[instruction.rt()];
        let aligned_address = address & !3;
        let current = self.data_read::<32>(interlink, aligned_address)?;
        let merged = match address & 3 {
            0 => (current & 0xFFFF_FF00) | (value >> 24),
            1 => (current & 0xFFFF_0000) | (value >> 16),
            2 => (current & 0xFF00_0000) | (value >> 8),
            3 => value,
            _ => unreachable!(),
        };
        self.data_write::<32>(interlink, aligned_address, merged)
    }

    fn op_swr(&mut self, interlink: &mut Interlink, instruction: &Instruction) -> OpResult {
        let address = self.effective_address(instruction);
        let value = self.regs[instruction.rt()];
        let aligned_address = address & !3;
        let current = self.data_read::<32>(interlink, aligned_address)?;
        let merged = match address & 3 {
            0 => value,
            1 => (current & 0x0000_00FF) | (value << 8),
            2 => (current & 0x0000_FFFF) | (value << 16),
            3 => (current & 0x00FF_FFFF) | (value << 24),
            _ => unreachable!(),
        };
        self.data_write::<32>(interlink, aligned_address, merged)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::cdrom::disc::CdImage;
    use crate::core::config::VideoStandard;
    use crate::core::gpu::NullGpuSink;
    use crate::core::interlink::BIOS_LEN;
    use crate::core::spu::NullSpuSink;

    fn test_interlink() -> Interlink {
        let disc: Option<Box<dyn CdImage>> = None;
        Interlink::new(
            vec![0; BIOS_LEN],
            Box::new(NullGpuSink),
            Box::new(NullSpuSink),
            disc,
            VideoStandard::Ntsc,
        )
        .unwrap()
    }

    /// Loads a program at 0x100 and plants jump-to-self terminators after
    /// it and at the general exception vector so blocks always retire a
    /// branch.
    fn cpu_in_ram(program: &[u32]) -> (Cpu, Interlink) {
        let mut cpu = Cpu::new();
        let mut interlink = test_interlink();
        for (i, word) in program.iter().enumerate() {
            // store the program-visible word in register-level order
            interlink.write_word(0x100 + (i as u32) * 4, swap_endianness(*word));
        }
        let end = 0x100 + program.len() as u32 * 4;
        interlink.write_word(end, swap_endianness(0x0800_0000 | (end >> 2)));
        interlink.write_word(0x80, swap_endianness(0x0800_0000 | (0x80 >> 2)));
        cpu.set_pc(0x0000_0100);
        (cpu, interlink)
    }

    fn run_one_block(cpu: &mut Cpu, interlink: &mut Interlink) {
        cpu.execute_block(interlink);
    }

    #[test]
    fn register_zero_stays_zero() {
        // ori r0, r0, 0xFFFF then the terminator branch
        let (mut cpu, mut ilink) = cpu_in_ram(&[0x3400_FFFF]);
        run_one_block(&mut cpu, &mut ilink);
        assert_eq!(cpu.registers()[0], 0);
    }

    #[test]
    fn add_overflow_raises_and_preserves_destination() {
        // lui r1, 0x7FFF ; ori r1, r1, 0xFFFF ; addiu r2, r0, 1 ; add r3, r1, r2
        let (mut cpu, mut ilink) = cpu_in_ram(&[0x3C01_7FFF, 0x3421_FFFF, 0x2402_0001, 0x0022_1820]);
        cpu.registers_mut()[3] = 0xAAAA_AAAA;
        run_one_block(&mut cpu, &mut ilink);
        assert_eq!(cpu.cop0().read_reg(14), 0x0000_010C); // EPC at the add
        assert_eq!((cpu.cop0().cause() >> 2) & 0x1F, 12); // Ov
        assert_eq!(cpu.registers()[3], 0xAAAA_AAAA);
    }

    #[test]
    fn unaligned_word_load_sets_badvaddr() {
        // addiu r1, r0, 1 ; lw r2, 0(r1)
        let (mut cpu, mut ilink) = cpu_in_ram(&[0x2401_0001, 0x8C22_0000]);
        run_one_block(&mut cpu, &mut ilink);
        assert_eq!((cpu.cop0().cause() >> 2) & 0x1F, 4); // AdEL
        assert_eq!(cpu.cop0().read_reg(8), 1); // BadVAddr
        assert_eq!(cpu.cop0().read_reg(14), 0x0000_0104); // EPC at the lw
    }

    #[test]
    fn store_under_cache_isolation_misses_ram() {
        let mut cpu = Cpu::new();
        let mut ilink = test_interlink();
        // the target word starts as zero in RAM
        assert_eq!(ilink.read_word(0), 0);

        cpu.cop0_mut().set_status(1 << 16);
        cpu.data_write::<32>(&mut ilink, 0, 0xDEAD_BEEF).unwrap();
        cpu.cop0_mut().set_status(0);

        let read = cpu.data_read::<32>(&mut ilink, 0).unwrap();
        assert_eq!(read, 0, "isolated store must not reach main RAM");
        // and the cache byte array holds the swapped pattern
        cpu.cop0_mut().set_status(1 << 16);
        assert_eq!(cpu.data_read::<32>(&mut ilink, 0).unwrap(), 0xDEAD_BEEF);
    }

    #[test]
    fn data_words_are_little_endian_in_ram() {
        let mut cpu = Cpu::new();
        let mut ilink = test_interlink();
        cpu.data_write::<32>(&mut ilink, 0x20, 0x1234_5678).unwrap();
        assert_eq!(cpu.data_read::<8>(&mut ilink, 0x20).unwrap(), 0x78);
        assert_eq!(cpu.data_read::<8>(&mut ilink, 0x23).unwrap(), 0x12);
        assert_eq!(cpu.data_read::<16>(&mut ilink, 0x20).unwrap(), 0x5678);
        assert_eq!(cpu.data_read::<32>(&mut ilink, 0x20).unwrap(), 0x1234_5678);
    }

    #[test]
    fn lwl_lwr_pair_loads_unaligned_word() {
        let (mut cpu, mut ilink) = cpu_in_ram(&[]);
        cpu.data_write::<32>(&mut ilink, 0x40, 0x4444_3333).unwrap();
        cpu.data_write::<32>(&mut ilink, 0x44, 0x6666_5555).unwrap();
        // lwl r2, 5(r0) ; lwr r2, 2(r0) with base 0x40
        cpu.registers_mut()[1] = 0x40;
        let lwl = Instruction(0x8822_0005);
        let lwr = Instruction(0x9822_0002);
        cpu.op_lwl(&mut ilink, &lwl).unwrap();
        cpu.op_lwr(&mut ilink, &lwr).unwrap();
        assert_eq!(cpu.registers()[2], 0x5555_4444);
    }

    #[test]
    fn branch_delay_slot_executes_before_transfer() {
        // beq r0, r0, +2 ; addiu r1, r0, 7 ; addiu r1, r0, 9 ; addiu r2, r0, 3
        let (mut cpu, mut ilink) = cpu_in_ram(&[0x1000_0002, 0x2401_0007, 0x2401_0009, 0x2402_0003]);
        run_one_block(&mut cpu, &mut ilink); // up to the branch
        run_one_block(&mut cpu, &mut ilink); // delay slot, transfer, rest
        assert_eq!(cpu.registers()[1], 7, "delay slot ran, 0x108 was skipped");
        assert_eq!(cpu.registers()[2], 3, "branch target reached");
    }

    #[test]
    fn interrupt_preempts_when_unmasked() {
        use crate::core::interlink::DelayedIrq;
        let (mut cpu, mut ilink) = cpu_in_ram(&[]);
        // unmask VBlank through the register-level I_MASK write
        cpu.data_write::<32>(&mut ilink, 0x1F80_1074, 0x0000_0001).unwrap();
        ilink.schedule_interrupt(DelayedIrq::VBlank, 0);
        cpu.cop0_mut().set_status(0x0000_0401); // IEc + IM2
        run_one_block(&mut cpu, &mut ilink);
        assert_eq!((cpu.cop0().cause() >> 2) & 0x1F, 0); // INT
        assert_ne!(cpu.cop0().cause() & (1 << 10), 0);
        assert_eq!(cpu.cop0().read_reg(14), 0x0000_0100); // EPC at the loop
    }

    #[test]
    fn divide_by_zero_saturates_lo() {
        let mut cpu = Cpu::new();
        let mut ilink = test_interlink();
        cpu.registers_mut()[4] = 1234;
        cpu.registers_mut()[5] = 0;
        let div = Instruction(0x0085_001A); // div r4, r5
        cpu.op_div::<true>(&mut ilink, &div).unwrap();
        assert_eq!(cpu.lo, 0xFFFF_FFFF);
        assert_eq!(cpu.hi, 1234);
    }

    #[test]
    fn srl_is_a_logical_shift() {
        let mut cpu = Cpu::new();
        let mut ilink = test_interlink();
        cpu.registers_mut()[2] = 0x8000_0000;
        let srl = Instruction(0x0002_1842); // srl r3, r2, 1
        cpu.op_shift::<false, false, true>(&mut ilink, &srl).unwrap();
        assert_eq!(cpu.registers()[3], 0x4000_0000);
    }
}
