pub mod console;
pub(crate) mod opcode;

mod instructions;
mod memory;
mod registers;
mod utils;

use console::Console;
use instructions::TrapOutcome;
use memory::Memory;
use opcode::Opcode;
use registers::Registers;

use byteorder::{BigEndian, ReadBytesExt};
use std::convert::TryFrom;
use std::io::{self, Read};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::error::VmError;

/// Outcome of stepping the dispatch loop by one instruction.
enum StepOutcome {
    Continue,
    Halt,
}

/// Terminal state of a VM run: `run()` loops until it reaches exactly one of these.
#[derive(Debug)]
pub enum ExecutionState {
    /// `HALT` trap executed; exit success.
    Halted,
    /// `RES`/`RTI`/an unknown trap vector/a host I/O failure was encountered; exit failure.
    Aborted(VmError),
    /// A host interrupt (Ctrl-C) was observed between instructions; exit failure.
    Interrupted,
}

/// A single LC-3 virtual machine instance: memory, registers, and the console they're wired to.
///
/// Memory and registers are owned exclusively by this value — there is no process-wide global
/// state, so multiple `Vm`s can coexist and each is independently testable.
pub struct Vm<C: Console> {
    regs: Registers,
    mem: Memory<C>,
    interrupted: Arc<AtomicBool>,
}

impl<C: Console> Vm<C> {
    pub fn new(console: C) -> Self {
        Self {
            regs: Registers::new(),
            mem: Memory::new(console),
            interrupted: Arc::new(AtomicBool::new(false)),
        }
    }

    /// A shared flag the caller can set (e.g. from a SIGINT handler) to request that the
    /// dispatch loop stop at the next instruction boundary.
    pub fn interrupt_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.interrupted)
    }

    /// Loads a big-endian image: the first word is the origin address, subsequent words are
    /// written consecutively starting there. Stops at EOF; never writes past address `0xFFFF`.
    /// Loading multiple images in sequence is just calling this once per image — later images
    /// overwrite overlapping regions.
    pub fn load_image<R: Read>(&mut self, mut reader: R) -> io::Result<()> {
        let origin = reader.read_u16::<BigEndian>()?;
        for address in origin..=u16::MAX {
            match reader.read_u16::<BigEndian>() {
                Ok(instr) => self.mem.write(address, instr),
                Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => break,
                Err(e) => return Err(e),
            }
            if address == u16::MAX {
                break;
            }
        }
        Ok(())
    }

    /// Runs the fetch-decode-execute loop to completion.
    pub fn run(&mut self) -> ExecutionState {
        loop {
            if self.interrupted.load(Ordering::Relaxed) {
                log::warn!("interrupted by host");
                return ExecutionState::Interrupted;
            }

            match self.step() {
                Ok(StepOutcome::Continue) => continue,
                Ok(StepOutcome::Halt) => return ExecutionState::Halted,
                Err(err) => {
                    log::error!("aborted: {err}");
                    return ExecutionState::Aborted(err);
                }
            }
        }
    }

    fn step(&mut self) -> Result<StepOutcome, VmError> {
        let instr = self.mem.read(self.regs.pc)?;
        log::trace!("pc={:#06x} instr={:#06x}", self.regs.pc, instr);
        self.regs.pc = self.regs.pc.wrapping_add(1);

        let regs = &mut self.regs;
        let mem = &mut self.mem;
        // Infallible: the top 4 bits of any u16 are always in 0..16, and every value in that
        // range is a defined `Opcode` variant.
        let opcode = Opcode::try_from(instr >> 12).unwrap();

        match opcode {
            Opcode::Br => {
                instructions::br(instr, regs);
                Ok(StepOutcome::Continue)
            }
            Opcode::Add => {
                instructions::add(instr, regs);
                Ok(StepOutcome::Continue)
            }
            Opcode::Ld => {
                instructions::ld(instr, regs, mem)?;
                Ok(StepOutcome::Continue)
            }
            Opcode::St => {
                instructions::st(instr, regs, mem);
                Ok(StepOutcome::Continue)
            }
            Opcode::Jsr => {
                instructions::jsr(instr, regs);
                Ok(StepOutcome::Continue)
            }
            Opcode::And => {
                instructions::and(instr, regs);
                Ok(StepOutcome::Continue)
            }
            Opcode::Ldr => {
                instructions::ldr(instr, regs, mem)?;
                Ok(StepOutcome::Continue)
            }
            Opcode::Str => {
                instructions::str(instr, regs, mem);
                Ok(StepOutcome::Continue)
            }
            Opcode::Rti => {
                let pc = regs.pc.wrapping_sub(1);
                Err(VmError::IllegalOpcode {
                    opcode: Opcode::Rti,
                    pc,
                })
            }
            Opcode::Not => {
                instructions::not(instr, regs);
                Ok(StepOutcome::Continue)
            }
            Opcode::Ldi => {
                instructions::ldi(instr, regs, mem)?;
                Ok(StepOutcome::Continue)
            }
            Opcode::Sti => {
                instructions::sti(instr, regs, mem)?;
                Ok(StepOutcome::Continue)
            }
            Opcode::Jmp => {
                instructions::jmp(instr, regs);
                Ok(StepOutcome::Continue)
            }
            Opcode::Res => {
                let pc = regs.pc.wrapping_sub(1);
                Err(VmError::IllegalOpcode {
                    opcode: Opcode::Res,
                    pc,
                })
            }
            Opcode::Lea => {
                instructions::lea(instr, regs);
                Ok(StepOutcome::Continue)
            }
            Opcode::Trap => match instructions::trap(instr, regs, mem)? {
                TrapOutcome::Continue => Ok(StepOutcome::Continue),
                TrapOutcome::Halt => Ok(StepOutcome::Halt),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use super::console::ScriptedConsole;

    fn vm_with_image(words: &[u16]) -> Vm<ScriptedConsole> {
        vm_with_image_and_input(words, [])
    }

    fn vm_with_image_and_input<I: IntoIterator<Item = u8>>(words: &[u16], input: I) -> Vm<ScriptedConsole> {
        let mut bytes = Vec::with_capacity(words.len() * 2);
        for word in words {
            bytes.extend_from_slice(&word.to_be_bytes());
        }
        let mut vm = Vm::new(ScriptedConsole::new(input));
        vm.load_image(&bytes[..]).unwrap();
        vm
    }

    #[test]
    fn s1_hello_prints_string_then_halt() {
        // 0x3000: LEA R0, #1  (operand field points one past the instruction, at "H")
        // 0x3001: TRAP 0x22   (PUTS)
        // 0x3002: TRAP 0x25   (HALT)
        // 0x3003: 'H'
        // 0x3004: 'i'
        // 0x3005: 0 (terminator)
        let lea = (0b1110 << 12) | (0 << 9) | 0x001;
        let puts = 0xF022;
        let halt = 0xF025;
        let mut vm = vm_with_image(&[0x3000, lea, puts, halt, b'H' as u16, b'i' as u16, 0]);

        match vm.run() {
            ExecutionState::Halted => {}
            other => panic!("expected Halted, got {other:?}"),
        }
        assert_eq!(vm.mem.console().output_as_string(), "HiHALT\n");
    }

    #[test]
    fn s6_illegal_opcode_aborts_without_further_execution() {
        // RES (0b1101) followed by an instruction that would be observable if executed.
        let res = 0xD000;
        let mut vm = vm_with_image(&[0x3000, res, 0xF025]);
        match vm.run() {
            ExecutionState::Aborted(VmError::IllegalOpcode { opcode, .. }) => {
                assert_eq!(opcode, Opcode::Res);
            }
            other => panic!("expected Aborted(IllegalOpcode), got {other:?}"),
        }
    }

    #[test]
    fn s7_unknown_trap_vector_aborts() {
        let bad_trap = 0xF0FF;
        let mut vm = vm_with_image(&[0x3000, bad_trap]);
        match vm.run() {
            ExecutionState::Aborted(VmError::UnknownTrap(0xFF)) => {}
            other => panic!("expected Aborted(UnknownTrap(0xFF)), got {other:?}"),
        }
    }

    #[test]
    fn s8_image_load_honors_origin_near_top_of_address_space() {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&0xFFFEu16.to_be_bytes());
        bytes.extend_from_slice(&0xAAAAu16.to_be_bytes());
        bytes.extend_from_slice(&0xBBBBu16.to_be_bytes());

        let mut vm = Vm::new(ScriptedConsole::new([]));
        vm.load_image(&bytes[..]).unwrap();
        assert_eq!(vm.mem.read(0xFFFE).unwrap(), 0xAAAA);
        assert_eq!(vm.mem.read(0xFFFF).unwrap(), 0xBBBB);
    }

    #[test]
    fn interrupt_flag_stops_the_loop_before_next_fetch() {
        // BR #0 looping forever at 0x3000 would never halt on its own.
        let br_self_loop = 0b0000_111_111111111; // nzp=111, offset=-1
        let mut vm = vm_with_image(&[0x3000, br_self_loop]);
        vm.interrupted.store(true, Ordering::Relaxed);
        match vm.run() {
            ExecutionState::Interrupted => {}
            other => panic!("expected Interrupted, got {other:?}"),
        }
    }
}
