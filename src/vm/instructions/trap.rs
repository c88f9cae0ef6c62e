use crate::error::VmError;
use crate::vm::console::Console;
use crate::vm::{memory, Memory, Registers};

use std::convert::TryFrom;

pub enum TrapCode {
    Getc,
    Out,
    Puts,
    In,
    Putsp,
    Halt,
}

impl TryFrom<u16> for TrapCode {
    type Error = ();

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        use TrapCode::*;

        let trap_code = match value {
            0x20 => Getc,
            0x21 => Out,
            0x22 => Puts,
            0x23 => In,
            0x24 => Putsp,
            0x25 => Halt,
            _ => return Err(()),
        };

        Ok(trap_code)
    }
}

/// `GETC` — read one byte from host input (blocking); no flag update.
pub fn getc<C: Console>(regs: &mut Registers, mem: &mut Memory<C>) -> Result<(), VmError> {
    let byte = mem.console().read_byte()?;
    regs.write(0, byte as u16);
    Ok(())
}

/// `OUT` — write the low byte of R0 to host output; flush.
pub fn out<C: Console>(regs: &Registers, mem: &mut Memory<C>) -> Result<(), VmError> {
    let console = mem.console();
    console.write_byte(regs.read(0) as u8)?;
    console.flush()?;
    Ok(())
}

/// `PUTS` — print the null-terminated string starting at `mem[R0]`, one word per character.
pub fn puts<C: Console>(regs: &Registers, mem: &mut Memory<C>) -> Result<(), VmError> {
    for mem_addr in regs.read(0)..(memory::MEMORY_SIZE as u16) {
        let chr = mem.read(mem_addr)?;
        if chr == 0x0000 {
            break;
        }
        mem.console().write_byte(chr as u8)?;
    }
    mem.console().flush()?;
    Ok(())
}

/// `PUTSP` — print the null-terminated string starting at `mem[R0]`, two packed bytes per word
/// (low byte first, then high byte); stops at the first all-zero word.
pub fn putsp<C: Console>(regs: &Registers, mem: &mut Memory<C>) -> Result<(), VmError> {
    for mem_addr in regs.read(0)..(memory::MEMORY_SIZE as u16) {
        let word = mem.read(mem_addr)?;
        if word == 0x0000 {
            break;
        }
        let [low, high] = word.to_le_bytes();
        mem.console().write_byte(low)?;
        if high != 0 {
            mem.console().write_byte(high)?;
        }
    }
    mem.console().flush()?;
    Ok(())
}

/// `IN` — prompt, read one byte, echo it, R0 ← byte; flush.
pub fn r#in<C: Console>(regs: &mut Registers, mem: &mut Memory<C>) -> Result<(), VmError> {
    let console = mem.console();
    for byte in b"Enter a char: " {
        console.write_byte(*byte)?;
    }
    let byte = console.read_byte()?;
    console.write_byte(byte)?;
    console.flush()?;
    regs.write(0, byte as u16);
    Ok(())
}

/// `HALT` — print "HALT\n", flush.
pub fn halt<C: Console>(mem: &mut Memory<C>) -> Result<(), VmError> {
    let console = mem.console();
    for byte in b"HALT\n" {
        console.write_byte(*byte)?;
    }
    console.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vm::console::ScriptedConsole;

    #[test]
    fn getc_reads_one_byte_into_r0() {
        let mut regs = Registers::new();
        let mut mem = Memory::new(ScriptedConsole::new([b'Q']));
        getc(&mut regs, &mut mem).unwrap();
        assert_eq!(regs.read(0), b'Q' as u16);
    }

    #[test]
    fn out_writes_low_byte_of_r0() {
        let mut regs = Registers::new();
        regs.write(0, 0x4100 | b'A' as u16);
        let mut mem = Memory::new(ScriptedConsole::new([]));
        out(&regs, &mut mem).unwrap();
        assert_eq!(mem.console().output, vec![b'A']);
    }

    #[test]
    fn puts_stops_at_zero_word() {
        let mut regs = Registers::new();
        regs.write(0, 0x4000);
        let mut mem = Memory::new(ScriptedConsole::new([]));
        mem.write(0x4000, b'H' as u16);
        mem.write(0x4001, b'i' as u16);
        mem.write(0x4002, 0x0000);
        mem.write(0x4003, b'!' as u16);

        puts(&regs, &mut mem).unwrap();
        assert_eq!(mem.console().output_as_string(), "Hi");
    }

    #[test]
    fn putsp_unpacks_low_byte_then_high_byte() {
        let mut regs = Registers::new();
        regs.write(0, 0x4000);
        let mut mem = Memory::new(ScriptedConsole::new([]));
        // "H" (0x48) and "i" (0x69) packed low-first into one word.
        mem.write(0x4000, u16::from_le_bytes([b'H', b'i']));
        mem.write(0x4001, 0x0000);

        putsp(&regs, &mut mem).unwrap();
        assert_eq!(mem.console().output_as_string(), "Hi");
    }

    #[test]
    fn putsp_stops_before_trailing_odd_byte_if_word_is_zero() {
        let mut regs = Registers::new();
        regs.write(0, 0x4000);
        let mut mem = Memory::new(ScriptedConsole::new([]));
        mem.write(0x4000, u16::from_le_bytes([b'X', 0]));
        mem.write(0x4001, 0x0000);

        putsp(&regs, &mut mem).unwrap();
        assert_eq!(mem.console().output_as_string(), "X");
    }

    #[test]
    fn in_prompts_echoes_and_stores_byte() {
        let mut regs = Registers::new();
        let mut mem = Memory::new(ScriptedConsole::new([b'y']));
        r#in(&mut regs, &mut mem).unwrap();
        assert_eq!(regs.read(0), b'y' as u16);
        assert_eq!(mem.console().output_as_string(), "Enter a char: y");
    }

    #[test]
    fn halt_prints_halt_and_newline() {
        let mut mem = Memory::<ScriptedConsole>::new(ScriptedConsole::new([]));
        halt(&mut mem).unwrap();
        assert_eq!(mem.console().output_as_string(), "HALT\n");
    }

    #[test]
    fn unknown_trap_vector_is_rejected() {
        assert!(TrapCode::try_from(0xFFu16).is_err());
    }
}
