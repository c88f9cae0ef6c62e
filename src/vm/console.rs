//! Host console abstraction.
//!
//! The trap service and the keyboard-mapped memory cells never touch
//! `std::io` directly; they go through this trait instead, so both can be
//! driven by a scripted, in-memory console in tests.

use std::io::{self, Read, Write};

use nix::sys::select::{select, FdSet};
use nix::sys::time::{TimeVal, TimeValLike};

/// A host terminal, as seen by the VM core.
pub trait Console {
    /// Blocking read of a single byte (used by `GETC`/`IN`).
    fn read_byte(&mut self) -> io::Result<u8>;

    /// Non-blocking check for available input. Returns the byte if one was
    /// ready, consuming it, or `None` otherwise. Used by the `KBSR`/`KBDR`
    /// memory-mapped registers.
    fn poll(&mut self) -> io::Result<Option<u8>>;

    fn write_byte(&mut self, byte: u8) -> io::Result<()>;

    fn flush(&mut self) -> io::Result<()>;
}

/// Production console: stdin/stdout, with stdin switched to non-canonical,
/// no-echo mode for the lifetime of this value.
///
/// Original terminal settings are restored on drop, so every exit path
/// (HALT, abort, panic unwind, SIGINT) leaves the host terminal usable.
pub struct TerminalConsole {
    original_termios: termios::Termios,
}

impl TerminalConsole {
    pub fn new() -> io::Result<Self> {
        use termios::{
            tcsetattr, Termios, BRKINT, ECHO, ICANON, ICRNL, IGNBRK, IGNCR, INLCR, ISTRIP, IXON,
            PARMRK, TCSANOW,
        };

        let original_termios = Termios::from_fd(0)?;

        let mut raw = original_termios;
        raw.c_iflag &= IGNBRK | BRKINT | PARMRK | ISTRIP | INLCR | IGNCR | ICRNL | IXON;
        raw.c_lflag &= !(ICANON | ECHO);
        tcsetattr(0, TCSANOW, &raw)?;

        Ok(Self { original_termios })
    }
}

impl Drop for TerminalConsole {
    fn drop(&mut self) {
        let _ = termios::tcsetattr(0, termios::TCSANOW, &self.original_termios);
    }
}

impl Console for TerminalConsole {
    fn read_byte(&mut self) -> io::Result<u8> {
        let mut buf = [0u8; 1];
        io::stdin().read_exact(&mut buf)?;
        Ok(buf[0])
    }

    fn poll(&mut self) -> io::Result<Option<u8>> {
        let mut readfds = FdSet::new();
        readfds.insert(nix::libc::STDIN_FILENO);

        let ready = select(
            None,
            Some(&mut readfds),
            None,
            None,
            Some(&mut TimeVal::zero()),
        )
        .map(|n| n > 0)
        .unwrap_or(false);

        if ready {
            Ok(Some(self.read_byte()?))
        } else {
            Ok(None)
        }
    }

    fn write_byte(&mut self, byte: u8) -> io::Result<()> {
        io::stdout().write_all(&[byte])
    }

    fn flush(&mut self) -> io::Result<()> {
        io::stdout().flush()
    }
}

/// In-memory console for tests: reads come from a scripted byte queue,
/// writes accumulate in a buffer.
#[cfg(test)]
pub struct ScriptedConsole {
    input: std::collections::VecDeque<u8>,
    pub output: Vec<u8>,
}

#[cfg(test)]
impl ScriptedConsole {
    pub fn new<I: IntoIterator<Item = u8>>(input: I) -> Self {
        Self {
            input: input.into_iter().collect(),
            output: Vec::new(),
        }
    }

    pub fn output_as_string(&self) -> String {
        self.output.iter().map(|&b| b as char).collect()
    }
}

#[cfg(test)]
impl Console for ScriptedConsole {
    fn read_byte(&mut self) -> io::Result<u8> {
        self.input
            .pop_front()
            .ok_or_else(|| io::Error::new(io::ErrorKind::UnexpectedEof, "no scripted input left"))
    }

    fn poll(&mut self) -> io::Result<Option<u8>> {
        Ok(self.input.pop_front())
    }

    fn write_byte(&mut self, byte: u8) -> io::Result<()> {
        self.output.push(byte);
        Ok(())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scripted_console_poll_drains_queue() {
        let mut console = ScriptedConsole::new([b'A']);
        assert_eq!(console.poll().unwrap(), Some(b'A'));
        assert_eq!(console.poll().unwrap(), None);
    }

    #[test]
    fn scripted_console_read_byte_errors_when_empty() {
        let mut console = ScriptedConsole::new([]);
        assert!(console.read_byte().is_err());
    }

    #[test]
    fn scripted_console_records_output() {
        let mut console = ScriptedConsole::new([]);
        console.write_byte(b'H').unwrap();
        console.write_byte(b'i').unwrap();
        assert_eq!(console.output_as_string(), "Hi");
    }
}
