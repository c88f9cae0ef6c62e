//! Core library for the LC-3 virtual machine: memory, registers, the instruction
//! set, and the host console abstraction they run against.

pub mod error;
pub mod vm;

pub use error::VmError;
pub use vm::console::{Console, TerminalConsole};
pub use vm::{ExecutionState, Vm};
