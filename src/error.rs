//! Error types for the VM core and its host adapters.

use std::io;
use std::path::PathBuf;

use crate::vm::opcode::Opcode;

/// Everything that can terminate a VM run abnormally.
///
/// Host interrupts are *not* represented here: they are observed between
/// instructions as a plain flag and surfaced as [`crate::vm::ExecutionState::Interrupted`],
/// since (unlike the variants below) there is no guest-visible fault to report.
#[derive(Debug, thiserror::Error)]
pub enum VmError {
    #[error("failed to load image {path}: {source}")]
    ImageLoad {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("illegal opcode {opcode:?} at pc={pc:#06x}")]
    IllegalOpcode { opcode: Opcode, pc: u16 },

    #[error("unknown trap vector {0:#04x}")]
    UnknownTrap(u8),

    #[error("host I/O error: {0}")]
    HostIo(#[from] io::Error),
}
