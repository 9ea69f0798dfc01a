use std::error;
use std::fmt;

use crate::memory::{Address, Word};

/// Conditions that stop the machine. They travel inside an
/// [`eyre::Report`](color_eyre::eyre::Report) and can be recovered with
/// `downcast_ref::<Fault>()`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Fault {
    /// Stack relative load past the top of the user stack
    StackBound { sp: Address, x: Word },
    /// Fetched word is not an instruction
    InvalidOpcode { opcode: Word, address: Address },
    /// Access outside of the memory engine's word array
    AddressOutOfRange { address: Address },
}

impl fmt::Display for Fault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Fault::StackBound { sp, x } => {
                write!(f, "sp {} + x {} is outside user memory space", sp, x)
            }
            Fault::InvalidOpcode { opcode, address } => {
                write!(f, "invalid opcode {} at address {}", opcode, address)
            }
            Fault::AddressOutOfRange { address } => {
                write!(f, "address {} is outside of memory", address)
            }
        }
    }
}

impl error::Error for Fault {}
