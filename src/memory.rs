use std::fs;
use std::path::Path;
use std::sync::mpsc::{Receiver, SyncSender};

use color_eyre::eyre::{Result, WrapErr};
use log::*;

use crate::bus::{Operation, Request, Response};

pub mod parse;

pub type Word = i32;
/// Addresses are plain words so that computed operands (`operand + X`) can be
/// checked before they reach the engine
pub type Address = Word;

/// Number of words in the machine
pub const MEMORY_SIZE: usize = 2000;

/// Default memory
pub type StdMem = Memory<MEMORY_SIZE>;

/// Word array owned by the memory engine
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Memory<const S: usize> {
    /// The actual data of the memory
    pub data: [Word; S],
}

impl<const S: usize> Default for Memory<S> {
    /// Initializes the memory
    fn default() -> Self {
        Memory { data: [0; S] }
    }
}

impl<const S: usize> Memory<S> {
    /// Parses loader text into a fresh memory image. Malformed lines are
    /// skipped.
    pub fn load(data: &str) -> Self {
        let (memory, skipped) = parse::Parser::new(data, Self::default()).parse();
        for err in skipped {
            debug!("skipped {}", err);
        }
        memory
    }

    /// Reads a program file and parses it into a memory image
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let data = fs::read_to_string(path)
            .wrap_err_with(|| format!("Could not open program file `{}`", path.display()))?;
        Ok(Self::load(&data))
    }

    fn slot(&self, address: Address) -> Option<usize> {
        usize::try_from(address).ok().filter(|&index| index < S)
    }

    /// Reads a word. Out of range reads yield zero.
    pub fn read(&self, address: Address) -> Word {
        match self.slot(address) {
            Some(index) => self.data[index],
            None => {
                warn!("read outside of memory at {}", address);
                0
            }
        }
    }

    /// Writes a word. Out of range writes are dropped.
    pub fn write(&mut self, address: Address, value: Word) {
        match self.slot(address) {
            Some(index) => self.data[index] = value,
            None => warn!("write outside of memory at {}", address),
        }
    }

    /// Writes an array of words to the memory
    pub fn write_array(&mut self, position: Address, data: &[Word]) {
        let start = position as usize;
        self.data[start..start + data.len()].copy_from_slice(data);
    }

    /// Renders every non-zero word as `address: value`, one per line
    pub fn dump(&self) -> String {
        self.data
            .iter()
            .enumerate()
            .filter(|(_, word)| **word != 0)
            .map(|(address, word)| format!("{:4}: {}\n", address, word))
            .collect()
    }

    /// Services requests until a terminate request arrives or the processor
    /// hangs up
    pub fn serve(mut self, requests: Receiver<Request>, responses: SyncSender<Response>) {
        while let Ok(request) = requests.recv() {
            trace!(
                "memory request {} @{} = {}",
                Word::from(request.operation),
                request.address,
                request.value
            );

            match request.operation {
                Operation::Terminate => {
                    debug!("memory engine terminating");
                    return;
                }
                Operation::Read => {
                    let value = self.read(request.address);
                    if responses.send(Response::Value(value)).is_err() {
                        break;
                    }
                }
                Operation::Write => self.write(request.address, request.value),
            }
        }

        debug!("processor hung up, memory engine exiting");
    }
}

/// Writes a block of instructions directly into the memory
#[macro_export]
macro_rules! write_instructions {
    ( $mem:ident : $pos:expr => $( $word:expr ),+ ) => {
        $mem.write_array($pos, &[
            $(
                $word as $crate::memory::Word,
            )+
        ]);
    };
}
