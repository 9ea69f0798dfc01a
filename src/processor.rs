use std::io::Write;

use crate::bus::MemoryClient;
use crate::fault::Fault;
use crate::memory::{Address, Word};
use color_eyre::eyre::Result;
use log::*;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

mod instruction;
mod timer;

pub use instruction::Instruction;
pub use timer::Timer;

/// First address of system memory
pub const SYSTEM_BASE: Address = 1000;
/// Initial user stack pointer
pub const USER_STACK_TOP: Address = 999;
/// Initial system stack pointer
pub const SYSTEM_STACK_TOP: Address = 1999;
/// Entry of the timer interrupt handler
pub const TIMER_HANDLER: Address = 1000;
/// Entry of the system call handler
pub const SYSCALL_HANDLER: Address = 1500;

/// Selects the active stack pointer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mode {
    User,
    /// Inside a timer interrupt or system call handler
    System,
}

/// Outcome of one fetch-execute cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Step {
    Continue,
    /// The program executed `END`
    Halt,
}

/// Emulates a CPU
#[derive(Debug, Clone)]
pub struct Processor {
    /// Program counter
    pub pc: Address,
    /// Accumulator
    pub ac: Word,
    pub x: Word,
    pub y: Word,
    /// User stack pointer
    pub usp: Address,
    /// System stack pointer
    pub ssp: Address,
    pub mode: Mode,
    pub timer: Timer,
    /// Completed fetch-execute cycles
    pub cycles: u64,
    rng: StdRng,
}

impl Processor {
    /// Initializes a new CPU with a timer interrupt every `interval` cycles
    pub fn new(interval: u32) -> Self {
        Self::with_rng(interval, StdRng::from_entropy())
    }

    /// Same as [`Processor::new`] with a fixed random sequence
    pub fn with_seed(interval: u32, seed: u64) -> Self {
        Self::with_rng(interval, StdRng::seed_from_u64(seed))
    }

    fn with_rng(interval: u32, rng: StdRng) -> Self {
        Self {
            pc: 0,
            ac: 0,
            x: 0,
            y: 0,
            usp: USER_STACK_TOP,
            ssp: SYSTEM_STACK_TOP,
            mode: Mode::User,
            timer: Timer::new(interval),
            cycles: 0,
            rng,
        }
    }

    /// Active stack pointer
    pub fn sp(&self) -> Address {
        match self.mode {
            Mode::User => self.usp,
            Mode::System => self.ssp,
        }
    }

    fn sp_mut(&mut self) -> &mut Address {
        match self.mode {
            Mode::User => &mut self.usp,
            Mode::System => &mut self.ssp,
        }
    }

    fn push(&mut self, memory: &mut MemoryClient, value: Word) -> Result<()> {
        let address = self.sp();
        let sp = address
            .checked_sub(1)
            .ok_or(Fault::AddressOutOfRange { address })?;
        *self.sp_mut() = sp;
        memory.write(sp, value)
    }

    fn pop(&mut self, memory: &mut MemoryClient) -> Result<Word> {
        let address = self.sp();
        let value = memory.read(address)?;
        *self.sp_mut() = address
            .checked_add(1)
            .ok_or(Fault::AddressOutOfRange { address })?;
        Ok(value)
    }

    /// Reads the word at PC and advances PC
    fn fetch(&mut self, memory: &mut MemoryClient) -> Result<Word> {
        let word = memory.read(self.pc)?;
        self.pc += 1;
        Ok(word)
    }

    /// Switches to the system stack, saves PC and the user stack pointer on it
    /// and jumps to `handler`
    fn enter_system(&mut self, memory: &mut MemoryClient, handler: Address) -> Result<()> {
        let (pc, usp) = (self.pc, self.usp);
        self.mode = Mode::System;
        self.push(memory, pc)?;
        self.push(memory, usp)?;
        self.pc = handler;

        Ok(())
    }

    /// Reports a user mode access to system memory. Execution carries on.
    fn check_mem_access<W: Write>(&self, address: Address, out: &mut W) -> Result<()> {
        if self.sp() < SYSTEM_BASE && address >= SYSTEM_BASE {
            writeln!(
                out,
                "Memory violation: accessing system address {} in user mode.",
                address
            )?;
        }

        Ok(())
    }

    /// Executes a single instruction. PC already points past the opcode.
    pub fn execute_instruction<W: Write>(
        &mut self,
        instruction: Instruction,
        memory: &mut MemoryClient,
        out: &mut W,
    ) -> Result<Step> {
        match instruction {
            Instruction::LOADV => {
                self.ac = self.fetch(memory)?;

                debug!("LOADV {}", self.ac);
            }
            Instruction::LOADA => {
                let addr = self.fetch(memory)?;
                self.check_mem_access(addr, out)?;
                self.ac = memory.read(addr)?;

                debug!("LOADA {}: {}", addr, self.ac);
            }
            Instruction::LOADIND => {
                let addr = self.fetch(memory)?;
                let target = memory.read(addr)?;
                self.ac = memory.read(target)?;

                debug!("LOADIND {} -> {}: {}", addr, target, self.ac);
            }
            Instruction::LOADIDXX => {
                let addr = self.fetch(memory)?;
                self.ac = memory.read(addr.wrapping_add(self.x))?;

                debug!("LOADIDXX {}+{}: {}", addr, self.x, self.ac);
            }
            Instruction::LOADIDXY => {
                let addr = self.fetch(memory)?;
                self.ac = memory.read(addr.wrapping_add(self.y))?;

                debug!("LOADIDXY {}+{}: {}", addr, self.y, self.ac);
            }
            Instruction::LOADSPX => {
                let (sp, x) = (self.sp(), self.x);
                let addr = sp.wrapping_add(x);
                if addr >= USER_STACK_TOP {
                    return Err(Fault::StackBound { sp, x }.into());
                }
                self.ac = memory.read(addr)?;

                debug!("LOADSPX {}+{}: {}", sp, x, self.ac);
            }
            Instruction::STORE => {
                let addr = self.fetch(memory)?;
                memory.write(addr, self.ac)?;

                debug!("STORE {}: {}", addr, self.ac);
            }
            Instruction::GET => {
                self.ac = self.rng.gen_range(1..=100);

                debug!("GET {}", self.ac);
            }
            Instruction::PUT => {
                let port = self.fetch(memory)?;
                match port {
                    1 => write!(out, "{}", self.ac)?,
                    2 => out.write_all(&[self.ac as u8])?,
                    _ => warn!("PUT with unknown port {}", port),
                }

                debug!("PUT {} {}", port, self.ac);
            }
            Instruction::ADDX => {
                self.ac = self.ac.wrapping_add(self.x);

                debug!("ADDX {}", self.ac);
            }
            Instruction::ADDY => {
                self.ac = self.ac.wrapping_add(self.y);

                debug!("ADDY {}", self.ac);
            }
            Instruction::SUBX => {
                self.ac = self.ac.wrapping_sub(self.x);

                debug!("SUBX {}", self.ac);
            }
            Instruction::SUBY => {
                self.ac = self.ac.wrapping_sub(self.y);

                debug!("SUBY {}", self.ac);
            }
            Instruction::COPYTOX => self.x = self.ac,
            Instruction::COPYFROMX => self.ac = self.x,
            Instruction::COPYTOY => self.y = self.ac,
            Instruction::COPYFROMY => self.ac = self.y,
            Instruction::COPYTOSP => {
                let ac = self.ac;
                *self.sp_mut() = ac;

                debug!("COPYTOSP {}", self.ac);
            }
            Instruction::COPYFROMSP => self.ac = self.sp(),
            Instruction::JUMP => {
                self.pc = self.fetch(memory)?;

                debug!("JUMP {}", self.pc);
            }
            Instruction::JUMPEQ => {
                let addr = self.fetch(memory)?;
                if self.ac == 0 {
                    self.pc = addr;
                }

                debug!("JUMPEQ {}: {}", addr, self.ac);
            }
            Instruction::JUMPNE => {
                let addr = self.fetch(memory)?;
                if self.ac != 0 {
                    self.pc = addr;
                }

                debug!("JUMPNE {}: {}", addr, self.ac);
            }
            Instruction::CALL => {
                let addr = self.fetch(memory)?;
                let ret = self.pc;
                self.push(memory, ret)?;
                self.pc = addr;

                debug!("CALL {} (return {})", addr, ret);
            }
            Instruction::RET => {
                self.pc = self.pop(memory)?;

                debug!("RET {}", self.pc);
            }
            Instruction::INCX => self.x = self.x.wrapping_add(1),
            Instruction::DECX => self.x = self.x.wrapping_sub(1),
            Instruction::PUSH => {
                self.push(memory, self.ac)?;

                debug!("PUSH {}", self.ac);
            }
            Instruction::POP => {
                self.ac = self.pop(memory)?;

                debug!("POP {}", self.ac);
            }
            Instruction::INT => {
                self.enter_system(memory, SYSCALL_HANDLER)?;

                debug!("INT");
            }
            Instruction::IRET => {
                let usp = self.pop(memory)?;
                let pc = self.pop(memory)?;
                self.usp = usp;
                self.pc = pc;
                self.mode = Mode::User;

                debug!("IRET {} (usp {})", pc, usp);
            }
            Instruction::END => {
                debug!("END");

                return Ok(Step::Halt);
            }
        }

        Ok(Step::Continue)
    }

    /// Runs one fetch-execute cycle, taking a pending timer interrupt first
    pub fn step<W: Write>(&mut self, memory: &mut MemoryClient, out: &mut W) -> Result<Step> {
        let expired = self.timer.tick();
        if expired && self.mode == Mode::User {
            debug!("timer interrupt at {}", self.pc);
            self.enter_system(memory, TIMER_HANDLER)?;
        }

        let address = self.pc;
        let opcode = self.fetch(memory)?;
        let instruction = Instruction::try_from(opcode)
            .map_err(|_| Fault::InvalidOpcode { opcode, address })?;
        trace!(
            "{:4}: {} ({:?} mode, sp {})",
            address,
            instruction.name(),
            self.mode,
            self.sp()
        );
        let step = self.execute_instruction(instruction, memory, out)?;

        self.cycles += 1;
        if expired {
            self.timer.reload();
        }

        Ok(step)
    }

    /// Run program until it executes `END`
    pub fn execute_until_halt<W: Write>(
        &mut self,
        memory: &mut MemoryClient,
        out: &mut W,
    ) -> Result<()> {
        while self.step(memory, out)? == Step::Continue {}

        info!("Program halted after {} cycles", self.cycles);

        Ok(())
    }
}
