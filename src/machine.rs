use std::io::Write;
use std::path::Path;

use color_eyre::eyre::Result;
use log::*;

use crate::bus::MemoryClient;
use crate::memory::{Memory, StdMem};
use crate::processor::Processor;

/// A processor wired to a running memory engine
#[derive(Debug)]
pub struct Machine {
    processor: Processor,
    memory: MemoryClient,
}

impl Machine {
    /// Starts the memory engine with the image produced by `init` and waits
    /// until it is ready
    pub fn boot<const S: usize, F>(init: F, processor: Processor) -> Result<Self>
    where
        F: FnOnce() -> Result<Memory<S>> + Send + 'static,
    {
        let memory = MemoryClient::spawn(init)?;

        Ok(Self { processor, memory })
    }

    /// Boots a machine whose memory engine loads `path`
    pub fn from_file<P: AsRef<Path>>(path: P, interval: u32) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        info!("loading {}", path.display());

        Self::boot(move || StdMem::from_file(path), Processor::new(interval))
    }

    pub fn processor(&self) -> &Processor {
        &self.processor
    }

    /// Runs until the program halts or faults. The memory engine is shut down
    /// and joined in both cases.
    pub fn run<W: Write>(self, out: &mut W) -> Result<Processor> {
        let Self {
            mut processor,
            mut memory,
        } = self;

        let outcome = processor.execute_until_halt(&mut memory, out);
        let flushed = out.flush();
        let shutdown = memory.terminate();

        if let Err(err) = outcome {
            if let Err(shutdown) = shutdown {
                warn!("memory engine did not shut down cleanly: {}", shutdown);
            }
            return Err(err);
        }
        flushed?;
        shutdown?;

        Ok(processor)
    }
}
