//! Message protocol between the processor and the memory engine.
//!
//! The processor owns a [`MemoryClient`]; the engine runs [`Memory::serve`] on
//! its own thread. Every access is a synchronous round trip over a pair of
//! one-directional channels, so at most one request is ever in flight.

use std::sync::mpsc::{sync_channel, Receiver, SyncSender};
use std::thread::{self, JoinHandle};

use color_eyre::eyre::{eyre, Result, WrapErr};
use log::*;
use num_enum::IntoPrimitive;

use crate::fault::Fault;
use crate::memory::{Address, Memory, Word};

/// Request kind as it appears on the wire. Terminate uses a sentinel that
/// can never be confused with a read or a write.
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, IntoPrimitive)]
pub enum Operation {
    Read = 0,
    Write = 1,
    Terminate = -1,
}

/// Processor to memory message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Request {
    pub operation: Operation,
    pub address: Address,
    /// Only meaningful for writes
    pub value: Word,
}

impl Request {
    pub fn read(address: Address) -> Self {
        Self {
            operation: Operation::Read,
            address,
            value: 0,
        }
    }

    pub fn write(address: Address, value: Word) -> Self {
        Self {
            operation: Operation::Write,
            address,
            value,
        }
    }

    pub fn terminate() -> Self {
        Self {
            operation: Operation::Terminate,
            address: 0,
            value: 0,
        }
    }
}

/// Memory to processor message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Response {
    /// Sent exactly once, after the engine has loaded its initial contents
    Ready,
    Value(Word),
}

/// Processor side of the channel pair. Owns the engine's thread handle so the
/// engine can always be joined on shutdown.
#[derive(Debug)]
pub struct MemoryClient {
    requests: SyncSender<Request>,
    responses: Receiver<Response>,
    size: usize,
    engine: JoinHandle<Result<()>>,
}

impl MemoryClient {
    /// Spawns the memory engine and blocks until it reports ready.
    ///
    /// `init` runs on the engine thread and produces the initial memory image.
    /// If it fails, the error is returned from here and nothing is served.
    pub fn spawn<const S: usize, F>(init: F) -> Result<Self>
    where
        F: FnOnce() -> Result<Memory<S>> + Send + 'static,
    {
        let (request_tx, request_rx) = sync_channel(1);
        let (response_tx, response_rx) = sync_channel(1);

        let engine = thread::Builder::new()
            .name("memory".into())
            .spawn(move || -> Result<()> {
                let memory = init()?;
                trace!("initial memory image:\n{}", memory.dump());

                response_tx
                    .send(Response::Ready)
                    .map_err(|_| eyre!("processor hung up before memory was ready"))?;
                memory.serve(request_rx, response_tx);

                Ok(())
            })
            .wrap_err("Failed to spawn the memory engine")?;

        match response_rx.recv() {
            Ok(Response::Ready) => {
                debug!("memory engine ready");
                Ok(Self {
                    requests: request_tx,
                    responses: response_rx,
                    size: S,
                    engine,
                })
            }
            Ok(response) => Err(eyre!("expected ready signal, got {:?}", response)),
            Err(_) => {
                join(engine)?;
                Err(eyre!("memory engine exited before it was ready"))
            }
        }
    }

    fn check(&self, address: Address) -> Result<()> {
        if address < 0 || address as usize >= self.size {
            return Err(Fault::AddressOutOfRange { address }.into());
        }

        Ok(())
    }

    /// Reads the word at `address`
    pub fn read(&mut self, address: Address) -> Result<Word> {
        self.check(address)?;
        self.requests
            .send(Request::read(address))
            .map_err(|_| eyre!("memory engine hung up"))?;

        match self.responses.recv() {
            Ok(Response::Value(value)) => Ok(value),
            Ok(response) => Err(eyre!("expected a value from memory, got {:?}", response)),
            Err(_) => Err(eyre!("memory engine hung up")),
        }
    }

    /// Writes `value` at `address`. Writes are not acknowledged.
    pub fn write(&mut self, address: Address, value: Word) -> Result<()> {
        self.check(address)?;
        self.requests
            .send(Request::write(address, value))
            .map_err(|_| eyre!("memory engine hung up"))
    }

    /// Tells the engine to stop and waits for its thread to exit
    pub fn terminate(self) -> Result<()> {
        let Self {
            requests,
            responses,
            engine,
            ..
        } = self;

        if requests.send(Request::terminate()).is_err() {
            debug!("memory engine already gone");
        }
        drop(requests);
        drop(responses);

        join(engine)
    }
}

fn join(engine: JoinHandle<Result<()>>) -> Result<()> {
    engine
        .join()
        .map_err(|_| eyre!("memory engine panicked"))?
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::StdMem;
    use color_eyre::eyre::Result;

    #[test]
    fn test_operation_sentinel() -> Result<()> {
        assert_eq!(Word::from(Operation::Terminate), -1);
        assert_eq!(Word::from(Request::read(4).operation), 0);
        assert_eq!(Word::from(Request::write(4, 9).operation), 1);

        Ok(())
    }

    #[test]
    fn test_read_write_round_trip() -> Result<()> {
        let mut mem = StdMem::default();
        mem.write(3, 33);
        let mut client = MemoryClient::spawn(move || Ok(mem))?;

        assert_eq!(client.read(3)?, 33);
        client.write(1999, 7)?;
        client.write(3, -4)?;
        assert_eq!(client.read(1999)?, 7);
        assert_eq!(client.read(3)?, -4);

        client.terminate()
    }

    #[test]
    fn test_requests_are_served_in_order() -> Result<()> {
        let mut client = MemoryClient::spawn(|| Ok(StdMem::default()))?;

        for value in 0..50 {
            client.write(100, value)?;
        }
        assert_eq!(client.read(100)?, 49);

        client.terminate()
    }

    #[test]
    fn test_out_of_range_is_refused() -> Result<()> {
        let mut client = MemoryClient::spawn(|| Ok(StdMem::default()))?;

        let err = client.read(2000).unwrap_err();
        assert_eq!(
            err.downcast_ref::<Fault>(),
            Some(&Fault::AddressOutOfRange { address: 2000 })
        );
        assert!(client.write(-1, 0).is_err());

        // the engine never saw the bad requests and still serves
        assert_eq!(client.read(0)?, 0);

        client.terminate()
    }

    #[test]
    fn test_failed_init_is_fatal() {
        let err = MemoryClient::spawn::<2000, _>(|| StdMem::from_file("does/not/exist.txt"))
            .unwrap_err();

        assert!(err.to_string().contains("Could not open program file"));
    }
}
