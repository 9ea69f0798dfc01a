use std::path::PathBuf;

use color_eyre::eyre::Result;
use pipevm::memory::StdMem;
use pipevm::processor::{Mode, Processor, TIMER_HANDLER};
use pipevm::{Fault, Machine};

fn program(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("programs")
        .join(name)
}

fn run_file(name: &str, interval: u32) -> Result<String> {
    let mut out = Vec::new();
    Machine::from_file(program(name), interval)?.run(&mut out)?;

    Ok(String::from_utf8(out)?)
}

fn run_text(text: &'static str, interval: u32) -> Result<(Processor, Vec<u8>)> {
    let machine = Machine::boot(move || Ok(StdMem::load(text)), Processor::with_seed(interval, 0))?;
    let mut out = Vec::new();
    let processor = machine.run(&mut out)?;

    Ok((processor, out))
}

#[test]
fn prints_five_and_halts() -> Result<()> {
    let (processor, out) = run_text("1\n5\n9\n1\n50\n", 1000)?;

    assert_eq!(out, b"5");
    assert_eq!(processor.cycles, 3);
    assert_eq!(processor.ac, 5);

    assert_eq!(run_file("print5.txt", 1000)?, "5");

    Ok(())
}

#[test]
fn timer_preempts_an_endless_loop() -> Result<()> {
    // user program jumps to itself forever; the handler halts
    let (processor, out) = run_text("20\n0\n.1000\n50\n", 3)?;

    assert!(out.is_empty());
    assert_eq!(processor.cycles, 3);
    assert_eq!(processor.mode, Mode::System);
    assert_eq!(processor.pc, TIMER_HANDLER + 1);
    assert_eq!(processor.ssp, 1997);

    Ok(())
}

#[test]
fn interrupts_are_transparent() -> Result<()> {
    for interval in [2, 3, 5, 1000] {
        assert_eq!(run_file("countdown.txt", interval)?, "321\n");
        assert_eq!(run_file("subroutine.txt", interval)?, "77");
    }

    Ok(())
}

#[test]
fn syscall_runs_system_handler() -> Result<()> {
    assert_eq!(run_file("syscall.txt", 1000)?, "H!\n");
    assert_eq!(run_file("syscall.txt", 2)?, "H!\n");

    Ok(())
}

#[test]
fn violation_is_reported_and_load_continues() -> Result<()> {
    assert_eq!(
        run_file("violation.txt", 1000)?,
        "Memory violation: accessing system address 1500 in user mode.\n42"
    );

    Ok(())
}

#[test]
fn stack_bound_is_fatal_without_output() -> Result<()> {
    let machine = Machine::boot(
        || Ok(StdMem::load("6\n9\n1\n50\n")),
        Processor::with_seed(1000, 0),
    )?;
    let mut out = Vec::new();

    let err = machine.run(&mut out).unwrap_err();

    assert_eq!(
        err.downcast_ref::<Fault>(),
        Some(&Fault::StackBound { sp: 999, x: 0 })
    );
    assert!(out.is_empty());

    Ok(())
}

#[test]
fn missing_program_is_fatal() {
    let err = Machine::from_file(program("does-not-exist.txt"), 5).unwrap_err();

    assert!(format!("{:?}", err).contains("Could not open program file"));
}

#[test]
fn boot_hands_over_injected_state() -> Result<()> {
    let mut processor = Processor::with_seed(1000, 0);
    processor.pc = 1200;
    processor.x = 4;

    let machine = Machine::boot(
        || Ok(StdMem::load(".1200\n15\n9\n1\n50\n")),
        processor,
    )?;
    assert_eq!(machine.processor().pc, 1200);

    let mut out = Vec::new();
    machine.run(&mut out)?;
    assert_eq!(out, b"4");

    Ok(())
}
