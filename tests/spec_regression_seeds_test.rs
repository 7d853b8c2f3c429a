//! Literal regression seeds named in the spec's end-to-end scenarios: a
//! minimal `LD A,n; HALT` program reaching the halted state with the loaded
//! value in A, and EI's one-instruction dispatch delay.

mod common;

use common::cpu_with_program;
use sm83_core::cpu::registers::CpuState;
use sm83_core::interrupts::{self, InterruptType};
use sm83_core::logger::NullLogger;

fn step(cpu: &mut sm83_core::cpu::Cpu, mem: &mut sm83_core::memory::AddressSpace) {
    cpu.step(mem, &mut NullLogger);
}

#[test]
fn ld_a_n_then_halt_loads_accumulator_and_halts() {
    // `3E 42 76`: LD A,0x42; HALT. No interrupt pending, so HALT actually
    // suspends the CPU rather than triggering the halt bug.
    let (mut cpu, mut mem) = cpu_with_program(&[0x3E, 0x42, 0x76]);

    for _ in 0..4 {
        step(&mut cpu, &mut mem);
    }

    assert_eq!(cpu.registers.a, 0x42);
    assert_eq!(cpu.registers.state, CpuState::Halt);
}

#[test]
fn ei_defers_interrupt_dispatch_until_after_the_following_instruction() {
    // LD A,0; EI; LD A,1; NOP..., with IE/IF both pre-armed for VBlank.
    // `LD A,1` (the single instruction immediately after EI) must run to
    // completion with IME already true but dispatch still withheld; only
    // once it finishes does the CPU act on the pending interrupt.
    let (mut cpu, mut mem) = cpu_with_program(&[0x3E, 0x00, 0xFB, 0x3E, 0x01, 0x00, 0x00, 0x00]);
    mem.write(0xFFFF, 0x01);
    interrupts::request(&mut mem, InterruptType::VBlank);

    // LD A,0 takes two machine cycles to complete.
    step(&mut cpu, &mut mem);
    step(&mut cpu, &mut mem);
    assert_eq!(cpu.registers.a, 0x00);
    assert!(!cpu.registers.ime);

    // EI: IME becomes true on this very cycle, but the dispatch check that
    // follows is withheld because the just-completed opcode was EI.
    step(&mut cpu, &mut mem);
    assert!(cpu.registers.ime);

    // LD A,1 (immediately after EI) must run uninterrupted to completion.
    step(&mut cpu, &mut mem);
    step(&mut cpu, &mut mem);
    assert_eq!(cpu.registers.a, 0x01, "the instruction right after EI must not be preempted");
    assert!(cpu.registers.ime, "IME is not cleared until dispatch actually begins");

    // Only now does dispatch engage: five more cycles clear IME, push PC,
    // and land on the VBlank vector (0x40), leaving PC just past it after
    // the trailing prefetch.
    for _ in 0..5 {
        step(&mut cpu, &mut mem);
    }
    assert!(!cpu.registers.ime);
    assert_eq!(cpu.registers.pc, 0x0041);
    assert!(!interrupts::has_interrupt_request(&mem, InterruptType::VBlank));
}
