//! Interrupt dispatch timing and the HALT bug (§4.3, §9): dispatch takes
//! exactly 5 machine cycles and pushes PC correctly; HALT with IME=0 and an
//! interrupt already pending doesn't halt and instead re-reads the next
//! opcode byte twice.

mod common;

use common::cpu_with_program;
use sm83_core::interrupts::{self, InterruptType};
use sm83_core::logger::NullLogger;

fn step(cpu: &mut sm83_core::cpu::Cpu, mem: &mut sm83_core::memory::AddressSpace) {
    cpu.step(mem, &mut NullLogger);
}

#[test]
fn interrupt_dispatch_takes_five_cycles_and_pushes_return_address() {
    // NOP at 0x0000, then 4 more NOPs so there's somewhere to return to.
    let (mut cpu, mut mem) = cpu_with_program(&[0x00, 0x00, 0x00, 0x00, 0x00]);
    cpu.registers.ime = true;
    mem.write(0xFFFF, 0x01); // IE: VBlank enabled
    interrupts::request(&mut mem, InterruptType::VBlank);

    // The first step executes the opcode at 0x0000 and, as part of fetching
    // the following one, notices the pending interrupt and switches to
    // dispatch instead — so PC is already at 0x0002 (the address after the
    // NOP that was prefetched but never executed) once this call returns.
    step(&mut cpu, &mut mem);
    assert_eq!(cpu.registers.pc, 0x0002);

    // Four more steps run dispatch cycles 1..=4; the fifth one lands on the
    // vector and, as part of its own trailing prefetch, immediately reads
    // the (NOP) byte at 0x0040 and advances PC to 0x0041.
    for _ in 0..4 {
        step(&mut cpu, &mut mem);
    }
    assert!(!cpu.registers.ime, "IME is cleared during dispatch");
    assert_eq!(mem.read(cpu.registers.sp), 0x02, "pushed PC low byte");
    assert_eq!(mem.read(cpu.registers.sp + 1), 0x00, "pushed PC high byte");

    step(&mut cpu, &mut mem);
    assert_eq!(cpu.registers.pc, 0x0041, "landed on the VBlank vector and prefetched past it");
    assert!(
        !interrupts::has_interrupt_request(&mem, InterruptType::VBlank),
        "IF bit is cleared once the vector is taken"
    );
}

#[test]
fn halt_bug_refetches_next_opcode_byte_twice() {
    // HALT immediately followed by INC B, with IME=0 and the VBlank
    // interrupt already pending: the CPU must not actually halt, and the
    // next opcode fetch must read the same byte (INC B) twice, so B ends
    // up incremented by 2 rather than 1.
    let (mut cpu, mut mem) = cpu_with_program(&[0x76, 0x04, 0x00]);
    cpu.registers.ime = false;
    mem.write(0xFFFF, 0x01);
    interrupts::request(&mut mem, InterruptType::VBlank);

    step(&mut cpu, &mut mem); // HALT: sets the halt-bug flag, does not halt
    assert_eq!(cpu.registers.state, sm83_core::cpu::registers::CpuState::Running);

    step(&mut cpu, &mut mem); // INC B, fetched without advancing PC past it
    step(&mut cpu, &mut mem); // INC B again, PC now advances normally

    assert_eq!(cpu.registers.b, 2, "INC B executed twice due to the halt bug");
}
