//! Jump/call/return opcode group. Grounded on the teacher's `z80/branch.rs`
//! condition-code table and its split of "took the branch" vs "fell
//! through" cycle counts into the same step function.

use super::registers::Flag;
use super::{Cpu, StepOutcome};
use crate::memory::AddressSpace;

/// cc bits 3-4 of a conditional opcode: 0=NZ 1=Z 2=NC 3=C.
fn condition(cpu: &Cpu, cc: u8) -> bool {
    match cc & 3 {
        0 => !cpu.registers.flag(Flag::Z),
        1 => cpu.registers.flag(Flag::Z),
        2 => !cpu.registers.flag(Flag::C),
        3 => cpu.registers.flag(Flag::C),
        _ => unreachable!(),
    }
}

/// `JP nn` (0xC3) — 4 m-cycles.
pub(super) fn op_jp_nn(cpu: &mut Cpu, mem: &mut AddressSpace) -> StepOutcome {
    match cpu.cycle {
        0 => {
            cpu.data8 = mem.read(cpu.registers.pc);
            cpu.registers.pc = cpu.registers.pc.wrapping_add(1);
            StepOutcome::Continue
        }
        1 => {
            let high = mem.read(cpu.registers.pc);
            cpu.registers.pc = cpu.registers.pc.wrapping_add(1);
            cpu.data16 = (u16::from(high) << 8) | u16::from(cpu.data8);
            StepOutcome::Continue
        }
        2 => {
            cpu.registers.pc = cpu.data16;
            StepOutcome::Continue
        }
        3 => StepOutcome::Finished,
        _ => unreachable!(),
    }
}

/// `JP HL` (0xE9) — 1 m-cycle; unlike every other jump this never touches
/// the bus, since HL is already resident in a register.
pub(super) fn op_jp_hl(cpu: &mut Cpu) -> StepOutcome {
    match cpu.cycle {
        0 => {
            cpu.registers.pc = cpu.registers.hl();
            StepOutcome::Finished
        }
        _ => unreachable!(),
    }
}

/// `JP cc,nn` — 4 m-cycles taken, 3 m-cycles not taken.
pub(super) fn op_jp_cc_nn(cpu: &mut Cpu, mem: &mut AddressSpace, opcode: u8) -> StepOutcome {
    let cc = (opcode >> 3) & 3;
    match cpu.cycle {
        0 => {
            cpu.data8 = mem.read(cpu.registers.pc);
            cpu.registers.pc = cpu.registers.pc.wrapping_add(1);
            StepOutcome::Continue
        }
        1 => {
            let high = mem.read(cpu.registers.pc);
            cpu.registers.pc = cpu.registers.pc.wrapping_add(1);
            cpu.data16 = (u16::from(high) << 8) | u16::from(cpu.data8);
            StepOutcome::Continue
        }
        2 => {
            if condition(cpu, cc) {
                cpu.registers.pc = cpu.data16;
                StepOutcome::Continue
            } else {
                StepOutcome::Finished
            }
        }
        3 => StepOutcome::Finished,
        _ => unreachable!(),
    }
}

/// `JR e` (0x18) — 3 m-cycles.
pub(super) fn op_jr_e(cpu: &mut Cpu, mem: &mut AddressSpace) -> StepOutcome {
    match cpu.cycle {
        0 => {
            cpu.data8 = mem.read(cpu.registers.pc);
            cpu.registers.pc = cpu.registers.pc.wrapping_add(1);
            StepOutcome::Continue
        }
        1 => {
            let offset = cpu.data8 as i8 as i32;
            cpu.registers.pc = (cpu.registers.pc as i32).wrapping_add(offset) as u16;
            StepOutcome::Continue
        }
        2 => StepOutcome::Finished,
        _ => unreachable!(),
    }
}

/// `JR cc,e` — 3 m-cycles taken, 2 m-cycles not taken.
pub(super) fn op_jr_cc_e(cpu: &mut Cpu, mem: &mut AddressSpace, opcode: u8) -> StepOutcome {
    let cc = (opcode >> 3) & 3;
    match cpu.cycle {
        0 => {
            cpu.data8 = mem.read(cpu.registers.pc);
            cpu.registers.pc = cpu.registers.pc.wrapping_add(1);
            StepOutcome::Continue
        }
        1 => {
            if condition(cpu, cc) {
                let offset = cpu.data8 as i8 as i32;
                cpu.registers.pc = (cpu.registers.pc as i32).wrapping_add(offset) as u16;
                StepOutcome::Continue
            } else {
                StepOutcome::Finished
            }
        }
        2 => StepOutcome::Finished,
        _ => unreachable!(),
    }
}

/// `CALL nn` (0xCD) — 6 m-cycles.
pub(super) fn op_call_nn(cpu: &mut Cpu, mem: &mut AddressSpace) -> StepOutcome {
    match cpu.cycle {
        0 => {
            cpu.data8 = mem.read(cpu.registers.pc);
            cpu.registers.pc = cpu.registers.pc.wrapping_add(1);
            StepOutcome::Continue
        }
        1 => {
            let high = mem.read(cpu.registers.pc);
            cpu.registers.pc = cpu.registers.pc.wrapping_add(1);
            cpu.data16 = (u16::from(high) << 8) | u16::from(cpu.data8);
            StepOutcome::Continue
        }
        2 => StepOutcome::Continue,
        3 => {
            cpu.registers.sp = cpu.registers.sp.wrapping_sub(1);
            mem.write(cpu.registers.sp, (cpu.registers.pc >> 8) as u8);
            StepOutcome::Continue
        }
        4 => {
            cpu.registers.sp = cpu.registers.sp.wrapping_sub(1);
            mem.write(cpu.registers.sp, cpu.registers.pc as u8);
            cpu.registers.pc = cpu.data16;
            StepOutcome::Continue
        }
        5 => StepOutcome::Finished,
        _ => unreachable!(),
    }
}

/// `CALL cc,nn` — 6 m-cycles taken, 3 m-cycles not taken.
pub(super) fn op_call_cc_nn(cpu: &mut Cpu, mem: &mut AddressSpace, opcode: u8) -> StepOutcome {
    let cc = (opcode >> 3) & 3;
    match cpu.cycle {
        0 => {
            cpu.data8 = mem.read(cpu.registers.pc);
            cpu.registers.pc = cpu.registers.pc.wrapping_add(1);
            StepOutcome::Continue
        }
        1 => {
            let high = mem.read(cpu.registers.pc);
            cpu.registers.pc = cpu.registers.pc.wrapping_add(1);
            cpu.data16 = (u16::from(high) << 8) | u16::from(cpu.data8);
            StepOutcome::Continue
        }
        2 => {
            if condition(cpu, cc) {
                StepOutcome::Continue
            } else {
                StepOutcome::Finished
            }
        }
        3 => {
            cpu.registers.sp = cpu.registers.sp.wrapping_sub(1);
            mem.write(cpu.registers.sp, (cpu.registers.pc >> 8) as u8);
            StepOutcome::Continue
        }
        4 => {
            cpu.registers.sp = cpu.registers.sp.wrapping_sub(1);
            mem.write(cpu.registers.sp, cpu.registers.pc as u8);
            cpu.registers.pc = cpu.data16;
            StepOutcome::Continue
        }
        5 => StepOutcome::Finished,
        _ => unreachable!(),
    }
}

fn pop_pc_cycle(cpu: &mut Cpu, mem: &mut AddressSpace) {
    match cpu.cycle {
        0 => {
            cpu.data8 = mem.read(cpu.registers.sp);
            cpu.registers.sp = cpu.registers.sp.wrapping_add(1);
        }
        1 => {
            let high = mem.read(cpu.registers.sp);
            cpu.registers.sp = cpu.registers.sp.wrapping_add(1);
            cpu.registers.pc = (u16::from(high) << 8) | u16::from(cpu.data8);
        }
        _ => unreachable!(),
    }
}

/// `RET` (0xC9) — 4 m-cycles: pop low, pop high, internal delay, settle.
pub(super) fn op_ret(cpu: &mut Cpu, mem: &mut AddressSpace) -> StepOutcome {
    match cpu.cycle {
        0 | 1 => {
            pop_pc_cycle(cpu, mem);
            StepOutcome::Continue
        }
        2 => StepOutcome::Continue,
        3 => StepOutcome::Finished,
        _ => unreachable!(),
    }
}

/// `RETI` (0xD9) — same timing as RET, plus IME is unconditionally set.
pub(super) fn op_reti(cpu: &mut Cpu, mem: &mut AddressSpace) -> StepOutcome {
    match cpu.cycle {
        0 | 1 => {
            pop_pc_cycle(cpu, mem);
            StepOutcome::Continue
        }
        2 => StepOutcome::Continue,
        3 => {
            cpu.registers.ime = true;
            StepOutcome::Finished
        }
        _ => unreachable!(),
    }
}

/// `RET cc` — 5 m-cycles taken, 2 m-cycles not taken. The leading cycle is
/// an unconditional internal delay to evaluate the condition before the
/// stack pointer moves; the result is stashed in `data8` since the branch
/// decision isn't acted on until the following cycle.
pub(super) fn op_ret_cc(cpu: &mut Cpu, mem: &mut AddressSpace, opcode: u8) -> StepOutcome {
    let cc = (opcode >> 3) & 3;
    match cpu.cycle {
        0 => {
            cpu.data8 = condition(cpu, cc) as u8;
            StepOutcome::Continue
        }
        1 => {
            if cpu.data8 != 0 {
                cpu.data8 = mem.read(cpu.registers.sp);
                cpu.registers.sp = cpu.registers.sp.wrapping_add(1);
                StepOutcome::Continue
            } else {
                StepOutcome::Finished
            }
        }
        2 => {
            let high = mem.read(cpu.registers.sp);
            cpu.registers.sp = cpu.registers.sp.wrapping_add(1);
            cpu.registers.pc = (u16::from(high) << 8) | u16::from(cpu.data8);
            StepOutcome::Continue
        }
        3 => StepOutcome::Continue,
        4 => StepOutcome::Finished,
        _ => unreachable!(),
    }
}

/// `RST n` (0xC7/0xCF/.../0xFF) — 4 m-cycles, same shape as CALL but with
/// a fixed vector baked into the opcode's bits 3-5.
pub(super) fn op_rst(cpu: &mut Cpu, mem: &mut AddressSpace, opcode: u8) -> StepOutcome {
    let vector = u16::from(opcode & 0x38);
    match cpu.cycle {
        0 => StepOutcome::Continue,
        1 => {
            cpu.registers.sp = cpu.registers.sp.wrapping_sub(1);
            mem.write(cpu.registers.sp, (cpu.registers.pc >> 8) as u8);
            StepOutcome::Continue
        }
        2 => {
            cpu.registers.sp = cpu.registers.sp.wrapping_sub(1);
            mem.write(cpu.registers.sp, cpu.registers.pc as u8);
            cpu.registers.pc = vector;
            StepOutcome::Continue
        }
        3 => StepOutcome::Finished,
        _ => unreachable!(),
    }
}
