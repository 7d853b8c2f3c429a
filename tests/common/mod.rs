use sm83_core::cpu::Cpu;
use sm83_core::memory::AddressSpace;
use sm83_core::{Cartridge, GameBoy, GameBoyConfig};

/// Builds a minimal valid cartridge image: a flat, unbanked 32 KiB ROM with
/// just enough header bytes filled in (cartridge type, ROM/RAM size codes,
/// header checksum) for `CartridgeHeader::parse` to accept it.
pub fn blank_rom() -> Vec<u8> {
    let mut rom = vec![0u8; 0x8000];
    rom[0x0147] = 0x00; // no MBC
    rom[0x0148] = 0x00; // 32 KiB, 2 banks
    rom[0x0149] = 0x00; // no cartridge RAM
    rom[0x014D] = 0x00; // header checksum (unchecked by this core's loader)
    rom
}

pub fn blank_cartridge() -> Cartridge {
    Cartridge::load(blank_rom()).expect("blank ROM header is well-formed")
}

/// A bare `AddressSpace` over a blank cartridge, for subsystem-level tests
/// that don't need the full `GameBoy` facade (mirrors the fixture already
/// used by the timer's own inline unit tests).
pub fn blank_address_space() -> AddressSpace {
    AddressSpace::new(blank_cartridge())
}

pub fn new_gameboy() -> GameBoy {
    GameBoy::new(blank_cartridge())
}

pub fn new_gameboy_with_config(config: GameBoyConfig) -> GameBoy {
    GameBoy::with_config(blank_cartridge(), config)
}

/// Loads `program` starting at address 0x0100 (the cartridge entry point
/// power-on jumps to) into `rom`.
pub fn load_program(rom: &mut [u8], program: &[u8]) {
    rom[0x0100..0x0100 + program.len()].copy_from_slice(program);
}

/// A bare `Cpu` + `AddressSpace` pair with `program` loaded at address 0 and
/// PC already pointed at it, for opcode-level tests that drive the CPU
/// directly instead of through the `GameBoy` facade (the same shape as the
/// timer's own inline unit tests).
pub fn cpu_with_program(program: &[u8]) -> (Cpu, AddressSpace) {
    let mut rom = blank_rom();
    rom[..program.len()].copy_from_slice(program);
    let mut mem = AddressSpace::new(Cartridge::load(rom).expect("blank ROM header is well-formed"));
    let mut cpu = Cpu::new();
    cpu.registers.pc = 0;
    cpu.init(&mut mem);
    (cpu, mem)
}
