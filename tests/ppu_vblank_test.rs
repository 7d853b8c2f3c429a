//! One VBlank interrupt request per frame (§8): driving the PPU for exactly
//! one 70224-dot frame must request VBlank exactly once.

mod common;

use common::blank_address_space;
use sm83_core::interrupts::{self, InterruptType};
use sm83_core::memory::io_masks;
use sm83_core::memory::IO_START;
use sm83_core::ppu::Ppu;

const DOTS_PER_FRAME: u32 = 70224;
const DOTS_PER_MACHINE_CYCLE: u32 = 4;

#[test]
fn exactly_one_vblank_per_frame() {
    let mut mem = blank_address_space();
    let mut ppu = Ppu::new();
    ppu.init(&mut mem);
    mem.write_direct(IO_START + io_masks::LCDC as u16, 0x91); // LCD + BG on

    let mut vblank_requests = 0u32;
    for _ in 0..(DOTS_PER_FRAME / DOTS_PER_MACHINE_CYCLE) {
        ppu.advance(&mut mem);
        if interrupts::has_interrupt_request(&mem, InterruptType::VBlank) {
            vblank_requests += 1;
            interrupts::clear(&mut mem, InterruptType::VBlank);
        }
    }

    assert_eq!(vblank_requests, 1, "a full frame must request VBlank exactly once");
}
