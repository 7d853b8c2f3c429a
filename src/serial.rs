//! Serial loopback (§4.8). Link-cable peer communication is an explicit
//! non-goal; this models exactly enough of the transfer state machine for
//! test ROMs (Blargg's suite) that treat the serial port as a text sink to
//! observe "Passed"/"Failed" without a second physical machine attached.

use crate::interrupts::{self, InterruptType};
use crate::memory::{io_masks, AddressSpace, IO_START};
use crate::snapshot::{ChunkReader, ChunkWriter};

const SC_TRANSFER_START: u8 = 0b1000_0000;
const SC_INTERNAL_CLOCK: u8 = 0b0000_0001;

/// Internal-clock bit period, in machine cycles, matching the DMG's
/// 8192 Hz serial clock (4194304 / 8192 / 4 = 128 m-cycles per bit).
const INTERNAL_CLOCK_PERIOD: u32 = 128;

pub struct Serial {
    active: bool,
    bits_remaining: u8,
    clock_accum: u32,
}

impl Serial {
    pub fn new() -> Self {
        Serial {
            active: false,
            bits_remaining: 0,
            clock_accum: 0,
        }
    }

    pub fn init(&mut self, mem: &mut AddressSpace) {
        mem.set_unused_bits(IO_START + io_masks::SC as u16, 0b0111_1110);
    }

    /// Advances the serial clock by `cycles` machine cycles.
    pub fn update(&mut self, mem: &mut AddressSpace, cycles: u32) {
        let sc = mem.read_direct(IO_START + io_masks::SC as u16);
        if sc & SC_TRANSFER_START == 0 {
            self.active = false;
            return;
        }
        if sc & SC_INTERNAL_CLOCK == 0 {
            // External clock: no peer is ever attached, so a transfer
            // started with an external clock source never completes.
            return;
        }

        if !self.active {
            self.active = true;
            self.bits_remaining = 8;
            self.clock_accum = 0;
        }

        self.clock_accum += cycles;
        while self.clock_accum >= INTERNAL_CLOCK_PERIOD && self.bits_remaining > 0 {
            self.clock_accum -= INTERNAL_CLOCK_PERIOD;
            self.shift_in_one_bit(mem);
            self.bits_remaining -= 1;
        }

        if self.bits_remaining == 0 && self.active {
            self.active = false;
            mem.write_direct(
                IO_START + io_masks::SC as u16,
                sc & !SC_TRANSFER_START,
            );
            interrupts::request(mem, InterruptType::Serial);
        }
    }

    /// No peer is ever connected; the loopback source reads as all-ones.
    fn shift_in_one_bit(&self, mem: &mut AddressSpace) {
        let sb_addr = IO_START + io_masks::SB as u16;
        let sb = mem.read_direct(sb_addr);
        mem.write_direct(sb_addr, (sb << 1) | 1);
    }

    pub(crate) fn write_chunk(&self, w: &mut ChunkWriter) {
        w.bool(self.active);
        w.u8(self.bits_remaining);
        w.u32(self.clock_accum);
    }

    pub(crate) fn read_chunk(&mut self, r: &mut ChunkReader) {
        self.active = r.bool();
        self.bits_remaining = r.u8();
        self.clock_accum = r.u32();
    }
}

impl Default for Serial {
    fn default() -> Self {
        Self::new()
    }
}
