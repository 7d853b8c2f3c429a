mod dma;
pub mod io_masks;

use crate::cartridge::Cartridge;
use crate::snapshot::{ChunkReader, ChunkWriter};
use dma::DmaState;

pub const VRAM_START: u16 = 0x8000;
pub const CART_RAM_START: u16 = 0xA000;
pub const WRAM_START: u16 = 0xC000;
pub const ECHO_START: u16 = 0xE000;
pub const ECHO_END: u16 = 0xFDFF;
pub const OAM_START: u16 = 0xFE00;
pub const OAM_END: u16 = 0xFE9F;
pub const UNUSABLE_END: u16 = 0xFEFF;
pub const IO_START: u16 = 0xFF00;
pub const IO_END: u16 = 0xFF7F;
pub const HRAM_START: u16 = 0xFF80;
pub const HRAM_END: u16 = 0xFFFE;
pub const IE_ADDR: u16 = 0xFFFF;

pub const IF_ADDR: u16 = 0xFF0F;

/// A side effect of an I/O write that another subsystem (not reachable from
/// inside `AddressSpace::write`) needs to react to. Only DIV's reset truly
/// needs this: every other documented write side effect either lives inside
/// `AddressSpace` itself (DMA) or is observed by its owning subsystem polling
/// its own register each tick (LCDC enable/disable, channel retrigger).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IoEvent {
    DivReset,
}

/// The 64 KiB flat address space plus I/O masking, write-callback
/// dispatch (modeled as a one-slot pending-event queue, see [`IoEvent`]),
/// and the OAM DMA engine.
pub struct AddressSpace {
    pub cartridge: Cartridge,
    vram: [u8; 0x2000],
    wram: [u8; 0x2000],
    oam: [u8; 0xA0],
    hram: [u8; 0x7F],
    io: [u8; io_masks::IO_WINDOW_SIZE],
    ie: u8,

    unused_bits: [u8; io_masks::IO_WINDOW_SIZE],
    read_only_bits: [u8; io_masks::IO_WINDOW_SIZE],
    write_only_bits: [u8; io_masks::IO_WINDOW_SIZE],

    dma: DmaState,

    oam_read_blocked: bool,
    oam_write_blocked: bool,
    vram_read_blocked: bool,
    vram_write_blocked: bool,

    pending_event: Option<IoEvent>,
}

impl AddressSpace {
    pub fn new(cartridge: Cartridge) -> Self {
        let mut space = AddressSpace {
            cartridge,
            vram: [0; 0x2000],
            wram: [0; 0x2000],
            oam: [0; 0xA0],
            hram: [0; 0x7F],
            io: [0; io_masks::IO_WINDOW_SIZE],
            ie: 0,
            unused_bits: io_masks::default_unused_bits(),
            read_only_bits: io_masks::default_read_only_bits(),
            write_only_bits: io_masks::default_write_only_bits(),
            dma: DmaState::new(),
            oam_read_blocked: false,
            oam_write_blocked: false,
            vram_read_blocked: false,
            vram_write_blocked: false,
            pending_event: None,
        };
        space.io[io_masks::P1] = 0xCF;
        space.io[io_masks::IF] = 0xE1;
        space.io[io_masks::TAC] = 0xF8;
        space
    }

    fn dma_blocks(&self, addr: u16) -> bool {
        self.dma.is_blocking_access() && addr < IO_START
    }

    pub fn read(&self, addr: u16) -> u8 {
        if self.dma_blocks(addr) {
            return 0xFF;
        }
        match addr {
            0x0000..=0x7FFF => self.cartridge.read_rom(addr),
            VRAM_START..=0x9FFF => {
                if self.vram_read_blocked {
                    0xFF
                } else {
                    self.vram[(addr - VRAM_START) as usize]
                }
            }
            CART_RAM_START..=0xBFFF => self.cartridge.read_ram(addr),
            WRAM_START..=0xDFFF => self.wram[(addr - WRAM_START) as usize],
            ECHO_START..=ECHO_END => self.wram[(addr - ECHO_START) as usize],
            OAM_START..=OAM_END => {
                if self.oam_read_blocked {
                    0xFF
                } else {
                    self.oam[(addr - OAM_START) as usize]
                }
            }
            0xFEA0..=UNUSABLE_END => 0xFF,
            IO_START..=IO_END => self.read_io(addr),
            HRAM_START..=HRAM_END => self.hram[(addr - HRAM_START) as usize],
            IE_ADDR => self.ie,
        }
    }

    fn read_io(&self, addr: u16) -> u8 {
        let idx = (addr - IO_START) as usize;
        self.io[idx] | self.unused_bits[idx] | self.write_only_bits[idx]
    }

    pub fn write(&mut self, addr: u16, value: u8) {
        if self.dma_blocks(addr) {
            return;
        }
        match addr {
            0x0000..=0x7FFF => self.cartridge.write_rom(addr, value),
            VRAM_START..=0x9FFF => {
                if !self.vram_write_blocked {
                    self.vram[(addr - VRAM_START) as usize] = value;
                }
            }
            CART_RAM_START..=0xBFFF => self.cartridge.write_ram(addr, value),
            WRAM_START..=0xDFFF => self.wram[(addr - WRAM_START) as usize] = value,
            ECHO_START..=ECHO_END => self.wram[(addr - ECHO_START) as usize] = value,
            OAM_START..=OAM_END => {
                if !self.oam_write_blocked {
                    self.oam[(addr - OAM_START) as usize] = value;
                }
            }
            0xFEA0..=UNUSABLE_END => {}
            IO_START..=IO_END => self.write_io(addr, value),
            HRAM_START..=HRAM_END => self.hram[(addr - HRAM_START) as usize] = value,
            IE_ADDR => self.ie = value,
        }
    }

    fn write_io(&mut self, addr: u16, value: u8) {
        let idx = (addr - IO_START) as usize;
        let preserved = self.io[idx] & self.read_only_bits[idx];
        let incoming = value & !self.read_only_bits[idx];
        self.io[idx] = preserved | incoming;

        if idx == io_masks::DIV {
            self.io[idx] = 0;
            self.pending_event = Some(IoEvent::DivReset);
        } else if idx == io_masks::DMA {
            self.dma.schedule(value);
        }
    }

    /// Bypasses gating and callbacks entirely; used by subsystems to update
    /// registers they own the visible byte for (Timer's DIV high byte,
    /// PPU's LY/STAT, InterruptController's IF).
    pub fn write_direct(&mut self, addr: u16, value: u8) {
        match addr {
            VRAM_START..=0x9FFF => self.vram[(addr - VRAM_START) as usize] = value,
            WRAM_START..=0xDFFF => self.wram[(addr - WRAM_START) as usize] = value,
            OAM_START..=OAM_END => self.oam[(addr - OAM_START) as usize] = value,
            IO_START..=IO_END => self.io[(addr - IO_START) as usize] = value,
            HRAM_START..=HRAM_END => self.hram[(addr - HRAM_START) as usize] = value,
            IE_ADDR => self.ie = value,
            _ => {}
        }
    }

    pub fn read_direct(&self, addr: u16) -> u8 {
        match addr {
            VRAM_START..=0x9FFF => self.vram[(addr - VRAM_START) as usize],
            WRAM_START..=0xDFFF => self.wram[(addr - WRAM_START) as usize],
            OAM_START..=OAM_END => self.oam[(addr - OAM_START) as usize],
            IO_START..=IO_END => self.io[(addr - IO_START) as usize],
            HRAM_START..=HRAM_END => self.hram[(addr - HRAM_START) as usize],
            IE_ADDR => self.ie,
            _ => self.read(addr),
        }
    }

    /// Registers a bit mask in one of the three per-address tables. Used by
    /// subsystem `init` routines the way the source's
    /// `AddIOUnusedBitsOverride`/`AddIOReadOnlyBitsOverride` calls do.
    pub fn set_unused_bits(&mut self, addr: u16, mask: u8) {
        self.unused_bits[(addr - IO_START) as usize] = mask;
    }

    pub fn set_read_only_bits(&mut self, addr: u16, mask: u8) {
        self.read_only_bits[(addr - IO_START) as usize] = mask;
    }

    /// Returns and clears the event produced by the most recent I/O write,
    /// if any. Consumed once per machine cycle by the driving facade right
    /// after the CPU's step, so the effect becomes visible to other
    /// subsystems starting the following cycle (per the ordering guarantee
    /// in the concurrency model).
    pub fn take_pending_event(&mut self) -> Option<IoEvent> {
        self.pending_event.take()
    }

    pub fn read_oam_entry(&self, index: usize) -> [u8; 4] {
        let base = index * 4;
        [self.oam[base], self.oam[base + 1], self.oam[base + 2], self.oam[base + 3]]
    }

    /// Raw VRAM byte, unaffected by the CPU-facing access gating: the PPU's
    /// own pixel fetcher is the thing enforcing that gating on the CPU, not
    /// a second party subject to it.
    pub fn vram_raw(&self, addr: u16) -> u8 {
        self.vram[(addr - VRAM_START) as usize]
    }

    pub fn set_ppu_access_gating(
        &mut self,
        oam_read_blocked: bool,
        oam_write_blocked: bool,
        vram_read_blocked: bool,
        vram_write_blocked: bool,
    ) {
        self.oam_read_blocked = oam_read_blocked;
        self.oam_write_blocked = oam_write_blocked;
        self.vram_read_blocked = vram_read_blocked;
        self.vram_write_blocked = vram_write_blocked;
    }

    /// Advances OAM DMA by one machine cycle. Called first in the fixed
    /// per-cycle advance order (§2) so a completed transfer's bytes are
    /// visible to every subsystem that runs later in the same cycle.
    pub fn advance_dma(&mut self) {
        if let Some(source_high) = self.dma.advance() {
            let base = u16::from(source_high) << 8;
            for i in 0..160u16 {
                let byte = self.raw_read_for_dma(base + i);
                self.oam[i as usize] = byte;
            }
        }
    }

    fn raw_read_for_dma(&self, addr: u16) -> u8 {
        match addr {
            0x0000..=0x7FFF => self.cartridge.read_rom(addr),
            VRAM_START..=0x9FFF => self.vram[(addr - VRAM_START) as usize],
            CART_RAM_START..=0xBFFF => self.cartridge.read_ram(addr),
            WRAM_START..=0xDFFF => self.wram[(addr - WRAM_START) as usize],
            ECHO_START..=ECHO_END => self.wram[(addr - ECHO_START) as usize],
            _ => 0xFF,
        }
    }

    /// Serializes everything owned directly by the address space (the
    /// `Memory` chunk, §6) — cartridge bank-controller and persistent RAM
    /// state travel in their own chunks instead, since they're identified by
    /// ROM checksum rather than by this process's in-memory layout.
    pub(crate) fn write_chunk(&self, w: &mut ChunkWriter) {
        w.bytes(&self.vram);
        w.bytes(&self.wram);
        w.bytes(&self.oam);
        w.bytes(&self.hram);
        w.bytes(&self.io);
        w.u8(self.ie);
        self.dma.write_chunk(w);
        w.bool(self.oam_read_blocked);
        w.bool(self.oam_write_blocked);
        w.bool(self.vram_read_blocked);
        w.bool(self.vram_write_blocked);
        w.u8(match self.pending_event {
            None => 0,
            Some(IoEvent::DivReset) => 1,
        });
    }

    pub(crate) fn read_chunk(&mut self, r: &mut ChunkReader) {
        self.vram.copy_from_slice(&r.bytes(self.vram.len()));
        self.wram.copy_from_slice(&r.bytes(self.wram.len()));
        self.oam.copy_from_slice(&r.bytes(self.oam.len()));
        self.hram.copy_from_slice(&r.bytes(self.hram.len()));
        self.io.copy_from_slice(&r.bytes(self.io.len()));
        self.ie = r.u8();
        self.dma.read_chunk(r);
        self.oam_read_blocked = r.bool();
        self.oam_write_blocked = r.bool();
        self.vram_read_blocked = r.bool();
        self.vram_write_blocked = r.bool();
        self.pending_event = match r.u8() {
            1 => Some(IoEvent::DivReset),
            _ => None,
        };
    }
}
