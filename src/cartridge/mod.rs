pub mod mbc;

use crate::error::LoadError;
use crate::snapshot::{ChunkReader, ChunkWriter};
pub use mbc::{Mbc, MbcEvent, RtcRegisters};

const HEADER_MIN_LEN: usize = 0x0150;

/// Which bank-controller family a cartridge-type byte selects. Cartridge
/// types that add extras the header doesn't otherwise distinguish (MBC1+RAM,
/// MBC3+RTC+BATTERY, ...) all collapse to the same three families; the RAM
/// and RTC presence is derived from the RAM-size byte and family, not a
/// separate flag, since the flag carries no information this core needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MbcKind {
    None,
    Mbc1,
    Mbc3,
    Mbc5,
}

impl MbcKind {
    fn from_cartridge_type(byte: u8) -> Self {
        match byte {
            0x00 | 0x08 | 0x09 => MbcKind::None,
            0x01..=0x03 => MbcKind::Mbc1,
            0x0F..=0x13 => MbcKind::Mbc3,
            0x19..=0x1E => MbcKind::Mbc5,
            // Anything this core doesn't recognize is treated as unbanked;
            // a real cartridge would never ship such a byte in practice.
            _ => MbcKind::None,
        }
    }
}

/// Parsed cartridge header, covering exactly the bytes this core reads
/// (§6): type, ROM/RAM size codes, header checksum, and title.
#[derive(Debug, Clone)]
pub struct CartridgeHeader {
    pub mbc_kind: MbcKind,
    pub rom_bank_count: u16,
    pub ram_bank_count: u8,
    pub header_checksum: u8,
    pub title: [u8; 16],
}

impl CartridgeHeader {
    pub fn parse(rom: &[u8]) -> Result<Self, LoadError> {
        if rom.len() < HEADER_MIN_LEN {
            return Err(LoadError::TruncatedHeader);
        }

        let mut title = [0u8; 16];
        title.copy_from_slice(&rom[0x0134..0x0144]);

        let rom_size_code = rom[0x0148];
        let rom_bank_count = 2u16.saturating_pow(u32::from(rom_size_code) + 1);

        let ram_size_code = rom[0x0149];
        let ram_bank_count = match ram_size_code {
            0 | 1 => 0,
            2 => 1,
            3 => 4,
            4 => 16,
            5 => 8,
            _ => 0,
        };

        Ok(CartridgeHeader {
            mbc_kind: MbcKind::from_cartridge_type(rom[0x0147]),
            rom_bank_count,
            ram_bank_count,
            header_checksum: rom[0x014D],
            title,
        })
    }
}

/// Host-supplied callback invoked with a serialized RAM snapshot on the
/// RAM-enable -> disable transition. Absent callback silently discards the
/// snapshot, per the `PersistenceCallbackFailure` policy.
pub type PersistentMemoryCallback = Box<dyn FnMut(&[u8])>;

/// Owns cartridge ROM/RAM storage and the selected bank controller.
pub struct Cartridge {
    pub header: CartridgeHeader,
    pub mbc: Mbc,
    pub rom: Vec<u8>,
    pub ram: Vec<u8>,
    persist_callback: Option<PersistentMemoryCallback>,
}

impl Cartridge {
    pub fn load(rom: Vec<u8>) -> Result<Self, LoadError> {
        let header = CartridgeHeader::parse(&rom)?;
        let mbc = match header.mbc_kind {
            MbcKind::None => Mbc::None,
            MbcKind::Mbc1 => Mbc::new_mbc1(),
            MbcKind::Mbc3 => Mbc::new_mbc3(),
            MbcKind::Mbc5 => Mbc::new_mbc5(),
        };
        let ram_len = usize::from(header.ram_bank_count.max(1)) * 0x2000;
        Ok(Cartridge {
            header,
            mbc,
            rom,
            ram: vec![0; ram_len],
            persist_callback: None,
        })
    }

    pub fn set_persistent_memory_callback(&mut self, callback: PersistentMemoryCallback) {
        self.persist_callback = Some(callback);
    }

    pub fn load_persistent_memory(&mut self, data: &[u8]) {
        let len = self.ram.len().min(data.len());
        self.ram[..len].copy_from_slice(&data[..len]);
    }

    pub fn read_rom(&self, addr: u16) -> u8 {
        let offset = self.mbc.rom_offset(addr);
        self.rom.get(offset).copied().unwrap_or(0xFF)
    }

    pub fn read_ram(&self, addr: u16) -> u8 {
        if !self.mbc.ram_enabled() {
            return 0xFF;
        }
        if let Some(value) = self.mbc.read_rtc() {
            return value;
        }
        match self.mbc.ram_offset(addr) {
            Some(offset) => self.ram.get(offset).copied().unwrap_or(0xFF),
            None => 0xFF,
        }
    }

    pub fn write_rom(&mut self, addr: u16, value: u8) {
        let event = self.mbc.write_register(addr, value);
        if event == MbcEvent::RamDisabled {
            if let Some(callback) = self.persist_callback.as_mut() {
                callback(&self.ram);
            }
        }
    }

    pub fn write_ram(&mut self, addr: u16, value: u8) {
        if !self.mbc.ram_enabled() {
            return;
        }
        if self.mbc.write_rtc_if_selected(value) {
            return;
        }
        if let Some(offset) = self.mbc.ram_offset(addr) {
            if let Some(slot) = self.ram.get_mut(offset) {
                *slot = value;
            }
        }
    }

    pub(crate) fn write_mbc_chunk(&self, w: &mut ChunkWriter) {
        self.mbc.write_chunk(w);
    }

    pub(crate) fn read_mbc_chunk(&mut self, r: &mut ChunkReader) {
        self.mbc = Mbc::read_chunk(r);
    }

    /// Serializes cartridge RAM, used both for the save state's `MbcSave`
    /// chunk and the standalone persistent-RAM envelope (§6.2).
    pub(crate) fn write_ram_chunk(&self, w: &mut ChunkWriter) {
        w.u32(self.ram.len() as u32);
        w.bytes(&self.ram);
    }

    pub(crate) fn read_ram_chunk(&mut self, r: &mut ChunkReader) {
        let len = r.u32() as usize;
        let bytes = r.bytes(len);
        if self.ram.len() != len {
            self.ram.resize(len, 0);
        }
        self.ram.copy_from_slice(&bytes);
    }
}
