//! Top-level facade wiring every subsystem together and owning the fixed
//! per-cycle advance order (§2, §2.1): DMA bookkeeping, joypad refresh,
//! timer tick, PPU advance, APU tick, serial tick, CPU step, in that order,
//! once per machine cycle. Mirrors the shape of the teacher's own
//! `Machine` trait (`core/src/core/machine.rs`) — a single owning type a
//! host drives instead of reaching into subsystems directly — generalized
//! from a per-console-family trait into one concrete struct, since this
//! crate targets exactly one machine.

use crate::apu::{Apu, AudioSink};
use crate::cartridge::Cartridge;
use crate::cpu::Cpu;
use crate::error::{ChunkId, LoadError};
use crate::joypad::Joypad;
use crate::logger::{Logger, NullLogger};
use crate::memory::{AddressSpace, IoEvent};
use crate::ppu::{FrameBuffer, Ppu};
use crate::serial::Serial;
use crate::snapshot::{ChunkReader, ChunkWriter};
use crate::timer::Timer;

/// Host-tunable knobs (§6.2). There is no file-based configuration layer
/// here (no TOML/serde): this crate is a library, not the teacher's
/// `frontend` binary, so configuration is a plain constructor argument.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GameBoyConfig {
    /// 1.0 = real time; > 1.0 shortens the wall-clock budget a host should
    /// spend per cycle. Purely advisory data this crate stores and returns;
    /// wall-clock pacing itself is a host concern (§5).
    pub turbo_speed: f32,
    /// Boot-ROM execution is out of scope (§1); the only supported path is
    /// the post-bootrom power-on state real hardware reaches after running
    /// it. This flag is carried for API completeness and is currently
    /// always treated as `true`.
    pub skip_bootrom: bool,
}

impl Default for GameBoyConfig {
    fn default() -> Self {
        GameBoyConfig { turbo_speed: 1.0, skip_bootrom: true }
    }
}

const AUDIO_SAMPLE_RATE_HZ: u32 = 48_000;
const AUDIO_BUFFER_FRAMES: usize = 4096;

/// Save-state tag string (§6), null-padded to the fixed 27-byte header
/// field.
const SAVE_STATE_TAG: &[u8] = b"SM83_CORE_SAVE_STATE_V1";
const SAVE_STATE_MAGIC: u32 = 0x5342_4D53; // "SMBS" little-endian
const SAVE_STATE_VERSION: u32 = 1;
const TAG_LEN: usize = 27;

const PERSISTENT_RAM_TAG: &[u8] = b"SM83_CORE_PERSISTENT_RAM";
const PERSISTENT_RAM_MAGIC: u32 = 0x4D52_4247; // "GBRM" little-endian

/// The crate's single top-level entry point (§2.1): owns every subsystem
/// and drives them in the fixed per-cycle order.
pub struct GameBoy {
    mem: AddressSpace,
    cpu: Cpu,
    timer: Timer,
    ppu: Ppu,
    apu: Apu,
    joypad: Joypad,
    serial: Serial,
    logger: Box<dyn Logger>,
    config: GameBoyConfig,
    audio_sink: AudioSink,
}

impl GameBoy {
    /// Power-on state, using the default configuration and a no-op logger.
    pub fn new(cartridge: Cartridge) -> Self {
        Self::with_config(cartridge, GameBoyConfig::default())
    }

    pub fn with_config(cartridge: Cartridge, config: GameBoyConfig) -> Self {
        Self::build(cartridge, config, Box::new(NullLogger))
    }

    pub fn new_with_logger(cartridge: Cartridge, logger: Box<dyn Logger>) -> Self {
        Self::build(cartridge, GameBoyConfig::default(), logger)
    }

    fn build(cartridge: Cartridge, config: GameBoyConfig, logger: Box<dyn Logger>) -> Self {
        let mut mem = AddressSpace::new(cartridge);
        let mut cpu = Cpu::new();
        let mut timer = Timer::new();
        let mut ppu = Ppu::new();
        let mut apu = Apu::new(AUDIO_SAMPLE_RATE_HZ);
        let mut joypad = Joypad::new();
        let mut serial = Serial::new();

        // Post-bootrom power-on register state (pandocs DMG values): the
        // only path this core supports, per `skip_bootrom` above.
        cpu.registers.a = 0x01;
        cpu.registers.f = 0xB0;
        cpu.registers.b = 0x00;
        cpu.registers.c = 0x13;
        cpu.registers.d = 0x00;
        cpu.registers.e = 0xD8;
        cpu.registers.h = 0x01;
        cpu.registers.l = 0x4D;
        cpu.registers.sp = 0xFFFE;
        cpu.registers.pc = 0x0100;
        cpu.registers.ime = false;

        timer.init(&mut mem);
        ppu.init(&mut mem);
        apu.init(&mut mem);
        joypad.init(&mut mem);
        serial.init(&mut mem);
        cpu.init(&mut mem);

        GameBoy {
            mem,
            cpu,
            timer,
            ppu,
            apu,
            joypad,
            serial,
            logger,
            config,
            audio_sink: AudioSink::new(AUDIO_BUFFER_FRAMES),
        }
    }

    /// Advances exactly one machine cycle in the fixed order (§2): DMA
    /// bookkeeping, joypad latch refresh, timer tick, PPU advance, APU
    /// tick, serial tick, CPU advance. `IoEvent::DivReset` is consumed right
    /// after the CPU step so the timer sees it starting the next cycle,
    /// matching the ordering guarantee in the concurrency model (§5).
    pub fn step_cycle(&mut self) {
        self.mem.advance_dma();
        self.joypad.refresh(&mut self.mem);
        self.timer.advance(1, &mut self.mem);
        self.ppu.advance(&mut self.mem);
        self.apu.tick(4, &mut self.audio_sink);
        self.serial.update(&mut self.mem, 1);
        self.cpu.step(&mut self.mem, self.logger.as_mut());

        if let Some(IoEvent::DivReset) = self.mem.take_pending_event() {
            self.timer.reset_div(&mut self.mem);
        }
    }

    /// Runs `cycles` machine cycles with no wall-clock dependency; pacing a
    /// host's delta-time against `turbo_speed` is a host concern layered on
    /// top of this (§5).
    pub fn run_for_cycles(&mut self, cycles: u64) {
        for _ in 0..cycles {
            self.step_cycle();
        }
    }

    pub fn frame_buffer(&self) -> &FrameBuffer {
        self.ppu.frame_buffer()
    }

    pub fn audio_sink_mut(&mut self) -> &mut AudioSink {
        &mut self.audio_sink
    }

    /// `dpad`/`buttons` nibbles use the hardware's inverted logic (0 =
    /// pressed); the host is responsible for inverting raw "pressed"
    /// booleans before calling.
    pub fn set_joypad_state(&mut self, dpad: u8, buttons: u8) {
        self.joypad.set_input(dpad, buttons);
    }

    pub fn set_turbo_speed(&mut self, turbo_speed: f32) {
        self.config.turbo_speed = turbo_speed;
    }

    pub fn turbo_speed(&self) -> f32 {
        self.config.turbo_speed
    }

    /// Writes the save-state envelope (§6): a chunked binary blob with a
    /// fixed header (tag, magic, version, ROM header checksum, then
    /// (offset, size) pairs for the ROM-name section, the chunk-table
    /// section, and the data section), followed by the chunk table and the
    /// chunk payloads themselves.
    pub fn serialize(&self) -> Vec<u8> {
        let rom_name = &self.mem.cartridge.header.title;

        let mut chunk_payloads: Vec<(ChunkId, Vec<u8>)> = Vec::with_capacity(8);
        let mut push = |id: ChunkId, w: ChunkWriter| chunk_payloads.push((id, w.into_vec()));

        let mut w = ChunkWriter::new();
        self.mem.write_chunk(&mut w);
        push(ChunkId::Memory, w);

        let mut w = ChunkWriter::new();
        self.cpu.write_chunk(&mut w);
        push(ChunkId::Cpu, w);

        let mut w = ChunkWriter::new();
        self.timer.write_chunk(&mut w);
        push(ChunkId::Timer, w);

        let mut w = ChunkWriter::new();
        self.mem.cartridge.write_mbc_chunk(&mut w);
        push(ChunkId::Mbc, w);

        let mut w = ChunkWriter::new();
        self.apu.write_chunk(&mut w);
        push(ChunkId::Apu, w);

        let mut w = ChunkWriter::new();
        self.ppu.write_chunk(&mut w);
        push(ChunkId::Ppu, w);

        let mut w = ChunkWriter::new();
        self.mem.cartridge.write_ram_chunk(&mut w);
        push(ChunkId::MbcSave, w);

        let mut w = ChunkWriter::new();
        self.serial.write_chunk(&mut w);
        push(ChunkId::Serial, w);

        let mut data = Vec::new();
        let mut chunk_table = ChunkWriter::new();
        for (id, payload) in &chunk_payloads {
            chunk_table.u32(*id as u32);
            chunk_table.u32(data.len() as u32);
            chunk_table.u32(payload.len() as u32);
            data.extend_from_slice(payload);
        }
        let chunk_table_bytes = chunk_table.into_vec();

        let mut out = Vec::new();
        let mut tag = [0u8; TAG_LEN];
        let copy_len = SAVE_STATE_TAG.len().min(TAG_LEN);
        tag[..copy_len].copy_from_slice(&SAVE_STATE_TAG[..copy_len]);
        out.extend_from_slice(&tag);
        out.extend_from_slice(&SAVE_STATE_MAGIC.to_le_bytes());
        out.extend_from_slice(&SAVE_STATE_VERSION.to_le_bytes());
        out.extend_from_slice(&[self.mem.cartridge.header.header_checksum, 0, 0, 0]);

        // Header layout from here: (rom_name_offset, rom_name_size),
        // (chunk_table_offset, chunk_table_size), (data_offset, data_size),
        // all relative to the start of this trailing section.
        let rom_name_offset = 0u32;
        let rom_name_size = rom_name.len() as u32;
        let chunk_table_offset = rom_name_offset + rom_name_size;
        let chunk_table_size = chunk_table_bytes.len() as u32;
        let data_offset = chunk_table_offset + chunk_table_size;
        let data_size = data.len() as u32;

        out.extend_from_slice(&rom_name_offset.to_le_bytes());
        out.extend_from_slice(&rom_name_size.to_le_bytes());
        out.extend_from_slice(&chunk_table_offset.to_le_bytes());
        out.extend_from_slice(&chunk_table_size.to_le_bytes());
        out.extend_from_slice(&data_offset.to_le_bytes());
        out.extend_from_slice(&data_size.to_le_bytes());

        out.extend_from_slice(rom_name);
        out.extend_from_slice(&chunk_table_bytes);
        out.extend_from_slice(&data);
        out
    }

    /// Loads a save state produced by [`GameBoy::serialize`], validating
    /// magic, version, and the ROM header checksum against the cartridge
    /// already loaded into this instance before mutating any state.
    pub fn deserialize(&mut self, bytes: &[u8]) -> Result<(), LoadError> {
        const HEADER_FIXED_LEN: usize = TAG_LEN + 4 + 4 + 4;
        const SECTION_TABLE_LEN: usize = 4 * 6;
        if bytes.len() < HEADER_FIXED_LEN + SECTION_TABLE_LEN {
            return Err(LoadError::TruncatedHeader);
        }

        let mut r = ChunkReader::new(bytes);
        let tag_bytes = r.bytes(TAG_LEN);
        let copy_len = SAVE_STATE_TAG.len().min(TAG_LEN);
        if &tag_bytes[..copy_len] != &SAVE_STATE_TAG[..copy_len] {
            return Err(LoadError::InvalidMagic);
        }
        let magic = r.u32();
        if magic != SAVE_STATE_MAGIC {
            return Err(LoadError::InvalidMagic);
        }
        let version = r.u32();
        if version > SAVE_STATE_VERSION {
            return Err(LoadError::UnsupportedVersion { found: version, max_supported: SAVE_STATE_VERSION });
        }
        let rom_checksum = r.u8();
        let _padding = r.bytes(3);
        let expected = self.mem.cartridge.header.header_checksum;
        if rom_checksum != expected {
            return Err(LoadError::ChecksumMismatch { expected, found: rom_checksum });
        }

        let _rom_name_offset = r.u32();
        let rom_name_size = r.u32();
        let chunk_table_offset = r.u32();
        let chunk_table_size = r.u32();
        let data_offset = r.u32();
        let data_size = r.u32();

        let trailing_start = HEADER_FIXED_LEN + SECTION_TABLE_LEN;
        let trailing = &bytes[trailing_start..];

        let chunk_table_start = chunk_table_offset as usize;
        let chunk_table_end = chunk_table_start + chunk_table_size as usize;
        if chunk_table_end > trailing.len() {
            return Err(LoadError::TruncatedChunk {
                id: ChunkId::Memory,
                expected: chunk_table_size,
                available: trailing.len().saturating_sub(chunk_table_start) as u32,
            });
        }
        let entry_count = chunk_table_size as usize / 12;

        let data_start = data_offset as usize;
        let data_end = data_start + data_size as usize;
        if data_end > trailing.len() {
            return Err(LoadError::TruncatedChunk { id: ChunkId::Memory, expected: data_size, available: trailing.len() as u32 });
        }
        let data = &trailing[data_start..data_end];

        let find_chunk = |target: ChunkId| -> Result<&[u8], LoadError> {
            let mut reader = ChunkReader::new(&trailing[chunk_table_start..chunk_table_end]);
            for _ in 0..entry_count {
                let id_raw = reader.u32();
                let offset = reader.u32() as usize;
                let size = reader.u32() as usize;
                if id_raw == target as u32 {
                    let end = offset + size;
                    if end > data.len() {
                        return Err(LoadError::TruncatedChunk { id: target, expected: size as u32, available: data.len().saturating_sub(offset) as u32 });
                    }
                    return Ok(&data[offset..end]);
                }
            }
            Err(LoadError::MissingChunk { id: target })
        };
        let _ = rom_name_size;

        let memory_bytes = find_chunk(ChunkId::Memory)?;
        self.mem.read_chunk(&mut ChunkReader::new(memory_bytes));

        let cpu_bytes = find_chunk(ChunkId::Cpu)?;
        self.cpu.read_chunk(&mut ChunkReader::new(cpu_bytes));

        let timer_bytes = find_chunk(ChunkId::Timer)?;
        self.timer.read_chunk(&mut ChunkReader::new(timer_bytes));

        let mbc_bytes = find_chunk(ChunkId::Mbc)?;
        self.mem.cartridge.read_mbc_chunk(&mut ChunkReader::new(mbc_bytes));

        let apu_bytes = find_chunk(ChunkId::Apu)?;
        self.apu.read_chunk(&mut ChunkReader::new(apu_bytes));

        let ppu_bytes = find_chunk(ChunkId::Ppu)?;
        self.ppu.read_chunk(&mut ChunkReader::new(ppu_bytes));

        let mbc_save_bytes = find_chunk(ChunkId::MbcSave)?;
        self.mem.cartridge.read_ram_chunk(&mut ChunkReader::new(mbc_save_bytes));

        let serial_bytes = find_chunk(ChunkId::Serial)?;
        self.serial.read_chunk(&mut ChunkReader::new(serial_bytes));

        Ok(())
    }

    /// Emits the standalone persistent-RAM envelope (§6): the same chunked
    /// format as a save state but holding only the `MbcSave` chunk, and
    /// version-independent since cartridge RAM has no internal layout that
    /// changes across this crate's versions.
    pub fn save_persistent_ram(&self) -> Vec<u8> {
        let mut w = ChunkWriter::new();
        self.mem.cartridge.write_ram_chunk(&mut w);
        let payload = w.into_vec();

        let mut out = Vec::new();
        let mut tag = [0u8; TAG_LEN];
        let copy_len = PERSISTENT_RAM_TAG.len().min(TAG_LEN);
        tag[..copy_len].copy_from_slice(&PERSISTENT_RAM_TAG[..copy_len]);
        out.extend_from_slice(&tag);
        out.extend_from_slice(&PERSISTENT_RAM_MAGIC.to_le_bytes());
        out.extend_from_slice(&payload);
        out
    }

    pub fn load_persistent_ram(&mut self, bytes: &[u8]) -> Result<(), LoadError> {
        if bytes.len() < TAG_LEN + 4 {
            return Err(LoadError::TruncatedHeader);
        }
        let mut r = ChunkReader::new(bytes);
        let tag_bytes = r.bytes(TAG_LEN);
        let copy_len = PERSISTENT_RAM_TAG.len().min(TAG_LEN);
        if &tag_bytes[..copy_len] != &PERSISTENT_RAM_TAG[..copy_len] {
            return Err(LoadError::InvalidMagic);
        }
        let magic = r.u32();
        if magic != PERSISTENT_RAM_MAGIC {
            return Err(LoadError::InvalidMagic);
        }
        let payload = &bytes[TAG_LEN + 4..];
        self.mem.cartridge.read_ram_chunk(&mut ChunkReader::new(payload));
        Ok(())
    }
}
