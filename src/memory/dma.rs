/// OAM DMA transfer state machine. Scheduling a transfer (a write to
/// 0xFF46) takes effect one machine cycle later (`Initializing`), blocks
/// general memory access for the duration of the copy (`InProgress`), and
/// releases it the instant the 160-byte copy completes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DmaPhase {
    Idle,
    Initializing,
    InProgress,
}

#[derive(Debug, Clone, Copy)]
pub struct DmaState {
    phase: DmaPhase,
    source_high: u8,
    progress: u16,
}

/// Total duration of an OAM DMA transfer in machine cycles: one cycle to
/// initialize, then 160 cycles to copy the 160 sprite-table bytes, plus the
/// delay before the copy's last byte becomes externally visible.
const TRANSFER_CYCLES: u16 = 161;

impl DmaState {
    pub fn new() -> Self {
        Self {
            phase: DmaPhase::Idle,
            source_high: 0,
            progress: 0,
        }
    }

    pub fn schedule(&mut self, source_high: u8) {
        self.phase = DmaPhase::Initializing;
        self.source_high = source_high;
        self.progress = 0;
    }

    pub fn is_blocking_access(&self) -> bool {
        self.phase == DmaPhase::InProgress
    }

    /// Advances the DMA state machine by one machine cycle. Returns the
    /// source page to copy from OAM when the transfer completes this cycle.
    pub fn advance(&mut self) -> Option<u8> {
        match self.phase {
            DmaPhase::Idle => None,
            DmaPhase::Initializing => {
                self.phase = DmaPhase::InProgress;
                None
            }
            DmaPhase::InProgress => {
                self.progress += 1;
                if self.progress >= TRANSFER_CYCLES {
                    self.phase = DmaPhase::Idle;
                    self.progress = 0;
                    Some(self.source_high)
                } else {
                    None
                }
            }
        }
    }
}

impl Default for DmaState {
    fn default() -> Self {
        Self::new()
    }
}

fn phase_to_u8(phase: DmaPhase) -> u8 {
    match phase {
        DmaPhase::Idle => 0,
        DmaPhase::Initializing => 1,
        DmaPhase::InProgress => 2,
    }
}

fn phase_from_u8(v: u8) -> DmaPhase {
    match v {
        1 => DmaPhase::Initializing,
        2 => DmaPhase::InProgress,
        _ => DmaPhase::Idle,
    }
}

impl DmaState {
    pub(crate) fn write_chunk(&self, w: &mut crate::snapshot::ChunkWriter) {
        w.u8(phase_to_u8(self.phase));
        w.u8(self.source_high);
        w.u16(self.progress);
    }

    pub(crate) fn read_chunk(&mut self, r: &mut crate::snapshot::ChunkReader) {
        self.phase = phase_from_u8(r.u8());
        self.source_high = r.u8();
        self.progress = r.u16();
    }
}
