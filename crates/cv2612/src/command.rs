//! Discrete commands on the command channel.
//!
//! Commands are CC messages on MIDI channel 15 whose CC number is the
//! command code (101..=115) and whose value is the command payload.
//! Commands without a payload carry [`NO_PAYLOAD`].
use std::fmt;

use crate::address::{ChannelId, PatchId};

/// Value sent with commands that carry no payload.
pub const NO_PAYLOAD: u8 = 127;

/// Command codes understood by the firmware.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Command {
    BindX = 101,
    BindY = 102,
    BindZ = 103,
    CopyPatch = 104,
    MovePatch = 105,
    CopyChannel = 106,
    MoveChannel = 107,
    SetSeqStepOn = 108,
    SetSeqStepOff = 109,
    SaveState = 110,
    ClearSeq = 111,
    ClearBindings = 112,
    SetCalibrationStep = 113,
    ToggleDebug = 114,
    SendCrc32Chunk = 115,
}

impl Command {
    pub const ALL: [Command; 15] = [
        Command::BindX,
        Command::BindY,
        Command::BindZ,
        Command::CopyPatch,
        Command::MovePatch,
        Command::CopyChannel,
        Command::MoveChannel,
        Command::SetSeqStepOn,
        Command::SetSeqStepOff,
        Command::SaveState,
        Command::ClearSeq,
        Command::ClearBindings,
        Command::SetCalibrationStep,
        Command::ToggleDebug,
        Command::SendCrc32Chunk,
    ];

    pub fn code(self) -> u8 {
        self as u8
    }

    pub fn from_code(code: u8) -> Option<Command> {
        Self::ALL.into_iter().find(|c| c.code() == code)
    }

    pub fn name(self) -> &'static str {
        match self {
            Command::BindX => "BIND_X",
            Command::BindY => "BIND_Y",
            Command::BindZ => "BIND_Z",
            Command::CopyPatch => "COPY_PATCH",
            Command::MovePatch => "MOVE_PATCH",
            Command::CopyChannel => "COPY_CHANNEL",
            Command::MoveChannel => "MOVE_CHANNEL",
            Command::SetSeqStepOn => "SET_SEQ_STEP_ON",
            Command::SetSeqStepOff => "SET_SEQ_STEP_OFF",
            Command::SaveState => "SAVE_STATE",
            Command::ClearSeq => "CLEAR_SEQ",
            Command::ClearBindings => "CLEAR_BINDINGS",
            Command::SetCalibrationStep => "SET_CALIBRATION_STEP",
            Command::ToggleDebug => "TOGGLE_DEBUG",
            Command::SendCrc32Chunk => "SEND_CRC32_CHUNK",
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Stride of the sum-based channel command encoding.
const CHANNEL_STRIDE: u8 = 6;
/// One patch worth of channel command values (5 shrunk targets × 6 sources).
const PATCH_STRIDE: u8 = 30;

/// A structural edit the firmware replays locally.
///
/// Patch commands pack two 3-bit indices. Channel commands use a sum
/// encoding: `patch * 30 + shrunk * 6 + source`, where `shrunk` is the
/// other channel index with the source's slot removed (so it fits 0..=4).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StructuralCommand {
    /// Move patch `index` so that it ends at position `before`.
    MovePatch { index: PatchId, before: PatchId },
    CopyPatch { source: PatchId, target: PatchId },
    /// Move channel `index` of `patch` so that it ends at position `before`.
    MoveChannel {
        patch: PatchId,
        index: ChannelId,
        before: ChannelId,
    },
    CopyChannel {
        patch: PatchId,
        source: ChannelId,
        target: ChannelId,
    },
}

fn shrink(other: u8, anchor: u8) -> u8 {
    if other < anchor { other } else { other - 1 }
}

fn expand(shrunk: u8, anchor: u8) -> u8 {
    if shrunk < anchor { shrunk } else { shrunk + 1 }
}

impl StructuralCommand {
    pub fn command(&self) -> Command {
        match self {
            StructuralCommand::MovePatch { .. } => Command::MovePatch,
            StructuralCommand::CopyPatch { .. } => Command::CopyPatch,
            StructuralCommand::MoveChannel { .. } => Command::MoveChannel,
            StructuralCommand::CopyChannel { .. } => Command::CopyChannel,
        }
    }

    /// Wire value of the command (always within 0..=127).
    pub fn value(&self) -> u8 {
        match *self {
            StructuralCommand::MovePatch { index, before } => {
                // encode two 3-bit values together
                ((index.index() & 0b111) << 3) | (before.index() & 0b111)
            }
            StructuralCommand::CopyPatch { source, target } => {
                ((source.index() & 0b111) << 3) | (target.index() & 0b111)
            }
            StructuralCommand::MoveChannel {
                patch,
                index,
                before,
            } => {
                patch.index() * PATCH_STRIDE
                    + shrink(before.index(), index.index()) * CHANNEL_STRIDE
                    + index.index()
            }
            StructuralCommand::CopyChannel {
                patch,
                source,
                target,
            } => {
                patch.index() * PATCH_STRIDE
                    + shrink(target.index(), source.index()) * CHANNEL_STRIDE
                    + source.index()
            }
        }
    }

    /// Decode a structural command from its command code and wire value.
    pub fn decode(command: Command, value: u8) -> Option<StructuralCommand> {
        match command {
            Command::MovePatch => Some(StructuralCommand::MovePatch {
                index: PatchId::new((value >> 3) & 0b111)?,
                before: PatchId::new(value & 0b111)?,
            }),
            Command::CopyPatch => Some(StructuralCommand::CopyPatch {
                source: PatchId::new((value >> 3) & 0b111)?,
                target: PatchId::new(value & 0b111)?,
            }),
            Command::MoveChannel | Command::CopyChannel => {
                let patch = PatchId::new(value / PATCH_STRIDE)?;
                let rest = value % PATCH_STRIDE;
                let anchor = ChannelId::new(rest % CHANNEL_STRIDE)?;
                let other = ChannelId::new(expand(rest / CHANNEL_STRIDE, anchor.index()))?;
                Some(if command == Command::MoveChannel {
                    StructuralCommand::MoveChannel {
                        patch,
                        index: anchor,
                        before: other,
                    }
                } else {
                    StructuralCommand::CopyChannel {
                        patch,
                        source: anchor,
                        target: other,
                    }
                })
            }
            _ => None,
        }
    }
}

/// Payload of SET_SEQ_STEP_ON/OFF for `voice` (0..6) and `step` (0..16).
pub fn seq_step_value(voice: u8, step: u8) -> u8 {
    voice * 16 + step
}

/// The eight SEND_CRC32_CHUNK payloads for `crc`: `(chunk << 4) | nibble`,
/// chunk 0 carrying the least significant nibble.
pub fn crc32_chunks(crc: u32) -> [u8; 8] {
    std::array::from_fn(|i| ((i as u8) << 4) | ((crc >> (i * 4)) & 0x0F) as u8)
}

/// Reassemble a CRC32 from chunk payloads in any order.
///
/// Returns `None` unless every chunk index 0..8 is present exactly once.
pub fn crc32_from_chunks(values: &[u8]) -> Option<u32> {
    let mut seen = [false; 8];
    let mut crc = 0u32;
    for v in values {
        let chunk = (v >> 4) as usize;
        if chunk >= 8 || seen[chunk] {
            return None;
        }
        seen[chunk] = true;
        crc |= ((v & 0x0F) as u32) << (chunk * 4);
    }
    seen.iter().all(|s| *s).then_some(crc)
}
