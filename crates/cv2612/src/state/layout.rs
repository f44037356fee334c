//! Firmware memory layout mirror and CRC32.
//!
//! [`serialize`] produces the exact byte image of the firmware's packed
//! structs so that [`calculate_crc32`] yields the same checksum the module
//! computes over its own memory. The order below is a firmware contract:
//!
//! 1. Patches (4 × 157 bytes): LFO byte (`rate | 8` when non-zero), then per
//!    channel `al | fb << 3`, `fms | ams << 3 | st << 6`, then per operator
//!    `mul | det << 4`, `tl`, `ar | rs << 6`, `d1 | am << 7`, `d2`,
//!    `rr | sl << 4`.
//! 2. Bindings (3 × 9 bytes): per modulator one byte of channel-level flags
//!    then 2 bytes of flags per operator.
//! 3. Settings (20 bytes): `pm`, `rc`, `polyphony`, six 16-bit sequence
//!    masks (low byte first), `lb | quantize << 7`, `tr | legato << 7`,
//!    `tu | velocity << 7`, `portamento`, `stp`.
use crate::address::{OperatorId, binding_index};
use crate::binding::{Bindings, Modulator};
use crate::param::ParamId;
use crate::state::{Channel, ModuleState, Operator, Patch, SEQ_VOICES, Settings};

pub const OPERATOR_LEN: usize = 6;
pub const CHANNEL_LEN: usize = 2 + 4 * OPERATOR_LEN;
pub const PATCH_LEN: usize = 1 + 6 * CHANNEL_LEN;
pub const BINDING_SLOT_LEN: usize = 1 + 4 * 2;
pub const SETTINGS_LEN: usize = 3 + SEQ_VOICES * 2 + 5;
/// Total length of the serialized image.
pub const LAYOUT_LEN: usize = 4 * PATCH_LEN + 3 * BINDING_SLOT_LEN + SETTINGS_LEN;

const CRC32_POLY: u32 = 0x04C1_1DB7;
const LFO_ENABLE: u8 = 0x08;

fn push_operator(out: &mut Vec<u8>, op: &Operator) {
    out.push(op.mul | op.det << 4);
    out.push(op.tl);
    out.push(op.ar | op.rs << 6);
    out.push(op.d1 | op.am << 7);
    out.push(op.d2);
    out.push(op.rr | op.sl << 4);
}

fn push_channel(out: &mut Vec<u8>, ch: &Channel) {
    out.push(ch.al | ch.fb << 3);
    out.push(ch.fms | ch.ams << 3 | ch.st << 6);
    for op in &ch.operators {
        push_operator(out, op);
    }
}

fn push_patch(out: &mut Vec<u8>, patch: &Patch) {
    out.push(if patch.lfo == 0 {
        0
    } else {
        patch.lfo | LFO_ENABLE
    });
    for ch in &patch.channels {
        push_channel(out, ch);
    }
}

/// Pack the binding flags of `ids` (bit `n` for the `n`th id) for one slot.
fn binding_flags(bindings: &Bindings, m: Modulator, ids: &[ParamId], op: OperatorId) -> u8 {
    ids.iter().enumerate().fold(0u8, |flags, (bit, id)| {
        match binding_index(*id, op) {
            Some(index) if bindings.contains(m, index) => flags | 1 << bit,
            _ => flags,
        }
    })
}

fn push_bindings(out: &mut Vec<u8>, bindings: &Bindings) {
    use ParamId::*;
    const CHANNEL_FLAGS: [ParamId; 6] = [Lfo, Stereo, Feedback, Algorithm, Ams, Fms];
    const OPERATOR_FLAGS: [ParamId; 8] = [
        AttackRate,
        Decay1,
        SustainLevel,
        Decay2,
        TotalLevel,
        ReleaseRate,
        Detune,
        Multiplier,
    ];
    const OPERATOR_EXTRA_FLAGS: [ParamId; 2] = [RateScaling, AmplitudeMod];

    for m in Modulator::ALL {
        out.push(binding_flags(bindings, m, &CHANNEL_FLAGS, OperatorId::ZERO));
        for op in OperatorId::all() {
            out.push(binding_flags(bindings, m, &OPERATOR_FLAGS, op));
            out.push(binding_flags(bindings, m, &OPERATOR_EXTRA_FLAGS, op));
        }
    }
}

fn push_settings(out: &mut Vec<u8>, state: &ModuleState) {
    let settings: &Settings = &state.settings;
    out.push(settings.pm);
    out.push(settings.rc);
    out.push(settings.polyphony);
    for voice in 0..SEQ_VOICES {
        out.extend_from_slice(&state.sequence.mask(voice).to_le_bytes());
    }
    out.push(settings.lb | settings.quantize << 7);
    out.push(settings.tr | settings.legato << 7);
    out.push(settings.tu | settings.velocity << 7);
    out.push(settings.portamento);
    out.push(settings.stp);
}

/// Serialize `state` into the firmware's byte image.
///
/// Values are expected to be within their bit widths (see
/// [`ModuleState::validate`]); wider values would bleed into neighbouring
/// fields exactly as they would in the firmware's bitfields.
///
/// # Examples
///
/// ```
/// use cv2612::state::{LAYOUT_LEN, ModuleState, serialize};
///
/// let bytes = serialize(&ModuleState::default());
/// assert_eq!(bytes.len(), LAYOUT_LEN);
/// // default channel: al 7, fb 0
/// assert_eq!(bytes[1], 7);
/// ```
pub fn serialize(state: &ModuleState) -> Vec<u8> {
    let mut out = Vec::with_capacity(LAYOUT_LEN);
    for patch in &state.patches {
        push_patch(&mut out, patch);
    }
    push_bindings(&mut out, &state.bindings);
    push_settings(&mut out, state);
    out
}

/// Bit-serial CRC32, polynomial `0x04C11DB7`, MSB first, initial value 0,
/// no final XOR.
pub fn crc32(bytes: &[u8]) -> u32 {
    let mut crc = 0u32;
    for byte in bytes {
        crc ^= (*byte as u32) << 24;
        for _ in 0..8 {
            crc = if crc & 0x8000_0000 != 0 {
                (crc << 1) ^ CRC32_POLY
            } else {
                crc << 1
            };
        }
    }
    crc
}

/// CRC32 over the serialized image of `state`.
pub fn calculate_crc32(state: &ModuleState) -> u32 {
    crc32(&serialize(state))
}
