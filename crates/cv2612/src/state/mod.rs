//! Logical state of the module.
//!
//! The state is a tree: 4 patches, each with an LFO rate and 6 channels;
//! each channel holds its channel-level parameters and 4 operators. Next to
//! the patches live the global settings, the binding table and the step
//! sequencer grid. Field names match the wire labels, so the serde form of
//! [`ModuleState`] is also the exported JSON document.
//!
//! Editor-only state (cursor, calibration step) is kept on the struct but is
//! neither serialized nor part of the firmware layout.
//!
//! # Examples
//!
//! ```
//! use cv2612::address::{ChannelId, OperatorId, ParamAddress, PatchId};
//! use cv2612::param::ParamId;
//! use cv2612::state::ModuleState;
//!
//! let mut state = ModuleState::default();
//! let al = ParamAddress::new(ParamId::Algorithm, PatchId::ZERO, ChannelId::ZERO, OperatorId::ZERO);
//! assert_eq!(state.get(al), Some(7));
//!
//! state.set(al, 3).unwrap();
//! assert_eq!(state.patches[0].channels[0].al, 3);
//! assert!(state.set(al, 8).is_err());
//! ```
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::address::{ChannelId, OperatorId, ParamAddress, PatchId};
use crate::binding::Bindings;
use crate::error::Cv2612Error;
use crate::param::{MidiReceiveChannel, ParamId, PlayMode};

pub mod layout;

pub use layout::{LAYOUT_LEN, calculate_crc32, crc32, serialize};

/// Name given to a fresh state.
pub const DEFAULT_NAME: &str = "Unnamed";
/// Number of sequencer voices (one per channel).
pub const SEQ_VOICES: usize = 6;
/// Number of sequencer steps per voice.
pub const SEQ_STEPS: usize = 16;

/// Generates `get`/`get_mut` accessors mapping parameter ids onto fields.
macro_rules! param_fields {
    ($ty:ty { $($field:ident => $id:ident),+ $(,)? }) => {
        impl $ty {
            /// Value of `id`, `None` when `id` does not live at this level.
            pub fn get(&self, id: ParamId) -> Option<u8> {
                match id {
                    $(ParamId::$id => Some(self.$field),)+
                    _ => None,
                }
            }

            fn get_mut(&mut self, id: ParamId) -> Option<&mut u8> {
                match id {
                    $(ParamId::$id => Some(&mut self.$field),)+
                    _ => None,
                }
            }
        }
    };
}

/// One FM operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Operator {
    pub ar: u8,
    pub d1: u8,
    pub sl: u8,
    pub d2: u8,
    pub rr: u8,
    pub tl: u8,
    pub mul: u8,
    pub det: u8,
    pub rs: u8,
    pub am: u8,
}

impl Default for Operator {
    fn default() -> Self {
        Self {
            ar: 31,
            d1: 0,
            sl: 0,
            d2: 0,
            rr: 15,
            tl: 0,
            mul: 3,
            det: 3,
            rs: 0,
            am: 0,
        }
    }
}

param_fields!(Operator {
    ar => AttackRate,
    d1 => Decay1,
    sl => SustainLevel,
    d2 => Decay2,
    rr => ReleaseRate,
    tl => TotalLevel,
    mul => Multiplier,
    det => Detune,
    rs => RateScaling,
    am => AmplitudeMod,
});

/// One voice of a patch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Channel {
    pub al: u8,
    pub fb: u8,
    pub ams: u8,
    pub fms: u8,
    pub st: u8,
    pub operators: [Operator; 4],
}

impl Default for Channel {
    fn default() -> Self {
        Self {
            al: 7,
            fb: 0,
            ams: 0,
            fms: 0,
            st: 3,
            operators: [Operator::default(); 4],
        }
    }
}

param_fields!(Channel {
    al => Algorithm,
    fb => Feedback,
    ams => Ams,
    fms => Fms,
    st => Stereo,
});

impl Channel {
    pub fn operator(&self, op: OperatorId) -> &Operator {
        &self.operators[op.index() as usize]
    }

    pub fn operator_mut(&mut self, op: OperatorId) -> &mut Operator {
        &mut self.operators[op.index() as usize]
    }

    /// Every `(id, op, value)` of the channel, channel parameters first.
    pub fn values(&self) -> impl Iterator<Item = (ParamId, OperatorId, u8)> + '_ {
        let channel = ParamId::CHANNEL
            .into_iter()
            .map(move |id| (id, OperatorId::ZERO, self.get(id).unwrap_or_default()));
        let operators = OperatorId::all().flat_map(move |op| {
            ParamId::OPERATOR
                .into_iter()
                .map(move |id| (id, op, self.operator(op).get(id).unwrap_or_default()))
        });
        channel.chain(operators)
    }

    /// Check every value against its bit width.
    pub fn validate(&self) -> Result<(), Cv2612Error> {
        for (id, _, value) in self.values() {
            id.check(value)?;
        }
        Ok(())
    }
}

/// One of the four top-level configurations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Patch {
    pub lfo: u8,
    pub channels: [Channel; 6],
}

impl Patch {
    pub fn channel(&self, cid: ChannelId) -> &Channel {
        &self.channels[cid.index() as usize]
    }

    pub fn channel_mut(&mut self, cid: ChannelId) -> &mut Channel {
        &mut self.channels[cid.index() as usize]
    }
}

/// Global settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    pub quantize: u8,
    pub legato: u8,
    pub velocity: u8,
    pub pm: u8,
    pub lb: u8,
    pub tr: u8,
    pub tu: u8,
    pub rc: u8,
    pub portamento: u8,
    pub stp: u8,
    pub polyphony: u8,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            quantize: 0,
            legato: 0,
            velocity: 0,
            pm: PlayMode::Mono.value(),
            lb: 64,
            tr: 32,
            tu: 64,
            rc: 0,
            portamento: 0,
            stp: 7,
            polyphony: 0,
        }
    }
}

param_fields!(Settings {
    quantize => Quantize,
    legato => Legato,
    velocity => Velocity,
    pm => PlayMode,
    lb => LedBrightness,
    tr => Transpose,
    tu => Tuning,
    rc => MidiReceiveChannel,
    portamento => Portamento,
    stp => SeqSteps,
    polyphony => Polyphony,
});

impl Settings {
    /// Decoded play mode; values past POLY fall back to MONO.
    pub fn play_mode(&self) -> PlayMode {
        PlayMode::from_value(self.pm).unwrap_or_default()
    }

    /// Decoded receive channel; unknown values fall back to channel 1.
    pub fn receive_channel(&self) -> MidiReceiveChannel {
        MidiReceiveChannel::from_value(self.rc).unwrap_or_default()
    }
}

/// 6×16 step sequencer grid, one row per voice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Sequence([[bool; SEQ_STEPS]; SEQ_VOICES]);

impl Sequence {
    pub fn get(&self, voice: usize, step: usize) -> Option<bool> {
        self.0.get(voice)?.get(step).copied()
    }

    /// Flip a step, returning its new value.
    pub fn toggle(&mut self, voice: usize, step: usize) -> Result<bool, Cv2612Error> {
        let row = self.0.get_mut(voice).ok_or(Cv2612Error::IndexOutOfRange {
            what: "voice",
            index: voice,
            count: SEQ_VOICES,
        })?;
        let cell = row.get_mut(step).ok_or(Cv2612Error::IndexOutOfRange {
            what: "step",
            index: step,
            count: SEQ_STEPS,
        })?;
        *cell = !*cell;
        Ok(*cell)
    }

    pub fn clear(&mut self) {
        self.0 = Default::default();
    }

    /// Steps of `voice` as a bitmask, bit `j` set when step `j` is on.
    pub fn mask(&self, voice: usize) -> u16 {
        self.0.get(voice).map_or(0, |row| {
            row.iter()
                .enumerate()
                .filter(|(_, on)| **on)
                .fold(0u16, |mask, (j, _)| mask | (1 << j))
        })
    }
}

/// Editor cursor: the patch and channel operations act on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Cursor {
    pub patch: PatchId,
    pub channel: ChannelId,
}

/// The full logical state of the module.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleState {
    pub name: String,
    pub patches: [Patch; 4],
    pub settings: Settings,
    pub bindings: Bindings,
    pub sequence: Sequence,
    #[serde(skip)]
    pub cursor: Cursor,
    #[serde(skip)]
    pub calibration_step: u8,
}

impl Default for ModuleState {
    fn default() -> Self {
        Self {
            name: DEFAULT_NAME.to_string(),
            patches: Default::default(),
            settings: Settings::default(),
            bindings: Bindings::default(),
            sequence: Sequence::default(),
            cursor: Cursor::default(),
            calibration_step: 0,
        }
    }
}

impl ModuleState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn play_mode(&self) -> PlayMode {
        self.settings.play_mode()
    }

    pub fn patch(&self, pid: PatchId) -> &Patch {
        &self.patches[pid.index() as usize]
    }

    pub fn patch_mut(&mut self, pid: PatchId) -> &mut Patch {
        &mut self.patches[pid.index() as usize]
    }

    /// Channel under the cursor.
    pub fn current_channel(&self) -> &Channel {
        self.patch(self.cursor.patch).channel(self.cursor.channel)
    }

    pub fn current_channel_mut(&mut self) -> &mut Channel {
        let Cursor { patch, channel } = self.cursor;
        self.patch_mut(patch).channel_mut(channel)
    }

    fn slot_mut(&mut self, addr: ParamAddress) -> Option<&mut u8> {
        match addr {
            ParamAddress::Setting(id) => self.settings.get_mut(id),
            ParamAddress::Patch(ParamId::Lfo, pid) => Some(&mut self.patch_mut(pid).lfo),
            ParamAddress::Patch(..) => None,
            ParamAddress::Channel(id, pid, cid) => self.patch_mut(pid).channel_mut(cid).get_mut(id),
            ParamAddress::Operator(id, pid, cid, op) => self
                .patch_mut(pid)
                .channel_mut(cid)
                .operator_mut(op)
                .get_mut(id),
        }
    }

    /// Value at `addr`, `None` for a non-canonical address.
    pub fn get(&self, addr: ParamAddress) -> Option<u8> {
        match addr {
            ParamAddress::Setting(id) => self.settings.get(id),
            ParamAddress::Patch(ParamId::Lfo, pid) => Some(self.patch(pid).lfo),
            ParamAddress::Patch(..) => None,
            ParamAddress::Channel(id, pid, cid) => self.patch(pid).channel(cid).get(id),
            ParamAddress::Operator(id, pid, cid, op) => {
                self.patch(pid).channel(cid).operator(op).get(id)
            }
        }
    }

    /// Store `value` at `addr` after checking it against the bit width.
    pub fn set(&mut self, addr: ParamAddress, value: u8) -> Result<(), Cv2612Error> {
        let value = addr.id().check(value)?;
        let slot = self
            .slot_mut(addr)
            .ok_or_else(|| Cv2612Error::InvalidKey(addr.to_string()))?;
        *slot = value;
        Ok(())
    }

    /// Check every parameter value and binding index.
    pub fn validate(&self) -> Result<(), Cv2612Error> {
        for addr in ParamAddress::all() {
            if let Some(value) = self.get(addr) {
                addr.id().check(value)?;
            }
        }
        if let Some(index) = self.bindings.first_invalid() {
            return Err(Cv2612Error::IndexOutOfRange {
                what: "binding",
                index: index as usize,
                count: crate::address::BINDING_INDEX_COUNT as usize,
            });
        }
        Ok(())
    }

    /// Legacy flat map: one entry per parameter instance, keyed by
    /// [`ParamAddress`] strings.
    pub fn to_flat(&self) -> BTreeMap<String, u8> {
        ParamAddress::all()
            .filter_map(|addr| self.get(addr).map(|v| (addr.to_string(), v)))
            .collect()
    }

    /// Build a state from a legacy flat map. Missing keys keep their
    /// defaults; any malformed key or out-of-range value rejects the map.
    pub fn from_flat(map: &BTreeMap<String, u8>) -> Result<ModuleState, Cv2612Error> {
        let mut state = ModuleState::default();
        for (key, value) in map {
            let addr: ParamAddress = key.parse()?;
            state.set(addr, *value)?;
        }
        Ok(state)
    }
}
