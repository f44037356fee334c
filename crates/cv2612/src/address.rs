//! Address codec.
//!
//! Maps a fully-qualified parameter instance `(id, patch, channel, operator)`
//! plus the play mode onto the `(MIDI channel, CC number)` pair the firmware
//! listens on, and maps bindable parameters onto their stable binding index.
//! This mapping is mimicked by the module firmware.
//!
//! Layout (protocol version 2):
//!
//! | kind     | MIDI channel           | CC                                    |
//! |----------|------------------------|---------------------------------------|
//! | setting  | 15                     | `0 + setting index` (0..=10)          |
//! | LFO      | `pid * 4`              | 9                                     |
//! | channel  | `pid * 4`              | `10 + cid * 5 + index` (10..=39)      |
//! | operator | `pid * 4 + op`         | `40 + cid * 10 + index` (40..=99)     |
//! | operator (POLY) | 0               | `40 + op * 10 + index` (40..=79)      |
//!
//! # Examples
//!
//! ```
//! use cv2612::address::{midi_address, ChannelId, MidiAddress, OperatorId, ParamAddress, PatchId};
//! use cv2612::param::{ParamId, PlayMode};
//!
//! let addr = midi_address(
//!     ParamId::Algorithm,
//!     PatchId::ZERO,
//!     ChannelId::ZERO,
//!     OperatorId::ZERO,
//!     PlayMode::Mono,
//! );
//! assert_eq!(addr, MidiAddress { channel: 0, cc: 10 });
//!
//! let key: ParamAddress = "ar-1-2-3".parse().unwrap();
//! assert_eq!(key.to_string(), "ar-1-2-3");
//! ```
use std::fmt;
use std::str::FromStr;

use crate::error::Cv2612Error;
use crate::param::{ParamId, ParamKind, PlayMode};

/// MIDI channel reserved for settings and discrete commands.
pub const COMMAND_CHANNEL: u8 = 15;
/// First CC number of the settings block on the command channel.
pub const SETTING_CC_OFFSET: u8 = 0;
/// CC number of the patch LFO.
pub const LFO_CC: u8 = 9;
pub const CHANNEL_CC_OFFSET: u8 = 10;
pub const CHANNEL_PARAM_COUNT: u8 = 5;
pub const OPERATOR_CC_OFFSET: u8 = 40;
pub const OPERATOR_PARAM_COUNT: u8 = 10;

pub const LFO_BINDING_INDEX: u8 = 2;
pub const CHANNEL_BINDING_OFFSET: u8 = 10;
pub const OPERATOR_BINDING_OFFSET: u8 = 20;
/// Binding indices live in `0..BINDING_INDEX_COUNT`; bind commands add this to the index.
pub const BINDING_INDEX_COUNT: u8 = 64;

macro_rules! index_type {
    ($(#[$doc:meta])* $name:ident, $count:expr, $what:expr) => {
        $(#[$doc])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
        pub struct $name(u8);

        impl $name {
            pub const COUNT: usize = $count;
            pub const ZERO: $name = $name(0);

            /// Checked constructor, `None` when `index >= COUNT`.
            pub const fn new(index: u8) -> Option<$name> {
                if (index as usize) < $count {
                    Some($name(index))
                } else {
                    None
                }
            }

            pub const fn index(self) -> u8 {
                self.0
            }

            pub fn all() -> impl Iterator<Item = $name> {
                (0..$count as u8).map($name)
            }
        }

        impl TryFrom<u8> for $name {
            type Error = Cv2612Error;

            fn try_from(index: u8) -> Result<Self, Self::Error> {
                $name::new(index).ok_or(Cv2612Error::IndexOutOfRange {
                    what: $what,
                    index: index as usize,
                    count: $count,
                })
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

index_type!(
    /// One of the 4 patches.
    PatchId,
    4,
    "patch"
);
index_type!(
    /// One of the 6 channels (voices) of a patch.
    ChannelId,
    6,
    "channel"
);
index_type!(
    /// One of the 4 FM operators of a channel.
    OperatorId,
    4,
    "operator"
);

/// Operator addressing regime, selected by the play mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AddressRegime {
    /// Operators addressed per patch/channel.
    Normal,
    /// Poly voice allocation: operator identity is the only address axis.
    Poly,
}

impl From<PlayMode> for AddressRegime {
    fn from(mode: PlayMode) -> Self {
        match mode {
            PlayMode::Poly => AddressRegime::Poly,
            _ => AddressRegime::Normal,
        }
    }
}

/// A `(MIDI channel, CC number)` pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MidiAddress {
    pub channel: u8,
    pub cc: u8,
}

impl fmt::Display for MidiAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ch{}:cc{}", self.channel, self.cc)
    }
}

/// `address(id, pid, cid, op, playMode) -> (midiChannel, cc)`.
///
/// Indices not meaningful for the parameter kind are ignored.
pub fn midi_address(
    id: ParamId,
    pid: PatchId,
    cid: ChannelId,
    op: OperatorId,
    mode: PlayMode,
) -> MidiAddress {
    let index = id.index();
    match id.kind() {
        ParamKind::Setting => MidiAddress {
            channel: COMMAND_CHANNEL,
            cc: SETTING_CC_OFFSET + index,
        },
        ParamKind::Patch => MidiAddress {
            channel: pid.index() * 4,
            cc: LFO_CC,
        },
        ParamKind::Channel => MidiAddress {
            channel: pid.index() * 4,
            cc: CHANNEL_CC_OFFSET + cid.index() * CHANNEL_PARAM_COUNT + index, // 10-39 range
        },
        ParamKind::Operator => match AddressRegime::from(mode) {
            AddressRegime::Normal => MidiAddress {
                channel: pid.index() * 4 + op.index(),
                cc: OPERATOR_CC_OFFSET + cid.index() * OPERATOR_PARAM_COUNT + index, // 40-99 range
            },
            AddressRegime::Poly => MidiAddress {
                channel: 0,
                cc: OPERATOR_CC_OFFSET + op.index() * OPERATOR_PARAM_COUNT + index, // 40-79 range
            },
        },
    }
}

/// Stable binding index of a bindable parameter, `None` when unbindable.
///
/// Binding and unbinding use the same command; the CC value is the index
/// to unbind and `64 + index` to bind. For example the LFO has index 2, so
/// value 2 unbinds it and value 66 binds it.
pub fn binding_index(id: ParamId, op: OperatorId) -> Option<u8> {
    if !id.is_bindable() {
        return None;
    }
    match id.kind() {
        ParamKind::Setting => None,
        ParamKind::Patch => Some(LFO_BINDING_INDEX),
        ParamKind::Channel => Some(CHANNEL_BINDING_OFFSET + id.index()),
        ParamKind::Operator => {
            Some(OPERATOR_BINDING_OFFSET + OPERATOR_PARAM_COUNT * op.index() + id.index())
        }
    }
}

/// Inverse of [`binding_index`].
pub fn binding_param(index: u8) -> Option<(ParamId, OperatorId)> {
    if index == LFO_BINDING_INDEX {
        return Some((ParamId::Lfo, OperatorId::ZERO));
    }
    if (CHANNEL_BINDING_OFFSET..OPERATOR_BINDING_OFFSET).contains(&index) {
        let id = *ParamId::CHANNEL.get((index - CHANNEL_BINDING_OFFSET) as usize)?;
        return Some((id, OperatorId::ZERO));
    }
    if index >= OPERATOR_BINDING_OFFSET {
        let rel = index - OPERATOR_BINDING_OFFSET;
        let op = OperatorId::new(rel / OPERATOR_PARAM_COUNT)?;
        let id = ParamId::OPERATOR[(rel % OPERATOR_PARAM_COUNT) as usize];
        return id.is_bindable().then_some((id, op));
    }
    None
}

/// Every binding index a modulator can hold, in ascending order.
pub fn bindable_indices() -> Vec<u8> {
    let mut out = vec![LFO_BINDING_INDEX];
    out.extend(
        ParamId::CHANNEL
            .iter()
            .filter_map(|id| binding_index(*id, OperatorId::ZERO)),
    );
    for op in OperatorId::all() {
        out.extend(
            ParamId::OPERATOR
                .iter()
                .filter_map(|id| binding_index(*id, op)),
        );
    }
    out
}

/// A fully-qualified parameter instance.
///
/// The string form is the legacy flat key `"<id>-<pid>-<cid>-<op>"`, where
/// indices not meaningful for the parameter kind are zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ParamAddress {
    Setting(ParamId),
    Patch(ParamId, PatchId),
    Channel(ParamId, PatchId, ChannelId),
    Operator(ParamId, PatchId, ChannelId, OperatorId),
}

impl ParamAddress {
    /// Build the canonical address of `id`, dropping meaningless indices.
    pub fn new(id: ParamId, pid: PatchId, cid: ChannelId, op: OperatorId) -> ParamAddress {
        match id.kind() {
            ParamKind::Setting => ParamAddress::Setting(id),
            ParamKind::Patch => ParamAddress::Patch(id, pid),
            ParamKind::Channel => ParamAddress::Channel(id, pid, cid),
            ParamKind::Operator => ParamAddress::Operator(id, pid, cid, op),
        }
    }

    pub fn id(&self) -> ParamId {
        match *self {
            ParamAddress::Setting(id)
            | ParamAddress::Patch(id, _)
            | ParamAddress::Channel(id, _, _)
            | ParamAddress::Operator(id, _, _, _) => id,
        }
    }

    pub fn patch(&self) -> PatchId {
        match *self {
            ParamAddress::Setting(_) => PatchId::ZERO,
            ParamAddress::Patch(_, pid)
            | ParamAddress::Channel(_, pid, _)
            | ParamAddress::Operator(_, pid, _, _) => pid,
        }
    }

    pub fn channel(&self) -> ChannelId {
        match *self {
            ParamAddress::Channel(_, _, cid) | ParamAddress::Operator(_, _, cid, _) => cid,
            _ => ChannelId::ZERO,
        }
    }

    pub fn operator(&self) -> OperatorId {
        match *self {
            ParamAddress::Operator(_, _, _, op) => op,
            _ => OperatorId::ZERO,
        }
    }

    /// True when the variant matches the parameter's kind.
    pub fn is_canonical(&self) -> bool {
        *self == ParamAddress::new(self.id(), self.patch(), self.channel(), self.operator())
    }

    pub fn midi_address(&self, mode: PlayMode) -> MidiAddress {
        midi_address(self.id(), self.patch(), self.channel(), self.operator(), mode)
    }

    pub fn binding_index(&self) -> Option<u8> {
        binding_index(self.id(), self.operator())
    }

    /// Every fully-qualified parameter instance, in canonical order:
    /// settings, then per patch the LFO followed by each channel's
    /// parameters and its operators' parameters.
    pub fn all() -> impl Iterator<Item = ParamAddress> {
        let settings = ParamId::SETTINGS.into_iter().map(ParamAddress::Setting);
        let patches = PatchId::all().flat_map(|pid| {
            std::iter::once(ParamAddress::Patch(ParamId::Lfo, pid)).chain(
                ChannelId::all().flat_map(move |cid| {
                    ParamId::CHANNEL
                        .into_iter()
                        .map(move |id| ParamAddress::Channel(id, pid, cid))
                        .chain(OperatorId::all().flat_map(move |op| {
                            ParamId::OPERATOR
                                .into_iter()
                                .map(move |id| ParamAddress::Operator(id, pid, cid, op))
                        }))
                }),
            )
        });
        settings.chain(patches)
    }
}

impl fmt::Display for ParamAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}-{}-{}-{}",
            self.id().label(),
            self.patch(),
            self.channel(),
            self.operator()
        )
    }
}

impl FromStr for ParamAddress {
    type Err = Cv2612Error;

    fn from_str(key: &str) -> Result<Self, Self::Err> {
        let invalid = || Cv2612Error::InvalidKey(key.to_string());
        let mut parts = key.split('-');
        let (Some(label), Some(pid), Some(cid), Some(op), None) = (
            parts.next(),
            parts.next(),
            parts.next(),
            parts.next(),
            parts.next(),
        ) else {
            return Err(invalid());
        };

        let id = ParamId::from_label(label).ok_or_else(invalid)?;
        let index = |s: &str| s.parse::<u8>().map_err(|_| invalid());
        let pid = PatchId::try_from(index(pid)?)?;
        let cid = ChannelId::try_from(index(cid)?)?;
        let op = OperatorId::try_from(index(op)?)?;

        let address = ParamAddress::new(id, pid, cid, op);
        // Non-canonical keys (e.g. a setting with a patch index) would alias
        // another key after re-encoding.
        if address.patch() != pid || address.channel() != cid || address.operator() != op {
            return Err(invalid());
        }
        Ok(address)
    }
}
