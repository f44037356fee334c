//! Parameter registry.
//!
//! Static metadata for every parameter the module understands: its kind,
//! wire label, human title, bit width, option labels and whether it can be
//! routed to a modulator. Everything here is pure and `'static`.
//!
//! The per-kind wire index returned by [`ParamId::index`] is part of the
//! firmware contract (protocol version [`PROTOCOL_VERSION`]). Indices must
//! never be renumbered once shipped.
//!
//! # Examples
//!
//! ```
//! use cv2612::param::{ParamId, ParamKind};
//!
//! let meta = ParamId::Algorithm.meta();
//! assert_eq!(meta.bits, 3);
//! assert_eq!(meta.max, 7);
//! assert!(meta.bindable);
//! assert_eq!(ParamId::Algorithm.kind(), ParamKind::Channel);
//! assert_eq!("al".parse::<ParamId>().unwrap(), ParamId::Algorithm);
//! ```
use std::fmt;
use std::str::FromStr;

use crate::error::Cv2612Error;

/// Version of the address/layout tables implemented by this crate.
pub const PROTOCOL_VERSION: u8 = 2;

/// Scope of a parameter, which decides which indices address it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParamKind {
    /// Global setting, addressed in the patch-0/channel-0 context only.
    Setting,
    /// One per patch (the LFO).
    Patch,
    /// One per channel.
    Channel,
    /// One per operator within a channel.
    Operator,
}

/// Every parameter of the module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ParamId {
    // settings
    Quantize,
    Legato,
    Velocity,
    PlayMode,
    LedBrightness,
    Transpose,
    Tuning,
    MidiReceiveChannel,
    Portamento,
    SeqSteps,
    Polyphony,
    // patch
    Lfo,
    // channel
    Algorithm,
    Feedback,
    Ams,
    Fms,
    Stereo,
    // operator
    AttackRate,
    Decay1,
    SustainLevel,
    Decay2,
    ReleaseRate,
    TotalLevel,
    Multiplier,
    Detune,
    RateScaling,
    AmplitudeMod,
}

/// Static metadata of a parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParamMeta {
    pub title: &'static str,
    pub label: &'static str,
    pub bits: u8,
    pub max: u8,
    pub options: &'static [&'static str],
    pub bindable: bool,
}

impl ParamMeta {
    /// Clamp `value` into `[0, max]`.
    pub fn clamp(&self, value: u8) -> u8 {
        value.min(self.max)
    }

    /// Option label for `value`, for enumerable settings.
    pub fn option_label(&self, value: u8) -> Option<&'static str> {
        self.options.get(value as usize).copied()
    }
}

impl ParamId {
    /// Settings in wire order: position in this table is the CC number.
    pub const SETTINGS: [ParamId; 11] = [
        ParamId::Quantize,
        ParamId::Legato,
        ParamId::Velocity,
        ParamId::PlayMode,
        ParamId::LedBrightness,
        ParamId::Transpose,
        ParamId::Tuning,
        ParamId::MidiReceiveChannel,
        ParamId::Portamento,
        ParamId::SeqSteps,
        ParamId::Polyphony,
    ];

    /// Channel parameters in wire order.
    pub const CHANNEL: [ParamId; 5] = [
        ParamId::Algorithm,
        ParamId::Feedback,
        ParamId::Ams,
        ParamId::Fms,
        ParamId::Stereo,
    ];

    /// Operator parameters in wire order.
    pub const OPERATOR: [ParamId; 10] = [
        ParamId::AttackRate,
        ParamId::Decay1,
        ParamId::SustainLevel,
        ParamId::Decay2,
        ParamId::ReleaseRate,
        ParamId::TotalLevel,
        ParamId::Multiplier,
        ParamId::Detune,
        ParamId::RateScaling,
        ParamId::AmplitudeMod,
    ];

    /// All parameters: settings, LFO, channel, operator.
    pub const ALL: [ParamId; 27] = [
        ParamId::Quantize,
        ParamId::Legato,
        ParamId::Velocity,
        ParamId::PlayMode,
        ParamId::LedBrightness,
        ParamId::Transpose,
        ParamId::Tuning,
        ParamId::MidiReceiveChannel,
        ParamId::Portamento,
        ParamId::SeqSteps,
        ParamId::Polyphony,
        ParamId::Lfo,
        ParamId::Algorithm,
        ParamId::Feedback,
        ParamId::Ams,
        ParamId::Fms,
        ParamId::Stereo,
        ParamId::AttackRate,
        ParamId::Decay1,
        ParamId::SustainLevel,
        ParamId::Decay2,
        ParamId::ReleaseRate,
        ParamId::TotalLevel,
        ParamId::Multiplier,
        ParamId::Detune,
        ParamId::RateScaling,
        ParamId::AmplitudeMod,
    ];

    pub fn kind(self) -> ParamKind {
        use ParamId::*;
        match self {
            Quantize | Legato | Velocity | PlayMode | LedBrightness | Transpose | Tuning
            | MidiReceiveChannel | Portamento | SeqSteps | Polyphony => ParamKind::Setting,
            Lfo => ParamKind::Patch,
            Algorithm | Feedback | Ams | Fms | Stereo => ParamKind::Channel,
            AttackRate | Decay1 | SustainLevel | Decay2 | ReleaseRate | TotalLevel
            | Multiplier | Detune | RateScaling | AmplitudeMod => ParamKind::Operator,
        }
    }

    /// Position of the parameter within its kind's wire table.
    pub fn index(self) -> u8 {
        let table: &[ParamId] = match self.kind() {
            ParamKind::Setting => &Self::SETTINGS,
            ParamKind::Patch => return 0,
            ParamKind::Channel => &Self::CHANNEL,
            ParamKind::Operator => &Self::OPERATOR,
        };
        table.iter().position(|p| *p == self).unwrap_or_default() as u8
    }

    /// Short wire label, also used in legacy flat keys and in JSON documents.
    pub fn label(self) -> &'static str {
        use ParamId::*;
        match self {
            Quantize => "quantize",
            Legato => "legato",
            Velocity => "velocity",
            PlayMode => "pm",
            LedBrightness => "lb",
            Transpose => "tr",
            Tuning => "tu",
            MidiReceiveChannel => "rc",
            Portamento => "portamento",
            SeqSteps => "stp",
            Polyphony => "polyphony",
            Lfo => "lfo",
            Algorithm => "al",
            Feedback => "fb",
            Ams => "ams",
            Fms => "fms",
            Stereo => "st",
            AttackRate => "ar",
            Decay1 => "d1",
            SustainLevel => "sl",
            Decay2 => "d2",
            ReleaseRate => "rr",
            TotalLevel => "tl",
            Multiplier => "mul",
            Detune => "det",
            RateScaling => "rs",
            AmplitudeMod => "am",
        }
    }

    pub fn from_label(label: &str) -> Option<ParamId> {
        Self::ALL.iter().copied().find(|p| p.label() == label)
    }

    pub fn title(self) -> &'static str {
        use ParamId::*;
        match self {
            Quantize => "Quantize",
            Legato => "Legato",
            Velocity => "Velocity",
            PlayMode => "Play Mode",
            LedBrightness => "Led Brightness",
            Transpose => "Transpose",
            Tuning => "Tuning",
            MidiReceiveChannel => "Midi Receive Channel",
            Portamento => "Portamento",
            SeqSteps => "Seq Mode steps",
            Polyphony => "Polyphony",
            Lfo => "Low Frequency Oscillator",
            Algorithm => "Algorithm",
            Feedback => "Feedback (op1)",
            Ams => "Amplitude Modulation Sensitivity",
            Fms => "Frequency Modulation Sensitivity",
            Stereo => "Stereo Mode",
            AttackRate => "Attack Rate (angle)",
            Decay1 => "Decay1 Rate (angle)",
            SustainLevel => "Sustain Level (attenuation)",
            Decay2 => "Decay2 Rate (angle)",
            ReleaseRate => "Release Rate (angle)",
            TotalLevel => "Total Level (attenuation)",
            Multiplier => "Multiplier",
            Detune => "Detune",
            RateScaling => "Rate Scaling",
            AmplitudeMod => "Amplitude Modulation",
        }
    }

    /// Bit width, authoritative for the legal value range.
    pub fn bits(self) -> u8 {
        use ParamId::*;
        match self {
            PlayMode | LedBrightness | Transpose | Tuning | MidiReceiveChannel | SeqSteps
            | Portamento | Polyphony | TotalLevel => 7,
            Quantize | Legato | Velocity | AmplitudeMod => 1,
            Stereo | Ams | RateScaling => 2,
            Lfo | Fms | Algorithm | Feedback | Detune => 3,
            SustainLevel | ReleaseRate | Multiplier => 4,
            AttackRate | Decay1 | Decay2 => 5,
        }
    }

    /// Largest legal value, `2^bits - 1`.
    pub fn max(self) -> u8 {
        ((1u16 << self.bits()) - 1) as u8
    }

    /// Option labels for enumerable settings, empty otherwise.
    pub fn options(self) -> &'static [&'static str] {
        match self {
            ParamId::PlayMode => &PlayMode::LABELS,
            ParamId::MidiReceiveChannel => &MidiReceiveChannel::LABELS,
            _ => &[],
        }
    }

    /// Whether the parameter can be routed to a modulator.
    pub fn is_bindable(self) -> bool {
        match self.kind() {
            ParamKind::Setting => false,
            ParamKind::Patch | ParamKind::Channel => true,
            ParamKind::Operator => {
                !matches!(self, ParamId::RateScaling | ParamId::AmplitudeMod)
            }
        }
    }

    pub fn meta(self) -> ParamMeta {
        ParamMeta {
            title: self.title(),
            label: self.label(),
            bits: self.bits(),
            max: self.max(),
            options: self.options(),
            bindable: self.is_bindable(),
        }
    }

    /// Check `value` against the bit width.
    pub fn check(self, value: u8) -> Result<u8, Cv2612Error> {
        if value > self.max() {
            return Err(Cv2612Error::ValueOutOfRange {
                id: self,
                value,
                max: self.max(),
            });
        }
        Ok(value)
    }
}

/// Registry lookup: `meta(id) -> {title, bits, options, bindable}`.
pub fn meta(id: ParamId) -> ParamMeta {
    id.meta()
}

impl fmt::Display for ParamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for ParamId {
    type Err = Cv2612Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ParamId::from_label(s).ok_or_else(|| Cv2612Error::UnknownParam(s.to_string()))
    }
}

/// Global play mode (value of the `pm` setting).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PlayMode {
    #[default]
    Mono = 0,
    Duo = 1,
    Trio = 2,
    Chord = 3,
    Seq = 4,
    Rand = 5,
    Poly = 6,
}

impl PlayMode {
    pub const LABELS: [&'static str; 7] = ["MONO", "DUO", "TRIO", "CHORD", "SEQ", "RAND", "POLY"];

    pub fn from_value(value: u8) -> Option<PlayMode> {
        match value {
            0 => Some(PlayMode::Mono),
            1 => Some(PlayMode::Duo),
            2 => Some(PlayMode::Trio),
            3 => Some(PlayMode::Chord),
            4 => Some(PlayMode::Seq),
            5 => Some(PlayMode::Rand),
            6 => Some(PlayMode::Poly),
            _ => None,
        }
    }

    pub fn value(self) -> u8 {
        self as u8
    }

    pub fn label(self) -> &'static str {
        Self::LABELS[self as usize]
    }
}

/// MIDI receive channel setting (value of the `rc` setting).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MidiReceiveChannel {
    /// A single channel, 0-based.
    Channel(u8),
    /// Listen on every channel, play MONO across all voices.
    Omni,
    /// Notes on channel N drive voice N, CCs affect every voice.
    Forward,
    /// Notes and CCs on channel N drive voice N.
    Multitrack,
}

impl Default for MidiReceiveChannel {
    fn default() -> Self {
        MidiReceiveChannel::Channel(0)
    }
}

impl MidiReceiveChannel {
    pub const LABELS: [&'static str; 19] = [
        "CH1", "CH2", "CH3", "CH4", "CH5", "CH6", "CH7", "CH8", "CH9", "CH10", "CH11", "CH12",
        "CH13", "CH14", "CH15", "CH16", "OMNI", "FORWARD", "MULTITRACK",
    ];

    pub fn from_value(value: u8) -> Option<MidiReceiveChannel> {
        match value {
            0..=15 => Some(MidiReceiveChannel::Channel(value)),
            16 => Some(MidiReceiveChannel::Omni),
            17 => Some(MidiReceiveChannel::Forward),
            18 => Some(MidiReceiveChannel::Multitrack),
            _ => None,
        }
    }

    pub fn value(self) -> u8 {
        match self {
            MidiReceiveChannel::Channel(ch) => ch & 0x0F,
            MidiReceiveChannel::Omni => 16,
            MidiReceiveChannel::Forward => 17,
            MidiReceiveChannel::Multitrack => 18,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_labels_round_trip() {
        for id in ParamId::ALL {
            assert_eq!(ParamId::from_label(id.label()), Some(id));
        }
        assert!("xx".parse::<ParamId>().is_err());
    }

    #[test]
    fn test_indices_unique_per_kind() {
        for table in [&ParamId::SETTINGS[..], &ParamId::CHANNEL[..], &ParamId::OPERATOR[..]] {
            for (i, id) in table.iter().enumerate() {
                assert_eq!(id.index() as usize, i);
            }
        }
        assert_eq!(ParamId::Lfo.index(), 0);
    }

    #[test]
    fn test_max_from_bits() {
        assert_eq!(ParamId::TotalLevel.max(), 127);
        assert_eq!(ParamId::AmplitudeMod.max(), 1);
        assert_eq!(ParamId::AttackRate.max(), 31);
        assert_eq!(ParamId::Stereo.max(), 3);
    }

    #[test]
    fn test_options_only_for_enumerables() {
        for id in ParamId::ALL {
            let has_options = !id.options().is_empty();
            assert_eq!(
                has_options,
                matches!(id, ParamId::PlayMode | ParamId::MidiReceiveChannel)
            );
        }
        assert_eq!(ParamId::PlayMode.meta().option_label(6), Some("POLY"));
        assert_eq!(ParamId::MidiReceiveChannel.meta().option_label(18), Some("MULTITRACK"));
    }

    #[test]
    fn test_bindable_set() {
        assert!(ParamId::Lfo.is_bindable());
        assert!(ParamId::Stereo.is_bindable());
        assert!(ParamId::TotalLevel.is_bindable());
        assert!(!ParamId::RateScaling.is_bindable());
        assert!(!ParamId::AmplitudeMod.is_bindable());
        for id in ParamId::SETTINGS {
            assert!(!id.is_bindable());
        }
    }

    #[test]
    fn test_check_and_clamp() {
        assert!(ParamId::Algorithm.check(7).is_ok());
        assert!(matches!(
            ParamId::Algorithm.check(8),
            Err(Cv2612Error::ValueOutOfRange { value: 8, max: 7, .. })
        ));
        assert_eq!(ParamId::Algorithm.meta().clamp(200), 7);
    }

    #[test]
    fn test_receive_channel_values() {
        assert_eq!(MidiReceiveChannel::from_value(3), Some(MidiReceiveChannel::Channel(3)));
        assert_eq!(MidiReceiveChannel::from_value(17), Some(MidiReceiveChannel::Forward));
        assert_eq!(MidiReceiveChannel::from_value(19), None);
        assert_eq!(MidiReceiveChannel::Multitrack.value(), 18);
        assert_eq!(PlayMode::from_value(6), Some(PlayMode::Poly));
        assert_eq!(PlayMode::Poly.label(), "POLY");
    }
}
