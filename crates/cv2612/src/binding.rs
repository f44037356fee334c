//! Modulation bindings.
//!
//! Three external modulators (X, Y, Z) can each drive any set of bindable
//! parameters. A slot holds binding indices (see
//! [`binding_index`](crate::address::binding_index)); the firmware keeps a
//! mirror of the same sets and is updated with bind/unbind commands.
use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::address::{BINDING_INDEX_COUNT, binding_param};
use crate::command::Command;

/// One of the three external modulator inputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Modulator {
    X,
    Y,
    Z,
}

impl Modulator {
    pub const ALL: [Modulator; 3] = [Modulator::X, Modulator::Y, Modulator::Z];

    /// Command used to bind/unbind parameters on this modulator.
    pub fn command(self) -> Command {
        match self {
            Modulator::X => Command::BindX,
            Modulator::Y => Command::BindY,
            Modulator::Z => Command::BindZ,
        }
    }
}

impl fmt::Display for Modulator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Modulator::X => "X",
            Modulator::Y => "Y",
            Modulator::Z => "Z",
        };
        f.write_str(s)
    }
}

/// Bind command value for `index`.
pub fn bind_value(index: u8) -> u8 {
    BINDING_INDEX_COUNT + index
}

/// Unbind command value for `index`.
pub fn unbind_value(index: u8) -> u8 {
    index
}

/// The binding table: one set of binding indices per modulator, plus the
/// modulator currently armed for editing (not persisted).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bindings {
    x: BTreeSet<u8>,
    y: BTreeSet<u8>,
    z: BTreeSet<u8>,
    #[serde(skip)]
    armed: Option<Modulator>,
}

impl Bindings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn slot(&self, modulator: Modulator) -> &BTreeSet<u8> {
        match modulator {
            Modulator::X => &self.x,
            Modulator::Y => &self.y,
            Modulator::Z => &self.z,
        }
    }

    fn slot_mut(&mut self, modulator: Modulator) -> &mut BTreeSet<u8> {
        match modulator {
            Modulator::X => &mut self.x,
            Modulator::Y => &mut self.y,
            Modulator::Z => &mut self.z,
        }
    }

    pub fn contains(&self, modulator: Modulator, index: u8) -> bool {
        self.slot(modulator).contains(&index)
    }

    /// Modulators that currently drive `index`.
    pub fn modulators_for(&self, index: u8) -> Vec<Modulator> {
        Modulator::ALL
            .into_iter()
            .filter(|m| self.contains(*m, index))
            .collect()
    }

    /// Toggle `index` in the slot of `modulator`.
    ///
    /// Returns `true` when the index is bound afterwards.
    pub fn toggle(&mut self, modulator: Modulator, index: u8) -> bool {
        let slot = self.slot_mut(modulator);
        if slot.remove(&index) {
            false
        } else {
            slot.insert(index);
            true
        }
    }

    pub fn insert(&mut self, modulator: Modulator, index: u8) -> bool {
        self.slot_mut(modulator).insert(index)
    }

    /// Empty every slot. The armed modulator is kept.
    pub fn clear(&mut self) {
        self.x.clear();
        self.y.clear();
        self.z.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.x.is_empty() && self.y.is_empty() && self.z.is_empty()
    }

    /// Every `(modulator, index)` pair, ordered by modulator then index.
    pub fn iter(&self) -> impl Iterator<Item = (Modulator, u8)> + '_ {
        Modulator::ALL
            .into_iter()
            .flat_map(move |m| self.slot(m).iter().map(move |i| (m, *i)))
    }

    pub fn armed(&self) -> Option<Modulator> {
        self.armed
    }

    /// Arm `modulator` for editing; arming the armed one disarms it.
    pub fn arm(&mut self, modulator: Modulator) -> Option<Modulator> {
        self.armed = if self.armed == Some(modulator) {
            None
        } else {
            Some(modulator)
        };
        self.armed
    }

    pub fn disarm(&mut self) {
        self.armed = None;
    }

    /// First index that does not name a bindable parameter.
    pub(crate) fn first_invalid(&self) -> Option<u8> {
        self.iter()
            .map(|(_, i)| i)
            .find(|i| binding_param(*i).is_none())
    }
}
