use std::collections::HashMap;

use cv2612::address::{
    ChannelId, MidiAddress, OperatorId, ParamAddress, PatchId, binding_index, binding_param,
    midi_address,
};
use cv2612::param::{ParamId, PlayMode};

const MODES: [PlayMode; 7] = [
    PlayMode::Mono,
    PlayMode::Duo,
    PlayMode::Trio,
    PlayMode::Chord,
    PlayMode::Seq,
    PlayMode::Rand,
    PlayMode::Poly,
];

#[test]
fn test_algorithm_at_origin() {
    let addr = midi_address(
        ParamId::Algorithm,
        PatchId::ZERO,
        ChannelId::ZERO,
        OperatorId::ZERO,
        PlayMode::Mono,
    );
    assert_eq!(addr, MidiAddress { channel: 0, cc: 10 });
}

#[test]
fn test_address_is_deterministic() {
    for mode in MODES {
        for addr in ParamAddress::all() {
            assert_eq!(addr.midi_address(mode), addr.midi_address(mode));
        }
    }
}

#[test]
fn test_addresses_are_disjoint_in_normal_regime() {
    for mode in MODES.into_iter().filter(|m| *m != PlayMode::Poly) {
        let mut seen: HashMap<MidiAddress, ParamAddress> = HashMap::new();
        for addr in ParamAddress::all() {
            let midi = addr.midi_address(mode);
            assert!(midi.channel <= 15 && midi.cc <= 127);
            if let Some(prev) = seen.insert(midi, addr) {
                panic!("{prev} and {addr} share {midi} in {mode:?}");
            }
        }
    }
}

#[test]
fn test_addresses_are_disjoint_in_poly_regime() {
    // In POLY every patch/channel shares the operator addresses, so only one
    // representative per operator parameter takes part.
    let mut seen: HashMap<MidiAddress, ParamAddress> = HashMap::new();
    let representatives = ParamAddress::all().filter(|a| match a {
        ParamAddress::Operator(_, pid, cid, _) => *pid == PatchId::ZERO && *cid == ChannelId::ZERO,
        _ => true,
    });
    for addr in representatives {
        let midi = addr.midi_address(PlayMode::Poly);
        if let Some(prev) = seen.insert(midi, addr) {
            panic!("{prev} and {addr} share {midi} in POLY");
        }
    }
}

#[test]
fn test_poly_collapses_patches() {
    let a = ParamAddress::new(
        ParamId::TotalLevel,
        PatchId::new(3).unwrap(),
        ChannelId::new(4).unwrap(),
        OperatorId::new(2).unwrap(),
    );
    assert_eq!(
        a.midi_address(PlayMode::Poly),
        MidiAddress {
            channel: 0,
            cc: 40 + 2 * 10 + 5
        }
    );
    assert_eq!(
        a.midi_address(PlayMode::Mono),
        MidiAddress {
            channel: 14,
            cc: 40 + 4 * 10 + 5
        }
    );
}

#[test]
fn test_flat_key_round_trip() {
    for addr in ParamAddress::all() {
        let key = addr.to_string();
        let back: ParamAddress = key.parse().unwrap();
        assert_eq!(back, addr, "{key}");
    }
    assert_eq!(
        ParamAddress::new(
            ParamId::PlayMode,
            PatchId::new(2).unwrap(),
            ChannelId::new(1).unwrap(),
            OperatorId::new(3).unwrap()
        )
        .to_string(),
        "pm-0-0-0"
    );
    assert_eq!(
        ParamAddress::new(
            ParamId::Feedback,
            PatchId::new(2).unwrap(),
            ChannelId::new(1).unwrap(),
            OperatorId::new(3).unwrap()
        )
        .to_string(),
        "fb-2-1-0"
    );
}

#[test]
fn test_binding_indices_unique_and_stable() {
    let mut seen = HashMap::new();
    for id in ParamId::ALL {
        for op in OperatorId::all() {
            match binding_index(id, op) {
                Some(index) => {
                    assert!(index < 64);
                    assert_eq!(binding_index(id, op), Some(index));
                    assert_eq!(binding_param(index).map(|(i, _)| i), Some(id));
                    if let Some(prev) = seen.insert(index, (id, op)) {
                        // channel-level params ignore the operator index
                        assert_eq!(prev.0, id);
                    }
                }
                None => assert!(!id.is_bindable()),
            }
        }
    }
    assert_eq!(binding_index(ParamId::AttackRate, OperatorId::ZERO), Some(20));
}
