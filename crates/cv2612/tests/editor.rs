use std::cell::RefCell;
use std::rc::Rc;

use cv2612::address::{ChannelId, OperatorId, PatchId, binding_index};
use cv2612::binding::Modulator;
use cv2612::command::{Command, crc32_chunks};
use cv2612::editor::Editor;
use cv2612::param::{ParamId, PlayMode};
use cv2612::queue::{ManualClock, MemoryOutput, Progress, QueueConfig, TransmitQueue};
use cv2612::state::{Channel, ModuleState, calculate_crc32};

fn editor() -> (Editor, MemoryOutput) {
    let output = MemoryOutput::new();
    let mut queue = TransmitQueue::with_clock(QueueConfig::default(), ManualClock::new());
    queue.connect(output.clone());
    (Editor::new(queue), output)
}

/// Flush the queue and return what reached the wire.
fn drain(editor: &mut Editor, output: &MemoryOutput) -> Vec<[u8; 3]> {
    editor.queue_mut().flush();
    output.take()
}

#[test]
fn test_change_algorithm_sends_raw_value() {
    let (mut editor, output) = editor();
    let data = editor.param_data(ParamId::Algorithm, OperatorId::ZERO);
    assert_eq!(data.value, 7);
    editor
        .change_param(ParamId::Algorithm, OperatorId::ZERO, 3)
        .unwrap();
    assert_eq!(drain(&mut editor, &output), vec![[0xB0, 10, 3]]);
    assert_eq!(editor.state().patches[0].channels[0].al, 3);
}

#[test]
fn test_out_of_range_value_is_never_sent() {
    let (mut editor, output) = editor();
    assert!(
        editor
            .change_param(ParamId::Algorithm, OperatorId::ZERO, 8)
            .is_err()
    );
    assert!(drain(&mut editor, &output).is_empty());
    assert_eq!(editor.state().patches[0].channels[0].al, 7);
}

#[test]
fn test_stereo_applies_to_every_patch() {
    let (mut editor, output) = editor();
    editor.select_patch(PatchId::new(1).unwrap());
    editor.select_channel(ChannelId::new(2).unwrap());
    editor
        .change_param(ParamId::Stereo, OperatorId::ZERO, 1)
        .unwrap();
    let sent = drain(&mut editor, &output);
    let cc = 10 + 2 * 5 + 4;
    assert_eq!(
        sent,
        vec![[0xB0, cc, 1], [0xB4, cc, 1], [0xB8, cc, 1], [0xBC, cc, 1]]
    );
    for patch in &editor.state().patches {
        assert_eq!(patch.channels[2].st, 1);
    }
}

#[test]
fn test_bind_and_unbind_attack_rate() {
    let (mut editor, output) = editor();
    let index = binding_index(ParamId::AttackRate, OperatorId::ZERO).unwrap();

    // nothing armed: no-op
    assert_eq!(
        editor
            .toggle_binding(ParamId::AttackRate, OperatorId::ZERO)
            .unwrap(),
        None
    );

    editor.arm_modulator(Modulator::X);
    assert_eq!(
        editor
            .toggle_binding(ParamId::AttackRate, OperatorId::ZERO)
            .unwrap(),
        Some(true)
    );
    assert_eq!(drain(&mut editor, &output), vec![[0xBF, 101, 64 + index]]);
    assert_eq!(
        editor
            .param_data(ParamId::AttackRate, OperatorId::ZERO)
            .modulators,
        vec![Modulator::X]
    );

    assert_eq!(
        editor
            .toggle_binding(ParamId::AttackRate, OperatorId::ZERO)
            .unwrap(),
        Some(false)
    );
    assert_eq!(drain(&mut editor, &output), vec![[0xBF, 101, index]]);
}

#[test]
fn test_unbindable_toggle_is_noop() {
    let (mut editor, output) = editor();
    editor.arm_modulator(Modulator::Z);
    for id in [ParamId::RateScaling, ParamId::AmplitudeMod, ParamId::Transpose] {
        assert_eq!(editor.toggle_binding(id, OperatorId::ZERO).unwrap(), None);
    }
    assert!(drain(&mut editor, &output).is_empty());
    assert!(editor.state().bindings.is_empty());
}

#[test]
fn test_bind_all() {
    let (mut editor, output) = editor();
    editor.bind_all(Some(Modulator::Y)).unwrap();
    let sent = drain(&mut editor, &output);
    assert_eq!(sent[0], [0xBF, 112, 127]);
    assert_eq!(sent.len(), 1 + 38);
    assert!(sent[1..].iter().all(|m| m[0] == 0xBF && m[1] == 102 && m[2] >= 64));
    assert_eq!(editor.state().bindings.slot(Modulator::Y).len(), 38);

    editor.bind_all(None).unwrap();
    assert_eq!(drain(&mut editor, &output), vec![[0xBF, 112, 127]]);
    assert!(editor.state().bindings.is_empty());
}

#[test]
fn test_sync_midi_sends_everything() {
    let (mut editor, output) = editor();
    editor.arm_modulator(Modulator::Z);
    editor
        .toggle_binding(ParamId::Lfo, OperatorId::ZERO)
        .unwrap();
    drain(&mut editor, &output);

    editor.sync_midi().unwrap();
    let sent = drain(&mut editor, &output);
    assert_eq!(sent.first(), Some(&[0xBF, 112, 127]));
    assert_eq!(sent.last(), Some(&[0xBF, 103, 64 + 2]));
    // clear + every parameter instance + one binding
    assert_eq!(sent.len(), 1 + 11 + 4 * (1 + 6 * 45) + 1);
}

#[test]
fn test_sync_midi_in_poly_keeps_cursor_operators() {
    let (mut editor, output) = editor();
    editor
        .change_param(ParamId::PlayMode, OperatorId::ZERO, PlayMode::Poly.value())
        .unwrap();
    editor.select_channel(ChannelId::new(3).unwrap());
    editor
        .change_param(ParamId::TotalLevel, OperatorId::new(1).unwrap(), 99)
        .unwrap();
    drain(&mut editor, &output);

    editor.sync_midi().unwrap();
    let sent = drain(&mut editor, &output);
    let tl_op1: Vec<_> = sent
        .iter()
        .filter(|m| m[0] == 0xB0 && m[1] == 40 + 10 + 5)
        .collect();
    assert_eq!(tl_op1, vec![&[0xB0, 55, 99]]);
}

#[test]
fn test_sequencer_commands() {
    let (mut editor, output) = editor();
    assert!(editor.toggle_seq_step(2, 5).unwrap());
    assert!(!editor.toggle_seq_step(2, 5).unwrap());
    assert!(editor.toggle_seq_step(6, 0).is_err());
    editor.clear_sequence().unwrap();
    assert_eq!(
        drain(&mut editor, &output),
        vec![[0xBF, 108, 37], [0xBF, 109, 37], [0xBF, 111, 127]]
    );
}

#[test]
fn test_reset_channel_restores_defaults() {
    let (mut editor, output) = editor();
    let mut custom = Channel::default();
    custom.al = 1;
    custom.operators[2].tl = 90;
    editor.apply_channel(custom).unwrap();
    assert_eq!(editor.state().current_channel().operators[2].tl, 90);
    drain(&mut editor, &output);

    editor.reset_channel().unwrap();
    assert_eq!(*editor.state().current_channel(), Channel::default());
    let sent = drain(&mut editor, &output);
    // LFO + 5 channel params + 4 * 10 operator params
    assert_eq!(sent.len(), 1 + 5 + 40);
    assert!(sent.contains(&[0xB2, 40 + 5, 0]));
}

#[test]
fn test_reset_operator_sends_one_operator() {
    let (mut editor, output) = editor();
    let op = OperatorId::new(1).unwrap();
    editor.change_param(ParamId::TotalLevel, op, 50).unwrap();
    drain(&mut editor, &output);

    editor.reset_operator(op).unwrap();
    assert_eq!(editor.state().current_channel().operators[1].tl, 0);
    let sent = drain(&mut editor, &output);
    let ccs: Vec<u8> = sent.iter().map(|m| m[1]).collect();
    assert_eq!(ccs, (40..50).collect::<Vec<u8>>());
    assert!(sent.iter().all(|m| m[0] == 0xB1));
    assert!(sent.contains(&[0xB1, 45, 0]));
}

#[test]
fn test_structural_edits_emit_single_command() {
    let (mut editor, output) = editor();
    let (p1, p2, p3) = (
        PatchId::new(1).unwrap(),
        PatchId::new(2).unwrap(),
        PatchId::new(3).unwrap(),
    );
    editor.move_patch(p1, p3).unwrap().unwrap();
    assert!(editor.move_patch(p1, p2).unwrap().is_none());
    editor.select_patch(PatchId::new(1).unwrap());
    editor
        .copy_channel(ChannelId::new(4).unwrap(), ChannelId::new(2).unwrap())
        .unwrap()
        .unwrap();
    assert!(
        editor
            .copy_channel(ChannelId::new(2).unwrap(), ChannelId::new(2).unwrap())
            .unwrap()
            .is_none()
    );
    assert_eq!(
        drain(&mut editor, &output),
        vec![[0xBF, 105, 11], [0xBF, 106, 30 + 2 * 6 + 4]]
    );
}

#[test]
fn test_checksum_chunks_on_the_wire() {
    let (mut editor, output) = editor();
    let crc = editor.send_checksum().unwrap();
    assert_eq!(crc, calculate_crc32(&ModuleState::default()));
    let sent = drain(&mut editor, &output);
    let expected: Vec<[u8; 3]> = crc32_chunks(crc)
        .iter()
        .map(|v| [0xBF, Command::SendCrc32Chunk.code(), *v])
        .collect();
    assert_eq!(sent, expected);
}

#[test]
fn test_misc_commands() {
    let (mut editor, output) = editor();
    editor.arm_modulator(Modulator::X);
    editor.save_state().unwrap();
    assert_eq!(editor.state().bindings.armed(), None);
    editor.toggle_debug().unwrap();
    editor.set_calibration_step(3).unwrap();
    assert_eq!(editor.state().calibration_step, 3);
    assert!(editor.set_calibration_step(200).is_err());
    assert_eq!(
        drain(&mut editor, &output),
        vec![[0xBF, 110, 127], [0xBF, 114, 127], [0xBF, 113, 3]]
    );
}

#[test]
fn test_load_state_validates() {
    let (mut editor, _output) = editor();
    let mut state = ModuleState::default();
    state.patches[0].channels[0].al = 9;
    assert!(editor.load_state(state).is_err());
    editor.set_name("Keys");
    assert_eq!(editor.state().name, "Keys");
}

#[test]
fn test_progress_observable_through_editor() {
    let (mut editor, _output) = editor();
    let last = Rc::new(RefCell::new(None));
    let sink = last.clone();
    editor
        .queue_mut()
        .on_progress(move |p| *sink.borrow_mut() = Some(p));
    editor.toggle_debug().unwrap();
    editor.queue_mut().flush();
    assert_eq!(
        *last.borrow(),
        Some(Progress {
            pending: 0,
            done: true
        })
    );
}
