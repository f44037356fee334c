//! Structural edits: moving and copying whole patches or channels.
//!
//! Each edit rewrites the logical state in place and returns the single
//! [`StructuralCommand`] the firmware needs to replay it, or `None` when the
//! edit is a no-op (nothing changes and nothing must be sent).
//!
//! Moves name the final position: `before` is the patch or channel index
//! the moved element occupies afterwards, the elements in between shift by
//! one. Moving an element onto itself or onto its successor leaves the
//! order unchanged.
//!
//! # Examples
//!
//! ```
//! use cv2612::address::PatchId;
//! use cv2612::reindex::move_patch;
//! use cv2612::state::ModuleState;
//!
//! let mut state = ModuleState::default();
//! state.patches[1].lfo = 5;
//! let cmd = move_patch(&mut state, PatchId::new(1).unwrap(), PatchId::new(3).unwrap()).unwrap();
//! assert_eq!(cmd.value(), 11);
//! assert_eq!(state.patches[3].lfo, 5);
//! ```
use crate::address::{ChannelId, PatchId};
use crate::command::StructuralCommand;
use crate::state::ModuleState;

fn is_noop(index: usize, before: usize) -> bool {
    before == index || before == index + 1
}

/// Move `items[index]` to `dest`, shifting the elements in between by one.
fn relocate<T>(items: &mut [T], index: usize, dest: usize) {
    if dest > index {
        items[index..=dest].rotate_left(1);
    } else {
        items[dest..=index].rotate_right(1);
    }
}

/// Move patch `index` to position `before`.
pub fn move_patch(
    state: &mut ModuleState,
    index: PatchId,
    before: PatchId,
) -> Option<StructuralCommand> {
    let (from, dest) = (index.index() as usize, before.index() as usize);
    if is_noop(from, dest) {
        return None;
    }
    relocate(&mut state.patches, from, dest);
    Some(StructuralCommand::MovePatch { index, before })
}

/// Overwrite patch `target` with a copy of patch `source`.
pub fn copy_patch(
    state: &mut ModuleState,
    source: PatchId,
    target: PatchId,
) -> Option<StructuralCommand> {
    if source == target {
        return None;
    }
    let copy = *state.patch(source);
    *state.patch_mut(target) = copy;
    Some(StructuralCommand::CopyPatch { source, target })
}

/// Move channel `index` of `patch` to position `before`.
pub fn move_channel(
    state: &mut ModuleState,
    patch: PatchId,
    index: ChannelId,
    before: ChannelId,
) -> Option<StructuralCommand> {
    let (from, dest) = (index.index() as usize, before.index() as usize);
    if is_noop(from, dest) {
        return None;
    }
    relocate(&mut state.patch_mut(patch).channels, from, dest);
    Some(StructuralCommand::MoveChannel {
        patch,
        index,
        before,
    })
}

/// Overwrite channel `target` of `patch` with channel `source`.
///
/// Only channel-scoped values are copied; the patch LFO is untouched.
pub fn copy_channel(
    state: &mut ModuleState,
    patch: PatchId,
    source: ChannelId,
    target: ChannelId,
) -> Option<StructuralCommand> {
    if source == target {
        return None;
    }
    let p = state.patch_mut(patch);
    let copy = *p.channel(source);
    *p.channel_mut(target) = copy;
    Some(StructuralCommand::CopyChannel {
        patch,
        source,
        target,
    })
}

/// Replay a structural command on `state`, as the firmware does on receipt.
pub fn apply(state: &mut ModuleState, command: StructuralCommand) {
    match command {
        StructuralCommand::MovePatch { index, before } => {
            move_patch(state, index, before);
        }
        StructuralCommand::CopyPatch { source, target } => {
            copy_patch(state, source, target);
        }
        StructuralCommand::MoveChannel {
            patch,
            index,
            before,
        } => {
            move_channel(state, patch, index, before);
        }
        StructuralCommand::CopyChannel {
            patch,
            source,
            target,
        } => {
            copy_channel(state, patch, source, target);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tagged() -> ModuleState {
        let mut state = ModuleState::default();
        for (i, patch) in state.patches.iter_mut().enumerate() {
            patch.lfo = i as u8;
            for (j, ch) in patch.channels.iter_mut().enumerate() {
                ch.operators[0].tl = (i * 10 + j) as u8;
            }
        }
        state
    }

    fn lfos(state: &ModuleState) -> Vec<u8> {
        state.patches.iter().map(|p| p.lfo).collect()
    }

    fn tls(state: &ModuleState, pid: usize) -> Vec<u8> {
        state.patches[pid]
            .channels
            .iter()
            .map(|c| c.operators[0].tl)
            .collect()
    }

    #[test]
    fn test_move_patch_forward_and_back() {
        let mut state = tagged();
        move_patch(&mut state, PatchId::new(0).unwrap(), PatchId::new(3).unwrap());
        assert_eq!(lfos(&state), vec![1, 2, 3, 0]);
        move_patch(&mut state, PatchId::new(3).unwrap(), PatchId::new(0).unwrap());
        assert_eq!(lfos(&state), vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_move_noop_emits_nothing() {
        let mut state = tagged();
        let p1 = PatchId::new(1).unwrap();
        assert_eq!(move_patch(&mut state, p1, p1), None);
        assert_eq!(move_patch(&mut state, p1, PatchId::new(2).unwrap()), None);
        assert_eq!(lfos(&state), vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_copy_channel_keeps_lfo() {
        let mut state = tagged();
        let p2 = PatchId::new(2).unwrap();
        let cmd = copy_channel(
            &mut state,
            p2,
            ChannelId::new(5).unwrap(),
            ChannelId::new(0).unwrap(),
        );
        assert!(cmd.is_some());
        assert_eq!(tls(&state, 2), vec![25, 21, 22, 23, 24, 25]);
        assert_eq!(state.patches[2].lfo, 2);
        assert_eq!(copy_channel(&mut state, p2, ChannelId::ZERO, ChannelId::ZERO), None);
    }

    #[test]
    fn test_move_channel_to_last_position() {
        let mut state = tagged();
        let p = PatchId::new(1).unwrap();
        let (c1, c5) = (ChannelId::new(1).unwrap(), ChannelId::new(5).unwrap());
        let cmd = move_channel(&mut state, p, c1, c5).unwrap();
        assert_eq!(tls(&state, 1), vec![10, 12, 13, 14, 15, 11]);
        assert_eq!(
            cmd,
            StructuralCommand::MoveChannel {
                patch: p,
                index: c1,
                before: c5,
            }
        );
    }

    #[test]
    fn test_apply_replays_every_move() {
        for from in ChannelId::all() {
            for before in ChannelId::all() {
                let mut edited = tagged();
                let Some(cmd) = move_channel(&mut edited, PatchId::ZERO, from, before) else {
                    continue;
                };
                let mut mirror = tagged();
                apply(&mut mirror, cmd);
                assert_eq!(mirror, edited, "from {from} before {before}");
            }
        }
    }
}
