//! Editor: the logical state plus the named operations that mutate it.
//!
//! Every operation updates the [`ModuleState`] and schedules the matching
//! wire messages on the owned [`TransmitQueue`]. Nothing is written to the
//! transport until the owner polls the queue.
//!
//! # Examples
//!
//! ```
//! use cv2612::address::OperatorId;
//! use cv2612::editor::Editor;
//! use cv2612::param::ParamId;
//! use cv2612::queue::{ManualClock, MemoryOutput, QueueConfig, TransmitQueue};
//!
//! let output = MemoryOutput::new();
//! let mut queue = TransmitQueue::with_clock(QueueConfig::default(), ManualClock::new());
//! queue.connect(output.clone());
//!
//! let mut editor = Editor::new(queue);
//! editor.change_param(ParamId::Algorithm, OperatorId::ZERO, 3).unwrap();
//! editor.queue_mut().flush();
//! assert_eq!(output.messages(), vec![[0xB0, 10, 3]]);
//! ```
use crate::address::{
    AddressRegime, ChannelId, MidiAddress, OperatorId, ParamAddress, PatchId, bindable_indices,
};
use crate::binding::{Modulator, bind_value, unbind_value};
use crate::command::{Command, NO_PAYLOAD, StructuralCommand, crc32_chunks, seq_step_value};
use crate::error::Cv2612Error;
use crate::param::{ParamId, ParamMeta};
use crate::queue::{CcMessage, TransmitQueue};
use crate::reindex;
use crate::state::{Channel, ModuleState, Operator, calculate_crc32};

/// Everything a front end needs to render one parameter at the cursor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParamData {
    pub meta: ParamMeta,
    pub address: ParamAddress,
    pub midi: MidiAddress,
    pub binding_index: Option<u8>,
    pub value: u8,
    /// Modulators currently driving the parameter.
    pub modulators: Vec<Modulator>,
}

/// Owner of the logical state and the transmission queue.
#[derive(Debug)]
pub struct Editor {
    state: ModuleState,
    queue: TransmitQueue,
}

impl Editor {
    /// Create an editor with a default state.
    pub fn new(queue: TransmitQueue) -> Self {
        Self::with_state(ModuleState::default(), queue)
    }

    pub fn with_state(state: ModuleState, queue: TransmitQueue) -> Self {
        Self { state, queue }
    }

    pub fn state(&self) -> &ModuleState {
        &self.state
    }

    pub fn queue(&self) -> &TransmitQueue {
        &self.queue
    }

    pub fn queue_mut(&mut self) -> &mut TransmitQueue {
        &mut self.queue
    }

    pub fn into_parts(self) -> (ModuleState, TransmitQueue) {
        (self.state, self.queue)
    }

    /// Address of `id` at the cursor (`op` matters for operator params only).
    pub fn address_at_cursor(&self, id: ParamId, op: OperatorId) -> ParamAddress {
        let cursor = self.state.cursor;
        ParamAddress::new(id, cursor.patch, cursor.channel, op)
    }

    pub fn param_data(&self, id: ParamId, op: OperatorId) -> ParamData {
        let address = self.address_at_cursor(id, op);
        let binding_index = address.binding_index();
        ParamData {
            meta: id.meta(),
            address,
            midi: address.midi_address(self.state.play_mode()),
            binding_index,
            value: self.state.get(address).unwrap_or_default(),
            modulators: binding_index
                .map(|i| self.state.bindings.modulators_for(i))
                .unwrap_or_default(),
        }
    }

    fn send_param(&mut self, address: ParamAddress) -> Result<(), Cv2612Error> {
        let Some(value) = self.state.get(address) else {
            return Err(Cv2612Error::InvalidKey(address.to_string()));
        };
        let message = CcMessage::at(address.midi_address(self.state.play_mode()), value)?;
        self.queue.send(message);
        Ok(())
    }

    fn send_command(&mut self, command: Command, value: u8) -> Result<(), Cv2612Error> {
        self.queue.send(CcMessage::command(command, value)?);
        Ok(())
    }

    fn send_structural(&mut self, command: StructuralCommand) -> Result<(), Cv2612Error> {
        tracing::info!(?command, value = command.value(), "structural edit");
        self.send_command(command.command(), command.value())
    }

    /// Set `id` at the cursor and send it.
    ///
    /// Stereo routing is applied to the cursor channel of all four patches.
    pub fn change_param(
        &mut self,
        id: ParamId,
        op: OperatorId,
        value: u8,
    ) -> Result<(), Cv2612Error> {
        let value = id.check(value)?;
        let address = self.address_at_cursor(id, op);
        let targets: Vec<ParamAddress> = if id == ParamId::Stereo {
            PatchId::all()
                .map(|pid| ParamAddress::new(id, pid, address.channel(), op))
                .collect()
        } else {
            vec![address]
        };
        for target in targets {
            self.state.set(target, value)?;
            self.send_param(target)?;
        }
        Ok(())
    }

    pub fn select_patch(&mut self, patch: PatchId) {
        self.state.cursor.patch = patch;
    }

    pub fn select_channel(&mut self, channel: ChannelId) {
        self.state.cursor.channel = channel;
    }

    /// Arm `modulator` for binding edits; arming the armed one disarms it.
    pub fn arm_modulator(&mut self, modulator: Modulator) -> Option<Modulator> {
        self.state.bindings.arm(modulator)
    }

    pub fn disarm_modulator(&mut self) {
        self.state.bindings.disarm();
    }

    /// Toggle the binding of `id` on the armed modulator.
    ///
    /// Returns the new membership, or `None` (and sends nothing) when no
    /// modulator is armed or the parameter is not bindable.
    pub fn toggle_binding(
        &mut self,
        id: ParamId,
        op: OperatorId,
    ) -> Result<Option<bool>, Cv2612Error> {
        let Some(modulator) = self.state.bindings.armed() else {
            return Ok(None);
        };
        let Some(index) = self.address_at_cursor(id, op).binding_index() else {
            return Ok(None);
        };
        let bound = self.state.bindings.toggle(modulator, index);
        let value = if bound {
            bind_value(index)
        } else {
            unbind_value(index)
        };
        self.send_command(modulator.command(), value)?;
        Ok(Some(bound))
    }

    /// Clear every slot; when `modulator` is given, bind every bindable
    /// parameter to it.
    pub fn bind_all(&mut self, modulator: Option<Modulator>) -> Result<(), Cv2612Error> {
        self.state.bindings.clear();
        self.send_command(Command::ClearBindings, NO_PAYLOAD)?;
        if let Some(modulator) = modulator {
            for index in bindable_indices() {
                self.state.bindings.insert(modulator, index);
                self.send_command(modulator.command(), bind_value(index))?;
            }
        }
        Ok(())
    }

    /// Re-send a bind command for every current binding.
    pub fn sync_bindings(&mut self) -> Result<(), Cv2612Error> {
        let bindings: Vec<(Modulator, u8)> = self.state.bindings.iter().collect();
        for (modulator, index) in bindings {
            self.send_command(modulator.command(), bind_value(index))?;
        }
        Ok(())
    }

    /// Full re-synchronization: clear bindings, send every parameter, then
    /// every binding.
    ///
    /// In POLY mode all operators collapse onto shared addresses; the
    /// cursor channel's operators are sent last so they win the coalescing.
    pub fn sync_midi(&mut self) -> Result<(), Cv2612Error> {
        tracing::info!("syncing full state");
        self.send_command(Command::ClearBindings, NO_PAYLOAD)?;
        for address in ParamAddress::all() {
            self.send_param(address)?;
        }
        if AddressRegime::from(self.state.play_mode()) == AddressRegime::Poly {
            for op in OperatorId::all() {
                for id in ParamId::OPERATOR {
                    self.send_param(self.address_at_cursor(id, op))?;
                }
            }
        }
        self.sync_bindings()
    }

    /// Flip a sequencer step and send SET_SEQ_STEP_ON/OFF.
    pub fn toggle_seq_step(&mut self, voice: u8, step: u8) -> Result<bool, Cv2612Error> {
        let on = self.state.sequence.toggle(voice as usize, step as usize)?;
        let command = if on {
            Command::SetSeqStepOn
        } else {
            Command::SetSeqStepOff
        };
        self.send_command(command, seq_step_value(voice, step))?;
        Ok(on)
    }

    pub fn clear_sequence(&mut self) -> Result<(), Cv2612Error> {
        self.state.sequence.clear();
        self.send_command(Command::ClearSeq, NO_PAYLOAD)
    }

    /// Restore operator `op` of the cursor channel to its defaults.
    pub fn reset_operator(&mut self, op: OperatorId) -> Result<(), Cv2612Error> {
        *self.state.current_channel_mut().operator_mut(op) = Operator::default();
        for id in ParamId::OPERATOR {
            self.send_param(self.address_at_cursor(id, op))?;
        }
        Ok(())
    }

    /// Restore the cursor channel (and the patch LFO) to defaults.
    pub fn reset_channel(&mut self) -> Result<(), Cv2612Error> {
        let patch = self.state.cursor.patch;
        self.state.patch_mut(patch).lfo = 0;
        self.send_param(self.address_at_cursor(ParamId::Lfo, OperatorId::ZERO))?;
        self.apply_channel(Channel::default())
    }

    /// Write an instrument into the cursor channel and send it.
    pub fn apply_channel(&mut self, channel: Channel) -> Result<(), Cv2612Error> {
        channel.validate()?;
        *self.state.current_channel_mut() = channel;
        for (id, op, _) in channel.values() {
            self.send_param(self.address_at_cursor(id, op))?;
        }
        Ok(())
    }

    pub fn move_patch(
        &mut self,
        index: PatchId,
        before: PatchId,
    ) -> Result<Option<StructuralCommand>, Cv2612Error> {
        let command = reindex::move_patch(&mut self.state, index, before);
        if let Some(command) = command {
            self.send_structural(command)?;
        }
        Ok(command)
    }

    pub fn copy_patch(
        &mut self,
        source: PatchId,
        target: PatchId,
    ) -> Result<Option<StructuralCommand>, Cv2612Error> {
        let command = reindex::copy_patch(&mut self.state, source, target);
        if let Some(command) = command {
            self.send_structural(command)?;
        }
        Ok(command)
    }

    /// Move a channel of the cursor patch.
    pub fn move_channel(
        &mut self,
        index: ChannelId,
        before: ChannelId,
    ) -> Result<Option<StructuralCommand>, Cv2612Error> {
        let patch = self.state.cursor.patch;
        let command = reindex::move_channel(&mut self.state, patch, index, before);
        if let Some(command) = command {
            self.send_structural(command)?;
        }
        Ok(command)
    }

    /// Copy a channel of the cursor patch onto another.
    pub fn copy_channel(
        &mut self,
        source: ChannelId,
        target: ChannelId,
    ) -> Result<Option<StructuralCommand>, Cv2612Error> {
        let patch = self.state.cursor.patch;
        let command = reindex::copy_channel(&mut self.state, patch, source, target);
        if let Some(command) = command {
            self.send_structural(command)?;
        }
        Ok(command)
    }

    /// Ask the module to persist its state. Disarms the modulator.
    pub fn save_state(&mut self) -> Result<(), Cv2612Error> {
        self.state.bindings.disarm();
        self.send_command(Command::SaveState, NO_PAYLOAD)
    }

    pub fn toggle_debug(&mut self) -> Result<(), Cv2612Error> {
        self.send_command(Command::ToggleDebug, NO_PAYLOAD)
    }

    pub fn set_calibration_step(&mut self, step: u8) -> Result<(), Cv2612Error> {
        self.send_command(Command::SetCalibrationStep, step)?;
        self.state.calibration_step = step;
        Ok(())
    }

    /// Send the CRC32 of the current state as eight nibble chunks.
    pub fn send_checksum(&mut self) -> Result<u32, Cv2612Error> {
        let crc = calculate_crc32(&self.state);
        tracing::info!("sending checksum {:08X}", crc);
        for chunk in crc32_chunks(crc) {
            self.send_command(Command::SendCrc32Chunk, chunk)?;
        }
        Ok(crc)
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.state.name = name.into();
    }

    /// Replace the whole logical state. Nothing is sent; call
    /// [`Editor::sync_midi`] to push it to the module.
    pub fn load_state(&mut self, state: ModuleState) -> Result<(), Cv2612Error> {
        state.validate()?;
        self.state = state;
        Ok(())
    }
}
