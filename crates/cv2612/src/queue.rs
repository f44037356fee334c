//! Coalescing, throttled CC transmission queue.
//!
//! [`TransmitQueue::send_cc`] never writes to the transport. It schedules the
//! message under a coalescing key; a newer message for the same key replaces
//! the pending one. Messages become due after
//! `floor + interval * pending_count` and are written by [`TransmitQueue::poll`],
//! which the owner calls from its timer tick.
//!
//! For command codes on the command channel the key includes the value, so
//! discrete commands are never collapsed into each other. Settings and
//! operator parameters that share that channel coalesce like any other CC.
//!
//! # Examples
//!
//! ```
//! use std::time::Duration;
//! use cv2612::queue::{ManualClock, MemoryOutput, QueueConfig, TransmitQueue};
//!
//! let clock = ManualClock::new();
//! let output = MemoryOutput::new();
//! let mut queue = TransmitQueue::with_clock(QueueConfig::default(), clock.clone());
//! queue.connect(output.clone());
//!
//! queue.send_cc(0, 20, 10).unwrap();
//! queue.send_cc(0, 20, 20).unwrap();
//! assert!(output.messages().is_empty());
//!
//! clock.advance(Duration::from_millis(100));
//! queue.poll();
//! assert_eq!(output.messages(), vec![[0xB0, 20, 20]]);
//! ```
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::fmt;
use std::io::{self, Write};
use std::rc::Rc;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use crate::address::{COMMAND_CHANNEL, MidiAddress};
use crate::command::Command;
use crate::error::Cv2612Error;

/// Status byte of a Control Change message on channel 0.
pub const CONTROL_CHANGE: u8 = 0xB0;

/// A validated MIDI Control Change message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CcMessage {
    channel: u8,
    cc: u8,
    value: u8,
}

impl CcMessage {
    /// Build a message, rejecting a channel above 15 or a CC/value above 127.
    pub fn new(channel: u8, cc: u8, value: u8) -> Result<CcMessage, Cv2612Error> {
        if channel > 0x0F {
            return Err(Cv2612Error::InvalidMidi {
                what: "channel",
                value: channel,
            });
        }
        if cc > 0x7F {
            return Err(Cv2612Error::InvalidMidi { what: "cc", value: cc });
        }
        if value > 0x7F {
            return Err(Cv2612Error::InvalidMidi { what: "value", value });
        }
        Ok(CcMessage { channel, cc, value })
    }

    pub fn at(address: MidiAddress, value: u8) -> Result<CcMessage, Cv2612Error> {
        CcMessage::new(address.channel, address.cc, value)
    }

    /// A command on the command channel.
    pub fn command(command: Command, value: u8) -> Result<CcMessage, Cv2612Error> {
        CcMessage::new(COMMAND_CHANNEL, command.code(), value)
    }

    /// Parse a 3-byte Control Change message.
    pub fn from_bytes(bytes: [u8; 3]) -> Result<CcMessage, Cv2612Error> {
        if bytes[0] & 0xF0 != CONTROL_CHANGE {
            return Err(Cv2612Error::InvalidMidi {
                what: "status",
                value: bytes[0],
            });
        }
        CcMessage::new(bytes[0] & 0x0F, bytes[1], bytes[2])
    }

    pub fn channel(&self) -> u8 {
        self.channel
    }

    pub fn cc(&self) -> u8 {
        self.cc
    }

    pub fn value(&self) -> u8 {
        self.value
    }

    pub fn to_bytes(&self) -> [u8; 3] {
        [CONTROL_CHANGE | self.channel, self.cc, self.value]
    }

    fn key(&self) -> QueueKey {
        QueueKey {
            channel: self.channel,
            cc: self.cc,
            value: (self.channel == COMMAND_CHANNEL && Command::from_code(self.cc).is_some())
                .then_some(self.value),
        }
    }
}

impl fmt::Display for CcMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [status, cc, value] = self.to_bytes();
        write!(f, "{:02X} {:02X} {:02X}", status, cc, value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct QueueKey {
    channel: u8,
    cc: u8,
    value: Option<u8>,
}

/// Transport seam: something that accepts raw 3-byte MIDI messages.
pub trait MidiOutput {
    fn send(&mut self, bytes: [u8; 3]) -> io::Result<()>;
}

/// Output recording every message into a shared buffer.
#[derive(Debug, Clone, Default)]
pub struct MemoryOutput {
    messages: Rc<RefCell<Vec<[u8; 3]>>>,
}

impl MemoryOutput {
    pub fn new() -> Self {
        Self::default()
    }

    /// Messages written so far.
    pub fn messages(&self) -> Vec<[u8; 3]> {
        self.messages.borrow().clone()
    }

    /// Take the recorded messages, leaving the buffer empty.
    pub fn take(&self) -> Vec<[u8; 3]> {
        self.messages.take()
    }

    pub fn len(&self) -> usize {
        self.messages.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.borrow().is_empty()
    }
}

impl MidiOutput for MemoryOutput {
    fn send(&mut self, bytes: [u8; 3]) -> io::Result<()> {
        self.messages.borrow_mut().push(bytes);
        Ok(())
    }
}

/// Output writing raw MIDI bytes to any [`Write`], such as a raw MIDI
/// device file.
#[derive(Debug)]
pub struct WriteOutput<W: Write> {
    inner: W,
}

impl<W: Write> WriteOutput<W> {
    pub fn new(inner: W) -> Self {
        Self { inner }
    }

    pub fn into_inner(self) -> W {
        self.inner
    }
}

impl<W: Write> MidiOutput for WriteOutput<W> {
    fn send(&mut self, bytes: [u8; 3]) -> io::Result<()> {
        self.inner.write_all(&bytes)?;
        self.inner.flush()
    }
}

/// Time source of the queue.
pub trait Clock {
    fn now(&self) -> Instant;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Manually advanced clock. Clones share the same time.
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: Rc<Cell<Instant>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            now: Rc::new(Cell::new(Instant::now())),
        }
    }

    pub fn advance(&self, by: Duration) {
        self.now.set(self.now.get() + by);
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.now.get()
    }
}

/// Per-message spacing presets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpeedPreset {
    Slow,
    #[default]
    Normal,
    Fast,
    Turbo,
}

impl SpeedPreset {
    pub fn interval(self) -> Duration {
        Duration::from_millis(match self {
            SpeedPreset::Slow => 40,
            SpeedPreset::Normal => 20,
            SpeedPreset::Fast => 10,
            SpeedPreset::Turbo => 5,
        })
    }
}

/// Queue configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueConfig {
    pub speed: SpeedPreset,
    /// Minimum delay of every message, in milliseconds.
    pub floor_ms: u64,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            speed: SpeedPreset::Normal,
            floor_ms: 2,
        }
    }
}

impl QueueConfig {
    /// Delay of a message scheduled while `pending` messages (itself
    /// included) are waiting.
    pub fn delay(&self, pending: usize) -> Duration {
        Duration::from_millis(self.floor_ms) + self.speed.interval() * pending as u32
    }
}

/// Progress notification, emitted after every transmission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    /// Messages still waiting.
    pub pending: usize,
    /// True once nothing is pending.
    pub done: bool,
}

#[derive(Debug, Clone, Copy)]
struct Pending {
    due: Instant,
    seq: u64,
    message: CcMessage,
}

/// The coalescing transmission queue.
pub struct TransmitQueue {
    config: QueueConfig,
    clock: Box<dyn Clock>,
    output: Option<Box<dyn MidiOutput>>,
    pending: HashMap<QueueKey, Pending>,
    next_seq: u64,
    sent: u64,
    on_progress: Option<Box<dyn FnMut(Progress)>>,
}

impl fmt::Debug for TransmitQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransmitQueue")
            .field("config", &self.config)
            .field("connected", &self.output.is_some())
            .field("pending", &self.pending.len())
            .field("sent", &self.sent)
            .finish()
    }
}

impl TransmitQueue {
    /// Create a queue driven by the system clock, with no output connected.
    pub fn new(config: QueueConfig) -> Self {
        Self::with_clock(config, SystemClock)
    }

    pub fn with_clock(config: QueueConfig, clock: impl Clock + 'static) -> Self {
        Self {
            config,
            clock: Box::new(clock),
            output: None,
            pending: HashMap::new(),
            next_seq: 0,
            sent: 0,
            on_progress: None,
        }
    }

    pub fn config(&self) -> QueueConfig {
        self.config
    }

    pub fn set_speed(&mut self, speed: SpeedPreset) {
        self.config.speed = speed;
    }

    pub fn connect(&mut self, output: impl MidiOutput + 'static) {
        self.output = Some(Box::new(output));
    }

    /// Drop the output. Pending messages are discarded.
    pub fn disconnect(&mut self) {
        if !self.pending.is_empty() {
            tracing::debug!(pending = self.pending.len(), "discarding pending CCs on disconnect");
        }
        self.pending.clear();
        self.output = None;
    }

    pub fn is_connected(&self) -> bool {
        self.output.is_some()
    }

    /// Register the progress callback, replacing any previous one.
    pub fn on_progress(&mut self, callback: impl FnMut(Progress) + 'static) {
        self.on_progress = Some(Box::new(callback));
    }

    /// Schedule a CC message. Invalid bytes are rejected; a missing output
    /// drops the message.
    pub fn send_cc(&mut self, channel: u8, cc: u8, value: u8) -> Result<(), Cv2612Error> {
        let message = CcMessage::new(channel, cc, value)?;
        self.send(message);
        Ok(())
    }

    /// Schedule an already validated message.
    pub fn send(&mut self, message: CcMessage) {
        if self.output.is_none() {
            tracing::debug!(%message, "no MIDI output connected, dropping CC");
            return;
        }

        let key = message.key();
        // the replaced message does not count towards the delay
        self.pending.remove(&key);
        let delay = self.config.delay(self.pending.len() + 1);
        let seq = self.next_seq;
        self.next_seq += 1;
        self.pending.insert(
            key,
            Pending {
                due: self.clock.now() + delay,
                seq,
                message,
            },
        );
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_idle(&self) -> bool {
        self.pending.is_empty()
    }

    /// Messages transmitted since creation.
    pub fn sent(&self) -> u64 {
        self.sent
    }

    /// Deadline of the next message to become due.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.pending.values().map(|p| p.due).min()
    }

    /// Transmit every due message in deadline order. Returns how many
    /// messages were written.
    pub fn poll(&mut self) -> usize {
        let now = self.clock.now();
        let due = self.take_where(|p| p.due <= now);
        self.transmit_all(due)
    }

    /// Transmit everything pending right away.
    pub fn flush(&mut self) -> usize {
        let all = self.take_where(|_| true);
        self.transmit_all(all)
    }

    fn take_where(&mut self, pred: impl Fn(&Pending) -> bool) -> Vec<Pending> {
        let keys: Vec<QueueKey> = self
            .pending
            .iter()
            .filter(|(_, p)| pred(p))
            .map(|(k, _)| *k)
            .collect();
        let mut taken: Vec<Pending> = keys
            .iter()
            .filter_map(|k| self.pending.remove(k))
            .collect();
        taken.sort_by_key(|p| (p.due, p.seq));
        taken
    }

    fn transmit_all(&mut self, messages: Vec<Pending>) -> usize {
        let mut written = 0;
        let total = messages.len();
        for (i, p) in messages.into_iter().enumerate() {
            if self.transmit(p.message) {
                written += 1;
            }
            let pending = self.pending.len() + (total - i - 1);
            if let Some(cb) = self.on_progress.as_mut() {
                cb(Progress {
                    pending,
                    done: pending == 0,
                });
            }
        }
        written
    }

    fn transmit(&mut self, message: CcMessage) -> bool {
        let Some(output) = self.output.as_mut() else {
            tracing::debug!(%message, "no MIDI output connected, dropping CC");
            return false;
        };
        match output.send(message.to_bytes()) {
            Ok(()) => {
                self.sent += 1;
                tracing::trace!(%message, "sent");
                true
            }
            Err(e) => {
                tracing::warn!(%message, error = %e, "MIDI write failed, dropping CC");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn queue() -> (TransmitQueue, ManualClock, MemoryOutput) {
        let clock = ManualClock::new();
        let output = MemoryOutput::new();
        let mut q = TransmitQueue::with_clock(QueueConfig::default(), clock.clone());
        q.connect(output.clone());
        (q, clock, output)
    }

    struct FailingOutput;

    impl MidiOutput for FailingOutput {
        fn send(&mut self, _bytes: [u8; 3]) -> io::Result<()> {
            Err(io::Error::other("unplugged"))
        }
    }

    #[test]
    fn test_message_validation() {
        assert!(CcMessage::new(16, 0, 0).is_err());
        assert!(CcMessage::new(0, 128, 0).is_err());
        assert!(CcMessage::new(0, 0, 128).is_err());
        let m = CcMessage::new(3, 10, 3).unwrap();
        assert_eq!(m.to_bytes(), [0xB3, 10, 3]);
        assert_eq!(CcMessage::from_bytes([0xB3, 10, 3]).unwrap(), m);
        assert!(CcMessage::from_bytes([0x93, 10, 3]).is_err());
        assert_eq!(m.to_string(), "B3 0A 03");
    }

    #[test]
    fn test_delay_grows_with_pending() {
        let config = QueueConfig::default();
        assert_eq!(config.delay(1), Duration::from_millis(22));
        assert_eq!(config.delay(3), Duration::from_millis(62));
        assert_eq!(SpeedPreset::Turbo.interval(), Duration::from_millis(5));
    }

    #[test]
    fn test_not_written_synchronously() {
        let (mut q, clock, output) = queue();
        q.send_cc(0, 20, 1).unwrap();
        assert!(output.is_empty());
        assert_eq!(q.poll(), 0);
        clock.advance(Duration::from_millis(21));
        assert_eq!(q.poll(), 0);
        clock.advance(Duration::from_millis(1));
        assert_eq!(q.poll(), 1);
    }

    #[test]
    fn test_command_values_do_not_coalesce() {
        let (mut q, _clock, output) = queue();
        q.send_cc(15, 101, 84).unwrap();
        q.send_cc(15, 101, 20).unwrap();
        q.send_cc(15, 101, 84).unwrap();
        assert_eq!(q.pending_len(), 2);
        q.flush();
        assert_eq!(output.messages(), vec![[0xBF, 101, 20], [0xBF, 101, 84]]);
    }

    #[test]
    fn test_disconnected_drops() {
        let mut q = TransmitQueue::with_clock(QueueConfig::default(), ManualClock::new());
        q.send_cc(0, 10, 3).unwrap();
        assert_eq!(q.pending_len(), 0);
        assert!(q.send_cc(0, 10, 200).is_err());
    }

    #[test]
    fn test_write_error_is_dropped() {
        let mut q = TransmitQueue::with_clock(QueueConfig::default(), ManualClock::new());
        q.connect(FailingOutput);
        q.send_cc(0, 10, 3).unwrap();
        assert_eq!(q.flush(), 0);
        assert!(q.is_idle());
        assert_eq!(q.sent(), 0);
    }

    #[test]
    fn test_progress_reports_done() {
        let (mut q, clock, _output) = queue();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        q.on_progress(move |p| sink.borrow_mut().push(p));
        q.send_cc(0, 10, 1).unwrap();
        q.send_cc(0, 11, 1).unwrap();
        clock.advance(Duration::from_secs(1));
        q.poll();
        assert_eq!(
            *seen.borrow(),
            vec![
                Progress {
                    pending: 1,
                    done: false
                },
                Progress {
                    pending: 0,
                    done: true
                },
            ]
        );
    }

    #[test]
    fn test_write_output_bytes() {
        let mut out = WriteOutput::new(Vec::new());
        out.send([0xB0, 10, 3]).unwrap();
        out.send([0xBF, 115, 0x1E]).unwrap();
        assert_eq!(out.into_inner(), vec![0xB0, 10, 3, 0xBF, 115, 0x1E]);
    }
}
