#![doc = include_str!("../README.md")]
//! cv2612 — MIDI CC protocol layer for the CV2612 FM synthesizer module
//!
//! The module is driven entirely through MIDI Control Change messages. This
//! crate owns the host side of that contract:
//! - `param`: static registry of every parameter (bit width, title, options,
//!   bindability).
//! - `address`: the pure codec from a parameter instance and play mode to a
//!   `(MIDI channel, CC)` pair, binding indices, and the legacy
//!   `"<id>-<pid>-<cid>-<op>"` flat keys.
//! - `state`: the logical state tree and the byte-exact mirror of the
//!   firmware's packed memory used for CRC32 verification.
//! - `binding`: the X/Y/Z modulation routing table.
//! - `queue`: a coalescing, throttled transmission queue in front of any
//!   MIDI output.
//! - `reindex` and `command`: structural edits (move/copy patch or channel)
//!   and their single-command wire encodings.
//! - `editor`: the named operations tying all of the above together.
//! - `persist` and `dmp`: JSON export/import and DefleMask instrument import.
//!
//! Example: edit a parameter and flush the wire messages
//!
//! ```rust
//! use cv2612::{Editor, MemoryOutput, QueueConfig, TransmitQueue};
//! use cv2612::address::OperatorId;
//! use cv2612::param::ParamId;
//!
//! let output = MemoryOutput::new();
//! let mut queue = TransmitQueue::new(QueueConfig::default());
//! queue.connect(output.clone());
//!
//! let mut editor = Editor::new(queue);
//! editor.change_param(ParamId::Algorithm, OperatorId::ZERO, 3).unwrap();
//! // nothing is written until the queue is polled or flushed
//! assert!(output.is_empty());
//! editor.queue_mut().flush();
//! assert_eq!(output.messages(), vec![[0xB0, 10, 3]]);
//! ```
//!
//! Example: checksum of the default state
//!
//! ```rust
//! use cv2612::state::{ModuleState, calculate_crc32};
//! use cv2612::command::{crc32_chunks, crc32_from_chunks};
//!
//! let crc = calculate_crc32(&ModuleState::default());
//! assert_eq!(crc32_from_chunks(&crc32_chunks(crc)), Some(crc));
//! ```
mod binutil;
pub mod address;
pub mod binding;
pub mod command;
pub mod dmp;
pub mod editor;
pub mod error;
pub mod param;
pub mod persist;
pub mod queue;
pub mod reindex;
pub mod state;

pub use binutil::ParseError;
pub use editor::{Editor, ParamData};
pub use error::Cv2612Error;
pub use param::PROTOCOL_VERSION;
pub use queue::{MemoryOutput, QueueConfig, SpeedPreset, TransmitQueue};
pub use state::ModuleState;
