use std::fs::OpenOptions;
use std::io;
use std::path::PathBuf;
use std::thread;
use std::time::Instant;

use anyhow::Context;
use cv2612::queue::{CcMessage, MidiOutput, QueueConfig, WriteOutput};
use cv2612::{Editor, TransmitQueue};

use crate::input::read_state;

/// Prints every message as hex instead of transmitting it.
struct HexDump;

impl MidiOutput for HexDump {
    fn send(&mut self, message: [u8; 3]) -> io::Result<()> {
        let message = CcMessage::from_bytes(message)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e.to_string()))?;
        println!("{}", message);
        Ok(())
    }
}

/// Stream a full resynchronization of `file` in real time.
pub fn sync(
    file: &PathBuf,
    device: Option<&PathBuf>,
    config: QueueConfig,
    checksum: bool,
) -> anyhow::Result<()> {
    let state = read_state(file)?;
    let mut queue = TransmitQueue::new(config);
    match device {
        Some(path) => {
            let f = OpenOptions::new()
                .write(true)
                .open(path)
                .with_context(|| format!("failed to open MIDI device: {}", path.display()))?;
            queue.connect(WriteOutput::new(f));
        }
        None => queue.connect(HexDump),
    }
    queue.on_progress(|p| {
        if p.done {
            tracing::info!("sync complete");
        } else if p.pending % 100 == 0 {
            tracing::debug!(pending = p.pending, "sync progress");
        }
    });

    let mut editor = Editor::with_state(state, queue);
    editor.sync_midi()?;
    if checksum {
        let crc = editor.send_checksum()?;
        tracing::info!("expecting checksum 0x{:08X}", crc);
    }

    let started = Instant::now();
    let queue = editor.queue_mut();
    tracing::info!(
        pending = queue.pending_len(),
        speed = ?queue.config().speed,
        "streaming"
    );
    while let Some(deadline) = queue.next_deadline() {
        let wait = deadline.saturating_duration_since(Instant::now());
        if !wait.is_zero() {
            thread::sleep(wait);
        }
        queue.poll();
    }
    tracing::info!(
        sent = queue.sent(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "done"
    );
    Ok(())
}
