use std::path::PathBuf;

use anyhow::Context;
use comfy_table::{Cell, ContentArrangement, Table, presets::NOTHING};
use cv2612::address::{ChannelId, OperatorId, ParamAddress, PatchId, binding_index, midi_address};
use cv2612::command::crc32_chunks;
use cv2612::dmp::read_dmp;
use cv2612::param::{ParamId, ParamKind, PlayMode};
use cv2612::state::{LAYOUT_LEN, calculate_crc32, serialize};

use crate::input::{read_input, read_state};

fn table(header: &[&str]) -> Table {
    let mut table = Table::new();
    table.load_preset(NOTHING);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(header.iter().map(Cell::new).collect::<Vec<_>>());
    table
}

fn operators_of(id: ParamId) -> Vec<Option<OperatorId>> {
    match id.kind() {
        ParamKind::Operator => OperatorId::all().map(Some).collect(),
        _ => vec![None],
    }
}

/// Print the MIDI address and binding index of every parameter of one
/// patch/channel.
pub fn map(poly: bool, patch: u8, channel: u8) -> anyhow::Result<()> {
    let pid = PatchId::try_from(patch)?;
    let cid = ChannelId::try_from(channel)?;
    let mode = if poly { PlayMode::Poly } else { PlayMode::Mono };

    let mut t = table(&["Param", "Title", "Op", "Max", "MIDI ch", "CC", "Binding"]);
    for id in ParamId::ALL {
        for op in operators_of(id) {
            let addr = midi_address(id, pid, cid, op.unwrap_or_default(), mode);
            let binding = binding_index(id, op.unwrap_or_default())
                .map(|i| i.to_string())
                .unwrap_or_else(|| "-".to_string());
            t.add_row(vec![
                Cell::new(id.label()),
                Cell::new(id.title()),
                Cell::new(op.map(|o| o.to_string()).unwrap_or_default()),
                Cell::new(id.max()),
                Cell::new(addr.channel),
                Cell::new(addr.cc),
                Cell::new(binding),
            ]);
        }
    }
    println!(
        "patch {} channel {} ({} regime)",
        pid,
        cid,
        if poly { "POLY" } else { "normal" }
    );
    println!("{}", t);
    Ok(())
}

pub fn crc(file: &PathBuf) -> anyhow::Result<()> {
    let state = read_state(file)?;
    let bytes = serialize(&state);
    debug_assert_eq!(bytes.len(), LAYOUT_LEN);
    let crc = calculate_crc32(&state);
    let chunks: Vec<String> = crc32_chunks(crc).iter().map(|c| c.to_string()).collect();
    println!("name:   {}", state.name);
    println!("layout: {} bytes", bytes.len());
    println!("crc32:  0x{:08X}", crc);
    println!("chunks: {}", chunks.join(" "));
    Ok(())
}

pub fn check(file: &PathBuf) -> anyhow::Result<()> {
    let state = read_state(file)?;
    let bindings = state.bindings.iter().count();
    println!(
        "{}: ok ({:?}, play mode {}, {} bindings)",
        file.display(),
        state.name,
        state.play_mode().label(),
        bindings
    );
    Ok(())
}

/// Decode DefleMask instruments.
pub fn dmp(files: &[PathBuf], json: bool) -> anyhow::Result<()> {
    for file in files {
        let bytes = read_input(file)?;
        let channel = read_dmp(&bytes)
            .with_context(|| format!("failed to read instrument: {}", file.display()))?;
        if json {
            println!("{}", serde_json::to_string_pretty(&channel)?);
            continue;
        }
        println!(
            "{}: al {} fb {} ams {} fms {} st {}",
            file.display(),
            channel.al,
            channel.fb,
            channel.ams,
            channel.fms,
            channel.st
        );
        let mut header = vec!["Op"];
        header.extend(ParamId::OPERATOR.iter().map(|id| id.label()));
        let mut t = table(&header);
        for (op, operator) in channel.operators.iter().enumerate() {
            let mut row = vec![Cell::new(op)];
            row.extend(
                ParamId::OPERATOR
                    .iter()
                    .map(|id| Cell::new(operator.get(*id).unwrap_or_default())),
            );
            t.add_row(row);
        }
        println!("{}", t);
    }
    Ok(())
}

/// Decode a legacy `id-pid-cid-op` key.
pub fn key(key: &str) -> anyhow::Result<()> {
    let addr: ParamAddress = key.parse()?;
    let id = addr.id();
    println!("param:    {} ({})", id.label(), id.title());
    println!(
        "location: patch {} channel {} operator {}",
        addr.patch(),
        addr.channel(),
        addr.operator()
    );
    println!("range:    0..={}", id.max());
    println!("normal:   {}", addr.midi_address(PlayMode::Mono));
    println!("poly:     {}", addr.midi_address(PlayMode::Poly));
    match addr.binding_index() {
        Some(index) => println!("binding:  {}", index),
        None => println!("binding:  -"),
    }
    Ok(())
}
