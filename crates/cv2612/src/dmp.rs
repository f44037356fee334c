//! DefleMask (`.dmp`) FM instrument reader.
//!
//! Only Genesis FM instruments are accepted: file version 9 (`09 01 00`)
//! and version 11 (`0B 02 01`). After the 3-byte header come 4 channel
//! bytes (FMS, FB, ALG, AMS) and 4 operator blocks of 11 bytes each
//! (MULT, TL, AR, DR, SL, RR, AM, RS, DT, D2R, SSG-EG). SSG-EG has no
//! counterpart on the module and is ignored.
//!
//! # Examples
//!
//! ```
//! use cv2612::dmp::{DMP_MIN_LEN, read_dmp};
//!
//! let mut bytes = vec![0u8; DMP_MIN_LEN];
//! bytes[..3].copy_from_slice(&[0x0B, 0x02, 0x01]);
//! bytes[5] = 4; // algorithm
//! let channel = read_dmp(&bytes).unwrap();
//! assert_eq!(channel.al, 4);
//! assert_eq!(channel.st, 3);
//! ```
use crate::binutil::{ParseError, read_slice};
use crate::param::ParamId;
use crate::state::{Channel, Operator};

/// Accepted `version, system, instrument type` headers.
pub const DMP_HEADERS: [[u8; 3]; 2] = [[0x09, 0x01, 0x00], [0x0B, 0x02, 0x01]];

const CHANNEL_OFFSET: usize = 3;
const OPERATOR_OFFSET: usize = 7;
const OPERATOR_BLOCK_LEN: usize = 11;
/// Smallest buffer holding a complete FM instrument.
pub const DMP_MIN_LEN: usize = OPERATOR_OFFSET + 4 * OPERATOR_BLOCK_LEN;

/// Stereo routing of imported instruments (both speakers).
const DEFAULT_STEREO: u8 = 3;

fn mask(id: ParamId, raw: u8) -> u8 {
    raw & id.max()
}

fn read_operator(block: &[u8]) -> Operator {
    Operator {
        mul: mask(ParamId::Multiplier, block[0]),
        tl: mask(ParamId::TotalLevel, block[1]),
        ar: mask(ParamId::AttackRate, block[2]),
        d1: mask(ParamId::Decay1, block[3]),
        sl: mask(ParamId::SustainLevel, block[4]),
        rr: mask(ParamId::ReleaseRate, block[5]),
        am: mask(ParamId::AmplitudeMod, block[6]),
        rs: mask(ParamId::RateScaling, block[7]),
        det: mask(ParamId::Detune, block[8]),
        d2: mask(ParamId::Decay2, block[9]),
    }
}

/// Read a Genesis FM instrument into a [`Channel`].
pub fn read_dmp(bytes: &[u8]) -> Result<Channel, ParseError> {
    let header = read_slice(bytes, 0, 3, "dmp_header")?;
    let header = [header[0], header[1], header[2]];
    if !DMP_HEADERS.contains(&header) {
        return Err(ParseError::UnsupportedHeader(header));
    }

    let ch = read_slice(bytes, CHANNEL_OFFSET, 4, "dmp_channel")?;
    let mut channel = Channel {
        fms: mask(ParamId::Fms, ch[0]),
        fb: mask(ParamId::Feedback, ch[1]),
        al: mask(ParamId::Algorithm, ch[2]),
        ams: mask(ParamId::Ams, ch[3]),
        st: DEFAULT_STEREO,
        ..Channel::default()
    };

    for (op, slot) in channel.operators.iter_mut().enumerate() {
        let off = OPERATOR_OFFSET + op * OPERATOR_BLOCK_LEN;
        let block = read_slice(bytes, off, OPERATOR_BLOCK_LEN, &format!("operator {}", op))?;
        *slot = read_operator(block);
    }
    Ok(channel)
}
