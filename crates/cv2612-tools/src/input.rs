use std::fs::File;
use std::io::{Read, stdin};
use std::path::{Path, PathBuf};

use anyhow::Context;
use cv2612::ModuleState;
use cv2612::persist::import_json;
use flate2::read::GzDecoder;

const GZIP_MAGIC: [u8; 2] = [0x1F, 0x8B];

fn gunzip(bytes: &[u8], what: &str) -> anyhow::Result<Vec<u8>> {
    let mut decoder = GzDecoder::new(bytes);
    let mut out = Vec::new();
    decoder
        .read_to_end(&mut out)
        .with_context(|| format!("failed to decompress gzip data from {}", what))?;
    Ok(out)
}

/// Read a whole input file, or stdin when the path is `-`.
///
/// Gzip data is detected by its magic bytes or a `.gz` extension.
pub fn read_input(path: &PathBuf) -> anyhow::Result<Vec<u8>> {
    let mut inbuf = Vec::new();
    if path == Path::new("-") {
        stdin()
            .read_to_end(&mut inbuf)
            .context("failed to read from stdin")?;
    } else {
        File::open(path)
            .with_context(|| format!("failed to open input file: {}", path.display()))?
            .read_to_end(&mut inbuf)
            .with_context(|| format!("failed to read input file: {}", path.display()))?;
    }

    let is_gz = path
        .extension()
        .and_then(|s| s.to_str())
        .map(|ext| ext.eq_ignore_ascii_case("gz"))
        .unwrap_or(false);
    if is_gz || inbuf.starts_with(&GZIP_MAGIC) {
        gunzip(&inbuf, &path.display().to_string())
    } else {
        Ok(inbuf)
    }
}

/// Read and strictly validate a saved state document.
pub fn read_state(path: &PathBuf) -> anyhow::Result<ModuleState> {
    let bytes = read_input(path)?;
    let json = String::from_utf8(bytes)
        .with_context(|| format!("{} is not UTF-8 text", path.display()))?;
    let state = import_json(&json)
        .with_context(|| format!("rejected state document: {}", path.display()))?;
    Ok(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::Compression;
    use flate2::write::GzEncoder;
    use std::io::Write;

    #[test]
    fn test_gunzip() {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(b"{\"name\":1}").unwrap();
        let gz = encoder.finish().unwrap();
        assert!(gz.starts_with(&GZIP_MAGIC));
        assert_eq!(gunzip(&gz, "test").unwrap(), b"{\"name\":1}");
        assert!(gunzip(b"plain", "test").is_err());
    }
}
