//! Binary layout of `vectors.bin`.
//!
//! Little-endian throughout: the 4-byte magic `LEXV`, a `u32` format version,
//! a `u32` dimension, a `u64` vector count, then `count * dimension` `f32`
//! values, vector after vector.

use crate::error::UnavailableReason;
use crate::retrieval::vector_index::FlatIndex;

pub const MAGIC: &[u8; 4] = b"LEXV";
pub const FORMAT_VERSION: u32 = 1;
const HEADER_LEN: usize = 4 + 4 + 4 + 8;

pub fn encode(index: &FlatIndex) -> Vec<u8> {
    let values = index.as_flat();
    let mut out = Vec::with_capacity(HEADER_LEN + values.len() * 4);
    out.extend_from_slice(MAGIC);
    out.extend_from_slice(&FORMAT_VERSION.to_le_bytes());
    out.extend_from_slice(&(index.dimension() as u32).to_le_bytes());
    out.extend_from_slice(&(index.len() as u64).to_le_bytes());
    for value in values {
        out.extend_from_slice(&value.to_le_bytes());
    }
    out
}

fn corrupt(message: impl Into<String>) -> UnavailableReason {
    UnavailableReason::Corrupt(message.into())
}

fn read_array<const N: usize>(bytes: &[u8], at: usize) -> [u8; N] {
    let mut buf = [0u8; N];
    buf.copy_from_slice(&bytes[at..at + N]);
    buf
}

pub fn decode(bytes: &[u8]) -> Result<FlatIndex, UnavailableReason> {
    if bytes.len() < HEADER_LEN {
        return Err(corrupt(format!("vector file too short ({} bytes)", bytes.len())));
    }
    if &bytes[..4] != MAGIC {
        return Err(corrupt("vector file has wrong magic"));
    }
    let version = u32::from_le_bytes(read_array(bytes, 4));
    if version != FORMAT_VERSION {
        return Err(corrupt(format!("unsupported vector file version {version}")));
    }
    let dimension = u32::from_le_bytes(read_array(bytes, 8)) as usize;
    let count = u64::from_le_bytes(read_array(bytes, 12));

    let expected = usize::try_from(count)
        .ok()
        .and_then(|c| c.checked_mul(dimension))
        .and_then(|n| n.checked_mul(4))
        .ok_or_else(|| corrupt("vector file header overflows"))?;
    let body = &bytes[HEADER_LEN..];
    if body.len() != expected {
        return Err(corrupt(format!(
            "vector file body is {} bytes, header promises {expected}",
            body.len()
        )));
    }

    let values = body
        .chunks_exact(4)
        .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .collect();

    FlatIndex::from_flat(dimension, values).map_err(|_| corrupt("vector file shape is invalid"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> FlatIndex {
        FlatIndex::from_flat(3, vec![0.25, -1.5, 3.0, 7.0, 0.0, -0.125]).unwrap()
    }

    #[test]
    fn test_header_layout() {
        let bytes = encode(&sample());
        assert_eq!(&bytes[..4], b"LEXV");
        assert_eq!(bytes.len(), 20 + 6 * 4);
        assert_eq!(u64::from_le_bytes(read_array(&bytes, 12)), 2);
        assert_eq!(decode(&bytes).unwrap(), sample());
    }

    #[test]
    fn test_truncated_body_rejected() {
        let mut bytes = encode(&sample());
        bytes.truncate(bytes.len() - 2);
        assert!(matches!(decode(&bytes), Err(UnavailableReason::Corrupt(_))));
    }

    #[test]
    fn test_bad_magic_and_version_rejected() {
        let mut bytes = encode(&sample());
        bytes[0] = b'X';
        assert!(decode(&bytes).is_err());

        let mut bytes = encode(&sample());
        bytes[4] = 9;
        let err = decode(&bytes).unwrap_err();
        assert!(err.to_string().contains("version 9"));

        assert!(decode(b"LEXV").is_err());
    }
}
