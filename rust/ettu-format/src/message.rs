//! Checksummed framing for persisted buffers.
//!
//! A sealed message is `[payload size: u32][payload][checksum: u32]`, all
//! little-endian, where the checksum covers the payload only.

use std::io::Write;

use ettu_bytes::Bytes;
use ettu_common::{Result, error::ErrorKind, verify_arg};

use crate::codec::read_scalar;

/// Size of the payload length prefix.
pub const MESSAGE_LEN_SIZE: usize = 4;

/// Size of the trailing checksum.
pub const CHECKSUM_SIZE: usize = 4;

/// Computes the 32-bit checksum of `buf` (xxh3-64 folded in half).
pub fn checksum(buf: &[u8]) -> u32 {
    let h = xxhash_rust::xxh3::xxh3_64(buf);
    (h as u32) ^ ((h >> 32) as u32)
}

/// Validates `buf` against an expected checksum. `name` identifies the
/// element in the error.
pub fn validate_checksum(buf: &[u8], expected: u32, name: &str) -> Result<()> {
    if checksum(buf) == expected {
        Ok(())
    } else {
        Err(ErrorKind::ChecksumMismatch {
            element: name.to_string(),
        }
        .into())
    }
}

/// Frames `payload` as a sealed message.
pub fn seal(payload: &[u8]) -> Vec<u8> {
    let mut message = Vec::with_capacity(MESSAGE_LEN_SIZE + payload.len() + CHECKSUM_SIZE);
    message.extend_from_slice(&(payload.len() as u32).to_le_bytes());
    message.extend_from_slice(payload);
    message.extend_from_slice(&checksum(payload).to_le_bytes());
    message
}

/// Writes `payload` as a sealed message.
pub fn write_message<W: Write>(payload: &[u8], writer: &mut W) -> std::io::Result<()> {
    writer.write_all(&(payload.len() as u32).to_le_bytes())?;
    writer.write_all(payload)?;
    writer.write_all(&checksum(payload).to_le_bytes())?;
    Ok(())
}

/// Checks the framing and checksum of a sealed message and returns its payload.
///
/// Bytes following the message are ignored.
pub fn unseal(message: &[u8]) -> Result<&[u8]> {
    let range = payload_range(message)?;
    Ok(&message[range])
}

/// Like [`unseal`], but returns the payload as a zero-copy slice of `message`.
pub fn unseal_bytes(message: &Bytes) -> Result<Bytes> {
    let range = payload_range(message)?;
    Ok(message.slice(range))
}

fn payload_range(message: &[u8]) -> Result<std::ops::Range<usize>> {
    verify_arg!(message, message.len() >= MESSAGE_LEN_SIZE + CHECKSUM_SIZE);
    let size = read_scalar::<u32>(message, 0)? as usize;
    verify_arg!(size, size <= message.len() - MESSAGE_LEN_SIZE - CHECKSUM_SIZE);
    let payload = MESSAGE_LEN_SIZE..MESSAGE_LEN_SIZE + size;
    let expected = read_scalar::<u32>(message, payload.end)?;
    validate_checksum(&message[payload.clone()], expected, "message")?;
    Ok(payload)
}

/// Reads a whole sealed message from `path` and returns its payload.
pub fn read_sealed(path: impl AsRef<std::path::Path>) -> Result<Bytes> {
    let path = path.as_ref();
    let data = std::fs::read(path)
        .map_err(|e| ettu_common::error::Error::io(path.display().to_string(), e))?;
    log::debug!("read {} bytes from {}", data.len(), path.display());
    unseal_bytes(&Bytes::from(data))
}

/// Writes `payload` to `path` as a sealed message, replacing the file.
pub fn write_sealed(path: impl AsRef<std::path::Path>, payload: &[u8]) -> Result<()> {
    let path = path.as_ref();
    let to_io_err =
        |e: std::io::Error| ettu_common::error::Error::io(path.display().to_string(), e);
    let mut file = std::io::BufWriter::new(std::fs::File::create(path).map_err(to_io_err)?);
    write_message(payload, &mut file).map_err(to_io_err)?;
    file.flush().map_err(to_io_err)?;
    log::debug!(
        "wrote sealed message of {} bytes to {}",
        payload.len(),
        path.display()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seal_unseal() {
        let payload = b"galaxy payload";
        let message = seal(payload);
        assert_eq!(message.len(), payload.len() + 8);
        assert_eq!(unseal(&message).unwrap(), payload);

        let mut written = Vec::new();
        write_message(payload, &mut written).unwrap();
        assert_eq!(written, message);

        let bytes = unseal_bytes(&Bytes::from(message)).unwrap();
        assert_eq!(bytes.as_ref(), payload);
    }

    #[test]
    fn test_empty_payload() {
        let message = seal(&[]);
        assert!(unseal(&message).unwrap().is_empty());
    }

    #[test]
    fn test_corruption_is_detected() {
        let message = seal(b"testdata");
        for i in MESSAGE_LEN_SIZE..message.len() {
            let mut corrupted = message.clone();
            corrupted[i] ^= 0x10;
            let err = unseal(&corrupted).unwrap_err();
            assert!(
                matches!(err.kind(), ErrorKind::ChecksumMismatch { .. }),
                "byte {i}"
            );
        }
    }

    #[test]
    fn test_bad_framing() {
        assert!(unseal(b"short").is_err());
        let mut message = seal(b"testdata");
        message[0] = 200;
        assert!(unseal(&message).is_err());
    }
}
