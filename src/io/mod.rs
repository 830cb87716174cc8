//! Transport seam between the drivers and the GPIB/VISA session.

use crate::{Error, Result};

#[cfg(feature = "hardware")]
pub mod visa;

/// Byte layout of a binary trace payload.
///
/// The Anritsu `FMC` output format is IEEE 754 single precision, most
/// significant byte first; some instruments ship doubles instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FloatFormat {
    F32,
    F64,
}

/// One open message-based session to an instrument.
///
/// Every operation is a blocking request/response round trip; the drivers
/// keep no state of their own beyond the session handle.
pub trait Transport {
    /// Send one ASCII command. No reply is expected.
    fn write(&mut self, cmd: &str) -> Result<()>;

    /// Send a command and read back one LF-terminated ASCII reply line,
    /// with the terminator stripped.
    fn query(&mut self, cmd: &str) -> Result<String>;

    /// Send a command and read back one binary reply message, including
    /// its IEEE 488.2 block framing.
    fn query_block(&mut self, cmd: &str) -> Result<Vec<u8>>;

    /// Send a command and parse the reply as comma-separated ASCII values.
    fn query_ascii(&mut self, cmd: &str) -> Result<Vec<f64>> {
        let reply = self.query(cmd)?;
        parse_ascii_values(&reply)
    }

    /// Send a command and decode the binary block reply as floats.
    fn query_binary(&mut self, cmd: &str, format: FloatFormat) -> Result<Vec<f64>> {
        let framed = self.query_block(cmd)?;
        decode_block(strip_block_header(&framed)?, format)
    }
}

pub(crate) fn parse_ascii_values(reply: &str) -> Result<Vec<f64>> {
    reply
        .split(',')
        .map(|field| field.trim().parse::<f64>().map_err(Error::from))
        .collect()
}

/// Validates `#<n><len>` (definite) or `#0` (indefinite) framing and returns
/// the payload.
pub(crate) fn strip_block_header(framed: &[u8]) -> Result<&[u8]> {
    if framed.first() != Some(&b'#') {
        return Err(Error::BlockFormat("missing '#' introducer"));
    }
    let digits = match framed.get(1) {
        // indefinite length: payload runs to the end of the message
        Some(b'0') => return Ok(&framed[2..]),
        Some(digit @ b'1'..=b'9') => (digit - b'0') as usize,
        _ => return Err(Error::BlockFormat("missing length digit count")),
    };
    let header_len = 2 + digits;
    let length_field = framed
        .get(2..header_len)
        .ok_or(Error::BlockFormat("truncated length field"))?;
    let mut payload_len = 0usize;
    for &byte in length_field {
        if !byte.is_ascii_digit() {
            return Err(Error::BlockFormat("length field is not numeric"));
        }
        payload_len = payload_len * 10 + (byte - b'0') as usize;
    }
    framed
        .get(header_len..header_len + payload_len)
        .ok_or(Error::BlockFormat("payload shorter than declared length"))
}

pub(crate) fn decode_block(payload: &[u8], format: FloatFormat) -> Result<Vec<f64>> {
    match format {
        FloatFormat::F32 => {
            if payload.len() % 4 != 0 {
                return Err(Error::BlockFormat("payload is not whole 32-bit floats"));
            }
            Ok(payload
                .chunks_exact(4)
                .map(|bytes| f32::from_be_bytes(bytes.try_into().unwrap()) as f64)
                .collect())
        }
        FloatFormat::F64 => {
            if payload.len() % 8 != 0 {
                return Err(Error::BlockFormat("payload is not whole 64-bit floats"));
            }
            Ok(payload
                .chunks_exact(8)
                .map(|bytes| f64::from_be_bytes(bytes.try_into().unwrap()))
                .collect())
        }
    }
}


#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_parse_ascii_values() {
        assert_eq!(parse_ascii_values("1.5,-2.5, 3e-3").unwrap(),
                   vec![1.5, -2.5, 3e-3]);
    }

    #[test]
    fn test_parse_ascii_values_garbage() {
        assert!(matches!(parse_ascii_values("1.5,volts").unwrap_err(),
                         crate::Error::Parse(_)));
    }

    #[test]
    fn test_strip_definite_block() {
        let framed = b"#216abcdefghijklmnop";
        assert_eq!(strip_block_header(framed).unwrap(), b"abcdefghijklmnop");
    }

    #[test]
    fn test_strip_definite_block_ignores_trailing_newline() {
        let framed = b"#14wxyz\n";
        assert_eq!(strip_block_header(framed).unwrap(), b"wxyz");
    }

    #[test]
    fn test_strip_indefinite_block() {
        let framed = b"#0wxyz";
        assert_eq!(strip_block_header(framed).unwrap(), b"wxyz");
    }

    #[test]
    fn test_strip_block_no_introducer() {
        assert!(matches!(strip_block_header(b"42"),
                         Err(crate::Error::BlockFormat(_))));
    }

    #[test]
    fn test_strip_block_short_payload() {
        assert!(matches!(strip_block_header(b"#18abc"),
                         Err(crate::Error::BlockFormat(_))));
    }

    #[test]
    fn test_decode_f32_block() {
        let payload: Vec<u8> = [1.0f32, 2.0, 3.0, 4.0]
            .iter()
            .flat_map(|value| value.to_be_bytes())
            .collect();
        assert_eq!(decode_block(&payload, FloatFormat::F32).unwrap(),
                   vec![1.0, 2.0, 3.0, 4.0]);
    }

    #[test]
    fn test_decode_f64_block() {
        let payload: Vec<u8> = [0.5f64, -0.25]
            .iter()
            .flat_map(|value| value.to_be_bytes())
            .collect();
        assert_eq!(decode_block(&payload, FloatFormat::F64).unwrap(),
                   vec![0.5, -0.25]);
    }

    #[test]
    fn test_decode_ragged_payload() {
        assert!(matches!(decode_block(&[0u8; 6], FloatFormat::F32),
                         Err(crate::Error::BlockFormat(_))));
    }
}
