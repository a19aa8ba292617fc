//! Base64 VLQ digits as used by the `mappings` field of a v3 source map.

use crate::{Result, SourceMapError};

const BASE64_ALPHABET: &[u8; 64] =
    b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789+/";

const VLQ_BASE_SHIFT: u32 = 5;
const VLQ_BASE_MASK: u64 = (1 << VLQ_BASE_SHIFT) - 1;
const VLQ_CONTINUATION_BIT: u64 = 1 << VLQ_BASE_SHIFT;
const VLQ_MAX_SHIFT: u32 = 60;

fn base64_value(byte: u8) -> Option<u64> {
    let value = match byte {
        b'A'..=b'Z' => byte - b'A',
        b'a'..=b'z' => byte - b'a' + 26,
        b'0'..=b'9' => byte - b'0' + 52,
        b'+' => 62,
        b'/' => 63,
        _ => return None,
    };
    Some(u64::from(value))
}

/// Decode every VLQ value of one comma-free segment into `out`.
pub fn decode_segment(segment: &str, out: &mut Vec<i64>) -> Result<()> {
    out.clear();
    let mut accumulator: u64 = 0;
    let mut shift: u32 = 0;
    let mut in_value = false;

    for byte in segment.bytes() {
        let digit = base64_value(byte).ok_or_else(|| {
            SourceMapError::InvalidMappings(format!(
                "invalid base64 digit {:?} in segment {segment:?}",
                byte as char
            ))
        })?;
        if shift > VLQ_MAX_SHIFT {
            return Err(SourceMapError::InvalidMappings(format!(
                "VLQ value overflows in segment {segment:?}"
            )));
        }

        in_value = true;
        accumulator |= (digit & VLQ_BASE_MASK) << shift;
        if digit & VLQ_CONTINUATION_BIT != 0 {
            shift += VLQ_BASE_SHIFT;
            continue;
        }

        let magnitude = (accumulator >> 1) as i64;
        out.push(if accumulator & 1 == 1 {
            -magnitude
        } else {
            magnitude
        });
        accumulator = 0;
        shift = 0;
        in_value = false;
    }

    if in_value {
        return Err(SourceMapError::InvalidMappings(format!(
            "truncated VLQ value in segment {segment:?}"
        )));
    }
    Ok(())
}

/// Append the VLQ encoding of `value` to `out`.
pub fn encode_vlq(value: i64, out: &mut String) {
    let mut remaining: u64 = if value < 0 {
        (value.unsigned_abs() << 1) | 1
    } else {
        value.unsigned_abs() << 1
    };

    loop {
        let mut digit = remaining & VLQ_BASE_MASK;
        remaining >>= VLQ_BASE_SHIFT;
        if remaining > 0 {
            digit |= VLQ_CONTINUATION_BIT;
        }
        out.push(BASE64_ALPHABET[digit as usize] as char);
        if remaining == 0 {
            break;
        }
    }
}
