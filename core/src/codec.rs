//! Variable-byte codec for posting lists.
//!
//! Every value is split into 7-bit groups written most-significant group
//! first. All groups but the last carry the continuation bit `0x80`, so a
//! byte with the high bit clear closes a value. Document IDs are stored
//! as-is (no delta coding).

use crate::{IndexError, Result};

const CONTINUATION: u8 = 0x80;
const PAYLOAD: u8 = 0x7f;

/// Appends the encoding of `value` to `out`.
pub fn encode_value(value: u32, out: &mut Vec<u8>) {
    let mut groups = [0u8; 5];
    let mut n = 0;
    let mut v = value;
    loop {
        groups[n] = (v as u8) & PAYLOAD;
        n += 1;
        v >>= 7;
        if v == 0 {
            break;
        }
    }
    for i in (1..n).rev() {
        out.push(groups[i] | CONTINUATION);
    }
    out.push(groups[0]);
}

pub fn encode_posting_list(postings: &[u32]) -> Vec<u8> {
    let mut out = Vec::with_capacity(postings.len() * 2);
    for &p in postings {
        encode_value(p, &mut out);
    }
    out
}

pub fn decode_posting_list(bytes: &[u8]) -> Result<Vec<u32>> {
    let mut out = Vec::with_capacity(bytes.len());
    let mut acc: u64 = 0;
    let mut pending = false;
    for &b in bytes {
        acc = (acc << 7) | u64::from(b & PAYLOAD);
        if acc > u64::from(u32::MAX) {
            return Err(IndexError::corrupt("posting value overflows u32"));
        }
        if b & CONTINUATION == 0 {
            out.push(acc as u32);
            acc = 0;
            pending = false;
        } else {
            pending = true;
        }
    }
    if pending {
        return Err(IndexError::corrupt("posting list ends inside a value"));
    }
    Ok(out)
}
