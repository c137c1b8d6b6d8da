//! Variable-width integer encoding shared by the writer and reader.
//!
//! The container format (see the crate root docs) asks for "variable-width
//! integers [that] use the top bit of each chunk as a continuation marker".
//! We realize that over bytes rather than 32-bit bit-packed chunks: each
//! byte carries 7 payload bits plus a continuation bit in the high bit,
//! the same shape as DWARF/protobuf LEB128. This keeps the reader and
//! writer simple while preserving the self-describing, skippable-block
//! behavior the rest of the container relies on.

/// Appends the VBR encoding of `value` to `out`.
pub fn write_vbr_u64(out: &mut Vec<u8>, mut value: u64) {
  loop {
    let byte = (value & 0x7f) as u8;
    value >>= 7;
    if value == 0 {
      out.push(byte);
      return;
    }
    out.push(byte | 0x80);
  }
}

pub fn write_vbr_u32(out: &mut Vec<u8>, value: u32) {
  write_vbr_u64(out, value as u64)
}

/// Reads a VBR-encoded value starting at `*pos`, advancing `*pos` past it.
pub fn read_vbr_u64(buf: &[u8], pos: &mut usize) -> Option<u64> {
  let mut result: u64 = 0;
  let mut shift = 0u32;
  loop {
    let byte = *buf.get(*pos)?;
    *pos += 1;
    result |= ((byte & 0x7f) as u64) << shift;
    if byte & 0x80 == 0 {
      return Some(result);
    }
    shift += 7;
    if shift >= 64 {
      return None;
    }
  }
}

pub fn read_vbr_u32(buf: &[u8], pos: &mut usize) -> Option<u32> {
  read_vbr_u64(buf, pos).and_then(|v| u32::try_from(v).ok())
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn round_trips_small_and_large_values() {
    for value in [0u64, 1, 127, 128, 300, u32::MAX as u64, u64::MAX] {
      let mut buf = Vec::new();
      write_vbr_u64(&mut buf, value);
      let mut pos = 0;
      assert_eq!(read_vbr_u64(&buf, &mut pos), Some(value));
      assert_eq!(pos, buf.len());
    }
  }

  #[test]
  fn truncated_stream_reads_as_none() {
    let mut buf = Vec::new();
    write_vbr_u64(&mut buf, 1_000_000);
    buf.pop();
    let mut pos = 0;
    assert_eq!(read_vbr_u64(&buf, &mut pos), None);
  }
}
