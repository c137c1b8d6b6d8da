use crate::{
  error::BitcodeError,
  varint::{read_vbr_u32, read_vbr_u64},
};

const TAG_ENTER_SUBBLOCK: u8 = 1;
const TAG_END_BLOCK: u8 = 2;
const TAG_UNABBREV_RECORD: u8 = 3;
const TAG_BLOB: u8 = 4;

/// One parsed entry from the bitcode stream.
#[derive(Debug)]
pub enum Entry {
  EnterSubblock { block_id: u32, len_bytes: u32 },
  EndBlock,
  Record { code: u32, fields: Vec<u64> },
  Blob { code: u32, bytes: Vec<u8> },
}

/// Reads the entries written by [`crate::writer::BitcodeWriter`] back out,
/// checking the header magic up front.
pub struct BitcodeReader<'a> {
  buf: &'a [u8],
  pos: usize,
}

impl<'a> BitcodeReader<'a> {
  pub fn new(buf: &'a [u8], app_magic: [u8; 2]) -> Result<Self, BitcodeError> {
    if buf.len() < 4 || &buf[0..2] != b"BC" || buf[2..4] != app_magic {
      return Err(BitcodeError::BadMagic);
    }
    Ok(Self { buf, pos: 4 })
  }

  pub fn at_end(&self) -> bool {
    self.pos >= self.buf.len()
  }

  fn align4(&mut self) {
    while self.pos % 4 != 0 {
      self.pos += 1;
    }
  }

  /// Reads the next entry, or `Ok(None)` at end of stream.
  pub fn next(&mut self) -> Result<Option<Entry>, BitcodeError> {
    if self.at_end() {
      return Ok(None);
    }
    let tag = self.buf[self.pos];
    self.pos += 1;
    match tag {
      TAG_ENTER_SUBBLOCK => {
        let block_id = read_vbr_u32(self.buf, &mut self.pos).ok_or(BitcodeError::TruncatedStream)?;
        self.align4();
        let len_bytes = self.read_u32_le()?;
        Ok(Some(Entry::EnterSubblock { block_id, len_bytes }))
      }
      TAG_END_BLOCK => {
        self.align4();
        Ok(Some(Entry::EndBlock))
      }
      TAG_UNABBREV_RECORD => {
        let code = read_vbr_u32(self.buf, &mut self.pos).ok_or(BitcodeError::TruncatedStream)?;
        let n = read_vbr_u32(self.buf, &mut self.pos).ok_or(BitcodeError::TruncatedStream)? as usize;
        let mut fields = Vec::with_capacity(n);
        for _ in 0..n {
          fields.push(read_vbr_u64(self.buf, &mut self.pos).ok_or(BitcodeError::TruncatedStream)?);
        }
        Ok(Some(Entry::Record { code, fields }))
      }
      TAG_BLOB => {
        let code = read_vbr_u32(self.buf, &mut self.pos).ok_or(BitcodeError::TruncatedStream)?;
        let len = read_vbr_u32(self.buf, &mut self.pos).ok_or(BitcodeError::TruncatedStream)? as usize;
        let end = self.pos.checked_add(len).ok_or(BitcodeError::TruncatedStream)?;
        if end > self.buf.len() {
          return Err(BitcodeError::TruncatedStream);
        }
        let bytes = self.buf[self.pos..end].to_vec();
        self.pos = end;
        Ok(Some(Entry::Blob { code, bytes }))
      }
      _ => Err(BitcodeError::CorruptAbbrev),
    }
  }

  fn read_u32_le(&mut self) -> Result<u32, BitcodeError> {
    let end = self.pos.checked_add(4).ok_or(BitcodeError::TruncatedStream)?;
    if end > self.buf.len() {
      return Err(BitcodeError::TruncatedStream);
    }
    let mut arr = [0u8; 4];
    arr.copy_from_slice(&self.buf[self.pos..end]);
    self.pos = end;
    Ok(u32::from_le_bytes(arr))
  }

  /// Skips past a block whose header (`len_bytes`) was just returned by
  /// [`Self::next`], without parsing its contents. Used by loaders that only
  /// care about a subset of the container's blocks.
  pub fn skip_block(&mut self, len_bytes: u32) -> Result<(), BitcodeError> {
    let end = self.pos.checked_add(len_bytes as usize).ok_or(BitcodeError::TruncatedStream)?;
    if end > self.buf.len() {
      return Err(BitcodeError::TruncatedStream);
    }
    self.pos = end;
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::writer::BitcodeWriter;

  #[test]
  fn round_trips_nested_blocks_and_records() {
    let mut w = BitcodeWriter::new(*b"TS");
    let outer = w.enter_block(10);
    w.emit_record(1, &[1, 2, 3]);
    let inner = w.enter_block(11);
    w.emit_blob(2, b"hello");
    w.end_block(inner);
    w.end_block(outer);
    let bytes = w.into_bytes();

    let mut r = BitcodeReader::new(&bytes, *b"TS").unwrap();
    match r.next().unwrap().unwrap() {
      Entry::EnterSubblock { block_id, .. } => assert_eq!(block_id, 10),
      other => panic!("unexpected {other:?}"),
    }
    match r.next().unwrap().unwrap() {
      Entry::Record { code, fields } => {
        assert_eq!(code, 1);
        assert_eq!(fields, vec![1, 2, 3]);
      }
      other => panic!("unexpected {other:?}"),
    }
    match r.next().unwrap().unwrap() {
      Entry::EnterSubblock { block_id, .. } => assert_eq!(block_id, 11),
      other => panic!("unexpected {other:?}"),
    }
    match r.next().unwrap().unwrap() {
      Entry::Blob { code, bytes } => {
        assert_eq!(code, 2);
        assert_eq!(bytes, b"hello");
      }
      other => panic!("unexpected {other:?}"),
    }
    assert!(matches!(r.next().unwrap().unwrap(), Entry::EndBlock));
    assert!(matches!(r.next().unwrap().unwrap(), Entry::EndBlock));
    assert!(r.next().unwrap().is_none());
  }

  #[test]
  fn skip_block_jumps_over_contents() {
    let mut w = BitcodeWriter::new(*b"TS");
    let inner = w.enter_block(1);
    for i in 0..50u64 {
      w.emit_record(1, &[i]);
    }
    w.end_block(inner);
    w.emit_record(2, &[42]);
    let bytes = w.into_bytes();

    let mut r = BitcodeReader::new(&bytes, *b"TS").unwrap();
    let len_bytes = match r.next().unwrap().unwrap() {
      Entry::EnterSubblock { len_bytes, .. } => len_bytes,
      other => panic!("unexpected {other:?}"),
    };
    r.skip_block(len_bytes).unwrap();
    match r.next().unwrap().unwrap() {
      Entry::Record { code, fields } => {
        assert_eq!(code, 2);
        assert_eq!(fields, vec![42]);
      }
      other => panic!("unexpected {other:?}"),
    }
  }

  #[test]
  fn bad_magic_is_rejected() {
    let bytes = b"XXXX".to_vec();
    assert_eq!(BitcodeReader::new(&bytes, *b"TS").unwrap_err(), BitcodeError::BadMagic);
  }
}
