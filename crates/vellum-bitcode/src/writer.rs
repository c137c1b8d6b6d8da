use crate::varint::{write_vbr_u32, write_vbr_u64};

const TAG_ENTER_SUBBLOCK: u8 = 1;
const TAG_END_BLOCK: u8 = 2;
const TAG_UNABBREV_RECORD: u8 = 3;
const TAG_BLOB: u8 = 4;

/// A handle to a block opened with [`BitcodeWriter::enter_block`]; must be
/// passed to [`BitcodeWriter::end_block`] to backpatch its length field.
/// Blocks must be closed in LIFO order; dropping a handle without closing
/// it leaves a zero length field, which the reader would (correctly) refuse
/// to skip past.
#[must_use]
pub struct BlockHandle {
  len_field_pos: usize,
}

/// Incrementally builds a bit-granular container of the kind described in
/// the artifact layout: a 4-byte magic header followed by a stream of
/// enter-subblock / end-block / record entries, with each block's length
/// recorded up front so a reader can skip it without parsing its contents.
pub struct BitcodeWriter {
  buf: Vec<u8>,
}

impl BitcodeWriter {
  pub fn new(app_magic: [u8; 2]) -> Self {
    let mut buf = Vec::with_capacity(4096);
    buf.extend_from_slice(b"BC");
    buf.extend_from_slice(&app_magic);
    Self { buf }
  }

  fn align4(&mut self) {
    while self.buf.len() % 4 != 0 {
      self.buf.push(0);
    }
  }

  pub fn enter_block(&mut self, block_id: u32) -> BlockHandle {
    self.buf.push(TAG_ENTER_SUBBLOCK);
    write_vbr_u32(&mut self.buf, block_id);
    self.align4();
    let len_field_pos = self.buf.len();
    self.buf.extend_from_slice(&[0, 0, 0, 0]);
    BlockHandle { len_field_pos }
  }

  pub fn end_block(&mut self, handle: BlockHandle) {
    self.buf.push(TAG_END_BLOCK);
    self.align4();
    let content_len = (self.buf.len() - (handle.len_field_pos + 4)) as u32;
    self.buf[handle.len_field_pos..handle.len_field_pos + 4].copy_from_slice(&content_len.to_le_bytes());
  }

  /// Emits an unabbreviated record: a record code followed by a field count
  /// and the fields themselves, each VBR-encoded.
  pub fn emit_record(&mut self, code: u32, fields: &[u64]) {
    self.buf.push(TAG_UNABBREV_RECORD);
    write_vbr_u32(&mut self.buf, code);
    write_vbr_u32(&mut self.buf, fields.len() as u32);
    for field in fields {
      write_vbr_u64(&mut self.buf, *field);
    }
  }

  /// Emits a blob record: a record code, a byte length, and the raw bytes
  /// verbatim (used for string table entries, which would otherwise pay a
  /// VBR tax per byte for no benefit).
  pub fn emit_blob(&mut self, code: u32, bytes: &[u8]) {
    self.buf.push(TAG_BLOB);
    write_vbr_u32(&mut self.buf, code);
    write_vbr_u32(&mut self.buf, bytes.len() as u32);
    self.buf.extend_from_slice(bytes);
  }

  pub fn into_bytes(self) -> Vec<u8> {
    self.buf
  }

  pub fn len(&self) -> usize {
    self.buf.len()
  }
}
