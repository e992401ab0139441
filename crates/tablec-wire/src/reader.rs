use std::io::{ErrorKind, Read};

use crate::error::WireError;
use crate::value::{FieldTag, WireKind, WireValue};
use crate::{FORMAT_VERSION, MAGIC, MAX_BLOB_LEN, MAX_ENTITY_ID};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkHeader {
    pub key: u64,
    pub entries: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntryHeader {
    pub id: u32,
    pub fields: u16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldHeader {
    pub key: u64,
    pub tag: FieldTag,
}

/// Streaming reader for the save format.
///
/// Unknown fields and chunks can be skipped because every payload is
/// self-describing through its tag.
pub struct Reader<R: Read> {
    input: R,
    scratch: Vec<u8>,
    skipped_fields: u64,
    skipped_chunks: u64,
}

impl<R: Read> Reader<R> {
    pub fn new(input: R) -> Self {
        Reader {
            input,
            scratch: Vec::new(),
            skipped_fields: 0,
            skipped_chunks: 0,
        }
    }

    /// Verify magic and version. Any mismatch rejects the whole stream.
    pub fn read_header(&mut self) -> Result<(), WireError> {
        self.fill(4, "header magic")?;
        let mut found = [0u8; 4];
        found.copy_from_slice(&self.scratch);
        if found != MAGIC {
            return Err(WireError::BadMagic { found });
        }
        let version = self.read_u32("format version")?;
        if version != FORMAT_VERSION {
            return Err(WireError::UnsupportedVersion {
                found: version,
                expected: FORMAT_VERSION,
            });
        }
        Ok(())
    }

    pub fn read_entity_count(&mut self) -> Result<u32, WireError> {
        self.read_u32("entity count")
    }

    /// Entity id of the entities section, refused above [`MAX_ENTITY_ID`].
    pub fn read_entity_id(&mut self) -> Result<u32, WireError> {
        let id = self.read_u32("entity id")?;
        if id > MAX_ENTITY_ID {
            return Err(WireError::EntityIdOutOfRange(id));
        }
        Ok(id)
    }

    /// Untagged value written by `Writer::write_value`.
    pub fn read_value<T: WireValue>(&mut self) -> Result<T, WireError> {
        self.read_payload()
    }

    /// Untagged array written by `Writer::write_array`.
    ///
    /// Fills at most `dest.len()` elements; extra elements in the stream are
    /// consumed and dropped, missing ones leave `dest` untouched.
    pub fn read_array_into<T: WireValue>(&mut self, dest: &mut [T]) -> Result<(), WireError> {
        let count = self.read_u16("array count")? as usize;
        for i in 0..count {
            if i < dest.len() {
                dest[i] = self.read_payload()?;
            } else {
                self.skip_value(T::KIND)?;
            }
        }
        Ok(())
    }

    /// Next chunk header, or `None` at a clean end of stream.
    pub fn next_chunk(&mut self) -> Result<Option<ChunkHeader>, WireError> {
        let mut key = [0u8; 8];
        let mut filled = 0;
        while filled < key.len() {
            match self.input.read(&mut key[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }
        if filled == 0 {
            return Ok(None);
        }
        if filled < key.len() {
            return Err(WireError::Truncated {
                context: "chunk key",
            });
        }
        let entries = self.read_u32("chunk entry count")?;
        Ok(Some(ChunkHeader {
            key: u64::from_le_bytes(key),
            entries,
        }))
    }

    pub fn begin_entry(&mut self) -> Result<EntryHeader, WireError> {
        let id = self.read_u32("entry entity id")?;
        let fields = self.read_u16("entry field count")?;
        Ok(EntryHeader { id, fields })
    }

    pub fn read_field_header(&mut self) -> Result<FieldHeader, WireError> {
        let key = self.read_u64("field key")?;
        self.fill(1, "field tag")?;
        let tag = FieldTag::from_byte(self.scratch[0])?;
        Ok(FieldHeader { key, tag })
    }

    pub fn read_field<T: WireValue>(&mut self, field: &FieldHeader) -> Result<T, WireError> {
        expect_tag(field, FieldTag::scalar(T::KIND))?;
        self.read_payload()
    }

    pub fn read_array_field<T: WireValue>(
        &mut self,
        field: &FieldHeader,
        dest: &mut [T],
    ) -> Result<(), WireError> {
        expect_tag(field, FieldTag::array(T::KIND))?;
        self.read_array_into(dest)
    }

    /// Consume the payload of a field this reader does not know.
    pub fn skip_field(&mut self, field: &FieldHeader) -> Result<(), WireError> {
        tracing::debug!(key = format_args!("{:#018x}", field.key), "skipping unknown field");
        self.skipped_fields += 1;
        self.skip_payload(field.tag)
    }

    /// Consume every entry of a chunk whose table this reader does not know.
    pub fn skip_chunk(&mut self, chunk: &ChunkHeader) -> Result<(), WireError> {
        tracing::warn!(
            key = format_args!("{:#018x}", chunk.key),
            entries = chunk.entries,
            "skipping unknown table chunk"
        );
        self.skipped_chunks += 1;
        for _ in 0..chunk.entries {
            let entry = self.begin_entry()?;
            for _ in 0..entry.fields {
                let field = self.read_field_header()?;
                self.skip_payload(field.tag)?;
            }
        }
        Ok(())
    }

    pub fn skipped_fields(&self) -> u64 {
        self.skipped_fields
    }

    pub fn skipped_chunks(&self) -> u64 {
        self.skipped_chunks
    }

    pub fn into_inner(self) -> R {
        self.input
    }

    fn skip_payload(&mut self, tag: FieldTag) -> Result<(), WireError> {
        if tag.array {
            let count = self.read_u16("array count")?;
            for _ in 0..count {
                self.skip_value(tag.kind)?;
            }
            Ok(())
        } else {
            self.skip_value(tag.kind)
        }
    }

    fn skip_value(&mut self, kind: WireKind) -> Result<(), WireError> {
        match kind {
            WireKind::Fixed(width) => self.fill(width as usize, "skipped value"),
            WireKind::Blob => {
                let len = self.blob_len()?;
                self.fill(len, "skipped blob")
            }
        }
    }

    fn read_payload<T: WireValue>(&mut self) -> Result<T, WireError> {
        match T::KIND {
            WireKind::Fixed(width) => self.fill(width as usize, "value")?,
            WireKind::Blob => {
                let len = self.blob_len()?;
                self.fill(len, "blob")?;
            }
        }
        T::decode(&self.scratch)
    }

    fn blob_len(&mut self) -> Result<usize, WireError> {
        let len = self.read_u32("blob length")?;
        if len > MAX_BLOB_LEN {
            return Err(WireError::BlobTooLarge(len as usize));
        }
        Ok(len as usize)
    }

    /// Read exactly `n` bytes into the scratch buffer.
    fn fill(&mut self, n: usize, context: &'static str) -> Result<(), WireError> {
        self.scratch.clear();
        self.scratch.resize(n, 0);
        self.input.read_exact(&mut self.scratch).map_err(|e| {
            if e.kind() == ErrorKind::UnexpectedEof {
                WireError::Truncated { context }
            } else {
                WireError::Io(e)
            }
        })
    }

    fn read_u16(&mut self, context: &'static str) -> Result<u16, WireError> {
        self.fill(2, context)?;
        Ok(u16::from_le_bytes([self.scratch[0], self.scratch[1]]))
    }

    fn read_u32(&mut self, context: &'static str) -> Result<u32, WireError> {
        self.fill(4, context)?;
        let mut raw = [0u8; 4];
        raw.copy_from_slice(&self.scratch);
        Ok(u32::from_le_bytes(raw))
    }

    fn read_u64(&mut self, context: &'static str) -> Result<u64, WireError> {
        self.fill(8, context)?;
        let mut raw = [0u8; 8];
        raw.copy_from_slice(&self.scratch);
        Ok(u64::from_le_bytes(raw))
    }
}

fn expect_tag(field: &FieldHeader, expected: FieldTag) -> Result<(), WireError> {
    if field.tag == expected {
        Ok(())
    } else {
        Err(WireError::TagMismatch {
            key: field.key,
            found: field.tag.to_byte(),
            expected: expected.to_byte(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::writer::Writer;

    fn bytes(f: impl FnOnce(&mut Writer<&mut Vec<u8>>) -> Result<(), WireError>) -> Vec<u8> {
        let mut buf = Vec::new();
        let mut writer = Writer::new(&mut buf);
        f(&mut writer).unwrap();
        writer.finish().unwrap();
        buf
    }

    #[test]
    fn header_round_trip() {
        let buf = bytes(|w| w.write_header());
        let mut reader = Reader::new(buf.as_slice());
        reader.read_header().unwrap();
        assert!(reader.next_chunk().unwrap().is_none());
    }

    #[test]
    fn bad_magic_is_rejected() {
        let mut reader = Reader::new(&b"NOPE\x01\x00\x00\x00"[..]);
        assert!(matches!(
            reader.read_header(),
            Err(WireError::BadMagic { found }) if &found == b"NOPE"
        ));
    }

    #[test]
    fn version_mismatch_is_rejected() {
        let mut buf = MAGIC.to_vec();
        buf.extend_from_slice(&(FORMAT_VERSION + 1).to_le_bytes());
        let mut reader = Reader::new(buf.as_slice());
        assert!(matches!(
            reader.read_header(),
            Err(WireError::UnsupportedVersion { .. })
        ));
    }

    #[test]
    fn truncated_header_is_reported() {
        let mut reader = Reader::new(&b"TB"[..]);
        assert!(matches!(
            reader.read_header(),
            Err(WireError::Truncated { .. })
        ));
    }

    #[test]
    fn unknown_fields_are_skipped_in_place() {
        let buf = bytes(|w| {
            w.begin_chunk(10, 1)?;
            w.begin_entry(3, 4)?;
            w.write_field(1, &5u32)?;
            w.write_array_field(99, &[String::from("a"), String::from("bcd")], 8)?;
            w.write_field(98, &2.5f64)?;
            w.write_array_field(2, &[7u16, 8, 9], 3)
        });

        let mut reader = Reader::new(buf.as_slice());
        let chunk = reader.next_chunk().unwrap().unwrap();
        assert_eq!(chunk, ChunkHeader { key: 10, entries: 1 });
        let entry = reader.begin_entry().unwrap();
        assert_eq!(entry, EntryHeader { id: 3, fields: 4 });

        let mut known_scalar = 0u32;
        let mut known_array = [0u16; 3];
        for _ in 0..entry.fields {
            let field = reader.read_field_header().unwrap();
            match field.key {
                1 => known_scalar = reader.read_field(&field).unwrap(),
                2 => reader.read_array_field(&field, &mut known_array).unwrap(),
                _ => reader.skip_field(&field).unwrap(),
            }
        }
        assert_eq!(known_scalar, 5);
        assert_eq!(known_array, [7, 8, 9]);
        assert_eq!(reader.skipped_fields(), 2);
        assert!(reader.next_chunk().unwrap().is_none());
    }

    #[test]
    fn unknown_chunk_is_skipped_and_next_chunk_is_aligned() {
        let buf = bytes(|w| {
            w.begin_chunk(0xdead, 2)?;
            w.begin_entry(1, 1)?;
            w.write_field(5, &String::from("gone"))?;
            w.begin_entry(2, 0)?;
            w.begin_chunk(0xbeef, 1)?;
            w.begin_entry(7, 1)?;
            w.write_field(6, &true)
        });

        let mut reader = Reader::new(buf.as_slice());
        let unknown = reader.next_chunk().unwrap().unwrap();
        reader.skip_chunk(&unknown).unwrap();

        let known = reader.next_chunk().unwrap().unwrap();
        assert_eq!(known.key, 0xbeef);
        let entry = reader.begin_entry().unwrap();
        assert_eq!(entry.id, 7);
        let field = reader.read_field_header().unwrap();
        assert!(reader.read_field::<bool>(&field).unwrap());
        assert_eq!(reader.skipped_chunks(), 1);
    }

    #[test]
    fn tag_mismatch_is_an_error() {
        let buf = bytes(|w| w.write_field(1, &5u64));
        let mut reader = Reader::new(buf.as_slice());
        let field = reader.read_field_header().unwrap();
        assert!(matches!(
            reader.read_field::<u32>(&field),
            Err(WireError::TagMismatch {
                key: 1,
                found: 0x08,
                expected: 0x04
            })
        ));
    }

    #[test]
    fn longer_arrays_are_truncated_on_read() {
        let buf = bytes(|w| w.write_array(&[1i32, 2, 3, 4], 4));
        let mut reader = Reader::new(buf.as_slice());
        let mut dest = [0i32; 2];
        reader.read_array_into(&mut dest).unwrap();
        assert_eq!(dest, [1, 2]);
        assert!(reader.next_chunk().unwrap().is_none());
    }

    #[test]
    fn shorter_arrays_leave_the_rest_untouched() {
        let buf = bytes(|w| w.write_array(&[1i32], 1));
        let mut reader = Reader::new(buf.as_slice());
        let mut dest = [9i32; 3];
        reader.read_array_into(&mut dest).unwrap();
        assert_eq!(dest, [1, 9, 9]);
    }

    #[test]
    fn partial_chunk_key_is_truncation() {
        let mut reader = Reader::new(&[1u8, 2, 3][..]);
        assert!(matches!(
            reader.next_chunk(),
            Err(WireError::Truncated {
                context: "chunk key"
            })
        ));
    }

    #[test]
    fn entity_id_above_limit_is_rejected() {
        let mut buf = Vec::new();
        buf.extend_from_slice(&MAX_ENTITY_ID.to_le_bytes());
        buf.extend_from_slice(&(MAX_ENTITY_ID + 1).to_le_bytes());
        let mut reader = Reader::new(buf.as_slice());
        assert_eq!(reader.read_entity_id().unwrap(), MAX_ENTITY_ID);
        assert!(matches!(
            reader.read_entity_id(),
            Err(WireError::EntityIdOutOfRange(id)) if id == MAX_ENTITY_ID + 1
        ));
    }

    #[test]
    fn oversized_blob_is_rejected() {
        let mut buf = Vec::new();
        buf.extend_from_slice(&(MAX_BLOB_LEN + 1).to_le_bytes());
        let mut reader = Reader::new(buf.as_slice());
        assert!(matches!(
            reader.read_value::<String>(),
            Err(WireError::BlobTooLarge(_))
        ));
    }
}
