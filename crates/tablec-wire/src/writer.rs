use std::io::Write;

use crate::error::WireError;
use crate::value::{FieldTag, WireKind, WireValue};
use crate::{FORMAT_VERSION, MAGIC, MAX_BLOB_LEN, MAX_ENTITY_ID};

/// Streaming writer for the save format.
///
/// Callers drive the layout: header, entity section, then one chunk per
/// table. Counts are declared up front, so nothing is buffered beyond a
/// single value.
pub struct Writer<W: Write> {
    out: W,
    scratch: Vec<u8>,
}

impl<W: Write> Writer<W> {
    pub fn new(out: W) -> Self {
        Writer {
            out,
            scratch: Vec::new(),
        }
    }

    pub fn write_header(&mut self) -> Result<(), WireError> {
        self.out.write_all(&MAGIC)?;
        self.write_u32(FORMAT_VERSION)
    }

    pub fn write_entity_count(&mut self, count: usize) -> Result<(), WireError> {
        let count = u32::try_from(count).map_err(|_| WireError::CountOverflow {
            count,
            context: "entity",
        })?;
        self.write_u32(count)
    }

    pub fn write_entity_id(&mut self, id: u32) -> Result<(), WireError> {
        if id > MAX_ENTITY_ID {
            return Err(WireError::EntityIdOutOfRange(id));
        }
        self.write_u32(id)
    }

    /// Untagged value, used for the positional entity fields.
    pub fn write_value<T: WireValue>(&mut self, value: &T) -> Result<(), WireError> {
        self.write_payload(value)
    }

    /// Untagged array: `u16` count, then at most `bound` elements.
    pub fn write_array<T: WireValue>(&mut self, values: &[T], bound: usize) -> Result<(), WireError> {
        let count = array_count(values.len(), bound);
        self.write_u16(count as u16)?;
        for value in &values[..count] {
            self.write_payload(value)?;
        }
        Ok(())
    }

    pub fn begin_chunk(&mut self, table_key: u64, entries: usize) -> Result<(), WireError> {
        let entries = u32::try_from(entries).map_err(|_| WireError::CountOverflow {
            count: entries,
            context: "chunk entry",
        })?;
        self.write_u64(table_key)?;
        self.write_u32(entries)
    }

    pub fn begin_entry(&mut self, id: u32, fields: usize) -> Result<(), WireError> {
        let fields = u16::try_from(fields).map_err(|_| WireError::CountOverflow {
            count: fields,
            context: "entry field",
        })?;
        self.write_u32(id)?;
        self.write_u16(fields)
    }

    pub fn write_field<T: WireValue>(&mut self, key: u64, value: &T) -> Result<(), WireError> {
        self.write_u64(key)?;
        self.out.write_all(&[FieldTag::scalar(T::KIND).to_byte()])?;
        self.write_payload(value)
    }

    /// Keyed array field; the element count is bounded by `bound` and by `u16::MAX`.
    pub fn write_array_field<T: WireValue>(
        &mut self,
        key: u64,
        values: &[T],
        bound: usize,
    ) -> Result<(), WireError> {
        self.write_u64(key)?;
        self.out.write_all(&[FieldTag::array(T::KIND).to_byte()])?;
        self.write_array(values, bound)
    }

    /// Flush and hand back the underlying stream.
    pub fn finish(mut self) -> Result<W, WireError> {
        self.out.flush()?;
        Ok(self.out)
    }

    fn write_payload<T: WireValue>(&mut self, value: &T) -> Result<(), WireError> {
        self.scratch.clear();
        value.encode(&mut self.scratch);
        match T::KIND {
            WireKind::Fixed(width) => {
                if self.scratch.len() != width as usize {
                    return Err(WireError::Length {
                        expected: width as usize,
                        actual: self.scratch.len(),
                    });
                }
            }
            WireKind::Blob => {
                if self.scratch.len() > MAX_BLOB_LEN as usize {
                    return Err(WireError::BlobTooLarge(self.scratch.len()));
                }
                let len = self.scratch.len() as u32;
                self.out.write_all(&len.to_le_bytes())?;
            }
        }
        self.out.write_all(&self.scratch)?;
        Ok(())
    }

    fn write_u16(&mut self, v: u16) -> Result<(), WireError> {
        self.out.write_all(&v.to_le_bytes())?;
        Ok(())
    }

    fn write_u32(&mut self, v: u32) -> Result<(), WireError> {
        self.out.write_all(&v.to_le_bytes())?;
        Ok(())
    }

    fn write_u64(&mut self, v: u64) -> Result<(), WireError> {
        self.out.write_all(&v.to_le_bytes())?;
        Ok(())
    }
}

fn array_count(len: usize, bound: usize) -> usize {
    len.min(bound).min(u16::MAX as usize)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn written(f: impl FnOnce(&mut Writer<&mut Vec<u8>>) -> Result<(), WireError>) -> Vec<u8> {
        let mut buf = Vec::new();
        let mut writer = Writer::new(&mut buf);
        f(&mut writer).unwrap();
        writer.finish().unwrap();
        buf
    }

    #[test]
    fn header_is_magic_then_version() {
        let buf = written(|w| w.write_header());
        assert_eq!(&buf[..4], b"TBLC");
        assert_eq!(&buf[4..], &FORMAT_VERSION.to_le_bytes());
    }

    #[test]
    fn entity_id_above_limit_is_refused() {
        let mut buf = Vec::new();
        let mut writer = Writer::new(&mut buf);
        assert!(matches!(
            writer.write_entity_id(MAX_ENTITY_ID + 1),
            Err(WireError::EntityIdOutOfRange(_))
        ));
        writer.write_entity_id(MAX_ENTITY_ID).unwrap();
        drop(writer);
        assert_eq!(buf, MAX_ENTITY_ID.to_le_bytes());
    }

    #[test]
    fn scalar_field_layout() {
        let buf = written(|w| w.write_field(0x1122_3344_5566_7788, &7i32));
        assert_eq!(&buf[..8], &0x1122_3344_5566_7788u64.to_le_bytes());
        assert_eq!(buf[8], 0x04);
        assert_eq!(&buf[9..], &[7, 0, 0, 0]);
    }

    #[test]
    fn array_field_is_bounded() {
        let values = [1u8, 2, 3, 4, 5];
        let buf = written(|w| w.write_array_field(1, &values, 3));
        assert_eq!(buf[8], 0x81);
        assert_eq!(&buf[9..11], &3u16.to_le_bytes());
        assert_eq!(&buf[11..], &[1, 2, 3]);
    }

    #[test]
    fn blob_is_length_prefixed() {
        let buf = written(|w| w.write_value(&String::from("ab")));
        assert_eq!(buf, vec![2, 0, 0, 0, b'a', b'b']);
    }

    #[test]
    fn entry_header_layout() {
        let buf = written(|w| w.begin_entry(9, 2));
        assert_eq!(buf, vec![9, 0, 0, 0, 2, 0]);
    }

    #[test]
    fn too_many_fields_overflow() {
        let mut buf = Vec::new();
        let mut writer = Writer::new(&mut buf);
        assert!(matches!(
            writer.begin_entry(0, 70_000),
            Err(WireError::CountOverflow { .. })
        ));
    }

    struct Liar;

    impl WireValue for Liar {
        const KIND: WireKind = WireKind::Fixed(4);
        fn encode(&self, out: &mut Vec<u8>) {
            out.push(1);
        }
        fn decode(_: &[u8]) -> Result<Self, WireError> {
            Ok(Liar)
        }
    }

    #[test]
    fn fixed_width_mismatch_is_rejected() {
        let mut buf = Vec::new();
        let mut writer = Writer::new(&mut buf);
        assert!(matches!(
            writer.write_value(&Liar),
            Err(WireError::Length {
                expected: 4,
                actual: 1
            })
        ));
    }
}
