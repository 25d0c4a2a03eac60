//! Minimal NBT writer.
//!
//! Just enough of the NBT wire format to emit Sponge `.schem` files: the
//! tag kinds the schematic compound uses, big-endian payload encoding,
//! and a gzipped root wrapper. Compounds keep insertion order so output
//! bytes are deterministic.

use byteorder::{BigEndian, WriteBytesExt};
use flate2::write::GzEncoder;
use flate2::Compression;
use std::io::{self, Write};

/// NBT tag ids, per the wire format.
mod id {
    pub const END: u8 = 0;
    pub const BYTE: u8 = 1;
    pub const SHORT: u8 = 2;
    pub const INT: u8 = 3;
    pub const BYTE_ARRAY: u8 = 7;
    pub const STRING: u8 = 8;
    pub const LIST: u8 = 9;
    pub const COMPOUND: u8 = 10;
    pub const INT_ARRAY: u8 = 11;
}

/// An NBT value.
#[derive(Debug, Clone, PartialEq)]
pub enum Tag {
    Byte(i8),
    Short(i16),
    Int(i32),
    ByteArray(Vec<i8>),
    String(String),
    /// Homogeneous list; the element type is taken from the first entry.
    List(Vec<Tag>),
    /// Ordered name → value pairs.
    Compound(Vec<(String, Tag)>),
    IntArray(Vec<i32>),
}

impl Tag {
    fn type_id(&self) -> u8 {
        match self {
            Tag::Byte(_) => id::BYTE,
            Tag::Short(_) => id::SHORT,
            Tag::Int(_) => id::INT,
            Tag::ByteArray(_) => id::BYTE_ARRAY,
            Tag::String(_) => id::STRING,
            Tag::List(_) => id::LIST,
            Tag::Compound(_) => id::COMPOUND,
            Tag::IntArray(_) => id::INT_ARRAY,
        }
    }

    fn write_payload<W: Write>(&self, w: &mut W) -> io::Result<()> {
        match self {
            Tag::Byte(v) => w.write_i8(*v),
            Tag::Short(v) => w.write_i16::<BigEndian>(*v),
            Tag::Int(v) => w.write_i32::<BigEndian>(*v),
            Tag::ByteArray(values) => {
                w.write_i32::<BigEndian>(values.len() as i32)?;
                for v in values {
                    w.write_i8(*v)?;
                }
                Ok(())
            }
            Tag::String(text) => write_string(w, text),
            Tag::List(items) => {
                let elem_id = items.first().map_or(id::END, Tag::type_id);
                w.write_u8(elem_id)?;
                w.write_i32::<BigEndian>(items.len() as i32)?;
                for item in items {
                    item.write_payload(w)?;
                }
                Ok(())
            }
            Tag::Compound(entries) => {
                for (name, tag) in entries {
                    w.write_u8(tag.type_id())?;
                    write_string(w, name)?;
                    tag.write_payload(w)?;
                }
                w.write_u8(id::END)
            }
            Tag::IntArray(values) => {
                w.write_i32::<BigEndian>(values.len() as i32)?;
                for v in values {
                    w.write_i32::<BigEndian>(*v)?;
                }
                Ok(())
            }
        }
    }
}

fn write_string<W: Write>(w: &mut W, text: &str) -> io::Result<()> {
    w.write_u16::<BigEndian>(text.len() as u16)?;
    w.write_all(text.as_bytes())
}

/// Write a gzipped NBT file whose unnamed root compound holds `root`.
pub fn write_gzipped_root<W: Write>(writer: W, root: &Tag) -> io::Result<()> {
    let mut encoder = GzEncoder::new(writer, Compression::default());
    encoder.write_u8(id::COMPOUND)?;
    write_string(&mut encoder, "")?;
    root.write_payload(&mut encoder)?;
    encoder.finish()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::read::GzDecoder;
    use std::io::Read;

    fn payload_bytes(tag: &Tag) -> Vec<u8> {
        let mut bytes = Vec::new();
        tag.write_payload(&mut bytes).unwrap();
        bytes
    }

    #[test]
    fn test_scalar_payloads_are_big_endian() {
        assert_eq!(payload_bytes(&Tag::Short(0x0102)), vec![0x01, 0x02]);
        assert_eq!(
            payload_bytes(&Tag::Int(0x01020304)),
            vec![0x01, 0x02, 0x03, 0x04]
        );
    }

    #[test]
    fn test_string_payload() {
        assert_eq!(
            payload_bytes(&Tag::String("ab".to_string())),
            vec![0x00, 0x02, b'a', b'b']
        );
    }

    #[test]
    fn test_compound_payload_terminates_with_end() {
        let tag = Tag::Compound(vec![("V".to_string(), Tag::Byte(3))]);
        assert_eq!(
            payload_bytes(&tag),
            vec![1, 0x00, 0x01, b'V', 3, 0] // Byte tag, name "V", value, End
        );
    }

    #[test]
    fn test_empty_list_uses_end_element_type() {
        assert_eq!(payload_bytes(&Tag::List(vec![])), vec![0, 0, 0, 0, 0]);
    }

    #[test]
    fn test_list_of_compounds() {
        let tag = Tag::List(vec![Tag::Compound(vec![])]);
        // element id 10, length 1, one empty compound (just End)
        assert_eq!(payload_bytes(&tag), vec![10, 0, 0, 0, 1, 0]);
    }

    #[test]
    fn test_gzipped_root_round_trip() {
        let root = Tag::Compound(vec![("N".to_string(), Tag::Int(7))]);
        let mut file = Vec::new();
        write_gzipped_root(&mut file, &root).unwrap();

        let mut decoded = Vec::new();
        GzDecoder::new(&file[..]).read_to_end(&mut decoded).unwrap();
        // Root header: compound id, empty name.
        assert_eq!(&decoded[..3], &[10, 0, 0]);
        assert_eq!(decoded.last(), Some(&0));
    }
}
