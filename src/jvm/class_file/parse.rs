use crate::jvm::Error;
use byteorder::{BigEndian, ReadBytesExt};
use std::io::{self, Read};

/// Counterpart of [`Serialize`](super::Serialize): read a construct back out of a class file
///
/// Lengths, tags, and endianness follow the same conventions as serialization, so that for
/// everything the rewriter understands, parsing then serializing reproduces the input bytes.
pub trait Parse: Sized {
    /// Parse construct from a binary input stream
    fn parse<R: ReadBytesExt>(reader: &mut R) -> Result<Self, Error>;
}

impl Parse for u8 {
    fn parse<R: ReadBytesExt>(reader: &mut R) -> Result<Self, Error> {
        Ok(reader.read_u8()?)
    }
}

impl Parse for u16 {
    fn parse<R: ReadBytesExt>(reader: &mut R) -> Result<Self, Error> {
        Ok(reader.read_u16::<BigEndian>()?)
    }
}

impl Parse for u32 {
    fn parse<R: ReadBytesExt>(reader: &mut R) -> Result<Self, Error> {
        Ok(reader.read_u32::<BigEndian>()?)
    }
}

impl Parse for u64 {
    fn parse<R: ReadBytesExt>(reader: &mut R) -> Result<Self, Error> {
        Ok(reader.read_u64::<BigEndian>()?)
    }
}

impl Parse for i8 {
    fn parse<R: ReadBytesExt>(reader: &mut R) -> Result<Self, Error> {
        Ok(reader.read_i8()?)
    }
}

impl Parse for i16 {
    fn parse<R: ReadBytesExt>(reader: &mut R) -> Result<Self, Error> {
        Ok(reader.read_i16::<BigEndian>()?)
    }
}

impl Parse for i32 {
    fn parse<R: ReadBytesExt>(reader: &mut R) -> Result<Self, Error> {
        Ok(reader.read_i32::<BigEndian>()?)
    }
}

impl Parse for i64 {
    fn parse<R: ReadBytesExt>(reader: &mut R) -> Result<Self, Error> {
        Ok(reader.read_i64::<BigEndian>()?)
    }
}

/// Size in `u16` is the first thing deserialized
impl<A: Parse> Parse for Vec<A> {
    fn parse<R: ReadBytesExt>(reader: &mut R) -> Result<Self, Error> {
        let len = u16::parse(reader)?;
        let mut elems = Vec::with_capacity(len as usize);
        for _ in 0..len {
            elems.push(A::parse(reader)?);
        }
        Ok(elems)
    }
}

/// Read exactly `len` raw bytes
///
/// `len` usually comes straight out of the input, so the buffer only grows as bytes actually
/// arrive.
pub fn read_bytes<R: ReadBytesExt>(reader: &mut R, len: usize) -> Result<Vec<u8>, Error> {
    let mut buffer = vec![];
    reader.by_ref().take(len as u64).read_to_end(&mut buffer)?;
    if buffer.len() != len {
        return Err(Error::IoError(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            format!("expected {} bytes, found {}", len, buffer.len()),
        )));
    }
    Ok(buffer)
}
