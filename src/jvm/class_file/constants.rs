use crate::jvm::class_file::{read_bytes, Attribute, AttributeLike, Parse, Serialize};
use crate::jvm::Error;
use crate::util::{Offset, OffsetVec, Width};
use byteorder::{ReadBytesExt, WriteBytesExt};
use std::borrow::{Borrow, Cow};
use std::collections::HashMap;

/// Class file constants pool
///
/// The pool is read in its entirety from an existing class file and can then be extended, but
/// never reordered: existing indices stay valid for the lifetime of the pool. Insertions go
/// through the `get_*` methods, which reuse an existing equal constant whenever there is one.
pub struct ConstantsPool {
    constants: OffsetVec<Constant>,

    utf8s: HashMap<String, Utf8ConstantIndex>,
    strings: HashMap<Utf8ConstantIndex, StringConstantIndex>,
    classes: HashMap<Utf8ConstantIndex, ClassConstantIndex>,
    name_and_types: HashMap<(Utf8ConstantIndex, Utf8ConstantIndex), NameAndTypeConstantIndex>,
    methodrefs: HashMap<(ClassConstantIndex, NameAndTypeConstantIndex, bool), MethodRefConstantIndex>,
}

impl ConstantsPool {
    /// Make a fresh empty constants pool
    pub fn new() -> ConstantsPool {
        ConstantsPool {
            constants: OffsetVec::new_starting_at(Offset(1)),
            utf8s: HashMap::new(),
            strings: HashMap::new(),
            classes: HashMap::new(),
            name_and_types: HashMap::new(),
            methodrefs: HashMap::new(),
        }
    }

    /// Number of constants in the pool (not the same as the largest index)
    pub fn len(&self) -> usize {
        self.constants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.constants.is_empty()
    }

    /// Push a constant into the constant pool, provided there is space for it
    ///
    /// Note: the largest valid index is 65535, indexing starts at 1, and some constants take two
    /// spaces.
    fn push_constant(&mut self, constant: Constant) -> Result<ConstantIndex, Error> {
        let offset = self.constants.offset_len().0;
        if offset + constant.width() > u16::MAX as usize {
            return Err(Error::ConstantPoolOverflow {
                constant,
                offset: offset as u16,
            });
        }

        let idx = ConstantIndex(offset as u16);
        self.index_constant(idx, &constant);
        self.constants.push(constant);
        Ok(idx)
    }

    /// Remember a constant for deduplication (first occurrence wins)
    fn index_constant(&mut self, idx: ConstantIndex, constant: &Constant) {
        match constant {
            Constant::Utf8(string) => {
                self.utf8s
                    .entry(string.clone())
                    .or_insert(Utf8ConstantIndex(idx));
            }
            Constant::String(utf8) => {
                self.strings
                    .entry(*utf8)
                    .or_insert(StringConstantIndex(idx));
            }
            Constant::Class(utf8) => {
                self.classes
                    .entry(*utf8)
                    .or_insert(ClassConstantIndex(idx));
            }
            Constant::NameAndType { name, descriptor } => {
                self.name_and_types
                    .entry((*name, *descriptor))
                    .or_insert(NameAndTypeConstantIndex(idx));
            }
            Constant::MethodRef {
                class,
                name_and_type,
                is_interface,
            } => {
                self.methodrefs
                    .entry((*class, *name_and_type, *is_interface))
                    .or_insert(MethodRefConstantIndex(idx));
            }
            _ => (),
        }
    }

    /// Look up a constant by index
    pub fn lookup(&self, idx: ConstantIndex) -> Result<&Constant, Error> {
        self.constants
            .get_offset(Offset(idx.0 as usize))
            .ok_or(Error::InvalidConstantIndex(idx))
    }

    /// Look up a `CONSTANT_Utf8_info`
    pub fn lookup_utf8(&self, idx: Utf8ConstantIndex) -> Result<&str, Error> {
        match self.lookup(idx.0)? {
            Constant::Utf8(string) => Ok(string),
            _ => Err(Error::UnexpectedConstant {
                index: idx.0,
                expected: "Utf8",
            }),
        }
    }

    /// Look up the internal name of a `CONSTANT_Class_info` (eg. `java/lang/Object`)
    pub fn lookup_class_name(&self, idx: ClassConstantIndex) -> Result<&str, Error> {
        match self.lookup(idx.0)? {
            Constant::Class(name) => self.lookup_utf8(*name),
            _ => Err(Error::UnexpectedConstant {
                index: idx.0,
                expected: "Class",
            }),
        }
    }

    /// Look up the name and descriptor of a `CONSTANT_NameAndType_info`
    pub fn lookup_name_and_type(
        &self,
        idx: NameAndTypeConstantIndex,
    ) -> Result<(&str, &str), Error> {
        match self.lookup(idx.0)? {
            Constant::NameAndType { name, descriptor } => {
                Ok((self.lookup_utf8(*name)?, self.lookup_utf8(*descriptor)?))
            }
            _ => Err(Error::UnexpectedConstant {
                index: idx.0,
                expected: "NameAndType",
            }),
        }
    }

    /// Look up the descriptor of the member referenced by a field, method, or dynamic constant
    ///
    /// This covers everything a `getfield`, `invoke*`, or `ldc` of a dynamic constant can point
    /// to, which is all the stack analysis needs to know about the member.
    pub fn lookup_member_descriptor(&self, idx: ConstantIndex) -> Result<&str, Error> {
        match self.lookup(idx)? {
            Constant::FieldRef(_, name_and_type)
            | Constant::MethodRef { name_and_type, .. }
            | Constant::Dynamic {
                name_and_type, ..
            }
            | Constant::InvokeDynamic {
                method_descriptor: name_and_type,
                ..
            } => Ok(self.lookup_name_and_type(*name_and_type)?.1),
            _ => Err(Error::UnexpectedConstant {
                index: idx,
                expected: "member reference",
            }),
        }
    }

    /// Get or insert a utf8 constant from the constant pool
    pub fn get_utf8<'a, S: Into<Cow<'a, str>>>(
        &mut self,
        utf8: S,
    ) -> Result<Utf8ConstantIndex, Error> {
        let cow = utf8.into();

        if let Some(idx) = self.utf8s.get::<str>(cow.borrow()) {
            Ok(*idx)
        } else {
            let constant = Constant::Utf8(cow.into_owned());
            Ok(Utf8ConstantIndex(self.push_constant(constant)?))
        }
    }

    /// Get or insert a string constant from the constant pool
    pub fn get_string<'a, S: Into<Cow<'a, str>>>(
        &mut self,
        string: S,
    ) -> Result<StringConstantIndex, Error> {
        let utf8 = self.get_utf8(string)?;
        if let Some(idx) = self.strings.get(&utf8) {
            Ok(*idx)
        } else {
            let constant = Constant::String(utf8);
            Ok(StringConstantIndex(self.push_constant(constant)?))
        }
    }

    /// Get or insert a class constant from the constant pool
    pub fn get_class<'a, S: Into<Cow<'a, str>>>(
        &mut self,
        internal_name: S,
    ) -> Result<ClassConstantIndex, Error> {
        let utf8 = self.get_utf8(internal_name)?;
        if let Some(idx) = self.classes.get(&utf8) {
            Ok(*idx)
        } else {
            let constant = Constant::Class(utf8);
            Ok(ClassConstantIndex(self.push_constant(constant)?))
        }
    }

    /// Get or insert a name & type constant from the constant pool
    pub fn get_name_and_type(
        &mut self,
        name: Utf8ConstantIndex,
        descriptor: Utf8ConstantIndex,
    ) -> Result<NameAndTypeConstantIndex, Error> {
        let name_and_type_key = (name, descriptor);
        if let Some(idx) = self.name_and_types.get(&name_and_type_key) {
            Ok(*idx)
        } else {
            let constant = Constant::NameAndType { name, descriptor };
            Ok(NameAndTypeConstantIndex(self.push_constant(constant)?))
        }
    }

    /// Get or insert a `CONSTANT_Methodref_info` for a method on a (non-interface) class
    pub fn get_method_ref(
        &mut self,
        class_name: &str,
        method_name: &str,
        descriptor: &str,
    ) -> Result<MethodRefConstantIndex, Error> {
        let class = self.get_class(class_name)?;
        let name = self.get_utf8(method_name)?;
        let descriptor = self.get_utf8(descriptor)?;
        let name_and_type = self.get_name_and_type(name, descriptor)?;

        let method_ref_key = (class, name_and_type, false);
        if let Some(idx) = self.methodrefs.get(&method_ref_key) {
            Ok(*idx)
        } else {
            let constant = Constant::MethodRef {
                class,
                name_and_type,
                is_interface: false,
            };
            Ok(MethodRefConstantIndex(self.push_constant(constant)?))
        }
    }

    /// Add an attribute to the constant pool
    pub fn get_attribute<A: AttributeLike>(&mut self, attribute: &A) -> Result<Attribute, Error> {
        let name_index = self.get_utf8(A::NAME)?;
        let mut info = vec![];
        attribute.serialize(&mut info)?;
        Ok(Attribute { name_index, info })
    }
}

impl Default for ConstantsPool {
    fn default() -> Self {
        ConstantsPool::new()
    }
}

impl std::fmt::Debug for ConstantsPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Debug::fmt(&self.constants, f)
    }
}

/// The count written out is one more than the largest index, since indexing starts at 1
impl Serialize for ConstantsPool {
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> std::io::Result<()> {
        (self.constants.offset_len().0 as u16).serialize(writer)?;
        for (_, _, constant) in &self.constants {
            constant.serialize(writer)?;
        }
        Ok(())
    }
}

impl Parse for ConstantsPool {
    fn parse<R: ReadBytesExt>(reader: &mut R) -> Result<Self, Error> {
        let count = u16::parse(reader)? as usize;
        let mut pool = ConstantsPool::new();
        while pool.constants.offset_len().0 < count {
            let index = pool.constants.offset_len().0 as u16;
            let constant = Constant::parse_at(reader, index)?;
            pool.push_constant(constant)?;
        }
        Ok(pool)
    }
}

/// Constants as in the constant pool
///
/// [0]: https://docs.oracle.com/javase/specs/jvms/se17/html/jvms-4.html#jvms-4.4
#[derive(Debug, Clone)]
pub enum Constant {
    /// Class or an interface
    Class(Utf8ConstantIndex),

    /// Field
    FieldRef(ClassConstantIndex, NameAndTypeConstantIndex),

    /// Method (this combines `Methodref` and `InterfaceMethodref`)
    MethodRef {
        class: ClassConstantIndex,
        name_and_type: NameAndTypeConstantIndex,
        is_interface: bool,
    },

    /// Constant object of type `java.lang.String`
    String(Utf8ConstantIndex),

    /// Constant primitive of type `int`
    Integer(i32),

    /// Constant primitive of type `float`, kept as raw bits so NaN payloads survive
    Float(u32),

    /// Constant primitive of type `long`
    Long(i64),

    /// Constant primitive of type `double`, kept as raw bits so NaN payloads survive
    Double(u64),

    /// Name and a type (eg. for a field or a method)
    NameAndType {
        name: Utf8ConstantIndex,
        descriptor: Utf8ConstantIndex,
    },

    /// Constant UTF-8 encoded raw string value
    ///
    /// Despite the name, the encoding is not quite UTF-8 (the encoding of the
    /// null character `\u{0000}` and the encoding of supplementary characters
    /// is different).
    Utf8(String),

    /// Constant object of type `java.lang.invoke.MethodHandle`
    MethodHandle {
        reference_kind: u8,
        member: ConstantIndex,
    },

    /// Method type
    MethodType { descriptor: Utf8ConstantIndex },

    /// Dynamically-computed constant
    Dynamic {
        /// Index into the `BootstrapMethods` attribute
        bootstrap_method: u16,
        name_and_type: NameAndTypeConstantIndex,
    },

    /// Dynamically-computed call site
    InvokeDynamic {
        /// Index into the `BootstrapMethods` attribute
        bootstrap_method: u16,
        method_descriptor: NameAndTypeConstantIndex,
    },

    Module(Utf8ConstantIndex),
    Package(Utf8ConstantIndex),
}

impl Constant {
    /// Read one constant, whose eventual index is only used for error reporting
    fn parse_at<R: ReadBytesExt>(reader: &mut R, index: u16) -> Result<Constant, Error> {
        let constant = match u8::parse(reader)? {
            1 => {
                let len = u16::parse(reader)? as usize;
                let bytes = read_bytes(reader, len)?;
                Constant::Utf8(decode_modified_utf8(&bytes)?)
            }
            3 => Constant::Integer(i32::parse(reader)?),
            4 => Constant::Float(u32::parse(reader)?),
            5 => Constant::Long(i64::parse(reader)?),
            6 => Constant::Double(u64::parse(reader)?),
            7 => Constant::Class(Utf8ConstantIndex::parse(reader)?),
            8 => Constant::String(Utf8ConstantIndex::parse(reader)?),
            9 => Constant::FieldRef(
                ClassConstantIndex::parse(reader)?,
                NameAndTypeConstantIndex::parse(reader)?,
            ),
            tag @ (10 | 11) => Constant::MethodRef {
                class: ClassConstantIndex::parse(reader)?,
                name_and_type: NameAndTypeConstantIndex::parse(reader)?,
                is_interface: tag == 11,
            },
            12 => Constant::NameAndType {
                name: Utf8ConstantIndex::parse(reader)?,
                descriptor: Utf8ConstantIndex::parse(reader)?,
            },
            15 => Constant::MethodHandle {
                reference_kind: u8::parse(reader)?,
                member: ConstantIndex::parse(reader)?,
            },
            16 => Constant::MethodType {
                descriptor: Utf8ConstantIndex::parse(reader)?,
            },
            17 => Constant::Dynamic {
                bootstrap_method: u16::parse(reader)?,
                name_and_type: NameAndTypeConstantIndex::parse(reader)?,
            },
            18 => Constant::InvokeDynamic {
                bootstrap_method: u16::parse(reader)?,
                method_descriptor: NameAndTypeConstantIndex::parse(reader)?,
            },
            19 => Constant::Module(Utf8ConstantIndex::parse(reader)?),
            20 => Constant::Package(Utf8ConstantIndex::parse(reader)?),
            tag => return Err(Error::UnknownConstantTag { tag, index }),
        };
        Ok(constant)
    }
}

impl Serialize for Constant {
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> std::io::Result<()> {
        match self {
            Constant::Utf8(string) => {
                1u8.serialize(writer)?;
                let buffer: Vec<u8> = encode_modified_utf8(string);
                (buffer.len() as u16).serialize(writer)?;
                writer.write_all(&buffer)?;
            }
            Constant::Integer(integer) => {
                3u8.serialize(writer)?;
                integer.serialize(writer)?;
            }
            Constant::Float(bits) => {
                4u8.serialize(writer)?;
                bits.serialize(writer)?;
            }
            Constant::Long(long) => {
                5u8.serialize(writer)?;
                long.serialize(writer)?;
            }
            Constant::Double(bits) => {
                6u8.serialize(writer)?;
                bits.serialize(writer)?;
            }
            Constant::Class(name) => {
                7u8.serialize(writer)?;
                name.serialize(writer)?;
            }
            Constant::String(bytes) => {
                8u8.serialize(writer)?;
                bytes.serialize(writer)?;
            }
            Constant::FieldRef(class, name_and_type) => {
                9u8.serialize(writer)?;
                class.serialize(writer)?;
                name_and_type.serialize(writer)?;
            }
            Constant::MethodRef {
                class,
                name_and_type,
                is_interface,
            } => {
                (if !is_interface { 10u8 } else { 11u8 }).serialize(writer)?;
                class.serialize(writer)?;
                name_and_type.serialize(writer)?;
            }
            Constant::NameAndType { name, descriptor } => {
                12u8.serialize(writer)?;
                name.serialize(writer)?;
                descriptor.serialize(writer)?;
            }
            Constant::MethodHandle {
                reference_kind,
                member,
            } => {
                15u8.serialize(writer)?;
                reference_kind.serialize(writer)?;
                member.serialize(writer)?;
            }
            Constant::MethodType { descriptor } => {
                16u8.serialize(writer)?;
                descriptor.serialize(writer)?;
            }
            Constant::Dynamic {
                bootstrap_method,
                name_and_type,
            } => {
                17u8.serialize(writer)?;
                bootstrap_method.serialize(writer)?;
                name_and_type.serialize(writer)?;
            }
            Constant::InvokeDynamic {
                bootstrap_method,
                method_descriptor,
            } => {
                18u8.serialize(writer)?;
                bootstrap_method.serialize(writer)?;
                method_descriptor.serialize(writer)?;
            }
            Constant::Module(name) => {
                19u8.serialize(writer)?;
                name.serialize(writer)?;
            }
            Constant::Package(name) => {
                20u8.serialize(writer)?;
                name.serialize(writer)?;
            }
        };
        Ok(())
    }
}

/// Almost all constants have width 1, except for `Constant::Long` and `Constant::Double`. Quoting
/// the spec:
///
/// > All 8-byte constants take up two entries in the constant_pool table of the class file. If a
/// > CONSTANT_Long_info or CONSTANT_Double_info structure is the item in the constant_pool table
/// > at index n, then the next usable item in the pool is located at index n+2.
impl Width for Constant {
    fn width(&self) -> usize {
        match self {
            Constant::Long(_) | Constant::Double(_) => 2,
            _ => 1,
        }
    }
}

/// Modified UTF-8 format used in class files.
///
/// See [this `DataInput` section for details][0]:
///
///   * the null byte `\u0000` is encoded in 2-byte format rather than 1-byte
///   * only the 1-byte, 2-byte, and 3-byte formats are used
///   * supplementary characters are represented in the form of surrogate pairs
///
/// [0]: https://docs.oracle.com/en/java/javase/17/docs/api/java.base/java/io/DataInput.html#modified-utf-8
pub fn encode_modified_utf8(string: &str) -> Vec<u8> {
    let mut buffer: Vec<u8> = Vec::with_capacity(string.len());
    let mut units = [0u16; 2];
    for c in string.chars() {
        for unit in c.encode_utf16(&mut units).iter().map(|u| *u as u32) {
            match unit {
                0x0001..=0x007F => buffer.push(unit as u8),
                0x0000 | 0x0080..=0x07FF => {
                    buffer.push((unit >> 6 & 0x1F) as u8 | 0b1100_0000);
                    buffer.push((unit & 0x3F) as u8 | 0b1000_0000);
                }
                _ => {
                    buffer.push((unit >> 12 & 0x0F) as u8 | 0b1110_0000);
                    buffer.push((unit >> 6 & 0x3F) as u8 | 0b1000_0000);
                    buffer.push((unit & 0x3F) as u8 | 0b1000_0000);
                }
            }
        }
    }
    buffer
}

/// Inverse of [`encode_modified_utf8`]
///
/// Only the canonical encodings produced by `encode_modified_utf8` are accepted, which makes the
/// round trip exact. Unpaired surrogates can't be represented in a Rust `String`, so they are
/// rejected too.
pub fn decode_modified_utf8(bytes: &[u8]) -> Result<String, Error> {
    let malformed = || Error::MalformedUtf8(bytes.to_vec());

    let mut units: Vec<u16> = Vec::with_capacity(bytes.len());
    let mut iter = bytes.iter().copied();
    while let Some(a) = iter.next() {
        let mut continuation = || match iter.next() {
            Some(b) if b & 0b1100_0000 == 0b1000_0000 => Ok((b & 0x3F) as u16),
            _ => Err(malformed()),
        };
        let unit: u16 = match a {
            0x01..=0x7F => a as u16,
            0xC0..=0xDF => {
                let unit = ((a & 0x1F) as u16) << 6 | continuation()?;
                if unit != 0 && unit < 0x80 {
                    return Err(malformed());
                }
                unit
            }
            0xE0..=0xEF => {
                let high = continuation()?;
                let low = continuation()?;
                let unit = ((a & 0x0F) as u16) << 12 | high << 6 | low;
                if unit < 0x800 {
                    return Err(malformed());
                }
                unit
            }
            _ => return Err(malformed()),
        };
        units.push(unit);
    }

    String::from_utf16(&units).map_err(|_| malformed())
}

#[cfg(test)]
mod modified_utf8_tests {
    use super::*;

    #[test]
    fn containing_null_byte() {
        assert_eq!(encode_modified_utf8("a\x00a"), vec![97, 192, 128, 97]);
        assert_eq!(decode_modified_utf8(&[97, 192, 128, 97]).unwrap(), "a\x00a");
    }

    #[test]
    fn simple_ascii() {
        assert_eq!(encode_modified_utf8("foo"), vec![102, 111, 111]);
        assert_eq!(decode_modified_utf8(b"a.b.C::run").unwrap(), "a.b.C::run");
    }

    #[test]
    fn two_and_three_byte_encodings() {
        let bytes = encode_modified_utf8("ĄǍऄअ");
        assert_eq!(bytes, vec![196, 132, 199, 141, 224, 164, 132, 224, 164, 133]);
        assert_eq!(decode_modified_utf8(&bytes).unwrap(), "ĄǍऄअ");
    }

    #[test]
    fn supplementary_characters() {
        let bytes = encode_modified_utf8("\u{10000}\u{10FFFF}");
        assert_eq!(
            bytes,
            vec![237, 160, 128, 237, 176, 128, 237, 175, 191, 237, 191, 191]
        );
        assert_eq!(decode_modified_utf8(&bytes).unwrap(), "\u{10000}\u{10FFFF}");
    }

    #[test]
    fn rejects_non_canonical_input() {
        // raw NUL, overlong `/`, lone surrogate, truncated sequence
        assert!(decode_modified_utf8(&[0]).is_err());
        assert!(decode_modified_utf8(&[0xC0, 0xAF]).is_err());
        assert!(decode_modified_utf8(&[237, 160, 128]).is_err());
        assert!(decode_modified_utf8(&[0xE4, 0xB8]).is_err());
    }
}

#[cfg(test)]
mod pool_tests {
    use super::*;

    #[test]
    fn insertions_are_deduplicated() {
        let mut pool = ConstantsPool::new();
        let utf8 = pool.get_utf8("hello").unwrap();
        assert_eq!(utf8, Utf8ConstantIndex(ConstantIndex(1)));
        assert_eq!(pool.get_utf8("hello").unwrap(), utf8);

        let string = pool.get_string("hello").unwrap();
        assert_eq!(string, StringConstantIndex(ConstantIndex(2)));
        assert_eq!(pool.get_string(String::from("hello")).unwrap(), string);

        let method = pool
            .get_method_ref("a/B", "report", "(Ljava/lang/String;)V")
            .unwrap();
        assert_eq!(
            pool.get_method_ref("a/B", "report", "(Ljava/lang/String;)V")
                .unwrap(),
            method
        );
        assert_eq!(
            pool.lookup_member_descriptor(method.0).unwrap(),
            "(Ljava/lang/String;)V"
        );
    }

    #[test]
    fn parse_keeps_indices_and_wide_slots() {
        let mut bytes = vec![];
        5u16.serialize(&mut bytes).unwrap(); // count = 1 + 4 slots
        Constant::Long(7).serialize(&mut bytes).unwrap();
        Constant::Utf8(String::from("x")).serialize(&mut bytes).unwrap();
        Constant::Class(Utf8ConstantIndex(ConstantIndex(3)))
            .serialize(&mut bytes)
            .unwrap();

        let pool = ConstantsPool::parse(&mut bytes.as_slice()).unwrap();
        assert_eq!(pool.len(), 3);
        assert!(matches!(
            pool.lookup(ConstantIndex(1)).unwrap(),
            Constant::Long(7)
        ));
        assert!(pool.lookup(ConstantIndex(2)).is_err());
        assert_eq!(
            pool.lookup_class_name(ClassConstantIndex(ConstantIndex(4)))
                .unwrap(),
            "x"
        );

        let mut reserialized = vec![];
        pool.serialize(&mut reserialized).unwrap();
        assert_eq!(reserialized, bytes);
    }

    #[test]
    fn unknown_tags_are_errors() {
        let bytes = [0u8, 2, 2, 0, 0];
        assert!(matches!(
            ConstantsPool::parse(&mut &bytes[..]),
            Err(Error::UnknownConstantTag { tag: 2, index: 1 })
        ));
    }
}

macro_rules! constant_index {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Copy, Clone, Hash, Eq, PartialEq, Debug)]
        pub struct $name(pub ConstantIndex);

        impl From<$name> for ConstantIndex {
            fn from(idx: $name) -> ConstantIndex {
                idx.0
            }
        }

        impl Serialize for $name {
            fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> std::io::Result<()> {
                self.0.serialize(writer)
            }
        }

        impl Parse for $name {
            fn parse<R: ReadBytesExt>(reader: &mut R) -> Result<Self, Error> {
                Ok($name(ConstantIndex::parse(reader)?))
            }
        }
    };
}

/// Untyped index into the constant pool
#[derive(Copy, Clone, Hash, Eq, PartialEq, Ord, PartialOrd, Debug)]
pub struct ConstantIndex(pub u16);

impl Serialize for ConstantIndex {
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> std::io::Result<()> {
        self.0.serialize(writer)
    }
}

impl Parse for ConstantIndex {
    fn parse<R: ReadBytesExt>(reader: &mut R) -> Result<Self, Error> {
        Ok(ConstantIndex(u16::parse(reader)?))
    }
}

constant_index!(Utf8ConstantIndex);
constant_index!(StringConstantIndex);
constant_index!(NameAndTypeConstantIndex);
constant_index!(MethodRefConstantIndex);
constant_index!(
    /// Index of a `CONSTANT_Class_info`, or `0` where the format allows "no class" (eg. a
    /// catch-all exception handler)
    ClassConstantIndex
);
