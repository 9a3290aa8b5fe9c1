use crate::jvm::class_file::{
    read_bytes, Attribute, ClassConstantIndex, ConstantsPool, Field, Method, Parse, Serialize,
    Version,
};
use crate::jvm::{ClassAccessFlags, Error};
use byteorder::{ReadBytesExt, WriteBytesExt};

/// Representation of the [`class` file format of the JVM][0]
///
/// Fields, methods, and attributes keep the order they were read in.
///
/// [0]: https://docs.oracle.com/javase/specs/jvms/se17/html/jvms-4.html
#[derive(Debug)]
pub struct ClassFile {
    pub version: Version,
    pub constants: ConstantsPool,
    pub access_flags: ClassAccessFlags,
    pub this_class: ClassConstantIndex,
    pub super_class: ClassConstantIndex,
    pub interfaces: Vec<ClassConstantIndex>,
    pub fields: Vec<Field>,
    pub methods: Vec<Method>,
    pub attributes: Vec<Attribute>,
}

impl ClassFile {
    /// Magic header bytes that go at the front of the serialized class file
    pub const MAGIC: [u8; 4] = [0xCA, 0xFE, 0xBA, 0xBE];

    /// Parse a complete class file, rejecting trailing bytes
    pub fn from_bytes(bytes: &[u8]) -> Result<ClassFile, Error> {
        let mut reader = bytes;
        let class_file = ClassFile::parse(&mut reader)?;
        if !reader.is_empty() {
            return Err(Error::AttributeLengthMismatch {
                name: "ClassFile",
                declared: bytes.len(),
                consumed: bytes.len() - reader.len(),
            });
        }
        Ok(class_file)
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, Error> {
        let mut bytes = vec![];
        self.serialize(&mut bytes)?;
        Ok(bytes)
    }

    /// Internal name of the class (eg. `java/lang/Object`)
    pub fn class_name(&self) -> Result<&str, Error> {
        self.constants.lookup_class_name(self.this_class)
    }
}

impl Serialize for ClassFile {
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> std::io::Result<()> {
        writer.write_all(&ClassFile::MAGIC)?;
        self.version.serialize(writer)?;
        self.constants.serialize(writer)?;
        self.access_flags.serialize(writer)?;
        self.this_class.serialize(writer)?;
        self.super_class.serialize(writer)?;
        self.interfaces.serialize(writer)?;
        self.fields.serialize(writer)?;
        self.methods.serialize(writer)?;
        self.attributes.serialize(writer)?;
        Ok(())
    }
}

impl Parse for ClassFile {
    fn parse<R: ReadBytesExt>(reader: &mut R) -> Result<Self, Error> {
        let magic = read_bytes(reader, 4)?;
        if magic != ClassFile::MAGIC {
            let mut found = [0u8; 4];
            found.copy_from_slice(&magic);
            return Err(Error::BadMagic(found));
        }
        Ok(ClassFile {
            version: Version::parse(reader)?,
            constants: ConstantsPool::parse(reader)?,
            access_flags: ClassAccessFlags::parse(reader)?,
            this_class: ClassConstantIndex::parse(reader)?,
            super_class: ClassConstantIndex::parse(reader)?,
            interfaces: Vec::parse(reader)?,
            fields: Vec::parse(reader)?,
            methods: Vec::parse(reader)?,
            attributes: Vec::parse(reader)?,
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn bad_magic_is_rejected() {
        assert!(matches!(
            ClassFile::from_bytes(&[0xCA, 0xFE, 0xD0, 0x0D, 0, 0, 0, 52]),
            Err(Error::BadMagic([0xCA, 0xFE, 0xD0, 0x0D]))
        ));
    }

    #[test]
    fn truncated_input_is_an_io_error() {
        assert!(matches!(
            ClassFile::from_bytes(&[0xCA, 0xFE, 0xBA, 0xBE, 0, 0]),
            Err(Error::IoError(_))
        ));
    }

    #[test]
    fn oversized_attribute_length_is_an_io_error() {
        #[rustfmt::skip]
        let bytes = [
            0xCA, 0xFE, 0xBA, 0xBE,
            0, 0, 0, 52, // version
            0, 1, // empty constant pool
            0, 0x21, 0, 1, 0, 2, // access flags, this, super
            0, 0, 0, 0, 0, 0, // interfaces, fields, methods
            0, 1, // one attribute...
            0, 1, 0xFF, 0xFF, 0xFF, 0xF0, // ...claiming almost 4 GiB
            1, 2, 3,
        ];
        assert!(matches!(
            ClassFile::from_bytes(&bytes),
            Err(Error::IoError(_))
        ));
    }

    #[test]
    fn minimal_class_round_trips() {
        let mut constants = ConstantsPool::new();
        let this_class = constants.get_class("a/b/C").unwrap();
        let super_class = constants.get_class("java/lang/Object").unwrap();
        let class = ClassFile {
            version: Version::JAVA8,
            constants,
            access_flags: ClassAccessFlags::PUBLIC | ClassAccessFlags::SUPER,
            this_class,
            super_class,
            interfaces: vec![],
            fields: vec![],
            methods: vec![],
            attributes: vec![],
        };

        let bytes = class.to_bytes().unwrap();
        let parsed = ClassFile::from_bytes(&bytes).unwrap();
        assert_eq!(parsed.class_name().unwrap(), "a/b/C");
        assert_eq!(parsed.version, Version::JAVA8);
        assert_eq!(parsed.to_bytes().unwrap(), bytes);
    }
}
