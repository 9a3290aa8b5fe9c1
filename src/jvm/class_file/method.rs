use crate::jvm::class_file::{
    Attribute, Code, ConstantsPool, Parse, Serialize, Utf8ConstantIndex,
};
use crate::jvm::{Error, MethodAccessFlags};
use byteorder::{ReadBytesExt, WriteBytesExt};

/// Method declared by a class or interface
///
/// [0]: https://docs.oracle.com/javase/specs/jvms/se17/html/jvms-4.html#jvms-4.6
#[derive(Debug, Clone)]
pub struct Method {
    pub access_flags: MethodAccessFlags,
    pub name_index: Utf8ConstantIndex,
    pub descriptor_index: Utf8ConstantIndex,
    pub attributes: Vec<Attribute>,
}

impl Method {
    /// Position of the `Code` attribute, if there is one
    ///
    /// Abstract and native methods have no code.
    pub fn code_attribute_position(&self, constants: &ConstantsPool) -> Option<usize> {
        self.attributes
            .iter()
            .position(|attribute| attribute.is::<Code>(constants))
    }

    /// Decode the `Code` attribute, if there is one
    pub fn code(&self, constants: &ConstantsPool) -> Result<Option<Code>, Error> {
        self.code_attribute_position(constants)
            .map(|position| self.attributes[position].decode::<Code>())
            .transpose()
    }

    /// Replace the `Code` attribute in place (or add one if there wasn't one)
    pub fn set_code(&mut self, constants: &mut ConstantsPool, code: &Code) -> Result<(), Error> {
        let attribute = constants.get_attribute(code)?;
        match self.code_attribute_position(constants) {
            Some(position) => self.attributes[position] = attribute,
            None => self.attributes.push(attribute),
        }
        Ok(())
    }
}

impl Serialize for Method {
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> std::io::Result<()> {
        self.access_flags.serialize(writer)?;
        self.name_index.serialize(writer)?;
        self.descriptor_index.serialize(writer)?;
        self.attributes.serialize(writer)?;
        Ok(())
    }
}

impl Parse for Method {
    fn parse<R: ReadBytesExt>(reader: &mut R) -> Result<Self, Error> {
        Ok(Method {
            access_flags: MethodAccessFlags::parse(reader)?,
            name_index: Utf8ConstantIndex::parse(reader)?,
            descriptor_index: Utf8ConstantIndex::parse(reader)?,
            attributes: Vec::parse(reader)?,
        })
    }
}

