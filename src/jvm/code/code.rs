use crate::jvm::class_file::{
    self, Attribute, BytecodeArray, ClassConstantIndex, ConstantsPool, ExceptionHandler,
    LineNumber, LineNumberTable, LocalVariable, LocalVariableTable, LocalVariableTypeTable,
    Method, StackMapFrame, StackMapTable, Utf8ConstantIndex,
};
use crate::jvm::code::{analysis, Anchor, InsnId, Instruction, InstructionStream};
use crate::jvm::{Error, MethodAccessFlags, MethodDescriptor, ParseDescriptor};
use log::debug;
use std::collections::HashMap;

/// What a method's code needs to know about the method itself
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MethodSignature {
    pub descriptor: MethodDescriptor,

    /// Static methods have no `this` in local 0
    pub is_static: bool,
}

impl MethodSignature {
    pub fn of_method(method: &Method, constants: &ConstantsPool) -> Result<MethodSignature, Error> {
        let descriptor = MethodDescriptor::parse(constants.lookup_utf8(method.descriptor_index)?)?;
        Ok(MethodSignature {
            descriptor,
            is_static: method.access_flags.contains(MethodAccessFlags::STATIC),
        })
    }

    /// Local slots taken up by the parameters (including `this`)
    pub fn parameter_slots(&self) -> usize {
        self.descriptor.parameter_length(!self.is_static)
    }
}

/// Entry in the exception table
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExceptionRange {
    /// First instruction covered
    pub start: InsnId,

    /// First instruction no longer covered
    pub end: Anchor,

    pub handler: InsnId,

    /// Class of exceptions caught, `0` for all of them
    pub catch_type: ClassConstantIndex,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LineNumberEntry {
    pub start: InsnId,
    pub line_number: u16,
}

/// Entry of a `LocalVariableTable` or `LocalVariableTypeTable`
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LocalVariableRange {
    pub start: Anchor,
    pub end: Anchor,
    pub name: Utf8ConstantIndex,

    /// Field descriptor, or generic signature in a `LocalVariableTypeTable`
    pub descriptor: Utf8ConstantIndex,

    pub index: u16,
}

/// Attributes of the `Code` attribute, with offsets resolved to instructions
#[derive(Clone, Debug)]
pub enum CodeAttribute {
    LineNumbers(Vec<LineNumberEntry>),
    LocalVariables(Vec<LocalVariableRange>),
    LocalVariableTypes(Vec<LocalVariableRange>),

    /// Frames along with the instruction they apply to (offset deltas are recomputed on layout)
    StackMap(Vec<(InsnId, StackMapFrame<InsnId>)>),

    /// Attribute whose contents may hold offsets we don't know how to move
    ///
    /// These are dropped when the code is laid out again.
    Unrelocatable(Attribute),
}

/// Editable method body
///
/// Everything that refers to a position in the code refers to an [`InsnId`] (or the end of the
/// code), so instructions can be inserted without any offset bookkeeping. Offsets, switch padding,
/// `max_stack`, and `max_locals` are all worked out again by [`Code::encode`].
#[derive(Clone, Debug)]
pub struct Code {
    pub signature: MethodSignature,
    pub instructions: InstructionStream,
    pub exception_table: Vec<ExceptionRange>,
    pub attributes: Vec<CodeAttribute>,
}

/// Byte offset of every instruction, once placed
pub(crate) struct Layout {
    offsets: HashMap<InsnId, usize>,
    pub code_length: usize,
}

impl Layout {
    fn of(instructions: &InstructionStream) -> Layout {
        let mut offsets = HashMap::with_capacity(instructions.len());
        let mut offset = 0;
        for (id, insn) in instructions.iter() {
            offsets.insert(id, offset);
            offset += insn.width_at(offset);
        }
        Layout {
            offsets,
            code_length: offset,
        }
    }

    pub fn offset(&self, id: InsnId) -> Result<usize, Error> {
        self.offsets
            .get(&id)
            .copied()
            .ok_or(Error::UnplacedInstruction)
    }

    pub fn anchor_offset(&self, anchor: Anchor) -> Result<usize, Error> {
        match anchor {
            Anchor::Insn(id) => self.offset(id),
            Anchor::End => Ok(self.code_length),
        }
    }
}

impl Code {
    /// Decode a `Code` attribute
    pub fn decode(
        code: &class_file::Code,
        constants: &ConstantsPool,
        signature: MethodSignature,
    ) -> Result<Code, Error> {
        let bytes: &[u8] = &code.code_array.0;

        let mut decoded: Vec<(usize, Instruction<usize>)> = vec![];
        let mut offset = 0;
        while offset < bytes.len() {
            let (insn, width) = Instruction::<usize>::decode(bytes, offset)?;
            decoded.push((offset, insn));
            offset += width;
        }

        // Hand out handles up front so that forward jumps can be resolved
        let mut instructions = InstructionStream::new();
        let mut at_offset: HashMap<usize, InsnId> = HashMap::with_capacity(decoded.len());
        for (offset, insn) in &decoded {
            let placeholder = insn.map_labels(|_| Ok::<_, Error>(InsnId::PLACEHOLDER))?;
            at_offset.insert(*offset, instructions.allocate(placeholder));
        }
        let insn_at = |offset: usize| -> Result<InsnId, Error> {
            at_offset
                .get(&offset)
                .copied()
                .ok_or(Error::InvalidCodeOffset(offset))
        };
        let anchor_at = |offset: usize| -> Result<Anchor, Error> {
            if offset == bytes.len() {
                Ok(Anchor::End)
            } else {
                insn_at(offset).map(Anchor::Insn)
            }
        };

        for (offset, insn) in &decoded {
            let insn = insn.map_labels(|target| insn_at(*target))?;
            instructions.place_back(insn_at(*offset)?, insn);
        }

        let exception_table = code
            .exception_table
            .iter()
            .map(|handler| {
                Ok(ExceptionRange {
                    start: insn_at(handler.start_pc as usize)?,
                    end: anchor_at(handler.end_pc as usize)?,
                    handler: insn_at(handler.handler_pc as usize)?,
                    catch_type: handler.catch_type,
                })
            })
            .collect::<Result<Vec<_>, Error>>()?;

        let local_variables = |table: &[LocalVariable]| -> Result<Vec<LocalVariableRange>, Error> {
            table
                .iter()
                .map(|local| {
                    let start = local.start_pc as usize;
                    Ok(LocalVariableRange {
                        start: anchor_at(start)?,
                        end: anchor_at(start + local.length as usize)?,
                        name: local.name,
                        descriptor: local.descriptor,
                        index: local.index,
                    })
                })
                .collect()
        };

        let mut attributes = vec![];
        for attribute in &code.attributes {
            let attribute = if attribute.is::<LineNumberTable>(constants) {
                let table = attribute.decode::<LineNumberTable>()?;
                let entries = table
                    .0
                    .iter()
                    .map(|entry| {
                        Ok(LineNumberEntry {
                            start: insn_at(entry.start_pc as usize)?,
                            line_number: entry.line_number,
                        })
                    })
                    .collect::<Result<_, Error>>()?;
                CodeAttribute::LineNumbers(entries)
            } else if attribute.is::<LocalVariableTable>(constants) {
                let table = attribute.decode::<LocalVariableTable>()?;
                CodeAttribute::LocalVariables(local_variables(&table.0)?)
            } else if attribute.is::<LocalVariableTypeTable>(constants) {
                let table = attribute.decode::<LocalVariableTypeTable>()?;
                CodeAttribute::LocalVariableTypes(local_variables(&table.0)?)
            } else if attribute.is::<StackMapTable>(constants) {
                let table = attribute.decode::<StackMapTable>()?;
                let mut frames = Vec::with_capacity(table.0.len());
                let mut previous: Option<usize> = None;
                for frame in &table.0 {
                    let delta = frame.offset_delta() as usize;
                    let offset = match previous {
                        None => delta,
                        Some(previous) => previous + delta + 1,
                    };
                    previous = Some(offset);
                    let frame = frame.map(0, |new_offset| insn_at(*new_offset as usize))?;
                    frames.push((insn_at(offset)?, frame));
                }
                CodeAttribute::StackMap(frames)
            } else {
                CodeAttribute::Unrelocatable(attribute.clone())
            };
            attributes.push(attribute);
        }

        Ok(Code {
            signature,
            instructions,
            exception_table,
            attributes,
        })
    }

    /// Lay out the instructions and produce a `Code` attribute
    ///
    /// Fails if the code is too long, a 16-bit jump no longer reaches its target, or the stack
    /// analysis finds inconsistent code.
    pub fn encode(&self, constants: &mut ConstantsPool) -> Result<class_file::Code, Error> {
        let layout = Layout::of(&self.instructions);
        if layout.code_length > u16::MAX as usize {
            return Err(Error::MethodCodeOverflow(layout.code_length));
        }

        let max_stack = analysis::max_stack(self, &layout, constants)?;
        let max_stack =
            u16::try_from(max_stack).map_err(|_| Error::MethodCodeMaxStackOverflow(max_stack))?;
        let max_locals = analysis::max_locals(self, constants)?;
        let max_locals = u16::try_from(max_locals)
            .map_err(|_| Error::MethodCodeMaxLocalsOverflow(max_locals))?;

        let mut code_array: Vec<u8> = Vec::with_capacity(layout.code_length);
        for (id, insn) in self.instructions.iter() {
            let offset = layout.offset(id)?;
            let relative = insn.map_labels(|target| {
                Ok::<i32, Error>(layout.offset(*target)? as i32 - offset as i32)
            })?;
            relative.encode(offset, &mut code_array)?;
        }

        // All offsets fit in `u16` since the code length does
        let offset_u16 = |id: InsnId| layout.offset(id).map(|offset| offset as u16);
        let anchor_u16 = |anchor: Anchor| layout.anchor_offset(anchor).map(|offset| offset as u16);

        let exception_table = self
            .exception_table
            .iter()
            .map(|range| {
                Ok(ExceptionHandler {
                    start_pc: offset_u16(range.start)?,
                    end_pc: anchor_u16(range.end)?,
                    handler_pc: offset_u16(range.handler)?,
                    catch_type: range.catch_type,
                })
            })
            .collect::<Result<Vec<_>, Error>>()?;

        let local_variables = |ranges: &[LocalVariableRange]| -> Result<Vec<LocalVariable>, Error> {
            ranges
                .iter()
                .map(|range| {
                    let start_pc = anchor_u16(range.start)?;
                    let end_pc = anchor_u16(range.end)?;
                    Ok(LocalVariable {
                        start_pc,
                        length: end_pc.saturating_sub(start_pc),
                        name: range.name,
                        descriptor: range.descriptor,
                        index: range.index,
                    })
                })
                .collect()
        };

        let mut attributes = vec![];
        for attribute in &self.attributes {
            let attribute = match attribute {
                CodeAttribute::LineNumbers(entries) => {
                    let table = entries
                        .iter()
                        .map(|entry| {
                            Ok(LineNumber {
                                start_pc: offset_u16(entry.start)?,
                                line_number: entry.line_number,
                            })
                        })
                        .collect::<Result<_, Error>>()?;
                    constants.get_attribute(&LineNumberTable(table))?
                }
                CodeAttribute::LocalVariables(ranges) => {
                    constants.get_attribute(&LocalVariableTable(local_variables(ranges)?))?
                }
                CodeAttribute::LocalVariableTypes(ranges) => {
                    constants.get_attribute(&LocalVariableTypeTable(local_variables(ranges)?))?
                }
                CodeAttribute::StackMap(frames) => {
                    let mut table = Vec::with_capacity(frames.len());
                    let mut previous: Option<usize> = None;
                    for (id, frame) in frames {
                        let offset = layout.offset(*id)?;
                        let delta = match previous {
                            None => offset,
                            Some(previous) if offset > previous => offset - previous - 1,
                            Some(_) => return Err(Error::InvalidCodeOffset(offset)),
                        };
                        previous = Some(offset);
                        table.push(frame.map(delta as u16, |new_insn| offset_u16(*new_insn))?);
                    }
                    constants.get_attribute(&StackMapTable(table))?
                }
                CodeAttribute::Unrelocatable(attribute) => {
                    debug!(
                        "Dropping code attribute {}",
                        constants
                            .lookup_utf8(attribute.name_index)
                            .unwrap_or("<unnamed>")
                    );
                    continue;
                }
            };
            attributes.push(attribute);
        }

        Ok(class_file::Code {
            max_stack,
            max_locals,
            code_array: BytecodeArray(code_array),
            exception_table,
            attributes,
        })
    }
}
