use crate::jvm::class_file::{ClassConstantIndex, ConstantIndex, ConstantsPool};
use crate::jvm::{Error, FieldType, MethodDescriptor, ParseDescriptor};
use crate::util::Width;
use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};

/// Opcodes that get referred to by name
pub mod opcodes {
    pub const NOP: u8 = 0x00;
    pub const ICONST_0: u8 = 0x03;
    pub const BIPUSH: u8 = 0x10;
    pub const SIPUSH: u8 = 0x11;
    pub const LDC: u8 = 0x12;
    pub const LDC_W: u8 = 0x13;
    pub const LDC2_W: u8 = 0x14;
    pub const ILOAD: u8 = 0x15;
    pub const LLOAD: u8 = 0x16;
    pub const FLOAD: u8 = 0x17;
    pub const DLOAD: u8 = 0x18;
    pub const ALOAD: u8 = 0x19;
    pub const ILOAD_0: u8 = 0x1a;
    pub const ALOAD_0: u8 = 0x2a;
    pub const ISTORE: u8 = 0x36;
    pub const LSTORE: u8 = 0x37;
    pub const FSTORE: u8 = 0x38;
    pub const DSTORE: u8 = 0x39;
    pub const ASTORE: u8 = 0x3a;
    pub const ISTORE_0: u8 = 0x3b;
    pub const ASTORE_1: u8 = 0x4c;
    pub const POP: u8 = 0x57;
    pub const IADD: u8 = 0x60;
    pub const LADD: u8 = 0x61;
    pub const IINC: u8 = 0x84;
    pub const IFEQ: u8 = 0x99;
    pub const IF_ACMPNE: u8 = 0xa6;
    pub const GOTO: u8 = 0xa7;
    pub const JSR: u8 = 0xa8;
    pub const RET: u8 = 0xa9;
    pub const TABLESWITCH: u8 = 0xaa;
    pub const LOOKUPSWITCH: u8 = 0xab;
    pub const IRETURN: u8 = 0xac;
    pub const LRETURN: u8 = 0xad;
    pub const ARETURN: u8 = 0xb0;
    pub const RETURN: u8 = 0xb1;
    pub const GETSTATIC: u8 = 0xb2;
    pub const PUTSTATIC: u8 = 0xb3;
    pub const GETFIELD: u8 = 0xb4;
    pub const PUTFIELD: u8 = 0xb5;
    pub const INVOKEVIRTUAL: u8 = 0xb6;
    pub const INVOKESPECIAL: u8 = 0xb7;
    pub const INVOKESTATIC: u8 = 0xb8;
    pub const INVOKEINTERFACE: u8 = 0xb9;
    pub const INVOKEDYNAMIC: u8 = 0xba;
    pub const NEW: u8 = 0xbb;
    pub const NEWARRAY: u8 = 0xbc;
    pub const ANEWARRAY: u8 = 0xbd;
    pub const ATHROW: u8 = 0xbf;
    pub const CHECKCAST: u8 = 0xc0;
    pub const INSTANCEOF: u8 = 0xc1;
    pub const WIDE: u8 = 0xc4;
    pub const MULTIANEWARRAY: u8 = 0xc5;
    pub const IFNULL: u8 = 0xc6;
    pub const IFNONNULL: u8 = 0xc7;
    pub const GOTO_W: u8 = 0xc8;
    pub const JSR_W: u8 = 0xc9;
}

use opcodes::*;

/// Decoded JVM instruction
///
/// Instructions are grouped by operand layout rather than enumerated one by one: the opcode is
/// kept as-is wherever the layout alone is enough to round-trip the instruction. Jump targets are
/// of type `L`, which is an absolute offset right after decoding, an instruction handle while the
/// code is being edited, and a relative offset just before encoding.
///
/// [0]: https://docs.oracle.com/javase/specs/jvms/se17/html/jvms-6.html#jvms-6.5
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Instruction<L> {
    /// Instructions without operands (arithmetic, array access, `iload_<n>`, returns, etc.)
    Simple(u8),
    BiPush(i8),
    SiPush(i16),

    /// `ldc` or `ldc_w` (the wide form is always used for indices over 255)
    Ldc { index: ConstantIndex, wide: bool },

    /// `ldc2_w`
    Ldc2(ConstantIndex),

    /// Loads, stores, and `ret` with an explicit local index (opcode is the non-`wide` one)
    Local { opcode: u8, index: u16, wide: bool },

    IInc {
        index: u16,
        increment: i16,
        wide: bool,
    },

    /// `getstatic`, `putstatic`, `getfield`, `putfield`
    Field { opcode: u8, field: ConstantIndex },

    /// `invokevirtual`, `invokespecial`, `invokestatic`
    Invoke { opcode: u8, method: ConstantIndex },

    InvokeInterface { method: ConstantIndex, count: u8 },
    InvokeDynamic(ConstantIndex),

    /// `new`, `anewarray`, `checkcast`, `instanceof`
    Type { opcode: u8, class: ClassConstantIndex },

    /// `newarray` with its primitive array type code
    NewArray(u8),

    MultiANewArray {
        class: ClassConstantIndex,
        dimensions: u8,
    },

    /// Conditional branches, `goto`, and `jsr` (16-bit offset)
    Branch { opcode: u8, target: L },

    /// `goto_w` and `jsr_w` (32-bit offset)
    BranchWide { opcode: u8, target: L },

    TableSwitch {
        default: L,
        low: i32,
        targets: Vec<L>,
    },

    LookupSwitch { default: L, pairs: Vec<(i32, L)> },
}

/// Number of stack slots popped then pushed by an instruction
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct StackEffect {
    pub pops: usize,
    pub pushes: usize,
}

impl StackEffect {
    const fn new(pops: usize, pushes: usize) -> StackEffect {
        StackEffect { pops, pushes }
    }
}

/// Stack effect of an operand-less instruction, or `None` if the opcode takes operands (or is
/// not a valid opcode at all)
fn simple_stack_effect(opcode: u8) -> Option<StackEffect> {
    let (pops, pushes) = match opcode {
        0x00 => (0, 0),
        0x01..=0x08 => (0, 1),
        0x09 | 0x0a => (0, 2),
        0x0b..=0x0d => (0, 1),
        0x0e | 0x0f => (0, 2),

        // `<t>load_<n>` in the order int, long, float, double, reference
        0x1a..=0x2d => match (opcode - 0x1a) / 4 {
            1 | 3 => (0, 2),
            _ => (0, 1),
        },

        // `laload`, `daload`
        0x2f | 0x31 => (2, 2),
        0x2e..=0x35 => (2, 1),

        // `<t>store_<n>`
        0x3b..=0x4e => match (opcode - 0x3b) / 4 {
            1 | 3 => (2, 0),
            _ => (1, 0),
        },

        // `lastore`, `dastore`
        0x50 | 0x52 => (4, 0),
        0x4f..=0x56 => (3, 0),

        0x57 => (1, 0),
        0x58 => (2, 0),
        0x59 => (1, 2),
        0x5a => (2, 3),
        0x5b => (3, 4),
        0x5c => (2, 4),
        0x5d => (3, 5),
        0x5e => (4, 6),
        0x5f => (2, 2),

        // `add`, `sub`, `mul`, `div`, `rem` in the order int, long, float, double
        0x60..=0x73 => match (opcode - 0x60) % 4 {
            1 | 3 => (4, 2),
            _ => (2, 1),
        },
        0x74 | 0x76 => (1, 1),
        0x75 | 0x77 => (2, 2),

        // shifts take an int shift amount
        0x78 | 0x7a | 0x7c => (2, 1),
        0x79 | 0x7b | 0x7d => (3, 2),
        0x7e | 0x80 | 0x82 => (2, 1),
        0x7f | 0x81 | 0x83 => (4, 2),

        // conversions
        0x85 | 0x87 | 0x8c | 0x8d => (1, 2),
        0x86 | 0x8b | 0x91..=0x93 => (1, 1),
        0x88 | 0x89 | 0x8e | 0x90 => (2, 1),
        0x8a | 0x8f => (2, 2),

        // comparisons
        0x94 | 0x97 | 0x98 => (4, 1),
        0x95 | 0x96 => (2, 1),

        // returns
        0xac | 0xae | 0xb0 => (1, 0),
        0xad | 0xaf => (2, 0),
        0xb1 => (0, 0),

        // `arraylength`, `athrow`, `monitorenter`, `monitorexit`
        0xbe => (1, 1),
        0xbf | 0xc2 | 0xc3 => (1, 0),

        _ => return None,
    };
    Some(StackEffect::new(pops, pushes))
}

/// Is this a conditional branch, `goto`, or `jsr` opcode?
fn is_branch_opcode(opcode: u8) -> bool {
    matches!(opcode, 0x99..=0xa8 | IFNULL | IFNONNULL)
}

/// Width in slots of the value a load or store opcode moves (`lload`, `dstore`, etc. move two)
fn local_value_width(opcode: u8) -> usize {
    match opcode {
        LLOAD | DLOAD | LSTORE | DSTORE => 2,
        _ => 1,
    }
}

/// Local slot and width accessed by the implicit-index forms `<t>load_<n>` and `<t>store_<n>`
fn implicit_local(opcode: u8) -> Option<(usize, usize)> {
    let relative = match opcode {
        0x1a..=0x2d => opcode - 0x1a,
        0x3b..=0x4e => opcode - 0x3b,
        _ => return None,
    };
    let width = if matches!(relative / 4, 1 | 3) { 2 } else { 1 };
    Some(((relative % 4) as usize, width))
}

/// Padding after a switch opcode at `offset` so that its operands are 4-byte aligned
pub fn switch_padding(offset: usize) -> usize {
    (4 - (offset + 1) % 4) % 4
}

impl<L> Instruction<L> {
    /// Encoded size in bytes, when placed at the given offset in the method
    pub fn width_at(&self, offset: usize) -> usize {
        match self {
            Instruction::Simple(_) => 1,
            Instruction::BiPush(_) => 2,
            Instruction::SiPush(_) => 3,
            Instruction::Ldc { index, wide } => {
                if *wide || index.0 > u8::MAX as u16 {
                    3
                } else {
                    2
                }
            }
            Instruction::Ldc2(_) => 3,
            Instruction::Local { index, wide, .. } => {
                if *wide || *index > u8::MAX as u16 {
                    4
                } else {
                    2
                }
            }
            Instruction::IInc {
                index,
                increment,
                wide,
            } => {
                if *wide || *index > u8::MAX as u16 || i8::try_from(*increment).is_err() {
                    6
                } else {
                    3
                }
            }
            Instruction::Field { .. } | Instruction::Invoke { .. } | Instruction::Type { .. } => 3,
            Instruction::InvokeInterface { .. } | Instruction::InvokeDynamic(_) => 5,
            Instruction::NewArray(_) => 2,
            Instruction::MultiANewArray { .. } => 4,
            Instruction::Branch { .. } => 3,
            Instruction::BranchWide { .. } => 5,
            Instruction::TableSwitch { targets, .. } => {
                1 + switch_padding(offset) + 12 + 4 * targets.len()
            }
            Instruction::LookupSwitch { pairs, .. } => {
                1 + switch_padding(offset) + 8 + 8 * pairs.len()
            }
        }
    }

    /// Convert the jump targets of the instruction
    pub fn map_labels<L2, E>(
        &self,
        mut map_label: impl FnMut(&L) -> Result<L2, E>,
    ) -> Result<Instruction<L2>, E> {
        Ok(match self {
            Instruction::Simple(opcode) => Instruction::Simple(*opcode),
            Instruction::BiPush(byte) => Instruction::BiPush(*byte),
            Instruction::SiPush(short) => Instruction::SiPush(*short),
            Instruction::Ldc { index, wide } => Instruction::Ldc {
                index: *index,
                wide: *wide,
            },
            Instruction::Ldc2(index) => Instruction::Ldc2(*index),
            Instruction::Local {
                opcode,
                index,
                wide,
            } => Instruction::Local {
                opcode: *opcode,
                index: *index,
                wide: *wide,
            },
            Instruction::IInc {
                index,
                increment,
                wide,
            } => Instruction::IInc {
                index: *index,
                increment: *increment,
                wide: *wide,
            },
            Instruction::Field { opcode, field } => Instruction::Field {
                opcode: *opcode,
                field: *field,
            },
            Instruction::Invoke { opcode, method } => Instruction::Invoke {
                opcode: *opcode,
                method: *method,
            },
            Instruction::InvokeInterface { method, count } => Instruction::InvokeInterface {
                method: *method,
                count: *count,
            },
            Instruction::InvokeDynamic(index) => Instruction::InvokeDynamic(*index),
            Instruction::Type { opcode, class } => Instruction::Type {
                opcode: *opcode,
                class: *class,
            },
            Instruction::NewArray(typ) => Instruction::NewArray(*typ),
            Instruction::MultiANewArray { class, dimensions } => Instruction::MultiANewArray {
                class: *class,
                dimensions: *dimensions,
            },
            Instruction::Branch { opcode, target } => Instruction::Branch {
                opcode: *opcode,
                target: map_label(target)?,
            },
            Instruction::BranchWide { opcode, target } => Instruction::BranchWide {
                opcode: *opcode,
                target: map_label(target)?,
            },
            Instruction::TableSwitch {
                default,
                low,
                targets,
            } => Instruction::TableSwitch {
                default: map_label(default)?,
                low: *low,
                targets: targets.iter().map(&mut map_label).collect::<Result<_, _>>()?,
            },
            Instruction::LookupSwitch { default, pairs } => Instruction::LookupSwitch {
                default: map_label(default)?,
                pairs: pairs
                    .iter()
                    .map(|(key, target)| map_label(target).map(|target| (*key, target)))
                    .collect::<Result<_, _>>()?,
            },
        })
    }

    /// Every jump target of the instruction (possibly with repeats)
    pub fn jump_targets(&self) -> Vec<&L> {
        match self {
            Instruction::Branch { target, .. } | Instruction::BranchWide { target, .. } => {
                vec![target]
            }
            Instruction::TableSwitch {
                default, targets, ..
            } => std::iter::once(default).chain(targets).collect(),
            Instruction::LookupSwitch { default, pairs } => std::iter::once(default)
                .chain(pairs.iter().map(|(_, target)| target))
                .collect(),
            _ => vec![],
        }
    }

    /// Can execution continue on to the next instruction?
    ///
    /// For `jsr`, this is where the subroutine returns to.
    pub fn falls_through(&self) -> bool {
        match self {
            Instruction::Simple(opcode) => !matches!(*opcode, 0xac..=0xb1 | ATHROW),
            Instruction::Local { opcode, .. } => *opcode != RET,
            Instruction::Branch { opcode, .. } | Instruction::BranchWide { opcode, .. } => {
                *opcode != GOTO && *opcode != GOTO_W
            }
            Instruction::TableSwitch { .. } | Instruction::LookupSwitch { .. } => false,
            _ => true,
        }
    }

    /// Is this a `jsr` or `jsr_w` (which pushes a return address onto the stack of its target)?
    pub fn is_subroutine_call(&self) -> bool {
        matches!(
            self,
            Instruction::Branch { opcode: JSR, .. } | Instruction::BranchWide { opcode: JSR_W, .. }
        )
    }

    /// Highest local variable slot touched, plus one
    pub fn locals_extent(&self) -> Option<usize> {
        match self {
            Instruction::Simple(opcode) => {
                implicit_local(*opcode).map(|(index, width)| index + width)
            }
            Instruction::Local { opcode, index, .. } => {
                Some(*index as usize + local_value_width(*opcode))
            }
            Instruction::IInc { index, .. } => Some(*index as usize + 1),
            _ => None,
        }
    }

    /// Stack slots popped then pushed
    ///
    /// For `jsr`, the pushed return address is only on the stack at the jump target.
    pub fn stack_effect(&self, constants: &ConstantsPool) -> Result<StackEffect, Error> {
        let effect = match self {
            Instruction::Simple(opcode) => match simple_stack_effect(*opcode) {
                Some(effect) => effect,
                None => {
                    return Err(Error::UnknownOpcode {
                        opcode: *opcode,
                        offset: 0,
                    })
                }
            },
            Instruction::BiPush(_) | Instruction::SiPush(_) | Instruction::Ldc { .. } => {
                StackEffect::new(0, 1)
            }
            Instruction::Ldc2(_) => StackEffect::new(0, 2),
            Instruction::Local { opcode, .. } => match *opcode {
                ILOAD..=ALOAD => StackEffect::new(0, local_value_width(*opcode)),
                ISTORE..=ASTORE => StackEffect::new(local_value_width(*opcode), 0),
                _ => StackEffect::new(0, 0),
            },
            Instruction::IInc { .. } => StackEffect::new(0, 0),
            Instruction::Field { opcode, field } => {
                let width = FieldType::parse(constants.lookup_member_descriptor(*field)?)?.width();
                match *opcode {
                    GETSTATIC => StackEffect::new(0, width),
                    PUTSTATIC => StackEffect::new(width, 0),
                    GETFIELD => StackEffect::new(1, width),
                    _ => StackEffect::new(1 + width, 0),
                }
            }
            Instruction::Invoke { opcode, method } => {
                let descriptor =
                    MethodDescriptor::parse(constants.lookup_member_descriptor(*method)?)?;
                StackEffect::new(
                    descriptor.parameter_length(*opcode != INVOKESTATIC),
                    descriptor.return_length(),
                )
            }
            Instruction::InvokeInterface { method, .. } => {
                let descriptor =
                    MethodDescriptor::parse(constants.lookup_member_descriptor(*method)?)?;
                StackEffect::new(descriptor.parameter_length(true), descriptor.return_length())
            }
            Instruction::InvokeDynamic(method) => {
                let descriptor =
                    MethodDescriptor::parse(constants.lookup_member_descriptor(*method)?)?;
                StackEffect::new(descriptor.parameter_length(false), descriptor.return_length())
            }
            Instruction::Type { opcode, .. } => match *opcode {
                NEW => StackEffect::new(0, 1),
                _ => StackEffect::new(1, 1),
            },
            Instruction::NewArray(_) => StackEffect::new(1, 1),
            Instruction::MultiANewArray { dimensions, .. } => {
                StackEffect::new(*dimensions as usize, 1)
            }
            Instruction::Branch { opcode, .. } | Instruction::BranchWide { opcode, .. } => {
                match *opcode {
                    0x99..=0x9e | IFNULL | IFNONNULL => StackEffect::new(1, 0),
                    0x9f..=IF_ACMPNE => StackEffect::new(2, 0),
                    _ => StackEffect::new(0, 0),
                }
            }
            Instruction::TableSwitch { .. } | Instruction::LookupSwitch { .. } => {
                StackEffect::new(1, 0)
            }
        };
        Ok(effect)
    }
}

impl Instruction<usize> {
    /// Decode the instruction starting at `offset` in `code`
    ///
    /// Returned jump targets are absolute offsets.
    pub fn decode(code: &[u8], offset: usize) -> Result<(Instruction<usize>, usize), Error> {
        let mut reader: &[u8] = code.get(offset..).ok_or(Error::InvalidCodeOffset(offset))?;
        let before = reader.len();
        let insn = Self::decode_from(&mut reader, offset)?;
        Ok((insn, before - reader.len()))
    }

    fn decode_from(reader: &mut &[u8], offset: usize) -> Result<Instruction<usize>, Error> {
        let target = |relative: i64| -> Result<usize, Error> {
            usize::try_from(offset as i64 + relative).map_err(|_| Error::InvalidCodeOffset(offset))
        };

        let opcode = reader.read_u8()?;
        let insn = match opcode {
            BIPUSH => Instruction::BiPush(reader.read_i8()?),
            SIPUSH => Instruction::SiPush(reader.read_i16::<BigEndian>()?),
            LDC => Instruction::Ldc {
                index: ConstantIndex(reader.read_u8()? as u16),
                wide: false,
            },
            LDC_W => Instruction::Ldc {
                index: ConstantIndex(reader.read_u16::<BigEndian>()?),
                wide: true,
            },
            LDC2_W => Instruction::Ldc2(ConstantIndex(reader.read_u16::<BigEndian>()?)),
            ILOAD..=ALOAD | ISTORE..=ASTORE | RET => Instruction::Local {
                opcode,
                index: reader.read_u8()? as u16,
                wide: false,
            },
            IINC => Instruction::IInc {
                index: reader.read_u8()? as u16,
                increment: reader.read_i8()? as i16,
                wide: false,
            },
            WIDE => match reader.read_u8()? {
                IINC => Instruction::IInc {
                    index: reader.read_u16::<BigEndian>()?,
                    increment: reader.read_i16::<BigEndian>()?,
                    wide: true,
                },
                modified @ (ILOAD..=ALOAD | ISTORE..=ASTORE | RET) => Instruction::Local {
                    opcode: modified,
                    index: reader.read_u16::<BigEndian>()?,
                    wide: true,
                },
                modified => {
                    return Err(Error::UnknownOpcode {
                        opcode: modified,
                        offset: offset + 1,
                    })
                }
            },
            GETSTATIC..=PUTFIELD => Instruction::Field {
                opcode,
                field: ConstantIndex(reader.read_u16::<BigEndian>()?),
            },
            INVOKEVIRTUAL..=INVOKESTATIC => Instruction::Invoke {
                opcode,
                method: ConstantIndex(reader.read_u16::<BigEndian>()?),
            },
            INVOKEINTERFACE => {
                let method = ConstantIndex(reader.read_u16::<BigEndian>()?);
                let count = reader.read_u8()?;
                let _zero = reader.read_u8()?;
                Instruction::InvokeInterface { method, count }
            }
            INVOKEDYNAMIC => {
                let method = ConstantIndex(reader.read_u16::<BigEndian>()?);
                let _zero = reader.read_u16::<BigEndian>()?;
                Instruction::InvokeDynamic(method)
            }
            NEW | ANEWARRAY | CHECKCAST | INSTANCEOF => Instruction::Type {
                opcode,
                class: ClassConstantIndex(ConstantIndex(reader.read_u16::<BigEndian>()?)),
            },
            NEWARRAY => Instruction::NewArray(reader.read_u8()?),
            MULTIANEWARRAY => Instruction::MultiANewArray {
                class: ClassConstantIndex(ConstantIndex(reader.read_u16::<BigEndian>()?)),
                dimensions: reader.read_u8()?,
            },
            GOTO_W | JSR_W => Instruction::BranchWide {
                opcode,
                target: target(reader.read_i32::<BigEndian>()? as i64)?,
            },
            _ if is_branch_opcode(opcode) => Instruction::Branch {
                opcode,
                target: target(reader.read_i16::<BigEndian>()? as i64)?,
            },
            TABLESWITCH => {
                for _ in 0..switch_padding(offset) {
                    reader.read_u8()?;
                }
                let default = target(reader.read_i32::<BigEndian>()? as i64)?;
                let low = reader.read_i32::<BigEndian>()?;
                let high = reader.read_i32::<BigEndian>()?;
                if high < low {
                    return Err(Error::InvalidCodeOffset(offset));
                }
                let count = (high as i64 - low as i64 + 1) as usize;
                if count * 4 > reader.len() {
                    return Err(Error::InvalidCodeOffset(offset));
                }
                let mut targets = Vec::with_capacity(count);
                for _ in 0..count {
                    targets.push(target(reader.read_i32::<BigEndian>()? as i64)?);
                }
                Instruction::TableSwitch {
                    default,
                    low,
                    targets,
                }
            }
            LOOKUPSWITCH => {
                for _ in 0..switch_padding(offset) {
                    reader.read_u8()?;
                }
                let default = target(reader.read_i32::<BigEndian>()? as i64)?;
                let count = reader.read_i32::<BigEndian>()?;
                if count < 0 || count as usize * 8 > reader.len() {
                    return Err(Error::InvalidCodeOffset(offset));
                }
                let mut pairs = Vec::with_capacity(count as usize);
                for _ in 0..count {
                    let key = reader.read_i32::<BigEndian>()?;
                    pairs.push((key, target(reader.read_i32::<BigEndian>()? as i64)?));
                }
                Instruction::LookupSwitch { default, pairs }
            }
            _ if simple_stack_effect(opcode).is_some() => Instruction::Simple(opcode),
            _ => return Err(Error::UnknownOpcode { opcode, offset }),
        };
        Ok(insn)
    }
}

impl Instruction<i32> {
    /// Encode an instruction whose jump targets are relative to `offset`, where it is placed
    pub fn encode<W: WriteBytesExt>(&self, offset: usize, writer: &mut W) -> Result<(), Error> {
        let overflow = |relative: i32| Error::BranchOffsetOverflow {
            from: offset,
            to: (offset as i64 + relative as i64) as usize,
        };

        match self {
            Instruction::Simple(opcode) => writer.write_u8(*opcode)?,
            Instruction::BiPush(byte) => {
                writer.write_u8(BIPUSH)?;
                writer.write_i8(*byte)?;
            }
            Instruction::SiPush(short) => {
                writer.write_u8(SIPUSH)?;
                writer.write_i16::<BigEndian>(*short)?;
            }
            Instruction::Ldc { index, wide } => {
                if *wide || index.0 > u8::MAX as u16 {
                    writer.write_u8(LDC_W)?;
                    writer.write_u16::<BigEndian>(index.0)?;
                } else {
                    writer.write_u8(LDC)?;
                    writer.write_u8(index.0 as u8)?;
                }
            }
            Instruction::Ldc2(index) => {
                writer.write_u8(LDC2_W)?;
                writer.write_u16::<BigEndian>(index.0)?;
            }
            Instruction::Local {
                opcode,
                index,
                wide,
            } => {
                if *wide || *index > u8::MAX as u16 {
                    writer.write_u8(WIDE)?;
                    writer.write_u8(*opcode)?;
                    writer.write_u16::<BigEndian>(*index)?;
                } else {
                    writer.write_u8(*opcode)?;
                    writer.write_u8(*index as u8)?;
                }
            }
            Instruction::IInc {
                index,
                increment,
                wide,
            } => match i8::try_from(*increment) {
                Ok(narrow) if !*wide && *index <= u8::MAX as u16 => {
                    writer.write_u8(IINC)?;
                    writer.write_u8(*index as u8)?;
                    writer.write_i8(narrow)?;
                }
                _ => {
                    writer.write_u8(WIDE)?;
                    writer.write_u8(IINC)?;
                    writer.write_u16::<BigEndian>(*index)?;
                    writer.write_i16::<BigEndian>(*increment)?;
                }
            },
            Instruction::Field { opcode, field: idx } | Instruction::Invoke { opcode, method: idx } => {
                writer.write_u8(*opcode)?;
                writer.write_u16::<BigEndian>(idx.0)?;
            }
            Instruction::InvokeInterface { method, count } => {
                writer.write_u8(INVOKEINTERFACE)?;
                writer.write_u16::<BigEndian>(method.0)?;
                writer.write_u8(*count)?;
                writer.write_u8(0)?;
            }
            Instruction::InvokeDynamic(method) => {
                writer.write_u8(INVOKEDYNAMIC)?;
                writer.write_u16::<BigEndian>(method.0)?;
                writer.write_u16::<BigEndian>(0)?;
            }
            Instruction::Type { opcode, class } => {
                writer.write_u8(*opcode)?;
                writer.write_u16::<BigEndian>((class.0).0)?;
            }
            Instruction::NewArray(typ) => {
                writer.write_u8(NEWARRAY)?;
                writer.write_u8(*typ)?;
            }
            Instruction::MultiANewArray { class, dimensions } => {
                writer.write_u8(MULTIANEWARRAY)?;
                writer.write_u16::<BigEndian>((class.0).0)?;
                writer.write_u8(*dimensions)?;
            }
            Instruction::Branch { opcode, target } => {
                let relative = i16::try_from(*target).map_err(|_| overflow(*target))?;
                writer.write_u8(*opcode)?;
                writer.write_i16::<BigEndian>(relative)?;
            }
            Instruction::BranchWide { opcode, target } => {
                writer.write_u8(*opcode)?;
                writer.write_i32::<BigEndian>(*target)?;
            }
            Instruction::TableSwitch {
                default,
                low,
                targets,
            } => {
                writer.write_u8(TABLESWITCH)?;
                for _ in 0..switch_padding(offset) {
                    writer.write_u8(0)?;
                }
                let high = *low as i64 + targets.len() as i64 - 1;
                writer.write_i32::<BigEndian>(*default)?;
                writer.write_i32::<BigEndian>(*low)?;
                writer.write_i32::<BigEndian>(high as i32)?;
                for target in targets {
                    writer.write_i32::<BigEndian>(*target)?;
                }
            }
            Instruction::LookupSwitch { default, pairs } => {
                writer.write_u8(LOOKUPSWITCH)?;
                for _ in 0..switch_padding(offset) {
                    writer.write_u8(0)?;
                }
                writer.write_i32::<BigEndian>(*default)?;
                writer.write_i32::<BigEndian>(pairs.len() as i32)?;
                for (key, target) in pairs {
                    writer.write_i32::<BigEndian>(*key)?;
                    writer.write_i32::<BigEndian>(*target)?;
                }
            }
        };
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn decode_all(code: &[u8]) -> Vec<(usize, Instruction<usize>)> {
        let mut offset = 0;
        let mut insns = vec![];
        while offset < code.len() {
            let (insn, width) = Instruction::<usize>::decode(code, offset).unwrap();
            assert_eq!(insn.width_at(offset), width);
            insns.push((offset, insn));
            offset += width;
        }
        insns
    }

    #[test]
    fn decode_wide_and_short_forms() {
        let code = [
            0x1e, // lload_0
            WIDE, LSTORE, 0x01, 0x00, // wide lstore 256
            WIDE, IINC, 0x00, 0x02, 0xff, 0x38, // wide iinc 2 -200
            LDC_W, 0x00, 0x05, // ldc_w #5
            RETURN,
        ];
        let insns = decode_all(&code);
        assert_eq!(
            insns,
            vec![
                (0, Instruction::Simple(0x1e)),
                (
                    1,
                    Instruction::Local {
                        opcode: LSTORE,
                        index: 256,
                        wide: true
                    }
                ),
                (
                    5,
                    Instruction::IInc {
                        index: 2,
                        increment: -200,
                        wide: true
                    }
                ),
                (
                    11,
                    Instruction::Ldc {
                        index: ConstantIndex(5),
                        wide: true
                    }
                ),
                (14, Instruction::Simple(RETURN)),
            ]
        );
        assert_eq!(insns[0].1.locals_extent(), Some(2));
        assert_eq!(insns[1].1.locals_extent(), Some(258));
    }

    #[test]
    fn decode_tableswitch_with_padding() {
        let code = [
            0x03, // iconst_0
            TABLESWITCH, 0x00, 0x00, // two bytes of padding
            0x00, 0x00, 0x00, 0x13, // default: +19
            0x00, 0x00, 0x00, 0x00, // low: 0
            0x00, 0x00, 0x00, 0x00, // high: 0
            0x00, 0x00, 0x00, 0x13, // 0: +19
            RETURN,
        ];
        let insns = decode_all(&code);
        assert_eq!(
            insns[1],
            (
                1,
                Instruction::TableSwitch {
                    default: 20,
                    low: 0,
                    targets: vec![20]
                }
            )
        );
        assert_eq!(insns[1].1.width_at(3), 17);
        assert!(!insns[1].1.falls_through());
    }

    #[test]
    fn unknown_opcodes_are_rejected() {
        assert!(matches!(
            Instruction::<usize>::decode(&[0xca], 0),
            Err(Error::UnknownOpcode {
                opcode: 0xca,
                offset: 0
            })
        ));
        assert!(matches!(
            Instruction::<usize>::decode(&[WIDE, BIPUSH, 0, 0], 0),
            Err(Error::UnknownOpcode {
                opcode: BIPUSH,
                offset: 1
            })
        ));
    }

    #[test]
    fn short_branch_overflow() {
        let branch: Instruction<i32> = Instruction::Branch {
            opcode: GOTO,
            target: 40000,
        };
        let mut out = vec![];
        assert!(matches!(
            branch.encode(10, &mut out),
            Err(Error::BranchOffsetOverflow {
                from: 10,
                to: 40010
            })
        ));
    }

    #[test]
    fn stack_effects() {
        let constants = ConstantsPool::new();
        let ladd: Instruction<usize> = Instruction::Simple(LADD);
        assert_eq!(
            ladd.stack_effect(&constants).unwrap(),
            StackEffect::new(4, 2)
        );
        let dup2_x2: Instruction<usize> = Instruction::Simple(0x5e);
        assert_eq!(
            dup2_x2.stack_effect(&constants).unwrap(),
            StackEffect::new(4, 6)
        );
        let dstore: Instruction<usize> = Instruction::Local {
            opcode: DSTORE,
            index: 3,
            wide: false,
        };
        assert_eq!(
            dstore.stack_effect(&constants).unwrap(),
            StackEffect::new(2, 0)
        );
        assert_eq!(dstore.locals_extent(), Some(5));
    }
}
