use super::class_file::{Constant, ConstantIndex};
use std::fmt;

#[derive(Debug)]
pub enum Error {
    IoError(std::io::Error),

    /// Input does not start with `0xCAFEBABE`
    BadMagic([u8; 4]),

    /// Constant pool entry has a tag we don't know how to read
    UnknownConstantTag { tag: u8, index: u16 },

    /// Constant pool index is out of bounds, or lands on the unusable half of a `long`/`double`
    InvalidConstantIndex(ConstantIndex),

    /// Constant pool entry exists but is not of the kind that was expected
    UnexpectedConstant {
        index: ConstantIndex,
        expected: &'static str,
    },

    /// `CONSTANT_Utf8_info` bytes are not valid modified UTF-8
    MalformedUtf8(Vec<u8>),

    ConstantPoolOverflow {
        constant: Constant,
        offset: u16,
    },

    /// Unknown or unsupported opcode in a method body
    UnknownOpcode { opcode: u8, offset: usize },

    /// Offset into a method body does not fall on an instruction boundary
    InvalidCodeOffset(usize),

    /// Reference to an instruction that is not part of the method body being laid out
    UnplacedInstruction,

    /// `StackMapTable` frame tag in the reserved range
    UnknownFrameType(u8),

    /// `StackMapTable` verification type tag outside of the known range
    UnknownVerificationType(u8),

    /// An attribute's declared length disagrees with its contents
    AttributeLengthMismatch {
        name: &'static str,
        declared: usize,
        consumed: usize,
    },

    /// Field or method descriptor could not be parsed
    BadDescriptor(String),

    /// Method body exceeds the 65535 byte limit
    MethodCodeOverflow(usize),

    /// Relative branch from one offset to another does not fit in the instruction's operand
    BranchOffsetOverflow { from: usize, to: usize },

    MethodCodeMaxStackOverflow(usize),
    MethodCodeMaxLocalsOverflow(usize),

    /// Stack analysis found an instruction that pops more than is on the stack
    StackUnderflow { offset: usize },

    /// Two paths reach the same instruction with different stack depths
    InconsistentStackDepth {
        offset: usize,
        first: usize,
        second: usize,
    },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::IoError(err) => write!(f, "I/O error: {}", err),
            Error::BadMagic(magic) => write!(f, "bad class file magic {:02X?}", magic),
            Error::UnknownConstantTag { tag, index } => {
                write!(f, "unknown constant tag {} at index {}", tag, index)
            }
            Error::InvalidConstantIndex(idx) => write!(f, "invalid constant index #{}", idx.0),
            Error::UnexpectedConstant { index, expected } => {
                write!(f, "constant #{} is not a {}", index.0, expected)
            }
            Error::MalformedUtf8(bytes) => write!(f, "malformed modified UTF-8 {:?}", bytes),
            Error::ConstantPoolOverflow { constant, offset } => write!(
                f,
                "constant pool overflow at #{} while adding {:?}",
                offset, constant
            ),
            Error::UnknownOpcode { opcode, offset } => {
                write!(f, "unknown opcode 0x{:02x} at offset {}", opcode, offset)
            }
            Error::InvalidCodeOffset(offset) => {
                write!(f, "offset {} is not an instruction boundary", offset)
            }
            Error::UnplacedInstruction => {
                write!(f, "reference to an instruction outside of the method body")
            }
            Error::UnknownFrameType(tag) => write!(f, "unknown stack map frame type {}", tag),
            Error::UnknownVerificationType(tag) => write!(f, "unknown verification type {}", tag),
            Error::AttributeLengthMismatch {
                name,
                declared,
                consumed,
            } => write!(
                f,
                "attribute {} declares {} bytes but {} were read",
                name, declared, consumed
            ),
            Error::BadDescriptor(msg) => write!(f, "bad descriptor: {}", msg),
            Error::MethodCodeOverflow(len) => write!(f, "method body of {} bytes is too long", len),
            Error::BranchOffsetOverflow { from, to } => {
                write!(f, "branch from {} to {} does not fit in 16 bits", from, to)
            }
            Error::MethodCodeMaxStackOverflow(depth) => {
                write!(f, "operand stack depth {} is too large", depth)
            }
            Error::MethodCodeMaxLocalsOverflow(locals) => {
                write!(f, "{} local variable slots is too many", locals)
            }
            Error::StackUnderflow { offset } => write!(f, "stack underflow at offset {}", offset),
            Error::InconsistentStackDepth {
                offset,
                first,
                second,
            } => write!(
                f,
                "offset {} reached with stack depths {} and {}",
                offset, first, second
            ),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::IoError(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Error {
        Error::IoError(err)
    }
}
