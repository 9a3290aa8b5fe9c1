use crate::jvm::class_file::ConstantsPool;
use crate::jvm::code::{opcodes, InsnId, Instruction};
use crate::jvm::Error;
use crate::policy::MethodId;

/// Static method that the injected probes call
///
/// The method must take the method identifier as its only argument and return nothing.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProbeTarget {
    /// Internal name of the class declaring the method (eg. `my/pkg/Recorder`)
    pub class: String,
    pub method: String,
}

impl ProbeTarget {
    pub const DESCRIPTOR: &'static str = "(Ljava/lang/String;)V";

    pub fn new(class: impl Into<String>, method: impl Into<String>) -> ProbeTarget {
        ProbeTarget {
            class: class.into(),
            method: method.into(),
        }
    }

    /// Instructions reporting entry into `id`
    ///
    /// The string is pushed then immediately consumed by the call, so the probe leaves nothing on
    /// the stack and uses no locals.
    pub fn instructions(
        &self,
        constants: &mut ConstantsPool,
        id: &MethodId,
    ) -> Result<[Instruction<InsnId>; 2], Error> {
        let string = constants.get_string(id.to_string())?;
        let method = constants.get_method_ref(&self.class, &self.method, ProbeTarget::DESCRIPTOR)?;
        Ok([
            Instruction::Ldc {
                index: string.0,
                wide: string.0 .0 > u8::MAX as u16,
            },
            Instruction::Invoke {
                opcode: opcodes::INVOKESTATIC,
                method: method.0,
            },
        ])
    }
}
