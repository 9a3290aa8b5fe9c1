#![allow(dead_code)]

use method_record::jvm::class_file::{
    self, Attribute, BytecodeArray, ClassFile, Constant, ConstantIndex, ConstantsPool,
    ExceptionHandler, Method, Version,
};
use method_record::jvm::code::{opcodes, Instruction};
use method_record::jvm::{ClassAccessFlags, MethodAccessFlags};
use method_record::policy::InclusionPolicy;
use method_record::rewrite::{MethodRewriter, ProbeTarget};
use std::sync::Arc;

pub const RECORDER_CLASS: &str = "methodrecord/MethodRecorder";
pub const RECORDER_METHOD: &str = "report";

/// Assembles class files out of raw method bodies
pub struct ClassBuilder {
    pub constants: ConstantsPool,
    name: String,
    version: Version,
    methods: Vec<Method>,
}

impl ClassBuilder {
    /// New class (name written as `my/pkg/Klass`) extending `java/lang/Object`
    pub fn new(name: &str) -> ClassBuilder {
        ClassBuilder {
            constants: ConstantsPool::new(),
            name: name.to_owned(),
            version: Version::JAVA8,
            methods: vec![],
        }
    }

    pub fn method(
        &mut self,
        access_flags: MethodAccessFlags,
        name: &str,
        descriptor: &str,
        code: Option<class_file::Code>,
    ) -> &mut ClassBuilder {
        let name_index = self.constants.get_utf8(name).unwrap();
        let descriptor_index = self.constants.get_utf8(descriptor).unwrap();
        let mut method = Method {
            access_flags,
            name_index,
            descriptor_index,
            attributes: vec![],
        };
        if let Some(code) = code {
            method.set_code(&mut self.constants, &code).unwrap();
        }
        self.methods.push(method);
        self
    }

    /// Public instance method `()V` with this body
    pub fn simple_method(&mut self, name: &str, code: class_file::Code) -> &mut ClassBuilder {
        self.method(MethodAccessFlags::PUBLIC, name, "()V", Some(code))
    }

    /// Usual `<init>` calling `java/lang/Object.<init>`
    pub fn constructor(&mut self) -> &mut ClassBuilder {
        let object_init = self
            .constants
            .get_method_ref("java/lang/Object", "<init>", "()V")
            .unwrap();
        let [hi, lo] = object_init.0 .0.to_be_bytes();
        let body = vec![
            opcodes::ALOAD_0,
            opcodes::INVOKESPECIAL,
            hi,
            lo,
            opcodes::RETURN,
        ];
        self.method(
            MethodAccessFlags::PUBLIC,
            "<init>",
            "()V",
            Some(code(1, 1, body)),
        )
    }

    pub fn build(mut self) -> Vec<u8> {
        let this_class = self.constants.get_class(self.name.as_str()).unwrap();
        let super_class = self.constants.get_class("java/lang/Object").unwrap();
        let class = ClassFile {
            version: self.version,
            constants: self.constants,
            access_flags: ClassAccessFlags::PUBLIC | ClassAccessFlags::SUPER,
            this_class,
            super_class,
            interfaces: vec![],
            fields: vec![],
            methods: self.methods,
            attributes: vec![],
        };
        class.to_bytes().unwrap()
    }
}

pub fn code(max_stack: u16, max_locals: u16, body: Vec<u8>) -> class_file::Code {
    class_file::Code {
        max_stack,
        max_locals,
        code_array: BytecodeArray(body),
        exception_table: vec![],
        attributes: vec![],
    }
}

pub fn handler(start_pc: u16, end_pc: u16, handler_pc: u16) -> ExceptionHandler {
    ExceptionHandler {
        start_pc,
        end_pc,
        handler_pc,
        catch_type: class_file::ClassConstantIndex(ConstantIndex(0)),
    }
}

pub fn rewriter(policy: InclusionPolicy) -> MethodRewriter {
    MethodRewriter::new(
        Arc::new(policy),
        ProbeTarget::new(RECORDER_CLASS, RECORDER_METHOD),
    )
}

/// Rewritten class, parsed back
pub fn parse(bytes: &[u8]) -> ClassFile {
    ClassFile::from_bytes(bytes).unwrap()
}

pub fn find_method<'a>(class: &'a ClassFile, name: &str) -> &'a Method {
    class
        .methods
        .iter()
        .find(|method| class.constants.lookup_utf8(method.name_index).unwrap() == name)
        .unwrap_or_else(|| panic!("no method {}", name))
}

pub fn method_code(class: &ClassFile, name: &str) -> class_file::Code {
    find_method(class, name)
        .code(&class.constants)
        .unwrap()
        .unwrap()
}

pub fn method_attribute<'a>(class: &'a ClassFile, name: &str) -> &'a Attribute {
    let method = find_method(class, name);
    let position = method.code_attribute_position(&class.constants).unwrap();
    &method.attributes[position]
}

/// Instructions of a method, along with their offsets
pub fn instructions(code: &class_file::Code) -> Vec<(usize, Instruction<usize>)> {
    let bytes = &code.code_array.0;
    let mut decoded = vec![];
    let mut offset = 0;
    while offset < bytes.len() {
        let (insn, width) = Instruction::<usize>::decode(bytes, offset).unwrap();
        decoded.push((offset, insn));
        offset += width;
    }
    decoded
}

/// Identifiers reported by the probe at the start of the method, if there is one
///
/// Returns the identifiers of every probe found, so a method probed twice shows up as such.
pub fn probes(class: &ClassFile, name: &str) -> Vec<String> {
    let code = method_code(class, name);
    let insns = instructions(&code);
    let mut found = vec![];
    for pair in insns.windows(2) {
        if let [(_, Instruction::Ldc { index, .. }), (_, Instruction::Invoke { opcode, method })] =
            pair
        {
            if *opcode != opcodes::INVOKESTATIC || !is_recorder(&class.constants, *method) {
                continue;
            }
            if let Constant::String(utf8) = class.constants.lookup(*index).unwrap() {
                found.push(class.constants.lookup_utf8(*utf8).unwrap().to_owned());
            }
        }
    }
    found
}

/// Does the method start with a probe reporting this identifier?
pub fn starts_with_probe(class: &ClassFile, name: &str, id: &str) -> bool {
    let code = method_code(class, name);
    match instructions(&code).as_slice() {
        [(0, Instruction::Ldc { index, .. }), (_, Instruction::Invoke { opcode, method }), ..] => {
            *opcode == opcodes::INVOKESTATIC
                && is_recorder(&class.constants, *method)
                && matches!(
                    class.constants.lookup(*index).unwrap(),
                    Constant::String(utf8) if class.constants.lookup_utf8(*utf8).unwrap() == id
                )
        }
        _ => false,
    }
}

fn is_recorder(constants: &ConstantsPool, method: ConstantIndex) -> bool {
    match constants.lookup(method).unwrap() {
        Constant::MethodRef {
            class,
            name_and_type,
            ..
        } => {
            let (name, descriptor) = constants.lookup_name_and_type(*name_and_type).unwrap();
            constants.lookup_class_name(*class).unwrap() == RECORDER_CLASS
                && name == RECORDER_METHOD
                && descriptor == ProbeTarget::DESCRIPTOR
        }
        _ => false,
    }
}

/// Width in bytes of the probe (`ldc` or `ldc_w`, then `invokestatic`)
pub fn probe_width(class: &ClassFile, name: &str) -> usize {
    let code = method_code(class, name);
    match instructions(&code).as_slice() {
        [_, (invoke_offset, _), ..] => invoke_offset + 3,
        _ => panic!("method {} has no probe", name),
    }
}
