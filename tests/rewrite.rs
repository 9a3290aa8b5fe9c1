mod common;

use common::*;
use method_record::config::Config;
use method_record::hook::{ClassFileTransformer, LoaderId};
use method_record::jvm::class_file::{
    LineNumber, LineNumberTable, LocalVariable, LocalVariableTable, StackMapFrame, StackMapTable,
    VerificationType,
};
use method_record::jvm::code::{opcodes, Instruction};
use method_record::jvm::MethodAccessFlags;
use method_record::policy::InclusionPolicy;

const LLOAD_0: u8 = 0x1e;
const LLOAD_2: u8 = 0x20;
const ILOAD_1: u8 = 0x1b;
const ICONST_1: u8 = 0x04;
const DUP: u8 = 0x59;

fn foo_class() -> Vec<u8> {
    let mut class = ClassBuilder::new("Foo");
    class
        .constructor()
        .simple_method("bar", code(0, 1, vec![opcodes::RETURN]));
    class.build()
}

fn relevant(classes: &[&str]) -> InclusionPolicy {
    InclusionPolicy::from_config(&Config {
        relevant_classes: classes.iter().map(|class| String::from(*class)).collect(),
        ..Config::default()
    })
}

#[test]
fn relevant_class_gets_probes_outside_constructors() {
    let policy = relevant(&["Foo"]);
    assert!(policy.methods().is_empty());
    let rewriter = rewriter(policy);

    let original_bytes = foo_class();
    let original = parse(&original_bytes);
    let rewritten = parse(&rewriter.transform("Foo", &original_bytes).unwrap());

    assert!(starts_with_probe(&rewritten, "bar", "Foo::bar"));
    assert_eq!(probes(&rewritten, "bar"), vec!["Foo::bar"]);
    assert_eq!(
        method_attribute(&rewritten, "<init>").info,
        method_attribute(&original, "<init>").info
    );
    assert!(probes(&rewritten, "<init>").is_empty());

    let bar = method_code(&rewritten, "bar");
    assert!(bar.max_stack >= 1);
    assert_eq!(bar.max_locals, 1);
}

#[test]
fn classes_outside_the_set_are_unchanged() {
    let rewriter = rewriter(relevant(&["Foo"]));

    let mut baz = ClassBuilder::new("Baz");
    baz.simple_method("qux", code(0, 1, vec![opcodes::RETURN]));
    assert_eq!(rewriter.transform("Baz", &baz.build()), None);
}

#[test]
fn exception_classes_are_excluded_even_when_listed() {
    let rewriter = rewriter(relevant(&["Foo", "my.FooException"]));

    let mut exception = ClassBuilder::new("my/FooException");
    exception.simple_method("bar", code(0, 1, vec![opcodes::RETURN]));
    assert_eq!(rewriter.transform("my/FooException", &exception.build()), None);
    assert!(rewriter.transform("Foo", &foo_class()).is_some());
}

#[test]
fn exception_classes_are_excluded_when_listed_alone() {
    let rewriter = rewriter(relevant(&["my.FooException"]));

    let mut exception = ClassBuilder::new("my/FooException");
    exception.simple_method("bar", code(0, 1, vec![opcodes::RETURN]));
    assert_eq!(rewriter.transform("my/FooException", &exception.build()), None);
}

#[test]
fn specified_methods_restrict_their_classes() {
    let policy = InclusionPolicy::from_config(&Config {
        use_specified: true,
        specified_methods: vec![String::from("Foo::bar"), String::from("Qux::baz")],
        ..Config::default()
    });
    let rewriter = rewriter(policy);

    let mut foo = ClassBuilder::new("Foo");
    foo.simple_method("bar", code(0, 1, vec![opcodes::RETURN]))
        .simple_method("other", code(0, 1, vec![opcodes::RETURN]));
    let rewritten = parse(&rewriter.transform("Foo", &foo.build()).unwrap());
    assert_eq!(probes(&rewritten, "bar"), vec!["Foo::bar"]);
    assert!(probes(&rewritten, "other").is_empty());

    let mut other = ClassBuilder::new("Other");
    other.simple_method("bar", code(0, 1, vec![opcodes::RETURN]));
    assert_eq!(rewriter.transform("Other", &other.build()), None);
}

#[test]
fn unrestricted_policy_probes_every_method_once() {
    let rewriter = rewriter(InclusionPolicy::unrestricted());

    let mut class = ClassBuilder::new("a/b/Widget");
    class
        .constructor()
        .method(
            MethodAccessFlags::STATIC,
            "<clinit>",
            "()V",
            Some(code(0, 0, vec![opcodes::RETURN])),
        )
        .simple_method("run", code(0, 1, vec![opcodes::RETURN]))
        .method(
            MethodAccessFlags::PUBLIC | MethodAccessFlags::STATIC,
            "compute",
            "()I",
            Some(code(1, 0, vec![opcodes::ICONST_0, opcodes::IRETURN])),
        )
        .method(
            MethodAccessFlags::PUBLIC | MethodAccessFlags::ABSTRACT,
            "shape",
            "()V",
            None,
        )
        .method(MethodAccessFlags::PUBLIC | MethodAccessFlags::NATIVE, "peek", "()J", None);
    let original_bytes = class.build();
    let original = parse(&original_bytes);
    let rewritten = parse(&rewriter.transform("a/b/Widget", &original_bytes).unwrap());

    assert_eq!(probes(&rewritten, "run"), vec!["a.b.Widget::run"]);
    assert_eq!(probes(&rewritten, "compute"), vec!["a.b.Widget::compute"]);
    for untouched in ["<init>", "<clinit>"] {
        assert_eq!(
            method_attribute(&rewritten, untouched).info,
            method_attribute(&original, untouched).info
        );
    }
    for no_code in ["shape", "peek"] {
        let method = find_method(&rewritten, no_code);
        assert!(method.code(&rewritten.constants).unwrap().is_none());
        assert!(method.attributes.is_empty());
    }

    let names: Vec<&str> = rewritten
        .methods
        .iter()
        .map(|method| rewritten.constants.lookup_utf8(method.name_index).unwrap())
        .collect();
    assert_eq!(
        names,
        vec!["<init>", "<clinit>", "run", "compute", "shape", "peek"]
    );
}

#[test]
fn max_stack_and_locals_are_recomputed() {
    let rewriter = rewriter(InclusionPolicy::unrestricted());

    let mut class = ClassBuilder::new("Adder");
    class.method(
        MethodAccessFlags::STATIC,
        "add",
        "(JJ)J",
        Some(code(
            10,
            10,
            vec![LLOAD_0, LLOAD_2, opcodes::LADD, opcodes::LRETURN],
        )),
    );
    let rewritten = parse(&rewriter.transform("Adder", &class.build()).unwrap());

    let add = method_code(&rewritten, "add");
    assert_eq!(add.max_stack, 4);
    assert_eq!(add.max_locals, 4);
    assert_eq!(add.code_array.0.len(), probe_width(&rewritten, "add") + 4);
}

#[test]
fn wide_ldc_when_the_string_index_is_large() {
    let rewriter = rewriter(InclusionPolicy::unrestricted());

    let mut class = ClassBuilder::new("Big");
    for i in 0..300 {
        class.constants.get_utf8(format!("filler{}", i)).unwrap();
    }
    class.simple_method("bar", code(0, 1, vec![opcodes::RETURN]));
    let rewritten = parse(&rewriter.transform("Big", &class.build()).unwrap());

    let bar = method_code(&rewritten, "bar");
    match instructions(&bar).as_slice() {
        [(0, Instruction::Ldc { index, wide: true }), (3, Instruction::Invoke { .. }), (6, Instruction::Simple(opcodes::RETURN))] => {
            assert!(index.0 > 255)
        }
        other => panic!("unexpected instructions {:?}", other),
    }
    assert!(starts_with_probe(&rewritten, "bar", "Big::bar"));
}

#[test]
fn tableswitch_padding_and_targets_are_relocated() {
    let rewriter = rewriter(InclusionPolicy::unrestricted());

    #[rustfmt::skip]
    let body = vec![
        opcodes::ILOAD_0,
        opcodes::TABLESWITCH, 0x00, 0x00,
        0x00, 0x00, 0x00, 21, // default: 22
        0x00, 0x00, 0x00, 0x00, // low
        0x00, 0x00, 0x00, 0x00, // high
        0x00, 0x00, 0x00, 19, // 0: 20
        ICONST_1, opcodes::IRETURN,
        opcodes::ICONST_0, opcodes::IRETURN,
    ];
    let mut class = ClassBuilder::new("Switch");
    class.method(MethodAccessFlags::STATIC, "pick", "(I)I", Some(code(1, 1, body)));
    let rewritten = parse(&rewriter.transform("Switch", &class.build()).unwrap());
    assert_eq!(probe_width(&rewritten, "pick"), 5);

    let pick = method_code(&rewritten, "pick");
    let insns = instructions(&pick);
    assert_eq!(insns[2], (5, Instruction::Simple(opcodes::ILOAD_0)));
    assert_eq!(
        insns[3],
        (
            6,
            Instruction::TableSwitch {
                default: 26,
                low: 0,
                targets: vec![24],
            }
        )
    );
    assert_eq!(insns[4], (24, Instruction::Simple(ICONST_1)));
    assert_eq!(insns[6], (26, Instruction::Simple(opcodes::ICONST_0)));

    // One byte of padding instead of two
    assert_eq!(pick.code_array.0[7], 0);
    assert_eq!(pick.code_array.0.len(), 28);
    assert_eq!(pick.max_stack, 1);
}

#[test]
fn handlers_lines_and_frames_follow_their_instructions() {
    let rewriter = rewriter(InclusionPolicy::unrestricted());

    let mut class = ClassBuilder::new("Guarded");
    let throwable = class.constants.get_class("java/lang/Throwable").unwrap();
    let lines = class
        .constants
        .get_attribute(&LineNumberTable(vec![
            LineNumber {
                start_pc: 0,
                line_number: 10,
            },
            LineNumber {
                start_pc: 4,
                line_number: 11,
            },
            LineNumber {
                start_pc: 5,
                line_number: 12,
            },
        ]))
        .unwrap();
    let frames = class
        .constants
        .get_attribute(&StackMapTable(vec![
            StackMapFrame::SameLocalsOneStack {
                offset_delta: 4,
                stack: VerificationType::Object(throwable),
            },
            StackMapFrame::SameLocalsNoStack { offset_delta: 0 },
        ]))
        .unwrap();
    let mut body = code(
        1,
        0,
        vec![
            opcodes::NOP,
            opcodes::GOTO,
            0x00,
            0x04,
            opcodes::POP,
            opcodes::RETURN,
        ],
    );
    body.exception_table.push(handler(0, 1, 4));
    body.attributes = vec![lines, frames];
    class.method(MethodAccessFlags::STATIC, "guarded", "()V", Some(body));

    let rewritten = parse(&rewriter.transform("Guarded", &class.build()).unwrap());
    assert_eq!(probe_width(&rewritten, "guarded"), 5);
    let guarded = method_code(&rewritten, "guarded");

    let insns = instructions(&guarded);
    assert_eq!(
        &insns[2..],
        &[
            (5, Instruction::Simple(opcodes::NOP)),
            (
                6,
                Instruction::Branch {
                    opcode: opcodes::GOTO,
                    target: 10,
                }
            ),
            (9, Instruction::Simple(opcodes::POP)),
            (10, Instruction::Simple(opcodes::RETURN)),
        ]
    );

    assert_eq!(guarded.exception_table, vec![handler(5, 6, 9)]);

    let constants = &rewritten.constants;
    let lines = guarded
        .attributes
        .iter()
        .find(|attribute| attribute.is::<LineNumberTable>(constants))
        .unwrap()
        .decode::<LineNumberTable>()
        .unwrap();
    let starts: Vec<(u16, u16)> = lines
        .0
        .iter()
        .map(|line| (line.start_pc, line.line_number))
        .collect();
    assert_eq!(starts, vec![(5, 10), (9, 11), (10, 12)]);

    let frames = guarded
        .attributes
        .iter()
        .find(|attribute| attribute.is::<StackMapTable>(constants))
        .unwrap()
        .decode::<StackMapTable>()
        .unwrap();
    assert_eq!(
        frames.0,
        vec![
            StackMapFrame::SameLocalsOneStack {
                offset_delta: 9,
                stack: VerificationType::Object(throwable),
            },
            StackMapFrame::SameLocalsNoStack { offset_delta: 0 },
        ]
    );
    assert_eq!(guarded.max_stack, 1);
}

#[test]
fn uninitialized_types_and_local_variables_are_relocated() {
    let rewriter = rewriter(InclusionPolicy::unrestricted());

    let mut class = ClassBuilder::new("Maker");
    let maker = class.constants.get_class("Maker").unwrap();
    let init = class
        .constants
        .get_method_ref("Maker", "<init>", "()V")
        .unwrap();
    let this_name = class.constants.get_utf8("this").unwrap();
    let this_descriptor = class.constants.get_utf8("LMaker;").unwrap();
    let locals = class
        .constants
        .get_attribute(&LocalVariableTable(vec![LocalVariable {
            start_pc: 0,
            length: 9,
            name: this_name,
            descriptor: this_descriptor,
            index: 0,
        }]))
        .unwrap();
    let frames = class
        .constants
        .get_attribute(&StackMapTable(vec![StackMapFrame::Full {
            offset_delta: 3,
            locals: vec![VerificationType::Object(maker)],
            stack: vec![VerificationType::Uninitialized(0)],
        }]))
        .unwrap();

    let [maker_hi, maker_lo] = maker.0 .0.to_be_bytes();
    let [init_hi, init_lo] = init.0 .0.to_be_bytes();
    let mut body = code(
        2,
        1,
        vec![
            opcodes::NEW,
            maker_hi,
            maker_lo,
            DUP,
            opcodes::INVOKESPECIAL,
            init_hi,
            init_lo,
            opcodes::POP,
            opcodes::RETURN,
        ],
    );
    body.attributes = vec![locals, frames];
    class.simple_method("make", body);

    let rewritten = parse(&rewriter.transform("Maker", &class.build()).unwrap());
    let make = method_code(&rewritten, "make");
    let constants = &rewritten.constants;

    let frames = make
        .attributes
        .iter()
        .find(|attribute| attribute.is::<StackMapTable>(constants))
        .unwrap()
        .decode::<StackMapTable>()
        .unwrap();
    assert_eq!(
        frames.0,
        vec![StackMapFrame::Full {
            offset_delta: 8,
            locals: vec![VerificationType::Object(maker)],
            stack: vec![VerificationType::Uninitialized(5)],
        }]
    );

    let locals = make
        .attributes
        .iter()
        .find(|attribute| attribute.is::<LocalVariableTable>(constants))
        .unwrap()
        .decode::<LocalVariableTable>()
        .unwrap();
    assert_eq!(locals.0.len(), 1);
    assert_eq!((locals.0[0].start_pc, locals.0[0].length), (5, 9));

    assert_eq!(make.max_stack, 2);
    assert_eq!(make.max_locals, 1);
}

#[test]
fn jumps_to_the_first_instruction_skip_the_probe() {
    let rewriter = rewriter(InclusionPolicy::unrestricted());

    let mut class = ClassBuilder::new("Spin");
    class.method(
        MethodAccessFlags::STATIC,
        "spin",
        "(I)V",
        Some(code(
            0,
            1,
            vec![opcodes::IINC, 0x00, 0x01, opcodes::GOTO, 0xff, 0xfd],
        )),
    );
    let rewritten = parse(&rewriter.transform("Spin", &class.build()).unwrap());

    let spin = method_code(&rewritten, "spin");
    assert_eq!(
        instructions(&spin)[3],
        (
            8,
            Instruction::Branch {
                opcode: opcodes::GOTO,
                target: 5,
            }
        )
    );
    assert_eq!(probes(&rewritten, "spin"), vec!["Spin::spin"]);
}

#[test]
fn broken_methods_are_left_alone() {
    let rewriter = rewriter(InclusionPolicy::unrestricted());

    let mut class = ClassBuilder::new("Mixed");
    class
        .simple_method("broken", code(0, 1, vec![0xcb, opcodes::RETURN]))
        .method(
            MethodAccessFlags::PUBLIC,
            "fine",
            "(I)I",
            Some(code(1, 2, vec![ILOAD_1, opcodes::IRETURN])),
        );
    let original_bytes = class.build();
    let original = parse(&original_bytes);
    let rewritten = parse(&rewriter.transform("Mixed", &original_bytes).unwrap());

    assert_eq!(
        method_attribute(&rewritten, "broken").info,
        method_attribute(&original, "broken").info
    );
    assert_eq!(probes(&rewritten, "fine"), vec!["Mixed::fine"]);
}

#[test]
fn malformed_and_missing_inputs_pass_through() {
    let rewriter = rewriter(InclusionPolicy::unrestricted());
    let transformer: &dyn ClassFileTransformer = &rewriter;

    assert_eq!(transformer.transform(None, Some("Foo"), None), None);
    assert_eq!(transformer.transform(None, None, Some(&foo_class())), None);
    assert_eq!(
        transformer.transform(Some(LoaderId(1)), Some("Foo"), Some(&[0xCA, 0xFE, 0xBA])),
        None
    );
    assert!(transformer
        .transform(Some(LoaderId(1)), Some("Foo"), Some(&foo_class()))
        .is_some());

    // The recorder itself is never instrumented
    let mut recorder = ClassBuilder::new(RECORDER_CLASS);
    recorder.method(
        MethodAccessFlags::PUBLIC | MethodAccessFlags::STATIC,
        RECORDER_METHOD,
        "(Ljava/lang/String;)V",
        Some(code(0, 1, vec![opcodes::RETURN])),
    );
    assert_eq!(rewriter.transform(RECORDER_CLASS, &recorder.build()), None);
}

#[test]
fn oversized_attribute_lengths_pass_through() {
    let rewriter = rewriter(InclusionPolicy::unrestricted());

    #[rustfmt::skip]
    let bytes = [
        0xCA, 0xFE, 0xBA, 0xBE,
        0, 0, 0, 52,
        0, 1,
        0, 0x21, 0, 1, 0, 2,
        0, 0, 0, 0, 0, 0,
        0, 1,
        0, 1, 0xFF, 0xFF, 0xFF, 0xF0,
    ];
    assert_eq!(rewriter.transform("X", &bytes), None);
}

#[test]
fn parsed_classes_are_rewritten_under_their_own_name() {
    let rewriter = rewriter(relevant(&["Foo"]));

    let rewritten = rewriter.transform_class(parse(&foo_class())).unwrap();
    assert_eq!(probes(&parse(&rewritten), "bar"), vec!["Foo::bar"]);

    let mut baz = ClassBuilder::new("Baz");
    baz.simple_method("qux", code(0, 1, vec![opcodes::RETURN]));
    assert_eq!(rewriter.transform_class(parse(&baz.build())), None);
}

#[test]
fn nothing_eligible_means_no_rewrite() {
    let rewriter = rewriter(InclusionPolicy::unrestricted());

    let mut class = ClassBuilder::new("Shell");
    class.constructor();
    assert_eq!(rewriter.transform("Shell", &class.build()), None);
}
