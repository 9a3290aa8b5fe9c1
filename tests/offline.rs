mod common;

use common::*;
use method_record::agent::Agent;
use method_record::config::{Config, BUILD_PROPERTIES_FILE};
use method_record::jvm::code::opcodes;
use method_record::offline::{self, Summary};
use method_record::policy::InclusionPolicy;
use std::fs;

fn class_with_method(name: &str, method: &str) -> Vec<u8> {
    let mut class = ClassBuilder::new(name);
    class
        .constructor()
        .simple_method(method, code(0, 1, vec![opcodes::RETURN]));
    class.build()
}

#[test]
fn directory_layout_is_reproduced() {
    let input = tempfile::tempdir().unwrap();
    let output = tempfile::tempdir().unwrap();

    fs::create_dir_all(input.path().join("my/pkg")).unwrap();
    fs::write(
        input.path().join("my/pkg/Foo.class"),
        class_with_method("my/pkg/Foo", "bar"),
    )
    .unwrap();
    let baz = class_with_method("my/pkg/Baz", "qux");
    fs::write(input.path().join("my/pkg/Baz.class"), &baz).unwrap();
    fs::write(input.path().join("my/pkg/messages.properties"), "greeting=hi\n").unwrap();

    let rewriter = rewriter(InclusionPolicy::from_config(&Config {
        relevant_classes: vec![String::from("my.pkg.Foo")],
        ..Config::default()
    }));
    let summary = offline::instrument_path(&rewriter, input.path(), output.path()).unwrap();
    assert_eq!(
        summary,
        Summary {
            rewritten: 1,
            unchanged: 1,
            copied: 1,
        }
    );

    let foo = parse(&fs::read(output.path().join("my/pkg/Foo.class")).unwrap());
    assert_eq!(probes(&foo, "bar"), vec!["my.pkg.Foo::bar"]);
    assert_eq!(fs::read(output.path().join("my/pkg/Baz.class")).unwrap(), baz);
    assert_eq!(
        fs::read_to_string(output.path().join("my/pkg/messages.properties")).unwrap(),
        "greeting=hi\n"
    );
}

#[test]
fn single_files_land_in_the_output_directory() {
    let input = tempfile::tempdir().unwrap();
    let output = tempfile::tempdir().unwrap();

    let source = input.path().join("Foo.class");
    fs::write(&source, class_with_method("Foo", "bar")).unwrap();

    let rewriter = rewriter(InclusionPolicy::unrestricted());
    let summary = offline::instrument_path(&rewriter, &source, output.path()).unwrap();
    assert_eq!(summary.rewritten, 1);
    assert_eq!(
        summary.to_string(),
        "1 classes rewritten, 0 unchanged, 0 other files copied"
    );

    let foo = parse(&fs::read(output.path().join("Foo.class")).unwrap());
    assert!(starts_with_probe(&foo, "bar", "Foo::bar"));
}

#[test]
fn agent_configuration_drives_the_rewrite() {
    let build_dir = tempfile::tempdir().unwrap();
    fs::write(
        build_dir.path().join(BUILD_PROPERTIES_FILE),
        "d4j.classes.relevant=my.pkg.Foo\nd4j.tests.trigger=my.pkg.FooTest::testBar\n",
    )
    .unwrap();
    let args = build_dir.path().join("agent.properties");
    fs::write(
        &args,
        "args.d4j.exclude.test=false\nargs.recorder.class=my.Recorder\nargs.recorder.method=hit\n",
    )
    .unwrap();

    let agent = Agent::premain(
        Some("org.junit.runner.JUnitCore"),
        build_dir.path(),
        Some(args.as_path()),
    )
    .unwrap();
    let config: &Config = agent.config();
    assert_eq!(config.recorder_class, "my/Recorder");
    assert_eq!(config.recorder_method, "hit");

    let policy = agent.rewriter().policy();
    assert!(policy.is_class_eligible("my.pkg.Foo"));
    assert!(policy.is_class_eligible("my.pkg.FooTest"));
    assert!(!policy.is_class_eligible("my.pkg.Bar"));

    let mut test_class = ClassBuilder::new("my/pkg/FooTest");
    test_class
        .simple_method("testBar", code(0, 1, vec![opcodes::RETURN]))
        .simple_method("testOther", code(0, 1, vec![opcodes::RETURN]));
    let rewritten = agent
        .transformer()
        .transform(None, Some("my/pkg/FooTest"), Some(&test_class.build()))
        .unwrap();
    let rewritten = parse(&rewritten);

    // Probes go to the configured recorder, so the default one doesn't see them
    assert!(probes(&rewritten, "testBar").is_empty());
    let test_bar = method_code(&rewritten, "testBar");
    assert!(test_bar.code_array.0.len() > 1);
    let test_other = method_code(&rewritten, "testOther");
    assert_eq!(test_other.code_array.0, vec![opcodes::RETURN]);
}
