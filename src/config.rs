//! Agent configuration
//!
//! Settings come from two Java properties files: the build properties of the project under test
//! (found in the working directory) and an optional file named by the agent arguments. Neither has
//! to exist; anything missing falls back to the defaults.

mod properties;

pub use properties::*;

use crate::jvm::{BinaryName, Name};
use log::{debug, warn};
use std::path::Path;

/// Build properties file looked for in the working directory
pub const BUILD_PROPERTIES_FILE: &str = "defects4j.build.properties";

/// Keys read from the build properties
pub const RELEVANT_CLASSES_KEY: &str = "d4j.classes.relevant";
pub const TRIGGER_TESTS_KEY: &str = "d4j.tests.trigger";

/// Keys read from the agent arguments file
pub const CLASSES_KEY: &str = "classes";
pub const EXCLUDE_TRIGGER_TESTS_KEY: &str = "args.d4j.exclude.test";
pub const USE_SPECIFIED_KEY: &str = "args.use.specified";
pub const SPECIFIED_CLASSES_KEY: &str = "args.classes";
pub const SPECIFIED_METHODS_KEY: &str = "args.methods";
pub const EXCLUDE_PATTERN_KEY: &str = "args.exclude.pattern";
pub const RECORDER_CLASS_KEY: &str = "args.recorder.class";
pub const RECORDER_METHOD_KEY: &str = "args.recorder.method";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Config {
    /// Classes relevant to the bug, written as `my.pkg.Klass`
    ///
    /// Taken from the build properties, or from the `classes` agent argument when the build
    /// properties don't list any.
    pub relevant_classes: Vec<String>,

    /// Tests that trigger the bug, written as `my.pkg.KlassTest::testMethod`
    pub trigger_tests: Vec<String>,

    /// Ignore `trigger_tests` entirely
    pub exclude_trigger_tests: bool,

    /// Use `specified_classes` and `specified_methods` instead of the relevant classes and
    /// trigger tests
    pub use_specified: bool,

    pub specified_classes: Vec<String>,

    /// Methods written as `my.pkg.Klass::method`
    pub specified_methods: Vec<String>,

    /// Classes whose name contains this are never instrumented (`None` to disable)
    pub exclude_pattern: Option<String>,

    /// Class holding the static method the probes call, written as `my/pkg/Recorder`
    pub recorder_class: String,

    /// Name of the static `(Ljava/lang/String;)V` method the probes call
    pub recorder_method: String,
}

impl Config {
    pub const DEFAULT_EXCLUDE_PATTERN: &'static str = "Exception";
    pub const DEFAULT_RECORDER_CLASS: &'static str = "methodrecord/MethodRecorder";
    pub const DEFAULT_RECORDER_METHOD: &'static str = "report";

    /// Build the configuration out of already loaded properties
    pub fn from_properties(build: &Properties, args: &Properties) -> Config {
        let defaults = Config::default();

        let relevant_classes = match build.get(RELEVANT_CLASSES_KEY) {
            Some(list) => split_list(list),
            None => args.get_list(CLASSES_KEY).unwrap_or_default(),
        };

        let exclude_pattern = match args.get(EXCLUDE_PATTERN_KEY) {
            Some(pattern) if pattern.trim().is_empty() => None,
            Some(pattern) => Some(pattern.trim().to_owned()),
            None => defaults.exclude_pattern,
        };

        Config {
            relevant_classes,
            trigger_tests: build.get_list(TRIGGER_TESTS_KEY).unwrap_or_default(),
            exclude_trigger_tests: args
                .get_bool(EXCLUDE_TRIGGER_TESTS_KEY, defaults.exclude_trigger_tests),
            use_specified: args.get_bool(USE_SPECIFIED_KEY, defaults.use_specified),
            specified_classes: args.get_list(SPECIFIED_CLASSES_KEY).unwrap_or_default(),
            specified_methods: args.get_list(SPECIFIED_METHODS_KEY).unwrap_or_default(),
            exclude_pattern,
            recorder_class: non_blank(args.get(RECORDER_CLASS_KEY))
                .and_then(recorder_class)
                .unwrap_or(defaults.recorder_class),
            recorder_method: non_blank(args.get(RECORDER_METHOD_KEY))
                .map(String::from)
                .unwrap_or(defaults.recorder_method),
        }
    }

    /// Load the build properties from `base_dir` and the agent arguments file, if any
    ///
    /// Files that can't be read are treated as empty.
    pub fn load(base_dir: &Path, agent_args: Option<&Path>) -> Config {
        let build = read_or_empty(&base_dir.join(BUILD_PROPERTIES_FILE));
        let args = match agent_args {
            Some(path) => read_or_empty(path),
            None => Properties::new(),
        };
        Config::from_properties(&build, &args)
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            relevant_classes: vec![],
            trigger_tests: vec![],
            exclude_trigger_tests: true,
            use_specified: false,
            specified_classes: vec![],
            specified_methods: vec![],
            exclude_pattern: Some(String::from(Config::DEFAULT_EXCLUDE_PATTERN)),
            recorder_class: String::from(Config::DEFAULT_RECORDER_CLASS),
            recorder_method: String::from(Config::DEFAULT_RECORDER_METHOD),
        }
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|value| !value.is_empty())
}

/// Internal name of the recorder class, written either as `my.pkg.Recorder` or `my/pkg/Recorder`
fn recorder_class(class: &str) -> Option<String> {
    match BinaryName::from_java_name(class) {
        Ok(name) => Some(name.as_str().to_owned()),
        Err(err) => {
            warn!("Ignoring {}: {}", RECORDER_CLASS_KEY, err);
            None
        }
    }
}

fn read_or_empty(path: &Path) -> Properties {
    match Properties::load(path) {
        Ok(properties) => properties,
        Err(err) => {
            debug!("Skipping {}: {}", path.display(), err);
            Properties::new()
        }
    }
}
