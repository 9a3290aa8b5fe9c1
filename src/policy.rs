//! Which classes and methods get instrumented

use crate::config::Config;
use std::collections::HashSet;
use std::fmt;

/// Method identifier of the form `my.pkg.Klass::method`
///
/// This is what configuration lists, what the inclusion checks compare against, and what the
/// probes report.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MethodId {
    /// Class name, written as `my.pkg.Klass`
    pub class: String,
    pub method: String,
}

impl MethodId {
    pub const SEPARATOR: &'static str = "::";

    pub fn new(class: impl Into<String>, method: impl Into<String>) -> MethodId {
        MethodId {
            class: class.into(),
            method: method.into(),
        }
    }

    /// Identifier for a method, given the internal name of its class (eg. `my/pkg/Klass`)
    pub fn from_internal(internal_class_name: &str, method: &str) -> MethodId {
        MethodId::new(internal_class_name.replace('/', "."), method)
    }

    /// Split an identifier on the first `::` (without one, the whole thing is the class)
    pub fn parse(id: &str) -> MethodId {
        match id.split_once(MethodId::SEPARATOR) {
            Some((class, method)) => MethodId::new(class, method),
            None => MethodId::new(id, ""),
        }
    }
}

impl fmt::Display for MethodId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.class, MethodId::SEPARATOR, self.method)
    }
}

/// Classes and methods eligible for instrumentation
///
/// Built once from the configuration and never changed after.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct InclusionPolicy {
    /// Eligible classes, written as `my.pkg.Klass` (empty means all classes)
    classes: HashSet<String>,

    /// Eligible methods, written as `my.pkg.Klass::method` (empty means all methods)
    methods: HashSet<String>,

    /// When set, `methods` only applies to methods of these classes
    method_scope: Option<HashSet<String>>,

    /// Classes whose name contains this are never eligible, whatever `classes` says
    exclude_pattern: Option<String>,
}

impl InclusionPolicy {
    /// Everything is eligible
    pub fn unrestricted() -> InclusionPolicy {
        InclusionPolicy::default()
    }

    pub fn from_config(config: &Config) -> InclusionPolicy {
        let mut classes: HashSet<String> = HashSet::new();
        let mut methods: HashSet<String> = HashSet::new();
        let mut method_scope = None;

        if config.use_specified {
            classes.extend(config.specified_classes.iter().cloned());
            methods.extend(config.specified_methods.iter().cloned());
        } else {
            // Trigger tests only pull in their test classes, and only restrict methods there
            classes.extend(config.relevant_classes.iter().cloned());
            if !config.exclude_trigger_tests {
                methods.extend(config.trigger_tests.iter().cloned());
            }
            method_scope = Some(owners(&methods));
        }
        classes.extend(owners(&methods));

        classes.remove("");
        methods.remove("");
        let exclude_pattern = config.exclude_pattern.clone();
        if let Some(pattern) = &exclude_pattern {
            classes.retain(|class| !class.contains(pattern.as_str()));
        }

        InclusionPolicy {
            classes,
            methods,
            method_scope,
            exclude_pattern,
        }
    }

    /// Raw set of eligible classes (empty means all classes)
    pub fn classes(&self) -> &HashSet<String> {
        &self.classes
    }

    /// Raw set of eligible methods (empty means all methods)
    pub fn methods(&self) -> &HashSet<String> {
        &self.methods
    }

    /// Is this class (written as `my.pkg.Klass`) eligible?
    pub fn is_class_eligible(&self, class_name: &str) -> bool {
        if let Some(pattern) = &self.exclude_pattern {
            if class_name.contains(pattern.as_str()) {
                return false;
            }
        }
        self.classes.is_empty() || self.classes.contains(class_name)
    }

    /// Is the method eligible, assuming its class is?
    pub fn is_method_eligible(&self, method: &MethodId) -> bool {
        if self.methods.is_empty() {
            return true;
        }
        match &self.method_scope {
            Some(scope) if !scope.contains(&method.class) => true,
            _ => self.methods.contains(&method.to_string()),
        }
    }
}

fn owners(methods: &HashSet<String>) -> HashSet<String> {
    methods
        .iter()
        .map(|method| MethodId::parse(method).class)
        .collect()
}
