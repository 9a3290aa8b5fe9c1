//! Inject entry probes into class files

mod probe;

pub use probe::*;

use crate::hook::{ClassFileTransformer, LoaderId};
use crate::jvm::class_file::ClassFile;
use crate::jvm::code::{Code, MethodSignature};
use crate::jvm::{Error, MethodAccessFlags, UnqualifiedName};
use crate::policy::{InclusionPolicy, MethodId};
use log::{debug, info, warn};
use std::collections::HashSet;
use std::sync::Arc;

/// Rewrites eligible methods so that they report their first entry
///
/// Each eligible method gets a call to the probe target inserted in front of its first
/// instruction. Nothing else about the class changes, and classes with no eligible methods are
/// left untouched.
pub struct MethodRewriter {
    policy: Arc<InclusionPolicy>,
    probe: ProbeTarget,

    /// Internal names of classes that are never rewritten (the probe target is always one)
    skipped_classes: HashSet<String>,
}

impl MethodRewriter {
    pub fn new(policy: Arc<InclusionPolicy>, probe: ProbeTarget) -> MethodRewriter {
        let skipped_classes = HashSet::from([probe.class.clone()]);
        MethodRewriter {
            policy,
            probe,
            skipped_classes,
        }
    }

    /// Never rewrite these classes (written as `my/pkg/Klass`)
    pub fn skip_classes<I, S>(mut self, classes: I) -> MethodRewriter
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.skipped_classes
            .extend(classes.into_iter().map(Into::into));
        self
    }

    pub fn policy(&self) -> &InclusionPolicy {
        &self.policy
    }

    pub fn probe(&self) -> &ProbeTarget {
        &self.probe
    }

    /// Rewrite a class, given its internal name (eg. `my/pkg/Klass`)
    ///
    /// Returns `None` when the class should be left as it is: it is not eligible, has no eligible
    /// methods, or couldn't be processed.
    pub fn transform(&self, class_name: &str, class_bytes: &[u8]) -> Option<Vec<u8>> {
        if !self.accepts(class_name) {
            return None;
        }

        info!("Transforming class {}", class_name);
        let rewritten = ClassFile::from_bytes(class_bytes)
            .and_then(|class| self.rewrite_class(class));
        unchanged_on_error(class_name, rewritten)
    }

    /// Rewrite an already parsed class, taking its name from the class itself
    pub fn transform_class(&self, class: ClassFile) -> Option<Vec<u8>> {
        let class_name = match class.class_name() {
            Ok(name) => name.to_owned(),
            Err(err) => {
                warn!("Class file without a name: {}", err);
                return None;
            }
        };
        if !self.accepts(&class_name) {
            return None;
        }

        info!("Transforming class {}", class_name);
        let rewritten = self.rewrite_class(class);
        unchanged_on_error(&class_name, rewritten)
    }

    /// Is the class (written as `my/pkg/Klass`) a candidate for rewriting at all?
    fn accepts(&self, class_name: &str) -> bool {
        !self.skipped_classes.contains(class_name)
            && self.policy.is_class_eligible(&class_name.replace('/', "."))
    }

    /// Rewrite every eligible method of a class
    ///
    /// A method that can't be rewritten is left as it was without affecting the others.
    pub fn rewrite_class(&self, mut class: ClassFile) -> Result<Option<Vec<u8>>, Error> {
        let owner = class.class_name()?.to_owned();

        let mut instrumented = 0;
        for method_idx in 0..class.methods.len() {
            match self.rewrite_method(&mut class, &owner, method_idx) {
                Ok(true) => instrumented += 1,
                Ok(false) => (),
                Err(err) => warn!("Leaving a method of {} unchanged: {}", owner, err),
            }
        }

        if instrumented == 0 {
            debug!("No methods of {} instrumented", owner);
            return Ok(None);
        }
        Ok(Some(class.to_bytes()?))
    }

    /// Insert the probe into one method, returning whether the method was eligible
    fn rewrite_method(
        &self,
        class: &mut ClassFile,
        owner: &str,
        method_idx: usize,
    ) -> Result<bool, Error> {
        let method = &class.methods[method_idx];
        let name = class.constants.lookup_utf8(method.name_index)?;
        let id = MethodId::from_internal(owner, name);

        if !self.policy.is_method_eligible(&id) || UnqualifiedName::is_initializer(name) {
            return Ok(false);
        }
        if method
            .access_flags
            .intersects(MethodAccessFlags::ABSTRACT | MethodAccessFlags::NATIVE)
        {
            return Ok(false);
        }
        let code = match method.code(&class.constants)? {
            Some(code) => code,
            None => return Ok(false),
        };
        let signature = MethodSignature::of_method(method, &class.constants)?;
        let mut code = Code::decode(&code, &class.constants, signature)?;

        let probe = self.probe.instructions(&mut class.constants, &id)?;
        code.instructions.insert_at_start(probe);
        let code = code.encode(&mut class.constants)?;
        class.methods[method_idx].set_code(&mut class.constants, &code)?;

        debug!("Instrumented {}", id);
        Ok(true)
    }
}

fn unchanged_on_error(
    class_name: &str,
    rewritten: Result<Option<Vec<u8>>, Error>,
) -> Option<Vec<u8>> {
    match rewritten {
        Ok(rewritten) => rewritten,
        Err(err) => {
            warn!("Leaving class {} unchanged: {}", class_name, err);
            None
        }
    }
}

impl ClassFileTransformer for MethodRewriter {
    fn transform(
        &self,
        _loader: Option<LoaderId>,
        class_name: Option<&str>,
        class_bytes: Option<&[u8]>,
    ) -> Option<Vec<u8>> {
        match (class_name, class_bytes) {
            (Some(class_name), Some(class_bytes)) => {
                MethodRewriter::transform(self, class_name, class_bytes)
            }
            _ => None,
        }
    }
}
