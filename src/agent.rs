//! Start-up of the instrumentation inside a host process

use crate::config::Config;
use crate::hook::ClassFileTransformer;
use crate::policy::InclusionPolicy;
use crate::rewrite::{MethodRewriter, ProbeTarget};
use log::{debug, info};
use std::path::Path;
use std::sync::Arc;

/// Build script whose processes (compiling, packaging) must not be instrumented
const BUILD_SCRIPT_MARKER: &str = "defects4j.build.xml";

/// Build target that runs the tests, which is the one exception to the rule above
const TEST_TARGET_SUFFIX: &str = "run.dev.tests";

/// Classes making up the agent itself, in internal form
pub const AGENT_CLASSES: &[&str] = &[
    "methodrecord/MethodRecordAgent",
    "methodrecord/MethodRecordTransformer",
];

/// Instrumentation ready to be registered with the host
pub struct Agent {
    config: Config,
    rewriter: Arc<MethodRewriter>,
}

impl Agent {
    pub fn from_config(config: Config) -> Agent {
        let policy = Arc::new(InclusionPolicy::from_config(&config));
        let probe = ProbeTarget::new(&config.recorder_class, &config.recorder_method);
        let rewriter = MethodRewriter::new(policy, probe).skip_classes(AGENT_CLASSES.iter().copied());
        Agent {
            config,
            rewriter: Arc::new(rewriter),
        }
    }

    /// Set up the agent for a host process
    ///
    /// `host_command` is the command line the host was started with, `base_dir` its working
    /// directory and `agent_args` the path passed as agent argument. Returns `None` when the host
    /// should not be instrumented at all.
    pub fn premain(
        host_command: Option<&str>,
        base_dir: &Path,
        agent_args: Option<&Path>,
    ) -> Option<Agent> {
        if !should_attach(host_command) {
            debug!("Not attaching to {:?}", host_command);
            return None;
        }

        let agent = Agent::from_config(Config::load(base_dir, agent_args));
        let policy = agent.rewriter.policy();
        info!(
            "Recording entries into {} classes and {} methods",
            policy.classes().len(),
            policy.methods().len()
        );
        Some(agent)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn rewriter(&self) -> &MethodRewriter {
        &self.rewriter
    }

    /// Transformer to register with the host's class loading
    pub fn transformer(&self) -> Arc<dyn ClassFileTransformer> {
        self.rewriter.clone()
    }
}

/// Should the agent do anything in a host started with this command line?
pub fn should_attach(host_command: Option<&str>) -> bool {
    match host_command {
        Some(command) => {
            !command.contains(BUILD_SCRIPT_MARKER) || command.ends_with(TEST_TARGET_SUFFIX)
        }
        None => true,
    }
}
