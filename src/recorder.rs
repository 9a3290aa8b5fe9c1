//! Process-wide record of which instrumented methods have run
//!
//! Every probe calls [`report`] with its method identifier. The first report of an identifier
//! emits one trace record; every later report of it does nothing.
//!
//! The injected bytecode calls a static `(Ljava/lang/String;)V` method on the JVM side (see
//! [`ProbeTarget`](crate::rewrite::ProbeTarget)). The host provides that class and forwards each
//! call to [`report`], eg. through a JNI `native` method.

use log::info;
use parking_lot::RwLock;
use std::collections::hash_map::RandomState;
use std::collections::HashSet;
use std::hash::{BuildHasher, Hash, Hasher};
use std::sync::OnceLock;

/// Log target of trace records
pub const TRACE_TARGET: &str = "method_record::trace";

/// Destination for trace records
pub trait TraceSink: Send + Sync {
    /// Called exactly once per distinct identifier
    fn record(&self, id: &str);
}

/// Writes each trace record as an `info` log line on [`TRACE_TARGET`]
#[derive(Debug, Default)]
pub struct LogSink;

impl TraceSink for LogSink {
    fn record(&self, id: &str) {
        info!(target: TRACE_TARGET, "{}", id);
    }
}

/// Concurrent set of reported identifiers, split into independently locked shards
pub struct ProbeRecorder {
    shards: Vec<RwLock<HashSet<String>>>,
    hasher: RandomState,
    sink: Box<dyn TraceSink>,
}

impl ProbeRecorder {
    pub const DEFAULT_SHARDS: usize = 16;

    /// Recorder that writes trace records to the log
    pub fn new() -> ProbeRecorder {
        ProbeRecorder::with_sink(Box::new(LogSink))
    }

    pub fn with_sink(sink: Box<dyn TraceSink>) -> ProbeRecorder {
        let shards = (0..ProbeRecorder::DEFAULT_SHARDS)
            .map(|_| RwLock::new(HashSet::new()))
            .collect();
        ProbeRecorder {
            shards,
            hasher: RandomState::new(),
            sink,
        }
    }

    fn shard(&self, id: &str) -> &RwLock<HashSet<String>> {
        let mut hasher = self.hasher.build_hasher();
        id.hash(&mut hasher);
        &self.shards[hasher.finish() as usize % self.shards.len()]
    }

    /// Report that the method `id` was entered
    ///
    /// Returns whether this was the first report (in which case a trace record was emitted).
    /// When several threads race to report the same new identifier, exactly one of them wins.
    pub fn report(&self, id: &str) -> bool {
        let shard = self.shard(id);

        // Already seen is by far the common case, so check under the shared lock first
        if shard.read().contains(id) {
            return false;
        }

        let first = shard.write().insert(id.to_owned());
        if first {
            self.sink.record(id);
        }
        first
    }

    pub fn has_visited(&self, id: &str) -> bool {
        self.shard(id).read().contains(id)
    }

    /// Number of distinct identifiers reported so far
    pub fn visited_count(&self) -> usize {
        self.shards.iter().map(|shard| shard.read().len()).sum()
    }

    /// Sorted identifiers reported so far
    pub fn snapshot(&self) -> Vec<String> {
        let mut visited: Vec<String> = self
            .shards
            .iter()
            .flat_map(|shard| shard.read().iter().cloned().collect::<Vec<_>>())
            .collect();
        visited.sort();
        visited
    }
}

impl Default for ProbeRecorder {
    fn default() -> Self {
        ProbeRecorder::new()
    }
}

static RECORDER: OnceLock<ProbeRecorder> = OnceLock::new();

/// The process-wide recorder, created empty on first use
pub fn global() -> &'static ProbeRecorder {
    RECORDER.get_or_init(ProbeRecorder::new)
}

/// Report that the method `id` was entered, to the process-wide recorder
pub fn report(id: &str) -> bool {
    global().report(id)
}
