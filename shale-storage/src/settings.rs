/// Settings governing one storage read.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReadSettings {
    /// Upper bound on reader threads. Storage may use fewer.
    pub max_threads: usize,
    /// Whether the read may fan out across replicas/shards.
    pub distributed: bool,
}

impl Default for ReadSettings {
    fn default() -> Self {
        Self {
            max_threads: num_threads_default(),
            distributed: true,
        }
    }
}

impl ReadSettings {
    /// Settings for the touched-rows existence check: single-threaded and
    /// non-distributed, so the count aggregate arrives as one deterministic
    /// result batch.
    pub fn for_existence_check(&self) -> Self {
        Self {
            max_threads: 1,
            distributed: false,
        }
    }
}

fn num_threads_default() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}
