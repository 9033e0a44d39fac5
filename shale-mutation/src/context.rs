use shale_eval::TransferLimits;
use shale_storage::ReadSettings;

/// Execution-context settings the interpreter consumes.
///
/// `read_settings` governs the stage-0 read; the touched-rows estimator
/// derives its own forced single-threaded override from it. `transfer_limits`
/// bounds deferred-set materialization.
#[derive(Clone, Debug, Default)]
pub struct MutationContext {
    pub read_settings: ReadSettings,
    pub transfer_limits: TransferLimits,
}

impl MutationContext {
    pub fn new(read_settings: ReadSettings, transfer_limits: TransferLimits) -> Self {
        Self {
            read_settings,
            transfer_limits,
        }
    }
}
