//! Image generation use cases: submit, poll, cancel.

use std::sync::Arc;

mod cancel;
mod generate;
mod poll;

pub use cancel::{CancelGeneration, CancelOutcome};
pub use generate::{GenerateError, GenerateImages, GenerateOutcome, SEED_RANGE};
pub use poll::{PollJobs, PollStep};

/// Container for generation use cases.
pub struct GenerationUseCases {
    pub generate: Arc<GenerateImages>,
    pub poll: Arc<PollJobs>,
    pub cancel: Arc<CancelGeneration>,
}

impl GenerationUseCases {
    pub fn new(
        generate: Arc<GenerateImages>,
        poll: Arc<PollJobs>,
        cancel: Arc<CancelGeneration>,
    ) -> Self {
        Self {
            generate,
            poll,
            cancel,
        }
    }
}
