//! Workflow template use cases.

use std::sync::Arc;

mod load;
mod object_info;

pub use load::{ListWorkflows, LoadError, LoadWorkflow, StartSession};
pub use object_info::RefreshObjectInfo;

/// Container for workflow use cases.
pub struct WorkflowUseCases {
    pub list: Arc<ListWorkflows>,
    pub load: Arc<LoadWorkflow>,
    pub refresh_options: Arc<RefreshObjectInfo>,
    pub start: Arc<StartSession>,
}

impl WorkflowUseCases {
    pub fn new(
        list: Arc<ListWorkflows>,
        load: Arc<LoadWorkflow>,
        refresh_options: Arc<RefreshObjectInfo>,
        start: Arc<StartSession>,
    ) -> Self {
        Self {
            list,
            load,
            refresh_options,
            start,
        }
    }
}
