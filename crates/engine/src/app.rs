//! Application state and composition.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use comfydeck_domain::TagIndex;

use crate::infrastructure::{
    images::ImagePreviews,
    ports::{ComfyApiPort, RandomPort, SettingsRepo, WorkflowRepo},
};
use crate::stores::GenerationSession;
use crate::use_cases;

/// Main application state.
///
/// Holds the session, the backend port and all use cases.
/// Passed to HTTP handlers via Axum state.
pub struct App {
    pub session: Arc<GenerationSession>,
    pub comfy: Arc<dyn ComfyApiPort>,
    pub use_cases: UseCases,
    pub web: WebAssets,
}

/// Container for all use cases.
pub struct UseCases {
    pub workflow: use_cases::WorkflowUseCases,
    pub generation: use_cases::GenerationUseCases,
    pub settings: Arc<use_cases::SettingsOps>,
}

/// Files served next to the API.
pub struct WebAssets {
    /// Built frontend root
    pub dist_dir: PathBuf,
    pub previews: ImagePreviews,
    pub tags: TagIndex,
}

impl App {
    /// Create a new App with all dependencies wired up.
    pub fn new(
        comfy: Arc<dyn ComfyApiPort>,
        workflows: Arc<dyn WorkflowRepo>,
        settings_repo: Arc<dyn SettingsRepo>,
        random: Arc<dyn RandomPort>,
        poll_interval: Duration,
        web: WebAssets,
    ) -> Self {
        let session = Arc::new(GenerationSession::new());

        // Settings first: workflow loading and option seeding write through it
        let settings = Arc::new(use_cases::SettingsOps::new(settings_repo, session.clone()));

        let refresh_options = Arc::new(use_cases::workflow::RefreshObjectInfo::new(
            comfy.clone(),
            session.clone(),
            settings.clone(),
        ));
        let list = Arc::new(use_cases::workflow::ListWorkflows::new(
            workflows.clone(),
            session.clone(),
        ));
        let load = Arc::new(use_cases::workflow::LoadWorkflow::new(
            workflows,
            session.clone(),
            settings.clone(),
            refresh_options.clone(),
        ));
        let start = Arc::new(use_cases::workflow::StartSession::new(
            settings.clone(),
            list.clone(),
            load.clone(),
        ));

        let poll = Arc::new(use_cases::generation::PollJobs::new(
            comfy.clone(),
            session.clone(),
            poll_interval,
        ));
        let generate = Arc::new(use_cases::generation::GenerateImages::new(
            comfy.clone(),
            random,
            session.clone(),
            poll.clone(),
        ));
        let cancel = Arc::new(use_cases::generation::CancelGeneration::new(
            comfy.clone(),
            session.clone(),
        ));

        let use_cases = UseCases {
            workflow: use_cases::WorkflowUseCases::new(list, load, refresh_options, start),
            generation: use_cases::GenerationUseCases::new(generate, poll, cancel),
            settings,
        };

        Self {
            session,
            comfy,
            use_cases,
            web,
        }
    }
}
