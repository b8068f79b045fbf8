//! Application state shared by the handlers.

use deckforge_services::PresentationWorkflow;

#[derive(Clone)]
pub struct AppState {
    pub workflow: PresentationWorkflow,
}

impl AppState {
    pub fn new(workflow: PresentationWorkflow) -> Self {
        Self { workflow }
    }
}
