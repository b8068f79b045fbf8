//! Test helpers: build the router around a scripted language model.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use axum_test::TestServer;
use deckforge_api::setup::routes;
use deckforge_api::AppState;
use deckforge_core::Config;
use deckforge_services::{GenerationRequest, LanguageModel, PresentationWorkflow};
use serde_json::{json, Value};
use tempfile::TempDir;

/// Test master API key (at least 32 characters).
pub const TEST_MASTER_API_KEY: &str = "test-master-api-key-at-least-32-characters-long";

pub const DECK_JSON: &str = r#"{"title": "Quarterly Review", "description": "Results for Q3", "slides": [{"title": "Revenue", "content": "Up 12%\nDriven by EMEA"}, {"title": "Next steps", "content": "Hire two engineers"}]}"#;

/// Language model double that replays scripted answers.
#[derive(Default)]
pub struct ScriptedModel {
    answers: Mutex<VecDeque<Result<String, String>>>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedModel {
    pub fn answering(answers: &[&str]) -> Self {
        Self {
            answers: Mutex::new(answers.iter().map(|a| Ok(a.to_string())).collect()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            answers: Mutex::new(VecDeque::from([Err(message.to_string())])),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl LanguageModel for ScriptedModel {
    fn model_name(&self) -> &str {
        "scripted"
    }

    async fn generate(&self, request: GenerationRequest) -> Result<String> {
        self.prompts.lock().unwrap().push(request.prompt);
        match self.answers.lock().unwrap().pop_front() {
            Some(Ok(answer)) => Ok(answer),
            Some(Err(message)) => Err(anyhow!(message)),
            None => Err(anyhow!("no scripted answer left")),
        }
    }
}

/// Test application: server plus the resources it writes into.
pub struct TestApp {
    pub server: TestServer,
    pub model: Arc<ScriptedModel>,
    pub results_dir: TempDir,
}

impl TestApp {
    pub fn client(&self) -> &TestServer {
        &self.server
    }
}

pub fn setup_test_app(model: ScriptedModel) -> TestApp {
    let results_dir = tempfile::tempdir().unwrap();
    let mut config = Config::with_api_key("test-google-key");
    config.allow_private_urls = true;
    config.results_dir = results_dir.path().to_path_buf();
    config.overlay_images_dir = results_dir.path().join("no-overlays");

    let model = Arc::new(model);
    let workflow = PresentationWorkflow::with_model(&config, model.clone()).unwrap();
    let state = Arc::new(AppState::new(workflow));
    let router =
        routes::setup_routes(&config, state, TEST_MASTER_API_KEY.to_string()).unwrap();

    TestApp {
        server: TestServer::new(router).unwrap(),
        model,
        results_dir,
    }
}

pub fn bearer() -> String {
    format!("Bearer {}", TEST_MASTER_API_KEY)
}

pub fn generate_body(file_url: &str, file_type: &str, lang: &str) -> Value {
    json!({
        "request_args": {
            "topic": "Quarterly review",
            "objective": "Share Q3 results",
            "target_audience": "Leadership team",
            "n_slides": 2,
            "slide_breakdown": "Revenue, then next steps",
            "lang": lang
        },
        "file_url": file_url,
        "file_type": file_type
    })
}
