//! Test doubles shared by the service tests

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use deckforge_processing::{Downloader, TextSplitter};

use crate::gemini::{GenerationRequest, LanguageModel};

/// Replays scripted answers and records every request it receives.
#[derive(Default)]
pub struct StubModel {
    answers: Mutex<VecDeque<Result<String, String>>>,
    requests: Mutex<Vec<GenerationRequest>>,
}

impl StubModel {
    pub fn answering<I, S>(answers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            answers: Mutex::new(answers.into_iter().map(|a| Ok(a.into())).collect()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            answers: Mutex::new(VecDeque::from([Err(message.to_string())])),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn requests(&self) -> Vec<GenerationRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl LanguageModel for StubModel {
    fn model_name(&self) -> &str {
        "stub"
    }

    async fn generate(&self, request: GenerationRequest) -> Result<String> {
        self.requests.lock().unwrap().push(request);
        match self.answers.lock().unwrap().pop_front() {
            Some(Ok(answer)) => Ok(answer),
            Some(Err(message)) => Err(anyhow!(message)),
            None => Err(anyhow!("stub model has no answer left")),
        }
    }
}

pub fn downloader() -> Downloader {
    Downloader::new(Duration::from_secs(5), 1024 * 1024, true).unwrap()
}

pub fn splitter() -> TextSplitter {
    TextSplitter::new(1000, 0)
}

/// Watch page with a player response and one English caption track.
pub fn watch_page(length_secs: u64, caption_url: &str) -> String {
    format!(
        r#"<html><script>var ytInitialPlayerResponse = {{"videoDetails":{{"title":"Async Rust","lengthSeconds":"{}"}},"captions":{{"playerCaptionsTracklistRenderer":{{"captionTracks":[{{"baseUrl":"{}","languageCode":"en"}}]}}}}}};</script></html>"#,
        length_secs, caption_url
    )
}

pub const DECK_JSON: &str = r#"{"title": "Async Rust", "description": "Futures and runtimes", "slides": [{"title": "Futures", "content": "Lazy\nPolled"}, {"title": "Tokio", "content": "Runtime"}]}"#;
