//! YouTube video metadata and transcripts
//!
//! The watch page embeds the player response as a JSON object assigned to
//! `ytInitialPlayerResponse`; it carries the title, the length in seconds, and
//! the caption tracks. A caption track's `baseUrl` serves the transcript as
//! `<transcript><text start dur>…</text></transcript>` XML.

use anyhow::{anyhow, Context, Result};
use quick_xml::events::Event;
use quick_xml::Reader;
use serde::Deserialize;

use crate::fetch::Downloader;

const PLAYER_RESPONSE_MARKER: &str = "ytInitialPlayerResponse";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoInfo {
    pub video_id: String,
    pub title: String,
    pub length_secs: u64,
    /// Transcript URL of the preferred caption track, when the video has captions
    pub caption_url: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlayerResponse {
    video_details: Option<VideoDetails>,
    captions: Option<Captions>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct VideoDetails {
    title: Option<String>,
    length_seconds: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Captions {
    player_captions_tracklist_renderer: Option<TrackList>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct TrackList {
    #[serde(default)]
    caption_tracks: Vec<CaptionTrack>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CaptionTrack {
    base_url: String,
    #[serde(default)]
    language_code: String,
    /// "asr" for auto-generated tracks
    #[serde(default)]
    kind: Option<String>,
}

#[derive(Clone)]
pub struct YoutubeClient {
    downloader: Downloader,
    base_url: String,
}

impl YoutubeClient {
    pub fn new(downloader: Downloader, base_url: impl Into<String>) -> Self {
        Self {
            downloader,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Video id from `youtu.be/<id>`, `watch?v=<id>`, and `/shorts|embed|live|v/<id>` URLs.
    pub fn video_id(url: &str) -> Option<String> {
        let parsed = reqwest::Url::parse(url).ok()?;
        let host = parsed.host_str()?.to_lowercase();
        let mut segments = parsed.path_segments()?.filter(|s| !s.is_empty());

        let id = if host == "youtu.be" || host.ends_with(".youtu.be") {
            segments.next().map(String::from)
        } else if host == "youtube.com"
            || host.ends_with(".youtube.com")
            || host == "youtube-nocookie.com"
            || host.ends_with(".youtube-nocookie.com")
        {
            match segments.next() {
                Some("watch") => parsed
                    .query_pairs()
                    .find(|(k, _)| k == "v")
                    .map(|(_, v)| v.into_owned()),
                Some("shorts") | Some("embed") | Some("live") | Some("v") => {
                    segments.next().map(String::from)
                }
                _ => None,
            }
        } else {
            None
        };

        id.filter(|id| {
            !id.is_empty()
                && id
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        })
    }

    /// Read the watch page for the title, length, and caption track.
    pub async fn video_info(&self, url: &str) -> Result<VideoInfo> {
        let video_id = Self::video_id(url).ok_or_else(|| anyhow!("Not a YouTube video URL"))?;
        let watch_url = format!("{}/watch?v={}", self.base_url, video_id);
        let page = self.downloader.fetch(&watch_url).await?;
        let page = String::from_utf8_lossy(&page.bytes);

        let player = extract_player_response(&page)?;
        let details = player
            .video_details
            .ok_or_else(|| anyhow!("Video details are unavailable"))?;
        let length_secs = details
            .length_seconds
            .as_deref()
            .and_then(|s| s.parse::<u64>().ok())
            .ok_or_else(|| anyhow!("Video length is unavailable"))?;

        let tracks = player
            .captions
            .and_then(|c| c.player_captions_tracklist_renderer)
            .map(|t| t.caption_tracks)
            .unwrap_or_default();

        Ok(VideoInfo {
            video_id,
            title: details.title.unwrap_or_default(),
            length_secs,
            caption_url: preferred_track(&tracks).map(|t| t.base_url.clone()),
        })
    }

    /// Fetch and flatten the transcript of a video.
    pub async fn transcript(&self, info: &VideoInfo) -> Result<String> {
        let caption_url = info
            .caption_url
            .as_deref()
            .ok_or_else(|| anyhow!("No transcript available for this video"))?;
        let body = self.downloader.fetch(caption_url).await?;
        let xml = String::from_utf8_lossy(&body.bytes);
        parse_transcript(&xml)
    }
}

fn extract_player_response(page: &str) -> Result<PlayerResponse> {
    let marker = page
        .find(PLAYER_RESPONSE_MARKER)
        .ok_or_else(|| anyhow!("Player response not found on the video page"))?;
    let after = &page[marker + PLAYER_RESPONSE_MARKER.len()..];
    let start = after
        .find('{')
        .ok_or_else(|| anyhow!("Player response not found on the video page"))?;

    // The object is followed by more script, so read exactly one JSON value
    let mut values = serde_json::Deserializer::from_str(&after[start..]).into_iter::<PlayerResponse>();
    values
        .next()
        .ok_or_else(|| anyhow!("Player response is empty"))?
        .context("Failed to parse player response")
}

/// Manual English track, then any English track, then the first track.
fn preferred_track(tracks: &[CaptionTrack]) -> Option<&CaptionTrack> {
    let is_english = |t: &&CaptionTrack| t.language_code.starts_with("en");
    let is_manual = |t: &&CaptionTrack| t.kind.as_deref() != Some("asr");
    tracks
        .iter()
        .filter(is_english)
        .find(is_manual)
        .or_else(|| tracks.iter().find(is_english))
        .or_else(|| tracks.first())
}

/// Concatenate the `<text>` elements of a timed-text document with spaces.
pub fn parse_transcript(xml: &str) -> Result<String> {
    let mut reader = Reader::from_str(xml);
    let mut lines: Vec<String> = Vec::new();
    let mut current: Option<String> = None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) if e.name().local_name().as_ref() == b"text" => {
                current = Some(String::new());
            }
            Ok(Event::Text(t)) => {
                if let Some(line) = current.as_mut() {
                    let text = t
                        .unescape()
                        .map_err(|e| anyhow!("Invalid transcript text: {}", e))?;
                    line.push_str(&text);
                }
            }
            Ok(Event::End(e)) if e.name().local_name().as_ref() == b"text" => {
                if let Some(line) = current.take() {
                    // Caption text is HTML-escaped a second time inside the XML
                    let line = quick_xml::escape::unescape(&line)
                        .map(|s| s.into_owned())
                        .unwrap_or(line);
                    let line = line.split_whitespace().collect::<Vec<_>>().join(" ");
                    if !line.is_empty() {
                        lines.push(line);
                    }
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(anyhow!("Invalid transcript XML: {}", e)),
            _ => {}
        }
    }

    Ok(lines.join(" "))
}
