// Captioning: ask a generative model for a one-line title for the drawing.
// Runs on a worker thread, at most one at a time, and always ends in a line
// of text: any failure turns into a canned fallback.
// Visual: "THINKING..." in the HUD, then the caption (or the fallback line).

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;
use std::time::Duration;

use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use serde::Deserialize;

use crate::config::CaptionConfig;
use crate::error::Error;

pub const PROMPT: &str = "This drawing was made with hand gestures in the air by someone expressing \
themselves freely. Look at the strokes and colors. Please provide a poetic, 1-sentence title or \
positive affirmation for this artwork. Keep it very simple and encouraging.";

/// Shown when the request fails for any reason.
pub const FALLBACK_ON_ERROR: &str = "A dance of colors in the air.";
/// Shown when the model answers with nothing.
pub const FALLBACK_ON_EMPTY: &str = "A beautiful breath of expression.";

/// Something that can turn PNG bytes into a caption.
pub trait CaptionBackend: Send + Sync + 'static {
    fn describe(&self, png: &[u8]) -> Result<String, Error>;
}

/// One attempt, never an error.
pub fn caption_or_fallback(backend: &dyn CaptionBackend, png: &[u8]) -> String {
    match backend.describe(png) {
        Ok(text) if !text.trim().is_empty() => text.trim().to_string(),
        Ok(_) => {
            log::warn!("Caption came back empty, using fallback");
            FALLBACK_ON_EMPTY.to_string()
        }
        Err(e) => {
            log::warn!("{e}; using fallback caption");
            FALLBACK_ON_ERROR.to_string()
        }
    }
}

/* ---------------- Gemini over HTTP ---------------- */

#[derive(Deserialize, Debug)]
struct GeminiResponse {
    candidates: Option<Vec<GeminiCandidate>>,
}

#[derive(Deserialize, Debug)]
struct GeminiCandidate {
    content: Option<GeminiContent>,
}

#[derive(Deserialize, Debug)]
struct GeminiContent {
    parts: Option<Vec<GeminiPart>>,
}

#[derive(Deserialize, Debug)]
struct GeminiPart {
    text: Option<String>,
}

/// Concatenate every text part of the first candidate.
pub fn extract_text(body: &str) -> Result<String, Error> {
    let parsed: GeminiResponse =
        serde_json::from_str(body).map_err(|e| Error::Caption(format!("Parse response: {e}")))?;
    let text = parsed
        .candidates
        .and_then(|c| c.into_iter().next())
        .and_then(|c| c.content)
        .and_then(|c| c.parts)
        .map(|parts| parts.into_iter().filter_map(|p| p.text).collect::<String>())
        .unwrap_or_default();
    Ok(text)
}

pub struct GeminiBackend {
    cfg: CaptionConfig,
    api_key: Option<String>,
}

impl GeminiBackend {
    /// Reads the API key from the configured environment variable.
    pub fn from_env(cfg: &CaptionConfig) -> Self {
        let api_key = std::env::var(&cfg.api_key_env).ok().filter(|k| !k.trim().is_empty());
        if api_key.is_none() {
            log::warn!("{} not set; captions will use the fallback line", cfg.api_key_env);
        }
        Self { cfg: cfg.clone(), api_key }
    }

    fn request_body(&self, png: &[u8]) -> serde_json::Value {
        serde_json::json!({
            "contents": {
                "parts": [
                    { "inlineData": { "mimeType": "image/png", "data": BASE64.encode(png) } },
                    { "text": PROMPT }
                ]
            },
            "generationConfig": {
                "temperature": self.cfg.temperature,
                "topP": self.cfg.top_p
            }
        })
    }
}

impl CaptionBackend for GeminiBackend {
    fn describe(&self, png: &[u8]) -> Result<String, Error> {
        let key = self.api_key.as_deref().ok_or_else(|| Error::Caption("No API key".into()))?;
        let url = format!("{}/{}:generateContent?key={}", self.cfg.endpoint, self.cfg.model, key);

        log::info!("Sending caption request ({} byte PNG)", png.len());
        let response = ureq::post(&url)
            .timeout(Duration::from_secs(self.cfg.timeout_secs))
            .set("Content-Type", "application/json")
            .send_json(self.request_body(png))
            .map_err(|e| Error::Caption(format!("Request failed: {e}")))?;
        let body = response
            .into_string()
            .map_err(|e| Error::Caption(format!("Read response: {e}")))?;
        extract_text(&body)
    }
}

/* ---------------- Single-flight runner ---------------- */

/// Runs captions off the frame loop, one at a time.
pub struct Captioner {
    backend: Arc<dyn CaptionBackend>,
    busy: Arc<AtomicBool>,
    tx: Sender<String>,
    rx: Receiver<String>,
}

impl Captioner {
    pub fn new(backend: Arc<dyn CaptionBackend>) -> Self {
        let (tx, rx) = mpsc::channel();
        Self { backend, busy: Arc::new(AtomicBool::new(false)), tx, rx }
    }

    /// Start a request. Returns false (and does nothing) if one is already in flight.
    pub fn request(&self, png: Vec<u8>) -> bool {
        if self.busy.swap(true, Ordering::AcqRel) {
            log::debug!("Caption already in flight, ignoring");
            return false;
        }
        let backend = Arc::clone(&self.backend);
        let tx = self.tx.clone();
        thread::spawn(move || {
            let text = caption_or_fallback(backend.as_ref(), &png);
            // Receiver gone means the session was torn down; nothing to do.
            let _ = tx.send(text);
        });
        true
    }

    /// Collect a finished caption, if any. Clears the busy flag.
    pub fn poll(&self) -> Option<String> {
        let text = self.rx.try_recv().ok()?;
        self.busy.store(false, Ordering::Release);
        log::info!("Caption: {text}");
        Some(text)
    }

    /// Blocking variant of [`poll`](Self::poll).
    #[cfg(test)]
    pub fn wait(&self, timeout: Duration) -> Option<String> {
        let text = self.rx.recv_timeout(timeout).ok()?;
        self.busy.store(false, Ordering::Release);
        Some(text)
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::sync::atomic::AtomicUsize;

    struct Fixed(Result<String, ()>);

    impl CaptionBackend for Fixed {
        fn describe(&self, _png: &[u8]) -> Result<String, Error> {
            self.0.clone().map_err(|_| Error::Caption("offline".into()))
        }
    }

    /// Blocks until released, counting calls.
    struct Gate {
        calls: AtomicUsize,
        release: Mutex<Option<Receiver<()>>>,
    }

    impl CaptionBackend for Gate {
        fn describe(&self, _png: &[u8]) -> Result<String, Error> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(rx) = self.release.lock().unwrap().take() {
                let _ = rx.recv();
            }
            Ok("A rainbow river.".into())
        }
    }

    #[test]
    fn failures_become_fallback_text() {
        assert_eq!(caption_or_fallback(&Fixed(Err(())), b"png"), FALLBACK_ON_ERROR);
        assert_eq!(caption_or_fallback(&Fixed(Ok("  ".into())), b"png"), FALLBACK_ON_EMPTY);
        assert_eq!(caption_or_fallback(&Fixed(Ok(" Sunny swirls. ".into())), b"png"), "Sunny swirls.");
    }

    #[test]
    fn extracts_text_parts() {
        let body = r#"{"candidates":[{"content":{"parts":[{"text":"Hello "},{"text":"sky."}]}}]}"#;
        assert_eq!(extract_text(body).unwrap(), "Hello sky.");
        assert_eq!(extract_text(r#"{"candidates":[]}"#).unwrap(), "");
        assert_eq!(extract_text("{}").unwrap(), "");
        assert!(extract_text("<html>").is_err());
    }

    #[test]
    fn missing_key_falls_back() {
        let backend = GeminiBackend { cfg: CaptionConfig::default(), api_key: None };
        assert_eq!(caption_or_fallback(&backend, b"png"), FALLBACK_ON_ERROR);
    }

    #[test]
    fn unreachable_endpoint_falls_back() {
        let cfg = CaptionConfig {
            endpoint: "http://127.0.0.1:9/v1beta/models".into(),
            timeout_secs: 2,
            ..CaptionConfig::default()
        };
        let backend = GeminiBackend { cfg, api_key: Some("test-key".into()) };
        assert!(matches!(backend.describe(b"\x89PNG"), Err(Error::Caption(_))));
        assert_eq!(caption_or_fallback(&backend, b"\x89PNG"), FALLBACK_ON_ERROR);
    }

    #[test]
    fn request_body_carries_png_and_prompt() {
        let backend = GeminiBackend { cfg: CaptionConfig::default(), api_key: None };
        let body = backend.request_body(b"\x89PNG");
        let parts = &body["contents"]["parts"];
        assert_eq!(parts[0]["inlineData"]["mimeType"], "image/png");
        assert_eq!(parts[0]["inlineData"]["data"], BASE64.encode(b"\x89PNG"));
        assert_eq!(parts[1]["text"], PROMPT);
        assert!((body["generationConfig"]["topP"].as_f64().unwrap() - 0.95).abs() < 1e-6);
    }

    #[test]
    fn only_one_request_in_flight() {
        let (release_tx, release_rx) = mpsc::channel();
        let gate = Arc::new(Gate { calls: AtomicUsize::new(0), release: Mutex::new(Some(release_rx)) });
        let captioner = Captioner::new(gate.clone());

        assert!(captioner.request(vec![1]));
        assert!(captioner.is_busy());
        assert!(!captioner.request(vec![2]));

        release_tx.send(()).unwrap();
        assert_eq!(captioner.wait(Duration::from_secs(5)).as_deref(), Some("A rainbow river."));
        assert!(!captioner.is_busy());
        assert_eq!(gate.calls.load(Ordering::SeqCst), 1);

        // Free again after completion
        assert!(captioner.request(vec![3]));
        assert!(captioner.wait(Duration::from_secs(5)).is_some());
        assert_eq!(gate.calls.load(Ordering::SeqCst), 2);
    }
}
