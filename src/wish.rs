//! # Wish Generation
//!
//! The "cosmic message" slide asks a text model for a short wish. The session
//! only needs `generate(name, style)`; failures fall back to a stock wish so
//! the slide always has something to show.

use async_trait::async_trait;
use rand::seq::IndexedRandom;
use reqwest::header::CONTENT_TYPE;
use serde::Deserialize;
use serde_json::json;
use tracing::warn;

use crate::document::WishStyle;
use crate::error::GreetcardError;

/// Default Generative Language API endpoint.
pub const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Default model.
pub const GEMINI_MODEL: &str = "gemini-2.5-flash";

/// Shown when the model answers with nothing.
pub const EMPTY_RESPONSE_WISH: &str = "Happy Birthday! May your day be as awesome as you are!";

/// Produces a birthday wish for a recipient.
#[async_trait]
pub trait WishGenerator: Send + Sync {
    async fn generate(&self, name: &str, style: WishStyle) -> Result<String, GreetcardError>;
}

/// Wish used when generation fails outright.
pub fn fallback_wish(name: &str) -> String {
    format!(
        "Happy Birthday, {}! Wishing you a day filled with joy and laughter (and maybe some cake)!",
        name
    )
}

/// Prompt sent to the model.
pub fn prompt(name: &str, style: WishStyle) -> String {
    format!(
        "Write a short, unique, and {} birthday wish for a friend named {}. \
         Make it creative and memorable. Keep it under 60 words. \
         Do not include quotes around the text.",
        style, name
    )
}

/// Generate a wish, never failing.
pub async fn generate_or_fallback(
    generator: &dyn WishGenerator,
    name: &str,
    style: WishStyle,
) -> String {
    match generator.generate(name, style).await {
        Ok(text) if text.trim().is_empty() => EMPTY_RESPONSE_WISH.to_string(),
        Ok(text) => text.trim().trim_matches('"').to_string(),
        Err(e) => {
            warn!(error = %e, %style, "wish generation failed, using fallback");
            fallback_wish(name)
        }
    }
}

// ============================================================================
// GEMINI
// ============================================================================

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
}

#[derive(Debug, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    text: Option<String>,
}

impl GenerateResponse {
    fn text(self) -> String {
        self.candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect::<String>())
            .unwrap_or_default()
    }
}

/// Gemini `generateContent` client.
pub struct GeminiWishGenerator {
    api_key: String,
    base_url: String,
    model: String,
    client: reqwest::Client,
}

impl GeminiWishGenerator {
    pub fn new(api_key: impl Into<String>) -> Result<Self, GreetcardError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("greetcard/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| GreetcardError::Generation(format!("HTTP client error: {}", e)))?;
        Ok(Self {
            api_key: api_key.into(),
            base_url: GEMINI_BASE_URL.to_string(),
            model: GEMINI_MODEL.to_string(),
            client,
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }
}

#[async_trait]
impl WishGenerator for GeminiWishGenerator {
    async fn generate(&self, name: &str, style: WishStyle) -> Result<String, GreetcardError> {
        let url = format!("{}/models/{}:generateContent", self.base_url, self.model);
        let body = json!({
            "contents": [{ "parts": [{ "text": prompt(name, style) }] }],
            "generationConfig": {
                "temperature": 0.8,
                "thinkingConfig": { "thinkingBudget": 0 }
            }
        });

        let response = self
            .client
            .post(&url)
            .header(CONTENT_TYPE, "application/json")
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| GreetcardError::Generation(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(GreetcardError::Generation(format!("model returned HTTP {}", status)));
        }

        let parsed: GenerateResponse = response
            .json()
            .await
            .map_err(|e| GreetcardError::Generation(format!("unreadable response: {}", e)))?;
        Ok(parsed.text())
    }
}

// ============================================================================
// OFFLINE
// ============================================================================

/// Picks from a few stock wishes per style. Used when no API key is set.
#[derive(Debug, Default, Clone, Copy)]
pub struct CannedWishGenerator;

const FUNNY: &[&str] = &[
    "Happy Birthday, {name}! You're not getting older, you're just leveling up. Cake is the XP.",
    "{name}, statistically the people with the most birthdays live the longest. Keep it up!",
];
const HEARTFELT: &[&str] = &[
    "{name}, the world is warmer with you in it. Happy Birthday, today and every day.",
    "Happy Birthday, {name}! Thank you for every laugh, every kindness, every moment.",
];
const POETIC: &[&str] = &[
    "Another turn around the sun, {name}, and still you shine the brightest of all stars.",
    "May your year unfold like spring, {name}: gentle, golden, and full of bloom.",
];

#[async_trait]
impl WishGenerator for CannedWishGenerator {
    async fn generate(&self, name: &str, style: WishStyle) -> Result<String, GreetcardError> {
        let pool = match style {
            WishStyle::Funny => FUNNY,
            WishStyle::Heartfelt => HEARTFELT,
            WishStyle::Poetic => POETIC,
        };
        let template = pool
            .choose(&mut rand::rng())
            .ok_or_else(|| GreetcardError::Generation("no stock wishes".to_string()))?;
        Ok(template.replace("{name}", name))
    }
}
