//! Section and field types for the greeting document.
//!
//! All types derive `Serialize + Deserialize`. Field names on the wire match
//! the JSON the web app has always produced (`textData`, `galleryImages`,
//! `offsetX`, ...), so old `#data=` links and stored blobs still load.

use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// TEXT SECTIONS
// ============================================================================

/// Opening slide copy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntroText {
    pub subtitle: String,
    pub title: String,
}

/// Gallery slide copy.
///
/// `body` may contain a `{name}` placeholder, expanded only when rendered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GalleryText {
    pub title: String,
    pub body: String,
}

/// Wish list slide. Item order is display order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Wishes {
    pub items: Vec<String>,
    pub signature: String,
}

/// Tone requested from the wish generator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WishStyle {
    Funny,
    #[default]
    Heartfelt,
    Poetic,
}

impl WishStyle {
    pub const ALL: [WishStyle; 3] = [WishStyle::Funny, WishStyle::Heartfelt, WishStyle::Poetic];

    pub fn as_str(&self) -> &'static str {
        match self {
            WishStyle::Funny => "funny",
            WishStyle::Heartfelt => "heartfelt",
            WishStyle::Poetic => "poetic",
        }
    }
}

impl fmt::Display for WishStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for WishStyle {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        WishStyle::ALL
            .into_iter()
            .find(|style| style.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("Unknown wish style '{}' (funny, heartfelt, poetic)", s))
    }
}

/// Generated wish kept with the greeting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AiWish {
    #[serde(rename = "wish")]
    pub text: String,
    #[serde(default)]
    pub style: WishStyle,
}

/// All editable copy, grouped per slide.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlideText {
    pub intro: IntroText,
    pub gallery: GalleryText,
    pub wishes: Wishes,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ai: Option<AiWish>,
}

// ============================================================================
// GALLERY
// ============================================================================

/// Smallest zoom a gallery frame accepts.
pub const MIN_SCALE: f64 = 1.0;

/// One photo slot of the gallery.
///
/// `data` is an embeddable image (data URL or plain URL) and is opaque to the
/// store. Offsets are pan percentages of the frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GalleryImage {
    #[serde(rename = "src")]
    pub data: String,
    pub scale: f64,
    pub offset_x: f64,
    pub offset_y: f64,
}

impl GalleryImage {
    /// Unzoomed, centered image.
    pub fn new(data: impl Into<String>) -> Self {
        Self {
            data: data.into(),
            scale: MIN_SCALE,
            offset_x: 0.0,
            offset_y: 0.0,
        }
    }
}

/// Partial update for one gallery slot. `None` fields are left alone.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImagePatch {
    pub data: Option<String>,
    pub scale: Option<f64>,
    pub offset_x: Option<f64>,
    pub offset_y: Option<f64>,
}

impl ImagePatch {
    /// New image source with zoom and pan reset.
    pub fn source(data: impl Into<String>) -> Self {
        Self {
            data: Some(data.into()),
            scale: Some(MIN_SCALE),
            offset_x: Some(0.0),
            offset_y: Some(0.0),
        }
    }

    /// Zoom and pan only.
    pub fn geometry(scale: f64, offset_x: f64, offset_y: f64) -> Self {
        Self {
            data: None,
            scale: Some(scale),
            offset_x: Some(offset_x),
            offset_y: Some(offset_y),
        }
    }

    /// Reject values that could not survive a JSON round trip or would
    /// shrink the photo below its frame.
    pub fn validate(&self) -> Result<(), String> {
        if let Some(scale) = self.scale
            && (!scale.is_finite() || scale < MIN_SCALE)
        {
            return Err(format!("scale must be a finite number >= {}, got {}", MIN_SCALE, scale));
        }
        for (name, value) in [("offsetX", self.offset_x), ("offsetY", self.offset_y)] {
            if let Some(v) = value
                && !v.is_finite()
            {
                return Err(format!("{} must be finite, got {}", name, v));
            }
        }
        Ok(())
    }
}

// ============================================================================
// EDIT TARGETS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IntroField {
    Subtitle,
    Title,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GalleryField {
    Title,
    Body,
}

/// Every free-text field a user can edit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldLocator {
    Name,
    Intro(IntroField),
    Gallery(GalleryField),
    WishItem(usize),
    WishSignature,
    AiWish,
}

impl fmt::Display for FieldLocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldLocator::Name => write!(f, "name"),
            FieldLocator::Intro(IntroField::Subtitle) => write!(f, "intro.subtitle"),
            FieldLocator::Intro(IntroField::Title) => write!(f, "intro.title"),
            FieldLocator::Gallery(GalleryField::Title) => write!(f, "gallery.title"),
            FieldLocator::Gallery(GalleryField::Body) => write!(f, "gallery.body"),
            FieldLocator::WishItem(i) => write!(f, "wishes.items[{}]", i),
            FieldLocator::WishSignature => write!(f, "wishes.signature"),
            FieldLocator::AiWish => write!(f, "ai.wish"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gallery_image_wire_names() {
        let img = GalleryImage {
            data: "data:image/jpeg;base64,AAAA".to_string(),
            scale: 1.5,
            offset_x: -10.0,
            offset_y: 20.0,
        };
        let json = serde_json::to_value(&img).unwrap();
        assert_eq!(json["src"], "data:image/jpeg;base64,AAAA");
        assert_eq!(json["offsetX"], -10.0);
        assert_eq!(json["offsetY"], 20.0);
    }

    #[test]
    fn test_ai_wish_style_lowercase() {
        let wish: AiWish = serde_json::from_str(r#"{"wish":"Hi","style":"poetic"}"#).unwrap();
        assert_eq!(wish.style, WishStyle::Poetic);
        assert_eq!(wish.text, "Hi");
    }

    #[test]
    fn test_wish_style_parse() {
        assert_eq!("FUNNY".parse::<WishStyle>().unwrap(), WishStyle::Funny);
        assert!("grumpy".parse::<WishStyle>().is_err());
    }

    #[test]
    fn test_patch_rejects_small_scale() {
        assert!(ImagePatch::geometry(0.5, 0.0, 0.0).validate().is_err());
        assert!(ImagePatch::geometry(1.0, -100.0, 100.0).validate().is_ok());
    }

    #[test]
    fn test_patch_rejects_non_finite() {
        assert!(ImagePatch::geometry(f64::NAN, 0.0, 0.0).validate().is_err());
        assert!(ImagePatch::geometry(1.0, f64::INFINITY, 0.0).validate().is_err());
    }

    #[test]
    fn test_locator_display() {
        assert_eq!(FieldLocator::WishItem(2).to_string(), "wishes.items[2]");
        assert_eq!(FieldLocator::Gallery(GalleryField::Body).to_string(), "gallery.body");
    }
}
