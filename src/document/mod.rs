//! # Greeting Document
//!
//! The single root entity of a greeting: recipient name, per-slide copy and a
//! fixed number of gallery photos.
//!
//! ```
//! use greetcard::document::{FieldLocator, GreetingDocument};
//!
//! let mut doc = GreetingDocument::default();
//! doc.set_text(FieldLocator::Name, "Alex".to_string())?;
//! doc.set_text(FieldLocator::WishItem(0), "Stay awesome!".to_string())?;
//!
//! assert_eq!(doc.recipient_name, "Alex");
//! assert_eq!(doc.text_data.wishes.items[0], "Stay awesome!");
//! # Ok::<(), greetcard::GreetcardError>(())
//! ```

pub mod types;

pub use types::*;

use serde::{Deserialize, Serialize};

use crate::error::GreetcardError;

/// Number of gallery slots in the stock slideshow.
pub const DEFAULT_GALLERY_SLOTS: usize = 3;

/// Placeholder in gallery body text replaced by the recipient name.
pub const NAME_PLACEHOLDER: &str = "{name}";

/// The whole greeting, as persisted in tokens and remote blobs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GreetingDocument {
    #[serde(rename = "name")]
    pub recipient_name: String,
    pub text_data: SlideText,
    #[serde(rename = "galleryImages")]
    pub images: Vec<GalleryImage>,
}

impl Default for GreetingDocument {
    fn default() -> Self {
        Self::with_slots(DEFAULT_GALLERY_SLOTS)
    }
}

fn placeholder_image(slot: usize) -> GalleryImage {
    GalleryImage::new(format!(
        "https://picsum.photos/seed/memories{}/400/500",
        slot + 1
    ))
}

impl GreetingDocument {
    /// Stock greeting with `slots` placeholder photos.
    pub fn with_slots(slots: usize) -> Self {
        Self {
            recipient_name: "My Friend".to_string(),
            text_data: SlideText {
                intro: IntroText {
                    subtitle: "It's a special day...".to_string(),
                    title: "Happy Birthday".to_string(),
                },
                gallery: GalleryText {
                    title: "Memories to Cherish".to_string(),
                    body: "Another year around the sun means another year of amazing moments, \
                           laughter, and growth. Here's to celebrating you!"
                        .to_string(),
                },
                wishes: Wishes {
                    items: vec![
                        "May your joy be as bright as the candles on your cake.".to_string(),
                        "Wishing you a year fully loaded with happiness and success.".to_string(),
                        "Cheers to your personal new year! Let's make it the best one yet."
                            .to_string(),
                    ],
                    signature: "With Love".to_string(),
                },
                ai: None,
            },
            images: (0..slots).map(placeholder_image).collect(),
        }
    }

    /// Force the gallery to exactly `slots` entries.
    ///
    /// Extra photos are dropped; missing slots get placeholders. Used on
    /// hydration, where a link may come from a build with a different layout.
    pub fn fit_slots(&mut self, slots: usize) {
        self.images.truncate(slots);
        while self.images.len() < slots {
            let slot = self.images.len();
            self.images.push(placeholder_image(slot));
        }
    }

    /// Current value of a text field. `AiWish` reads as empty until generated.
    pub fn text(&self, field: FieldLocator) -> Option<&str> {
        let text = &self.text_data;
        match field {
            FieldLocator::Name => Some(&self.recipient_name),
            FieldLocator::Intro(IntroField::Subtitle) => Some(&text.intro.subtitle),
            FieldLocator::Intro(IntroField::Title) => Some(&text.intro.title),
            FieldLocator::Gallery(GalleryField::Title) => Some(&text.gallery.title),
            FieldLocator::Gallery(GalleryField::Body) => Some(&text.gallery.body),
            FieldLocator::WishItem(i) => text.wishes.items.get(i).map(String::as_str),
            FieldLocator::WishSignature => Some(&text.wishes.signature),
            FieldLocator::AiWish => Some(text.ai.as_ref().map_or("", |ai| ai.text.as_str())),
        }
    }

    /// Overwrite one text field.
    ///
    /// Wish items can only be replaced, never appended; an index past the end
    /// is an `InvalidField` error and leaves the document untouched.
    pub fn set_text(&mut self, field: FieldLocator, value: String) -> Result<(), GreetcardError> {
        let text = &mut self.text_data;
        match field {
            FieldLocator::Name => self.recipient_name = value,
            FieldLocator::Intro(IntroField::Subtitle) => text.intro.subtitle = value,
            FieldLocator::Intro(IntroField::Title) => text.intro.title = value,
            FieldLocator::Gallery(GalleryField::Title) => text.gallery.title = value,
            FieldLocator::Gallery(GalleryField::Body) => text.gallery.body = value,
            FieldLocator::WishItem(i) => {
                let len = text.wishes.items.len();
                let item = text.wishes.items.get_mut(i).ok_or_else(|| {
                    GreetcardError::InvalidField(format!(
                        "wish item {} out of range ({} items)",
                        i, len
                    ))
                })?;
                *item = value;
            }
            FieldLocator::WishSignature => text.wishes.signature = value,
            FieldLocator::AiWish => match &mut text.ai {
                Some(ai) => ai.text = value,
                None => {
                    text.ai = Some(AiWish {
                        text: value,
                        style: WishStyle::default(),
                    })
                }
            },
        }
        Ok(())
    }

    /// Apply a partial update to one gallery slot.
    pub fn patch_image(&mut self, slot: usize, patch: ImagePatch) -> Result<(), GreetcardError> {
        patch.validate().map_err(GreetcardError::InvalidField)?;
        let len = self.images.len();
        let image = self.images.get_mut(slot).ok_or_else(|| {
            GreetcardError::InvalidField(format!("gallery slot {} out of range ({} slots)", slot, len))
        })?;

        if let Some(data) = patch.data {
            image.data = data;
        }
        if let Some(scale) = patch.scale {
            image.scale = scale;
        }
        if let Some(x) = patch.offset_x {
            image.offset_x = x;
        }
        if let Some(y) = patch.offset_y {
            image.offset_y = y;
        }
        Ok(())
    }

    /// Gallery body with `{name}` replaced by the recipient name.
    pub fn gallery_body_rendered(&self) -> String {
        self.text_data
            .gallery
            .body
            .replace(NAME_PLACEHOLDER, &self.recipient_name)
    }

    /// Serialized size in bytes, as sent to a remote store.
    pub fn json_len(&self) -> usize {
        serde_json::to_vec(self).map(|v| v.len()).unwrap_or(usize::MAX)
    }
}
