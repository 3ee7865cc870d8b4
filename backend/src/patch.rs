use crate::models::{ImageRecord, UpdatePatch};

/// SubmittedImage
///
/// The editable fields as the client sent them. Empty strings are how an HTML form
/// says "left blank".
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SubmittedImage {
    pub title: Option<String>,
    pub description: Option<String>,
}

impl From<&ImageRecord> for SubmittedImage {
    fn from(image: &ImageRecord) -> Self {
        Self {
            title: image.title.clone(),
            description: image.description.clone(),
        }
    }
}

/// compute_update
///
/// Builds the minimal patch turning `existing` into what the client submitted:
/// - a text field is included only when the submitted value is non-empty and differs
///   from the stored one; blank submissions never erase data.
/// - `new_media`, when present, is always included, even if it equals the stored
///   reference, because a fresh upload overwrote the blob behind it.
///
/// An empty result is a valid no-op edit.
pub fn compute_update(
    existing: &ImageRecord,
    submitted: &SubmittedImage,
    new_media: Option<String>,
) -> UpdatePatch {
    UpdatePatch {
        title: changed_field(existing.title.as_deref(), submitted.title.as_deref()),
        description: changed_field(
            existing.description.as_deref(),
            submitted.description.as_deref(),
        ),
        media_ref: new_media,
    }
}

fn changed_field(existing: Option<&str>, submitted: Option<&str>) -> Option<String> {
    match submitted {
        Some(value) if !value.is_empty() && Some(value) != existing => Some(value.to_string()),
        _ => None,
    }
}
