use axum::body::Bytes;
use uuid::Uuid;

use crate::{
    error::{GalleryError, StorageError, StoreError, ValidationErrors},
    models::{ImageRecord, NewImage, Role, UpdatePatch},
    patch::{SubmittedImage, compute_update},
    policy::{Action, Decision, authorize},
    repository::Repository,
    storage::BlobStore,
};

/// Upload
///
/// A file part received from the client.
#[derive(Debug, Clone, Default)]
pub struct Upload {
    pub filename: String,
    pub bytes: Bytes,
}

impl Upload {
    /// Browsers send a nameless, zero-length part when no file was chosen.
    pub fn is_empty(&self) -> bool {
        self.filename.is_empty() || self.bytes.is_empty()
    }
}

/// ImageForm
///
/// Everything a create or edit submission can carry.
#[derive(Debug, Clone, Default)]
pub struct ImageForm {
    pub id: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub file: Option<Upload>,
}

impl ImageForm {
    pub fn submitted(&self) -> SubmittedImage {
        SubmittedImage {
            title: self.title.clone(),
            description: self.description.clone(),
        }
    }

    /// The uploaded file, unless the part was empty.
    pub fn upload(&self) -> Option<&Upload> {
        self.file.as_ref().filter(|f| !f.is_empty())
    }
}

fn gate(role: Role, action: Action) -> Result<(), GalleryError> {
    authorize(role, action)
        .into_result()
        .map_err(GalleryError::Denied)
}

/// parse_image_id
///
/// An empty id does not name any record (`NotFound`); a non-empty id that is not a UUID
/// is a malformed request (`MalformedId`).
pub fn parse_image_id(raw: &str) -> Result<Uuid, GalleryError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(GalleryError::NotFound);
    }
    Uuid::parse_str(raw).map_err(|_| GalleryError::MalformedId(raw.to_string()))
}

/// save_upload
///
/// A file name that reduces to nothing usable is the client's mistake, reported on the
/// `imageFile` field like any other form error.
async fn save_upload(blobs: &dyn BlobStore, upload: &Upload) -> Result<String, GalleryError> {
    match blobs.save(&upload.filename, upload.bytes.clone()).await {
        Ok(media_ref) => Ok(media_ref),
        Err(StorageError::InvalidName(name)) => {
            tracing::debug!("rejected upload file name {:?}", name);
            let mut errors = ValidationErrors::new();
            errors.add("imageFile", "The file name is not valid.");
            Err(GalleryError::Invalid(errors))
        }
        Err(e) => Err(e.into()),
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

pub async fn list_images(repo: &dyn Repository) -> Result<Vec<ImageRecord>, StoreError> {
    repo.list_images().await
}

/// create_gate
///
/// Whether `role` may open the upload form at all.
pub fn create_gate(role: Role) -> Decision {
    authorize(role, Action::Create)
}

/// create_image
///
/// Gate, then blob, then record. The record is only written once the blob store has
/// returned a reference, so `media_ref` always points at saved bytes.
pub async fn create_image(
    repo: &dyn Repository,
    blobs: &dyn BlobStore,
    role: Role,
    form: ImageForm,
) -> Result<Uuid, GalleryError> {
    gate(role, Action::Create)?;

    let Some(upload) = form.upload() else {
        let mut errors = ValidationErrors::new();
        errors.add("imageFile", "An image file is required.");
        return Err(GalleryError::Invalid(errors));
    };

    let media_ref = save_upload(blobs, upload).await?;

    let id = repo
        .insert_image(NewImage {
            title: non_empty(form.title),
            description: non_empty(form.description),
            media_ref,
        })
        .await?;

    tracing::info!(%id, "image created");
    Ok(id)
}

/// edit_form
///
/// The current record, for pre-filling an edit form. Gated like the edit itself.
pub async fn edit_form(
    repo: &dyn Repository,
    role: Role,
    raw_id: &str,
) -> Result<ImageRecord, GalleryError> {
    gate(role, Action::Edit)?;
    let id = parse_image_id(raw_id)?;
    repo.find_image(id).await?.ok_or(GalleryError::NotFound)
}

/// edit_image
///
/// Steps, in order:
/// 1. gate on `Edit`
/// 2. parse the path id, and reject a form id that names a different record
/// 3. load the existing record
/// 4. save the new upload, if any
/// 5. diff and apply the patch in one write
///
/// A record deleted between steps 3 and 5 leaves the step 4 blob orphaned.
///
/// Returns the patch that was applied; an empty patch means nothing changed.
pub async fn edit_image(
    repo: &dyn Repository,
    blobs: &dyn BlobStore,
    role: Role,
    raw_id: &str,
    form: ImageForm,
) -> Result<UpdatePatch, GalleryError> {
    gate(role, Action::Edit)?;

    let id = parse_image_id(raw_id)?;
    if let Some(form_id) = form.id.as_deref().filter(|f| !f.trim().is_empty()) {
        if parse_image_id(form_id)? != id {
            return Err(GalleryError::IdMismatch);
        }
    }

    let existing = repo.find_image(id).await?.ok_or(GalleryError::NotFound)?;

    let new_media = match form.upload() {
        Some(upload) => Some(save_upload(blobs, upload).await?),
        None => None,
    };

    let patch = compute_update(&existing, &form.submitted(), new_media);
    if repo.apply_patch(id, &patch).await? == 0 {
        // Deleted between the lookup and the write.
        return Err(GalleryError::NotFound);
    }

    tracing::info!(%id, ?patch, "image updated");
    Ok(patch)
}

/// delete_image
///
/// Admin only. The stored blob is left in place.
pub async fn delete_image(
    repo: &dyn Repository,
    role: Role,
    raw_id: &str,
) -> Result<(), GalleryError> {
    gate(role, Action::Delete)?;

    let id = parse_image_id(raw_id)?;
    if repo.find_image(id).await?.is_none() {
        return Err(GalleryError::NotFound);
    }

    if repo.delete_image(id).await? == 0 {
        return Err(GalleryError::NotFound);
    }

    tracing::info!(%id, "image deleted");
    Ok(())
}
