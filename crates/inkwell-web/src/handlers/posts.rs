//! Post creation, editing and deletion.
//!
//! Create and edit accept `multipart/form-data` with `text`, an optional
//! `group` id and an optional `image` file.

use axum::{
  Json,
  extract::{
    Multipart, Path, State,
    multipart::{MultipartError, MultipartRejection},
  },
  http::Uri,
  response::{IntoResponse, Response},
};
use bytes::Bytes;
use inkwell_core::{Error as CoreError, actions, group::Group, post::PostForm, store::BlogStore};
use serde::Serialize;

use crate::{
  AppState,
  auth::Session,
  error::Error,
  handlers::{to_post, to_profile},
};

/// Raw multipart fields before validation.
#[derive(Debug, Default)]
struct PostUpload {
  text:  String,
  group: Option<String>,
  image: Option<(String, Bytes)>,
}

fn bad_multipart(e: MultipartError) -> Error {
  tracing::debug!(error = %e, "unreadable multipart payload");
  Error::BadRequest(e.body_text())
}

async fn read_post_upload(
  multipart: Result<Multipart, MultipartRejection>,
) -> Result<PostUpload, Error> {
  let mut multipart = multipart.map_err(|e| Error::BadRequest(e.body_text()))?;
  let mut upload = PostUpload::default();
  while let Some(field) = multipart.next_field().await.map_err(bad_multipart)? {
    let name = field.name().map(str::to_owned);
    match name.as_deref() {
      Some("text") => upload.text = field.text().await.map_err(bad_multipart)?,
      Some("group") => upload.group = Some(field.text().await.map_err(bad_multipart)?),
      Some("image") => {
        let filename = field
          .file_name()
          .map(str::to_owned)
          .filter(|n| !n.trim().is_empty());
        let data = field.bytes().await.map_err(bad_multipart)?;
        // Browsers send an empty part when no file was picked.
        if let Some(filename) = filename
          && !data.is_empty()
        {
          upload.image = Some((filename, data));
        }
      }
      _ => {}
    }
  }
  Ok(upload)
}

/// Turn the upload into a validated form (without the image) and check the
/// selected group exists.
async fn validated_form<S: BlogStore>(store: &S, upload: &PostUpload) -> Result<PostForm, Error> {
  let mut form = PostForm::new(upload.text.clone());

  if let Some(raw) = upload.group.as_deref().map(str::trim).filter(|g| !g.is_empty()) {
    let invalid = || CoreError::Invalid { field: "group", reason: "select a valid choice" };
    let group_id: i64 = raw.parse().map_err(|_| invalid())?;
    let exists = store
      .get_group(group_id)
      .await
      .map_err(|e| Error::Core(e.into()))?
      .is_some();
    if !exists {
      return Err(invalid().into());
    }
    form.group_id = Some(group_id);
  }

  form.validate()?;
  Ok(form)
}

/// Store the image (if any) and record its path on the form.
async fn attach_image<S>(
  state: &AppState<S>,
  upload: PostUpload,
  form: &mut PostForm,
) -> Result<(), Error>
where
  S: BlogStore + Clone + 'static,
{
  if let Some((filename, data)) = upload.image {
    form.image = Some(state.media.save_image(&filename, &data).await?);
  }
  Ok(())
}

/// Best-effort removal of an upload that no post references.
async fn discard_image<S>(state: &AppState<S>, image: Option<&str>)
where
  S: BlogStore + Clone + 'static,
{
  if let Some(image) = image
    && let Err(e) = state.media.remove(image).await
  {
    tracing::warn!(%image, error = %e, "failed to remove orphaned upload");
  }
}

#[derive(Serialize)]
struct FormContext {
  groups: Vec<Group>,
}

async fn form_context<S: BlogStore>(store: &S) -> Result<FormContext, Error> {
  let groups = store.list_groups().await.map_err(|e| Error::Core(e.into()))?;
  Ok(FormContext { groups })
}

/// `GET /create/`: the group choices for a new post.
pub async fn create_form<S>(
  State(state): State<AppState<S>>,
  session: Session,
  uri: Uri,
) -> Result<Response, Error>
where
  S: BlogStore + Clone + 'static,
{
  session.require(&uri)?;
  Ok(Json(form_context(state.store.as_ref()).await?).into_response())
}

pub async fn create<S>(
  State(state): State<AppState<S>>,
  session: Session,
  uri: Uri,
  multipart: Result<Multipart, MultipartRejection>,
) -> Result<Response, Error>
where
  S: BlogStore + Clone + 'static,
{
  let username = session.require(&uri)?.username.clone();
  let upload = read_post_upload(multipart).await?;
  let mut form = validated_form(state.store.as_ref(), &upload).await?;
  attach_image(&state, upload, &mut form).await?;

  match actions::create_post(state.store.as_ref(), &session.0, form.clone()).await {
    Ok(post) => {
      tracing::info!(post_id = post.post_id, author = %username, "post created");
      Ok(to_profile(&username))
    }
    Err(e) => {
      discard_image(&state, form.image.as_deref()).await;
      Err(e.into())
    }
  }
}

/// `GET /posts/{id}/edit/`: the post being edited and the group choices.
pub async fn edit_form<S>(
  State(state): State<AppState<S>>,
  session: Session,
  uri: Uri,
  Path(post_id): Path<i64>,
) -> Result<Response, Error>
where
  S: BlogStore + Clone + 'static,
{
  session.require(&uri)?;
  let post = actions::require_author(state.store.as_ref(), &session.0, post_id).await?;
  let FormContext { groups } = form_context(state.store.as_ref()).await?;
  Ok(Json(serde_json::json!({ "post": post, "groups": groups })).into_response())
}

pub async fn edit<S>(
  State(state): State<AppState<S>>,
  session: Session,
  uri: Uri,
  Path(post_id): Path<i64>,
  multipart: Result<Multipart, MultipartRejection>,
) -> Result<Response, Error>
where
  S: BlogStore + Clone + 'static,
{
  session.require(&uri)?;
  // Authorise before touching the upload.
  actions::require_author(state.store.as_ref(), &session.0, post_id).await?;

  let upload = read_post_upload(multipart).await?;
  let mut form = validated_form(state.store.as_ref(), &upload).await?;
  attach_image(&state, upload, &mut form).await?;

  match actions::edit_post(state.store.as_ref(), &session.0, post_id, form.clone()).await {
    Ok(post) => {
      tracing::info!(post_id = post.post_id, "post edited");
      Ok(to_post(post_id))
    }
    Err(e) => {
      discard_image(&state, form.image.as_deref()).await;
      Err(e.into())
    }
  }
}

pub async fn delete<S>(
  State(state): State<AppState<S>>,
  session: Session,
  uri: Uri,
  Path(post_id): Path<i64>,
) -> Result<Response, Error>
where
  S: BlogStore + Clone + 'static,
{
  let username = session.require(&uri)?.username.clone();
  let post = actions::delete_post(state.store.as_ref(), &session.0, post_id).await?;
  discard_image(&state, post.image.as_deref()).await;
  tracing::info!(post_id, author = %username, "post deleted");
  Ok(to_profile(&username))
}
