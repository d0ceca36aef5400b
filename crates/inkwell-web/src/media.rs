//! Upload storage for post images.
//!
//! Files land in `<media_root>/posts/` and are referenced from posts by their
//! path relative to the media root (`posts/<name>`). Serving them is left to
//! whatever fronts the media root.

use std::{
  io,
  path::{Path, PathBuf},
};

use bytes::Bytes;
use inkwell_core::post::IMAGE_UPLOAD_DIR;
use rand_core::{OsRng, RngCore};
use tokio::{fs, io::AsyncWriteExt};

#[derive(Debug, Clone)]
pub struct MediaStore {
  root: PathBuf,
}

impl MediaStore {
  pub fn new(root: impl Into<PathBuf>) -> Self { Self { root: root.into() } }

  pub fn root(&self) -> &Path { &self.root }

  /// Absolute location of a stored relative path.
  pub fn resolve(&self, relative: &str) -> PathBuf { self.root.join(relative) }

  /// Write an uploaded image and return its relative path. An existing file
  /// with the same name is never overwritten; a random suffix is added
  /// instead.
  pub async fn save_image(&self, filename: &str, data: &Bytes) -> io::Result<String> {
    let dir = self.root.join(IMAGE_UPLOAD_DIR);
    fs::create_dir_all(&dir).await?;

    let name = sanitize_filename(filename);
    let mut candidate = name.clone();
    loop {
      let path = dir.join(&candidate);
      match fs::OpenOptions::new().write(true).create_new(true).open(&path).await {
        Ok(mut file) => {
          file.write_all(data).await?;
          file.flush().await?;
          tracing::debug!(path = %path.display(), bytes = data.len(), "stored upload");
          return Ok(format!("{IMAGE_UPLOAD_DIR}{candidate}"));
        }
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
          candidate = with_suffix(&name, &random_suffix());
        }
        Err(e) => return Err(e),
      }
    }
  }

  /// Remove a stored file. Missing files are not an error.
  pub async fn remove(&self, relative: &str) -> io::Result<()> {
    match fs::remove_file(self.resolve(relative)).await {
      Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e),
      _ => Ok(()),
    }
  }
}

/// Keep the final path component and only `[A-Za-z0-9._-]`.
pub fn sanitize_filename(raw: &str) -> String {
  let base = raw.rsplit(['/', '\\']).next().unwrap_or(raw);
  let cleaned: String = base
    .chars()
    .map(|c| if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') { c } else { '_' })
    .collect();
  let cleaned = cleaned.trim_start_matches('.');
  if cleaned.is_empty() { "upload".to_owned() } else { cleaned.to_owned() }
}

fn random_suffix() -> String {
  let mut buf = [0u8; 4];
  OsRng.fill_bytes(&mut buf);
  hex::encode(buf)
}

fn with_suffix(name: &str, suffix: &str) -> String {
  match name.rsplit_once('.') {
    Some((stem, ext)) if !stem.is_empty() => format!("{stem}_{suffix}.{ext}"),
    _ => format!("{name}_{suffix}"),
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn sanitize_strips_directories_and_odd_characters() {
    assert_eq!(sanitize_filename("small.gif"), "small.gif");
    assert_eq!(sanitize_filename("../../etc/passwd"), "passwd");
    assert_eq!(sanitize_filename("C:\\pics\\my cat.png"), "my_cat.png");
    assert_eq!(sanitize_filename(".hidden"), "hidden");
    assert_eq!(sanitize_filename(""), "upload");
  }

  #[test]
  fn suffix_goes_before_extension() {
    assert_eq!(with_suffix("small.gif", "ab12"), "small_ab12.gif");
    assert_eq!(with_suffix("noext", "ab12"), "noext_ab12");
  }

  #[tokio::test]
  async fn save_keeps_name_and_avoids_collisions() {
    let dir = tempfile::tempdir().unwrap();
    let media = MediaStore::new(dir.path());
    let data = Bytes::from_static(b"GIF89a");

    let first = media.save_image("small.gif", &data).await.unwrap();
    assert_eq!(first, "posts/small.gif");
    assert_eq!(std::fs::read(media.resolve(&first)).unwrap(), b"GIF89a");

    let second = media.save_image("small.gif", &data).await.unwrap();
    assert_ne!(second, first);
    assert!(second.starts_with("posts/small_") && second.ends_with(".gif"));

    media.remove(&first).await.unwrap();
    assert!(!media.resolve(&first).exists());
    media.remove(&first).await.unwrap();
  }
}
