//! Saving uploaded product images to the media directory.

use std::{io::ErrorKind, path::Path};

use time::Date;
use tokio::{fs, io::AsyncWriteExt};

use crate::{Error, product::form::UploadedImage};

/// How many alternative names to try before giving up on a clashing file name.
const MAX_NAME_ATTEMPTS: u32 = 100;

/// Write `image` to `<media_root>/products/YYYY/MM/DD/` for the upload `date`.
///
/// Existing files are never overwritten: a clashing name gets a numeric
/// suffix, e.g. "kettle_1.png".
///
/// Returns the path of the new file relative to `media_root`, always with
/// forward slashes so it can be used in a URL.
///
/// # Errors
///
/// Returns [Error::ImageStorageError] if the directory or file could not be
/// written.
pub async fn store_image(
    media_root: &Path,
    image: &UploadedImage,
    date: Date,
) -> Result<String, Error> {
    let directory = format!(
        "products/{:04}/{:02}/{:02}",
        date.year(),
        u8::from(date.month()),
        date.day()
    );

    fs::create_dir_all(media_root.join(&directory))
        .await
        .map_err(|error| {
            tracing::error!("Could not create the image directory {directory}: {error}");
            Error::ImageStorageError(error.to_string())
        })?;

    let (stem, extension) = split_file_name(&sanitize_file_name(&image.file_name));

    for attempt in 0..MAX_NAME_ATTEMPTS {
        let file_name = if attempt == 0 {
            format!("{stem}.{extension}")
        } else {
            format!("{stem}_{attempt}.{extension}")
        };
        let relative_path = format!("{directory}/{file_name}");

        let file = fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(media_root.join(&relative_path))
            .await;

        let mut file = match file {
            Ok(file) => file,
            Err(error) if error.kind() == ErrorKind::AlreadyExists => continue,
            Err(error) => {
                tracing::error!("Could not create image file {relative_path}: {error}");
                return Err(Error::ImageStorageError(error.to_string()));
            }
        };

        // Tokio finishes writes in the background, flushing waits for them.
        let written = match file.write_all(&image.data).await {
            Ok(()) => file.flush().await,
            Err(error) => Err(error),
        };

        if let Err(error) = written {
            tracing::error!("Could not write image file {relative_path}: {error}");
            drop(file);
            remove_image(media_root, &relative_path).await;
            return Err(Error::ImageStorageError(error.to_string()));
        }

        tracing::info!("Saved product image {relative_path}");
        return Ok(relative_path);
    }

    Err(Error::ImageStorageError(format!(
        "no free file name for \"{stem}.{extension}\" in {directory}"
    )))
}

/// Delete an image written by [store_image], logging instead of failing.
pub async fn remove_image(media_root: &Path, relative_path: &str) {
    match fs::remove_file(media_root.join(relative_path)).await {
        Ok(()) => tracing::info!("Removed product image {relative_path}"),
        Err(error) => tracing::error!("Could not remove product image {relative_path}: {error}"),
    }
}

/// Replace everything except ASCII letters, digits, '-', '_' and '.' with '_'.
fn sanitize_file_name(file_name: &str) -> String {
    // Browsers on Windows may send the full path.
    let base_name = file_name.rsplit(['/', '\\']).next().unwrap_or_default();

    let sanitized: String = base_name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect();

    sanitized.trim_start_matches('.').to_owned()
}

fn split_file_name(file_name: &str) -> (String, String) {
    let (stem, extension) = file_name.rsplit_once('.').unwrap_or((file_name, ""));
    let stem = if stem.is_empty() { "image" } else { stem };

    (stem.to_owned(), extension.to_ascii_lowercase())
}
