//! Reading and checking the multipart product creation form.

use axum::{
    body::Bytes,
    extract::{Multipart, multipart::Field},
};
use image::ImageFormat;
use time::{OffsetDateTime, PrimitiveDateTime, UtcOffset, macros::format_description};

use crate::{
    Error, FieldErrors,
    category::CategoryId,
    product::Price,
    validation::{optional_text, required_text},
};

/// The longest product name that may be saved.
pub const PRODUCT_NAME_MAX_LENGTH: usize = 100;
/// The longest product description that may be saved.
pub const PRODUCT_DESCRIPTION_MAX_LENGTH: usize = 500;
/// The file extensions accepted for product images.
pub const IMAGE_EXTENSIONS: [&str; 5] = ["png", "jpg", "jpeg", "gif", "webp"];

/// A file sent with the product form.
#[derive(Debug, Clone, PartialEq)]
pub struct UploadedImage {
    pub file_name: String,
    pub content_type: Option<String>,
    pub data: Bytes,
}

/// The raw product form fields, exactly as submitted.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProductForm {
    pub name: String,
    pub category: String,
    pub price: String,
    pub created: String,
    pub available: bool,
    pub description: String,
    pub image: Option<UploadedImage>,
}

/// The product form after every field has been checked.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidProductForm {
    pub name: String,
    pub category_id: CategoryId,
    pub price: Price,
    pub created: OffsetDateTime,
    pub available: bool,
    pub description: String,
    pub image: UploadedImage,
}

impl ProductForm {
    /// Read the form fields from a multipart request body.
    ///
    /// Unknown fields are ignored. A file input left empty by the browser is
    /// treated as no image.
    ///
    /// # Errors
    ///
    /// Returns [Error::MultipartError] if the body is not valid multipart data.
    pub async fn from_multipart(mut multipart: Multipart) -> Result<Self, Error> {
        let mut form = Self::default();

        while let Some(field) = multipart.next_field().await.map_err(|error| {
            tracing::error!("Could not read the next multipart form field: {error}");
            Error::MultipartError(error.body_text())
        })? {
            let Some(name) = field.name().map(str::to_owned) else {
                continue;
            };

            match name.as_str() {
                "name" => form.name = read_text(field).await?,
                "category" => form.category = read_text(field).await?,
                "price" => form.price = read_text(field).await?,
                "created" => form.created = read_text(field).await?,
                "available" => {
                    let value = read_text(field).await?;
                    form.available = matches!(value.as_str(), "on" | "true" | "1");
                }
                "description" => form.description = read_text(field).await?,
                "image" => form.image = read_image(field).await?,
                _ => tracing::debug!("Ignoring unknown product form field \"{name}\""),
            }
        }

        Ok(form)
    }

    /// Check every field and return the cleaned values.
    ///
    /// `local_offset` is the UTC offset used to interpret the creation time,
    /// which the browser sends without a timezone.
    ///
    /// # Errors
    ///
    /// Returns the messages for every field that is invalid.
    pub fn validate(&self, local_offset: UtcOffset) -> Result<ValidProductForm, FieldErrors> {
        let mut errors = FieldErrors::new();

        let name = required_text("name", &self.name, PRODUCT_NAME_MAX_LENGTH, &mut errors);

        let category_id = parse_category(&self.category)
            .inspect_err(|message| errors.add("category", message.clone()))
            .ok();

        let price = Price::parse(&self.price)
            .inspect_err(|message| errors.add("price", message.clone()))
            .ok();

        let created = parse_created(&self.created, local_offset)
            .inspect_err(|message| errors.add("created", message.clone()))
            .ok();

        if !self.available {
            errors.add("available", "This field is required.");
        }

        let description = optional_text(
            "description",
            &self.description,
            PRODUCT_DESCRIPTION_MAX_LENGTH,
            &mut errors,
        );

        let image = check_image(self.image.as_ref())
            .inspect_err(|message| errors.add("image", message.clone()))
            .ok();

        match (name, category_id, price, created, description, image) {
            (
                Some(name),
                Some(category_id),
                Some(price),
                Some(created),
                Some(description),
                Some(image),
            ) if errors.is_empty() => Ok(ValidProductForm {
                name,
                category_id,
                price,
                created,
                available: self.available,
                description,
                image: image.clone(),
            }),
            _ => Err(errors),
        }
    }
}

async fn read_text(field: Field<'_>) -> Result<String, Error> {
    field.text().await.map_err(|error| {
        tracing::error!("Could not read text from multipart form field: {error}");
        Error::MultipartError(error.body_text())
    })
}

async fn read_image(field: Field<'_>) -> Result<Option<UploadedImage>, Error> {
    let file_name = field.file_name().unwrap_or_default().to_owned();
    let content_type = field.content_type().map(str::to_owned);

    let data = field.bytes().await.map_err(|error| {
        tracing::error!("Could not read data from multipart form field: {error}");
        Error::MultipartError(error.body_text())
    })?;

    if file_name.is_empty() && data.is_empty() {
        return Ok(None);
    }

    tracing::debug!("Received file '{}' that is {} bytes", file_name, data.len());

    Ok(Some(UploadedImage {
        file_name,
        content_type,
        data,
    }))
}

fn parse_category(raw_category: &str) -> Result<CategoryId, String> {
    let raw_category = raw_category.trim();

    if raw_category.is_empty() {
        return Err("This field is required.".to_owned());
    }

    raw_category
        .parse()
        .map_err(|_| "Select a valid choice.".to_owned())
}

/// Parse the value of a `datetime-local` input, e.g. "2025-03-01T09:30".
fn parse_created(raw_created: &str, local_offset: UtcOffset) -> Result<OffsetDateTime, String> {
    let raw_created = raw_created.trim();

    if raw_created.is_empty() {
        return Err("This field is required.".to_owned());
    }

    let format = format_description!("[year]-[month]-[day]T[hour]:[minute][optional [:[second]]]");

    PrimitiveDateTime::parse(raw_created, format)
        .map(|created| created.assume_offset(local_offset))
        .map_err(|_| "Enter a valid date/time.".to_owned())
}

fn check_image(image: Option<&UploadedImage>) -> Result<&UploadedImage, String> {
    let Some(image) = image else {
        return Err("This field is required.".to_owned());
    };

    if image.data.is_empty() {
        return Err("The submitted file is empty.".to_owned());
    }

    let extension = image
        .file_name
        .rsplit_once('.')
        .map(|(_, extension)| extension.to_ascii_lowercase())
        .unwrap_or_default();

    if !IMAGE_EXTENSIONS.contains(&extension.as_str()) {
        return Err(format!(
            "File extension \"{extension}\" is not allowed. Allowed extensions are: {}.",
            IMAGE_EXTENSIONS.join(", ")
        ));
    }

    let is_image = image
        .content_type
        .as_deref()
        .is_some_and(|content_type| content_type.starts_with("image/"));

    // The name and content type come from the client, so check the bytes too.
    let has_image_signature = matches!(
        image::guess_format(&image.data),
        Ok(ImageFormat::Png | ImageFormat::Jpeg | ImageFormat::Gif | ImageFormat::WebP)
    );

    if !is_image || !has_image_signature {
        return Err(
            "Upload a valid image. The file you uploaded was either not an image or a corrupted image."
                .to_owned(),
        );
    }

    Ok(image)
}
