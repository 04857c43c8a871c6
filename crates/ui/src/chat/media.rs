use std::sync::Arc;

use gpui::{Image, ImageFormat};
use parlor_backend::{RemoteMedia, image_mime_type};
use parlor_core::InlineImage;

/// Display state of one image referenced by a message.
#[derive(Debug, Clone)]
pub enum MediaState {
    Loading,
    Ready(Arc<Image>),
    Failed,
}

pub fn image_format(mime_type: &str) -> Option<ImageFormat> {
    match mime_type.trim().to_ascii_lowercase().as_str() {
        "image/png" => Some(ImageFormat::Png),
        "image/jpeg" | "image/jpg" => Some(ImageFormat::Jpeg),
        "image/gif" => Some(ImageFormat::Gif),
        "image/webp" => Some(ImageFormat::Webp),
        _ => None,
    }
}

/// Picks the format from the response header, falling back to the path extension.
pub fn remote_image(raw_url: &str, media: RemoteMedia) -> Option<Arc<Image>> {
    let format = media
        .content_type
        .as_deref()
        .and_then(image_format)
        .or_else(|| {
            let path = raw_url.split(['?', '#']).next().unwrap_or(raw_url);
            let (_, extension) = path.rsplit_once('.')?;
            image_mime_type(extension).and_then(image_format)
        })?;

    Some(Arc::new(Image::from_bytes(format, media.bytes)))
}

pub fn inline_image(image: &InlineImage) -> Option<Arc<Image>> {
    let format = image_format(image.mime_type)?;
    Some(Arc::new(Image::from_bytes(format, image.bytes.to_vec())))
}
