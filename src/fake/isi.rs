//! `<stream>@<image-id>` resolution.

use tracing::debug;

use super::metadata::image_with_metadata;
use super::FakeOpenShift;
use crate::api::{
    join_image_stream_image, split_image_stream_image, ImageStream, ImageStreamImage, ObjectMeta,
    RESOURCE_IMAGE_STREAM_IMAGES,
};
use crate::{Error, Result};

/// Shortest image id prefix (hex characters after any `algorithm:`) that
/// is matched by prefix rather than exactly.
pub const MIN_IMAGE_ID_PREFIX: usize = 6;

/// Find the first tag event of `stream` whose image matches `id`.
///
/// Exact matches always count. Prefix matches count when the hex part of
/// `id` has at least [`MIN_IMAGE_ID_PREFIX`] characters, and may match either
/// the full image name or its hex part.
pub fn find_image_id<'a>(stream: &'a ImageStream, id: &str) -> Option<&'a str> {
    let id_hex = id.split_once(':').map_or(id, |(_, hex)| hex);
    let allow_prefix = id_hex.len() >= MIN_IMAGE_ID_PREFIX;

    stream.referenced_images().find(|image| {
        if *image == id {
            return true;
        }
        if !allow_prefix {
            return false;
        }
        let image_hex = image.split_once(':').map_or(*image, |(_, hex)| hex);
        image.starts_with(id) || image_hex.starts_with(id)
    })
}

impl FakeOpenShift {
    /// Resolve `<stream>@<id>` to the image it names, without its manifest
    /// and config payloads.
    pub fn get_image_stream_image(&self, namespace: &str, name: &str) -> Result<ImageStreamImage> {
        let (stream_name, id) = split_image_stream_image(name).ok_or_else(|| {
            Error::BadRequest(format!(
                "{RESOURCE_IMAGE_STREAM_IMAGES} name {name:?} must be <stream>@<id>"
            ))
        })?;

        let stream = self.get_image_stream(namespace, stream_name)?;
        if stream.status.tags.is_empty() {
            return Err(Error::not_found(RESOURCE_IMAGE_STREAM_IMAGES, name));
        }

        let image_name = find_image_id(&stream, id)
            .ok_or_else(|| Error::not_found(RESOURCE_IMAGE_STREAM_IMAGES, name))?
            .to_string();
        debug!(%namespace, stream = %stream_name, %id, image = %image_name, "resolved image stream image");

        let mut image = self.get_image(&image_name)?;
        image_with_metadata(&mut image)?;
        image.docker_image_manifest.clear();
        image.docker_image_config.clear();

        Ok(ImageStreamImage {
            metadata: ObjectMeta {
                name: join_image_stream_image(stream_name, &image_name),
                namespace: namespace.to_string(),
                creation_timestamp: image.metadata.creation_timestamp,
                ..Default::default()
            },
            image,
        })
    }
}
