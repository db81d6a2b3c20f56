//! In-memory fake of the image control plane.
//!
//! [`FakeOpenShift`] stores images and image streams and serves the subset
//! of the image API the registry middleware uses: plain CRUD on images and
//! streams, the `layers` and `secrets` stream subresources, stream mappings,
//! stream tags and stream images.
//!
//! # Locking
//!
//! All state sits behind one mutex that every operation holds for its whole
//! duration. Composite operations (stream mappings and stream tag creation)
//! are built from the public operations and release the lock between steps,
//! so another caller may change the stream in between. There are no resource
//! versions; callers must not rely on transactional semantics across those
//! steps.
//!
//! # Example
//!
//! ```
//! use regharness::api::ImageStream;
//! use regharness::fake::{Action, FakeOpenShift, Outcome, Resource};
//!
//! let fos = FakeOpenShift::new();
//! fos.create_image_stream(ImageStream::new("ns", "app")).unwrap();
//!
//! let out = fos
//!     .dispatch(Action::get(Resource::ImageStream, "ns", "app").subresource("layers"))
//!     .unwrap();
//! assert!(matches!(out, Outcome::ImageStreamLayers(l) if l.images.is_empty()));
//! ```

pub mod action;
pub mod dispatch;
pub mod isi;
pub mod layers;
pub mod manifest_list;
pub mod metadata;
pub mod store;

use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::debug;

pub use action::{Action, Object, Outcome, Resource, Verb};

use crate::api::{
    split_image_stream_image, split_image_stream_tag, Image, ImageStream, ImageStreamMapping,
    ImageStreamTag, ObjectMeta, SecretList, TagEvent, KIND_DOCKER_IMAGE,
    KIND_IMAGE_STREAM_IMAGE, RESOURCE_IMAGE_STREAM_TAGS,
};
use crate::{Error, Result};
use manifest_list::expand_manifest_list;
use store::Store;

/// Thread-safe in-memory image control plane.
#[derive(Debug, Default)]
pub struct FakeOpenShift {
    store: Mutex<Store>,
}

impl FakeOpenShift {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Store> {
        self.store.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // -- images -------------------------------------------------------------

    /// Store a new image. Manifest lists get their sub-manifest references
    /// filled in from the payload.
    pub fn create_image(&self, mut image: Image) -> Result<Image> {
        expand_manifest_list(&mut image)?;
        self.lock().create_image(image)
    }

    pub fn get_image(&self, name: &str) -> Result<Image> {
        self.lock().get_image(name)
    }

    pub fn list_images(&self, namespace: &str) -> Vec<Image> {
        self.lock().list_images(namespace)
    }

    pub fn update_image(&self, image: Image) -> Result<Image> {
        self.lock().update_image(image)
    }

    // -- image streams ------------------------------------------------------

    pub fn create_image_stream(&self, stream: ImageStream) -> Result<ImageStream> {
        self.lock().create_image_stream(stream)
    }

    pub fn get_image_stream(&self, namespace: &str, name: &str) -> Result<ImageStream> {
        self.lock().get_image_stream(namespace, name)
    }

    pub fn list_image_streams(&self, namespace: &str) -> Vec<ImageStream> {
        self.lock().list_image_streams(namespace)
    }

    pub fn update_image_stream(&self, stream: ImageStream) -> Result<ImageStream> {
        self.lock().update_image_stream(stream)
    }

    /// Pull secrets of a stream. Always empty.
    pub fn get_image_stream_secrets(&self, namespace: &str, name: &str) -> Result<SecretList> {
        debug!(%namespace, %name, "serving empty secret list");
        Ok(SecretList::default())
    }

    // -- composite operations ----------------------------------------------

    /// Point `mapping.tag` of the stream named by `mapping.metadata` at
    /// `mapping.image`, creating the image unless it already exists.
    pub fn create_image_stream_mapping(
        &self,
        namespace: &str,
        mapping: ImageStreamMapping,
    ) -> Result<ImageStreamMapping> {
        let namespace = if namespace.is_empty() {
            mapping.metadata.namespace.clone()
        } else {
            namespace.to_string()
        };
        let mut stream = self.get_image_stream(&namespace, &mapping.metadata.name)?;

        match self.create_image(mapping.image.clone()) {
            Ok(_) => {}
            Err(e) if e.is_already_exists() => {
                debug!(image = %mapping.image.name(), "image already exists, keeping it");
            }
            Err(e) => return Err(e),
        }

        stream.push_tag_event(
            &mapping.tag,
            TagEvent::new(
                mapping.image.docker_image_reference.clone(),
                mapping.image.name(),
            ),
        );
        self.update_image_stream(stream)?;
        debug!(
            %namespace,
            stream = %mapping.metadata.name,
            tag = %mapping.tag,
            image = %mapping.image.name(),
            "mapped image into stream"
        );

        let mut mapping = mapping;
        mapping.metadata.namespace = namespace;
        Ok(mapping)
    }

    /// Add a new tag to a stream, creating the stream when it does not exist.
    pub fn create_image_stream_tag(
        &self,
        namespace: &str,
        istag: ImageStreamTag,
    ) -> Result<ImageStreamTag> {
        let namespace = if namespace.is_empty() {
            istag.metadata.namespace.clone()
        } else {
            namespace.to_string()
        };
        let (stream_name, tag) = split_image_stream_tag(&istag.metadata.name).ok_or_else(|| {
            Error::BadRequest(format!(
                "{RESOURCE_IMAGE_STREAM_TAGS} name {:?} must be <stream>:<tag>",
                istag.metadata.name
            ))
        })?;

        let mut stream = match self.get_image_stream(&namespace, stream_name) {
            Ok(stream) => stream,
            Err(e) if e.is_not_found() => ImageStream::new(namespace.as_str(), stream_name),
            Err(e) => return Err(e),
        };

        if stream.spec_tag(tag).is_some() {
            return Err(Error::already_exists(
                RESOURCE_IMAGE_STREAM_TAGS,
                istag.metadata.name.clone(),
            ));
        }

        let mut tag_ref = istag.tag.clone().unwrap_or_default();
        tag_ref.name = tag.to_string();
        stream.spec.tags.push(tag_ref.clone());
        stream.push_tag_event(tag, tag_event_for(&istag));

        let stream = if stream.metadata.creation_timestamp.is_none() {
            self.create_image_stream(stream)?
        } else {
            self.update_image_stream(stream)?
        };

        Ok(ImageStreamTag {
            metadata: ObjectMeta {
                name: istag.metadata.name.clone(),
                namespace,
                creation_timestamp: stream.metadata.creation_timestamp,
                annotations: istag.metadata.annotations.clone(),
            },
            tag: Some(tag_ref),
            image: istag.image,
        })
    }
}

/// Tag event recorded for a new stream tag: the embedded image when given,
/// otherwise whatever the tag's `from` reference names.
fn tag_event_for(istag: &ImageStreamTag) -> TagEvent {
    if !istag.image.name().is_empty() {
        return TagEvent::new(
            istag.image.docker_image_reference.clone(),
            istag.image.name(),
        );
    }

    match istag.tag.as_ref().and_then(|t| t.from.as_ref()) {
        Some(from) if from.kind == KIND_IMAGE_STREAM_IMAGE => {
            let image = split_image_stream_image(&from.name).map_or("", |(_, id)| id);
            TagEvent::new("", image)
        }
        Some(from) if from.kind == KIND_DOCKER_IMAGE => TagEvent::new(from.name.clone(), ""),
        _ => TagEvent::new("", ""),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{ObjectReference, TagReference};

    fn istag(name: &str) -> ImageStreamTag {
        ImageStreamTag {
            metadata: ObjectMeta::named("ns", name),
            ..Default::default()
        }
    }

    #[test]
    fn mapping_requires_existing_stream() {
        let fos = FakeOpenShift::new();
        let mapping = ImageStreamMapping {
            metadata: ObjectMeta::named("ns", "missing"),
            tag: "latest".to_string(),
            ..Default::default()
        };
        let err = fos.create_image_stream_mapping("ns", mapping).unwrap_err();
        assert!(err.is_not_found(), "{err}");
    }

    #[test]
    fn stream_tag_with_bad_name() {
        let fos = FakeOpenShift::new();
        let err = fos.create_image_stream_tag("ns", istag("nocolon")).unwrap_err();
        assert!(matches!(err, Error::BadRequest(_)), "{err}");
    }

    #[test]
    fn stream_tag_twice_already_exists() {
        let fos = FakeOpenShift::new();
        fos.create_image_stream_tag("ns", istag("s:v1")).unwrap();
        let err = fos.create_image_stream_tag("ns", istag("s:v1")).unwrap_err();
        assert!(err.is_already_exists(), "{err}");
    }

    #[test]
    fn stream_tag_from_image_stream_image() {
        let mut ist = istag("s:v1");
        ist.tag = Some(TagReference {
            name: "v1".to_string(),
            from: Some(ObjectReference {
                kind: KIND_IMAGE_STREAM_IMAGE.to_string(),
                namespace: "ns".to_string(),
                name: "other@sha256:abc".to_string(),
            }),
            ..Default::default()
        });
        assert_eq!(tag_event_for(&ist).image, "sha256:abc");
    }

    #[test]
    fn secrets_are_empty() {
        let fos = FakeOpenShift::new();
        assert!(fos.get_image_stream_secrets("ns", "s").unwrap().items.is_empty());
    }
}
