//! Keyed maps of images and image streams plus the derived layer index.
//!
//! The store itself is not synchronised; [`FakeOpenShift`](super::FakeOpenShift)
//! owns it behind a single mutex.

use std::collections::{BTreeMap, BTreeSet};
use std::time::SystemTime;

use tracing::debug;

use crate::api::{Image, ImageStream, RESOURCE_IMAGES, RESOURCE_IMAGE_STREAMS};
use crate::{Error, Result};

/// `(namespace, name)` of an image stream.
pub type StreamKey = (String, String);

#[derive(Debug, Default)]
pub struct Store {
    images: BTreeMap<String, Image>,
    streams: BTreeMap<StreamKey, ImageStream>,
    /// Image ids (and sub-manifest digests) referenced per stream.
    layers: BTreeMap<StreamKey, BTreeSet<String>>,
}

fn stream_key(namespace: &str, name: &str) -> StreamKey {
    (namespace.to_string(), name.to_string())
}

fn qualified(namespace: &str, name: &str) -> String {
    format!("{namespace}/{name}")
}

impl Store {
    // -- images -------------------------------------------------------------

    pub fn create_image(&mut self, image: Image) -> Result<Image> {
        let name = image.metadata.name.clone();
        if self.images.contains_key(&name) {
            return Err(Error::already_exists(RESOURCE_IMAGES, name));
        }
        debug!(image = %name, "creating image");
        self.index_image(&image);
        self.images.insert(name, image.clone());
        Ok(image)
    }

    pub fn get_image(&self, name: &str) -> Result<Image> {
        self.images
            .get(name)
            .cloned()
            .ok_or_else(|| Error::not_found(RESOURCE_IMAGES, name))
    }

    /// Images whose namespace matches, or every image when `namespace` is empty.
    pub fn list_images(&self, namespace: &str) -> Vec<Image> {
        self.images
            .values()
            .filter(|i| namespace.is_empty() || i.metadata.namespace == namespace)
            .cloned()
            .collect()
    }

    pub fn update_image(&mut self, image: Image) -> Result<Image> {
        let slot = self
            .images
            .get_mut(&image.metadata.name)
            .ok_or_else(|| Error::not_found(RESOURCE_IMAGES, image.metadata.name.clone()))?;
        debug!(image = %image.metadata.name, "updating image");
        *slot = image.clone();
        self.index_image(&image);
        Ok(image)
    }

    pub fn image(&self, name: &str) -> Option<&Image> {
        self.images.get(name)
    }

    // -- image streams ------------------------------------------------------

    /// Insert a new stream, stamping its creation timestamp.
    pub fn create_image_stream(&mut self, mut stream: ImageStream) -> Result<ImageStream> {
        let key = stream_key(&stream.metadata.namespace, &stream.metadata.name);
        if self.streams.contains_key(&key) {
            return Err(Error::already_exists(
                RESOURCE_IMAGE_STREAMS,
                qualified(&key.0, &key.1),
            ));
        }
        stream.metadata.creation_timestamp = Some(SystemTime::now());
        debug!(namespace = %key.0, name = %key.1, "creating image stream");
        self.reindex(&key, &stream);
        self.streams.insert(key, stream.clone());
        Ok(stream)
    }

    pub fn get_image_stream(&self, namespace: &str, name: &str) -> Result<ImageStream> {
        self.streams
            .get(&stream_key(namespace, name))
            .cloned()
            .ok_or_else(|| Error::not_found(RESOURCE_IMAGE_STREAMS, qualified(namespace, name)))
    }

    /// Streams ordered by `(namespace, name)`.
    pub fn list_image_streams(&self, namespace: &str) -> Vec<ImageStream> {
        self.streams
            .iter()
            .filter(|((ns, _), _)| namespace.is_empty() || ns == namespace)
            .map(|(_, s)| s.clone())
            .collect()
    }

    /// Replace a stream, keeping the creation timestamp it was stored with.
    pub fn update_image_stream(&mut self, mut stream: ImageStream) -> Result<ImageStream> {
        let key = stream_key(&stream.metadata.namespace, &stream.metadata.name);
        let created = match self.streams.get(&key) {
            Some(existing) => existing.metadata.creation_timestamp,
            None => {
                return Err(Error::not_found(
                    RESOURCE_IMAGE_STREAMS,
                    qualified(&key.0, &key.1),
                ))
            }
        };
        stream.metadata.creation_timestamp = created;
        debug!(namespace = %key.0, name = %key.1, "updating image stream");
        self.reindex(&key, &stream);
        self.streams.insert(key, stream.clone());
        Ok(stream)
    }

    pub fn has_image_stream(&self, namespace: &str, name: &str) -> bool {
        self.streams.contains_key(&stream_key(namespace, name))
    }

    // -- layer index --------------------------------------------------------

    /// Image ids referenced from `namespace/name`, if the stream was ever indexed.
    pub fn layer_index(&self, namespace: &str, name: &str) -> Option<&BTreeSet<String>> {
        self.layers.get(&stream_key(namespace, name))
    }

    /// Recompute the index entry of `key` from the stream's tag events.
    fn reindex(&mut self, key: &StreamKey, stream: &ImageStream) {
        let mut ids = BTreeSet::new();
        for image_name in stream.referenced_images() {
            ids.insert(image_name.to_string());
            if let Some(image) = self.images.get(image_name) {
                ids.extend(image.docker_image_manifests.iter().map(|m| m.digest.clone()));
            }
        }
        self.layers.insert(key.clone(), ids);
    }

    /// Add the sub-manifests of `image` to every stream that already
    /// references it, for images stored after the stream was tagged.
    fn index_image(&mut self, image: &Image) {
        if image.docker_image_manifests.is_empty() {
            return;
        }
        let name = image.metadata.name.as_str();
        for ids in self.layers.values_mut().filter(|ids| ids.contains(name)) {
            ids.extend(image.docker_image_manifests.iter().map(|m| m.digest.clone()));
        }
    }
}
