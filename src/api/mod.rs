//! Control-plane resource types served by the fake.
//!
//! These mirror the image API group of the orchestrator closely enough for
//! the registry middleware: images, image streams and the transient or
//! projected resources built on top of them.

pub mod image;
pub mod stream;

use std::collections::BTreeMap;
use std::time::SystemTime;

use serde::{Deserialize, Serialize};

pub use image::{DockerImageMetadata, Image, ImageLayer, ImageManifest};
pub use stream::{
    ImageBlobReferences, ImageLayerData, ImageStream, ImageStreamImage, ImageStreamLayers,
    ImageStreamMapping, ImageStreamSpec, ImageStreamStatus, ImageStreamTag, NamedTagEventList,
    Secret, SecretList, TagEvent, TagReference,
};

/// Standard object metadata shared by every resource.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectMeta {
    #[serde(default)]
    pub name: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub namespace: String,

    /// `None` is the zero timestamp: the object was never persisted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub creation_timestamp: Option<SystemTime>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub annotations: BTreeMap<String, String>,
}

impl ObjectMeta {
    pub fn named(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            namespace: namespace.into(),
            ..Default::default()
        }
    }
}

/// Reference from a spec tag to another object, e.g. an image stream tag.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectReference {
    pub kind: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub namespace: String,
    pub name: String,
}

// ---------------------------------------------------------------------------
// Resource kinds
// ---------------------------------------------------------------------------

pub const RESOURCE_IMAGES: &str = "images";
pub const RESOURCE_IMAGE_STREAMS: &str = "imagestreams";
pub const RESOURCE_IMAGE_STREAM_MAPPINGS: &str = "imagestreammappings";
pub const RESOURCE_IMAGE_STREAM_TAGS: &str = "imagestreamtags";
pub const RESOURCE_IMAGE_STREAM_IMAGES: &str = "imagestreamimages";

pub const KIND_IMAGE_STREAM_IMAGE: &str = "ImageStreamImage";
pub const KIND_DOCKER_IMAGE: &str = "DockerImage";

// ---------------------------------------------------------------------------
// Composite names
// ---------------------------------------------------------------------------

/// Split `<stream>:<tag>`. Both halves must be non-empty.
pub fn split_image_stream_tag(name: &str) -> Option<(&str, &str)> {
    match name.split_once(':') {
        Some((stream, tag)) if !stream.is_empty() && !tag.is_empty() && !tag.contains(':') => {
            Some((stream, tag))
        }
        _ => None,
    }
}

/// Split `<stream>@<image-id>` on the first `@`. Both halves must be non-empty.
pub fn split_image_stream_image(name: &str) -> Option<(&str, &str)> {
    match name.split_once('@') {
        Some((stream, id)) if !stream.is_empty() && !id.is_empty() => Some((stream, id)),
        _ => None,
    }
}

pub fn join_image_stream_tag(stream: &str, tag: &str) -> String {
    format!("{stream}:{tag}")
}

pub fn join_image_stream_image(stream: &str, id: &str) -> String {
    format!("{stream}@{id}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_stream_tag() {
        assert_eq!(split_image_stream_tag("s:latest"), Some(("s", "latest")));
        assert_eq!(split_image_stream_tag("s"), None);
        assert_eq!(split_image_stream_tag(":latest"), None);
        assert_eq!(split_image_stream_tag("s:"), None);
        assert_eq!(split_image_stream_tag("s:a:b"), None);
    }

    #[test]
    fn split_stream_image() {
        assert_eq!(
            split_image_stream_image("s@sha256:abc"),
            Some(("s", "sha256:abc"))
        );
        assert_eq!(split_image_stream_image("s@a@b"), Some(("s", "a@b")));
        assert_eq!(split_image_stream_image("s"), None);
        assert_eq!(split_image_stream_image("@sha256:abc"), None);
        assert_eq!(split_image_stream_image("s@"), None);
    }

    #[test]
    fn composite_names_join_back() {
        assert_eq!(join_image_stream_tag("s", "v1"), "s:v1");
        assert_eq!(join_image_stream_image("s", "sha256:abc"), "s@sha256:abc");
    }
}
