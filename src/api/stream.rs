use std::collections::BTreeMap;
use std::time::SystemTime;

use serde::{Deserialize, Serialize};

use super::{Image, ObjectMeta, ObjectReference};

/// A named collection of tags pointing at images within a namespace.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageStream {
    pub metadata: ObjectMeta,
    #[serde(default)]
    pub spec: ImageStreamSpec,
    #[serde(default)]
    pub status: ImageStreamStatus,
}

impl ImageStream {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            metadata: ObjectMeta::named(namespace, name),
            ..Default::default()
        }
    }

    pub fn spec_tag(&self, tag: &str) -> Option<&TagReference> {
        self.spec.tags.iter().find(|t| t.name == tag)
    }

    pub fn status_tag(&self, tag: &str) -> Option<&NamedTagEventList> {
        self.status.tags.iter().find(|t| t.tag == tag)
    }

    /// Every image name referenced by a tag event, in walk order.
    pub fn referenced_images(&self) -> impl Iterator<Item = &str> {
        self.status
            .tags
            .iter()
            .flat_map(|list| list.items.iter())
            .map(|event| event.image.as_str())
            .filter(|image| !image.is_empty())
    }

    /// Append `event` to the event list of `tag`, creating the list if needed.
    pub fn push_tag_event(&mut self, tag: &str, event: TagEvent) {
        match self.status.tags.iter_mut().find(|t| t.tag == tag) {
            Some(list) => list.items.push(event),
            None => self.status.tags.push(NamedTagEventList {
                tag: tag.to_string(),
                items: vec![event],
            }),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageStreamSpec {
    #[serde(default)]
    pub tags: Vec<TagReference>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageStreamStatus {
    #[serde(default)]
    pub docker_image_repository: String,
    #[serde(default)]
    pub tags: Vec<NamedTagEventList>,
}

/// A user-specified tag.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TagReference {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<ObjectReference>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub annotations: BTreeMap<String, String>,
}

/// History of images a tag has pointed at.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NamedTagEventList {
    pub tag: String,
    #[serde(default)]
    pub items: Vec<TagEvent>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TagEvent {
    pub created: SystemTime,
    #[serde(default)]
    pub docker_image_reference: String,
    /// Image name (manifest digest).
    pub image: String,
    #[serde(default)]
    pub generation: i64,
}

impl TagEvent {
    pub fn new(docker_image_reference: impl Into<String>, image: impl Into<String>) -> Self {
        Self {
            created: SystemTime::now(),
            docker_image_reference: docker_image_reference.into(),
            image: image.into(),
            generation: 0,
        }
    }
}

/// Request to point a tag of a stream at an image. Never persisted.
///
/// `metadata` names the target stream.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageStreamMapping {
    pub metadata: ObjectMeta,
    pub image: Image,
    pub tag: String,
}

/// View of one tag of a stream, named `<stream>:<tag>`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageStreamTag {
    pub metadata: ObjectMeta,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<TagReference>,
    #[serde(default)]
    pub image: Image,
}

/// Image as seen through a stream, named `<stream>@<image-id>`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageStreamImage {
    pub metadata: ObjectMeta,
    pub image: Image,
}

/// Blob and image references reachable from a stream.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageStreamLayers {
    pub metadata: ObjectMeta,
    #[serde(default)]
    pub blobs: BTreeMap<String, ImageLayerData>,
    #[serde(default)]
    pub images: BTreeMap<String, ImageBlobReferences>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageLayerData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    pub media_type: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageBlobReferences {
    #[serde(default)]
    pub layers: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config: Option<String>,
    #[serde(default)]
    pub manifests: Vec<String>,
    #[serde(default)]
    pub image_missing: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Secret {
    pub metadata: ObjectMeta,
    #[serde(default)]
    pub data: BTreeMap<String, Vec<u8>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecretList {
    #[serde(default)]
    pub items: Vec<Secret>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_tag_event_appends_to_existing_list() {
        let mut is = ImageStream::new("ns", "s");
        is.push_tag_event("latest", TagEvent::new("r@sha256:1", "sha256:1"));
        is.push_tag_event("v1", TagEvent::new("r@sha256:2", "sha256:2"));
        is.push_tag_event("latest", TagEvent::new("r@sha256:3", "sha256:3"));

        assert_eq!(is.status.tags.len(), 2);
        let latest = is.status_tag("latest").unwrap();
        let images: Vec<_> = latest.items.iter().map(|e| e.image.as_str()).collect();
        assert_eq!(images, ["sha256:1", "sha256:3"]);
    }

    #[test]
    fn referenced_images_walks_every_list() {
        let mut is = ImageStream::new("ns", "s");
        is.push_tag_event("a", TagEvent::new("", "sha256:1"));
        is.push_tag_event("b", TagEvent::new("", "sha256:2"));
        is.push_tag_event("a", TagEvent::new("", ""));
        let refs: Vec<_> = is.referenced_images().collect();
        assert_eq!(refs, ["sha256:1", "sha256:2"]);
    }
}
