use serde::{Deserialize, Serialize};

use regharness_oci::manifest::{is_index_media_type, MEDIA_TYPE_DOCKER_MANIFEST};

use super::ObjectMeta;

/// An image known to the control plane.
///
/// `metadata.name` is the manifest digest. Manifest and config payloads are
/// JSON documents and kept as text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Image {
    pub metadata: ObjectMeta,

    /// Pull spec of the image, e.g. `registry.example/ns/name@sha256:…`.
    #[serde(default)]
    pub docker_image_reference: String,

    #[serde(default)]
    pub docker_image_manifest: String,

    #[serde(default)]
    pub docker_image_manifest_media_type: String,

    #[serde(default)]
    pub docker_image_config: String,

    #[serde(default)]
    pub docker_image_layers: Vec<ImageLayer>,

    /// Only set for manifest lists and image indexes.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub docker_image_manifests: Vec<ImageManifest>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub docker_image_metadata: Option<DockerImageMetadata>,
}

impl Image {
    pub fn name(&self) -> &str {
        &self.metadata.name
    }

    /// Manifest media type, defaulting to docker schema 2 when unset.
    pub fn effective_manifest_media_type(&self) -> &str {
        if self.docker_image_manifest_media_type.is_empty() {
            MEDIA_TYPE_DOCKER_MANIFEST
        } else {
            &self.docker_image_manifest_media_type
        }
    }

    pub fn is_manifest_list(&self) -> bool {
        is_index_media_type(&self.docker_image_manifest_media_type)
    }

    /// The metadata id (config digest for schema 2 images), if known.
    pub fn metadata_id(&self) -> Option<&str> {
        self.docker_image_metadata
            .as_ref()
            .map(|m| m.id.as_str())
            .filter(|id| !id.is_empty())
    }
}

/// A layer of an image, in manifest order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageLayer {
    /// Layer digest.
    pub name: String,
    pub size: u64,
    pub media_type: String,
}

/// A manifest referenced by a manifest list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageManifest {
    pub digest: String,
    pub media_type: String,
    pub manifest_size: u64,
    #[serde(default)]
    pub architecture: String,
    #[serde(default)]
    pub os: String,
}

/// Metadata clients read from an image, derived from its manifest and config.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DockerImageMetadata {
    /// Config digest for schema 2 and OCI images.
    #[serde(rename = "Id", default)]
    pub id: String,

    #[serde(rename = "Created", default, skip_serializing_if = "Option::is_none")]
    pub created: Option<String>,

    #[serde(rename = "Architecture", default)]
    pub architecture: String,

    #[serde(rename = "Os", default)]
    pub os: String,

    /// Sum of config and layer sizes.
    #[serde(rename = "Size", default)]
    pub size: u64,

    #[serde(rename = "Config", default, skip_serializing_if = "Option::is_none")]
    pub config: Option<serde_json::Value>,
}
