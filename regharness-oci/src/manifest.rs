use serde::{Deserialize, Serialize};

use crate::{OciError, Result};

// ---------------------------------------------------------------------------
// Image Manifest
// ---------------------------------------------------------------------------

/// A single-image manifest (application/vnd.docker.distribution.manifest.v2+json
/// or application/vnd.oci.image.manifest.v1+json).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    #[serde(rename = "schemaVersion")]
    pub schema_version: u32,

    #[serde(rename = "mediaType", default, skip_serializing_if = "String::is_empty")]
    pub media_type: String,

    pub config: Descriptor,

    pub layers: Vec<Descriptor>,
}

impl Manifest {
    /// Serialize to the byte form whose digest names the image.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec_pretty(self)?)
    }
}

// ---------------------------------------------------------------------------
// Descriptor
// ---------------------------------------------------------------------------

/// A content-addressable descriptor used in both manifests and manifest lists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Descriptor {
    #[serde(rename = "mediaType")]
    pub media_type: String,

    pub digest: String,

    pub size: u64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub platform: Option<Platform>,
}

impl Descriptor {
    pub fn new(media_type: impl Into<String>, digest: impl Into<String>, size: u64) -> Self {
        Self {
            media_type: media_type.into(),
            digest: digest.into(),
            size,
            platform: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Platform
// ---------------------------------------------------------------------------

/// Target platform for a manifest inside a manifest list.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Platform {
    pub architecture: String,
    pub os: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variant: Option<String>,
}

// ---------------------------------------------------------------------------
// Manifest list / image index
// ---------------------------------------------------------------------------

/// A manifest list (application/vnd.docker.distribution.manifest.list.v2+json)
/// or OCI image index (application/vnd.oci.image.index.v1+json).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestList {
    #[serde(rename = "schemaVersion")]
    pub schema_version: u32,

    #[serde(rename = "mediaType", default, skip_serializing_if = "String::is_empty")]
    pub media_type: String,

    pub manifests: Vec<Descriptor>,
}

impl ManifestList {
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec_pretty(self)?)
    }
}

// ---------------------------------------------------------------------------
// Image Config
// ---------------------------------------------------------------------------

/// The fields of an image config blob the harness reads.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created: Option<String>,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub architecture: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub os: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config: Option<ContainerConfig>,
}

/// Container runtime configuration embedded in the image config blob.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerConfig {
    #[serde(rename = "Env", default)]
    pub env: Vec<String>,

    #[serde(rename = "Cmd", default)]
    pub cmd: Vec<String>,

    #[serde(rename = "WorkingDir", default)]
    pub working_dir: String,
}

// ---------------------------------------------------------------------------
// Media type table
// ---------------------------------------------------------------------------

pub const MEDIA_TYPE_OCI_INDEX: &str = "application/vnd.oci.image.index.v1+json";
pub const MEDIA_TYPE_OCI_MANIFEST: &str = "application/vnd.oci.image.manifest.v1+json";
pub const MEDIA_TYPE_OCI_CONFIG: &str = "application/vnd.oci.image.config.v1+json";
pub const MEDIA_TYPE_OCI_LAYER_GZIP: &str = "application/vnd.oci.image.layer.v1.tar+gzip";
pub const MEDIA_TYPE_DOCKER_MANIFEST_LIST: &str =
    "application/vnd.docker.distribution.manifest.list.v2+json";
pub const MEDIA_TYPE_DOCKER_MANIFEST: &str = "application/vnd.docker.distribution.manifest.v2+json";
pub const MEDIA_TYPE_DOCKER_CONFIG: &str = "application/vnd.docker.container.image.v1+json";
pub const MEDIA_TYPE_DOCKER_LAYER_GZIP: &str = "application/vnd.docker.image.rootfs.diff.tar.gzip";

/// Returns `true` when `media_type` is an image index / manifest list.
pub fn is_index_media_type(media_type: &str) -> bool {
    media_type == MEDIA_TYPE_OCI_INDEX || media_type == MEDIA_TYPE_DOCKER_MANIFEST_LIST
}

/// Returns `true` when `media_type` is a single image manifest.
pub fn is_manifest_media_type(media_type: &str) -> bool {
    media_type == MEDIA_TYPE_OCI_MANIFEST || media_type == MEDIA_TYPE_DOCKER_MANIFEST
}

/// A manifest payload decoded according to its declared media type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedManifest {
    Image(Manifest),
    List(ManifestList),
}

impl ParsedManifest {
    /// Decode `payload` as the kind of manifest `media_type` names.
    pub fn parse(media_type: &str, payload: &[u8]) -> Result<Self> {
        if is_index_media_type(media_type) {
            let list: ManifestList = serde_json::from_slice(payload)
                .map_err(|e| OciError::Manifest(format!("invalid {media_type}: {e}")))?;
            Ok(Self::List(list))
        } else if is_manifest_media_type(media_type) {
            let manifest: Manifest = serde_json::from_slice(payload)
                .map_err(|e| OciError::Manifest(format!("invalid {media_type}: {e}")))?;
            Ok(Self::Image(manifest))
        } else {
            Err(OciError::UnsupportedMediaType(media_type.to_string()))
        }
    }

    /// Digests of every blob or manifest this payload references.
    pub fn references(&self) -> Vec<&Descriptor> {
        match self {
            Self::Image(m) => std::iter::once(&m.config).chain(m.layers.iter()).collect(),
            Self::List(l) => l.manifests.iter().collect(),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
