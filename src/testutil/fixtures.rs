//! Image, manifest and stream fixtures.
//!
//! Images built here satisfy the naming invariant the fake does not check:
//! `metadata.name` is the sha256 digest of the manifest payload.

use regharness_oci::layer::{random_layer, LayerBlob};
use regharness_oci::manifest::{
    MEDIA_TYPE_DOCKER_CONFIG, MEDIA_TYPE_DOCKER_LAYER_GZIP, MEDIA_TYPE_DOCKER_MANIFEST,
    MEDIA_TYPE_DOCKER_MANIFEST_LIST, MEDIA_TYPE_OCI_CONFIG, MEDIA_TYPE_OCI_INDEX,
    MEDIA_TYPE_OCI_LAYER_GZIP, MEDIA_TYPE_OCI_MANIFEST,
};
use regharness_oci::{Descriptor, Digest, ImageConfig, Manifest, ManifestList, Platform};

use crate::api::{Image, ImageStream, ImageStreamMapping, ObjectMeta};
use crate::fake::metadata::image_with_metadata;
use crate::{Error, Result};

/// Builds single-platform manifests (docker schema 2 by default).
#[derive(Debug, Clone)]
pub struct Schema2ManifestBuilder {
    media_type: String,
    config_media_type: String,
    layer_media_type: String,
    config: Option<Descriptor>,
    layers: Vec<Descriptor>,
}

impl Default for Schema2ManifestBuilder {
    fn default() -> Self {
        Self {
            media_type: MEDIA_TYPE_DOCKER_MANIFEST.to_string(),
            config_media_type: MEDIA_TYPE_DOCKER_CONFIG.to_string(),
            layer_media_type: MEDIA_TYPE_DOCKER_LAYER_GZIP.to_string(),
            config: None,
            layers: Vec::new(),
        }
    }
}

impl Schema2ManifestBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Produce an OCI image manifest instead.
    pub fn oci(mut self) -> Self {
        self.media_type = MEDIA_TYPE_OCI_MANIFEST.to_string();
        self.config_media_type = MEDIA_TYPE_OCI_CONFIG.to_string();
        self.layer_media_type = MEDIA_TYPE_OCI_LAYER_GZIP.to_string();
        self
    }

    /// Reference `config` as the config blob.
    pub fn config(mut self, config: &[u8]) -> Self {
        self.config = Some(Descriptor::new(
            self.config_media_type.clone(),
            Digest::sha256(config).to_string(),
            config.len() as u64,
        ));
        self
    }

    pub fn config_descriptor(mut self, descriptor: Descriptor) -> Self {
        self.config = Some(descriptor);
        self
    }

    pub fn layer(mut self, descriptor: Descriptor) -> Self {
        self.layers.push(descriptor);
        self
    }

    /// Reference a generated layer with this manifest's layer media type.
    pub fn layer_blob(self, blob: &LayerBlob) -> Self {
        let mut descriptor = blob.descriptor();
        descriptor.media_type = self.layer_media_type.clone();
        self.layer(descriptor)
    }

    /// The manifest. Without an explicit config, the empty JSON object is
    /// referenced.
    pub fn build(self) -> Manifest {
        let config = self.config.unwrap_or_else(|| {
            Descriptor::new(
                self.config_media_type.clone(),
                Digest::sha256(b"{}").to_string(),
                2,
            )
        });
        Manifest {
            schema_version: 2,
            media_type: self.media_type,
            config,
            layers: self.layers,
        }
    }
}

/// Builds docker manifest lists and OCI image indexes.
#[derive(Debug, Clone)]
pub struct ManifestListBuilder {
    media_type: String,
    manifests: Vec<Descriptor>,
}

impl Default for ManifestListBuilder {
    fn default() -> Self {
        Self {
            media_type: MEDIA_TYPE_DOCKER_MANIFEST_LIST.to_string(),
            manifests: Vec::new(),
        }
    }
}

impl ManifestListBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn oci(mut self) -> Self {
        self.media_type = MEDIA_TYPE_OCI_INDEX.to_string();
        self
    }

    /// Reference the manifest `payload` for `architecture`/`os`.
    pub fn manifest(
        self,
        media_type: &str,
        payload: &[u8],
        architecture: &str,
        os: &str,
    ) -> Self {
        let mut descriptor = Descriptor::new(
            media_type,
            Digest::sha256(payload).to_string(),
            payload.len() as u64,
        );
        descriptor.platform = Some(Platform {
            architecture: architecture.to_string(),
            os: os.to_string(),
            variant: None,
        });
        self.entry(descriptor)
    }

    pub fn entry(mut self, descriptor: Descriptor) -> Self {
        self.manifests.push(descriptor);
        self
    }

    pub fn build(self) -> ManifestList {
        ManifestList {
            schema_version: 2,
            media_type: self.media_type,
            manifests: self.manifests,
        }
    }
}

/// Serialized image config for `architecture`/`os`.
pub fn image_config(architecture: &str, os: &str) -> Result<Vec<u8>> {
    let config = ImageConfig {
        created: Some("2020-01-01T00:00:00Z".to_string()),
        architecture: architecture.to_string(),
        os: os.to_string(),
        config: None,
    };
    Ok(serde_json::to_vec(&config)?)
}

/// An image for `manifest`, as the registry would create it after a push to
/// `repository`.
///
/// For single-platform manifests layers and metadata are derived from the
/// payloads; manifest lists get their sub-manifests when the image is
/// created in the fake.
pub fn new_image_for_manifest(
    repository: &str,
    manifest: &[u8],
    config: &[u8],
    media_type: &str,
) -> Result<Image> {
    let name = Digest::sha256(manifest).to_string();
    let text = |what: &str, bytes: &[u8]| {
        String::from_utf8(bytes.to_vec())
            .map_err(|e| Error::BadRequest(format!("{what} of {name} is not UTF-8: {e}")))
    };

    let mut image = Image {
        metadata: ObjectMeta::named("", name.clone()),
        docker_image_reference: format!("{repository}@{name}"),
        docker_image_manifest: text("manifest", manifest)?,
        docker_image_manifest_media_type: media_type.to_string(),
        docker_image_config: text("config", config)?,
        ..Default::default()
    };
    image_with_metadata(&mut image)?;
    Ok(image)
}

/// A schema 2 image with `layer_count` random layers, plus the layer blobs.
pub fn new_random_image(
    repository: &str,
    layer_count: usize,
    layer_size: usize,
) -> Result<(Image, Vec<LayerBlob>)> {
    let layers = (0..layer_count)
        .map(|_| random_layer(layer_size))
        .collect::<regharness_oci::Result<Vec<_>>>()?;
    let config = image_config("amd64", "linux")?;

    let manifest = layers
        .iter()
        .fold(Schema2ManifestBuilder::new().config(&config), |b, l| {
            b.layer_blob(l)
        })
        .build()
        .to_bytes()?;

    let image = new_image_for_manifest(repository, &manifest, &config, MEDIA_TYPE_DOCKER_MANIFEST)?;
    Ok((image, layers))
}

pub fn new_image_stream(namespace: &str, name: &str) -> ImageStream {
    ImageStream::new(namespace, name)
}

/// Mapping that points `stream:tag` in `namespace` at `image`.
pub fn new_image_stream_mapping(
    namespace: &str,
    stream: &str,
    tag: &str,
    image: Image,
) -> ImageStreamMapping {
    ImageStreamMapping {
        metadata: ObjectMeta::named(namespace, stream),
        image,
        tag: tag.to_string(),
    }
}
