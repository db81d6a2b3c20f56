//! Blob and image reference graph of an image stream.

use std::collections::{BTreeMap, BTreeSet};

use regharness_oci::manifest::{MEDIA_TYPE_DOCKER_CONFIG, MEDIA_TYPE_DOCKER_MANIFEST};
use tracing::debug;

use super::metadata::image_with_metadata;
use super::FakeOpenShift;
use crate::api::{
    Image, ImageBlobReferences, ImageLayerData, ImageStreamLayers, ObjectMeta,
    RESOURCE_IMAGE_STREAMS,
};
use crate::{Error, Result};

/// Build the blobs and images maps for the image ids in `ids`.
///
/// `lookup` returns the stored image for an id; ids it cannot resolve are
/// reported with `image_missing` set.
pub fn build_layers<'a, F>(
    ids: &BTreeSet<String>,
    lookup: F,
) -> (
    BTreeMap<String, ImageLayerData>,
    BTreeMap<String, ImageBlobReferences>,
)
where
    F: Fn(&str) -> Option<&'a Image>,
{
    let mut blobs = BTreeMap::new();
    let mut images = BTreeMap::new();

    for id in ids {
        let Some(stored) = lookup(id) else {
            images.insert(
                id.clone(),
                ImageBlobReferences {
                    image_missing: true,
                    ..Default::default()
                },
            );
            continue;
        };

        let image = with_metadata(stored);
        let mut refs = ImageBlobReferences::default();

        for layer in &image.docker_image_layers {
            refs.layers.push(layer.name.clone());
            blobs
                .entry(layer.name.clone())
                .or_insert_with(|| ImageLayerData {
                    size: Some(layer.size),
                    media_type: layer.media_type.clone(),
                });
        }

        if image.effective_manifest_media_type() == MEDIA_TYPE_DOCKER_MANIFEST {
            if let Some(config) = image.metadata_id() {
                let size = image.docker_image_config.len() as u64;
                blobs.insert(
                    config.to_string(),
                    ImageLayerData {
                        size: (size > 0).then_some(size),
                        media_type: MEDIA_TYPE_DOCKER_CONFIG.to_string(),
                    },
                );
                refs.config = Some(config.to_string());
            }
        }

        refs.manifests = image
            .docker_image_manifests
            .iter()
            .map(|m| m.digest.clone())
            .collect();

        // The manifest itself is a blob too.
        blobs.insert(
            id.clone(),
            ImageLayerData {
                size: None,
                media_type: image.effective_manifest_media_type().to_string(),
            },
        );
        images.insert(id.clone(), refs);
    }

    (blobs, images)
}

/// Metadata-enriched copy of `image`; falls back to the stored image when
/// its payloads cannot be parsed.
fn with_metadata(image: &Image) -> Image {
    let mut enriched = image.clone();
    match image_with_metadata(&mut enriched) {
        Ok(()) => enriched,
        Err(e) => {
            debug!(image = %image.metadata.name, error = %e, "using stored metadata");
            image.clone()
        }
    }
}

impl FakeOpenShift {
    /// The `layers` subresource of `namespace/name`.
    pub fn get_image_stream_layers(&self, namespace: &str, name: &str) -> Result<ImageStreamLayers> {
        let store = self.lock();
        if !store.has_image_stream(namespace, name) {
            return Err(Error::not_found(
                RESOURCE_IMAGE_STREAMS,
                format!("{namespace}/{name}"),
            ));
        }

        let empty = BTreeSet::new();
        let ids = store.layer_index(namespace, name).unwrap_or(&empty);
        let (blobs, images) = build_layers(ids, |id| store.image(id));

        Ok(ImageStreamLayers {
            metadata: ObjectMeta::named(namespace, name),
            blobs,
            images,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{DockerImageMetadata, ImageLayer, ImageManifest};
    use regharness_oci::manifest::MEDIA_TYPE_OCI_INDEX;

    fn ids(list: &[&str]) -> BTreeSet<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn missing_images_are_flagged() {
        let (blobs, images) = build_layers(&ids(&["sha256:gone"]), |_| None);
        assert!(blobs.is_empty());
        assert!(images["sha256:gone"].image_missing);
    }

    #[test]
    fn shared_layers_are_listed_once_in_blobs() {
        let layer = ImageLayer {
            name: "sha256:shared".to_string(),
            size: 5,
            media_type: "gzip".to_string(),
        };
        let a = Image {
            docker_image_layers: vec![layer.clone()],
            ..Default::default()
        };
        let b = a.clone();

        let (blobs, images) = build_layers(&ids(&["sha256:a", "sha256:b"]), |id| match id {
            "sha256:a" => Some(&a),
            "sha256:b" => Some(&b),
            _ => None,
        });

        assert_eq!(blobs.len(), 3);
        assert_eq!(blobs["sha256:shared"].size, Some(5));
        assert_eq!(images["sha256:a"].layers, ["sha256:shared"]);
        assert_eq!(images["sha256:b"].layers, ["sha256:shared"]);
        assert_eq!(
            blobs["sha256:a"].media_type,
            MEDIA_TYPE_DOCKER_MANIFEST,
            "unset media type defaults to schema 2"
        );
    }

    #[test]
    fn config_size_is_reported_when_known() {
        let image = Image {
            docker_image_manifest_media_type: MEDIA_TYPE_DOCKER_MANIFEST.to_string(),
            docker_image_config: "{}".to_string(),
            docker_image_metadata: Some(DockerImageMetadata {
                id: "sha256:cfg".to_string(),
                ..Default::default()
            }),
            ..Default::default()
        };
        let (blobs, images) = build_layers(&ids(&["sha256:i"]), |_| Some(&image));
        assert_eq!(blobs["sha256:cfg"].size, Some(2));
        assert_eq!(blobs["sha256:cfg"].media_type, MEDIA_TYPE_DOCKER_CONFIG);
        assert_eq!(images["sha256:i"].config.as_deref(), Some("sha256:cfg"));
    }

    #[test]
    fn index_lists_sub_manifests() {
        let image = Image {
            docker_image_manifest_media_type: MEDIA_TYPE_OCI_INDEX.to_string(),
            docker_image_manifests: vec![ImageManifest {
                digest: "sha256:child".to_string(),
                ..Default::default()
            }],
            ..Default::default()
        };
        let (blobs, images) = build_layers(&ids(&["sha256:i"]), |_| Some(&image));
        assert_eq!(images["sha256:i"].manifests, ["sha256:child"]);
        assert_eq!(images["sha256:i"].config, None);
        assert_eq!(blobs["sha256:i"].media_type, MEDIA_TYPE_OCI_INDEX);
    }
}
