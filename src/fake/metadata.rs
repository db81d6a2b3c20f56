//! Derive client-facing image metadata from manifest and config payloads.

use regharness_oci::{ImageConfig, OciError, ParsedManifest};
use tracing::debug;

use crate::api::{DockerImageMetadata, Image, ImageLayer};
use crate::{Error, Result};

/// Populate `docker_image_metadata` (and layers, when empty) from the
/// manifest and config payloads of `image`.
///
/// Manifest lists, images without a manifest and unknown manifest media types
/// are left as they are. A metadata id already present is kept.
pub fn image_with_metadata(image: &mut Image) -> Result<()> {
    if image.docker_image_manifest.is_empty() || image.is_manifest_list() {
        return Ok(());
    }

    let media_type = image.effective_manifest_media_type().to_string();
    let manifest = match ParsedManifest::parse(&media_type, image.docker_image_manifest.as_bytes())
    {
        Ok(ParsedManifest::Image(m)) => m,
        Ok(ParsedManifest::List(_)) | Err(OciError::UnsupportedMediaType(_)) => {
            debug!(image = %image.metadata.name, %media_type, "no metadata to derive");
            return Ok(());
        }
        Err(e) => {
            return Err(Error::BadRequest(format!(
                "image {}: {e}",
                image.metadata.name
            )))
        }
    };

    if image.docker_image_layers.is_empty() {
        image.docker_image_layers = manifest
            .layers
            .iter()
            .map(|d| ImageLayer {
                name: d.digest.clone(),
                size: d.size,
                media_type: d.media_type.clone(),
            })
            .collect();
    }

    let mut meta = image.docker_image_metadata.take().unwrap_or_default();
    if meta.id.is_empty() {
        meta.id = manifest.config.digest.clone();
    }
    meta.size = manifest.config.size + manifest.layers.iter().map(|l| l.size).sum::<u64>();

    if !image.docker_image_config.is_empty() {
        let config: ImageConfig = serde_json::from_str(&image.docker_image_config)
            .map_err(|e| Error::BadRequest(format!("image {} config: {e}", image.metadata.name)))?;
        fill_from_config(&mut meta, &config);
        if meta.config.is_none() {
            meta.config = config
                .config
                .as_ref()
                .map(serde_json::to_value)
                .transpose()?;
        }
    }

    image.docker_image_metadata = Some(meta);
    Ok(())
}

fn fill_from_config(meta: &mut DockerImageMetadata, config: &ImageConfig) {
    if meta.created.is_none() {
        meta.created = config.created.clone();
    }
    if meta.architecture.is_empty() {
        meta.architecture = config.architecture.clone();
    }
    if meta.os.is_empty() {
        meta.os = config.os.clone();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use regharness_oci::manifest::{
        MEDIA_TYPE_DOCKER_CONFIG, MEDIA_TYPE_DOCKER_LAYER_GZIP, MEDIA_TYPE_DOCKER_MANIFEST,
        MEDIA_TYPE_DOCKER_MANIFEST_LIST,
    };
    use regharness_oci::{Descriptor, Manifest};

    fn schema2_image(config: &str) -> Image {
        let manifest = Manifest {
            schema_version: 2,
            media_type: MEDIA_TYPE_DOCKER_MANIFEST.to_string(),
            config: Descriptor::new(MEDIA_TYPE_DOCKER_CONFIG, "sha256:cfg", 7),
            layers: vec![
                Descriptor::new(MEDIA_TYPE_DOCKER_LAYER_GZIP, "sha256:l1", 100),
                Descriptor::new(MEDIA_TYPE_DOCKER_LAYER_GZIP, "sha256:l2", 200),
            ],
        };
        Image {
            docker_image_manifest: String::from_utf8(manifest.to_bytes().unwrap()).unwrap(),
            docker_image_manifest_media_type: MEDIA_TYPE_DOCKER_MANIFEST.to_string(),
            docker_image_config: config.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn fills_id_layers_and_config_fields() {
        let mut image =
            schema2_image(r#"{"architecture": "amd64", "os": "linux", "created": "2020-01-01T00:00:00Z"}"#);
        image_with_metadata(&mut image).unwrap();

        let meta = image.docker_image_metadata.unwrap();
        assert_eq!(meta.id, "sha256:cfg");
        assert_eq!(meta.size, 307);
        assert_eq!(meta.architecture, "amd64");
        assert_eq!(meta.os, "linux");
        assert_eq!(meta.created.as_deref(), Some("2020-01-01T00:00:00Z"));

        let layers: Vec<_> = image.docker_image_layers.iter().map(|l| l.name.as_str()).collect();
        assert_eq!(layers, ["sha256:l1", "sha256:l2"]);
    }

    #[test]
    fn keeps_existing_id() {
        let mut image = schema2_image("");
        image.docker_image_metadata = Some(DockerImageMetadata {
            id: "sha256:explicit".to_string(),
            ..Default::default()
        });
        image_with_metadata(&mut image).unwrap();
        assert_eq!(image.metadata_id(), Some("sha256:explicit"));
    }

    #[test]
    fn manifest_lists_are_untouched() {
        let mut image = Image {
            docker_image_manifest: "{}".to_string(),
            docker_image_manifest_media_type: MEDIA_TYPE_DOCKER_MANIFEST_LIST.to_string(),
            ..Default::default()
        };
        image_with_metadata(&mut image).unwrap();
        assert!(image.docker_image_metadata.is_none());
    }

    #[test]
    fn broken_config_is_a_bad_request() {
        let mut image = schema2_image("not json");
        let err = image_with_metadata(&mut image).unwrap_err();
        assert!(matches!(err, Error::BadRequest(_)), "{err}");
    }
}
