//! Sub-manifest references for manifest lists and image indexes.

use regharness_oci::ParsedManifest;

use crate::api::{Image, ImageManifest};
use crate::{Error, Result};

/// Fill `docker_image_manifests` from the manifest list payload of `image`.
///
/// Images that are not manifest lists are left untouched. Architecture and
/// OS stay empty; the real control plane fills them in later.
pub fn expand_manifest_list(image: &mut Image) -> Result<()> {
    if !image.is_manifest_list() {
        return Ok(());
    }

    let parsed = ParsedManifest::parse(
        &image.docker_image_manifest_media_type,
        image.docker_image_manifest.as_bytes(),
    )
    .map_err(|e| Error::BadRequest(format!("image {}: {e}", image.metadata.name)))?;

    let ParsedManifest::List(list) = parsed else {
        return Err(Error::BadRequest(format!(
            "image {}: {} payload is not a manifest list",
            image.metadata.name, image.docker_image_manifest_media_type
        )));
    };

    image.docker_image_manifests = list
        .manifests
        .into_iter()
        .map(|d| ImageManifest {
            digest: d.digest,
            media_type: d.media_type,
            manifest_size: d.size,
            architecture: String::new(),
            os: String::new(),
        })
        .collect();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use regharness_oci::manifest::{
        MEDIA_TYPE_DOCKER_MANIFEST, MEDIA_TYPE_DOCKER_MANIFEST_LIST, MEDIA_TYPE_OCI_INDEX,
        MEDIA_TYPE_OCI_MANIFEST,
    };

    fn list_image(media_type: &str, manifest: &str) -> Image {
        Image {
            docker_image_manifest_media_type: media_type.to_string(),
            docker_image_manifest: manifest.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn expands_oci_index() {
        let mut image = list_image(
            MEDIA_TYPE_OCI_INDEX,
            r#"{"schemaVersion": 2, "manifests": [
                {"mediaType": "application/vnd.oci.image.manifest.v1+json",
                 "digest": "sha256:one", "size": 10,
                 "platform": {"architecture": "amd64", "os": "linux"}}
            ]}"#,
        );
        expand_manifest_list(&mut image).unwrap();
        assert_eq!(
            image.docker_image_manifests,
            [ImageManifest {
                digest: "sha256:one".to_string(),
                media_type: MEDIA_TYPE_OCI_MANIFEST.to_string(),
                manifest_size: 10,
                architecture: String::new(),
                os: String::new(),
            }]
        );
    }

    #[test]
    fn leaves_single_manifests_alone() {
        let mut image = list_image(MEDIA_TYPE_DOCKER_MANIFEST, "whatever");
        expand_manifest_list(&mut image).unwrap();
        assert!(image.docker_image_manifests.is_empty());
    }

    #[test]
    fn garbage_list_is_a_bad_request() {
        let mut image = list_image(MEDIA_TYPE_DOCKER_MANIFEST_LIST, "{");
        let err = expand_manifest_list(&mut image).unwrap_err();
        assert!(matches!(err, Error::BadRequest(_)), "{err}");
    }
}
