//! Storage layout of the registry's filesystem driver.
//!
//! Only the paths the harness waits on are modelled.

use regharness_oci::Digest;

/// Root of all registry data.
pub const REGISTRY_ROOT: &str = "/docker/registry/v2";

/// Link recording that `repo` holds the layer `digest`.
pub fn layer_link_path(repo: &str, digest: &Digest) -> String {
    format!(
        "{REGISTRY_ROOT}/repositories/{repo}/_layers/{}/{}/link",
        digest.algorithm(),
        digest.hex()
    )
}

/// Link recording that `repo` holds the manifest revision `digest`.
pub fn manifest_revision_link_path(repo: &str, digest: &Digest) -> String {
    format!(
        "{REGISTRY_ROOT}/repositories/{repo}/_manifests/revisions/{}/{}/link",
        digest.algorithm(),
        digest.hex()
    )
}

/// Content of the blob `digest`.
pub fn blob_data_path(digest: &Digest) -> String {
    let hex = digest.hex();
    let shard = hex.get(..2).unwrap_or(hex);
    format!(
        "{REGISTRY_ROOT}/blobs/{}/{shard}/{hex}/data",
        digest.algorithm()
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout() {
        let d = Digest::sha256(b"x");
        let hex = d.hex().to_string();

        assert_eq!(
            layer_link_path("ns/app", &d),
            format!("/docker/registry/v2/repositories/ns/app/_layers/sha256/{hex}/link")
        );
        assert_eq!(
            manifest_revision_link_path("ns/app", &d),
            format!("/docker/registry/v2/repositories/ns/app/_manifests/revisions/sha256/{hex}/link")
        );
        assert_eq!(
            blob_data_path(&d),
            format!("/docker/registry/v2/blobs/sha256/{}/{hex}/data", &hex[..2])
        );
    }
}
