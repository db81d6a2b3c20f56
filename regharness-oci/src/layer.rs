use flate2::write::GzEncoder;
use flate2::Compression;
use tracing::debug;

use crate::digest::Digest;
use crate::manifest::{Descriptor, MEDIA_TYPE_DOCKER_LAYER_GZIP};
use crate::{OciError, Result};

/// A synthetic layer blob held in memory.
#[derive(Debug, Clone)]
pub struct LayerBlob {
    /// Compressed tarball bytes.
    pub data: Vec<u8>,
    /// Digest of `data`.
    pub digest: Digest,
    /// Media type the layer is advertised with.
    pub media_type: String,
}

impl LayerBlob {
    /// Descriptor suitable for embedding into a manifest.
    pub fn descriptor(&self) -> Descriptor {
        Descriptor::new(
            self.media_type.clone(),
            self.digest.to_string(),
            self.data.len() as u64,
        )
    }
}

/// Build a gzipped tarball holding a single file of `size` random bytes.
///
/// Every call yields a distinct digest, so tests can push the result to a
/// registry without colliding with blobs uploaded by other tests.
pub fn random_layer(size: usize) -> Result<LayerBlob> {
    let mut content = vec![0u8; size];
    getrandom::fill(&mut content).map_err(|e| OciError::Layer(format!("random source: {e}")))?;

    let mut name_bytes = [0u8; 8];
    getrandom::fill(&mut name_bytes).map_err(|e| OciError::Layer(format!("random source: {e}")))?;
    let name: String = name_bytes.iter().map(|b| format!("{:02x}", b)).collect();

    let data = tar_gz(&[(name.as_str(), &content)])?;
    let digest = Digest::sha256(&data);
    debug!(%digest, size = data.len(), "generated random layer");

    Ok(LayerBlob {
        data,
        digest,
        media_type: MEDIA_TYPE_DOCKER_LAYER_GZIP.to_string(),
    })
}

/// Pack `(path, content)` entries into a gzipped tarball.
pub fn tar_gz(entries: &[(&str, &[u8])]) -> Result<Vec<u8>> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::fast());
    {
        let mut builder = tar::Builder::new(&mut encoder);
        for &(path, data) in entries {
            let mut header = tar::Header::new_gnu();
            header.set_path(path)?;
            header.set_size(data.len() as u64);
            header.set_mode(0o644);
            header.set_cksum();
            builder.append(&header, data)?;
        }
        builder.finish()?;
    }
    Ok(encoder.finish()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::read::GzDecoder;
    use std::io::Read;

    #[test]
    fn random_layers_differ() {
        let a = random_layer(64).unwrap();
        let b = random_layer(64).unwrap();
        assert_ne!(a.digest, b.digest);
        assert!(a.digest.verify(&a.data).is_ok());
    }

    #[test]
    fn random_layer_contains_one_file_of_requested_size() {
        let layer = random_layer(100).unwrap();
        let mut archive = tar::Archive::new(GzDecoder::new(&layer.data[..]));
        let mut entries = archive.entries().unwrap();

        let mut content = Vec::new();
        {
            let mut entry = entries.next().unwrap().unwrap();
            entry.read_to_end(&mut content).unwrap();
        }
        assert_eq!(content.len(), 100);
        assert!(entries.next().is_none());
    }

    #[test]
    fn descriptor_reports_compressed_size() {
        let layer = random_layer(10).unwrap();
        let desc = layer.descriptor();
        assert_eq!(desc.size, layer.data.len() as u64);
        assert_eq!(desc.digest, layer.digest.to_string());
        assert_eq!(desc.media_type, MEDIA_TYPE_DOCKER_LAYER_GZIP);
    }
}
