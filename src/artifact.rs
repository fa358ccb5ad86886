//! The deployable unit: model parameters bundled with the transform
//! parameters they were trained against.
//!
//! Artifacts are written atomically (temp file in the target directory,
//! then rename) so a serving process never observes a half-written file.
//! The on-disk format is a little-endian `u32` format version followed by
//! the bincode body; the loader refuses any version it does not understand
//! rather than risking a silent misprediction.

use crate::error::{PipelineError, Result};
use crate::metrics::RegressionMetrics;
use crate::model::ModelParams;
use crate::transform::TransformParameters;
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::Path;

/// Bumped whenever the serialized layout changes incompatibly.
pub const ARTIFACT_FORMAT_VERSION: u32 = 1;

/// A trained model, its transform parameters and its validation metrics,
/// versioned as one unit. Read-only after training.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelArtifact {
    pub transform: TransformParameters,
    pub model: ModelParams,
    pub validation: RegressionMetrics,
}

impl ModelArtifact {
    /// Write the artifact atomically.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let dir = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };

        let mut bytes = ARTIFACT_FORMAT_VERSION.to_le_bytes().to_vec();
        bytes.extend(bincode::serialize(self)?);

        let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
        tmp.write_all(&bytes)?;
        tmp.persist(path).map_err(|e| PipelineError::Io(e.error))?;
        Ok(())
    }

    /// Load and version-check an artifact.
    ///
    /// # Errors
    /// - `ArtifactVersion` if the format version does not match.
    /// - `Serialization` if the file is truncated or the body is corrupt.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let bytes = std::fs::read(path.as_ref())?;
        if bytes.len() < 4 {
            return Err(PipelineError::Serialization(
                "artifact file is truncated".to_string(),
            ));
        }

        let mut header = [0u8; 4];
        header.copy_from_slice(&bytes[..4]);
        let found = u32::from_le_bytes(header);
        if found != ARTIFACT_FORMAT_VERSION {
            return Err(PipelineError::ArtifactVersion {
                expected: ARTIFACT_FORMAT_VERSION,
                found,
            });
        }

        Ok(bincode::deserialize(&bytes[4..])?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ForestConfig, ModelParams, RandomForestRegressor, Regressor};
    use crate::record::ListingRecord;
    use crate::transform::{self, FeaturePipeline};

    fn tiny_artifact() -> ModelArtifact {
        let records: Vec<ListingRecord> = (0..8u32)
            .map(|i| ListingRecord {
                location: format!("L{}", i % 2),
                property_type: "flat".to_string(),
                bedrooms: 1 + i % 3,
                bathrooms: 1,
                receptions: 1,
                floor_area: 40.0 + 10.0 * f64::from(i),
                price: 200_000.0 + 50_000.0 * f64::from(i),
            })
            .collect();

        let params = FeaturePipeline::new().fit(&records).unwrap();
        let x = transform::feature_matrix(&records, &params).unwrap();
        let y: Vec<f64> = records.iter().map(|r| r.price).collect();
        let forest = RandomForestRegressor::fit(
            &ForestConfig {
                n_trees: 5,
                ..ForestConfig::default()
            },
            &x,
            &y,
        )
        .unwrap();
        let preds = forest.predict_batch(&x);
        let validation = crate::metrics::Metrics::calculate_all(&y, &preds);

        ModelArtifact {
            transform: params,
            model: ModelParams::Forest(forest),
            validation,
        }
    }

    #[test]
    fn test_save_load_round_trip() {
        let artifact = tiny_artifact();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.bin");

        artifact.save(&path).unwrap();
        let loaded = ModelArtifact::load(&path).unwrap();

        assert_eq!(loaded.model.name(), artifact.model.name());
        assert_eq!(loaded.transform, artifact.transform);

        let row = vec![0.0; artifact.transform.n_features];
        let m1 = artifact.model.to_regressor().unwrap();
        let m2 = loaded.model.to_regressor().unwrap();
        assert_eq!(m1.predict(&row).to_bits(), m2.predict(&row).to_bits());
    }

    #[test]
    fn test_load_rejects_version_mismatch() {
        let artifact = tiny_artifact();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.bin");
        artifact.save(&path).unwrap();

        let mut bytes = std::fs::read(&path).unwrap();
        bytes[0] = 0xFE;
        std::fs::write(&path, &bytes).unwrap();

        assert!(matches!(
            ModelArtifact::load(&path),
            Err(PipelineError::ArtifactVersion { expected: 1, .. })
        ));
    }

    #[test]
    fn test_load_rejects_truncated_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.bin");
        std::fs::write(&path, [1, 0]).unwrap();
        assert!(matches!(
            ModelArtifact::load(&path),
            Err(PipelineError::Serialization(_))
        ));
    }

    #[test]
    fn test_load_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.bin");
        assert!(matches!(
            ModelArtifact::load(&path),
            Err(PipelineError::Io(_))
        ));
    }

    #[test]
    fn test_save_overwrites_existing_artifact() {
        let artifact = tiny_artifact();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.bin");

        artifact.save(&path).unwrap();
        artifact.save(&path).unwrap();
        assert!(ModelArtifact::load(&path).is_ok());
    }
}
