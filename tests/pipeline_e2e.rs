//! End-to-end scenarios: raw listings through cleaning, training, artifact
//! persistence and serving.

use homeworth::model::{ForestConfig, MlpConfig};
use homeworth::serving::PredictionRequest;
use homeworth::training::{self, TrainConfig};
use homeworth::{Cleaner, PipelineError, PredictorService, RawListing};

/// A small synthetic market where price is a clean function of size:
/// `price = 100k * bedrooms + 1k * floor_area`. Includes one duplicate and
/// one row without a price for the cleaner to remove.
fn synthetic_listings() -> Vec<RawListing> {
    let mut rows = Vec::new();
    for beds in 1u32..=5 {
        for delta in [-5.0, 5.0] {
            let area = 40.0 + 25.0 * f64::from(beds) + delta;
            rows.push(RawListing {
                location: Some(if beds % 2 == 0 { "N1" } else { "SW1" }.to_string()),
                property_type: Some(if beds >= 4 { "detached" } else { "flat" }.to_string()),
                bedrooms: Some(beds),
                bathrooms: Some(1 + beds / 2),
                receptions: Some(1),
                floor_area: Some(area),
                price: Some(100_000.0 * f64::from(beds) + 1_000.0 * area),
            });
        }
    }
    rows.push(rows[0].clone()); // duplicate
    rows.push(RawListing {
        price: None,
        ..rows[3].clone()
    });
    rows
}

fn quick_config() -> TrainConfig {
    TrainConfig {
        forest: ForestConfig {
            n_trees: 50,
            ..ForestConfig::default()
        },
        network: MlpConfig::new(0)
            .with_hidden_dims(vec![8])
            .with_max_epochs(30),
        ..TrainConfig::default()
    }
}

fn trained_service() -> PredictorService {
    let raw = synthetic_listings();
    let (records, _) = Cleaner::default().clean(&raw).unwrap();
    let (artifact, _) = training::train(&records, &quick_config()).unwrap();
    PredictorService::from_artifact(artifact).unwrap()
}

#[test]
fn cleaner_output_is_complete_and_positive() {
    let raw = synthetic_listings();
    let (records, summary) = Cleaner::default().clean(&raw).unwrap();

    assert_eq!(summary.rows_in, raw.len());
    assert_eq!(summary.dropped_duplicates, 1);
    assert_eq!(summary.dropped_missing_price, 1);
    assert_eq!(
        summary.rows_in,
        summary.rows_out
            + summary.dropped_missing_price
            + summary.dropped_duplicates
            + summary.dropped_outliers
    );
    for record in &records {
        assert!(!record.location.is_empty());
        assert!(!record.property_type.is_empty());
        assert!(record.price > 0.0);
        assert!(record.floor_area.is_finite());
    }
}

#[test]
fn training_row_predicts_near_its_training_price() {
    let raw = synthetic_listings();
    let (records, _) = Cleaner::default().clean(&raw).unwrap();
    let (artifact, report) = training::train(&records, &quick_config()).unwrap();

    assert_eq!(report.candidates.len(), 2);
    let service = PredictorService::from_artifact(artifact).unwrap();

    // Identical to the beds=3 training listing.
    let target_area = 40.0 + 25.0 * 3.0 + 5.0;
    let target_price = 100_000.0 * 3.0 + 1_000.0 * target_area;
    let estimate = service
        .predict(PredictionRequest {
            location: Some("SW1".to_string()),
            property_type: Some("flat".to_string()),
            bedrooms: Some(3),
            bathrooms: Some(2),
            receptions: Some(1),
            floor_area: Some(target_area),
        })
        .unwrap();

    assert!(!estimate.low_confidence);
    let rel = (estimate.price - target_price).abs() / target_price;
    assert!(
        rel < 0.35,
        "estimate {} too far from training price {target_price}",
        estimate.price
    );
}

#[test]
fn missing_bedrooms_is_rejected_not_defaulted() {
    let service = trained_service();
    let err = service
        .predict(PredictionRequest {
            location: Some("SW1".to_string()),
            property_type: Some("flat".to_string()),
            bedrooms: None,
            bathrooms: Some(1),
            receptions: Some(1),
            floor_area: Some(90.0),
        })
        .unwrap_err();

    match err {
        PipelineError::Validation(msg) => assert!(msg.contains("bedrooms")),
        other => panic!("expected a validation error, got {other:?}"),
    }
}

#[test]
fn unseen_location_succeeds_with_low_confidence_flag() {
    let service = trained_service();
    let estimate = service
        .predict(PredictionRequest {
            location: Some("EH1".to_string()),
            property_type: Some("flat".to_string()),
            bedrooms: Some(2),
            bathrooms: Some(2),
            receptions: Some(1),
            floor_area: Some(85.0),
        })
        .unwrap();

    assert!(estimate.price.is_finite());
    assert!(estimate.low_confidence);
    assert_eq!(estimate.fallback_fields, vec!["location".to_string()]);
}

#[test]
fn prediction_is_deterministic_across_calls() {
    let service = trained_service();
    let request = || PredictionRequest {
        location: Some("N1".to_string()),
        property_type: Some("flat".to_string()),
        bedrooms: Some(2),
        bathrooms: Some(2),
        receptions: Some(1),
        floor_area: Some(92.0),
    };
    let a = service.predict(request()).unwrap();
    let b = service.predict(request()).unwrap();
    assert_eq!(a.price.to_bits(), b.price.to_bits());
}

#[test]
fn artifact_round_trip_preserves_service_behaviour() {
    let raw = synthetic_listings();
    let (records, _) = Cleaner::default().clean(&raw).unwrap();
    let (artifact, _) = training::train(&records, &quick_config()).unwrap();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("model.bin");
    artifact.save(&path).unwrap();

    let direct = PredictorService::from_artifact(artifact).unwrap();
    let loaded = PredictorService::load(&path).unwrap();

    let request = || PredictionRequest {
        location: Some("SW1".to_string()),
        property_type: Some("flat".to_string()),
        bedrooms: Some(1),
        bathrooms: Some(1),
        receptions: Some(1),
        floor_area: Some(60.0),
    };
    assert_eq!(
        direct.predict(request()).unwrap().price.to_bits(),
        loaded.predict(request()).unwrap().price.to_bits()
    );
}

#[test]
fn mismatched_artifact_version_refuses_to_serve() {
    let raw = synthetic_listings();
    let (records, _) = Cleaner::default().clean(&raw).unwrap();
    let (artifact, _) = training::train(&records, &quick_config()).unwrap();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("model.bin");
    artifact.save(&path).unwrap();

    let mut bytes = std::fs::read(&path).unwrap();
    bytes[0] ^= 0xFF;
    std::fs::write(&path, &bytes).unwrap();

    assert!(matches!(
        PredictorService::load(&path),
        Err(PipelineError::ArtifactVersion { .. })
    ));
}

#[test]
fn empty_collection_cannot_train_silently() {
    assert!(matches!(
        Cleaner::default().clean(&[]),
        Err(PipelineError::DataQuality(_))
    ));
    assert!(matches!(
        training::train(&[], &quick_config()),
        Err(PipelineError::DataQuality(_))
    ));
}
