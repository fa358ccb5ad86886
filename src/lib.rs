//! # homeworth
//!
//! An end-to-end property-price pipeline: collect real-estate listings,
//! clean and feature-engineer the tabular data, train and evaluate two
//! regression model families, and serve price estimates through a minimal
//! web form.
//!
//! ## Core Design Principles
//!
//! - **Fit/apply separation**: every transform is fitted once on training
//!   data and applied as a pure function of the stored parameters. The same
//!   parameters at training and serving time produce bit-identical feature
//!   vectors.
//! - **One versioned artifact**: model parameters ship bundled with the
//!   transform parameters they were trained against, never separately.
//! - **Explicit fallbacks**: unseen categories resolve to a reserved
//!   fallback code and surface as a low-confidence flag; they never throw
//!   and never pass silently.
//! - **Honest failure**: training that diverges or a dataset that cleans
//!   down to nothing aborts with a typed error instead of deploying a
//!   degraded model.
//!
//! ## Module Structure
//!
//! - `collector` — listing-page fetching, HTML extraction, CSV persistence
//! - `cleaning` — dedup, imputation and IQR outlier removal
//! - `transform` — category encoding, Box-Cox, scaling, the feature pipeline
//! - `model` — regression forest and feed-forward network
//! - `training` — split, fit, evaluate, select
//! - `metrics` — MSE / RMSE / R²
//! - `artifact` — the versioned, atomically written deployment bundle
//! - `serving` — the predictor service and its web front-end

pub mod artifact;
pub mod cleaning;
pub mod collector;
pub mod error;
pub mod metrics;
pub mod model;
pub mod record;
pub mod serving;
pub mod training;
pub mod transform;

pub use artifact::{ModelArtifact, ARTIFACT_FORMAT_VERSION};
pub use cleaning::{Cleaner, CleaningConfig, CleaningSummary};
pub use error::{PipelineError, Result};
pub use record::{ListingRecord, PropertyType, RawListing};
pub use serving::{PredictionRequest, PredictorService, PriceEstimate};
pub use transform::{FeaturePipeline, TransformParameters};
