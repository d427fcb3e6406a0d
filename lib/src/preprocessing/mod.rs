//! Record preprocessing for the workout model.
//!
//! Follows the same fitted/unfitted split as the models in this crate:
//!
//! - [`Transformer`]: unfitted, learns from training samples
//! - [`FittedTransformer`]: frozen, transforms samples and serializes
//!
//! The only transformer the model needs is [`FeatureEncoder`], which turns a
//! [`WorkoutRecord`](crate::dataset::WorkoutRecord) into a fixed-width
//! numeric vector.
//!
//! # Example
//!
//! ```ignore
//! use workout_perf::preprocessing::{FeatureEncoder, FittedTransformer, Transformer};
//!
//! let fitted = FeatureEncoder::new().fit(train.features())?;
//! let x_train = fitted.transform_batch(train.features());
//!
//! // Later, at serving time, with the same fitted encoder:
//! let row = fitted.transform(&request_record);
//! ```

pub mod encoding;
pub mod traits;

pub use encoding::{
    FeatureEncoder, FeatureEncoderParams, FittedFeatureEncoder, ENCODER_VERSION, NUMERIC_FEATURES,
};
pub use traits::{FittedTransformer, Transformer};
