//! Regression models trained on tabular crop and weather data.

pub mod regression;

pub use regression::{
    MIN_TRAINING_ROWS, Metrics, RegressionError, TrainedModel, evaluate, fit_linear, fit_multivariate,
};
