//! A feed-forward neural network engine.
//!
//! A [`Network`] chains an [`Input`](layer::Input) layer, any number of
//! [`Hidden`](layer::Hidden) layers and an [`Output`](layer::Output) layer bound
//! to a [`CostFunction`](cost::CostFunction). Gradients are closed-form per
//! layer and parameters are updated through an [`Optimizer`](optimizer::Optimizer).
//!
//! Batches are matrices with one sample per row.

pub mod activation;
pub mod config;
pub mod cost;
pub mod data;
pub mod encoder;
pub mod error;
pub mod init;
pub mod layer;
pub mod network;
pub mod optimizer;
pub mod param;
pub mod trainer;

pub use data::{Labeled, Labels};
pub use error::{Error, Result};
pub use network::Network;
pub use trainer::Trainer;

#[macro_export]
macro_rules! assert_rel_eq_arr1 {
    ($actual:expr, $expected:expr) => {
        match (&$actual, &$expected) {
            (actual, expected) => {
                assert_eq!(actual.shape(), expected.shape());
                ndarray::Zip::from(actual).and(expected).for_each(|v, w| {
                    assert_relative_eq!(v, w);
                });
            }
        }
    };
    ($actual:expr, $expected:expr, epsilon = $epsilon:expr) => {
        match (&$actual, &$expected) {
            (actual, expected) => {
                assert_eq!(actual.shape(), expected.shape());
                ndarray::Zip::from(actual).and(expected).for_each(|v, w| {
                    assert_relative_eq!(v, w, epsilon = $epsilon);
                });
            }
        }
    };
}

#[macro_export]
macro_rules! assert_rel_eq_arr2 {
    ($actual:expr, $expected:expr) => {
        match (&$actual, &$expected) {
            (actual, expected) => {
                assert_eq!(actual.shape(), expected.shape());
                ndarray::Zip::from(actual).and(expected).for_each(|v, w| {
                    assert_relative_eq!(v, w);
                });
            }
        }
    };
    ($actual:expr, $expected:expr, epsilon = $epsilon:expr) => {
        match (&$actual, &$expected) {
            (actual, expected) => {
                assert_eq!(actual.shape(), expected.shape());
                ndarray::Zip::from(actual).and(expected).for_each(|v, w| {
                    assert_relative_eq!(v, w, epsilon = $epsilon);
                });
            }
        }
    };
}
