//! Point-by-point win probability and momentum for racket-sport matches.
//!
//! [`engine`] holds the computation: a Monte-Carlo estimator of each side's
//! chance to win the current game, and a tracker that turns every point's
//! probability swing into decay-weighted momentum series. [`feed`] and
//! [`report`] move match text in and rows out.

pub mod config;
pub mod engine;
pub mod error;
pub mod feed;
pub mod report;

pub use error::{MomentumError, Result};
