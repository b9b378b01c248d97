//! Exact inference for discrete dynamic Bayesian networks.
//!
//! This crate re-exports the whole public API: model construction and
//! compilation into a junction tree from `trellis-core`, and the two-slice
//! time-series engine from `trellis-dbn`.

pub use trellis_core::*;
pub use trellis_dbn::{TimeSeries, TimeSliceEngine, UncertainSeries, init_logging};
pub use trellis_error::{TrellisError, TrellisResult, ensure, trellis_err};
