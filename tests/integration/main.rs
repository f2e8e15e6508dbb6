//! Integration tests for the accumulator pipeline.

mod mock_estimator;
mod pipeline;
