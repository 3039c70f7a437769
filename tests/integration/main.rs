//! Integration tests for equity-backtest

mod cancellation_test;
mod common;
mod e2e_test;
mod grid_test;
