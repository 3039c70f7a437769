//! equity-backtest: Backtesting engine for quantitative equity strategies
//!
//! This library provides the core components for:
//! - Day-by-day simulation with exact decimal portfolio accounting
//! - Seven pluggable rebalancing strategies
//! - Cross-sectional factor scoring
//! - Slippage, fee, and tax modelling on execution
//! - Performance analytics and run comparison
//! - Bounded concurrent grid search
//! - Narrow data ports with in-memory adapters
//! - Full observability stack

pub mod analytics;
pub mod cli;
pub mod config;
pub mod data;
pub mod engine;
pub mod execution;
pub mod factor;
pub mod optimize;
pub mod portfolio;
pub mod ports;
pub mod service;
pub mod strategy;
pub mod telemetry;
