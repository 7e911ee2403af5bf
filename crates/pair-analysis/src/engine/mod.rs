//! Pair Analysis Engine
//!
//! Coordination layer running the loader, imputer, statistics, predictor,
//! metrics and chart stages for one request

pub mod analysis_engine;
pub mod result;

pub use analysis_engine::{PairAnalysisEngine, analyze_table};
pub use result::{AnalysisResult, PerTicker};
