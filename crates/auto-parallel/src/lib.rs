// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # auto-parallel
//!
//! Entry point for a sharding solver: describe one operation and a device
//! mesh, validate it, and get back every priced sharding strategy.
//!
//! The solver picks among the returned strategies; nothing in this crate
//! chooses one. [`StrategyReport::cheapest`] exists for display.
//!
//! # Example
//! ```
//! use auto_parallel::{ProblemConfig, StrategyRequest};
//!
//! let config = ProblemConfig::from_toml(r#"
//!     operator = "linear"
//!     mesh_shape = [2, 2]
//!
//!     [operands]
//!     input = [16, 32]
//!     other = [32, 64]
//!     output = [16, 64]
//! "#).unwrap();
//!
//! let request = StrategyRequest::from_config(&config).unwrap().validate().unwrap();
//! let report = request.report().unwrap();
//! assert!(!report.strategies.is_empty());
//! ```

pub mod config;
mod error;
mod report;
pub mod request;

pub use config::{OperandShapes, ProblemConfig};
pub use error::AutoParallelError;
pub use report::{CommAction, StrategyEntry, StrategyReport};
pub use request::StrategyRequest;

/// Loads, validates and generates in one call.
pub fn generate_from_config(config: &ProblemConfig) -> Result<StrategyReport, AutoParallelError> {
    let request = StrategyRequest::from_config(config)?.validate()?;
    let report = request.report()?;
    tracing::info!(
        op = %report.operator,
        strategies = report.strategies.len(),
        "report ready",
    );
    Ok(report)
}
