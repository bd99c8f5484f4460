// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Error types for the solver-facing entry point.

/// Errors that can occur while configuring or running strategy generation.
#[derive(Debug, thiserror::Error)]
pub enum AutoParallelError {
    /// The problem configuration is unreadable or names something unknown.
    #[error("configuration error: {0}")]
    Config(String),

    /// The operands do not fit the requested operator.
    #[error("operation '{op}' rejected its operands: {detail}")]
    Validation { op: String, detail: String },

    /// Strategy enumeration or pricing failed.
    #[error("generator error: {0}")]
    Generator(#[from] strategy_generator::GeneratorError),

    /// The device mesh or an operand layout is malformed.
    #[error("layout error: {0}")]
    Layout(#[from] tensor_layout::LayoutError),

    /// A report could not be serialised.
    #[error("failed to serialise report: {0}")]
    Serialize(#[from] serde_json::Error),
}
