// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Error types for strategy generation.

use tensor_layout::{CollectiveCommPattern, LayoutError};

/// Errors that can occur while enumerating or pricing strategies.
#[derive(Debug, thiserror::Error)]
pub enum GeneratorError {
    /// A mapping names an operand the generator was not given.
    #[error("unknown operand '{name}'")]
    UnknownOperand { name: String },

    /// A strategy has no layout for an operand the cost model needs.
    #[error("strategy '{strategy}' has no sharding spec for operand '{name}'")]
    MissingLayout { strategy: String, name: String },

    /// A communication action uses a pattern the cost model cannot price.
    #[error("cannot price communication pattern '{pattern}'")]
    UnsupportedCommPattern { pattern: CollectiveCommPattern },

    /// A layout could not be built (including non-divisible shards).
    #[error("layout error: {0}")]
    Layout(#[from] LayoutError),
}

impl GeneratorError {
    /// Returns `true` if the error only invalidates the candidate that
    /// raised it. Every other error invalidates the whole `generate()` call.
    pub fn is_candidate_local(&self) -> bool {
        matches!(self, Self::Layout(LayoutError::NonDivisibleShard { .. }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_candidate_local() {
        let e = GeneratorError::from(LayoutError::NonDivisibleShard {
            dim: 0,
            size: 10,
            shards: 3,
        });
        assert!(e.is_candidate_local());
        assert!(!GeneratorError::UnknownOperand { name: "x".into() }.is_candidate_local());
        assert!(!GeneratorError::from(LayoutError::PartialFlatten { dim: 1 }).is_candidate_local());
    }

    #[test]
    fn test_display() {
        let e = GeneratorError::UnsupportedCommPattern {
            pattern: CollectiveCommPattern::AllToAllFwdAllToAllBwd,
        };
        assert_eq!(
            e.to_string(),
            "cannot price communication pattern 'all_to_all_fwd_all_to_all_bwd'"
        );
    }
}
