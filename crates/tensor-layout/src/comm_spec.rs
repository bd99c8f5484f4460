// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Collective communication specs.
//!
//! A [`CommSpec`] describes a collective that must run to reconcile a
//! layout: which pattern, on which tensor layout, along which mesh axis.
//! Nothing here executes communication; a `CommSpec` only describes and
//! sizes it.

use crate::{LayoutError, ShardingSpec};
use std::fmt;

/// The closed set of collective patterns a strategy may request.
///
/// Each pattern names its forward behaviour and the matching backward
/// behaviour of the autograd counterpart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CollectiveCommPattern {
    /// All-gather in forward, split in backward.
    GatherFwdSplitBwd,
    /// All-to-all in both directions.
    AllToAllFwdAllToAllBwd,
    /// Split in forward, all-gather in backward.
    SplitFwdGatherBwd,
    /// All-reduce in forward, identity in backward.
    AllReduceFwdIdentityBwd,
    /// Identity in forward, all-reduce in backward.
    IdentityFwdAllReduceBwd,
    /// All-gather across a flattened axis group in forward, split in backward.
    MixGatherFwdSplitBwd,
}

impl CollectiveCommPattern {
    /// Returns a snake_case label.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::GatherFwdSplitBwd => "gather_fwd_split_bwd",
            Self::AllToAllFwdAllToAllBwd => "all_to_all_fwd_all_to_all_bwd",
            Self::SplitFwdGatherBwd => "split_fwd_gather_bwd",
            Self::AllReduceFwdIdentityBwd => "all_reduce_fwd_identity_bwd",
            Self::IdentityFwdAllReduceBwd => "identity_fwd_all_reduce_bwd",
            Self::MixGatherFwdSplitBwd => "mix_gather_fwd_split_bwd",
        }
    }
}

impl fmt::Display for CollectiveCommPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The mesh axis (or axis pair) a collective runs over.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalProcessAxis {
    Single(usize),
    /// Two axes treated as one; the mesh is flattened.
    Pair(usize, usize),
}

impl From<usize> for LogicalProcessAxis {
    fn from(axis: usize) -> Self {
        Self::Single(axis)
    }
}

impl From<[usize; 2]> for LogicalProcessAxis {
    fn from(axes: [usize; 2]) -> Self {
        Self::Pair(axes[0], axes[1])
    }
}

/// One collective communication action.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct CommSpec {
    comm_pattern: CollectiveCommPattern,
    sharding_spec: ShardingSpec,
    logical_process_axis: usize,
}

impl CommSpec {
    /// Creates a communication spec.
    ///
    /// With [`LogicalProcessAxis::Pair`] the layout's mesh is replaced by
    /// its flattened form and the action runs along axis 0 of it. The
    /// caller's `sharding_spec` is consumed; the returned spec owns the
    /// rewritten layout.
    pub fn new(
        comm_pattern: CollectiveCommPattern,
        sharding_spec: ShardingSpec,
        axis: impl Into<LogicalProcessAxis>,
    ) -> Result<Self, LayoutError> {
        let (sharding_spec, logical_process_axis) = match axis.into() {
            LogicalProcessAxis::Pair(a, b) => (sharding_spec.flattened(&[a, b])?, 0),
            LogicalProcessAxis::Single(axis) => {
                let mesh_rank = sharding_spec.device_mesh().rank();
                if axis >= mesh_rank {
                    return Err(LayoutError::AxisOutOfRange { axis, mesh_rank });
                }
                (sharding_spec, axis)
            }
        };
        Ok(Self {
            comm_pattern,
            sharding_spec,
            logical_process_axis,
        })
    }

    pub fn comm_pattern(&self) -> CollectiveCommPattern {
        self.comm_pattern
    }

    pub fn sharding_spec(&self) -> &ShardingSpec {
        &self.sharding_spec
    }

    pub fn logical_process_axis(&self) -> usize {
        self.logical_process_axis
    }

    /// Number of devices taking part in each collective group.
    pub fn group_size(&self) -> usize {
        self.sharding_spec
            .device_mesh()
            .axis_size(self.logical_process_axis)
            .unwrap_or(1)
    }

    /// Estimated number of elements each device sends.
    ///
    /// Ring algorithms over a group of `n` devices, each holding `E`
    /// elements of the layout:
    ///
    /// ```text
    /// all-reduce   2 (n - 1) / n * E
    /// all-gather   (n - 1) * E
    /// all-to-all   (n - 1) / n * E
    /// split        0
    /// ```
    pub fn comm_volume(&self) -> f64 {
        let elements = self.sharding_spec.sharded_shape_per_device().num_elements() as f64;
        let n = self.group_size() as f64;
        match self.comm_pattern {
            CollectiveCommPattern::AllReduceFwdIdentityBwd
            | CollectiveCommPattern::IdentityFwdAllReduceBwd => 2.0 * (n - 1.0) / n * elements,
            CollectiveCommPattern::GatherFwdSplitBwd
            | CollectiveCommPattern::MixGatherFwdSplitBwd => (n - 1.0) * elements,
            CollectiveCommPattern::AllToAllFwdAllToAllBwd => (n - 1.0) / n * elements,
            CollectiveCommPattern::SplitFwdGatherBwd => 0.0,
        }
    }

    /// Returns the groups of physical device ids that run this collective.
    pub fn participants(&self) -> Result<Vec<Vec<usize>>, LayoutError> {
        self.sharding_spec
            .device_mesh()
            .process_groups(self.logical_process_axis)
    }
}

impl fmt::Display for CommSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} on axis {} over {}",
            self.comm_pattern, self.logical_process_axis, self.sharding_spec
        )
    }
}
