// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Error types for layout construction.

/// Errors raised while building device meshes and sharding specs.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LayoutError {
    /// A sharded dimension does not divide evenly across its mesh axes.
    #[error("dimension {dim} of size {size} cannot be split evenly into {shards} shards")]
    NonDivisibleShard { dim: usize, size: usize, shards: usize },

    /// A dim partition references a mesh axis that does not exist.
    #[error("mesh axis {axis} out of range for a mesh of rank {mesh_rank}")]
    AxisOutOfRange { axis: usize, mesh_rank: usize },

    /// A dim partition references a tensor dimension that does not exist.
    #[error("tensor dimension {dim} out of range for rank {rank}")]
    DimOutOfRange { dim: usize, rank: usize },

    /// The same mesh axis shards more than one dimension (or one twice).
    #[error("mesh axis {axis} is used more than once in the dim partition")]
    DuplicateAxis { axis: usize },

    /// A dimension is sharded over part of an axis group being flattened.
    #[error("dimension {dim} is sharded over a strict subset of the flattened axes")]
    PartialFlatten { dim: usize },

    /// The mesh description itself is inconsistent.
    #[error("invalid device mesh: {0}")]
    InvalidMesh(String),
}
