// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Sharding specs: how one tensor is laid out over a device mesh.
//!
//! A [`ShardingSpec`] maps tensor dimensions to the mesh axes that split
//! them. Every unmapped dimension is replicated. The notation used in
//! strategy names and `Display` output is one token per dimension:
//!
//! ```text
//! R     replicated
//! S0    split along mesh axis 0
//! S01   split along mesh axes 0 and 1 (axis 0 outermost)
//! ```

use crate::{DeviceMesh, LayoutError, Shape};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Tensor dimension index → ordered mesh axes splitting that dimension.
pub type DimPartition = BTreeMap<usize, Vec<usize>>;

/// The layout of one tensor over a [`DeviceMesh`].
///
/// Constructed only through [`ShardingSpec::new`], which checks that
/// every axis exists, no axis is used twice, and each sharded dimension
/// divides evenly. The per-device shape is derived once at construction.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct ShardingSpec {
    device_mesh: DeviceMesh,
    entire_shape: Shape,
    dim_partition: DimPartition,
    sharded_shape: Shape,
}

impl ShardingSpec {
    /// Builds and validates a sharding spec.
    ///
    /// Entries with an empty axis list are treated as replicated and dropped.
    pub fn new(
        device_mesh: DeviceMesh,
        entire_shape: Shape,
        dim_partition: DimPartition,
    ) -> Result<Self, LayoutError> {
        let dim_partition: DimPartition = dim_partition
            .into_iter()
            .filter(|(_, axes)| !axes.is_empty())
            .collect();

        let mut seen = BTreeSet::new();
        let mut sharded = entire_shape.dims().to_vec();
        for (&dim, axes) in &dim_partition {
            let size = entire_shape.dim(dim).ok_or(LayoutError::DimOutOfRange {
                dim,
                rank: entire_shape.rank(),
            })?;

            let mut shards = 1;
            for &axis in axes {
                let axis_size = device_mesh.axis_size(axis).ok_or(LayoutError::AxisOutOfRange {
                    axis,
                    mesh_rank: device_mesh.rank(),
                })?;
                if !seen.insert(axis) {
                    return Err(LayoutError::DuplicateAxis { axis });
                }
                shards *= axis_size;
            }

            if size % shards != 0 {
                return Err(LayoutError::NonDivisibleShard { dim, size, shards });
            }
            sharded[dim] = size / shards;
        }

        Ok(Self {
            device_mesh,
            entire_shape,
            dim_partition,
            sharded_shape: Shape::new(sharded),
        })
    }

    /// Builds a fully replicated spec.
    pub fn replicated(device_mesh: DeviceMesh, entire_shape: Shape) -> Self {
        Self {
            device_mesh,
            sharded_shape: entire_shape.clone(),
            entire_shape,
            dim_partition: DimPartition::new(),
        }
    }

    pub fn device_mesh(&self) -> &DeviceMesh {
        &self.device_mesh
    }

    pub fn entire_shape(&self) -> &Shape {
        &self.entire_shape
    }

    pub fn dim_partition(&self) -> &DimPartition {
        &self.dim_partition
    }

    /// Returns the shape each device holds.
    pub fn sharded_shape_per_device(&self) -> &Shape {
        &self.sharded_shape
    }

    /// Returns how many pieces dimension `dim` is split into (1 if replicated).
    pub fn num_shards(&self, dim: usize) -> usize {
        self.dim_partition
            .get(&dim)
            .map(|axes| {
                axes.iter()
                    .filter_map(|&a| self.device_mesh.axis_size(a))
                    .product()
            })
            .unwrap_or(1)
    }

    /// Returns `true` if no dimension is split.
    pub fn is_replicated(&self) -> bool {
        self.dim_partition.is_empty()
    }

    /// Renders one `R` / `S<axes>` token per dimension.
    pub fn sharding_sequence(&self) -> Vec<String> {
        (0..self.entire_shape.rank())
            .map(|dim| match self.dim_partition.get(&dim) {
                Some(axes) => {
                    let mut token = String::from("S");
                    for axis in axes {
                        token.push_str(&axis.to_string());
                    }
                    token
                }
                None => "R".to_string(),
            })
            .collect()
    }

    /// Rewrites this spec onto the flattened form of its mesh.
    ///
    /// `axes` are the mesh axes the caller wants to act on together; they
    /// must be distinct and in range. The whole mesh collapses into one
    /// axis holding every device, whatever its rank. A dimension split
    /// over every mesh axis is remapped to the flattened axis 0, so the
    /// per-device shape is unchanged. A dimension split over only some
    /// mesh axes has no equivalent and fails with
    /// [`LayoutError::PartialFlatten`].
    pub fn flattened(&self, axes: &[usize]) -> Result<Self, LayoutError> {
        let rank = self.device_mesh.rank();
        let mut requested = BTreeSet::new();
        for &axis in axes {
            if axis >= rank {
                return Err(LayoutError::AxisOutOfRange {
                    axis,
                    mesh_rank: rank,
                });
            }
            if !requested.insert(axis) {
                return Err(LayoutError::DuplicateAxis { axis });
            }
        }

        let every_axis: BTreeSet<usize> = (0..rank).collect();
        let mut dim_partition = DimPartition::new();
        for (&dim, dim_axes) in &self.dim_partition {
            let used: BTreeSet<usize> = dim_axes.iter().copied().collect();
            if used != every_axis {
                return Err(LayoutError::PartialFlatten { dim });
            }
            dim_partition.insert(dim, vec![0]);
        }

        Ok(Self {
            device_mesh: self.device_mesh.flatten(),
            entire_shape: self.entire_shape.clone(),
            dim_partition,
            sharded_shape: self.sharded_shape.clone(),
        })
    }
}

impl fmt::Display for ShardingSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", self.sharding_sequence().join(", "))
    }
}
