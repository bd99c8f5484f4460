// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Logical device meshes.
//!
//! A [`DeviceMesh`] arranges a flat list of physical device ids into a
//! multi-axis grid. Ids are laid out in row-major order: the last axis
//! varies fastest.
//!
//! ```text
//! physical ids 0..8, mesh_shape [2, 4]
//!
//!          axis 1 →
//! axis 0   0 1 2 3
//!   ↓      4 5 6 7
//! ```

use crate::LayoutError;
use std::fmt;

/// A multi-axis arrangement of compute devices.
///
/// Deserialisation goes through [`DeviceMesh::new`], so a decoded mesh
/// upholds the same invariants as a constructed one.
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(try_from = "RawDeviceMesh")]
pub struct DeviceMesh {
    physical_ids: Vec<usize>,
    mesh_shape: Vec<usize>,
}

/// Unchecked wire form of a [`DeviceMesh`].
#[derive(serde::Deserialize)]
struct RawDeviceMesh {
    physical_ids: Vec<usize>,
    mesh_shape: Vec<usize>,
}

impl TryFrom<RawDeviceMesh> for DeviceMesh {
    type Error = LayoutError;

    fn try_from(raw: RawDeviceMesh) -> Result<Self, Self::Error> {
        DeviceMesh::new(raw.physical_ids, raw.mesh_shape)
    }
}

impl DeviceMesh {
    /// Creates a mesh over the given physical ids.
    ///
    /// Fails if the shape is empty, contains a zero-sized axis, or its
    /// product differs from the number of ids.
    pub fn new(physical_ids: Vec<usize>, mesh_shape: Vec<usize>) -> Result<Self, LayoutError> {
        if mesh_shape.is_empty() {
            return Err(LayoutError::InvalidMesh("mesh shape has no axes".into()));
        }
        if let Some(axis) = mesh_shape.iter().position(|&s| s == 0) {
            return Err(LayoutError::InvalidMesh(format!("axis {axis} has size 0")));
        }
        let expected: usize = mesh_shape.iter().product();
        if expected != physical_ids.len() {
            return Err(LayoutError::InvalidMesh(format!(
                "mesh shape {mesh_shape:?} needs {expected} devices, got {}",
                physical_ids.len()
            )));
        }
        Ok(Self {
            physical_ids,
            mesh_shape,
        })
    }

    /// Creates a mesh over devices `0..product(mesh_shape)`.
    pub fn from_shape(mesh_shape: Vec<usize>) -> Result<Self, LayoutError> {
        let n = mesh_shape.iter().product();
        Self::new((0..n).collect(), mesh_shape)
    }

    /// Returns the size of every axis.
    pub fn shape(&self) -> &[usize] {
        &self.mesh_shape
    }

    /// Returns the number of axes.
    pub fn rank(&self) -> usize {
        self.mesh_shape.len()
    }

    /// Returns the size of one axis, or `None` if it does not exist.
    pub fn axis_size(&self, axis: usize) -> Option<usize> {
        self.mesh_shape.get(axis).copied()
    }

    /// Returns the total number of devices.
    pub fn num_devices(&self) -> usize {
        self.physical_ids.len()
    }

    /// Returns the physical device ids in row-major order.
    pub fn physical_ids(&self) -> &[usize] {
        &self.physical_ids
    }

    /// Collapses every axis into a single one.
    ///
    /// The result has one axis whose size is the product of all axis
    /// sizes and the same physical ids. `self` is left untouched.
    pub fn flatten(&self) -> DeviceMesh {
        DeviceMesh {
            physical_ids: self.physical_ids.clone(),
            mesh_shape: vec![self.num_devices()],
        }
    }

    /// Returns the groups of physical ids that communicate along `axis`.
    ///
    /// Each group holds the devices whose coordinates agree on every
    /// other axis, ordered by their coordinate on `axis`.
    pub fn process_groups(&self, axis: usize) -> Result<Vec<Vec<usize>>, LayoutError> {
        let size = self.axis_size(axis).ok_or(LayoutError::AxisOutOfRange {
            axis,
            mesh_rank: self.rank(),
        })?;
        let stride: usize = self.mesh_shape[axis + 1..].iter().product();
        let outer = self.num_devices() / (size * stride);

        let mut groups = Vec::with_capacity(outer * stride);
        for o in 0..outer {
            for inner in 0..stride {
                let base = o * size * stride + inner;
                groups.push(
                    (0..size)
                        .map(|i| self.physical_ids[base + i * stride])
                        .collect(),
                );
            }
        }
        Ok(groups)
    }
}

impl fmt::Display for DeviceMesh {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let dims: Vec<String> = self.mesh_shape.iter().map(|d| d.to_string()).collect();
        write!(f, "DeviceMesh({}, {} devices)", dims.join("x"), self.num_devices())
    }
}
