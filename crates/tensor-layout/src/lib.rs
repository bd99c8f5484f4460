// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # tensor-layout
//!
//! Layout primitives for sharding tensors across a grid of devices.
//!
//! This crate provides:
//! - [`DType`]: element data types and their byte widths.
//! - [`Shape`]: logical tensor shapes.
//! - [`DeviceMesh`]: a multi-axis arrangement of devices, with
//!   flattening and per-axis process groups.
//! - [`ShardingSpec`]: which mesh axes split which tensor dimensions,
//!   and the resulting per-device shape.
//! - [`CommSpec`]: a collective communication action on a layout.
//!
//! Everything here is pure data: no I/O, no communication.
//!
//! # Example
//! ```
//! use tensor_layout::{DeviceMesh, DimPartition, Shape, ShardingSpec};
//!
//! let mesh = DeviceMesh::from_shape(vec![2, 4]).unwrap();
//! let partition: DimPartition = [(0, vec![0]), (1, vec![1])].into_iter().collect();
//! let spec = ShardingSpec::new(mesh, Shape::matrix(8, 16), partition).unwrap();
//! assert_eq!(spec.sharded_shape_per_device(), &Shape::matrix(4, 4));
//! assert_eq!(spec.to_string(), "[S0, S1]");
//! ```

mod comm_spec;
mod dtype;
mod error;
mod mesh;
mod shape;
mod sharding_spec;

pub use comm_spec::{CollectiveCommPattern, CommSpec, LogicalProcessAxis};
pub use dtype::DType;
pub use error::LayoutError;
pub use mesh::DeviceMesh;
pub use shape::Shape;
pub use sharding_spec::{DimPartition, ShardingSpec};
