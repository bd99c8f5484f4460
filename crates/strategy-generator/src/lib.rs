// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # strategy-generator
//!
//! Enumerates the ways one operation can be sharded across a device mesh
//! and prices each one.
//!
//! # Operators
//!
//! | Operator | Operands | Candidates on a 2-D mesh |
//! |---|---|---|
//! | [`DotProductStrategyGenerator`] | `[n] · [n] -> []` | per-axis, flattened, unsharded |
//! | [`MatVecStrategyGenerator`] | `[m, k] x [k] -> [m]` | space, contraction, both, flattened |
//! | [`LinearStrategyGenerator`] | `[m, k] x [k, n] (+ [n]) -> [m, n]` | 2-D space/contraction mixes, 1-D, flattened |
//! | [`BatchedMatMulStrategyGenerator`] | `[b, m, k] x [b, k, n] -> [b, m, n]` | batch split, optionally with one more dim |
//!
//! Every strategy carries three [`TrainCycleItem`] costs: communication
//! bytes, compute FLOPs and memory bytes, each split into a forward and a
//! backward figure.
//!
//! # Trait-Based Extensibility
//!
//! Operators implement [`StrategyGenerator`]. A variant supplies candidate
//! partitions and its compute/memory model; layout construction and
//! communication pricing come from default methods:
//!
//! ```ignore
//! impl StrategyGenerator for MyOp {
//!     fn name(&self) -> &str { "my_op" }
//!     fn op_data(&self) -> &OperandMapping { &self.op_data }
//!     fn device_mesh(&self) -> &DeviceMesh { &self.mesh }
//!     fn validate(&self, operands: &OperandMapping) -> bool { /* ... */ }
//!     fn enumerate_candidates(&self) -> Vec<Result<ShardingStrategy, GeneratorError>> { /* ... */ }
//!     fn update_compute_cost(&self, s: ShardingStrategy) -> Result<ShardingStrategy, GeneratorError> { /* ... */ }
//!     fn update_memory_cost(&self, s: ShardingStrategy) -> Result<ShardingStrategy, GeneratorError> { /* ... */ }
//! }
//! ```
//!
//! # Example
//! ```
//! use strategy_generator::{
//!     operand_mapping, OperationData, OperationDataType, OperatorGenerator, OperatorKind,
//!     StrategyGenerator,
//! };
//! use tensor_layout::{DType, DeviceMesh};
//!
//! let operands = operand_mapping([
//!     OperationData::new("input", OperationDataType::Input, vec![64], DType::F32),
//!     OperationData::new("other", OperationDataType::Input, vec![64], DType::F32),
//!     OperationData::new("output", OperationDataType::Output, Vec::<usize>::new(), DType::F32),
//! ]);
//! let mesh = DeviceMesh::from_shape(vec![4]).unwrap();
//! let generator = OperatorGenerator::new(OperatorKind::DotProduct, operands, mesh);
//!
//! assert!(generator.validate(generator.op_data()));
//! let strategies = generator.generate().unwrap();
//! assert_eq!(strategies[0].name, "R = S0 dot S0");
//! ```

mod error;
pub mod generator;
pub mod operation;
mod strategy;

pub use error::GeneratorError;
pub use generator::{
    BatchedMatMulStrategyGenerator, DotProductStrategyGenerator, LinearStrategyGenerator,
    MatVecStrategyGenerator, OperatorGenerator, OperatorKind, StrategyGenerator,
};
pub use operation::{
    operand_mapping, rekey_by_operand, NameMapping, OperandKeyed, OperandMapping, OperationData,
    OperationDataType,
};
pub use strategy::{ShardingStrategy, TrainCycleItem};
