// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Strategies for `output [] = input [n] · other [n]`.
//!
//! Both vectors must be split the same way; every split leaves a
//! partial scalar on each device that is all-reduced in forward.

use super::{assemble, operand_memory_cost, partition, seq, CommRequest, StrategyGenerator};
use crate::operation::OperandMapping;
use crate::{GeneratorError, ShardingStrategy, TrainCycleItem};
use tensor_layout::{
    CollectiveCommPattern::AllReduceFwdIdentityBwd, DeviceMesh, DimPartition, LogicalProcessAxis,
};

/// Generator for 1-D dot products.
#[derive(Debug, Clone)]
pub struct DotProductStrategyGenerator {
    op_data: OperandMapping,
    device_mesh: DeviceMesh,
}

impl DotProductStrategyGenerator {
    pub fn new(op_data: OperandMapping, device_mesh: DeviceMesh) -> Self {
        Self {
            op_data,
            device_mesh,
        }
    }

    fn build(
        &self,
        vector: DimPartition,
        comms: Vec<CommRequest>,
    ) -> Result<ShardingStrategy, GeneratorError> {
        assemble(
            self,
            vec![
                ("input", vector.clone()),
                ("other", vector),
                ("output", DimPartition::new()),
            ],
            comms,
            |specs| {
                format!(
                    "{} = {} dot {}",
                    seq(specs, "output"),
                    seq(specs, "input"),
                    seq(specs, "other"),
                )
            },
        )
    }

    fn split_one_dim(&self, axis: usize) -> Result<ShardingStrategy, GeneratorError> {
        self.build(
            partition(&[(0, &[axis])]),
            vec![CommRequest::new("output", AllReduceFwdIdentityBwd, axis)],
        )
    }

    fn split_one_dim_1d(&self, i: usize, j: usize) -> Result<ShardingStrategy, GeneratorError> {
        self.build(
            partition(&[(0, &[i, j])]),
            vec![CommRequest::new(
                "output",
                AllReduceFwdIdentityBwd,
                LogicalProcessAxis::Pair(i, j),
            )],
        )
    }

    fn non_split(&self) -> Result<ShardingStrategy, GeneratorError> {
        self.build(DimPartition::new(), vec![])
    }
}

impl StrategyGenerator for DotProductStrategyGenerator {
    fn name(&self) -> &str {
        "dot_product"
    }

    fn op_data(&self) -> &OperandMapping {
        &self.op_data
    }

    fn device_mesh(&self) -> &DeviceMesh {
        &self.device_mesh
    }

    fn validate(&self, operands: &OperandMapping) -> bool {
        let (Some(input), Some(other), Some(output)) = (
            operands.get("input"),
            operands.get("other"),
            operands.get("output"),
        ) else {
            return false;
        };
        input.logical_shape.rank() == 1
            && input.logical_shape == other.logical_shape
            && input.logical_shape.is_non_empty()
            && output.logical_shape.rank() == 0
    }

    fn enumerate_candidates(&self) -> Vec<Result<ShardingStrategy, GeneratorError>> {
        let mut candidates: Vec<_> = (0..self.device_mesh.rank())
            .map(|axis| self.split_one_dim(axis))
            .collect();
        if self.device_mesh.rank() == 2 {
            candidates.push(self.split_one_dim_1d(0, 1));
        }
        candidates.push(self.non_split());
        candidates
    }

    fn update_compute_cost(
        &self,
        mut strategy: ShardingStrategy,
    ) -> Result<ShardingStrategy, GeneratorError> {
        let fwd = self.sharded_shape(&strategy, "input")?.num_elements() as f64;
        strategy.compute_cost = TrainCycleItem::new(fwd, 2.0 * fwd);
        Ok(strategy)
    }

    fn update_memory_cost(
        &self,
        mut strategy: ShardingStrategy,
    ) -> Result<ShardingStrategy, GeneratorError> {
        strategy.memory_cost = operand_memory_cost(self, &strategy, &["input", "other"], "output")?;
        Ok(strategy)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::test_support::{mesh, operands};
    use crate::operation::OperationDataType::{Input, Output};

    fn generator(mesh_shape: &[usize]) -> DotProductStrategyGenerator {
        DotProductStrategyGenerator::new(
            operands(&[("input", Input, &[64]), ("other", Input, &[64]), ("output", Output, &[])]),
            mesh(mesh_shape),
        )
    }

    #[test]
    fn test_validate() {
        let g = generator(&[2]);
        assert!(g.validate(g.op_data()));

        let wrong = operands(&[("input", Input, &[64]), ("other", Input, &[32]), ("output", Output, &[])]);
        assert!(!g.validate(&wrong));
    }

    #[test]
    fn test_generate() {
        let strategies = generator(&[2, 4]).generate().unwrap();
        let names: Vec<&str> = strategies.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(
            names,
            vec!["R = S0 dot S0", "R = S1 dot S1", "R = S01 dot S01", "R = R dot R"]
        );
    }

    #[test]
    fn test_costs() {
        let strategies = generator(&[4]).generate().unwrap();
        let split = &strategies[0];
        // 16 multiply-adds per device.
        assert_eq!(split.compute_cost, TrainCycleItem::new(16.0, 32.0));
        // Scalar all-reduce over 4 devices: 2 * 3/4 * 1 element * 4 bytes.
        assert!((split.communication_cost.fwd - 6.0).abs() < 1e-9);
        // 16 + 16 + 1 elements forward, 16 + 16 backward, f32.
        assert_eq!(split.memory_cost, TrainCycleItem::new(132.0, 128.0));
    }
}
