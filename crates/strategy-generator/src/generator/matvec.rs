// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Strategies for `output [m] = input [m, k] x other [k]`.

use super::{assemble, axis_pairs, operand_memory_cost, partition, seq, CommRequest, StrategyGenerator};
use crate::operation::OperandMapping;
use crate::{GeneratorError, ShardingStrategy, TrainCycleItem};
use tensor_layout::{
    CollectiveCommPattern::{AllReduceFwdIdentityBwd, IdentityFwdAllReduceBwd},
    DeviceMesh, DimPartition, LogicalProcessAxis,
};

/// Generator for matrix-vector products.
#[derive(Debug, Clone)]
pub struct MatVecStrategyGenerator {
    op_data: OperandMapping,
    device_mesh: DeviceMesh,
}

impl MatVecStrategyGenerator {
    pub fn new(op_data: OperandMapping, device_mesh: DeviceMesh) -> Self {
        Self {
            op_data,
            device_mesh,
        }
    }

    fn build(
        &self,
        input: DimPartition,
        other: DimPartition,
        output: DimPartition,
        comms: Vec<CommRequest>,
    ) -> Result<ShardingStrategy, GeneratorError> {
        assemble(
            self,
            vec![("input", input), ("other", other), ("output", output)],
            comms,
            |specs| {
                format!(
                    "{} = {} x {}",
                    seq(specs, "output"),
                    seq(specs, "input"),
                    seq(specs, "other"),
                )
            },
        )
    }

    // S0 = S0R x R
    fn split_lhs_space(&self, i: usize) -> Result<ShardingStrategy, GeneratorError> {
        self.build(
            partition(&[(0, &[i])]),
            DimPartition::new(),
            partition(&[(0, &[i])]),
            vec![CommRequest::new("other", IdentityFwdAllReduceBwd, i)],
        )
    }

    // R = RS0 x S0
    fn split_contract(&self, i: usize) -> Result<ShardingStrategy, GeneratorError> {
        self.build(
            partition(&[(1, &[i])]),
            partition(&[(0, &[i])]),
            DimPartition::new(),
            vec![CommRequest::new("output", AllReduceFwdIdentityBwd, i)],
        )
    }

    // S0 = S0S1 x S1
    fn split_lhs_space_and_contract(&self, i: usize, j: usize) -> Result<ShardingStrategy, GeneratorError> {
        self.build(
            partition(&[(0, &[i]), (1, &[j])]),
            partition(&[(0, &[j])]),
            partition(&[(0, &[i])]),
            vec![
                CommRequest::new("output", AllReduceFwdIdentityBwd, j),
                CommRequest::new("other", IdentityFwdAllReduceBwd, i),
            ],
        )
    }

    fn split_lhs_space_1d(&self, i: usize, j: usize) -> Result<ShardingStrategy, GeneratorError> {
        self.build(
            partition(&[(0, &[i, j])]),
            DimPartition::new(),
            partition(&[(0, &[i, j])]),
            vec![CommRequest::new(
                "other",
                IdentityFwdAllReduceBwd,
                LogicalProcessAxis::Pair(i, j),
            )],
        )
    }

    fn split_contract_1d(&self, i: usize, j: usize) -> Result<ShardingStrategy, GeneratorError> {
        self.build(
            partition(&[(1, &[i, j])]),
            partition(&[(0, &[i, j])]),
            DimPartition::new(),
            vec![CommRequest::new(
                "output",
                AllReduceFwdIdentityBwd,
                LogicalProcessAxis::Pair(i, j),
            )],
        )
    }

    fn non_split(&self) -> Result<ShardingStrategy, GeneratorError> {
        self.build(
            DimPartition::new(),
            DimPartition::new(),
            DimPartition::new(),
            vec![],
        )
    }
}

impl StrategyGenerator for MatVecStrategyGenerator {
    fn name(&self) -> &str {
        "mat_vec"
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
        let (a, b, c) = (
            input.logical_shape.dims(),
            other.logical_shape.dims(),
            output.logical_shape.dims(),
        );
        a.len() == 2 && b == [a[1]] && c == [a[0]] && input.logical_shape.is_non_empty()
    }

    fn enumerate_candidates(&self) -> Vec<Result<ShardingStrategy, GeneratorError>> {
        let mut candidates = Vec::new();
        for i in 0..self.device_mesh.rank() {
            candidates.push(self.split_lhs_space(i));
            candidates.push(self.split_contract(i));
        }
        for (i, j) in axis_pairs(&self.device_mesh) {
            candidates.push(self.split_lhs_space_and_contract(i, j));
        }
        if self.device_mesh.rank() == 2 {
            candidates.push(self.split_lhs_space_1d(0, 1));
            candidates.push(self.split_contract_1d(0, 1));
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
