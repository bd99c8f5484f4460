// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Strategies for `output [m, n] = input [m, k] x other [k, n] (+ bias [n])`.
//!
//! Candidates, written `output = input x other` with `i`, `j` standing
//! for distinct mesh axes:
//!
//! | Candidate | Layouts | Collectives |
//! |---|---|---|
//! | lhs space, rhs space | `SiSj = SiR x RSj` | input: all-reduce bwd on `j`; other: all-reduce bwd on `i` |
//! | lhs space, both contract | `SiR = SiSj x SjR` | output: all-reduce fwd on `j`; other: all-reduce bwd on `i` |
//! | rhs space, both contract | `RSj = RSi x SiSj` | output: all-reduce fwd on `i`; input: all-reduce bwd on `j` |
//! | recompute contract | `RR = RSi x SiR` | output: all-reduce fwd on `i` |
//! | rhs space only | `RSi = RR x RSi` | input: all-reduce bwd on `i` |
//! | lhs space only | `SiR = SiR x RR` | other: all-reduce bwd on `i` |
//! | 1-d lhs 1st dim | `S01R = S01R x RR` | other: all-reduce bwd on flattened mesh |
//! | 1-d lhs 2nd dim | `RR = RS01 x S01R` | output: all-reduce fwd on flattened mesh |
//! | 1-d rhs 2nd dim | `RS01 = RR x RS01` | input: all-reduce bwd on flattened mesh |
//! | unsharded | `RR = RR x RR` | none |
//!
//! The 1-d candidates need a 2-axis mesh. A bias follows the last
//! dimension of the output and shares the collective of `other`.

use super::{assemble, axis_pairs, operand_memory_cost, partition, seq, CommRequest, StrategyGenerator};
use crate::operation::OperandMapping;
use crate::{GeneratorError, ShardingStrategy, TrainCycleItem};
use tensor_layout::{
    CollectiveCommPattern::{AllReduceFwdIdentityBwd, IdentityFwdAllReduceBwd},
    DeviceMesh, DimPartition, LogicalProcessAxis,
};

/// Generator for linear layers and 2-D matrix multiplications.
#[derive(Debug, Clone)]
pub struct LinearStrategyGenerator {
    op_data: OperandMapping,
    device_mesh: DeviceMesh,
}

impl LinearStrategyGenerator {
    pub fn new(op_data: OperandMapping, device_mesh: DeviceMesh) -> Self {
        Self {
            op_data,
            device_mesh,
        }
    }

    fn has_bias(&self) -> bool {
        self.op_data.contains_key("bias")
    }

    fn build(
        &self,
        input: DimPartition,
        other: DimPartition,
        output: DimPartition,
        mut comms: Vec<CommRequest>,
    ) -> Result<ShardingStrategy, GeneratorError> {
        let mut partitions = vec![("input", input), ("other", other)];
        if self.has_bias() {
            let bias: DimPartition = output
                .get(&1)
                .map(|axes| [(0, axes.clone())].into_iter().collect())
                .unwrap_or_default();
            partitions.push(("bias", bias));

            let mirrored: Vec<CommRequest> = comms
                .iter()
                .filter(|c| c.operand == "other")
                .map(|c| CommRequest::new("bias", c.pattern, c.axis))
                .collect();
            comms.extend(mirrored);
        }
        partitions.push(("output", output));

        assemble(self, partitions, comms, |specs| {
            format!(
                "{} = {} x {}",
                seq(specs, "output"),
                seq(specs, "input"),
                seq(specs, "other"),
            )
        })
    }

    fn split_lhs_space_rhs_space(&self, i: usize, j: usize) -> Result<ShardingStrategy, GeneratorError> {
        self.build(
            partition(&[(0, &[i])]),
            partition(&[(1, &[j])]),
            partition(&[(0, &[i]), (1, &[j])]),
            vec![
                CommRequest::new("input", IdentityFwdAllReduceBwd, j),
                CommRequest::new("other", IdentityFwdAllReduceBwd, i),
            ],
        )
    }

    fn split_lhs_space_both_contract(&self, i: usize, j: usize) -> Result<ShardingStrategy, GeneratorError> {
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

    fn split_rhs_space_both_contract(&self, i: usize, j: usize) -> Result<ShardingStrategy, GeneratorError> {
        self.build(
            partition(&[(1, &[i])]),
            partition(&[(0, &[i]), (1, &[j])]),
            partition(&[(1, &[j])]),
            vec![
                CommRequest::new("output", AllReduceFwdIdentityBwd, i),
                CommRequest::new("input", IdentityFwdAllReduceBwd, j),
            ],
        )
    }

    fn recompute_split_both_contract(&self, i: usize) -> Result<ShardingStrategy, GeneratorError> {
        self.build(
            partition(&[(1, &[i])]),
            partition(&[(0, &[i])]),
            DimPartition::new(),
            vec![CommRequest::new("output", AllReduceFwdIdentityBwd, i)],
        )
    }

    fn split_rhs_space_only(&self, i: usize) -> Result<ShardingStrategy, GeneratorError> {
        self.build(
            DimPartition::new(),
            partition(&[(1, &[i])]),
            partition(&[(1, &[i])]),
            vec![CommRequest::new("input", IdentityFwdAllReduceBwd, i)],
        )
    }

    fn split_lhs_space_only(&self, i: usize) -> Result<ShardingStrategy, GeneratorError> {
        self.build(
            partition(&[(0, &[i])]),
            DimPartition::new(),
            partition(&[(0, &[i])]),
            vec![CommRequest::new("other", IdentityFwdAllReduceBwd, i)],
        )
    }

    fn split_lhs_1st_dim_1d(&self, i: usize, j: usize) -> Result<ShardingStrategy, GeneratorError> {
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

    fn split_lhs_2nd_dim_1d(&self, i: usize, j: usize) -> Result<ShardingStrategy, GeneratorError> {
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

    fn split_rhs_2nd_dim_1d(&self, i: usize, j: usize) -> Result<ShardingStrategy, GeneratorError> {
        self.build(
            DimPartition::new(),
            partition(&[(1, &[i, j])]),
            partition(&[(1, &[i, j])]),
            vec![CommRequest::new(
                "input",
                IdentityFwdAllReduceBwd,
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

impl StrategyGenerator for LinearStrategyGenerator {
    fn name(&self) -> &str {
        "linear"
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
        if a.len() != 2 || b.len() != 2 || c.len() != 2 {
            return false;
        }
        let bias_ok = operands
            .get("bias")
            .map_or(true, |bias| bias.logical_shape.dims() == [b[1]]);
        a[1] == b[0]
            && c == [a[0], b[1]]
            && bias_ok
            && [input, other, output]
                .iter()
                .all(|op| op.logical_shape.is_non_empty())
    }

    fn enumerate_candidates(&self) -> Vec<Result<ShardingStrategy, GeneratorError>> {
        let mut candidates = Vec::new();
        for (i, j) in axis_pairs(&self.device_mesh) {
            candidates.push(self.split_lhs_space_rhs_space(i, j));
            candidates.push(self.split_lhs_space_both_contract(i, j));
            candidates.push(self.split_rhs_space_both_contract(i, j));
        }
        for i in 0..self.device_mesh.rank() {
            candidates.push(self.recompute_split_both_contract(i));
            candidates.push(self.split_rhs_space_only(i));
            candidates.push(self.split_lhs_space_only(i));
        }
        if self.device_mesh.rank() == 2 {
            candidates.push(self.split_lhs_1st_dim_1d(0, 1));
            candidates.push(self.split_lhs_2nd_dim_1d(0, 1));
            candidates.push(self.split_rhs_2nd_dim_1d(0, 1));
        }
        candidates.push(self.non_split());
        candidates
    }

    fn update_compute_cost(
        &self,
        mut strategy: ShardingStrategy,
    ) -> Result<ShardingStrategy, GeneratorError> {
        let input = self.sharded_shape(&strategy, "input")?.dims();
        let other = self.sharded_shape(&strategy, "other")?.dims();
        let fwd = (input[0] * input[1] * other[1]) as f64;
        strategy.compute_cost = TrainCycleItem::new(fwd, 2.0 * fwd);
        Ok(strategy)
    }

    fn update_memory_cost(
        &self,
        mut strategy: ShardingStrategy,
    ) -> Result<ShardingStrategy, GeneratorError> {
        let inputs: &[&str] = if self.has_bias() {
            &["input", "other", "bias"]
        } else {
            &["input", "other"]
        };
        strategy.memory_cost = operand_memory_cost(self, &strategy, inputs, "output")?;
        Ok(strategy)
    }
}
