// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Strategies for `output [b, m, n] = input [b, m, k] x other [b, k, n]`.
//!
//! Every candidate except the unsharded one splits the batch dimension;
//! with a spare mesh axis it additionally splits `m`, `n` or `k`.

use super::{assemble, axis_pairs, operand_memory_cost, partition, seq, CommRequest, StrategyGenerator};
use crate::operation::OperandMapping;
use crate::{GeneratorError, ShardingStrategy, TrainCycleItem};
use tensor_layout::{
    CollectiveCommPattern::{AllReduceFwdIdentityBwd, IdentityFwdAllReduceBwd},
    DeviceMesh, DimPartition,
};

/// Generator for batched matrix multiplications.
#[derive(Debug, Clone)]
pub struct BatchedMatMulStrategyGenerator {
    op_data: OperandMapping,
    device_mesh: DeviceMesh,
}

impl BatchedMatMulStrategyGenerator {
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

    fn split_one_batch_dim(&self, i: usize) -> Result<ShardingStrategy, GeneratorError> {
        let batch = partition(&[(0, &[i])]);
        self.build(batch.clone(), batch.clone(), batch, vec![])
    }

    fn split_two_batch_dim(&self, i: usize, j: usize) -> Result<ShardingStrategy, GeneratorError> {
        let batch = partition(&[(0, &[i, j])]);
        self.build(batch.clone(), batch.clone(), batch, vec![])
    }

    fn split_batch_dim_lhs_space(&self, i: usize, j: usize) -> Result<ShardingStrategy, GeneratorError> {
        self.build(
            partition(&[(0, &[i]), (1, &[j])]),
            partition(&[(0, &[i])]),
            partition(&[(0, &[i]), (1, &[j])]),
            vec![CommRequest::new("other", IdentityFwdAllReduceBwd, j)],
        )
    }

    fn split_batch_dim_rhs_space(&self, i: usize, j: usize) -> Result<ShardingStrategy, GeneratorError> {
        self.build(
            partition(&[(0, &[i])]),
            partition(&[(0, &[i]), (2, &[j])]),
            partition(&[(0, &[i]), (2, &[j])]),
            vec![CommRequest::new("input", IdentityFwdAllReduceBwd, j)],
        )
    }

    fn split_batch_dim_both_contract(&self, i: usize, j: usize) -> Result<ShardingStrategy, GeneratorError> {
        self.build(
            partition(&[(0, &[i]), (2, &[j])]),
            partition(&[(0, &[i]), (1, &[j])]),
            partition(&[(0, &[i])]),
            vec![CommRequest::new("output", AllReduceFwdIdentityBwd, j)],
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

impl StrategyGenerator for BatchedMatMulStrategyGenerator {
    fn name(&self) -> &str {
        "batched_mat_mul"
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
        a.len() == 3
            && b.len() == 3
            && a[0] == b[0]
            && a[2] == b[1]
            && c == [a[0], a[1], b[2]]
            && input.logical_shape.is_non_empty()
            && other.logical_shape.is_non_empty()
    }

    fn enumerate_candidates(&self) -> Vec<Result<ShardingStrategy, GeneratorError>> {
        let mut candidates = Vec::new();
        for i in 0..self.device_mesh.rank() {
            candidates.push(self.split_one_batch_dim(i));
        }
        for (i, j) in axis_pairs(&self.device_mesh) {
            if i < j {
                candidates.push(self.split_two_batch_dim(i, j));
            }
            candidates.push(self.split_batch_dim_lhs_space(i, j));
            candidates.push(self.split_batch_dim_rhs_space(i, j));
            candidates.push(self.split_batch_dim_both_contract(i, j));
        }
        candidates.push(self.non_split());
        candidates
    }

    fn update_compute_cost(
        &self,
        mut strategy: ShardingStrategy,
    ) -> Result<ShardingStrategy, GeneratorError> {
        let input = self.sharded_shape(&strategy, "input")?.num_elements();
        let n = self.sharded_shape(&strategy, "other")?.dims()[2];
        let fwd = (input * n) as f64;
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

    fn generator(mesh_shape: &[usize], batch: usize) -> BatchedMatMulStrategyGenerator {
        let input = [batch, 8, 16];
        let other = [batch, 16, 4];
        let output = [batch, 8, 4];
        BatchedMatMulStrategyGenerator::new(
            operands(&[
                ("input", Input, &input),
                ("other", Input, &other),
                ("output", Output, &output),
            ]),
            mesh(mesh_shape),
        )
    }

    #[test]
    fn test_validate() {
        let g = generator(&[2], 4);
        assert!(g.validate(g.op_data()));
        let mismatched_batch = operands(&[
            ("input", Input, &[4, 8, 16]),
            ("other", Input, &[2, 16, 4]),
            ("output", Output, &[4, 8, 4]),
        ]);
        assert!(!g.validate(&mismatched_batch));
    }

    #[test]
    fn test_generate_2d_mesh() {
        let strategies = generator(&[2, 2], 4).generate().unwrap();
        // 2 single-axis batch splits, 1 two-axis batch split,
        // 3 per ordered axis pair, 1 unsharded.
        assert_eq!(strategies.len(), 2 + 1 + 6 + 1);
        assert!(strategies.iter().any(|s| s.name == "S01RR = S01RR x S01RR"));
    }

    #[test]
    fn test_batch_split_has_no_comm() {
        let strategies = generator(&[4], 8).generate().unwrap();
        let s = &strategies[0];
        assert_eq!(s.name, "S0RR = S0RR x S0RR");
        assert!(s.communication_actions.is_empty());
        // 2 * 8 * 16 * 4 per device.
        assert_eq!(s.compute_cost, TrainCycleItem::new(1024.0, 2048.0));
    }

    #[test]
    fn test_both_contract_reduces_output() {
        let strategies = generator(&[2, 2], 4).generate().unwrap();
        let s = strategies
            .iter()
            .find(|s| s.name == "S0RR = S0RS1 x S0S1R")
            .unwrap();
        let comm = s.communication_action("output").unwrap();
        assert_eq!(comm.comm_pattern(), AllReduceFwdIdentityBwd);
        assert_eq!(comm.logical_process_axis(), 1);
        // output [2, 8, 4] = 64 elements, group of 2: 64 elements * 4 bytes.
        assert!((s.communication_cost.fwd - 256.0).abs() < 1e-9);
    }

    #[test]
    fn test_indivisible_batch_skipped() {
        // batch 3 cannot split over 2 devices; only the unsharded candidate survives.
        let strategies = generator(&[2], 3).generate().unwrap();
        assert_eq!(strategies.len(), 1);
        assert_eq!(strategies[0].name, "RRR = RRR x RRR");
    }
}
