// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Sharding strategies: the output of a strategy generator.
//!
//! A [`ShardingStrategy`] is one candidate layout assignment for an
//! operation, together with the collectives it needs and three cost
//! accumulators. It is the contract between a generator and the solver.

use crate::operation::{OperandKeyed, OperationData};
use std::iter::Sum;
use std::ops::{Add, AddAssign};
use tensor_layout::{CommSpec, ShardingSpec};

/// A forward / backward pair of costs for one training iteration.
///
/// Forms a monoid under component-wise addition with `default()` as the
/// identity.
#[derive(Debug, Clone, Copy, PartialEq, Default, serde::Serialize, serde::Deserialize)]
pub struct TrainCycleItem {
    pub fwd: f64,
    pub bwd: f64,
}

impl TrainCycleItem {
    pub fn new(fwd: f64, bwd: f64) -> Self {
        Self { fwd, bwd }
    }

    /// Forward plus backward.
    pub fn total(&self) -> f64 {
        self.fwd + self.bwd
    }
}

impl Add for TrainCycleItem {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self {
            fwd: self.fwd + rhs.fwd,
            bwd: self.bwd + rhs.bwd,
        }
    }
}

impl AddAssign for TrainCycleItem {
    fn add_assign(&mut self, rhs: Self) {
        self.fwd += rhs.fwd;
        self.bwd += rhs.bwd;
    }
}

impl Sum for TrainCycleItem {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::default(), Add::add)
    }
}

/// One fully specified candidate for an operation.
///
/// Created with zero costs by a generator, then passed by value through
/// the communication, compute and memory cost phases before it is
/// returned to the caller.
#[derive(Debug, Clone, PartialEq)]
pub struct ShardingStrategy {
    /// Name, unique among the strategies of one `generate()` call.
    pub name: String,
    /// Layout chosen for every operand.
    pub sharding_specs: OperandKeyed<ShardingSpec>,
    /// Collectives required per operand. Empty when none are needed.
    pub communication_actions: OperandKeyed<CommSpec>,
    /// Bytes communicated.
    pub communication_cost: TrainCycleItem,
    /// Per-device floating-point operations.
    pub compute_cost: TrainCycleItem,
    /// Per-device bytes resident.
    pub memory_cost: TrainCycleItem,
}

impl ShardingStrategy {
    /// Creates a strategy with zeroed cost accumulators.
    pub fn new(
        name: String,
        sharding_specs: OperandKeyed<ShardingSpec>,
        communication_actions: OperandKeyed<CommSpec>,
    ) -> Self {
        Self {
            name,
            sharding_specs,
            communication_actions,
            communication_cost: TrainCycleItem::default(),
            compute_cost: TrainCycleItem::default(),
            memory_cost: TrainCycleItem::default(),
        }
    }

    /// Looks up the operand descriptor with the given name.
    pub fn operand(&self, name: &str) -> Option<&OperationData> {
        self.sharding_specs.keys().find(|op| op.name == name)
    }

    /// Returns the layout of the named operand.
    pub fn sharding_spec(&self, name: &str) -> Option<&ShardingSpec> {
        self.sharding_specs
            .iter()
            .find(|(op, _)| op.name == name)
            .map(|(_, spec)| spec)
    }

    /// Returns the collective attached to the named operand, if any.
    pub fn communication_action(&self, name: &str) -> Option<&CommSpec> {
        self.communication_actions
            .iter()
            .find(|(op, _)| op.name == name)
            .map(|(_, comm)| comm)
    }

    /// Communication plus compute, forward plus backward.
    ///
    /// Memory is a constraint rather than a time cost and is left out.
    pub fn total_cost(&self) -> f64 {
        self.communication_cost.total() + self.compute_cost.total()
    }

    /// Returns a one-line human-readable summary.
    pub fn summary(&self) -> String {
        format!(
            "'{}': comm {:.0}/{:.0} B, compute {:.0}/{:.0} FLOPs, memory {:.0}/{:.0} B (fwd/bwd), {} comm actions",
            self.name,
            self.communication_cost.fwd,
            self.communication_cost.bwd,
            self.compute_cost.fwd,
            self.compute_cost.bwd,
            self.memory_cost.fwd,
            self.memory_cost.bwd,
            self.communication_actions.len(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operation::OperationDataType;
    use tensor_layout::{CollectiveCommPattern, DType, DeviceMesh, Shape};

    fn sample_strategy() -> ShardingStrategy {
        let mesh = DeviceMesh::from_shape(vec![2]).unwrap();
        let op = OperationData::new("input", OperationDataType::Input, vec![4, 4], DType::F32);
        let spec = ShardingSpec::replicated(mesh, Shape::matrix(4, 4));
        let comm =
            CommSpec::new(CollectiveCommPattern::IdentityFwdAllReduceBwd, spec.clone(), 0).unwrap();
        ShardingStrategy::new(
            "RR".into(),
            [(op.clone(), spec)].into_iter().collect(),
            [(op, comm)].into_iter().collect(),
        )
    }

    #[test]
    fn test_train_cycle_item_monoid() {
        let a = TrainCycleItem::new(1.0, 2.0);
        let b = TrainCycleItem::new(3.0, 4.0);
        assert_eq!(a + b, TrainCycleItem::new(4.0, 6.0));
        assert_eq!(a + TrainCycleItem::default(), a);

        let mut c = a;
        c += b;
        assert_eq!(c.total(), 10.0);

        let sum: TrainCycleItem = vec![a, b, a].into_iter().sum();
        assert_eq!(sum, TrainCycleItem::new(5.0, 8.0));
    }

    #[test]
    fn test_new_has_zero_costs() {
        let s = sample_strategy();
        assert_eq!(s.communication_cost, TrainCycleItem::default());
        assert_eq!(s.compute_cost, TrainCycleItem::default());
        assert_eq!(s.memory_cost, TrainCycleItem::default());
        assert_eq!(s.total_cost(), 0.0);
    }

    #[test]
    fn test_lookup_by_name() {
        let s = sample_strategy();
        assert_eq!(s.operand("input").map(|op| op.dtype), Some(DType::F32));
        assert!(s.sharding_spec("input").is_some());
        assert!(s.communication_action("input").is_some());
        assert!(s.sharding_spec("other").is_none());
    }

    #[test]
    fn test_summary() {
        let mut s = sample_strategy();
        s.compute_cost = TrainCycleItem::new(64.0, 128.0);
        let text = s.summary();
        assert!(text.contains("'RR'"));
        assert!(text.contains("64/128 FLOPs"));
        assert!(text.contains("1 comm actions"));
    }
}
