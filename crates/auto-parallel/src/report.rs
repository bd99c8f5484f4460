// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Serialisable view of generated strategies.

use crate::AutoParallelError;
use std::collections::BTreeMap;
use strategy_generator::{OperatorKind, ShardingStrategy, TrainCycleItem};
use tensor_layout::{CollectiveCommPattern, DeviceMesh};

/// Every strategy generated for one operation.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct StrategyReport {
    pub operator: OperatorKind,
    pub mesh_shape: Vec<usize>,
    pub strategies: Vec<StrategyEntry>,
}

/// One priced strategy, with layouts rendered as sharding sequences.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct StrategyEntry {
    pub name: String,
    /// Operand name → sharding sequence, e.g. `"[S0, R]"`.
    pub sharding_specs: BTreeMap<String, String>,
    pub communication_actions: Vec<CommAction>,
    pub communication_cost: TrainCycleItem,
    pub compute_cost: TrainCycleItem,
    pub memory_cost: TrainCycleItem,
}

/// A collective attached to one operand.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct CommAction {
    pub operand: String,
    pub pattern: CollectiveCommPattern,
    pub logical_process_axis: usize,
    pub group_size: usize,
}

impl StrategyEntry {
    /// Communication plus compute, forward plus backward.
    pub fn total_cost(&self) -> f64 {
        self.communication_cost.total() + self.compute_cost.total()
    }
}

impl From<&ShardingStrategy> for StrategyEntry {
    fn from(strategy: &ShardingStrategy) -> Self {
        Self {
            name: strategy.name.clone(),
            sharding_specs: strategy
                .sharding_specs
                .iter()
                .map(|(op, spec)| (op.name.clone(), spec.to_string()))
                .collect(),
            communication_actions: strategy
                .communication_actions
                .iter()
                .map(|(op, comm)| CommAction {
                    operand: op.name.clone(),
                    pattern: comm.comm_pattern(),
                    logical_process_axis: comm.logical_process_axis(),
                    group_size: comm.group_size(),
                })
                .collect(),
            communication_cost: strategy.communication_cost,
            compute_cost: strategy.compute_cost,
            memory_cost: strategy.memory_cost,
        }
    }
}

impl StrategyReport {
    pub fn new(operator: OperatorKind, mesh: &DeviceMesh, strategies: &[ShardingStrategy]) -> Self {
        Self {
            operator,
            mesh_shape: mesh.shape().to_vec(),
            strategies: strategies.iter().map(StrategyEntry::from).collect(),
        }
    }

    /// The entry with the lowest total cost; ties keep enumeration order.
    ///
    /// For display only. Choosing a strategy is the solver's job, which
    /// also weighs resharding between neighbouring operations.
    pub fn cheapest(&self) -> Option<&StrategyEntry> {
        self.strategies
            .iter()
            .min_by(|a, b| a.total_cost().total_cmp(&b.total_cost()))
    }

    pub fn to_json(&self) -> Result<String, AutoParallelError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self, AutoParallelError> {
        Ok(serde_json::from_str(json)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strategy_generator::{operand_mapping, OperationData, OperationDataType, OperatorGenerator, StrategyGenerator};
    use tensor_layout::DType;

    fn linear_report() -> StrategyReport {
        let operands = operand_mapping([
            OperationData::new("input", OperationDataType::Input, vec![8, 8], DType::F32),
            OperationData::new("other", OperationDataType::Parameter, vec![8, 8], DType::F32),
            OperationData::new("output", OperationDataType::Output, vec![8, 8], DType::F32),
        ]);
        let mesh = DeviceMesh::from_shape(vec![2, 2]).unwrap();
        let g = OperatorGenerator::new(OperatorKind::Linear, operands, mesh.clone());
        StrategyReport::new(OperatorKind::Linear, &mesh, &g.generate().unwrap())
    }

    #[test]
    fn test_entry_renders_layouts() {
        let report = linear_report();
        let entry = report
            .strategies
            .iter()
            .find(|e| e.name == "S0S1 = S0R x RS1")
            .unwrap();
        assert_eq!(entry.sharding_specs["input"], "[S0, R]");
        assert_eq!(entry.sharding_specs["other"], "[R, S1]");
        assert_eq!(entry.communication_actions.len(), 2);
        assert!(entry
            .communication_actions
            .iter()
            .all(|c| c.pattern == CollectiveCommPattern::IdentityFwdAllReduceBwd));
    }

    #[test]
    fn test_cheapest() {
        let report = linear_report();
        let cheapest = report.cheapest().unwrap();
        assert!(report
            .strategies
            .iter()
            .all(|e| cheapest.total_cost() <= e.total_cost()));

        let empty = StrategyReport {
            operator: OperatorKind::Linear,
            mesh_shape: vec![2],
            strategies: vec![],
        };
        assert!(empty.cheapest().is_none());
    }

    #[test]
    fn test_json_roundtrip() {
        let report = linear_report();
        let json = report.to_json().unwrap();
        assert!(json.contains("\"operator\": \"linear\""));
        assert_eq!(StrategyReport::from_json(&json).unwrap(), report);
    }
}
