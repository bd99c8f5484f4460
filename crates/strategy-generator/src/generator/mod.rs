// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! The [`StrategyGenerator`] trait and its operator variants.
//!
//! A variant only decides *which* dimension partitions are legal for its
//! operator and how to count FLOPs and memory. Turning partitions into
//! layouts, attaching collectives, pricing communication and sizing
//! operands are shared default methods.
//!
//! ```text
//! enumerate_candidates()          variant: dim partitions + collectives
//!   └─ to_sharding_spec_mapping   shared: names → ShardingSpec
//!   └─ get_communication_spec     shared: flatten axis pairs
//!   └─ get_sharding_strategy      shared: names → OperationData
//! update_communication_cost       shared
//! update_compute_cost             variant
//! update_memory_cost              variant
//! ```

pub mod batched_matmul;
pub mod dot_product;
pub mod linear;
pub mod matvec;

use crate::operation::{rekey_by_operand, NameMapping, OperandMapping};
use crate::{GeneratorError, ShardingStrategy, TrainCycleItem};
use tensor_layout::{
    CollectiveCommPattern, CommSpec, DeviceMesh, DimPartition, LogicalProcessAxis, Shape,
    ShardingSpec,
};

pub use batched_matmul::BatchedMatMulStrategyGenerator;
pub use dot_product::DotProductStrategyGenerator;
pub use linear::LinearStrategyGenerator;
pub use matvec::MatVecStrategyGenerator;

/// Enumerates and prices sharding strategies for one operation.
///
/// Implementations are pure: no I/O, no shared mutable state. One
/// instance covers one operation on one device mesh.
pub trait StrategyGenerator {
    /// Human-readable operator name.
    fn name(&self) -> &str;

    /// The operands this generator was built for.
    fn op_data(&self) -> &OperandMapping;

    /// The mesh strategies are generated for.
    fn device_mesh(&self) -> &DeviceMesh;

    /// Returns `true` if this variant applies to `operands`.
    ///
    /// Side-effect free. Must hold before [`StrategyGenerator::generate`]
    /// is called.
    fn validate(&self, operands: &OperandMapping) -> bool;

    /// Builds every candidate for this operator, unpriced.
    ///
    /// A candidate that fails because a dimension does not divide evenly
    /// is reported as an `Err` in place and skipped by `generate`.
    fn enumerate_candidates(&self) -> Vec<Result<ShardingStrategy, GeneratorError>>;

    /// Fills in per-device FLOPs.
    fn update_compute_cost(
        &self,
        strategy: ShardingStrategy,
    ) -> Result<ShardingStrategy, GeneratorError>;

    /// Fills in per-device bytes.
    fn update_memory_cost(
        &self,
        strategy: ShardingStrategy,
    ) -> Result<ShardingStrategy, GeneratorError>;

    /// Enumerates and prices every legal candidate.
    fn generate(&self) -> Result<Vec<ShardingStrategy>, GeneratorError> {
        let mut strategies = Vec::new();
        for candidate in self.enumerate_candidates() {
            let strategy = match candidate {
                Ok(strategy) => strategy,
                Err(e) if e.is_candidate_local() => {
                    tracing::debug!(op = self.name(), "skipping candidate: {e}");
                    continue;
                }
                Err(e) => return Err(e),
            };
            let strategy = self.update_communication_cost(strategy)?;
            let strategy = self.update_compute_cost(strategy)?;
            let strategy = self.update_memory_cost(strategy)?;
            tracing::debug!(op = self.name(), "{}", strategy.summary());
            strategies.push(strategy);
        }
        tracing::info!(
            op = self.name(),
            mesh = %self.device_mesh(),
            "generated {} strategies",
            strategies.len(),
        );
        Ok(strategies)
    }

    /// Builds a [`ShardingSpec`] for each named operand.
    fn to_sharding_spec_mapping(
        &self,
        mapping: NameMapping<DimPartition>,
    ) -> Result<NameMapping<ShardingSpec>, GeneratorError> {
        mapping
            .into_iter()
            .map(|(name, dim_partition)| -> Result<_, GeneratorError> {
                let op = self
                    .op_data()
                    .get(&name)
                    .ok_or_else(|| GeneratorError::UnknownOperand { name: name.clone() })?;
                let spec = ShardingSpec::new(
                    self.device_mesh().clone(),
                    op.logical_shape.clone(),
                    dim_partition,
                )?;
                Ok((name, spec))
            })
            .collect()
    }

    /// Assembles a named strategy with zeroed costs.
    fn get_sharding_strategy(
        &self,
        name: String,
        sharding_spec_mapping: NameMapping<ShardingSpec>,
        communication_action_mapping: NameMapping<CommSpec>,
    ) -> Result<ShardingStrategy, GeneratorError> {
        let sharding_specs = rekey_by_operand(self.op_data(), sharding_spec_mapping)?;
        let communication_actions = rekey_by_operand(self.op_data(), communication_action_mapping)?;
        Ok(ShardingStrategy::new(
            name,
            sharding_specs,
            communication_actions,
        ))
    }

    /// Builds a [`CommSpec`]; an axis pair runs on the flattened mesh.
    fn get_communication_spec(
        &self,
        sharding_spec: ShardingSpec,
        communication_pattern: CollectiveCommPattern,
        logical_process_axis: LogicalProcessAxis,
    ) -> Result<CommSpec, GeneratorError> {
        Ok(CommSpec::new(
            communication_pattern,
            sharding_spec,
            logical_process_axis,
        )?)
    }

    /// Prices every collective of `strategy` without modifying it.
    fn estimate_communication_cost(
        &self,
        strategy: &ShardingStrategy,
    ) -> Result<TrainCycleItem, GeneratorError> {
        let mut comm_cost = TrainCycleItem::default();
        for (operand, comm_spec) in &strategy.communication_actions {
            let cost = comm_spec.comm_volume() * operand.dtype.size_bytes() as f64;
            // Both all-reduce flavours are booked as forward cost.
            match comm_spec.comm_pattern() {
                CollectiveCommPattern::AllReduceFwdIdentityBwd
                | CollectiveCommPattern::IdentityFwdAllReduceBwd => comm_cost.fwd += cost,
                pattern => return Err(GeneratorError::UnsupportedCommPattern { pattern }),
            }
        }
        Ok(comm_cost)
    }

    /// Adds the communication cost of every collective to the strategy.
    ///
    /// Accumulates: calling it twice counts every action twice.
    fn update_communication_cost(
        &self,
        mut strategy: ShardingStrategy,
    ) -> Result<ShardingStrategy, GeneratorError> {
        let comm_cost = self.estimate_communication_cost(&strategy)?;
        strategy.communication_cost += comm_cost;
        Ok(strategy)
    }

    /// Returns the per-device shape of operand `key` under `strategy`.
    fn sharded_shape<'s>(
        &self,
        strategy: &'s ShardingStrategy,
        key: &str,
    ) -> Result<&'s Shape, GeneratorError> {
        let op = self
            .op_data()
            .get(key)
            .ok_or_else(|| GeneratorError::UnknownOperand { name: key.into() })?;
        strategy
            .sharding_specs
            .get(op)
            .map(ShardingSpec::sharded_shape_per_device)
            .ok_or_else(|| GeneratorError::MissingLayout {
                strategy: strategy.name.clone(),
                name: key.into(),
            })
    }

    /// Bytes one device holds of operand `key` under `strategy`.
    fn compute_size_in_bytes(
        &self,
        strategy: &ShardingStrategy,
        key: &str,
    ) -> Result<usize, GeneratorError> {
        let shape = self.sharded_shape(strategy, key)?;
        let dtype = self.op_data()[key].dtype;
        Ok(shape.num_elements() * dtype.size_bytes())
    }
}

/// The operators this crate can generate strategies for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperatorKind {
    /// `input [n] · other [n] -> output []`
    DotProduct,
    /// `input [m, k] x other [k] -> output [m]`
    MatVec,
    /// `input [m, k] x other [k, n] (+ bias [n]) -> output [m, n]`
    Linear,
    /// `input [b, m, k] x other [b, k, n] -> output [b, m, n]`
    BatchedMatMul,
}

impl OperatorKind {
    /// Parses an operator name.
    ///
    /// Accepts snake_case names and common aliases
    /// (`"dot"`, `"mv"`, `"mm"`, `"addmm"`, `"bmm"`).
    pub fn from_str_loose(s: &str) -> Option<Self> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "dot_product" | "dot" => Some(Self::DotProduct),
            "mat_vec" | "matvec" | "mv" => Some(Self::MatVec),
            "linear" | "mm" | "addmm" => Some(Self::Linear),
            "batched_mat_mul" | "batched_matmul" | "bmm" => Some(Self::BatchedMatMul),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DotProduct => "dot_product",
            Self::MatVec => "mat_vec",
            Self::Linear => "linear",
            Self::BatchedMatMul => "batched_mat_mul",
        }
    }
}

impl std::fmt::Display for OperatorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Closed set of generator variants, dispatched without a vtable.
#[derive(Debug, Clone)]
pub enum OperatorGenerator {
    DotProduct(DotProductStrategyGenerator),
    MatVec(MatVecStrategyGenerator),
    Linear(LinearStrategyGenerator),
    BatchedMatMul(BatchedMatMulStrategyGenerator),
}

impl OperatorGenerator {
    /// Creates the variant for `kind`.
    pub fn new(kind: OperatorKind, op_data: OperandMapping, device_mesh: DeviceMesh) -> Self {
        match kind {
            OperatorKind::DotProduct => {
                Self::DotProduct(DotProductStrategyGenerator::new(op_data, device_mesh))
            }
            OperatorKind::MatVec => Self::MatVec(MatVecStrategyGenerator::new(op_data, device_mesh)),
            OperatorKind::Linear => Self::Linear(LinearStrategyGenerator::new(op_data, device_mesh)),
            OperatorKind::BatchedMatMul => {
                Self::BatchedMatMul(BatchedMatMulStrategyGenerator::new(op_data, device_mesh))
            }
        }
    }

    pub fn kind(&self) -> OperatorKind {
        match self {
            Self::DotProduct(_) => OperatorKind::DotProduct,
            Self::MatVec(_) => OperatorKind::MatVec,
            Self::Linear(_) => OperatorKind::Linear,
            Self::BatchedMatMul(_) => OperatorKind::BatchedMatMul,
        }
    }
}

macro_rules! dispatch {
    ($self:ident, $g:ident => $body:expr) => {
        match $self {
            OperatorGenerator::DotProduct($g) => $body,
            OperatorGenerator::MatVec($g) => $body,
            OperatorGenerator::Linear($g) => $body,
            OperatorGenerator::BatchedMatMul($g) => $body,
        }
    };
}

impl StrategyGenerator for OperatorGenerator {
    fn name(&self) -> &str {
        dispatch!(self, g => g.name())
    }

    fn op_data(&self) -> &OperandMapping {
        dispatch!(self, g => g.op_data())
    }

    fn device_mesh(&self) -> &DeviceMesh {
        dispatch!(self, g => g.device_mesh())
    }

    fn validate(&self, operands: &OperandMapping) -> bool {
        dispatch!(self, g => g.validate(operands))
    }

    fn enumerate_candidates(&self) -> Vec<Result<ShardingStrategy, GeneratorError>> {
        dispatch!(self, g => g.enumerate_candidates())
    }

    fn update_compute_cost(
        &self,
        strategy: ShardingStrategy,
    ) -> Result<ShardingStrategy, GeneratorError> {
        dispatch!(self, g => g.update_compute_cost(strategy))
    }

    fn update_memory_cost(
        &self,
        strategy: ShardingStrategy,
    ) -> Result<ShardingStrategy, GeneratorError> {
        dispatch!(self, g => g.update_memory_cost(strategy))
    }
}

// ── Helpers shared by the variants ─────────────────────────────────

/// Builds a [`DimPartition`] from `(dim, axes)` pairs.
pub(crate) fn partition(entries: &[(usize, &[usize])]) -> DimPartition {
    entries.iter().map(|(dim, axes)| (*dim, axes.to_vec())).collect()
}

/// A collective a candidate needs on one of its operands.
pub(crate) struct CommRequest {
    pub operand: &'static str,
    pub pattern: CollectiveCommPattern,
    pub axis: LogicalProcessAxis,
}

impl CommRequest {
    pub fn new(
        operand: &'static str,
        pattern: CollectiveCommPattern,
        axis: impl Into<LogicalProcessAxis>,
    ) -> Self {
        Self {
            operand,
            pattern,
            axis: axis.into(),
        }
    }
}

/// Builds one unpriced candidate from dim partitions and collectives.
///
/// `name` receives the finished layouts so the strategy can be named
/// after its sharding sequences.
pub(crate) fn assemble<G: StrategyGenerator + ?Sized>(
    generator: &G,
    partitions: Vec<(&str, DimPartition)>,
    comms: Vec<CommRequest>,
    name: impl FnOnce(&NameMapping<ShardingSpec>) -> String,
) -> Result<ShardingStrategy, GeneratorError> {
    let partitions: NameMapping<DimPartition> = partitions
        .into_iter()
        .map(|(operand, dp)| (operand.to_string(), dp))
        .collect();
    let specs = generator.to_sharding_spec_mapping(partitions)?;
    let name = name(&specs);

    let mut actions = NameMapping::new();
    for request in comms {
        let spec = match specs.get(request.operand) {
            Some(spec) => spec.clone(),
            None if generator.op_data().contains_key(request.operand) => {
                return Err(GeneratorError::MissingLayout {
                    strategy: name,
                    name: request.operand.into(),
                })
            }
            None => {
                return Err(GeneratorError::UnknownOperand {
                    name: request.operand.into(),
                })
            }
        };
        let comm = generator.get_communication_spec(spec, request.pattern, request.axis)?;
        actions.insert(request.operand.to_string(), comm);
    }

    generator.get_sharding_strategy(name, specs, actions)
}

/// Concatenated sharding sequence of a named layout, e.g. `"S0R"`.
///
/// Scalars render as `"R"`.
pub(crate) fn seq(specs: &NameMapping<ShardingSpec>, operand: &str) -> String {
    match specs.get(operand).map(|spec| spec.sharding_sequence().concat()) {
        Some(s) if s.is_empty() => "R".to_string(),
        Some(s) => s,
        None => String::new(),
    }
}

/// Ordered pairs of distinct mesh axes.
pub(crate) fn axis_pairs(mesh: &DeviceMesh) -> Vec<(usize, usize)> {
    let rank = mesh.rank();
    (0..rank)
        .flat_map(|i| (0..rank).filter(move |&j| j != i).map(move |j| (i, j)))
        .collect()
}

/// Standard memory model for operators with a single output.
///
/// Forward holds every operand; backward holds a gradient for every
/// non-output operand.
pub(crate) fn operand_memory_cost<G: StrategyGenerator + ?Sized>(
    generator: &G,
    strategy: &ShardingStrategy,
    inputs: &[&str],
    output: &str,
) -> Result<TrainCycleItem, GeneratorError> {
    let mut input_bytes = 0;
    for name in inputs {
        input_bytes += generator.compute_size_in_bytes(strategy, name)?;
    }
    let output_bytes = generator.compute_size_in_bytes(strategy, output)?;
    Ok(TrainCycleItem::new(
        (input_bytes + output_bytes) as f64,
        input_bytes as f64,
    ))
}
