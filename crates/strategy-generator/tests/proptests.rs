// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Property tests for cost accounting and generated layouts.

use proptest::prelude::*;
use strategy_generator::{
    operand_mapping, LinearStrategyGenerator, NameMapping, OperandMapping, OperationData,
    OperationDataType, OperatorGenerator, OperatorKind, ShardingStrategy, StrategyGenerator,
};
use tensor_layout::{CollectiveCommPattern, DType, DeviceMesh, DimPartition};

// ── Helpers ────────────────────────────────────────────────────

fn linear(mesh_shape: Vec<usize>, m: usize, k: usize, n: usize) -> LinearStrategyGenerator {
    let operands = operand_mapping([
        OperationData::new("input", OperationDataType::Input, vec![m, k], DType::F32),
        OperationData::new("other", OperationDataType::Parameter, vec![k, n], DType::F32),
        OperationData::new("output", OperationDataType::Output, vec![m, n], DType::F32),
    ]);
    LinearStrategyGenerator::new(operands, DeviceMesh::from_shape(mesh_shape).unwrap())
}

/// An unsharded strategy carrying the given all-reduce actions.
fn with_actions(
    g: &LinearStrategyGenerator,
    actions: &[(&str, CollectiveCommPattern, usize)],
) -> ShardingStrategy {
    let partitions: NameMapping<DimPartition> = ["input", "other", "output"]
        .iter()
        .map(|name| (name.to_string(), DimPartition::new()))
        .collect();
    let specs = g.to_sharding_spec_mapping(partitions).unwrap();
    let comms: NameMapping<_> = actions
        .iter()
        .map(|(name, pattern, axis)| {
            let spec = specs[*name].clone();
            let comm = g.get_communication_spec(spec, *pattern, (*axis).into()).unwrap();
            (name.to_string(), comm)
        })
        .collect();
    g.get_sharding_strategy("test".into(), specs, comms).unwrap()
}

/// Operands of `kind` with every dimension drawn from `dims` = `[b, m, k, n]`.
fn operands_for(kind: OperatorKind, [b, m, k, n]: [usize; 4]) -> OperandMapping {
    let (input, other, output) = match kind {
        OperatorKind::DotProduct => (vec![k], vec![k], vec![]),
        OperatorKind::MatVec => (vec![m, k], vec![k], vec![m]),
        OperatorKind::Linear => (vec![m, k], vec![k, n], vec![m, n]),
        OperatorKind::BatchedMatMul => (vec![b, m, k], vec![b, k, n], vec![b, m, n]),
    };
    operand_mapping([
        OperationData::new("input", OperationDataType::Input, input, DType::F32),
        OperationData::new("other", OperationDataType::Input, other, DType::F32),
        OperationData::new("output", OperationDataType::Output, output, DType::F32),
    ])
}

fn arb_kind() -> impl Strategy<Value = OperatorKind> {
    prop_oneof![
        Just(OperatorKind::DotProduct),
        Just(OperatorKind::MatVec),
        Just(OperatorKind::Linear),
        Just(OperatorKind::BatchedMatMul),
    ]
}

fn arb_mesh() -> impl Strategy<Value = Vec<usize>> {
    prop_oneof![
        (1usize..=8).prop_map(|a| vec![a]),
        (1usize..=4, 1usize..=4).prop_map(|(a, b)| vec![a, b]),
    ]
}

fn arb_pattern() -> impl Strategy<Value = CollectiveCommPattern> {
    prop_oneof![
        Just(CollectiveCommPattern::AllReduceFwdIdentityBwd),
        Just(CollectiveCommPattern::IdentityFwdAllReduceBwd),
    ]
}

// ── Property Tests ─────────────────────────────────────────────

proptest! {
    #[test]
    fn prop_comm_cost_is_additive(
        mesh in arb_mesh(),
        m in 1usize..=64,
        k in 1usize..=64,
        n in 1usize..=64,
        p1 in arb_pattern(),
        p2 in arb_pattern(),
        a1 in 0usize..2,
        a2 in 0usize..2,
    ) {
        let rank = mesh.len();
        let g = linear(mesh, m, k, n);
        let (a1, a2) = (a1 % rank, a2 % rank);

        let first = g.estimate_communication_cost(&with_actions(&g, &[("input", p1, a1)])).unwrap();
        let second = g.estimate_communication_cost(&with_actions(&g, &[("output", p2, a2)])).unwrap();
        let both = g
            .estimate_communication_cost(&with_actions(&g, &[("input", p1, a1), ("output", p2, a2)]))
            .unwrap();
        let reversed = g
            .estimate_communication_cost(&with_actions(&g, &[("output", p2, a2), ("input", p1, a1)]))
            .unwrap();

        prop_assert!((both.fwd - (first.fwd + second.fwd)).abs() < 1e-6);
        prop_assert!((both.fwd - reversed.fwd).abs() < 1e-9);
        prop_assert_eq!(both.bwd, 0.0);
    }

    #[test]
    fn prop_generated_layouts_tile_the_tensor(
        kind in arb_kind(),
        mesh in arb_mesh(),
        dims in prop::array::uniform4(1usize..=16),
    ) {
        let g = OperatorGenerator::new(
            kind,
            operands_for(kind, dims),
            DeviceMesh::from_shape(mesh).unwrap(),
        );
        prop_assert!(g.validate(g.op_data()));
        let strategies = g.generate().unwrap();
        // The unsharded candidate always survives.
        prop_assert!(!strategies.is_empty());

        for s in &strategies {
            for (op, spec) in &s.sharding_specs {
                let per_device = spec.sharded_shape_per_device();
                for (dim, &size) in op.logical_shape.dims().iter().enumerate() {
                    prop_assert_eq!(per_device.dim(dim).unwrap() * spec.num_shards(dim), size);
                }
                // The shape used for memory costing is the exposed one.
                prop_assert_eq!(
                    g.compute_size_in_bytes(s, &op.name).unwrap(),
                    per_device.num_elements() * op.dtype.size_bytes()
                );
                // A communication action sees the same per-device shape.
                if let Some(comm) = s.communication_actions.get(op) {
                    prop_assert_eq!(comm.sharding_spec().sharded_shape_per_device(), per_device);
                }
            }
            prop_assert!(s.communication_cost.fwd >= 0.0);
            prop_assert!(s.compute_cost.bwd >= s.compute_cost.fwd);
        }
    }
}
