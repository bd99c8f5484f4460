// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Benchmarks for strategy enumeration and pricing.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use strategy_generator::{
    operand_mapping, OperandMapping, OperationData, OperationDataType, OperatorGenerator,
    OperatorKind, StrategyGenerator,
};
use tensor_layout::{DType, DeviceMesh};

fn operand(name: &str, data_type: OperationDataType, shape: &[usize]) -> OperationData {
    OperationData::new(name, data_type, shape.to_vec(), DType::F16)
}

fn linear_operands() -> OperandMapping {
    operand_mapping([
        operand("input", OperationDataType::Input, &[4096, 1024]),
        operand("other", OperationDataType::Parameter, &[1024, 4096]),
        operand("bias", OperationDataType::Parameter, &[4096]),
        operand("output", OperationDataType::Output, &[4096, 4096]),
    ])
}

fn bmm_operands() -> OperandMapping {
    operand_mapping([
        operand("input", OperationDataType::Input, &[64, 512, 128]),
        operand("other", OperationDataType::Input, &[64, 128, 512]),
        operand("output", OperationDataType::Output, &[64, 512, 512]),
    ])
}

fn bench_linear_generate(c: &mut Criterion) {
    let mut group = c.benchmark_group("linear_generate");
    for shape in [vec![8], vec![2, 4], vec![4, 8]] {
        let mesh = DeviceMesh::from_shape(shape.clone()).unwrap();
        let generator = OperatorGenerator::new(OperatorKind::Linear, linear_operands(), mesh);
        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{shape:?}")),
            &generator,
            |b, g| b.iter(|| black_box(g.generate().unwrap())),
        );
    }
    group.finish();
}

fn bench_batched_matmul_generate(c: &mut Criterion) {
    let mesh = DeviceMesh::from_shape(vec![4, 4]).unwrap();
    let generator = OperatorGenerator::new(OperatorKind::BatchedMatMul, bmm_operands(), mesh);
    c.bench_function("batched_matmul_generate_4x4", |b| {
        b.iter(|| black_box(generator.generate().unwrap()))
    });
}

criterion_group!(benches, bench_linear_generate, bench_batched_matmul_generate);
criterion_main!(benches);
