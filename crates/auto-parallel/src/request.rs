// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! A strategy request: one operation, its operands and a device mesh.
//!
//! # Type-State Pattern
//!
//! ```text
//! StrategyRequest<Loaded>     operands parsed, not yet checked.
//!       │  .validate()
//!       ▼
//! StrategyRequest<Validated>  operands fit the operator, ready to generate.
//! ```
//!
//! `generate` only exists on `StrategyRequest<Validated>`, so a solver can
//! never enumerate strategies for operands the operator rejected.

use crate::{AutoParallelError, ProblemConfig, StrategyReport};
use std::fmt;
use std::marker::PhantomData;
use strategy_generator::{
    OperandMapping, OperatorGenerator, OperatorKind, ShardingStrategy, StrategyGenerator,
};
use tensor_layout::DeviceMesh;

// ── Type-state markers ─────────────────────────────────────────────

/// Marker: request has been built but its operands not validated.
#[derive(Debug, Clone)]
pub struct Loaded;

/// Marker: operands have been validated against the operator.
#[derive(Debug, Clone)]
pub struct Validated;

/// Sealed trait for request states.
pub trait RequestState: fmt::Debug + Clone {}
impl RequestState for Loaded {}
impl RequestState for Validated {}

// ── StrategyRequest ────────────────────────────────────────────────

/// One operation to generate sharding strategies for.
#[derive(Debug, Clone)]
pub struct StrategyRequest<S: RequestState = Loaded> {
    generator: OperatorGenerator,
    _state: PhantomData<S>,
}

impl StrategyRequest<Loaded> {
    /// Creates a request in the `Loaded` state.
    pub fn new(kind: OperatorKind, operands: OperandMapping, device_mesh: DeviceMesh) -> Self {
        Self {
            generator: OperatorGenerator::new(kind, operands, device_mesh),
            _state: PhantomData,
        }
    }

    /// Builds a request from a problem configuration.
    pub fn from_config(config: &ProblemConfig) -> Result<Self, AutoParallelError> {
        Ok(Self::new(
            config.operator_kind()?,
            config.operand_mapping()?,
            config.device_mesh()?,
        ))
    }

    /// Checks the operands against the operator and transitions to
    /// the `Validated` state.
    pub fn validate(self) -> Result<StrategyRequest<Validated>, AutoParallelError> {
        if !self.generator.validate(self.generator.op_data()) {
            let shapes: Vec<String> = self
                .generator
                .op_data()
                .values()
                .map(|op| format!("{} {}", op.name, op.logical_shape))
                .collect();
            return Err(AutoParallelError::Validation {
                op: self.generator.kind().to_string(),
                detail: format!("unsupported operand shapes: {}", shapes.join(", ")),
            });
        }

        tracing::debug!(
            op = %self.generator.kind(),
            mesh = %self.generator.device_mesh(),
            "request validated",
        );
        Ok(StrategyRequest {
            generator: self.generator,
            _state: PhantomData,
        })
    }
}

impl StrategyRequest<Validated> {
    /// Enumerates and prices every legal strategy.
    pub fn generate(&self) -> Result<Vec<ShardingStrategy>, AutoParallelError> {
        Ok(self.generator.generate()?)
    }

    /// Generates strategies and packages them for a solver or for display.
    pub fn report(&self) -> Result<StrategyReport, AutoParallelError> {
        let strategies = self.generate()?;
        Ok(StrategyReport::new(
            self.kind(),
            self.device_mesh(),
            &strategies,
        ))
    }
}

impl<S: RequestState> StrategyRequest<S> {
    pub fn kind(&self) -> OperatorKind {
        self.generator.kind()
    }

    pub fn operands(&self) -> &OperandMapping {
        self.generator.op_data()
    }

    pub fn device_mesh(&self) -> &DeviceMesh {
        self.generator.device_mesh()
    }
}
