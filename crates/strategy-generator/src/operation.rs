// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Operand descriptors.
//!
//! An [`OperationData`] names and types one operand or result of an
//! operation. Generators look operands up by name through an
//! [`OperandMapping`]; finished strategies key their layouts by the
//! descriptor itself ([`OperandKeyed`]). [`rekey_by_operand`] is the one
//! place where the first form turns into the second.

use crate::GeneratorError;
use std::collections::BTreeMap;
use tensor_layout::{DType, Shape};

/// The role an operand plays in its operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationDataType {
    /// Activation flowing into the operation.
    Input,
    /// Result of the operation.
    Output,
    /// Trainable parameter (weight, bias).
    Parameter,
}

impl OperationDataType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Input => "input",
            Self::Output => "output",
            Self::Parameter => "parameter",
        }
    }
}

impl std::fmt::Display for OperationDataType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One operand of an operation.
///
/// A lightweight value type with structural equality and ordering, so it
/// can key the per-strategy maps.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize)]
pub struct OperationData {
    /// Name, unique within its operation (e.g. `"input"`, `"bias"`).
    pub name: String,
    /// Role of the operand.
    pub data_type: OperationDataType,
    /// Full, unsharded shape.
    pub logical_shape: Shape,
    /// Element type.
    pub dtype: DType,
}

impl OperationData {
    pub fn new(
        name: impl Into<String>,
        data_type: OperationDataType,
        logical_shape: impl Into<Shape>,
        dtype: DType,
    ) -> Self {
        Self {
            name: name.into(),
            data_type,
            logical_shape: logical_shape.into(),
            dtype,
        }
    }

    /// Bytes of the whole, unsharded operand.
    pub fn logical_size_bytes(&self) -> usize {
        self.logical_shape.size_bytes(self.dtype)
    }
}

/// Operand name → descriptor.
pub type OperandMapping = BTreeMap<String, OperationData>;

/// Operand name → value, before names are resolved.
pub type NameMapping<V> = BTreeMap<String, V>;

/// Operand descriptor → value.
pub type OperandKeyed<V> = BTreeMap<OperationData, V>;

/// Builds an [`OperandMapping`] from descriptors, keyed by their names.
pub fn operand_mapping(operands: impl IntoIterator<Item = OperationData>) -> OperandMapping {
    operands
        .into_iter()
        .map(|op| (op.name.clone(), op))
        .collect()
}

/// Replaces every operand name in `mapping` with its descriptor.
///
/// Fails with [`GeneratorError::UnknownOperand`] on the first name that
/// `op_data` does not contain.
pub fn rekey_by_operand<V>(
    op_data: &OperandMapping,
    mapping: NameMapping<V>,
) -> Result<OperandKeyed<V>, GeneratorError> {
    mapping
        .into_iter()
        .map(|(name, value)| match op_data.get(&name) {
            Some(op) => Ok((op.clone(), value)),
            None => Err(GeneratorError::UnknownOperand { name }),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> OperandMapping {
        operand_mapping([
            OperationData::new("input", OperationDataType::Input, vec![8, 16], DType::F32),
            OperationData::new("weight", OperationDataType::Parameter, vec![16, 4], DType::F16),
        ])
    }

    #[test]
    fn test_operand_mapping_keys_by_name() {
        let m = sample();
        assert_eq!(m.len(), 2);
        assert_eq!(m["weight"].dtype, DType::F16);
    }

    #[test]
    fn test_logical_size_bytes() {
        assert_eq!(sample()["input"].logical_size_bytes(), 8 * 16 * 4);
    }

    #[test]
    fn test_rekey() {
        let op_data = sample();
        let names: NameMapping<u32> = [("input".to_string(), 1), ("weight".to_string(), 2)]
            .into_iter()
            .collect();
        let keyed = rekey_by_operand(&op_data, names).unwrap();
        assert_eq!(keyed[&op_data["input"]], 1);
        assert_eq!(keyed[&op_data["weight"]], 2);
    }

    #[test]
    fn test_rekey_unknown() {
        let names: NameMapping<u32> = [("bias".to_string(), 1)].into_iter().collect();
        let err = rekey_by_operand(&sample(), names).unwrap_err();
        assert!(matches!(err, GeneratorError::UnknownOperand { name } if name == "bias"));
    }

    #[test]
    fn test_structural_equality() {
        let a = OperationData::new("x", OperationDataType::Input, vec![2], DType::F32);
        let b = OperationData::new("x", OperationDataType::Input, vec![2], DType::F32);
        assert_eq!(a, b);
    }

    #[test]
    fn test_serde_roundtrip() {
        let op = sample()["input"].clone();
        let json = serde_json::to_string(&op).unwrap();
        assert!(json.contains("\"data_type\":\"input\""));
        let back: OperationData = serde_json::from_str(&json).unwrap();
        assert_eq!(back, op);
    }
}
