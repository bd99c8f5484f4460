// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Problem configuration loaded from TOML files or constructed programmatically.
//!
//! # TOML Format
//! ```toml
//! operator = "linear"
//! mesh_shape = [2, 4]
//! dtype = "f32"
//!
//! [operands]
//! input = [64, 128]
//! other = [128, 256]
//! output = [64, 256]
//! bias = [256]
//! ```

use crate::AutoParallelError;
use std::path::Path;
use strategy_generator::{
    operand_mapping, OperandMapping, OperationData, OperationDataType, OperatorKind,
};
use tensor_layout::{DType, DeviceMesh};

/// One operation on one device mesh.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ProblemConfig {
    /// Operator name: `"linear"`, `"matvec"`, `"dot"`, `"bmm"` or an alias.
    pub operator: String,
    /// Logical mesh shape, e.g. `[2, 4]`.
    pub mesh_shape: Vec<usize>,
    /// Physical device ids in row-major mesh order (defaults to `0..n`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub physical_ids: Option<Vec<usize>>,
    /// Element type shared by every operand.
    #[serde(default = "default_dtype")]
    pub dtype: String,
    /// Logical operand shapes.
    pub operands: OperandShapes,
}

/// Logical shapes of the operands, by conventional name.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct OperandShapes {
    pub input: Vec<usize>,
    pub other: Vec<usize>,
    pub output: Vec<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bias: Option<Vec<usize>>,
}

fn default_dtype() -> String {
    "f32".to_string()
}

impl ProblemConfig {
    /// Loads configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, AutoParallelError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            AutoParallelError::Config(format!("cannot read config '{}': {e}", path.display()))
        })?;
        Self::from_toml(&content)
    }

    /// Parses configuration from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self, AutoParallelError> {
        toml::from_str(toml_str)
            .map_err(|e| AutoParallelError::Config(format!("TOML parse error: {e}")))
    }

    /// Serialises configuration to TOML.
    pub fn to_toml(&self) -> Result<String, AutoParallelError> {
        toml::to_string_pretty(self)
            .map_err(|e| AutoParallelError::Config(format!("TOML serialise error: {e}")))
    }

    /// Resolves the operator name.
    pub fn operator_kind(&self) -> Result<OperatorKind, AutoParallelError> {
        OperatorKind::from_str_loose(&self.operator).ok_or_else(|| {
            AutoParallelError::Config(format!(
                "unknown operator '{}'; expected 'dot', 'matvec', 'linear' or 'bmm'",
                self.operator
            ))
        })
    }

    /// Resolves the element type.
    pub fn dtype(&self) -> Result<DType, AutoParallelError> {
        DType::from_str_loose(&self.dtype)
            .ok_or_else(|| AutoParallelError::Config(format!("unknown dtype '{}'", self.dtype)))
    }

    /// Builds the device mesh.
    pub fn device_mesh(&self) -> Result<DeviceMesh, AutoParallelError> {
        let mesh = match &self.physical_ids {
            Some(ids) => DeviceMesh::new(ids.clone(), self.mesh_shape.clone())?,
            None => DeviceMesh::from_shape(self.mesh_shape.clone())?,
        };
        Ok(mesh)
    }

    /// Builds the operand descriptors.
    ///
    /// `other` and `bias` of a linear layer are parameters; every other
    /// non-output operand is an input.
    pub fn operand_mapping(&self) -> Result<OperandMapping, AutoParallelError> {
        let kind = self.operator_kind()?;
        let dtype = self.dtype()?;
        let other_type = match kind {
            OperatorKind::Linear => OperationDataType::Parameter,
            _ => OperationDataType::Input,
        };

        let shapes = &self.operands;
        let mut operands = vec![
            OperationData::new("input", OperationDataType::Input, shapes.input.clone(), dtype),
            OperationData::new("other", other_type, shapes.other.clone(), dtype),
            OperationData::new("output", OperationDataType::Output, shapes.output.clone(), dtype),
        ];
        if let Some(bias) = &shapes.bias {
            if kind != OperatorKind::Linear {
                return Err(AutoParallelError::Config(format!(
                    "operator '{kind}' takes no bias"
                )));
            }
            operands.push(OperationData::new(
                "bias",
                OperationDataType::Parameter,
                bias.clone(),
                dtype,
            ));
        }
        Ok(operand_mapping(operands))
    }
}

impl Default for ProblemConfig {
    fn default() -> Self {
        Self {
            operator: "linear".to_string(),
            mesh_shape: vec![2, 2],
            physical_ids: None,
            dtype: default_dtype(),
            operands: OperandShapes {
                input: vec![64, 128],
                other: vec![128, 256],
                output: vec![64, 256],
                bias: None,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default() {
        let c = ProblemConfig::default();
        assert_eq!(c.operator_kind().unwrap(), OperatorKind::Linear);
        assert_eq!(c.dtype().unwrap(), DType::F32);
        assert_eq!(c.device_mesh().unwrap().num_devices(), 4);
    }

    #[test]
    fn test_from_toml() {
        let toml = r#"
operator = "bmm"
mesh_shape = [4]
physical_ids = [3, 2, 1, 0]
dtype = "bf16"

[operands]
input = [8, 16, 32]
other = [8, 32, 16]
output = [8, 16, 16]
"#;
        let c = ProblemConfig::from_toml(toml).unwrap();
        assert_eq!(c.operator_kind().unwrap(), OperatorKind::BatchedMatMul);
        assert_eq!(c.dtype().unwrap(), DType::BF16);
        assert_eq!(c.device_mesh().unwrap().physical_ids(), &[3, 2, 1, 0]);
        assert_eq!(c.operands.bias, None);
    }

    #[test]
    fn test_dtype_defaults_to_f32() {
        let toml = r#"
operator = "dot"
mesh_shape = [2]

[operands]
input = [8]
other = [8]
output = []
"#;
        let c = ProblemConfig::from_toml(toml).unwrap();
        assert_eq!(c.dtype, "f32");
    }

    #[test]
    fn test_to_toml_roundtrip() {
        let mut c = ProblemConfig::default();
        c.operands.bias = Some(vec![256]);
        let toml = c.to_toml().unwrap();
        let back = ProblemConfig::from_toml(&toml).unwrap();
        assert_eq!(back, c);
    }

    #[test]
    fn test_unknown_operator() {
        let c = ProblemConfig {
            operator: "conv2d".into(),
            ..Default::default()
        };
        assert!(matches!(c.operator_kind(), Err(AutoParallelError::Config(_))));
    }

    #[test]
    fn test_unknown_dtype() {
        let c = ProblemConfig {
            dtype: "f8".into(),
            ..Default::default()
        };
        assert!(matches!(c.dtype(), Err(AutoParallelError::Config(_))));
    }

    #[test]
    fn test_bad_mesh() {
        let c = ProblemConfig {
            mesh_shape: vec![2, 2],
            physical_ids: Some(vec![0, 1, 2]),
            ..Default::default()
        };
        assert!(matches!(c.device_mesh(), Err(AutoParallelError::Layout(_))));
    }

    #[test]
    fn test_operand_mapping_roles() {
        let mut c = ProblemConfig::default();
        c.operands.bias = Some(vec![256]);
        let ops = c.operand_mapping().unwrap();
        assert_eq!(ops.len(), 4);
        assert_eq!(ops["other"].data_type, OperationDataType::Parameter);
        assert_eq!(ops["bias"].data_type, OperationDataType::Parameter);
        assert_eq!(ops["output"].data_type, OperationDataType::Output);
    }

    #[test]
    fn test_bias_rejected_outside_linear() {
        let c = ProblemConfig {
            operator: "mv".into(),
            operands: OperandShapes {
                input: vec![8, 4],
                other: vec![4],
                output: vec![8],
                bias: Some(vec![8]),
            },
            ..Default::default()
        };
        assert!(c.operand_mapping().is_err());
    }

    #[test]
    fn test_from_missing_file() {
        let err = ProblemConfig::from_file(Path::new("/nonexistent/problem.toml")).unwrap_err();
        assert!(err.to_string().contains("cannot read config"));
    }
}
