// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Element data types of operands.

/// Enumerates the scalar types an operand can carry.
///
/// Only the byte width matters to the cost model: it converts element
/// counts into communicated and resident bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DType {
    /// 64-bit IEEE 754 floating point.
    F64,
    /// 32-bit IEEE 754 floating point.
    F32,
    /// 16-bit IEEE 754 floating point.
    F16,
    /// 16-bit brain floating point.
    BF16,
    /// 64-bit signed integer.
    I64,
    /// 32-bit signed integer.
    I32,
    /// 8-bit signed integer.
    I8,
    /// 8-bit unsigned integer.
    U8,
    /// Boolean, stored as one byte.
    Bool,
}

impl DType {
    /// Returns the size of a single element in bytes.
    pub fn size_bytes(self) -> usize {
        match self {
            DType::F64 | DType::I64 => 8,
            DType::F32 | DType::I32 => 4,
            DType::F16 | DType::BF16 => 2,
            DType::I8 | DType::U8 | DType::Bool => 1,
        }
    }

    /// Returns a human-readable label for this data type.
    pub fn as_str(self) -> &'static str {
        match self {
            DType::F64 => "f64",
            DType::F32 => "f32",
            DType::F16 => "f16",
            DType::BF16 => "bf16",
            DType::I64 => "i64",
            DType::I32 => "i32",
            DType::I8 => "i8",
            DType::U8 => "u8",
            DType::Bool => "bool",
        }
    }

    /// Parses a data type name.
    ///
    /// Accepts the canonical labels plus common aliases
    /// (`"float32"`, `"half"`, `"bfloat16"`, `"long"`, `"int"`).
    pub fn from_str_loose(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "f64" | "float64" | "double" => Some(Self::F64),
            "f32" | "float32" | "float" => Some(Self::F32),
            "f16" | "float16" | "half" => Some(Self::F16),
            "bf16" | "bfloat16" => Some(Self::BF16),
            "i64" | "int64" | "long" => Some(Self::I64),
            "i32" | "int32" | "int" => Some(Self::I32),
            "i8" | "int8" => Some(Self::I8),
            "u8" | "uint8" => Some(Self::U8),
            "bool" => Some(Self::Bool),
            _ => None,
        }
    }
}

impl std::fmt::Display for DType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_size_bytes() {
        assert_eq!(DType::F64.size_bytes(), 8);
        assert_eq!(DType::F32.size_bytes(), 4);
        assert_eq!(DType::BF16.size_bytes(), 2);
        assert_eq!(DType::Bool.size_bytes(), 1);
    }

    #[test]
    fn test_from_str_loose() {
        assert_eq!(DType::from_str_loose("float32"), Some(DType::F32));
        assert_eq!(DType::from_str_loose("HALF"), Some(DType::F16));
        assert_eq!(DType::from_str_loose("bfloat16"), Some(DType::BF16));
        assert_eq!(DType::from_str_loose("complex64"), None);
    }

    #[test]
    fn test_serde_lowercase() {
        let json = serde_json::to_string(&DType::BF16).unwrap();
        assert_eq!(json, "\"bf16\"");
        let back: DType = serde_json::from_str("\"i64\"").unwrap();
        assert_eq!(back, DType::I64);
    }
}
