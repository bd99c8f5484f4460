// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! `shard-gen generate` command: enumerate and price strategies for one
//! operation and print them as a table or as JSON.

use super::parse_shape;
use anyhow::Context;
use auto_parallel::{OperandShapes, ProblemConfig, StrategyReport, StrategyRequest};
use std::path::PathBuf;

/// Problem description taken from flags when no config file is given.
pub struct GenerateArgs {
    pub operator: Option<String>,
    pub mesh: String,
    pub input: Option<String>,
    pub other: Option<String>,
    pub output: Option<String>,
    pub bias: Option<String>,
    pub dtype: String,
}

impl GenerateArgs {
    fn into_config(self) -> anyhow::Result<ProblemConfig> {
        let required = |flag: &str, value: Option<String>| {
            value.ok_or_else(|| anyhow::anyhow!("--{flag} is required without --config"))
        };
        Ok(ProblemConfig {
            operator: required("operator", self.operator)?,
            mesh_shape: parse_shape(&self.mesh)?,
            physical_ids: None,
            dtype: self.dtype,
            operands: OperandShapes {
                input: parse_shape(&required("input", self.input)?)?,
                other: parse_shape(&required("other", self.other)?)?,
                output: parse_shape(&required("output", self.output)?)?,
                bias: self.bias.as_deref().map(parse_shape).transpose()?,
            },
        })
    }
}

pub fn execute(config: Option<PathBuf>, args: GenerateArgs, json: bool) -> anyhow::Result<()> {
    let problem = match config {
        Some(path) => ProblemConfig::from_file(&path)?,
        None => args.into_config()?,
    };
    tracing::debug!(operator = %problem.operator, mesh = ?problem.mesh_shape, "problem loaded");

    let request = StrategyRequest::from_config(&problem)?
        .validate()
        .context("operands do not fit the operator")?;
    let report = request.report()?;

    if json {
        println!("{}", report.to_json()?);
    } else {
        print_table(&problem, &report);
    }
    Ok(())
}

fn print_table(problem: &ProblemConfig, report: &StrategyReport) {
    println!("╔══════════════════════════════════════════════════════╗");
    println!("║           shard-gen · Sharding Strategies           ║");
    println!("╚══════════════════════════════════════════════════════╝");
    println!();

    // ── Summary ────────────────────────────────────────────────
    println!("  Operator: {}", report.operator);
    println!("  Mesh: {:?}", report.mesh_shape);
    println!("  Dtype: {}", problem.dtype);
    println!("  Strategies: {}", report.strategies.len());
    println!();

    // ── Per-Strategy Detail ────────────────────────────────────
    println!(
        "  {:<4} {:<32} {:>12} {:>14} {:>12} {:>12} {:>5}",
        "Idx", "Strategy", "Comm (B)", "FLOPs fwd", "Mem fwd (B)", "Mem bwd (B)", "#C",
    );
    println!("  {}", "-".repeat(98));

    for (idx, entry) in report.strategies.iter().enumerate() {
        println!(
            "  {:<4} {:<32} {:>12.0} {:>14.0} {:>12.0} {:>12.0} {:>5}",
            idx,
            truncate(&entry.name, 32),
            entry.communication_cost.total(),
            entry.compute_cost.fwd,
            entry.memory_cost.fwd,
            entry.memory_cost.bwd,
            entry.communication_actions.len(),
        );
    }
    println!();

    if let Some(cheapest) = report.cheapest() {
        println!("  Lowest comm + compute: '{}'", cheapest.name);
        for (operand, layout) in &cheapest.sharding_specs {
            println!("   {operand:<8} {layout}");
        }
        for action in &cheapest.communication_actions {
            println!(
                "   {} on {} (axis {}, {} devices)",
                action.pattern, action.operand, action.logical_process_axis, action.group_size,
            );
        }
        println!();
    }
}

/// Truncates a string to `max_len` with ellipsis if needed.
fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let head: String = s.chars().take(max_len - 3).collect();
        format!("{head}...")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args() -> GenerateArgs {
        GenerateArgs {
            operator: Some("dot".into()),
            mesh: "4".into(),
            input: Some("16".into()),
            other: Some("16".into()),
            output: Some("scalar".into()),
            bias: None,
            dtype: "f16".into(),
        }
    }

    #[test]
    fn test_into_config() {
        let c = args().into_config().unwrap();
        assert_eq!(c.mesh_shape, vec![4]);
        assert!(c.operands.output.is_empty());
        assert_eq!(c.dtype, "f16");
    }

    #[test]
    fn test_missing_operand_flag() {
        let mut a = args();
        a.other = None;
        let err = a.into_config().unwrap_err();
        assert!(err.to_string().contains("--other"));
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("S01RR = S01RR x S01RR", 10), "S01RR =...");
    }
}
