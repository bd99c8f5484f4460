// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # shard-gen
//!
//! Command-line interface for the sharding strategy generator.
//!
//! ## Usage
//! ```bash
//! # Enumerate strategies for a linear layer on a 2x4 mesh
//! shard-gen generate --operator linear --mesh 2x4 --input 64x128 --other 128x256 --output 64x256
//!
//! # Same, from a TOML problem file, as JSON
//! shard-gen --config problem.toml generate --json
//!
//! # Inspect a device mesh and its process groups
//! shard-gen mesh --shape 2x4
//! ```

mod commands;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "shard-gen",
    about = "Enumerate and price sharding strategies for tensor operations",
    version,
    author
)]
struct Cli {
    /// Path to a TOML problem file (overrides CLI arguments).
    #[arg(short, long, global = true)]
    config: Option<std::path::PathBuf>,

    /// Enable verbose logging (repeat for more: -v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Enumerate and price every sharding strategy for one operation.
    Generate {
        /// Operator: dot, matvec, linear, bmm (or an alias such as addmm).
        #[arg(long)]
        operator: Option<String>,

        /// Mesh shape (e.g., "2x4").
        #[arg(short, long, default_value = "2x2")]
        mesh: String,

        /// Input shape (e.g., "64x128").
        #[arg(long)]
        input: Option<String>,

        /// Second operand shape.
        #[arg(long)]
        other: Option<String>,

        /// Output shape; "scalar" for a 0-d output.
        #[arg(long)]
        output: Option<String>,

        /// Bias shape (linear only).
        #[arg(long)]
        bias: Option<String>,

        /// Element type.
        #[arg(long, default_value = "f32")]
        dtype: String,

        /// Print the report as JSON instead of a table.
        #[arg(long)]
        json: bool,
    },

    /// Inspect a device mesh: axes, flattened form and process groups.
    Mesh {
        /// Mesh shape (e.g., "2x4").
        #[arg(short, long)]
        shape: String,

        /// Comma-separated physical device ids in row-major order.
        #[arg(long)]
        ids: Option<String>,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize tracing/logging based on verbosity.
    commands::init_tracing(cli.verbose);

    match cli.command {
        Commands::Generate {
            operator,
            mesh,
            input,
            other,
            output,
            bias,
            dtype,
            json,
        } => {
            let args = commands::generate::GenerateArgs {
                operator,
                mesh,
                input,
                other,
                output,
                bias,
                dtype,
            };
            commands::generate::execute(cli.config, args, json)
        }
        Commands::Mesh { shape, ids } => commands::mesh::execute(shape, ids),
    }
}
