// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Subcommand implementations and shared argument parsing.

pub mod generate;
pub mod mesh;

use tracing_subscriber::EnvFilter;

/// Installs a fmt subscriber. `RUST_LOG` wins over `-v` when set.
pub fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Parses a shape such as `"64x128"`, `"64,128"` or `"scalar"`.
pub fn parse_shape(s: &str) -> anyhow::Result<Vec<usize>> {
    let s = s.trim();
    if s.is_empty() || s.eq_ignore_ascii_case("scalar") {
        return Ok(Vec::new());
    }
    s.split(|c| c == 'x' || c == 'X' || c == ',')
        .map(|dim| {
            dim.trim()
                .parse::<usize>()
                .map_err(|e| anyhow::anyhow!("invalid dimension '{dim}' in shape '{s}': {e}"))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_shape() {
        assert_eq!(parse_shape("2x4").unwrap(), vec![2, 4]);
        assert_eq!(parse_shape("64, 128").unwrap(), vec![64, 128]);
        assert_eq!(parse_shape("16").unwrap(), vec![16]);
        assert!(parse_shape("scalar").unwrap().is_empty());
        assert!(parse_shape("").unwrap().is_empty());
        assert!(parse_shape("4xfoo").is_err());
    }
}
