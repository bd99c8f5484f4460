// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! `shard-gen mesh` command: display a device mesh, its flattened form
//! and the process groups along every axis.

use super::parse_shape;
use tensor_layout::DeviceMesh;

pub fn execute(shape: String, ids: Option<String>) -> anyhow::Result<()> {
    let mesh_shape = parse_shape(&shape)?;
    let mesh = match ids {
        Some(ids) => DeviceMesh::new(parse_shape(&ids)?, mesh_shape)?,
        None => DeviceMesh::from_shape(mesh_shape)?,
    };

    println!("╔══════════════════════════════════════════════════════╗");
    println!("║              shard-gen · Mesh Inspector             ║");
    println!("╚══════════════════════════════════════════════════════╝");
    println!();

    println!("  Mesh: {mesh}");
    println!("  Physical ids: {:?}", mesh.physical_ids());
    println!("  Flattened: {}", mesh.flatten());
    println!();

    // ── Process Groups ─────────────────────────────────────────
    for axis in 0..mesh.rank() {
        let groups = mesh.process_groups(axis)?;
        println!(
            "  Axis {axis} (size {}): {} groups",
            mesh.axis_size(axis).unwrap_or(1),
            groups.len(),
        );
        for group in &groups {
            println!("   {group:?}");
        }
    }
    println!();
    Ok(())
}
