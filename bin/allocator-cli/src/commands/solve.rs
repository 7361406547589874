// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! `accel-plan solve` command: run the allocation solve and print the
//! resulting per-server table.

use allocation_planner::{Optimizer, Tunables};
use std::path::PathBuf;

pub fn execute(data: PathBuf, tunables: Option<PathBuf>, apply: bool) -> anyhow::Result<()> {
    println!("╔══════════════════════════════════════════════════════╗");
    println!("║            accel-plan · Allocation Solver           ║");
    println!("╚══════════════════════════════════════════════════════╝");
    println!();

    let (mut system, spec) = super::load_system(&data)?;

    let tunables = match tunables {
        Some(path) => Tunables::from_file(&path)
            .map_err(|e| anyhow::anyhow!("failed to load tunables: {e}"))?,
        None => Tunables::default(),
    };

    println!("  Servers:          {}", system.servers().len());
    println!("  Accelerators:     {}", system.accelerators().len());
    println!("  Saturation:       {}", spec.saturation_policy);
    println!();

    let optimizer = Optimizer::with_tunables(&spec, tunables);
    optimizer.optimize(&mut system)?;

    // ── Solution ───────────────────────────────────────────────
    let solution = system.solution();
    println!(
        "  {:<24} {:<10} {:>5} {:>6} {:>9} {:>10} {:>10}",
        "Server", "Acc", "Repl", "Batch", "Cost", "ITL ms", "TTFT ms",
    );
    println!("  {}", "-".repeat(80));
    let mut total_cost = 0.0;
    for (name, alloc) in &solution {
        total_cost += alloc.cost;
        println!(
            "  {:<24} {:<10} {:>5} {:>6} {:>9.2} {:>10.2} {:>10.1}",
            super::truncate(name, 24),
            super::truncate(&alloc.accelerator, 10),
            alloc.num_replicas,
            alloc.max_batch,
            alloc.cost,
            alloc.itl_average,
            alloc.ttft_average,
        );
    }
    println!("  {}", "-".repeat(80));
    println!("  Total cost: {total_cost:.2}");

    let unallocated: Vec<&str> = system
        .servers()
        .iter()
        .filter(|(_, s)| s.desired_allocation().is_none())
        .map(|(name, _)| name.as_str())
        .collect();
    if !unallocated.is_empty() {
        println!();
        println!("  Unallocated servers ({}):", unallocated.len());
        for name in unallocated {
            println!("   {name}");
        }
    }

    if apply {
        system.apply_allocations();
        println!();
        println!("  Desired allocations applied.");
    }

    println!();
    Ok(())
}
