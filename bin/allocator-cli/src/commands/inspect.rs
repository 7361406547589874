// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! `accel-plan inspect` command: display the catalog, capacities, SLO
//! targets, and every server's feasible candidates.

use allocation_planner::{Evaluator, Tunables};
use std::path::PathBuf;

pub fn execute(data: PathBuf) -> anyhow::Result<()> {
    println!("╔══════════════════════════════════════════════════════╗");
    println!("║            accel-plan · Fleet Inspector             ║");
    println!("╚══════════════════════════════════════════════════════╝");
    println!();

    let (system, _) = super::load_system(&data)?;

    // ── Accelerators ───────────────────────────────────────────
    println!("  Accelerators");
    println!(
        "   {:<12} {:<12} {:>6} {:>9} {:>9}",
        "Name", "Type", "Mult", "Cost", "Capacity",
    );
    println!("   {}", "-".repeat(52));
    for (name, acc) in system.accelerators() {
        let capacity = system
            .capacity(acc.kind())
            .map(|c| c.to_string())
            .unwrap_or_else(|| "-".into());
        println!(
            "   {:<12} {:<12} {:>6} {:>9.2} {:>9}",
            super::truncate(name, 12),
            super::truncate(acc.kind(), 12),
            acc.multiplicity(),
            acc.cost(),
            capacity,
        );
    }
    println!();

    // ── Service classes ────────────────────────────────────────
    println!("  Service classes");
    for (name, svc) in system.service_classes() {
        println!("   {name} (priority {})", svc.priority());
        let spec = svc.spec();
        for t in &spec.model_targets {
            println!(
                "     {}: ITL {} ms, TTFT {} ms, TPS {} tok/s",
                t.model, t.slo_itl, t.slo_ttft, t.slo_tps,
            );
        }
    }
    println!();

    // ── Servers and candidates ─────────────────────────────────
    let tunables = Tunables::default();
    let evaluator = Evaluator::new(&system, &tunables);

    println!("  Servers");
    for (name, server) in system.servers() {
        let load = server
            .load()
            .map(|l| {
                format!(
                    "{:.1} req/min, {} in + {} out tokens",
                    l.arrival_rate, l.avg_in_tokens, l.avg_out_tokens,
                )
            })
            .unwrap_or_else(|| "no load".into());
        println!(
            "   {name} [{} / {}] — {load}",
            server.service_class_name(),
            server.model_name(),
        );

        let candidates = evaluator.candidates(name)?;
        if candidates.is_empty() {
            println!("     no feasible candidates");
            continue;
        }
        for alloc in &candidates {
            println!(
                "     {:<10} x{:<3} batch {:<4} cost {:>8.2}  itl {:>6.2} ms  wait {:>8.2} ms",
                alloc.accelerator(),
                alloc.num_replicas(),
                alloc.batch_size(),
                alloc.cost(),
                alloc.serv_time(),
                alloc.wait_time(),
            );
        }
    }

    println!();
    Ok(())
}
