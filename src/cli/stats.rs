use anyhow::Result;

use kos::config::KosConfig;
use kos::runtime::Kos;

/// Display store statistics in the terminal.
pub fn stats(config: &KosConfig) -> Result<()> {
    let kos = Kos::open(config.clone())?;
    let response = kos.engine().stats()?;

    println!("Knowledge Statistics");
    println!("{}", "=".repeat(40));
    println!("  Total statements:    {}", response.total_statements);
    println!("  Current:             {}", response.current_statements);
    println!("  Superseded:          {}", response.superseded_statements);
    println!();

    println!("By Relation:");
    for (relation, count) in &response.by_relation {
        println!("  {:<20} {}", relation, count);
    }
    println!();

    println!("K-Cycles:");
    for d in &["accepted", "rejected", "quarantined"] {
        let count = response.cycles_by_decision.get(*d).copied().unwrap_or(0);
        println!("  {:<12} {}", d, count);
    }

    kos.shutdown()
}
