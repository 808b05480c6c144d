//! CLI `schema` command: print the configured ontology.

use anyhow::Result;

use kos::config::KosConfig;
use kos::runtime::load_registry;

pub fn schema(config: &KosConfig) -> Result<()> {
    let registry = load_registry(config)?;

    println!("Ontology v{}", registry.version());
    println!("{}", "=".repeat(40));

    let mut types: Vec<_> = registry.subject_types().collect();
    types.sort_by(|a, b| a.name.cmp(&b.name));
    println!("Subject types:");
    for t in types {
        let parent = t
            .parent
            .as_deref()
            .map(|p| format!(" : {p}"))
            .unwrap_or_default();
        println!("  {}{parent}", t.name);
        if !t.required_attributes.is_empty() {
            println!("    requires {}", t.required_attributes.join(", "));
        }
    }
    println!();

    let mut relations: Vec<_> = registry.relations().collect();
    relations.sort_by(|a, b| a.name.cmp(&b.name));
    println!("Relations:");
    for r in relations {
        let subjects = if r.subject_types.is_empty() {
            "*".to_string()
        } else {
            r.subject_types.join("|")
        };
        let shapes = if r.object_shapes.is_empty() {
            "any".to_string()
        } else {
            r.object_shapes
                .iter()
                .map(|s| s.as_str())
                .collect::<Vec<_>>()
                .join("|")
        };
        println!(
            "  {:<20} {subjects} -> {shapes}  cardinality {}",
            r.name,
            r.cardinality.as_str()
        );
        if r.unit_bearing {
            println!("    units: {}", if r.units.is_empty() { "any".into() } else { r.units.join(", ") });
        }
        if let Some(range) = r.range {
            println!("    range: {} ..= {}", range.min, range.max);
        }
        if !r.requires.is_empty() {
            let parts: Vec<_> = r.requires.iter().map(|p| p.as_str()).collect();
            println!("    requires: {}", parts.join(", "));
        }
        if r.requires_provenance {
            println!("    requires provenance");
        }
    }

    Ok(())
}
