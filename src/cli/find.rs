use anyhow::Result;

use kos::config::KosConfig;
use kos::runtime::Kos;

/// List statements about a subject.
pub fn find(config: &KosConfig, subject: &str, relation: Option<&str>, all: bool) -> Result<()> {
    let kos = Kos::open(config.clone())?;
    let engine = kos.engine();

    let found = engine.history(subject, relation)?;
    let shown: Vec<_> = found.iter().filter(|s| all || s.is_current()).collect();

    if shown.is_empty() {
        println!("No statements found for {subject}");
        return kos.shutdown();
    }

    for s in shown {
        let st = &s.statement;
        let marker = if s.is_current() { " " } else { "~" };
        let confidence = st
            .metadata()
            .confidence
            .map(|c| format!("{c:.2}"))
            .unwrap_or_else(|| "-".into());
        println!(
            "{marker} {}  {} {} {}  [{confidence}]",
            st.id(),
            st.subject().id,
            st.relation(),
            serde_json::to_string(&st.object().value)?,
        );
    }

    kos.shutdown()
}
