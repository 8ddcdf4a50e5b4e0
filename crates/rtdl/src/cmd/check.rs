//! Check command - validate configuration and routing rules
//!
//! Loads the rule directory the way the server does and prints what was
//! loaded, skipped and shadowed. Exits non-zero when any record was
//! skipped.

use std::fmt::Write as _;

use anyhow::{Result, bail};
use rtdl_config::Config;
use rtdl_routing::{LoadReport, RuleSet, RuleSource};

use crate::cmd::rule_source;

/// Run the check command
pub fn run(config: &Config) -> Result<()> {
    let source = rule_source(config);
    let report = source.load()?;
    let skipped = report.skipped.len();

    print!("{}", render(config, &source.describe(), report));

    if skipped > 0 {
        bail!("{skipped} rule record(s) skipped");
    }
    Ok(())
}

/// Human-readable summary of a rule load
fn render(config: &Config, source: &str, report: LoadReport) -> String {
    let stage = config.stage.name.as_str();
    let skipped = report.skipped;
    let inactive = report.inactive;
    let rules = RuleSet::from_rules(report.rules);

    let mut out = String::new();
    let _ = writeln!(out, "stage:      {stage}");
    let _ = writeln!(out, "rules:      {source}");
    let _ = writeln!(out, "storage:    {:?} ({})", config.storage.kind, config.storage.path.display());
    let _ = writeln!(
        out,
        "messaging:  {}",
        config.messaging.endpoint().unwrap_or("(none)")
    );
    let _ = writeln!(
        out,
        "loaded {} rule(s), {} chained, {} inactive, {} skipped",
        rules.len(),
        rules.chained_count(),
        inactive,
        skipped.len()
    );

    for err in &skipped {
        let _ = writeln!(out, "  skipped   {}: {err}", err.path().display());
    }

    for ambiguity in rules.ambiguities() {
        let _ = writeln!(
            out,
            "  shadowed  {} ({}={}) by {}",
            ambiguity.shadowed, ambiguity.field, ambiguity.value, ambiguity.winner
        );
    }

    for rule in rules.rules() {
        if let Some(stages) = rule.stages()
            && !stages.contains(stage)
        {
            let _ = writeln!(out, "  foreign   {}: chain '{stages}' does not include {stage}", rule.source());
        }
    }

    out
}
