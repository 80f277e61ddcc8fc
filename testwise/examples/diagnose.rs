//! Testwise Example Analyses
//!
//! Runs the pipeline on two synthetic designs and prints the human report.
//!
//! Run with:
//!   cargo run --example diagnose                 # Ideal two-group case
//!   cargo run --example diagnose -- messy        # Skewed repeated measures
//!   cargo run --example diagnose -- messy json   # Same, as JSON

use testwise::prelude::*;
use testwise::synthetic::{HierarchicalDesign, hierarchical_table, two_group_table};
use testwise::{format_human_output, generate_json_report};

fn main() -> anyhow::Result<()> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let messy = args.iter().any(|a| a == "messy");
    let json = args.iter().any(|a| a == "json");

    let grouped = if messy {
        // 20 subjects x 10 trials, log-normal noise
        let table = hierarchical_table(42, &HierarchicalDesign::default())?;
        GroupedSample::new(&table, "Value", Some("Condition"), Some("SubjectID"))?
    } else {
        // Reaction times: Control ~ N(300, 30), Treatment ~ N(320, 30)
        let table = two_group_table(42, 50, (300.0, 320.0), 30.0)?;
        GroupedSample::new(&table, "RT", Some("Group"), None)?
    };

    let report = analyze(&grouped, &PipelineConfig::default());
    if json {
        println!("{}", generate_json_report(&report)?);
    } else {
        print!("{}", format_human_output(&report));
    }
    Ok(())
}
