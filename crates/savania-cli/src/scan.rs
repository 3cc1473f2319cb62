//! # Scan Subcommand
//!
//! Runs the advisory input guard over each argument, the way the contact
//! form is screened. Prints the first match with its excerpt, or the
//! entity-encoded text when nothing matches.

use anyhow::Result;
use clap::Args;
use savania_backoffice::guard::{sanitize_input, scan_fields};

use crate::EXIT_FINDINGS;

/// Arguments for the `savania scan` subcommand.
#[derive(Args, Debug)]
pub struct ScanArgs {
    /// Text to screen; each argument is checked as its own field.
    #[arg(required = true, value_name = "TEXT")]
    pub texts: Vec<String>,
}

/// Execute the scan subcommand. Exit 2 when any argument matches.
pub fn run_scan(args: &ScanArgs) -> Result<u8> {
    let labels: Vec<String> = (1..=args.texts.len()).map(|i| format!("arg{i}")).collect();
    let fields = labels
        .iter()
        .map(String::as_str)
        .zip(args.texts.iter().map(String::as_str));

    if let Some(finding) = scan_fields(fields) {
        tracing::warn!(field = %finding.field, "guard match");
        println!("BLOCKED {}: {}", finding.field, finding.excerpt);
        return Ok(EXIT_FINDINGS);
    }

    for text in &args.texts {
        println!("{}", sanitize_input(text));
    }
    Ok(0)
}
