//! # NFe Subcommand
//!
//! `fisco nfe extract <file>` prints the extracted invoice;
//! `fisco nfe batch <files…>` prints per-document status, or with
//! `--report` the DIFAL per invoice and consolidated totals.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Args, Subcommand};
use fisco_engine::FiscalEngine;
use fisco_nfe::{extract, process_batch, report_batch};

use crate::print_json;

/// Arguments for `fisco nfe`.
#[derive(Args, Debug)]
pub struct NfeArgs {
    /// NFe operation.
    #[command(subcommand)]
    pub command: NfeCommand,
}

/// NFe operations.
#[derive(Subcommand, Debug)]
pub enum NfeCommand {
    /// Extract one document.
    Extract {
        /// NFe XML file.
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },
    /// Process several documents in order.
    Batch {
        /// NFe XML files.
        #[arg(value_name = "FILES", required = true)]
        files: Vec<PathBuf>,

        /// Compute DIFAL for the processed invoices and consolidate.
        #[arg(long)]
        report: bool,
    },
}

/// Execute `fisco nfe`.
pub fn run_nfe(args: &NfeArgs, engine: &FiscalEngine) -> Result<u8> {
    match &args.command {
        NfeCommand::Extract { file } => {
            let xml = read(file)?;
            let invoice = extract(&xml).with_context(|| format!("{}", file.display()))?;
            print_json(&invoice)
        }
        NfeCommand::Batch { files, report } => {
            let documents = files.iter().map(|f| read(f)).collect::<Result<Vec<_>>>()?;
            tracing::info!(documents = documents.len(), "processing NFe batch");
            if *report {
                print_json(&report_batch(&documents, &engine.config().rates, Utc::now()))
            } else {
                print_json(&process_batch(&documents))
            }
        }
    }
}

fn read(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Cli, Commands};
    use clap::Parser;

    const NFE: &str = r#"<NFe><infNFe Id="NFe123">
<emit><enderEmit><UF>SP</UF></enderEmit></emit>
<dest><enderDest><UF>PE</UF></enderDest></dest>
<total><ICMSTot><vNF>1000.00</vNF></ICMSTot></total>
</infNFe></NFe>"#;

    fn nfe_args(argv: &[&str]) -> NfeArgs {
        let mut full = vec!["fisco", "nfe"];
        full.extend_from_slice(argv);
        match Cli::try_parse_from(full).unwrap().command {
            Commands::Nfe(args) => args,
            other => panic!("expected nfe, got {other:?}"),
        }
    }

    #[test]
    fn extract_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nota.xml");
        std::fs::write(&path, NFE).unwrap();
        let args = nfe_args(&["extract", path.to_str().unwrap()]);
        assert_eq!(run_nfe(&args, &FiscalEngine::default()).unwrap(), 0);
    }

    #[test]
    fn extract_rejects_non_invoice() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pagina.xml");
        std::fs::write(&path, "<html><body/></html>").unwrap();
        let args = nfe_args(&["extract", path.to_str().unwrap()]);
        let err = run_nfe(&args, &FiscalEngine::default()).unwrap_err();
        assert!(format!("{err:#}").contains("XML não é uma NFe válida"));
    }

    #[test]
    fn batch_tolerates_bad_documents() {
        let dir = tempfile::tempdir().unwrap();
        let good = dir.path().join("a.xml");
        let bad = dir.path().join("b.xml");
        std::fs::write(&good, NFE).unwrap();
        std::fs::write(&bad, "<NFe/>").unwrap();
        let args = nfe_args(&["batch", good.to_str().unwrap(), bad.to_str().unwrap(), "--report"]);
        let NfeCommand::Batch { report, ref files } = args.command else {
            panic!("expected batch");
        };
        assert!(report);
        assert_eq!(files.len(), 2);
        assert_eq!(run_nfe(&args, &FiscalEngine::default()).unwrap(), 0);
    }

    #[test]
    fn batch_fails_on_missing_file() {
        let args = nfe_args(&["batch", "/nonexistent/nota.xml"]);
        let err = run_nfe(&args, &FiscalEngine::default()).unwrap_err();
        assert!(err.to_string().contains("failed to read"));
    }

    #[test]
    fn batch_requires_files() {
        assert!(Cli::try_parse_from(["fisco", "nfe", "batch"]).is_err());
    }
}
