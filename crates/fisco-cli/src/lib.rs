//! # fisco-cli: Command-Line Interface
//!
//! Runs the calculators and the NFe pipeline from the shell. Every
//! command prints pretty JSON on stdout; logs go to stderr.
//!
//! ## Subcommands
//!
//! - `fisco difal`: DIFAL, optionally comparing both methodologies.
//! - `fisco st`: ICMS-ST, optionally comparing original and adjusted MVA.
//! - `fisco mva`: agreed MVA for an NCM and route, or the whole table.
//! - `fisco retencoes`: federal withholding on a service invoice.
//! - `fisco transicao`: IBS/CBS transition blend.
//! - `fisco ibs-cbs`: full-rate IBS/CBS, optionally against today's load.
//! - `fisco nfe extract|batch`: NFe XML extraction and reporting.
//!
//! ```bash
//! fisco difal --valor 1000 --interestadual 12 --interna 17 --uf-destino SP
//! fisco -v --rates rates.yaml nfe batch notas/*.xml --report
//! ```
//!
//! Exit codes: 0 on success, 1 on rejected input or unreadable files,
//! 2 on usage errors.

pub mod calc;
pub mod nfe;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use fisco_engine::{EngineConfig, FiscalEngine};
use serde::Serialize;

use crate::calc::{DifalArgs, IbsCbsArgs, MvaArgs, RetencoesArgs, StArgs, TransicaoArgs};
use crate::nfe::NfeArgs;

/// Brazilian tax calculators with audit trails.
#[derive(Parser, Debug)]
#[command(name = "fisco", version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output. Repeat for more verbosity (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// YAML file overriding the statutory rate tables.
    #[arg(long, global = true, value_name = "YAML")]
    pub rates: Option<PathBuf>,

    /// Subcommand to run.
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level subcommands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// ICMS rate differential on interstate sales to final consumers.
    Difal(DifalArgs),

    /// ICMS tax substitution.
    St(StArgs),

    /// Agreed ST margin (MVA) by NCM and destination.
    Mva(MvaArgs),

    /// PIS/COFINS/CSLL/IRRF withheld on services.
    Retencoes(RetencoesArgs),

    /// Tax burden during the IBS/CBS transition.
    Transicao(TransicaoArgs),

    /// Full-rate IBS/CBS after the transition.
    IbsCbs(IbsCbsArgs),

    /// NFe XML extraction and batch reporting.
    Nfe(NfeArgs),
}

/// Run the parsed command. Returns the process exit code.
pub fn run(cli: &Cli) -> Result<u8> {
    let engine = FiscalEngine::new(load_config(cli.rates.as_deref())?);
    match &cli.command {
        Commands::Difal(args) => calc::run_difal(args, &engine),
        Commands::St(args) => calc::run_st(args, &engine),
        Commands::Mva(args) => calc::run_mva(args, &engine),
        Commands::Retencoes(args) => calc::run_retencoes(args, &engine),
        Commands::Transicao(args) => calc::run_transicao(args, &engine),
        Commands::IbsCbs(args) => calc::run_ibs_cbs(args, &engine),
        Commands::Nfe(args) => nfe::run_nfe(args, &engine),
    }
}

/// Load the engine configuration, defaulting to the statutory tables.
pub fn load_config(path: Option<&Path>) -> Result<EngineConfig> {
    match path {
        Some(path) => EngineConfig::load(path)
            .with_context(|| format!("failed to load rates from {}", path.display())),
        None => Ok(EngineConfig::default()),
    }
}

/// Print `value` as pretty JSON on stdout.
pub fn print_json<T: Serialize>(value: &T) -> Result<u8> {
    let out = serde_json::to_string_pretty(value).context("failed to serialize output")?;
    println!("{out}");
    Ok(0)
}

/// Parse a decimal argument, accepting Brazilian formatting (`1.234,56`).
pub fn parse_decimal(raw: &str) -> std::result::Result<f64, String> {
    fisco_core::normalize(raw).ok_or_else(|| format!("not a number: {raw}"))
}
