//! # Calculator Subcommands
//!
//! `difal`, `st`, `mva`, `retencoes`, `transicao` and `ibs-cbs`. Each
//! builds the typed engine input from flags, runs the audited calculation
//! and prints it.

use anyhow::{bail, Result};
use clap::Args;
use fisco_core::Uf;
use fisco_engine::{
    icms_st, DifalInput, FiscalEngine, IcmsStInput, Methodology, OperationType, RateTable,
    ReformInput, WithholdingInput,
};

use crate::{parse_decimal, print_json};

// -- DIFAL --------------------------------------------------------------------

/// Parsed `--metodologia`: `None` means `auto`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MethodologySelector(pub Option<Methodology>);

fn parse_methodology(raw: &str) -> std::result::Result<MethodologySelector, String> {
    Methodology::parse_selector("metodologia", raw)
        .map(MethodologySelector)
        .map_err(|e| e.to_string())
}

/// Arguments for `fisco difal`.
#[derive(Args, Debug)]
pub struct DifalArgs {
    /// Operation value.
    #[arg(long, value_parser = parse_decimal)]
    pub valor: f64,

    /// Interstate ICMS rate (%). Defaults to the rate between the UFs.
    #[arg(long, value_parser = parse_decimal)]
    pub interestadual: Option<f64>,

    /// Destination internal ICMS rate (%). Defaults to the destination's rate.
    #[arg(long, value_parser = parse_decimal)]
    pub interna: Option<f64>,

    /// FCP rate (%).
    #[arg(long, value_parser = parse_decimal, default_value = "0")]
    pub fcp: f64,

    /// Destination UF.
    #[arg(long)]
    pub uf_destino: Uf,

    /// Origin UF.
    #[arg(long)]
    pub uf_origem: Option<Uf>,

    /// `base_dupla`, `base_unica` or `auto`.
    #[arg(long, value_parser = parse_methodology, default_value = "auto")]
    pub metodologia: MethodologySelector,

    /// Run both methodologies and print the comparison.
    #[arg(long)]
    pub compare: bool,
}

impl DifalArgs {
    /// Build the engine input, filling omitted rates from `rates`.
    pub fn input(&self, rates: &RateTable) -> DifalInput {
        let interestadual = self
            .interestadual
            .unwrap_or_else(|| rates.interstate_rate(self.uf_origem, self.uf_destino));
        let interna = self
            .interna
            .unwrap_or_else(|| rates.internal_rate(self.uf_destino));
        let mut input =
            DifalInput::new(self.valor, interestadual, interna, self.uf_destino).with_fcp(self.fcp);
        input.metodologia = self.metodologia.0;
        input.uf_origem = self.uf_origem;
        input
    }
}

/// Execute `fisco difal`.
pub fn run_difal(args: &DifalArgs, engine: &FiscalEngine) -> Result<u8> {
    let input = args.input(&engine.config().rates);
    if args.compare {
        print_json(&engine.difal().compare_methods(&input)?)
    } else {
        print_json(&engine.difal().calculate_with_memory(&input)?)
    }
}

// -- ICMS-ST ------------------------------------------------------------------

/// Arguments for `fisco st`.
#[derive(Args, Debug)]
pub struct StArgs {
    /// Product value.
    #[arg(long, value_parser = parse_decimal)]
    pub valor_produto: f64,

    /// MVA (%). Defaults to the agreed margin for `--ncm` into `--uf-destino`.
    #[arg(long, value_parser = parse_decimal, required_unless_present = "ncm")]
    pub mva: Option<f64>,

    /// Product NCM, used to look up the MVA.
    #[arg(long, requires = "uf_destino")]
    pub ncm: Option<String>,

    /// Destination internal ICMS rate (%). Defaults to the destination's rate.
    #[arg(long, value_parser = parse_decimal, required_unless_present = "uf_destino")]
    pub interna: Option<f64>,

    /// Destination UF.
    #[arg(long)]
    pub uf_destino: Option<Uf>,

    /// IPI.
    #[arg(long, value_parser = parse_decimal, default_value = "0")]
    pub ipi: f64,

    /// Freight.
    #[arg(long, value_parser = parse_decimal, default_value = "0")]
    pub frete: f64,

    /// Insurance.
    #[arg(long, value_parser = parse_decimal, default_value = "0")]
    pub seguro: f64,

    /// Other expenses.
    #[arg(long, value_parser = parse_decimal, default_value = "0")]
    pub outras: f64,

    /// Discount.
    #[arg(long, value_parser = parse_decimal, default_value = "0")]
    pub desconto: f64,

    /// Interstate ICMS rate (%). Required by `--compare-mva`.
    #[arg(long, value_parser = parse_decimal)]
    pub interestadual: Option<f64>,

    /// Compare the original MVA with the adjusted MVA.
    #[arg(long)]
    pub compare_mva: bool,
}

impl StArgs {
    /// Build the engine input, filling the MVA and internal rate from the
    /// engine's tables when omitted.
    pub fn input(&self, engine: &FiscalEngine) -> Result<IcmsStInput> {
        let mva = match (self.mva, &self.ncm, self.uf_destino) {
            (Some(mva), _, _) => mva,
            (None, Some(ncm), Some(uf)) => match engine.mva().margin(ncm, uf)? {
                Some(mva) => mva,
                None => bail!("NCM {ncm} has no agreed MVA; pass --mva"),
            },
            (None, _, _) => bail!("--mva or --ncm with --uf-destino is required"),
        };
        let interna = match (self.interna, self.uf_destino) {
            (Some(rate), _) => rate,
            (None, Some(uf)) => engine.config().rates.internal_rate(uf),
            (None, None) => bail!("--interna or --uf-destino is required"),
        };
        Ok(IcmsStInput {
            ipi: self.ipi,
            frete: self.frete,
            seguro: self.seguro,
            outras_despesas: self.outras,
            desconto: self.desconto,
            aliquota_interestadual: self.interestadual,
            uf_destino: self.uf_destino,
            ..IcmsStInput::new(self.valor_produto, mva, interna)
        })
    }
}

/// Execute `fisco st`.
pub fn run_st(args: &StArgs, engine: &FiscalEngine) -> Result<u8> {
    let input = args.input(engine)?;
    if args.compare_mva {
        print_json(&icms_st::compare_mva(&input)?)
    } else {
        print_json(&icms_st::calculate_with_memory(&input)?)
    }
}

// -- MVA ----------------------------------------------------------------------

/// Arguments for `fisco mva`.
#[derive(Args, Debug)]
pub struct MvaArgs {
    /// 8-digit NCM; dots are ignored.
    #[arg(long, required_unless_present = "listar")]
    pub ncm: Option<String>,

    /// Destination UF.
    #[arg(long, required_unless_present = "listar")]
    pub uf_destino: Option<Uf>,

    /// Origin UF.
    #[arg(long)]
    pub uf_origem: Option<Uf>,

    /// Print the whole MVA table instead.
    #[arg(long, conflicts_with_all = ["ncm", "uf_destino", "uf_origem"])]
    pub listar: bool,
}

/// Execute `fisco mva`.
pub fn run_mva(args: &MvaArgs, engine: &FiscalEngine) -> Result<u8> {
    match (&args.ncm, args.uf_destino) {
        (Some(ncm), Some(destino)) if !args.listar => {
            print_json(&engine.mva().lookup(ncm, destino, args.uf_origem)?)
        }
        _ => print_json(&engine.config().mva),
    }
}

// -- Withholding --------------------------------------------------------------

/// Arguments for `fisco retencoes`.
#[derive(Args, Debug)]
pub struct RetencoesArgs {
    /// Gross service value.
    #[arg(long, value_parser = parse_decimal)]
    pub valor: f64,

    /// Municipal service code.
    #[arg(long)]
    pub tipo_servico: Option<String>,

    /// Taker CPF/CNPJ.
    #[arg(long)]
    pub tomador: Option<String>,
}

impl RetencoesArgs {
    /// Build the engine input.
    pub fn input(&self) -> WithholdingInput {
        let mut input = WithholdingInput::new(self.valor);
        if let Some(tipo) = &self.tipo_servico {
            input.tipo_servico = tipo.clone();
        }
        input.cpf_cnpj_tomador = self.tomador.clone();
        input
    }
}

/// Execute `fisco retencoes`.
pub fn run_retencoes(args: &RetencoesArgs, engine: &FiscalEngine) -> Result<u8> {
    print_json(&engine.withholding().calculate_with_memory(&args.input())?)
}

// -- Transition ---------------------------------------------------------------

/// Arguments for `fisco transicao`.
#[derive(Args, Debug)]
pub struct TransicaoArgs {
    /// Operation value.
    #[arg(long, value_parser = parse_decimal)]
    pub valor: f64,

    /// Calendar year.
    #[arg(long, required_unless_present = "all_years")]
    pub ano: Option<i32>,

    /// `mercadoria` or `servico`.
    #[arg(long, default_value = "mercadoria")]
    pub tipo: OperationType,

    /// Compute every scheduled year.
    #[arg(long, conflicts_with = "ano")]
    pub all_years: bool,
}

/// Execute `fisco transicao`.
pub fn run_transicao(args: &TransicaoArgs, engine: &FiscalEngine) -> Result<u8> {
    let blender = engine.transition();
    match args.ano {
        Some(ano) if !args.all_years => print_json(&blender.calculate(args.valor, ano, args.tipo)?),
        _ => print_json(&blender.compare_years(args.valor, args.tipo)?),
    }
}

// -- IBS/CBS ------------------------------------------------------------------

/// Arguments for `fisco ibs-cbs`.
#[derive(Args, Debug)]
pub struct IbsCbsArgs {
    /// Operation value.
    #[arg(long, value_parser = parse_decimal)]
    pub valor: f64,

    /// Operation label.
    #[arg(long, default_value = "venda")]
    pub tipo: String,

    /// IBS rate (%). Defaults to the configured rate.
    #[arg(long, value_parser = parse_decimal)]
    pub aliquota_ibs: Option<f64>,

    /// CBS rate (%). Defaults to the configured rate.
    #[arg(long, value_parser = parse_decimal)]
    pub aliquota_cbs: Option<f64>,

    /// IBS credit on inputs.
    #[arg(long, value_parser = parse_decimal, default_value = "0")]
    pub credito_ibs: f64,

    /// CBS credit on inputs.
    #[arg(long, value_parser = parse_decimal, default_value = "0")]
    pub credito_cbs: f64,

    /// Compare against today's ICMS + PIS/COFINS.
    #[arg(long)]
    pub compare: bool,
}

impl IbsCbsArgs {
    /// Build the engine input.
    pub fn input(&self) -> ReformInput {
        ReformInput {
            tipo_operacao: self.tipo.clone(),
            aliquota_ibs: self.aliquota_ibs,
            aliquota_cbs: self.aliquota_cbs,
            credito_ibs: self.credito_ibs,
            credito_cbs: self.credito_cbs,
            ..ReformInput::new(self.valor)
        }
    }
}

/// Execute `fisco ibs-cbs`.
pub fn run_ibs_cbs(args: &IbsCbsArgs, engine: &FiscalEngine) -> Result<u8> {
    let blender = engine.transition();
    if args.compare {
        print_json(&blender.compare_current_vs_reform(&args.input())?)
    } else {
        print_json(&blender.reform(&args.input())?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Cli, Commands};
    use clap::Parser;

    fn parse(args: &[&str]) -> Commands {
        let mut argv = vec!["fisco"];
        argv.extend_from_slice(args);
        Cli::try_parse_from(argv).unwrap().command
    }

    #[test]
    fn difal_flags_build_input() {
        let Commands::Difal(args) = parse(&[
            "difal", "--valor", "1.000,00", "--interestadual", "12", "--interna", "17",
            "--uf-destino", "es", "--metodologia", "base_unica",
        ]) else {
            panic!("expected difal");
        };
        let engine = FiscalEngine::default();
        let input = args.input(&engine.config().rates);
        assert_eq!(input.valor_operacao, 1000.0);
        assert_eq!(input.uf_destino, Uf::Es);
        assert_eq!(input.metodologia, Some(Methodology::BaseUnica));
        let r = engine.difal().calculate(&input).unwrap();
        assert_eq!(r.difal, 50.0);
    }

    #[test]
    fn difal_rates_default_from_table() {
        let Commands::Difal(args) = parse(&[
            "difal", "--valor", "500", "--uf-origem", "SP", "--uf-destino", "BA",
        ]) else {
            panic!("expected difal");
        };
        let rates = RateTable::default();
        let input = args.input(&rates);
        assert_eq!(input.aliquota_interestadual, 7.0);
        assert_eq!(input.aliquota_interna, rates.internal_rate(Uf::Ba));
        assert_eq!(input.metodologia, None);
    }

    #[test]
    fn difal_unknown_methodology_is_a_usage_error() {
        let err = Cli::try_parse_from([
            "fisco", "difal", "--valor", "500", "--uf-destino", "RJ", "--metodologia", "nenhuma",
        ])
        .unwrap_err();
        assert_eq!(err.exit_code(), 2);
        assert!(err.to_string().contains("metodologia"));
    }

    #[test]
    fn difal_explicit_auto_methodology() {
        let Commands::Difal(args) = parse(&[
            "difal", "--valor", "500", "--uf-destino", "RJ", "--metodologia", "AUTO",
        ]) else {
            panic!("expected difal");
        };
        assert_eq!(args.metodologia, MethodologySelector(None));
    }

    #[test]
    fn difal_unknown_uf_is_a_usage_error() {
        let err = Cli::try_parse_from(["fisco", "difal", "--valor", "1", "--uf-destino", "XX"])
            .unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn st_flags_build_input() {
        let Commands::St(args) = parse(&[
            "st", "--valor-produto", "1000", "--mva", "40", "--interna", "18", "--frete", "50",
        ]) else {
            panic!("expected st");
        };
        let input = args.input(&FiscalEngine::default()).unwrap();
        assert_eq!(input.frete, 50.0);
        assert_eq!(input.aliquota_interestadual, None);
        let r = icms_st::calculate(&input).unwrap();
        assert_eq!(r.base_operacao, 1050.0);
    }

    #[test]
    fn st_mva_and_rate_from_tables() {
        let Commands::St(args) = parse(&[
            "st", "--valor-produto", "1000", "--ncm", "4011.10.00", "--uf-destino", "BA",
        ]) else {
            panic!("expected st");
        };
        let input = args.input(&FiscalEngine::default()).unwrap();
        assert_eq!(input.mva, 45.0);
        assert_eq!(input.aliquota_interna, 20.5);
        assert_eq!(icms_st::calculate(&input).unwrap().icms_st, 92.25);

        let Commands::St(unlisted) = parse(&[
            "st", "--valor-produto", "1000", "--ncm", "99999999", "--uf-destino", "BA",
        ]) else {
            panic!("expected st");
        };
        assert!(unlisted.input(&FiscalEngine::default()).is_err());

        assert!(Cli::try_parse_from(["fisco", "st", "--valor-produto", "1000", "--interna", "18"])
            .is_err());
        assert!(Cli::try_parse_from([
            "fisco", "st", "--valor-produto", "1000", "--ncm", "40111000", "--interna", "18"
        ])
        .is_err());
    }

    #[test]
    fn st_compare_needs_interstate_rate() {
        let Commands::St(args) = parse(&[
            "st", "--valor-produto", "1000", "--mva", "40", "--interna", "18", "--compare-mva",
        ]) else {
            panic!("expected st");
        };
        assert!(run_st(&args, &FiscalEngine::default()).is_err());
    }

    #[test]
    fn mva_lookup_or_listing() {
        let Commands::Mva(args) = parse(&[
            "mva", "--ncm", "40111000", "--uf-destino", "BA", "--uf-origem", "SP",
        ]) else {
            panic!("expected mva");
        };
        assert_eq!(run_mva(&args, &FiscalEngine::default()).unwrap(), 0);

        let Commands::Mva(list) = parse(&["mva", "--listar"]) else {
            panic!("expected mva");
        };
        assert!(list.listar);
        assert_eq!(run_mva(&list, &FiscalEngine::default()).unwrap(), 0);

        assert!(Cli::try_parse_from(["fisco", "mva", "--ncm", "40111000"]).is_err());
        assert!(Cli::try_parse_from(["fisco", "mva", "--listar", "--ncm", "40111000"]).is_err());
    }

    #[test]
    fn mva_short_ncm_fails_at_run() {
        let Commands::Mva(args) = parse(&["mva", "--ncm", "4011", "--uf-destino", "BA"]) else {
            panic!("expected mva");
        };
        let err = run_mva(&args, &FiscalEngine::default()).unwrap_err();
        assert!(err.to_string().contains("ncm"));
    }

    #[test]
    fn ibs_cbs_flags_build_input() {
        let Commands::IbsCbs(args) = parse(&[
            "ibs-cbs", "--valor", "1.000,00", "--credito-cbs", "20", "--credito-ibs", "50",
        ]) else {
            panic!("expected ibs-cbs");
        };
        let input = args.input();
        assert_eq!(input.tipo_operacao, "venda");
        assert_eq!(input.aliquota_ibs, None);
        let engine = FiscalEngine::default();
        let r = engine.transition().reform(&input).unwrap().resultado;
        assert_eq!(r.total, 195.0);
        assert_eq!(run_ibs_cbs(&args, &engine).unwrap(), 0);
    }

    #[test]
    fn retencoes_flags_build_input() {
        let Commands::Retencoes(args) = parse(&[
            "retencoes", "--valor", "1000", "--tipo-servico", "1.05", "--tomador", "12345678000199",
        ]) else {
            panic!("expected retencoes");
        };
        let input = args.input();
        assert_eq!(input.tipo_servico, "1.05");
        assert_eq!(input.cpf_cnpj_tomador.as_deref(), Some("12345678000199"));
        assert_eq!(run_retencoes(&args, &FiscalEngine::default()).unwrap(), 0);
    }

    #[test]
    fn transicao_requires_year_or_sweep() {
        assert!(Cli::try_parse_from(["fisco", "transicao", "--valor", "1000"]).is_err());
        assert!(Cli::try_parse_from([
            "fisco", "transicao", "--valor", "1000", "--ano", "2030", "--all-years"
        ])
        .is_err());

        let Commands::Transicao(args) = parse(&[
            "transicao", "--valor", "1000", "--all-years", "--tipo", "servico",
        ]) else {
            panic!("expected transicao");
        };
        assert_eq!(args.tipo, OperationType::Servico);
        assert_eq!(run_transicao(&args, &FiscalEngine::default()).unwrap(), 0);
    }

    #[test]
    fn transicao_rejects_zero_value() {
        let Commands::Transicao(args) = parse(&["transicao", "--valor", "0", "--ano", "2029"])
        else {
            panic!("expected transicao");
        };
        assert!(run_transicao(&args, &FiscalEngine::default()).is_err());
    }
}
