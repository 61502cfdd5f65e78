//! # NFe Field Extraction
//!
//! Projects an NFe (SEFAZ layout 4.00) onto [`ExtractedInvoice`]. The
//! document root is `nfeProc > NFe > infNFe` for authorized invoices or
//! `NFe > infNFe` for bare ones.
//!
//! Extraction is lenient below `infNFe`: absent nodes become `None` or
//! zero, and unparseable numbers or UF codes are logged and dropped.

use chrono::NaiveDate;
use fisco_core::numeric::non_negative;
use fisco_core::{normalize, ParseError, Uf, ValidationError};
use fisco_engine::{DifalInput, RateTable};
use serde::{Deserialize, Serialize};

use crate::xml::Element;

/// How the recipient uses an item, inferred from its CFOP.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemUsage {
    /// Use and consumption (x556, x407).
    UsoConsumo,
    /// Fixed assets (x551, x406).
    AtivoImobilizado,
    /// Resale, and anything unclassified.
    Revenda,
}

const USO_CONSUMO: [u32; 6] = [1556, 2556, 3556, 1407, 2407, 3407];
const ATIVO_IMOBILIZADO: [u32; 6] = [1551, 2551, 3551, 1406, 2406, 3406];

impl ItemUsage {
    /// Classify a CFOP code.
    pub fn from_cfop(cfop: Option<&str>) -> Self {
        match cfop.and_then(|c| c.trim().parse::<u32>().ok()) {
            Some(code) if USO_CONSUMO.contains(&code) => Self::UsoConsumo,
            Some(code) if ATIVO_IMOBILIZADO.contains(&code) => Self::AtivoImobilizado,
            _ => Self::Revenda,
        }
    }

    /// Return the string representation of this usage.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::UsoConsumo => "uso_consumo",
            Self::AtivoImobilizado => "ativo_imobilizado",
            Self::Revenda => "revenda",
        }
    }
}

impl std::fmt::Display for ItemUsage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Issuer or recipient.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Party {
    /// CNPJ, or CPF when there is no CNPJ.
    pub documento: Option<String>,
    /// Corporate or personal name.
    pub nome: Option<String>,
    /// Address UF.
    pub uf: Option<Uf>,
}

/// One `det` line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceItem {
    /// `nItem`, or the 1-based position when absent.
    pub numero: u32,
    /// Product code.
    pub codigo: String,
    /// Product description.
    pub descricao: String,
    /// NCM tariff code.
    pub ncm: String,
    /// CFOP operation code.
    pub cfop: String,
    /// Commercial quantity.
    pub quantidade: f64,
    /// Unit price.
    pub valor_unitario: f64,
    /// Line total.
    pub valor_total: f64,
    /// ICMS rate (%) of the item, zero when absent.
    #[serde(rename = "aliquotaICMS")]
    pub aliquota_icms: f64,
    /// Inferred usage.
    pub finalidade: ItemUsage,
}

/// Normalized projection of an NFe.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractedInvoice {
    /// 44-digit access key (`Id` without the `NFe` prefix).
    pub chave_acesso: Option<String>,
    /// Issue date.
    pub data_emissao: Option<NaiveDate>,
    /// Issuer UF.
    pub uf_origem: Option<Uf>,
    /// Recipient UF.
    pub uf_destino: Option<Uf>,
    /// Invoice total (`vNF`).
    pub valor_operacao: f64,
    /// Products total (`vProd`).
    pub valor_produtos: f64,
    /// ICMS rate (%) of the first item.
    #[serde(rename = "aliquotaICMS")]
    pub aliquota_icms: Option<f64>,
    /// Items in document order.
    pub itens: Vec<InvoiceItem>,
    /// Issuer.
    pub emitente: Party,
    /// Recipient.
    pub destinatario: Party,
}

impl ExtractedInvoice {
    /// Whether origin, destination, and a positive value are all present.
    pub fn is_complete(&self) -> bool {
        self.uf_origem.is_some() && self.uf_destino.is_some() && self.valor_operacao > 0.0
    }

    /// Build a DIFAL input. The document's ICMS rate is the interstate
    /// rate when present; everything else comes from `rates`.
    pub fn to_difal_input(&self, rates: &RateTable) -> Result<DifalInput, ValidationError> {
        let destino = self.uf_destino.ok_or(ValidationError::Missing {
            field: "ufDestino",
        })?;
        let valor = non_negative("valorOperacao", self.valor_operacao)?;
        let interestadual = self
            .aliquota_icms
            .unwrap_or_else(|| rates.interstate_rate(self.uf_origem, destino));

        let mut input = DifalInput::new(valor, interestadual, rates.internal_rate(destino), destino)
            .with_fcp(rates.fcp_rate(destino));
        input.uf_origem = self.uf_origem;
        Ok(input)
    }
}

/// Parse an NFe document.
pub fn extract(xml: &str) -> Result<ExtractedInvoice, ParseError> {
    let root = Element::parse(xml)?;
    let nfe = match root.name() {
        "NFe" => Some(&root),
        "nfeProc" => root.child("NFe"),
        _ => None,
    }
    .ok_or(ParseError::NotAnInvoice)?;
    let inf = nfe.child("infNFe").ok_or(ParseError::MissingInvoiceInfo)?;

    let uf_origem = uf_at(inf, &["emit", "enderEmit", "UF"]);
    let uf_destino = uf_at(inf, &["dest", "enderDest", "UF"]);
    let itens: Vec<InvoiceItem> = inf
        .children("det")
        .enumerate()
        .map(|(index, det)| item(index, det))
        .collect();

    let invoice = ExtractedInvoice {
        chave_acesso: inf
            .attr("Id")
            .map(|id| id.strip_prefix("NFe").unwrap_or(id).to_string()),
        data_emissao: issue_date(inf),
        uf_origem,
        uf_destino,
        valor_operacao: number_at(inf, &["total", "ICMSTot", "vNF"]).unwrap_or(0.0),
        valor_produtos: number_at(inf, &["total", "ICMSTot", "vProd"]).unwrap_or(0.0),
        aliquota_icms: inf.child("det").and_then(icms_rate),
        itens,
        emitente: party(inf.child("emit"), uf_origem),
        destinatario: party(inf.child("dest"), uf_destino),
    };
    tracing::debug!(
        chave = invoice.chave_acesso.as_deref().unwrap_or(""),
        itens = invoice.itens.len(),
        "extracted NFe"
    );
    Ok(invoice)
}

fn item(index: usize, det: &Element) -> InvoiceItem {
    let prod = det.child("prod");
    let text = |name: &str| {
        prod.and_then(|p| p.text_at(&[name]))
            .unwrap_or_default()
            .to_string()
    };
    let number = |name: &str| prod.and_then(|p| number_at(p, &[name])).unwrap_or(0.0);
    let position = u32::try_from(index + 1).unwrap_or(u32::MAX);
    let cfop = text("CFOP");

    InvoiceItem {
        numero: det
            .attr("nItem")
            .and_then(|n| n.trim().parse().ok())
            .unwrap_or(position),
        codigo: text("cProd"),
        descricao: text("xProd"),
        ncm: text("NCM"),
        finalidade: ItemUsage::from_cfop(Some(cfop.as_str())),
        cfop,
        quantidade: number("qCom"),
        valor_unitario: number("vUnCom"),
        valor_total: number("vProd"),
        aliquota_icms: icms_rate(det).unwrap_or(0.0),
    }
}

/// `imposto > ICMS > (ICMS00 | ICMS20 | ...) > pICMS`
fn icms_rate(det: &Element) -> Option<f64> {
    let variant = det.find(&["imposto", "ICMS"])?.first_element()?;
    number_at(variant, &["pICMS"])
}

fn party(node: Option<&Element>, uf: Option<Uf>) -> Party {
    let text = |name: &str| node.and_then(|n| n.text_at(&[name])).map(str::to_string);
    Party {
        documento: text("CNPJ").or_else(|| text("CPF")),
        nome: text("xNome"),
        uf,
    }
}

fn issue_date(inf: &Element) -> Option<NaiveDate> {
    let raw = inf
        .text_at(&["ide", "dhEmi"])
        .or_else(|| inf.text_at(&["ide", "dEmi"]))?;
    let day = raw.get(..10).unwrap_or(raw);
    match NaiveDate::parse_from_str(day, "%Y-%m-%d") {
        Ok(date) => Some(date),
        Err(_) => {
            tracing::warn!(value = raw, "unparseable NFe issue date");
            None
        }
    }
}

fn uf_at(node: &Element, path: &[&str]) -> Option<Uf> {
    let raw = node.text_at(path)?;
    match raw.parse::<Uf>() {
        Ok(uf) => Some(uf),
        Err(_) => {
            tracing::warn!(value = raw, path = ?path, "unknown UF in NFe");
            None
        }
    }
}

fn number_at(node: &Element, path: &[&str]) -> Option<f64> {
    let raw = node.text_at(path)?;
    let value = normalize(raw);
    if value.is_none() {
        tracing::warn!(value = raw, path = ?path, "unparseable number in NFe");
    }
    value
}

#[cfg(test)]
pub(crate) mod fixtures {
    /// An authorized interstate sale, SP → BA, two items.
    pub const AUTHORIZED: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<nfeProc xmlns="http://www.portalfiscal.inf.br/nfe" versao="4.00">
  <NFe>
    <infNFe Id="NFe35240312345678000199550010000012341000012345" versao="4.00">
      <ide><dhEmi>2024-03-15T10:30:00-03:00</dhEmi></ide>
      <emit>
        <CNPJ>12345678000199</CNPJ>
        <xNome>Distribuidora Paulista Ltda</xNome>
        <enderEmit><UF>SP</UF></enderEmit>
      </emit>
      <dest>
        <CPF>12345678909</CPF>
        <xNome>Maria Souza</xNome>
        <enderDest><UF>BA</UF></enderDest>
      </dest>
      <det nItem="1">
        <prod>
          <cProd>A-01</cProd><xProd>Notebook</xProd><NCM>84713012</NCM><CFOP>6108</CFOP>
          <qCom>1.0000</qCom><vUnCom>800.00</vUnCom><vProd>800.00</vProd>
        </prod>
        <imposto><ICMS><ICMS00><orig>0</orig><CST>00</CST><pICMS>7.00</pICMS></ICMS00></ICMS></imposto>
      </det>
      <det nItem="2">
        <prod>
          <cProd>B-02</cProd><xProd>Cadeira</xProd><NCM>94013000</NCM><CFOP>2556</CFOP>
          <qCom>2.0000</qCom><vUnCom>100.00</vUnCom><vProd>200.00</vProd>
        </prod>
        <imposto><ICMS><ICMS20><pICMS>7.00</pICMS></ICMS20></ICMS></imposto>
      </det>
      <total><ICMSTot><vProd>1000.00</vProd><vNF>1000.00</vNF></ICMSTot></total>
    </infNFe>
  </NFe>
</nfeProc>"#;

    /// Bare NFe with no recipient address.
    pub const NO_DESTINATION: &str = r#"<NFe>
  <infNFe Id="NFe999">
    <emit><CNPJ>11111111000111</CNPJ><enderEmit><UF>PR</UF></enderEmit></emit>
    <total><ICMSTot><vNF>500,00</vNF></ICMSTot></total>
  </infNFe>
</NFe>"#;

    /// NFe element without infNFe.
    pub const NO_INF_NFE: &str = "<NFe><signature/></NFe>";
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// Arbitrary input yields a value or a ParseError, never a panic.
        #[test]
        fn extract_is_total(doc in ".{0,200}") {
            let _ = extract(&doc);
        }

        /// Only the x556/x407/x551/x406 families leave resale.
        #[test]
        fn unlisted_cfops_are_resale(code in 1000u32..8000) {
            let usage = ItemUsage::from_cfop(Some(&code.to_string()));
            let listed = USO_CONSUMO.contains(&code) || ATIVO_IMOBILIZADO.contains(&code);
            prop_assert_eq!(usage == ItemUsage::Revenda, !listed);
        }
    }
}
