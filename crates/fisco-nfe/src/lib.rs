#![deny(missing_docs)]

//! # fisco-nfe: Electronic Invoice Ingestion
//!
//! Reads NFe XML into the inputs the calculators need.
//!
//! - [`xml`]: owned element tree over `quick_xml`.
//! - [`extract`]: the NFe projection ([`ExtractedInvoice`]).
//! - [`batch`]: sequential multi-document extraction with per-document
//!   status.
//! - [`report`]: DIFAL per invoice, consolidated totals, and GNRE data.
//!
//! Parsing is synchronous; async callers should run it on a blocking
//! thread.

pub mod batch;
pub mod extract;
pub mod report;
pub mod xml;

pub use batch::{process_batch, BatchEntry, BatchReport};
pub use extract::{extract, ExtractedInvoice, InvoiceItem, ItemUsage, Party};
pub use report::{
    invoice_difal, report_batch, BatchDifalReport, ConsolidatedReport, GnreGuide, InvoiceDifal,
    UfSummary,
};
