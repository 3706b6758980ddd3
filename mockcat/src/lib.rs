//! mockcat - Mock catalog ingestion and spectral template assignment
//!
//! Simulated sky catalogs ("mocks") come in many layouts. This crate turns
//! them into one columnar schema and prepares them for spectral synthesis:
//!
//! - **mockid** - 64-bit identifiers packing `(row, file)` of every object
//! - **readers** - One reader per mock format, behind [`CatalogReader`]
//! - **ingest** - Reads every source of a [`MockConfig`] in a fixed order
//! - **sample** - Mixture-model photometry for mocks without native colors
//! - **spectra** - Nearest-template assignment and spectra generation
//!
//! Table I/O goes through [`CatalogAccess`]; enable the `fits` feature for
//! the cfitsio-backed implementation.

pub mod access;
pub mod catalog;
pub mod config;
pub mod error;
pub mod ingest;
pub mod mockid;
pub mod readers;
pub mod sample;
pub mod sky;
pub mod spectra;
pub mod table;

pub use access::{CatalogAccess, MemoryAccess};
pub use catalog::{MockCatalog, ObjectClass, ShapeColumns, TemplateSubtype};
pub use config::{IngestParams, MockConfig, SourceConfig};
pub use error::{MockError, Result};
pub use ingest::{load_all_mocks, log_mock_info};
pub use mockid::{decode_rownum_filenum, encode_rownum_filenum, make_mockid};
pub use readers::{CatalogReader, MockContext, MockFormat, ReadRequest};
pub use sample::SampleGmm;
pub use sky::{Bricks, RegionNamer, SkyBounds};
pub use spectra::{MockSpectra, SpectrumSynthesizer, TemplateIndex, TemplateLibraries};

#[cfg(feature = "fits")]
pub use access::FitsAccess;
