//! Reads every configured mock source into memory

use std::collections::BTreeMap;

use log::info;
use rand::Rng;

use crate::catalog::MockCatalog;
use crate::config::{IngestParams, MockConfig, SourceConfig};
use crate::error::Result;
use crate::readers::{CatalogReader, MockContext, ReadRequest};

/// Reader request for one configured source
pub fn request_for(source: &SourceConfig, params: &IngestParams) -> Result<ReadRequest> {
    let mut req = ReadRequest::new(source.mock_dir_name.clone(), source.target_class()?)
        .with_bricksize(params.bricksize)
        .with_nproc(params.nproc);
    req.bounds = source.bounds;
    req.magcut = source.magcut;
    req.forest = source.lya.clone();
    Ok(req)
}

/// Read all sources of `config`, in sorted source-name order
///
/// The same `rng` is threaded through every reader, so the result depends
/// only on its initial state and the configuration. The first failing source
/// aborts the run.
pub fn load_all_mocks<R: Rng + ?Sized>(
    config: &MockConfig,
    params: &IngestParams,
    ctx: &MockContext<'_>,
    rng: &mut R,
) -> Result<BTreeMap<String, MockCatalog>> {
    params.validate()?;
    let mut catalogs = BTreeMap::new();
    for (name, source) in &config.sources {
        info!(
            "Source: {}, target: {}, format: {}",
            name, source.target_name, source.format
        );
        info!("Reading {}", source.mock_dir_name.display());
        let req = request_for(source, params)?;
        let catalog = source.format.read(ctx, &req, rng)?;
        catalogs.insert(name.clone(), catalog);
    }
    info!("Loaded {} mock catalog(s).", catalogs.len());
    Ok(catalogs)
}

/// Log name, format, target and location of every source
pub fn log_mock_info(config: &MockConfig) {
    for (name, source) in &config.sources {
        info!(
            "{}: format={} target={} path={}",
            name,
            source.format,
            source.target_name,
            source.mock_dir_name.display()
        );
        if let Some(forest) = &source.lya {
            info!("{}: forest path={}", name, forest.mock_dir_name.display());
        }
    }
}
