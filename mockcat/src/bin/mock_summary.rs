use std::path::PathBuf;

use clap::Parser;
use mockcat::{
    load_all_mocks, log_mock_info, Bricks, FitsAccess, IngestParams, MockConfig, MockContext,
    SampleGmm,
};
use rand::rngs::StdRng;
use rand::SeedableRng;

/// Command line arguments for the mock summary
#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Read every configured mock and summarize what was ingested"
)]
struct Args {
    /// JSON file mapping source names to mock locations
    #[arg(short, long)]
    config: PathBuf,

    /// Seed for the shared random source
    #[arg(short, long, default_value_t = 1)]
    seed: u64,

    /// Brick size in degrees
    #[arg(long, default_value_t = mockcat::config::DEFAULT_BRICKSIZE)]
    bricksize: f64,

    /// Worker threads for multi-file mocks
    #[arg(long, default_value_t = 1)]
    nproc: usize,

    /// Directory of `<class>_gmm.json` mixture models
    #[arg(long)]
    gmm_dir: Option<PathBuf>,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let args = Args::parse();

    let config = MockConfig::load_from_file(&args.config)?;
    log_mock_info(&config);
    let params = IngestParams {
        bricksize: args.bricksize,
        nproc: args.nproc,
    };

    let mixtures = match &args.gmm_dir {
        Some(dir) => Some(SampleGmm::load_dir(dir)?),
        None => None,
    };
    let mut ctx = MockContext::new(&FitsAccess, &Bricks);
    if let Some(mixtures) = &mixtures {
        ctx = ctx.with_mixtures(mixtures);
    }

    let mut rng = StdRng::seed_from_u64(args.seed);
    let mocks = load_all_mocks(&config, &params, &ctx, &mut rng)?;

    println!("Mock summary");
    println!("============");
    for (name, cat) in &mocks {
        println!(
            "{:<12} {:>10} objects {:>5} files  {}/{}  filter={}",
            name,
            cat.len(),
            cat.files.len(),
            cat.true_spectype,
            cat.template_type,
            cat.filtername.as_deref().unwrap_or("-")
        );
    }
    Ok(())
}
