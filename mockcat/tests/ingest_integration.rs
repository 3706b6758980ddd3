//! End-to-end ingestion and template assignment over in-memory mocks

use std::path::{Path, PathBuf};

use mock_math::{Covariances, GaussianMixtureModel, MixtureParams};
use mockcat::mockid::{decode_many, make_mockid};
use mockcat::spectra::{TemplateFamily, TemplateMeta};
use mockcat::table::{Column, ColumnTable};
use mockcat::{
    load_all_mocks, Bricks, IngestParams, MemoryAccess, MockConfig, MockContext, MockError,
    MockSpectra, ObjectClass, SampleGmm, SpectrumSynthesizer, TemplateIndex, TemplateLibraries,
};
use ndarray::Array2;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn f64s(values: &[f64]) -> Column {
    Column::F64(values.to_vec())
}

fn table(columns: &[(&str, Column)]) -> ColumnTable {
    let mut t = ColumnTable::new();
    for (name, column) in columns {
        t.insert(name, column.clone()).unwrap();
    }
    t
}

fn point_model(means: Vec<f64>) -> GaussianMixtureModel {
    GaussianMixtureModel::new(MixtureParams {
        weights: vec![1.0],
        means: vec![means],
        covariances: Covariances::Spherical(vec![1e-8]),
    })
    .unwrap()
}

fn mixtures() -> SampleGmm {
    let galaxy = vec![
        23.0, 22.5, 22.0, 21.0, 21.5, 19.0, 17.0, 0.4, 0.0, 0.0, 1.0, 0.0, 0.0,
    ];
    SampleGmm::new()
        .with_model(ObjectClass::Elg, point_model(galaxy))
        .unwrap()
        .with_model(
            ObjectClass::Qso,
            point_model(vec![22.0, 21.8, 21.5, 20.0, 19.5, 18.0, 16.0]),
        )
        .unwrap()
}

fn galaxia_file(ra: &[f64]) -> ColumnTable {
    let n = ra.len();
    table(&[
        ("RA", f64s(ra)),
        ("DEC", f64s(&vec![0.0; n])),
        ("V_HELIO", f64s(&vec![10.0; n])),
        ("SDSSR_TRUE_NODUST", f64s(&vec![18.0; n])),
        ("SDSSR_OBS", f64s(&vec![18.2; n])),
        ("TEFF", f64s(&vec![3.76; n])),
        ("LOGG", f64s(&vec![4.4; n])),
        ("FEH", f64s(&vec![0.0; n])),
    ])
}

fn wd_file() -> ColumnTable {
    table(&[
        ("RA", f64s(&[10.0, 50.0, 200.0])),
        ("DEC", f64s(&[0.0, 0.0, 0.0])),
        ("RADIALVELOCITY", f64s(&[0.0, 0.0, 0.0])),
        ("G_SDSS", f64s(&[18.0, 18.5, 19.0])),
        ("TEFF", f64s(&[29000.0, 8500.0, 12500.0])),
        ("LOGG", f64s(&[8.0, 8.0, 8.0])),
        (
            "SPECTRALTYPE",
            Column::Str(vec!["DB".into(), "da".into(), "DB".into()]),
        ),
    ])
}

fn grf_file() -> ColumnTable {
    table(&[
        ("RA", f64s(&[15.0, 25.0, 35.0])),
        ("DEC", f64s(&[1.0, 2.0, 3.0])),
        ("Z_COSMO", f64s(&[0.8, 1.0, 1.2])),
        ("DZ_RSD", f64s(&[0.0, 0.0, 0.0])),
    ])
}

/// Every mock and template library used below, registered in `galaxia_order`
fn access(galaxia_order: &[usize]) -> MemoryAccess {
    let mut access = MemoryAccess::new();
    let galaxia = [
        ("/mocks/galaxia/b/1/file_a.fits", galaxia_file(&[1.0, 2.0])),
        ("/mocks/galaxia/a/2/file_b.fits", galaxia_file(&[3.0])),
        ("/mocks/galaxia/c/0/file_c.fits", galaxia_file(&[4.0, 5.0, 6.0])),
    ];
    for &i in galaxia_order {
        access.insert_table(galaxia[i].0, galaxia[i].1.clone());
    }
    access.insert_table("/mocks/wd.fits", wd_file());
    access.insert_table("/mocks/grf/ELG.fits", grf_file());
    access.insert_table("/mocks/grf/QSO.fits", grf_file());
    access.insert_table(
        "/mocks/lya_forest.fits",
        table(&[
            ("RA", f64s(&[45.0, 55.0])),
            ("DEC", f64s(&[0.0, 0.0])),
            ("Z", f64s(&[2.4, 2.9])),
            ("MAG_G", f64s(&[21.9, 22.4])),
        ]),
    );

    let ids = |n: i64| Column::I64((0..n).collect());
    let decam = table(&[
        ("TEMPLATEID", ids(2)),
        ("Z", f64s(&[0.8, 1.2])),
        ("DECAM_G", f64s(&[23.0, 23.0])),
        ("DECAM_R", f64s(&[22.5, 22.5])),
        ("DECAM_Z", f64s(&[22.0, 22.0])),
    ]);
    access.insert_table(
        "/templates/bgs_templates.fits",
        table(&[
            ("TEMPLATEID", ids(1)),
            ("Z", f64s(&[0.2])),
            ("SDSS_ABSMAG_G01", f64s(&[-20.0])),
            ("SDSS_ABSMAG_R01", f64s(&[-21.0])),
        ]),
    );
    access.insert_table("/templates/elg_templates.fits", decam.clone());
    access.insert_table("/templates/lrg_templates.fits", decam);
    access.insert_table(
        "/templates/star_templates.fits",
        table(&[
            ("TEMPLATEID", ids(2)),
            ("TEFF", f64s(&[3500.0, 5750.0])),
            ("LOGG", f64s(&[4.8, 4.4])),
            ("FEH", f64s(&[0.0, 0.0])),
        ]),
    );
    access.insert_table(
        "/templates/wd_da_templates.fits",
        table(&[
            ("TEMPLATEID", ids(2)),
            ("TEFF", f64s(&[8000.0, 20000.0])),
            ("LOGG", f64s(&[8.0, 8.0])),
        ]),
    );
    access.insert_table(
        "/templates/wd_db_templates.fits",
        table(&[
            ("TEMPLATEID", Column::I64(vec![100, 101, 102])),
            ("TEFF", f64s(&[12000.0, 30000.0, 40000.0])),
            ("LOGG", f64s(&[8.0, 8.0, 8.0])),
        ]),
    );
    access.insert_table(
        "/templates/qso_templates.fits",
        table(&[("TEMPLATEID", Column::I64(vec![40, 41]))]),
    );
    access
}

const CONFIG: &str = r#"{
    "sources": {
        "ELG": {
            "format": "gaussianfield",
            "target_name": "ELG",
            "mock_dir_name": "/mocks/grf"
        },
        "MWS_MAIN": {
            "format": "galaxia",
            "target_name": "STAR",
            "mock_dir_name": "/mocks/galaxia",
            "magcut": 20.0
        },
        "MWS_WD": {
            "format": "wd",
            "target_name": "WD",
            "mock_dir_name": "/mocks/wd.fits",
            "bounds": [0.0, 100.0, -90.0, 90.0]
        },
        "QSO": {
            "format": "gaussianfield",
            "target_name": "QSO",
            "mock_dir_name": "/mocks/grf",
            "LYA": {"mock_dir_name": "/mocks/lya_forest.fits"}
        }
    }
}"#;

/// Fills every pixel with the template id
struct IdSynth {
    wave: Vec<f64>,
}

impl SpectrumSynthesizer for IdSynth {
    fn wavelength(&self) -> &[f64] {
        &self.wave
    }

    fn synthesize(
        &self,
        _family: &TemplateFamily,
        meta: &TemplateMeta,
    ) -> mockcat::Result<Array2<f64>> {
        Ok(Array2::from_shape_fn(
            (meta.len(), self.wave.len()),
            |(i, _)| meta.template_id[i] as f64,
        ))
    }
}

#[test]
fn test_ingest_all_sources() {
    init_logging();
    let access = access(&[0, 1, 2]);
    let gmm = mixtures();
    let ctx = MockContext::new(&access, &Bricks).with_mixtures(&gmm);
    let config: MockConfig = serde_json::from_str(CONFIG).unwrap();
    let mut rng = ChaCha8Rng::seed_from_u64(2024);

    let mocks = load_all_mocks(&config, &IngestParams::default(), &ctx, &mut rng).unwrap();
    assert_eq!(mocks.len(), 4);
    for cat in mocks.values() {
        cat.validate().unwrap();
    }

    let wd = &mocks["MWS_WD"];
    assert_eq!(wd.ra, vec![10.0, 50.0]);

    let stars = &mocks["MWS_MAIN"];
    assert_eq!(stars.len(), 6);
    assert_eq!(stars.n_per_file, vec![2, 1, 3]);

    let qso = &mocks["QSO"];
    assert_eq!(qso.len(), 5);
    assert_eq!(qso.n_per_file, vec![3, 2]);
    assert_eq!(
        qso.origin_file(4).unwrap(),
        &PathBuf::from("/mocks/lya_forest.fits")
    );
    assert_eq!(qso.template_subtype.get(3), "LYA");
    assert_eq!(qso.mag.as_ref().unwrap()[4], 22.4);

    let elg = &mocks["ELG"];
    assert!(elg.shapes.is_some());
    assert!((elg.gr.as_ref().unwrap()[0] - 0.5).abs() < 1e-3);
}

#[test]
fn test_galaxia_order_does_not_depend_on_discovery() {
    init_logging();
    let config: MockConfig = serde_json::from_str(CONFIG).unwrap();
    let mut single = MockConfig::default();
    single
        .sources
        .insert("MWS_MAIN".into(), config.sources["MWS_MAIN"].clone());

    let read = |order: &[usize], nproc: usize| {
        let access = access(order);
        let ctx = MockContext::new(&access, &Bricks);
        let params = IngestParams {
            nproc,
            ..Default::default()
        };
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        load_all_mocks(&single, &params, &ctx, &mut rng).unwrap()["MWS_MAIN"].clone()
    };

    let reference = read(&[0, 1, 2], 1);
    assert_eq!(read(&[2, 1, 0], 1), reference);
    assert_eq!(read(&[1, 2, 0], 3), reference);
    assert_eq!(reference.ra, vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
    assert_eq!(
        reference.files[0],
        PathBuf::from("/mocks/galaxia/b/1/file_a.fits")
    );
}

#[test]
fn test_codec_recovers_origin_files() {
    let n_per_file = [4, 0, 3, 3];
    let objid: Vec<i64> = vec![0, 1, 2, 3, 7, 8, 9, 0, 1, 2];
    let mockid = make_mockid(&objid, &n_per_file).unwrap();
    let (rows, files) = decode_many(&mockid).unwrap();
    assert_eq!(rows, objid);
    assert_eq!(files, vec![0, 0, 0, 0, 2, 2, 2, 3, 3, 3]);
}

#[test]
fn test_spatial_filter_region() {
    init_logging();
    let access = access(&[0, 1, 2]);
    let ctx = MockContext::new(&access, &Bricks);
    let mut config: MockConfig = serde_json::from_str(CONFIG).unwrap();
    config.sources.retain(|name, _| name == "MWS_WD");
    let mut rng = ChaCha8Rng::seed_from_u64(1);

    let mocks = load_all_mocks(&config, &IngestParams::default(), &ctx, &mut rng).unwrap();
    assert_eq!(mocks["MWS_WD"].ra, vec![10.0, 50.0]);

    if let Some(source) = config.sources.get_mut("MWS_WD") {
        source.bounds = Some(mockcat::SkyBounds::new(300.0, 310.0, -90.0, 90.0));
    }
    let err = load_all_mocks(&config, &IngestParams::default(), &ctx, &mut rng).unwrap_err();
    assert!(matches!(err, MockError::EmptyRegion(_)));
}

#[test]
fn test_templates_for_ingested_mocks() {
    init_logging();
    let access = access(&[0, 1, 2]);
    let gmm = mixtures();
    let ctx = MockContext::new(&access, &Bricks).with_mixtures(&gmm);
    let config: MockConfig = serde_json::from_str(CONFIG).unwrap();
    let mut rng = ChaCha8Rng::seed_from_u64(99);
    let mocks = load_all_mocks(&config, &IngestParams::default(), &ctx, &mut rng).unwrap();

    let libraries = TemplateLibraries::load(&access, Path::new("/templates")).unwrap();
    let index = TemplateIndex::build(&libraries).unwrap();
    let spectra = MockSpectra::new(
        &index,
        IdSynth {
            wave: vec![3600.0, 3601.0],
        },
    );

    // Mixed DA/DB batch only uses ids from the matching library
    let wd = spectra
        .generate(
            ObjectClass::Wd,
            config.sources["MWS_WD"].format,
            &mocks["MWS_WD"],
            None,
            &mut rng,
        )
        .unwrap();
    assert_eq!(wd.meta.template_id, vec![101, 0]);
    assert_eq!(wd.flux[[0, 1]], 101.0);

    let stars = spectra
        .generate(
            ObjectClass::Star,
            config.sources["MWS_MAIN"].format,
            &mocks["MWS_MAIN"],
            None,
            &mut rng,
        )
        .unwrap();
    assert!(stars.meta.template_id.iter().all(|&id| id == 1));

    let qso = spectra
        .generate(
            ObjectClass::Qso,
            config.sources["QSO"].format,
            &mocks["QSO"],
            None,
            &mut rng,
        )
        .unwrap();
    let ids = &qso.meta.template_id;
    assert!(ids[..3].iter().all(|id| [40, 41].contains(id)));
    assert_eq!(&ids[3..], &[0, 1]);
}
