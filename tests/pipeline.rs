use anyhow::{Result, bail};
use sf311::config::{AppConfig, FetchMode, load_config};
use sf311::detail::DetailSource;
use sf311::fetch::{build_listing_url, join_base_path};
use sf311::model::{ContainerTier, Offense};
use sf311::pipeline::{
    EnrichOutcome, EnrichmentNeeds, enrich_offense, enrich_offenses, run, type_distribution,
};
use sf311::store::load_offenses;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tempfile::tempdir;
use url::Url;

struct CannedSource {
    pages: Vec<(String, String)>,
    calls: AtomicUsize,
}

impl CannedSource {
    fn new(pages: &[(&str, &str)]) -> Self {
        Self {
            pages: pages
                .iter()
                .map(|(path, body)| (path.to_string(), body.to_string()))
                .collect(),
            calls: AtomicUsize::new(0),
        }
    }
}

impl DetailSource for CannedSource {
    fn key(&self) -> &'static str {
        "canned"
    }

    fn fetch_page(&self, path: &str) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.pages.iter().find(|(p, _)| p == path) {
            Some((_, body)) => Ok(body.clone()),
            None => bail!("request to {path} failed with status 404 Not Found"),
        }
    }
}

struct EchoSource;

impl DetailSource for EchoSource {
    fn key(&self) -> &'static str {
        "echo"
    }

    fn fetch_page(&self, path: &str) -> Result<String> {
        let digits: u64 = path.trim_start_matches("/tickets/").parse()?;
        std::thread::sleep(Duration::from_millis((20 - digits % 20) * 2));
        Ok(format!(
            "<html><body><main><p>Detail narrative for ticket {digits}</p></main></body></html>"
        ))
    }
}

fn with_id(id: &str) -> Offense {
    Offense {
        offense_type: Some("Graffiti Removal".to_string()),
        offense_id: Some(id.to_string()),
        ..Offense::default()
    }
}

const DETAIL_999: &str = r#"<html><body><main>
  <div data-lat="10.0" data-lng="20.0"></div>
  <p>Tagging on the north wall of the building.</p>
</main></body></html>"#;

#[test]
fn incomplete_record_is_enriched_from_detail_page() -> Result<()> {
    let source = CannedSource::new(&[("/tickets/999", DETAIL_999)]);

    let (offenses, tally) = enrich_offenses(vec![with_id("#999")], &source, 1)?;

    assert_eq!(offenses[0].coordinates.as_deref(), Some("(10.0, 20.0)"));
    assert_eq!(
        offenses[0].description.as_deref(),
        Some("Tagging on the north wall of the building.")
    );
    assert_eq!(tally.attempted, 1);
    assert_eq!(tally.failed, 0);
    assert_eq!(tally.descriptions_filled, 1);
    assert_eq!(tally.coordinates_filled, 1);
    Ok(())
}

#[test]
fn failed_detail_fetch_keeps_fields_null_and_continues() -> Result<()> {
    let source = CannedSource::new(&[("/tickets/1000", DETAIL_999)]);

    let (offenses, tally) =
        enrich_offenses(vec![with_id("#999"), with_id("#1000")], &source, 2)?;

    assert_eq!(offenses.len(), 2);
    assert_eq!(offenses[0].coordinates, None);
    assert_eq!(offenses[0].description, None);
    assert_eq!(offenses[1].coordinates.as_deref(), Some("(10.0, 20.0)"));
    assert_eq!(tally.attempted, 2);
    assert_eq!(tally.failed, 1);
    Ok(())
}

#[test]
fn complete_records_are_never_fetched() {
    let source = CannedSource::new(&[("/tickets/1", DETAIL_999)]);
    let mut offense = Offense {
        coordinates: Some("(1.0, 2.0)".to_string()),
        description: Some("Already described".to_string()),
        offense_id: Some("#1".to_string()),
        ..Offense::default()
    };

    assert_eq!(enrich_offense(&mut offense, &source), EnrichOutcome::NotNeeded);
    assert_eq!(source.calls.load(Ordering::SeqCst), 0);
}

#[test]
fn records_without_id_are_not_enriched() {
    let source = CannedSource::new(&[]);
    let mut offense = Offense {
        address: Some("123 Main St".to_string()),
        ..Offense::default()
    };

    assert_eq!(enrich_offense(&mut offense, &source), EnrichOutcome::MissingId);
    assert_eq!(source.calls.load(Ordering::SeqCst), 0);
    assert_eq!(offense.description, None);
}

#[test]
fn existing_fields_are_not_overwritten() {
    let source = CannedSource::new(&[("/tickets/999", DETAIL_999)]);
    let mut offense = Offense {
        coordinates: Some("(37.77, -122.41)".to_string()),
        offense_id: Some("#999".to_string()),
        ..Offense::default()
    };

    let outcome = enrich_offense(&mut offense, &source);

    assert_eq!(
        outcome,
        EnrichOutcome::Enriched {
            description_filled: true,
            coordinates_filled: false,
        }
    );
    assert_eq!(offense.coordinates.as_deref(), Some("(37.77, -122.41)"));
    assert_eq!(
        offense.description.as_deref(),
        Some("Tagging on the north wall of the building.")
    );
}

#[test]
fn description_equal_to_address_counts_as_missing() {
    let offense = Offense {
        address: Some("500 Oak Ave".to_string()),
        description: Some("500 Oak Ave".to_string()),
        coordinates: Some("(1.0, 2.0)".to_string()),
        ..Offense::default()
    };

    let needs = EnrichmentNeeds::of(&offense);
    assert!(needs.description);
    assert!(!needs.coordinates);
}

#[test]
fn parallel_enrichment_preserves_listing_order() -> Result<()> {
    let offenses: Vec<Offense> = (1..=20).map(|n| with_id(&format!("#{n}"))).collect();

    let (enriched, tally) = enrich_offenses(offenses, &EchoSource, 4)?;

    assert_eq!(tally.attempted, 20);
    for (index, offense) in enriched.iter().enumerate() {
        let n = index + 1;
        assert_eq!(offense.offense_id.as_deref(), Some(format!("#{n}").as_str()));
        assert_eq!(
            offense.description.as_deref(),
            Some(format!("Detail narrative for ticket {n}").as_str())
        );
    }
    Ok(())
}

#[test]
fn type_distribution_ranks_by_count() {
    let offenses = vec![
        with_id("#1"),
        Offense {
            offense_type: Some("Pothole Repair".to_string()),
            ..Offense::default()
        },
        with_id("#2"),
        Offense::default(),
    ];

    assert_eq!(
        type_distribution(&offenses),
        vec![
            ("Graffiti Removal".to_string(), 2),
            ("Pothole Repair".to_string(), 1),
        ]
    );
}

#[test]
fn listing_url_carries_order_and_page_parameters() -> Result<()> {
    let url = build_listing_url("https://mobile311.sfgov.org", "chronological", "descending", 22)?;
    assert_eq!(
        url,
        "https://mobile311.sfgov.org/tickets?order%5Bby%5D=chronological&order%5Bdirection%5D=descending&page=22"
    );
    Ok(())
}

#[test]
fn listing_url_keeps_base_url_path() -> Result<()> {
    let expected =
        "https://example.org/sf311/tickets?order%5Bby%5D=chronological&order%5Bdirection%5D=ascending&page=1";
    for base in ["https://example.org/sf311", "https://example.org/sf311/"] {
        assert_eq!(
            build_listing_url(base, "chronological", "ascending", 1)?,
            expected
        );
    }
    Ok(())
}

#[test]
fn ticket_paths_append_to_base_url_path() -> Result<()> {
    let base = Url::parse("https://example.org/sf311/")?;
    assert_eq!(
        join_base_path(&base, "/tickets/101002855968")?.as_str(),
        "https://example.org/sf311/tickets/101002855968"
    );

    let root = Url::parse("https://mobile311.sfgov.org")?;
    assert_eq!(
        join_base_path(&root, "/tickets/7")?.as_str(),
        "https://mobile311.sfgov.org/tickets/7"
    );
    Ok(())
}

#[test]
fn default_config_is_valid() -> Result<()> {
    let config = load_config(None)?;
    assert_eq!(config.source.base_url, "https://mobile311.sfgov.org");
    assert_eq!(config.listing.page, 22);
    assert_eq!(config.fetch.mode, FetchMode::Http);
    assert!(config.enrich.enabled);
    assert_eq!(config.enrich.workers, 1);
    Ok(())
}

#[test]
fn invalid_configs_are_rejected() -> Result<()> {
    let dir = tempdir()?;

    let bad_direction = dir.path().join("direction.toml");
    fs::write(&bad_direction, "[listing]\norder_direction = \"sideways\"\n")?;
    assert!(load_config(Some(bad_direction.as_path())).is_err());

    let file_without_listing = dir.path().join("file.toml");
    fs::write(&file_without_listing, "[fetch]\nmode = \"file\"\n")?;
    assert!(load_config(Some(file_without_listing.as_path())).is_err());

    let mut opaque_base = AppConfig::default();
    opaque_base.source.base_url = "mailto:ops@example.org".to_string();
    assert!(opaque_base.validate().is_err());

    let mut zero_workers = AppConfig::default();
    zero_workers.enrich.workers = 0;
    assert!(zero_workers.validate().is_err());
    Ok(())
}

#[test]
fn offline_run_parses_enriches_and_writes_output() -> Result<()> {
    let dir = tempdir()?;
    let config_path = write_offline_config(dir.path())?;
    let config = load_config(Some(config_path.as_path()))?;

    let outcome = run(&config)?;

    assert_eq!(outcome.report.tier, Some(ContainerTier::ClassSignature));
    assert_eq!(outcome.report.containers_found, 3);
    assert_eq!(outcome.report.records_parsed, 3);
    assert_eq!(outcome.report.enrichment.attempted, 2);
    assert_eq!(outcome.report.enrichment.failed, 1);

    let ids: Vec<_> = outcome
        .offenses
        .iter()
        .filter_map(|o| o.offense_id.as_deref())
        .collect();
    assert_eq!(ids, vec!["#101002855968", "#101002855970", "#101002855971"]);

    assert_eq!(
        outcome.offenses[0],
        Offense {
            offense_type: Some("Pothole Repair".to_string()),
            address: Some("123 Main St".to_string()),
            coordinates: Some("(37.7749, -122.4194)".to_string()),
            description: Some("Large pothole in the crosswalk".to_string()),
            offense_id: Some("#101002855968".to_string()),
        }
    );
    assert_eq!(
        outcome.offenses[1].description.as_deref(),
        Some("Tagging covers the east wall of the parking garage.")
    );
    assert_eq!(
        outcome.offenses[1].coordinates.as_deref(),
        Some("(37.7601, -122.4148)")
    );
    assert_eq!(
        outcome.offenses[2].address.as_deref(),
        Some("Intersection of Mission and 5th")
    );
    assert_eq!(outcome.offenses[2].description, None);
    assert_eq!(outcome.offenses[2].coordinates, None);

    let written = dir.path().join("out/offenses.json");
    let saved = load_offenses(&written)?;
    assert_eq!(saved, outcome.offenses);

    let raw = fs::read_to_string(&written)?;
    let first_keys: Vec<_> = raw
        .lines()
        .skip(2)
        .take(5)
        .map(|line| line.trim().split(':').next().unwrap_or_default().to_string())
        .collect();
    assert_eq!(
        first_keys,
        vec![
            "\"offense_type\"",
            "\"address\"",
            "\"coordinates\"",
            "\"description\"",
            "\"offense_id\"",
        ]
    );
    assert!(raw.contains("\"description\": null"));
    Ok(())
}

#[test]
fn missing_listing_file_aborts_the_run() -> Result<()> {
    let dir = tempdir()?;
    let config_path = dir.path().join("sf311.toml");
    fs::write(
        &config_path,
        "[fetch]\nmode = \"file\"\nlisting_file = \"does-not-exist.html\"\n",
    )?;
    let config = load_config(Some(config_path.as_path()))?;

    assert!(run(&config).is_err());
    assert!(!dir.path().join("out").exists());
    Ok(())
}

fn fixture_root() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
}

fn write_offline_config(dir: &Path) -> Result<PathBuf> {
    let fixtures = fixture_root();
    let config_path = dir.join("sf311.toml");
    let config = format!(
        r#"[fetch]
mode = "file"
listing_file = '{listing}'
detail_dir = '{details}'

[enrich]
workers = 2

[output]
path = "out/offenses.json"
"#,
        listing = fixtures.join("listing_page.html").display(),
        details = fixtures.join("details").display(),
    );
    fs::write(&config_path, config)?;
    Ok(config_path)
}
