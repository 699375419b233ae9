use crate::config::AppConfig;
use crate::detail::{DetailSource, DirDetailSource, HttpDetailSource, try_fetch_ticket_detail};
use crate::extract::parse_html;
use crate::fetch::fetch_listing;
use crate::model::{DetailFields, EnrichmentTally, Offense, RunReport};
use crate::store::save_offenses;
use anyhow::{Context, Result};
use rayon::prelude::*;
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::{debug, info, warn};

#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub offenses: Vec<Offense>,
    pub report: RunReport,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EnrichmentNeeds {
    pub description: bool,
    pub coordinates: bool,
}

impl EnrichmentNeeds {
    pub fn of(offense: &Offense) -> Self {
        Self {
            description: offense.description.is_none() || offense.description_duplicates_address(),
            coordinates: offense.coordinates.is_none(),
        }
    }

    pub fn any(&self) -> bool {
        self.description || self.coordinates
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnrichOutcome {
    NotNeeded,
    MissingId,
    Failed,
    Enriched {
        description_filled: bool,
        coordinates_filled: bool,
    },
}

pub fn run(config: &AppConfig) -> Result<RunOutcome> {
    let doc = fetch_listing(config).context("listing fetch failed")?;
    let parsed = parse_html(&doc.body);

    let mut report = RunReport {
        source_url: doc.source_url.clone(),
        page: doc.page,
        tier: parsed.tier,
        containers_found: parsed.containers_found,
        records_parsed: parsed.offenses.len(),
        ..RunReport::default()
    };

    let offenses = if config.enrich.enabled {
        let source = detail_source_for(config)?;
        let (offenses, tally) =
            enrich_offenses(parsed.offenses, source.as_ref(), config.enrich.workers)?;
        report.enrichment = tally;
        offenses
    } else {
        info!("enrichment disabled; keeping listing fields only");
        parsed.offenses
    };

    if let Some(path) = config.output.path.as_ref() {
        let resolved = config.resolve(path)?;
        save_offenses(&resolved, &offenses)?;
        info!(path = %resolved.display(), records = offenses.len(), "offenses written");
    }

    Ok(RunOutcome { offenses, report })
}

pub fn detail_source_for(config: &AppConfig) -> Result<Box<dyn DetailSource>> {
    if let Some(dir) = config.fetch.detail_dir.as_ref() {
        let resolved = config.resolve(dir)?;
        debug!(dir = %resolved.display(), "using saved detail pages");
        return Ok(Box::new(DirDetailSource::new(resolved)));
    }

    let source = HttpDetailSource::new(
        &config.source.base_url,
        &config.fetch.user_agent,
        &config.fetch.headers,
        Duration::from_secs(config.fetch.detail_timeout_secs),
    )?;
    Ok(Box::new(source))
}

pub fn enrich_offenses(
    offenses: Vec<Offense>,
    source: &dyn DetailSource,
    workers: usize,
) -> Result<(Vec<Offense>, EnrichmentTally)> {
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(workers.max(1))
        .build()
        .context("failed to build enrichment worker pool")?;

    let results: Vec<(Offense, EnrichOutcome)> = pool.install(|| {
        offenses
            .into_par_iter()
            .map(|mut offense| {
                let outcome = enrich_offense(&mut offense, source);
                (offense, outcome)
            })
            .collect()
    });

    let mut tally = EnrichmentTally::default();
    let mut out = Vec::with_capacity(results.len());
    for (offense, outcome) in results {
        match outcome {
            EnrichOutcome::NotNeeded => {}
            EnrichOutcome::MissingId => tally.skipped_without_id += 1,
            EnrichOutcome::Failed => {
                tally.attempted += 1;
                tally.failed += 1;
            }
            EnrichOutcome::Enriched {
                description_filled,
                coordinates_filled,
            } => {
                tally.attempted += 1;
                tally.descriptions_filled += usize::from(description_filled);
                tally.coordinates_filled += usize::from(coordinates_filled);
            }
        }
        out.push(offense);
    }

    info!(
        attempted = tally.attempted,
        failed = tally.failed,
        skipped = tally.skipped_without_id,
        descriptions = tally.descriptions_filled,
        coordinates = tally.coordinates_filled,
        "enrichment complete"
    );

    Ok((out, tally))
}

pub fn enrich_offense(offense: &mut Offense, source: &dyn DetailSource) -> EnrichOutcome {
    let needs = EnrichmentNeeds::of(offense);
    if !needs.any() {
        return EnrichOutcome::NotNeeded;
    }

    let Some(ticket) = offense.ticket_digits().map(ToString::to_string) else {
        debug!(?offense, "no ticket id; skipping enrichment");
        return EnrichOutcome::MissingId;
    };

    match try_fetch_ticket_detail(source, &ticket) {
        Ok(detail) => {
            let (description_filled, coordinates_filled) = merge_detail(offense, needs, detail);
            EnrichOutcome::Enriched {
                description_filled,
                coordinates_filled,
            }
        }
        Err(err) => {
            let error = format!("{err:#}");
            warn!(%ticket, %error, "detail enrichment unavailable");
            EnrichOutcome::Failed
        }
    }
}

pub fn merge_detail(
    offense: &mut Offense,
    needs: EnrichmentNeeds,
    detail: DetailFields,
) -> (bool, bool) {
    let mut description_filled = false;
    let mut coordinates_filled = false;

    if needs.description
        && let Some(description) = detail.description
    {
        offense.description = Some(description);
        description_filled = true;
    }
    if needs.coordinates
        && let Some(coordinates) = detail.coordinates
    {
        offense.coordinates = Some(coordinates);
        coordinates_filled = true;
    }

    (description_filled, coordinates_filled)
}

pub fn type_distribution(offenses: &[Offense]) -> Vec<(String, usize)> {
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for label in offenses.iter().filter_map(|o| o.offense_type.as_deref()) {
        *counts.entry(label).or_default() += 1;
    }

    let mut ranked: Vec<(String, usize)> = counts
        .into_iter()
        .map(|(label, count)| (label.to_string(), count))
        .collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    ranked
}
