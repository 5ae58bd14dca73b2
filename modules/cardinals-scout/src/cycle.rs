//! One invocation of the weekly cycle.
//!
//! Guard -> harvest -> accumulate -> (send day?) dispatch -> reset.
//! The starting phase is derived from the persisted [`CycleState`] on every
//! run; nothing is carried in memory between runs.

use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{Datelike, NaiveDate};
use tracing::{error, info, warn};

use cardinals_common::{Category, CuratedItem, FileConfig};

use crate::digest::{digest_subject, render_digest, Digest, DigestStyle, HarvestCounts};
use crate::harvest::{ExpertHarvester, Pacer, SectionHarvester, SectionPlan};
use crate::notify::{DigestMessage, DigestTransport, NoopTransport};
use crate::report::{cleanup_old_reports, report_url, write_report};
use crate::store::{AccumulationStore, CycleState, StateStore};
use crate::traits::{SearchAdapter, WebSearcher};

const DRY_RUN_ADDRESS: &str = "dry-run@localhost";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CyclePhase {
    /// Nothing to do today.
    Idle,
    Harvesting,
    /// Harvested and persisted; waiting for a send day (or a retry).
    AwaitingSendWindow,
    /// Digest delivered and the week reset.
    Sent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    /// The same-day guard fired before any send decision.
    NotAttempted,
    NotSendDay,
    NotConfigured,
    Failed,
    Sent,
    /// Rendered and logged by a dry run; the week is kept.
    DryRun,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleOutcome {
    pub phase: CyclePhase,
    /// Rows accepted by today's harvest, per category.
    pub harvested: HarvestCounts,
    /// Rows accumulated for the week, read back after today's writes.
    pub totals: HarvestCounts,
    pub send: SendOutcome,
}

/// Sender and recipients for the digest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    pub from: String,
    pub to: Vec<String>,
}

impl Envelope {
    fn is_complete(&self) -> bool {
        !self.from.trim().is_empty() && !self.to.is_empty()
    }
}

pub struct CycleController {
    config: FileConfig,
    searcher: Arc<dyn WebSearcher>,
    transport: Option<Arc<dyn DigestTransport>>,
    envelope: Option<Envelope>,
    store: AccumulationStore,
    state_store: StateStore,
    pacer: Pacer,
    force: bool,
    dry_run: bool,
}

impl CycleController {
    pub fn new(
        config: FileConfig,
        searcher: Arc<dyn WebSearcher>,
        transport: Option<Arc<dyn DigestTransport>>,
        envelope: Option<Envelope>,
    ) -> Self {
        let dir = config.output.data_dir.clone();
        let pacer = Pacer::from_config(&config.harvest);
        Self {
            config,
            searcher,
            transport,
            envelope,
            store: AccumulationStore::new(&dir),
            state_store: StateStore::in_dir(&dir),
            pacer,
            force: false,
            dry_run: false,
        }
    }

    /// Harvest even if today's harvest already ran.
    pub fn with_force(mut self, force: bool) -> Self {
        self.force = force;
        self
    }

    /// Hand the digest to [`NoopTransport`] and never reset the week.
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        if dry_run {
            self.transport = Some(Arc::new(NoopTransport));
            if self.envelope.is_none() {
                self.envelope = Some(Envelope {
                    from: DRY_RUN_ADDRESS.to_string(),
                    to: vec![DRY_RUN_ADDRESS.to_string()],
                });
            }
        }
        self
    }

    pub fn with_pacer(mut self, pacer: Pacer) -> Self {
        self.pacer = pacer;
        self
    }

    pub fn store(&self) -> &AccumulationStore {
        &self.store
    }

    pub fn state_store(&self) -> &StateStore {
        &self.state_store
    }

    pub async fn run(&self, today: NaiveDate) -> Result<CycleOutcome> {
        let send_weekday = self.config.schedule.weekday()?;
        let mut state = self.state_store.load(today);

        if state.already_harvested(today) && !self.force {
            info!(%today, "Already harvested today, skipping");
            return Ok(CycleOutcome {
                phase: CyclePhase::Idle,
                harvested: HarvestCounts::default(),
                totals: Digest::load(&self.store).counts(),
                send: SendOutcome::NotAttempted,
            });
        }

        info!(%today, weekday = %today.weekday(), phase = ?CyclePhase::Harvesting, "Starting harvest");
        let harvested = self.harvest_and_accumulate(&mut state, today).await?;
        state.mark_harvested(today);
        self.state_store.save(&state)?;

        let digest = Digest::load(&self.store);
        let totals = digest.counts();

        let send = if today.weekday() != send_weekday {
            info!(%today, send_day = %send_weekday, "Not a send day, keeping data for the week");
            SendOutcome::NotSendDay
        } else {
            self.dispatch(&digest, today).await
        };

        if send != SendOutcome::Sent {
            return Ok(CycleOutcome {
                phase: CyclePhase::AwaitingSendWindow,
                harvested,
                totals,
                send,
            });
        }

        self.reset_week(&mut state, today)?;
        Ok(CycleOutcome {
            phase: CyclePhase::Sent,
            harvested,
            totals,
            send,
        })
    }

    /// Run every harvester, then write each category. Nothing is written
    /// until all searching has finished.
    async fn harvest_and_accumulate(
        &self,
        state: &mut CycleState,
        today: NaiveDate,
    ) -> Result<HarvestCounts> {
        let adapter = SearchAdapter::new(self.searcher.as_ref());
        let harvest_config = &self.config.harvest;

        let mut sections: Vec<(Category, Vec<CuratedItem>)> = Vec::new();
        for category in [Category::Grants, Category::Events, Category::Reports] {
            let plan = SectionPlan::for_category(category, &self.config);
            let batch = SectionHarvester::new(&adapter, harvest_config)
                .with_pacer(self.pacer)
                .harvest(&plan, today)
                .await;
            info!(%category, rows = batch.rows.len(), queries = batch.queries, "Section harvested");
            sections.push((category, batch.rows));
        }

        let experts = ExpertHarvester::new(&adapter, harvest_config)
            .with_pacer(self.pacer)
            .harvest(&self.config.keywords.experts)
            .await;
        info!(rows = experts.rows.len(), queries = experts.queries, "Experts harvested");

        state.record_queries(adapter.queries_issued(), today);

        let mut harvested = HarvestCounts::default();
        for (category, rows) in &sections {
            let summary = self
                .store
                .write_category(*category, rows)
                .with_context(|| format!("Failed to write {category}"))?;
            harvested.set(*category, summary.added);
        }
        let summary = self
            .store
            .write_category(Category::Experts, &experts.rows)
            .context("Failed to write experts")?;
        harvested.set(Category::Experts, summary.added);

        Ok(harvested)
    }

    async fn dispatch(&self, digest: &Digest, today: NaiveDate) -> SendOutcome {
        let (Some(transport), Some(envelope)) = (self.transport.as_ref(), self.envelope.as_ref())
        else {
            warn!("Email not configured, skipping send");
            return SendOutcome::NotConfigured;
        };
        if !envelope.is_complete() {
            warn!("Sender or recipients missing, skipping send");
            return SendOutcome::NotConfigured;
        }

        let style = if self.config.email.condensed {
            DigestStyle::Condensed
        } else {
            DigestStyle::Full
        };

        let report_link = match write_report(self.store.dir(), digest, today) {
            Ok(path) => Some(report_url(&self.config.output.report_base_url, &path)),
            Err(e) => {
                warn!(error = %e, "Failed to write full report, sending without link");
                None
            }
        };

        let message = DigestMessage {
            subject: digest_subject(&self.config.email.subject_prefix, style, today),
            html: render_digest(digest, style, today, report_link.as_deref()),
            from: envelope.from.clone(),
            to: envelope.to.clone(),
        };

        match transport.send(&message).await {
            Ok(()) if self.dry_run => SendOutcome::DryRun,
            Ok(()) => {
                info!(
                    transport = transport.name(),
                    recipients = message.to.len(),
                    style = ?style,
                    "Weekly digest sent"
                );
                SendOutcome::Sent
            }
            Err(e) => {
                error!(
                    transport = transport.name(),
                    error = %e,
                    "Digest send failed, accumulated data preserved for retry"
                );
                SendOutcome::Failed
            }
        }
    }

    /// Only reached after a confirmed send.
    fn reset_week(&self, state: &mut CycleState, today: NaiveDate) -> Result<()> {
        self.store.reset_all_categories()?;
        state.mark_sent(today);
        self.state_store.save(state)?;
        info!(week_start = %state.week_start_date, "Weekly data cleared");

        if self.config.output.cleanup_old_reports {
            if let Err(e) =
                cleanup_old_reports(self.store.dir(), self.config.output.keep_recent_reports, false)
            {
                warn!(error = %e, "Report cleanup failed");
            }
        }
        Ok(())
    }
}
