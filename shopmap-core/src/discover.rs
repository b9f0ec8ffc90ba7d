use crate::dispatch::{Dispatcher, DomainReport, TokioPool};
use crate::settings::RunSettings;
use crate::store::ResultStore;
use crate::summary::RunSummary;
use crate::StoreError;
use chrono::Utc;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Options for one discovery run across a set of domains
pub struct DiscoverOptions {
    pub domains: Vec<String>,
    pub store_path: PathBuf,
    pub settings: RunSettings,
    pub show_progress: bool,
}

/// Execute a full discovery run: normalize and dedupe the domain list,
/// fan traversals out, merge fragments into the persisted ResultSet
/// and save it atomically.
///
/// Unreachable domains land in the summary's per-domain reports; the
/// only error this returns is a store failure (unreadable store
/// directory, or a save that could not be completed), which is fatal
/// to the run.
pub async fn execute_discovery(
    options: DiscoverOptions,
    cancel: CancellationToken,
) -> Result<RunSummary, StoreError> {
    let started_at = Utc::now();

    let (domains, rejected) = Dispatcher::<TokioPool>::normalize(&options.domains);
    let total = domains.len();

    let store = ResultStore::new(&options.store_path);
    let loaded = store.load()?;
    let store_warning = loaded.warning.map(|w| w.to_string());
    let mut results = loaded.results;
    let previously_stored = results.len();

    // Single spinner tracking domain completions (only if enabled)
    let progress_bar = if options.show_progress {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.cyan} {msg}")
                .unwrap(),
        );
        pb.set_message(format!("Crawling {} domain(s)...", total));
        Some(Arc::new(pb))
    } else {
        None
    };

    let completed_count = Arc::new(AtomicUsize::new(0));

    let mut dispatcher =
        Dispatcher::new(TokioPool, options.settings.clone()).with_cancellation(cancel);

    if let Some(ref pb) = progress_bar {
        let pb_clone = pb.clone();
        let count_clone = completed_count.clone();
        dispatcher = dispatcher.with_progress_callback(Arc::new(move |msg: String| {
            let done = count_clone.fetch_add(1, Ordering::Relaxed) + 1;
            pb_clone.set_message(format!("[{}/{}] {}", done, total, msg));
            pb_clone.tick();
        }));
    }

    let outcome = dispatcher.run(domains).await;

    results.merge_from(outcome.results);
    let new_products = results.len() - previously_stored;

    // One retry before a save failure becomes fatal to the run
    if let Err(first) = store.save(&results) {
        warn!("Store save failed, retrying once: {}", first);
        tokio::time::sleep(Duration::from_millis(200)).await;
        store.save(&results)?;
    }

    if let Some(ref pb) = progress_bar {
        pb.finish_with_message(format!(
            "Discovery complete: {} new product URL(s)",
            new_products
        ));
    }

    let mut reports = outcome.reports;
    for (input, reason) in rejected {
        reports.push(DomainReport::rejected_input(input, reason));
    }

    info!(
        "Run complete: {} new product URL(s), {} total in store",
        new_products,
        results.len()
    );

    Ok(RunSummary {
        run_id: uuid::Uuid::new_v4().to_string(),
        started_at,
        finished_at: Utc::now(),
        store_path: options.store_path.display().to_string(),
        reports,
        new_products,
        total_products: results.len(),
        store_warning,
    })
}
