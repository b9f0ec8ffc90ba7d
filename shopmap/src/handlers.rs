use clap::ArgMatches;
use colored::Colorize;
use shopmap_core::discover::{execute_discovery, DiscoverOptions};
use shopmap_core::dispatch::Domain;
use shopmap_core::settings::RunSettings;
use shopmap_core::store::ResultStore;
use shopmap_core::summary::{
    generate_json_summary, generate_text_summary, save_report, ReportFormat,
};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing_subscriber;

// Helper functions for the discover handler

/// Load domains from either a file or repeated --url arguments
pub fn load_domains_from_source(
    urls: &[String],
    hosts_file: Option<&PathBuf>,
) -> Result<Vec<String>, String> {
    if let Some(hosts_file_path) = hosts_file {
        load_domains_from_file(hosts_file_path)
    } else if !urls.is_empty() {
        Ok(urls.to_vec())
    } else {
        Err("Either --url or --hosts-file must be provided".to_string())
    }
}

/// Load and parse domains from a newline-delimited file
pub fn load_domains_from_file(path: &PathBuf) -> Result<Vec<String>, String> {
    let content = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read hosts file {}: {}", path.display(), e))?;

    let domains: Vec<String> = content
        .lines()
        .filter_map(parse_domain_line)
        .collect();

    if domains.is_empty() {
        return Err(format!("No valid domains found in {}", path.display()));
    }

    Ok(domains)
}

/// Parse one hosts-file line. Blank lines and # comments are skipped
/// silently; lines that cannot be read as a domain are skipped with a
/// warning.
pub fn parse_domain_line(line: &str) -> Option<String> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return None;
    }

    match Domain::parse(line) {
        Ok(domain) => Some(domain.base().to_string()),
        Err(_) => {
            eprintln!("[!] Skipping invalid domain '{}'", line);
            None
        }
    }
}

fn expand_store_path(args: &ArgMatches) -> PathBuf {
    let raw = args.get_one::<String>("store").unwrap();
    PathBuf::from(shellexpand::tilde(raw).into_owned())
}

pub async fn handle_discover(sub_matches: &ArgMatches) {
    // Initialize tracing for logging
    tracing_subscriber::fmt::init();

    let urls: Vec<String> = sub_matches
        .get_many::<String>("url")
        .map(|values| values.cloned().collect())
        .unwrap_or_default();
    let hosts_file = sub_matches.get_one::<PathBuf>("hosts-file");

    let domains = match load_domains_from_source(&urls, hosts_file) {
        Ok(domains) => domains,
        Err(e) => {
            eprintln!("✗ {}", e);
            std::process::exit(1);
        }
    };

    let store_path = expand_store_path(sub_matches);

    let mut settings = RunSettings::default();
    if let Some(indicators) = sub_matches.get_many::<String>("indicator") {
        settings.indicators = indicators.cloned().collect();
    }
    settings.case_sensitive = sub_matches.get_flag("case-sensitive");
    settings.max_depth = *sub_matches.get_one::<usize>("max-depth").unwrap();
    settings.max_retries = *sub_matches.get_one::<u32>("max-retries").unwrap();
    settings.fetch_timeout =
        Duration::from_secs(*sub_matches.get_one::<u64>("timeout").unwrap());
    settings.max_response_bytes = *sub_matches.get_one::<usize>("max-bytes").unwrap();
    settings.concurrency = *sub_matches.get_one::<usize>("concurrency").unwrap();

    println!("\n🕷️  Discovering products on {} domain(s)", domains.len());
    println!("Store: {}", store_path.display());
    println!("Indicators: {}", settings.indicators.join(", "));
    println!(
        "Max depth: {} | Concurrency: {} | Timeout: {}s\n",
        settings.max_depth,
        settings.concurrency,
        settings.fetch_timeout.as_secs()
    );

    // Ctrl-C cancels the run; everything still pending is reported as
    // cancelled, already-merged domains stay in the output
    let cancel = CancellationToken::new();
    let ctrl_c_token = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("\n[!] Cancellation requested, finishing up...");
            ctrl_c_token.cancel();
        }
    });

    let options = DiscoverOptions {
        domains,
        store_path,
        settings,
        show_progress: true,
    };

    let summary = match execute_discovery(options, cancel).await {
        Ok(summary) => summary,
        Err(e) => {
            eprintln!("✗ Discovery run failed: {}", e);
            std::process::exit(1);
        }
    };

    println!("\n✓ Discovery complete!\n");

    let format = sub_matches
        .get_one::<String>("format")
        .and_then(|s| ReportFormat::from_str(s))
        .unwrap_or(ReportFormat::Text);

    let report = match format {
        ReportFormat::Text => generate_text_summary(&summary),
        ReportFormat::Json => match generate_json_summary(&summary) {
            Ok(report) => report,
            Err(e) => {
                eprintln!("✗ Failed to render JSON summary: {}", e);
                std::process::exit(1);
            }
        },
    };

    if let Some(output) = sub_matches.get_one::<PathBuf>("output") {
        if let Err(e) = save_report(&report, output) {
            eprintln!("✗ Failed to save report to {}: {}", output.display(), e);
            std::process::exit(1);
        }
        println!(
            "{} Report saved to {}",
            "✓".green().bold(),
            output.display().to_string().bright_white()
        );
    } else {
        print!("{}", report);
    }
}

pub fn handle_show(sub_matches: &ArgMatches) {
    let store_path = expand_store_path(sub_matches);
    let domain_filter = sub_matches.get_one::<String>("domain");

    let store = ResultStore::new(&store_path);
    let loaded = match store.load() {
        Ok(loaded) => loaded,
        Err(e) => {
            eprintln!("✗ {}", e);
            std::process::exit(1);
        }
    };

    if let Some(ref warning) = loaded.warning {
        eprintln!("[!] {}", warning);
    }

    let mut shown = 0;
    for (url, record) in loaded.results.iter() {
        if let Some(filter) = domain_filter
            && &record.domain != filter
        {
            continue;
        }
        println!(
            "{}  {}  {}",
            record.discovered_at.format("%Y-%m-%d").to_string().dimmed(),
            record.domain.cyan(),
            url
        );
        shown += 1;
    }

    println!(
        "\n{} product URL(s) in {}",
        shown.to_string().bright_white().bold(),
        store_path.display()
    );
}
