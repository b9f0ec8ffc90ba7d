pub mod discover;
pub mod dispatch;
pub mod settings;
pub mod store;
pub mod summary;

pub use discover::{execute_discovery, DiscoverOptions};
pub use dispatch::{CrawlTask, Dispatcher, Domain, TokioPool, WorkPool};
pub use settings::RunSettings;
pub use store::{ProductRecord, ResultSet, ResultStore, StoreError};
pub use summary::{ReportFormat, RunSummary};

pub fn print_banner() {
    println!(
        r#"
     _
 ___| |__   ___  _ __  _ __ ___   __ _ _ __
/ __| '_ \ / _ \| '_ \| '_ ` _ \ / _` | '_ \
\__ \ | | | (_) | |_) | | | | | | (_| | |_) |
|___/_| |_|\___/| .__/|_| |_| |_|\__,_| .__/
                |_|                   |_|
        sitemap-driven product discovery v{}
"#,
        env!("CARGO_PKG_VERSION")
    );
}
