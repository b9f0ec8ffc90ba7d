// Include handlers module directly from handlers.rs
#[path = "handlers.rs"]
pub mod handlers;

// Re-export commonly used handler functions for convenience
pub use handlers::{
    load_domains_from_file,
    load_domains_from_source,
    parse_domain_line,
};

// Re-export run orchestration from shopmap-core
pub use shopmap_core::discover::{execute_discovery, DiscoverOptions};
pub use shopmap_core::summary::{
    generate_json_summary, generate_text_summary, ReportFormat, RunSummary,
};
