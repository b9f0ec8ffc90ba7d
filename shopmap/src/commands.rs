use crate::CLAP_STYLING;
use clap::{arg, command};

pub(crate) fn command_argument_builder() -> clap::Command {
    clap::Command::new("shopmap")
        .version(env!("CARGO_PKG_VERSION"))
        .bin_name("shopmap")
        .styles(CLAP_STYLING)
        .arg(arg!(-q --"quiet" "Suppress banner and non-essential output").required(false))
        .subcommand_required(false)
        .subcommand(
            command!("discover")
                .about(
                    "Crawl the sitemap trees of one or more e-commerce domains and persist \
                discovered product URLs to the result store.",
                )
                .arg(
                    arg!(-u --"url" <URL>)
                        .required(false)
                        .help("Base URL of a domain to crawl (repeatable)")
                        .action(clap::ArgAction::Append)
                        .conflicts_with("hosts-file"),
                )
                .arg(
                    arg!(-H --"hosts-file" <PATH>)
                        .required(false)
                        .help("Path to a newline-delimited file of domains to crawl")
                        .value_parser(clap::value_parser!(std::path::PathBuf))
                        .conflicts_with("url"),
                )
                .arg(
                    arg!(-s --"store" <PATH>)
                        .required(false)
                        .help("Location of the persisted product URL store")
                        .default_value("~/.config/shopmap/products.json"),
                )
                .arg(
                    arg!(-c --"concurrency" <NUM>)
                        .required(false)
                        .help("Concurrent sitemap fetches per domain")
                        .value_parser(clap::value_parser!(usize))
                        .default_value("5"),
                )
                .arg(
                    arg!(--"max-depth" <DEPTH>)
                        .required(false)
                        .help("Deepest allowed sitemap index nesting")
                        .value_parser(clap::value_parser!(usize))
                        .default_value("10"),
                )
                .arg(
                    arg!(--"max-retries" <NUM>)
                        .required(false)
                        .help("Retries for transient fetch failures")
                        .value_parser(clap::value_parser!(u32))
                        .default_value("2"),
                )
                .arg(
                    arg!(--"timeout" <SECONDS>)
                        .required(false)
                        .help("Per-fetch timeout in seconds")
                        .value_parser(clap::value_parser!(u64))
                        .default_value("10"),
                )
                .arg(
                    arg!(--"max-bytes" <BYTES>)
                        .required(false)
                        .help("Largest sitemap response accepted, in bytes")
                        .value_parser(clap::value_parser!(usize))
                        .default_value("10485760"),
                )
                .arg(
                    arg!(-i --"indicator" <SUBSTRING>)
                        .required(false)
                        .help(
                            "Product path indicator (repeatable; replaces the default \
                        /product/, /item/, /shop/ set)",
                        )
                        .action(clap::ArgAction::Append),
                )
                .arg(
                    arg!(--"case-sensitive")
                        .required(false)
                        .help("Match indicators case-sensitively")
                        .action(clap::ArgAction::SetTrue),
                )
                .arg(
                    arg!(-o --"output" <PATH>)
                        .required(false)
                        .help("Save run summary to file (default: display to screen)")
                        .value_parser(clap::value_parser!(std::path::PathBuf)),
                )
                .arg(
                    arg!(-f --"format" <FORMAT>)
                        .required(false)
                        .help("Run summary format: text, json")
                        .value_parser(["text", "json"])
                        .default_value("text"),
                ),
        )
        .subcommand(
            command!("show")
                .about("Print the persisted product URL store.")
                .arg(
                    arg!(-s --"store" <PATH>)
                        .required(false)
                        .help("Location of the persisted product URL store")
                        .default_value("~/.config/shopmap/products.json"),
                )
                .arg(
                    arg!(-d --"domain" <HOST>)
                        .required(false)
                        .help("Only show URLs first discovered on this domain"),
                ),
        )
}
