use clap::Parser;
use std::sync::Arc;
use std::time::Duration;

use crate::query::pipeline::{Page, PageNav};
use crate::query::sort::Column;
use crate::resource::types::{Resource, StatKey};
use crate::shared::error::Result;
use crate::shared::handlers::http_handler::HttpHandler;
use crate::shared::util::config::{self, Config};
use crate::shared::util::handler::TrackerApi;
use crate::shared::util::store::ClientStore;

pub mod tracker;

pub use tracker::Tracker;

/// Headless resource tracker: prints the resource log and keeps it in sync
#[derive(Parser, Debug)]
#[command(name = "tracker")]
pub struct Args {
    /// Server context, defaults to the last one used
    #[arg(long)]
    pub server: Option<String>,
    /// Filter by name or type
    #[arg(long)]
    pub search: Option<String>,
    /// Category label, includes every sub-category
    #[arg(long)]
    pub category: Option<String>,
    /// Sort column click, may be repeated
    #[arg(long = "sort", value_parser = parse_column)]
    pub sort: Vec<Column>,
    #[arg(long, default_value_t = 1)]
    pub page: usize,
    /// Print one page and exit
    #[arg(long)]
    pub once: bool
}

fn parse_column(s: &str) -> std::result::Result<Column, String> {
    s.parse()
}

pub fn init_logging(config: &Config) {
    let mut builder = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    if config.log {
        builder.filter_level(log::LevelFilter::Debug);
    }
    let _ = builder.try_init();
}

/// Server to start on: explicit choice, then the stored one, then config
pub fn initial_server(explicit: Option<&str>, store: &ClientStore, config: &Config) -> String {
    if let Some(server) = explicit {
        return server.to_string();
    }
    match store.last_server() {
        Ok(Some(server)) => server,
        Ok(None) => config.server.default_server.clone(),
        Err(err) => {
            log::warn!("Could not read client store: {}", err);
            config.server.default_server.clone()
        }
    }
}

fn format_stats(resource: &Resource) -> String {
    StatKey::ALL.iter()
        .filter_map(|k| resource.stats.get(*k).map(|v| format!("{}:{}", k.code(), v)))
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn print_page(server_id: &str, page: &Page<Resource>) {
    println!("== {} | page {}/{} | {} resources ==", server_id, page.page, page.page_count.max(1), page.total);
    for resource in &page.items {
        println!("{:<24} {:<28} {:<8} {:<30} {}",
            resource.name,
            resource.resource_type,
            if resource.is_active { "active" } else { "inactive" },
            resource.sorted_planets().join(", "),
            format_stats(resource));
    }
}

fn apply_args<H: TrackerApi>(tracker: &Tracker<H>, args: &Args) {
    if let Some(term) = &args.search {
        tracker.set_search(term);
    }
    if let Some(category) = &args.category {
        tracker.select_category(category);
    }
    for column in &args.sort {
        tracker.toggle_sort(*column);
    }
    tracker.navigate(PageNav::Number(args.page));
}

pub async fn start() -> Result<()> {
    dotenv::dotenv().ok();
    let args = Args::parse();
    let config = config::get_config();
    init_logging(&config);

    let store = ClientStore::new(&config.store.path);
    let server_id = initial_server(args.server.as_deref(), &store, &config);
    let handler = HttpHandler::new(&config.server)?;
    if args.server.is_some() {
        if let Err(err) = store.set_last_server(&server_id) {
            log::warn!("Could not persist server choice: {}", err);
        }
    }

    let tracker = Arc::new(Tracker::new(handler, &server_id)
        .with_store(store)
        .with_page_size(config.sync.page_size)
        .with_poll_interval(Duration::from_secs(config.sync.poll_interval_seconds.max(1))));

    tracker.init().await?;
    log::info!("Tracking `{}` as {}", tracker.server_id(), tracker.effective_role());

    apply_args(&tracker, &args);
    print_page(&tracker.server_id(), &tracker.render());
    if args.once {
        return Ok(());
    }

    let mut changes = tracker.subscribe_changes();
    let poller = tracker.start_polling();
    loop {
        tokio::select! {
            changed = changes.changed() => {
                if changed.is_err() {
                    break;
                }
                print_page(&tracker.server_id(), &tracker.render());
            }
            _ = tokio::signal::ctrl_c() => {
                log::info!("Shutting down");
                break;
            }
        }
    }
    poller.stop();
    Ok(())
}
