//! Search command implementation.

use vaultsync_core::config::ResolvedConfig;
use vaultsync_core::index::{SearchOptions, SearchService};

use super::output::{print_hits_table, print_json};
use crate::SearchArgs;

pub fn run(rc: &ResolvedConfig, args: SearchArgs) {
    let store = super::open_store(rc);
    if !store.search_available() {
        eprintln!("Warning: full-text search is unavailable in this SQLite build");
    }

    let service = match SearchService::new(&store) {
        Ok(service) => service,
        Err(e) => {
            eprintln!("Error opening index: {}", e);
            std::process::exit(1);
        }
    };

    let options = SearchOptions { limit: args.limit, prefix: !args.exact };
    let hits = match service.search_with(&args.query, &options) {
        Ok(hits) => hits,
        Err(e) => super::query_failed("searching", e),
    };

    if args.json {
        print_json(&hits);
    } else {
        print_hits_table(&hits);
    }
}
