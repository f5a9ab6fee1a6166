//! Backlinks command implementation.

use vaultsync_core::config::ResolvedConfig;

use super::output::print_backlinks_table;
use crate::BacklinksArgs;

pub fn run(rc: &ResolvedConfig, args: BacklinksArgs) {
    let (_store, conn) = super::connect(rc);
    let target = args.target.trim_start_matches("./");

    match conn.backlinks(target, &rc.index.extension) {
        Ok(links) => print_backlinks_table(&links),
        Err(e) => super::query_failed("looking up backlinks", e),
    }
}
