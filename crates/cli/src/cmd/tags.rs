//! Tags command implementation.

use vaultsync_core::config::ResolvedConfig;

use crate::TagsArgs;

pub fn run(rc: &ResolvedConfig, args: TagsArgs) {
    let (_store, conn) = super::connect(rc);
    let tag = args.tag.trim_start_matches('#');

    match conn.files_with_tag(tag) {
        Ok(paths) if paths.is_empty() => println!("(no documents tagged #{})", tag),
        Ok(paths) => {
            for path in paths {
                println!("{}", path);
            }
        }
        Err(e) => super::query_failed("looking up tag", e),
    }
}
