//! Files command implementation.

use vaultsync_core::config::ResolvedConfig;

use super::output::{FileOutput, print_files_table, print_json};
use crate::FilesArgs;

pub fn run(rc: &ResolvedConfig, args: FilesArgs) {
    let (_store, conn) = super::connect(rc);

    let files = match conn.get_all_files() {
        Ok(files) => files,
        Err(e) => super::query_failed("listing files", e),
    };

    let mut files: Vec<FileOutput> =
        files.into_iter().map(|(path, mtime)| FileOutput::new(path, mtime)).collect();
    files.sort_by(|a, b| a.path.cmp(&b.path));

    if args.json {
        print_json(&files);
    } else {
        print_files_table(&files);
    }
}
