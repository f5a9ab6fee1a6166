//! Show command implementation.

use vaultsync_core::config::ResolvedConfig;

use super::output::{format_mtime, print_json};
use crate::ShowArgs;

pub fn run(rc: &ResolvedConfig, args: ShowArgs) {
    let (_store, conn) = super::connect(rc);
    let path = args.path.trim_start_matches("./");

    let meta = match conn.file_metadata(path) {
        Ok(Some(meta)) => meta,
        Ok(None) => {
            eprintln!("Document not found in index: {}", path);
            eprintln!("Hint: Check the path or run 'vsync scan'.");
            std::process::exit(1);
        }
        Err(e) => super::query_failed("looking up document", e),
    };

    if args.json {
        print_json(&meta);
        return;
    }

    println!("{}", meta.file.path);
    println!("  Modified: {}", format_mtime(meta.file.mtime));
    println!("  Size:     {} bytes", meta.file.size);

    if !meta.frontmatter.is_empty() {
        println!();
        println!("Frontmatter:");
        for (key, value) in &meta.frontmatter {
            println!("  {}: {}", key, value);
        }
    }

    if !meta.headers.is_empty() {
        println!();
        println!("Headers:");
        for header in &meta.headers {
            let indent = "  ".repeat(usize::from(header.level));
            println!("{}{} (line {})", indent, header.text, header.line);
        }
    }

    if !meta.links.is_empty() {
        println!();
        println!("Links:");
        for link in &meta.links {
            println!(
                "  {:<10} {} (line {})",
                link.link_type.as_str(),
                link.target_path,
                link.line
            );
        }
    }

    if !meta.tags.is_empty() {
        println!();
        let tags: Vec<String> = meta.tags.iter().map(|t| format!("#{}", t.tag)).collect();
        println!("Tags: {}", tags.join(" "));
    }
}
