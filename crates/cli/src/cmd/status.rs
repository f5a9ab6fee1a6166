//! Status command implementation.

use vaultsync_core::config::ResolvedConfig;

pub fn run(rc: &ResolvedConfig) {
    let (store, conn) = super::connect(rc);

    let stats = match conn.stats() {
        Ok(stats) => stats,
        Err(e) => {
            eprintln!("Error reading index: {}", e);
            std::process::exit(1);
        }
    };

    println!("profile:     {}", rc.active_profile);
    println!("vault_root:  {}", rc.vault_root.display());
    println!("index:       {}", store.path().display());
    println!("extension:   .{}", rc.index.extension);
    println!(
        "search:      {}",
        if stats.search_available { "available" } else { "unavailable" }
    );
    println!();
    println!("  Files:        {}", stats.files);
    println!("  Links:        {}", stats.links);
    println!("  Tags:         {}", stats.tags);
    println!("  Frontmatter:  {}", stats.frontmatter);
    println!("  Headers:      {}", stats.headers);
    if stats.search_available {
        println!("  Search rows:  {}", stats.search_entries);
    }
}
