use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;

use devsweep::app::App;
use devsweep::paths::ConfinedRoot;
use devsweep::scanner::{self, ScanOptions};
use devsweep::settings::Settings;
use devsweep::targets;

#[derive(Parser)]
#[command(name = "devsweep")]
#[command(about = "Find and delete heavy build-artifact directories", long_about = None)]
struct Cli {
    /// Root directory to scan
    #[arg(default_value = ".")]
    root: String,

    /// Extra target directory names (comma separated, repeatable)
    #[arg(short, long)]
    include: Vec<String>,

    /// Built-in target names to drop from the catalog (comma separated, repeatable)
    #[arg(short = 'x', long)]
    exclude: Vec<String>,

    /// Maximum scan depth below the root; 0 means unlimited
    #[arg(long)]
    depth: Option<u32>,

    /// Path to a settings file
    #[arg(short = 'c', long)]
    config: Option<String>,

    /// Skip confirmation prompts before deleting
    #[arg(long)]
    no_confirm: bool,

    /// Print the target catalog and exit
    #[arg(long)]
    list_targets: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let root_path = PathBuf::from(shellexpand::tilde(&cli.root).to_string());
    let root = ConfinedRoot::open(&root_path)
        .with_context(|| format!("Failed to open scan root {}", root_path.display()))?;

    let config_path = cli
        .config
        .as_ref()
        .map(|raw| PathBuf::from(shellexpand::tilde(raw).to_string()));
    let settings = match Settings::resolve_path(root.path(), config_path.as_deref()) {
        Some(path) => Settings::load(&path)
            .with_context(|| format!("Failed to load settings from {}", path.display()))?,
        None => Settings::default(),
    };

    // CLI additions stack on top of the settings file.
    let mut include = settings.scan.include.clone();
    for raw in &cli.include {
        include.extend(targets::parse_target_list(raw));
    }
    let mut exclude = settings.scan.exclude.clone();
    for raw in &cli.exclude {
        exclude.extend(targets::parse_target_list(raw));
    }
    let catalog = targets::build_catalog(&include, &exclude);

    if cli.list_targets {
        for name in targets::sorted_target_names(&catalog) {
            println!("{:<24} {}", name, catalog[&name].category);
        }
        return Ok(());
    }

    let mut skip_dirs = scanner::default_skip_dirs();
    skip_dirs.extend(settings.scan.skip.iter().cloned());

    let max_depth = cli.depth.unwrap_or(settings.scan.depth);
    let confirm_deletes = !cli.no_confirm && settings.ui.confirm_deletes;

    let opts = ScanOptions {
        root: Arc::new(root),
        targets: catalog,
        skip_dirs,
        max_depth,
    };

    let mut app = App::new(opts, confirm_deletes);
    app.run().await
}
