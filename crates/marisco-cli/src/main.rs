//! marisco CLI - harmonize marine radioactivity datasets.

mod cli;
mod commands;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use clap::Parser;
use cli::{CacheAction, Cli, Commands};
use tracing_subscriber::EnvFilter;

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let cancel = Arc::new(AtomicBool::new(false));
    let flag = cancel.clone();
    if let Err(e) = ctrlc::set_handler(move || flag.store(true, Ordering::SeqCst)) {
        eprintln!("Warning: could not install Ctrl-C handler: {}", e);
    }

    let result = match cli.command {
        Commands::Helcom {
            src_dir,
            lut_dir,
            cache_dir,
            output,
            target,
            config,
            overwrite_cache,
            worms,
            json,
        } => commands::helcom::run(
            commands::helcom::HelcomArgs {
                src_dir,
                lut_dir,
                cache_dir,
                output,
                target,
                config,
                overwrite_cache,
                worms,
                json,
            },
            cancel,
        ),

        Commands::Legacy {
            dump,
            lut_dir,
            output,
            ref_ids,
            exclude,
            config,
        } => commands::legacy::run(dump, lut_dir, output, ref_ids, exclude, config, cancel),

        Commands::Cache { action } => match action {
            CacheAction::List { cache_dir } => commands::cache::list(cache_dir),
            CacheAction::Clear { name, cache_dir } => commands::cache::clear(cache_dir, name),
        },

        Commands::InitConfig { path, force } => commands::init_config::run(path, force),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

/// Log to stderr; `RUST_LOG` overrides the default level.
fn init_tracing(verbose: bool) {
    let default = if verbose { "marisco=debug" } else { "marisco=info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}
