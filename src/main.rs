use anyhow::{Context, Result};
use pokedex_reconcile::{
    cli::{Cli, Commands},
    import::{import_pokemon, RandomTrainer},
    provider::{CachedProvider, PokeApiClient, PokemonProvider, ResponseCache},
    query::{Lookup, QueryMode},
    reconcile::{reconcile, verify_integrity, ReconcileRules},
    schema::table_names,
    store,
    ui::{LogUi, UiApp},
};
use std::time::Instant;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    let cli = Cli::parse_args();

    // The dashboard owns the terminal, so keep log lines off it
    let tui = matches!(cli.command, Commands::Reconcile { tui: true, .. });
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(if tui { "off" } else { "info" })),
        )
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Load { input_dir } => {
            let start = Instant::now();
            let records = store::load_dataset(&input_dir, &cli.db, &mut LogUi::new())?;
            println!(
                "Loaded {} records into {:?} in {:.1}s",
                records,
                cli.db,
                start.elapsed().as_secs_f64()
            );
        }

        Commands::Reconcile {
            rules,
            no_builtin,
            tui,
        } => {
            let base = if no_builtin {
                ReconcileRules::empty()
            } else {
                ReconcileRules::default()
            };
            let rules = match rules {
                Some(path) => base.extend(
                    ReconcileRules::from_file(&path)
                        .with_context(|| format!("Failed to read rules from {:?}", path))?,
                ),
                None => base,
            };

            let mut conn = store::open(&cli.db)?;

            let report = if tui {
                let mut ui = UiApp::new()?;
                match reconcile(&mut conn, &rules, &mut ui) {
                    Ok(report) => {
                        ui.finish(&report.summary())?;
                        report
                    }
                    Err(e) => {
                        ui.restore()?;
                        return Err(e).context("Reconciliation failed and was rolled back");
                    }
                }
            } else {
                reconcile(&mut conn, &rules, &mut LogUi::new())
                    .context("Reconciliation failed and was rolled back")?
            };

            for rename in &report.renamed {
                println!(
                    "  renamed {} #{}: {:?} -> {:?}",
                    rename.table, rename.id, rename.from, rename.to
                );
            }
            println!("{}", report.summary());
        }

        Commands::Check => {
            let conn = store::open(&cli.db)?;
            let report = verify_integrity(&conn)?;
            println!("{}", serde_json::to_string_pretty(&report)?);
            if !report.is_clean() {
                anyhow::bail!("{}", report.summary());
            }
        }

        Commands::Stats => {
            let conn = store::open(&cli.db)?;
            for (table, count) in store::table_counts(&conn)? {
                println!("{:<28} {}", table, count);
            }
        }

        Commands::Query {
            kind,
            name,
            empty_on_error,
        } => {
            let mode = if empty_on_error {
                QueryMode::EmptyOnError
            } else {
                QueryMode::Strict
            };
            let names = match store::open(&cli.db) {
                Ok(conn) => Lookup::from(kind).run(&conn, &name, mode)?,
                Err(e) if mode == QueryMode::EmptyOnError => {
                    tracing::warn!(error = %e, "database unavailable, returning no results");
                    Vec::new()
                }
                Err(e) => return Err(e.into()),
            };
            println!("{}", serde_json::to_string(&names)?);
        }

        Commands::Import {
            name,
            api_url,
            cache_dir,
            no_cache,
            seed,
        } => {
            let client = PokeApiClient::with_base_url(api_url)?;
            let provider: Box<dyn PokemonProvider> = if no_cache {
                Box::new(client)
            } else {
                let cache = ResponseCache::new(cache_dir)?;
                tracing::debug!(dir = ?cache.cache_dir(), "using provider cache");
                Box::new(CachedProvider::new(client, cache))
            };
            let mut selector = match seed {
                Some(seed) => RandomTrainer::seeded(seed),
                None => RandomTrainer::new(),
            };

            let mut conn = store::open(&cli.db)?;
            let imported = import_pokemon(&mut conn, &provider.as_ref(), &mut selector, &name)
                .with_context(|| format!("Failed to import {:?}", name))?;
            println!("{}", serde_json::to_string_pretty(&imported)?);
        }

        Commands::ListTables => {
            println!("Available tables:\n");
            for name in table_names() {
                println!("  {}", name);
            }
        }
    }

    Ok(())
}
