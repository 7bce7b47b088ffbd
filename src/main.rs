mod catalog;
mod error;
mod gateway;
mod import;
mod settings;

use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use catalog::CatalogStore;
use gateway::GatewayProbe;
use settings::Settings;

#[derive(Parser)]
#[command(
    name = "cousinfm_import",
    about = "Import broadcast rows from a CSV export into the CousinFM catalog"
)]
struct Cli {
    /// CSV file with CID, Title, File Size and Date columns
    csv: PathBuf,

    /// Catalog JSON to update (default: data/broadcasts.json)
    #[arg(long)]
    catalog: Option<PathBuf>,

    /// Do not probe the gateway before adding a CID
    #[arg(long)]
    skip_validation: bool,

    /// Gateway base URL used for reachability probes
    #[arg(long)]
    gateway_url: Option<String>,

    /// Per-request probe timeout in seconds
    #[arg(long)]
    timeout_secs: Option<u64>,
}

impl Cli {
    fn apply(&self, settings: &mut Settings) {
        if let Some(path) = &self.catalog {
            settings.catalog_path = path.clone();
        }
        if self.skip_validation {
            settings.validate = false;
        }
        if let Some(url) = &self.gateway_url {
            settings.gateway_url = url.clone();
        }
        if let Some(secs) = self.timeout_secs {
            settings.timeout_secs = secs;
        }
    }
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .try_init();
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let mut settings = Settings::load().context("Failed to load settings")?;
    cli.apply(&mut settings);
    info!(?settings, "starting import");

    let t0 = Instant::now();
    let mut store = CatalogStore::load(&settings.catalog_path)?;
    if settings.validate {
        let probe = GatewayProbe::new(&settings.gateway_url, settings.timeout())
            .context("Failed to build gateway client")?;
        store = store.with_probe(Box::new(probe));
    }

    let summary = import::run(&mut store, &cli.csv)?;
    summary.print();
    info!(
        catalog = ?store.path(),
        last_updated = %store.document().last_updated,
        elapsed_ms = t0.elapsed().as_millis() as u64,
        "done"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exactly_one_csv_argument() {
        assert!(Cli::try_parse_from(["cousinfm_import"]).is_err());
        assert!(Cli::try_parse_from(["cousinfm_import", "a.csv", "b.csv"]).is_err());

        let cli = Cli::try_parse_from(["cousinfm_import", "broadcasts.csv"]).unwrap();
        assert_eq!(cli.csv, PathBuf::from("broadcasts.csv"));
        assert!(!cli.skip_validation);
    }

    #[test]
    fn wrong_argument_count_exits_non_zero() {
        let err = Cli::try_parse_from(["cousinfm_import"]).err().unwrap();
        assert_ne!(err.exit_code(), 0);
    }

    #[test]
    fn flags_override_settings() {
        let cli = Cli::try_parse_from([
            "cousinfm_import",
            "rows.csv",
            "--catalog",
            "site/broadcasts.json",
            "--skip-validation",
            "--timeout-secs",
            "2",
        ])
        .unwrap();
        let mut settings = Settings {
            catalog_path: PathBuf::from("data/broadcasts.json"),
            validate: true,
            gateway_url: "https://ipfs.io/ipfs".to_string(),
            timeout_secs: 5,
        };
        cli.apply(&mut settings);
        assert_eq!(settings.catalog_path, PathBuf::from("site/broadcasts.json"));
        assert!(!settings.validate);
        assert_eq!(settings.timeout_secs, 2);
        assert_eq!(settings.gateway_url, "https://ipfs.io/ipfs");
    }
}
