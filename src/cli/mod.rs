use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use crate::application::{AppError, LedgerService};
use crate::config::{DEFAULT_MILEAGE, LedgerConfig};
use crate::domain::{
    BucketPair, DebtDirection, FillResult, LedgerError, PayRequest, PayResult, RideResult,
    SettleResult, StatusView, format_cash, format_liters,
};

/// Fuelsplit - shared fuel ledger for two
#[derive(Parser)]
#[command(name = "fuelsplit")]
#[command(about = "Splits the fuel of a shared vehicle fairly using liter buckets")]
#[command(version)]
pub struct Cli {
    /// Database file path
    #[arg(short, long, env = "FUELSPLIT_DATABASE", default_value = "fuelsplit.db")]
    pub database: String,

    /// Who is issuing the command (stable per person)
    #[arg(short = 'u', long, env = "FUELSPLIT_IDENTITY", global = true)]
    pub identity: Option<String>,

    /// The two bucket names, comma separated
    #[arg(
        long,
        env = "FUELSPLIT_BUCKETS",
        value_delimiter = ',',
        default_value = "Aditya,Archit"
    )]
    pub buckets: Vec<String>,

    /// Mileage (km per liter) of a fresh ledger
    #[arg(long, env = "FUELSPLIT_DEFAULT_MILEAGE", default_value_t = DEFAULT_MILEAGE)]
    pub default_mileage: f64,

    /// Currency symbol used when showing cash amounts
    #[arg(long, env = "FUELSPLIT_CURRENCY", default_value = "₹")]
    pub currency: String,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a new database
    Init,

    /// Register yourself as one of the two buckets
    Register {
        /// Bucket name (case-insensitive)
        bucket: String,
    },

    /// Start a ride at the given odometer reading
    #[command(alias = "ride_start")]
    RideStart {
        /// Odometer reading in km
        #[arg(allow_negative_numbers = true)]
        odometer_km: f64,
    },

    /// End your ride; liters used are computed from the mileage
    #[command(alias = "ride_end")]
    RideEnd {
        /// Odometer reading in km
        #[arg(allow_negative_numbers = true)]
        odometer_km: f64,
    },

    /// Record a refuel paid by you
    Fill {
        /// Liters put in the tank
        #[arg(allow_negative_numbers = true)]
        liters: f64,

        /// Total amount paid
        #[arg(allow_negative_numbers = true)]
        total_cost: f64,
    },

    /// Set the vehicle mileage
    #[command(alias = "set_mileage")]
    SetMileage {
        /// Kilometers per liter
        #[arg(allow_negative_numbers = true)]
        km_per_liter: f64,
    },

    /// Show tanks, debts and settings
    Status,

    /// Show the cash value of your debt
    Settle,

    /// Pay down your debt
    Pay {
        /// Cash amount, or "full"
        #[arg(allow_hyphen_values = true)]
        amount: String,
    },

    /// Wipe all ledger data, registrations included
    Reset,

    /// Export data to CSV or JSON
    Export {
        /// What to export: state, balances
        export_type: String,

        /// Output file (stdout if omitted)
        #[arg(short, long)]
        output: Option<String>,

        /// Format for balances: csv, json (default: csv)
        #[arg(short, long)]
        format: Option<String>,
    },

    /// Replace the ledger with a JSON state snapshot
    Import {
        /// Input file (stdin if omitted)
        #[arg(short, long)]
        input: Option<String>,

        /// Validate and summarize without importing
        #[arg(long)]
        dry_run: bool,
    },
}

impl Cli {
    fn config(&self) -> Result<LedgerConfig> {
        Ok(LedgerConfig::new(self.buckets.as_slice(), self.default_mileage)?)
    }

    fn identity(&self) -> Result<&str> {
        self.identity
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .context("No identity given. Pass --identity or set FUELSPLIT_IDENTITY")
    }

    async fn service(&self) -> Result<LedgerService> {
        LedgerService::connect(&self.database, self.config()?)
            .await
            .with_context(|| {
                format!(
                    "Could not open {}. Run `fuelsplit init` first",
                    self.database
                )
            })
    }

    pub async fn run(self) -> Result<()> {
        let config = self.config()?;

        if let Commands::Init = self.command {
            LedgerService::init(&self.database, config).await?;
            println!("Database initialized: {}", self.database);
            return Ok(());
        }

        let service = self.service().await?;
        let outcome = self.dispatch(&service).await;

        match outcome {
            Ok(text) => {
                if !text.is_empty() {
                    println!("{}", text);
                }
                Ok(())
            }
            Err(err) => Err(explain(err, &config.buckets)),
        }
    }

    /// Run one command and render its reply.
    async fn dispatch(&self, service: &LedgerService) -> Result<String> {
        let currency = self.currency.as_str();

        let text = match &self.command {
            Commands::Init => anyhow::bail!("init does not run against an open ledger"),

            Commands::Register { bucket } => {
                let bucket = service.register(self.identity()?, bucket).await?;
                format!("Registered you as {}.", bucket)
            }

            Commands::SetMileage { km_per_liter } => {
                service.set_mileage(self.identity()?, *km_per_liter).await?;
                format!("Mileage set to {:.2} km/L.", km_per_liter)
            }

            Commands::RideStart { odometer_km } => {
                service.start_ride(self.identity()?, *odometer_km).await?;
                format!("Ride started at {} km.", odometer_km)
            }

            Commands::RideEnd { odometer_km } => {
                let ride = service.end_ride(self.identity()?, *odometer_km).await?;
                render_ride(&ride)
            }

            Commands::Fill { liters, total_cost } => {
                let fill = service.fill(self.identity()?, *liters, *total_cost).await?;
                render_fill(&fill, currency)
            }

            Commands::Status => {
                let view = service.status(self.identity()?).await?;
                render_status(&view, currency)
            }

            Commands::Settle => {
                let settle = service.settle(self.identity()?).await?;
                render_settle(&settle, currency)
            }

            Commands::Pay { amount } => {
                let request = PayRequest::parse(amount).with_context(|| {
                    format!("Invalid amount '{}'. Usage: pay <amount|full>", amount)
                })?;
                let pay = service.pay(self.identity()?, request).await?;
                render_pay(&pay, currency)
            }

            Commands::Reset => {
                service.reset().await?;
                "Ledger has been reset. All data cleared!".to_string()
            }

            Commands::Export {
                export_type,
                output,
                format,
            } => {
                // Export writes its own output
                run_export_command(service, export_type, output.as_deref(), format.as_deref())
                    .await?;
                String::new()
            }

            Commands::Import { input, dry_run } => {
                run_import_command(service, input.as_deref(), *dry_run).await?
            }
        };

        Ok(text)
    }
}

/// Attach a hint on what to do next to well-known rejections.
fn explain(err: anyhow::Error, buckets: &BucketPair) -> anyhow::Error {
    let hint = match err.downcast_ref::<AppError>().and_then(AppError::as_ledger) {
        Some(LedgerError::NotRegistered(_)) => format!(
            "You're not registered yet. Use `register {}` or `register {}`",
            buckets.first(),
            buckets.second()
        ),
        Some(LedgerError::NoRideStarted) => {
            "You haven't started a ride. Use `ride-start` first".to_string()
        }
        Some(LedgerError::InsufficientFuel { .. }) => {
            "Please `fill` the tank or correct the mileage with `set-mileage`".to_string()
        }
        Some(LedgerError::NoPriceSet) => {
            "Use `fill` once to set a price reference".to_string()
        }
        _ => return err,
    };
    err.context(hint)
}

pub fn render_ride(ride: &RideResult) -> String {
    format!(
        "Ride of {:.2} km ended.\nFuel used: {} L.\nBorrowed {} L from {}'s bucket.",
        ride.distance_km,
        format_liters(ride.used_liters),
        format_liters(ride.borrowed_liters),
        ride.other_bucket
    )
}

pub fn render_fill(fill: &FillResult, currency: &str) -> String {
    format!(
        "Fill recorded.\n{} L used to clear your debt to {}.\n{} L added to your bucket.\nNew price set to {}/L.",
        format_liters(fill.cleared_liters),
        fill.other_bucket,
        format_liters(fill.remaining_liters),
        format_cash(currency, fill.new_price)
    )
}

pub fn render_status(view: &StatusView, currency: &str) -> String {
    let net_liters = format_liters(view.net_debt_liters.abs());
    let net_cash = format_cash(currency, view.net_debt_cash());

    let debt_line = match view.direction() {
        DebtDirection::CallerOwes => format!(
            "You ({}) owe {} {} L (≈ {}).",
            view.bucket, view.other_bucket, net_liters, net_cash
        ),
        DebtDirection::OtherOwes => format!(
            "{} owes you ({}) {} L (≈ {}).",
            view.other_bucket, view.bucket, net_liters, net_cash
        ),
        DebtDirection::Settled => "All square!".to_string(),
    };

    let mut text = String::from("--- Fuel Status ---\n");
    for (bucket, liters) in &view.tanks {
        text.push_str(&format!("Tank ({}): {} L\n", bucket, format_liters(*liters)));
    }
    text.push_str(&format!("\n--- Debt Status ---\n{}\n\n", debt_line));
    text.push_str(&format!(
        "--- Settings ---\nMileage: {:.2} km/L\nLast Fuel Price: {}/L",
        view.mileage_km_per_liter,
        format_cash(currency, view.last_price_per_liter)
    ));
    text
}

pub fn render_settle(settle: &SettleResult, currency: &str) -> String {
    format!(
        "You currently owe {} L.\nAt the last known price of {}/L, that's approx. {}.\n\nTo clear this, use `pay full` or `pay <amount>`.",
        format_liters(settle.liters_owed),
        format_cash(currency, settle.price_per_liter),
        format_cash(currency, settle.cash_value)
    )
}

pub fn render_pay(pay: &PayResult, currency: &str) -> String {
    match pay.amount_paid {
        None => format!(
            "Debt of {} L cleared in full.",
            format_liters(pay.cleared_liters)
        ),
        Some(amount) => format!(
            "Paid {}. Cleared {} L of debt.\nRemaining debt: {} L.",
            format_cash(currency, amount),
            format_liters(pay.cleared_liters),
            format_liters(pay.remaining_debt)
        ),
    }
}

async fn run_export_command(
    service: &LedgerService,
    export_type: &str,
    output: Option<&str>,
    format: Option<&str>,
) -> Result<()> {
    use crate::io::Exporter;
    use std::fs::File;
    use std::io::{Write, stdout};

    let exporter = Exporter::new(service);

    // Determine output writer
    let writer: Box<dyn Write> = match output {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("Failed to create output file: {}", path))?;
            Box::new(file)
        }
        None => Box::new(stdout()),
    };

    match export_type {
        "balances" => {
            let count = match format.unwrap_or("csv") {
                "csv" => exporter.export_balances_csv(writer).await?,
                "json" => exporter.export_balances_json(writer).await?,
                other => anyhow::bail!("Invalid format '{}'. Valid formats: csv, json", other),
            };
            if output.is_some() {
                eprintln!("Exported {} balances", count);
            }
        }
        "state" => {
            let snapshot = exporter.export_state_json(writer).await?;
            if output.is_some() {
                eprintln!(
                    "Exported ledger state: {} registrations, {} pending rides",
                    snapshot
                        .state
                        .identity_to_bucket
                        .as_ref()
                        .map_or(0, |users| users.len()),
                    snapshot
                        .state
                        .pending_ride_start
                        .as_ref()
                        .map_or(0, |rides| rides.len())
                );
            }
        }
        _ => {
            anyhow::bail!(
                "Invalid export type '{}'. Valid types: state, balances",
                export_type
            );
        }
    }

    Ok(())
}

async fn run_import_command(
    service: &LedgerService,
    input: Option<&str>,
    dry_run: bool,
) -> Result<String> {
    use crate::io::Importer;
    use std::fs::File;
    use std::io::{Read, stdin};

    let importer = Importer::new(service);

    // Determine input reader
    let reader: Box<dyn Read> = match input {
        Some(path) => {
            let file =
                File::open(path).with_context(|| format!("Failed to open input file: {}", path))?;
            Box::new(file)
        }
        None => Box::new(stdin()),
    };

    let summary = importer.import_state_json(reader, dry_run).await?;

    let mut text = if summary.applied {
        String::from("Import complete\n")
    } else {
        String::from("Validation successful\n")
    };
    text.push_str(&format!("  Registrations: {}\n", summary.registrations));
    text.push_str(&format!("  Pending rides: {}\n", summary.pending_rides));
    text.push_str(&format!(
        "  Fuel in tanks: {} L\n",
        format_liters(summary.total_tank_liters)
    ));
    text.push_str(&format!(
        "  Outstanding debt: {} L",
        format_liters(summary.total_debt_liters)
    ));

    if !summary.corrections.is_empty() {
        text.push_str("\n\nCorrections:");
        for correction in &summary.corrections {
            text.push_str(&format!("\n  {}", correction));
        }
    }

    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn view(net_debt_liters: f64) -> StatusView {
        StatusView {
            bucket: "Aditya".to_string(),
            other_bucket: "Archit".to_string(),
            tanks: vec![("Aditya".to_string(), 0.0), ("Archit".to_string(), 19.0)],
            net_debt_liters,
            mileage_km_per_liter: 40.0,
            last_price_per_liter: 100.0,
        }
    }

    #[test]
    fn test_render_status_caller_owes() {
        let text = render_status(&view(1.0), "₹");
        assert!(text.contains("Tank (Aditya): 0.00 L"));
        assert!(text.contains("Tank (Archit): 19.00 L"));
        assert!(text.contains("You (Aditya) owe Archit 1.00 L (≈ ₹100.00)."));
        assert!(text.contains("Mileage: 40.00 km/L"));
        assert!(text.contains("Last Fuel Price: ₹100.00/L"));
    }

    #[test]
    fn test_render_status_other_owes_and_settled() {
        let text = render_status(&view(-0.5), "$");
        assert!(text.contains("Archit owes you (Aditya) 0.50 L (≈ $50.00)."));

        let text = render_status(&view(0.0), "$");
        assert!(text.contains("All square!"));
    }

    #[test]
    fn test_render_ride() {
        let ride = RideResult {
            distance_km: 40.0,
            used_liters: 1.0,
            borrowed_liters: 1.0,
            other_bucket: "Archit".to_string(),
        };
        assert_eq!(
            render_ride(&ride),
            "Ride of 40.00 km ended.\nFuel used: 1.00 L.\nBorrowed 1.00 L from Archit's bucket."
        );
    }

    #[test]
    fn test_render_pay() {
        let full = PayResult {
            cleared_liters: 2.0,
            remaining_debt: 0.0,
            amount_paid: None,
            other_bucket: "Archit".to_string(),
        };
        assert_eq!(render_pay(&full, "₹"), "Debt of 2.00 L cleared in full.");

        let cash = PayResult {
            amount_paid: Some(50.0),
            cleared_liters: 0.5,
            remaining_debt: 1.5,
            ..full
        };
        assert_eq!(
            render_pay(&cash, "₹"),
            "Paid ₹50.00. Cleared 0.50 L of debt.\nRemaining debt: 1.50 L."
        );
    }

    #[test]
    fn test_explain_adds_registration_hint() {
        let buckets = BucketPair::new("Aditya", "Archit");
        let err: anyhow::Error =
            AppError::from(LedgerError::NotRegistered("42".to_string())).into();

        let explained = explain(err, &buckets);

        assert_eq!(
            explained.to_string(),
            "You're not registered yet. Use `register Aditya` or `register Archit`"
        );
    }

    #[test]
    fn test_cli_parses_pay_and_aliases() {
        let cli = Cli::try_parse_from(["fuelsplit", "-u", "42", "pay", "full"]).unwrap();
        assert!(matches!(cli.command, Commands::Pay { ref amount } if amount == "full"));
        assert_eq!(cli.identity.as_deref(), Some("42"));

        let cli = Cli::try_parse_from(["fuelsplit", "ride_start", "1200.5"]).unwrap();
        assert!(matches!(cli.command, Commands::RideStart { odometer_km } if odometer_km == 1200.5));

        let cli = Cli::try_parse_from(["fuelsplit", "--buckets", "Left,Right", "status"]).unwrap();
        assert_eq!(cli.buckets, vec!["Left".to_string(), "Right".to_string()]);
    }

    #[test]
    fn test_cli_rejects_non_numeric_liters() {
        assert!(Cli::try_parse_from(["fuelsplit", "fill", "ten", "1000"]).is_err());
    }
}
