use bankpay::application::{Collaborators, PaymentGateway};
use bankpay::application::request_builder::RequestBuilder;
use bankpay::config::{GatewayConfig, keys};
use bankpay::domain::callback::{
    CallbackRequest, ORDER_ID_PARAM, PAYMENT_HASH_PARAM, PAYMENT_ID_PARAM,
};
use bankpay::domain::money::CurrencyCode;
use bankpay::domain::ports::OrderSystem;
use bankpay::infrastructure::http::ReqwestTransport;
use bankpay::infrastructure::in_memory::FixedRateConverter;
use bankpay::infrastructure::logging::{TracingEventLogger, init_tracing};
use bankpay::infrastructure::settings::{EnvSettings, InMemorySettings, LayeredSettings};
use bankpay::infrastructure::template::PlaceholderRenderer;
use bankpay::interfaces::json::snapshot_reader::{OrderSnapshot, SnapshotReader};
use clap::{Parser, Subcommand};
use miette::{IntoDiagnostic, Result, miette};
use rust_decimal::Decimal;
use std::collections::BTreeMap;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Use the gateway's sandbox endpoints
    #[arg(long, global = true)]
    sandbox: bool,

    /// Log every gateway exchange
    #[arg(long, global = true)]
    debug: bool,

    /// Exchange rate as FROM:TO:RATE, meaning 1 FROM = RATE TO. Repeatable.
    #[arg(long = "rate", global = true, value_parser = parse_rate)]
    rates: Vec<(CurrencyCode, CurrencyCode, Decimal)>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Register the snapshot's order and print the payment page URL
    Register {
        /// Order snapshot (JSON)
        snapshot: PathBuf,

        /// Print the request form instead of sending it
        #[arg(long)]
        dry_run: bool,
    },
    /// Reconcile a gateway callback against the snapshot's payments
    Callback {
        /// Order snapshot (JSON)
        snapshot: PathBuf,

        #[arg(long)]
        order_id: String,

        #[arg(long)]
        payment_id: Option<String>,

        #[arg(long)]
        payment_hash: Option<String>,
    },
    /// Check that the gateway settings are usable
    CheckConfig,
}

fn parse_rate(raw: &str) -> std::result::Result<(CurrencyCode, CurrencyCode, Decimal), String> {
    let parts: Vec<&str> = raw.split(':').collect();
    let [from, to, rate] = parts.as_slice() else {
        return Err(format!("expected FROM:TO:RATE, got `{raw}`"));
    };
    let from = CurrencyCode::new(from).map_err(|e| e.to_string())?;
    let to = CurrencyCode::new(to).map_err(|e| e.to_string())?;
    let rate = rate
        .parse::<Decimal>()
        .map_err(|e| format!("invalid rate `{rate}`: {e}"))?;
    Ok((from, to, rate))
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    init_tracing();
    let cli = Cli::parse();

    let mut overrides = InMemorySettings::new();
    if cli.sandbox {
        overrides.set(keys::SANDBOX, "1");
    }
    if cli.debug {
        overrides.set(keys::DEBUG, "1");
    }
    let settings = LayeredSettings::new(overrides, EnvSettings::default());
    let config = GatewayConfig::from_settings(&settings).into_diagnostic()?;

    if let Some(warning) = config.setup_warning() {
        eprintln!("WARNING: {warning}");
    }

    let converter = cli
        .rates
        .iter()
        .cloned()
        .fold(FixedRateConverter::new(), |converter, (from, to, rate)| {
            converter.with_rate(from, to, rate)
        });

    match cli.command {
        Command::CheckConfig => Ok(if config.setup_warning().is_some() {
            ExitCode::FAILURE
        } else {
            println!("configuration ok");
            ExitCode::SUCCESS
        }),
        Command::Register { snapshot, dry_run } => {
            let snapshot = read_snapshot(&snapshot)?;
            if dry_run {
                print_request(config, converter, snapshot).await?;
                return Ok(ExitCode::SUCCESS);
            }

            let gateway = build_gateway(config, converter, snapshot).await?;
            match gateway.links.payment_link().await {
                Some(url) => {
                    println!("{url}");
                    Ok(ExitCode::SUCCESS)
                }
                None => {
                    eprintln!("no payment link available");
                    Ok(ExitCode::FAILURE)
                }
            }
        }
        Command::Callback {
            snapshot,
            order_id,
            payment_id,
            payment_hash,
        } => {
            let snapshot = read_snapshot(&snapshot)?;
            let mut request = CallbackRequest::new();
            request.push(ORDER_ID_PARAM, order_id);
            if let Some(payment_id) = payment_id {
                request.push(PAYMENT_ID_PARAM, payment_id);
            }
            if let Some(payment_hash) = payment_hash {
                request.push(PAYMENT_HASH_PARAM, payment_hash);
            }

            let gateway = build_gateway(config, converter, snapshot).await?;
            let outcome = gateway.callbacks.handle_callback(&request).await;
            println!("{outcome}");
            Ok(if outcome.redirect().is_some() {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            })
        }
    }
}

fn read_snapshot(path: &Path) -> Result<OrderSnapshot> {
    let file = File::open(path).into_diagnostic()?;
    SnapshotReader::new(file).read().into_diagnostic()
}

async fn build_gateway(
    config: GatewayConfig,
    converter: FixedRateConverter,
    snapshot: OrderSnapshot,
) -> Result<PaymentGateway> {
    let transport = ReqwestTransport::new(&config).into_diagnostic()?;
    let orders = snapshot.into_order_system().await;

    Ok(PaymentGateway::new(
        config,
        Collaborators {
            orders: Arc::new(orders),
            converter: Arc::new(converter),
            renderer: Arc::new(PlaceholderRenderer),
            transport: Arc::new(transport),
            logger: Arc::new(TracingEventLogger),
        },
    ))
}

/// Prints the registration form (without credentials) for the snapshot's order.
async fn print_request(
    config: GatewayConfig,
    converter: FixedRateConverter,
    snapshot: OrderSnapshot,
) -> Result<()> {
    let orders = snapshot.into_order_system().await;
    let order = orders.current_order().await.into_diagnostic()?;
    let cart = orders.current_cart().await.into_diagnostic()?;
    let payment = orders
        .create_payment(order.id, order.outstanding())
        .await
        .into_diagnostic()?;

    let builder = RequestBuilder::new(
        Arc::new(config),
        Arc::new(converter),
        Arc::new(PlaceholderRenderer),
    );
    let request = builder.build(&order, &payment, &cart).into_diagnostic()?;
    let fields: BTreeMap<String, String> =
        request.form_fields().into_diagnostic()?.into_iter().collect();

    let output = serde_json::to_string_pretty(&fields).map_err(|e| miette!("{e}"))?;
    println!("{output}");
    Ok(())
}
