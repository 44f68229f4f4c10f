// ABOUTME: Command-line tool that sends one SMS and prints the outcome as JSON
// ABOUTME: Settings come from a YAML file or the environment, with flag overrides

use argh::FromArgs;
use smpp_dispatch::billing::{BillingGateway, HttpBillingGateway, NoopBilling};
use smpp_dispatch::client::{SendOutcome, SendRequest, Session};
use smpp_dispatch::config::Config;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;
use tracing::{Level, error};
use tracing_subscriber::FmtSubscriber;

/// Send one SMS through an SMPP transceiver session and wait for its outcome
#[derive(FromArgs)]
struct CliArgs {
    /// enable debug logging
    #[argh(switch, short = 'd')]
    debugging: bool,

    /// YAML configuration file (default: SMPP_* environment variables)
    #[argh(option, short = 'c')]
    config: Option<PathBuf>,

    /// the hostname or IP address of the SMSC
    #[argh(option)]
    host: Option<String>,

    /// the port to use when connecting to the SMSC
    #[argh(option, short = 'p')]
    port: Option<u16>,

    /// the system id
    #[argh(option)]
    system_id: Option<String>,

    /// the password
    #[argh(option)]
    password: Option<String>,

    /// sender shown on the handset
    #[argh(option, short = 'f')]
    source: Option<String>,

    /// the recipient telephone number
    #[argh(option, short = 't')]
    destination: String,

    /// the message to send
    #[argh(option, short = 'm')]
    message: String,

    /// do not ask for a delivery receipt
    #[argh(switch)]
    no_receipt: bool,

    /// seconds to wait for the outcome
    #[argh(option)]
    timeout: Option<u64>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args: CliArgs = argh::from_env();

    let level = if args.debugging { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .finish();
    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("failed to install logger: {e}");
    }

    match run(args).await {
        Ok(outcome) => match serde_json::to_string_pretty(&outcome) {
            Ok(json) => {
                println!("{json}");
                ExitCode::SUCCESS
            }
            Err(e) => {
                error!(error = %e, "failed to render outcome");
                ExitCode::FAILURE
            }
        },
        Err(e) => {
            let body = serde_json::json!({ "status": "FAILED", "reason": e.to_string() });
            println!("{body}");
            ExitCode::FAILURE
        }
    }
}

async fn run(args: CliArgs) -> smpp_dispatch::Result<SendOutcome> {
    let mut config = match &args.config {
        Some(path) => Config::load(path)?,
        None => Config::from_env()?,
    };

    if let Some(host) = args.host {
        config.host = host;
    }
    if let Some(port) = args.port {
        config.port = port;
    }
    if let Some(system_id) = args.system_id {
        config.system_id = system_id;
    }
    if let Some(password) = args.password {
        config.password = password;
    }
    if let Some(timeout) = args.timeout {
        config.delivery_timeout = Duration::from_secs(timeout);
    }
    config.validate()?;

    let mut request = SendRequest::new(args.destination, args.message);
    if let Some(source) = args.source {
        request = request.from(source);
    }
    if args.no_receipt {
        request = request.without_delivery_receipt();
    }

    match config.billing.clone() {
        Some(billing) => {
            let gateway =
                HttpBillingGateway::new(&billing.base_url, &billing.internal_key, billing.timeout)?;
            send(config, gateway, request).await
        }
        None => send(config, NoopBilling::default(), request).await,
    }
}

async fn send<B: BillingGateway>(
    config: Config,
    billing: B,
    request: SendRequest,
) -> smpp_dispatch::Result<SendOutcome> {
    let credentials = config.credentials();
    let session = Session::new(config, billing);

    session.connect().await?;
    session.bind(&credentials).await?;

    let outcome = session.send(request).await;
    session.close().await?;
    Ok(outcome?)
}
