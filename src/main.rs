//! HTTP Scenario Mock - CLI Entry Point
//!
//! Resolves a single request against scenario files without touching the
//! network, or validates a scenario file.

use anyhow::Result;
use clap::Parser;
use http::Request;
use http_scenario_mock::config::validate_scenario;
use http_scenario_mock::{
    InterceptError, InterceptorConfig, MockInterceptor, MockResponse, Mode, ScenarioFormat,
};
use std::cell::Cell;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[command(
    name = "http-scenario-mock",
    about = "Resolve HTTP requests against scenario files - offline request matching and response synthesis",
    version
)]
struct Args {
    /// URL of the request to resolve
    url: Option<String>,

    /// Path to configuration file
    #[arg(short, long, default_value = "http-scenario-mock.yaml")]
    config: PathBuf,

    /// Interception mode (overrides the configuration)
    #[arg(short, long)]
    mode: Option<Mode>,

    /// Global fake network delay in milliseconds (overrides the configuration)
    #[arg(long)]
    delay: Option<u64>,

    /// Request method
    #[arg(short = 'X', long, default_value = "GET")]
    method: String,

    /// Request header as "Name: value" (repeatable)
    #[arg(short = 'H', long = "header", value_name = "HEADER")]
    headers: Vec<String>,

    /// Request body
    #[arg(short, long)]
    data: Option<String>,

    /// Validate a scenario file and exit
    #[arg(long, value_name = "FILE")]
    validate: Option<PathBuf>,

    /// Print default configuration and exit
    #[arg(long)]
    print_config: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short = 'L', long, default_value = "info")]
    log_level: Level,
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_max_level(args.log_level)
        .with_target(false)
        .with_writer(io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    if args.print_config {
        print!("{}", serde_yaml::to_string(&InterceptorConfig::default())?);
        return Ok(());
    }

    // Load configuration
    let mut config = if args.config.exists() {
        info!(path = ?args.config, "Loading configuration");
        InterceptorConfig::from_file(&args.config)?
    } else {
        info!("Using default configuration");
        InterceptorConfig::default()
    };

    if let Some(path) = &args.validate {
        return validate(path, config.format);
    }

    if let Some(mode) = args.mode {
        config.mode = mode;
    }
    if let Some(delay) = args.delay {
        config.delay_ms = delay;
    }

    let Some(url) = &args.url else {
        anyhow::bail!("A URL is required unless --validate or --print-config is given");
    };
    let request = build_request(&args.method, url, &args.headers, args.data.as_deref())?;

    let interceptor = MockInterceptor::from_config(&config);

    // Offline: a forwarded request is reported, never sent
    let forwarded = Cell::new(false);
    let transport = |_: Request<Vec<u8>>| -> io::Result<MockResponse> {
        forwarded.set(true);
        Err(io::Error::new(
            io::ErrorKind::NotConnected,
            "request would be forwarded to the network",
        ))
    };

    match interceptor.intercept(request, &transport) {
        Ok(response) => {
            print_response(&response);
            Ok(())
        }
        Err(InterceptError::Network(_)) if forwarded.get() => {
            println!("No scenario answered, request forwarded to the network");
            Ok(())
        }
        Err(InterceptError::Network(e)) => {
            println!("Simulated network error ({:?}): {}", e.kind(), e);
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}

fn validate(path: &Path, format: ScenarioFormat) -> Result<()> {
    let format = match path.extension().and_then(|e| e.to_str()) {
        Some("yaml") | Some("yml") => ScenarioFormat::Yaml,
        Some("json") => ScenarioFormat::Json,
        _ => format,
    };
    let content = std::fs::read(path)?;
    let problems = validate_scenario(&content, format.mapper().as_ref())?;

    if problems.is_empty() {
        println!("Scenario file is valid");
        return Ok(());
    }
    for problem in &problems {
        println!("{}", problem);
    }
    anyhow::bail!("{} problem(s) found in {}", problems.len(), path.display())
}

fn build_request(
    method: &str,
    url: &str,
    headers: &[String],
    data: Option<&str>,
) -> Result<Request<Vec<u8>>> {
    let mut builder = Request::builder().method(method.to_ascii_uppercase().as_str()).uri(url);
    for header in headers {
        let Some((name, value)) = header.split_once(':') else {
            anyhow::bail!("Invalid header {:?}, expected \"Name: value\"", header);
        };
        builder = builder.header(name.trim(), value.trim());
    }
    Ok(builder.body(data.unwrap_or_default().as_bytes().to_vec())?)
}

fn print_response(response: &MockResponse) {
    println!("{:?} {} {}", response.version, response.status, response.reason);
    for (name, value) in &response.headers {
        println!("{}: {}", name, String::from_utf8_lossy(value.as_bytes()));
    }
    println!();
    println!("{}", response.text());
}
