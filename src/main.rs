//! quiet-tls - inspect and self-test the TLS obfuscation layer

use std::process::ExitCode;

use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use quiet_tls::config::{LogLevel, ObfsConfig};
use quiet_tls::protocol::tls::parse_client_hello;
use quiet_tls::{Obfuscator, Recoverable};

enum Source {
    File(String),
    Options(String),
    Plugin { name: String, param: String, password: String },
}

struct Cli {
    source: Source,
    log_level: Option<String>,
    self_test: bool,
}

fn usage() {
    eprintln!("Usage: quiet-tls [config.toml] [OPTIONS]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --options <STRING>             ServerName=..;Key=..;TicketTimeHint=..;Browser=..");
    eprintln!("  --plugin <NAME> <PARAM> <PASS> Build options from a plugin triple");
    eprintln!("  --log-level <LEVEL>            debug|verbose|normal|silent");
    eprintln!("  --self-test                    Run a loopback encode/decode exchange");
    eprintln!("  --help, -h                     Show this help");
}

fn parse_cli() -> Cli {
    let mut source = Source::File("config.toml".to_string());
    let mut log_level: Option<String> = None;
    let mut self_test = false;

    let args: Vec<String> = std::env::args().skip(1).collect();
    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--options" => {
                i += 1;
                if let Some(s) = args.get(i) {
                    source = Source::Options(s.clone());
                }
            }
            "--plugin" => {
                if i + 3 < args.len() {
                    source = Source::Plugin {
                        name: args[i + 1].clone(),
                        param: args[i + 2].clone(),
                        password: args[i + 3].clone(),
                    };
                    i += 3;
                } else {
                    eprintln!("--plugin needs <NAME> <PARAM> <PASS>");
                    std::process::exit(2);
                }
            }
            "--log-level" => {
                i += 1;
                if i < args.len() {
                    log_level = Some(args[i].clone());
                }
            }
            s if s.starts_with("--log-level=") => {
                log_level = Some(s.trim_start_matches("--log-level=").to_string());
            }
            "--self-test" => {
                self_test = true;
            }
            "--help" | "-h" => {
                usage();
                std::process::exit(0);
            }
            "--version" | "-V" => {
                println!("quiet-tls {}", env!("CARGO_PKG_VERSION"));
                std::process::exit(0);
            }
            s if !s.starts_with('-') => {
                source = Source::File(s.to_string());
            }
            other => {
                eprintln!("Unknown option: {}", other);
            }
        }
        i += 1;
    }

    Cli { source, log_level, self_test }
}

fn load_config(source: &Source) -> quiet_tls::Result<Option<ObfsConfig>> {
    match source {
        Source::File(path) => ObfsConfig::load(path).map(Some),
        Source::Options(options) => ObfsConfig::from_options(options).map(Some),
        Source::Plugin { name, param, password } => ObfsConfig::from_plugin(name, param, password),
    }
}

/// Hex dump in 16-byte rows.
fn dump(label: &str, bytes: &[u8]) {
    println!("{} ({} bytes)", label, bytes.len());
    for (row, chunk) in bytes.chunks(16).enumerate() {
        println!("  {:04x}  {}", row * 16, hex::encode(chunk));
    }
}

fn run_self_test(obfs: &Obfuscator) -> quiet_tls::Result<()> {
    let mut client = obfs.new_connection();
    let request = b"GET / HTTP/1.1\r\nHost: self-test\r\n\r\n";
    let hello = client.encode(request)?;
    info!(hello = hello.len(), "ClientHello sent");

    let reply = obfs.server_reply();
    match client.decode(&reply[..10]) {
        Err(e) if e.is_recoverable() => info!(error = %e, "Partial reply held"),
        other => warn!(result = ?other.map(|d| d.send_back), "Partial reply not held"),
    }

    let decoded = client.decode(&reply[10..])?;
    if !decoded.send_back {
        warn!("Server reply did not request send-back");
    }
    let flushed = client.encode(&[])?;
    info!(phase = %client.phase(), flushed = flushed.len(), "Handshake finished");

    // The peer only needs to be established to unwrap data records.
    let mut peer = obfs.new_connection();
    peer.encode(&[])?;
    peer.decode(&reply)?;
    peer.encode(&[])?;

    let payload: Vec<u8> = (0..64 * 1024u32).map(|i| (i % 251) as u8).collect();
    let wire = client.encode(&payload)?;
    let mut received = Vec::with_capacity(payload.len());
    for chunk in wire.chunks(1500) {
        received.extend(peer.decode(chunk)?.payload);
    }

    if received == payload {
        info!(payload = payload.len(), wire = wire.len(), "Loopback self-test passed");
        Ok(())
    } else {
        Err(quiet_tls::ObfsError::Config(format!(
            "loopback mismatch: sent {} bytes, received {}",
            payload.len(),
            received.len()
        )))
    }
}

fn main() -> ExitCode {
    let cli = parse_cli();

    let config = match load_config(&cli.source) {
        Ok(Some(c)) => c,
        Ok(None) => {
            eprintln!("[quiet-tls] Plugin is not go_quiet, nothing to do");
            return ExitCode::SUCCESS;
        }
        Err(e) => {
            eprintln!("[quiet-tls] Error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let effective_log_level = match cli.log_level {
        Some(ref s) => LogLevel::from_str_loose(s),
        None => config.general.log_level.clone(),
    };
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        EnvFilter::new(effective_log_level.to_filter_str())
    };
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::Layer::default().with_writer(std::io::stderr))
        .init();

    info!("quiet-tls v{}", env!("CARGO_PKG_VERSION"));
    info!("Log level: {}", effective_log_level);

    let obfs = Obfuscator::from_config(&config);
    if obfs.prng_degraded() {
        warn!("Running with degraded randomness");
    }

    let hello = obfs.client_hello();
    dump("ClientHello", &hello);
    if let Some(layout) = parse_client_hello(&hello) {
        println!(
            "  record_len={} body_len={} extensions={} ({} bytes) server_name={}",
            layout.record_len,
            layout.body_len,
            layout.extensions.len(),
            layout.extensions_len,
            layout.server_name().unwrap_or_default()
        );
    }
    dump("Server reply", &obfs.server_reply());

    let mut code = ExitCode::SUCCESS;
    if cli.self_test
        && let Err(e) = run_self_test(&obfs)
    {
        error!(error = %e, "Self-test failed");
        code = ExitCode::FAILURE;
    }

    obfs.teardown();
    code
}
