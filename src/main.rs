#![deny(clippy::all)]

use std::rc::Rc;

use log::*;

use postbox::config::Config;
use postbox::net::Relay;
use postbox::store::Storage;

fn setup_logger() {
    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", concat!(env!("CARGO_PKG_NAME"), "=debug"));
    }
    env_logger::init();
}

fn print_help() {
    println!("postbox v{}", env!("CARGO_PKG_VERSION"));
    println!("A single-domain mail relay over a length-framed binary protocol\n");
    println!("USAGE:");
    println!("    postbox [OPTIONS] [CONFIG_FILE]\n");
    println!("OPTIONS:");
    println!("    -h, --help       Show this help message\n");
    println!("ARGUMENTS:");
    println!("    [CONFIG_FILE]    Path to configuration file (default: config.toml)\n");
    println!("CONFIGURATION:");
    println!("The configuration file uses a simple key=value format with sections.\n");
    println!("[server] - Listener and domain");
    println!("  bind_addr = \"127.0.0.1:2525\"   # TCP bind address");
    println!("  domain = \"example.org\"         # The mail domain this relay serves");
    println!("  server_name = \"postbox\"        # Identifier used in error messages\n");
    println!("[storage] - Data layout");
    println!("  data_dir = \"data\"              # Root directory for accounts and mail\n");
    println!("[limits] - Connection and request limits");
    println!("  max_active_conns = 64          # Maximum concurrent connections");
    println!("  max_frame_bytes = 1048576      # Maximum wire frame size (1MB)");
    println!("  max_name_bytes = 64            # Max username length");
    println!("  max_subject_bytes = 512        # Max subject length");
    println!("  max_body_bytes = 262144        # Max body length (256KB)\n");
    println!("EXAMPLES:");
    println!("    postbox                      # Use default config.toml");
    println!("    postbox relay.toml           # Use custom config file");
    println!("    postbox --help               # Show this help");
}

fn main() {
    let mut args = std::env::args().skip(1);

    match args.next() {
        Some(arg) if arg == "-h" || arg == "--help" => print_help(),
        Some(path) => {
            setup_logger();
            let cfg = Config::load(&path).unwrap_or_else(|e| {
                eprintln!("failed to read config {}: {}", path, e);
                std::process::exit(1);
            });
            info!("config loaded from {}", path);
            run_server(Rc::new(cfg));
        }
        None => {
            setup_logger();
            // a missing default config file just means defaults
            let cfg = match Config::load("config.toml") {
                Ok(c) => {
                    info!("config loaded from config.toml");
                    c
                }
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                    info!("no config.toml; using built-in defaults");
                    Config::default()
                }
                Err(e) => {
                    eprintln!("failed to read config config.toml: {}", e);
                    std::process::exit(1);
                }
            };
            run_server(Rc::new(cfg));
        }
    }
}

fn run_server(cfg: Rc<Config>) {
    // One thread for everything: the relay is a single-threaded reactor and
    // the stores rely on handlers never running concurrently.
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .expect("failed to build runtime");
    let local = tokio::task::LocalSet::new();

    local.block_on(&runtime, async move {
        let storage = match Storage::open(&cfg) {
            Ok(s) => s,
            Err(e) => {
                eprintln!("failed to open storage: {}", e);
                std::process::exit(1);
            }
        };

        let relay = match Relay::bind(cfg, storage).await {
            Ok(r) => r,
            Err(e) => {
                eprintln!("failed to bind listener: {}", e);
                std::process::exit(1);
            }
        };

        info!("press Ctrl-C to stop");

        tokio::select! {
            _ = relay.run() => {}
            _ = tokio::signal::ctrl_c() => {
                info!("shutting down...");
            }
        }

        info!("Goodbye.");
    });
}
