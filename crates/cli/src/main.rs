use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "pulsebot")]
#[command(about = "Pulsebot — Telegram relay bot", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Show version
    Version,

    /// Run the bot: Telegram channel, relay and action routing, and the
    /// health endpoint.
    Run {
        /// Config file path (default: PULSEBOT_CONFIG_PATH or ~/.pulsebot/config.json)
        #[arg(long, short, value_name = "PATH")]
        config: Option<std::path::PathBuf>,

        /// HTTP listener port (default from config, PORT env, or 8080)
        #[arg(long, short)]
        port: Option<u16>,
    },
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Version) => {
            println!("pulsebot {}", env!("CARGO_PKG_VERSION"));
        }
        Some(Commands::Run { config, port }) => {
            if let Err(e) = run(config, port).await {
                log::error!("run failed: {}", e);
                std::process::exit(1);
            }
        }
        None => {
            println!("Run with --help for usage");
        }
    }
}

async fn run(
    config_path: Option<std::path::PathBuf>,
    port: Option<u16>,
) -> anyhow::Result<()> {
    let (mut config, path) = lib::config::load_config(config_path)?;
    log::debug!("config loaded from {}", path.display());
    // Precedence for the listen port: --port flag, then PORT env, then config.
    if let Some(p) = port {
        config.server.port = p;
    } else if let Some(p) = lib::config::resolve_port_env() {
        config.server.port = p;
    }
    log::info!("starting pulsebot on {}:{}", config.server.bind, config.server.port);
    lib::server::run(config).await
}
