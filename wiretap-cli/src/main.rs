use clap::Parser;
use tracing_subscriber::EnvFilter;
use wiretap_cli::args::{Cli, Commands};
use wiretap_cli::commands::{self, CaptureOpts};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match cli.command {
        Commands::Devices { format } => commands::devices(&format),
        Commands::Capture {
            device,
            filter,
            snaplen,
            promisc,
            timeout_ms,
            format,
            output,
        } => {
            commands::capture(CaptureOpts {
                device,
                filter,
                snaplen,
                promisc,
                timeout_ms,
                format,
                output,
            })
            .await
        }
        Commands::Serve { addr } => commands::serve(addr).await,
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();
}
