//! Command implementations

use std::path::PathBuf;
use std::sync::Arc;
use wiretap_capture::list_devices;
use wiretap_core::{Error, Result};
use wiretap_server::ControlServer;
use wiretap_session::{OutputTarget, SessionConfig, SessionManager};
use wiretap_stream::Formatter;

/// Print host capture devices
pub fn devices(format: &str) -> Result<()> {
    let format: Formatter = format.parse()?;
    let devices = list_devices()?;

    match format {
        Formatter::Text => {
            for device in &devices {
                println!("{device}");
                println!();
            }
        }
        Formatter::Json => {
            let json =
                serde_json::to_string(&devices).map_err(|e| Error::Format(e.to_string()))?;
            println!("{json}");
        }
    }
    Ok(())
}

/// Options for the capture command
pub struct CaptureOpts {
    pub device: String,
    pub filter: String,
    pub snaplen: i32,
    pub promisc: bool,
    pub timeout_ms: i32,
    pub format: String,
    pub output: Option<PathBuf>,
}

/// Run one foreground capture session until Ctrl-C
pub async fn capture(opts: CaptureOpts) -> Result<()> {
    let output = match opts.output {
        Some(path) => OutputTarget::File(path),
        None => OutputTarget::File(PathBuf::from("/dev/stdout")),
    };

    let mut config = SessionConfig::new(opts.device)
        .with_filter(opts.filter)
        .with_format(opts.format.parse()?)
        .with_output(output);
    config.snaplen = opts.snaplen;
    config.promiscuous = opts.promisc;
    config.timeout_ms = opts.timeout_ms;

    let manager = SessionManager::new();
    let id = manager.start_session(config).await?;
    // stdout may be the sink, so talk to the user on stderr
    eprintln!("capturing (session {id}); press Ctrl-C to stop");

    tokio::signal::ctrl_c().await?;
    manager.close_session(id)?;
    eprintln!("session closed");
    Ok(())
}

/// Run the control server until the process ends
pub async fn serve(addr: String) -> Result<()> {
    let manager = Arc::new(SessionManager::new());
    let server = ControlServer::new(addr, manager);
    server.start().await
}
