//! CLI argument parsing

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use wiretap_capture::{DEFAULT_SNAPLEN, DEFAULT_TIMEOUT_MS};

#[derive(Parser, Debug)]
#[command(name = "wiretap")]
#[command(
    version,
    about = "Live packet capture sessions streamed to files and TCP subscribers",
    long_about = None
)]
pub struct Cli {
    /// Verbose output (-v, -vv, -vvv for increasing verbosity)
    #[arg(short = 'v', long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List host capture devices
    Devices {
        /// Output format: text | json
        #[arg(long, default_value = "text")]
        format: String,
    },

    /// Capture live packets from a device. Root privilege is required.
    Capture {
        /// Device to capture on; use "wiretap devices" to list them
        device: String,

        /// BPF filter expression
        #[arg(short = 'f', long, default_value = "")]
        filter: String,

        /// Bytes captured per frame; longer frames are truncated
        #[arg(short = 's', long, default_value_t = DEFAULT_SNAPLEN)]
        snaplen: i32,

        /// Put the device in promiscuous mode
        #[arg(short = 'p', long)]
        promisc: bool,

        /// Capture read timeout in milliseconds
        #[arg(long, default_value_t = DEFAULT_TIMEOUT_MS)]
        timeout_ms: i32,

        /// Output format: text | json
        #[arg(long, default_value = "text")]
        format: String,

        /// Write captured packets into FILE (default: stdout)
        #[arg(short = 'o', long, value_name = "FILE")]
        output: Option<PathBuf>,
    },

    /// Run the control server for remote session management
    Serve {
        /// Listen address
        #[arg(long, default_value = "127.0.0.1:9800")]
        addr: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_devices() {
        let cli = Cli::try_parse_from(["wiretap", "devices"]).unwrap();
        let Commands::Devices { format } = cli.command else {
            panic!("expected devices command");
        };
        assert_eq!(format, "text");
    }

    #[test]
    fn test_parse_capture_defaults() {
        let cli = Cli::try_parse_from(["wiretap", "capture", "eth0"]).unwrap();
        let Commands::Capture {
            device,
            filter,
            snaplen,
            promisc,
            timeout_ms,
            format,
            output,
        } = cli.command
        else {
            panic!("expected capture command");
        };

        assert_eq!(device, "eth0");
        assert!(filter.is_empty());
        assert_eq!(snaplen, DEFAULT_SNAPLEN);
        assert!(!promisc);
        assert_eq!(timeout_ms, DEFAULT_TIMEOUT_MS);
        assert_eq!(format, "text");
        assert!(output.is_none());
    }

    #[test]
    fn test_parse_capture_full() {
        let cli = Cli::try_parse_from([
            "wiretap", "capture", "lo", "-f", "tcp port 80", "-s", "1600", "-p", "--format",
            "json", "-o", "/tmp/out.json", "-vv",
        ])
        .unwrap();

        assert_eq!(cli.verbose, 2);
        let Commands::Capture {
            device,
            filter,
            snaplen,
            promisc,
            output,
            ..
        } = cli.command
        else {
            panic!("expected capture command");
        };
        assert_eq!(device, "lo");
        assert_eq!(filter, "tcp port 80");
        assert_eq!(snaplen, 1600);
        assert!(promisc);
        assert_eq!(output.unwrap(), PathBuf::from("/tmp/out.json"));
    }

    #[test]
    fn test_parse_serve() {
        let cli = Cli::try_parse_from(["wiretap", "serve", "--addr", "0.0.0.0:9999"]).unwrap();
        let Commands::Serve { addr } = cli.command else {
            panic!("expected serve command");
        };
        assert_eq!(addr, "0.0.0.0:9999");
    }

    #[test]
    fn test_capture_requires_device() {
        assert!(Cli::try_parse_from(["wiretap", "capture"]).is_err());
    }
}
