//! Command Parser
//!
//! Parses the line commands of the control connection.

use std::collections::HashMap;
use wiretap_core::SessionId;

/// Control connection command
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Show help
    Help,
    /// List host capture devices
    Devices,
    /// Start a capture session
    Start { params: HashMap<String, String> },
    /// Stop a capture session
    Stop { session_id: SessionId },
    /// List active sessions
    List,
    /// Stream a session's frames on this connection
    Stream { session_id: SessionId },
    /// Exit the connection
    Exit,
}

/// Command parser
pub struct CommandParser;

impl CommandParser {
    /// Parse a command line
    pub fn parse(line: &str) -> Result<Command, String> {
        let line = line.trim();
        if line.is_empty() {
            return Err("Empty command".to_string());
        }

        let parts: Vec<&str> = line.split_whitespace().collect();
        let cmd = parts[0].to_lowercase();

        match cmd.as_str() {
            "help" | "?" => Ok(Command::Help),
            "devices" => Ok(Command::Devices),
            "start" => Self::parse_start(&parts[1..]),
            "stop" => {
                let session_id = Self::parse_session_id(&parts, "Usage: stop <session-id>")?;
                Ok(Command::Stop { session_id })
            }
            "list" | "sessions" => Ok(Command::List),
            "stream" => {
                let session_id = Self::parse_session_id(&parts, "Usage: stream <session-id>")?;
                Ok(Command::Stream { session_id })
            }
            "exit" | "quit" | "q" => Ok(Command::Exit),
            _ => Err(format!(
                "Unknown command: {cmd}. Type 'help' for available commands."
            )),
        }
    }

    /// Parse start command arguments
    fn parse_start(parts: &[&str]) -> Result<Command, String> {
        // start device=DEV [key=value ...]
        let mut params = HashMap::new();
        for part in parts {
            if let Some((key, value)) = part.split_once('=') {
                params.insert(key.to_string(), value.to_string());
            } else {
                return Err(format!(
                    "Invalid parameter format: {part}. Expected key=value"
                ));
            }
        }

        if !params.contains_key("device") {
            return Err(
                "Usage: start device=DEV [filter=BPF] [snaplen=N] [promisc=BOOL] \
                 [timeout-ms=N] [format=text|json] [output=broadcast|file:PATH]"
                    .to_string(),
            );
        }

        Ok(Command::Start { params })
    }

    fn parse_session_id(parts: &[&str], usage: &str) -> Result<SessionId, String> {
        if parts.len() < 2 {
            return Err(usage.to_string());
        }
        parts[1]
            .parse::<SessionId>()
            .map_err(|_| format!("Invalid session id: {}", parts[1]))
    }

    /// Get help text
    pub fn help_text() -> &'static str {
        "Available commands:\r\n\
         ==================\r\n\
         devices                      List host capture devices (JSON)\r\n\
         start device=DEV [opts]      Start a capture session\r\n\
           opts: filter=BPF snaplen=N promisc=BOOL timeout-ms=N\r\n\
                 format=text|json output=broadcast|file:PATH\r\n\
         stop <session-id>            Stop a session\r\n\
         list                         List active sessions\r\n\
         stream <session-id>          Stream a session's frames here\r\n\
         help                         Show this help\r\n\
         exit                         Close the connection\r\n"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple_commands() {
        assert_eq!(CommandParser::parse("help").unwrap(), Command::Help);
        assert_eq!(CommandParser::parse("?").unwrap(), Command::Help);
        assert_eq!(CommandParser::parse("devices").unwrap(), Command::Devices);
        assert_eq!(CommandParser::parse("list").unwrap(), Command::List);
        assert_eq!(CommandParser::parse("exit").unwrap(), Command::Exit);
        assert_eq!(CommandParser::parse("  QUIT  ").unwrap(), Command::Exit);
    }

    #[test]
    fn test_parse_empty_line() {
        assert!(CommandParser::parse("").is_err());
        assert!(CommandParser::parse("   ").is_err());
    }

    #[test]
    fn test_parse_unknown_command() {
        let err = CommandParser::parse("frobnicate").unwrap_err();
        assert!(err.contains("Unknown command"));
    }

    #[test]
    fn test_parse_start() {
        let command =
            CommandParser::parse("start device=eth0 filter=tcp format=json output=broadcast")
                .unwrap();
        let Command::Start { params } = command else {
            panic!("expected start command");
        };
        assert_eq!(params["device"], "eth0");
        assert_eq!(params["filter"], "tcp");
        assert_eq!(params["format"], "json");
        assert_eq!(params["output"], "broadcast");
    }

    #[test]
    fn test_parse_start_requires_device() {
        assert!(CommandParser::parse("start filter=tcp").is_err());
        assert!(CommandParser::parse("start").is_err());
    }

    #[test]
    fn test_parse_start_rejects_bare_words() {
        assert!(CommandParser::parse("start eth0").is_err());
    }

    #[test]
    fn test_parse_stop_and_stream() {
        let id = wiretap_core::SessionId::generate();

        let command = CommandParser::parse(&format!("stop {id}")).unwrap();
        assert_eq!(command, Command::Stop { session_id: id });

        let command = CommandParser::parse(&format!("stream {id}")).unwrap();
        assert_eq!(command, Command::Stream { session_id: id });
    }

    #[test]
    fn test_parse_stop_invalid_id() {
        assert!(CommandParser::parse("stop not-a-uuid").is_err());
        assert!(CommandParser::parse("stop").is_err());
    }
}
