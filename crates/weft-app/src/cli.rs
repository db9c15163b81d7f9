use clap::{Parser, Subcommand};

/// weft: native webview embedding with a JSON bridge.
#[derive(Parser, Debug)]
#[command(name = "weft", version, about)]
pub struct Args {
    /// Config file path override.
    #[arg(long)]
    pub config: Option<String>,

    /// Log level override (trace, debug, info, warn, error).
    #[arg(long)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Drive a headless webview from stdin and print what it sends.
    Console,
    /// Open a URL in a native window.
    Open {
        /// Page to load. Falls back to `webview.url` from the config.
        url: Option<String>,
    },
}

pub fn parse() -> Args {
    Args::parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn console_is_optional() {
        let args = Args::try_parse_from(["weft"]).unwrap();
        assert_eq!(args.command, None);

        let args = Args::try_parse_from(["weft", "--log-level", "debug", "console"]).unwrap();
        assert_eq!(args.command, Some(Command::Console));
        assert_eq!(args.log_level.as_deref(), Some("debug"));
    }

    #[test]
    fn open_takes_url() {
        let args = Args::try_parse_from(["weft", "open", "https://example.org"]).unwrap();
        assert_eq!(
            args.command,
            Some(Command::Open {
                url: Some("https://example.org".into())
            })
        );
    }
}
