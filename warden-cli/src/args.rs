//! Command-line parsing for the probe binary.

use std::path::PathBuf;

pub const USAGE: &str = "\
usage: warden [--config <path>] identify <thing_key>
       warden [--config <path>] authorize <channel_id> <thing_id>";

/// What to ask the resolver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Identify { thing_key: String },
    Authorize { channel_id: String, thing_id: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Args {
    pub config: Option<PathBuf>,
    pub command: Command,
}

/// Parse arguments, excluding the program name.
///
/// Returns a usage message on any malformed invocation.
pub fn parse<I>(args: I) -> Result<Args, String>
where
    I: IntoIterator<Item = String>,
{
    let mut config = None;
    let mut positional = Vec::new();
    let mut iter = args.into_iter();

    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--config" => {
                let path = iter
                    .next()
                    .ok_or_else(|| "--config requires a path".to_string())?;
                config = Some(PathBuf::from(path));
            }
            "-h" | "--help" => return Err(USAGE.to_string()),
            flag if flag.starts_with("--") => return Err(format!("unknown flag: {}", flag)),
            _ => positional.push(arg),
        }
    }

    let mut positional = positional.into_iter();
    let command = match positional.next().as_deref() {
        Some("identify") => Command::Identify {
            thing_key: positional
                .next()
                .ok_or_else(|| "identify requires <thing_key>".to_string())?,
        },
        Some("authorize") => {
            let channel_id = positional
                .next()
                .ok_or_else(|| "authorize requires <channel_id> <thing_id>".to_string())?;
            let thing_id = positional
                .next()
                .ok_or_else(|| "authorize requires <channel_id> <thing_id>".to_string())?;
            Command::Authorize {
                channel_id,
                thing_id,
            }
        }
        Some(other) => return Err(format!("unknown command: {}", other)),
        None => return Err(USAGE.to_string()),
    };

    if let Some(extra) = positional.next() {
        return Err(format!("unexpected argument: {}", extra));
    }

    Ok(Args { config, command })
}
