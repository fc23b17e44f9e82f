//! Command-line arguments.

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(version, about = "Inspect and tidy paths on a storage service")]
pub struct CliArgs {
    /// Identity passed through to the storage client
    #[arg(short, long, global = true)]
    pub identity: Option<String>,

    /// Configuration resource to use instead of ~/config/storage-site.yaml
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// List the entries under a locator
    Ls {
        locator: String,
        /// Expand the locator as a glob pattern
        #[arg(short, long)]
        glob: bool,
    },
    /// Delete the entries under a locator
    Rm {
        locator: String,
        /// Allow non-empty directories to be removed
        #[arg(short, long)]
        recursive: bool,
        /// Expand the locator as a glob pattern
        #[arg(short, long)]
        glob: bool,
    },
    /// Classify files as plain text, compressed text or sequence containers
    Sniff {
        #[arg(required = true)]
        locators: Vec<String>,
    },
    /// Print the configuration bundle resolved for a locator
    Conf { locator: String },
}

impl Command {
    /// Locator used to acquire the filesystem handle.
    pub fn target(&self) -> &str {
        match self {
            Command::Ls { locator, .. } | Command::Rm { locator, .. } | Command::Conf { locator } => {
                locator
            }
            Command::Sniff { locators } => locators.first().map(String::as_str).unwrap_or_default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_rm() {
        let args = CliArgs::parse_from([
            "sluice",
            "--identity",
            "user1",
            "rm",
            "-r",
            "--glob",
            "storage://nodeA:9000/tmp/part-*",
        ]);
        assert_eq!(args.identity.as_deref(), Some("user1"));
        assert!(matches!(
            args.command,
            Command::Rm {
                recursive: true,
                glob: true,
                ..
            }
        ));
        assert_eq!(args.command.target(), "storage://nodeA:9000/tmp/part-*");
    }

    #[test]
    fn test_sniff_requires_locator() {
        assert!(CliArgs::try_parse_from(["sluice", "sniff"]).is_err());

        let args = CliArgs::try_parse_from(["sluice", "sniff", "/a", "/b"]).unwrap();
        assert_eq!(args.command.target(), "/a");
    }
}
