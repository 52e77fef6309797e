use std::path::PathBuf;

use clap::{Parser, Subcommand};
use sourcewalk::filter::Category;
use sourcewalk::types::WeightMode;

/// Scrape slideshow sources from the command line.
#[derive(Parser)]
#[command(name = "sourcewalk")]
#[command(about = "Classify, resolve and page through media sources", long_about = None)]
pub struct Cli {
    /// Settings file (defaults to the platform config directory)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Print the site type of each URL
    Classify {
        #[arg(required = true)]
        urls: Vec<String>,
    },
    /// Expand an indirect link into direct media URLs
    Resolve { url: String },
    /// Page through a source, printing newly found media
    Scrape {
        url: String,
        /// Stop after this many pages
        #[arg(short, long)]
        pages: Option<usize>,
        /// any, stills, images, animated or videos
        #[arg(short, long)]
        filter: Option<Category>,
        /// true: extensions must end the URL; false: match them anywhere
        #[arg(long, value_name = "BOOL")]
        strict: Option<bool>,
        #[arg(short, long, value_parser = parse_weight)]
        weight: Option<WeightMode>,
        /// Ignore the suggested delay between pages
        #[arg(long)]
        no_wait: bool,
    },
    /// List the supported site types in classification order
    Sites,
}

fn parse_weight(s: &str) -> Result<WeightMode, String> {
    match s.trim().to_ascii_lowercase().as_str() {
        "source" => Ok(WeightMode::Source),
        "item" => Ok(WeightMode::Item),
        other => Err(format!("unknown weight mode: {other} (expected source or item)")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strict_can_be_turned_off() {
        let cli = Cli::try_parse_from(["sourcewalk", "scrape", "https://h/l.txt", "--strict", "false"]).unwrap();
        let Commands::Scrape { strict, .. } = cli.command else { panic!("expected scrape") };
        assert_eq!(strict, Some(false));

        let cli = Cli::try_parse_from(["sourcewalk", "scrape", "https://h/l.txt"]).unwrap();
        let Commands::Scrape { strict, .. } = cli.command else { panic!("expected scrape") };
        assert_eq!(strict, None);
    }
}
