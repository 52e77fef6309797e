mod cli;

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use cli::{Cli, Commands};
use sourcewalk::prelude::*;

fn start(config: Option<&Path>) -> Result<(HostHandle, tokio::sync::mpsc::UnboundedReceiver<Response>)> {
    let settings = Settings::load(config)?;
    Host::start(Arc::new(Scraper::new(settings)?))
}

fn print_messages(page: &ScrapeResult) {
    for (label, msg) in [
        ("notice", &page.system_message),
        ("captcha", &page.captcha),
        ("warning", &page.warning),
        ("error", &page.error),
    ] {
        if let Some(m) = msg {
            eprintln!("{label}: {m}");
        }
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("sourcewalk=info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Classify { urls } => {
            for url in urls {
                println!("{}\t{url}", classify(&url));
            }
        }
        Commands::Sites => {
            for site in SiteType::ALL {
                println!("{site}");
            }
        }
        Commands::Resolve { url } => {
            let (host, mut rx) = start(cli.config.as_deref())?;
            host.submit(Operation::Resolve { url })?;
            let Some(Response { reply: Reply::Resolved(resolved), .. }) = rx.blocking_recv() else {
                bail!("execution host stopped before replying");
            };
            for u in resolved.urls {
                println!("{u}");
            }
            for w in resolved.warnings {
                eprintln!("warning: {w}");
            }
        }
        Commands::Scrape { url, pages, filter, strict, weight, no_wait } => {
            let (host, mut rx) = start(cli.config.as_deref())?;
            let mut req = PageRequest::new(LibrarySource::new(url));
            let mut done = 0;
            while pages.map_or(true, |max| done < max) {
                req.filter = filter;
                req.strict = strict;
                req.weight = weight.or(req.weight);
                let before = req.token.clone();
                host.submit(Operation::FetchPage(req))?;
                let Some(Response { reply: Reply::Page(page), .. }) = rx.blocking_recv() else {
                    bail!("execution host stopped before replying");
                };
                done += 1;
                for u in &page.data {
                    println!("{u}");
                }
                print_messages(&page);

                let stuck = page.helpers == before;
                if page.helpers.is_exhausted() || page.error.is_some() || page.system_message.is_some() || page.captcha.is_some() || stuck {
                    info!(pages = done, found = page.helpers.count, next = ?page.helpers.next, "scrape stopped");
                    break;
                }
                if !no_wait {
                    if let Some(ms) = page.timeout_ms {
                        std::thread::sleep(Duration::from_millis(ms));
                    }
                }
                req = PageRequest::next_from(&page);
            }
        }
    }
    Ok(())
}
