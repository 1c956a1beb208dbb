mod render;
mod session;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use citeview_core::config::Config;
use citeview_core::transcript::TranscriptStore;
use citeview_server::scripted_source;
use citeview_server::Pacing;
use citeview_stream::DocumentLocator;
use citeview_stream::EventSource;
use citeview_stream::HttpEventSource;
use clap::Parser;
use clap::Subcommand;
use tracing_subscriber::EnvFilter;

use crate::session::AskOutcome;
use crate::session::Session;

#[derive(Parser, Debug)]
#[command(name = "citeview")]
#[command(about = "Chat answers streamed with clickable PDF citations")]
#[command(version)]
struct Cli {
    /// Config file (defaults to the per-user citeview/config.toml)
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the mock chat backend
    Serve {
        #[arg(long, value_name = "ADDR")]
        bind: Option<String>,
        /// Directory of PDFs to serve
        #[arg(long, value_name = "DIR")]
        documents: Option<PathBuf>,
        /// Do not write the sample PDFs into the documents directory
        #[arg(long)]
        no_seed: bool,
    },
    /// Write the sample PDFs the scripted answers cite
    SeedDocuments {
        #[arg(long, value_name = "DIR")]
        documents: Option<PathBuf>,
    },
    /// Ask a question and stream the answer
    Ask {
        #[arg(required = true)]
        query: Vec<String>,
        /// Backend base url
        #[arg(long, value_name = "URL")]
        server: Option<String>,
        /// Answer from the built-in scripted backend instead of over http
        #[arg(long)]
        offline: bool,
        /// Open citation N of the answer
        #[arg(long, value_name = "N")]
        open: Option<u32>,
        /// Do not read or append the transcript
        #[arg(long)]
        no_history: bool,
    },
    /// Print the stored conversation
    History {
        #[arg(long, value_name = "N")]
        limit: Option<usize>,
    },
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing();

    let config = Config::load(cli.config.as_deref()).context("loading config")?;
    match cli.command {
        Command::Serve {
            bind,
            documents,
            no_seed,
        } => {
            let mut server = config.server;
            if let Some(bind) = bind {
                server.bind = bind;
            }
            if let Some(documents) = documents {
                server.documents_dir = documents;
            }
            if no_seed {
                server.seed_samples = false;
            }
            citeview_server::serve(server).await?;
            Ok(())
        }
        Command::SeedDocuments { documents } => {
            let dir = documents.unwrap_or(config.server.documents_dir);
            let written = citeview_server::seed_documents(&dir)
                .await
                .with_context(|| format!("seeding {}", dir.display()))?;
            if written.is_empty() {
                eprintln!("samples already present in {}", dir.display());
            }
            for name in written {
                println!("{}", dir.join(name).display());
            }
            Ok(())
        }
        Command::Ask {
            query,
            server,
            offline,
            open,
            no_history,
        } => {
            let base_url = server.unwrap_or_else(|| config.client.base_url.clone());
            let history = config.client.history && !no_history;
            ask(&config, &query.join(" "), &base_url, offline, open, history).await
        }
        Command::History { limit } => print_history(&config, limit),
    }
}

async fn ask(
    config: &Config,
    query: &str,
    base_url: &str,
    offline: bool,
    open: Option<u32>,
    history: bool,
) -> anyhow::Result<()> {
    let source: Arc<dyn EventSource> = if offline {
        Arc::new(scripted_source(Pacing::from_config(&config.server)))
    } else {
        Arc::new(HttpEventSource::new(base_url).context("configuring backend url")?)
    };

    let mut session = Session::new(source, std::io::stdout());
    if !offline {
        session = session.with_locator(DocumentLocator::new(base_url)?);
    }
    if history {
        let path = config.client.transcript_path();
        let transcript = TranscriptStore::open(&path)
            .with_context(|| format!("opening transcript {}", path.display()))?;
        session = session.with_transcript(transcript)?;
    }

    let outcome = session.ask(query, ctrl_c()).await?;
    let id = match outcome {
        AskOutcome::Answered(id) => id,
        AskOutcome::Cancelled => {
            eprintln!("cancelled");
            return Ok(());
        }
        AskOutcome::Failed(message) => anyhow::bail!("stream failed: {message}"),
        AskOutcome::Ignored => anyhow::bail!("query must not be empty"),
    };

    session.print_summary(&id)?;
    if let Some(citation_id) = open {
        println!();
        if !session.open_citation(&id, citation_id).await? {
            eprintln!("the answer has no citation [{citation_id}]");
        }
    }
    Ok(())
}

async fn ctrl_c() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %err, "failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
}

fn print_history(config: &Config, limit: Option<usize>) -> anyhow::Result<()> {
    let path = config.client.transcript_path();
    let transcript = TranscriptStore::open(&path)
        .with_context(|| format!("opening transcript {}", path.display()))?;
    let records = transcript.load().context("reading transcript")?;
    let lines = render::history_lines(&records);
    let skip = limit.map_or(0, |limit| lines.len().saturating_sub(limit));
    if lines.is_empty() {
        eprintln!("no history at {}", path.display());
    }
    for line in &lines[skip..] {
        println!("{line}");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::Cli;
    use super::Command;

    #[test]
    fn ask_joins_words_and_reads_flags() {
        let cli = Cli::parse_from([
            "citeview",
            "--config",
            "/tmp/c.toml",
            "ask",
            "climate",
            "change",
            "--offline",
            "--open",
            "2",
        ]);
        assert_eq!(cli.config.as_deref(), Some(std::path::Path::new("/tmp/c.toml")));
        let Command::Ask {
            query,
            offline,
            open,
            no_history,
            ..
        } = cli.command
        else {
            panic!("expected ask");
        };
        assert_eq!(query.join(" "), "climate change");
        assert!(offline);
        assert_eq!(open, Some(2));
        assert!(!no_history);
    }

    #[test]
    fn seed_documents_takes_a_directory() {
        let cli = Cli::parse_from(["citeview", "seed-documents", "--documents", "pdfs"]);
        let Command::SeedDocuments { documents } = cli.command else {
            panic!("expected seed-documents");
        };
        assert_eq!(documents.as_deref(), Some(std::path::Path::new("pdfs")));

        let cli = Cli::parse_from(["citeview", "serve", "--no-seed"]);
        assert!(matches!(cli.command, Command::Serve { no_seed: true, .. }));
    }

    #[test]
    fn ask_requires_a_query() {
        assert!(Cli::try_parse_from(["citeview", "ask"]).is_err());
    }
}
