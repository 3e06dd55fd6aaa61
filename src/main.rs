use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use lexnote::config::Config;
use lexnote::dict::DictRegistry;
use lexnote::notebook::{self, Action, WordNote};
use lexnote::server;

#[derive(Parser, Debug)]
#[command(name = "lexnote", version, about = "Look up words and review them later")]
struct Cli {
    /// Config file (defaults to <config dir>/lexnote/config.json)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Look up a word or phrase and note it in the active chapter
    Lookup {
        /// Words are joined with single spaces
        #[arg(required = true)]
        words: Vec<String>,

        /// Provider to use instead of the configured one
        #[arg(short, long)]
        endpoint: Option<String>,

        #[arg(short, long)]
        chapter: Option<String>,

        /// Do not record the lookup in the notebook
        #[arg(long)]
        no_mark: bool,
    },

    /// Inspect or edit the word notebook
    Notebook {
        #[arg(short, long, global = true)]
        chapter: Option<String>,

        #[command(subcommand)]
        command: NotebookCommand,
    },

    /// Serve plain-text lookups over HTTP
    Serve {
        #[arg(short, long)]
        port: Option<u16>,

        /// URL path the lookup endpoint is mounted on
        #[arg(short, long)]
        root: Option<String>,
    },
}

#[derive(Subcommand, Debug)]
enum NotebookCommand {
    /// Notes of the chapter in review order
    List,
    /// Chapters that hold at least one note
    Chapters,
    /// Apply learning / learned / delete to a word
    Mark {
        word: String,
        #[arg(short, long, default_value = "learning")]
        action: String,
    },
    /// Show the next word to review
    Review,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let mut config = Config::load(cli.config.as_deref())?;

    match cli.command {
        Command::Lookup {
            words,
            endpoint,
            chapter,
            no_mark,
        } => {
            if let Some(endpoint) = endpoint {
                config.dict.endpoint = endpoint;
            }
            if let Some(chapter) = chapter {
                config.notebook.chapter = chapter;
            }
            config.validate()?;
            run_lookup(&config, &words, !no_mark)
        }
        Command::Notebook { chapter, command } => {
            if let Some(chapter) = chapter {
                config.notebook.chapter = chapter;
            }
            config.validate()?;
            run_notebook(&config, command)
        }
        Command::Serve { port, root } => {
            if let Some(port) = port {
                config.server.port = port;
            }
            if let Some(root) = root {
                config.server.root = root;
            }
            config.validate()?;
            run_serve(config)
        }
    }
}

fn run_lookup(config: &Config, words: &[String], mark: bool) -> Result<()> {
    let word = words.join(" ").trim().to_string();
    anyhow::ensure!(!word.is_empty(), "nothing to look up");

    // 1. Resolve provider
    let endpoint = config.endpoint()?;
    let dict = DictRegistry::with_defaults()
        .create(endpoint, &config.dict)
        .with_context(|| format!("failed to initialize {endpoint} provider"))?;

    // 2. Search
    let item = dict.search(&word)?;
    if !item.is_found() {
        println!("{}: {}", "word not found".yellow(), item.word);
        return Ok(());
    }
    print!("{}", item.render());

    // 3. Record
    if mark {
        let notebook = notebook::open_notebook(&config.notebook)?;
        if let Some(note) = notebook.mark(&item.word, Action::Learning)? {
            debug!(
                "noted {:?} in {} ({} lookups)",
                note.word,
                notebook.chapter(),
                note.lookup_times
            );
        }
    }
    Ok(())
}

fn run_notebook(config: &Config, command: NotebookCommand) -> Result<()> {
    let notebook = notebook::open_notebook(&config.notebook)?;

    match command {
        NotebookCommand::List => {
            let notes = notebook.list_notes()?;
            if notes.is_empty() {
                println!("chapter {} is empty", notebook.chapter());
            }
            for note in &notes {
                print_note(note);
            }
        }
        NotebookCommand::Chapters => {
            for chapter in notebook.list_chapter()? {
                let marker = if chapter == notebook.chapter() { "*" } else { " " };
                println!("{marker} {chapter}");
            }
        }
        NotebookCommand::Mark { word, action } => {
            let action: Action = action.parse()?;
            match notebook.mark(word.trim(), action)? {
                Some(note) if action == Action::Delete => println!("deleted {}", note.word),
                Some(note) => print_note(&note),
                None => println!("{} is not in chapter {}", word.trim(), notebook.chapter()),
            }
        }
        NotebookCommand::Review => match notebook.review()? {
            Some(note) => print_note(&note),
            None => println!("chapter {} is empty", notebook.chapter()),
        },
    }
    Ok(())
}

fn print_note(note: &WordNote) {
    let last = chrono::DateTime::from_timestamp(note.last_lookup_time, 0)
        .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_default();
    println!("{:<24} {:>4}  {}", note.word.bold(), note.lookup_times, last.bright_black());
}

fn run_serve(config: Config) -> Result<()> {
    info!("Starting lexnote HTTP server...");
    let runtime = tokio::runtime::Runtime::new().context("failed to start tokio runtime")?;
    runtime.block_on(server::serve(
        &config.server,
        config.dict.clone(),
        DictRegistry::with_defaults(),
    ))
}
