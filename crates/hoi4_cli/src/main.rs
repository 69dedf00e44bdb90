use std::fs;
use std::path::{Path, PathBuf};
use std::process;

use clap::{Parser, Subcommand};
use hoi4_core::core_api::{Engine, LoadedSave};
use hoi4_core::{DocumentTree, TokenDictionary, filter, search_pattern};
use hoi4_render::{
    DiffRenderOptions, document_to_json, render_diff_details, render_diff_json, render_diff_text,
    render_document_details, render_search_text, render_summary_json, render_summary_text,
    to_indented_json,
};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "hoi4-save", author, version, about)]
struct Cli {
    /// Token dictionary used to decode binary saves.
    #[arg(long, global = true, env = "HOI4_TOKENS", value_name = "PATH")]
    tokens: Option<PathBuf>,
    /// Log decode/parse/diff progress to stderr.
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Write the canonical plain-text form of a save.
    Text {
        #[arg(value_name = "SAVE.hoi4")]
        path: PathBuf,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Write a save (or one node of it) as JSON.
    Json {
        #[arg(value_name = "SAVE.hoi4")]
        path: PathBuf,
        /// Only export the node at this path (`a -> b` or `a.b`).
        #[arg(long, value_name = "NODE")]
        at: Option<String>,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Print encoding, player, date and placeholder counts.
    Summary {
        #[arg(value_name = "SAVE.hoi4")]
        path: PathBuf,
        #[arg(long)]
        json: bool,
    },
    /// Print the details of one node.
    Show {
        #[arg(value_name = "SAVE.hoi4")]
        path: PathBuf,
        #[arg(value_name = "NODE")]
        node: String,
    },
    /// List nodes whose key or value matches a case-insensitive regex.
    Search {
        #[arg(value_name = "SAVE.hoi4")]
        path: PathBuf,
        #[arg(value_name = "PATTERN")]
        pattern: String,
    },
    /// Compare two saves.
    Diff {
        #[arg(value_name = "OLD.hoi4")]
        old: PathBuf,
        #[arg(value_name = "NEW.hoi4")]
        new: PathBuf,
        #[arg(long)]
        json: bool,
        /// Also list unchanged entries.
        #[arg(long)]
        all: bool,
        /// Print the details of one diff node instead of the listing.
        #[arg(long, value_name = "NODE", conflicts_with = "json")]
        show: Option<String>,
    },
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Some(path) = &cli.tokens {
        let tokens = TokenDictionary::load(path).unwrap_or_else(|e| {
            eprintln!("Error loading token dictionary {}: {e}", path.display());
            process::exit(1);
        });
        if let Err(e) = tokens.install_global() {
            eprintln!("Error installing token dictionary: {e}");
            process::exit(1);
        }
    }
    let engine = Engine::new();

    match cli.command {
        Command::Text { path, output } => {
            let save = load(&engine, &path);
            emit(output.as_deref(), &save.filestring);
        }
        Command::Json { path, at, output } => {
            let save = load(&engine, &path);
            let value = match at.as_deref() {
                Some(node) => save.document.get_path(node).unwrap_or_else(|| {
                    eprintln!("Error: no node at path '{node}' in {}", path.display());
                    process::exit(1);
                }),
                None => &save.document,
            };
            let mut rendered = to_indented_json(&document_to_json(value));
            rendered.push('\n');
            emit(output.as_deref(), &rendered);
        }
        Command::Summary { path, json } => {
            let summary = load(&engine, &path).summary();
            if json {
                println!("{}", to_indented_json(&render_summary_json(&summary)));
            } else {
                print!("{}", render_summary_text(&summary));
            }
        }
        Command::Show { path, node } => {
            let save = load(&engine, &path);
            let tree = DocumentTree::new(&save.document);
            let Some(id) = tree.find(&node) else {
                eprintln!("Error: no node at path '{node}' in {}", path.display());
                process::exit(1);
            };
            println!("{}", render_document_details(&tree, id));
        }
        Command::Search { path, pattern } => {
            let pattern = search_pattern(&pattern).unwrap_or_else(|e| {
                eprintln!("Error: invalid search pattern: {e}");
                process::exit(2);
            });
            let save = load(&engine, &path);
            let tree = DocumentTree::new(&save.document);
            let ids = filter(&tree, &pattern);
            tracing::debug!(matches = ids.len(), "search finished");
            print!("{}", render_search_text(&tree, &ids));
        }
        Command::Diff {
            old,
            new,
            json,
            all,
            show,
        } => {
            let old_job = engine.spawn_open(&old);
            let new_job = engine.spawn_open(&new);
            let old_save = join_load(old_job, &old);
            let new_save = join_load(new_job, &new);

            let tree = engine.compare(&old_save, &new_save).unwrap_or_else(|e| {
                eprintln!("Error comparing saves: {e}");
                process::exit(1);
            });
            let options = DiffRenderOptions {
                show_unchanged: all,
            };

            if let Some(node) = show {
                let Some(id) = tree.find(&node) else {
                    eprintln!("Error: no diff node at path '{node}'");
                    process::exit(1);
                };
                println!("{}", render_diff_details(&tree, id));
            } else if json {
                println!("{}", to_indented_json(&render_diff_json(&tree, options)));
            } else {
                print!("{}", render_diff_text(&tree, options));
            }
        }
    }
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn load(engine: &Engine, path: &Path) -> LoadedSave {
    engine.open_path(path).unwrap_or_else(|e| {
        eprintln!("Error loading save file: {}", path.display());
        eprintln!("  {e}");
        process::exit(1);
    })
}

fn join_load(
    job: std::thread::JoinHandle<Result<LoadedSave, hoi4_core::CoreError>>,
    path: &Path,
) -> LoadedSave {
    match job.join() {
        Ok(Ok(save)) => save,
        Ok(Err(e)) => {
            eprintln!("Error loading save file: {}", path.display());
            eprintln!("  {e}");
            process::exit(1);
        }
        Err(_) => {
            eprintln!("Error loading save file: {}: worker thread panicked", path.display());
            process::exit(1);
        }
    }
}

fn emit(output: Option<&Path>, contents: &str) {
    match output {
        Some(out_path) => {
            fs::write(out_path, contents).unwrap_or_else(|e| {
                eprintln!("Error writing {}: {e}", out_path.display());
                process::exit(1);
            });
            eprintln!("Wrote {}", out_path.display());
        }
        None => print!("{contents}"),
    }
}
