use clap::Parser;
use scholar_search::cli::{Cli, Commands};
use scholar_search::engine::{EngineConfig, SearchEngine};
use scholar_search::error::Result;
use scholar_search::types::NewDocument;
use std::io::Read;

fn main() {
    scholar_search::logging::init();

    let cli = Cli::parse();
    if let Err(e) = run(cli) {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let config = EngineConfig::new(&cli.data_dir, &cli.corpus);

    match cli.command {
        Commands::Build { barrel_size } => {
            let engine = SearchEngine::build(config.with_barrel_size(barrel_size))?;
            let stats = engine.stats()?;
            println!(
                "Indexed {} documents, {} terms, {} barrels",
                stats.documents,
                stats.lexicon_terms,
                stats.last_barrel + 1
            );
        }
        Commands::Search { query, limit } => {
            let engine = SearchEngine::open(config)?;
            match query {
                Some(query) => print_search(&engine, &query, limit)?,
                None => {
                    let stdin = std::io::stdin();
                    let mut line = String::new();
                    loop {
                        eprint!("query> ");
                        line.clear();
                        if stdin.read_line(&mut line)? == 0 {
                            break;
                        }
                        let query = line.trim();
                        if query.is_empty() || query.eq_ignore_ascii_case("exit") {
                            break;
                        }
                        if let Err(e) = print_search(&engine, query, limit) {
                            eprintln!("Error: {:#}", e);
                        }
                    }
                }
            }
        }
        Commands::Autocomplete { query } => {
            let engine = SearchEngine::open(config)?;
            for suggestion in engine.autocomplete(&query) {
                println!("{suggestion}");
            }
        }
        Commands::Suggest { query } => {
            let engine = SearchEngine::open(config)?;
            for suggestion in engine.suggest_typo(&query) {
                println!("{suggestion}");
            }
        }
        Commands::Add { json } => {
            let raw = match json {
                Some(raw) => raw,
                None => {
                    let mut buf = String::new();
                    std::io::stdin().read_to_string(&mut buf)?;
                    buf
                }
            };
            let doc: NewDocument = serde_json::from_str(&raw)?;
            let mut engine = SearchEngine::open(config)?;
            let outcome = engine.add_document(&doc)?;
            println!("{}", serde_json::to_string_pretty(&outcome)?);
        }
        Commands::Stats => {
            let engine = SearchEngine::open(config)?;
            let stats = engine.stats()?;
            println!("{}", serde_json::to_string_pretty(&stats)?);
        }
        Commands::TopTerms { limit } => {
            let engine = SearchEngine::open(config)?;
            for (token, df) in engine.top_terms(limit)? {
                println!("{df:8}  {token}");
            }
        }
    }
    Ok(())
}

fn print_search(engine: &SearchEngine, query: &str, limit: usize) -> Result<()> {
    let response = engine.search(query)?;
    println!(
        "{} results for \"{}\"",
        response.results_count, response.normalized_query
    );
    for hit in response.results.iter().take(limit) {
        println!(
            "{:8.4}  {}  [{} {} | {} citations]",
            hit.score, hit.title, hit.venue, hit.year, hit.citations
        );
    }
    Ok(())
}
