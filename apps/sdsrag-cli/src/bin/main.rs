use std::env;
use std::io::{self, BufRead, Write};

use sdsrag_cli::setup;
use sdsrag_core::config::Config;
use sdsrag_core::types::PipelineResult;
use tracing_subscriber::EnvFilter;

fn parse_args() -> (String, Vec<String>) {
    let mut args: Vec<String> = env::args().collect();
    let prog = args.remove(0);
    if args.is_empty() {
        eprintln!("Usage: {prog} <ask|chat> [args...]");
        std::process::exit(1);
    }
    let cmd = args.remove(0);
    (cmd, args)
}

fn print_result(result: &PipelineResult) {
    println!("{}", result.answer);
    // Citations only for genuinely generated answers.
    if !result.guarded && !result.sources.is_empty() {
        println!("\n---\nSources:");
        for source in &result.sources {
            println!("- {source}");
        }
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_env_filter(EnvFilter::from_default_env()).init();

    let config = Config::load().map_err(|e| {
        eprintln!("Error loading config: {e}");
        e
    })?;
    let (cmd, args) = parse_args();
    match cmd.as_str() {
        "ask" => {
            let question = args.first().cloned().unwrap_or_else(|| {
                eprintln!("Usage: sdsrag ask \"<question>\"");
                std::process::exit(1)
            });
            let pipeline = setup::build_pipeline(&config)?;
            let result = pipeline.invoke(&question)?;
            print_result(&result);
        }
        "chat" => {
            let pipeline = setup::build_pipeline(&config)?;
            println!(
                "Welcome to the SDS question answering chatbot.\n\
                 I can answer questions about chemical safety data sheets covering hazard\n\
                 identification, handling and first aid. Try asking:\n\
                 - What PPE is required for DESMOPHEN XP 2680?\n\
                 - What are the hazardous decomposition products of BAYBLEND M750?\n\
                 Type 'exit' to quit.\n"
            );
            // Session history lives here, outside the stateless pipeline.
            let mut history: Vec<(String, String)> = Vec::new();
            let stdin = io::stdin();
            loop {
                print!("> ");
                io::stdout().flush()?;
                let mut line = String::new();
                if stdin.lock().read_line(&mut line)? == 0 {
                    break;
                }
                let question = line.trim();
                if question.is_empty() {
                    continue;
                }
                if question == "exit" || question == "quit" {
                    break;
                }
                let result = pipeline.invoke(question)?;
                print_result(&result);
                history.push(("user".to_string(), question.to_string()));
                history.push(("assistant".to_string(), result.answer));
            }
            println!("Goodbye ({} turns).", history.len() / 2);
        }
        _ => {
            eprintln!("Unknown command: {cmd}");
            std::process::exit(1);
        }
    }
    Ok(())
}
