//! `archie chat`, `archie interactive` and `archie upload`.

use archie_agent::prompt::file_prompt;
use std::io::Write;
use std::path::Path;
use tokio::io::{AsyncBufReadExt, BufReader};

use super::runtime::{CliResult, Runtime};

pub async fn run(prompt: &str, fusion: bool) -> CliResult {
    let prompt = prompt.trim();
    if prompt.is_empty() {
        return Err("No prompt given. Use --help.".into());
    }
    let runtime = Runtime::load()?;
    runtime.turn(prompt, runtime.mode(fusion)).await?;
    Ok(())
}

pub async fn interactive(fusion: bool) -> CliResult {
    let runtime = Runtime::load()?;
    let mode = runtime.mode(fusion);
    let persona = runtime.persona.get();

    println!();
    println!("  {} is listening ({mode:?} mode).", persona.ai_name);
    println!("  Type 'exit' or Ctrl+D to quit.");
    println!();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("  {} > ", persona.user_name);
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if line.eq_ignore_ascii_case("exit") {
            break;
        }

        // A failed turn is reported and the session continues
        if let Err(e) = runtime.turn(line, mode).await {
            eprintln!("  [Error] {e}");
        }
        println!();
    }

    println!();
    println!("  Goodbye!");
    Ok(())
}

pub async fn upload(file: &Path, fusion: bool) -> CliResult {
    let content = std::fs::read_to_string(file)
        .map_err(|e| format!("Failed to read {}: {e}", file.display()))?;
    let runtime = Runtime::load()?;

    print!("  Instruction for {}: ", file.display());
    std::io::stdout().flush()?;
    let instruction = BufReader::new(tokio::io::stdin())
        .lines()
        .next_line()
        .await?
        .unwrap_or_default();
    let instruction = instruction.trim();
    if instruction.is_empty() {
        return Err("No instruction given.".into());
    }

    runtime
        .turn(&file_prompt(instruction, &content), runtime.mode(fusion))
        .await?;
    Ok(())
}
