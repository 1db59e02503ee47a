//! `archie memory`: inspect and build the long-horizon memory.

use archie_agent::DigestOutcome;
use archie_memory::ConversationLog;
use chrono::NaiveDate;

use super::runtime::{CliResult, Runtime};

pub async fn search(query: &str, top_k: usize) -> CliResult {
    let runtime = Runtime::load()?;
    println!(
        "Searching {} memories for: \"{query}\"",
        runtime.memory.len().await
    );
    println!();

    let results = runtime.memory.search(query, top_k).await?;
    if results.is_empty() {
        println!("   No memories found.");
    }
    for (i, (score, text)) in results.iter().enumerate() {
        let preview: String = text.chars().take(120).collect();
        println!("  {:>2}. [score: {score:.2}] {preview}", i + 1);
    }
    Ok(())
}

pub async fn digest(day: Option<NaiveDate>) -> CliResult {
    let runtime = Runtime::load()?;
    let today = ConversationLog::today();
    let day = match day {
        Some(day) => day,
        None => today.pred_opt().ok_or("No previous day")?,
    };

    match runtime.digest_job().digest_day(day).await? {
        DigestOutcome::Stored => {
            println!("Digest for {day} stored ({} memories).", runtime.memory.len().await)
        }
        DigestOutcome::Nothing => println!("Nothing to digest for {day}."),
        DigestOutcome::NotStored => println!("Digest for {day} could not be stored."),
    }
    Ok(())
}
