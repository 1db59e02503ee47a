//! `archie log` and `archie clear`.

use archie_config::PersonaStore;
use archie_memory::ConversationLog;

use super::runtime::{CliResult, load_config};

pub async fn print(last: usize) -> CliResult {
    let config = load_config()?;
    let persona = PersonaStore::new(config.persona_path()).get();
    let log = ConversationLog::new(config.log_dir());

    let turns = log.tail(ConversationLog::today(), last).await?;
    if turns.is_empty() {
        println!("No conversation today.");
        return Ok(());
    }

    for turn in turns {
        let time = turn.timestamp.format("%H:%M:%S");
        println!("[{time}] {}: {}", persona.user_name, turn.request);
        println!("[{time}] {}: {}", persona.ai_name, turn.response);
        println!();
    }
    Ok(())
}

pub async fn clear() -> CliResult {
    let config = load_config()?;
    ConversationLog::new(config.log_dir()).clear().await?;
    println!("Conversation logs cleared.");
    Ok(())
}
