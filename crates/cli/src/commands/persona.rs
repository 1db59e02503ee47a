//! `archie persona`: show or update who is talking to whom.

use archie_config::PersonaStore;
use archie_core::persona::{Persona, PersonaUpdate};

use super::runtime::{CliResult, load_config};

pub fn run(update: PersonaUpdate) -> CliResult {
    let config = load_config()?;
    let store = PersonaStore::new(config.persona_path());

    let persona = if update.is_empty() {
        store.get()
    } else {
        let persona = store.set(&update)?;
        println!("Persona updated.");
        persona
    };
    show(&persona);
    Ok(())
}

fn show(persona: &Persona) {
    println!("  Assistant:   {}", persona.ai_name);
    println!("  User:        {}", persona.user_name);
    println!("  Bio:         {}", persona.bio);
    println!("  Personality: {}", persona.personality);
}
