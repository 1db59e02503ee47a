//! archie CLI, the main entry point.
//!
//! Commands:
//! - `chat`          One turn, streamed to stdout
//! - `interactive`   Read prompts until `exit`
//! - `upload`        Ask about a file
//! - `log`           Print today's conversation
//! - `clear`         Erase every conversation log
//! - `persona`       Show or update the persona
//! - `checkin`       Toggle periodic check-ins
//! - `daemon`        Run check-ins in the foreground
//! - `memory`        Search or build the long-horizon memory

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "archie",
    about = "archie: a conversational assistant for your terminal",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true, env = "ARCHIE_LOG_JSON")]
    log_json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Send one prompt and print the answer
    Chat {
        /// Use the multi-model fusion pipeline
        #[arg(long)]
        fusion: bool,

        /// The prompt; multiple words are joined with spaces
        #[arg(required = true, trailing_var_arg = true)]
        prompt: Vec<String>,
    },

    /// Chat until `exit`
    Interactive {
        #[arg(long)]
        fusion: bool,
    },

    /// Ask a question about a file's contents
    Upload {
        file: std::path::PathBuf,

        #[arg(long)]
        fusion: bool,
    },

    /// Print today's conversation log
    Log {
        /// Only the last N turns
        #[arg(short = 'n', long, default_value_t = 0)]
        lines: usize,
    },

    /// Clear every conversation log
    Clear,

    /// Show the persona, or update the given fields
    Persona {
        #[arg(long)]
        user: Option<String>,

        #[arg(long)]
        ai: Option<String>,

        #[arg(long)]
        bio: Option<String>,

        #[arg(long)]
        personality: Option<String>,
    },

    /// Manage periodic check-ins
    Checkin {
        #[command(subcommand)]
        action: CheckinAction,
    },

    /// Send check-ins every 30 minutes while enabled
    Daemon,

    /// Long-horizon memory
    Memory {
        #[command(subcommand)]
        action: MemoryAction,
    },
}

#[derive(Subcommand)]
enum CheckinAction {
    /// Turn check-ins on or off
    Toggle,
}

#[derive(Subcommand)]
enum MemoryAction {
    /// Show the digests most similar to a query
    Search {
        query: String,

        #[arg(short = 'k', long, default_value_t = 3)]
        top_k: usize,
    },

    /// Summarise a day's log into memory (default: yesterday)
    Digest {
        /// Day as YYYY-MM-DD
        #[arg(long)]
        day: Option<chrono::NaiveDate>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Logs go to stderr; quiet by default so they do not interleave with answers
    let filter = if cli.verbose { "debug" } else { "warn" };
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter));
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr);
    if cli.log_json {
        subscriber.json().init();
    } else {
        subscriber.init();
    }

    match cli.command {
        Commands::Chat { fusion, prompt } => commands::chat::run(&prompt.join(" "), fusion).await?,
        Commands::Interactive { fusion } => commands::chat::interactive(fusion).await?,
        Commands::Upload { file, fusion } => commands::chat::upload(&file, fusion).await?,
        Commands::Log { lines } => commands::log::print(lines).await?,
        Commands::Clear => commands::log::clear().await?,
        Commands::Persona {
            user,
            ai,
            bio,
            personality,
        } => commands::persona::run(archie_core::PersonaUpdate {
            user_name: user,
            ai_name: ai,
            bio,
            personality,
        })?,
        Commands::Checkin {
            action: CheckinAction::Toggle,
        } => commands::checkin::toggle()?,
        Commands::Daemon => commands::checkin::daemon().await?,
        Commands::Memory { action } => match action {
            MemoryAction::Search { query, top_k } => commands::memory::search(&query, top_k).await?,
            MemoryAction::Digest { day } => commands::memory::digest(day).await?,
        },
    }

    Ok(())
}
