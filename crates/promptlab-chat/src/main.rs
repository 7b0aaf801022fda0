//! Interactive chat with persistent, summarized history.
//!
//! Reads the API key from the environment variable named in the settings
//! file (`OPENAI_API_KEY` by default). The transcript is written to disk
//! after every exchange; once enough old turns accumulate they are folded
//! into a running summary and trimmed from the transcript, so both the
//! files and the model context stay bounded.
//!
//! # Examples
//!
//! ```sh
//! promptlab-chat
//! promptlab-chat --settings lab.json --verbose
//! ```

use clap::Parser;
use std::io::{BufRead, Write};
use std::process;

use promptlab::api::UsageTally;
use promptlab::config::Settings;
use promptlab::context::{SummaryState, SummaryWindow};
use promptlab::transcript::{Transcript, Turn};
use promptlab::{ChatCapability, ChatSender, Message, MessageRole};
use promptlab_chat::{ChatConfig, chat_system_prompt};

/// Interactive chat with persistent, summarized history.
#[derive(Parser)]
#[command(name = "promptlab-chat")]
struct Cli {
    /// Path to the JSON settings file.
    #[arg(long, default_value = "settings.json")]
    settings: String,

    /// Override the model from the settings file.
    #[arg(long)]
    model: Option<String>,

    /// Enable debug logging.
    #[arg(long)]
    verbose: bool,
}

/// One user line: get a reply, commit both turns, persist, and compress
/// when the window says so. A failed reply call commits nothing.
async fn process_turn(
    line: &str,
    config: &ChatConfig,
    window: &SummaryWindow,
    sender: &ChatSender<'_>,
    transcript: &mut Transcript,
    summary: &mut Option<SummaryState>,
    tally: &mut UsageTally,
) -> Result<String, String> {
    // Context first, commit later: the pending user message rides along at
    // the end, so nothing is appended if the call fails.
    let persona = chat_system_prompt();
    let mut context: Vec<Message> = window.build_context(
        &persona,
        transcript.turns(),
        summary.as_ref().map(|s| s.summary.as_str()),
    );
    context.push(Message::user(line));

    let (reply, usage) = sender.send_message(context).await?;
    tally.record(&usage);

    transcript.push(Turn::user(line));
    transcript.push(Turn::assistant(reply.clone()));
    transcript.save(&config.history_path())?;

    if window.needs_compression(transcript.len()) {
        match window.compact(transcript, summary, sender).await {
            Ok(usage) => {
                tally.record(&usage);
                transcript.save(&config.history_path())?;
                if let Some(state) = summary.as_ref() {
                    state.save(&config.summary_path())?;
                }
            }
            // The exchange itself is already persisted; a failed fold just
            // leaves compression for a later turn.
            Err(e) => eprintln!("  (summarization failed: {e})"),
        }
    }

    Ok(reply)
}

fn print_stats(transcript: &Transcript, summary: &Option<SummaryState>, tally: &UsageTally) {
    match summary {
        Some(state) => println!(
            "  summary covers {} turn(s), last updated {}",
            state.original_message_count, state.last_updated
        ),
        None => println!("  no summary yet"),
    }
    println!("  {} turn(s) kept verbatim", transcript.len());
    println!("  {}", tally.summary());
}

async fn run(cli: &Cli) -> Result<(), String> {
    let mut settings = Settings::load_or_default(&cli.settings)?;
    if let Some(ref model) = cli.model {
        settings.model = model.clone();
    }

    let config = ChatConfig::from_settings(&settings);
    let window = config.window();
    let client = settings.client()?;
    let sender = ChatSender {
        client: &client,
        model: config.model.clone(),
        max_tokens: config.max_tokens,
        temperature: config.temperature,
        retry: settings.retry(),
    };

    let mut transcript = Transcript::load(&config.history_path());
    let mut summary = SummaryState::load(&config.summary_path());
    let mut tally = UsageTally::new();

    if transcript.is_empty() && summary.is_none() {
        println!("Starting a new session. Type 'exit' to leave, '/stats' for session info.");
    } else {
        let covered = summary.as_ref().map_or(0, |s| s.original_message_count);
        println!(
            "Resuming session: {} turn(s) on record ({} summarized).",
            covered + transcript.len(),
            covered
        );
        // Replay the last exchange so the thread is easy to pick back up.
        for turn in transcript.recent(2) {
            let speaker = match turn.role {
                MessageRole::Assistant => "assistant",
                _ => "you",
            };
            println!("{speaker}> {}", turn.content);
        }
    }

    let stdin = std::io::stdin();
    let mut lines = stdin.lock().lines();

    loop {
        print!("you> ");
        std::io::stdout()
            .flush()
            .map_err(|e| format!("failed to flush stdout: {e}"))?;

        let line = match lines.next() {
            Some(Ok(line)) => line,
            Some(Err(e)) => return Err(format!("failed to read input: {e}")),
            None => break, // end of input
        };
        let line = line.trim();

        if line.is_empty() {
            continue;
        }
        if line == "exit" || line == "quit" {
            break;
        }
        if line == "/stats" {
            print_stats(&transcript, &summary, &tally);
            continue;
        }

        match process_turn(
            line,
            &config,
            &window,
            &sender,
            &mut transcript,
            &mut summary,
            &mut tally,
        )
        .await
        {
            Ok(reply) => println!("assistant> {reply}\n"),
            Err(e) => eprintln!("Error: {e}\n"),
        }
    }

    println!("\nSession ended. {}", tally.summary());
    Ok(())
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::WARN
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run(&cli).await {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}
