//! Run prompt experiments against an OpenAI-compatible endpoint.
//!
//! Reads the API key from the environment variable named in the settings
//! file (`OPENAI_API_KEY` by default). Every experiment prints to the
//! console and writes a Markdown report plus a JSON dump of raw results
//! into the configured output directory.
//!
//! # Examples
//!
//! ```sh
//! # Single request
//! promptlab oneshot --user "Draw a tiny ASCII cat."
//!
//! # All 8 combinations of {json format, token cap, stop sequence}
//! promptlab grid --prompt "Name three rivers."
//!
//! # Temperature sweep
//! promptlab sweep --prompt "Invent a cocktail name." --temperatures 0.0,0.7,1.3
//!
//! # Blind multi-model comparison
//! promptlab models --prompt "Explain monads briefly." \
//!   --model gpt-4o-mini --model deepseek-chat --anonymize
//!
//! # Prompting-strategy comparison
//! promptlab prompts --question "Why do ships float?"
//! ```

use clap::{Parser, Subcommand};
use futures::future::join_all;
use serde::Serialize;
use std::path::Path;
use std::process;

use promptlab::api::UsageTally;
use promptlab::config::Settings;
use promptlab::experiment::{
    DEFAULT_SWEEP, GridCombo, Strategy, anonymous_labels, parse_temperatures, shuffled_indices,
};
use promptlab::report::{MarkdownReport, write_json};
use promptlab::{ChatRequest, Message, OpenAiClient, UsageInfo};

/// Run prompt experiments against an OpenAI-compatible endpoint.
#[derive(Parser)]
#[command(name = "promptlab")]
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

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Send one system+user request and print the reply.
    Oneshot {
        /// System prompt to set the assistant's behavior.
        #[arg(long)]
        system: Option<String>,

        /// User message to send.
        #[arg(long)]
        user: String,
    },

    /// Try all 8 on/off combinations of {JSON format, token cap, stop sequence}.
    Grid {
        /// The prompt sent with every combination.
        #[arg(long)]
        prompt: String,

        /// Token cap used by the combinations that enable it.
        #[arg(long, default_value_t = 64)]
        max_tokens: u32,

        /// Stop sequence used by the combinations that enable it.
        #[arg(long, default_value = "###")]
        stop: String,
    },

    /// Send the same prompt at each temperature and compare replies.
    Sweep {
        /// The prompt sent at every temperature.
        #[arg(long)]
        prompt: String,

        /// Comma-separated temperatures, e.g. "0.0,0.7,1.3".
        #[arg(long)]
        temperatures: Option<String>,
    },

    /// Send the same prompt to several models and compare replies.
    Models {
        /// The prompt sent to every model.
        #[arg(long)]
        prompt: String,

        /// Model to include (repeat the flag; at least two).
        #[arg(long = "model", required = true, num_args = 1)]
        models: Vec<String>,

        /// Hide model names behind "Model A/B/..." labels in a shuffled order.
        #[arg(long)]
        anonymize: bool,

        /// Shuffle seed for --anonymize (defaults to a time-derived seed).
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Ask one question with zero-shot, few-shot, and chain-of-thought prompts.
    Prompts {
        /// The question every strategy answers.
        #[arg(long)]
        question: String,
    },
}

// ── Result rows (serialized into the JSON dumps) ───────────────────

#[derive(Serialize)]
struct GridRow {
    label: String,
    system_instructions: Option<String>,
    reply: String,
    usage: UsageInfo,
}

#[derive(Serialize)]
struct SweepRow {
    temperature: f32,
    reply: String,
    usage: UsageInfo,
}

#[derive(Serialize)]
struct ModelRow {
    label: String,
    model: String,
    reply: String,
    usage: UsageInfo,
}

#[derive(Serialize)]
struct StrategyRow {
    strategy: &'static str,
    reply: String,
    usage: UsageInfo,
}

// ── Experiment runners ─────────────────────────────────────────────

/// Shared per-run pieces: settings (with any CLI overrides applied) and
/// the client built from them.
struct Lab {
    settings: Settings,
    client: OpenAiClient,
}

impl Lab {
    fn from_cli(cli: &Cli) -> Result<Self, String> {
        let mut settings = Settings::load_or_default(&cli.settings)?;
        if let Some(ref model) = cli.model {
            settings.model = model.clone();
        }
        let client = settings.client()?;
        Ok(Self { settings, client })
    }

    fn base_request(&self, messages: Vec<Message>) -> ChatRequest {
        ChatRequest {
            model: self.settings.model.clone(),
            messages,
            max_tokens: self.settings.max_tokens,
            temperature: self.settings.temperature,
            ..Default::default()
        }
    }

    async fn send(&self, body: &ChatRequest) -> Result<(String, UsageInfo), String> {
        let completion = self.client.chat_with_retry(body, &self.settings.retry()).await?;
        let usage = completion.usage.unwrap_or_default();
        let text = completion
            .content
            .ok_or_else(|| "empty LLM response".to_string())?;
        Ok((text, usage))
    }

    fn out_dir(&self) -> &Path {
        Path::new(&self.settings.output_dir)
    }
}

async fn run_oneshot(lab: &Lab, system: Option<&str>, user: &str) -> Result<(), String> {
    let mut messages = Vec::new();
    if let Some(system) = system {
        messages.push(Message::system(system));
    }
    messages.push(Message::user(user));

    let (reply, usage) = lab.send(&lab.base_request(messages)).await?;
    println!("{reply}");

    let mut tally = UsageTally::new();
    tally.record(&usage);
    eprintln!("  {}", tally.summary());
    Ok(())
}

async fn run_grid(lab: &Lab, prompt: &str, max_tokens: u32, stop: &str) -> Result<(), String> {
    let combos = GridCombo::all();
    let mut tally = UsageTally::new();
    let mut rows = Vec::with_capacity(combos.len());

    for (i, combo) in combos.iter().enumerate() {
        let label = combo.label(max_tokens, stop);
        eprintln!("  [grid {}/{}] {label}", i + 1, combos.len());

        let mut messages = Vec::new();
        if let Some(instructions) = combo.system_instructions(max_tokens, stop) {
            messages.push(Message::system(instructions));
        }
        messages.push(Message::user(prompt));

        let mut body = lab.base_request(messages);
        body.max_tokens = None; // only the combo's own cap applies
        combo.apply(&mut body, max_tokens, stop);

        let (reply, usage) = lab.send(&body).await?;
        println!("--- {label} ---\n{reply}\n");
        tally.record(&usage);
        rows.push(GridRow {
            label,
            system_instructions: combo.system_instructions(max_tokens, stop),
            reply,
            usage,
        });
    }

    let mut report = MarkdownReport::new("Optional-parameter grid");
    report.paragraph(&format!("Prompt: {prompt}"));
    for row in &rows {
        report.heading(&row.label);
        report.code_block(&row.reply);
    }
    report.paragraph(&tally.summary());
    report.write(lab.out_dir(), "grid.md")?;
    write_json(lab.out_dir(), "grid.json", &rows)?;

    eprintln!("  {}", tally.summary());
    Ok(())
}

async fn run_sweep(lab: &Lab, prompt: &str, temperatures: Option<&str>) -> Result<(), String> {
    let temps = match temperatures {
        Some(spec) => parse_temperatures(spec)?,
        None => DEFAULT_SWEEP.to_vec(),
    };

    let mut tally = UsageTally::new();
    let mut rows = Vec::with_capacity(temps.len());

    for (i, &temp) in temps.iter().enumerate() {
        eprintln!("  [sweep {}/{}] temperature={temp}", i + 1, temps.len());

        let mut body = lab.base_request(vec![Message::user(prompt)]);
        body.temperature = Some(temp);

        let (reply, usage) = lab.send(&body).await?;
        println!("--- temperature {temp} ---\n{reply}\n");
        tally.record(&usage);
        rows.push(SweepRow {
            temperature: temp,
            reply,
            usage,
        });
    }

    let mut report = MarkdownReport::new("Temperature sweep");
    report.paragraph(&format!("Prompt: {prompt}"));
    report.table(
        &["temperature", "reply"],
        &rows
            .iter()
            .map(|r| vec![format!("{}", r.temperature), r.reply.clone()])
            .collect::<Vec<_>>(),
    );
    report.paragraph(&tally.summary());
    report.write(lab.out_dir(), "sweep.md")?;
    write_json(lab.out_dir(), "sweep.json", &rows)?;

    eprintln!("  {}", tally.summary());
    Ok(())
}

async fn run_models(
    lab: &Lab,
    prompt: &str,
    models: &[String],
    anonymize: bool,
    seed: Option<u64>,
) -> Result<(), String> {
    if models.len() < 2 {
        return Err("provide at least two --model flags to compare".to_string());
    }

    eprintln!("  [models] querying {} model(s)", models.len());
    let retry = lab.settings.retry();
    let calls = models.iter().map(|model| {
        let body = ChatRequest {
            model: model.clone(),
            messages: vec![Message::user(prompt)],
            max_tokens: lab.settings.max_tokens,
            temperature: lab.settings.temperature,
            ..Default::default()
        };
        let retry = retry.clone();
        async move {
            let completion = lab.client.chat_with_retry(&body, &retry).await?;
            let usage = completion.usage.unwrap_or_default();
            let text = completion
                .content
                .ok_or_else(|| "empty LLM response".to_string())?;
            Ok::<(String, UsageInfo), String>((text, usage))
        }
    });

    let results = join_all(calls).await;

    // Presentation order: shuffled when anonymized so the flag order
    // doesn't give the models away.
    let order = if anonymize {
        let seed = seed.unwrap_or_else(|| {
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap_or_default()
                .as_nanos() as u64
        });
        shuffled_indices(models.len(), seed)
    } else {
        (0..models.len()).collect()
    };
    let labels = anonymous_labels(models.len());

    let mut tally = UsageTally::new();
    let mut rows = Vec::with_capacity(models.len());
    for (position, &i) in order.iter().enumerate() {
        let (reply, usage) = match &results[i] {
            Ok(r) => r.clone(),
            Err(e) => return Err(format!("model '{}': {e}", models[i])),
        };
        let label = if anonymize {
            labels[position].clone()
        } else {
            models[i].clone()
        };
        println!("--- {label} ---\n{reply}\n");
        tally.record(&usage);
        rows.push(ModelRow {
            label,
            model: models[i].clone(),
            reply,
            usage,
        });
    }

    let mut report = MarkdownReport::new("Model comparison");
    report.paragraph(&format!("Prompt: {prompt}"));
    report.paragraph("Models queried:");
    for model in models {
        report.bullet(model);
    }
    report.blank();
    if anonymize {
        report.paragraph("Replies are anonymized; the label-to-model key is in models.json.");
    }
    for row in &rows {
        report.heading(if anonymize { &row.label } else { &row.model });
        report.code_block(&row.reply);
    }
    report.paragraph(&tally.summary());
    report.write(lab.out_dir(), "models.md")?;
    write_json(lab.out_dir(), "models.json", &rows)?;

    eprintln!("  {}", tally.summary());
    Ok(())
}

async fn run_prompts(lab: &Lab, question: &str) -> Result<(), String> {
    let mut tally = UsageTally::new();
    let mut rows = Vec::new();

    for (i, strategy) in Strategy::all().into_iter().enumerate() {
        eprintln!("  [prompts {}/3] {}", i + 1, strategy.name());

        let body = lab.base_request(vec![
            Message::system(strategy.system_prompt()),
            Message::user(question),
        ]);

        let (reply, usage) = lab.send(&body).await?;
        println!("--- {} ---\n{reply}\n", strategy.name());
        tally.record(&usage);
        rows.push(StrategyRow {
            strategy: strategy.name(),
            reply,
            usage,
        });
    }

    let mut report = MarkdownReport::new("Prompting-strategy comparison");
    report.paragraph(&format!("Question: {question}"));
    for row in &rows {
        report.heading(row.strategy);
        report.code_block(&row.reply);
    }
    report.paragraph(&tally.summary());
    report.write(lab.out_dir(), "prompts.md")?;
    write_json(lab.out_dir(), "prompts.json", &rows)?;

    eprintln!("  {}", tally.summary());
    Ok(())
}

async fn run(cli: &Cli) -> Result<(), String> {
    let lab = Lab::from_cli(cli)?;

    match &cli.command {
        Command::Oneshot { system, user } => run_oneshot(&lab, system.as_deref(), user).await,
        Command::Grid {
            prompt,
            max_tokens,
            stop,
        } => run_grid(&lab, prompt, *max_tokens, stop).await,
        Command::Sweep {
            prompt,
            temperatures,
        } => run_sweep(&lab, prompt, temperatures.as_deref()).await,
        Command::Models {
            prompt,
            models,
            anonymize,
            seed,
        } => run_models(&lab, prompt, models, *anonymize, *seed).await,
        Command::Prompts { question } => run_prompts(&lab, question).await,
    }
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
