use anyhow::{Result, bail};
use clap::Parser;
use futures::StreamExt;
use minutes_agent::prompt::summarize_context;
use minutes_agent::stack::{AgentConfig, LlamaStackClient};
use rustyline::DefaultEditor;
use std::io::Write;
use std::path::PathBuf;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

const INSTRUCTIONS: &str = "You are a helpful assistant that can use tools to answer questions.";
const TOOLGROUP_ID: &str = "mcp::gdrive";
const PROVIDER_ID: &str = "model-context-protocol";

#[derive(Parser)]
#[command(name = "minutes-agent", about = "Meeting-minutes demo agent over llama-stack")]
struct Cli {
    /// llama-stack base URL.
    #[arg(long, env = "LLAMA_STACK_URL", default_value = "http://localhost:8321")]
    stack_url: String,

    /// MCP endpoint the Drive toolgroup is served on.
    #[arg(long, env = "GDRIVE_MCP_URI", default_value = "http://0.0.0.0:3002/sse")]
    mcp_uri: String,

    /// Model to drive the agent with.
    #[arg(long, env = "MINUTES_MODEL", default_value = "llama3.2:3b")]
    model: String,

    /// Drive share URL of the transcript for the scripted demo.
    #[arg(long)]
    file_url: Option<String>,

    /// Local transcript file; its contents are summarized directly instead of
    /// reading from Drive.
    #[arg(long, conflicts_with = "file_url")]
    transcript: Option<PathBuf>,

    /// Folder to create the minutes document in.
    #[arg(long)]
    folder_id: Option<String>,

    /// Title for the minutes document.
    #[arg(long, default_value = "Meeting Minutes")]
    title: String,

    /// Email address to share the minutes document with.
    #[arg(long)]
    email: Option<String>,

    /// Read prompts from the terminal instead of running the scripted demo.
    #[arg(long)]
    interactive: bool,
}

fn init_telemetry() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(true))
        .init();
}

async fn run_turn(
    client: &LlamaStackClient,
    agent_id: &str,
    session_id: &str,
    prompt: &str,
) -> Result<()> {
    println!("User> {prompt}");
    print!("Agent> ");
    std::io::stdout().flush()?;

    let mut events = client.create_turn(agent_id, session_id, prompt).await?;
    while let Some(chunk) = events.next().await {
        match chunk {
            Ok(chunk) => {
                if let Some(text) = chunk.delta_text() {
                    print!("{text}");
                    std::io::stdout().flush()?;
                }
            }
            Err(e) => eprintln!("\nError: {e}"),
        }
    }
    println!("\n");
    Ok(())
}

fn scripted_prompts(cli: &Cli) -> Result<Vec<String>> {
    let mut prompts = Vec::new();

    if let Some(path) = &cli.transcript {
        let transcript = std::fs::read_to_string(path)?;
        prompts.push(summarize_context(&transcript));
    } else if let Some(file_url) = &cli.file_url {
        prompts.push(format!("Read the contents of {file_url}"));
        prompts.push("Generate a summary for this.".to_string());
    } else {
        bail!("provide --file-url or --transcript, or run with --interactive");
    }

    let title = &cli.title;
    match &cli.folder_id {
        Some(folder_id) => prompts.push(format!(
            "Create a Google Doc document in folder id - {folder_id} with the title `{title}` \
             and add the above summary to it."
        )),
        None => prompts.push(format!(
            "Create a Google Doc document with the title `{title}` and add the above summary \
             to it."
        )),
    }

    if let Some(email) = &cli.email {
        prompts.push(format!("Share `{title}` doc with `{email}`"));
    }

    Ok(prompts)
}

#[tokio::main]
async fn main() -> Result<()> {
    init_telemetry();
    let cli = Cli::parse();

    let client = LlamaStackClient::new(&cli.stack_url)?;
    client.register_toolgroup(TOOLGROUP_ID, PROVIDER_ID, &cli.mcp_uri).await?;

    let config = AgentConfig {
        model: cli.model.clone(),
        instructions: INSTRUCTIONS.to_string(),
        toolgroups: vec![TOOLGROUP_ID.to_string()],
    };
    let agent_id = client.create_agent(&config).await?;
    let session_id = client.create_session(&agent_id, "demo-session").await?;

    if cli.interactive {
        let mut rl = DefaultEditor::new()?;
        println!("Minutes agent console. Type a message, Ctrl+C to exit.\n");
        loop {
            match rl.readline("User -> ") {
                Ok(line) => {
                    if line.trim().is_empty() {
                        continue;
                    }
                    rl.add_history_entry(&line)?;
                    run_turn(&client, &agent_id, &session_id, &line).await?;
                }
                Err(rustyline::error::ReadlineError::Interrupted)
                | Err(rustyline::error::ReadlineError::Eof) => break,
                Err(e) => {
                    eprintln!("Error: {e}");
                    break;
                }
            }
        }
        return Ok(());
    }

    for prompt in scripted_prompts(&cli)? {
        run_turn(&client, &agent_id, &session_id, &prompt).await?;
    }
    Ok(())
}
