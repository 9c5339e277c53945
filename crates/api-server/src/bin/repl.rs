//! brief-repl: ask market questions from the terminal.
//!
//! Usage:
//!   cargo run -p api-server --bin brief-repl
//!   cargo run -p api-server --bin brief-repl -- --speak     # also write brief.mp3
//!
//! At the prompt, type a question, `:voice <file>` to ask with a recording,
//! `:speak` to toggle audio output, or `:quit`.

use anyhow::Context;
use api_server::{AppState, BriefConfig};
use brief_orchestrator::{BriefOptions, BriefOutcome};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

const AUDIO_OUTPUT: &str = "brief.mp3";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    api_server::init_tracing();

    let args: Vec<String> = std::env::args().collect();
    let mut speak = args.iter().any(|a| a == "--speak");

    let config = BriefConfig::from_env()?;
    let state = AppState::from_config(config)?;
    let orchestrator = state.orchestrator;

    println!("Market brief. Ask about one of: {}", brief_core::tracked_company_names().join(", "));
    println!("Commands: :voice <file>, :speak, :quit");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    loop {
        stdout.write_all(b"> ").await?;
        stdout.flush().await?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let line = line.trim();
        let options = BriefOptions { speak, k: None };

        let outcome = match line {
            "" => continue,
            ":quit" | ":q" => break,
            ":speak" => {
                speak = !speak;
                println!("Audio output {}", if speak { "on" } else { "off" });
                continue;
            }
            _ if line.starts_with(":voice") => {
                let path = line.trim_start_matches(":voice").trim();
                if path.is_empty() {
                    println!("usage: :voice <file>");
                    continue;
                }
                let audio = match tokio::fs::read(path).await {
                    Ok(audio) => audio,
                    Err(e) => {
                        println!("Could not read {}: {}", path, e);
                        continue;
                    }
                };
                match orchestrator.brief_from_audio(&audio, path, options).await {
                    Ok((transcript, outcome)) => {
                        println!("You said: {}", transcript);
                        outcome
                    }
                    Err(e) => {
                        println!("Transcription failed: {}", e);
                        continue;
                    }
                }
            }
            question => orchestrator.brief(question, options).await,
        };

        let brief = match outcome {
            BriefOutcome::Answered(brief) => brief,
            BriefOutcome::UnknownCompany { message } => {
                println!("{}", message);
                continue;
            }
        };

        println!("\n[{}]\n{}\n", brief.ticker, brief.answer.text);
        for failure in &brief.degraded {
            println!("  (degraded: {:?} - {})", failure.stage, failure.message);
        }

        if let Some(audio) = &brief.answer.audio {
            tokio::fs::write(AUDIO_OUTPUT, audio)
                .await
                .with_context(|| format!("failed to write {}", AUDIO_OUTPUT))?;
            println!("Audio saved as {}", AUDIO_OUTPUT);
        }
    }

    Ok(())
}
