use anyhow::{anyhow, Context};
use clap::{Parser, Subcommand};
use lucidly::adapters::SupabaseAuth;
use lucidly::client::export::export_csv;
use lucidly::domain::model::{AnalysisRequest, ApiResponse, DreamView, NewDream, Session};
use lucidly::utils::logger;
use lucidly::utils::text::ellipsize;
use lucidly::{LucidlyClient, SupabaseSettings};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "dream-cli")]
#[command(about = "Terminal client for the Lucidly dream journal API")]
struct Args {
    /// Base URL of the Lucidly API server
    #[arg(long, env = "LUCIDLY_API_URL", default_value = "http://localhost:8080")]
    api_url: String,

    #[arg(long, env = "SUPABASE_URL")]
    supabase_url: Option<String>,

    #[arg(long, env = "SUPABASE_ANON_KEY", hide_env_values = true)]
    supabase_anon_key: Option<String>,

    /// Access token from a previous `login`
    #[arg(long, env = "LUCIDLY_TOKEN", hide_env_values = true)]
    token: Option<String>,

    #[arg(long, env = "LUCIDLY_REFRESH_TOKEN", hide_env_values = true)]
    refresh_token: Option<String>,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Sign in and print the tokens to export
    Login {
        #[arg(long)]
        email: String,
        #[arg(long, env = "LUCIDLY_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Create an account; prints the tokens when no email confirmation is needed
    Signup {
        #[arg(long)]
        email: String,
        #[arg(long, env = "LUCIDLY_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// List your dreams, newest first
    List,
    /// Show one dream with its analysis
    Show { id: String },
    /// Record a new dream
    New {
        #[arg(long)]
        content: Option<String>,
        #[arg(long)]
        transcript: Option<String>,
    },
    /// Generate summary, sentiment and interpretation (all when no flag is given)
    Analyze {
        id: String,
        #[arg(long)]
        summary: bool,
        #[arg(long)]
        sentiment: bool,
        #[arg(long)]
        interpretation: bool,
    },
    /// Summarize text with the strict summarizer and save it on the dream
    Summarize {
        id: String,
        #[arg(long)]
        text: String,
    },
    /// Overwrite a dream's summary
    SetSummary { id: String, summary: String },
    Delete { id: String },
    /// Transcribe an audio recording
    Transcribe {
        file: PathBuf,
        #[arg(long, default_value = "audio/wav")]
        mime: String,
        /// Save the transcript as a new dream
        #[arg(long)]
        save: bool,
    },
    /// Export all dreams to CSV
    Export {
        #[arg(short, long, default_value = "dreams.csv")]
        output: PathBuf,
    },
    Health,
}

fn data<T>(response: ApiResponse<T>) -> anyhow::Result<T> {
    if !response.success {
        return Err(anyhow!(response
            .error
            .unwrap_or_else(|| "Unknown error".to_string())));
    }
    response.data.ok_or_else(|| anyhow!("Response contained no data"))
}

fn build_client(args: &Args) -> anyhow::Result<LucidlyClient> {
    let mut client = LucidlyClient::new(&args.api_url)?;

    if let (Some(url), Some(key)) = (&args.supabase_url, &args.supabase_anon_key) {
        client = client.with_auth(SupabaseAuth::new(SupabaseSettings {
            url: url.clone(),
            api_key: key.clone(),
        }));
    }

    if let Some(token) = &args.token {
        client = client.with_session(Session {
            access_token: token.clone(),
            refresh_token: args.refresh_token.clone(),
            user: None,
        });
    }

    Ok(client)
}

fn print_exports(session: &Session) {
    println!("export LUCIDLY_TOKEN={}", session.access_token);
    if let Some(refresh) = &session.refresh_token {
        println!("export LUCIDLY_REFRESH_TOKEN={}", refresh);
    }
}

fn print_dream(view: &DreamView) {
    let dream = &view.dream;
    println!("📓 {} ({})", view.title, dream.id);
    println!("   {} · {}", view.date, view.mood);
    println!();
    if !dream.content.is_empty() {
        println!("{}", dream.content);
    }
    if let Some(transcript) = &dream.transcript {
        println!("🎙️ Transcript: {}", transcript);
    }
    if let Some(summary) = &dream.summary {
        println!("📝 Summary: {}", summary);
    }
    if let Some(sentiment) = &dream.sentiment {
        println!("💭 Sentiment: {} ({:.2})", sentiment.label, sentiment.score);
    }
    if let Some(interpretation) = &dream.interpretation {
        println!("🔮 Interpretation: {}", interpretation);
    }
}

async fn run(args: Args) -> anyhow::Result<()> {
    let client = build_client(&args)?;

    match args.command {
        Command::Login { email, password } => {
            let session = client.sign_in(&email, &password).await?;
            println!("✅ Signed in as {}", email);
            print_exports(&session);
        }
        Command::Signup { email, password } => match client.sign_up(&email, &password).await? {
            Some(session) => {
                println!("✅ Account created for {}", email);
                print_exports(&session);
            }
            None => println!("📧 Check {} for a confirmation link, then run `login`", email),
        },
        Command::List => {
            let dreams = data(client.get_dreams().await)?;
            if dreams.is_empty() {
                println!("No dreams recorded yet.");
            }
            for view in dreams.into_iter().map(DreamView::from) {
                println!(
                    "{:<38} {:<16} {:<10} {}",
                    view.dream.id,
                    view.date,
                    view.mood,
                    ellipsize(&view.title, 50)
                );
            }
        }
        Command::Show { id } => {
            let dream = data(client.get_dream(&id).await)?;
            print_dream(&DreamView::from(dream));
        }
        Command::New {
            content,
            transcript,
        } => {
            let dream = data(client.create_dream(&NewDream { content, transcript }).await)?;
            println!("✅ Created dream {}", dream.id);
        }
        Command::Analyze {
            id,
            summary,
            sentiment,
            interpretation,
        } => {
            let request = if summary || sentiment || interpretation {
                AnalysisRequest {
                    generate_summary: summary,
                    generate_sentiment: sentiment,
                    generate_interpretation: interpretation,
                }
            } else {
                AnalysisRequest::all()
            };
            let dream = data(client.update_dream(&id, request).await)?;
            print_dream(&DreamView::from(dream));
        }
        Command::Summarize { id, text } => {
            let result = data(client.summarize(&id, &text).await)?;
            println!("📝 {}", result.summary);
        }
        Command::SetSummary { id, summary } => {
            data(client.put_summary(&id, &summary).await)?;
            println!("✅ Summary updated");
        }
        Command::Delete { id } => {
            let message = data(client.delete_dream(&id).await)?;
            println!("🗑️ {}", message.message);
        }
        Command::Transcribe { file, mime, save } => {
            let audio = tokio::fs::read(&file)
                .await
                .with_context(|| format!("Cannot read {}", file.display()))?;
            tracing::info!("Uploading {} bytes from {}", audio.len(), file.display());

            let transcript = data(client.transcribe_audio(audio, &mime).await)?.transcript;
            println!("{}", transcript);

            if save {
                let dream = data(
                    client
                        .create_dream(&NewDream {
                            content: Some(transcript.clone()),
                            transcript: Some(transcript),
                        })
                        .await,
                )?;
                println!("✅ Saved as dream {}", dream.id);
            }
        }
        Command::Export { output } => {
            let dreams = data(client.get_dreams().await)?;
            let views: Vec<DreamView> = dreams.into_iter().map(DreamView::from).collect();
            let count = export_csv(&views, &output)?;
            println!("📁 Exported {} dreams to {}", count, output.display());
        }
        Command::Health => {
            let health = data(client.health().await)?;
            println!(
                "✅ {} ({}, v{}) at {}",
                health.status, health.environment, health.version, health.timestamp
            );
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    // 初始化日誌
    logger::init_cli_logger(args.verbose);

    if let Err(e) = run(args).await {
        eprintln!("❌ {:#}", e);
        std::process::exit(1);
    }
}
