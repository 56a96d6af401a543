use anyhow::Context;
use clap::{Args as ClapArgs, Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use stockscope_core::analysis::AnalysisRequester;
use stockscope_core::domain::note::NewNote;
use stockscope_core::domain::query::{AssetQuery, AssetType};
use stockscope_core::error::AnalysisError;
use stockscope_core::llm::gemini::GeminiClient;
use stockscope_core::notes::NotesClient;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

mod render;

#[derive(Debug, Parser)]
#[command(name = "stockscope", about = "AI-assisted research on stocks, commodities, indices and YouTube channels")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Research an asset or YouTube channel with web-grounded generation.
    Analyze(AnalyzeArgs),

    /// Read and write expert notes on the notes backend.
    Notes {
        /// Notes backend base URL. Defaults to NOTES_API_URL.
        #[arg(long)]
        api_url: Option<String>,

        #[command(subcommand)]
        action: NotesAction,
    },
}

#[derive(Debug, ClapArgs)]
struct AnalyzeArgs {
    /// Ticker, commodity, index name, or YouTube handle.
    identifier: String,

    /// stock, commodity, index or youtube.
    #[arg(long, short = 't', default_value = "stock")]
    asset_type: AssetType,

    /// Exchange or market (stocks only), e.g. NASDAQ or NSE.
    #[arg(long)]
    market: Option<String>,

    /// Topic of interest (YouTube only).
    #[arg(long)]
    topic: Option<String>,

    /// File holding a members-only transcript (YouTube only).
    #[arg(long)]
    transcript_file: Option<PathBuf>,

    /// Abandon the request after this many seconds. Defaults to ANALYSIS_TIMEOUT_SECS.
    #[arg(long)]
    timeout_secs: Option<u64>,

    /// Print the raw result as JSON.
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Subcommand)]
enum NotesAction {
    /// List notes for a symbol.
    List {
        symbol: String,
        #[arg(long, default_value = "")]
        market: String,
    },

    /// Save a note.
    Add {
        symbol: String,
        #[arg(long, default_value = "")]
        market: String,
        #[arg(long)]
        person: String,
        #[arg(long)]
        opinion: String,
    },

    /// Delete a note by id.
    Delete { id: Uuid },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let settings = stockscope_core::config::Settings::from_env()?;
    let _sentry_guard = init_sentry(&settings);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(sentry_tracing::layer())
        .init();

    let args = Args::parse();

    match args.command {
        Command::Analyze(analyze) => run_analyze(&settings, analyze).await,
        Command::Notes { api_url, action } => {
            let base_url = api_url.unwrap_or_else(|| settings.notes_api_url.clone());
            run_notes(&base_url, action).await
        }
    }
}

fn build_query(args: &AnalyzeArgs) -> anyhow::Result<AssetQuery> {
    let mut query = AssetQuery::new(args.asset_type, args.identifier.clone());

    let auxiliary = match args.asset_type {
        AssetType::Stock => args.market.clone(),
        AssetType::Youtube => args.topic.clone(),
        AssetType::Commodity | AssetType::Index => None,
    };
    if let Some(aux) = auxiliary {
        query = query.with_auxiliary(aux);
    }
    if args.market.is_some() && args.asset_type != AssetType::Stock {
        tracing::warn!(asset_type = %args.asset_type, "--market only applies to stocks; ignoring");
    }
    if args.topic.is_some() && args.asset_type != AssetType::Youtube {
        tracing::warn!(asset_type = %args.asset_type, "--topic only applies to youtube; ignoring");
    }

    if let Some(path) = &args.transcript_file {
        anyhow::ensure!(
            args.asset_type == AssetType::Youtube,
            "--transcript-file only applies to youtube"
        );
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read transcript file {}", path.display()))?;
        query = query.with_supplementary_text(text);
    }

    Ok(query)
}

async fn run_analyze(
    settings: &stockscope_core::config::Settings,
    args: AnalyzeArgs,
) -> anyhow::Result<()> {
    let query = build_query(&args)?;
    // Fail fast on input errors before requiring provider credentials.
    query.validate()?;

    let client = GeminiClient::from_settings(settings)?;
    let requester = AnalysisRequester::new(Arc::new(client));

    let timeout = args
        .timeout_secs
        .map(Duration::from_secs)
        .unwrap_or_else(|| settings.analysis_timeout());

    let full = match tokio::time::timeout(timeout, requester.request_analysis(&query)).await {
        Ok(Ok(full)) => full,
        Ok(Err(err)) => {
            if matches!(err, AnalysisError::Provider(_)) {
                let err = anyhow::Error::msg(err.to_string());
                sentry_anyhow::capture_anyhow(&err);
            }
            return Err(err.into());
        }
        Err(_) => anyhow::bail!("analysis timed out after {}s", timeout.as_secs()),
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&full)?);
    } else {
        print!("{}", render::render_analysis(&full));
    }
    Ok(())
}

async fn run_notes(base_url: &str, action: NotesAction) -> anyhow::Result<()> {
    let client = NotesClient::new(base_url)?;

    match action {
        NotesAction::List { symbol, market } => match client.list_notes(&symbol, &market).await {
            Ok(notes) => print!("{}", render::render_notes(&notes)),
            Err(err) => {
                eprintln!("Error: {err}");
                print!("{}", render::render_notes(&[]));
            }
        },
        NotesAction::Add {
            symbol,
            market,
            person,
            opinion,
        } => {
            let note = NewNote {
                symbol,
                market,
                person,
                opinion,
            };
            note.validate()?;
            let created = client.create_note(&note).await?;
            println!("saved note {}", created.id);
        }
        NotesAction::Delete { id } => {
            client.delete_note(id).await?;
            println!("deleted note {id}");
        }
    }
    Ok(())
}

fn init_sentry(settings: &stockscope_core::config::Settings) -> Option<sentry::ClientInitGuard> {
    let dsn = settings.sentry_dsn.as_deref()?;
    Some(sentry::init((
        dsn,
        sentry::ClientOptions {
            release: sentry::release_name!(),
            ..Default::default()
        },
    )))
}
