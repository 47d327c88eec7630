//! CLI command implementations

use std::sync::Arc;
use std::time::Duration;

use clap::Subcommand;
use playdeck_catalog::{DemoCatalog, WorkSummary};
use playdeck_core::config::PlaydeckConfig;
use playdeck_core::history::HistoryItem;
use playdeck_core::session::TracingNotifier;
use playdeck_core::streaming::{HeadlessEngine, HeadlessSink};
use playdeck_core::{
    HistoryStore, JsonFileStore, PlaybackOutcome, PlayerSession, PlaydeckError, Result,
    SelectionOutcome, StreamingAdapter,
};

const SINK_START_POLLS: usize = 20;
const SINK_START_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Available CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Search the catalog by title
    Search {
        /// Title or part of it
        keyword: String,
    },
    /// Search, select a result and play one of its chapters
    Play {
        /// Title or part of it
        keyword: String,
        /// Position of the search result to select
        #[arg(short, long, default_value = "0")]
        result: usize,
        /// Position of the chapter to play
        #[arg(short, long, default_value = "0")]
        chapter: usize,
    },
    /// Show recently played chapters
    History {
        /// Number of entries to show
        #[arg(short, long)]
        limit: Option<usize>,
        /// Replay the entry at this position
        #[arg(long)]
        resume: Option<usize>,
    },
}

/// Handle the CLI command
///
/// # Errors
/// Returns appropriate error based on the command that fails
pub async fn handle_command(command: Commands, config: &PlaydeckConfig) -> Result<()> {
    let player = HeadlessPlayer::open(config).await?;
    match command {
        Commands::Search { keyword } => search(&player, &keyword).await,
        Commands::Play {
            keyword,
            result,
            chapter,
        } => play(&player, &keyword, result, chapter).await,
        Commands::History { limit, resume } => {
            let limit = limit.unwrap_or(config.history.recent_limit);
            history(&player, limit, resume).await
        }
    }
}

/// Session, history and a mounted headless backend.
struct HeadlessPlayer {
    session: PlayerSession,
    history: HistoryStore,
    sink: Arc<HeadlessSink>,
    _adapter: StreamingAdapter,
}

impl HeadlessPlayer {
    async fn open(config: &PlaydeckConfig) -> Result<Self> {
        let store = JsonFileStore::open(&config.storage, &HistoryStore::index_specs()).await?;
        let history = HistoryStore::new(Arc::new(store));
        let session = PlayerSession::new(Arc::new(DemoCatalog::new()), Arc::new(TracingNotifier));
        let sink = Arc::new(HeadlessSink::new());
        let adapter = StreamingAdapter::mount(
            &session,
            Arc::new(HeadlessEngine::new()),
            sink.clone(),
            history.clone(),
            &config.playback,
        )?;

        Ok(Self {
            session,
            history,
            sink,
            _adapter: adapter,
        })
    }
}

/// Search the catalog and list results
///
/// # Errors
/// - `PlaydeckError::Catalog` - Catalog query failed
async fn search(player: &HeadlessPlayer, keyword: &str) -> Result<()> {
    let works = player.session.search(keyword).await?;
    if works.is_empty() {
        println!("No works found for '{}'", keyword.trim());
        return Ok(());
    }

    for (position, work) in works.iter().enumerate() {
        print_summary(position, work);
    }
    Ok(())
}

/// Select a search result and play one chapter
///
/// # Errors
/// - `PlaydeckError::Catalog` - Catalog query failed
/// - `PlaydeckError::Configuration` - Result or chapter position out of range
async fn play(player: &HeadlessPlayer, keyword: &str, result: usize, chapter: usize) -> Result<()> {
    let works = player.session.search(keyword).await?;
    let candidate = works
        .get(result)
        .cloned()
        .ok_or_else(|| PlaydeckError::Configuration {
            reason: format!("search returned {} results, no result {result}", works.len()),
        })?;

    let outcome = player
        .session
        .select_search_result(candidate, keyword.trim())
        .await?;
    if outcome == SelectionOutcome::NoPlayableSource {
        return Ok(());
    }

    let Some(work) = player.session.work() else {
        return Ok(());
    };
    let item = work
        .play_list
        .get(chapter)
        .ok_or_else(|| PlaydeckError::Configuration {
            reason: format!(
                "'{}' has {} chapters, no chapter {chapter}",
                work.name(),
                work.play_list.len()
            ),
        })?;

    println!("{} - {}", work.name(), item.name);
    match player.session.controller().play(&item.url) {
        Some(outcome) => report_playback(player, outcome).await,
        None => println!("Source '{}' is not playable", item.url.trim()),
    }
    Ok(())
}

/// List recent history, optionally replaying one entry
///
/// # Errors
/// - `PlaydeckError::Storage` - History could not be read
/// - `PlaydeckError::Catalog` - Catalog query failed while resuming
/// - `PlaydeckError::Configuration` - Resume position out of range
async fn history(player: &HeadlessPlayer, limit: usize, resume: Option<usize>) -> Result<()> {
    let items = player.history.recent_history(limit).await?;
    if items.is_empty() {
        println!("No viewing history yet");
        return Ok(());
    }

    for (position, item) in items.iter().enumerate() {
        print_history_item(position, item);
    }

    let Some(position) = resume else {
        return Ok(());
    };
    let item = items.get(position).ok_or_else(|| PlaydeckError::Configuration {
        reason: format!("history has {} entries, no entry {position}", items.len()),
    })?;

    println!();
    println!("Resuming {} - {}", item.work.summary.name, item.chap);
    match player.session.resume(item).await? {
        Some(outcome) => report_playback(player, outcome).await,
        None => println!("Source '{}' is not playable", item.url),
    }
    Ok(())
}

async fn report_playback(player: &HeadlessPlayer, outcome: PlaybackOutcome) {
    println!("Playing {} ({})", outcome.url, outcome.mode);

    if let Some(item) = outcome.recorded().await {
        println!("  Recorded in history as '{}'", item.chap);
    }

    // Adaptive sources start on the adapter's listener task.
    for _ in 0..SINK_START_POLLS {
        if player.sink.state().playing {
            break;
        }
        tokio::time::sleep(SINK_START_POLL_INTERVAL).await;
    }
    println!("  Sink playing: {}", player.sink.state().playing);
}

fn print_summary(position: usize, work: &WorkSummary) {
    let mut line = format!("[{position}] {} (id {})", work.name, work.id);
    if !work.cate.is_empty() {
        line.push_str(&format!(" [{}]", work.cate));
    }
    if !work.tag.is_empty() {
        line.push_str(&format!(" {}", work.tag));
    }
    println!("{line}");
}

fn print_history_item(position: usize, item: &HistoryItem) {
    let played_at = chrono::DateTime::from_timestamp(item.utime, 0)
        .map(|time| time.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| item.utime.to_string());
    println!(
        "[{position}] {played_at}  {} - {}  {}",
        item.work.summary.name, item.chap, item.url
    );
}
