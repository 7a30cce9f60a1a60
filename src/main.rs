use anyhow::{Context, Result};
use clap::Parser;
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use std::{io, path::PathBuf, time::Duration};
use tracing::{error, info};
use tracing_appender::non_blocking::WorkerGuard;
use tui::{backend::CrosstermBackend, Terminal};

use strata::config::{self, Config, Theme};
use strata::editor::Editor;
use strata::ui;

/// Strata - a modal editor whose modes are stacked into towers
#[derive(Parser, Debug)]
#[clap(author, version, about)]
struct Cli {
    /// File to open
    #[clap(name = "FILE")]
    file: Option<String>,

    /// Read configuration from this file instead of the user config directory
    #[clap(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Tower to govern the opened surface
    #[clap(long, value_name = "NAME")]
    tower: Option<String>,

    /// Print the tower listing of the opened surface and exit
    #[clap(long)]
    print_tower: bool,
}

/// Log to `strata.log` in the config directory, filtered by `STRATA_LOG`.
/// The guard must be held for the life of the program.
fn init_logging() -> Result<Option<WorkerGuard>> {
    let log_dir = config::get_config_dir()?;
    std::fs::create_dir_all(&log_dir)
        .with_context(|| format!("Failed to create log directory: {:?}", log_dir))?;

    let filter = tracing_subscriber::EnvFilter::try_from_env("STRATA_LOG")
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("strata=info"));
    let file_appender = tracing_appender::rolling::never(&log_dir, "strata.log");
    let (writer, guard) = tracing_appender::non_blocking(file_appender);

    let installed = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(false)
        .try_init()
        .is_ok();

    Ok(installed.then_some(guard))
}

fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    mut editor: Editor,
    theme: &Theme,
) -> Result<()> {
    loop {
        terminal.draw(|f| ui::render(f, &editor, theme))?;

        if crossterm::event::poll(Duration::from_millis(100))? {
            if let Event::Key(key) = event::read()? {
                if key.kind != KeyEventKind::Press {
                    continue;
                }
                if !editor.handle_key(key)? {
                    return Ok(());
                }
            }
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let _guard = init_logging()?;

    let config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    let theme = config.theme.clone();
    let complex = config.complex_name.clone();
    let tower = cli.tower.clone().unwrap_or_else(|| config.initial_tower.clone());

    let mut editor = Editor::new_with_config(config)?;

    let name = cli.file.as_deref().unwrap_or("*scratch*");
    let surface = editor
        .open_surface_from(name, &complex, &tower)
        .with_context(|| format!("Cannot open tower `{}`", tower))?;
    if let Some(file_path) = &cli.file {
        editor.surface_mut(surface)?.buffer.load_file(file_path)?;
    }
    editor.enter_appropriate_mode(surface)?;
    info!(surface = %surface, tower = %tower, "started");

    if cli.print_tower {
        print!("{}", editor.surface(surface)?.tower().serialize());
        return Ok(());
    }

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let res = run_app(&mut terminal, editor, &theme);

    // Restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        error!(error = %err, "editor stopped");
        println!("Error: {:?}", err);
    }

    Ok(())
}
