//! panedeck - a tabbed terminal workbench
//!
//! Shells, directory views and text documents live side by side as tabs.
//!
//! # Quick Start
//!
//! ```text
//! panedeck                  # Start with the configured startup panes
//! panedeck notes.txt src/   # Open a document and a directory view
//! panedeck -t               # Start with a shell pane
//! ```
//!
//! # Keybindings
//!
//! | Key | Action |
//! |-----|--------|
//! | Ctrl+N / Ctrl+O | New / open document |
//! | Ctrl+S | Save |
//! | Ctrl+W | Close tab |
//! | Ctrl+Q | Quit |
//! | Ctrl+B, c | New shell |
//! | Ctrl+B, n/p | Next/Previous tab |
//! | Ctrl+B, 1-9 | Select tab by number |

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crossterm::event::{self, Event, KeyEventKind};
use tracing::{debug, info};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use panedeck::config::{config_dir, Config};
use panedeck::content::resolve_path;
use panedeck::ui::{KeyAction, KeyMapper, Renderer};
use panedeck::Workbench;

/// Command line options
#[derive(Debug, Default)]
struct CliArgs {
    /// Files or directories to open
    paths: Vec<PathBuf>,
    /// Open a shell pane at startup
    terminal: bool,
    /// Open a directory pane at startup
    directory: Option<String>,
    /// Shell command, overrides config.toml
    shell: Option<String>,
    /// Log at debug level
    debug: bool,
    /// Write the effective config to ~/.panedeck/config.toml and exit
    write_config: bool,
}

/// Version string from Cargo.toml
const VERSION: &str = env!("CARGO_PKG_VERSION");

fn print_version() {
    eprintln!("panedeck {}", VERSION);
}

fn print_help() {
    eprintln!("panedeck {} - Tabbed workbench for shells, directories and documents", VERSION);
    eprintln!();
    eprintln!("Usage: panedeck [OPTIONS] [PATH]...");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  -t, --terminal        Open a shell pane");
    eprintln!("  -d, --directory <DIR> Open a directory pane");
    eprintln!("  -s, --shell <CMD>     Shell command for shell panes");
    eprintln!("      --debug           Verbose logging");
    eprintln!("      --write-config    Write the current settings to config.toml and exit");
    eprintln!("  -v, --version         Show version");
    eprintln!("  -h, --help            Show this help");
    eprintln!();
    eprintln!("Keybindings:");
    eprintln!("  Ctrl+N                New document");
    eprintln!("  Ctrl+O                Open file");
    eprintln!("  Ctrl+S                Save");
    eprintln!("  Ctrl+W                Close tab");
    eprintln!("  Ctrl+Q                Quit");
    eprintln!();
    eprintln!("After the prefix (Ctrl+B):");
    eprintln!("  c                     New shell");
    eprintln!("  e                     New document");
    eprintln!("  f                     Directory view of the home directory");
    eprintln!("  d                     Open directory");
    eprintln!("  r                     Run script in a new shell");
    eprintln!("  a                     Save as");
    eprintln!("  x                     Close tab");
    eprintln!("  n / p                 Next / previous tab");
    eprintln!("  l                     Last tab (toggle)");
    eprintln!("  1-9                   Select tab by number");
    eprintln!("  < / >                 Move tab left / right");
    eprintln!("  ,                     Rename tab");
    eprintln!();
    eprintln!("Configuration: ~/.panedeck/config.toml");
    eprintln!("Log file:      ~/.panedeck/panedeck.log");
}

fn parse_args() -> Result<CliArgs, String> {
    let args: Vec<String> = env::args().collect();
    let mut cli = CliArgs::default();
    let mut i = 1;

    while i < args.len() {
        match args[i].as_str() {
            "-h" | "--help" => {
                print_help();
                std::process::exit(0);
            }
            "-v" | "--version" => {
                print_version();
                std::process::exit(0);
            }
            "-t" | "--terminal" => {
                cli.terminal = true;
            }
            "-d" | "--directory" => {
                i += 1;
                if i >= args.len() {
                    return Err("Missing directory argument".to_string());
                }
                cli.directory = Some(args[i].clone());
            }
            "-s" | "--shell" => {
                i += 1;
                if i >= args.len() {
                    return Err("Missing shell argument".to_string());
                }
                cli.shell = Some(args[i].clone());
            }
            "--debug" => {
                cli.debug = true;
            }
            "--write-config" => {
                cli.write_config = true;
            }
            arg if arg.starts_with('-') && arg != "-" => {
                return Err(format!("Unknown argument: {}. Use -h for help.", arg));
            }
            path => {
                cli.paths.push(PathBuf::from(path));
            }
        }
        i += 1;
    }

    Ok(cli)
}

/// Log to ~/.panedeck/panedeck.log; RUST_LOG overrides the level
fn init_logging(debug: bool) {
    let log_path = config_dir()
        .map(|dir| dir.join("panedeck.log"))
        .unwrap_or_else(|| PathBuf::from("panedeck.log"));

    // Open log file (append mode)
    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .ok();

    if let Some(file) = log_file {
        let default_level = if debug { "debug" } else { "info" };
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(default_level));
        let subscriber = FmtSubscriber::builder()
            .with_env_filter(filter)
            .with_writer(std::sync::Mutex::new(file))
            .with_ansi(false)
            .finish();
        let _ = tracing::subscriber::set_global_default(subscriber);
    }
}

fn main() -> anyhow::Result<()> {
    let cli = match parse_args() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error: {}", e);
            eprintln!("Use --help for usage information");
            std::process::exit(1);
        }
    };

    init_logging(cli.debug);
    info!("panedeck {} starting...", VERSION);

    let mut config = Config::load();
    if let Some(shell) = cli.shell.clone() {
        config.shell = Some(shell);
    }
    if cli.write_config {
        if let Err(e) = config.save() {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
        info!("Wrote config file");
        eprintln!("Wrote ~/.panedeck/config.toml");
        return Ok(());
    }
    let prefix = config.prefix_char();

    let mut wb = Workbench::new(config);
    if let Ok((cols, rows)) = Renderer::body_size(&wb) {
        wb.set_shell_size(cols, rows);
    }
    if cli.paths.is_empty() && !cli.terminal && cli.directory.is_none() {
        wb.open_startup(&[]);
    } else {
        wb.open_startup(&cli.paths);
        if let Some(dir) = &cli.directory {
            wb.open_directory(&resolve_path(dir));
        }
        if cli.terminal {
            wb.new_shell();
        }
    }

    let mut renderer = Renderer::new();
    renderer.init()?;
    let mut keys = KeyMapper::new(prefix);

    let result = run_main_loop(&mut wb, &mut renderer, &mut keys);
    renderer.cleanup()?;

    match &result {
        Ok(()) => info!("panedeck exiting"),
        Err(e) => tracing::error!("Main loop failed: {:#}", e),
    }
    result
}

fn run_main_loop(
    wb: &mut Workbench,
    renderer: &mut Renderer,
    keys: &mut KeyMapper,
) -> anyhow::Result<()> {
    let poll_timeout = Duration::from_millis(50);
    let mut needs_redraw = true;

    while wb.is_running() {
        if wb.pump_events() {
            needs_redraw = true;
        }
        if needs_redraw {
            renderer.render(wb, keys.prefix_pending())?;
            needs_redraw = false;
        }

        // Poll for events
        if !event::poll(poll_timeout)? {
            continue;
        }
        match event::read()? {
            Event::Key(key_event) => {
                if key_event.kind != KeyEventKind::Press {
                    continue;
                }
                let action = keys.map(&key_event);
                debug!("Key {:?} -> {:?}", key_event.code, action);

                // A fresh keystroke replaces the last message, except "No file"
                if wb.prompt().is_none() && !wb.session().is_empty() {
                    wb.clear_status();
                }

                match action {
                    KeyAction::Command(command) => {
                        // Prompts take keyboard focus until answered
                        if wb.prompt().is_none() {
                            wb.execute(command);
                        }
                    }
                    KeyAction::Input(input) => wb.handle_input(input),
                    KeyAction::Cancel => wb.cancel_prompt(),
                    KeyAction::Prefix | KeyAction::None => {}
                }
                needs_redraw = true;
            }
            Event::Resize(cols, rows) => {
                debug!("Resized to {}x{}", cols, rows);
                if let Ok((body_cols, body_rows)) = Renderer::body_size(wb) {
                    wb.set_shell_size(body_cols, body_rows);
                }
                needs_redraw = true;
            }
            _ => {}
        }
    }

    Ok(())
}
