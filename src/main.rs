//! Headless VibeTag session: follows the player and toggles tags from stdin.

use std::{
    io::{self, BufRead},
    path::{Path, PathBuf},
    sync::mpsc::{self, RecvTimeoutError},
    thread,
    time::Duration,
};

use vibetag::{
    config::{self, AppConfig},
    logging,
    player::ControlCommand,
    services::Services,
    session::{
        SessionEvent, SessionSnapshot,
        runtime::{self, SessionCommand},
    },
    tags::TagCatalog,
};

fn main() {
    if let Err(err) = run() {
        eprintln!("{err}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), String> {
    let Some(mode) = parse_args(std::env::args().skip(1).collect())? else {
        return Ok(());
    };
    if let Err(err) = logging::init(logging::SESSION) {
        eprintln!("Logging disabled: {err}");
    }
    let mut config = config::load_or_default().map_err(|err| err.to_string())?;
    if let Mode::Catalog(edit) = mode {
        return edit_catalog(&mut config, edit);
    }
    logging::log_settings(&config);
    let services = Services::from_config(&config).map_err(|err| err.to_string())?;
    match mode {
        Mode::Detect => detect_once(&services, &config),
        _ => watch(&services, config),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Mode {
    Watch,
    Detect,
    Catalog(CatalogEdit),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum CatalogEdit {
    List,
    Enable(String, bool),
    Move { from: usize, to: usize },
    Reset,
}

fn parse_args(args: Vec<String>) -> Result<Option<Mode>, String> {
    let mut args = args.into_iter();
    let mode = match args.next().as_deref() {
        Some("-h" | "--help") => {
            println!("{}", help_text());
            return Ok(None);
        }
        None | Some("watch") => Mode::Watch,
        Some("detect") => Mode::Detect,
        Some("catalog") => Mode::Catalog(parse_catalog_edit(args.by_ref())?),
        Some(unknown) => return Err(format!("Unknown argument: {unknown}\n\n{}", help_text())),
    };
    if let Some(extra) = args.next() {
        return Err(format!("Unexpected argument: {extra}"));
    }
    Ok(Some(mode))
}

fn parse_catalog_edit(args: &mut impl Iterator<Item = String>) -> Result<CatalogEdit, String> {
    let mut value = |what: &str| args.next().ok_or_else(|| format!("catalog requires {what}"));
    let edit = match value("an action")?.as_str() {
        "list" => CatalogEdit::List,
        "enable" => CatalogEdit::Enable(value("a tag name")?, true),
        "disable" => CatalogEdit::Enable(value("a tag name")?, false),
        "move" => {
            let from = value("a source position")?;
            let to = value("a destination position")?;
            CatalogEdit::Move {
                from: parse_position(&from)?,
                to: parse_position(&to)?,
            }
        }
        "reset" => CatalogEdit::Reset,
        unknown => return Err(format!("Unknown catalog action: {unknown}")),
    };
    Ok(edit)
}

/// Positions are 1-based on the command line.
fn parse_position(raw: &str) -> Result<usize, String> {
    match raw.parse::<usize>() {
        Ok(position) if position > 0 => Ok(position - 1),
        _ => Err(format!("Invalid position: {raw}")),
    }
}

fn edit_catalog(config: &mut AppConfig, edit: CatalogEdit) -> Result<(), String> {
    let path = config::config_path().map_err(|err| err.to_string())?;
    let catalog = apply_catalog_edit(config, edit, &path)?;
    for (idx, entry) in catalog.entries().iter().enumerate() {
        let mark = if entry.enabled { "on " } else { "off" };
        println!("{:>2}. [{mark}] {}", idx + 1, entry.name);
    }
    Ok(())
}

/// Apply `edit` to the configured catalog, saving to `path` only when it changed.
fn apply_catalog_edit(
    config: &mut AppConfig,
    edit: CatalogEdit,
    path: &Path,
) -> Result<TagCatalog, String> {
    let mut catalog = config.catalog();
    match edit {
        CatalogEdit::List => {}
        CatalogEdit::Enable(name, enabled) => {
            if !catalog.set_enabled(&name, enabled) {
                return Err(format!("No catalog tag named {name}"));
            }
        }
        CatalogEdit::Move { from, to } => {
            // Moving down lands after the target, matching list drag semantics.
            let destination = if to > from { to + 1 } else { to };
            catalog.move_entries(&[from], destination);
        }
        CatalogEdit::Reset => catalog.reset_to_defaults(),
    }
    if edit_changes_catalog(&catalog, config) {
        config.set_catalog(&catalog);
        config::save_to_path(config, path).map_err(|err| err.to_string())?;
    }
    Ok(catalog)
}

fn edit_changes_catalog(catalog: &TagCatalog, config: &AppConfig) -> bool {
    catalog.entries() != config.tags.as_slice()
}

fn help_text() -> &'static str {
    "Usage: vibetag [watch|detect|catalog <action>]\n\n\
     watch   Follow the player and read commands from stdin (default)\n\
     detect  Detect the current file once and print its tags\n\
     catalog list | enable <name> | disable <name> | move <from> <to> | reset\n\n\
     Commands in watch mode:\n\
     \x20 detect         Re-detect the current file now\n\
     \x20 open <path>    Use <path> as the current file\n\
     \x20 toggle <name>  Toggle a catalog tag on the current file\n\
     \x20 enable <name>  Show a catalog tag (disable <name> hides it)\n\
     \x20 next | prev    Skip forward or back in the player\n\
     \x20 auto on|off    Switch automatic polling\n\
     \x20 status         Show the current file and tags\n\
     \x20 quit           Exit"
}

fn detect_once(services: &Services, config: &AppConfig) -> Result<(), String> {
    let mut reconciler = services.reconciler(config);
    let file = reconciler.detect();
    for event in reconciler.drain_events() {
        if let SessionEvent::Status(status) = &event {
            println!("{status}");
        }
    }
    match file {
        Some(_) => {
            println!("{}", render_snapshot(&reconciler.snapshot()));
            Ok(())
        }
        None => Err("No file detected".to_string()),
    }
}

fn watch(services: &Services, mut config: AppConfig) -> Result<(), String> {
    let config_path = config::config_path().map_err(|err| err.to_string())?;
    let handle = runtime::spawn_session(
        services.reconciler(&config),
        Some(services.control.clone()),
        config.poll_interval(),
    )
    .map_err(|err| format!("Failed to start session: {err}"))?;

    let (line_tx, line_rx) = mpsc::channel::<String>();
    thread::Builder::new()
        .name("vibetag-stdin".into())
        .spawn(move || {
            for line in io::stdin().lock().lines() {
                let Ok(line) = line else { break };
                if line_tx.send(line).is_err() {
                    break;
                }
            }
        })
        .map_err(|err| format!("Failed to read stdin: {err}"))?;

    loop {
        while let Ok(event) = handle.events().try_recv() {
            println!("{}", render_event(&event));
        }
        match line_rx.recv_timeout(Duration::from_millis(50)) {
            Ok(line) => match parse_command(&line) {
                Ok(Some(Input::Session(command))) => handle.send(command),
                Ok(Some(Input::Catalog(edit))) => {
                    match apply_catalog_edit(&mut config, edit, &config_path) {
                        Ok(catalog) => handle.send(SessionCommand::SetCatalog(catalog)),
                        Err(err) => println!("{err}"),
                    }
                }
                Ok(Some(Input::Help)) => println!("{}", help_text()),
                Ok(Some(Input::Quit)) => break,
                Ok(None) => {}
                Err(err) => println!("{err}"),
            },
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }
    handle.shutdown();
    Ok(())
}

#[derive(Debug, PartialEq, Eq)]
enum Input {
    Session(SessionCommand),
    Catalog(CatalogEdit),
    Help,
    Quit,
}

fn parse_command(line: &str) -> Result<Option<Input>, String> {
    let line = line.trim();
    let (word, rest) = line
        .split_once(char::is_whitespace)
        .map_or((line, ""), |(word, rest)| (word, rest.trim()));
    let input = match word {
        "" => return Ok(None),
        "detect" => Input::Session(SessionCommand::DetectNow),
        "open" if !rest.is_empty() => Input::Session(SessionCommand::Open(PathBuf::from(rest))),
        "open" => return Err("open requires a file path".to_string()),
        "enable" | "disable" if !rest.is_empty() => {
            Input::Catalog(CatalogEdit::Enable(rest.to_string(), word == "enable"))
        }
        "enable" | "disable" => return Err(format!("{word} requires a tag name")),
        "toggle" if !rest.is_empty() => Input::Session(SessionCommand::Toggle(rest.to_string())),
        "toggle" => return Err("toggle requires a tag name".to_string()),
        "next" => Input::Session(SessionCommand::Control(ControlCommand::Next)),
        "prev" | "previous" => Input::Session(SessionCommand::Control(ControlCommand::Previous)),
        "auto" => match rest {
            "on" => Input::Session(SessionCommand::SetAutoRefresh(true)),
            "off" => Input::Session(SessionCommand::SetAutoRefresh(false)),
            _ => return Err("usage: auto on|off".to_string()),
        },
        "status" => Input::Session(SessionCommand::Snapshot),
        "help" | "?" => Input::Help,
        "quit" | "exit" => Input::Quit,
        unknown => return Err(format!("Unknown command: {unknown} (try help)")),
    };
    Ok(Some(input))
}

fn render_event(event: &SessionEvent) -> String {
    match event {
        SessionEvent::FileChanged(file) => format!(
            "file: {} ({}){}",
            file.path.display(),
            file.size_label(),
            if file.cached { " [cached]" } else { "" }
        ),
        SessionEvent::TagsChanged { tags, .. } => format!("tags: {tags}"),
        SessionEvent::Status(status) if status.persistent => format!("!! {status}"),
        SessionEvent::Status(status) => status.to_string(),
        SessionEvent::Snapshot(snapshot) => render_snapshot(snapshot),
    }
}

fn render_snapshot(snapshot: &SessionSnapshot) -> String {
    let mut out = match &snapshot.file {
        Some(file) => format!("{} ({})\n", file.display_name, file.size_label()),
        None => "No active file\n".to_string(),
    };
    for entry in snapshot.catalog.entries().iter().filter(|entry| entry.enabled) {
        let mark = if snapshot.tags.contains(&entry.name) { "x" } else { " " };
        out.push_str(&format!("[{mark}] {}\n", entry.name));
    }
    out.push_str(&format!(
        "auto refresh: {}",
        if snapshot.auto_refresh { "on" } else { "off" }
    ));
    out
}
