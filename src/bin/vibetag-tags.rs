//! CLI utility to inspect or replace the Finder tags of a file.

use std::{path::PathBuf, sync::Arc};

use vibetag::{
    logging,
    process::SystemRunner,
    services::tag_store,
    tags::{TagSet, TagStore},
};

fn main() {
    if let Err(err) = run() {
        eprintln!("{err}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), String> {
    let Some(options) = parse_args(std::env::args().skip(1).collect())? else {
        return Ok(());
    };
    if let Err(err) = logging::init(logging::TAG_TOOL) {
        eprintln!("Logging disabled: {err}");
    }
    let store = tag_store(Arc::new(SystemRunner));
    execute(&store, &options)
}

fn execute(store: &TagStore, options: &Options) -> Result<(), String> {
    let path = &options.path;
    match options.action {
        Action::Read => {
            let tags = store.read_tags(path).map_err(|err| err.to_string())?;
            for name in tags.iter() {
                println!("{name}");
            }
        }
        Action::Raw => {
            let entries = store.read_raw_tags(path).map_err(|err| err.to_string())?;
            for entry in entries {
                println!("{entry:?}");
            }
        }
        Action::Write => {
            let tags = options.tags.iter().cloned().collect::<TagSet>();
            store
                .write_tags(path, &tags)
                .map_err(|err| err.to_string())?;
            println!("Wrote {} tag(s) to {}.", tags.len(), path.display());
        }
        Action::Clear => {
            store
                .write_tags(path, &TagSet::new())
                .map_err(|err| err.to_string())?;
            println!("Cleared tags on {}.", path.display());
        }
    }
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Action {
    Read,
    Raw,
    Write,
    Clear,
}

#[derive(Debug, PartialEq, Eq)]
struct Options {
    action: Action,
    path: PathBuf,
    tags: Vec<String>,
}

fn parse_args(args: Vec<String>) -> Result<Option<Options>, String> {
    let mut args = args.into_iter();
    let action = match args.next().as_deref() {
        None | Some("-h" | "--help") => {
            println!("{}", help_text());
            return Ok(None);
        }
        Some("read") => Action::Read,
        Some("raw") => Action::Raw,
        Some("write") => Action::Write,
        Some("clear") => Action::Clear,
        Some(unknown) => return Err(format!("Unknown command: {unknown}\n\n{}", help_text())),
    };
    let path = args
        .next()
        .map(PathBuf::from)
        .ok_or_else(|| "A file path is required".to_string())?;
    let tags = args.collect::<Vec<_>>();
    if action != Action::Write && !tags.is_empty() {
        return Err("Only write accepts tag names".to_string());
    }
    Ok(Some(Options { action, path, tags }))
}

fn help_text() -> &'static str {
    "Usage: vibetag-tags <read|raw|write|clear> <path> [tags...]\n\n\
     read   Print the tag names on <path>\n\
     raw    Print stored entries verbatim, color codes included\n\
     write  Replace the tags on <path> with the given names\n\
     clear  Remove all tags from <path>"
}
