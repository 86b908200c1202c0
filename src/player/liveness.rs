use std::{
    collections::HashMap,
    ffi::OsStr,
    path::{Path, PathBuf},
    sync::Mutex,
};

use sysinfo::{ProcessRefreshKind, ProcessesToUpdate, System, UpdateKind};

use super::PlayerTarget;

/// A running instance of the target player.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerProcess {
    pub pid: u32,
    pub exe: Option<PathBuf>,
}

/// Answers "is the player running, and which process is it?".
pub trait PlayerLocator: Send + Sync {
    fn find(&self, target: &PlayerTarget) -> Option<PlayerProcess>;
}

/// Looks the player up in the OS process list.
///
/// A process matches when it is the main executable of an `.app` bundle
/// (`<bundle>/Contents/MacOS/<exe>`) whose `Info.plist` declares the target
/// bundle identifier. Helpers nested elsewhere in the bundle never match.
/// Processes outside a readable bundle fall back to a process-name
/// comparison.
pub struct SystemLocator {
    system: Mutex<System>,
    bundle_ids: Mutex<HashMap<PathBuf, Option<String>>>,
}

impl Default for SystemLocator {
    fn default() -> Self {
        Self::new()
    }
}

impl SystemLocator {
    pub fn new() -> Self {
        Self {
            system: Mutex::new(System::new()),
            bundle_ids: Mutex::new(HashMap::new()),
        }
    }

    fn matches(&self, target: &PlayerTarget, name: &OsStr, exe: Option<&Path>) -> bool {
        if let Some(bundle) = exe.and_then(main_bundle) {
            let identifier = self
                .bundle_ids
                .lock()
                .unwrap_or_else(|err| err.into_inner())
                .entry(bundle.to_path_buf())
                .or_insert_with(|| read_bundle_identifier(bundle))
                .clone();
            if let Some(identifier) = identifier {
                return identifier == target.bundle_id;
            }
        }
        name == OsStr::new(&target.app_name)
    }
}

impl PlayerLocator for SystemLocator {
    fn find(&self, target: &PlayerTarget) -> Option<PlayerProcess> {
        let mut system = self.system.lock().unwrap_or_else(|err| err.into_inner());
        system.refresh_processes_specifics(
            ProcessesToUpdate::All,
            true,
            ProcessRefreshKind::nothing().with_exe(UpdateKind::OnlyIfNotSet),
        );
        let found = system.processes().iter().find_map(|(pid, process)| {
            self.matches(target, process.name(), process.exe())
                .then(|| PlayerProcess {
                    pid: pid.as_u32(),
                    exe: process.exe().map(Path::to_path_buf),
                })
        });
        if let Some(process) = &found {
            tracing::trace!("Found {} as pid {}", target.bundle_id, process.pid);
        }
        found
    }
}

/// The `.app` directory whose main executable is `exe`, if any.
fn main_bundle(exe: &Path) -> Option<&Path> {
    let macos = exe
        .parent()
        .filter(|dir| dir.file_name() == Some(OsStr::new("MacOS")))?;
    let contents = macos
        .parent()
        .filter(|dir| dir.file_name() == Some(OsStr::new("Contents")))?;
    contents.parent().filter(|bundle| {
        bundle
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("app"))
    })
}

/// Read `CFBundleIdentifier` from `<bundle>/Contents/Info.plist`.
pub fn read_bundle_identifier(bundle: &Path) -> Option<String> {
    let info = bundle.join("Contents").join("Info.plist");
    let value = plist::Value::from_file(&info).ok()?;
    value
        .as_dictionary()?
        .get("CFBundleIdentifier")?
        .as_string()
        .map(str::to_string)
}
