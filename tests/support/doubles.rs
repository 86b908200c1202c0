use std::{
    collections::VecDeque,
    path::{Path, PathBuf},
    sync::{
        Arc, Mutex,
        atomic::{AtomicBool, AtomicUsize, Ordering},
        mpsc::{self, Receiver, Sender},
    },
};

use vibetag::{
    player::{
        CurrentFileResolver, PlayerLocator, PlayerProbe, PlayerProcess, PlayerTarget, ProbeError,
    },
    session::Reconciler,
    tags::{TAGS_ATTRIBUTE, TagCatalog, TagSet, TagStore, attributes::MemoryAttributes, payload},
};

/// Locator whose answer can be flipped mid-test.
pub struct SwitchLocator {
    running: AtomicBool,
}

impl SwitchLocator {
    pub fn running() -> Self {
        Self {
            running: AtomicBool::new(true),
        }
    }

    pub fn set_running(&self, running: bool) {
        self.running.store(running, Ordering::SeqCst);
    }
}

impl PlayerLocator for SwitchLocator {
    fn find(&self, _target: &PlayerTarget) -> Option<PlayerProcess> {
        self.running
            .load(Ordering::SeqCst)
            .then_some(PlayerProcess { pid: 99, exe: None })
    }
}

/// Replays queued results, then a fixed fallback.
pub struct ScriptedResolver {
    queue: Mutex<VecDeque<Result<PathBuf, ProbeError>>>,
    otherwise: Result<PathBuf, ProbeError>,
    calls: AtomicUsize,
}

impl ScriptedResolver {
    pub fn always(path: &Path) -> Self {
        Self::with(Vec::new(), Ok(path.to_path_buf()))
    }

    pub fn with(
        queue: Vec<Result<PathBuf, ProbeError>>,
        otherwise: Result<PathBuf, ProbeError>,
    ) -> Self {
        Self {
            queue: Mutex::new(queue.into()),
            otherwise,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl CurrentFileResolver for ScriptedResolver {
    fn resolve_current_file(&self, _player: &PlayerProcess) -> Result<PathBuf, ProbeError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let queued = self.queue.lock().unwrap().pop_front();
        queued.unwrap_or_else(|| self.otherwise.clone())
    }
}

/// Blocks every resolution until the test releases it.
pub struct GatedResolver {
    path: PathBuf,
    release: Mutex<Receiver<()>>,
    entered: AtomicUsize,
}

impl GatedResolver {
    pub fn new(path: &Path) -> (Self, Sender<()>) {
        let (tx, rx) = mpsc::channel();
        (
            Self {
                path: path.to_path_buf(),
                release: Mutex::new(rx),
                entered: AtomicUsize::new(0),
            },
            tx,
        )
    }

    /// Resolutions started so far, released or not.
    pub fn entered(&self) -> usize {
        self.entered.load(Ordering::SeqCst)
    }
}

impl CurrentFileResolver for GatedResolver {
    fn resolve_current_file(&self, _player: &PlayerProcess) -> Result<PathBuf, ProbeError> {
        self.entered.fetch_add(1, Ordering::SeqCst);
        self.release
            .lock()
            .unwrap()
            .recv()
            .map_err(|_| ProbeError::ProbeCommunicationError("gate closed".into()))?;
        Ok(self.path.clone())
    }
}

pub fn probe_with(
    locator: Arc<dyn PlayerLocator>,
    resolver: Arc<dyn CurrentFileResolver>,
) -> Arc<PlayerProbe> {
    Arc::new(PlayerProbe::new(PlayerTarget::default(), locator, resolver))
}

/// Reconciler over an in-memory attribute store and the default catalog.
pub fn reconciler_with(
    attributes: &Arc<MemoryAttributes>,
    probe: Arc<PlayerProbe>,
) -> Reconciler {
    Reconciler::new(
        probe,
        TagStore::new(attributes.clone(), None),
        TagCatalog::default(),
    )
}

pub fn seed_tags(attributes: &MemoryAttributes, path: &Path, names: &[&str]) {
    let tags = names.iter().copied().collect::<TagSet>();
    attributes.insert_raw(path, TAGS_ATTRIBUTE, payload::encode(&tags).unwrap());
}

pub fn stored_tags(attributes: &MemoryAttributes, path: &Path) -> TagSet {
    attributes
        .raw(path, TAGS_ATTRIBUTE)
        .map(|raw| payload::decode(&raw).unwrap())
        .unwrap_or_default()
}
