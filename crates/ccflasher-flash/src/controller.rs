//! Controller context shared by jobs and status queries
//!
//! One [`FlasherController`] is built at start-up and cloned into whatever
//! needs it. It owns the debug session, the status board, the image store
//! and the busy gate. At most one job holds the gate; it is released when
//! the job's [`BusyGuard`] drops, on every exit path.

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use ccflasher_core::programmer::DebugLink;
use ccflasher_core::protocol::DebugSession;
use parking_lot::Mutex;

use crate::error::{FlashError, JobError, Result};
use crate::jobs::{self, JobKind};
use crate::status::{Status, StatusBoard, ERROR_PREFIX};
use crate::storage::{ImageStore, FIRMWARE_IMAGE};

/// Boxed debug link as returned by the programmer registry
pub type BoxedLink = Box<dyn DebugLink + Send>;

/// Debug session over a boxed link
pub type Session = DebugSession<BoxedLink>;

struct Shared {
    session: Mutex<Session>,
    status: StatusBoard,
    busy: AtomicBool,
    store: Arc<dyn ImageStore>,
}

/// Holds the busy gate until dropped
struct BusyGuard {
    shared: Arc<Shared>,
}

impl BusyGuard {
    fn acquire(shared: &Arc<Shared>) -> Result<Self> {
        shared
            .busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| FlashError::Busy)?;
        Ok(Self {
            shared: Arc::clone(shared),
        })
    }
}

impl Drop for BusyGuard {
    fn drop(&mut self) {
        self.shared.busy.store(false, Ordering::Release);
    }
}

/// A running background job
pub struct JobHandle {
    kind: JobKind,
    handle: JoinHandle<std::result::Result<(), JobError>>,
}

impl JobHandle {
    /// Which job this is
    pub fn kind(&self) -> JobKind {
        self.kind
    }

    /// Whether the job thread has exited
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Wait for the job to end
    pub fn join(self) -> std::result::Result<(), JobError> {
        self.handle.join().unwrap_or(Err(JobError::Panicked))
    }
}

/// Shared handle to the session, status and busy gate
#[derive(Clone)]
pub struct FlasherController {
    shared: Arc<Shared>,
}

impl FlasherController {
    /// Create a controller around an opened link
    pub fn new(link: BoxedLink, store: Arc<dyn ImageStore>) -> Self {
        Self {
            shared: Arc::new(Shared {
                session: Mutex::new(DebugSession::new(link)),
                status: StatusBoard::new(),
                busy: AtomicBool::new(false),
                store,
            }),
        }
    }

    /// Current status; never blocks longer than the status read wait
    pub fn status(&self) -> Status {
        self.shared.status.snapshot()
    }

    /// Whether a job or action holds the busy gate
    pub fn is_busy(&self) -> bool {
        self.shared.busy.load(Ordering::Acquire)
    }

    /// The image store
    pub fn store(&self) -> Arc<dyn ImageStore> {
        Arc::clone(&self.shared.store)
    }

    /// Save the firmware image for a later flash or verify job
    pub fn store_firmware(&self, data: &[u8]) -> Result<()> {
        let _guard = BusyGuard::acquire(&self.shared)?;
        self.shared
            .store
            .store(FIRMWARE_IMAGE, data)
            .map_err(FlashError::Storage)?;
        log::info!("Stored {} ({} bytes)", FIRMWARE_IMAGE, data.len());
        Ok(())
    }

    /// Start a dump job
    pub fn start_dump(&self) -> Result<JobHandle> {
        self.start(JobKind::Dump)
    }

    /// Start a flash job
    pub fn start_flash(&self) -> Result<JobHandle> {
        self.start(JobKind::Flash)
    }

    /// Start a verify job
    pub fn start_verify(&self) -> Result<JobHandle> {
        self.start(JobKind::Verify)
    }

    fn start(&self, kind: JobKind) -> Result<JobHandle> {
        let guard = BusyGuard::acquire(&self.shared)?;
        let shared = Arc::clone(&self.shared);

        let handle = thread::Builder::new()
            .name(format!("{}-job", kind))
            .spawn(move || {
                let _guard = guard;
                let result = panic::catch_unwind(AssertUnwindSafe(|| {
                    let mut session = shared.session.lock();
                    jobs::run_job(kind, &mut *session, &shared.status, shared.store.as_ref())
                }));
                result.unwrap_or_else(|_| {
                    let error = JobError::Panicked;
                    log::error!("{} job panicked", kind);
                    shared
                        .status
                        .update(format!("{} {}", ERROR_PREFIX, error), Some(0));
                    Err(error)
                })
            })
            .map_err(FlashError::Spawn)?;

        log::info!("Started {} job", kind);
        Ok(JobHandle { kind, handle })
    }

    /// Read-protect the chip; runs on the calling thread
    pub fn lock_chip(&self) -> Result<()> {
        let _guard = BusyGuard::acquire(&self.shared)?;
        let mut session = self.shared.session.lock();
        jobs::run_lock(&mut *session, &self.shared.status);
        Ok(())
    }

    /// Erase the chip; runs on the calling thread
    pub fn erase_chip(&self) -> Result<()> {
        let _guard = BusyGuard::acquire(&self.shared)?;
        let mut session = self.shared.session.lock();
        jobs::run_erase(&mut *session, &self.shared.status)?;
        Ok(())
    }

    /// Run `f` on the session while holding the busy gate
    pub fn with_session<R>(&self, f: impl FnOnce(&mut Session) -> R) -> Result<R> {
        let _guard = BusyGuard::acquire(&self.shared)?;
        let mut session = self.shared.session.lock();
        Ok(f(&mut *session))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{MemoryStore, DUMP_IMAGE};
    use ccflasher_dummy::{DummyConfig, DummyTarget};
    use std::io::{self, Write};
    use std::sync::mpsc::{sync_channel, Receiver, SyncSender};
    use std::time::{Duration, Instant};

    fn controller(target: DummyTarget) -> (FlasherController, MemoryStore) {
        let store = MemoryStore::new();
        let ctrl = FlasherController::new(Box::new(target), Arc::new(store.clone()));
        (ctrl, store)
    }

    #[test]
    fn test_dump_job() {
        let image: Vec<u8> = (0..16 * 1024).map(|i| (i * 3 + i / 239) as u8).collect();
        let config = DummyConfig::default().with_flash_size(16 * 1024);
        let (ctrl, store) = controller(DummyTarget::with_image(config, &image));

        let job = ctrl.start_dump().unwrap();
        assert_eq!(job.kind(), JobKind::Dump);
        job.join().unwrap();

        let status = ctrl.status();
        assert_eq!(status.message, "DUMP_READY");
        assert_eq!(status.percent, 100);
        assert!(!ctrl.is_busy());
        assert_eq!(store.get(DUMP_IMAGE).unwrap(), image);
    }

    #[test]
    fn test_flash_job_mismatch() {
        let mut target = DummyTarget::new(DummyConfig::default());
        target.set_stuck_byte(0x200, 0xFF);
        let (ctrl, store) = controller(target);
        ctrl.store_firmware(&[0xAA; 1024]).unwrap();

        let err = ctrl.start_flash().unwrap().join().unwrap_err();
        assert_eq!(err.to_string(), "Mismatch @ 0x0200 (Exp:AA Act:FF)");
        assert_eq!(
            ctrl.status().message,
            "Error: Mismatch @ 0x0200 (Exp:AA Act:FF)"
        );
        assert!(!store.exists(FIRMWARE_IMAGE));
        assert!(!ctrl.is_busy());
    }

    #[test]
    fn test_busy_gate_rejects_without_touching_status() {
        let (ctrl, _store) = controller(DummyTarget::new(DummyConfig::default()));
        let before = ctrl.status();

        let inner = ctrl.clone();
        ctrl.with_session(|_| {
            assert!(inner.is_busy());
            assert!(matches!(inner.start_dump(), Err(FlashError::Busy)));
            assert!(matches!(inner.start_flash(), Err(FlashError::Busy)));
            assert!(matches!(inner.lock_chip(), Err(FlashError::Busy)));
            assert!(matches!(inner.erase_chip(), Err(FlashError::Busy)));
            assert!(matches!(inner.store_firmware(&[1, 2]), Err(FlashError::Busy)));
            assert_eq!(inner.status(), before);
        })
        .unwrap();

        assert!(!ctrl.is_busy());
        assert_eq!(ctrl.status(), before);
    }

    /// Store whose `create` waits for the test to release it
    struct GatedStore {
        inner: MemoryStore,
        release: parking_lot::Mutex<Receiver<()>>,
    }

    impl GatedStore {
        fn new() -> (Self, SyncSender<()>) {
            let (tx, rx) = sync_channel(0);
            let store = Self {
                inner: MemoryStore::new(),
                release: parking_lot::Mutex::new(rx),
            };
            (store, tx)
        }
    }

    impl ImageStore for GatedStore {
        fn exists(&self, name: &str) -> bool {
            self.inner.exists(name)
        }

        fn read(&self, name: &str) -> io::Result<Vec<u8>> {
            self.inner.read(name)
        }

        fn create(&self, name: &str) -> io::Result<Box<dyn Write + Send>> {
            let _ = self.release.lock().recv();
            self.inner.create(name)
        }

        fn remove(&self, name: &str) -> io::Result<()> {
            self.inner.remove(name)
        }
    }

    #[test]
    fn test_second_job_rejected_while_running() {
        let (store, release) = GatedStore::new();
        let ctrl = FlasherController::new(
            Box::new(DummyTarget::new(DummyConfig::default())),
            Arc::new(store),
        );

        let job = ctrl.start_dump().unwrap();
        assert!(ctrl.is_busy());

        // The dump blocks in `create` right after this update, before touching the target
        let deadline = Instant::now() + Duration::from_secs(10);
        while ctrl.status().message != "BUSY: Init Debug-Mode..." {
            assert!(Instant::now() < deadline, "dump job never started");
            thread::sleep(Duration::from_millis(1));
        }

        let before = ctrl.status();
        assert!(matches!(ctrl.start_verify(), Err(FlashError::Busy)));
        assert!(matches!(ctrl.start_dump(), Err(FlashError::Busy)));
        assert_eq!(ctrl.status(), before);

        release.send(()).unwrap();
        job.join().unwrap();
        assert!(!ctrl.is_busy());
        assert_eq!(ctrl.status().message, "DUMP_READY");
    }

    #[test]
    fn test_gate_released_after_failure() {
        let (ctrl, _store) = controller(DummyTarget::new(DummyConfig::default()));
        // No firmware uploaded
        assert!(ctrl.start_verify().unwrap().join().is_err());
        assert_eq!(ctrl.status().message, "Error: File missing!");
        assert!(!ctrl.is_busy());

        ctrl.store_firmware(&[0xFF; 16]).unwrap();
        ctrl.start_verify().unwrap().join().unwrap();
        assert_eq!(ctrl.status().message, "Success: Chip identical!");
    }

    #[test]
    fn test_lock_and_erase_actions() {
        let (ctrl, _store) = controller(DummyTarget::new(DummyConfig::default()));

        ctrl.lock_chip().unwrap();
        assert_eq!(
            ctrl.status().message,
            "Success: Chip Locked (Read Protected)!"
        );
        let locked = ctrl
            .with_session(|s| {
                s.connect();
                s.identify()
            })
            .unwrap()
            .unwrap()
            .locked;
        assert!(locked);

        ctrl.erase_chip().unwrap();
        assert_eq!(ctrl.status().percent, 100);
        assert!(!ctrl.is_busy());
    }
}
