//! Per-client sessions and the crawl coordination protocol
//!
//! A session translates command lines into state changes and owns the crawl
//! workers it spawned. The concurrency contract lives here: the
//! `accepting_new` gate is the sole mechanism by which a crawl is drained,
//! and once it is down the drainer is the only mutator of the workers map.
//!
//! Lock discipline: the process-wide store mutex and the per-session
//! workers mutex are disjoint domains. Neither is ever held across an
//! await, and neither is taken while the other is held.

pub(crate) mod worker;

use crate::command::{self, Command};
use crate::config::Config;
use crate::fetch::LinkProvider;
use crate::server::SessionRegistry;
use crate::store::{is_valid_database_name, Store, DEFAULT_DATABASE};
use std::collections::HashMap;
use std::io::BufRead;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;

/// Session state shared with crawl workers and the registry
pub struct SessionShared {
    pub(crate) id: u64,
    /// Current logical database; rebound by `use`
    database: Mutex<String>,
    /// Worker acceptance gate; false only while a drain is in progress
    pub(crate) accepting_new: AtomicBool,
    /// URL -> running worker task, guarded separately from the store
    pub(crate) workers: Mutex<HashMap<String, JoinHandle<()>>>,
    /// The process-wide exclusive store guard
    pub(crate) store: Arc<Mutex<Store>>,
    pub(crate) provider: Arc<dyn LinkProvider>,
    grace: Duration,
}

impl SessionShared {
    pub(crate) fn accepting_new(&self) -> bool {
        self.accepting_new.load(Ordering::SeqCst)
    }

    /// Returns the logical database this session is bound to
    pub fn current_database(&self) -> String {
        self.database.lock().unwrap().clone()
    }

    fn set_current_database(&self, db: &str) {
        *self.database.lock().unwrap() = db.to_string();
    }

    fn live_worker_count(&self) -> usize {
        let workers = self.workers.lock().unwrap();
        workers.values().filter(|h| !h.is_finished()).count()
    }

    /// Drain protocol: gate off, grace sleep, join every worker, gate on
    ///
    /// Returns the number of workers joined; zero means there was nothing
    /// to stop and the session state is unchanged. Invoked both by the
    /// owning session (`stop`) and by peers through
    /// [`SessionRegistry::stop_database`].
    pub async fn stop(&self) -> usize {
        self.accepting_new.store(false, Ordering::SeqCst);

        // Give in-flight workers a moment to observe the gate.
        tokio::time::sleep(self.grace).await;

        let drained: Vec<JoinHandle<()>> = {
            let mut workers = self.workers.lock().unwrap();
            if workers.is_empty() {
                self.accepting_new.store(true, Ordering::SeqCst);
                return 0;
            }
            workers.drain().map(|(_, handle)| handle).collect()
        };

        let count = drained.len();
        for handle in drained {
            let _ = handle.await;
        }

        self.accepting_new.store(true, Ordering::SeqCst);
        count
    }
}

/// One connected client: command execution against the shared store
pub struct Session {
    shared: Arc<SessionShared>,
    registry: Arc<SessionRegistry>,
    seed_file: PathBuf,
}

impl Session {
    /// Creates a session bound to the default database and registers it
    pub fn connect(
        registry: Arc<SessionRegistry>,
        provider: Arc<dyn LinkProvider>,
        config: &Config,
    ) -> crate::Result<Self> {
        let shared = Arc::new(SessionShared {
            id: registry.next_session_id(),
            database: Mutex::new(DEFAULT_DATABASE.to_string()),
            accepting_new: AtomicBool::new(true),
            workers: Mutex::new(HashMap::new()),
            store: Arc::clone(registry.store()),
            provider,
            grace: Duration::from_millis(config.crawler.grace_period_ms),
        });

        // Every session starts on the default database, creating it if
        // this is the first connection ever.
        {
            let mut store = shared.store.lock().unwrap();
            store.create_database(DEFAULT_DATABASE)?;
        }

        registry.register(&shared);

        Ok(Self {
            shared,
            registry,
            seed_file: PathBuf::from(&config.server.seed_file),
        })
    }

    /// The shared state, for registry bookkeeping and tests
    pub fn shared(&self) -> &Arc<SessionShared> {
        &self.shared
    }

    /// Executes one command line and returns the reply text
    pub async fn execute(&self, line: &str) -> String {
        match command::parse(line) {
            Err(_) => "ERROR: unsupported command".to_string(),
            Ok(Command::Drop(db)) => self.drop_database(db).await,
            Ok(Command::Help) => command::help_text(DEFAULT_DATABASE),
            Ok(Command::Init) => self.init().await,
            Ok(Command::Pause) => self.pause().await,
            Ok(Command::Resume) => self.resume(),
            Ok(Command::Sanitize) => Self::sanitize(),
            Ok(Command::Start(n)) => self.start(n),
            Ok(Command::Stop) => self.stop().await,
            Ok(Command::Threads) => self.threads(),
            Ok(Command::Use(db)) => self.use_database(db).await,
        }
    }

    /// Drains workers and removes the session from the registry
    ///
    /// Called by the listener when the client disconnects.
    pub async fn shutdown(self) {
        self.shared.stop().await;
        self.registry.unregister(self.shared.id);
    }

    async fn use_database(&self, db: Option<String>) -> String {
        // Quiesce current workers, saving their frontier so that switching
        // back later can resume where this crawl left off.
        self.pause().await;

        let db = db.unwrap_or_else(|| DEFAULT_DATABASE.to_string());
        if !is_valid_database_name(&db) {
            return "ERROR: invalid database name".to_string();
        }

        let created = {
            let mut store = self.shared.store.lock().unwrap();
            store.create_database(&db)
        };

        match created {
            Ok(()) => {
                self.shared.set_current_database(&db);
                format!("using database {db}")
            }
            Err(e) => {
                tracing::error!(session = self.shared.id, "use {db} failed: {e}");
                format!("ERROR: unable to use database {db}")
            }
        }
    }

    async fn init(&self) -> String {
        let db = self.shared.current_database();

        // No crawl may be running anywhere on this database while its
        // tables are replaced.
        self.registry.stop_database(&db).await;

        let result = {
            let mut store = self.shared.store.lock().unwrap();
            store.init_tables(&db).and_then(|()| {
                match std::fs::File::open(&self.seed_file) {
                    Ok(file) => {
                        for line in std::io::BufReader::new(file).lines() {
                            let site = match line {
                                Ok(site) => site,
                                Err(e) => {
                                    tracing::warn!("error reading seed file: {e}");
                                    break;
                                }
                            };
                            if !site.is_empty() {
                                store.insert_seed(&db, &site)?;
                            }
                        }
                    }
                    Err(e) => {
                        // Missing seed file is non-fatal; the tables stand.
                        tracing::warn!(
                            "seed file {} not readable: {e}",
                            self.seed_file.display()
                        );
                    }
                }
                Ok(())
            })
        };

        match result {
            Ok(()) => "initialized new tables".to_string(),
            Err(e) => {
                tracing::error!(session = self.shared.id, "init on {db} failed: {e}");
                "ERROR: unable to initialize new tables".to_string()
            }
        }
    }

    async fn drop_database(&self, db: Option<String>) -> String {
        let db = db.unwrap_or_else(|| DEFAULT_DATABASE.to_string());
        if !is_valid_database_name(&db) {
            return "ERROR: invalid database name".to_string();
        }

        // Quiesce every session bound to this database, our own included.
        self.registry.stop_database(&db).await;

        let dropped = {
            let mut store = self.shared.store.lock().unwrap();
            store.drop_database(&db)
        };

        match dropped {
            Ok(()) => format!("dropped database {db}"),
            Err(e) => {
                tracing::error!(session = self.shared.id, "drop {db} failed: {e}");
                format!("ERROR: unable to drop database {db}")
            }
        }
    }

    fn start(&self, count: Option<String>) -> String {
        let count = match count {
            None => 1,
            Some(arg) => match arg.parse::<i64>() {
                Err(_) => return "ERROR: please input a number".to_string(),
                Ok(n) if n < 1 => {
                    return "ERROR: please input a number of threads greater than 0".to_string()
                }
                Ok(n) => n as usize,
            },
        };

        let db = self.shared.current_database();
        let seeds = {
            let mut store = self.shared.store.lock().unwrap();
            store.claim_seeds(&db, count)
        };

        match seeds {
            Err(e) => {
                tracing::error!(session = self.shared.id, "start on {db} failed: {e}");
                "ERROR: unable to start threads".to_string()
            }
            Ok(seeds) if seeds.is_empty() => {
                "ERROR: no more seeds to start threads from".to_string()
            }
            Ok(seeds) => {
                let started = seeds.len();
                worker::spawn_workers(&self.shared, seeds);
                format!("started {}", thread_phrase(started))
            }
        }
    }

    async fn stop(&self) -> String {
        match self.shared.stop().await {
            0 => "ERROR: no threads to stop".to_string(),
            _ => "stopped all threads".to_string(),
        }
    }

    async fn pause(&self) -> String {
        let shared = &self.shared;
        shared.accepting_new.store(false, Ordering::SeqCst);
        tokio::time::sleep(shared.grace).await;

        let frontier: Vec<String> = {
            let workers = shared.workers.lock().unwrap();
            workers.keys().cloned().collect()
        };
        if frontier.is_empty() {
            shared.accepting_new.store(true, Ordering::SeqCst);
            return "ERROR: no threads to pause".to_string();
        }

        // The gate is down, so the frontier snapshot cannot grow or shrink
        // between here and the join below.
        let db = shared.current_database();
        let saved = {
            let mut store = shared.store.lock().unwrap();
            store.save_state(&db, &frontier)
        };
        if let Err(e) = saved {
            tracing::error!(session = shared.id, "pause on {db} failed: {e}");
            shared.accepting_new.store(true, Ordering::SeqCst);
            return "ERROR: unable to save state to database".to_string();
        }

        let drained: Vec<JoinHandle<()>> = {
            let mut workers = shared.workers.lock().unwrap();
            workers.drain().map(|(_, handle)| handle).collect()
        };
        for handle in drained {
            let _ = handle.await;
        }

        shared.accepting_new.store(true, Ordering::SeqCst);
        "paused all threads".to_string()
    }

    fn resume(&self) -> String {
        let db = self.shared.current_database();
        let recovered = {
            let mut store = self.shared.store.lock().unwrap();
            store.take_state(&db)
        };

        match recovered {
            Err(e) => {
                tracing::error!(session = self.shared.id, "resume on {db} failed: {e}");
                "ERROR: unable to retrieve saved state".to_string()
            }
            Ok(urls) if urls.is_empty() => "ERROR: no state was saved".to_string(),
            Ok(urls) => {
                let resumed = urls.len();
                worker::spawn_workers(&self.shared, urls);
                format!("resumed {}", thread_phrase(resumed))
            }
        }
    }

    fn threads(&self) -> String {
        format!(
            "{} currently running",
            thread_phrase(self.shared.live_worker_count())
        )
    }

    fn sanitize() -> String {
        // Reserved: will sweep job postings whose source URLs no longer
        // exist once the jobs table format is settled.
        "database has been sanitized".to_string()
    }
}

fn thread_phrase(count: usize) -> String {
    if count == 1 {
        "1 thread".to_string()
    } else {
        format!("{count} threads")
    }
}
