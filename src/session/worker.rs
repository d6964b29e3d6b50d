//! Crawl workers and the spawn protocol
//!
//! One task per URL. A worker fetches its page, records every newly seen
//! link in `sites` under the exclusive store guard, spawns descendants for
//! the new links, and removes itself from the owning session's workers map.
//! Every step is gated on `accepting_new`; once that gate is down the
//! drainer owns the map and the worker must not touch it.

use crate::session::SessionShared;
use std::sync::Arc;

/// Spawns one crawl worker per URL, honoring the acceptance gate
///
/// Each handle is inserted into the workers map while the map guard is
/// held across the spawn, so a worker can never observe the map without
/// its own entry present. No dedup happens here; `sites` is the dedup
/// witness and the store already filtered these URLs.
pub(crate) fn spawn_workers(shared: &Arc<SessionShared>, urls: Vec<String>) {
    for url in urls {
        if !shared.accepting_new() {
            return;
        }

        let mut workers = shared.workers.lock().unwrap();
        let handle = tokio::spawn(crawl(Arc::clone(shared), url.clone()));
        workers.insert(url, handle);
    }
}

/// Crawls a single URL: fetch, dedup-insert links, spawn descendants
async fn crawl(shared: Arc<SessionShared>, url: String) {
    if !shared.accepting_new() {
        return;
    }

    let links = match shared.provider.links(&url).await {
        Ok(links) => links,
        Err(e) => {
            // Worker-local failure: this URL falls out of the frontier.
            tracing::debug!("fetch failed for {url}: {e}");
            finish(&shared, &url);
            return;
        }
    };

    let db = shared.current_database();
    let new_links = {
        let mut store = shared.store.lock().unwrap();
        let mut fresh = Vec::new();
        for link in links {
            match store.record_site_if_new(&db, &link) {
                Ok(true) => fresh.push(link),
                Ok(false) => {}
                Err(e) => {
                    tracing::error!("store error recording links from {url}: {e}");
                    fresh.clear();
                    break;
                }
            }
        }
        fresh
    };

    spawn_workers(&shared, new_links);
    finish(&shared, &url);
}

/// Removes a finished worker from the map, unless a drain is in progress
fn finish(shared: &SessionShared, url: &str) {
    if shared.accepting_new() {
        shared.workers.lock().unwrap().remove(url);
    }
}
