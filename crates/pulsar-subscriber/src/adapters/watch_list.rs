//! # Watch List
//!
//! In-memory subscription registry implementing [`AddresseeResolver`].
//!
//! Two views are kept in step under one lock:
//!
//! - `by_app`: application -> watched addresses (what `cancel_sub` edits)
//! - `by_address`: address -> watching applications (what `resolve` reads)
//!
//! An address present in `by_address` is "marked"; unmarked addresses
//! resolve to the empty set without touching any per-application data.

use crate::domain::ResolveError;
use crate::ports::AddresseeResolver;
use async_trait::async_trait;
use parking_lot::RwLock;
use shared_types::{Address, AppId};
use std::collections::{BTreeSet, HashMap};
use tracing::debug;

#[derive(Default)]
struct Subscriptions {
    by_app: HashMap<AppId, BTreeSet<Address>>,
    by_address: HashMap<Address, BTreeSet<AppId>>,
}

/// Registry of which application watches which address.
#[derive(Default)]
pub struct WatchList {
    inner: RwLock<Subscriptions>,
}

impl WatchList {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe `app_id` to `addresses`.
    ///
    /// Returns how many of them were newly added.
    pub fn add_sub(&self, app_id: &AppId, addresses: impl IntoIterator<Item = Address>) -> usize {
        let mut inner = self.inner.write();
        let Subscriptions {
            by_app,
            by_address,
        } = &mut *inner;
        let watched = by_app.entry(app_id.clone()).or_default();

        let mut added = 0;
        for address in addresses {
            if watched.insert(address.clone()) {
                by_address
                    .entry(address)
                    .or_default()
                    .insert(app_id.clone());
                added += 1;
            }
        }

        if watched.is_empty() {
            by_app.remove(app_id);
        }
        debug!(app_id = %app_id, added, "Subscriptions added");
        added
    }

    /// Unsubscribe `app_id` from `addresses`.
    ///
    /// Returns how many subscriptions were removed. Addresses no application
    /// watches any longer are unmarked.
    pub fn cancel_sub(
        &self,
        app_id: &AppId,
        addresses: impl IntoIterator<Item = Address>,
    ) -> usize {
        let mut inner = self.inner.write();
        let Subscriptions {
            by_app,
            by_address,
        } = &mut *inner;
        let Some(watched) = by_app.get_mut(app_id) else {
            return 0;
        };

        let mut removed = 0;
        for address in addresses {
            if !watched.remove(&address) {
                continue;
            }
            removed += 1;
            if let Some(apps) = by_address.get_mut(&address) {
                apps.remove(app_id);
                if apps.is_empty() {
                    by_address.remove(&address);
                }
            }
        }

        if watched.is_empty() {
            by_app.remove(app_id);
        }
        debug!(app_id = %app_id, removed, "Subscriptions cancelled");
        removed
    }

    /// Whether any application watches `address`.
    #[must_use]
    pub fn is_marked(&self, address: &Address) -> bool {
        self.inner.read().by_address.contains_key(address)
    }

    /// Every address at least one application watches.
    #[must_use]
    pub fn watched_addresses(&self) -> BTreeSet<Address> {
        self.inner.read().by_address.keys().cloned().collect()
    }

    /// Addresses `app_id` watches.
    #[must_use]
    pub fn subscriptions_of(&self, app_id: &AppId) -> BTreeSet<Address> {
        self.inner
            .read()
            .by_app
            .get(app_id)
            .cloned()
            .unwrap_or_default()
    }

    /// Applications watching `address`.
    #[must_use]
    pub fn watchers_of(&self, address: &Address) -> BTreeSet<AppId> {
        self.inner
            .read()
            .by_address
            .get(address)
            .cloned()
            .unwrap_or_default()
    }
}

#[async_trait]
impl AddresseeResolver for WatchList {
    async fn resolve(&self, address: &Address) -> Result<BTreeSet<AppId>, ResolveError> {
        Ok(self.watchers_of(address))
    }
}
