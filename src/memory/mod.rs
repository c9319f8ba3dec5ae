use crate::config::BotConfig;
use crate::core::{Clock, MessageRecord};
use chrono::{DateTime, Duration, Utc};
use log::{debug, info};
use std::collections::{HashMap, VecDeque};
use std::fmt::Write as _;
use std::sync::{Arc, Mutex, Weak};
use std::time::Duration as StdDuration;
use tokio::sync::{RwLock, watch};
use tokio::task::JoinHandle;

/// Per-conversation buffer with its own lock, so operations on the same
/// channel never interleave while cross-channel operations share no lock.
type ConversationHandle = Arc<RwLock<VecDeque<MessageRecord>>>;

/// Bounded, time-evicting message context, keyed by channel id.
///
/// Each channel keeps at most `max_context_size` records (FIFO trim on
/// write). A background sweeper owned by the store removes records older
/// than `context_max_age_minutes` and drops channels that become empty.
/// The sweeper starts on construction and stops on [`shutdown`].
///
/// `get_context` deliberately does not filter by age: eviction happens only
/// on write (size) and in the sweep (age), so records may transiently
/// outlive the age limit between sweeps.
///
/// [`shutdown`]: EphemeralMemory::shutdown
pub struct EphemeralMemory {
    conversations: RwLock<HashMap<String, ConversationHandle>>,
    max_size: usize,
    max_age: Duration,
    clock: Arc<dyn Clock>,
    sweeper: Mutex<Option<JoinHandle<()>>>,
    shutdown_tx: watch::Sender<bool>,
}

impl EphemeralMemory {
    /// Creates the store and spawns its periodic sweeper.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(config: &BotConfig, clock: Arc<dyn Clock>) -> Arc<Self> {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let store = Arc::new(Self {
            conversations: RwLock::new(HashMap::new()),
            max_size: config.max_context_size,
            max_age: config.max_age(),
            clock,
            sweeper: Mutex::new(None),
            shutdown_tx,
        });

        let handle = Self::spawn_sweeper(&store, config.sweep_interval(), shutdown_rx);
        *store.lock_sweeper() = Some(handle);

        info!(
            "started ephemeral memory: max_size={} max_age={}min sweep_interval={}s",
            config.max_context_size,
            config.context_max_age_minutes,
            config.sweep_interval_secs
        );

        store
    }

    fn spawn_sweeper(
        store: &Arc<Self>,
        interval: StdDuration,
        mut shutdown_rx: watch::Receiver<bool>,
    ) -> JoinHandle<()> {
        // Weak reference so an abandoned store (never shut down, all Arcs
        // dropped) does not keep the task alive forever.
        let weak: Weak<Self> = Arc::downgrade(store);

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = tokio::time::sleep(interval) => {
                        let Some(store) = weak.upgrade() else { break };
                        let now = store.clock.now();
                        store.sweep(now).await;
                    }
                    changed = shutdown_rx.changed() => {
                        if changed.is_err() || *shutdown_rx.borrow_and_update() {
                            break;
                        }
                    }
                }
            }
        })
    }

    /// Appends a message to the channel's context, stamped with the current
    /// clock time. Evicts the oldest records while the buffer exceeds the
    /// configured size. Creates the channel entry on first use.
    pub async fn add_message(&self, channel_id: &str, content: &str, author_id: &str) {
        let record = MessageRecord::new(content, author_id, self.clock.now());
        self.add_record(channel_id, record).await;
    }

    /// Appends an already-stamped record. Same bounding behavior as
    /// [`add_message`](Self::add_message).
    ///
    /// The map guard is held across the buffer write: the sweep's removal
    /// phase takes the map write lock before retiring an empty buffer, so a
    /// buffer observed here can never be unlinked before the push lands.
    pub async fn add_record(&self, channel_id: &str, record: MessageRecord) {
        let conversations = self.conversations.read().await;
        if let Some(handle) = conversations.get(channel_id) {
            let mut records = handle.write().await;
            Self::append(&mut records, record, self.max_size, channel_id);
            return;
        }
        drop(conversations);

        let mut conversations = self.conversations.write().await;
        let handle = Arc::clone(
            conversations
                .entry(channel_id.to_string())
                .or_default(),
        );
        let mut records = handle.write().await;
        Self::append(&mut records, record, self.max_size, channel_id);
    }

    fn append(
        records: &mut VecDeque<MessageRecord>,
        record: MessageRecord,
        max_size: usize,
        channel_id: &str,
    ) {
        records.push_back(record);
        while records.len() > max_size {
            records.pop_front();
        }

        debug!(
            "added message to context: channel={} context_size={}",
            channel_id,
            records.len()
        );
    }

    /// Snapshot of the channel's current records, oldest first. Empty if the
    /// channel has no context. No age filtering is applied on read.
    pub async fn get_context(&self, channel_id: &str) -> Vec<MessageRecord> {
        let handle = {
            let conversations = self.conversations.read().await;
            match conversations.get(channel_id) {
                Some(handle) => Arc::clone(handle),
                None => return Vec::new(),
            }
        };

        let records = handle.read().await;
        records.iter().cloned().collect()
    }

    /// Snapshot of every channel's records, for diagnostics. Ordered by
    /// channel id so output is stable.
    pub async fn get_all_contexts(&self) -> Vec<Vec<MessageRecord>> {
        let mut contexts = Vec::new();
        for (_, handle) in self.sorted_handles().await {
            let records = handle.read().await;
            contexts.push(records.iter().cloned().collect());
        }
        contexts
    }

    async fn sorted_handles(&self) -> Vec<(String, ConversationHandle)> {
        let conversations = self.conversations.read().await;
        let mut handles: Vec<_> = conversations
            .iter()
            .map(|(id, handle)| (id.clone(), Arc::clone(handle)))
            .collect();
        handles.sort_by(|a, b| a.0.cmp(&b.0));
        handles
    }

    /// Removes records older than the configured age and drops channels that
    /// end up empty. Idempotent; normally driven by the owned sweeper but
    /// safe to call directly.
    pub async fn sweep(&self, now: DateTime<Utc>) {
        let mut emptied = Vec::new();

        for (channel_id, handle) in self.sorted_handles().await {
            let mut records = handle.write().await;
            let before = records.len();
            records.retain(|record| now - record.recorded_at <= self.max_age);

            if records.len() < before {
                debug!(
                    "swept expired records: channel={} removed={}",
                    channel_id,
                    before - records.len()
                );
            }
            if records.is_empty() {
                emptied.push(channel_id);
            }
        }

        if emptied.is_empty() {
            return;
        }

        let mut conversations = self.conversations.write().await;
        for channel_id in emptied {
            // Re-check under the map lock: a concurrent add may have refilled
            // the buffer since it was observed empty.
            if let Some(handle) = conversations.get(&channel_id) {
                if handle.read().await.is_empty() {
                    conversations.remove(&channel_id);
                    debug!("removed empty channel context: channel={}", channel_id);
                }
            }
        }
    }

    /// Renders a human-readable snapshot of the store: one block per channel
    /// with each record's index, age, content and author, followed by
    /// aggregate stats.
    pub async fn describe(&self) -> String {
        let now = self.clock.now();
        let mut info = String::from("**Ephemeral Memory Contents**\n");
        let handles = self.sorted_handles().await;

        for (channel_id, handle) in &handles {
            let _ = write!(info, "\n__Channel {}:__\n", channel_id);
            let records = handle.read().await;
            for (index, record) in records.iter().enumerate() {
                let age_secs = (now - record.recorded_at).num_seconds();
                let _ = writeln!(
                    info,
                    "{}. [{}s ago] {} (from: {})",
                    index + 1,
                    age_secs,
                    record.content,
                    record.author_id
                );
            }
        }

        let _ = write!(info, "\n__Stats:__\n");
        let _ = writeln!(info, "\u{2022} Total Channels: {}", handles.len());
        let _ = writeln!(info, "\u{2022} Max Context Size: {}", self.max_size);
        let _ = write!(
            info,
            "\u{2022} Max Age: {} minutes",
            self.max_age.num_minutes()
        );

        info
    }

    /// Number of channels currently holding context.
    pub async fn channel_count(&self) -> usize {
        self.conversations.read().await.len()
    }

    /// Stops the sweeper (waiting for any in-flight cycle to finish) and
    /// releases all held conversations. Idempotent.
    pub async fn shutdown(&self) {
        let _ = self.shutdown_tx.send(true);

        let handle = self.lock_sweeper().take();
        if let Some(handle) = handle {
            let _ = handle.await;
        }

        self.conversations.write().await.clear();
        info!("cleaned up ephemeral memory");
    }

    // Never held across an await, so a std mutex suffices.
    fn lock_sweeper(&self) -> std::sync::MutexGuard<'_, Option<JoinHandle<()>>> {
        match self.sweeper.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}
