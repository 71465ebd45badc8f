//! Per-method hook bookkeeping with snapshot reads.
//!
//! The registry owns every registration. Each hooked method has a slot
//! holding an immutable, pre-sorted slice of entries; writers rebuild and
//! republish the slice under a write lock, readers clone the current `Arc`
//! under a read lock and are done. A dispatch therefore captures its chain
//! in one cheap read and is immune to registrations and removals that land
//! while the call is running.
//!
//! Chain order is `(generation, priority, registration order)`: modern
//! entries before legacy entries, lower priority first within a
//! generation, earlier registration first on equal priority.

use std::{
    collections::{HashMap, hash_map::Entry},
    fmt,
    sync::{
        Arc, RwLock,
        atomic::{AtomicU64, Ordering},
    },
};

use tracing::debug;
use waylay_core::{
    AfterHooker, BeforeHooker, HookError, Hooker, LegacyHooker, MethodDesc, MethodId,
    PRIORITY_DEFAULT,
};

use crate::bridge::HookBridge;

/// The hook half (or halves) of one registration.
pub(crate) enum HookKind {
    /// A registration from the two-trait API. At least one side is present.
    Modern {
        /// Runs in the before phase, if present.
        before: Option<Arc<dyn BeforeHooker>>,
        /// Runs in the after phase, if present.
        after: Option<Arc<dyn AfterHooker>>,
    },
    /// A registration from the older single-object API.
    Legacy {
        /// The handler, adapted into the chain by the compat shim.
        handler: Arc<dyn LegacyHooker>,
    },
}

impl HookKind {
    fn group_rank(&self) -> u8 {
        match self {
            HookKind::Modern { .. } => 0,
            HookKind::Legacy { .. } => 1,
        }
    }
}

/// One registration in a method's chain.
pub struct HookEntry {
    id: u64,
    priority: i32,
    kind: HookKind,
}

impl HookEntry {
    /// The registration's unique id; doubles as the priority tie-break.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// The registration's priority. Lower runs earlier in the before phase.
    pub fn priority(&self) -> i32 {
        self.priority
    }

    pub(crate) fn kind(&self) -> &HookKind {
        &self.kind
    }

    fn sort_key(&self) -> (u8, i32, u64) {
        (self.kind.group_rank(), self.priority, self.id)
    }
}

/// An immutable snapshot of one method's chain, captured at dispatch entry.
///
/// Registrations and removals that happen after capture never change a
/// snapshot; an in-flight call runs against the chain as it stood when the
/// call began.
#[derive(Clone)]
pub struct CallSnapshot {
    entries: Arc<[Arc<HookEntry>]>,
}

impl CallSnapshot {
    /// Number of entries in the chain.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the chain has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub(crate) fn entries(&self) -> &[Arc<HookEntry>] {
        &self.entries
    }
}

struct MethodSlot {
    method: Arc<MethodDesc>,
    published: Arc<[Arc<HookEntry>]>,
}

impl MethodSlot {
    fn new(method: Arc<MethodDesc>) -> Self {
        Self {
            method,
            published: Arc::from(Vec::new()),
        }
    }

    fn insert(&mut self, entry: Arc<HookEntry>) {
        let mut entries = self.published.to_vec();
        let pos = entries
            .iter()
            .position(|existing| existing.sort_key() > entry.sort_key())
            .unwrap_or(entries.len());
        entries.insert(pos, entry);
        self.published = Arc::from(entries);
    }

    fn remove(&mut self, entry_id: u64) -> bool {
        let mut entries = self.published.to_vec();
        let before = entries.len();
        entries.retain(|existing| existing.id != entry_id);
        if entries.len() == before {
            return false;
        }
        self.published = Arc::from(entries);
        true
    }

    fn is_empty(&self) -> bool {
        self.published.is_empty()
    }
}

struct RegistryInner {
    bridge: Arc<dyn HookBridge>,
    slots: RwLock<HashMap<MethodId, MethodSlot>>,
    next_entry_id: AtomicU64,
    empty: Arc<[Arc<HookEntry>]>,
}

/// Thread-safe hook bookkeeping for every hooked method.
///
/// The registry is explicitly constructed with its backend and shared by
/// cloning; there is no process-wide instance. Registration drives the
/// backend's instrumentation lifecycle: the first hook on a method installs
/// interception, removing the last tears it down.
#[derive(Clone)]
pub struct HookRegistry {
    inner: Arc<RegistryInner>,
}

impl HookRegistry {
    /// An empty registry on top of the given backend.
    pub fn new(bridge: Arc<dyn HookBridge>) -> Self {
        Self {
            inner: Arc::new(RegistryInner {
                bridge,
                slots: RwLock::new(HashMap::new()),
                next_entry_id: AtomicU64::new(0),
                empty: Arc::from(Vec::new()),
            }),
        }
    }

    /// Registers a both-phase hooker at the default priority.
    pub fn hook<H: Hooker>(
        &self,
        method: &Arc<MethodDesc>,
        hooker: H,
    ) -> Result<HookHandle, HookError> {
        self.hook_with_priority(method, PRIORITY_DEFAULT, hooker)
    }

    /// Registers a both-phase hooker. Lower priority runs earlier in the
    /// before phase and, symmetrically, later in the after phase.
    pub fn hook_with_priority<H: Hooker>(
        &self,
        method: &Arc<MethodDesc>,
        priority: i32,
        hooker: H,
    ) -> Result<HookHandle, HookError> {
        let hooker = Arc::new(hooker);
        let before: Arc<dyn BeforeHooker> = hooker.clone();
        let after: Arc<dyn AfterHooker> = hooker;
        self.register_entry(
            method,
            priority,
            HookKind::Modern {
                before: Some(before),
                after: Some(after),
            },
        )
    }

    /// Registers a before-only hook at the default priority.
    pub fn hook_before<B: BeforeHooker>(
        &self,
        method: &Arc<MethodDesc>,
        hooker: B,
    ) -> Result<HookHandle, HookError> {
        self.hook_before_with_priority(method, PRIORITY_DEFAULT, hooker)
    }

    /// Registers a before-only hook.
    pub fn hook_before_with_priority<B: BeforeHooker>(
        &self,
        method: &Arc<MethodDesc>,
        priority: i32,
        hooker: B,
    ) -> Result<HookHandle, HookError> {
        self.register_entry(
            method,
            priority,
            HookKind::Modern {
                before: Some(Arc::new(hooker)),
                after: None,
            },
        )
    }

    /// Registers an after-only hook at the default priority.
    pub fn hook_after<A: AfterHooker>(
        &self,
        method: &Arc<MethodDesc>,
        hooker: A,
    ) -> Result<HookHandle, HookError> {
        self.hook_after_with_priority(method, PRIORITY_DEFAULT, hooker)
    }

    /// Registers an after-only hook.
    ///
    /// The entry still occupies its priority position in the before phase
    /// (as a no-op), which is what fixes its place in the after order.
    pub fn hook_after_with_priority<A: AfterHooker>(
        &self,
        method: &Arc<MethodDesc>,
        priority: i32,
        hooker: A,
    ) -> Result<HookHandle, HookError> {
        self.register_entry(
            method,
            priority,
            HookKind::Modern {
                before: None,
                after: Some(Arc::new(hooker)),
            },
        )
    }

    /// Registers a handler from the older single-object API at the default
    /// priority.
    pub fn hook_legacy<L: LegacyHooker>(
        &self,
        method: &Arc<MethodDesc>,
        handler: L,
    ) -> Result<HookHandle, HookError> {
        self.hook_legacy_with_priority(method, PRIORITY_DEFAULT, handler)
    }

    /// Registers a handler from the older single-object API. Legacy entries
    /// order among themselves by priority but always run after the modern
    /// group in the before phase.
    pub fn hook_legacy_with_priority<L: LegacyHooker>(
        &self,
        method: &Arc<MethodDesc>,
        priority: i32,
        handler: L,
    ) -> Result<HookHandle, HookError> {
        self.register_entry(
            method,
            priority,
            HookKind::Legacy {
                handler: Arc::new(handler),
            },
        )
    }

    fn register_entry(
        &self,
        method: &Arc<MethodDesc>,
        priority: i32,
        kind: HookKind,
    ) -> Result<HookHandle, HookError> {
        if method.is_abstract() {
            return Err(HookError::InvalidArgument(format!(
                "cannot hook abstract method {method}"
            )));
        }

        let mut slots = self.inner.slots.write().expect("hook table poisoned");
        let entry = Arc::new(HookEntry {
            id: self.inner.next_entry_id.fetch_add(1, Ordering::Relaxed),
            priority,
            kind,
        });

        match slots.entry(method.id()) {
            Entry::Occupied(mut occupied) => {
                occupied.get_mut().insert(Arc::clone(&entry));
            }
            Entry::Vacant(vacant) => {
                // First hook on this method: instrument before publishing,
                // so a refusal leaves no trace.
                if !self.inner.bridge.hook_method(method) {
                    return Err(HookError::BackendRefused(method.to_string()));
                }
                debug!(method = %method, "installed interception");
                let mut slot = MethodSlot::new(Arc::clone(method));
                slot.insert(Arc::clone(&entry));
                vacant.insert(slot);
            }
        }

        debug!(method = %method, entry = entry.id, priority, "registered hook");
        Ok(HookHandle {
            registry: self.clone(),
            method: Arc::clone(method),
            entry_id: entry.id,
        })
    }

    /// Removes the registration behind `handle`.
    ///
    /// Idempotent: removing an entry that is already gone (repeated call,
    /// or the whole method already torn down) is a silent no-op.
    pub fn unregister(&self, handle: &HookHandle) {
        let mut slots = self.inner.slots.write().expect("hook table poisoned");
        let Some(slot) = slots.get_mut(&handle.method.id()) else {
            return;
        };
        if !slot.remove(handle.entry_id) {
            return;
        }
        debug!(method = %handle.method, entry = handle.entry_id, "unregistered hook");

        if slot.is_empty() {
            slots.remove(&handle.method.id());
            self.inner.bridge.unhook_method(&handle.method);
            debug!(method = %handle.method, "removed interception");
        }
    }

    /// Tears down every registration and every instrumentation. Intended
    /// for embedder shutdown.
    pub fn unhook_all(&self) {
        let mut slots = self.inner.slots.write().expect("hook table poisoned");
        let count = slots.len();
        for (_, slot) in slots.drain() {
            self.inner.bridge.unhook_method(&slot.method);
        }
        debug!(methods = count, "tore down all hooks");
    }

    /// The chain for `method` as it stands right now.
    ///
    /// This is the linearization point of a dispatch: the returned snapshot
    /// never changes, no matter what the registry does afterwards.
    pub fn snapshot(&self, method: MethodId) -> CallSnapshot {
        let slots = self.inner.slots.read().expect("hook table poisoned");
        let entries = match slots.get(&method) {
            Some(slot) => Arc::clone(&slot.published),
            None => Arc::clone(&self.inner.empty),
        };
        CallSnapshot { entries }
    }
}

/// Identity of one registration, for later removal.
///
/// Returned by every registration call. Dropping the handle does not
/// unhook; removal is always explicit, via [`HookHandle::unhook`] or
/// [`HookRegistry::unregister`].
pub struct HookHandle {
    registry: HookRegistry,
    method: Arc<MethodDesc>,
    entry_id: u64,
}

impl HookHandle {
    /// The hooked method.
    pub fn method(&self) -> &Arc<MethodDesc> {
        &self.method
    }

    /// Removes this registration. Safe to call more than once.
    pub fn unhook(&self) {
        self.registry.unregister(self);
    }
}

impl fmt::Debug for HookHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HookHandle({}/{})", self.method, self.entry_id)
    }
}
