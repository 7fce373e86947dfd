use crate::lifetime::{HookId, Lifetime};
use crate::observers::ObserverRef;
use crate::tasks::TaskRef;

/// A submission that has been started by its caller but not yet admitted.
pub(super) struct PendingItem<V, E> {
    /// Queue-local identity, used to withdraw the item when its lifetime ends.
    pub id: u64,

    /// Task to start on admission.
    pub task: TaskRef<V, E>,

    /// Caller's observer.
    pub observer: ObserverRef<V, E>,

    /// Caller's cancellation scope.
    pub lifetime: Lifetime,

    /// Withdrawal hook on `lifetime`; removed once the item is admitted.
    pub withdraw_hook: HookId,
}
