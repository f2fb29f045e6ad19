//! Platform-specific marker traits and timers.
//!
//! On native targets futures and shared state must be `Send`/`Sync` so the
//! session can be driven from a multi-threaded runtime. On `wasm32-unknown`
//! there are no threads and the markers are blanket-implemented for
//! everything.

pub use imp::{Duration, MaybeSend, MaybeSendFuture, MaybeSendSync, sleep};

#[cfg(not(all(target_arch = "wasm32", any(target_os = "unknown", target_os = "none"))))]
mod imp {
    pub use std::time::Duration;

    /// Suspends the current task for `duration`.
    pub async fn sleep(duration: Duration) {
        tokio::time::sleep(duration).await;
    }

    /// Marker trait for types that may be `Send`, depending on platform.
    pub trait MaybeSend: Send {}
    impl<T: Send> MaybeSend for T {}

    /// Marker trait for types that may be `Send + Sync`, depending on platform.
    pub trait MaybeSendSync: Send + Sync {}
    impl<T: Send + Sync> MaybeSendSync for T {}

    /// Marker trait for Future types that may be `Send`, depending on platform.
    pub trait MaybeSendFuture: Future + Send {}
    impl<T: Future + Send> MaybeSendFuture for T {}
}

#[cfg(all(target_arch = "wasm32", any(target_os = "unknown", target_os = "none")))]
mod imp {
    pub use web_time::Duration;

    /// Suspends the current task for `duration`.
    pub async fn sleep(duration: Duration) {
        gloo_timers::future::sleep(duration).await;
    }

    /// Marker trait for types that may be `Send`, depending on platform.
    pub trait MaybeSend {}
    impl<T> MaybeSend for T {}

    /// Marker trait for types that may be `Send + Sync`, depending on platform.
    pub trait MaybeSendSync {}
    impl<T> MaybeSendSync for T {}

    /// Marker trait for Future types that may be `Send`, depending on platform.
    pub trait MaybeSendFuture: Future {}
    impl<T: Future> MaybeSendFuture for T {}
}
