//! Download worker counters, instrumented the way the teacher wires session
//! handling up to `scuffle_metrics` — one `#[metrics]` module of zero-arg
//! counters, incremented inline at the call site.

#[scuffle_metrics::metrics]
pub(crate) mod hds_demux {
    use scuffle_metrics::collector::CounterU64;

    /// A fragment (or bootstrap) download attempt was made.
    #[metrics(unit = "requests")]
    pub fn download_attempt() -> CounterU64;

    /// A download attempt failed and will be retried (or has exhausted its budget).
    #[metrics(unit = "requests")]
    pub fn download_attempt_failure() -> CounterU64;

    /// A download completed successfully.
    #[metrics(unit = "requests")]
    pub fn download_success() -> CounterU64;

    /// The caller requested cancellation of an in-flight download.
    #[metrics(unit = "requests")]
    pub fn download_aborted() -> CounterU64;
}
