use rayon::ThreadPoolBuilder;

/// Run `f` within a local rayon pool of `n_threads` threads.
pub fn with_rayon_threads<R: Send>(n_threads: usize, f: impl FnOnce() -> R + Send) -> R {
    assert!(n_threads >= 1, "n_threads must be >= 1");
    if n_threads == 1 {
        return f();
    }
    let pool = ThreadPoolBuilder::new()
        .num_threads(n_threads)
        .build()
        .expect("failed to build rayon thread pool");
    pool.install(f)
}
