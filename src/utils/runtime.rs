use anyhow::Result;

/// Commands coming from the host are handled one at a time, so a current thread runtime is
/// enough for the whole application.
pub fn single_thread_runtime() -> Result<tokio::runtime::Runtime> {
    Ok(tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?)
}
