/// Core error type shared by every kinotip crate.
///
/// Adapter crates map their library errors into this type so the refresh paths
/// can tell "fetch capability lost" apart from a transient failure.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("config error: {0}")]
    Config(String),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// Authentication or session failure. The source cannot be used until the
    /// session is recreated.
    #[error("source unavailable: {0}")]
    Unavailable(String),

    #[error("upstream returned HTTP {status}")]
    Upstream { status: u16 },

    #[error("external error: {0}")]
    External(String),
}

pub type Result<T> = std::result::Result<T, Error>;
