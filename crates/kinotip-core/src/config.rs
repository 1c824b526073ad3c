use std::{env, net::SocketAddr, path::PathBuf, time::Duration};

use crate::{domain::Hashtag, errors::Error, Result};

/// Configuration of the collector process (channel reader + feed server).
#[derive(Clone, Debug)]
pub struct CollectorConfig {
    // MTProto credentials
    pub api_id: i32,
    pub api_hash: String,
    pub phone: String,
    pub session_file: PathBuf,

    // Channel
    pub channel_username: String,
    pub hashtag: Hashtag,
    pub fetch_limit: Option<usize>,

    // Feed server
    pub bind_addr: SocketAddr,

    // Local hours (0-23) at which the snapshot is refreshed.
    pub refresh_hours: Vec<u32>,
}

impl CollectorConfig {
    pub fn load() -> Result<Self> {
        load_dotenv();

        let api_id_raw = required("API_ID")?;
        let api_id = api_id_raw
            .trim()
            .parse::<i32>()
            .map_err(|_| Error::Config(format!("API_ID must be an integer, got {api_id_raw:?}")))?;
        let api_hash = required("API_HASH")?;
        let phone = required("PHONE")?;
        let channel_username = required("CHANNEL_USERNAME")?;

        let hashtag = load_hashtag()?;
        let session_file = PathBuf::from(
            env_str("SESSION_FILE").unwrap_or_else(|| "kinotip_parser.session".to_string()),
        );
        let fetch_limit = env_usize("FETCH_LIMIT").filter(|n| *n > 0);

        let bind_raw = env_str("FEED_BIND").unwrap_or_else(|| "127.0.0.1:5000".to_string());
        let bind_addr = bind_raw
            .trim()
            .parse::<SocketAddr>()
            .map_err(|e| Error::Config(format!("FEED_BIND {bind_raw:?} is invalid: {e}")))?;

        let refresh_hours = match env_str("REFRESH_HOURS") {
            Some(raw) => parse_hours(&raw)?,
            None => vec![0, 12],
        };

        Ok(Self {
            api_id,
            api_hash,
            phone,
            session_file,
            channel_username,
            hashtag,
            fetch_limit,
            bind_addr,
            refresh_hours,
        })
    }

    /// Channel name as used in public `t.me` links.
    pub fn channel_slug(&self) -> &str {
        self.channel_username.trim().trim_start_matches('@')
    }
}

/// Configuration of the responder process (inline bot).
#[derive(Clone, Debug)]
pub struct ResponderConfig {
    pub bot_token: String,
    /// Collector `/feed` URL. Remote refresh is disabled when unset.
    pub feed_url: Option<String>,
    pub hashtag: Hashtag,
    pub cache_ttl: Duration,
    pub feed_timeout: Duration,
}

impl ResponderConfig {
    pub fn load() -> Result<Self> {
        load_dotenv();

        let bot_token = required("BOT_TOKEN")?;
        let feed_url = env_str("FEED_URL").and_then(non_empty);
        let hashtag = load_hashtag()?;
        let cache_ttl = Duration::from_secs(env_u64("FEED_CACHE_TTL_SECS").unwrap_or(300));
        let feed_timeout = Duration::from_secs(env_u64("FEED_TIMEOUT_SECS").unwrap_or(10).max(1));

        Ok(Self {
            bot_token,
            feed_url,
            hashtag,
            cache_ttl,
            feed_timeout,
        })
    }
}

fn load_dotenv() {
    // Existing environment wins over `.env`.
    if let Ok(path) = dotenv::dotenv() {
        tracing::debug!(path = %path.display(), "loaded .env");
    }
}

fn load_hashtag() -> Result<Hashtag> {
    let Some(raw) = env_str("HASHTAG") else {
        return Ok(Hashtag::default());
    };
    let tag = Hashtag::new(&raw);
    if tag.as_str().is_empty() {
        return Err(Error::Config("HASHTAG must not be empty".to_string()));
    }
    Ok(tag)
}

fn required(key: &str) -> Result<String> {
    env_str(key)
        .and_then(non_empty)
        .ok_or_else(|| Error::Config(format!("{key} environment variable is required")))
}

fn env_str(key: &str) -> Option<String> {
    env::var(key).ok()
}

fn env_u64(key: &str) -> Option<u64> {
    env_str(key).and_then(|s| s.trim().parse::<u64>().ok())
}

fn env_usize(key: &str) -> Option<usize> {
    env_str(key).and_then(|s| s.trim().parse::<usize>().ok())
}

fn non_empty(s: String) -> Option<String> {
    if s.trim().is_empty() {
        None
    } else {
        Some(s.trim().to_string())
    }
}

fn parse_hours(raw: &str) -> Result<Vec<u32>> {
    let mut hours = Vec::new();
    for part in raw.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        let hour = part
            .parse::<u32>()
            .ok()
            .filter(|h| *h < 24)
            .ok_or_else(|| Error::Config(format!("REFRESH_HOURS: invalid hour {part:?}")))?;
        if !hours.contains(&hour) {
            hours.push(hour);
        }
    }
    if hours.is_empty() {
        return Err(Error::Config("REFRESH_HOURS must list at least one hour".to_string()));
    }
    hours.sort_unstable();
    Ok(hours)
}
