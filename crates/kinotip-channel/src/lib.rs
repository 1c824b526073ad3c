//! MTProto channel adapter (grammers).
//!
//! Implements the `kinotip-core` `ChannelSource` port by reading the full
//! history of one public channel with a user session.

use std::{io::Write, path::PathBuf};

use async_trait::async_trait;
use grammers_client::{
    types::{Chat, Media},
    Client, Config, InitParams, SignInError,
};
use grammers_session::Session;
use tokio::io::{AsyncBufReadExt, BufReader};

use kinotip_core::{
    config::CollectorConfig,
    domain::PostKind,
    errors::Error,
    ports::{ChannelMessage, ChannelSource},
    Result,
};

pub mod lock;

use lock::{LockPolicy, SessionLock};

#[derive(Clone, Debug)]
pub struct ChannelSettings {
    pub api_id: i32,
    pub api_hash: String,
    pub phone: String,
    pub session_file: PathBuf,
    pub channel: String,
    pub limit: Option<usize>,
}

impl From<&CollectorConfig> for ChannelSettings {
    fn from(cfg: &CollectorConfig) -> Self {
        Self {
            api_id: cfg.api_id,
            api_hash: cfg.api_hash.clone(),
            phone: cfg.phone.clone(),
            session_file: cfg.session_file.clone(),
            channel: cfg.channel_slug().to_string(),
            limit: cfg.fetch_limit,
        }
    }
}

/// Reads channel history with a fresh client per fetch.
///
/// A connection is opened under the session lock, used, and dropped; nothing
/// stays connected between scheduled refreshes.
pub struct TelegramChannel {
    settings: ChannelSettings,
    lock_policy: LockPolicy,
}

impl TelegramChannel {
    pub fn new(settings: ChannelSettings) -> Self {
        Self {
            settings,
            lock_policy: LockPolicy::default(),
        }
    }

    /// Log whether the stored session is usable. Never fails.
    pub async fn check_session(&self) {
        if !self.settings.session_file.exists() {
            tracing::warn!(
                session = %self.settings.session_file.display(),
                "no session file, run `kinotip-collector login` first"
            );
            return;
        }

        let _lock = self.lock().await;
        match self.connect().await {
            Ok(client) => match client.is_authorized().await {
                Ok(true) => tracing::info!("telegram session authorized"),
                Ok(false) => tracing::error!(
                    session = %self.settings.session_file.display(),
                    "session file exists but is not authorized; delete it and log in again"
                ),
                Err(e) => tracing::warn!(error = %e, "session check failed"),
            },
            Err(e) => tracing::warn!(error = %e, "session check failed"),
        }
    }

    /// Interactive sign-in that creates the session file.
    pub async fn login(&self) -> Result<()> {
        let _lock = self.lock().await;
        let client = self.connect().await?;

        if client.is_authorized().await.map_err(invocation)? {
            tracing::info!("session already authorized");
            return Ok(());
        }

        let token = client
            .request_login_code(&self.settings.phone)
            .await
            .map_err(|e| Error::Unavailable(format!("login code request failed: {e}")))?;
        let code = prompt("Enter the login code sent by Telegram: ").await?;

        match client.sign_in(&token, &code).await {
            Ok(_) => {}
            Err(SignInError::PasswordRequired(password_token)) => {
                let hint = password_token.hint().unwrap_or("none").to_string();
                let password = prompt(&format!("Two-step password (hint: {hint}): ")).await?;
                client
                    .check_password(password_token, password.trim())
                    .await
                    .map_err(|e| Error::Unavailable(format!("password check failed: {e}")))?;
            }
            Err(e) => return Err(Error::Unavailable(format!("sign in failed: {e}"))),
        }

        self.save_session(&client)?;
        tracing::info!(
            session = %self.settings.session_file.display(),
            "signed in, session file created"
        );
        Ok(())
    }

    async fn lock(&self) -> Option<SessionLock> {
        let lock = SessionLock::acquire(&self.settings.session_file, self.lock_policy).await;
        if lock.is_none() {
            tracing::warn!("could not lock the session file, continuing without the lock");
        }
        lock
    }

    async fn connect(&self) -> Result<Client> {
        let session = Session::load_file_or_create(&self.settings.session_file)?;
        Client::connect(Config {
            session,
            api_id: self.settings.api_id,
            api_hash: self.settings.api_hash.clone(),
            params: InitParams::default(),
        })
        .await
        .map_err(|e| Error::Unavailable(format!("telegram connect failed: {e}")))
    }

    fn save_session(&self, client: &Client) -> Result<()> {
        client
            .session()
            .save_to_file(&self.settings.session_file)
            .map_err(Error::Io)
    }

    async fn resolve_channel(&self, client: &Client) -> Result<Chat> {
        client
            .resolve_username(&self.settings.channel)
            .await
            .map_err(invocation)?
            .ok_or_else(|| Error::External(format!("channel @{} not found", self.settings.channel)))
    }
}

#[async_trait]
impl ChannelSource for TelegramChannel {
    async fn fetch_messages(&self) -> Result<Vec<ChannelMessage>> {
        if !self.settings.session_file.exists() {
            return Err(Error::Unavailable(format!(
                "session file {} is missing",
                self.settings.session_file.display()
            )));
        }

        let _lock = self.lock().await;
        let client = self.connect().await?;
        if !client.is_authorized().await.map_err(invocation)? {
            return Err(Error::Unavailable("telegram session is not authorized".to_string()));
        }

        let chat = self.resolve_channel(&client).await?;
        let mut iter = client.iter_messages(chat.pack());
        if let Some(limit) = self.settings.limit {
            iter = iter.limit(limit);
        }

        let mut out = Vec::new();
        while let Some(message) = iter.next().await.map_err(invocation)? {
            let media = message.media();
            out.push(ChannelMessage {
                id: i64::from(message.id()),
                text: message.text().to_string(),
                kind: classify(media.as_ref()),
                link: None,
            });
        }

        if let Err(e) = self.save_session(&client) {
            tracing::warn!(error = %e, "failed to persist session");
        }
        tracing::info!(
            channel = %self.settings.channel,
            messages = out.len(),
            "channel history fetched"
        );
        Ok(out)
    }
}

fn classify(media: Option<&Media>) -> PostKind {
    match media {
        Some(Media::Photo(_)) => PostKind::Photo,
        Some(Media::Sticker(_)) => PostKind::Sticker,
        Some(Media::Document(doc)) => kind_for_mime(doc.mime_type()),
        _ => PostKind::Text,
    }
}

/// Documents are split by MIME type: videos and animated stickers get their
/// own kind, everything else stays a document.
fn kind_for_mime(mime: Option<&str>) -> PostKind {
    match mime.map(|m| m.trim().to_ascii_lowercase()) {
        Some(m) if m == "application/x-tgsticker" => PostKind::Sticker,
        Some(m) if m.starts_with("video/") => PostKind::Video,
        _ => PostKind::Document,
    }
}

fn invocation(e: grammers_client::InvocationError) -> Error {
    Error::External(format!("telegram request failed: {e}"))
}

async fn prompt(label: &str) -> Result<String> {
    {
        let mut stdout = std::io::stdout();
        stdout.write_all(label.as_bytes())?;
        stdout.flush()?;
    }
    let mut line = String::new();
    let read = BufReader::new(tokio::io::stdin()).read_line(&mut line).await?;
    if read == 0 {
        return Err(Error::Unavailable(
            "no interactive input; run the login command in a terminal".to_string(),
        ));
    }
    Ok(line.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn video_documents_are_videos() {
        assert_eq!(kind_for_mime(Some("video/mp4")), PostKind::Video);
        assert_eq!(kind_for_mime(Some("VIDEO/quicktime")), PostKind::Video);
    }

    #[test]
    fn other_documents_stay_documents() {
        assert_eq!(kind_for_mime(Some("application/pdf")), PostKind::Document);
        assert_eq!(kind_for_mime(None), PostKind::Document);
        assert_eq!(kind_for_mime(Some("application/x-tgsticker")), PostKind::Sticker);
    }

    #[test]
    fn no_media_is_text() {
        assert_eq!(classify(None), PostKind::Text);
    }
}
