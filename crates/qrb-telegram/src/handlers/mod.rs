//! Telegram update handlers.
//!
//! Each handler is a small adapter that checks rate limits, downloads media
//! if needed, and calls into the `qrb-core` calculator or the decoder port.

use std::sync::Arc;

use teloxide::{prelude::*, types::Message};

use qrb_core::{domain::UserId, utils::AuditEvent};

use crate::router::AppState;

mod commands;
mod document;
mod photo;
mod scan;
mod text;

pub async fn handle_message(bot: Bot, msg: Message, state: Arc<AppState>) -> ResponseResult<()> {
    if let Some(text) = msg.text() {
        if text.starts_with('/') {
            return commands::handle_command(bot, msg).await;
        }
        return text::handle_text(bot, msg, state).await;
    }

    if msg.photo().is_some() {
        return photo::handle_photo(bot, msg, state).await;
    }

    if msg.document().is_some() {
        return document::handle_document(bot, msg, state).await;
    }

    let _ = bot
        .send_message(
            msg.chat.id,
            "📸 Please send me an image containing a QR code to decode.\n\
             You can send it as a photo or document.",
        )
        .await;

    Ok(())
}

pub(crate) fn sender(msg: &Message) -> (i64, String) {
    let user_id = msg.from().map(|u| u.id.0 as i64).unwrap_or_default();
    let username = msg
        .from()
        .and_then(|u| u.username.clone())
        .unwrap_or_else(|| "unknown".to_string());
    (user_id, username)
}

/// Returns false (after notifying the user) when the sender is out of tokens.
pub(crate) async fn check_rate_limit(
    bot: &Bot,
    msg: &Message,
    state: &AppState,
) -> ResponseResult<bool> {
    let (user_id, username) = sender(msg);

    let (ok, retry_after) = {
        let mut rl = state.rate_limiter.lock().await;
        rl.check(UserId(user_id))
    };
    if ok {
        return Ok(true);
    }

    let retry = retry_after.unwrap_or_default().as_secs_f64();
    if let Err(e) = state
        .audit
        .write(AuditEvent::rate_limit(user_id, &username, retry))
    {
        tracing::warn!("audit write failed: {e}");
    }
    let _ = bot
        .send_message(
            msg.chat.id,
            format!("⏳ Rate limited. Please wait {retry:.1} seconds."),
        )
        .await;

    Ok(false)
}
