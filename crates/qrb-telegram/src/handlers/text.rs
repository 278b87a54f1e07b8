use std::sync::Arc;

use teloxide::{prelude::*, types::ParseMode};

use qrb_core::{calc, formatting::code, utils::AuditEvent};

use crate::router::AppState;

use super::{check_rate_limit, sender};

pub async fn handle_text(bot: Bot, msg: Message, state: Arc<AppState>) -> ResponseResult<()> {
    let Some(text) = msg.text().map(|s| s.to_string()) else {
        return Ok(());
    };
    let (user_id, username) = sender(&msg);

    match calc::calculate(&text) {
        // Not expression-like: a routing decision, not an error.
        None => {
            let _ = bot
                .send_message(
                    msg.chat.id,
                    "📸 Send me an image containing a QR code, or a math \
                     expression like 12*(3+4)/2.",
                )
                .await;
        }
        Some(result) => {
            if !check_rate_limit(&bot, &msg, &state).await? {
                return Ok(());
            }

            match result {
                Ok(line) => {
                    if let Err(e) = state
                        .audit
                        .write(AuditEvent::calc(user_id, &username, &text, Some(&line)))
                    {
                        tracing::warn!("audit write failed: {e}");
                    }
                    let _ = bot
                        .send_message(msg.chat.id, code(&line))
                        .parse_mode(ParseMode::Html)
                        .await;
                }
                Err(e) => {
                    // Detail is for operators; the user gets one generic message.
                    tracing::warn!("calc failed for user {user_id}: {e}");
                    let _ = state.audit.write(AuditEvent::error(
                        user_id,
                        &username,
                        &e.to_string(),
                        Some("calc"),
                    ));
                    let _ = bot
                        .send_message(msg.chat.id, "❌ I couldn't evaluate that expression.")
                        .await;
                }
            }
        }
    }

    Ok(())
}
