use std::sync::Arc;

use teloxide::{net::Download, prelude::*};

use crate::router::AppState;

use super::{
    check_rate_limit, sender,
    scan::{run_scan, ScanContext},
};

fn is_image_document(doc: &teloxide::types::Document) -> bool {
    doc.mime_type
        .as_ref()
        .map(|m| m.to_string().starts_with("image/"))
        .unwrap_or(false)
}

async fn download_document(
    bot: &Bot,
    doc: &teloxide::types::Document,
) -> anyhow::Result<Vec<u8>> {
    let file = bot.get_file(doc.file.id.clone()).await?;

    let mut buf: Vec<u8> = Vec::new();
    bot.download_file(&file.path, &mut buf).await?;

    Ok(buf)
}

pub async fn handle_document(bot: Bot, msg: Message, state: Arc<AppState>) -> ResponseResult<()> {
    let Some(doc) = msg.document().cloned() else {
        return Ok(());
    };
    if !check_rate_limit(&bot, &msg, &state).await? {
        return Ok(());
    }
    let (user_id, username) = sender(&msg);

    if !is_image_document(&doc) {
        let _ = bot
            .send_message(
                msg.chat.id,
                "📄 Please send an image file containing a QR code.",
            )
            .await;
        return Ok(());
    }

    if doc.file.size as u64 > state.cfg.max_image_bytes {
        let _ = bot
            .send_message(
                msg.chat.id,
                format!(
                    "❌ File too large (max {} MB).",
                    state.cfg.max_image_bytes / (1024 * 1024)
                ),
            )
            .await;
        return Ok(());
    }

    let bytes = match download_document(&bot, &doc).await {
        Ok(b) => b,
        Err(e) => {
            tracing::warn!("document download failed: {e}");
            let _ = bot
                .send_message(
                    msg.chat.id,
                    "❌ Sorry, I couldn't download your document. Please try again.",
                )
                .await;
            return Ok(());
        }
    };

    run_scan(
        ScanContext {
            bot,
            state,
            chat_id: msg.chat.id,
            user_id,
            username,
            message_type: "document",
        },
        bytes,
    )
    .await
}
