use std::sync::Arc;

use teloxide::{net::Download, prelude::*};

use crate::router::AppState;

use super::{
    check_rate_limit, sender,
    scan::{run_scan, ScanContext},
};

async fn download_largest_photo(
    bot: &Bot,
    photos: &[teloxide::types::PhotoSize],
) -> anyhow::Result<Vec<u8>> {
    // Telegram sends several sizes; the last one is the largest.
    let best = photos
        .last()
        .ok_or_else(|| anyhow::anyhow!("no photo sizes"))?;
    let file = bot.get_file(best.file.id.clone()).await?;

    let mut buf: Vec<u8> = Vec::new();
    bot.download_file(&file.path, &mut buf).await?;

    Ok(buf)
}

pub async fn handle_photo(bot: Bot, msg: Message, state: Arc<AppState>) -> ResponseResult<()> {
    let Some(photos) = msg.photo().map(|p| p.to_vec()) else {
        return Ok(());
    };
    if !check_rate_limit(&bot, &msg, &state).await? {
        return Ok(());
    }
    let (user_id, username) = sender(&msg);

    let bytes = match download_largest_photo(&bot, &photos).await {
        Ok(b) => b,
        Err(e) => {
            tracing::warn!("photo download failed: {e}");
            let _ = bot
                .send_message(
                    msg.chat.id,
                    "❌ Sorry, I couldn't download your photo. Please try again.",
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
            message_type: "photo",
        },
        bytes,
    )
    .await
}
