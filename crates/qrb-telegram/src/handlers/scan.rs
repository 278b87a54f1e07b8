//! Shared scan path for photos and image documents.

use std::sync::Arc;

use teloxide::{prelude::*, types::ParseMode};

use qrb_core::{
    formatting::{code, escape_html},
    ports::DecodedCode,
    utils::{truncate_text, AuditEvent},
};

use crate::router::AppState;

pub(crate) struct ScanContext {
    pub bot: Bot,
    pub state: Arc<AppState>,
    pub chat_id: teloxide::types::ChatId,
    pub user_id: i64,
    pub username: String,
    pub message_type: &'static str,
}

pub(crate) async fn run_scan(ctx: ScanContext, bytes: Vec<u8>) -> ResponseResult<()> {
    let status = ctx
        .bot
        .send_message(ctx.chat_id, "🔍 Analyzing image for QR codes...")
        .await
        .ok();

    // Decoding is CPU-bound; keep it off the runtime workers.
    let decoder = ctx.state.decoder.clone();
    let decoded = tokio::task::spawn_blocking(move || decoder.decode_image(&bytes)).await;

    let reply = match decoded {
        Ok(Ok(codes)) => {
            if let Err(e) = ctx.state.audit.write(AuditEvent::scan(
                ctx.user_id,
                &ctx.username,
                ctx.message_type,
                codes.len(),
            )) {
                tracing::warn!("audit write failed: {e}");
            }
            format_scan_reply(&codes, ctx.state.cfg.telegram_safe_limit)
        }
        Ok(Err(e)) => {
            tracing::warn!("decode failed for user {}: {e}", ctx.user_id);
            let _ = ctx.state.audit.write(AuditEvent::error(
                ctx.user_id,
                &ctx.username,
                &e.to_string(),
                Some("scan"),
            ));
            "❌ Sorry, I couldn't process that image. Please try again.".to_string()
        }
        Err(e) => {
            tracing::error!("decode task failed: {e}");
            "❌ Sorry, I couldn't process that image. Please try again.".to_string()
        }
    };

    let _ = ctx
        .bot
        .send_message(ctx.chat_id, reply)
        .parse_mode(ParseMode::Html)
        .await;

    if let Some(st) = status {
        let _ = ctx.bot.delete_message(st.chat.id, st.id).await;
    }

    Ok(())
}

pub(crate) fn format_scan_reply(codes: &[DecodedCode], safe_limit: usize) -> String {
    if codes.is_empty() {
        return "❌ No QR codes found in the image.\n\n\
                Tips:\n\
                • Make sure the QR code is clearly visible\n\
                • Check that the image has good lighting\n\
                • Try sending a higher quality image"
            .to_string();
    }

    // Payloads are untrusted; escape them and cap per-code length so the
    // whole reply stays under the message limit.
    let budget = (safe_limit / codes.len()).max(100);

    if codes.len() == 1 {
        let c = &codes[0];
        return format!(
            "✅ QR code decoded successfully!\n\n\
             <b>Type:</b> {}\n\
             <b>Content:</b>\n{}",
            escape_html(&c.symbology),
            code(&truncate_text(&c.payload, budget)),
        );
    }

    let mut out = format!("✅ Found {} QR codes:\n", codes.len());
    for (i, c) in codes.iter().enumerate() {
        out.push_str(&format!(
            "\n<b>QR code #{}</b>\nType: {}\nContent: {}\n",
            i + 1,
            escape_html(&c.symbology),
            code(&truncate_text(&c.payload, budget)),
        ));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn qr(payload: &str) -> DecodedCode {
        DecodedCode {
            payload: payload.to_string(),
            symbology: "QR-Code".to_string(),
        }
    }

    #[test]
    fn empty_scan_gets_tips() {
        let reply = format_scan_reply(&[], 4000);
        assert!(reply.contains("No QR codes found"));
    }

    #[test]
    fn single_code_is_rendered_monospace() {
        let reply = format_scan_reply(&[qr("https://example.com")], 4000);
        assert!(reply.contains("<code>https://example.com</code>"));
        assert!(reply.contains("QR-Code"));
    }

    #[test]
    fn multiple_codes_are_numbered() {
        let reply = format_scan_reply(&[qr("one"), qr("two")], 4000);
        assert!(reply.contains("Found 2 QR codes"));
        assert!(reply.contains("QR code #2"));
        assert!(reply.contains("<code>two</code>"));
    }

    #[test]
    fn payloads_are_escaped_and_capped() {
        let hostile = "<script>alert(1)</script>";
        let reply = format_scan_reply(&[qr(hostile)], 4000);
        assert!(!reply.contains("<script>"));
        assert!(reply.contains("&lt;script&gt;"));

        let long = "x".repeat(10_000);
        let reply = format_scan_reply(&[qr(&long)], 4000);
        assert!(reply.len() < 6_000);
        assert!(reply.contains("..."));
    }
}
