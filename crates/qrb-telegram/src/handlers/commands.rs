use teloxide::prelude::*;

fn parse_command(text: &str) -> (String, String) {
    // Telegram may send `/cmd@botname arg1 ...`
    let mut parts = text.trim().splitn(2, char::is_whitespace);
    let first = parts.next().unwrap_or("").trim();
    let rest = parts.next().unwrap_or("").trim().to_string();

    let cmd = first
        .trim_start_matches('/')
        .split('@')
        .next()
        .unwrap_or("")
        .to_lowercase();

    (cmd, rest)
}

const START_TEXT: &str = "Hi! I'm a QR code decoder bot 🤖\n\n\
Send me an image containing a QR code and I'll decode it for you!\n\
You can send the image as a photo or document.\n\n\
I also do arithmetic: type something like 12*(3+4)/2 and I'll answer.";

const HELP_TEXT: &str = "🔍 QR Code Decoder Bot Help\n\n\
How to use:\n\
1. Send me any image containing a QR code\n\
2. I'll analyze the image and extract the QR code data\n\
3. I'll send you back the decoded information\n\n\
Supported formats:\n\
• Photos sent directly through Telegram\n\
• Images sent as documents\n\
• Most common image formats (JPEG, PNG, etc.)\n\n\
Calculator:\n\
• Type a math expression (+, -, *, /, %, ^, //, parentheses)\n\
• Example: 5^3 or 10 ÷ 4\n\n\
Tips for better results:\n\
• Ensure the QR code is clearly visible\n\
• Good lighting helps with detection\n\
• The QR code should be reasonably sized in the image\n\n\
Commands:\n\
/start - Start the bot\n\
/help - Show this help message";

pub async fn handle_command(bot: Bot, msg: Message) -> ResponseResult<()> {
    let Some(text) = msg.text() else {
        return Ok(());
    };
    let (cmd, _rest) = parse_command(text);

    let reply = match cmd.as_str() {
        "start" => START_TEXT,
        "help" => HELP_TEXT,
        _ => "Unknown command. Try /help.",
    };
    let _ = bot.send_message(msg.chat.id, reply).await;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_command_with_bot_suffix_and_args() {
        assert_eq!(
            parse_command("/help@qrb_bot now"),
            ("help".to_string(), "now".to_string())
        );
        assert_eq!(parse_command("/START"), ("start".to_string(), String::new()));
    }
}
