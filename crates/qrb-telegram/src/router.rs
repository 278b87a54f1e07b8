use std::sync::Arc;

use teloxide::{dispatching::Dispatcher, dptree, prelude::*};

use tokio::sync::Mutex;

use qrb_core::{
    config::Config, ports::CodeDecoder, security::RateLimiter, utils::AuditLogger,
};

use crate::handlers;

#[derive(Clone)]
pub struct AppState {
    pub cfg: Arc<Config>,
    pub decoder: Arc<dyn CodeDecoder>,
    pub rate_limiter: Arc<Mutex<RateLimiter>>,
    pub audit: Arc<AuditLogger>,
}

pub async fn run_polling(cfg: Arc<Config>, decoder: Arc<dyn CodeDecoder>) -> anyhow::Result<()> {
    let bot = Bot::new(cfg.telegram_bot_token.clone());

    // Basic startup info.
    if let Ok(me) = bot.get_me().await {
        println!("qrb started: @{}", me.username());
    }

    let state = Arc::new(AppState {
        rate_limiter: Arc::new(Mutex::new(RateLimiter::new(
            cfg.rate_limit_enabled,
            cfg.rate_limit_requests,
            cfg.rate_limit_window,
        ))),
        audit: Arc::new(AuditLogger::new(
            cfg.audit_log_path.clone(),
            cfg.audit_log_json,
        )),
        decoder,
        cfg,
    });

    let handler = dptree::entry()
        .branch(Update::filter_message().endpoint(handlers::handle_message));

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![state])
        .build()
        .dispatch()
        .await;

    Ok(())
}
