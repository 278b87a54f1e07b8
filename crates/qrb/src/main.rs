use std::sync::Arc;

use qrb_core::{config::Config, ports::CodeDecoder};
use qrb_decode::RqrrDecoder;

#[tokio::main]
async fn main() -> Result<(), qrb_core::Error> {
    qrb_core::logging::init("qrb")?;

    let cfg = Arc::new(Config::load()?);
    let decoder: Arc<dyn CodeDecoder> = Arc::new(RqrrDecoder::new());

    qrb_telegram::router::run_polling(cfg, decoder)
        .await
        .map_err(|e| qrb_core::Error::External(format!("telegram bot failed: {e}")))?;

    Ok(())
}
