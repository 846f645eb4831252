// ==========================================
// Packing Station - command line entry
// ==========================================
// Reads one JSON request per stdin line:
//   {"command": "pack_detail", "payload": {"detail_id": 1}}
// and writes one JSON response per stdout line.
// ==========================================

use std::sync::Arc;

use anyhow::Context;
use packing_station::api::ApiError;
use packing_station::app::{dispatch, error_payload, get_default_db_path, AppState, CommandRequest};
use packing_station::logging;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logging::init();

    tracing::info!("==================================================");
    tracing::info!("{} v{}", packing_station::APP_NAME, packing_station::VERSION);
    tracing::info!("==================================================");

    let db_path = std::env::args()
        .nth(1)
        .unwrap_or_else(get_default_db_path);
    tracing::info!(db_path = %db_path, "using database");

    let state = Arc::new(
        AppState::new(db_path)
            .map_err(anyhow::Error::msg)
            .context("failed to initialise application state")?,
    );

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    while let Some(line) = lines.next_line().await.context("failed to read stdin")? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let response = match serde_json::from_str::<CommandRequest>(line) {
            Ok(request) => dispatch(Arc::clone(&state), request).await,
            Err(e) => error_payload(&ApiError::InvalidArgument(format!(
                "malformed request: {}",
                e
            ))),
        };

        let mut out = serde_json::to_vec(&response).context("failed to encode response")?;
        out.push(b'\n');
        stdout.write_all(&out).await.context("failed to write stdout")?;
        stdout.flush().await.context("failed to flush stdout")?;
    }

    tracing::info!("stdin closed, shutting down");
    Ok(())
}
