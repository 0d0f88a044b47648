use std::time::{Duration, Instant};

use tokio::io::AsyncReadExt;
use tokio::net::UnixStream;

use crate::cli::args::WaitArgs;
use crate::settings::Settings;

/// Polls the readiness socket until the daemon signals it is ready or the
/// timeout elapses. Connection refused (daemon not up yet, or socket not
/// yet bound) is treated as "not ready" and retried rather than an error.
pub async fn run(settings: &Settings, args: WaitArgs) -> anyhow::Result<i32> {
    let timeout: Duration = *args.timeout;
    let retry_interval: Duration = *args.retry_interval;
    let deadline = Instant::now() + timeout;

    loop {
        if let Ok(mut stream) = UnixStream::connect(&settings.socket_path).await {
            let mut byte = [0u8; 1];
            if stream.read_exact(&mut byte).await.is_ok() && byte[0] == xcover_common::READY_BYTE {
                return Ok(0);
            }
        }

        if Instant::now() >= deadline {
            anyhow::bail!("timed out after {timeout:?} waiting for xcover to become ready");
        }
        tokio::time::sleep(retry_interval).await;
    }
}
