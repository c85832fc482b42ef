//! Asset resolution over BLE
//!
//! The watch notifies the id it wants on `asset_request`; the companion
//! answers with chunks on `asset_data`. Both the link and the transfer are
//! bounded by timeouts so a missing phone never stalls the queue.

use embassy_time::{with_timeout, Duration};
use weatherface_core::{AssetAssembler, AssetError, AssetRef, Config, Icon};

use crate::channels::ASSET_CHUNKS;
use crate::system::bluetooth::{self, Server};

/// Fetch and decode one icon
pub async fn resolve(
    server: &Server,
    assembler: &mut AssetAssembler,
    asset: AssetRef,
    config: &Config,
) -> Result<Icon, AssetError> {
    // Leftovers from an abandoned transfer
    while ASSET_CHUNKS.try_receive().is_ok() {}

    let conn = bluetooth::wait_for_link(Duration::from_millis(config.asset_connect_timeout_ms))
        .await
        .ok_or(AssetError::ConnectionFailed)?;

    assembler.begin(asset);
    if server.weather.asset_request_notify(&conn, &asset.0).is_err() {
        assembler.reset();
        return Err(AssetError::ConnectionFailed);
    }

    let transfer = async {
        loop {
            let chunk = ASSET_CHUNKS.receive().await;
            match assembler.push(&chunk) {
                Ok(Some(blob)) => return Icon::decode(blob),
                Ok(None) => {}
                Err(e) => return Err(e),
            }
        }
    };
    let timeout = Duration::from_millis(config.asset_transfer_timeout_ms);
    let result = with_timeout(timeout, transfer)
        .await
        .unwrap_or(Err(AssetError::Timeout));

    assembler.reset();
    result
}
