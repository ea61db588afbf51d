//! Device manager flows
//!
//! Entry points for the three command-exchange flows: application install
//! (and uninstall), MCU firmware flash, and genuineness verification.
//! Every session carries the client version tag for service-side
//! compatibility negotiation.

use crate::exchange::{ExchangeOptions, ManagedExchange};
use crate::genuine::GenuineCheck;
use crate::transport::{ExchangeTransport, SessionRequest};
use keywarden_core::types::ApplicationVersion;
use keywarden_core::{remap, FlowContext, ManagerError};
use tracing::info;

/// Query parameters of an install or uninstall session.
///
/// `firmware`/`firmware_key` reference the payload the secure channel
/// server streams to the device; for an uninstall they are the
/// application's delete references instead.
#[derive(Debug, Clone, PartialEq)]
pub struct InstallParams {
    pub target_id: String,
    pub perso: String,
    pub firmware: String,
    pub firmware_key: String,
    pub hash: String,
}

impl InstallParams {
    /// Install payload references of an application version.
    pub fn install(target_id: impl Into<String>, app: &ApplicationVersion) -> Self {
        Self {
            target_id: target_id.into(),
            perso: app.perso.clone(),
            firmware: app.firmware.clone(),
            firmware_key: app.firmware_key.clone(),
            hash: app.hash.clone(),
        }
    }

    /// Uninstall payload references of an application version.
    pub fn uninstall(target_id: impl Into<String>, app: &ApplicationVersion) -> Self {
        Self {
            target_id: target_id.into(),
            perso: app.perso.clone(),
            firmware: app.delete.clone(),
            firmware_key: app.delete_key.clone(),
            hash: app.hash.clone(),
        }
    }

    fn apply(&self, request: SessionRequest) -> SessionRequest {
        request
            .param("targetId", &self.target_id)
            .param("perso", &self.perso)
            .param("firmware", &self.firmware)
            .param("firmwareKey", &self.firmware_key)
            .param("hash", &self.hash)
    }
}

/// Opens exchange sessions for manager operations over a transport.
pub struct DeviceManager<T> {
    transport: T,
    client_version: String,
}

impl<T: ExchangeTransport> DeviceManager<T> {
    pub fn new(transport: T, client_version: impl Into<String>) -> Self {
        Self {
            transport,
            client_version: client_version.into(),
        }
    }

    /// Open an install/uninstall session with an explicit context tag.
    ///
    /// Benign disconnects during the bulk payload transfer do not fail
    /// the flow; the device finishes on its own once the payload landed.
    pub async fn install(
        &self,
        context: Option<FlowContext>,
        params: &InstallParams,
    ) -> Result<ManagedExchange, ManagerError> {
        info!(firmware = %params.firmware, context = ?context, "opening install session");
        let request = params.apply(self.request("/install"));
        self.open(request, context, ExchangeOptions {
            ignore_disconnect_during_bulk: true,
        })
        .await
    }

    pub async fn install_app(&self, params: &InstallParams) -> Result<ManagedExchange, ManagerError> {
        self.install(None, params).await
    }

    /// Uninstall context drives the dependency-error override.
    pub async fn uninstall_app(
        &self,
        params: &InstallParams,
    ) -> Result<ManagedExchange, ManagerError> {
        self.install(Some(FlowContext::UninstallApp), params).await
    }

    /// Flash an MCU firmware version.
    pub async fn install_mcu(
        &self,
        context: Option<FlowContext>,
        target_id: &str,
        version: &str,
    ) -> Result<ManagedExchange, ManagerError> {
        info!(target_id = %target_id, version = %version, "opening mcu session");
        let request = self
            .request("/mcu")
            .param("targetId", target_id)
            .param("version", version);
        self.open(request, context, ExchangeOptions {
            ignore_disconnect_during_bulk: true,
        })
        .await
    }

    /// Verify device genuineness, detecting an on-device confirmation.
    pub async fn genuine_check(
        &self,
        target_id: &str,
        perso: &str,
    ) -> Result<GenuineCheck, ManagerError> {
        info!(target_id = %target_id, perso = %perso, "opening genuine check session");
        let request = self
            .request("/genuine")
            .param("targetId", target_id)
            .param("perso", perso);
        let exchange = self.open(request, None, ExchangeOptions::default()).await?;
        Ok(GenuineCheck::new(exchange))
    }

    fn request(&self, path: &str) -> SessionRequest {
        SessionRequest::new(path).param("livecommonversion", &self.client_version)
    }

    async fn open(
        &self,
        request: SessionRequest,
        context: Option<FlowContext>,
        options: ExchangeOptions,
    ) -> Result<ManagedExchange, ManagerError> {
        let session = self
            .transport
            .open(request)
            .await
            .map_err(|e| remap(context, e))?;
        Ok(ManagedExchange::new(session, context, options))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::ExchangeEvent;
    use crate::transport::ExchangeSession;
    use keywarden_core::{StatusWord, TransportError};
    use std::future::Future;
    use std::sync::{Arc, Mutex};

    /// Replays a fixed script of events for every opened session and
    /// records the requests it saw.
    #[derive(Clone, Default)]
    struct ScriptedTransport {
        script: Vec<Result<ExchangeEvent, TransportError>>,
        seen: Arc<Mutex<Vec<SessionRequest>>>,
    }

    impl ExchangeTransport for ScriptedTransport {
        fn open(
            &self,
            request: SessionRequest,
        ) -> impl Future<Output = Result<ExchangeSession, TransportError>> + Send {
            self.seen.lock().unwrap().push(request);
            let script = self.script.clone();
            async move {
                let (tx, session) = ExchangeSession::channel(16);
                tokio::spawn(async move {
                    for event in script {
                        if tx.send(event).await.is_err() {
                            break;
                        }
                    }
                });
                Ok(session)
            }
        }
    }

    fn sample_app() -> ApplicationVersion {
        serde_json::from_value(serde_json::json!({
            "id": 42,
            "name": "Bitcoin",
            "perso": "perso_11",
            "firmware": "blue/2.1.1/bitcoin/app",
            "firmware_key": "blue/2.1.1/bitcoin/app_key",
            "delete": "blue/2.1.1/bitcoin/app_del",
            "delete_key": "blue/2.1.1/bitcoin/app_del_key",
            "hash": "abcdef"
        }))
        .unwrap()
    }

    #[tokio::test]
    async fn test_install_session_query() {
        let transport = ScriptedTransport::default();
        let seen = transport.seen.clone();
        let manager = DeviceManager::new(transport, "0.1.0");

        let params = InstallParams::install("0x31010004", &sample_app());
        let mut exchange = manager.install_app(&params).await.unwrap();
        assert!(exchange.next_event().await.is_none());

        let requests = seen.lock().unwrap();
        assert_eq!(requests[0].path, "/install");
        assert_eq!(requests[0].get("livecommonversion"), Some("0.1.0"));
        assert_eq!(requests[0].get("targetId"), Some("0x31010004"));
        assert_eq!(requests[0].get("firmware"), Some("blue/2.1.1/bitcoin/app"));
        assert_eq!(requests[0].get("firmwareKey"), Some("blue/2.1.1/bitcoin/app_key"));
    }

    #[tokio::test]
    async fn test_uninstall_uses_delete_references_and_context() {
        let transport = ScriptedTransport {
            script: vec![Err(TransportError::from_message("Invalid status 6a83"))],
            ..Default::default()
        };
        let seen = transport.seen.clone();
        let manager = DeviceManager::new(transport, "0.1.0");

        let params = InstallParams::uninstall("0x31010004", &sample_app());
        let mut exchange = manager.uninstall_app(&params).await.unwrap();
        assert_eq!(
            exchange.next_event().await,
            Some(Err(ManagerError::UninstallBtcDep))
        );

        let requests = seen.lock().unwrap();
        assert_eq!(requests[0].get("firmware"), Some("blue/2.1.1/bitcoin/app_del"));
        assert_eq!(
            requests[0].get("firmwareKey"),
            Some("blue/2.1.1/bitcoin/app_del_key")
        );
    }

    #[tokio::test]
    async fn test_mcu_session_remaps_refusal() {
        let transport = ScriptedTransport {
            script: vec![Err(TransportError::from_message("Invalid status 6985"))],
            ..Default::default()
        };
        let seen = transport.seen.clone();
        let manager = DeviceManager::new(transport, "0.1.0");

        let mut exchange = manager
            .install_mcu(Some(FlowContext::Mcu), "0x01000001", "1.7")
            .await
            .unwrap();
        assert_eq!(
            exchange.next_event().await,
            Some(Err(ManagerError::UserRefusedFirmwareUpdate))
        );

        let requests = seen.lock().unwrap();
        assert_eq!(requests[0].path, "/mcu");
        assert_eq!(requests[0].get("version"), Some("1.7"));
    }

    #[tokio::test]
    async fn test_genuine_check_session() {
        let transport = ScriptedTransport {
            script: vec![
                Ok(ExchangeEvent::ExchangeBefore {
                    nonce: 3,
                    apdu: vec![0xe0, 0x04],
                }),
                Ok(ExchangeEvent::Exchange {
                    nonce: 3,
                    status: StatusWord::OK,
                    data: Vec::new(),
                }),
                Ok(ExchangeEvent::Result {
                    payload: serde_json::json!("0000"),
                }),
            ],
            ..Default::default()
        };
        let seen = transport.seen.clone();
        let manager = DeviceManager::new(transport, "0.1.0");

        let mut check = manager.genuine_check("0x31010004", "perso_11").await.unwrap();
        assert_eq!(
            check.next_event().await,
            Some(Ok(crate::genuine::GenuineCheckEvent::Result {
                payload: serde_json::json!("0000")
            }))
        );

        let requests = seen.lock().unwrap();
        assert_eq!(requests[0].path, "/genuine");
        assert_eq!(requests[0].get("perso"), Some("perso_11"));
    }
}
