//! HTTP client for the manager catalog service
//!
//! Each read-only endpoint is wrapped in its own [`RequestCache`] keyed by
//! the logical request parameters, so repeated and concurrent lookups hit
//! the service once. Network failures propagate unmodified; retry policy
//! belongs to the embedding application.

use crate::cache::RequestCache;
use crate::config::CatalogConfig;
use keywarden_core::types::{
    Application, ApplicationVersion, Category, DeviceVersion, FinalFirmware, Id, McuVersion,
    OsuFirmware,
};
use keywarden_core::ManagerError;
use reqwest::Url;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;
use sha2::{Digest, Sha256};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};

const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Error, Debug, Clone)]
pub enum CatalogError {
    #[error("catalog request failed: {0}")]
    Http(Arc<reqwest::Error>),
    #[error("invalid catalog url: {0}")]
    InvalidUrl(String),
    #[error("unexpected catalog payload: {0}")]
    Payload(String),
    #[error(transparent)]
    Manager(#[from] ManagerError),
}

impl From<reqwest::Error> for CatalogError {
    fn from(e: reqwest::Error) -> Self {
        CatalogError::Http(Arc::new(e))
    }
}

/// Typed client for the remote catalog service.
pub struct CatalogClient {
    http: reqwest::Client,
    config: CatalogConfig,
    apps_by_device: RequestCache<String, Vec<ApplicationVersion>, CatalogError>,
    apps: RequestCache<String, Vec<Application>, CatalogError>,
    mcus: RequestCache<String, Vec<McuVersion>, CatalogError>,
    latest_firmware: RequestCache<String, Option<OsuFirmware>, CatalogError>,
    current_osu: RequestCache<String, OsuFirmware, CatalogError>,
    current_firmware: RequestCache<String, FinalFirmware, CatalogError>,
    final_firmware: RequestCache<String, FinalFirmware, CatalogError>,
    device_version: RequestCache<String, DeviceVersion, CatalogError>,
}

impl CatalogClient {
    pub fn new(config: CatalogConfig) -> Result<Self, CatalogError> {
        let http = reqwest::Client::builder().timeout(HTTP_TIMEOUT).build()?;
        Ok(Self {
            http,
            config,
            apps_by_device: RequestCache::new(),
            apps: RequestCache::new(),
            mcus: RequestCache::new(),
            latest_firmware: RequestCache::new(),
            current_osu: RequestCache::new(),
            current_firmware: RequestCache::new(),
            final_firmware: RequestCache::new(),
            device_version: RequestCache::new(),
        })
    }

    /// Applications compatible with a device/firmware pair.
    pub async fn applications_by_device(
        &self,
        provider: Id,
        current_se_firmware_final_version: Id,
        device_version: Id,
    ) -> Result<Vec<ApplicationVersion>, CatalogError> {
        #[derive(Deserialize)]
        struct Response {
            application_versions: Vec<ApplicationVersion>,
        }

        let key = format!("{provider}_{current_se_firmware_final_version}_{device_version}");
        let url = self.url("/get_apps", &[])?;
        let http = self.http.clone();
        let body = json!({
            "provider": provider,
            "current_se_firmware_final_version": current_se_firmware_final_version,
            "device_version": device_version,
        });
        self.apps_by_device
            .get(key, move || async move {
                let r: Response = post_json(&http, url, body).await?;
                Ok(r.application_versions)
            })
            .await
    }

    /// Every application known to the catalog.
    pub async fn list_apps(&self) -> Result<Vec<Application>, CatalogError> {
        let url = self.url("/applications", &[])?;
        let http = self.http.clone();
        self.apps
            .get(String::new(), move || async move { get_json(&http, url).await })
            .await
    }

    /// Application categories. Always re-fetched, never cached.
    pub async fn list_categories(&self) -> Result<Vec<Category>, CatalogError> {
        let url = self.url("/categories", &[])?;
        get_json(&self.http, url).await
    }

    /// Every known MCU version.
    pub async fn list_mcu_versions(&self) -> Result<Vec<McuVersion>, CatalogError> {
        let url = self.url("/mcu_versions", &[])?;
        let http = self.http.clone();
        self.mcus
            .get(String::new(), move || async move { get_json(&http, url).await })
            .await
    }

    /// Latest OSU image available for the given current firmware, or `None`
    /// when the device is already up to date.
    ///
    /// The current firmware may be referenced by catalog id or by version
    /// name; the service accepts both.
    pub async fn latest_firmware(
        &self,
        current_se_firmware_final_version: impl serde::Serialize + std::fmt::Display,
        device_version: Id,
        provider: Id,
    ) -> Result<Option<OsuFirmware>, CatalogError> {
        #[derive(Deserialize)]
        struct Response {
            #[serde(default)]
            result: Option<String>,
            #[serde(default)]
            se_firmware_osu_version: Option<OsuFirmware>,
        }

        let key = format!("{current_se_firmware_final_version}_{device_version}_{provider}");
        let nonce = user_nonce(&self.config.user_id);
        let url = self.url("/get_latest_firmware", &[("nonce", nonce.as_str())])?;
        let http = self.http.clone();
        let body = json!({
            "current_se_firmware_final_version": current_se_firmware_final_version,
            "device_version": device_version,
            "provider": provider,
        });
        self.latest_firmware
            .get(key, move || async move {
                let r: Response = post_json(&http, url, body).await?;
                if r.result.as_deref() == Some("null") {
                    return Ok(None);
                }
                Ok(r.se_firmware_osu_version)
            })
            .await
    }

    /// OSU counterpart of an arbitrary firmware version.
    pub async fn current_osu(
        &self,
        version: &str,
        device_version: Id,
        provider: Id,
    ) -> Result<OsuFirmware, CatalogError> {
        let key = format!("{version}_{device_version}_{provider}");
        let url = self.url("/get_osu_version", &[])?;
        let http = self.http.clone();
        let body = json!({
            "device_version": device_version,
            "version_name": format!("{version}-osu"),
            "provider": provider,
        });
        self.current_osu
            .get(key, move || async move { post_json(&http, url, body).await })
            .await
    }

    /// Next bootloader/MCU version to install after `current`.
    ///
    /// The service answers with the literal sentinel `"default"` (or a
    /// payload without a name) when the installed version is already the
    /// latest; that is an error here, never a value.
    pub async fn next_mcu_version(&self, current: &str) -> Result<McuVersion, CatalogError> {
        let url = self.url(&format!("/mcu_versions/{current}"), &[])?;
        let data: serde_json::Value = get_json(&self.http, url).await?;
        let has_name = data.get("name").map(|n| !n.is_null()).unwrap_or(false);
        if data == json!("default") || !has_name {
            return Err(ManagerError::LatestMcuInstalled.into());
        }
        serde_json::from_value(data).map_err(|e| CatalogError::Payload(e.to_string()))
    }

    /// Firmware metadata for an exact version name.
    pub async fn current_firmware(
        &self,
        version: &str,
        device_version: Id,
        provider: Id,
    ) -> Result<FinalFirmware, CatalogError> {
        let key = format!("{version}_{device_version}_{provider}");
        let url = self.url("/get_firmware_version", &[])?;
        let http = self.http.clone();
        let body = json!({
            "device_version": device_version,
            "version_name": version,
            "provider": provider,
        });
        self.current_firmware
            .get(key, move || async move { post_json(&http, url, body).await })
            .await
    }

    /// Firmware metadata by catalog id.
    pub async fn final_firmware_by_id(&self, id: Id) -> Result<FinalFirmware, CatalogError> {
        let url = self.url(&format!("/firmware_final_versions/{id}"), &[])?;
        let http = self.http.clone();
        self.final_firmware
            .get(id.to_string(), move || async move { get_json(&http, url).await })
            .await
    }

    /// Device-version metadata from a hardware target identifier.
    pub async fn device_version(
        &self,
        target_id: &str,
        provider: Id,
    ) -> Result<DeviceVersion, CatalogError> {
        let key = format!("{target_id}_{provider}");
        let url = self.url("/get_device_version", &[])?;
        let http = self.http.clone();
        let body = json!({
            "provider": provider,
            "target_id": target_id,
        });
        self.device_version
            .get(key, move || async move { post_json(&http, url, body).await })
            .await
    }

    /// Drop every cached catalog response.
    pub async fn clear_caches(&self) {
        self.apps_by_device.clear().await;
        self.apps.clear().await;
        self.mcus.clear().await;
        self.latest_firmware.clear().await;
        self.current_osu.clear().await;
        self.current_firmware.clear().await;
        self.final_firmware.clear().await;
        self.device_version.clear().await;
        info!("Cleared catalog caches");
    }

    fn url(&self, path: &str, extra: &[(&str, &str)]) -> Result<Url, CatalogError> {
        let base = self.config.base_url.trim_end_matches('/');
        let mut url = Url::parse(&format!("{base}{path}"))
            .map_err(|e| CatalogError::InvalidUrl(e.to_string()))?;
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("livecommonversion", &self.config.client_version);
            for (k, v) in extra {
                query.append_pair(k, v);
            }
        }
        Ok(url)
    }
}

/// One-way nonce derived from the stable user identifier. Reproducible for
/// the same user, but does not leak the identifier itself.
fn user_nonce(user_id: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(user_id.as_bytes());
    hex::encode(hasher.finalize())
}

async fn get_json<T: DeserializeOwned>(http: &reqwest::Client, url: Url) -> Result<T, CatalogError> {
    debug!(url = %url, "catalog GET");
    let response = http.get(url).send().await?.error_for_status()?;
    Ok(response.json().await?)
}

async fn post_json<T: DeserializeOwned>(
    http: &reqwest::Client,
    url: Url,
    body: serde_json::Value,
) -> Result<T, CatalogError> {
    debug!(url = %url, "catalog POST");
    let response = http.post(url).json(&body).send().await?.error_for_status()?;
    Ok(response.json().await?)
}
