use faceauth_core::api::{LoginRequest, RegisterRequest};
use faceauth_core::{DescriptorStore, FaceAuthService, ServiceError};
use serde::Serialize;
use std::sync::Arc;
use tokio::runtime::Handle;
use zbus::interface;

pub const BUS_NAME: &str = "io.faceauth.FaceAuth1";
pub const OBJECT_PATH: &str = "/io/faceauth/FaceAuth1";

pub type SharedService = Arc<FaceAuthService<Box<dyn DescriptorStore>>>;

/// D-Bus interface for the FaceAuth daemon.
///
/// Bus name: io.faceauth.FaceAuth1
/// Object path: /io/faceauth/FaceAuth1
///
/// Every method returns a JSON document. Store I/O runs on the tokio
/// blocking pool so a slow disk never stalls the bus connection.
pub struct FaceAuthInterface {
    service: SharedService,
    runtime: Handle,
}

impl FaceAuthInterface {
    pub fn new(service: SharedService, runtime: Handle) -> Self {
        Self { service, runtime }
    }

    /// Run `op` against the service on the blocking pool.
    async fn call<T, F>(&self, op: F) -> zbus::fdo::Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&FaceAuthService<Box<dyn DescriptorStore>>) -> Result<T, ServiceError>
            + Send
            + 'static,
    {
        let service = self.service.clone();
        self.runtime
            .spawn_blocking(move || op(&service))
            .await
            .map_err(|e| zbus::fdo::Error::Failed(format!("worker task failed: {e}")))?
            .map_err(to_fdo_error)
    }
}

#[interface(name = "io.faceauth.FaceAuth1")]
impl FaceAuthInterface {
    /// Enroll `descriptor` under `display_name`, replacing any existing identity.
    async fn register(
        &self,
        display_name: String,
        descriptor: Vec<f64>,
    ) -> zbus::fdo::Result<String> {
        tracing::info!(display_name = %display_name, len = descriptor.len(), "register requested");
        let request = RegisterRequest {
            display_name,
            descriptor: Some(to_f32(descriptor)),
        };
        let response = self.call(move |svc| svc.register(&request)).await?;
        to_json(&response)
    }

    /// Compare `descriptor` against the enrolled identity.
    async fn login(&self, descriptor: Vec<f64>) -> zbus::fdo::Result<String> {
        tracing::info!(len = descriptor.len(), "login requested");
        let request = LoginRequest {
            descriptor: Some(to_f32(descriptor)),
        };
        let response = self.call(move |svc| svc.login(&request)).await?;
        to_json(&response)
    }

    /// Report whether an identity is enrolled.
    async fn status(&self) -> zbus::fdo::Result<String> {
        let response = self.call(|svc| Ok(svc.status())).await?;
        to_json(&response)
    }
}

/// D-Bus has no single-precision float; descriptors travel as doubles.
fn to_f32(values: Vec<f64>) -> Vec<f32> {
    values.into_iter().map(|v| v as f32).collect()
}

fn to_json<T: Serialize>(value: &T) -> zbus::fdo::Result<String> {
    serde_json::to_string(value)
        .map_err(|e| zbus::fdo::Error::Failed(format!("response encoding failed: {e}")))
}

fn to_fdo_error(err: ServiceError) -> zbus::fdo::Error {
    if err.is_client_error() {
        tracing::info!(error = %err, "request rejected");
        zbus::fdo::Error::InvalidArgs(err.to_string())
    } else {
        tracing::error!(error = %err, "request failed");
        zbus::fdo::Error::Failed(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use faceauth_core::store::MemoryStore;
    use faceauth_core::DESCRIPTOR_LEN;

    fn interface() -> FaceAuthInterface {
        let store: Box<dyn DescriptorStore> = Box::new(MemoryStore::new());
        FaceAuthInterface::new(Arc::new(FaceAuthService::new(store)), Handle::current())
    }

    #[tokio::test]
    async fn test_call_runs_service_operation() {
        let iface = interface();
        let status = iface.call(|svc| Ok(svc.status())).await.unwrap();
        assert!(!status.enrolled);

        let request = RegisterRequest {
            display_name: "Alice".into(),
            descriptor: Some(vec![0.0; DESCRIPTOR_LEN]),
        };
        iface.call(move |svc| svc.register(&request)).await.unwrap();

        let status = iface.call(|svc| Ok(svc.status())).await.unwrap();
        assert_eq!(status.display_name.as_deref(), Some("Alice"));
    }

    #[tokio::test]
    async fn test_invalid_descriptor_maps_to_invalid_args() {
        let iface = interface();
        let request = RegisterRequest {
            display_name: "Alice".into(),
            descriptor: Some(vec![0.0; 3]),
        };
        let err = iface
            .call(move |svc| svc.register(&request))
            .await
            .unwrap_err();
        assert!(matches!(err, zbus::fdo::Error::InvalidArgs(_)));
    }

    #[tokio::test]
    async fn test_out_of_range_descriptor_maps_to_invalid_args() {
        let iface = interface();
        let mut values = vec![0.0f64; DESCRIPTOR_LEN];
        values[5] = 1e300;
        let request = RegisterRequest {
            display_name: "Alice".into(),
            descriptor: Some(to_f32(values)),
        };
        let err = iface
            .call(move |svc| svc.register(&request))
            .await
            .unwrap_err();
        assert!(matches!(err, zbus::fdo::Error::InvalidArgs(_)));

        let status = iface.call(|svc| Ok(svc.status())).await.unwrap();
        assert!(!status.enrolled);
    }

    #[test]
    fn test_internal_errors_map_to_failed() {
        let err = to_fdo_error(ServiceError::Persistence(
            faceauth_core::StoreError::Poisoned,
        ));
        assert!(matches!(err, zbus::fdo::Error::Failed(_)));
    }

    #[test]
    fn test_to_f32_preserves_order() {
        assert_eq!(to_f32(vec![0.25, -1.5, 3.0]), vec![0.25f32, -1.5, 3.0]);
    }

    #[test]
    fn test_login_json_shape() {
        let json = to_json(&faceauth_core::api::LoginResponse {
            success: false,
            message: "No registered users. Please register first.".into(),
            confidence_percent: None,
            display_name: None,
        })
        .unwrap();
        assert_eq!(
            json,
            r#"{"success":false,"message":"No registered users. Please register first."}"#
        );
    }
}
