//! Wire types for the remote platform's REST API.
//!
//! Field names follow the platform's camelCase JSON; unknown response fields
//! are ignored.

use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize)]
pub struct LoginRequest<'a> {
    pub username: &'a str,
    pub password: &'a str,
}

#[derive(Debug, Deserialize)]
pub struct LoginResponse {
    pub token: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityRef {
    pub id: String,
    pub entity_type: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewDevice<'a> {
    pub name: &'a str,
    pub label: &'a str,
    pub device_profile_id: EntityRef,
}

/// The MQTT_BASIC credentialsValue is itself a JSON document, serialized to a
/// string inside the request body.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MqttBasicValue<'a> {
    pub client_id: &'a str,
    pub user_name: &'a str,
    pub password: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CredentialsPayload {
    pub credentials_type: String,
    pub credentials_value: String,
}

#[derive(Debug, Serialize)]
pub struct DeviceWithCredentialsRequest<'a> {
    pub device: NewDevice<'a>,
    pub credentials: CredentialsPayload,
}

#[derive(Debug, Deserialize)]
pub struct CreatedDeviceResponse {
    pub id: EntityRef,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceInfo {
    pub id: EntityRef,
    pub name: String,
    #[serde(default)]
    pub customer_id: Option<EntityRef>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageData<T> {
    pub data: Vec<T>,
    #[serde(default)]
    pub has_next: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CredentialsResponse {
    pub credentials_type: String,
    pub credentials_value: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCredentialsRequest {
    pub device_id: EntityRef,
    pub credentials_type: String,
    pub credentials_value: String,
}

#[derive(Debug, Deserialize)]
pub struct CustomerResponse {
    #[serde(default)]
    pub title: Option<String>,
}
