//! Client device details captured at login.

use std::net::{IpAddr, SocketAddr};

use axum::extract::{ConnectInfo, FromRequestParts};
use axum::http::header::USER_AGENT;
use axum::http::request::Parts;
use axum::http::HeaderMap;
use centralauth_core::device::device_name;
use centralauth_db::models::session::DeviceInfo;

/// User agent, client IP and derived device name of the caller.
///
/// Never rejects: every field is optional diagnostic data.
#[derive(Debug, Clone, Default)]
pub struct ClientDevice(pub DeviceInfo);

impl<S: Send + Sync> FromRequestParts<S> for ClientDevice {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let peer = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip());
        Ok(Self(device_info(&parts.headers, peer)))
    }
}

/// `peer` is the TCP peer address, present when the server is started with
/// connect info.
pub fn device_info(headers: &HeaderMap, peer: Option<IpAddr>) -> DeviceInfo {
    let user_agent = headers
        .get(USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    DeviceInfo {
        device_name: device_name(user_agent.as_deref()),
        ip_address: client_ip(headers, peer),
        user_agent,
    }
}

/// First `X-Forwarded-For` hop, else `X-Real-IP`, else the peer address.
pub fn client_ip(headers: &HeaderMap, peer: Option<IpAddr>) -> Option<String> {
    let forwarded = headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|ip| !ip.is_empty());
    let real_ip = || {
        headers
            .get("x-real-ip")
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|ip| !ip.is_empty())
    };
    forwarded
        .or_else(real_ip)
        .map(str::to_string)
        .or_else(|| peer.map(|ip| ip.to_string()))
}
