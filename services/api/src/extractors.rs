use std::convert::Infallible;
use std::net::{IpAddr, SocketAddr};

use axum::extract::{ConnectInfo, FromRequestParts};
use axum::http::request::Parts;
use expertline_common::error::{ExpertError, ForbiddenReason};
use expertline_db::users::models::User;

use crate::error::ApiError;
use crate::AppState;

pub const USER_EMAIL_HEADER: &str = "X-User-Email";
pub const FORWARDED_FOR_HEADER: &str = "X-Forwarded-For";

/// Client address used for address bans. `None` only when the connection
/// carries no peer address.
pub struct ClientAddr(pub Option<String>);

impl ClientAddr {
    pub fn as_deref(&self) -> Option<&str> {
        self.0.as_deref()
    }
}

/// The socket peer, unless it is a trusted proxy. Behind trusted proxies the
/// `X-Forwarded-For` chain is walked right to left and the first hop that is
/// not itself a trusted proxy is the client. An unparsable hop stops the walk.
pub(crate) fn resolve_client(peer: IpAddr, forwarded: Option<&str>, trusted: &[IpAddr]) -> IpAddr {
    if !trusted.contains(&peer) {
        return peer;
    }
    let Some(chain) = forwarded else {
        return peer;
    };

    let mut client = peer;
    for hop in chain.rsplit(',') {
        match hop.trim().parse::<IpAddr>() {
            Ok(ip) => {
                client = ip;
                if !trusted.contains(&ip) {
                    break;
                }
            }
            Err(_) => break,
        }
    }
    client
}

impl FromRequestParts<AppState> for ClientAddr {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let Some(ConnectInfo(peer)) = parts.extensions.get::<ConnectInfo<SocketAddr>>() else {
            return Ok(ClientAddr(None));
        };

        let forwarded = parts
            .headers
            .get(FORWARDED_FOR_HEADER)
            .and_then(|v| v.to_str().ok());
        if forwarded.is_some() && !state.trusted_proxies.contains(&peer.ip()) {
            tracing::debug!(%peer, "ignoring X-Forwarded-For from untrusted peer");
        }
        let client = resolve_client(peer.ip(), forwarded, &state.trusted_proxies);
        Ok(ClientAddr(Some(client.to_string())))
    }
}

/// A caller whose `X-User-Email` names a registered admin.
pub struct AdminCaller(pub User);

impl FromRequestParts<AppState> for AdminCaller {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let denied = || ApiError(ExpertError::Forbidden(ForbiddenReason::AdminRequired));

        let email = parts
            .headers
            .get(USER_EMAIL_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .ok_or_else(denied)?;

        match state.users.get_by_email(email).await? {
            Some(user) if user.is_admin => Ok(AdminCaller(user)),
            _ => {
                tracing::warn!(%email, "admin access refused");
                Err(denied())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ip(raw: &str) -> IpAddr {
        raw.parse().unwrap()
    }

    #[test]
    fn untrusted_peer_header_is_ignored() {
        let client = resolve_client(ip("203.0.113.9"), Some("1.2.3.4"), &[ip("10.0.0.1")]);
        assert_eq!(client, ip("203.0.113.9"));
    }

    #[test]
    fn no_trusted_proxies_means_peer_only() {
        assert_eq!(resolve_client(ip("10.0.0.1"), Some("1.2.3.4"), &[]), ip("10.0.0.1"));
    }

    #[test]
    fn trusted_proxy_yields_rightmost_untrusted_hop() {
        let trusted = [ip("10.0.0.1"), ip("10.0.0.2")];
        let client = resolve_client(
            ip("10.0.0.1"),
            Some("1.2.3.4, 203.0.113.9, 10.0.0.2"),
            &trusted,
        );
        assert_eq!(client, ip("203.0.113.9"));
    }

    #[test]
    fn trusted_proxy_without_header_is_the_client() {
        assert_eq!(resolve_client(ip("10.0.0.1"), None, &[ip("10.0.0.1")]), ip("10.0.0.1"));
    }

    #[test]
    fn garbage_hop_stops_the_walk() {
        let client = resolve_client(ip("10.0.0.1"), Some("203.0.113.9, junk"), &[ip("10.0.0.1")]);
        assert_eq!(client, ip("10.0.0.1"));
    }
}
