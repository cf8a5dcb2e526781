//! Client address resolution.
//!
//! Rate limiting is keyed by the client IP, so a forwarded header is only
//! believed when the direct peer is a trusted proxy. The resolved address is
//! stored as a [`ClientIp`] request extension.

use crate::domain::config::SecurityConfig;
use axum::{body::Body, extract::ConnectInfo, http::Request, response::Response};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;
use tower::{Layer, Service};
use tracing::{debug, warn};

const FORWARDED_FOR: &str = "x-forwarded-for";

/// Real client address of a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClientIp(pub IpAddr);

/// Trusted proxy configuration
#[derive(Clone, Debug)]
pub struct TrustedProxyConfig {
    /// Explicitly trusted proxy IPs
    pub trusted_proxies: Vec<IpAddr>,
    /// Trust local IPs (127.0.0.1, ::1)
    pub trust_localhost: bool,
    /// Trust private IPs (10.x.x.x, 192.168.x.x, 172.16-31.x.x)
    pub trust_private: bool,
    /// Number of trusted proxies in the `X-Forwarded-For` chain
    pub proxy_count: usize,
}

impl Default for TrustedProxyConfig {
    fn default() -> Self {
        Self {
            trusted_proxies: Vec::new(),
            trust_localhost: true,
            trust_private: false,
            proxy_count: 1,
        }
    }
}

impl From<&SecurityConfig> for TrustedProxyConfig {
    fn from(config: &SecurityConfig) -> Self {
        Self {
            trusted_proxies: config.trusted_proxies.clone(),
            trust_localhost: config.trust_localhost,
            trust_private: config.trust_private_ips,
            proxy_count: config.proxy_count,
        }
    }
}

/// IP protection layer
#[derive(Clone)]
pub struct IpProtectionLayer {
    config: Arc<TrustedProxyConfig>,
}

impl IpProtectionLayer {
    pub fn new(config: TrustedProxyConfig) -> Self {
        Self {
            config: Arc::new(config),
        }
    }
}

impl<S> Layer<S> for IpProtectionLayer {
    type Service = IpProtectionService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        IpProtectionService {
            inner,
            config: Arc::clone(&self.config),
        }
    }
}

/// IP protection service
#[derive(Clone)]
pub struct IpProtectionService<S> {
    inner: S,
    config: Arc<TrustedProxyConfig>,
}

impl<S> Service<Request<Body>> for IpProtectionService<S>
where
    S: Service<Request<Body>, Response = Response> + Clone + Send + 'static,
    S::Future: Send,
{
    type Response = Response;
    type Error = S::Error;
    type Future = std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<Self::Response, Self::Error>> + Send>,
    >;

    fn poll_ready(
        &mut self,
        cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: Request<Body>) -> Self::Future {
        let config = Arc::clone(&self.config);
        let mut inner = self.inner.clone();

        Box::pin(async move {
            // Without connection info (in-process calls) the peer is local
            let direct_ip = req
                .extensions()
                .get::<ConnectInfo<SocketAddr>>()
                .map(|ci| ci.0.ip())
                .unwrap_or(IpAddr::V4(Ipv4Addr::LOCALHOST));

            let real_ip = determine_real_ip(&req, direct_ip, &config);

            if !is_trusted_proxy(direct_ip, &config) {
                if let Some(forwarded) = req.headers().get(FORWARDED_FOR) {
                    warn!(
                        direct_ip = %direct_ip,
                        forwarded = ?forwarded,
                        "Ignoring X-Forwarded-For from untrusted source"
                    );
                }
            }

            req.extensions_mut().insert(ClientIp(real_ip));
            inner.call(req).await
        })
    }
}

/// Determine the real client IP based on trusted proxy configuration
fn determine_real_ip<B>(req: &Request<B>, direct_ip: IpAddr, config: &TrustedProxyConfig) -> IpAddr {
    if !is_trusted_proxy(direct_ip, config) {
        return direct_ip;
    }

    let Some(value) = req
        .headers()
        .get(FORWARDED_FOR)
        .and_then(|v| v.to_str().ok())
    else {
        return direct_ip;
    };

    // client, proxy1, proxy2: take the Nth from the right
    let ips: Vec<&str> = value.split(',').map(str::trim).collect();
    let index = ips.len().saturating_sub(config.proxy_count);
    let index = index.min(ips.len().saturating_sub(1));
    match ips.get(index).and_then(|ip| ip.parse::<IpAddr>().ok()) {
        Some(ip) => {
            debug!(value, extracted_ip = %ip, "Extracted client IP from X-Forwarded-For");
            ip
        }
        None => direct_ip,
    }
}

/// Check if an IP is a trusted proxy
fn is_trusted_proxy(ip: IpAddr, config: &TrustedProxyConfig) -> bool {
    if config.trusted_proxies.contains(&ip) {
        return true;
    }
    if config.trust_localhost && ip.is_loopback() {
        return true;
    }
    config.trust_private && is_private_ip(ip)
}

/// Check if IP is in private range
fn is_private_ip(ip: IpAddr) -> bool {
    match ip {
        IpAddr::V4(ipv4) => ipv4.is_private() || ipv4.is_link_local(),
        IpAddr::V6(ipv6) => {
            // IPv6 unique local addresses (fc00::/7)
            let octets = ipv6.octets();
            (octets[0] & 0xfe) == 0xfc
        }
    }
}
