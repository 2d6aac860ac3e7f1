//! Readiness shim for the service port.
//!
//! Container platforms start probing `GET /health` the moment the process
//! launches, long before the gateway has finished its warm-up. The shim binds
//! the service port first and answers probes until the supervisor signals
//! that the warm-up delay has elapsed, then vacates the port so the gateway's
//! own bind retry can succeed. Only one listener may own a TCP port, so bind
//! exclusivity is the sole synchronization between the shim and the gateway.
//!
//! The shim is strictly best-effort: a lost port race is a benign outcome and
//! nothing that happens here may abort the boot sequence.

use http_body_util::Full;
use hyper::body::{Bytes, Incoming};
use hyper::server::conn::http1;
use hyper::service::Service;
use hyper::{Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use std::future::Future;
use std::io;
use std::net::{Ipv4Addr, SocketAddr};
use std::pin::Pin;
use std::str::FromStr;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::watch;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Path the platform's health probe requests.
pub const HEALTH_PATH: &str = "/health";

/// How long the takeover confirmation loop keeps probing after the port is
/// released before giving up with a warning.
const TAKEOVER_DEADLINE: Duration = Duration::from_secs(60);

/// Interval between port-takeover probes.
///
/// Unitless numbers are interpreted as milliseconds.
#[derive(Debug, Clone, Copy)]
pub struct ProbeInterval(pub Duration);

impl FromStr for ProbeInterval {
    type Err = humantime::DurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Ok(ms) = s.parse::<u64>() {
            return Ok(ProbeInterval(Duration::from_millis(ms)));
        }
        let duration = humantime::parse_duration(s)?;
        Ok(ProbeInterval(duration))
    }
}

impl std::fmt::Display for ProbeInterval {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", humantime::format_duration(self.0))
    }
}

impl From<ProbeInterval> for Duration {
    fn from(val: ProbeInterval) -> Self {
        val.0
    }
}

impl Default for ProbeInterval {
    fn default() -> Self {
        ProbeInterval(Duration::from_millis(500))
    }
}

/// Temporary owner of the service port.
pub struct ReadinessShim {
    listener: TcpListener,
    probe_interval: Duration,
    warmup_max: Duration,
}

impl ReadinessShim {
    /// Bind the service port.
    ///
    /// Returns `Ok(None)` when the port is already in use: the target service
    /// claimed it before we could, which means there is no warm-up gap to
    /// mask and the shim has nothing to do.
    pub async fn bind(
        addr: SocketAddr,
        probe_interval: Duration,
        warmup_max: Duration,
    ) -> io::Result<Option<Self>> {
        match TcpListener::bind(addr).await {
            Ok(listener) => {
                info!(%addr, "readiness shim holding service port");
                Ok(Some(Self {
                    listener,
                    probe_interval,
                    warmup_max,
                }))
            }
            Err(e) if e.kind() == io::ErrorKind::AddrInUse => {
                info!(%addr, "service port already bound; target service won the race");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Serve health probes until released, then vacate the port and confirm
    /// the target service has taken it over.
    ///
    /// The release signal normally arrives from the supervisor once the
    /// warm-up delay has elapsed. If it never does, the warm-up bound expires
    /// and the shim vacates anyway, so the gateway's bind retry can still
    /// converge even when the supervisor side went wrong.
    pub async fn serve(self, mut release: watch::Receiver<bool>) {
        let ReadinessShim {
            listener,
            probe_interval,
            warmup_max,
        } = self;

        let port = match listener.local_addr() {
            Ok(addr) => addr.port(),
            Err(e) => {
                warn!(error = %e, "readiness shim lost its listener; exiting");
                return;
            }
        };

        let expiry = tokio::time::sleep(warmup_max);
        tokio::pin!(expiry);

        loop {
            tokio::select! {
                accepted = listener.accept() => {
                    match accepted {
                        Ok((stream, _peer)) => {
                            let io = TokioIo::new(stream);
                            tokio::task::spawn(async move {
                                if let Err(err) =
                                    http1::Builder::new().serve_connection(io, HealthService).await
                                {
                                    debug!("health connection error: {:?}", err);
                                }
                            });
                        }
                        Err(e) => warn!(error = %e, "health listener accept error"),
                    }
                }

                released = release.wait_for(|r| *r) => {
                    match released {
                        Ok(_) => info!("release signal received; vacating service port"),
                        // A dropped sender means the supervisor is gone; hold
                        // nothing hostage.
                        Err(_) => debug!("release channel closed; vacating service port"),
                    }
                    break;
                }

                _ = &mut expiry => {
                    warn!(
                        bound = %humantime::format_duration(warmup_max),
                        "warm-up bound expired without release; vacating service port"
                    );
                    break;
                }
            }
        }

        drop(listener);
        confirm_takeover(port, probe_interval).await;
    }
}

/// Poll loopback until the target service is accepting connections.
async fn confirm_takeover(port: u16, interval: Duration) {
    let addr = SocketAddr::from((Ipv4Addr::LOCALHOST, port));
    let deadline = Instant::now() + TAKEOVER_DEADLINE;

    loop {
        if TcpStream::connect(addr).await.is_ok() {
            info!(%addr, "target service is listening; handoff complete");
            return;
        }
        if Instant::now() >= deadline {
            warn!(
                %addr,
                deadline = %humantime::format_duration(TAKEOVER_DEADLINE),
                "target service never took the port; giving up on confirmation"
            );
            return;
        }
        tokio::time::sleep(interval).await;
    }
}

/// Minimal HTTP responder: `200 ok` on the health path, `503` anywhere else.
///
/// Answering 503 for unknown routes is deliberate: the shim must signal "not
/// ready" rather than impersonate the gateway's other endpoints.
#[derive(Clone)]
struct HealthService;

impl Service<Request<Incoming>> for HealthService {
    type Response = Response<Full<Bytes>>;
    type Error = hyper::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn call(&self, req: Request<Incoming>) -> Self::Future {
        let response = if req.uri().path() == HEALTH_PATH {
            Response::new(Full::new(Bytes::from_static(b"ok")))
        } else {
            let mut unavailable = Response::new(Full::new(Bytes::from_static(b"starting")));
            *unavailable.status_mut() = StatusCode::SERVICE_UNAVAILABLE;
            unavailable
        };
        Box::pin(async move { Ok(response) })
    }
}
