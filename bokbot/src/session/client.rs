//! The session client: one `request` entry point that always carries a valid
//! authenticated context.
//!
//! The login flow is an uncooperative redirect chain: GET the auth endpoint,
//! follow 302s by hand until the homepage host and path appear, and read the
//! session parameters off that landing URL. Expiry shows up as a redirect to
//! the server's error page on an otherwise ordinary request, at which point
//! the session re-authenticates once and retries the original request.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use reqwest::{header, redirect, StatusCode};
use tokio::sync::{broadcast, Mutex};
use tracing::{debug, info};
use url::Url;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::session::params::{attach_session_params, SessionParams};

/// A context younger than this is trusted: an error-page redirect is taken as
/// a genuine upstream failure rather than an expired session, so the client
/// does not hammer the login flow against a server that is itself erroring.
const MIN_AUTH_AGE: Duration = Duration::from_secs(5 * 60);

/// A context older than this is refreshed before it is used again.
const MAX_AUTH_AGE: Duration = Duration::from_secs(60 * 60);

/// Trailing path segment the server redirects to when a session has expired
/// or a request was otherwise rejected. Case-sensitive.
const ERROR_PAGE: &str = "Error.aspx";

/// Immutable snapshot of the authenticated session context.
///
/// Created only by a successful refresh and replaced wholesale by the next
/// one; never mutated in place, so concurrent readers can hold it across
/// await points without observing torn state.
#[derive(Debug, Clone)]
pub struct AuthState {
    /// Query parameters the server expects back on authenticated requests.
    pub params: BTreeMap<String, String>,
    /// Calendar context the landing URL carried, stripped from `params`.
    pub week_offset: i64,
    issued_at: Instant,
}

impl AuthState {
    fn age(&self) -> Duration {
        self.issued_at.elapsed()
    }
}

/// Per-request behavior switches for [`Session::request`].
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    /// Follow ordinary 301/302 redirects instead of returning them.
    pub follow_redirects: bool,
    /// Which session parameters to merge into the outgoing query.
    pub session_params: SessionParams,
}

/// Authenticated HTTP session. Cheap to clone; all clones share the cookie
/// store, the auth context and the single-flight refresh handle.
#[derive(Debug, Clone)]
pub struct Session {
    inner: Arc<Inner>,
}

type RefreshOutcome = Result<Arc<AuthState>>;

#[derive(Debug)]
struct Inner {
    http: reqwest::Client,
    config: Arc<Config>,
    min_auth_age: Duration,
    max_auth_age: Duration,
    auth: Mutex<Option<Arc<AuthState>>>,
    pending: Mutex<Option<broadcast::Sender<RefreshOutcome>>>,
}

/// Outcome of one pass over the redirect loop.
enum Attempt {
    Done(reqwest::Response),
    SessionExpired,
}

impl Session {
    /// Build a session around a cookie-keeping client that never follows
    /// redirects on its own; both the login chain and ordinary requests need
    /// to observe each hop.
    pub fn new(config: Arc<Config>) -> Result<Self> {
        Self::with_auth_ages(config, MIN_AUTH_AGE, MAX_AUTH_AGE)
    }

    fn with_auth_ages(
        config: Arc<Config>,
        min_auth_age: Duration,
        max_auth_age: Duration,
    ) -> Result<Self> {
        let http = reqwest::Client::builder()
            .redirect(redirect::Policy::none())
            .cookie_store(true)
            .build()?;
        Ok(Self {
            inner: Arc::new(Inner {
                http,
                config,
                min_auth_age,
                max_auth_age,
                auth: Mutex::new(None),
                pending: Mutex::new(None),
            }),
        })
    }

    /// Issue an authenticated GET.
    ///
    /// Re-authenticates up front when the context is absent or too old, and
    /// once more if the server redirects to its error page mid-request with a
    /// context old enough to plausibly have expired. That retry restarts from
    /// the original URL and happens at most once per call.
    pub async fn request(&self, url: Url, opts: RequestOptions) -> Result<reqwest::Response> {
        let mut reauthed = false;
        loop {
            let auth = self.current_auth().await?;
            match self.attempt(&url, &opts, &auth).await? {
                Attempt::Done(res) => return Ok(res),
                Attempt::SessionExpired => {
                    if reauthed {
                        return Err(Error::Upstream(
                            "the error page persisted after re-authentication".into(),
                        ));
                    }
                    reauthed = true;
                    info!(%url, "session expired upstream, re-authenticating");
                    self.refresh().await?;
                }
            }
        }
    }

    /// The current session context, if one has been established.
    pub async fn auth_state(&self) -> Option<Arc<AuthState>> {
        self.inner.auth.lock().await.clone()
    }

    /// Drop the session, releasing the connection pool and cookie store once
    /// the last clone is gone.
    pub fn close(self) {
        debug!("session closed");
        drop(self);
    }

    /// One pass over the target and its redirects with a fixed auth context.
    async fn attempt(
        &self,
        url: &Url,
        opts: &RequestOptions,
        auth: &AuthState,
    ) -> Result<Attempt> {
        let mut target = url.clone();
        attach_session_params(&mut target, &auth.params, &opts.session_params);
        let mut redirects = 0u64;
        loop {
            debug!(%target, "GET");
            let res = self.inner.http.get(target.clone()).send().await?;
            let status = res.status();
            if status != StatusCode::MOVED_PERMANENTLY && status != StatusCode::FOUND {
                return Ok(Attempt::Done(res));
            }
            let next = redirect_target(&res, &target)?;
            if next.path().ends_with(ERROR_PAGE) {
                if auth.age() < self.inner.min_auth_age {
                    return Err(Error::Upstream("redirected to the server error page".into()));
                }
                return Ok(Attempt::SessionExpired);
            }
            if !opts.follow_redirects {
                return Ok(Attempt::Done(res));
            }
            redirects += 1;
            if redirects > self.inner.config.max_redirects {
                return Err(Error::TooManyRedirects {
                    url: url.to_string(),
                });
            }
            target = next;
            attach_session_params(&mut target, &auth.params, &opts.session_params);
        }
    }

    async fn current_auth(&self) -> Result<Arc<AuthState>> {
        {
            let auth = self.inner.auth.lock().await;
            if let Some(state) = auth.as_ref() {
                if state.age() < self.inner.max_auth_age {
                    return Ok(Arc::clone(state));
                }
            }
        }
        self.refresh().await
    }

    /// Run (or join) the single-flight refresh exchange.
    ///
    /// The first caller spawns the exchange and stores the broadcast handle;
    /// everyone arriving before settlement subscribes to the same handle. The
    /// handle is cleared before the outcome is published, so a caller that
    /// misses the broadcast starts a fresh exchange instead of waiting
    /// forever. The exchange runs on its own task: a waiter dropping its
    /// receiver must not abort a refresh other waiters share.
    async fn refresh(&self) -> Result<Arc<AuthState>> {
        let mut rx = {
            let mut pending = self.inner.pending.lock().await;
            if let Some(tx) = pending.as_ref() {
                tx.subscribe()
            } else {
                let (tx, rx) = broadcast::channel(1);
                *pending = Some(tx.clone());
                let inner = Arc::clone(&self.inner);
                tokio::spawn(async move {
                    let outcome = inner.perform_refresh().await.map(Arc::new);
                    if let Ok(state) = &outcome {
                        *inner.auth.lock().await = Some(Arc::clone(state));
                    }
                    *inner.pending.lock().await = None;
                    let _ = tx.send(outcome);
                });
                rx
            }
        };
        match rx.recv().await {
            Ok(outcome) => outcome,
            Err(_) => Err(Error::Auth(
                "the refresh exchange was dropped before settling".into(),
            )),
        }
    }
}

impl Inner {
    /// Walk the login redirect chain until the homepage appears, then read
    /// the session parameters off the landing URL.
    async fn perform_refresh(&self) -> Result<AuthState> {
        let mut url = self.config.auth_url.clone();
        url.query_pairs_mut()
            .append_pair("username", &self.config.username);
        let origin = url.to_string();
        let mut redirects = 0u64;
        loop {
            debug!(%url, "login chain hop");
            let res = self.http.get(url.clone()).send().await?;
            if res.status() != StatusCode::FOUND {
                return Err(Error::Auth(format!(
                    "expected the login flow to redirect, got {}",
                    res.status()
                )));
            }
            let Some(location) = res.headers().get(header::LOCATION) else {
                return Err(Error::Auth("a login redirect carried no Location header".into()));
            };
            let location = location
                .to_str()
                .map_err(|_| Error::Auth("a login redirect Location is not valid text".into()))?;
            url = url.join(location).map_err(|e| {
                Error::Auth(format!("login redirect target {location:?} does not resolve: {e}"))
            })?;
            if self.is_homepage(&url) {
                break;
            }
            redirects += 1;
            if redirects > self.config.max_redirects {
                return Err(Error::TooManyRedirects { url: origin });
            }
        }

        let mut params: BTreeMap<String, String> = url
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        let week_offset = match params.remove("weekOffset") {
            Some(raw) => raw.parse::<i64>().map_err(|_| {
                Error::Auth(format!("weekOffset {raw:?} from the landing URL is not an integer"))
            })?,
            None => 0,
        };
        info!(week_offset, params = params.len(), "authenticated session established");
        Ok(AuthState {
            params,
            week_offset,
            issued_at: Instant::now(),
        })
    }

    fn is_homepage(&self, url: &Url) -> bool {
        host_with_port(url) == self.config.homepage_host && url.path() == self.config.homepage_path
    }
}

/// Host as the server names itself, port included unless it is the scheme
/// default — the same notion of "host" the homepage configuration uses.
fn host_with_port(url: &Url) -> String {
    match (url.host_str(), url.port()) {
        (Some(host), Some(port)) => format!("{host}:{port}"),
        (Some(host), None) => host.to_string(),
        _ => String::new(),
    }
}

fn redirect_target(res: &reqwest::Response, from: &Url) -> Result<Url> {
    let Some(location) = res.headers().get(header::LOCATION) else {
        return Err(Error::MalformedRedirect {
            url: from.to_string(),
            reason: "no Location header".into(),
        });
    };
    let location = location.to_str().map_err(|_| Error::MalformedRedirect {
        url: from.to_string(),
        reason: "Location header is not valid text".into(),
    })?;
    from.join(location).map_err(|e| Error::MalformedRedirect {
        url: from.to_string(),
        reason: format!("Location {location:?} does not resolve: {e}"),
    })
}
