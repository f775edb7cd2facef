//! Client-side credentials for the `Authorization` header.
//!
//! Two schemes are supported:
//!
//! - **Basic** (RFC 2617 §2): `Basic base64(user:password)`, independent of
//!   the request.
//! - **Digest** (RFC 2069 form, as used by RTSP servers): a keyed MD5 hash
//!   over the realm and nonce from the server challenge plus the method and
//!   URI of each request.
//!
//! ```text
//! HA1      = MD5(user:realm:password)
//! HA2      = MD5(method:uri)
//! response = MD5(HA1:nonce:HA2)
//! ```

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use digest_auth::{AlgorithmType, WwwAuthenticateHeader};
use md5::{Digest, Md5};

use crate::error::{Result, RtspError};
use crate::protocol::message::Method;

/// Computes `Authorization` header values for one set of credentials and
/// one server challenge.
///
/// Immutable once built; the same provider answers every request on a
/// connection and yields byte-identical output for identical inputs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthProvider {
    Basic {
        user: String,
        password: String,
    },
    Digest {
        user: String,
        password: String,
        realm: String,
        nonce: String,
        opaque: Option<String>,
    },
}

impl AuthProvider {
    /// Digest when both `realm` and `nonce` are given, Basic otherwise.
    pub fn new(user: &str, password: &str, realm: Option<&str>, nonce: Option<&str>) -> Self {
        match (realm, nonce) {
            (Some(realm), Some(nonce)) => AuthProvider::Digest {
                user: user.to_string(),
                password: password.to_string(),
                realm: realm.to_string(),
                nonce: nonce.to_string(),
                opaque: None,
            },
            _ => AuthProvider::Basic {
                user: user.to_string(),
                password: password.to_string(),
            },
        }
    }

    /// Build a provider from one `WWW-Authenticate` header value.
    ///
    /// Accepts `Basic realm="..."` and `Digest realm="...", nonce="..."`
    /// with optional `opaque` and `algorithm`. Only plain MD5 digests can be
    /// answered.
    pub fn from_challenge(user: &str, password: &str, challenge: &str) -> Result<Self> {
        let challenge = challenge.trim();
        let (scheme, params) = challenge
            .split_once(char::is_whitespace)
            .unwrap_or((challenge, ""));

        if scheme.eq_ignore_ascii_case("Basic") {
            return Ok(Self::new(user, password, None, None));
        }
        if !scheme.eq_ignore_ascii_case("Digest") {
            return Err(RtspError::AuthChallenge(challenge.to_string()));
        }

        let parsed = WwwAuthenticateHeader::parse(&format!("Digest {}", params.trim()))
            .map_err(|_| RtspError::AuthChallenge(challenge.to_string()))?;
        if !matches!(parsed.algorithm.algo, AlgorithmType::MD5) || parsed.algorithm.sess {
            return Err(RtspError::AuthChallenge(challenge.to_string()));
        }

        Ok(AuthProvider::Digest {
            user: user.to_string(),
            password: password.to_string(),
            realm: parsed.realm,
            nonce: parsed.nonce,
            opaque: parsed.opaque,
        })
    }

    /// Pick the strongest answerable challenge among several
    /// `WWW-Authenticate` values: Digest first, then Basic.
    pub fn from_challenges(user: &str, password: &str, challenges: &[String]) -> Result<Self> {
        let mut last_err = RtspError::AuthChallenge("no challenge offered".to_string());
        let mut basic = None;
        for challenge in challenges {
            match Self::from_challenge(user, password, challenge) {
                Ok(provider @ AuthProvider::Digest { .. }) => return Ok(provider),
                Ok(provider) => basic = basic.or(Some(provider)),
                Err(err) => last_err = err,
            }
        }
        basic.ok_or(last_err)
    }

    /// The `Authorization` header value for a request.
    pub fn authorization_header(&self, method: &Method, uri: &str) -> String {
        match self {
            AuthProvider::Basic { user, password } => {
                format!("Basic {}", STANDARD.encode(format!("{}:{}", user, password)))
            }
            AuthProvider::Digest {
                user,
                password,
                realm,
                nonce,
                opaque,
            } => {
                let ha1 = md5_hex(&format!("{}:{}:{}", user, realm, password));
                let ha2 = md5_hex(&format!("{}:{}", method, uri));
                let response = md5_hex(&format!("{}:{}:{}", ha1, nonce, ha2));

                let mut value = format!(
                    "Digest username={}, realm={}, nonce={}, uri={}, response=\"{}\"",
                    quote(user),
                    quote(realm),
                    quote(nonce),
                    quote(uri),
                    response
                );
                if let Some(opaque) = opaque {
                    value.push_str(&format!(", opaque={}", quote(opaque)));
                }
                value
            }
        }
    }
}

fn md5_hex(input: &str) -> String {
    format!("{:x}", Md5::digest(input.as_bytes()))
}

/// Render `value` as an RFC 2616 quoted-string.
fn quote(value: &str) -> String {
    let mut quoted = String::with_capacity(value.len() + 2);
    quoted.push('"');
    for c in value.chars() {
        if c == '"' || c == '\\' {
            quoted.push('\\');
        }
        quoted.push(c);
    }
    quoted.push('"');
    quoted
}
