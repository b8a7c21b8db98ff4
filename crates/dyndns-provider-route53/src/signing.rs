//! AWS Signature Version 4
//!
//! Only what Route 53 needs: header-based signing, `host` and `x-amz-*`
//! headers signed, payload hashed in full.
//! Reference: <https://docs.aws.amazon.com/IAM/latest/UserGuide/create-signed-request.html>

use std::fmt::Write;

use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};

type HmacSha256 = Hmac<Sha256>;

const ALGORITHM: &str = "AWS4-HMAC-SHA256";

/// Static AWS credentials
#[derive(Clone)]
pub struct Credentials {
    pub access_key_id: String,
    secret_access_key: String,
    session_token: Option<String>,
}

impl Credentials {
    pub fn new(
        access_key_id: impl Into<String>,
        secret_access_key: impl Into<String>,
        session_token: Option<String>,
    ) -> Self {
        Self {
            access_key_id: access_key_id.into(),
            secret_access_key: secret_access_key.into(),
            session_token,
        }
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"<REDACTED>")
            .field(
                "session_token",
                &self.session_token.as_ref().map(|_| "<REDACTED>"),
            )
            .finish()
    }
}

/// The parts of a request that go into the signature
#[derive(Debug, Clone, Copy)]
pub struct SignableRequest<'a> {
    pub method: &'a str,
    /// `Host` header value, including a non-default port
    pub host: &'a str,
    /// Absolute path, already URI-encoded
    pub path: &'a str,
    /// Canonical query string (see [`canonical_query`])
    pub query: &'a str,
    pub payload: &'a [u8],
}

/// Signing scope
#[derive(Debug, Clone, Copy)]
pub struct Scope<'a> {
    pub region: &'a str,
    pub service: &'a str,
}

/// Headers to attach to the signed request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedHeaders {
    pub authorization: String,
    pub amz_date: String,
    pub security_token: Option<String>,
}

impl SignedHeaders {
    /// Header name/value pairs, ready for an HTTP client
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &str)> + '_ {
        [
            Some(("authorization", self.authorization.as_str())),
            Some(("x-amz-date", self.amz_date.as_str())),
            self.security_token
                .as_deref()
                .map(|token| ("x-amz-security-token", token)),
        ]
        .into_iter()
        .flatten()
    }
}

/// Sign a request at the given instant
pub fn sign(
    credentials: &Credentials,
    request: &SignableRequest<'_>,
    scope: Scope<'_>,
    now: DateTime<Utc>,
) -> SignedHeaders {
    let amz_date = now.format("%Y%m%dT%H%M%SZ").to_string();
    let date = now.format("%Y%m%d").to_string();

    let (canonical, signed_headers) =
        canonical_request(request, &amz_date, credentials.session_token.as_deref());

    let credential_scope = format!(
        "{}/{}/{}/aws4_request",
        date, scope.region, scope.service
    );
    let string_to_sign = format!(
        "{}\n{}\n{}\n{}",
        ALGORITHM,
        amz_date,
        credential_scope,
        hex::encode(Sha256::digest(canonical.as_bytes()))
    );

    let key = signing_key(&credentials.secret_access_key, &date, scope);
    let signature = hex::encode(hmac_sha256(&key, string_to_sign.as_bytes()));

    SignedHeaders {
        authorization: format!(
            "{} Credential={}/{}, SignedHeaders={}, Signature={}",
            ALGORITHM, credentials.access_key_id, credential_scope, signed_headers, signature
        ),
        amz_date,
        security_token: credentials.session_token.clone(),
    }
}

/// Build the canonical request; returns it with the signed header list
pub fn canonical_request(
    request: &SignableRequest<'_>,
    amz_date: &str,
    security_token: Option<&str>,
) -> (String, String) {
    // Already in lexical order
    let mut headers = vec![("host", request.host.trim()), ("x-amz-date", amz_date)];
    if let Some(token) = security_token {
        headers.push(("x-amz-security-token", token.trim()));
    }

    let canonical_headers = headers.iter().fold(String::new(), |mut acc, (k, v)| {
        let _ = writeln!(acc, "{}:{}", k, v);
        acc
    });
    let signed_headers = headers
        .iter()
        .map(|(k, _)| *k)
        .collect::<Vec<_>>()
        .join(";");

    let path = if request.path.is_empty() {
        "/"
    } else {
        request.path
    };

    let canonical = format!(
        "{}\n{}\n{}\n{}\n{}\n{}",
        request.method,
        path,
        request.query,
        canonical_headers,
        signed_headers,
        hex::encode(Sha256::digest(request.payload))
    );

    (canonical, signed_headers)
}

/// Encode and sort query parameters into the canonical form
///
/// The result is also what should be sent on the wire, so the server sees
/// exactly the string that was signed.
pub fn canonical_query(params: &[(&str, &str)]) -> String {
    let mut encoded: Vec<(String, String)> = params
        .iter()
        .map(|(k, v)| (uri_encode(k), uri_encode(v)))
        .collect();
    encoded.sort();

    encoded
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join("&")
}

/// RFC 3986 percent-encoding of everything but unreserved characters
pub fn uri_encode(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for byte in value.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(byte as char)
            }
            _ => {
                let _ = write!(out, "%{:02X}", byte);
            }
        }
    }
    out
}

fn signing_key(secret: &str, date: &str, scope: Scope<'_>) -> Vec<u8> {
    let k_date = hmac_sha256(format!("AWS4{}", secret).as_bytes(), date.as_bytes());
    let k_region = hmac_sha256(&k_date, scope.region.as_bytes());
    let k_service = hmac_sha256(&k_region, scope.service.as_bytes());
    hmac_sha256(&k_service, b"aws4_request")
}

fn hmac_sha256(key: &[u8], data: &[u8]) -> Vec<u8> {
    let mut mac = HmacSha256::new_from_slice(key).expect("HMAC can take key of any size");
    mac.update(data);
    mac.finalize().into_bytes().to_vec()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn example_credentials(token: Option<&str>) -> Credentials {
        Credentials::new(
            "AKIDEXAMPLE",
            "wJalrXUtnFEMI/K7MDENG+bPxRfiCYEXAMPLEKEY",
            token.map(str::to_string),
        )
    }

    fn example_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2015, 8, 30, 12, 36, 0).unwrap()
    }

    const SCOPE: Scope<'static> = Scope {
        region: "us-east-1",
        service: "service",
    };

    #[test]
    fn get_vanilla_test_vector() {
        let request = SignableRequest {
            method: "GET",
            host: "example.amazonaws.com",
            path: "/",
            query: "",
            payload: b"",
        };

        let signed = sign(&example_credentials(None), &request, SCOPE, example_time());

        assert_eq!(signed.amz_date, "20150830T123600Z");
        assert_eq!(
            signed.authorization,
            "AWS4-HMAC-SHA256 Credential=AKIDEXAMPLE/20150830/us-east-1/service/aws4_request, \
             SignedHeaders=host;x-amz-date, \
             Signature=5fa00fa31553b73ebf1942676e86291e8372ff2a2260956d9b8aae1d763fbf31"
        );
        assert_eq!(signed.security_token, None);
    }

    #[test]
    fn get_vanilla_canonical_request() {
        let request = SignableRequest {
            method: "GET",
            host: "example.amazonaws.com",
            path: "/",
            query: "",
            payload: b"",
        };

        let (canonical, signed_headers) = canonical_request(&request, "20150830T123600Z", None);

        assert_eq!(
            canonical,
            "GET\n/\n\nhost:example.amazonaws.com\nx-amz-date:20150830T123600Z\n\n\
             host;x-amz-date\n\
             e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
        assert_eq!(signed_headers, "host;x-amz-date");
    }

    #[test]
    fn session_token_is_signed() {
        let request = SignableRequest {
            method: "GET",
            host: "route53.amazonaws.com",
            path: "/2013-04-01/hostedzone/Z1/rrset",
            query: "",
            payload: b"",
        };

        let signed = sign(
            &example_credentials(Some("token")),
            &request,
            SCOPE,
            example_time(),
        );

        assert!(
            signed
                .authorization
                .contains("SignedHeaders=host;x-amz-date;x-amz-security-token,")
        );
        let headers: Vec<_> = signed.iter().map(|(k, _)| k).collect();
        assert_eq!(
            headers,
            vec!["authorization", "x-amz-date", "x-amz-security-token"]
        );
    }

    #[test]
    fn query_is_sorted_and_encoded() {
        assert_eq!(
            canonical_query(&[("type", "AAAA"), ("name", "\\052.example.com.")]),
            "name=%5C052.example.com.&type=AAAA"
        );
        assert_eq!(canonical_query(&[]), "");
        assert_eq!(uri_encode("a b*~"), "a%20b%2A~");
    }

    #[test]
    fn signature_depends_on_payload() {
        let credentials = example_credentials(None);
        let mut request = SignableRequest {
            method: "POST",
            host: "route53.amazonaws.com",
            path: "/2013-04-01/hostedzone/Z1/rrset/",
            query: "",
            payload: b"<a/>",
        };
        let first = sign(&credentials, &request, SCOPE, example_time());
        request.payload = b"<b/>";
        let second = sign(&credentials, &request, SCOPE, example_time());

        assert_ne!(first.authorization, second.authorization);
    }

    #[test]
    fn debug_redacts_secrets() {
        let debug = format!("{:?}", example_credentials(Some("TOKENVALUE")));
        assert!(debug.contains("AKIDEXAMPLE"));
        assert!(!debug.contains("wJalrXUtnFEMI"));
        assert!(!debug.contains("TOKENVALUE"));
    }
}
