//! Anti-leech (anticode) query signing for FLV playback URLs.
//!
//! The upstream profile hands out a query template per stream. Signing keeps
//! the template's keys in their original order, adds the protocol fields, and
//! replaces the base64 secret template `fm` with the computed `wsSecret`.
//!
//! Missing template fields never fail: they are read as empty strings.

use std::time::{SystemTime, UNIX_EPOCH};

use base64::{engine::general_purpose::STANDARD, Engine as _};
use md5::{Digest, Md5};
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use rand::Rng;

pub const PROTOCOL_VERSION: &str = "1";
pub const SDK_VERSION: &str = "2110211124";

/// Anti-scrub flag removed from the signed query.
const ANTI_SCRUB_FIELD: &str = "txyp";

const UUID_MODULUS: u64 = 4_294_967_295;

/// Everything but unreserved characters and `/` is escaped.
const QUERY_VALUE: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~')
    .remove(b'/');

/// Insertion-ordered query map. Overwriting a key keeps its position.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryMap {
    entries: Vec<(String, String)>,
}

impl QueryMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a raw query string (form-url decoding).
    ///
    /// `&amp;` entities and leading `?`/`&` are tolerated, as served by the
    /// profile endpoint.
    pub fn parse(raw: &str) -> Self {
        let cleaned = raw.replace("&amp;", "&");
        let trimmed = cleaned.trim_start_matches(|c: char| c == '?' || c == '&');
        let mut map = Self::new();
        for (k, v) in url::form_urlencoded::parse(trimmed.as_bytes()) {
            map.insert(k.into_owned(), v.into_owned());
        }
        map
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Empty string when absent.
    pub fn get_or_empty(&self, key: &str) -> &str {
        self.get(key).unwrap_or("")
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = value,
            None => self.entries.push((key, value)),
        }
    }

    pub fn remove(&mut self, key: &str) -> Option<String> {
        let idx = self.entries.iter().position(|(k, _)| k == key)?;
        Some(self.entries.remove(idx).1)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// `k=v&k=v` in map order, percent-encoded.
    pub fn to_query_string(&self) -> String {
        self.entries
            .iter()
            .map(|(k, v)| {
                format!(
                    "{}={}",
                    utf8_percent_encode(k, QUERY_VALUE),
                    utf8_percent_encode(v, QUERY_VALUE)
                )
            })
            .collect::<Vec<_>>()
            .join("&")
    }
}

fn md5_hex(input: &str) -> String {
    format!("{:x}", Md5::digest(input.as_bytes()))
}

/// Wall clock in epoch milliseconds.
pub fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
        .unwrap_or_default()
}

/// Time-derived 32-bit request id expected by the CDN.
pub fn new_uuid(now_ms: u64) -> u64 {
    let sub_second = now_ms % 1000;
    ((now_ms % 10_000_000_000) * 1000 + sub_second) % UUID_MODULUS
}

/// A viewer uid in the range the web player uses.
pub fn random_uid() -> u64 {
    rand::thread_rng().gen_range(10_000..=99_999_999)
}

fn decode_secret_template(fm: &str) -> String {
    if fm.is_empty() {
        tracing::debug!("anticode template has no fm field");
        return String::new();
    }
    match STANDARD.decode(fm.as_bytes()) {
        Ok(raw) => String::from_utf8_lossy(&raw).into_owned(),
        Err(e) => {
            tracing::debug!(error = %e, "anticode fm is not valid base64");
            String::new()
        }
    }
}

/// Signs a parsed template in place order and returns the query string.
pub fn sign_map(mut q: QueryMap, stream_name: &str, uid: u64, now_ms: u64) -> String {
    // Wide enough for any u64 uid plus any u64 clock.
    let seqid = (u128::from(uid) + u128::from(now_ms)).to_string();
    let uid = uid.to_string();

    q.insert("ver", PROTOCOL_VERSION);
    q.insert("sv", SDK_VERSION);
    q.insert("seqid", seqid.as_str());
    q.insert("uid", uid.as_str());
    q.insert("uuid", new_uuid(now_ms).to_string());

    let ss = md5_hex(&format!(
        "{}|{}|{}",
        seqid,
        q.get_or_empty("ctype"),
        q.get_or_empty("t")
    ));

    let secret = decode_secret_template(q.get_or_empty("fm"))
        .replace("$0", &uid)
        .replace("$1", stream_name)
        .replace("$2", &ss)
        .replace("$3", q.get_or_empty("wsTime"));
    q.insert("wsSecret", md5_hex(&secret));

    q.remove("fm");
    q.remove(ANTI_SCRUB_FIELD);

    q.to_query_string()
}

/// Signs a raw template at the given time.
pub fn sign(template: &str, stream_name: &str, uid: u64, now_ms: u64) -> String {
    sign_map(QueryMap::parse(template), stream_name, uid, now_ms)
}

/// Signs a raw template at the current wall-clock time.
pub fn sign_now(template: &str, stream_name: &str, uid: u64) -> String {
    sign(template, stream_name, uid, now_millis())
}

/// One CDN line of a stream, as described by the room profile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlvSource {
    pub base_url: String,
    pub stream_name: String,
    pub suffix: String,
    pub anticode: String,
}

impl FlvSource {
    /// Playable URL signed for `uid` at `now_ms`; `bit_rate > 0` selects a ratio.
    pub fn url(&self, uid: u64, now_ms: u64, bit_rate: u32) -> String {
        let query = sign(&self.anticode, &self.stream_name, uid, now_ms);
        let mut url = format!(
            "{}/{}.{}?{}",
            self.base_url.trim_end_matches('/'),
            self.stream_name,
            self.suffix,
            query
        );
        if bit_rate > 0 {
            url.push_str(&format!("&ratio={bit_rate}"));
        }
        url
    }
}
