#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use std::time::Duration;

use huyalive_client::{config, DEFAULT_ENDPOINT};

#[test]
fn deny_unknown_fields_nested() {
    let bad = r#"
version: 1
client:
  heartbeat_interval_ms: 60000
room:
  target_uid: 1
  channel_id: 2
  chanel: 3 # typo should fail
"#;

    let err = config::load_from_str(bad).expect_err("must fail");
    assert_eq!(err.code().as_str(), "BAD_CONFIG");
}

#[test]
fn ok_minimal_config() {
    let ok = r#"
version: 1
room:
  target_uid: 1234567
  channel_id: 7654321
"#;
    let cfg = config::load_from_str(ok).expect("must parse");
    assert_eq!(cfg.version, 1);
    assert_eq!(cfg.room.target_uid, 1234567);
    assert_eq!(cfg.client.endpoint, DEFAULT_ENDPOINT);
    assert!(cfg.stream.is_none());

    let session = cfg.client.session_config();
    assert_eq!(session.heartbeat_interval, Duration::from_secs(60));
    assert_eq!(session.connect_timeout, Duration::from_secs(10));
    assert_eq!(session.close_timeout, Duration::from_secs(3));
}

#[test]
fn room_is_required() {
    let err = config::load_from_str("version: 1\n").expect_err("must fail");
    assert_eq!(err.code().as_str(), "BAD_CONFIG");
}

#[test]
fn rejects_out_of_range_values() {
    let cases = [
        "version: 2\nroom: { target_uid: 1, channel_id: 1 }\n",
        "version: 1\nroom: { target_uid: 0, channel_id: 1 }\n",
        "version: 1\nroom: { target_uid: 1, channel_id: -5 }\n",
        "version: 1\nclient: { heartbeat_interval_ms: 10 }\nroom: { target_uid: 1, channel_id: 1 }\n",
        "version: 1\nclient: { connect_timeout_ms: 120000 }\nroom: { target_uid: 1, channel_id: 1 }\n",
        "version: 1\nclient: { close_timeout_ms: 0 }\nroom: { target_uid: 1, channel_id: 1 }\n",
        "version: 1\nclient: { event_buffer: 0 }\nroom: { target_uid: 1, channel_id: 1 }\n",
        "version: 1\nclient: { endpoint: \"http://example.com\" }\nroom: { target_uid: 1, channel_id: 1 }\n",
    ];
    for yaml in cases {
        let err = config::load_from_str(yaml).expect_err(yaml);
        assert_eq!(err.code().as_str(), "BAD_CONFIG", "{yaml}");
    }
}

#[test]
fn stream_section_builds_flv_source() {
    let ok = r#"
version: 1
room:
  target_uid: 1
  channel_id: 1
stream:
  flv_url: "https://al.flv.huya.com/src"
  stream_name: "abc-def"
  anticode: "wsTime=1&fm=&ctype=huya_live"
  bit_rate: 4000
"#;
    let cfg = config::load_from_str(ok).expect("must parse");
    let stream = cfg.stream.expect("stream section");
    assert_eq!(stream.suffix, "flv");
    assert_eq!(stream.uid, None);

    let url = stream.flv_source().url(42, 1_000, stream.bit_rate);
    assert!(url.starts_with("https://al.flv.huya.com/src/abc-def.flv?wsTime=1&ctype=huya_live&ver=1"));
    assert!(url.ends_with("&ratio=4000"));
}

#[test]
fn missing_file_is_bad_config() {
    let err = config::load_from_file("does/not/exist.yaml").expect_err("must fail");
    assert_eq!(err.code().as_str(), "BAD_CONFIG");
}
