//! TARS frame vector tests.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use std::fs;

use bytes::Bytes;
use serde_json::{json, Value};

use huyalive_core::protocol::messages::{ChatMessage, OuterPacket, PushMessage, WebSocketCommand};
use huyalive_core::protocol::tars::TarsMessage;
use huyalive_core::DecodeError;

use vector_loader::TestVector;

fn load(name: &str) -> TestVector {
    let s = fs::read_to_string(format!("tests/vectors/{name}")).unwrap();
    serde_json::from_str(&s).unwrap()
}

/// Decodes `raw` with the named schema and flattens the result for comparison.
fn decode_as(schema: &str, raw: Bytes) -> Result<Value, DecodeError> {
    Ok(match schema {
        "OuterPacket" => {
            let p = OuterPacket::decode(raw)?;
            json!({ "msgType": p.msg_type, "payloadLen": p.payload.len() })
        }
        "PushMessage" => {
            let p = PushMessage::decode(raw)?;
            json!({
                "pushType": p.push_type,
                "uri": p.uri,
                "msgLen": p.msg.len(),
                "protocolType": p.protocol_type,
            })
        }
        "ChatMessage" => {
            let m = ChatMessage::decode(raw)?;
            json!({
                "nickname": m.sender.nickname,
                "content": m.content,
                "fontColor": m.bullet_format.font_color,
            })
        }
        "WebSocketCommand" => {
            let c = WebSocketCommand::decode(raw)?;
            json!({
                "cmdType": c.cmd_type,
                "dataHex": hex::encode(&c.data),
                "requestId": c.request_id,
                "traceId": c.trace_id,
                "encryptType": c.encrypt_type,
            })
        }
        other => panic!("unknown schema in vector: {other}"),
    })
}

#[test]
fn tars_vectors() {
    let files = [
        "heartbeat.json",
        "join_frame.json",
        "chat_outer.json",
        "chat_push.json",
        "chat_message.json",
        "unknown_tags_skipped.json",
        "narrow_marker_on_wide_field.json",
        "wide_marker_on_narrow_field.json",
        "truncated_body.json",
        "length_overflow.json",
        "negative_length.json",
        "unknown_wire_type.json",
        "missing_field.json",
        "string_for_int.json",
        "stray_struct_end.json",
        "unterminated_struct.json",
    ];

    for f in files {
        let v = load(f);
        let res = decode_as(&v.schema, Bytes::from(v.frame.decode()));

        if let Some(err) = v.expect_error {
            let e = res.expect_err("expected error");
            assert_eq!(e.code(), err.code, "vector={}", v.description);
            continue;
        }

        let got = res.unwrap_or_else(|e| panic!("vector={} failed: {e}", v.description));
        let ex = v.expect.expect("missing expect block");
        for (key, want) in ex.as_object().unwrap() {
            assert_eq!(&got[key], want, "vector={} key={}", v.description, key);
        }
    }
}
