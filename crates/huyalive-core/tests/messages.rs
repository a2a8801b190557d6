//! Chat socket message framing.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]

use bytes::Bytes;

use huyalive_core::protocol::messages::{
    join_frame, BulletFormat, ChatMessage, JoinRequest, OuterPacket, PushMessage, Sender,
    WebSocketCommand, CMD_HEARTBEAT, CMD_JOIN, HEARTBEAT_FRAME, MSG_TYPE_PUSH, URI_CHAT_NOTICE,
};
use huyalive_core::protocol::tars::TarsMessage;

#[test]
fn heartbeat_frame_is_an_empty_command_20() {
    let encoded = WebSocketCommand::new(CMD_HEARTBEAT, Bytes::new()).encode().unwrap();
    assert_eq!(encoded.as_ref(), HEARTBEAT_FRAME);
    assert_eq!(hex::encode(HEARTBEAT_FRAME), "00141d000c2c36004c");
}

#[test]
fn join_frame_wraps_join_request() {
    let frame = join_frame(12345, 67890).unwrap();
    assert_eq!(
        hex::encode(&frame),
        "00011d000015013039100126003600420001093252000109326c7c2c36004c"
    );

    let cmd = WebSocketCommand::decode(frame).unwrap();
    assert_eq!(cmd.cmd_type, CMD_JOIN);
    let join = JoinRequest::decode(cmd.data).unwrap();
    assert_eq!(join, JoinRequest::new(12345, 67890));
    assert!(join.flag);
    assert_eq!(join.channel_primary, join.channel_secondary);
}

#[test]
fn join_and_heartbeat_share_the_default_command_tail() {
    let join = join_frame(12345, 67890).unwrap();
    let tail = [0x2c, 0x36, 0x00, 0x4c];
    assert!(join.ends_with(&tail));
    assert!(HEARTBEAT_FRAME.ends_with(&tail));

    let cmd = WebSocketCommand::decode(join).unwrap();
    assert_eq!(cmd.request_id, 0);
    assert_eq!(cmd.trace_id, "");
    assert_eq!(cmd.encrypt_type, 0);
}

#[test]
fn chat_notice_round_trips_through_three_layers() {
    let chat = ChatMessage {
        sender: Sender {
            uid: 987_654_321,
            nickname: "Alice".to_owned(),
            ..Sender::default()
        },
        content: "hello".to_owned(),
        bullet_format: BulletFormat {
            font_color: 0x00ff_8800,
            ..BulletFormat::default()
        },
    };
    let push = PushMessage {
        uri: URI_CHAT_NOTICE,
        msg: chat.encode().unwrap(),
        ..PushMessage::default()
    };
    let outer = OuterPacket {
        msg_type: MSG_TYPE_PUSH,
        payload: push.encode().unwrap(),
    };

    let wire = outer.encode().unwrap();
    let outer = OuterPacket::decode(wire).unwrap();
    assert_eq!(outer.msg_type, MSG_TYPE_PUSH);
    let push = PushMessage::decode(outer.payload).unwrap();
    assert_eq!(push.uri, URI_CHAT_NOTICE);
    let back = ChatMessage::decode(push.msg).unwrap();
    assert_eq!(back, chat);
}

#[test]
fn chat_message_matches_known_encoding() {
    let chat = ChatMessage {
        sender: Sender {
            nickname: "Alice".to_owned(),
            ..Sender::default()
        },
        content: "hello".to_owned(),
        bullet_format: BulletFormat::default(),
    };
    assert_eq!(
        hex::encode(chat.encode().unwrap()),
        "0a0c1c2605416c6963653c0b360568656c6c6f6a0c1c2c3c0b"
    );
}

#[test]
fn layered_payload_with_wrong_inner_schema_fails() {
    // A join request is not a chat message.
    let frame = join_frame(1, 1).unwrap();
    let cmd = WebSocketCommand::decode(frame).unwrap();
    assert!(ChatMessage::decode(cmd.data).is_err());
}
