//! Huya chat socket messages.
//!
//! Inbound frames are three nested TARS layers:
//! `OuterPacket { msgType=7, payload } -> PushMessage { uri=1400, msg } -> ChatMessage`.
//! Outbound frames are `WebSocketCommand` wrappers (join, heartbeat).

use bytes::Bytes;

use crate::error::EncodeError;
use crate::protocol::tars::{Field, FieldType, Schema, StructValue, TarsMessage};

/// Outer packet type carrying a push message.
pub const MSG_TYPE_PUSH: i32 = 7;
/// Push uri of a text chat notice.
pub const URI_CHAT_NOTICE: i32 = 1400;
/// Command type of the room join request.
pub const CMD_JOIN: i32 = 1;
/// Command type of the keep-alive heartbeat.
pub const CMD_HEARTBEAT: i32 = 20;

/// Pre-built heartbeat: `WebSocketCommand { cmdType: 20 }` with all other fields empty.
pub const HEARTBEAT_FRAME: &[u8] = &[0x00, 0x14, 0x1d, 0x00, 0x0c, 0x2c, 0x36, 0x00, 0x4c];

pub static OUTER_PACKET: Schema = Schema {
    name: "OuterPacket",
    fields: &[
        Field { tag: 0, name: "msgType", ty: FieldType::Int32 },
        Field { tag: 1, name: "payload", ty: FieldType::Bytes },
    ],
};

pub static PUSH_MESSAGE: Schema = Schema {
    name: "PushMessage",
    fields: &[
        Field { tag: 0, name: "pushType", ty: FieldType::Int32 },
        Field { tag: 1, name: "uri", ty: FieldType::Int32 },
        Field { tag: 2, name: "msg", ty: FieldType::Bytes },
        Field { tag: 3, name: "protocolType", ty: FieldType::Int32 },
    ],
};

pub static SENDER: Schema = Schema {
    name: "Sender",
    fields: &[
        Field { tag: 0, name: "uid", ty: FieldType::Int64 },
        Field { tag: 1, name: "imid", ty: FieldType::Int64 },
        Field { tag: 2, name: "nickname", ty: FieldType::String },
        Field { tag: 3, name: "gender", ty: FieldType::Int32 },
    ],
};

pub static BULLET_FORMAT: Schema = Schema {
    name: "BulletFormat",
    fields: &[
        Field { tag: 0, name: "fontColor", ty: FieldType::Int32 },
        Field { tag: 1, name: "fontSize", ty: FieldType::Int32 },
        Field { tag: 2, name: "textSpeed", ty: FieldType::Int32 },
        Field { tag: 3, name: "transitionType", ty: FieldType::Int32 },
    ],
};

pub static CHAT_MESSAGE: Schema = Schema {
    name: "ChatMessage",
    fields: &[
        Field { tag: 0, name: "sender", ty: FieldType::Struct(&SENDER) },
        Field { tag: 3, name: "content", ty: FieldType::String },
        Field { tag: 6, name: "bulletFormat", ty: FieldType::Struct(&BULLET_FORMAT) },
    ],
};

pub static JOIN_REQUEST: Schema = Schema {
    name: "JoinRequest",
    fields: &[
        Field { tag: 0, name: "targetUid", ty: FieldType::Int64 },
        Field { tag: 1, name: "flag", ty: FieldType::Bool },
        Field { tag: 2, name: "reserved2", ty: FieldType::String },
        Field { tag: 3, name: "reserved3", ty: FieldType::String },
        Field { tag: 4, name: "channelPrimary", ty: FieldType::Int32 },
        Field { tag: 5, name: "channelSecondary", ty: FieldType::Int32 },
        Field { tag: 6, name: "reserved6", ty: FieldType::Int32 },
        Field { tag: 7, name: "reserved7", ty: FieldType::Int32 },
    ],
};

pub static WEB_SOCKET_COMMAND: Schema = Schema {
    name: "WebSocketCommand",
    fields: &[
        Field { tag: 0, name: "cmdType", ty: FieldType::Int32 },
        Field { tag: 1, name: "data", ty: FieldType::Bytes },
        Field { tag: 2, name: "requestId", ty: FieldType::Int64 },
        Field { tag: 3, name: "traceId", ty: FieldType::String },
        Field { tag: 4, name: "encryptType", ty: FieldType::Int32 },
    ],
};

/// Top-level frame envelope.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OuterPacket {
    pub msg_type: i32,
    pub payload: Bytes,
}

impl TarsMessage for OuterPacket {
    fn schema() -> &'static Schema {
        &OUTER_PACKET
    }

    fn to_struct(&self) -> StructValue {
        StructValue::new()
            .with(0, self.msg_type)
            .with(1, self.payload.clone())
    }

    fn from_struct(mut v: StructValue) -> Self {
        Self {
            msg_type: v.take_i32(0),
            payload: v.take_bytes(1),
        }
    }
}

/// Server push carried in an outer packet's payload.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PushMessage {
    pub push_type: i32,
    pub uri: i32,
    pub msg: Bytes,
    pub protocol_type: i32,
}

impl TarsMessage for PushMessage {
    fn schema() -> &'static Schema {
        &PUSH_MESSAGE
    }

    fn to_struct(&self) -> StructValue {
        StructValue::new()
            .with(0, self.push_type)
            .with(1, self.uri)
            .with(2, self.msg.clone())
            .with(3, self.protocol_type)
    }

    fn from_struct(mut v: StructValue) -> Self {
        Self {
            push_type: v.take_i32(0),
            uri: v.take_i32(1),
            msg: v.take_bytes(2),
            protocol_type: v.take_i32(3),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Sender {
    pub uid: i64,
    pub imid: i64,
    pub nickname: String,
    pub gender: i32,
}

impl TarsMessage for Sender {
    fn schema() -> &'static Schema {
        &SENDER
    }

    fn to_struct(&self) -> StructValue {
        StructValue::new()
            .with(0, self.uid)
            .with(1, self.imid)
            .with(2, self.nickname.as_str())
            .with(3, self.gender)
    }

    fn from_struct(mut v: StructValue) -> Self {
        Self {
            uid: v.take_int(0),
            imid: v.take_int(1),
            nickname: v.take_string(2),
            gender: v.take_i32(3),
        }
    }
}

/// Display hints of a chat bullet.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BulletFormat {
    pub font_color: i32,
    pub font_size: i32,
    pub text_speed: i32,
    pub transition_type: i32,
}

impl TarsMessage for BulletFormat {
    fn schema() -> &'static Schema {
        &BULLET_FORMAT
    }

    fn to_struct(&self) -> StructValue {
        StructValue::new()
            .with(0, self.font_color)
            .with(1, self.font_size)
            .with(2, self.text_speed)
            .with(3, self.transition_type)
    }

    fn from_struct(mut v: StructValue) -> Self {
        Self {
            font_color: v.take_i32(0),
            font_size: v.take_i32(1),
            text_speed: v.take_i32(2),
            transition_type: v.take_i32(3),
        }
    }
}

/// Text chat notice (push uri 1400).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChatMessage {
    pub sender: Sender,
    pub content: String,
    pub bullet_format: BulletFormat,
}

impl TarsMessage for ChatMessage {
    fn schema() -> &'static Schema {
        &CHAT_MESSAGE
    }

    fn to_struct(&self) -> StructValue {
        StructValue::new()
            .with(0, self.sender.to_struct())
            .with(3, self.content.as_str())
            .with(6, self.bullet_format.to_struct())
    }

    fn from_struct(mut v: StructValue) -> Self {
        Self {
            sender: Sender::from_struct(v.take_struct(0)),
            content: v.take_string(3),
            bullet_format: BulletFormat::from_struct(v.take_struct(6)),
        }
    }
}

/// Room registration payload. Tags 2, 3, 6 and 7 are always empty/zero.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JoinRequest {
    pub target_uid: i64,
    pub flag: bool,
    pub reserved2: String,
    pub reserved3: String,
    pub channel_primary: i32,
    pub channel_secondary: i32,
    pub reserved6: i32,
    pub reserved7: i32,
}

impl JoinRequest {
    pub fn new(target_uid: i64, channel_id: i32) -> Self {
        Self {
            target_uid,
            flag: true,
            channel_primary: channel_id,
            channel_secondary: channel_id,
            ..Self::default()
        }
    }
}

impl TarsMessage for JoinRequest {
    fn schema() -> &'static Schema {
        &JOIN_REQUEST
    }

    fn to_struct(&self) -> StructValue {
        StructValue::new()
            .with(0, self.target_uid)
            .with(1, self.flag)
            .with(2, self.reserved2.as_str())
            .with(3, self.reserved3.as_str())
            .with(4, self.channel_primary)
            .with(5, self.channel_secondary)
            .with(6, self.reserved6)
            .with(7, self.reserved7)
    }

    fn from_struct(mut v: StructValue) -> Self {
        Self {
            target_uid: v.take_int(0),
            flag: v.take_bool(1),
            reserved2: v.take_string(2),
            reserved3: v.take_string(3),
            channel_primary: v.take_i32(4),
            channel_secondary: v.take_i32(5),
            reserved6: v.take_i32(6),
            reserved7: v.take_i32(7),
        }
    }
}

/// Generic client→server command wrapper.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WebSocketCommand {
    pub cmd_type: i32,
    pub data: Bytes,
    pub request_id: i64,
    pub trace_id: String,
    pub encrypt_type: i32,
}

impl WebSocketCommand {
    pub fn new(cmd_type: i32, data: Bytes) -> Self {
        Self {
            cmd_type,
            data,
            ..Self::default()
        }
    }
}

impl TarsMessage for WebSocketCommand {
    fn schema() -> &'static Schema {
        &WEB_SOCKET_COMMAND
    }

    fn to_struct(&self) -> StructValue {
        StructValue::new()
            .with(0, self.cmd_type)
            .with(1, self.data.clone())
            .with(2, self.request_id)
            .with(3, self.trace_id.as_str())
            .with(4, self.encrypt_type)
    }

    fn from_struct(mut v: StructValue) -> Self {
        Self {
            cmd_type: v.take_i32(0),
            data: v.take_bytes(1),
            request_id: v.take_int(2),
            trace_id: v.take_string(3),
            encrypt_type: v.take_i32(4),
        }
    }
}

/// Encoded join frame: `WebSocketCommand { cmdType: 1, data: JoinRequest }`.
///
/// `requestId`, `traceId` and `encryptType` are written at their defaults, so
/// the frame ends in `2c 36 00 4c`. The heartbeat frame carries the same tail.
pub fn join_frame(target_uid: i64, channel_id: i32) -> Result<Bytes, EncodeError> {
    let inner = JoinRequest::new(target_uid, channel_id).encode()?;
    WebSocketCommand::new(CMD_JOIN, inner).encode()
}
