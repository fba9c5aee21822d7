#![allow(clippy::float_cmp)]

use super::*;

fn sample_transform() -> TransformUpdate {
    TransformUpdate {
        position: Vector3::new(1.0, 2.5, -3.0),
        rotation: Quaternion::new(0.0, 0.707_106_8, 0.0, 0.707_106_8),
        scale: Vector3::new(1.0, 1.0, 1.0),
    }
}

#[test]
fn action_names_match_wire_discriminators() {
    assert_eq!(Message::CreateRoom.action(), "create_room");
    assert_eq!(Message::JoinRoom { room_code: "A".into() }.action(), "join_room");
    assert_eq!(Message::RoomCreated { room_code: "A".into() }.action(), "room_created");
    assert_eq!(Message::JoinedRoom { room_code: "A".into() }.action(), "joined_room");
    assert_eq!(Message::Transform(sample_transform()).action(), "send_transform");
    assert_eq!(Message::Error { message: "x".into() }.action(), "error");
}

#[test]
fn create_room_encodes_as_bare_action() {
    let json: serde_json::Value = serde_json::from_str(&encode(&Message::CreateRoom)).expect("json");
    assert_eq!(json, serde_json::json!({"action": "create_room"}));
}

#[test]
fn join_room_encodes_room_code_field() {
    let text = encode(&Message::JoinRoom { room_code: "AB12C".into() });
    let json: serde_json::Value = serde_json::from_str(&text).expect("json");
    assert_eq!(json["action"], "join_room");
    assert_eq!(json["room_code"], "AB12C");
}

#[test]
fn transform_encodes_flat_with_named_components() {
    let text = encode(&Message::Transform(sample_transform()));
    let json: serde_json::Value = serde_json::from_str(&text).expect("json");
    assert_eq!(json["action"], "send_transform");
    assert_eq!(json["position"]["x"], 1.0);
    assert_eq!(json["position"]["y"], 2.5);
    assert_eq!(json["position"]["z"], -3.0);
    assert_eq!(json["rotation"]["w"].as_f64().map(|w| w > 0.7), Some(true));
    assert_eq!(json["scale"]["z"], 1.0);
}

#[test]
fn decode_reads_server_room_created_reply() {
    let msg = decode(r#"{"action": "room_created", "room_code": "QX7PZ"}"#).expect("decode");
    assert_eq!(msg, Some(Message::RoomCreated { room_code: "QX7PZ".into() }));
}

#[test]
fn decode_reads_server_error_reply() {
    let msg = decode(r#"{"action": "error", "message": "Room not found"}"#).expect("decode");
    assert_eq!(msg, Some(Message::Error { message: "Room not found".into() }));
}

#[test]
fn decode_reads_transform_from_peer() {
    let text = r#"{
        "action": "send_transform",
        "position": {"x": 0.5, "y": 0.0, "z": 2.0},
        "rotation": {"x": 0.0, "y": 0.0, "z": 0.0, "w": 1.0},
        "scale": {"x": 2.0, "y": 2.0, "z": 2.0}
    }"#;
    let Some(Message::Transform(update)) = decode(text).expect("decode") else {
        panic!("expected transform");
    };
    assert_eq!(update.position, Vector3::new(0.5, 0.0, 2.0));
    assert_eq!(update.rotation, Quaternion::IDENTITY);
    assert_eq!(update.scale, Vector3::new(2.0, 2.0, 2.0));
}

#[test]
fn decode_tolerates_extra_fields() {
    let msg = decode(r#"{"action": "joined_room", "room_code": "ABCDE", "peers": 3}"#).expect("decode");
    assert_eq!(msg, Some(Message::JoinedRoom { room_code: "ABCDE".into() }));
}

#[test]
fn decode_ignores_unknown_action() {
    let msg = decode(r#"{"action": "spectate", "room_code": "ABCDE"}"#).expect("unknown action is not an error");
    assert!(msg.is_none());
}

#[test]
fn decode_ignores_unknown_action_with_arbitrary_payload() {
    let msg = decode(r#"{"action": "ping", "nested": {"deep": [1, 2, 3]}}"#).expect("decode");
    assert!(msg.is_none());
}

#[test]
fn decode_rejects_non_json() {
    let err = decode("hello there").expect_err("should fail");
    assert!(matches!(err, CodecError::Json(_)));
}

#[test]
fn decode_rejects_missing_action() {
    let err = decode(r#"{"room_code": "ABCDE"}"#).expect_err("should fail");
    assert!(matches!(err, CodecError::Json(_)));
}

#[test]
fn decode_rejects_non_string_action() {
    let err = decode(r#"{"action": 7}"#).expect_err("should fail");
    assert!(matches!(err, CodecError::Json(_)));
}

#[test]
fn decode_rejects_known_action_with_malformed_payload() {
    let err = decode(r#"{"action": "send_transform", "position": "up"}"#).expect_err("should fail");
    assert!(matches!(err, CodecError::Json(_)));
}

#[test]
fn decode_rejects_join_without_room_code() {
    let err = decode(r#"{"action": "join_room"}"#).expect_err("should fail");
    assert!(matches!(err, CodecError::Json(_)));
}

#[test]
fn decode_bytes_rejects_invalid_utf8() {
    let err = decode_bytes(&[0xff, 0xfe, 0x00]).expect_err("should fail");
    assert!(matches!(err, CodecError::Utf8(_)));
}

#[test]
fn encode_bytes_output_decodes_to_same_message() {
    let msg = Message::Transform(sample_transform());
    let bytes = encode_bytes(&msg);
    assert!(bytes.len() < MAX_DATAGRAM_BYTES);
    assert_eq!(decode_bytes(&bytes).expect("decode"), Some(msg));
}

#[test]
fn quaternion_default_is_identity() {
    assert_eq!(Quaternion::default(), Quaternion::new(0.0, 0.0, 0.0, 1.0));
}
