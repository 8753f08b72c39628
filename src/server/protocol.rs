// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Wire protocol.
//!
//! Each request is one JSON object on its own line:
//! `{"id": 1, "method": "noteOn", "params": {"note": 60}}`.
//! Each reply is one line carrying the same `id` and either `result` or
//! `error`. Error codes follow JSON-RPC 2.0.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use super::{MidiService, NOTE_OFF_VELOCITY, NOTE_ON_VELOCITY};
use crate::error::Error;
use crate::sequence::parse_events;

/// Line was not valid JSON or not a request object
pub const PARSE_ERROR: i32 = -32700;
/// Method name not recognized
pub const METHOD_NOT_FOUND: i32 = -32601;
/// Params missing, mistyped, or out of range
pub const INVALID_PARAMS: i32 = -32602;
/// The output rejected a write
pub const TRANSPORT_ERROR: i32 = -32000;

/// Operations a client can call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    NoteOn,
    NoteOff,
    ControlChange,
    ProgramChange,
    RunSequence,
    ListPorts,
}

impl Method {
    /// Look up a method by wire name or tool alias
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "noteOn" | "send_note_on" => Some(Method::NoteOn),
            "noteOff" | "send_note_off" => Some(Method::NoteOff),
            "controlChange" | "send_control_change" => Some(Method::ControlChange),
            "programChange" | "send_program_change" => Some(Method::ProgramChange),
            "runSequence" | "send_midi_sequence" => Some(Method::RunSequence),
            "listPorts" => Some(Method::ListPorts),
            _ => None,
        }
    }
}

/// Incoming call
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Request {
    #[serde(default)]
    pub id: Value,
    pub method: String,
    #[serde(default)]
    pub params: Value,
}

/// Error payload
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RpcError {
    pub code: i32,
    pub message: String,
}

/// Outgoing reply
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Response {
    pub jsonrpc: String,
    pub id: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcError>,
}

impl Response {
    pub fn success(id: Value, result: Value) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            result: Some(result),
            error: None,
        }
    }

    pub fn failure(id: Value, code: i32, message: impl Into<String>) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            result: None,
            error: Some(RpcError {
                code,
                message: message.into(),
            }),
        }
    }
}

#[derive(Debug, Deserialize)]
struct NoteParams {
    note: i64,
    #[serde(default)]
    velocity: Option<i64>,
    #[serde(default)]
    channel: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct ControlParams {
    controller: i64,
    value: i64,
    #[serde(default)]
    channel: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct ProgramParams {
    program: i64,
    #[serde(default)]
    channel: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct SequenceParams {
    events: Vec<Value>,
}

/// Parse one request line, run it, and build the reply
pub async fn handle_line(service: &MidiService, line: &str) -> Response {
    handle_bytes(service, line.as_bytes()).await
}

/// Same as [`handle_line`] for a line that may not be valid UTF-8
pub async fn handle_bytes(service: &MidiService, line: &[u8]) -> Response {
    match serde_json::from_slice::<Request>(line) {
        Ok(request) => handle_request(service, request).await,
        Err(e) => {
            warn!("Unparseable request: {}", e);
            Response::failure(Value::Null, PARSE_ERROR, format!("Parse error: {}", e))
        }
    }
}

/// Dispatch a parsed request
pub async fn handle_request(service: &MidiService, request: Request) -> Response {
    let Request { id, method: name, params } = request;

    let Some(method) = Method::from_name(&name) else {
        return Response::failure(id, METHOD_NOT_FOUND, format!("Unknown method: {}", name));
    };

    match dispatch(service, method, params).await {
        Ok(result) => Response::success(id, result),
        Err((code, message)) => {
            warn!(?method, code, "{}", message);
            Response::failure(id, code, message)
        }
    }
}

async fn dispatch(service: &MidiService, method: Method, params: Value) -> Result<Value, (i32, String)> {
    match method {
        Method::NoteOn => {
            let p: NoteParams = parse_params(params)?;
            to_value(service.note_on(p.note, p.velocity.unwrap_or(NOTE_ON_VELOCITY), p.channel.unwrap_or(0)))
        }
        Method::NoteOff => {
            let p: NoteParams = parse_params(params)?;
            to_value(service.note_off(p.note, p.velocity.unwrap_or(NOTE_OFF_VELOCITY), p.channel.unwrap_or(0)))
        }
        Method::ControlChange => {
            let p: ControlParams = parse_params(params)?;
            to_value(service.control_change(p.controller, p.value, p.channel.unwrap_or(0)))
        }
        Method::ProgramChange => {
            let p: ProgramParams = parse_params(params)?;
            to_value(service.program_change(p.program, p.channel.unwrap_or(0)))
        }
        Method::RunSequence => {
            let p: SequenceParams = parse_params(params)?;
            let outcome = match parse_events(&p.events) {
                Ok(events) => service.run_sequence(&events).await,
                Err(e) => Err(e.into()),
            };
            to_value(outcome)
        }
        Method::ListPorts => to_value(Ok(service.list_ports())),
    }
}

fn parse_params<T: DeserializeOwned>(params: Value) -> Result<T, (i32, String)> {
    // Absent params behave like an empty object so defaults can apply
    let params = if params.is_null() {
        Value::Object(Default::default())
    } else {
        params
    };
    serde_json::from_value(params).map_err(|e| (INVALID_PARAMS, format!("Invalid params: {}", e)))
}

fn to_value<T: Serialize>(outcome: crate::error::Result<T>) -> Result<Value, (i32, String)> {
    match outcome {
        Ok(body) => serde_json::to_value(body)
            .map_err(|e| (TRANSPORT_ERROR, format!("Failed to encode result: {}", e))),
        Err(e @ Error::Validation(_)) => Err((INVALID_PARAMS, e.to_string())),
        Err(e) => Err((TRANSPORT_ERROR, e.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::midi::{MemoryOutput, OutputSink};
    use serde_json::json;

    fn service() -> (MidiService, MemoryOutput) {
        let output = MemoryOutput::new();
        (MidiService::new(OutputSink::new(output.clone())), output)
    }

    #[test]
    fn test_method_aliases() {
        assert_eq!(Method::from_name("noteOn"), Some(Method::NoteOn));
        assert_eq!(Method::from_name("send_note_on"), Some(Method::NoteOn));
        assert_eq!(Method::from_name("send_midi_sequence"), Some(Method::RunSequence));
        assert_eq!(Method::from_name("programChange"), Some(Method::ProgramChange));
        assert_eq!(Method::from_name("NoteOn"), None);
    }

    #[tokio::test]
    async fn test_note_on_defaults() {
        let (service, output) = service();
        let response = handle_line(&service, r#"{"id": 1, "method": "noteOn", "params": {"note": 60}}"#).await;

        assert_eq!(response.id, json!(1));
        assert_eq!(response.error, None);
        assert_eq!(response.result.unwrap()["status"], "success");
        assert_eq!(output.bytes(), vec![vec![0x90, 60, 127]]);
    }

    #[tokio::test]
    async fn test_note_off_default_velocity() {
        let (service, output) = service();
        handle_line(&service, r#"{"id": 2, "method": "send_note_off", "params": {"note": 60, "channel": 1}}"#).await;
        assert_eq!(output.bytes(), vec![vec![0x81, 60, 64]]);
    }

    #[tokio::test]
    async fn test_parse_error() {
        let (service, _) = service();
        let response = handle_line(&service, "{not json").await;
        assert_eq!(response.id, Value::Null);
        assert_eq!(response.error.unwrap().code, PARSE_ERROR);
    }

    #[tokio::test]
    async fn test_unknown_method() {
        let (service, _) = service();
        let response = handle_line(&service, r#"{"id": "a", "method": "pitchBend"}"#).await;
        assert_eq!(response.id, json!("a"));
        let error = response.error.unwrap();
        assert_eq!(error.code, METHOD_NOT_FOUND);
        assert!(error.message.contains("pitchBend"));
    }

    #[tokio::test]
    async fn test_missing_and_mistyped_params() {
        let (service, output) = service();

        let response = handle_line(&service, r#"{"id": 3, "method": "controlChange", "params": {"value": 1}}"#).await;
        assert_eq!(response.error.unwrap().code, INVALID_PARAMS);

        let response = handle_line(&service, r#"{"id": 4, "method": "noteOn"}"#).await;
        assert_eq!(response.error.unwrap().code, INVALID_PARAMS);

        let response = handle_line(&service, r#"{"id": 5, "method": "noteOn", "params": {"note": "C4"}}"#).await;
        assert_eq!(response.error.unwrap().code, INVALID_PARAMS);

        assert!(output.is_empty());
    }

    #[tokio::test]
    async fn test_validation_error_message() {
        let (service, _) = service();
        let response = handle_line(&service, r#"{"id": 6, "method": "noteOn", "params": {"note": 60, "channel": 16}}"#).await;

        let error = response.error.unwrap();
        assert_eq!(error.code, INVALID_PARAMS);
        assert_eq!(error.message, "Channel must be between 0 and 15");
    }

    #[tokio::test]
    async fn test_transport_error_code() {
        let service = MidiService::new(OutputSink::new(MemoryOutput::failing_when(|_| true)));
        let response = handle_line(&service, r#"{"id": 7, "method": "programChange", "params": {"program": 1}}"#).await;
        assert_eq!(response.error.unwrap().code, TRANSPORT_ERROR);
    }

    #[tokio::test(start_paused = true)]
    async fn test_sequence_over_protocol() {
        let (service, _) = service();
        let line = json!({
            "id": 8,
            "method": "runSequence",
            "params": { "events": [{ "note": 60, "duration": 0.01 }] }
        })
        .to_string();

        let result = handle_line(&service, &line).await.result.unwrap();
        assert_eq!(result["status"], "success");
        assert_eq!(result["message"], "Successfully processed 1 events.");
        assert_eq!(result["results"].as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_sequence_validation_names_index() {
        let (service, output) = service();
        let line = json!({
            "id": 9,
            "method": "runSequence",
            "params": { "events": [{ "note": 60, "duration": 0.01 }, { "duration": 0.01 }] }
        })
        .to_string();

        let error = handle_line(&service, &line).await.error.unwrap();
        assert_eq!(error.code, INVALID_PARAMS);
        assert_eq!(error.message, "Event 1: 'note' is required.");
        assert!(output.is_empty());
    }

    #[tokio::test]
    async fn test_invalid_utf8_is_parse_error() {
        let (service, output) = service();
        let response = handle_bytes(&service, b"\xff\xfe{}\n").await;
        assert_eq!(response.id, Value::Null);
        assert_eq!(response.error.unwrap().code, PARSE_ERROR);
        assert!(output.is_empty());
    }

    #[tokio::test]
    async fn test_null_channel_uses_default() {
        let (service, output) = service();
        for line in [
            r#"{"id": 1, "method": "noteOn", "params": {"note": 60, "channel": null}}"#,
            r#"{"id": 2, "method": "controlChange", "params": {"controller": 7, "value": 90, "channel": null}}"#,
            r#"{"id": 3, "method": "programChange", "params": {"program": 4, "channel": null}}"#,
        ] {
            let response = handle_line(&service, line).await;
            assert_eq!(response.error, None);
        }
        assert_eq!(
            output.bytes(),
            vec![vec![0x90, 60, 127], vec![0xB0, 7, 90], vec![0xC0, 4]]
        );
    }

    #[tokio::test]
    async fn test_non_object_event_names_index() {
        let (service, output) = service();
        let line = json!({
            "id": 10,
            "method": "runSequence",
            "params": { "events": [{ "note": 60, "duration": 0.01 }, 60] }
        })
        .to_string();

        let error = handle_line(&service, &line).await.error.unwrap();
        assert_eq!(error.code, INVALID_PARAMS);
        assert_eq!(error.message, "Event 1: must be an object");
        assert!(output.is_empty());
    }

    #[test]
    fn test_response_omits_empty_fields() {
        let encoded = serde_json::to_value(Response::success(json!(1), json!({}))).unwrap();
        assert!(encoded.get("error").is_none());
        assert_eq!(encoded["jsonrpc"], "2.0");
    }
}
