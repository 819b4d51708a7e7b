//! The fixed call sequence and the driver that runs it.
//!
//! CHANGELOG:
//! - 10/14/2026 - Initial implementation

use std::io::Write;
use std::time::Duration;

use crate::connection::Transport;
use crate::error::{CallFailure, ClientError};
use crate::protocol::{Request, Response};

/// Time budget for each call, measured from the moment it is issued.
pub const CALL_DEADLINE: Duration = Duration::from_secs(1);

/// How to issue one remote call and print its answer.
#[derive(Clone, Copy)]
pub struct CallDescriptor {
    /// Name used in the output line ("Response from RPC1: ...")
    pub label: &'static str,
    /// Remote method name
    pub method: &'static str,
    /// Build the request from the method name and token
    pub build: fn(&str, &str) -> Request,
    /// Render a successful response as one line of text
    pub render: fn(&Response) -> String,
}

/// The two calls made on every run, in order.
pub fn default_calls() -> [CallDescriptor; 2] {
    [
        CallDescriptor {
            label: "RPC1",
            method: "user_to_user_info",
            build: token_request,
            render: render_result,
        },
        CallDescriptor {
            label: "RPC2",
            method: "struct_to_user_attributes",
            build: token_request,
            render: render_result,
        },
    ]
}

/// Request whose only parameter is the token.
pub fn token_request(method: &str, token: &str) -> Request {
    Request::with_token(method, token)
}

/// Compact JSON of `result`, or `null` when the service sent none.
pub fn render_result(response: &Response) -> String {
    let result = response.result.as_ref().unwrap_or(&serde_json::Value::Null);
    serde_json::to_string(result).unwrap_or_else(|_| "null".to_string())
}

/// Run `calls` in order over `transport`, writing one line per response.
///
/// Stops at the first failure; later calls are not sent.
pub fn run_calls<T, W>(
    transport: &mut T,
    token: &str,
    calls: &[CallDescriptor],
    deadline: Duration,
    out: &mut W,
) -> Result<(), ClientError>
where
    T: Transport + ?Sized,
    W: Write,
{
    for call in calls {
        let request = (call.build)(call.method, token);
        let response = transport.call(&request, deadline)?;

        if !response.ok {
            let (code, message) = response
                .error
                .map(|e| (e.code, e.message))
                .unwrap_or_else(|| ("ERROR".to_string(), "unknown error".to_string()));
            return Err(ClientError::call(call.method, CallFailure::Remote { code, message }));
        }

        writeln!(out, "Response from {}: {}", call.label, (call.render)(&response))
            .map_err(ClientError::Output)?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::ErrorPayload;
    use serde_json::json;
    use std::collections::VecDeque;

    /// Replays canned results and records every request it was given.
    struct ScriptedTransport {
        replies: VecDeque<Result<Response, ClientError>>,
        seen: Vec<(Request, Duration)>,
    }

    impl ScriptedTransport {
        fn new(replies: Vec<Result<Response, ClientError>>) -> Self {
            Self {
                replies: replies.into(),
                seen: Vec::new(),
            }
        }
    }

    impl Transport for ScriptedTransport {
        fn call(&mut self, request: &Request, deadline: Duration) -> Result<Response, ClientError> {
            self.seen.push((request.clone(), deadline));
            self.replies
                .pop_front()
                .unwrap_or_else(|| Err(ClientError::call(&request.method, CallFailure::EmptyResponse)))
        }
    }

    fn ok(result: serde_json::Value) -> Result<Response, ClientError> {
        Ok(Response::success("id".to_string(), result, 0.1))
    }

    fn output(buf: Vec<u8>) -> String {
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn test_default_calls_order() {
        let calls = default_calls();
        assert_eq!(calls[0].label, "RPC1");
        assert_eq!(calls[0].method, "user_to_user_info");
        assert_eq!(calls[1].label, "RPC2");
        assert_eq!(calls[1].method, "struct_to_user_attributes");
    }

    #[test]
    fn test_both_calls_printed_in_order() {
        let mut transport = ScriptedTransport::new(vec![
            ok(json!({"user": "ana"})),
            ok(json!({"attrs": [1, 2]})),
        ]);
        let mut out = Vec::new();

        run_calls(&mut transport, "abc123", &default_calls(), CALL_DEADLINE, &mut out).unwrap();

        assert_eq!(
            output(out),
            "Response from RPC1: {\"user\":\"ana\"}\nResponse from RPC2: {\"attrs\":[1,2]}\n"
        );
        let methods: Vec<&str> = transport.seen.iter().map(|(r, _)| r.method.as_str()).collect();
        assert_eq!(methods, ["user_to_user_info", "struct_to_user_attributes"]);
    }

    #[test]
    fn test_every_request_carries_token_and_deadline() {
        let mut transport = ScriptedTransport::new(vec![ok(json!(1)), ok(json!(2))]);
        let mut out = Vec::new();

        run_calls(&mut transport, "abc123", &default_calls(), CALL_DEADLINE, &mut out).unwrap();

        for (request, deadline) in &transport.seen {
            assert_eq!(request.token(), Some("abc123"));
            assert_eq!(*deadline, Duration::from_secs(1));
        }
    }

    #[test]
    fn test_first_deadline_stops_sequence() {
        let mut transport = ScriptedTransport::new(vec![
            Err(ClientError::DeadlineExceeded {
                method: "user_to_user_info".to_string(),
                deadline_ms: 1000,
            }),
            ok(json!({})),
        ]);
        let mut out = Vec::new();

        let err = run_calls(&mut transport, "t", &default_calls(), CALL_DEADLINE, &mut out)
            .unwrap_err();

        assert!(matches!(err, ClientError::DeadlineExceeded { .. }));
        assert_eq!(transport.seen.len(), 1);
        assert!(out.is_empty());
    }

    #[test]
    fn test_second_failure_keeps_first_line() {
        let mut transport = ScriptedTransport::new(vec![
            ok(json!("first")),
            Err(ClientError::call(
                "struct_to_user_attributes",
                std::io::Error::from(std::io::ErrorKind::ConnectionReset),
            )),
        ]);
        let mut out = Vec::new();

        let err = run_calls(&mut transport, "t", &default_calls(), CALL_DEADLINE, &mut out)
            .unwrap_err();

        assert!(matches!(err, ClientError::Call { reason: CallFailure::Io(_), .. }));
        assert_eq!(output(out), "Response from RPC1: \"first\"\n");
    }

    #[test]
    fn test_remote_error_is_call_error() {
        let mut transport = ScriptedTransport::new(vec![Ok(Response {
            id: "id".to_string(),
            ok: false,
            result: None,
            error: Some(ErrorPayload {
                code: "UNAUTHENTICATED".to_string(),
                message: "bad token".to_string(),
                details: None,
            }),
            meta: None,
        })]);
        let mut out = Vec::new();

        let err = run_calls(&mut transport, "t", &default_calls(), CALL_DEADLINE, &mut out)
            .unwrap_err();

        match err {
            ClientError::Call {
                method,
                reason: CallFailure::Remote { code, message },
            } => {
                assert_eq!(method, "user_to_user_info");
                assert_eq!(code, "UNAUTHENTICATED");
                assert_eq!(message, "bad token");
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(transport.seen.len(), 1);
    }

    #[test]
    fn test_render_missing_result_is_null() {
        let response: Response = serde_json::from_str(r#"{"id":"1","ok":true}"#).unwrap();
        assert_eq!(render_result(&response), "null");
    }

    #[test]
    fn test_custom_descriptor() {
        fn upper(response: &Response) -> String {
            render_result(response).to_uppercase()
        }
        let calls = [CallDescriptor {
            label: "Custom",
            method: "echo",
            build: token_request,
            render: upper,
        }];
        let mut transport = ScriptedTransport::new(vec![ok(json!("hi"))]);
        let mut out = Vec::new();

        run_calls(&mut transport, "t", &calls, Duration::from_millis(50), &mut out).unwrap();

        assert_eq!(output(out), "Response from Custom: \"HI\"\n");
        assert_eq!(transport.seen[0].1, Duration::from_millis(50));
    }

    /// Writer whose every write fails as if stdout were closed.
    struct ClosedPipe;

    impl Write for ClosedPipe {
        fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
            Err(std::io::Error::from(std::io::ErrorKind::BrokenPipe))
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_output_failure_stops_sequence() {
        let mut transport = ScriptedTransport::new(vec![ok(json!(1)), ok(json!(2))]);

        let err = run_calls(&mut transport, "t", &default_calls(), CALL_DEADLINE, &mut ClosedPipe)
            .unwrap_err();

        assert!(matches!(err, ClientError::Output(ref e) if e.kind() == std::io::ErrorKind::BrokenPipe));
        assert_eq!(transport.seen.len(), 1);
    }
}
