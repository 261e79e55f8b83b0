//! Real HTTP round trips against a loopback listener.

use std::io::{BufRead, BufReader, Write};
use std::net::TcpListener;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use visnav_core::{MotionCommand, MotionKind};
use visnav_dispatch::{
    CommandDispatcher, CommandRequest, DispatchOutcome, DispatchPolicy, Endpoint, HttpTransport,
    Transport, TransportError,
};

/// Serve `responses.len()` connections, answering each with the given status
/// line. Returns the request lines received.
fn serve(responses: Vec<&'static str>) -> (String, JoinHandle<Vec<String>>) {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind loopback");
    let addr = listener.local_addr().expect("local addr");
    let handle = thread::spawn(move || {
        let mut seen = Vec::new();
        for status in responses {
            let (stream, _) = listener.accept().expect("accept");
            let mut reader = BufReader::new(stream);
            let mut request_line = String::new();
            reader.read_line(&mut request_line).expect("request line");
            loop {
                let mut header = String::new();
                let n = reader.read_line(&mut header).expect("header");
                if n == 0 || header == "\r\n" {
                    break;
                }
            }
            seen.push(request_line.trim_end().to_string());
            let mut stream = reader.into_inner();
            write!(
                stream,
                "HTTP/1.1 {status}\r\nContent-Length: 0\r\nConnection: close\r\n\r\n"
            )
            .expect("respond");
            stream.flush().expect("flush");
        }
        seen
    });
    (format!("http://{addr}"), handle)
}

fn transport() -> HttpTransport {
    HttpTransport::new(Duration::from_secs(2)).expect("client")
}

#[test]
fn query_command_reaches_the_robot() {
    let (root, server) = serve(vec!["200 OK"]);
    let endpoint = Endpoint::Query {
        base: format!("{root}/control"),
    };
    let mut dispatcher =
        CommandDispatcher::new(endpoint, transport(), DispatchPolicy::Deduplicated);

    let outcome = dispatcher.dispatch(MotionCommand::new(MotionKind::Right, 255));
    assert_eq!(outcome, DispatchOutcome::Sent);

    let seen = server.join().expect("server thread");
    assert_eq!(seen, vec!["GET /control?cmd=right&speed=255 HTTP/1.1"]);
}

#[test]
fn path_command_is_two_requests() {
    let (root, server) = serve(vec!["200 OK", "200 OK"]);
    let mut dispatcher = CommandDispatcher::new(
        Endpoint::Paths { base: root },
        transport(),
        DispatchPolicy::Unconditional,
    );
    assert_eq!(
        dispatcher.dispatch(MotionCommand::new(MotionKind::Backward, 120)),
        DispatchOutcome::Sent
    );
    let seen = server.join().expect("server thread");
    assert_eq!(
        seen,
        vec!["GET /setSpeed?value=120 HTTP/1.1", "GET /reverse HTTP/1.1"]
    );
}

#[test]
fn non_success_status_is_an_error() {
    let (root, server) = serve(vec!["500 Internal Server Error"]);
    let mut http = transport();
    let err = http
        .send(&CommandRequest::new(format!("{root}/control?cmd=stop&speed=0")))
        .unwrap_err();
    assert!(matches!(err, TransportError::Status { status: 500, .. }));
    server.join().expect("server thread");
}

#[test]
fn unreachable_robot_fails_without_panicking() {
    let addr = {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind loopback");
        listener.local_addr().expect("local addr")
    };
    let endpoint = Endpoint::Query {
        base: format!("http://{addr}/control"),
    };
    let mut dispatcher =
        CommandDispatcher::new(endpoint, transport(), DispatchPolicy::Deduplicated);
    assert_eq!(dispatcher.dispatch(MotionCommand::STOP), DispatchOutcome::Failed);
    assert_eq!(dispatcher.last_sent(), None);
}
