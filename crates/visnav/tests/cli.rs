use std::io::{BufRead, BufReader, Write};
use std::net::{SocketAddr, TcpListener};
use std::thread::{self, JoinHandle};

use assert_cmd::Command;
use image::{GrayImage, Luma};
use predicates::prelude::*;

fn visnav() -> Command {
    Command::cargo_bin("visnav").expect("visnav binary")
}

/// Answer `count` requests with 200 and return their request lines.
fn serve_requests(count: usize) -> (SocketAddr, JoinHandle<Vec<String>>) {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind loopback");
    let addr = listener.local_addr().expect("addr");
    let server = thread::spawn(move || {
        let mut seen = Vec::new();
        for _ in 0..count {
            let (stream, _) = listener.accept().expect("accept");
            let mut reader = BufReader::new(stream);
            let mut line = String::new();
            reader.read_line(&mut line).expect("request line");
            loop {
                let mut header = String::new();
                if reader.read_line(&mut header).expect("header") == 0 || header == "\r\n" {
                    break;
                }
            }
            seen.push(line.trim_end().to_string());
            let mut stream = reader.into_inner();
            stream
                .write_all(b"HTTP/1.1 200 OK\r\nContent-Length: 0\r\nConnection: close\r\n\r\n")
                .expect("respond");
        }
        seen
    });
    (addr, server)
}

fn open_map(dir: &std::path::Path, rows: usize, cols: usize) -> std::path::PathBuf {
    let path = dir.join("open.txt");
    let row = "0".repeat(cols);
    let text = vec![row; rows].join("\n");
    std::fs::write(&path, text).expect("write map");
    path
}

#[test]
fn plan_prints_the_shortest_path() {
    let dir = tempfile::tempdir().expect("tempdir");
    let map = open_map(dir.path(), 20, 20);

    let output = visnav()
        .args(["plan", "--start", "10,10", "--goal", "5,5", "--map"])
        .arg(&map)
        .output()
        .expect("run");
    assert!(output.status.success());

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).expect("json");
    assert_eq!(json["found"], true);
    assert_eq!(json["steps"], 10);
    assert_eq!(json["path"].as_array().map(Vec::len), Some(11));
    assert_eq!(json["path"][0], serde_json::json!({"row": 10, "col": 10}));
}

#[test]
fn plan_rejects_cells_outside_the_map() {
    let dir = tempfile::tempdir().expect("tempdir");
    let map = open_map(dir.path(), 5, 5);
    visnav()
        .args(["plan", "--start", "0,0", "--goal", "9,9", "--map"])
        .arg(&map)
        .assert()
        .failure()
        .stderr(predicate::str::contains("outside the 5x5 grid"));
}

#[test]
fn plan_rejects_malformed_cells() {
    visnav()
        .args(["plan", "--map", "x.txt", "--start", "3", "--goal", "1,1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("row,col"));
}

#[test]
fn track_fails_fast_on_an_empty_frame_directory() {
    let dir = tempfile::tempdir().expect("tempdir");
    visnav()
        .args(["track", "--frames"])
        .arg(dir.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("cannot open frame source"));
}

#[test]
fn track_writes_a_run_summary() {
    let dir = tempfile::tempdir().expect("tempdir");
    let frames = dir.path().join("frames");
    std::fs::create_dir(&frames).expect("mkdir");
    for i in 0..3 {
        GrayImage::from_pixel(32, 32, Luma([255]))
            .save(frames.join(format!("{i}.png")))
            .expect("write frame");
    }
    let report = dir.path().join("summary.json");

    visnav()
        .args(["track", "--hold-on-loss", "--max-frames", "2"])
        .args(["--endpoint", "http://127.0.0.1:9/control"])
        .arg("--frames")
        .arg(&frames)
        .arg("--report")
        .arg(&report)
        .assert()
        .success()
        .stdout(predicate::str::contains("\"frames\": 2"));

    let summary: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&report).expect("report")).expect("json");
    assert_eq!(summary["acquiring_frames"], 2);
    assert_eq!(summary["ended_by"], "frame_limit");
    assert_eq!(summary["final_state"], "stopped");
    assert_eq!(summary["commands"], 1);
    assert_eq!(summary["queued"], 1);
    // Nothing listens on the discard port, so the final stop fails.
    assert_eq!(summary["failed"], 1);
    assert_eq!(summary["sent"], 0);
}

#[test]
fn detect_reports_robot_marker() {
    let dir = tempfile::tempdir().expect("tempdir");
    let code = qrcode::QrCode::new(b"car-7").expect("encodable");
    let modules = code.width() as u32;
    let mut frame = GrayImage::from_pixel(200, 200, Luma([255]));
    for (i, color) in code.to_colors().into_iter().enumerate() {
        if color == qrcode::Color::Dark {
            let (mx, my) = (i as u32 % modules, i as u32 / modules);
            for d in 0..25 {
                frame.put_pixel(40 + mx * 5 + d % 5, 40 + my * 5 + d / 5, Luma([0]));
            }
        }
    }
    let path = dir.path().join("frame.png");
    frame.save(&path).expect("write frame");

    visnav()
        .arg("detect")
        .arg("--image")
        .arg(&path)
        .assert()
        .success()
        .stdout(predicate::str::contains("\"role\": \"robot\""))
        .stdout(predicate::str::contains("\"payload\": \"car-7\""))
        .stdout(predicate::str::contains("\"pose\": null"));
}

#[test]
fn drive_sends_each_transition_once() {
    let (addr, server) = serve_requests(2);

    visnav()
        .args(["drive", "--endpoint"])
        .arg(format!("http://{addr}/control"))
        .write_stdin("forward 200\nforward 200\n# pause\nstop\nq\nleft 90\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("forward@200 Sent"))
        .stdout(predicate::str::contains("forward@200 Suppressed"))
        .stdout(predicate::str::contains("\"suppressed\": 2"));

    let seen = server.join().expect("server thread");
    assert_eq!(
        seen,
        vec![
            "GET /control?cmd=forward&speed=200 HTTP/1.1",
            "GET /control?cmd=stop&speed=0 HTTP/1.1",
        ]
    );
}

#[test]
fn drive_stops_the_robot_when_stdin_breaks() {
    let (addr, server) = serve_requests(2);

    visnav()
        .args(["drive", "--endpoint"])
        .arg(format!("http://{addr}/control"))
        .write_stdin(b"left 90\n\xff\xfe\nright 90\n".to_vec())
        .assert()
        .failure()
        .stderr(predicate::str::contains("reading stdin"));

    let seen = server.join().expect("server thread");
    assert_eq!(
        seen,
        vec![
            "GET /control?cmd=left&speed=90 HTTP/1.1",
            "GET /control?cmd=stop&speed=0 HTTP/1.1",
        ]
    );
}
