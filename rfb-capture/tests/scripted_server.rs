//! End-to-end tests against a scripted RFB server.
//!
//! Each test binds a loopback listener and plays a canned byte script on
//! its own thread while the client under test connects from the test
//! thread. Joining the server thread at the end surfaces any assertion
//! about what the client actually put on the wire.

use pretty_assertions::assert_eq;
use rfb_capture::{AuthError, Config, RetryPolicy, RfbError, SessionState, VncSession};
use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// 32 bpp true-colour, depth 24, little-endian, shifts 16/8/0.
const PF_RGB32: [u8; 16] = [
    32, 24, 0, 1, 0, 255, 0, 255, 0, 255, 16, 8, 0, 0, 0, 0,
];

fn spawn_server(
    script: impl FnOnce(&mut TcpStream) + Send + 'static,
) -> (String, u16, JoinHandle<()>) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    let handle = thread::spawn(move || {
        let (mut stream, _) = listener.accept().unwrap();
        script(&mut stream);
    });
    (addr.ip().to_string(), addr.port(), handle)
}

fn read_n(stream: &mut TcpStream, n: usize) -> Vec<u8> {
    let mut buf = vec![0u8; n];
    stream.read_exact(&mut buf).unwrap();
    buf
}

/// Version exchange and a security list offering only "None".
fn serve_version_and_none(stream: &mut TcpStream) {
    stream.write_all(b"RFB 003.008\n").unwrap();
    assert_eq!(read_n(stream, 12), b"RFB 003.008\n");
    stream.write_all(&[1, 1]).unwrap();
    assert_eq!(read_n(stream, 1), [1]);
}

/// ClientInit/ServerInit, the SetEncodings declaration, and the client's
/// best-effort priming request (answered with zero rectangles).
fn serve_init(stream: &mut TcpStream, width: u16, height: u16) {
    assert_eq!(read_n(stream, 1), [1]); // ClientInit: shared

    let mut init = Vec::new();
    init.extend_from_slice(&width.to_be_bytes());
    init.extend_from_slice(&height.to_be_bytes());
    init.extend_from_slice(&PF_RGB32);
    let name = b"scripted";
    init.extend_from_slice(&(name.len() as u32).to_be_bytes());
    init.extend_from_slice(name);
    stream.write_all(&init).unwrap();

    // SetEncodings: raw only.
    assert_eq!(read_n(stream, 8), [2, 0, 0, 1, 0, 0, 0, 0]);

    // Priming request is non-incremental and covers the full screen.
    let request = read_n(stream, 10);
    assert_eq!(request[0], 3);
    assert_eq!(request[1], 0);
    stream.write_all(&[0, 0, 0, 0]).unwrap();
}

fn serve_handshake(stream: &mut TcpStream, width: u16, height: u16) {
    serve_version_and_none(stream);
    serve_init(stream, width, height);
}

/// Read one FramebufferUpdateRequest, returning (incremental, x, y, w, h).
fn expect_update_request(stream: &mut TcpStream) -> (bool, u16, u16, u16, u16) {
    let raw = read_n(stream, 10);
    assert_eq!(raw[0], 3);
    let word = |i: usize| u16::from_be_bytes([raw[i], raw[i + 1]]);
    (raw[1] == 1, word(2), word(4), word(6), word(8))
}

/// Write a FramebufferUpdate of raw-encoded rectangles.
fn write_raw_update(stream: &mut TcpStream, rects: &[(u16, u16, u16, u16, Vec<u8>)]) {
    let mut msg = vec![0u8, 0];
    msg.extend_from_slice(&(rects.len() as u16).to_be_bytes());
    for (x, y, w, h, payload) in rects {
        msg.extend_from_slice(&x.to_be_bytes());
        msg.extend_from_slice(&y.to_be_bytes());
        msg.extend_from_slice(&w.to_be_bytes());
        msg.extend_from_slice(&h.to_be_bytes());
        msg.extend_from_slice(&0i32.to_be_bytes());
        msg.extend_from_slice(payload);
    }
    stream.write_all(&msg).unwrap();
}

fn solid_bgra(width: u16, height: u16, bgra: [u8; 4]) -> Vec<u8> {
    bgra.repeat(width as usize * height as usize)
}

fn test_config(host: &str, port: u16) -> Config {
    Config::builder()
        .host(host)
        .port(port)
        .timeout_ms(2_000)
        .retry(RetryPolicy {
            max_attempts: 3,
            backoff_step_ms: 1,
            send_nudges: false,
        })
        .build()
        .unwrap()
}

#[test]
fn decodes_a_bgra_rectangle_end_to_end() {
    let (host, port, server) = spawn_server(|stream| {
        serve_handshake(stream, 2, 2);

        let (incremental, x, y, w, h) = expect_update_request(stream);
        assert!(!incremental);
        assert_eq!((x, y, w, h), (0, 0, 2, 2));
        let payload = vec![
            0x00, 0x00, 0xFF, 0xFF, // red
            0x00, 0xFF, 0x00, 0xFF, // green
            0xFF, 0x00, 0x00, 0xFF, // blue
            0xFF, 0xFF, 0xFF, 0xFF, // white
        ];
        write_raw_update(stream, &[(0, 0, 2, 2, payload)]);
    });

    let mut session = VncSession::connect(test_config(&host, port)).unwrap();
    assert_eq!(session.state(), SessionState::Active);
    assert_eq!(session.server_name(), "scripted");
    assert_eq!((session.width(), session.height()), (2, 2));

    let region = session.request_update(0, 0, 2, 2, false).unwrap();
    assert_eq!(region.pixel(0, 0), [0xFF, 0x00, 0x00]);
    assert_eq!(region.pixel(1, 0), [0x00, 0xFF, 0x00]);
    assert_eq!(region.pixel(0, 1), [0x00, 0x00, 0xFF]);
    assert_eq!(region.pixel(1, 1), [0xFF, 0xFF, 0xFF]);

    // Full-screen update: the store replaced its buffer wholesale.
    assert!(session.has_valid_frame());
    assert_eq!(session.framebuffer().pixel(1, 1), [0xFF, 0xFF, 0xFF]);

    session.close();
    server.join().unwrap();
}

#[test]
fn clips_rectangles_to_the_requested_viewport() {
    let (host, port, server) = spawn_server(|stream| {
        serve_handshake(stream, 8, 8);

        let _ = expect_update_request(stream);
        // A rectangle at the origin that only partially overlaps the
        // viewport requested at (2,2).
        let payload = solid_bgra(4, 4, [0x01, 0x02, 0x03, 0xFF]);
        write_raw_update(stream, &[(0, 0, 4, 4, payload)]);
    });

    let mut session = VncSession::connect(test_config(&host, port)).unwrap();
    let region = session.request_update(2, 2, 4, 4, true).unwrap();

    // Overlap is the viewport's top-left 2x2 corner.
    for (x, y) in [(0u16, 0u16), (1, 0), (0, 1), (1, 1)] {
        assert_eq!(region.pixel(x, y), [0x03, 0x02, 0x01], "pixel ({x},{y})");
    }
    // Everything outside the overlap is untouched.
    for (x, y) in [(2u16, 0u16), (0, 2), (2, 2), (3, 3)] {
        assert_eq!(region.pixel(x, y), [0, 0, 0], "pixel ({x},{y})");
    }

    // The store merged the rectangle at its absolute position.
    assert_eq!(session.framebuffer().pixel(3, 3), [0x03, 0x02, 0x01]);
    assert_eq!(session.framebuffer().pixel(4, 4), [0, 0, 0]);

    session.close();
    server.join().unwrap();
}

#[test]
fn rejects_non_raw_encodings() {
    let (host, port, server) = spawn_server(|stream| {
        serve_handshake(stream, 2, 2);

        let _ = expect_update_request(stream);
        // One rectangle claiming Tight encoding.
        let mut msg = vec![0u8, 0, 0, 1];
        msg.extend_from_slice(&[0, 0, 0, 0, 0, 2, 0, 2]);
        msg.extend_from_slice(&7i32.to_be_bytes());
        stream.write_all(&msg).unwrap();
    });

    let mut session = VncSession::connect(test_config(&host, port)).unwrap();
    let err = session.request_update(0, 0, 2, 2, true).unwrap_err();
    assert!(
        matches!(err, RfbError::Protocol(_)),
        "expected protocol error, got {err:?}"
    );
    assert!(err.to_string().contains("unsupported encoding 7"));

    session.close();
    server.join().unwrap();
}

#[test]
fn rejects_rectangles_outside_the_screen() {
    let (host, port, server) = spawn_server(|stream| {
        serve_handshake(stream, 4, 4);

        let _ = expect_update_request(stream);
        // 3x3 rectangle at (2,2) runs past the 4x4 screen.
        let payload = solid_bgra(3, 3, [1, 1, 1, 0xFF]);
        write_raw_update(stream, &[(2, 2, 3, 3, payload)]);
    });

    let mut session = VncSession::connect(test_config(&host, port)).unwrap();
    let err = session.request_update(0, 0, 4, 4, true).unwrap_err();
    assert!(err.to_string().contains("exceeds"), "got {err}");

    session.close();
    server.join().unwrap();
}

#[test]
fn authenticates_with_vnc_password() {
    let (host, port, server) = spawn_server(|stream| {
        stream.write_all(b"RFB 003.008\n").unwrap();
        assert_eq!(read_n(stream, 12), b"RFB 003.008\n");

        // Offer only VNC authentication.
        stream.write_all(&[1, 2]).unwrap();
        assert_eq!(read_n(stream, 1), [2]);

        let challenge: Vec<u8> = (0u8..16).collect();
        stream.write_all(&challenge).unwrap();

        // DES response for password "passwd" over challenge 00..0f.
        let response = read_n(stream, 16);
        assert_eq!(
            response,
            [
                0xE8, 0x39, 0x9B, 0x58, 0x57, 0x1E, 0x87, 0xED, //
                0x84, 0x45, 0xC8, 0x71, 0x6B, 0x6D, 0xD9, 0x45,
            ]
        );

        stream.write_all(&0u32.to_be_bytes()).unwrap(); // SecurityResult: OK
        serve_init(stream, 2, 2);
    });

    let config = Config::builder()
        .host(&host)
        .port(port)
        .password("passwd")
        .timeout_ms(2_000)
        .build()
        .unwrap();
    let mut session = VncSession::connect(config).unwrap();
    assert_eq!(session.state(), SessionState::Active);

    session.close();
    server.join().unwrap();
}

#[test]
fn missing_password_fails_before_the_challenge() {
    let (host, port, server) = spawn_server(|stream| {
        stream.write_all(b"RFB 003.008\n").unwrap();
        assert_eq!(read_n(stream, 12), b"RFB 003.008\n");
        stream.write_all(&[1, 2]).unwrap();

        // The client must bail without even selecting a type: the next
        // read observes only the closed connection.
        let mut buf = [0u8; 1];
        match stream.read(&mut buf) {
            Ok(0) | Err(_) => {}
            Ok(n) => panic!("client sent {n} unexpected byte(s): {buf:?}"),
        }
    });

    let err = VncSession::connect(test_config(&host, port)).unwrap_err();
    assert!(
        matches!(err, RfbError::Auth(AuthError::PasswordRequired)),
        "got {err:?}"
    );
    server.join().unwrap();
}

#[test]
fn wrong_password_is_rejected() {
    let (host, port, server) = spawn_server(|stream| {
        stream.write_all(b"RFB 003.008\n").unwrap();
        let _ = read_n(stream, 12);
        stream.write_all(&[1, 2]).unwrap();
        let _ = read_n(stream, 1);
        stream.write_all(&[0u8; 16]).unwrap();
        let _ = read_n(stream, 16);
        stream.write_all(&1u32.to_be_bytes()).unwrap(); // SecurityResult: failed
    });

    let config = Config::builder()
        .host(&host)
        .port(port)
        .password("wrong")
        .timeout_ms(2_000)
        .build()
        .unwrap();
    let err = VncSession::connect(config).unwrap_err();
    assert!(matches!(err, RfbError::Auth(AuthError::Rejected)), "got {err:?}");
    server.join().unwrap();
}

#[test]
fn refusal_reason_is_reported() {
    let (host, port, server) = spawn_server(|stream| {
        stream.write_all(b"RFB 003.008\n").unwrap();
        let _ = read_n(stream, 12);

        let reason = b"too many clients";
        stream.write_all(&[0]).unwrap();
        stream.write_all(&(reason.len() as u32).to_be_bytes()).unwrap();
        stream.write_all(reason).unwrap();
    });

    let err = VncSession::connect(test_config(&host, port)).unwrap_err();
    match err {
        RfbError::Auth(AuthError::ServerRejected(reason)) => {
            assert_eq!(reason, "too many clients");
        }
        other => panic!("expected ServerRejected, got {other:?}"),
    }
    server.join().unwrap();
}

#[test]
fn non_rfb_greeting_is_a_protocol_error() {
    let (host, port, server) = spawn_server(|stream| {
        stream.write_all(b"HTTP/1.1 200").unwrap();
    });

    let err = VncSession::connect(test_config(&host, port)).unwrap_err();
    assert!(err.to_string().contains("invalid RFB greeting"), "got {err}");
    server.join().unwrap();
}

#[test]
fn capture_falls_back_to_cached_frame_after_black_retries() {
    let (host, port, server) = spawn_server(|stream| {
        serve_handshake(stream, 2, 2);

        // A good frame first, so the cache has content.
        let _ = expect_update_request(stream);
        write_raw_update(
            stream,
            &[(0, 0, 2, 2, solid_bgra(2, 2, [0x10, 0x20, 0x30, 0xFF]))],
        );

        // Then nothing but black, for every retry attempt.
        for _ in 0..3 {
            let (incremental, ..) = expect_update_request(stream);
            assert!(incremental);
            write_raw_update(stream, &[(0, 0, 2, 2, solid_bgra(2, 2, [0, 0, 0, 0]))]);
        }
    });

    let mut session = VncSession::connect(test_config(&host, port)).unwrap();

    let good = session.capture_full_screen().unwrap();
    assert_eq!(good.pixel(0, 0), [0x30, 0x20, 0x10]);

    // Exactly max_attempts requests are made, then the cache comes back.
    let fallback = session.capture_full_screen().unwrap();
    assert_eq!(fallback.pixel(0, 0), [0x30, 0x20, 0x10]);
    assert_eq!(fallback.pixel(1, 1), [0x30, 0x20, 0x10]);

    session.close();
    server.join().unwrap();
}

#[test]
fn capture_with_no_cache_returns_the_black_buffer() {
    let (host, port, server) = spawn_server(|stream| {
        serve_handshake(stream, 2, 2);
        for _ in 0..3 {
            let _ = expect_update_request(stream);
            write_raw_update(stream, &[(0, 0, 2, 2, solid_bgra(2, 2, [0, 0, 0, 0]))]);
        }
    });

    let mut session = VncSession::connect(test_config(&host, port)).unwrap();
    let frame = session.capture_full_screen().unwrap();
    assert!(frame.is_all_black());
    assert!(!session.has_valid_frame());

    session.close();
    server.join().unwrap();
}

#[test]
fn black_retries_interleave_pointer_and_key_nudges() {
    let (host, port, server) = spawn_server(|stream| {
        serve_handshake(stream, 64, 64);

        let black = || solid_bgra(64, 64, [0, 0, 0, 0]);

        let _ = expect_update_request(stream);
        write_raw_update(stream, &[(0, 0, 64, 64, black())]);

        // First nudge: pointer move to (10, 10).
        assert_eq!(read_n(stream, 6), [5, 0, 0, 10, 0, 10]);

        let _ = expect_update_request(stream);
        write_raw_update(stream, &[(0, 0, 64, 64, black())]);

        // Second nudge: Shift press and release.
        assert_eq!(
            read_n(stream, 16),
            [4, 1, 0, 0, 0, 0, 0xFF, 0xE1, 4, 0, 0, 0, 0, 0, 0xFF, 0xE1]
        );

        let _ = expect_update_request(stream);
        write_raw_update(stream, &[(0, 0, 64, 64, black())]);
    });

    let config = Config::builder()
        .host(&host)
        .port(port)
        .timeout_ms(2_000)
        .retry(RetryPolicy {
            max_attempts: 3,
            backoff_step_ms: 1,
            send_nudges: true,
        })
        .build()
        .unwrap();

    let mut session = VncSession::connect(config).unwrap();
    let frame = session.capture_full_screen().unwrap();
    assert!(frame.is_all_black());

    session.close();
    server.join().unwrap();
}

#[test]
fn input_events_have_wire_layouts() {
    let (host, port, server) = spawn_server(|stream| {
        serve_handshake(stream, 100, 100);

        // move, button down, button up at remembered position
        assert_eq!(read_n(stream, 6), [5, 0, 0, 40, 0, 50]);
        assert_eq!(read_n(stream, 6), [5, 1, 0, 40, 0, 50]);
        assert_eq!(read_n(stream, 6), [5, 0, 0, 40, 0, 50]);
        // scroll down pair
        assert_eq!(read_n(stream, 6), [5, 16, 0, 40, 0, 50]);
        assert_eq!(read_n(stream, 6), [5, 0, 0, 40, 0, 50]);
        // key event: 'a' down
        assert_eq!(read_n(stream, 8), [4, 1, 0, 0, 0, 0, 0, 0x61]);
    });

    let mut session = VncSession::connect(test_config(&host, port)).unwrap();
    session.move_to(40, 50).unwrap();
    session.click(1, Duration::from_millis(1)).unwrap();
    session.scroll_down().unwrap();
    session.key_event(true, 0x61).unwrap();

    session.close();
    server.join().unwrap();
}

#[test]
fn closed_session_refuses_operations() {
    let (host, port, server) = spawn_server(|stream| {
        serve_handshake(stream, 2, 2);
    });

    let mut session = VncSession::connect(test_config(&host, port)).unwrap();
    session.close();
    assert_eq!(session.state(), SessionState::Closed);

    let err = session.capture_full_screen().unwrap_err();
    assert!(matches!(err, RfbError::NotActive(SessionState::Closed)));
    let err = session.move_to(1, 1).unwrap_err();
    assert!(matches!(err, RfbError::NotActive(SessionState::Closed)));

    server.join().unwrap();
}
