use std::os::unix::net::UnixStream;
use std::path::Path;

use tracing::debug;

use crate::error::{Result, TransportError};
use crate::traits::SerialStream;

/// UNIX-socket serial bridge.
///
/// The host side of the UART is usually exported as a socket by a bridge such
/// as `socat UNIX-LISTEN:/tmp/growbox.sock /dev/ttyUSB0,raw`.
#[derive(Debug)]
pub struct SerialBridge;

impl SerialBridge {
    /// Maximum socket path length.
    /// Unix `sockaddr_un.sun_path` is typically 108 bytes on Linux, 104 on macOS.
    #[cfg(target_os = "linux")]
    const MAX_PATH_LEN: usize = 108;
    #[cfg(not(target_os = "linux"))]
    const MAX_PATH_LEN: usize = 104;

    /// Connect to a serial bridge socket (blocking).
    pub fn connect(path: impl AsRef<Path>) -> Result<SerialStream> {
        let path = path.as_ref();

        let len = path.as_os_str().len();
        if len >= Self::MAX_PATH_LEN {
            return Err(TransportError::PathTooLong {
                path: path.to_path_buf(),
                len,
                max: Self::MAX_PATH_LEN,
            });
        }

        let stream = UnixStream::connect(path).map_err(|e| TransportError::Connect {
            path: path.to_path_buf(),
            source: e,
        })?;
        debug!(?path, "connected to serial bridge");
        Ok(SerialStream::from_unix(stream))
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;
    use std::os::unix::net::UnixListener;
    use std::path::PathBuf;
    use std::time::Duration;

    use bytes::BytesMut;

    use super::*;
    use crate::traits::ByteSource;
    use crate::uart::{LinkConfig, UartLink};

    fn temp_dir(tag: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("growlink-{tag}-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn bridge_carries_bytes_and_times_out_reads() {
        let dir = temp_dir("bridge");
        let sock_path = dir.join("uart.sock");
        let _ = std::fs::remove_file(&sock_path);
        let device = UnixListener::bind(&sock_path).unwrap();

        let device = std::thread::spawn(move || {
            let (mut stream, _) = device.accept().unwrap();
            stream.write_all(b"at+recv_data=").unwrap();
            stream
        });

        let stream = SerialBridge::connect(&sock_path).unwrap();
        let _device = device.join().unwrap();

        let config = LinkConfig {
            read_timeout: Some(Duration::from_millis(20)),
            ..LinkConfig::default()
        };
        let mut link = UartLink::with_config_serial(stream, config).unwrap();

        let mut dst = BytesMut::new();
        assert_eq!(link.read_exact(13, &mut dst).unwrap(), 13);
        assert_eq!(dst.as_ref(), b"at+recv_data=");

        // Device is idle: the read times out instead of failing.
        assert_eq!(link.read_exact(1, &mut dst).unwrap(), 0);
        assert!(!link.is_closed());

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn path_too_long() {
        let long_path = "/tmp/".to_string() + &"a".repeat(200) + ".sock";
        let result = SerialBridge::connect(&long_path);
        assert!(matches!(result, Err(TransportError::PathTooLong { .. })));
    }

    #[test]
    fn connect_to_missing_socket_fails() {
        let dir = temp_dir("missing");
        let result = SerialBridge::connect(dir.join("absent.sock"));
        assert!(matches!(result, Err(TransportError::Connect { .. })));
        let _ = std::fs::remove_dir_all(&dir);
    }
}
