use std::io;
use std::net::SocketAddr;
use std::sync::Arc;

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};

use super::session::ViewerSession;
use crate::render::RenderError;

/// The longest request head the viewer will read
const MAX_REQUEST_HEAD: usize = 16 * 1024;

const HTML: &str = "text/html; charset=utf-8";

/// A response ready to be written back to the browser
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub status: u16,
    pub content_type: &'static str,
    pub body: String,
}

impl Response {
    fn ok(content_type: &'static str, body: String) -> Self {
        Self {
            status: 200,
            content_type,
            body,
        }
    }

    fn status(status: u16, body: &str) -> Self {
        Self {
            status,
            content_type: "text/plain; charset=utf-8",
            body: body.to_string(),
        }
    }

    fn not_found() -> Self {
        Self::status(404, "Not Found")
    }

    fn from_render(result: Result<String, RenderError>, content_type: &'static str) -> Self {
        match result {
            Ok(body) => Self::ok(content_type, body),
            Err(RenderError::SpectrumOutOfRange { .. }) => Self::not_found(),
            Err(e) => {
                log::error!("Failed to render: {e}");
                Self::status(500, "Internal Server Error")
            }
        }
    }

    fn reason(&self) -> &'static str {
        match self.status {
            200 => "OK",
            400 => "Bad Request",
            404 => "Not Found",
            405 => "Method Not Allowed",
            _ => "Internal Server Error",
        }
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buffer = format!(
            "HTTP/1.1 {} {}\r\nContent-Type: {}\r\nContent-Length: {}\r\nCache-Control: no-store\r\nConnection: close\r\n\r\n",
            self.status,
            self.reason(),
            self.content_type,
            self.body.len()
        )
        .into_bytes();
        buffer.extend_from_slice(self.body.as_bytes());
        buffer
    }
}

fn parse_index(text: &str) -> Option<usize> {
    text.parse().ok()
}

/// Answer one request for `target`, the path and query of a `GET` request
pub fn route(session: &ViewerSession, target: &str) -> Response {
    let (path, query) = target.split_once('?').unwrap_or((target, ""));
    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    match segments.as_slice() {
        [] => {
            let selected = query
                .split('&')
                .find_map(|pair| pair.strip_prefix("spectrum="))
                .map(parse_index)
                .unwrap_or(Some(0));
            match selected {
                Some(index) => Response::from_render(session.page(index), HTML),
                None => Response::not_found(),
            }
        }
        ["plot", index] => match parse_index(index) {
            Some(index) => Response::from_render(
                session
                    .render_spectrum(index)
                    .and_then(|spectrum| spectrum.to_fragment()),
                HTML,
            ),
            None => Response::not_found(),
        },
        ["peak", index, trace, peak] => {
            match (parse_index(index), parse_index(peak)) {
                (Some(index), Some(peak)) => match session.peak_details(index, trace, peak) {
                    Some(details) => match serde_json::to_string(&details) {
                        Ok(body) => Response::ok("application/json", body),
                        Err(e) => {
                            log::error!("Failed to encode peak details: {e}");
                            Response::status(500, "Internal Server Error")
                        }
                    },
                    None => Response::not_found(),
                },
                _ => Response::not_found(),
            }
        }
        _ => Response::not_found(),
    }
}

/// Read the request line and drain the headers after it, never reading more than
/// `MAX_REQUEST_HEAD` bytes. A request line cut short by the limit comes back without
/// its line ending.
async fn read_request_line<R: AsyncBufRead + Unpin>(reader: R) -> io::Result<Option<String>> {
    let mut head = reader.take(MAX_REQUEST_HEAD as u64);
    let mut request_line = String::new();
    if head.read_line(&mut request_line).await? == 0 {
        return Ok(None);
    }
    // The viewer does not use any of the headers
    loop {
        let mut header = String::new();
        let n = head.read_line(&mut header).await?;
        if n == 0 || header == "\r\n" || header == "\n" {
            break;
        }
    }
    Ok(Some(request_line))
}

async fn handle_connection(stream: TcpStream, session: Arc<ViewerSession>) -> io::Result<()> {
    let (reader, mut writer) = stream.into_split();
    let request_line = match read_request_line(BufReader::new(reader)).await? {
        Some(line) => line,
        None => return Ok(()),
    };
    if !request_line.ends_with('\n') {
        log::debug!("Rejecting a request line longer than {MAX_REQUEST_HEAD} bytes");
        writer
            .write_all(&Response::status(400, "Bad Request").to_bytes())
            .await?;
        writer.shutdown().await?;
        return Ok(());
    }

    let mut parts = request_line.split_whitespace();
    let response = match (parts.next(), parts.next()) {
        (Some("GET"), Some(target)) => {
            log::debug!("GET {target}");
            route(&session, target)
        }
        (Some(method), Some(target)) => {
            log::debug!("Rejecting {method} {target}");
            Response::status(405, "Method Not Allowed")
        }
        _ => Response::status(400, "Bad Request"),
    };
    writer.write_all(&response.to_bytes()).await?;
    writer.shutdown().await?;
    Ok(())
}

/// Accept connections on `listener` until the process is stopped
pub async fn serve(listener: TcpListener, session: Arc<ViewerSession>) -> io::Result<()> {
    log::info!(
        "Serving {} spectra at http://{}/",
        session.len(),
        listener.local_addr()?
    );
    loop {
        let (stream, peer) = listener.accept().await?;
        log::trace!("Connection from {peer}");
        let session = Arc::clone(&session);
        tokio::spawn(async move {
            if let Err(e) = handle_connection(stream, session).await {
                log::warn!("Connection from {peer} failed: {e}");
            }
        });
    }
}

/// Serve `session` on `127.0.0.1:port`
pub async fn run_server(session: ViewerSession, port: u16) -> io::Result<()> {
    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    let listener = TcpListener::bind(addr).await?;
    serve(listener, Arc::new(session)).await
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::io::read_results;
    use crate::render::RenderOptions;
    use std::fs;

    fn session() -> ViewerSession {
        let results = read_results(fs::File::open("./test/data/results.json").unwrap()).unwrap();
        ViewerSession::new("aspirin".into(), results, RenderOptions::default())
    }

    #[test]
    fn test_routes() {
        let session = session();
        let response = route(&session, "/");
        assert_eq!(response.status, 200);
        assert!(response.body.contains("<option value=\"0\" selected>"));

        let response = route(&session, "/?spectrum=1");
        assert_eq!(response.status, 200);
        assert!(response.body.contains("<option value=\"1\" selected>"));

        let response = route(&session, "/plot/1");
        assert_eq!(response.status, 200);
        assert!(response.body.starts_with("<div class=\"spectrum\" data-spectrum=\"1\">"));

        let response = route(&session, "/peak/0/annotated_matched/0");
        assert_eq!(response.status, 200);
        assert_eq!(response.content_type, "application/json");
        let details: serde_json::Value = serde_json::from_str(&response.body).unwrap();
        assert_eq!(details["atom_indices"], serde_json::json!([0, 1, 2]));

        for missing in [
            "/?spectrum=7",
            "/?spectrum=x",
            "/plot/7",
            "/plot/x",
            "/peak/0/predicted/99",
            "/peak/0/annotated_matched/3",
            "/favicon.ico",
        ] {
            assert_eq!(route(&session, missing).status, 404, "{missing}");
        }
    }

    #[test]
    fn test_response_bytes() {
        let bytes = Response::not_found().to_bytes();
        let text = String::from_utf8(bytes).unwrap();
        assert!(text.starts_with("HTTP/1.1 404 Not Found\r\n"));
        assert!(text.contains("Content-Length: 9\r\n"));
        assert!(text.ends_with("\r\n\r\nNot Found"));
    }

    #[tokio::test]
    async fn test_read_request_line() -> io::Result<()> {
        let request: &[u8] = b"GET /plot/0 HTTP/1.1\r\nHost: localhost\r\n\r\nignored";
        let line = read_request_line(request).await?;
        assert_eq!(line.as_deref(), Some("GET /plot/0 HTTP/1.1\r\n"));

        let empty: &[u8] = b"";
        assert_eq!(read_request_line(empty).await?, None);

        let mut long = b"GET /".to_vec();
        long.extend(std::iter::repeat(b'a').take(MAX_REQUEST_HEAD * 4));
        long.extend_from_slice(b" HTTP/1.1\r\n\r\n");
        let line = read_request_line(long.as_slice()).await?.unwrap();
        assert_eq!(line.len(), MAX_REQUEST_HEAD);
        assert!(!line.ends_with('\n'));
        Ok(())
    }

    #[tokio::test]
    async fn test_serve() -> io::Result<()> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let server = tokio::spawn(serve(listener, Arc::new(session())));

        let mut stream = TcpStream::connect(addr).await?;
        stream
            .write_all(b"GET /peak/0/predicted/1 HTTP/1.1\r\nHost: localhost\r\n\r\n")
            .await?;
        let mut response = String::new();
        stream.read_to_string(&mut response).await?;
        assert!(response.starts_with("HTTP/1.1 200 OK"));
        assert!(response.contains("\"mz\":121.0284"));

        let mut stream = TcpStream::connect(addr).await?;
        stream.write_all(b"POST / HTTP/1.1\r\n\r\n").await?;
        let mut response = String::new();
        stream.read_to_string(&mut response).await?;
        assert!(response.starts_with("HTTP/1.1 405"));

        server.abort();
        Ok(())
    }
}
