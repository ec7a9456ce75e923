//! HTTP server for the natural-language query gateway.
//! Simple HTTP server using tokio and basic HTTP handling.

use clap::Parser;
use nlq_gateway::gateway::parse_prompt;
use nlq_gateway::{GatewayConfig, LlmClient, QueryGateway, ResponseEnvelope};
use std::path::Path;
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use uuid::Uuid;

#[derive(Parser)]
#[command(about = "Natural-language query gateway server")]
struct Args {
    /// Port to listen on
    #[arg(short, long, default_value_t = 8080)]
    port: u16,

    /// Path to the SQLite database (overrides NLQ_DATABASE)
    #[arg(short, long)]
    database: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenv::dotenv().ok();

    tracing_subscriber::fmt::init();

    let args = Args::parse();
    let mut config = GatewayConfig::from_env();
    if let Some(database) = args.database {
        config.database = database;
    }

    println!("Starting NLQ Gateway API Server...");

    if config.is_mock() {
        println!("[WARN] OPENAI_API_KEY not found - canned SQL responses enabled");
    } else {
        println!("[OK] API key found - model '{}' via {}", config.model, config.base_url);
    }

    if !Path::new(&config.database).exists() {
        println!(
            "[WARN] Database '{}' does not exist - run `setup_db` to create and seed it",
            config.database
        );
    } else {
        println!("[OK] Using database '{}'", config.database);
    }

    let llm = LlmClient::new(
        config.api_key.clone(),
        config.model.clone(),
        config.base_url.clone(),
    );
    let gateway = Arc::new(QueryGateway::new(llm, &config.database));

    let listener = TcpListener::bind(("0.0.0.0", args.port)).await?;
    println!("[OK] Server listening on port {}", args.port);

    loop {
        let (stream, addr) = listener.accept().await?;
        let gateway = Arc::clone(&gateway);
        tokio::spawn(async move {
            let request_id = Uuid::new_v4();
            eprintln!("[INFO] {} new connection from {}", request_id, addr);
            handle_connection(stream, gateway, request_id).await;
        });
    }
}

async fn handle_connection(mut stream: TcpStream, gateway: Arc<QueryGateway>, request_id: Uuid) {
    use tokio::time::{timeout, Duration};

    // Read request with timeout to prevent hanging
    let mut buffer = Vec::new();
    let mut temp_buf = [0; 8192];

    let read_result = timeout(Duration::from_secs(5), async {
        loop {
            match stream.read(&mut temp_buf).await {
                Ok(0) => break, // EOF
                Ok(n) => {
                    buffer.extend_from_slice(&temp_buf[..n]);
                    // Stop once headers plus the Content-Length body are in
                    if let Ok(s) = std::str::from_utf8(&buffer) {
                        if let Some(headers_end) = s.find("\r\n\r\n") {
                            if let Some(content_length) = extract_content_length(s) {
                                if buffer.len() >= headers_end + 4 + content_length {
                                    break;
                                }
                            } else if n < temp_buf.len() {
                                break;
                            }
                        }
                    }
                    if buffer.len() > 1_000_000 {
                        break;
                    }
                }
                Err(e) => {
                    eprintln!("[WARN] {} failed to read from stream: {}", request_id, e);
                    return Err(e);
                }
            }
        }
        Ok(())
    })
    .await;

    if read_result.is_err() {
        eprintln!("[WARN] {} request read timeout", request_id);
        return;
    }

    if buffer.is_empty() {
        return;
    }

    match String::from_utf8(buffer) {
        Ok(request) => {
            let response = handle_request(&request, &gateway).await;
            if let Err(e) = stream.write_all(response.as_bytes()).await {
                eprintln!("[WARN] {} failed to write response: {}", request_id, e);
            }
        }
        Err(e) => {
            eprintln!("[WARN] {} request is not valid UTF-8: {}", request_id, e);
        }
    }
}

fn extract_content_length(request: &str) -> Option<usize> {
    for line in request.lines() {
        if line.to_lowercase().starts_with("content-length:") {
            if let Some(value) = line.split(':').nth(1) {
                return value.trim().parse().ok();
            }
        }
    }
    None
}

async fn handle_request(request: &str, gateway: &QueryGateway) -> String {
    let request_line = match request.lines().next() {
        Some(line) => line,
        None => return create_response(400, "Bad Request", "{}"),
    };

    let parts: Vec<&str> = request_line.split_whitespace().collect();
    if parts.len() < 2 {
        return create_response(400, "Bad Request", "{}");
    }

    let method = parts[0];
    let full_path = parts[1];

    // Normalize path (drop query string and trailing slash)
    let path_str = full_path.split('?').next().unwrap_or(full_path);
    let mut path = path_str.trim_end_matches('/');
    if path.is_empty() {
        path = "/";
    }

    match (method, path) {
        ("GET", "/api/health") => {
            create_response(200, "OK", r#"{"status":"ok","service":"nlq-gateway"}"#)
        }
        ("POST", "/query") => {
            let envelope = match parse_prompt(extract_body(request)) {
                Some(prompt) => gateway.handle(&prompt).await,
                None => ResponseEnvelope::MissingPrompt,
            };
            let (status, status_text) = envelope.status();
            create_response(status, status_text, &envelope.to_json().to_string())
        }
        ("OPTIONS", _) => create_response(200, "OK", ""),
        _ => create_response(404, "Not Found", r#"{"error":"not found"}"#),
    }
}

/// Extract the request body, salvaging a JSON object embedded in a body
/// with leading noise.
fn extract_body(request: &str) -> &str {
    let body_start = request.find("\r\n\r\n").map(|i| i + 4).unwrap_or(request.len());
    let body = request[body_start..].trim();

    if body.starts_with('{') {
        body
    } else if let Some(json_start) = body.find('{') {
        &body[json_start..]
    } else {
        ""
    }
}

fn create_response(status: u16, status_text: &str, body: &str) -> String {
    format!(
        "HTTP/1.1 {} {}\r\n\
         Content-Type: application/json\r\n\
         Access-Control-Allow-Origin: *\r\n\
         Access-Control-Allow-Methods: GET, POST, OPTIONS\r\n\
         Access-Control-Allow-Headers: Content-Type\r\n\
         Content-Length: {}\r\n\
         \r\n\
         {}",
        status,
        status_text,
        body.len(),
        body
    )
}
