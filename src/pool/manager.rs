use anyhow::Result;
use deadpool::managed;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tracing::debug;

use crate::constants::socket::{POOL_RECV_BUFFER, POOL_SEND_BUFFER};
use crate::error::KvError;
use crate::pool::OperationBuilderPool;
use crate::pool::health_check::check_tcp_alive;
use crate::protocol::{self, OpCode, Request};

/// Client identifier sent during the Hello negotiation
const CLIENT_ID: &[u8] = b"kvlink/0.3";

/// TCP connection manager for deadpool
///
/// Creates fully-established connections: socket tuning, Hello negotiation,
/// and bucket selection all happen before a connection enters the pool, so a
/// leased connection is always ready for key-value traffic.
#[derive(Debug)]
pub struct KvTcpManager {
    pub(crate) host: String,
    pub(crate) port: u16,
    name: String,
    bucket: Option<String>,
    connect_timeout: std::time::Duration,
    builders: OperationBuilderPool,
}

impl KvTcpManager {
    pub fn new(
        host: String,
        port: u16,
        name: String,
        bucket: Option<String>,
        connect_timeout: std::time::Duration,
        builders: OperationBuilderPool,
    ) -> Self {
        Self {
            host,
            port,
            name,
            bucket,
            connect_timeout,
            builders,
        }
    }

    /// Create an optimized TCP connection
    async fn create_optimized_tcp_stream(&self) -> Result<TcpStream, KvError> {
        use socket2::{Domain, Protocol, Socket, Type};
        use std::net::SocketAddr;

        // First resolve the hostname to an IP address
        let addr = format!("{}:{}", self.host, self.port);
        let socket_addrs: Vec<SocketAddr> = tokio::net::lookup_host(&addr)
            .await
            .map_err(|e| KvError::DnsResolution {
                address: addr.clone(),
                source: e,
            })?
            .collect();

        let socket_addr = *socket_addrs.first().ok_or_else(|| KvError::DnsResolution {
            address: addr.clone(),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "no addresses found"),
        })?;

        // Create socket with optimizations
        let domain = if socket_addr.is_ipv4() {
            Domain::IPV4
        } else {
            Domain::IPV6
        };
        let socket = Socket::new(domain, Type::STREAM, Some(Protocol::TCP))
            .map_err(|e| KvError::SocketConfig {
                operation: "create".to_string(),
                source: e,
            })?;

        let configure = |socket: &Socket| -> std::io::Result<()> {
            // Socket buffer sizes sized for pooled connections; modest enough
            // that a cluster of pools at max size stays within budget
            socket.set_recv_buffer_size(POOL_RECV_BUFFER)?;
            socket.set_send_buffer_size(POOL_SEND_BUFFER)?;

            // Enable keepalive so the OS notices dead peers on idle sockets
            socket.set_keepalive(true)?;
            let keepalive = socket2::TcpKeepalive::new()
                .with_time(std::time::Duration::from_secs(60))
                .with_interval(std::time::Duration::from_secs(10));
            socket.set_tcp_keepalive(&keepalive)?;

            // Disable Nagle's algorithm for low latency on small frames
            socket.set_tcp_nodelay(true)?;

            // Set reuse address for quick restart
            socket.set_reuse_address(true)?;
            Ok(())
        };
        configure(&socket).map_err(|e| KvError::SocketConfig {
            operation: "tune".to_string(),
            source: e,
        })?;

        socket
            .connect(&socket_addr.into())
            .map_err(|e| KvError::Connect {
                host: self.host.clone(),
                port: self.port,
                source: e,
            })?;

        // Convert socket2::Socket to tokio TcpStream
        let std_stream: std::net::TcpStream = socket.into();
        std_stream
            .set_nonblocking(true)
            .map_err(|e| KvError::SocketConfig {
                operation: "nonblocking".to_string(),
                source: e,
            })?;
        let stream = TcpStream::from_std(std_stream).map_err(KvError::Io)?;

        Ok(stream)
    }

    /// Send one handshake request and verify a success response
    async fn handshake_step(
        &self,
        stream: &mut TcpStream,
        opcode: OpCode,
        key: &[u8],
    ) -> Result<(), KvError> {
        let request = Request {
            key,
            ..Request::new(opcode)
        };

        let mut builder = self.builders.rent(request.encoded_len());
        request.encode_into(&mut builder)?;
        stream.write_all(&builder).await?;
        drop(builder);

        let response = protocol::read_response(stream, self.builders.rent(64)).await?;
        if response.header.opcode != opcode {
            return Err(KvError::Handshake {
                node: self.name.clone(),
                detail: format!(
                    "{} request answered with {}",
                    opcode, response.header.opcode
                ),
            });
        }
        if !response.header.status.is_success() {
            return Err(KvError::Handshake {
                node: self.name.clone(),
                detail: format!("{} rejected: {}", opcode, response.header.status),
            });
        }
        Ok(())
    }

    /// Establish and negotiate a connection ready for key-value traffic
    async fn establish(&self) -> Result<TcpStream, KvError> {
        let mut stream = self.create_optimized_tcp_stream().await?;

        self.handshake_step(&mut stream, OpCode::Hello, CLIENT_ID)
            .await?;
        debug!(node = %self.name, "Hello negotiation complete");

        if let Some(bucket) = &self.bucket {
            self.handshake_step(&mut stream, OpCode::SelectBucket, bucket.as_bytes())
                .await?;
            debug!(node = %self.name, bucket = %bucket, "Bucket selected");
        }

        Ok(stream)
    }
}

impl managed::Manager for KvTcpManager {
    type Type = TcpStream;
    type Error = anyhow::Error;

    async fn create(&self) -> Result<TcpStream, anyhow::Error> {
        debug!(node = %self.name, "Creating new pooled connection");

        let stream = tokio::time::timeout(self.connect_timeout, self.establish())
            .await
            .map_err(|_| KvError::Timeout {
                operation: "connect",
                elapsed_ms: self.connect_timeout.as_millis() as u64,
            })??;

        Ok(stream)
    }

    async fn recycle(
        &self,
        conn: &mut TcpStream,
        _: &managed::Metrics,
    ) -> managed::RecycleResult<anyhow::Error> {
        // Fast TCP-level health check using try_read() to detect closed
        // connections before handing them back out
        check_tcp_alive(conn)
    }

    fn detach(&self, _conn: &mut TcpStream) {
        // Connection is being removed from the pool; it closes on drop
        debug!(node = %self.name, "Connection detached from pool");
    }
}
