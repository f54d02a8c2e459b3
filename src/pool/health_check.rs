//! Health check implementation for pooled connections
//!
//! This module provides health checking functionality for key-value
//! connections:
//! - TCP-level checks using non-blocking peek
//! - Application-level checks using a Noop request
//! - Lock-free health check metrics

use deadpool::managed;
use std::sync::atomic::{AtomicU64, Ordering};
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio::time::timeout;

use crate::constants::pool::{HEALTH_CHECK_TIMEOUT, TCP_PEEK_BUFFER_SIZE};
use crate::pool::OperationBuilderPool;
use crate::protocol::{self, OpCode, Request};

/// Errors that can occur during connection health checks
#[derive(Debug, Error)]
pub enum HealthCheckError {
    /// TCP connection is closed
    #[error("TCP connection closed")]
    TcpClosed,

    /// Unexpected data found in the buffer before health check
    #[error("Unexpected data in buffer")]
    UnexpectedData,

    /// TCP-level error occurred
    #[error("TCP error: {0}")]
    TcpError(std::io::Error),

    /// Failed to write the Noop request to the connection
    #[error("Failed to write health check: {0}")]
    WriteError(std::io::Error),

    /// Failed to read the Noop response from the connection
    #[error("Failed to read health check response: {0}")]
    ReadError(String),

    /// Health check operation timed out
    #[error("Health check timeout")]
    Timeout,

    /// Server returned an unexpected response to the Noop request
    #[error("Unexpected health check response: {0}")]
    UnexpectedResponse(String),
}

impl From<HealthCheckError> for managed::RecycleError<anyhow::Error> {
    fn from(err: HealthCheckError) -> Self {
        managed::RecycleError::Message(err.to_string().into())
    }
}

/// Lock-free metrics for periodic health checks
///
/// Updated from the background health check task and read from anywhere,
/// so all counters use atomics.
#[derive(Debug, Default)]
pub struct HealthCheckMetrics {
    cycles_run: AtomicU64,
    connections_checked: AtomicU64,
    connections_failed: AtomicU64,
}

impl HealthCheckMetrics {
    /// Create a new metrics instance
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a completed health check cycle
    pub fn record_cycle(&self, checked: u64, failed: u64) {
        self.cycles_run.fetch_add(1, Ordering::Relaxed);
        self.connections_checked
            .fetch_add(checked, Ordering::Relaxed);
        self.connections_failed.fetch_add(failed, Ordering::Relaxed);
    }

    /// Total number of health check cycles run
    #[must_use]
    pub fn cycles_run(&self) -> u64 {
        self.cycles_run.load(Ordering::Relaxed)
    }

    /// Total number of connections checked
    #[must_use]
    pub fn connections_checked(&self) -> u64 {
        self.connections_checked.load(Ordering::Relaxed)
    }

    /// Total number of connections that failed health checks
    #[must_use]
    pub fn connections_failed(&self) -> u64 {
        self.connections_failed.load(Ordering::Relaxed)
    }

    /// Get the failure rate (0.0 to 1.0)
    #[must_use]
    pub fn failure_rate(&self) -> f64 {
        let checked = self.connections_checked();
        if checked == 0 {
            0.0
        } else {
            self.connections_failed() as f64 / checked as f64
        }
    }
}

/// Fast TCP-level check for obviously dead connections
///
/// Uses non-blocking peek to detect closed connections without consuming
/// data.
///
/// # How it works
/// - `try_read()` attempts a non-blocking read of 1 byte
/// - `Ok(0)` means the connection is closed (EOF)
/// - `Ok(n)` means data is available (unexpected - should be idle)
/// - `Err(WouldBlock)` means no data available - this is **expected** for an
///   idle, healthy connection, as there is no data to read between operations
/// - Other errors indicate TCP-level problems
pub fn check_tcp_alive(conn: &mut TcpStream) -> managed::RecycleResult<anyhow::Error> {
    let mut peek_buf = [0u8; TCP_PEEK_BUFFER_SIZE];

    match conn.try_read(&mut peek_buf) {
        Ok(0) => Err(HealthCheckError::TcpClosed.into()),
        Ok(_) => Err(HealthCheckError::UnexpectedData.into()),
        Err(e) if e.kind() != std::io::ErrorKind::WouldBlock => {
            // Clone to preserve original error details and message
            Err(HealthCheckError::TcpError(std::io::Error::new(e.kind(), e.to_string())).into())
        }
        // WouldBlock is the expected case - no data available on idle connection
        Err(_) => Ok(()),
    }
}

/// Application-level health check using a Noop request
///
/// Sends a Noop and verifies the response to ensure the connection is still
/// functional end-to-end. This detects server-side timeouts that TCP
/// keepalive might miss.
pub async fn check_noop_response(
    conn: &mut TcpStream,
    builders: &OperationBuilderPool,
) -> Result<(), HealthCheckError> {
    // Wrap the entire health check in a single timeout
    let health_check = async {
        let request = Request::new(OpCode::Noop);
        let mut builder = builders.rent(request.encoded_len());
        request
            .encode_into(&mut builder)
            .map_err(|e| HealthCheckError::UnexpectedResponse(e.to_string()))?;

        conn.write_all(&builder)
            .await
            .map_err(HealthCheckError::WriteError)?;
        drop(builder);

        let response = protocol::read_response(conn, builders.rent(32))
            .await
            .map_err(|e| HealthCheckError::ReadError(e.to_string()))?;

        if response.header.opcode != OpCode::Noop {
            return Err(HealthCheckError::UnexpectedResponse(format!(
                "noop answered with {}",
                response.header.opcode
            )));
        }
        if !response.header.status.is_success() {
            return Err(HealthCheckError::UnexpectedResponse(
                response.header.status.to_string(),
            ));
        }
        Ok(())
    };

    // Apply timeout and convert errors
    timeout(HEALTH_CHECK_TIMEOUT, health_check)
        .await
        .map_err(|_| HealthCheckError::Timeout)?
}
