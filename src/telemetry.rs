//! This module is responsible for getting spectra to the remote display.
//!
//! Wire format (ASCII, no terminator):
//! `DATA:<v0>,<v1>,...,<v_{N/2-1}>` with every value printed to two decimals.

use std::{
    fmt::Write,
    io,
    net::{Ipv4Addr, Ipv6Addr, SocketAddr, UdpSocket},
};

use tracing::debug;

use crate::error::{RadarError, RadarResult};

pub const PREFIX: &str = "DATA:";
/// Integer digits a magnitude may take on the wire, so values live in [0, 10^6)
pub const MAX_INTEGER_DIGITS: usize = 6;
// Largest f32 below 10^6, prints as 999999.94
const SATURATED_MAGNITUDE: f32 = 999_999.937_5;

/// Worst case encoded length for `bins` values of up to `int_digits` integer digits
pub fn max_frame_len(bins: usize, int_digits: usize) -> usize {
    // digits + '.' + 2 decimals, one comma between each pair
    PREFIX.len() + bins * (int_digits + 3) + bins.saturating_sub(1)
}

#[derive(Debug, PartialEq)]
pub struct EncodedFrame<'a> {
    pub bytes: &'a [u8],
    /// Values clamped to fit the digit budget
    pub saturated: usize,
}

pub struct TelemetryEncoder {
    bins: usize,
    limit: usize,
    buf: String,
}

impl TelemetryEncoder {
    /// Fails if a frame of `bins` values could ever exceed `limit` bytes
    pub fn new(bins: usize, limit: usize) -> RadarResult<Self> {
        let bound = max_frame_len(bins, MAX_INTEGER_DIGITS);
        if bound > limit {
            return Err(RadarError::FrameTooLarge { bound, limit });
        }
        Ok(Self {
            bins,
            limit,
            buf: String::with_capacity(bound),
        })
    }

    pub fn bins(&self) -> usize {
        self.bins
    }

    pub fn encode(&mut self, mags: &[f32]) -> RadarResult<EncodedFrame<'_>> {
        assert_eq!(mags.len(), self.bins);
        self.buf.clear();
        self.buf.push_str(PREFIX);
        let mut saturated = 0;
        for (bin, &mag) in mags.iter().enumerate() {
            if !mag.is_finite() || mag < 0.0 {
                return Err(RadarError::InvalidMagnitude { bin, value: mag });
            }
            let value = if mag > SATURATED_MAGNITUDE {
                saturated += 1;
                SATURATED_MAGNITUDE
            } else if mag == 0.0 {
                // -0.0 would print a sign
                0.0
            } else {
                mag
            };
            if bin > 0 {
                self.buf.push(',');
            }
            // Writing into a String can't fail
            let _ = write!(self.buf, "{:.2}", f64::from(value));
        }
        if self.buf.len() > self.limit {
            return Err(RadarError::FrameTooLarge {
                bound: self.buf.len(),
                limit: self.limit,
            });
        }
        Ok(EncodedFrame {
            bytes: self.buf.as_bytes(),
            saturated,
        })
    }
}

/// Best-effort datagram sink bound to a single destination
pub trait Transport {
    /// Fire and forget, never blocks
    fn send(&mut self, payload: &[u8]) -> io::Result<usize>;
}

pub struct UdpTransport {
    socket: UdpSocket,
    destination: SocketAddr,
}

impl UdpTransport {
    pub fn open(destination: SocketAddr) -> RadarResult<Self> {
        let local = match destination {
            SocketAddr::V4(_) => SocketAddr::from((Ipv4Addr::UNSPECIFIED, 0)),
            SocketAddr::V6(_) => SocketAddr::from((Ipv6Addr::UNSPECIFIED, 0)),
        };
        let socket = UdpSocket::bind(local).map_err(RadarError::TransportInit)?;
        socket
            .set_nonblocking(true)
            .map_err(RadarError::TransportInit)?;
        socket
            .connect(destination)
            .map_err(RadarError::TransportInit)?;
        debug!(%destination, "Telemetry socket open");
        Ok(Self {
            socket,
            destination,
        })
    }

    pub fn destination(&self) -> SocketAddr {
        self.destination
    }
}

impl Transport for UdpTransport {
    fn send(&mut self, payload: &[u8]) -> io::Result<usize> {
        self.socket.send(payload)
    }
}

/// A frame as the display side reads it back
#[cfg(test)]
#[derive(Debug, PartialEq)]
pub(crate) struct TelemetryFrame {
    pub magnitudes: Vec<f32>,
}

#[cfg(test)]
impl TelemetryFrame {
    pub fn parse(bytes: &[u8]) -> Option<Self> {
        let body = std::str::from_utf8(bytes).ok()?.strip_prefix(PREFIX)?;
        let magnitudes = body
            .split(',')
            .map(|v| v.parse().ok())
            .collect::<Option<Vec<f32>>>()?;
        Some(Self { magnitudes })
    }
}
