//! The radio front-end: two clock-locked endpoints, the master receives and the
//! slave transmits.
//!
//! Hardware drivers implement [`FrontEnd`]. Two software front-ends live here, a
//! loopback simulator that echoes the transmitted chirp back with a fixed delay and
//! a replay source that serves sweeps out of a recording.

use std::{collections::VecDeque, fmt, fs, path::Path, thread, time::Duration};

use byte_slice_cast::AsSliceOf;
use rand::{rngs::StdRng, Rng, SeedableRng};
use tracing::{debug, info, warn};

use crate::error::{RadarError, RadarResult};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Endpoint {
    /// Local radio, supplies the clock and receives
    Master,
    /// Remote radio, follows the clock and transmits
    Slave,
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Endpoint::Master => write!(f, "master"),
            Endpoint::Slave => write!(f, "slave"),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Channel {
    I,
    Q,
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Channel::I => write!(f, "voltage0"),
            Channel::Q => write!(f, "voltage1"),
        }
    }
}

pub trait FrontEnd {
    /// `reference` supplies the shared clock, the other endpoint follows it
    fn configure_clock(&mut self, reference: Endpoint) -> RadarResult<()>;

    fn set_carrier_frequency(&mut self, endpoint: Endpoint, hz: u64) -> RadarResult<()>;

    fn enable_channel(&mut self, endpoint: Endpoint, channel: Channel) -> RadarResult<()>;

    /// One-shot push of interleaved I/Q. The radio repeats it every sweep.
    fn transmit(&mut self, endpoint: Endpoint, samples: &[i16]) -> RadarResult<()>;

    /// Block until the next sweep of interleaved I/Q is available.
    /// The frame is only valid until the next call.
    fn receive(&mut self, endpoint: Endpoint) -> RadarResult<&[i16]>;
}

/// One-time radio setup before the first transmit
pub fn bring_up<F: FrontEnd + ?Sized>(fe: &mut F, carrier_hz: u64) -> RadarResult<()> {
    // Slave disables its own oscillator and listens to the master's
    fe.configure_clock(Endpoint::Master)?;
    fe.set_carrier_frequency(Endpoint::Master, carrier_hz)?;
    fe.set_carrier_frequency(Endpoint::Slave, carrier_hz)?;
    for channel in [Channel::I, Channel::Q] {
        fe.enable_channel(Endpoint::Master, channel)?;
        fe.enable_channel(Endpoint::Slave, channel)?;
    }
    info!(carrier_hz, "Front-end configured");
    Ok(())
}

/// A fault to inject into the next receive
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Fault {
    Error,
    Short,
}

pub struct SimulatedFrontEnd {
    n: usize,
    delay: usize,
    gain: f32,
    noise: f32,
    rng: StdRng,
    faults: VecDeque<Fault>,
    pace: Option<Duration>,
    offline: Option<Endpoint>,
    clock_reference: Option<Endpoint>,
    carriers: [Option<u64>; 2],
    rx_channels: [bool; 2],
    tx_channels: [bool; 2],
    echo: Option<Vec<i16>>,
    frame: Vec<i16>,
}

impl SimulatedFrontEnd {
    pub fn new(n: usize) -> Self {
        Self {
            n,
            delay: 0,
            gain: 1.0,
            noise: 0.0,
            rng: StdRng::seed_from_u64(0),
            faults: VecDeque::new(),
            pace: None,
            offline: None,
            clock_reference: None,
            carriers: [None; 2],
            rx_channels: [false; 2],
            tx_channels: [false; 2],
            echo: None,
            frame: vec![0; 2 * n],
        }
    }

    /// Round trip delay of the simulated target in samples
    pub fn with_delay(mut self, samples: usize) -> Self {
        self.delay = samples % self.n.max(1);
        self
    }

    pub fn with_gain(mut self, gain: f32) -> Self {
        self.gain = gain;
        self
    }

    /// Uniform noise of +/- `amplitude` counts on each component
    pub fn with_noise(mut self, amplitude: f32, seed: u64) -> Self {
        self.noise = amplitude.abs();
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    /// Wait this long in every receive, like a real sweep would
    pub fn with_pace(mut self, pace: Duration) -> Self {
        self.pace = Some(pace);
        self
    }

    /// Make one endpoint unreachable, as if it were unplugged
    pub fn with_offline(mut self, endpoint: Endpoint) -> Self {
        self.offline = Some(endpoint);
        self
    }

    /// Queue faults for the upcoming receives, in order
    pub fn inject(&mut self, fault: Fault, count: usize) {
        self.faults.extend(std::iter::repeat(fault).take(count));
    }

    fn reach(&self, endpoint: Endpoint) -> RadarResult<()> {
        if self.offline == Some(endpoint) {
            return Err(RadarError::EndpointNotFound {
                endpoint,
                reason: "no response".to_owned(),
            });
        }
        Ok(())
    }

    fn index(endpoint: Endpoint) -> usize {
        match endpoint {
            Endpoint::Master => 0,
            Endpoint::Slave => 1,
        }
    }

    // Echoes only make it back when both radios share a clock and a carrier
    fn locked(&self) -> bool {
        self.clock_reference.is_some()
            && self.carriers[0].is_some()
            && self.carriers[0] == self.carriers[1]
    }

    fn fill_frame(&mut self) {
        let n = self.n;
        for i in 0..n {
            let src = (i + n - self.delay) % n;
            for c in 0..2 {
                let echo = match &self.echo {
                    Some(tx) if self.locked() => tx[2 * src + c] as f32 * self.gain,
                    _ => 0.0,
                };
                let noise = if self.noise > 0.0 {
                    self.rng.gen_range(-self.noise..=self.noise)
                } else {
                    0.0
                };
                // Float to int casts saturate, like an ADC clipping
                self.frame[2 * i + c] = (echo + noise).round() as i16;
            }
        }
    }
}

impl FrontEnd for SimulatedFrontEnd {
    fn configure_clock(&mut self, reference: Endpoint) -> RadarResult<()> {
        self.reach(Endpoint::Master)?;
        self.reach(Endpoint::Slave)?;
        self.clock_reference = Some(reference);
        Ok(())
    }

    fn set_carrier_frequency(&mut self, endpoint: Endpoint, hz: u64) -> RadarResult<()> {
        self.reach(endpoint)?;
        if hz == 0 {
            return Err(RadarError::FrontEndConfig(format!(
                "cannot tune {} endpoint to 0 Hz",
                endpoint
            )));
        }
        self.carriers[Self::index(endpoint)] = Some(hz);
        Ok(())
    }

    fn enable_channel(&mut self, endpoint: Endpoint, channel: Channel) -> RadarResult<()> {
        self.reach(endpoint)?;
        let slot = match channel {
            Channel::I => 0,
            Channel::Q => 1,
        };
        match endpoint {
            Endpoint::Master => self.rx_channels[slot] = true,
            Endpoint::Slave => self.tx_channels[slot] = true,
        }
        Ok(())
    }

    fn transmit(&mut self, endpoint: Endpoint, samples: &[i16]) -> RadarResult<()> {
        if endpoint != Endpoint::Slave {
            return Err(RadarError::Transmit(format!(
                "{} endpoint has no transmit path",
                endpoint
            )));
        }
        if !self.tx_channels.iter().all(|&on| on) {
            return Err(RadarError::Transmit("TX channels not enabled".to_owned()));
        }
        if samples.len() != 2 * self.n {
            return Err(RadarError::Transmit(format!(
                "buffer holds {} values, expected {}",
                samples.len(),
                2 * self.n
            )));
        }
        self.echo = Some(samples.to_vec());
        Ok(())
    }

    fn receive(&mut self, endpoint: Endpoint) -> RadarResult<&[i16]> {
        if endpoint != Endpoint::Master {
            return Err(RadarError::FrontEndConfig(format!(
                "{} endpoint has no receive path",
                endpoint
            )));
        }
        if !self.rx_channels.iter().all(|&on| on) {
            return Err(RadarError::FrontEndConfig(
                "RX channels not enabled".to_owned(),
            ));
        }
        if let Some(pace) = self.pace {
            thread::sleep(pace);
        }
        match self.faults.pop_front() {
            Some(Fault::Error) => Err(RadarError::Acquisition("buffer refill failed".to_owned())),
            Some(Fault::Short) => {
                self.fill_frame();
                Ok(&self.frame[..self.n])
            }
            None => {
                self.fill_frame();
                Ok(&self.frame)
            }
        }
    }
}

impl Drop for SimulatedFrontEnd {
    fn drop(&mut self) {
        debug!("Simulated front-end released");
    }
}

/// Serves sweeps from a recording of interleaved native-endian i16 I/Q, looping
/// at the end of the file
pub struct ReplayFrontEnd {
    samples: Vec<i16>,
    n: usize,
    cursor: usize,
    pace: Option<Duration>,
}

impl ReplayFrontEnd {
    pub fn open<P: AsRef<Path>>(path: P, n: usize) -> RadarResult<Self> {
        let bytes = fs::read(path.as_ref())?;
        let samples = bytes
            .as_slice_of::<i16>()
            .map_err(|e| RadarError::FrontEndConfig(format!("malformed recording: {}", e)))?;
        Self::from_samples(samples.to_vec(), n)
    }

    pub fn from_samples(mut samples: Vec<i16>, n: usize) -> RadarResult<Self> {
        let frame_len = 2 * n;
        let frames = samples.len() / frame_len;
        if frames == 0 {
            return Err(RadarError::FrontEndConfig(format!(
                "recording holds {} values, less than one sweep of {}",
                samples.len(),
                frame_len
            )));
        }
        let tail = samples.len() % frame_len;
        if tail != 0 {
            warn!(tail, "Dropping partial sweep at end of recording");
            samples.truncate(frames * frame_len);
        }
        info!(frames, "Replay recording loaded");
        Ok(Self {
            samples,
            n,
            cursor: 0,
            pace: None,
        })
    }

    pub fn with_pace(mut self, pace: Duration) -> Self {
        self.pace = Some(pace);
        self
    }

    pub fn frames(&self) -> usize {
        self.samples.len() / (2 * self.n)
    }
}

impl FrontEnd for ReplayFrontEnd {
    // The recording already carries the radio setup, nothing to configure
    fn configure_clock(&mut self, _reference: Endpoint) -> RadarResult<()> {
        Ok(())
    }

    fn set_carrier_frequency(&mut self, _endpoint: Endpoint, _hz: u64) -> RadarResult<()> {
        Ok(())
    }

    fn enable_channel(&mut self, _endpoint: Endpoint, _channel: Channel) -> RadarResult<()> {
        Ok(())
    }

    fn transmit(&mut self, _endpoint: Endpoint, samples: &[i16]) -> RadarResult<()> {
        debug!(len = samples.len(), "Replay ignores the transmit waveform");
        Ok(())
    }

    fn receive(&mut self, endpoint: Endpoint) -> RadarResult<&[i16]> {
        if endpoint != Endpoint::Master {
            return Err(RadarError::FrontEndConfig(format!(
                "{} endpoint has no receive path",
                endpoint
            )));
        }
        if let Some(pace) = self.pace {
            thread::sleep(pace);
        }
        let frame_len = 2 * self.n;
        let start = self.cursor;
        self.cursor = (self.cursor + frame_len) % self.samples.len();
        Ok(&self.samples[start..start + frame_len])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use byte_slice_cast::AsByteSlice;
    use std::io::Write;

    fn ready(n: usize) -> SimulatedFrontEnd {
        let mut fe = SimulatedFrontEnd::new(n);
        bring_up(&mut fe, 5_800_000_000).unwrap();
        fe
    }

    #[test]
    fn test_echo_is_delayed_copy() {
        let mut fe = ready(4).with_delay(1);
        let tx: Vec<i16> = (1..=8).collect();
        fe.transmit(Endpoint::Slave, &tx).unwrap();
        let rx = fe.receive(Endpoint::Master).unwrap();
        assert_eq!(rx, &[7, 8, 1, 2, 3, 4, 5, 6]);
    }

    #[test]
    fn test_echo_gain_and_clipping() {
        let mut fe = ready(2).with_gain(0.5);
        fe.transmit(Endpoint::Slave, &[100, -100, 30000, 7]).unwrap();
        assert_eq!(fe.receive(Endpoint::Master).unwrap(), &[50, -50, 15000, 4]);
        let mut fe = ready(2).with_gain(4.0);
        fe.transmit(Endpoint::Slave, &[100, -100, 30000, 7]).unwrap();
        assert_eq!(fe.receive(Endpoint::Master).unwrap()[2], i16::MAX);
    }

    #[test]
    fn test_no_echo_without_transmit() {
        let mut fe = ready(4);
        assert!(fe.receive(Endpoint::Master).unwrap().iter().all(|&s| s == 0));
    }

    #[test]
    fn test_unconfigured_receive_is_fatal() {
        let mut fe = SimulatedFrontEnd::new(4);
        let err = fe.receive(Endpoint::Master).unwrap_err();
        assert!(!err.is_recoverable());
    }

    #[test]
    fn test_offline_slave_fails_bring_up() {
        let mut fe = SimulatedFrontEnd::new(4).with_offline(Endpoint::Slave);
        assert!(matches!(
            bring_up(&mut fe, 5_800_000_000),
            Err(RadarError::EndpointNotFound {
                endpoint: Endpoint::Slave,
                ..
            })
        ));
    }

    #[test]
    fn test_transmit_checks() {
        let mut fe = SimulatedFrontEnd::new(4);
        assert!(matches!(
            fe.transmit(Endpoint::Slave, &[0; 8]),
            Err(RadarError::Transmit(_))
        ));
        let mut fe = ready(4);
        assert!(fe.transmit(Endpoint::Master, &[0; 8]).is_err());
        assert!(fe.transmit(Endpoint::Slave, &[0; 6]).is_err());
        assert!(fe.transmit(Endpoint::Slave, &[0; 8]).is_ok());
    }

    #[test]
    fn test_injected_faults_in_order() {
        let mut fe = ready(4);
        fe.inject(Fault::Error, 1);
        fe.inject(Fault::Short, 1);
        assert!(fe.receive(Endpoint::Master).unwrap_err().is_recoverable());
        assert_eq!(fe.receive(Endpoint::Master).unwrap().len(), 4);
        assert_eq!(fe.receive(Endpoint::Master).unwrap().len(), 8);
    }

    #[test]
    fn test_noise_is_bounded() {
        let mut fe = ready(64).with_noise(3.0, 42);
        for &s in fe.receive(Endpoint::Master).unwrap() {
            assert!((-3..=3).contains(&s));
        }
    }

    #[test]
    fn test_replay_wraps() {
        let samples: Vec<i16> = (0..20).collect();
        let mut fe = ReplayFrontEnd::from_samples(samples, 4).unwrap();
        // 20 values is two sweeps of 8 plus a partial one
        assert_eq!(fe.frames(), 2);
        assert_eq!(fe.receive(Endpoint::Master).unwrap()[0], 0);
        assert_eq!(fe.receive(Endpoint::Master).unwrap()[0], 8);
        assert_eq!(fe.receive(Endpoint::Master).unwrap()[0], 0);
    }

    #[test]
    fn test_replay_from_file() {
        let samples: Vec<i16> = (0..16).map(|v| v * 100 - 800).collect();
        let path = std::env::temp_dir().join(format!("fmcw-replay-{}.iq", std::process::id()));
        fs::File::create(&path)
            .unwrap()
            .write_all(samples.as_byte_slice())
            .unwrap();
        let mut fe = ReplayFrontEnd::open(&path, 8).unwrap();
        assert_eq!(fe.receive(Endpoint::Master).unwrap(), samples.as_slice());
        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_replay_too_short() {
        assert!(ReplayFrontEnd::from_samples(vec![0; 7], 4).is_err());
    }
}
