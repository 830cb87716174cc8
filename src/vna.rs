//! Driver for the Anritsu 37xxx vector network analyzer.

use ndarray::Array3;
use num_complex::Complex64;

use crate::{Error, Result};
use crate::io::{FloatFormat, Transport};
use crate::network::TwoPortNetwork;

/// Both ports are matched to 50 ohms.
const REFERENCE_OHMS: f64 = 50.0;

/// Receiver IF bandwidth selection codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IfBandwidth {
    Hz10,
    Hz100,
    KHz1,
    KHz10,
}

impl IfBandwidth {
    fn mnemonic(self) -> &'static str {
        match self {
            Self::Hz10 => "IF1",
            Self::Hz100 => "IF2",
            Self::KHz1 => "IF3",
            Self::KHz10 => "IF4",
        }
    }

    /// Label for the numeric `IFX?` readback.
    fn label_for_code(code: f64) -> Option<&'static str> {
        match code as i64 {
            1 => Some("10Hz"),
            2 => Some("100Hz"),
            3 => Some("1kHz"),
            4 => Some("10kHz"),
            _ => None,
        }
    }
}

/// Stateless façade over one VNA session.
#[derive(Debug)]
pub struct Anritsu37xx<T: Transport> {
    io: T,
}

impl<T: Transport> Anritsu37xx<T> {
    pub fn new(io: T) -> Anritsu37xx<T> {
        Anritsu37xx { io }
    }

    /// Loads a discrete list of frequency points, in Hz.
    pub fn set_frequency(&mut self, points_hz: &[f64]) -> Result<()> {
        if points_hz.is_empty() {
            return Err(Error::OutOfRange { param: "frequency point count", value: 0.0 });
        }
        let list = points_hz
            .iter()
            .map(f64::to_string)
            .collect::<Vec<_>>()
            .join(", ");
        self.io.write(&format!("IFV #0 {}", list))
    }

    /// Sets the source power level; the instrument accepts -30 dBm to 0 dBm.
    pub fn set_power(&mut self, dbm: f64) -> Result<()> {
        if !(-30.0..=0.0).contains(&dbm) {
            return Err(Error::OutOfRange { param: "source power", value: dbm });
        }
        self.io.write(&format!("PWR {} DB", dbm))
    }

    /// Sets the port attenuators: port 1 up to 70 dB, port 2 up to 40 dB,
    /// both in steps of 10 dB.
    pub fn set_attenuation(&mut self, port1_db: u32, port2_db: u32) -> Result<()> {
        if port1_db > 70 || port1_db % 10 != 0 {
            return Err(Error::OutOfRange { param: "port 1 attenuation", value: port1_db as f64 });
        }
        if port2_db > 40 || port2_db % 10 != 0 {
            return Err(Error::OutOfRange { param: "port 2 attenuation", value: port2_db as f64 });
        }
        self.io.write(&format!("SA1 {};TA2 {}", port1_db, port2_db))
    }

    pub fn set_if_bandwidth(&mut self, bandwidth: IfBandwidth) -> Result<()> {
        self.io.write(bandwidth.mnemonic())
    }

    /// Reads back the sweep, power, IF bandwidth and attenuator settings and
    /// formats them as a `!`-prefixed settings banner. The banner carries
    /// instrument-derived lines only; callers that want a timestamp add
    /// their own.
    pub fn summary(&mut self) -> Result<String> {
        let reply = self.io.query("SRT?; STP?; ONDF")?;
        let fields: Vec<&str> = reply.split(';').map(str::trim).collect();
        if fields.len() != 3 {
            return Err(Error::UnexpectedReply { expected: "start; stop; points", reply });
        }
        let start_ghz = fields[0].parse::<f64>()? / 1e9;
        let stop_ghz = fields[1].parse::<f64>()? / 1e9;
        let steps = fields[2].to_owned();

        let power = self.io.query("PWR?")?.trim().parse::<f64>()?;

        let if_reply = self.io.query("IFX?")?;
        let if_code = if_reply.trim().parse::<f64>()?;
        let if_label = IfBandwidth::label_for_code(if_code)
            .ok_or(Error::UnexpectedReply { expected: "IF code 1 to 4", reply: if_reply })?;

        let reply = self.io.query("SA1?; TA2?")?;
        let attens: Vec<&str> = reply.split(';').map(str::trim).collect();
        if attens.len() != 2 {
            return Err(Error::UnexpectedReply { expected: "two attenuator values", reply });
        }

        Ok(format!("! Frequency range is from {} GHz to {} GHz in {} steps\n\
                    ! Source power level is {} dBm\n\
                    ! IF Bandwidth is {}\n\
                    ! Source attenuation level is {} dB\n\
                    ! Receiver attenuation level is {} dB\n",
                   start_ghz, stop_ghz, steps, power, if_label, attens[0], attens[1]))
    }

    /// Performs a full 2-port S-parameter measurement.
    ///
    /// Sets up the four display channels, holds the sweep with RF and bias
    /// off, triggers two sweeps (forward and reverse), then pulls the
    /// frequency vector and one interleaved real/imaginary trace per
    /// S-parameter and stacks them into a `[point, 2, 2]` tensor.
    pub fn measure(&mut self) -> Result<TwoPortNetwork> {
        self.io.write("CH1;S11;SMI;CH2;S12;PLR;CH3;S21;PLR;CH4;S22;SMI")?;
        self.io.write("BH0; RH0")?;
        self.io.write("HLD;TRS;WFS;TRS;WFS")?;

        let reply = self.io.query("ONP")?;
        let points = reply.trim().parse::<usize>()
            .map_err(|_| Error::Parse(reply))?;

        let freq_ghz: Vec<f64> = self.io
            .query_binary("FMC;OFV", FloatFormat::F32)?
            .iter()
            .map(|hz| hz * 1e-9)
            .collect();
        if freq_ghz.len() != points {
            return Err(Error::TraceLength { expected: points, actual: freq_ghz.len() });
        }

        // display channel order is S11, S12, S21, S22
        let mut traces = Vec::with_capacity(4);
        for display in ["CH1", "CH2", "CH3", "CH4"] {
            self.io.write(display)?;
            let trace = deinterleave(&self.io.query_binary("FMC;OCD", FloatFormat::F32)?)?;
            if trace.len() != points {
                return Err(Error::TraceLength { expected: points, actual: trace.len() });
            }
            traces.push(trace);
        }
        log::debug!("collected 4 S-parameter traces of {} points", points);

        let s = Array3::from_shape_fn((points, 2, 2), |(point, out, inp)| {
            traces[out * 2 + inp][point]
        });
        let z0 = [Complex64::new(REFERENCE_OHMS, 0.0); 2];
        TwoPortNetwork::new("vna-data", freq_ghz, s, z0)
    }
}

/// Combines interleaved `[r0, i0, r1, i1, ...]` values into complex samples
/// in their original order.
fn deinterleave(values: &[f64]) -> Result<Vec<Complex64>> {
    if values.len() % 2 != 0 {
        return Err(Error::BlockFormat("interleaved trace has odd length"));
    }
    Ok(values
        .chunks_exact(2)
        .map(|pair| Complex64::new(pair[0], pair[1]))
        .collect())
}

#[cfg(test)]
mod test {
    use approx::assert_relative_eq;

    use super::*;
    use crate::io::scripted::{frame_f32, ScriptedTransport};

    #[test]
    fn test_deinterleave() {
        assert_eq!(deinterleave(&[1.0, 2.0, 3.0, 4.0]).unwrap(),
                   vec![Complex64::new(1.0, 2.0), Complex64::new(3.0, 4.0)]);
        assert_eq!(deinterleave(&[]).unwrap(), vec![]);
    }

    #[test]
    fn test_deinterleave_odd_length() {
        assert!(matches!(deinterleave(&[1.0, 2.0, 3.0]).unwrap_err(),
                         Error::BlockFormat(_)));
    }

    #[test]
    fn test_set_frequency() {
        let mut vna = Anritsu37xx::new(ScriptedTransport::new());
        vna.set_frequency(&[1e9, 2e9, 2.5e9]).unwrap();
        assert_eq!(vna.io.take_sent(), ["IFV #0 1000000000, 2000000000, 2500000000"]);
    }

    #[test]
    fn test_set_frequency_empty() {
        let mut vna = Anritsu37xx::new(ScriptedTransport::new());
        assert!(vna.set_frequency(&[]).is_err());
        assert!(vna.io.take_sent().is_empty());
    }

    #[test]
    fn test_set_power() {
        let mut vna = Anritsu37xx::new(ScriptedTransport::new());
        vna.set_power(-10.0).unwrap();
        assert_eq!(vna.io.take_sent(), ["PWR -10 DB"]);
    }

    #[test]
    fn test_set_power_out_of_range() {
        let mut vna = Anritsu37xx::new(ScriptedTransport::new());
        assert!(matches!(vna.set_power(3.0).unwrap_err(),
                         Error::OutOfRange { param: "source power", .. }));
        assert!(matches!(vna.set_power(-40.0).unwrap_err(),
                         Error::OutOfRange { .. }));
        assert!(vna.io.take_sent().is_empty());
    }

    #[test]
    fn test_set_attenuation() {
        let mut vna = Anritsu37xx::new(ScriptedTransport::new());
        vna.set_attenuation(10, 0).unwrap();
        assert_eq!(vna.io.take_sent(), ["SA1 10;TA2 0"]);
    }

    #[test]
    fn test_set_attenuation_out_of_range() {
        let mut vna = Anritsu37xx::new(ScriptedTransport::new());
        assert!(vna.set_attenuation(80, 0).is_err());
        assert!(vna.set_attenuation(0, 50).is_err());
        assert!(vna.set_attenuation(15, 0).is_err());
        assert!(vna.io.take_sent().is_empty());
    }

    #[test]
    fn test_set_if_bandwidth() {
        let mut vna = Anritsu37xx::new(ScriptedTransport::new());
        vna.set_if_bandwidth(IfBandwidth::KHz1).unwrap();
        assert_eq!(vna.io.take_sent(), ["IF3"]);
    }

    #[test]
    fn test_summary() {
        let mut vna = Anritsu37xx::new(ScriptedTransport::new()
            .reply("1000000000; 2000000000; 11")
            .reply("-10")
            .reply("3")
            .reply("10; 0"));
        let summary = vna.summary().unwrap();
        // every line is instrument-derived; the first is the frequency range
        assert!(summary.starts_with("! Frequency range is from 1 GHz to 2 GHz in 11 steps"));
        assert!(summary.contains("! Source power level is -10 dBm"));
        assert!(summary.contains("! IF Bandwidth is 1kHz"));
        assert!(summary.contains("! Source attenuation level is 10 dB"));
        assert!(summary.contains("! Receiver attenuation level is 0 dB"));
    }

    #[test]
    fn test_summary_unknown_if_code() {
        let mut vna = Anritsu37xx::new(ScriptedTransport::new()
            .reply("1000000000; 2000000000; 11")
            .reply("-10")
            .reply("7"));
        assert!(matches!(vna.summary().unwrap_err(),
                         Error::UnexpectedReply { .. }));
    }

    fn scripted_measurement() -> ScriptedTransport {
        ScriptedTransport::new()
            .reply("2")                                         // ONP
            .reply_block(frame_f32(&[1e9, 2e9]))                // FMC;OFV
            .reply_block(frame_f32(&[1.0, 2.0, 3.0, 4.0]))      // S11
            .reply_block(frame_f32(&[5.0, 6.0, 7.0, 8.0]))      // S12
            .reply_block(frame_f32(&[9.0, 10.0, 11.0, 12.0]))   // S21
            .reply_block(frame_f32(&[13.0, 14.0, 15.0, 16.0]))  // S22
    }

    #[test]
    fn test_measure_command_sequence() {
        let mut vna = Anritsu37xx::new(scripted_measurement());
        vna.measure().unwrap();
        assert_eq!(vna.io.take_sent(), [
            "CH1;S11;SMI;CH2;S12;PLR;CH3;S21;PLR;CH4;S22;SMI",
            "BH0; RH0",
            "HLD;TRS;WFS;TRS;WFS",
            "ONP",
            "FMC;OFV",
            "CH1", "FMC;OCD",
            "CH2", "FMC;OCD",
            "CH3", "FMC;OCD",
            "CH4", "FMC;OCD",
        ]);
    }

    #[test]
    fn test_measure_tensor_layout() {
        let mut vna = Anritsu37xx::new(scripted_measurement());
        let network = vna.measure().unwrap();
        assert_eq!(network.points(), 2);
        assert_eq!(network.name(), "vna-data");
        assert_relative_eq!(network.frequency_ghz()[0], 1.0, max_relative = 1e-12);
        assert_relative_eq!(network.frequency_ghz()[1], 2.0, max_relative = 1e-12);
        // [point, port_out, port_in]
        assert_eq!(network.s()[[0, 0, 0]], Complex64::new(1.0, 2.0));    // S11
        assert_eq!(network.s()[[0, 0, 1]], Complex64::new(5.0, 6.0));    // S12
        assert_eq!(network.s()[[0, 1, 0]], Complex64::new(9.0, 10.0));   // S21
        assert_eq!(network.s()[[0, 1, 1]], Complex64::new(13.0, 14.0));  // S22
        assert_eq!(network.s()[[1, 0, 0]], Complex64::new(3.0, 4.0));
        assert_eq!(network.z0(), [Complex64::new(50.0, 0.0); 2]);
    }

    #[test]
    fn test_measure_short_trace() {
        let mut vna = Anritsu37xx::new(ScriptedTransport::new()
            .reply("2")
            .reply_block(frame_f32(&[1e9, 2e9]))
            .reply_block(frame_f32(&[1.0, 2.0])));  // one point instead of two
        assert!(matches!(vna.measure().unwrap_err(),
                         Error::TraceLength { expected: 2, actual: 1 }));
    }

    #[test]
    fn test_measure_frequency_count_mismatch() {
        let mut vna = Anritsu37xx::new(ScriptedTransport::new()
            .reply("3")
            .reply_block(frame_f32(&[1e9, 2e9])));
        assert!(matches!(vna.measure().unwrap_err(),
                         Error::TraceLength { expected: 3, actual: 2 }));
    }
}
