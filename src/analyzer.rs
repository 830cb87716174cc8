//! Driver for the Agilent 4155/4156 semiconductor parameter analyzer.

use ndarray::{Array2, ArrayView1};

use crate::{Error, Result};
use crate::config::{Channel, ChannelConfig, IntegrationTime, SweepSetup};
use crate::io::Transport;

/// Sweep or sampling state of the analyzer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperatingMode {
    Sweep,
    Sampling,
}

/// All measured columns of one run, in variable declaration order.
#[derive(Debug, Clone, PartialEq)]
pub struct Measurement {
    names: Vec<String>,
    data: Array2<f64>,
}

impl Measurement {
    /// Column names, one per declared display/data variable.
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Points-by-variables matrix.
    pub fn data(&self) -> &Array2<f64> {
        &self.data
    }

    /// Column for a named variable, if it was declared.
    pub fn column(&self, name: &str) -> Option<ArrayView1<f64>> {
        let index = self.names.iter().position(|n| n == name)?;
        Some(self.data.column(index))
    }
}

/// Stateless façade over one analyzer session. Every method is one
/// request/response round trip; configuration lives in instrument firmware.
#[derive(Debug)]
pub struct Spa415x<T: Transport> {
    io: T,
}

impl<T: Transport> Spa415x<T> {
    pub fn new(io: T) -> Spa415x<T> {
        Spa415x { io }
    }

    /// Queries whether the analyzer is in sweep or sampling state.
    pub fn mode(&mut self) -> Result<OperatingMode> {
        let reply = self.io.query(":PAGE:CHANnels:MODE?")?;
        match reply.trim() {
            "SWE" => Ok(OperatingMode::Sweep),
            "SAMP" => Ok(OperatingMode::Sampling),
            _ => Err(Error::UnexpectedReply { expected: "SWE or SAMP", reply }),
        }
    }

    pub fn set_mode(&mut self, mode: OperatingMode) -> Result<()> {
        let mnemonic = match mode {
            OperatingMode::Sweep => "SWEep",
            OperatingMode::Sampling => "SAMPling",
        };
        self.io.write(&format!(":PAGE:CHANnels:MODE {}", mnemonic))
    }

    /// Configures the operating properties of one channel and declares its
    /// signal names for list display.
    ///
    /// VMU channels monitor voltage only: they take no channel function and
    /// their signal is declared as a data variable rather than a display
    /// list entry.
    pub fn configure(&mut self, config: &ChannelConfig) -> Result<()> {
        let ch = config.channel.mnemonic();
        self.io.write(&format!(":PAGE:CHANnels:{}:MODE {}",
                               ch, config.output.mnemonic()))?;
        if config.output != crate::config::OutputMode::Common && !config.channel.is_vmu() {
            self.io.write(&format!(":PAGE:CHAN:{}:FUNC {}",
                                   ch, config.function.mnemonic()))?;
        }
        self.io.write(":PAGE:DISP:MODE LIST")?;
        self.io.write(&format!(":PAGE:CHANnels:{}:VNAMe '{}'", ch, config.voltage_name))?;
        self.io.write(&format!(":PAGE:DISP:LIST '{}'", config.voltage_name))?;
        if config.channel.is_vmu() {
            self.io.write(&format!("PAGE:DISP:DVAR '{}'", config.voltage_name))?;
        } else {
            self.io.write(&format!(":PAGE:CHANnels:{}:INAMe '{}'", ch, config.current_name))?;
            self.io.write(&format!(":PAGE:DISP:LIST '{}'", config.current_name))?;
        }
        Ok(())
    }

    /// Programs the sweep (or sampling constant) parameters of a channel.
    ///
    /// In sweep state the command template is selected by the function the
    /// channel was configured with, read back from the instrument. A channel
    /// in COMMON mode takes part in no sweep; its setup is skipped with a
    /// warning and nothing is emitted.
    pub fn setup(&mut self, channel: Channel, sweep: &SweepSetup) -> Result<()> {
        let ch = channel.mnemonic();
        match self.mode()? {
            OperatingMode::Sweep => {
                let opmode = self.io.query(&format!(":PAGE:CHANnels:{}:MODE?", ch))?;
                if opmode.trim() == "COMM" {
                    log::warn!("channel {} is set to COMMON mode, skipping sweep setup", ch);
                    return Ok(());
                }
                let function = self.io.query(&format!(":PAGE:CHANnels:{}:FUNCtion?", ch))?;
                let cmd = match function.trim() {
                    "CONS" => Self::constant_cmd(channel, sweep.constant, sweep.compliance),
                    "VAR1" => Self::var1_cmd(sweep),
                    "VAR2" => Self::var2_cmd(sweep),
                    "VARD" => Self::vard_cmd(sweep),
                    _ => return Err(Error::UnexpectedReply {
                        expected: "CONS, VAR1, VAR2 or VARD",
                        reply: function,
                    }),
                };
                self.io.write(&cmd)
            }
            OperatingMode::Sampling => {
                self.io.write(&format!(":PAGE:MEASure:SAMPling:CONStant:{}:SOURce {}",
                                       ch, sweep.constant))?;
                self.io.write(&format!(":PAGE:MEASure:SAMPling:CONStant:{}:COMPliance {}",
                                       ch, sweep.compliance))
            }
        }
    }

    fn constant_cmd(channel: Channel, value: f64, compliance: f64) -> String {
        format!(":PAGE:MEASure:CONStant:{}:SOURce {};COMPliance {}",
                channel.mnemonic(), value, compliance)
    }

    fn var1_cmd(sweep: &SweepSetup) -> String {
        format!(":PAGE:MEASure:VAR1:STARt {};STOP {};STEP {};SPACing {};COMPliance {}",
                sweep.start, sweep.stop, sweep.step,
                sweep.spacing.mnemonic(), sweep.compliance)
    }

    fn var2_cmd(sweep: &SweepSetup) -> String {
        format!(":PAGE:MEASure:VAR2:STARt {};POINts {};STEP {};COMPliance {}",
                sweep.start, sweep.var2_points(), sweep.step, sweep.compliance)
    }

    fn vard_cmd(sweep: &SweepSetup) -> String {
        format!(":PAGE:MEASure:VARD:RATio {};OFFSet {};COMPliance {}",
                sweep.ratio, sweep.offset, sweep.compliance)
    }

    /// Triggers a single measurement and collects all declared variables.
    ///
    /// `sampling_period_s` keeps the outputs on for that long in sampling
    /// state (useful when the analyzer biases a device while another
    /// instrument measures); it is ignored in sweep state.
    pub fn measure(&mut self, sampling_period_s: f64) -> Result<Measurement> {
        match self.mode()? {
            OperatingMode::Sampling => {
                self.io.write(&format!(":PAGE:MEASure:SAMPling:PERiod {}", sampling_period_s))?;
                self.io.write(":PAGE:MEASure:SAMPling:POINts 1")?;
                self.io.write(":PAGE:SCON:MEAS:SING")?;
            }
            OperatingMode::Sweep => {
                self.io.write("PAGE:SCON:MEAS:SING")?;
            }
        }
        self.io.write("*WAI")?;
        self.measurement_matrix()
    }

    /// Names of all variables for which measured data is available: the
    /// display list followed by the data variables.
    pub fn data_variables(&mut self) -> Result<Vec<String>> {
        let mut names = Vec::new();
        for query in [":PAGE:DISP:LIST?", ":PAGE:DISP:DVAR?"] {
            let reply = self.io.query(query)?;
            names.extend(reply.split(',')
                .map(str::trim)
                .filter(|name| !name.is_empty())
                .map(str::to_owned));
        }
        Ok(names)
    }

    /// Reads every declared variable and column-stacks the results in
    /// declaration order.
    fn measurement_matrix(&mut self) -> Result<Measurement> {
        let names = self.data_variables()?;
        let mut columns = Vec::with_capacity(names.len());
        for name in &names {
            self.io.write(":FORM:DATA ASC")?;
            columns.push(self.io.query_ascii(&format!(":DATA? {}", name))?);
        }
        let points = columns.first().map_or(0, Vec::len);
        for column in &columns {
            if column.len() != points {
                return Err(Error::TraceLength { expected: points, actual: column.len() });
            }
        }
        log::debug!("measured {} points of {} variables", points, names.len());
        let data = Array2::from_shape_fn((points, names.len()),
                                         |(row, col)| columns[col][row]);
        Ok(Measurement { names, data })
    }

    /// Disables an analyzer channel.
    pub fn disable(&mut self, channel: Channel) -> Result<()> {
        self.io.write(&format!(":PAGE:CHANnels:{}:DISable", channel.mnemonic()))
    }

    /// Sets delay, hold and integration times.
    ///
    /// Delay must lie in 0 to 65.535 s (100 µs resolution), hold in 0 to
    /// 655.35 s (10 ms resolution); a zero hold is clamped to the 30 ms
    /// instrument minimum.
    pub fn set_timing(&mut self, delay_s: f64, hold_s: f64,
                      integration: IntegrationTime) -> Result<()> {
        if !(0.0..=65.535).contains(&delay_s) {
            return Err(Error::OutOfRange { param: "delay time", value: delay_s });
        }
        if !(0.0..=655.35).contains(&hold_s) {
            return Err(Error::OutOfRange { param: "hold time", value: hold_s });
        }
        let hold_s = if hold_s == 0.0 { 0.03 } else { hold_s };
        self.io.write(&format!(":PAGE:MEAS:DEL {}", delay_s))?;
        self.io.write(&format!(":PAGE:MEAS:HTIME {}", hold_s))?;
        self.io.write(&format!(":PAGE:MEAS:MSET:ITIM {}", integration.mnemonic()))
    }

    /// Retrieves the oldest entry of the instrument error queue.
    pub fn system_error(&mut self) -> Result<(i32, String)> {
        let reply = self.io.query(":SYSTem:ERRor?")?;
        let (code, message) = reply
            .split_once(',')
            .ok_or_else(|| Error::Parse(reply.clone()))?;
        let code = code.trim().parse::<i32>()
            .map_err(|_| Error::Parse(reply.clone()))?;
        Ok((code, message.trim().replace('"', "")))
    }

    /// Puts every channel into a known constant state with canonical
    /// signal names, then makes SMU1 the primary sweep variable.
    pub fn initialize(&mut self) -> Result<()> {
        use crate::config::{Channel::*, Function::*, OutputMode::*};
        let steps = [
            (Smu1, Constant, Voltage, "X1", "Y1"),
            (Smu2, Constant, Voltage, "X2", "Y2"),
            (Smu3, Constant, Voltage, "X3", "Y3"),
            (Smu1, Var1, Voltage, "X1", "Y1"),
            (Smu4, Constant, Voltage, "X4", "Y4"),
            (Vsu1, Constant, Voltage, "ZA", "I"),
            (Vsu2, Constant, Voltage, "ZB", "I"),
            (Vmu1, Constant, Voltage, "ZC", "I"),
            (Vmu2, Constant, Voltage, "ZD", "I"),
        ];
        for (channel, function, output, vname, iname) in steps {
            self.configure(&ChannelConfig::new(channel, function, output, vname, iname))?;
        }
        Ok(())
    }
}
