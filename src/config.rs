//! Channel and sweep vocabulary of the 4155/4156 parameter analyzer.

/// An analyzer unit: source-measure, voltage-source, or voltage-monitor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    Smu1,
    Smu2,
    Smu3,
    Smu4,
    Vsu1,
    Vsu2,
    Vmu1,
    Vmu2,
}

impl Channel {
    /// SCPI node name, e.g. `:PAGE:CHANnels:SMU1:...`.
    pub(crate) fn mnemonic(self) -> &'static str {
        match self {
            Self::Smu1 => "SMU1",
            Self::Smu2 => "SMU2",
            Self::Smu3 => "SMU3",
            Self::Smu4 => "SMU4",
            Self::Vsu1 => "VSU1",
            Self::Vsu2 => "VSU2",
            Self::Vmu1 => "VMU1",
            Self::Vmu2 => "VMU2",
        }
    }

    /// Voltage monitor units measure only; they take no function or
    /// current name.
    pub(crate) fn is_vmu(self) -> bool {
        matches!(self, Self::Vmu1 | Self::Vmu2)
    }
}

/// Role of a channel within a sweep.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Function {
    Var1,
    Var2,
    /// Tracks VAR1 through a ratio and an offset.
    VarD,
    #[default]
    Constant,
}

impl Function {
    pub(crate) fn mnemonic(self) -> &'static str {
        match self {
            Self::Var1 => "VAR1",
            Self::Var2 => "VAR2",
            Self::VarD => "VARD",
            Self::Constant => "CONStant",
        }
    }
}

/// Output operating mode of a channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputMode {
    #[default]
    Voltage,
    Current,
    VoltagePulse,
    CurrentPulse,
    /// Circuit common; a COMMON channel takes part in no sweep.
    Common,
}

impl OutputMode {
    pub(crate) fn mnemonic(self) -> &'static str {
        match self {
            Self::Voltage => "V",
            Self::Current => "I",
            Self::VoltagePulse => "VPULse",
            Self::CurrentPulse => "IPULse",
            Self::Common => "COMMon",
        }
    }
}

/// Step spacing of the primary (VAR1) sweep.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Spacing {
    #[default]
    Linear,
    Log10,
    Log20,
    Log50,
}

impl Spacing {
    pub(crate) fn mnemonic(self) -> &'static str {
        match self {
            Self::Linear => "LIN",
            Self::Log10 => "L10",
            Self::Log20 => "L20",
            Self::Log50 => "L50",
        }
    }
}

/// A/D integration time per point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IntegrationTime {
    #[default]
    Short,
    Medium,
    Long,
}

impl IntegrationTime {
    pub(crate) fn mnemonic(self) -> &'static str {
        match self {
            Self::Short => "SHOR",
            Self::Medium => "MED",
            Self::Long => "LONG",
        }
    }
}

/// Operating properties of one analyzer channel.
///
/// Signal names label the measured columns and must be unique across all
/// configured channels; the analyzer holds them in firmware, nothing is
/// mirrored locally.
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelConfig {
    pub channel: Channel,
    pub function: Function,
    pub output: OutputMode,
    /// Voltage signal name, e.g. `"VG"`.
    pub voltage_name: String,
    /// Current signal name; ignored for VMU channels, which monitor
    /// voltage only.
    pub current_name: String,
}

impl ChannelConfig {
    pub fn new(channel: Channel, function: Function, output: OutputMode,
               voltage_name: &str, current_name: &str) -> ChannelConfig {
        ChannelConfig {
            channel,
            function,
            output,
            voltage_name: voltage_name.to_owned(),
            current_name: current_name.to_owned(),
        }
    }
}

/// Sweep parameters for one channel.
///
/// Which fields apply depends on the function the channel was configured
/// with: `start`/`stop`/`step` for VAR1 and VAR2 (`spacing` for VAR1 only),
/// `ratio`/`offset` for VARD, `constant` for CONSTANT channels and for
/// sampling mode.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SweepSetup {
    pub start: f64,
    pub stop: f64,
    pub step: f64,
    pub spacing: Spacing,
    pub constant: f64,
    pub ratio: f64,
    pub offset: f64,
    /// Current or voltage compliance limit on the channel.
    pub compliance: f64,
}

impl Default for SweepSetup {
    fn default() -> SweepSetup {
        SweepSetup {
            start: 0.0,
            stop: 1.0,
            step: 0.1,
            spacing: Spacing::default(),
            constant: 0.0,
            ratio: 1.0,
            offset: 0.0,
            compliance: 0.0,
        }
    }
}

impl SweepSetup {
    /// Number of points of a VAR2 sweep over `start..=stop`.
    pub(crate) fn var2_points(&self) -> i64 {
        ((self.stop - self.start) / self.step).round() as i64 + 1
    }
}
