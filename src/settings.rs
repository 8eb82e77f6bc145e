//! Settings related to the `sercom` serial port and terminal session.
//!
//! Use the [builder](https://doc.rust-lang.org/1.0.0/style/ownership/builders.html)
//! pattern to set the configurable values.

use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
};

pub use serialport::{DataBits, FlowControl, Parity, StopBits};

/// Port used when neither the command line nor the configuration file name
/// one.
pub const DEFAULT_PORT: &str = "/dev/ttyUSB0";
/// Default baud rate in symbols-per-second.
pub const DEFAULT_BAUD_RATE: u32 = 115_200;
/// Name of the configuration directory created under the home directory.
pub const DEFAULT_DIR_NAME: &str = ".sercom";
/// Default configuration file name inside the configuration directory.
pub const DEFAULT_CONFIG_FILE: &str = "sercom.conf";
/// Name of the input history file inside the configuration directory.
pub const HISTORY_FILE: &str = "history";

// =============================================================================
// Public Interface
// =============================================================================

/// Groups all settings of a `sercom` session and acts as a
/// [builder](https://doc.rust-lang.org/1.0.0/style/ownership/builders.html)
/// for the settings.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Settings {
    /// The port name, usually the device path. `None` until resolved from
    /// the command line or the configuration file.
    pub port: Option<String>,
    /// The baud rate in symbols-per-second.
    pub baud_rate: u32,
    /// Number of bits used to represent a character sent on the line.
    pub data_bits: DataBits,
    /// The type of signalling to use for controlling data transfer.
    pub flow_control: FlowControl,
    /// The type of parity to use for error checking.
    pub parity: Parity,
    /// Number of bits to use to signal the end of a character.
    pub stop_bits: StopBits,

    /// Directory holding the configuration file, the input history and the
    /// session logs.
    pub config_dir: PathBuf,
    /// Name of the configuration file inside `config_dir`.
    pub config_file: String,

    /// Settings found in the configuration file that `sercom` does not know
    /// about. Kept as plain strings so that newer configuration files still
    /// load.
    pub extra: BTreeMap<String, String>,

    /// Restrict creation of `Settings` instances unless through the
    /// `SettingsBuilder`.
    #[doc(hidden)]
    _private_use_builder: (),
}
impl Settings {
    /// Full path to the configuration file.
    pub fn config_path(&self) -> PathBuf {
        self.config_dir.join(&self.config_file)
    }

    /// Full path to the input history file.
    pub fn history_path(&self) -> PathBuf {
        self.config_dir.join(HISTORY_FILE)
    }

    /// The port to open, falling back to [`DEFAULT_PORT`].
    pub fn port_or_default(&self) -> &str {
        self.port.as_deref().unwrap_or(DEFAULT_PORT)
    }

    /// Record a setting loaded from the configuration file that has no typed
    /// field. The first value seen for a key wins.
    pub fn absorb(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.extra.entry(key.into()).or_insert_with(|| value.into());
    }
}

/// The builder for the `Settings` values.
///
/// All values are optional and have default values that will be used if not
/// explicitly set.
///
/// **Example**
///
/// ```
/// use sercom::SettingsBuilder;
///
/// let settings = SettingsBuilder::new().port("/dev/ttyUSB0").finalize();
/// assert_eq!(settings.port.as_deref(), Some("/dev/ttyUSB0"));
/// ```
pub struct SettingsBuilder {
    settings: Settings,
}
impl SettingsBuilder {
    /// Start building the settings using default values and no port.
    pub fn new() -> Self {
        SettingsBuilder {
            settings: Settings {
                port: None,
                baud_rate: DEFAULT_BAUD_RATE,
                data_bits: DataBits::Eight,
                flow_control: FlowControl::None,
                parity: Parity::None,
                stop_bits: StopBits::One,
                config_dir: default_config_dir(),
                config_file: DEFAULT_CONFIG_FILE.into(),
                extra: BTreeMap::new(),
                _private_use_builder: (),
            },
        }
    }

    /// Set the path to the serial port
    pub fn port<'a>(mut self, port: impl Into<std::borrow::Cow<'a, str>>) -> Self {
        self.settings.port = Some(port.into().into_owned());
        self
    }

    /// Set the baud rate in symbols-per-second
    pub fn baud_rate(mut self, baud_rate: u32) -> Self {
        self.settings.baud_rate = baud_rate;
        self
    }

    /// Set the number of bits used to represent a character sent on the line
    pub fn data_bits(mut self, data_bits: DataBits) -> Self {
        self.settings.data_bits = data_bits;
        self
    }

    /// Set the type of signalling to use for controlling data transfer
    pub fn flow_control(mut self, flow_control: FlowControl) -> Self {
        self.settings.flow_control = flow_control;
        self
    }

    /// Set the type of parity to use for error checking
    pub fn parity(mut self, parity: Parity) -> Self {
        self.settings.parity = parity;
        self
    }

    /// Set the number of bits to use to signal the end of a character
    pub fn stop_bits(mut self, stop_bits: StopBits) -> Self {
        self.settings.stop_bits = stop_bits;
        self
    }

    /// Set the directory holding the configuration, history and logs
    pub fn config_dir(mut self, config_dir: impl AsRef<Path>) -> Self {
        self.settings.config_dir = config_dir.as_ref().to_path_buf();
        self
    }

    /// Set the configuration file name
    pub fn config_file<'a>(mut self, config_file: impl Into<std::borrow::Cow<'a, str>>) -> Self {
        self.settings.config_file = config_file.into().into_owned();
        self
    }

    pub fn finalize(self) -> Settings {
        self.settings
    }
}
impl Default for SettingsBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// `$HOME/.sercom`, or `./.sercom` when the home directory is unknown.
pub fn default_config_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(DEFAULT_DIR_NAME)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[test]
fn all_default() {
    let settings = SettingsBuilder::new().finalize();
    assert_eq!(
        settings,
        Settings {
            port: None,
            baud_rate: 115_200,
            data_bits: DataBits::Eight,
            flow_control: FlowControl::None,
            parity: Parity::None,
            stop_bits: StopBits::One,
            config_dir: default_config_dir(),
            config_file: "sercom.conf".into(),
            extra: BTreeMap::new(),
            _private_use_builder: (),
        }
    )
}

#[test]
fn port() {
    let settings = SettingsBuilder::new().port("/dev/ttyACM0").finalize();
    assert_eq!(settings.port.unwrap(), "/dev/ttyACM0");
}

#[test]
fn port_falls_back_to_default() {
    let settings = SettingsBuilder::new().finalize();
    assert_eq!(settings.port_or_default(), DEFAULT_PORT);
}

#[test]
fn baud_rate() {
    let baud_rate = 9_600;
    let settings = SettingsBuilder::new().baud_rate(baud_rate).finalize();
    assert_eq!(settings.baud_rate, baud_rate);
}

#[test]
fn line_parameters() {
    let settings = SettingsBuilder::new()
        .data_bits(DataBits::Seven)
        .flow_control(FlowControl::Hardware)
        .parity(Parity::Even)
        .stop_bits(StopBits::Two)
        .finalize();
    assert_eq!(settings.data_bits, DataBits::Seven);
    assert_eq!(settings.flow_control, FlowControl::Hardware);
    assert_eq!(settings.parity, Parity::Even);
    assert_eq!(settings.stop_bits, StopBits::Two);
}

#[test]
fn paths() {
    let settings = SettingsBuilder::new()
        .config_dir("/tmp/sc")
        .config_file("board.conf")
        .finalize();
    assert_eq!(settings.config_path(), PathBuf::from("/tmp/sc/board.conf"));
    assert_eq!(settings.history_path(), PathBuf::from("/tmp/sc/history"));
}

#[test]
fn absorb_keeps_first_value() {
    let mut settings = SettingsBuilder::new().finalize();
    settings.absorb("prompt", "> ");
    settings.absorb("prompt", "$ ");
    assert_eq!(settings.extra.get("prompt").map(String::as_str), Some("> "));
}
