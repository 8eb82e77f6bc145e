//! Serial port device manipulation.

use std::{io::Write, time::Duration};

use log::{debug, info, warn};
use serialport::SerialPort;

use crate::{error::Result, Settings};

/// How long a read on the port waits before reporting a timeout. The device
/// reader treats timeouts as "no data yet" and reads again.
pub(crate) const READ_TIMEOUT: Duration = Duration::from_millis(100);

//==============================================================================
// Public Interface
//==============================================================================

/// The console side of a connection to the device: a byte sink plus the
/// control line used to reboot the device.
pub trait Link: Write + Send {
    /// Toggle the device reset line.
    fn pulse_reset(&mut self) -> Result<()>;
}

impl Link for Box<dyn SerialPort> {
    /// Raise then drop DTR, which is wired to the reset pin on most boards
    /// with a USB serial bridge.
    fn pulse_reset(&mut self) -> Result<()> {
        self.write_data_terminal_ready(true)?;
        self.write_data_terminal_ready(false)?;
        debug!("reset pulse sent on DTR");
        Ok(())
    }
}

/// Open the port named in `settings` (or the default one), retrying a few
/// times in case the device is still enumerating.
pub(crate) fn open_and_setup_port(
    settings: &Settings,
) -> std::result::Result<Box<dyn SerialPort>, serialport::Error> {
    use retry::{delay, retry_with_index};

    let path = settings.port_or_default().to_owned();
    let result = retry_with_index(
        delay::Fixed::from_millis(1000).take(4),
        |index| -> std::result::Result<Box<dyn SerialPort>, serialport::Error> {
            debug!("Trying to connect {} ({})", path, index);
            serialport::new(&path, settings.baud_rate)
                .data_bits(settings.data_bits)
                .stop_bits(settings.stop_bits)
                .parity(settings.parity)
                .flow_control(settings.flow_control)
                .timeout(READ_TIMEOUT)
                .open()
        },
    );
    match result {
        Ok(mut port) => {
            // Keep the reset line released; some boards hold in reset while
            // DTR or RTS is asserted.
            port.write_data_terminal_ready(false)?;
            port.write_request_to_send(false)?;

            info!(
                "Connected to {} at {} baud",
                port.name().unwrap_or_else(|| path.clone()),
                settings.baud_rate
            );
            debug!("data_bits    : {:#?}", port.data_bits());
            debug!("stop_bits    : {:#?}", port.stop_bits());
            debug!("parity       : {:#?}", port.parity());
            debug!("flow control : {:#?}", port.flow_control());

            match port.baud_rate() {
                Ok(actual) if actual != settings.baud_rate => warn!(
                    "requested {} baud but the port reports {}; the rate is probably not \
                     supported by the device",
                    settings.baud_rate, actual
                ),
                _ => {}
            }

            Ok(port)
        }
        Err(err) => match err {
            retry::Error::Operation {
                error,
                total_delay,
                tries,
            } => {
                info!(
                    "Failed to open the port after {:?} and {} tries: {}",
                    total_delay, tries, error,
                );
                Err(error)
            }
            retry::Error::Internal(_) => {
                info!("Internal retry error while opening port");
                Err(serialport::Error::new(
                    serialport::ErrorKind::Unknown,
                    "internal error while retrying to open the port",
                ))
            }
        },
    }
}
