//! Helper macros for the terminal session state machine modules.

/// Debug-format a state or event holding an open
/// [`SerialPort`](serialport::SerialPort), showing the port line settings
/// instead of the opaque handle.
macro_rules! debug_fmt_port {
    ($name:expr, $port:expr, $f:ident) => {
        $f.debug_struct($name)
            .field("name", &$port.name())
            .field("baud_rate", &$port.baud_rate())
            .field("data_bits", &$port.data_bits())
            .field("stop_bits", &$port.stop_bits())
            .field("parity", &$port.parity())
            .field("flow_control", &$port.flow_control())
            .finish()
    };
}
