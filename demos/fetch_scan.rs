//! Sweep output channel 0 once and log the response on two input channels.
//!
//! Run with `RUST_LOG=debug` to watch the scan-engine commands go out.

use std::time::Duration;

use mcc_sweep::{
    load_config_or_default, scan_to_volts, ChannelSpec, DaqDevice, RampShape, ScanRequest,
};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let config = load_config_or_default(None);
    let mut daq = DaqDevice::builder().config(&config.device).open()?;
    println!("connected to DAQ, serial {}", daq.serial_number()?);

    let request = ScanRequest::new(
        0.0,
        10.0,
        Duration::from_secs(1),
        RampShape::Descent,
        vec![ChannelSpec::new(0), ChannelSpec::new(1)],
        1000,
    );
    let codes = daq.fetch_scan(&request)?;
    let volts = scan_to_volts(&codes, &request.channels);

    for (i, row) in volts.outer_iter().enumerate().step_by(100) {
        println!("sample {i:4}: {:?}", row.to_vec());
    }
    Ok(())
}
