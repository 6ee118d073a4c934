// Serial port discovery example
//
// Lists the serial ports of this machine and asks each one for an identification.

use std::time::Duration;
use tdscope_rs::{TdsConnector, TdsTerminal};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let devices = TdsConnector::get_available_devices()?;
    if devices.is_empty() {
        println!("No serial ports found.");
        return Ok(());
    }

    println!("Found {} port(s):", devices.len());
    for device in devices {
        print!("  {} ({}): ", device.port, device.description);
        let identification = TdsTerminal::open(&device.port, 9600, Duration::from_secs(1))
            .map_err(|e| e.to_string())
            .and_then(|mut terminal| TdsConnector::probe(&mut terminal).map_err(|e| e.to_string()));
        match identification {
            Ok(idn) => println!("{}", idn),
            Err(e) => println!("no answer ({})", e),
        }
    }

    Ok(())
}
