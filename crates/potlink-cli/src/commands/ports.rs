//! List serial ports and audio devices.

use potlink_io::{available_ports, list_devices};

pub fn run() -> anyhow::Result<()> {
    println!("Serial ports:");
    match available_ports() {
        Ok(ports) if ports.is_empty() => println!("  (none)"),
        Ok(ports) => {
            for port in ports {
                println!("  {:<24} {}", port.name, port.description);
            }
        }
        Err(e) => println!("  unavailable: {e}"),
    }

    println!("\nAudio devices:");
    let devices = list_devices()?;
    if devices.is_empty() {
        println!("  (none)");
    }
    for device in devices {
        let direction = match (device.is_input, device.is_output) {
            (true, true) => "in/out",
            (true, false) => "in",
            _ => "out",
        };
        println!(
            "  {:<40} {:<7} {} Hz",
            device.name, direction, device.default_sample_rate
        );
    }
    Ok(())
}
